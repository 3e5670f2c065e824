use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use castlink::PlaybackAction;

#[derive(Parser)]
#[command(author, version, about = "Find screens on the local network and cast video to them", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List receivers answering on the local network
    Discover {
        /// How long to listen
        #[arg(short, long, default_value_t = 6)]
        seconds: u64,
    },
    /// Send a video URL to a receiver
    Cast {
        /// Receiver id or name
        device: String,
        /// URL the receiver should play
        url: String,
        #[arg(short, long, default_value_t = 6)]
        seconds: u64,
    },
    /// Play, pause or stop a receiver
    Control {
        /// Receiver id or name
        device: String,
        action: Action,
        #[arg(short, long, default_value_t = 6)]
        seconds: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Action {
    Play,
    Pause,
    Stop,
}

impl From<Action> for PlaybackAction {
    fn from(action: Action) -> Self {
        match action {
            Action::Play => PlaybackAction::Play,
            Action::Pause => PlaybackAction::Pause,
            Action::Stop => PlaybackAction::Stop,
        }
    }
}
