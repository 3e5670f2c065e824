use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Transport commands accepted by both protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackAction {
    Play,
    Pause,
    Stop,
}

impl PlaybackAction {
    /// Name used in the `{"action": ...}` body of the registration protocol
    pub fn wire_name(&self) -> &'static str {
        match self {
            PlaybackAction::Play => "play",
            PlaybackAction::Pause => "pause",
            PlaybackAction::Stop => "stop",
        }
    }

    /// AVTransport SOAP action name
    pub fn soap_action(&self) -> &'static str {
        match self {
            PlaybackAction::Play => "Play",
            PlaybackAction::Pause => "Pause",
            PlaybackAction::Stop => "Stop",
        }
    }
}

impl FromStr for PlaybackAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "play" => Ok(PlaybackAction::Play),
            "pause" => Ok(PlaybackAction::Pause),
            "stop" => Ok(PlaybackAction::Stop),
            other => Err(format!("unknown playback action: {}", other)),
        }
    }
}

impl std::fmt::Display for PlaybackAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_and_soap_names() {
        assert_eq!(PlaybackAction::Play.wire_name(), "play");
        assert_eq!(PlaybackAction::Pause.wire_name(), "pause");
        assert_eq!(PlaybackAction::Stop.wire_name(), "stop");
        assert_eq!(PlaybackAction::Play.soap_action(), "Play");
        assert_eq!(PlaybackAction::Pause.soap_action(), "Pause");
        assert_eq!(PlaybackAction::Stop.soap_action(), "Stop");
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("PAUSE".parse::<PlaybackAction>(), Ok(PlaybackAction::Pause));
        assert_eq!(" play ".parse::<PlaybackAction>(), Ok(PlaybackAction::Play));
        assert!("rewind".parse::<PlaybackAction>().is_err());
    }
}
