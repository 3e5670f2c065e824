use std::time::Duration;

use serde_json::json;

use super::CastProtocol;
use crate::error::Result;
use crate::model::{CommandOutcome, Device, PlaybackAction};

/// JSON-over-HTTP client for receivers found through DNS-SD.
///
/// `POST /cast {"url": ...}` and `POST /control {"action": ...}`; any 2xx is
/// success and the message always carries `HTTP <status>: <body>`.
#[derive(Debug, Clone)]
pub struct RegistrationClient {
  http_client: reqwest::blocking::Client,
}

impl RegistrationClient {
  pub fn new(timeout: Duration) -> Result<Self> {
    let http_client = reqwest::blocking::Client::builder()
      .connect_timeout(timeout)
      .timeout(timeout)
      .build()?;

    Ok(Self { http_client })
  }

  fn post_json(&self, device: &Device, path: &str, payload: serde_json::Value) -> CommandOutcome {
    match self.try_post_json(device, path, &payload) {
      Ok(outcome) => outcome,
      Err(e) => {
        let message = e.to_string();
        if message.is_empty() {
          CommandOutcome::failed("request failed")
        } else {
          CommandOutcome::failed(message)
        }
      }
    }
  }

  fn try_post_json(&self, device: &Device, path: &str, payload: &serde_json::Value) -> Result<CommandOutcome> {
    let url = format!("{}{}", device.base_url(), path);

    let response = self.http_client.post(&url).json(payload).send()?;
    let status = response.status();
    let body = response.text()?;
    let message = format!("HTTP {}: {}", status.as_u16(), body);

    if status.is_success() {
      Ok(CommandOutcome::ok(message))
    } else {
      Ok(CommandOutcome::failed(message))
    }
  }
}

impl CastProtocol for RegistrationClient {
  fn send(&self, device: &Device, video_url: &str) -> CommandOutcome {
    self.post_json(device, "/cast", json!({ "url": video_url }))
  }

  fn control(&self, device: &Device, action: PlaybackAction) -> CommandOutcome {
    self.post_json(device, "/control", json!({ "action": action.wire_name() }))
  }
}
