use std::sync::Arc;

use super::CastProtocol;
use crate::config::CastConfig;
use crate::error::{CastError, Result};
use crate::model::{CommandOutcome, Device, PlaybackAction};
use crate::transport::description::{fetch_description, DescriptionFetcher, HttpDescriptionFetcher};
use crate::transport::soap::{SoapClient, SoapRequest};

/// Drives the AVTransport service of a UPnP renderer with SOAP.
///
/// The control URL comes from the device when it is known, otherwise the
/// description document is fetched again. Without one, no request is sent.
pub struct UpnpClient {
  soap: SoapClient,
  fetcher: Arc<dyn DescriptionFetcher>,
}

impl UpnpClient {
  pub fn new(config: &CastConfig) -> Result<Self> {
    let soap = SoapClient::new(config.client.request_timeout())?;
    let fetcher = HttpDescriptionFetcher::new(config.discovery.description_timeout())?;
    Ok(Self::with_fetcher(soap, Arc::new(fetcher)))
  }

  pub fn with_fetcher(soap: SoapClient, fetcher: Arc<dyn DescriptionFetcher>) -> Self {
    Self { soap, fetcher }
  }

  fn resolve_control_url(&self, device: &Device) -> Result<String> {
    if let Some(url) = device.control_endpoint().map(str::trim).filter(|u| !u.is_empty()) {
      return Ok(url.to_string());
    }

    let location = device.description_location().ok_or(CastError::MissingControlUrl)?;
    log::debug!("re-resolving control URL of {} from {}", device.id(), location);
    fetch_description(self.fetcher.as_ref(), location)
      .and_then(|description| description.av_transport_control_url)
      .ok_or(CastError::MissingControlUrl)
  }

  fn invoke(&self, control_url: &str, request: SoapRequest) -> CommandOutcome {
    match self.soap.call(control_url, &request) {
      Ok(response) => {
        log::trace!("{} answered HTTP {}: {}", request.action, response.status, response.body);
        CommandOutcome::ok(format!("AVTransport {} ok", request.action))
      }
      Err(CastError::Status { status, body }) => {
        CommandOutcome::failed(format!("AVTransport {} failed HTTP {} {}", request.action, status, body))
      }
      Err(e) => CommandOutcome::failed(format!("AVTransport {} error: {}", request.action, e)),
    }
  }

  fn play_request() -> SoapRequest {
    SoapRequest::av_transport("Play", &[("Speed", "1")])
  }
}

impl CastProtocol for UpnpClient {
  /// `SetAVTransportURI` then `Play`; `Play` is only sent if the first call succeeded.
  fn send(&self, device: &Device, video_url: &str) -> CommandOutcome {
    let control_url = match self.resolve_control_url(device) {
      Ok(url) => url,
      Err(e) => return CommandOutcome::failed(e.to_string()),
    };

    let set_uri = self.invoke(
      &control_url,
      SoapRequest::av_transport("SetAVTransportURI", &[("CurrentURI", video_url), ("CurrentURIMetaData", "")]),
    );
    if !set_uri.success {
      return set_uri;
    }

    self.invoke(&control_url, Self::play_request())
  }

  fn control(&self, device: &Device, action: PlaybackAction) -> CommandOutcome {
    let control_url = match self.resolve_control_url(device) {
      Ok(url) => url,
      Err(e) => return CommandOutcome::failed(e.to_string()),
    };

    let request = match action {
      PlaybackAction::Play => Self::play_request(),
      PlaybackAction::Pause | PlaybackAction::Stop => SoapRequest::av_transport(action.soap_action(), &[]),
    };
    self.invoke(&control_url, request)
  }
}
