use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use url::Url;

use crate::error::{CastError, Result};

/// What the multicast probe and the UPnP client need out of a device
/// description document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceDescription {
  pub udn: Option<String>,
  pub friendly_name: Option<String>,
  /// Absolute control URL of the first AVTransport service, if any
  pub av_transport_control_url: Option<String>,
}

/// Source of description documents, keyed by their `LOCATION` URL
#[cfg_attr(test, mockall::automock)]
pub trait DescriptionFetcher: Send + Sync {
  fn fetch(&self, location: &str) -> Result<DeviceDescription>;
}

/// Fetches description documents with a blocking HTTP GET
#[derive(Debug, Clone)]
pub struct HttpDescriptionFetcher {
  http_client: reqwest::blocking::Client,
}

impl HttpDescriptionFetcher {
  pub fn new(timeout: Duration) -> Result<Self> {
    let http_client = reqwest::blocking::Client::builder()
      .connect_timeout(timeout)
      .timeout(timeout)
      .build()?;

    Ok(Self { http_client })
  }
}

impl DescriptionFetcher for HttpDescriptionFetcher {
  fn fetch(&self, location: &str) -> Result<DeviceDescription> {
    let response = self.http_client.get(location).send()?;
    let status = response.status();
    let body = response.text()?;

    if !status.is_success() {
      return Err(CastError::Status { status: status.as_u16(), body });
    }

    parse_description(location, &body)
  }
}

/// Fetch a description, logging and discarding any failure
pub fn fetch_description(fetcher: &dyn DescriptionFetcher, location: &str) -> Option<DeviceDescription> {
  match fetcher.fetch(location) {
    Ok(description) => Some(description),
    Err(e) => {
      log::debug!("description fetch from {} failed: {}", location, e);
      None
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
  FriendlyName,
  Udn,
  ServiceType,
  ControlUrl,
}

/// Parse a UPnP device description.
///
/// Services are walked in document order and the first one whose
/// `serviceType` contains "AVTransport" wins; parsing stops there. A document
/// without any `device` element is rejected.
pub fn parse_description(location: &str, xml: &str) -> Result<DeviceDescription> {
  let mut reader = Reader::from_str(xml);
  let mut buffer = Vec::new();

  let mut description = DeviceDescription::default();
  let mut seen_device = false;
  let mut in_service = false;
  let mut service_type: Option<String> = None;
  let mut control_url: Option<String> = None;
  let mut field: Option<Field> = None;
  let mut text = String::new();

  loop {
    buffer.clear();
    match reader.read_event_into(&mut buffer)? {
      Event::Start(ref e) => {
        field = None;
        match e.local_name().as_ref() {
          b"device" => seen_device = true,
          b"service" => {
            in_service = true;
            service_type = None;
            control_url = None;
          }
          b"friendlyName" if description.friendly_name.is_none() => field = Some(Field::FriendlyName),
          b"UDN" if description.udn.is_none() => field = Some(Field::Udn),
          b"serviceType" if in_service => field = Some(Field::ServiceType),
          b"controlURL" if in_service => field = Some(Field::ControlUrl),
          _ => {}
        }
        text.clear();
      }
      Event::Text(e) => {
        if field.is_some() {
          text.push_str(&e.unescape()?);
        }
      }
      Event::CData(e) => {
        if field.is_some() {
          text.push_str(&String::from_utf8_lossy(&e));
        }
      }
      Event::End(ref e) => {
        if let Some(done) = field.take() {
          let value = Some(text.trim().to_string());
          match done {
            Field::FriendlyName => description.friendly_name = value,
            Field::Udn => description.udn = value,
            Field::ServiceType => service_type = value,
            Field::ControlUrl => control_url = value,
          }
          text.clear();
        }

        if e.local_name().as_ref() == b"service" {
          in_service = false;
          let is_av_transport = service_type
            .as_deref()
            .map(|t| t.to_ascii_lowercase().contains("avtransport"))
            .unwrap_or(false);

          if is_av_transport {
            description.av_transport_control_url =
              control_url.as_deref().and_then(|raw| resolve_control_url(location, raw));
            break;
          }
        }
      }
      Event::Eof => break,
      _ => {}
    }
  }

  if !seen_device {
    return Err(CastError::Xml("no device element in description".to_string()));
  }

  description.friendly_name = description.friendly_name.filter(|n| !n.is_empty());
  description.udn = description.udn.filter(|u| !u.is_empty());
  Ok(description)
}

/// Resolve a raw `controlURL` against the description location.
///
/// Absolute `http(s)` URLs are kept verbatim; anything else is treated as an
/// absolute path on the scheme, host and port of `location`.
pub fn resolve_control_url(location: &str, raw: &str) -> Option<String> {
  let raw = raw.trim();
  if raw.is_empty() {
    return None;
  }

  let lower = raw.to_ascii_lowercase();
  if lower.starts_with("http://") || lower.starts_with("https://") {
    return Some(raw.to_string());
  }

  let base = Url::parse(location).ok()?;
  let path = format!("/{}", raw.trim_start_matches('/'));
  base.join(&path).ok().map(|url| url.to_string())
}

/// Host and port of a `LOCATION` URL, port defaulting to the scheme's (80 for http)
pub fn endpoint_from_location(location: &str) -> Result<(String, u16)> {
  let invalid = |reason: &str| CastError::InvalidUrl {
    url: location.to_string(),
    reason: reason.to_string(),
  };

  let url = Url::parse(location).map_err(|e| invalid(&e.to_string()))?;
  let host = url.host_str().ok_or_else(|| invalid("no host"))?.to_string();
  let port = url.port_or_known_default().unwrap_or(80);

  Ok((host, port))
}
