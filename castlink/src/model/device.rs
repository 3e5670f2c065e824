use super::{DeviceId, Protocol};

/// Label used when a DNS-SD advertisement carries no instance name
pub const DEFAULT_REGISTRATION_NAME: &str = "Unknown";

/// Label used when a description document carries no `friendlyName`
pub const DEFAULT_MULTICAST_NAME: &str = "DLNA Renderer";

/// A playback receiver found by one of the discovery probes.
///
/// Built exactly once by the probe that found it and never mutated after
/// that, so it can be cloned and shared across threads freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
  id: DeviceId,
  name: String,
  host: String,
  port: u16,
  protocol: Protocol,
  description_location: Option<String>,
  control_endpoint: Option<String>,
}

impl Device {
  /// Device resolved from a DNS-SD advertisement
  pub fn registration(service_name: Option<&str>, host: impl Into<String>, port: u16) -> Self {
    let host = host.into();
    let name = non_blank(service_name).unwrap_or(DEFAULT_REGISTRATION_NAME).to_string();

    Self {
      id: DeviceId::for_registration(&name, &host, port),
      name,
      host,
      port,
      protocol: Protocol::Registration,
      description_location: None,
      control_endpoint: None,
    }
  }

  /// Device found by an SSDP search and enriched from its description document.
  ///
  /// The id is the UDN when present, otherwise it is synthesized from the endpoint.
  pub fn multicast(
    udn: Option<&str>,
    friendly_name: Option<&str>,
    host: impl Into<String>,
    port: u16,
    description_location: impl Into<String>,
    control_endpoint: Option<String>,
  ) -> Self {
    let host = host.into();
    let id = match non_blank(udn) {
      Some(udn) => DeviceId::new(udn),
      None => DeviceId::for_endpoint(&host, port),
    };

    Self {
      id,
      name: non_blank(friendly_name).unwrap_or(DEFAULT_MULTICAST_NAME).to_string(),
      host,
      port,
      protocol: Protocol::Multicast,
      description_location: Some(description_location.into()),
      control_endpoint,
    }
  }

  pub fn id(&self) -> &DeviceId {
    &self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn host(&self) -> &str {
    &self.host
  }

  pub fn port(&self) -> u16 {
    self.port
  }

  pub fn protocol(&self) -> Protocol {
    self.protocol
  }

  pub fn description_location(&self) -> Option<&str> {
    self.description_location.as_deref()
  }

  /// Cached AVTransport control URL. `None` means it must be resolved again
  /// from the description document before use.
  pub fn control_endpoint(&self) -> Option<&str> {
    self.control_endpoint.as_deref()
  }

  /// `http://host:port` of the device itself
  pub fn base_url(&self) -> String {
    if self.host.contains(':') {
      format!("http://[{}]:{}", self.host, self.port)
    } else {
      format!("http://{}:{}", self.host, self.port)
    }
  }
}

impl std::fmt::Display for Device {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} [{}] {}:{} ({})", self.name, self.protocol, self.host, self.port, self.id)
  }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
  value.map(str::trim).filter(|v| !v.is_empty())
}
