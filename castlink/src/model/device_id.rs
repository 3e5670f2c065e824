use serde::{Deserialize, Serialize};

/// Session-unique identity of a discovered receiver.
///
/// Two devices with equal ids are the same receiver and are reported once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  /// Id of a registration advertisement: instance name plus resolved endpoint
  pub fn for_registration(service_name: &str, host: &str, port: u16) -> Self {
    Self(format!("{}@{}:{}", service_name, host, port))
  }

  /// Id synthesized for a multicast device whose description carried no UDN
  pub fn for_endpoint(host: &str, port: u16) -> Self {
    Self(format!("upnp-{}:{}", host, port))
  }

  /// Returns the ID as a string slice
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for DeviceId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl AsRef<str> for DeviceId {
  fn as_ref(&self) -> &str {
    &self.0
  }
}
