use serde::{Deserialize, Serialize};

/// Which discovery mechanism produced a device, and therefore which wire
/// protocol drives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Found through DNS-SD service registration; driven with JSON over HTTP.
    Registration,
    /// Found through an SSDP multicast search; driven with UPnP AVTransport SOAP.
    Multicast,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Registration => "registration",
            Protocol::Multicast => "multicast",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
