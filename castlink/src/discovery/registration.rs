use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};

use super::{DeviceSink, DiscoveryProbe};
use crate::config::DiscoveryConfig;
use crate::error::{CastError, Result};
use crate::model::Device;

/// Finds receivers advertising a fixed DNS-SD service type.
///
/// The mDNS daemon resolves advertisements on its own thread; every resolved
/// advertisement of the right type with at least one address becomes one
/// [`Device`]. Everything else is dropped without retry.
pub struct RegistrationDiscovery {
    service_type: String,
    session: Mutex<Option<BrowseSession>>,
}

struct BrowseSession {
    daemon: ServiceDaemon,
    _worker: JoinHandle<()>,
}

impl RegistrationDiscovery {
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            service_type: normalize_service_type(&config.service_type),
            session: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl DiscoveryProbe for RegistrationDiscovery {
    fn name(&self) -> &'static str {
        "registration"
    }

    fn start(&self, sink: DeviceSink) -> Result<()> {
        self.stop();

        let daemon = ServiceDaemon::new()
            .map_err(|e| CastError::Discovery(format!("failed to create mDNS daemon: {}", e)))?;

        let receiver = match daemon.browse(&self.service_type) {
            Ok(receiver) => receiver,
            Err(e) => {
                let _ = daemon.shutdown();
                return Err(CastError::Discovery(format!("failed to browse {}: {}", self.service_type, e)));
            }
        };

        let service_type = self.service_type.clone();
        let worker = thread::Builder::new()
            .name("registration-discovery".to_string())
            .spawn(move || {
                log::debug!("browsing for {}", service_type);
                let mut resolved = ResolvedServices::default();
                while let Ok(event) = receiver.recv() {
                    match event {
                        ServiceEvent::ServiceResolved(info) => {
                            if let Some(device) = resolved.first_resolution(&service_type, &info) {
                                log::info!("registration device resolved: {}", device);
                                sink(device);
                            }
                        }
                        ServiceEvent::SearchStopped(_) => break,
                        other => log::trace!("ignoring mDNS event {:?}", other),
                    }
                }
                log::debug!("stopped browsing for {}", service_type);
            })?;

        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(BrowseSession {
            daemon,
            _worker: worker,
        });
        Ok(())
    }

    fn stop(&self) {
        let session = self.session.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(session) = session else {
            return;
        };

        if let Err(e) = session.daemon.stop_browse(&self.service_type) {
            log::debug!("mDNS stop_browse failed: {}", e);
        }
        if let Err(e) = session.daemon.shutdown() {
            log::debug!("mDNS daemon shutdown failed: {}", e);
        }
    }
}

impl Drop for RegistrationDiscovery {
    fn drop(&mut self) {
        self.stop();
    }
}

/// mdns-sd expects fully qualified types such as `_screencast._tcp.local.`
fn normalize_service_type(service_type: &str) -> String {
    let trimmed = service_type.trim().trim_end_matches('.');
    if trimmed.ends_with(".local") {
        format!("{}.", trimmed)
    } else {
        format!("{}.local.", trimmed)
    }
}

/// Full names already reported in one browse session.
///
/// mdns-sd resolves an advertisement again when it gains addresses; only the
/// first usable resolution becomes a device.
#[derive(Debug, Default)]
struct ResolvedServices {
    fullnames: HashSet<String>,
}

impl ResolvedServices {
    fn first_resolution(&mut self, service_type: &str, info: &ServiceInfo) -> Option<Device> {
        if self.fullnames.contains(info.get_fullname()) {
            log::trace!("{} resolved again", info.get_fullname());
            return None;
        }
        let device = device_from_service(service_type, info)?;
        self.fullnames.insert(info.get_fullname().to_string());
        Some(device)
    }
}

/// Turn a resolved advertisement into a device, if it is usable
fn device_from_service(service_type: &str, info: &ServiceInfo) -> Option<Device> {
    if !info.get_type().eq_ignore_ascii_case(service_type) {
        log::debug!("dropping advertisement of unexpected type {}", info.get_type());
        return None;
    }

    let Some(address) = select_address(info.get_addresses().iter().copied()) else {
        log::debug!("dropping {} without a resolved address", info.get_fullname());
        return None;
    };

    let name = instance_name(info.get_fullname(), info.get_type());
    Some(Device::registration(Some(name), address.to_string(), info.get_port()))
}

/// Instance label of a DNS-SD full name (`Living Room._screencast._tcp.local.` -> `Living Room`)
fn instance_name<'a>(fullname: &'a str, service_type: &str) -> &'a str {
    fullname
        .strip_suffix(service_type)
        .unwrap_or(fullname)
        .trim_end_matches('.')
}

/// Prefer routable IPv4, then any IPv4, then whatever is left
fn select_address(addresses: impl IntoIterator<Item = IpAddr>) -> Option<IpAddr> {
    let mut addresses: Vec<IpAddr> = addresses.into_iter().collect();
    addresses.sort();

    let routable_v4 = addresses
        .iter()
        .find(|ip| matches!(ip, IpAddr::V4(v4) if !v4.is_loopback() && !v4.is_link_local()));
    let any_v4 = addresses.iter().find(|ip| ip.is_ipv4());

    routable_v4.or(any_v4).or(addresses.first()).copied()
}
