use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::{DeviceSink, DiscoveryProbe, MulticastDiscovery, RegistrationDiscovery};
use crate::config::DiscoveryConfig;
use crate::error::{CastError, Result};
use crate::model::{Device, DeviceId};

/// Runs every probe at once and forwards each uniquely identified device to a
/// single callback.
///
/// Dedup is by [`DeviceId`] and scoped to one scan: every `start` hands the
/// probes a sink with its own seen set, so late events from a previous scan
/// never touch the current one. Devices from different probes are never
/// merged, even when they point at the same host.
pub struct DiscoveryCoordinator {
    probes: Vec<Box<dyn DiscoveryProbe>>,
}

impl DiscoveryCoordinator {
    /// Coordinator with the DNS-SD and SSDP probes
    pub fn new(config: &DiscoveryConfig) -> Result<Self> {
        let probes: Vec<Box<dyn DiscoveryProbe>> = vec![
            Box::new(RegistrationDiscovery::new(config)),
            Box::new(MulticastDiscovery::new(config)?),
        ];
        Ok(Self::with_probes(probes))
    }

    pub fn with_probes(probes: Vec<Box<dyn DiscoveryProbe>>) -> Self {
        Self { probes }
    }

    /// Start a fresh scan, restarting any probe that is still running.
    ///
    /// A probe that fails to start is logged and skipped; this only fails
    /// when no probe could be started.
    pub fn start<F>(&self, on_found: F) -> Result<()>
    where
        F: Fn(Device) + Send + Sync + 'static,
    {
        self.stop();

        let sink = dedup_sink(Arc::new(on_found));
        let mut failures = Vec::new();

        for probe in &self.probes {
            match probe.start(sink.clone()) {
                Ok(()) => log::debug!("{} discovery started", probe.name()),
                Err(e) => {
                    log::warn!("{} discovery failed to start: {}", probe.name(), e);
                    failures.push(format!("{}: {}", probe.name(), e));
                }
            }
        }

        if !self.probes.is_empty() && failures.len() == self.probes.len() {
            return Err(CastError::Discovery(failures.join("; ")));
        }
        Ok(())
    }

    pub fn stop(&self) {
        for probe in &self.probes {
            probe.stop();
        }
    }

    /// Scan for `duration`, then stop and return everything found
    pub fn discover_for(&self, duration: Duration) -> Result<Vec<Device>> {
        let (sender, receiver) = mpsc::channel();
        self.start(move |device| {
            let _ = sender.send(device);
        })?;

        let mut devices = Vec::new();
        let deadline = Instant::now() + duration;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match receiver.recv_timeout(deadline - now) {
                Ok(device) => devices.push(device),
                Err(mpsc::RecvTimeoutError::Timeout) => break,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }

        self.stop();
        devices.extend(receiver.try_iter());
        Ok(devices)
    }
}

/// Wrap `on_found` so each id passes once; callback panics are logged and swallowed
fn dedup_sink(on_found: DeviceSink) -> DeviceSink {
    let seen: Mutex<HashSet<DeviceId>> = Mutex::new(HashSet::new());
    Arc::new(move |device: Device| {
        let first_sighting = seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(device.id().clone());
        if !first_sighting {
            log::trace!("already reported {}", device.id());
            return;
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| on_found(device)));
        if result.is_err() {
            log::error!("device callback panicked");
        }
    })
}

impl Drop for DiscoveryCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}
