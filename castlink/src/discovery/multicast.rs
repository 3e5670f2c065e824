use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::{DeviceSink, DiscoveryProbe};
use crate::config::DiscoveryConfig;
use crate::error::{CastError, Result};
use crate::model::Device;
use crate::transport::description::{endpoint_from_location, DescriptionFetcher, HttpDescriptionFetcher};
use crate::transport::ssdp::{SsdpClient, SsdpResponse, SsdpWaker};

/// Searches for UPnP media renderers with SSDP and enriches every reply with
/// the AVTransport control URL from its description document.
///
/// One scan is a fixed number of rounds; each round sends one M-SEARCH and
/// listens for the configured window. Devices are reported only after their
/// description fetch has completed.
pub struct MulticastDiscovery {
    config: DiscoveryConfig,
    fetcher: Arc<dyn DescriptionFetcher>,
    session: Mutex<Option<ScanSession>>,
}

struct ScanSession {
    running: Arc<AtomicBool>,
    waker: Option<SsdpWaker>,
    worker: Option<JoinHandle<()>>,
}

impl MulticastDiscovery {
    pub fn new(config: &DiscoveryConfig) -> Result<Self> {
        let fetcher = HttpDescriptionFetcher::new(config.description_timeout())?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    pub fn with_fetcher(config: &DiscoveryConfig, fetcher: Arc<dyn DescriptionFetcher>) -> Self {
        Self {
            config: config.clone(),
            fetcher,
            session: Mutex::new(None),
        }
    }

    /// True while the current scan still has rounds left
    pub fn is_running(&self) -> bool {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|session| session.running.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}

impl DiscoveryProbe for MulticastDiscovery {
    fn name(&self) -> &'static str {
        "multicast"
    }

    fn start(&self, sink: DeviceSink) -> Result<()> {
        self.stop();

        let client = SsdpClient::new(&self.config)
            .map_err(|e| CastError::Discovery(format!("failed to open SSDP socket: {}", e)))?;
        let waker = match client.waker() {
            Ok(waker) => Some(waker),
            Err(e) => {
                log::warn!("SSDP socket cannot be interrupted, stop will wait for the receive timeout: {}", e);
                None
            }
        };

        let running = Arc::new(AtomicBool::new(true));
        let scan = Scan {
            client,
            running: running.clone(),
            config: self.config.clone(),
            fetcher: self.fetcher.clone(),
            sink,
        };

        let worker = thread::Builder::new()
            .name("multicast-discovery".to_string())
            .spawn(move || scan.run())?;

        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(ScanSession {
            running,
            waker,
            worker: Some(worker),
        });
        Ok(())
    }

    /// Stops the scan and waits for the worker to finish its current step.
    ///
    /// A blocked receive is interrupted immediately. When called from inside
    /// the sink (on the worker itself) it only signals.
    fn stop(&self) {
        let session = self.session.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(mut session) = session else {
            return;
        };

        session.running.store(false, Ordering::SeqCst);
        if let Some(waker) = &session.waker {
            waker.wake();
        }

        if let Some(worker) = session.worker.take() {
            if worker.thread().id() != thread::current().id() && worker.join().is_err() {
                log::error!("multicast discovery worker panicked");
            }
        }
    }
}

impl Drop for MulticastDiscovery {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Everything the worker thread owns for one scan
struct Scan {
    client: SsdpClient,
    running: Arc<AtomicBool>,
    config: DiscoveryConfig,
    fetcher: Arc<dyn DescriptionFetcher>,
    sink: DeviceSink,
}

impl Scan {
    fn run(mut self) {
        let mut state = ScanState::default();

        for round in 1..=self.config.search_rounds {
            if !self.is_running() {
                break;
            }

            state.begin_round();
            if let Err(e) = self.client.search() {
                log::debug!("M-SEARCH round {} failed: {}", round, e);
            }

            let deadline = Instant::now() + self.config.search_window();
            while self.is_running() {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }

                match self.client.receive(deadline - now) {
                    Ok(Some(datagram)) => {
                        if !self.is_running() {
                            break;
                        }
                        if let Some(device) =
                            state.handle_datagram(&datagram, &self.config.device_category, self.fetcher.as_ref())
                        {
                            log::info!("multicast device found: {}", device);
                            (self.sink)(device);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        log::debug!("SSDP receive failed: {}", e);
                        thread::sleep(Duration::from_millis(50));
                    }
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        log::debug!("multicast scan finished");
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Per-scan dedup state.
///
/// A location is fetched at most once per scan once its description was
/// read. A failed fetch is skipped for the rest of its round and may be
/// retried if the device answers again in a later round.
#[derive(Debug, Default)]
struct ScanState {
    seen_locations: HashSet<String>,
    failed_this_round: HashSet<String>,
}

impl ScanState {
    fn begin_round(&mut self) {
        self.failed_this_round.clear();
    }

    /// Malformed or irrelevant datagrams yield `None` and are never surfaced.
    fn handle_datagram(
        &mut self,
        datagram: &[u8],
        device_category: &str,
        fetcher: &dyn DescriptionFetcher,
    ) -> Option<Device> {
        match self.process(datagram, device_category, fetcher) {
            Ok(device) => device,
            Err(e) => {
                log::debug!("dropping SSDP reply: {}", e);
                None
            }
        }
    }

    fn process(
        &mut self,
        datagram: &[u8],
        device_category: &str,
        fetcher: &dyn DescriptionFetcher,
    ) -> Result<Option<Device>> {
        let Ok(text) = std::str::from_utf8(datagram) else {
            return Ok(None);
        };
        let Some(response) = SsdpResponse::parse(text) else {
            return Ok(None);
        };
        if !response.is_usable(device_category) {
            return Ok(None);
        }

        let location = response.location.trim().to_string();
        if self.failed_this_round.contains(&location) || !self.seen_locations.insert(location.clone()) {
            return Ok(None);
        }

        log::debug!(
            "SSDP reply for {} from {}",
            location,
            response.server.as_deref().unwrap_or("unknown server")
        );
        let (host, port) = endpoint_from_location(&location)?;
        let description = match fetcher.fetch(&location) {
            Ok(description) => description,
            Err(e) => {
                self.seen_locations.remove(&location);
                self.failed_this_round.insert(location);
                return Err(e);
            }
        };

        Ok(Some(Device::multicast(
            description.udn.as_deref(),
            description.friendly_name.as_deref(),
            host,
            port,
            location,
            description.av_transport_control_url,
        )))
    }
}
