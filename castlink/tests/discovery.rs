use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use castlink::discovery::DiscoveryProbe;
use castlink::{
    DeviceSink, Device, DiscoveryConfig, DiscoveryCoordinator, MulticastDiscovery, Protocol, Result,
};

const RENDERER_XML: &str = include_str!("fixtures/media_renderer.xml");

/// Answers every M-SEARCH it receives on loopback with `replies_per_search`
/// copies of the same reply.
struct FakeResponder {
    address: String,
    searches: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl FakeResponder {
    fn start(location: String, replies_per_search: usize) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.set_read_timeout(Some(Duration::from_millis(50))).unwrap();
        let address = socket.local_addr().unwrap().to_string();
        let searches = Arc::new(AtomicUsize::new(0));
        let running = Arc::new(AtomicBool::new(true));

        let worker = {
            let searches = searches.clone();
            let running = running.clone();
            thread::spawn(move || {
                let mut buffer = [0u8; 2048];
                while running.load(Ordering::SeqCst) {
                    let Ok((size, from)) = socket.recv_from(&mut buffer) else {
                        continue;
                    };
                    if !buffer[..size].starts_with(b"M-SEARCH") {
                        continue;
                    }
                    searches.fetch_add(1, Ordering::SeqCst);
                    let reply = format!(
                        "HTTP/1.1 200 OK\r\nCACHE-CONTROL: max-age=1800\r\nLOCATION: {}\r\nSERVER: Linux UPnP/1.0 Panel/55\r\nST: urn:schemas-upnp-org:device:MediaRenderer:1\r\nUSN: uuid:5f9ec1b3-ed59-1900-4530-00a0def7e3a1::urn:schemas-upnp-org:device:MediaRenderer:1\r\n\r\n",
                        location
                    );
                    for _ in 0..replies_per_search {
                        let _ = socket.send_to(reply.as_bytes(), from);
                    }
                }
            })
        };

        Self {
            address,
            searches,
            running,
            worker: Some(worker),
        }
    }

    fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

impl Drop for FakeResponder {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn loopback_config(address: &str) -> DiscoveryConfig {
    DiscoveryConfig {
        multicast_address: address.to_string(),
        search_window_ms: 300,
        receive_timeout_ms: 100,
        ..DiscoveryConfig::default()
    }
}

fn collecting_sink() -> (DeviceSink, Arc<Mutex<Vec<Device>>>) {
    let found = Arc::new(Mutex::new(Vec::new()));
    let sink_found = found.clone();
    let sink: DeviceSink = Arc::new(move |device| sink_found.lock().unwrap().push(device));
    (sink, found)
}

fn wait_until_idle(probe: &MulticastDiscovery, limit: Duration) {
    let deadline = Instant::now() + limit;
    while probe.is_running() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn test_multicast_scan_reports_renderer_once() {
    let mut server = mockito::Server::new();
    let description = server
        .mock("GET", "/desc.xml")
        .with_status(200)
        .with_header("content-type", "text/xml")
        .with_body(RENDERER_XML)
        .expect(1)
        .create();
    let responder = FakeResponder::start(format!("{}/desc.xml", server.url()), 2);

    let probe = MulticastDiscovery::new(&loopback_config(&responder.address)).unwrap();
    let (sink, found) = collecting_sink();
    probe.start(sink).unwrap();
    wait_until_idle(&probe, Duration::from_secs(5));

    assert!(!probe.is_running());
    assert_eq!(responder.searches(), 3);
    description.assert();

    let found = found.lock().unwrap();
    assert_eq!(found.len(), 1);
    let device = &found[0];
    assert_eq!(device.id().as_str(), "uuid:5f9ec1b3-ed59-1900-4530-00a0def7e3a1");
    assert_eq!(device.name(), "Living Room TV");
    assert_eq!(device.protocol(), Protocol::Multicast);
    assert_eq!(device.host(), "127.0.0.1");
    assert_eq!(device.control_endpoint(), Some(format!("{}/ctl/AVT", server.url()).as_str()));
}

#[test]
fn test_unreachable_description_is_never_reported() {
    let mut server = mockito::Server::new();
    let description = server.mock("GET", "/desc.xml").with_status(404).expect_at_least(1).create();
    let responder = FakeResponder::start(format!("{}/desc.xml", server.url()), 1);

    let probe = MulticastDiscovery::new(&loopback_config(&responder.address)).unwrap();
    let (sink, found) = collecting_sink();
    probe.start(sink).unwrap();
    wait_until_idle(&probe, Duration::from_secs(5));

    description.assert();
    assert!(found.lock().unwrap().is_empty());
}

#[test]
fn test_stop_interrupts_a_blocked_receive() {
    let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let config = DiscoveryConfig {
        multicast_address: silent.local_addr().unwrap().to_string(),
        search_window_ms: 10_000,
        receive_timeout_ms: 5_000,
        ..DiscoveryConfig::default()
    };

    let probe = MulticastDiscovery::new(&config).unwrap();
    let (sink, found) = collecting_sink();
    probe.start(sink).unwrap();
    thread::sleep(Duration::from_millis(200));
    assert!(probe.is_running());

    let started = Instant::now();
    probe.stop();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!probe.is_running());
    assert!(found.lock().unwrap().is_empty());
}

#[test]
fn test_restart_mid_scan_replaces_the_running_scan() {
    let mut server = mockito::Server::new();
    let description = server
        .mock("GET", "/desc.xml")
        .with_status(200)
        .with_body(RENDERER_XML)
        .expect(2)
        .create();
    let responder = FakeResponder::start(format!("{}/desc.xml", server.url()), 1);
    let probe = MulticastDiscovery::new(&loopback_config(&responder.address)).unwrap();

    let (first_sink, first_found) = collecting_sink();
    probe.start(first_sink).unwrap();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(responder.searches(), 1);

    let (second_sink, second_found) = collecting_sink();
    probe.start(second_sink).unwrap();
    assert!(probe.is_running());
    wait_until_idle(&probe, Duration::from_secs(5));

    assert!(!probe.is_running());
    assert_eq!(responder.searches(), 4);
    description.assert();
    assert_eq!(first_found.lock().unwrap().len(), 1);
    assert_eq!(second_found.lock().unwrap().len(), 1);
}

/// Emits its devices from a background thread, the way real probes do
struct BackgroundProbe {
    name: &'static str,
    devices: Vec<Device>,
}

impl DiscoveryProbe for BackgroundProbe {
    fn name(&self) -> &'static str {
        self.name
    }

    fn start(&self, sink: DeviceSink) -> Result<()> {
        let devices = self.devices.clone();
        thread::spawn(move || {
            for device in devices {
                sink(device);
            }
        });
        Ok(())
    }

    fn stop(&self) {}
}

#[test]
fn test_coordinator_keeps_same_host_from_both_probes() {
    let tv_registration = Device::registration(Some("Living Room TV"), "192.168.1.5", 8080);
    let tv_multicast = Device::multicast(
        Some("uuid:tv"),
        Some("Living Room TV"),
        "192.168.1.5",
        8080,
        "http://192.168.1.5:8080/desc.xml",
        Some("http://192.168.1.5:8080/ctl/AVT".to_string()),
    );
    let coordinator = DiscoveryCoordinator::with_probes(vec![
        Box::new(BackgroundProbe {
            name: "registration",
            devices: vec![tv_registration.clone(), tv_registration],
        }),
        Box::new(BackgroundProbe {
            name: "multicast",
            devices: vec![tv_multicast],
        }),
    ]);

    let mut devices = coordinator.discover_for(Duration::from_millis(300)).unwrap();
    devices.sort_by(|a, b| a.id().as_str().cmp(b.id().as_str()));

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].id().as_str(), "Living Room TV@192.168.1.5:8080");
    assert_eq!(devices[0].protocol(), Protocol::Registration);
    assert_eq!(devices[1].id().as_str(), "uuid:tv");
    assert_eq!(devices[1].protocol(), Protocol::Multicast);
}

#[test]
fn test_second_scan_reports_devices_again() {
    let tv = Device::registration(Some("Kitchen"), "192.168.1.9", 9000);
    let coordinator = DiscoveryCoordinator::with_probes(vec![Box::new(BackgroundProbe {
        name: "registration",
        devices: vec![tv],
    })]);

    assert_eq!(coordinator.discover_for(Duration::from_millis(200)).unwrap().len(), 1);
    assert_eq!(coordinator.discover_for(Duration::from_millis(200)).unwrap().len(), 1);
}
