//! Unified dispatch of "send video" and "playback control" requests.
//!
//! Every call resolves to a [`CommandOutcome`]; nothing here returns an
//! error or panics on network failure.

pub mod registration;
pub mod upnp;

use crate::config::CastConfig;
use crate::error::Result;
use crate::model::{CommandOutcome, Device, PlaybackAction, Protocol};

pub use registration::RegistrationClient;
pub use upnp::UpnpClient;

/// One wire protocol able to drive a receiver.
///
/// Implementations are stateless per call, so one instance can serve
/// concurrent requests for different devices.
#[cfg_attr(test, mockall::automock)]
pub trait CastProtocol: Send + Sync {
    fn send(&self, device: &Device, video_url: &str) -> CommandOutcome;

    fn control(&self, device: &Device, action: PlaybackAction) -> CommandOutcome;
}

/// Routes each request to the protocol client matching `device.protocol()`
pub struct Dispatcher {
    registration: Box<dyn CastProtocol>,
    upnp: Box<dyn CastProtocol>,
}

impl Dispatcher {
    pub fn new(config: &CastConfig) -> Result<Self> {
        Ok(Self::with_clients(
            Box::new(RegistrationClient::new(config.client.request_timeout())?),
            Box::new(UpnpClient::new(config)?),
        ))
    }

    pub fn with_clients(registration: Box<dyn CastProtocol>, upnp: Box<dyn CastProtocol>) -> Self {
        Self { registration, upnp }
    }

    pub fn send(&self, device: &Device, video_url: &str) -> CommandOutcome {
        log::info!("sending {} to {}", video_url, device);
        let outcome = self.client_for(device.protocol()).send(device, video_url);
        log::debug!("send to {} -> {}", device.id(), outcome);
        outcome
    }

    pub fn control(&self, device: &Device, action: PlaybackAction) -> CommandOutcome {
        log::info!("{} on {}", action, device);
        let outcome = self.client_for(device.protocol()).control(device, action);
        log::debug!("{} on {} -> {}", action, device.id(), outcome);
        outcome
    }

    fn client_for(&self, protocol: Protocol) -> &dyn CastProtocol {
        match protocol {
            Protocol::Registration => self.registration.as_ref(),
            Protocol::Multicast => self.upnp.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    fn registration_device() -> Device {
        Device::registration(Some("Bedroom"), "192.168.1.30", 9000)
    }

    fn multicast_device() -> Device {
        Device::multicast(Some("uuid:tv"), Some("TV"), "192.168.1.5", 8080, "http://192.168.1.5:8080/desc.xml", None)
    }

    #[test]
    fn test_send_routes_by_protocol() {
        let mut registration = MockCastProtocol::new();
        registration
            .expect_send()
            .withf(|device, url| device.protocol() == Protocol::Registration && url == "http://host/v.mp4")
            .times(1)
            .returning(|_, _| CommandOutcome::ok("HTTP 200: ok"));
        let mut upnp = MockCastProtocol::new();
        upnp.expect_send()
            .withf(|device, _| device.protocol() == Protocol::Multicast)
            .times(1)
            .returning(|_, _| CommandOutcome::failed("AVTransport SetAVTransportURI failed HTTP 404 "));

        let dispatcher = Dispatcher::with_clients(Box::new(registration), Box::new(upnp));

        assert!(dispatcher.send(&registration_device(), "http://host/v.mp4").success);
        assert!(!dispatcher.send(&multicast_device(), "http://host/v.mp4").success);
    }

    #[test]
    fn test_control_routes_by_protocol() {
        let mut registration = MockCastProtocol::new();
        registration
            .expect_control()
            .with(mockall::predicate::always(), eq(PlaybackAction::Pause))
            .times(1)
            .returning(|_, _| CommandOutcome::ok("HTTP 200: paused"));
        let mut upnp = MockCastProtocol::new();
        upnp.expect_control()
            .with(mockall::predicate::always(), eq(PlaybackAction::Stop))
            .times(1)
            .returning(|_, _| CommandOutcome::ok("AVTransport Stop ok"));

        let dispatcher = Dispatcher::with_clients(Box::new(registration), Box::new(upnp));

        let paused = dispatcher.control(&registration_device(), PlaybackAction::Pause);
        let stopped = dispatcher.control(&multicast_device(), PlaybackAction::Stop);

        assert_eq!(paused, CommandOutcome::ok("HTTP 200: paused"));
        assert_eq!(stopped, CommandOutcome::ok("AVTransport Stop ok"));
    }

    #[test]
    fn test_dispatcher_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Dispatcher>();
    }
}
