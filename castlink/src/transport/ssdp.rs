use std::collections::HashMap;
use std::io::{Error, ErrorKind};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use crate::config::DiscoveryConfig;

/// Relevant headers of one SSDP search reply
#[derive(Debug, Clone, PartialEq)]
pub struct SsdpResponse {
  pub location: String,
  pub search_target: String,
  pub usn: String,
  pub server: Option<String>,
}

impl SsdpResponse {
  /// Parse an HTTP-response-style SSDP reply.
  ///
  /// Returns `None` for anything that is not a response (NOTIFY, M-SEARCH,
  /// stray bytes). Missing headers are kept as empty strings; filtering is
  /// left to [`SsdpResponse::is_usable`].
  pub fn parse(response: &str) -> Option<Self> {
    let mut lines = response.lines();
    let status_line = lines.next()?.trim();
    if !status_line.to_ascii_uppercase().starts_with("HTTP/") {
      return None;
    }

    let headers = parse_headers(lines);
    let header = |name: &str| headers.get(name).cloned().unwrap_or_default();

    Some(SsdpResponse {
      location: header("location"),
      search_target: header("st"),
      usn: header("usn"),
      server: headers.get("server").cloned(),
    })
  }

  /// A reply is usable when it has a location and either `ST` or `USN`
  /// mentions the wanted device category.
  pub fn is_usable(&self, device_category: &str) -> bool {
    if self.location.trim().is_empty() {
      return false;
    }

    let category = device_category.to_ascii_lowercase();
    self.search_target.to_ascii_lowercase().contains(&category)
      || self.usn.to_ascii_lowercase().contains(&category)
  }
}

/// Lower-cased header name to trimmed value. Lines without a colon are skipped.
fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> HashMap<String, String> {
  let mut headers = HashMap::new();
  for line in lines {
    if let Some((key, value)) = line.split_once(':') {
      let key = key.trim();
      if key.is_empty() {
        continue;
      }
      headers.insert(key.to_ascii_lowercase(), value.trim().to_string());
    }
  }
  headers
}

/// Build the M-SEARCH request for `search_target`
pub fn build_search_request(multicast_address: &str, search_target: &str, mx: u8) -> String {
  format!(
    "M-SEARCH * HTTP/1.1\r\n\
      HOST: {}\r\n\
      MAN: \"ssdp:discover\"\r\n\
      MX: {}\r\n\
      ST: {}\r\n\
      \r\n",
    multicast_address, mx, search_target
  )
}

/// UDP socket used for one multicast scan
pub struct SsdpClient {
  socket: UdpSocket,
  multicast_address: SocketAddr,
  request: String,
  receive_timeout: Duration,
  buffer: [u8; 8192],
}

impl SsdpClient {
  pub fn new(config: &DiscoveryConfig) -> Result<Self, Error> {
    let multicast_address = config
      .multicast_address
      .to_socket_addrs()?
      .next()
      .ok_or_else(|| Error::new(ErrorKind::InvalidInput, "multicast address did not resolve"))?;

    let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))?;
    socket.set_read_timeout(Some(config.receive_timeout()))?;
    socket.set_multicast_loop_v4(true)?;
    socket.set_multicast_ttl_v4(2)?;

    Ok(Self {
      socket,
      multicast_address,
      request: build_search_request(&config.multicast_address, &config.search_target, config.mx),
      receive_timeout: config.receive_timeout(),
      buffer: [0; 8192],
    })
  }

  /// Send one M-SEARCH datagram to the multicast group
  pub fn search(&self) -> Result<(), Error> {
    self.socket.send_to(self.request.as_bytes(), self.multicast_address)?;
    Ok(())
  }

  /// Wait for one datagram, at most `min(limit, receive timeout)`.
  ///
  /// `Ok(None)` means the wait timed out.
  pub fn receive(&mut self, limit: Duration) -> Result<Option<Vec<u8>>, Error> {
    let wait = limit.min(self.receive_timeout).max(Duration::from_millis(1));
    self.socket.set_read_timeout(Some(wait))?;

    match self.socket.recv_from(&mut self.buffer) {
      Ok((size, _)) => Ok(Some(self.buffer[..size].to_vec())),
      Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => Ok(None),
      Err(e) => Err(e),
    }
  }

  /// Handle able to interrupt a blocked [`SsdpClient::receive`] from another thread
  pub fn waker(&self) -> Result<SsdpWaker, Error> {
    let port = self.socket.local_addr()?.port();
    Ok(SsdpWaker {
      socket: self.socket.try_clone()?,
      target: SocketAddr::from((Ipv4Addr::LOCALHOST, port)),
    })
  }
}

/// Sends a one-byte datagram to the scan socket's own port on loopback
pub struct SsdpWaker {
  socket: UdpSocket,
  target: SocketAddr,
}

impl SsdpWaker {
  pub fn wake(&self) {
    if let Err(e) = self.socket.send_to(&[0], self.target) {
      log::debug!("failed to wake SSDP receiver: {}", e);
    }
  }
}
