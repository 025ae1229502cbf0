//! Raw datagram transport seam

use std::cell::Cell;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

/// Datagram send/receive as the core needs it.
///
/// "Nothing ready" is `Ok(None)`, never an error.
pub trait Transport {
    fn send_to(&self, bytes: &[u8], addr: SocketAddr) -> io::Result<usize>;

    /// Receive one datagram if one is ready
    fn try_recv_from(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>>;

    /// Wait up to `timeout` for a datagram
    fn recv_timeout(&self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<(usize, SocketAddr)>>;
}

fn not_ready(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// Receive mode a socket was last put in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Nonblocking,
    Timeout(Duration),
}

/// [`Transport`] over a UDP socket.
///
/// The socket's blocking mode and read timeout are only changed when a call
/// needs a different one, so a loop that keeps polling the same way costs
/// one syscall per receive.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    mode: Cell<Option<Mode>>,
    mode_switches: Cell<u64>,
}

impl UdpTransport {
    pub fn new(socket: UdpSocket) -> Self {
        Self {
            socket,
            mode: Cell::new(None),
            mode_switches: Cell::new(0),
        }
    }

    pub fn socket(&self) -> &UdpSocket {
        &self.socket
    }

    pub fn into_inner(self) -> UdpSocket {
        self.socket
    }

    /// How many times the receive mode was changed on the socket
    pub fn mode_switches(&self) -> u64 {
        self.mode_switches.get()
    }

    fn set_mode(&self, mode: Mode) -> io::Result<()> {
        let current = self.mode.get();
        if current == Some(mode) {
            return Ok(());
        }
        match mode {
            Mode::Nonblocking => self.socket.set_nonblocking(true)?,
            Mode::Timeout(timeout) => {
                if !matches!(current, Some(Mode::Timeout(_))) {
                    self.socket.set_nonblocking(false)?;
                }
                self.socket.set_read_timeout(Some(timeout))?;
            }
        }
        self.mode.set(Some(mode));
        self.mode_switches.set(self.mode_switches.get() + 1);
        Ok(())
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        match self.socket.recv_from(buf) {
            Ok(received) => Ok(Some(received)),
            Err(e) if not_ready(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl From<UdpSocket> for UdpTransport {
    fn from(socket: UdpSocket) -> Self {
        Self::new(socket)
    }
}

impl Transport for UdpTransport {
    fn send_to(&self, bytes: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(bytes, addr)
    }

    fn try_recv_from(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        self.set_mode(Mode::Nonblocking)?;
        self.recv(buf)
    }

    fn recv_timeout(&self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<(usize, SocketAddr)>> {
        if timeout.is_zero() {
            return self.try_recv_from(buf);
        }
        self.set_mode(Mode::Timeout(timeout))?;
        self.recv(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn bound() -> UdpTransport {
        UdpTransport::new(UdpSocket::bind("127.0.0.1:0").unwrap())
    }

    #[test]
    fn test_udp_transport_roundtrip() {
        let a = bound();
        let b = bound();

        a.send_to(b"ping", b.socket().local_addr().unwrap()).unwrap();

        let mut buf = [0u8; 16];
        let (len, from) = b
            .recv_timeout(&mut buf, Duration::from_millis(500))
            .unwrap()
            .expect("datagram");
        assert_eq!(&buf[..len], b"ping");
        assert_eq!(from, a.socket().local_addr().unwrap());
    }

    #[test]
    fn test_nothing_ready_is_none() {
        let socket = bound();
        let mut buf = [0u8; 16];

        assert!(socket.try_recv_from(&mut buf).unwrap().is_none());

        let start = Instant::now();
        assert!(socket
            .recv_timeout(&mut buf, Duration::from_millis(20))
            .unwrap()
            .is_none());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_mode_set_only_on_change() {
        let socket = bound();
        let mut buf = [0u8; 16];

        for _ in 0..5 {
            assert!(socket.try_recv_from(&mut buf).unwrap().is_none());
        }
        assert_eq!(socket.mode_switches(), 1);

        let wait = Duration::from_millis(5);
        for _ in 0..3 {
            assert!(socket.recv_timeout(&mut buf, wait).unwrap().is_none());
        }
        assert_eq!(socket.mode_switches(), 2);

        let peer = bound();
        peer.send_to(b"x", socket.socket().local_addr().unwrap()).unwrap();
        assert!(socket
            .recv_timeout(&mut buf, Duration::from_secs(2))
            .unwrap()
            .is_some());
        assert_eq!(socket.mode_switches(), 3);

        // back to polling: an empty socket must not wait out the timeout
        let start = Instant::now();
        assert!(socket.try_recv_from(&mut buf).unwrap().is_none());
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(socket.mode_switches(), 4);
    }
}
