//! Per-request connections to the exchange.
//!
//! The recovery engine only sees [`Connector`] and [`Channel`]. A channel is
//! closed by dropping it, so every exit path of a request cycle releases its
//! socket without explicit close calls.
use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::config::ClientConfig;
use crate::packet::PACKET_LEN;

/// Opens a fresh channel for each request cycle.
pub trait Connector {
    type Channel: Channel;

    fn connect(&self) -> io::Result<Self::Channel>;
}

/// An ordered byte channel carrying one request and its response frames.
pub trait Channel {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read one complete frame.
    ///
    /// `Ok(None)` means end-of-stream: the peer closed, closed mid-frame, or
    /// the configured timeout expired. Partial frames are discarded.
    fn receive_frame(&mut self) -> io::Result<Option<[u8; PACKET_LEN]>>;
}

/// Connects over TCP, honouring the optional per-cycle timeout.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
    timeout: Option<Duration>,
}

impl TcpConnector {
    pub fn new(address: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self { address: address.into(), timeout }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.address(), config.timeout())
    }

    fn connect_addr(&self, addr: &SocketAddr) -> io::Result<TcpStream> {
        match self.timeout {
            Some(t) => TcpStream::connect_timeout(addr, t),
            None => TcpStream::connect(addr),
        }
    }
}

impl Connector for TcpConnector {
    type Channel = TcpChannel;

    fn connect(&self) -> io::Result<TcpChannel> {
        let mut last_err = None;
        for addr in self.address.to_socket_addrs()? {
            match self.connect_addr(&addr) {
                Ok(stream) => {
                    stream.set_read_timeout(self.timeout)?;
                    stream.set_write_timeout(self.timeout)?;
                    stream.set_nodelay(true)?;
                    return Ok(TcpChannel { stream });
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(ErrorKind::InvalidInput, format!("{} resolved to no addresses", self.address))
        }))
    }
}

pub struct TcpChannel {
    stream: TcpStream,
}

impl Channel for TcpChannel {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)?;
        self.stream.flush()
    }

    fn receive_frame(&mut self) -> io::Result<Option<[u8; PACKET_LEN]>> {
        read_frame(&mut self.stream)
    }
}

impl Drop for TcpChannel {
    fn drop(&mut self) {
        // The socket itself is released when `stream` drops.
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// Fill one frame from `r`, mapping EOF, short frames and timeouts to `None`.
pub fn read_frame<R: Read>(r: &mut R) -> io::Result<Option<[u8; PACKET_LEN]>> {
    let mut buf = [0u8; PACKET_LEN];
    let mut filled = 0usize;
    while filled < PACKET_LEN {
        match r.read(&mut buf[filled..]) {
            Ok(0) => return Ok(None),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => return Ok(None),
            Err(e) => return Err(e),
        }
    }
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Hands out the wrapped bytes a few at a time to mimic TCP segmentation.
    struct Trickle {
        data: Cursor<Vec<u8>>,
        chunk: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.chunk);
            self.data.read(&mut buf[..n])
        }
    }

    #[test]
    fn assembles_frames_split_across_reads() {
        let bytes: Vec<u8> = (0..(PACKET_LEN as u8 * 2)).collect();
        let mut r = Trickle { data: Cursor::new(bytes.clone()), chunk: 5 };
        let first = read_frame(&mut r).unwrap().unwrap();
        let second = read_frame(&mut r).unwrap().unwrap();
        assert_eq!(&first[..], &bytes[..PACKET_LEN]);
        assert_eq!(&second[..], &bytes[PACKET_LEN..]);
        assert!(read_frame(&mut r).unwrap().is_none());
    }

    #[test]
    fn short_tail_is_end_of_stream() {
        let mut r = Cursor::new(vec![1u8; PACKET_LEN + 9]);
        assert!(read_frame(&mut r).unwrap().is_some());
        assert!(read_frame(&mut r).unwrap().is_none());
    }

    #[test]
    fn timeout_is_end_of_stream() {
        struct Slow;
        impl Read for Slow {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::from(ErrorKind::WouldBlock))
            }
        }
        assert!(read_frame(&mut Slow).unwrap().is_none());
    }

    #[test]
    fn reset_is_an_error() {
        struct Reset;
        impl Read for Reset {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::from(ErrorKind::ConnectionReset))
            }
        }
        assert_eq!(read_frame(&mut Reset).unwrap_err().kind(), ErrorKind::ConnectionReset);
    }
}
