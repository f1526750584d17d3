//! In-process simulated ABX exchange.
//!
//! Serves a fixed set of packets over the same 2-byte request / 17-byte frame
//! protocol the client speaks. Sequences can be withheld from the stream,
//! made unavailable for resend, and the stream can be cut mid-frame, which
//! covers every recovery path the client has. Connections are handled one at
//! a time on a background thread; dropping the [`FeedServer`] stops it.
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::io::{Read, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::packet::{Packet, Request, PACKET_LEN, REQUEST_LEN};

const SYMBOLS: [&[u8; 4]; 4] = [b"MSFT", b"AAPL", b"AMZN", b"META"];

/// What the simulated exchange knows and how it misbehaves.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    pub packets: Vec<Packet>,
    /// Left out of the stream response; still available for resend.
    pub withheld: BTreeSet<i32>,
    /// Never sent on resend (the connection closes with no bytes).
    pub unavailable: BTreeSet<i32>,
    /// Close the stream after this many frames, part-way through the next one.
    pub cut_stream_after: Option<usize>,
}

impl Feed {
    pub fn new(packets: Vec<Packet>) -> Self {
        Self { packets, ..Default::default() }
    }

    pub fn withhold(mut self, seqs: impl IntoIterator<Item = i32>) -> Self {
        self.withheld.extend(seqs);
        self
    }

    pub fn unavailable(mut self, seqs: impl IntoIterator<Item = i32>) -> Self {
        self.unavailable.extend(seqs);
        self
    }

    pub fn cut_stream_after(mut self, frames: usize) -> Self {
        self.cut_stream_after = Some(frames);
        self
    }

    fn stream_response(&self) -> Vec<u8> {
        let frames: Vec<[u8; PACKET_LEN]> = self
            .packets
            .iter()
            .filter(|p| !self.withheld.contains(&p.sequence))
            .map(Packet::encode)
            .collect();
        let mut out = Vec::with_capacity(frames.len() * PACKET_LEN);
        match self.cut_stream_after {
            Some(n) if n < frames.len() => {
                for f in &frames[..n] {
                    out.extend_from_slice(f);
                }
                out.extend_from_slice(&frames[n][..PACKET_LEN / 2]);
            }
            _ => frames.iter().for_each(|f| out.extend_from_slice(f)),
        }
        out
    }

    fn resend_response(&self, seq: u8) -> Vec<u8> {
        let seq = i32::from(seq);
        if self.unavailable.contains(&seq) {
            return Vec::new();
        }
        self.packets
            .iter()
            .find(|p| p.sequence == seq)
            .map(|p| p.encode().to_vec())
            .unwrap_or_default()
    }
}

/// Deterministic fixture feed with sequences `1..=count`.
pub fn fixture_packets(count: i32) -> Vec<Packet> {
    (1..=count)
        .map(|seq| {
            let i = (seq - 1) as usize;
            Packet {
                symbol: *SYMBOLS[i % SYMBOLS.len()],
                side: if seq % 2 == 1 { b'B' } else { b'S' },
                quantity: 10 * seq,
                price: 100 + 7 * seq,
                sequence: seq,
            }
        })
        .collect()
}

pub struct FeedServer {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    requests: Arc<Mutex<Vec<Request>>>,
    handle: Option<JoinHandle<()>>,
}

impl FeedServer {
    /// Bind `addr` (port 0 picks a free one) and start serving `feed`.
    pub fn start(addr: &str, feed: Feed) -> Result<Self> {
        let listener = TcpListener::bind(addr).with_context(|| format!("bind {addr}"))?;
        let addr = listener.local_addr()?;
        let stop = Arc::new(AtomicBool::new(false));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let (stop_rx, requests_tx) = (stop.clone(), requests.clone());
        let handle = std::thread::spawn(move || {
            for conn in listener.incoming() {
                if stop_rx.load(Ordering::SeqCst) {
                    break;
                }
                let stream = match conn {
                    Ok(s) => s,
                    Err(e) => {
                        eprintln!("feed server accept error: {e}");
                        continue;
                    }
                };
                if let Err(e) = serve(stream, &feed, &requests_tx) {
                    eprintln!("feed server connection error: {e:#}");
                }
            }
        });

        Ok(Self { addr, stop, requests, handle: Some(handle) })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Requests served so far, in arrival order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Drop for FeedServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // Wake the accept loop so it sees the flag.
        let mut wake = self.addr;
        if wake.ip().is_unspecified() {
            wake.set_ip(Ipv4Addr::LOCALHOST.into());
        }
        let _ = TcpStream::connect(wake);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

/// Handle one connection: read a request, record it, write the response, close.
fn serve(mut stream: TcpStream, feed: &Feed, requests: &Mutex<Vec<Request>>) -> Result<()> {
    let mut buf = [0u8; REQUEST_LEN];
    if stream.read_exact(&mut buf).is_err() {
        // Wake-up connects and clients that hang up early send nothing.
        return Ok(());
    }
    let req = Request::from_bytes(buf)?;
    if let Ok(mut log) = requests.lock() {
        log.push(req);
    }
    let body = match req {
        Request::StreamAll => feed.stream_response(),
        Request::Resend(seq) => feed.resend_response(seq),
    };
    stream.write_all(&body).context("write response")?;
    stream.flush()?;
    let _ = stream.shutdown(Shutdown::Write);
    Ok(())
}
