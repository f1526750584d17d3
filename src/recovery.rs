//! Gap recovery against the ABX exchange.
//!
//! A session has two phases. The stream phase sends one
//! [`Request::StreamAll`] and reads frames until the server closes. The
//! resend phase then walks the configured sequence range and, for each
//! sequence still absent, opens a fresh connection, sends one
//! [`Request::Resend`] and reads at most one frame.
//!
//! Only the initial stream connection (and its request write) can fail the
//! session. Everything after that is best effort: a mid-stream drop keeps what
//! arrived, and a failed resend cycle leaves just that sequence missing. No
//! sequence is requested more than once per session.
use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use crate::config::ClientConfig;
use crate::diag::DiagnosticLog;
use crate::packet::{Packet, Request};
use crate::packet_set::PacketSet;
use crate::transport::{Channel, Connector, TcpConnector};

/// How a single resend cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResendOutcome {
    /// The requested packet arrived and is in the set.
    Recovered,
    /// The server closed (or timed out) without sending the packet.
    NoData,
    /// Connect, send or read failed; the reason was logged.
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// Complete frames decoded during the stream phase.
    pub frames: usize,
    /// Transport error that cut the stream short, if any.
    pub interrupted: Option<String>,
}

/// Result of [`RecoveryEngine::run`].
#[derive(Debug, Clone)]
pub struct RecoverySession {
    pub packets: PacketSet,
    pub stream: StreamSummary,
    /// One entry per resend cycle, in request order.
    pub resends: Vec<(i32, ResendOutcome)>,
    pub elapsed: Duration,
}

impl RecoverySession {
    /// Sequences whose resend cycle did not produce the packet.
    pub fn unrecovered(&self) -> Vec<i32> {
        self.resends
            .iter()
            .filter(|(_, o)| *o != ResendOutcome::Recovered)
            .map(|(s, _)| *s)
            .collect()
    }
}

pub struct RecoveryEngine<C: Connector> {
    config: ClientConfig,
    connector: C,
    log: DiagnosticLog,
    packets: PacketSet,
}

impl RecoveryEngine<TcpConnector> {
    /// Engine talking TCP to `config.address()`.
    pub fn tcp(config: ClientConfig, log: DiagnosticLog) -> Self {
        let connector = TcpConnector::from_config(&config);
        Self::new(config, connector, log)
    }
}

impl<C: Connector> RecoveryEngine<C> {
    pub fn new(config: ClientConfig, connector: C, log: DiagnosticLog) -> Self {
        Self { config, connector, log, packets: PacketSet::new() }
    }

    pub fn packets(&self) -> &PacketSet {
        &self.packets
    }

    /// Stream phase. Errors only when the stream cannot be requested at all.
    pub fn request_stream(&mut self) -> Result<StreamSummary> {
        let mut channel = match self.connector.connect() {
            Ok(c) => c,
            Err(e) => {
                self.log.error(&format!("Connection failed: {e}"));
                return Err(e).with_context(|| format!("connect to {}", self.config.address()));
            }
        };
        if let Err(e) = channel.send(&Request::StreamAll.to_bytes()) {
            self.log.error(&format!("Failed to send request: {e}"));
            return Err(e).context("send stream request");
        }

        let mut summary = StreamSummary::default();
        loop {
            match channel.receive_frame() {
                Ok(Some(frame)) => {
                    self.packets.upsert(Packet::decode(&frame));
                    summary.frames += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    self.log.error(&format!("Stream interrupted after {} packets: {e}", summary.frames));
                    summary.interrupted = Some(e.to_string());
                    break;
                }
            }
        }
        Ok(summary)
    }

    /// Resend phase: one cycle per sequence in the expected range that is
    /// still absent when its turn comes.
    pub fn request_missing(&mut self) -> Vec<(i32, ResendOutcome)> {
        let mut outcomes = Vec::new();
        for seq in self.config.expected_range() {
            if self.packets.contains(seq) {
                continue;
            }
            let outcome = self.resend_one(seq);
            outcomes.push((seq, outcome));
        }
        outcomes
    }

    fn resend_one(&mut self, seq: i32) -> ResendOutcome {
        // ClientConfig keeps the range inside 0..=255.
        let Ok(wire_seq) = u8::try_from(seq) else {
            let msg = format!("Sequence {seq} does not fit a resend request");
            self.log.error(&msg);
            return ResendOutcome::Failed(msg);
        };

        let mut channel = match self.connector.connect() {
            Ok(c) => c,
            Err(e) => {
                let msg = format!("Connection failed for sequence {seq}: {e}");
                self.log.error(&msg);
                return ResendOutcome::Failed(msg);
            }
        };
        if let Err(e) = channel.send(&Request::Resend(wire_seq).to_bytes()) {
            let msg = format!("Failed to send request for sequence {seq}: {e}");
            self.log.error(&msg);
            return ResendOutcome::Failed(msg);
        }

        match channel.receive_frame() {
            Ok(Some(frame)) => {
                let packet = Packet::decode(&frame);
                self.packets.upsert(packet);
                if packet.sequence == seq {
                    ResendOutcome::Recovered
                } else {
                    self.log.error(&format!("Resend for sequence {seq} answered with sequence {}", packet.sequence));
                    ResendOutcome::NoData
                }
            }
            Ok(None) => ResendOutcome::NoData,
            Err(e) => {
                let msg = format!("Failed to read resend for sequence {seq}: {e}");
                self.log.error(&msg);
                ResendOutcome::Failed(msg)
            }
        }
    }

    /// Both phases, timed.
    pub fn run(mut self) -> Result<RecoverySession> {
        let start = Instant::now();
        let stream = self.request_stream()?;
        let resends = self.request_missing();
        Ok(RecoverySession {
            packets: self.packets,
            stream,
            resends,
            elapsed: start.elapsed(),
        })
    }
}
