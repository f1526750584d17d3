//! Client for the ABX exchange binary trade feed.
//!
//! The client streams every packet the exchange has, spots gaps in the
//! sequence numbers, asks for each missing packet on its own connection and
//! writes the reconciled set as JSON:
//!
//! - `packet`: 17-byte frame codec and the 2-byte request codec
//! - `packet_set`: packets keyed by sequence number, ascending
//! - `recovery`: the stream and resend phases and their failure handling
//! - `transport`: per-cycle TCP channels, closed on drop
//! - `config`: server address, expected sequence range, optional timeout
//! - `output`: the JSON document
//! - `diag`: timestamped append-only error log
//! - `sim`: a simulated exchange used by `feed_server` and the tests
//!
//! The binaries in this repository (`src/main.rs` and `src/bin/feed_server.rs`)
//! are thin wrappers over these modules.
pub mod config;
pub mod diag;
pub mod output;
pub mod packet;
pub mod packet_set;
pub mod recovery;
pub mod sim;
pub mod transport;

pub use config::ClientConfig;
pub use packet::{Packet, Request};
pub use packet_set::PacketSet;
pub use recovery::{RecoveryEngine, RecoverySession, ResendOutcome};
