//! Wire codec for the ABX exchange feed.
//!
//! Every server-to-client message is a fixed 17-byte frame:
//! `[symbol:4][side:1][quantity:i32 BE][price:i32 BE][sequence:i32 BE]`.
//! There is no delimiter, so frame boundaries come from the size alone.
//!
//! Client-to-server messages are 2-byte [`Request`]s. The resend form carries
//! the sequence number in a single byte, which is why the client only accepts
//! expected ranges inside `0..=255` (see [`crate::config`]).
use anyhow::{bail, Result};

/// Size of one server frame in bytes.
pub const PACKET_LEN: usize = 17;

/// Size of one client request in bytes.
pub const REQUEST_LEN: usize = 2;

/// Request type tag: stream every available packet.
pub const REQ_STREAM_ALL: u8 = 0x01;
/// Request type tag: resend one packet by sequence number.
pub const REQ_RESEND: u8 = 0x02;

/// One decoded trade packet.
///
/// Field contents are kept verbatim; nothing here checks that `side` is
/// `b'B'` or `b'S'` or that `symbol` is printable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub symbol: [u8; 4],
    pub side: u8,
    pub quantity: i32,
    pub price: i32,
    pub sequence: i32,
}

impl Packet {
    /// Decode a complete frame. Infallible: the array type already guarantees
    /// the length, and no field is validated.
    pub fn decode(frame: &[u8; PACKET_LEN]) -> Self {
        let read_i32 = |o: usize| -> i32 {
            let mut tmp = [0u8; 4];
            tmp.copy_from_slice(&frame[o..o + 4]);
            i32::from_be_bytes(tmp)
        };
        let mut symbol = [0u8; 4];
        symbol.copy_from_slice(&frame[0..4]);
        Self {
            symbol,
            side: frame[4],
            quantity: read_i32(5),
            price: read_i32(9),
            sequence: read_i32(13),
        }
    }

    /// Encode into the 17-byte wire form. Used by the simulated exchange.
    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let mut out = [0u8; PACKET_LEN];
        out[0..4].copy_from_slice(&self.symbol);
        out[4] = self.side;
        out[5..9].copy_from_slice(&self.quantity.to_be_bytes());
        out[9..13].copy_from_slice(&self.price.to_be_bytes());
        out[13..17].copy_from_slice(&self.sequence.to_be_bytes());
        out
    }

    /// Symbol as text, one char per byte (Latin-1), so every byte value
    /// survives and maps back to the wire.
    pub fn symbol_str(&self) -> String {
        self.symbol.iter().map(|&b| char::from(b)).collect()
    }

    /// Buy/sell indicator as a one-character string.
    pub fn side_str(&self) -> String {
        char::from(self.side).to_string()
    }
}

/// Client request sent as the first and only write on a fresh connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Ask for the full packet stream.
    StreamAll,
    /// Ask for a single packet by (one-byte) sequence number.
    Resend(u8),
}

impl Request {
    pub fn to_bytes(self) -> [u8; REQUEST_LEN] {
        match self {
            Request::StreamAll => [REQ_STREAM_ALL, 0x00],
            Request::Resend(seq) => [REQ_RESEND, seq],
        }
    }

    /// Parse a request as the exchange side sees it. The second byte of a
    /// stream request is ignored.
    pub fn from_bytes(bytes: [u8; REQUEST_LEN]) -> Result<Self> {
        match bytes[0] {
            REQ_STREAM_ALL => Ok(Request::StreamAll),
            REQ_RESEND => Ok(Request::Resend(bytes[1])),
            other => bail!("unknown request type {:#04x}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Packet {
        Packet { symbol: *b"MSFT", side: b'B', quantity: 50, price: 100, sequence: 1 }
    }

    #[test]
    fn decode_reads_big_endian_fields() {
        let frame: [u8; PACKET_LEN] = [
            b'A', b'A', b'P', b'L', b'S',
            0x00, 0x00, 0x01, 0x2c, // 300
            0x00, 0x01, 0x86, 0xa0, // 100_000
            0x00, 0x00, 0x00, 0x0e, // 14
        ];
        let p = Packet::decode(&frame);
        assert_eq!(&p.symbol, b"AAPL");
        assert_eq!(p.side, b'S');
        assert_eq!(p.quantity, 300);
        assert_eq!(p.price, 100_000);
        assert_eq!(p.sequence, 14);
    }

    #[test]
    fn decode_handles_negative_values() {
        let mut frame = sample().encode();
        frame[5..9].copy_from_slice(&[0xff, 0xff, 0xff, 0xfe]);
        frame[13..17].copy_from_slice(&i32::MIN.to_be_bytes());
        let p = Packet::decode(&frame);
        assert_eq!(p.quantity, -2);
        assert_eq!(p.sequence, i32::MIN);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let p = Packet { symbol: *b"META", side: b'S', quantity: -7, price: i32::MAX, sequence: 255 };
        assert_eq!(Packet::decode(&p.encode()), p);
    }

    #[test]
    fn fields_pass_through_unvalidated() {
        let p = Packet { symbol: [0x00, 0xff, b'x', 0x7f], side: b'?', quantity: 0, price: 0, sequence: 3 };
        let back = Packet::decode(&p.encode());
        assert_eq!(back.symbol, [0x00, 0xff, b'x', 0x7f]);
        assert_eq!(back.side_str(), "?");
        let points: Vec<u32> = back.symbol_str().chars().map(u32::from).collect();
        assert_eq!(points, vec![0x00, 0xff, u32::from(b'x'), 0x7f]);
    }

    #[test]
    fn high_bytes_map_the_same_in_symbol_and_side() {
        let p = Packet { symbol: [b'A', 0xe9, 0xff, b'Z'], side: 0xe9, quantity: 1, price: 1, sequence: 1 };
        let points: Vec<u32> = p.symbol_str().chars().map(u32::from).collect();
        assert_eq!(points, vec![65, 233, 255, 90]);
        assert_eq!(p.side_str(), "\u{e9}");
        let bytes: Vec<u8> = p.symbol_str().chars().map(|c| c as u8).collect();
        assert_eq!(bytes, p.symbol.to_vec());
    }

    #[test]
    fn request_bytes() {
        assert_eq!(Request::StreamAll.to_bytes(), [0x01, 0x00]);
        assert_eq!(Request::Resend(14).to_bytes(), [0x02, 14]);
        assert_eq!(Request::from_bytes([0x01, 0x99]).unwrap(), Request::StreamAll);
        assert_eq!(Request::from_bytes([0x02, 7]).unwrap(), Request::Resend(7));
        assert!(Request::from_bytes([0x03, 0]).is_err());
    }
}
