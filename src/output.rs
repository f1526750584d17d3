//! JSON document written at the end of a session.
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::packet::Packet;
use crate::packet_set::PacketSet;

pub const DEFAULT_OUT_FILE: &str = "abx_packets.json";

/// Output shape of one packet.
#[derive(Debug, Serialize)]
struct PacketDoc {
    symbol: String,
    buysellindicator: String,
    quantity: i32,
    price: i32,
    #[serde(rename = "packetSequence")]
    packet_sequence: i32,
}

impl From<&Packet> for PacketDoc {
    fn from(p: &Packet) -> Self {
        Self {
            symbol: p.symbol_str(),
            buysellindicator: p.side_str(),
            quantity: p.quantity,
            price: p.price,
            packet_sequence: p.sequence,
        }
    }
}

/// Serialize packets as a JSON array, in the order given, indented by four spaces.
pub fn write_json<'a, W, I>(w: W, packets: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a Packet>,
{
    let docs: Vec<PacketDoc> = packets.into_iter().map(PacketDoc::from).collect();
    let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(w, fmt);
    docs.serialize(&mut ser).context("serialize packets")?;
    Ok(())
}

/// Write the whole set to `path`, creating parent directories and replacing
/// any existing file.
pub fn save_json(path: &Path, packets: &PacketSet) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
        }
    }
    let file = File::create(path).with_context(|| format!("create {:?}", path))?;
    let mut w = BufWriter::new(file);
    write_json(&mut w, packets)?;
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_and_indentation() {
        let p = Packet { symbol: *b"MSFT", side: b'B', quantity: 50, price: 100, sequence: 1 };
        let mut buf = Vec::new();
        write_json(&mut buf, [&p]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let expected = "[\n    {\n        \"symbol\": \"MSFT\",\n        \"buysellindicator\": \"B\",\n        \"quantity\": 50,\n        \"price\": 100,\n        \"packetSequence\": 1\n    }\n]";
        assert_eq!(text, expected);
    }

    #[test]
    fn high_symbol_bytes_survive_serialization() {
        let p = Packet { symbol: [b'A', 0xe9, 0xff, b'Z'], side: 0xe9, quantity: 1, price: 2, sequence: 3 };
        let mut buf = Vec::new();
        write_json(&mut buf, [&p]).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let points: Vec<u32> = v[0]["symbol"].as_str().unwrap().chars().map(u32::from).collect();
        assert_eq!(points, vec![65, 233, 255, 90]);
        assert_eq!(v[0]["buysellindicator"], "\u{e9}");
    }

    #[test]
    fn empty_set_is_empty_array() {
        let mut buf = Vec::new();
        write_json(&mut buf, &PacketSet::new()).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "[]");
    }

    #[test]
    fn save_creates_parent_dirs_in_sequence_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("packets.json");
        let mut set = PacketSet::new();
        for s in [3, 1, 2] {
            set.upsert(Packet { symbol: *b"AAPL", side: b'S', quantity: s, price: s * 10, sequence: s });
        }
        save_json(&path, &set).unwrap();
        let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let seqs: Vec<i64> = v.as_array().unwrap().iter().map(|o| o["packetSequence"].as_i64().unwrap()).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(v[2]["price"], 30);
        assert_eq!(v[0]["buysellindicator"], "S");
    }
}
