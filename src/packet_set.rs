//! Packets collected during a recovery session, keyed by sequence number.
//!
//! A [`PacketSet`] only ever holds one packet per sequence number: inserting a
//! packet whose sequence is already present replaces the stored one. Iteration
//! is in ascending sequence order, which is also the output order.
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::packet::Packet;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PacketSet {
    packets: BTreeMap<i32, Packet>,
}

impl PacketSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by `packet.sequence`. Returns the previous packet, if any.
    pub fn upsert(&mut self, packet: Packet) -> Option<Packet> {
        self.packets.insert(packet.sequence, packet)
    }

    pub fn contains(&self, sequence: i32) -> bool {
        self.packets.contains_key(&sequence)
    }

    pub fn get(&self, sequence: i32) -> Option<&Packet> {
        self.packets.get(&sequence)
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Packets in ascending sequence order.
    pub fn iter(&self) -> impl Iterator<Item = &Packet> {
        self.packets.values()
    }

    /// Sequence numbers in `range` with no packet, ascending.
    pub fn missing(&self, range: RangeInclusive<i32>) -> Vec<i32> {
        range.filter(|s| !self.packets.contains_key(s)).collect()
    }
}

impl<'a> IntoIterator for &'a PacketSet {
    type Item = &'a Packet;
    type IntoIter = std::collections::btree_map::Values<'a, i32, Packet>;

    fn into_iter(self) -> Self::IntoIter {
        self.packets.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkt(sequence: i32, quantity: i32) -> Packet {
        Packet { symbol: *b"AMZN", side: b'B', quantity, price: 10, sequence }
    }

    #[test]
    fn upsert_replaces_same_sequence() {
        let mut set = PacketSet::new();
        assert!(set.upsert(pkt(3, 1)).is_none());
        let prev = set.upsert(pkt(3, 2));
        assert_eq!(prev.map(|p| p.quantity), Some(1));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(3).map(|p| p.quantity), Some(2));
    }

    #[test]
    fn size_bounded_by_distinct_sequences() {
        let mut set = PacketSet::new();
        for s in [5, 1, 5, 3, 1, 1] {
            set.upsert(pkt(s, s));
        }
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn iterates_in_ascending_order() {
        let mut set = PacketSet::new();
        for s in [4, 1, 3] {
            set.upsert(pkt(s, 0));
        }
        let seqs: Vec<i32> = set.iter().map(|p| p.sequence).collect();
        assert_eq!(seqs, vec![1, 3, 4]);
    }

    #[test]
    fn missing_lists_gaps_inside_range_only() {
        let mut set = PacketSet::new();
        for s in [1, 3, 4, 9] {
            set.upsert(pkt(s, 0));
        }
        assert_eq!(set.missing(1..=5), vec![2, 5]);
        assert!(PacketSet::new().missing(1..=0).is_empty());
    }
}
