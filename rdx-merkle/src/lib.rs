//! RFC 7574 peak-hash Merkle accumulator (spec §4.4) and the `Sha256`
//! digest newtype it is built from.
//!
//! Grounded on `fuel-merkle::binary`, whose `MerkleRootCalculator` keeps a
//! `Vec<Node>` stack and merges equal-height neighbours on push. The
//! peak-hash line here is the same idea specialized to a fixed 64-slot
//! binomial accumulator: slot `i` holds at most one partial hash of
//! "height" `i`, and two partials of the same height always fold together
//! before a new leaf is placed.

use std::fmt;

use sha2::{Digest, Sha256 as Sha256Hasher};
use thiserror::Error;

pub const DIGEST_LEN: usize = 32;
/// Number of slots in the peak-hash line; also the hard cap on brick count
/// a single Merkle identity can span (spec §4.4).
pub const PEAK_SLOTS: usize = 64;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("malformed SHA-256 hex digest")]
    BadHex,
    #[error("peak-hash line exhausted (more than 2^64 pages)")]
    OutOfRange,
}

/// A 32-byte SHA-256 digest, used both as a page hash and as a brick's
/// content-addressed identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sha256(pub [u8; DIGEST_LEN]);

impl Sha256 {
    pub const ZERO: Sha256 = Sha256([0u8; DIGEST_LEN]);

    pub fn of(data: &[u8]) -> Sha256 {
        let mut hasher = Sha256Hasher::new();
        hasher.update(data);
        let out = hasher.finalize();
        let mut bytes = [0u8; DIGEST_LEN];
        bytes.copy_from_slice(&out);
        Sha256(bytes)
    }

    /// `SHA-256(self ++ other)`, the peak-hash line's fold operation.
    pub fn merge2(&self, other: &Sha256) -> Sha256 {
        let mut hasher = Sha256Hasher::new();
        hasher.update(self.0);
        hasher.update(other.0);
        let out = hasher.finalize();
        let mut bytes = [0u8; DIGEST_LEN];
        bytes.copy_from_slice(&out);
        Sha256(bytes)
    }

    pub const fn is_zero(&self) -> bool {
        let mut i = 0;
        while i < DIGEST_LEN {
            if self.0[i] != 0 {
                return false;
            }
            i += 1;
        }
        true
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(text: &str) -> Result<Sha256, Error> {
        let decoded = hex::decode(text).map_err(|_| Error::BadHex)?;
        let bytes: [u8; DIGEST_LEN] = decoded.try_into().map_err(|_| Error::BadHex)?;
        Ok(Sha256(bytes))
    }
}

impl fmt::Debug for Sha256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha256({})", self.to_hex())
    }
}

impl fmt::Display for Sha256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// A binomial-tree Merkle accumulator over up to 2^64 pushed hashes (spec
/// §4.4). `append` folds equal-height partials as they collide; `sum`
/// produces the final brick identity by hashing all 64 slots, empty ones
/// standing in as 32 zero bytes.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeakLine {
    slots: [Sha256; PEAK_SLOTS],
    occupied: u64,
}

impl Default for PeakLine {
    fn default() -> Self {
        PeakLine {
            slots: [Sha256::ZERO; PEAK_SLOTS],
            occupied: 0,
        }
    }
}

impl PeakLine {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_occupied(&self, i: usize) -> bool {
        self.occupied & (1 << i) != 0
    }

    fn set_occupied(&mut self, i: usize, on: bool) {
        if on {
            self.occupied |= 1 << i;
        } else {
            self.occupied &= !(1 << i);
        }
    }

    /// Folds `next` into the line, carrying through any occupied slots of
    /// lower height exactly like binary addition with carry.
    pub fn append(&mut self, next: Sha256) -> Result<(), Error> {
        let mut p = next;
        let mut i = 0;
        while i < PEAK_SLOTS && self.is_occupied(i) {
            p = self.slots[i].merge2(&p);
            self.slots[i] = Sha256::ZERO;
            self.set_occupied(i, false);
            i += 1;
        }
        if i == PEAK_SLOTS {
            return Err(Error::OutOfRange);
        }
        self.slots[i] = p;
        self.set_occupied(i, true);
        Ok(())
    }

    /// The accumulator's current identity: SHA-256 over all 64 slots
    /// concatenated in order, empty slots contributing 32 zero bytes.
    pub fn sum(&self) -> Sha256 {
        let mut hasher = Sha256Hasher::new();
        for slot in &self.slots {
            hasher.update(slot.0);
        }
        let out = hasher.finalize();
        let mut bytes = [0u8; DIGEST_LEN];
        bytes.copy_from_slice(&out);
        Sha256(bytes)
    }

    pub fn slots(&self) -> impl Iterator<Item = &Sha256> {
        self.slots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_line_sum_is_hash_of_zero_slots() {
        let line = PeakLine::new();
        let expected = Sha256::of(&[0u8; DIGEST_LEN * PEAK_SLOTS]);
        assert_eq!(line.sum(), expected);
    }

    #[test]
    fn append_is_deterministic_for_same_sequence() {
        let mut a = PeakLine::new();
        let mut b = PeakLine::new();
        for i in 0..37u8 {
            let h = Sha256::of(&[i; 4]);
            a.append(h).unwrap();
            b.append(h).unwrap();
        }
        assert_eq!(a.sum(), b.sum());
    }

    #[test]
    fn append_order_matters_like_a_real_tree() {
        let mut a = PeakLine::new();
        let mut b = PeakLine::new();
        let h1 = Sha256::of(b"one");
        let h2 = Sha256::of(b"two");
        a.append(h1).unwrap();
        a.append(h2).unwrap();
        b.append(h2).unwrap();
        b.append(h1).unwrap();
        assert_ne!(a.sum(), b.sum());
    }

    #[test]
    fn hex_round_trip() {
        let h = Sha256::of(b"round trip me");
        let text = h.to_hex();
        assert_eq!(Sha256::from_hex(&text).unwrap(), h);
    }
}
