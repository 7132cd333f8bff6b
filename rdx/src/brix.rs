//! The brix view (spec §3.5, §4.11–§4.12): a chain of bricks linked by
//! base-hash dependency, read as one causally-merged whole.
//!
//! Grounded on `fuel-merkle`'s "storage is a chain of append-only backing
//! stores" shape, generalized here from one backing store to a bounded
//! chain of immutable [`BrickReader`]s.

use std::fs;
use std::path::{Path, PathBuf};

use rdx_merkle::Sha256;
use rdx_types::Id;

use crate::brick::{BrickReader, BrickWriter, Scan};
use crate::codec::read_rdx;
use crate::error::{Error, Result};
use crate::heap::Entry;
use crate::merge::merge_tie_group;
use crate::options::{BrickWriterOptions, BrixOptions};

/// An ordered chain of bricks, oldest (the ultimate base) first, newest
/// last. Every `get`/scan merges across the whole chain.
pub struct Brix {
    dir: PathBuf,
    bricks: Vec<(Sha256, BrickReader<fs::File>)>,
    options: BrixOptions,
}

impl Brix {
    /// Opens the chain ending at `hash`: recursively follows `meta[0]`
    /// (the base) until a zero hash, then returns the chain oldest→newest
    /// (spec §4.11).
    pub fn open_by_hash(dir: &Path, hash: Sha256, options: BrixOptions) -> Result<Brix> {
        let bricks = open_chain(dir, hash, &options, 0)?;
        Ok(Brix { dir: dir.to_path_buf(), bricks, options })
    }

    /// Resolves a short hex prefix to a full hash via directory scan
    /// (spec §6.2 `find_by_hashlet`), then opens its chain.
    pub fn open_by_hashlet(dir: &Path, prefix: &str, options: BrixOptions) -> Result<Brix> {
        let hex = rdx_storage::find_by_hashlet(dir, prefix)?;
        let hash = Sha256::from_hex(&hex)?;
        Brix::open_by_hash(dir, hash, options)
    }

    /// Point read across the chain (spec §4.11): gathers every brick's
    /// non-`NotFound` result, then resolves 0/1/many via the same
    /// tie-group rule the merge engine uses inside a container.
    pub fn get(&mut self, id: Id) -> Result<Vec<u8>> {
        let mut found = Vec::new();
        for (_, brick) in self.bricks.iter_mut() {
            match brick.read_record(id) {
                Ok(bytes) => found.push(bytes),
                Err(Error::NotFound) => {}
                Err(e) => return Err(e),
            }
        }
        match found.len() {
            0 => Err(Error::NotFound),
            1 => Ok(found.pop().expect("length checked above")),
            _ => {
                let parsed: Vec<_> = found
                    .iter()
                    .map(|bytes| read_rdx(bytes).map(|r| r.expect("point read returns a full record")))
                    .collect::<Result<_>>()?;
                let entries: Vec<Entry<'_>> = parsed
                    .into_iter()
                    .zip(found.iter())
                    .map(|(rdx, raw)| Entry { rdx, last: &raw[..] })
                    .collect();
                let mut out = Vec::new();
                merge_tie_group(&entries, &mut out)?;
                Ok(out)
            }
        }
    }

    /// A scan across the whole chain, merging tied records from different
    /// bricks as they're produced (spec §4.11).
    pub fn iterator(&self) -> Result<BrixScan<'_>> {
        if self.bricks.len() > self.options.max_chain_len {
            return Err(Error::TooManyBrix { limit: self.options.max_chain_len });
        }
        let lanes = self
            .bricks
            .iter()
            .map(|(_, brick)| Lane { scan: brick.scan(), peeked: None, done: false })
            .collect();
        Ok(BrixScan { lanes })
    }

    /// Compacts the whole chain into one new brick whose meta lists every
    /// input brick's hash as a dependency (spec §4.12). Unlinks the temp
    /// file on any error.
    pub fn join(&self) -> Result<Sha256> {
        let meta: Vec<Sha256> = self.bricks.iter().map(|(hash, _)| *hash).collect();
        let mut writer = BrickWriter::create(&self.dir, meta, BrickWriterOptions::default())?;
        let mut scan = match self.iterator() {
            Ok(scan) => scan,
            Err(e) => {
                writer.unlink()?;
                return Err(e);
            }
        };
        loop {
            match scan.read() {
                Ok(Some(bytes)) => {
                    if let Err(e) = writer.write(&bytes) {
                        writer.unlink()?;
                        return Err(e);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    writer.unlink()?;
                    return Err(e);
                }
            }
        }
        writer.seal()
    }

    pub fn close(self) {}
}

fn open_chain(
    dir: &Path,
    hash: Sha256,
    options: &BrixOptions,
    depth: usize,
) -> Result<Vec<(Sha256, BrickReader<fs::File>)>> {
    if depth >= options.max_chain_len {
        return Err(Error::TooManyBrix { limit: options.max_chain_len });
    }
    let reader = BrickReader::open_by_hash(dir, &hash)?;
    let base = reader.meta().first().copied();
    let mut chain = match base {
        Some(base_hash) if !base_hash.is_zero() => open_chain(dir, base_hash, options, depth + 1)?,
        _ => Vec::new(),
    };
    chain.push((hash, reader));
    Ok(chain)
}

struct Lane<'r> {
    scan: Scan<'r, fs::File>,
    peeked: Option<Vec<u8>>,
    done: bool,
}

impl<'r> Lane<'r> {
    fn fill(&mut self) -> Result<()> {
        if self.peeked.is_none() && !self.done {
            match self.scan.read()? {
                Some(bytes) => self.peeked = Some(bytes),
                None => self.done = true,
            }
        }
        Ok(())
    }
}

/// A min-heap-equivalent merge scan over every brick in a [`Brix`] (spec
/// §4.11): one lane per brick, each holding at most one peeked record.
pub struct BrixScan<'r> {
    lanes: Vec<Lane<'r>>,
}

impl<'r> BrixScan<'r> {
    pub fn read(&mut self) -> Result<Option<Vec<u8>>> {
        for lane in &mut self.lanes {
            lane.fill()?;
        }

        let mut min_id: Option<Id> = None;
        for lane in &self.lanes {
            if let Some(bytes) = &lane.peeked {
                let id = read_rdx(bytes)?.expect("peeked bytes are one full record").id;
                min_id = Some(match min_id {
                    Some(m) if m.compare(&id).is_lt() => m,
                    _ => id,
                });
            }
        }
        let Some(min_id) = min_id else { return Ok(None) };

        let mut group_bytes: Vec<Vec<u8>> = Vec::new();
        for lane in &mut self.lanes {
            let ties = match &lane.peeked {
                Some(bytes) => read_rdx(bytes)?.expect("record").id.compare(&min_id).is_eq(),
                None => false,
            };
            if ties {
                group_bytes.push(lane.peeked.take().expect("checked Some above"));
            }
        }

        if group_bytes.len() == 1 {
            return Ok(Some(group_bytes.pop().expect("length checked above")));
        }
        let parsed: Vec<_> = group_bytes
            .iter()
            .map(|bytes| read_rdx(bytes).map(|r| r.expect("group member is a full record")))
            .collect::<Result<_>>()?;
        let entries: Vec<Entry<'_>> = parsed
            .into_iter()
            .zip(group_bytes.iter())
            .map(|(rdx, raw)| Entry { rdx, last: &raw[..] })
            .collect();
        let mut out = Vec::new();
        merge_tie_group(&entries, &mut out)?;
        Ok(Some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::write_rdx;
    use rdx_types::Kind;

    fn tempdir() -> PathBuf {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut p = std::env::temp_dir();
        p.push(format!("rdx-brix-test-{}-{n}", std::process::id()));
        fs::create_dir_all(&p).unwrap();
        p
    }

    fn record(seq: u64, value: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        write_rdx(&mut buf, Kind::Integer, Id::new(1, seq << 6).unwrap(), value);
        buf
    }

    fn seal_with_base(dir: &Path, base: Vec<Sha256>, seqs: &[(u64, u8)]) -> Sha256 {
        let mut w = BrickWriter::create(dir, base, BrickWriterOptions::default()).unwrap();
        for &(seq, v) in seqs {
            w.write(&record(seq, &[v])).unwrap();
        }
        w.seal().unwrap()
    }

    #[test]
    fn get_finds_records_across_the_chain() {
        let dir = tempdir();
        let base_hash = seal_with_base(&dir, vec![], &[(2, 2), (4, 4)]);
        let leaf_hash = seal_with_base(&dir, vec![base_hash], &[(6, 6), (8, 8)]);

        let mut brix = Brix::open_by_hash(&dir, leaf_hash, BrixOptions::default()).unwrap();
        let from_base = brix.get(Id::new(1, 2 << 6).unwrap()).unwrap();
        assert_eq!(read_rdx(&from_base).unwrap().unwrap().value, &[2]);
        let from_leaf = brix.get(Id::new(1, 8 << 6).unwrap()).unwrap();
        assert_eq!(read_rdx(&from_leaf).unwrap().unwrap().value, &[8]);
        assert!(matches!(brix.get(Id::new(1, 99 << 6).unwrap()), Err(Error::NotFound)));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn iterator_merges_across_bricks_in_order() {
        let dir = tempdir();
        let base_hash = seal_with_base(&dir, vec![], &[(2, 2), (6, 6)]);
        let leaf_hash = seal_with_base(&dir, vec![base_hash], &[(4, 4), (8, 8)]);

        let brix = Brix::open_by_hash(&dir, leaf_hash, BrixOptions::default()).unwrap();
        let mut scan = brix.iterator().unwrap();
        let mut seen = Vec::new();
        while let Some(bytes) = scan.read().unwrap() {
            seen.push(read_rdx(&bytes).unwrap().unwrap().id.lex_key());
        }
        assert_eq!(seen, vec![2, 4, 6, 8]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn join_compacts_the_chain_into_one_brick() {
        let dir = tempdir();
        let base_hash = seal_with_base(&dir, vec![], &[(2, 2), (6, 6)]);
        let leaf_hash = seal_with_base(&dir, vec![base_hash], &[(4, 4), (8, 8)]);

        let brix = Brix::open_by_hash(&dir, leaf_hash, BrixOptions::default()).unwrap();
        let joined_hash = brix.join().unwrap();

        let mut joined = Brix::open_by_hash(&dir, joined_hash, BrixOptions::default()).unwrap();
        for seq in [2u64, 4, 6, 8] {
            assert!(joined.get(Id::new(1, seq << 6).unwrap()).is_ok());
        }

        fs::remove_dir_all(&dir).unwrap();
    }
}
