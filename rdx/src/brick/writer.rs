//! The brick writer state machine (spec §4.9):
//! `Writing ──seal→ Sealed`, with an `unlink()` escape hatch the caller is
//! expected to take on any error before a successful `seal()`.

use std::fs;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use rdx_merkle::{PeakLine, Sha256};
use rdx_types::Id;

use super::index::{log2_ceil, CompressionTag, IndexEntry};
use super::{Header, HEADER_LEN};
use crate::codec::read_rdx;
use crate::error::{Error, Result};
use crate::options::BrickWriterOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Writing,
    Sealed,
    Dropped,
}

/// A brick under construction. Records must be appended in strictly
/// increasing id order (spec §3.2 `compare`); violating that is
/// [`Error::BadOrder`], not a panic.
pub struct BrickWriter {
    file: fs::File,
    temp_path: PathBuf,
    dir: PathBuf,
    options: BrickWriterOptions,
    state: State,
    meta: Vec<Sha256>,
    peak: PeakLine,
    page_buf: Vec<u8>,
    page_from: Option<Id>,
    page_bloom: u64,
    data_len: u64,
    index: Vec<IndexEntry>,
    last_id: Option<Id>,
}

impl BrickWriter {
    /// Opens a fresh temp file in `dir` and writes the placeholder header
    /// plus the dependency hashes (`meta[0]` is the base brick, if any).
    pub fn create(dir: &Path, meta: Vec<Sha256>, options: BrickWriterOptions) -> Result<BrickWriter> {
        let (temp_path, mut file) = rdx_storage::create_temp(dir)?;
        file.write_all(&[0u8; HEADER_LEN])?;
        for hash in &meta {
            file.write_all(hash.as_bytes())?;
        }
        Ok(BrickWriter {
            file,
            temp_path,
            dir: dir.to_path_buf(),
            options,
            state: State::Writing,
            meta,
            peak: PeakLine::new(),
            page_buf: Vec::new(),
            page_from: None,
            page_bloom: 0,
            data_len: 0,
            index: Vec::new(),
            last_id: None,
        })
    }

    /// Appends one encoded RDX record. `record` must be exactly one record
    /// (no trailing bytes); use [`BrickWriter::write_all`] for a batch.
    pub fn write(&mut self, record: &[u8]) -> Result<()> {
        if self.state != State::Writing {
            return Err(Error::ReadOnly);
        }
        let rdx = read_rdx(record)?.ok_or(Error::BadRecord("empty record"))?;
        if !rdx.rest.is_empty() {
            return Err(Error::BadRecord("more than one record passed to write()"));
        }
        if let Some(last) = self.last_id {
            if !rdx.id.compare(&last).is_gt() {
                return Err(Error::BadOrder { previous: last.to_string(), next: rdx.id.to_string() });
            }
        }
        if !self.page_buf.is_empty() && self.page_buf.len() + record.len() > self.options.page_size_target {
            self.flush_page()?;
        }
        if self.page_from.is_none() {
            self.page_from = Some(rdx.id);
        }
        self.page_bloom |= 1u64 << (rdx.id.xor() & 63);
        self.page_buf.extend_from_slice(record);
        self.last_id = Some(rdx.id);
        Ok(())
    }

    pub fn write_all<'a>(&mut self, records: impl IntoIterator<Item = &'a [u8]>) -> Result<()> {
        for record in records {
            self.write(record)?;
        }
        Ok(())
    }

    /// Flushes the current page buffer: compress-or-not, write the stored
    /// bytes, record the index entry, fold the raw page's hash into the
    /// peak line (spec §4.9 step 1–6).
    fn flush_page(&mut self) -> Result<()> {
        if self.page_buf.is_empty() {
            return Ok(());
        }
        let raw = std::mem::take(&mut self.page_buf);
        let compressed = lz4_flex::block::compress(&raw);
        let (stored, tag): (&[u8], CompressionTag) =
            if self.options.worth_compressing(raw.len(), compressed.len()) {
                (&compressed, CompressionTag::Lz4)
            } else {
                (&raw, CompressionTag::Raw)
            };
        self.file.write_all(stored)?;
        let entry = IndexEntry {
            from: self.page_from.take().expect("page_buf non-empty implies page_from is set"),
            tag,
            log2_unpacked: log2_ceil(raw.len()),
            offset: self.data_len,
            bloom: self.page_bloom,
        };
        tracing::trace!(page = self.index.len(), stored_len = stored.len(), raw_len = raw.len(), "flushed brick page");
        self.index.push(entry);
        self.data_len += stored.len() as u64;
        self.peak.append(Sha256::of(&raw))?;
        self.page_bloom = 0;
        Ok(())
    }

    /// Flushes the final page, writes the index, renames the temp file to
    /// its content hash, and rewrites the header in place (spec §4.9 seal).
    #[tracing::instrument(skip(self))]
    pub fn seal(mut self) -> Result<Sha256> {
        if self.state != State::Writing {
            return Err(Error::ReadOnly);
        }
        self.flush_page()?;

        let mut index_bytes = Vec::with_capacity(self.index.len() * 32);
        for entry in &self.index {
            index_bytes.extend_from_slice(&entry.encode());
        }
        self.file.write_all(&index_bytes)?;

        let hash = self.peak.sum();
        let meta_len = (self.meta.len() * 32) as u64;
        let index_len = index_bytes.len() as u64;
        let header = Header { meta_len, data_len: self.data_len, index_len };

        self.file.flush()?;
        let final_path = self.dir.join(format!("{}.brix", hash.to_hex()));
        fs::rename(&self.temp_path, &final_path)?;

        let mut final_file = fs::OpenOptions::new().write(true).read(true).open(&final_path)?;
        final_file.seek(SeekFrom::Start(0))?;
        final_file.write_all(&header.encode())?;
        final_file.flush()?;

        self.state = State::Sealed;
        Ok(hash)
    }

    /// Removes the temp file. The caller's responsibility on any error
    /// between `create()` and a successful `seal()` (spec §4.9).
    pub fn unlink(mut self) -> Result<()> {
        if self.state == State::Writing {
            match fs::remove_file(&self.temp_path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::Io(e)),
            }
        }
        self.state = State::Dropped;
        Ok(())
    }

    pub fn close(self) {}
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
        p.push(format!("rdx-brick-writer-test-{}-{n}", std::process::id()));
        fs::create_dir_all(&p).unwrap();
        p
    }

    fn record(seq: u64, value: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        write_rdx(&mut buf, Kind::Integer, Id::new(1, seq << 6).unwrap(), value);
        buf
    }

    #[test]
    fn rejects_out_of_order_writes() {
        let dir = tempdir();
        let mut w = BrickWriter::create(&dir, vec![], BrickWriterOptions::default()).unwrap();
        w.write(&record(10, b"\x02")).unwrap();
        let err = w.write(&record(5, b"\x02")).unwrap_err();
        assert!(matches!(err, Error::BadOrder { .. }));
        w.unlink().unwrap();
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn seal_produces_a_hash_named_file() {
        let dir = tempdir();
        let mut w = BrickWriter::create(&dir, vec![], BrickWriterOptions::default()).unwrap();
        for seq in 1..=5u64 {
            w.write(&record(seq, &[seq as u8])).unwrap();
        }
        let hash = w.seal().unwrap();
        let path = dir.join(format!("{}.brix", hash.to_hex()));
        assert!(path.exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
