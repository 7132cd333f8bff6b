//! The brick reader (spec §4.10): open a sealed file, binary-search the
//! page index with a bloom pre-check, materialize at most one page at a
//! time.

use std::fs;
use std::path::Path;

use rdx_merkle::Sha256;
use rdx_storage::ReadAt;
use rdx_types::{Id, Order};

use super::index::{CompressionTag, IndexEntry, INDEX_ENTRY_LEN};
use super::{Header, HEADER_LEN};
use crate::codec::read_rdx;
use crate::error::{Error, Result};

/// A sealed brick opened for point reads and scans. Generic over the I/O
/// capability (spec §6.2) so tests can back it with
/// [`rdx_storage::MemFile`] instead of a real file.
pub struct BrickReader<R: ReadAt> {
    io: R,
    meta: Vec<Sha256>,
    index: Vec<IndexEntry>,
    data_start: u64,
    data_len: u64,
    cache: Option<CachedPage>,
}

struct CachedPage {
    page_index: usize,
    bytes: Vec<u8>,
    cursor: usize,
}

impl<R: ReadAt> BrickReader<R> {
    /// Validates the header and loads `meta[]`/`index[]` (spec §4.10 open,
    /// §6.1 validity rules).
    pub fn open(io: R) -> Result<BrickReader<R>> {
        let mut header_bytes = [0u8; HEADER_LEN];
        let n = io.read_at(&mut header_bytes, 0)?;
        if n != HEADER_LEN {
            return Err(Error::BadFile);
        }
        let header = Header::decode(&header_bytes)?;

        let file_len = io.len()?;
        let total = HEADER_LEN as u64 + header.meta_len + header.data_len + header.index_len;
        if file_len < total {
            return Err(Error::BadFile);
        }

        let meta_start = HEADER_LEN as u64;
        let mut meta = Vec::with_capacity((header.meta_len / 32) as usize);
        let mut meta_buf = [0u8; 32];
        for i in 0..(header.meta_len / 32) {
            read_exact_at(&io, &mut meta_buf, meta_start + i * 32)?;
            meta.push(Sha256(meta_buf));
        }

        let data_start = meta_start + header.meta_len;
        let index_start = data_start + header.data_len;
        let mut index = Vec::with_capacity((header.index_len / 32) as usize);
        let mut entry_buf = [0u8; INDEX_ENTRY_LEN];
        for i in 0..(header.index_len / 32) {
            read_exact_at(&io, &mut entry_buf, index_start + i * 32)?;
            let entry = IndexEntry::decode(&entry_buf)?;
            if entry.offset > header.data_len {
                return Err(Error::BadHeader);
            }
            index.push(entry);
        }
        if !index.windows(2).all(|w| w[0].from.compare(&w[1].from).is_lt()) {
            return Err(Error::BadHeader);
        }

        Ok(BrickReader { io, meta, index, data_start, data_len: header.data_len, cache: None })
    }

    pub fn meta(&self) -> &[Sha256] {
        &self.meta
    }

    fn page_stored_len(&self, page_index: usize) -> u64 {
        let start = self.index[page_index].offset;
        let end = self.index.get(page_index + 1).map(|e| e.offset).unwrap_or(self.data_len);
        end - start
    }

    fn load_page(&self, page_index: usize) -> Result<Vec<u8>> {
        let entry = &self.index[page_index];
        let stored_len = self.page_stored_len(page_index) as usize;
        let mut stored = vec![0u8; stored_len];
        read_exact_at(&self.io, &mut stored, self.data_start + entry.offset)?;
        match entry.tag {
            CompressionTag::Raw => Ok(stored),
            CompressionTag::Lz4 => {
                let cap = 1usize << entry.log2_unpacked;
                Ok(lz4_flex::block::decompress(&stored, cap)?)
            }
        }
    }

    /// Point read (spec §4.10): binary search for the owning page, bloom
    /// pre-check, then a linear scan within that one materialized page.
    pub fn read_record(&mut self, id: Id) -> Result<Vec<u8>> {
        let page_index = self.index.partition_point(|e| e.from.compare(&id) != Order::Grtr);
        if page_index == 0 {
            return Err(Error::NotFound);
        }
        let page_index = page_index - 1;

        let bit = 1u64 << (id.xor() & 63);
        if self.index[page_index].bloom & bit == 0 {
            return Err(Error::NotFound);
        }

        let needs_load = match &self.cache {
            Some(c) => c.page_index != page_index,
            None => true,
        };
        if needs_load {
            let bytes = self.load_page(page_index)?;
            self.cache = Some(CachedPage { page_index, bytes, cursor: 0 });
        }
        let cache = self.cache.as_mut().expect("just populated");

        if cache.cursor > 0 {
            let passed_target = match read_rdx(&cache.bytes[cache.cursor..])? {
                Some(rec) => rec.id.compare(&id) == Order::Grtr,
                None => true,
            };
            if passed_target {
                cache.cursor = 0;
            }
        }

        let mut rest = &cache.bytes[cache.cursor..];
        let mut advanced = 0usize;
        while let Some(rec) = read_rdx(rest)? {
            let consumed = rest.len() - rec.rest.len();
            match rec.id.compare(&id) {
                Order::Eq => {
                    let record_bytes = rest[..consumed].to_vec();
                    cache.cursor += advanced + consumed;
                    return Ok(record_bytes);
                }
                Order::Grtr => return Err(Error::NotFound),
                _ => {
                    advanced += consumed;
                    rest = rec.rest;
                }
            }
        }
        Err(Error::NotFound)
    }

    /// A fresh page-by-page scan over every record in the brick, independent
    /// of the point-read cache (spec §4.10 scan iterator).
    pub fn scan(&self) -> Scan<'_, R> {
        Scan { reader: self, page_index: 0, buf: None, cursor: 0 }
    }

    pub fn close(self) {}
}

impl BrickReader<fs::File> {
    /// Opens `<dir>/<hex(hash)>.brix` read-only.
    pub fn open_by_hash(dir: &Path, hash: &Sha256) -> Result<BrickReader<fs::File>> {
        let path = dir.join(format!("{}.brix", hash.to_hex()));
        let file = fs::File::open(path)?;
        BrickReader::open(file)
    }
}

fn read_exact_at<R: ReadAt>(io: &R, buf: &mut [u8], offset: u64) -> Result<()> {
    let n = io.read_at(buf, offset)?;
    if n != buf.len() {
        return Err(Error::BadFile);
    }
    Ok(())
}

/// Sequential scan over a brick's data pages, loading the next page on
/// demand and holding at most one in memory.
pub struct Scan<'r, R: ReadAt> {
    reader: &'r BrickReader<R>,
    page_index: usize,
    buf: Option<Vec<u8>>,
    cursor: usize,
}

impl<'r, R: ReadAt> Scan<'r, R> {
    pub fn read(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            if let Some(buf) = &self.buf {
                if self.cursor < buf.len() {
                    if let Some(rec) = read_rdx(&buf[self.cursor..])? {
                        let consumed = buf.len() - self.cursor - rec.rest.len();
                        let out = buf[self.cursor..self.cursor + consumed].to_vec();
                        self.cursor += consumed;
                        return Ok(Some(out));
                    }
                }
            }
            if self.page_index >= self.reader.index.len() {
                return Ok(None);
            }
            let bytes = self.reader.load_page(self.page_index)?;
            self.page_index += 1;
            self.buf = Some(bytes);
            self.cursor = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brick::writer::BrickWriter;
    use crate::codec::write_rdx;
    use crate::options::BrickWriterOptions;
    use rdx_types::Kind;

    fn tempdir() -> std::path::PathBuf {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut p = std::env::temp_dir();
        p.push(format!("rdx-brick-reader-test-{}-{n}", std::process::id()));
        fs::create_dir_all(&p).unwrap();
        p
    }

    fn record(seq: u64, value: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        write_rdx(&mut buf, Kind::Integer, Id::new(1, seq << 6).unwrap(), value);
        buf
    }

    fn seal_brick(dir: &Path, seqs: &[u64]) -> Sha256 {
        let mut w = BrickWriter::create(dir, vec![], BrickWriterOptions::default()).unwrap();
        for &seq in seqs {
            w.write(&record(seq, &[seq as u8])).unwrap();
        }
        w.seal().unwrap()
    }

    #[test]
    fn point_read_finds_every_written_record() {
        let dir = tempdir();
        let seqs: Vec<u64> = (1..=40).collect();
        let hash = seal_brick(&dir, &seqs);
        let mut reader = BrickReader::open_by_hash(&dir, &hash).unwrap();
        for &seq in &seqs {
            let bytes = reader.read_record(Id::new(1, seq << 6).unwrap()).unwrap();
            let rec = read_rdx(&bytes).unwrap().unwrap();
            assert_eq!(rec.value, &[seq as u8]);
        }
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn point_read_missing_id_is_not_found() {
        let dir = tempdir();
        let hash = seal_brick(&dir, &[2, 4, 6]);
        let mut reader = BrickReader::open_by_hash(&dir, &hash).unwrap();
        let err = reader.read_record(Id::new(1, 3 << 6).unwrap()).unwrap_err();
        assert!(matches!(err, Error::NotFound));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn scan_visits_every_record_in_order() {
        let dir = tempdir();
        let seqs: Vec<u64> = (1..=10).collect();
        let hash = seal_brick(&dir, &seqs);
        let reader = BrickReader::open_by_hash(&dir, &hash).unwrap();
        let mut scan = reader.scan();
        let mut seen = Vec::new();
        while let Some(bytes) = scan.read().unwrap() {
            let rec = read_rdx(&bytes).unwrap().unwrap();
            seen.push(rec.id.lex_key());
        }
        assert_eq!(seen, seqs);
        fs::remove_dir_all(&dir).unwrap();
    }
}
