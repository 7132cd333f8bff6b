//! I/O capability traits consumed at the brick store's system boundary
//! (spec §6.2): positional reads for a sealed brick, sequential writes for
//! a brick under construction, and hash-prefix directory lookup.
//!
//! Grounded on `fuel-storage`: a workspace crate whose only job is to name
//! the traits another crate implements against, kept dependency-light so
//! any backend (a real file, an in-memory buffer, a test double) can
//! satisfy it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("no brick file matches hash prefix")]
    NotExist,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Positional reads into a sealed brick. A real `std::fs::File` satisfies
/// this directly; tests typically back it with an in-memory buffer.
pub trait ReadAt {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    fn len(&self) -> io::Result<u64>;
}

#[cfg(unix)]
impl ReadAt for fs::File {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}

/// An in-memory backend, used by tests and by callers who materialize a
/// small brick entirely in RAM before deciding whether to persist it.
#[derive(Debug, Clone, Default)]
pub struct MemFile(pub Vec<u8>);

impl ReadAt for MemFile {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let offset = offset as usize;
        if offset >= self.0.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.0.len() - offset);
        buf[..n].copy_from_slice(&self.0[offset..offset + n]);
        Ok(n)
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.0.len() as u64)
    }
}

/// Scans `dir` for a brick file whose hash starts with `prefix` (hex,
/// case-insensitive), returning its full hash text. Brick files are named
/// `<64 hex chars>.brix`, so only entries of exactly that length are
/// considered (spec §6.2).
pub fn find_by_hashlet(dir: &Path, prefix: &str) -> Result<String> {
    const HASH_HEX_LEN: usize = 64;
    const EXT: &str = ".brix";
    let prefix_lower = prefix.to_ascii_lowercase();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.len() != HASH_HEX_LEN + EXT.len() || !name.ends_with(EXT) {
            continue;
        }
        let hash = &name[..HASH_HEX_LEN];
        if hash.to_ascii_lowercase().starts_with(&prefix_lower) {
            return Ok(hash.to_string());
        }
    }
    Err(Error::NotExist)
}

/// Creates a uniquely-named temp file in `dir` (a mkstemp-like primitive,
/// spec §5/§6.2) and returns its path plus an open handle positioned for
/// sequential writes. The caller owns the file exclusively until it renames
/// or removes it.
pub fn create_temp(dir: &Path) -> Result<(PathBuf, fs::File)> {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let pid = std::process::id();
    for _ in 0..64 {
        let n = COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
        let path = dir.join(format!(".brix-{pid}-{n}.tmp"));
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Err(Error::Io(io::Error::new(io::ErrorKind::AlreadyExists, "temp file name collision")))
}
