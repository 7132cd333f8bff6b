//! A single-pass cursor over a buffer of concatenated RDX records (spec
//! §4.6), grounded on `rdx.go`'s `Iterator` type: read one record at a
//! time, optionally descend into a PLEX payload, optionally seek forward
//! by id within a container that is known to be sorted.

use rdx_types::{Id, Kind};

use crate::codec::{read_rdx, Rdx};
use crate::compare::compare_in_container;
use crate::error::Result;

/// Cursor over one level of a buffer of RDX records. Does not own the
/// buffer; `'a` ties it to whatever slice it was opened on.
#[derive(Clone, Copy)]
pub struct Iter<'a> {
    buf: &'a [u8],
    /// The container kind this buffer is the payload of, if any — used by
    /// [`Iter::seek`] to pick the right comparator. `None` at the top level.
    container: Option<Kind>,
}

impl<'a> Iter<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Iter { buf, container: None }
    }

    fn in_container(buf: &'a [u8], container: Kind) -> Self {
        Iter { buf, container: Some(container) }
    }

    pub fn has_data(&self) -> bool {
        !self.buf.is_empty()
    }

    pub fn rest(&self) -> &'a [u8] {
        self.buf
    }

    /// Reads the current record without advancing, or `None` at the end.
    pub fn record(&self) -> Result<Option<Rdx<'a>>> {
        read_rdx(self.buf)
    }

    pub fn kind(&self) -> Result<Option<Kind>> {
        Ok(self.record()?.map(|r| r.kind))
    }

    pub fn id(&self) -> Result<Option<Id>> {
        Ok(self.record()?.map(|r| r.id))
    }

    pub fn value(&self) -> Result<Option<&'a [u8]>> {
        Ok(self.record()?.map(|r| r.value))
    }

    /// Advances past the current record, returning it.
    pub fn read(&mut self) -> Result<Option<Rdx<'a>>> {
        let rec = self.record()?;
        if let Some(r) = &rec {
            self.buf = r.rest;
        }
        Ok(rec)
    }

    /// Returns a cursor over the current record's payload, treating it as
    /// a container of its own kind. `None` at the end of the buffer.
    pub fn into_child(&self) -> Result<Option<Iter<'a>>> {
        Ok(self.record()?.map(|r| Iter::in_container(r.value, r.kind)))
    }

    /// Advances past records whose key orders strictly before `id` under
    /// this level's container comparator, stopping at the first record
    /// whose key is `>= id` (or at the end of the buffer). Requires the
    /// buffer to already be sorted under that comparator, which holds for
    /// any normalized container (spec §4.4).
    pub fn seek(&mut self, target: &Rdx<'_>) -> Result<()> {
        let Some(container) = self.container else {
            return Ok(());
        };
        loop {
            let Some(rec) = self.record()? else { break };
            if compare_in_container(container, &rec, target)?.is_lt() {
                self.buf = rec.rest;
            } else {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::write_rdx;

    fn sample() -> Vec<u8> {
        let mut buf = Vec::new();
        write_rdx(&mut buf, Kind::Integer, Id::new(0, 64).unwrap(), b"\x02");
        write_rdx(&mut buf, Kind::String, Id::new(0, 128).unwrap(), b"hi");
        buf
    }

    #[test]
    fn reads_records_in_order_and_ends_cleanly() {
        let buf = sample();
        let mut it = Iter::new(&buf);
        let first = it.read().unwrap().unwrap();
        assert_eq!(first.kind, Kind::Integer);
        let second = it.read().unwrap().unwrap();
        assert_eq!(second.kind, Kind::String);
        assert!(it.read().unwrap().is_none());
        assert!(!it.has_data());
    }

    #[test]
    fn descends_into_child_payload() {
        let mut outer = Vec::new();
        let mut inner = Vec::new();
        write_rdx(&mut inner, Kind::Integer, Id::new(0, 64).unwrap(), b"\x04");
        write_rdx(&mut outer, Kind::Tuple, Id::ZERO, &inner);

        let it = Iter::new(&outer);
        let child = it.into_child().unwrap().unwrap();
        let rec = child.record().unwrap().unwrap();
        assert_eq!(rec.kind, Kind::Integer);
    }

    #[test]
    fn seek_skips_records_ordered_before_target_in_linear() {
        let mut buf = Vec::new();
        write_rdx(&mut buf, Kind::Integer, Id::new(9, 64).unwrap(), b"\x02");
        write_rdx(&mut buf, Kind::Integer, Id::new(9, 128).unwrap(), b"\x04");
        write_rdx(&mut buf, Kind::Integer, Id::new(9, 192).unwrap(), b"\x06");

        let mut it = Iter::in_container(&buf, Kind::Linear);
        let mut target_buf = Vec::new();
        write_rdx(&mut target_buf, Kind::Integer, Id::new(9, 128).unwrap(), b"");
        let target = read_rdx(&target_buf).unwrap().unwrap();

        it.seek(&target).unwrap();
        let rec = it.record().unwrap().unwrap();
        assert_eq!(rec.id, Id::new(9, 128).unwrap());
    }
}
