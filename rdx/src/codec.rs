//! RDX-level reading and writing: a TLKV record whose key field is a
//! zigzag-packed identifier pair (spec §3.1–§3.3, grounded on `rdx.go`'s
//! `ReadRDX`/`WriteRDX`).

use rdx_types::{Id, Kind};

use crate::error::{Error, Result};
use crate::tlv::{read_tlkv, write_tlkv, Tlkv};

/// One parsed RDX record: its kind, its (possibly zero) stamp, its raw
/// value payload, and whatever bytes followed it.
#[derive(Clone, Copy)]
pub struct Rdx<'a> {
    pub kind: Kind,
    pub id: Id,
    pub value: &'a [u8],
    pub rest: &'a [u8],
}

pub fn read_rdx(buf: &[u8]) -> Result<Option<Rdx<'_>>> {
    let Some(Tlkv { tag, idbytes, value, rest }) = read_tlkv(buf)? else {
        return Ok(None);
    };
    let kind = Kind::from_tag(tag).map_err(|_| Error::BadRecord("unrecognized kind tag"))?;
    let id = if idbytes.is_empty() {
        Id::ZERO
    } else {
        let (id, leftover) = Id::unzip(idbytes).map_err(|_| Error::BadRecord("malformed id bytes"))?;
        if !leftover.is_empty() {
            return Err(Error::BadRecord("trailing bytes after id"));
        }
        id
    };
    Ok(Some(Rdx { kind, id, value, rest }))
}

/// Walks a buffer of concatenated RDX records one level deep, returning
/// each record's `(kind, id, value)` as a borrowed [`Rdx`] rather than the
/// callback-threaded iterator a pointer-based implementation would use.
pub fn flatten(buf: &[u8]) -> Result<Vec<Rdx<'_>>> {
    let mut out = Vec::new();
    let mut rest = buf;
    while let Some(rec) = read_rdx(rest)? {
        rest = rec.rest;
        out.push(rec);
    }
    Ok(out)
}

pub fn write_rdx(buf: &mut Vec<u8>, kind: Kind, id: Id, value: &[u8]) {
    if id.is_zero() {
        write_tlkv(buf, kind.tag(), &[], value);
    } else {
        let mut idbytes = Vec::with_capacity(16);
        id.zip(&mut idbytes);
        write_tlkv(buf, kind.tag(), &idbytes, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_and_without_id() {
        let mut buf = Vec::new();
        write_rdx(&mut buf, Kind::Integer, Id::new(3, 4).unwrap(), b"payload");
        write_rdx(&mut buf, Kind::String, Id::ZERO, b"hi");

        let first = read_rdx(&buf).unwrap().unwrap();
        assert_eq!(first.kind, Kind::Integer);
        assert_eq!(first.id, Id::new(3, 4).unwrap());
        assert_eq!(first.value, b"payload");

        let second = read_rdx(first.rest).unwrap().unwrap();
        assert_eq!(second.kind, Kind::String);
        assert!(second.id.is_zero());
        assert_eq!(second.value, b"hi");
        assert!(second.rest.is_empty());
    }

    #[test]
    fn flatten_collects_every_top_level_record() {
        let mut buf = Vec::new();
        write_rdx(&mut buf, Kind::Integer, Id::ZERO, b"\x02");
        write_rdx(&mut buf, Kind::String, Id::ZERO, b"hi");
        write_rdx(&mut buf, Kind::Term, Id::ZERO, b"ok");

        let records = flatten(&buf).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].kind, Kind::Integer);
        assert_eq!(records[1].kind, Kind::String);
        assert_eq!(records[2].kind, Kind::Term);
    }
}
