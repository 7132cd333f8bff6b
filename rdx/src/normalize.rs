//! `normalize(stream)` (spec §4.8): validate a buffer of RDX records and
//! rewrite it into the one canonical encoding for its content. Idempotent:
//! `normalize(normalize(x)) == normalize(x)` byte for byte.
//!
//! Grounded on the same stub-family of `rdx.go` as [`crate::merge`] (its
//! `Normalize` is exercised by `rdx_test.go` but never defined in the
//! retrieved source) and on the minimum-width guarantee `zip_i64`/`zip_f64`
//! already give every terminal by construction (spec §4.2).

use std::cmp::Ordering;

use itertools::Itertools;
use rdx_types::varint::{unzip_f64, unzip_i64};
use rdx_types::{Id, Kind, RON64_ALPHABET};

use crate::codec::{read_rdx, write_rdx, Rdx};
use crate::compare::compare_in_container;
use crate::error::{Error, Result};
use crate::heap::Entry;

/// Normalizes a sequence of sibling top-level records, keeping them in
/// their original order — this is the identity a Tuple or Linear
/// container's children already satisfy (spec §4.8 items 5–6), and the
/// first pass every container's children go through before a Euler/Multix
/// container additionally sorts and dedupes them.
pub fn normalize(stream: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut rest = stream;
    while let Some(rec) = read_rdx(rest)? {
        normalize_one_record(&mut out, rec.kind, rec.id, rec.value)?;
        rest = rec.rest;
    }
    Ok(out)
}

fn normalize_one_record(out: &mut Vec<u8>, kind: Kind, id: Id, value: &[u8]) -> Result<()> {
    if kind.is_first() {
        normalize_terminal_into(out, kind, id, value)
    } else {
        let children = normalize_children(kind, value)?;
        write_rdx(out, kind, id, &children);
        Ok(())
    }
}

/// Recursively normalizes `value`, the child payload of a container of kind
/// `container`, applying that container's own item 3–6 rule.
fn normalize_children(container: Kind, value: &[u8]) -> Result<Vec<u8>> {
    match container {
        Kind::Tuple | Kind::Linear => normalize(value),
        Kind::Euler | Kind::Multix => sort_and_dedupe(container, value),
        other => unreachable!("{other:?} is not a container kind"),
    }
}

/// Re-sorts a container's children under its comparator and merges runs of
/// comparator-equal neighbours via the tie-group rule (spec §4.8 items 3–4).
fn sort_and_dedupe(container: Kind, value: &[u8]) -> Result<Vec<u8>> {
    let mut records: Vec<Vec<u8>> = Vec::new();
    let mut rest = value;
    while let Some(rec) = read_rdx(rest)? {
        let mut one = Vec::new();
        normalize_one_record(&mut one, rec.kind, rec.id, rec.value)?;
        records.push(one);
        rest = rec.rest;
    }

    let unsorted: Vec<Rdx<'_>> = records
        .iter()
        .map(|r| read_rdx(r).expect("just-written record").expect("non-empty"))
        .collect();
    let mut sort_err = None;
    let parsed: Vec<Rdx<'_>> = unsorted
        .into_iter()
        .sorted_by(|a, b| match compare_in_container(container, a, b) {
            Ok(order) => Ordering::from(order),
            Err(e) => {
                sort_err.get_or_insert(e);
                Ordering::Equal
            }
        })
        .collect();
    if let Some(e) = sort_err {
        return Err(e);
    }

    let mut out = Vec::new();
    let mut i = 0;
    while i < parsed.len() {
        let mut j = i + 1;
        while j < parsed.len() && compare_in_container(container, &parsed[i], &parsed[j])?.is_eq() {
            j += 1;
        }
        if j - i == 1 {
            write_rdx(&mut out, parsed[i].kind, parsed[i].id, parsed[i].value);
        } else {
            let entries: Vec<Entry<'_>> =
                (i..j).map(|k| Entry { rdx: parsed[k], last: &records[k][..] }).collect();
            crate::merge::merge_tie_group(&entries, &mut out)?;
        }
        i = j;
    }
    Ok(out)
}

fn normalize_terminal_into(out: &mut Vec<u8>, kind: Kind, id: Id, value: &[u8]) -> Result<()> {
    let mut packed = Vec::new();
    match kind {
        Kind::Float => {
            let (f, rest) = unzip_f64(value)?;
            if !rest.is_empty() {
                return Err(Error::BadFloat);
            }
            if f.is_nan() {
                return Err(Error::BadFloat);
            }
            rdx_types::varint::zip_f64(&mut packed, f);
        }
        Kind::Integer => {
            let (n, rest) = unzip_i64(value)?;
            if !rest.is_empty() {
                return Err(Error::BadInteger);
            }
            rdx_types::varint::zip_i64(&mut packed, n);
        }
        Kind::Reference => {
            let (ref_id, rest) = Id::unzip(value).map_err(|_| Error::BadReference)?;
            if !rest.is_empty() {
                return Err(Error::BadReference);
            }
            ref_id.zip(&mut packed);
        }
        Kind::String => {
            std::str::from_utf8(value).map_err(|_| Error::BadUtf8)?;
            packed.extend_from_slice(value);
        }
        Kind::Term => {
            if !value.iter().all(|b| RON64_ALPHABET.contains(b)) {
                return Err(Error::BadTerm);
            }
            packed.extend_from_slice(value);
        }
        _ => unreachable!("normalize_terminal_into called on a PLEX kind"),
    }
    write_rdx(out, kind, id, &packed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::write_rdx as write_record;

    #[test]
    fn rejects_nan_floats() {
        let mut buf = Vec::new();
        rdx_types::varint::zip_f64(&mut buf, f64::NAN);
        let mut rec = Vec::new();
        write_record(&mut rec, Kind::Float, Id::ZERO, &buf);
        assert!(matches!(normalize(&rec), Err(Error::BadFloat)));
    }

    #[test]
    fn rejects_non_utf8_strings() {
        let mut rec = Vec::new();
        write_record(&mut rec, Kind::String, Id::ZERO, &[0xff, 0xfe]);
        assert!(matches!(normalize(&rec), Err(Error::BadUtf8)));
    }

    #[test]
    fn euler_normalize_sorts_and_dedupes() {
        let mut inner = Vec::new();
        write_record(&mut inner, Kind::Integer, Id::new(1, 192).unwrap(), b"\x06");
        write_record(&mut inner, Kind::Integer, Id::new(1, 64).unwrap(), b"\x02");
        write_record(&mut inner, Kind::Integer, Id::new(1, 64).unwrap(), b"\x02");
        let mut stream = Vec::new();
        write_record(&mut stream, Kind::Euler, Id::ZERO, &inner);

        let normal = normalize(&stream).unwrap();
        let outer = read_rdx(&normal).unwrap().unwrap();
        assert_eq!(outer.kind, Kind::Euler);

        let mut values = Vec::new();
        let mut rest = outer.value;
        while let Some(r) = read_rdx(rest).unwrap() {
            let (v, _) = unzip_i64(r.value).unwrap();
            values.push(v);
            rest = r.rest;
        }
        assert_eq!(values, vec![1, 3]);
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut inner = Vec::new();
        write_record(&mut inner, Kind::Integer, Id::new(1, 192).unwrap(), b"\x06");
        write_record(&mut inner, Kind::Integer, Id::new(1, 64).unwrap(), b"\x02");
        let mut stream = Vec::new();
        write_record(&mut stream, Kind::Euler, Id::ZERO, &inner);

        let once = normalize(&stream).unwrap();
        let twice = normalize(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn tuple_normalize_preserves_position() {
        let mut stream = Vec::new();
        write_record(&mut stream, Kind::Integer, Id::ZERO, b"\x0a");
        write_record(&mut stream, Kind::String, Id::ZERO, b"hello");
        let mut tuple = Vec::new();
        write_record(&mut tuple, Kind::Tuple, Id::ZERO, &stream);

        let normal = normalize(&tuple).unwrap();
        let outer = read_rdx(&normal).unwrap().unwrap();
        let first = read_rdx(outer.value).unwrap().unwrap();
        assert_eq!(first.kind, Kind::Integer);
        let second = read_rdx(first.rest).unwrap().unwrap();
        assert_eq!(second.kind, Kind::String);
    }
}
