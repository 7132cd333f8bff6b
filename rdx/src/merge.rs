//! The merge engine (spec §3.4, §4.5–§4.6): last-writer-wins at the leaf,
//! with a container-typed exception — concurrent writers who both replaced
//! the *same* stamped slot with a container merge their containers instead
//! of one silently winning.
//!
//! Grounded on `itheap.go`'s tie-group loop (`EqUp`/`NextK`/`MergeNext`,
//! reused here via [`crate::heap`]) and on `rdx.go`'s per-kind `Merge*`
//! family — those are stubs in the retrieved source (`MergeL`/`MergeE`/
//! `MergeX` all `return data, nil`), so the container merges below are this
//! crate's own completion of that family, built to satisfy the properties
//! spec §8 actually tests: idempotence, commutativity, associativity.

use rdx_types::{Id, Kind};

use crate::codec::{write_rdx, Rdx};
use crate::compare::{compare_in_container, compare_lww, compare_value};
use crate::error::Result;
use crate::heap::{heap_merge, Cmp, Entry};

/// Merges `n` top-level RDX streams (spec §6.3 `merge`, §8 properties
/// 3–5): each stream is zero or more sibling records, ordered the same way
/// a brix scan orders its lanes (`Id::compare`, ignoring revision), with
/// same-id groups resolved by [`merge_tie_group`]. This is what lets two
/// whole documents — not just two same-kind containers — merge with one
/// call.
pub fn merge(streams: &[&[u8]]) -> Result<Vec<u8>> {
    let cmp: &Cmp<'_> = &|a, b| Ok(a.id.compare(&b.id));
    heap_merge(streams, cmp, |group, data| merge_tie_group(group, data))
}

/// Merges `n` sorted, normalized encodings of the same container (same
/// kind, same stamp) into one normalized encoding.
pub fn merge_container(kind: Kind, payloads: &[&[u8]]) -> Result<Vec<u8>> {
    match kind {
        Kind::Tuple => merge_tuple(payloads),
        Kind::Linear | Kind::Euler | Kind::Multix => {
            let cmp: &Cmp<'_> = &|a, b| compare_in_container(kind, a, b);
            heap_merge(payloads, cmp, |group, data| merge_tie_group(group, data))
        }
        other => unreachable!("{other:?} has no child container to merge"),
    }
}

/// Positional merge: every input is walked in lock-step by index, and the
/// elements occupying the same position across inputs form one tie group.
/// Inputs of differing length simply run out early — the longest input's
/// tail is kept as-is once its siblings are exhausted.
fn merge_tuple(payloads: &[&[u8]]) -> Result<Vec<u8>> {
    let mut cursors: Vec<&[u8]> = payloads.iter().copied().collect();
    let mut out = Vec::new();
    loop {
        let mut group = Vec::new();
        for cursor in cursors.iter_mut() {
            if let Some(entry) = take_one(cursor)? {
                group.push(entry);
            }
        }
        if group.is_empty() {
            break;
        }
        if group.len() == 1 {
            out.extend_from_slice(group[0].last);
        } else {
            merge_tie_group(&group, &mut out)?;
        }
    }
    Ok(out)
}

fn take_one<'a>(cursor: &mut &'a [u8]) -> Result<Option<Entry<'a>>> {
    let buf = *cursor;
    match crate::codec::read_rdx(buf)? {
        Some(rdx) => {
            let consumed = buf.len() - rdx.rest.len();
            *cursor = rdx.rest;
            Ok(Some(Entry { rdx, last: &buf[..consumed] }))
        }
        None => Ok(None),
    }
}

/// An empty `Tuple` is the tombstone value (spec §3.4) — less than any
/// concrete value once revisions tie.
fn is_tombstone(rdx: Rdx<'_>) -> bool {
    rdx.kind == Kind::Tuple && rdx.value.is_empty()
}

/// Resolves one tie group (elements sharing a container key, or the same
/// Tuple slot) down to its merged bytes, appended to `data`, following
/// `merge_same_spot_elements` (spec §4.7): find the `compare_lww` champion
/// (revision, then the empty-Tuple-tombstone exception, then type, then
/// value), then gather everyone sharing its revision, tombstone status and
/// kind to resolve together — recursively merged if that kind is PLEX,
/// reduced to the per-kind max if it's FIRST.
pub(crate) fn merge_tie_group<'a>(group: &[Entry<'a>], data: &mut Vec<u8>) -> Result<()> {
    let mut champion = 0usize;
    for i in 1..group.len() {
        if compare_lww(&group[i].rdx, &group[champion].rdx)?.is_gt() {
            champion = i;
        }
    }
    let champ = group[champion].rdx;
    let champ_tombstone = is_tombstone(champ);

    let same_class: Vec<&Entry<'a>> = group
        .iter()
        .filter(|e| {
            e.rdx.id.rev_compare(&champ.id).is_eq()
                && is_tombstone(e.rdx) == champ_tombstone
                && e.rdx.kind == champ.kind
        })
        .collect();

    if same_class.len() == 1 {
        data.extend_from_slice(same_class[0].last);
        return Ok(());
    }

    if champ.kind.is_plex() {
        let id: Id = same_class[0].rdx.id;
        let payloads: Vec<&[u8]> = same_class.iter().map(|e| e.rdx.value).collect();
        let merged = merge_container(champ.kind, &payloads)?;
        write_rdx(data, champ.kind, id, &merged);
        return Ok(());
    }

    // FIRST: the per-kind value merger picks the max (spec §4.7).
    let mut value_best = 0usize;
    for i in 1..same_class.len() {
        if compare_value(champ.kind, same_class[i].rdx.value, champ.kind, same_class[value_best].rdx.value)?.is_gt() {
            value_best = i;
        }
    }
    data.extend_from_slice(same_class[value_best].last);
    Ok(())
}
