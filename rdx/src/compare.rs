//! The RDX comparator vtable (spec §4.5): one element ordering per
//! container kind, plus the last-writer-wins resolver used to pick a
//! winner among same-slot duplicates (spec §3.4).

use rdx_types::varint::{unzip_f64, unzip_i64};
use rdx_types::{Id, Kind, Order};

use crate::codec::{read_rdx, Rdx};
use crate::error::Result;

/// Orders two elements as they would appear as children of a container of
/// kind `container`. `Tuple` has no intrinsic key — its children are kept
/// in the order the writer placed them — so this always returns `Eq` for a
/// `Tuple` parent; callers that need Tuple ordering compare by position
/// directly.
pub fn compare_in_container(container: Kind, a: &Rdx, b: &Rdx) -> Result<Order> {
    match container {
        Kind::Tuple => Ok(Order::Eq),
        Kind::Linear => Ok(compare_linear(a, b)),
        Kind::Euler => compare_euler(a, b),
        Kind::Multix => Ok(compare_multix(a, b)),
        other => unreachable!("{other:?} is not a container kind"),
    }
}

/// `(lex_of(seq>>6), source)`.
fn compare_linear(a: &Rdx, b: &Rdx) -> Order {
    match a.id.lex_key().cmp(&b.id.lex_key()).then(a.id.source.cmp(&b.id.source)) {
        std::cmp::Ordering::Equal => Order::Eq,
        ord => Order::from(ord),
    }
}

/// By child value; a `Tuple` child is unwrapped to its first element first,
/// so e.g. a set of `(key, value)` pairs orders (and dedupes) by `key`.
fn compare_euler(a: &Rdx, b: &Rdx) -> Result<Order> {
    let (a_kind, a_value) = euler_key(a)?;
    let (b_kind, b_value) = euler_key(b)?;
    compare_value(a_kind, a_value, b_kind, b_value)
}

fn euler_key<'a>(e: &Rdx<'a>) -> Result<(Kind, &'a [u8])> {
    if e.kind == Kind::Tuple {
        match read_rdx(e.value)? {
            Some(first) => Ok((first.kind, first.value)),
            None => Ok((Kind::Tuple, e.value)),
        }
    } else {
        Ok((e.kind, e.value))
    }
}

/// By `id.source` only (spec's fixed disposition of the Multix Open
/// Question: source-only for keying).
fn compare_multix(a: &Rdx, b: &Rdx) -> Order {
    Order::from(a.id.source.cmp(&b.id.source))
}

/// Kind-ranking tie-break: PLEX beats FIRST; among the same class, the
/// larger tag byte wins (spec §3.4, §4.7).
pub fn compare_type(a: Kind, b: Kind) -> Order {
    match (a.is_plex(), b.is_plex()) {
        (true, false) => Order::Grtr,
        (false, true) => Order::Less,
        _ => Order::from(a.tag().cmp(&b.tag())),
    }
}

/// Deep comparison of two values of the same kind. For FIRST kinds this
/// decodes and compares the payload; for PLEX kinds (reached only when two
/// elements tie on id, type and this pairwise value check is used as a
/// final deterministic tie-break) it falls back to raw payload byte order.
pub fn compare_value(a_kind: Kind, a_value: &[u8], b_kind: Kind, b_value: &[u8]) -> Result<Order> {
    if a_kind != b_kind {
        return Ok(compare_type(a_kind, b_kind));
    }
    Ok(match a_kind {
        Kind::Float => {
            let (a, _) = unzip_f64(a_value)?;
            let (b, _) = unzip_f64(b_value)?;
            Order::from(a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal))
        }
        Kind::Integer => {
            let (a, _) = unzip_i64(a_value)?;
            let (b, _) = unzip_i64(b_value)?;
            Order::from(a.cmp(&b))
        }
        Kind::Reference => {
            let (a, _) = Id::unzip(a_value).map_err(|_| crate::error::Error::BadReference)?;
            let (b, _) = Id::unzip(b_value).map_err(|_| crate::error::Error::BadReference)?;
            a.compare(&b)
        }
        Kind::String | Kind::Term => Order::from(a_value.cmp(b_value)),
        Kind::Tuple | Kind::Linear | Kind::Euler | Kind::Multix => Order::from(a_value.cmp(b_value)),
    })
}

/// `CompareLWW = revCompare(a,b) ; if Eq then CompareType ; if still Eq then
/// CompareValue`, with the empty-`Tuple`-as-tombstone rule: an empty Tuple
/// is less than any concrete value once stamps tie (spec §3.4).
pub fn compare_lww(a: &Rdx, b: &Rdx) -> Result<Order> {
    let rev = a.id.rev_compare(&b.id);
    if rev != Order::Eq {
        return Ok(rev);
    }
    let a_tombstone = a.kind == Kind::Tuple && a.value.is_empty();
    let b_tombstone = b.kind == Kind::Tuple && b.value.is_empty();
    if a_tombstone != b_tombstone {
        return Ok(if a_tombstone { Order::Less } else { Order::Grtr });
    }
    let ty = compare_type(a.kind, b.kind);
    if ty != Order::Eq {
        return Ok(ty);
    }
    compare_value(a.kind, a.value, b.kind, b.value)
}
