//! The k-way heap merge engine (spec §4.6), grounded on `itheap.go`'s
//! `Heap`/`Heapize`/`Up`/`Down`/`EqUp`/`NextK`/`MergeNext`: a binary min-heap
//! of stream cursors, kept ordered by a caller-supplied comparator, that
//! repeatedly pulls off the group of elements tied for the lowest key and
//! hands that group to a caller-supplied tie-group merger.
//!
//! This module knows nothing about RDX value semantics — [`crate::merge`]
//! supplies the comparator and the tie-group merge closure.

use crate::codec::{read_rdx, Rdx};
use crate::error::Result;
use rdx_types::Order;

/// A comparator over two elements' parsed records, used both to order the
/// heap and to detect same-key tie groups.
pub type Cmp<'a> = dyn Fn(&Rdx<'a>, &Rdx<'a>) -> Result<Order> + 'a;

/// One stream cursor: the currently-parsed record plus the raw bytes it was
/// read from (`last`), reused verbatim when a tie group has only one
/// member.
pub struct Entry<'a> {
    pub rdx: Rdx<'a>,
    pub last: &'a [u8],
}

impl<'a> Entry<'a> {
    fn from_stream(stream: &'a [u8]) -> Result<Option<Entry<'a>>> {
        match read_rdx(stream)? {
            Some(rdx) => {
                let consumed = stream.len() - rdx.rest.len();
                Ok(Some(Entry { rdx, last: &stream[..consumed] }))
            }
            None => Ok(None),
        }
    }
}

/// Builds a min-heap of stream cursors, one per non-empty input stream.
pub fn heapize<'a>(streams: &[&'a [u8]], cmp: &Cmp<'a>) -> Result<Vec<Entry<'a>>> {
    let mut heap = Vec::with_capacity(streams.len());
    for &s in streams {
        if s.is_empty() {
            continue;
        }
        if let Some(entry) = Entry::from_stream(s)? {
            heap.push(entry);
            let idx = heap.len() - 1;
            sift_up(&mut heap, idx, cmp)?;
        }
    }
    Ok(heap)
}

fn sift_up<'a>(heap: &mut [Entry<'a>], mut a: usize, cmp: &Cmp<'a>) -> Result<()> {
    while a != 0 {
        let b = (a - 1) / 2;
        if cmp(&heap[a].rdx, &heap[b].rdx)?.is_lt() {
            heap.swap(a, b);
            a = b;
        } else {
            break;
        }
    }
    Ok(())
}

fn sift_down<'a>(heap: &mut [Entry<'a>], i0: usize, cmp: &Cmp<'a>) -> Result<bool> {
    let n = heap.len();
    let mut i = i0;
    loop {
        let j1 = 2 * i + 1;
        if j1 >= n {
            break;
        }
        let mut j = j1;
        let j2 = j1 + 1;
        if j2 < n && cmp(&heap[j2].rdx, &heap[j1].rdx)?.is_lt() {
            j = j2;
        }
        if !cmp(&heap[j].rdx, &heap[i].rdx)?.is_lt() {
            break;
        }
        heap.swap(i, j);
        i = j;
    }
    Ok(i > i0)
}

/// Rotates every heap entry tied with `heap[0]` under `cmp` to the front,
/// returning how many there are. Entries past the returned count are
/// untouched.
pub fn eq_up<'a>(heap: &mut [Entry<'a>], cmp: &Cmp<'a>) -> Result<usize> {
    if heap.len() < 2 {
        return Ok(heap.len());
    }
    let mut queue = vec![1usize, 2];
    let mut eqs = 1usize;
    let mut qi = 0usize;
    while qi < queue.len() && queue[qi] < heap.len() {
        let n = queue[qi];
        if cmp(&heap[0].rdx, &heap[n].rdx)?.is_eq() {
            let j1 = 2 * n + 1;
            queue.push(j1);
            queue.push(j1 + 1);
            heap.swap(eqs, n);
            eqs += 1;
        }
        qi += 1;
    }
    Ok(eqs)
}

/// Advances the first `k` heap entries to their stream's next record,
/// dropping any now-exhausted stream, and restores the heap property for
/// each slot touched.
fn next_k<'a>(mut heap: Vec<Entry<'a>>, k: usize, cmp: &Cmp<'a>) -> Result<Vec<Entry<'a>>> {
    for i in (0..k).rev() {
        if heap[i].rdx.rest.is_empty() {
            let last = heap.len() - 1;
            heap.swap(i, last);
            heap.pop();
            if i < heap.len() {
                sift_down(&mut heap, i, cmp)?;
            }
        } else {
            let advanced = Entry::from_stream(heap[i].rdx.rest)?
                .expect("rest was checked non-empty above");
            heap[i] = advanced;
            sift_down(&mut heap, i, cmp)?;
        }
    }
    Ok(heap)
}

/// Pops the next tie group off the heap, hands it to `merge_tie` to append
/// its merged bytes to `data` (or copies the lone survivor's raw bytes
/// through untouched), and advances past it.
pub fn merge_next<'a>(
    heap: Vec<Entry<'a>>,
    data: &mut Vec<u8>,
    cmp: &Cmp<'a>,
    mut merge_tie: impl FnMut(&[Entry<'a>], &mut Vec<u8>) -> Result<()>,
) -> Result<Vec<Entry<'a>>> {
    let mut heap = heap;
    let eqlen = eq_up(&mut heap, cmp)?;
    if eqlen == 1 {
        data.extend_from_slice(heap[0].last);
    } else {
        merge_tie(&heap[..eqlen], data)?;
    }
    next_k(heap, eqlen, cmp)
}

/// Runs the merge loop to completion: repeatedly pops the next tie group
/// until every input stream is exhausted.
pub fn heap_merge<'a>(
    streams: &[&'a [u8]],
    cmp: &Cmp<'a>,
    mut merge_tie: impl FnMut(&[Entry<'a>], &mut Vec<u8>) -> Result<()>,
) -> Result<Vec<u8>> {
    let mut heap = heapize(streams, cmp)?;
    let mut data = Vec::new();
    while !heap.is_empty() {
        heap = merge_next(heap, &mut data, cmp, &mut merge_tie)?;
    }
    Ok(data)
}
