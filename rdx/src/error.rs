//! The error taxonomy of spec §7. One concrete enum, never an opaque
//! `Box<dyn Error>` — callers pattern-match on the variant they care about
//! (e.g. the brix-level "skip on `NotFound`, keep going" rule in §7).

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed framing or internal structure.
    #[error("bad record: {0}")]
    BadRecord(&'static str),
    /// Buffer ended mid-record; recoverable by reading more.
    #[error("incomplete record")]
    Incomplete,
    /// Writer invariant violated: ids did not strictly increase.
    #[error("ids must strictly increase: previous {previous}, got {next}")]
    BadOrder { previous: String, next: String },
    /// Open/close mismatch in the stack-based TLV writer.
    #[error("bad TLV nesting")]
    BadNesting,
    /// Brick header magic or section-length alignment is wrong.
    #[error("bad brick header")]
    BadHeader,
    /// Short read on the header; not a brick file at all.
    #[error("not a valid brick file")]
    BadFile,
    /// No such record, or no such hash.
    #[error("not found")]
    NotFound,
    /// A mutating operation was attempted on a sealed/read-only handle.
    #[error("handle is read-only")]
    ReadOnly,
    /// An operation was attempted on a closed handle.
    #[error("handle is not open")]
    NotOpen,
    /// A brix chain exceeded the maximum fan-in.
    #[error("brix chain longer than {limit} bricks")]
    TooManyBrix { limit: usize },
    #[error("invalid UTF-8 in String value")]
    BadUtf8,
    #[error("invalid float value (NaN)")]
    BadFloat,
    #[error("invalid integer encoding")]
    BadInteger,
    #[error("invalid string encoding")]
    BadString,
    #[error("invalid term: not in the base-64 alphabet")]
    BadTerm,
    #[error("invalid reference encoding")]
    BadReference,
    /// The Merkle peak-hash line is exhausted (more than 2^64 pages).
    #[error("out of range")]
    OutOfRange,
    /// An index entry names a compression tag this reader doesn't know.
    #[error("unsupported compression block type")]
    BlockNotSupported,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Lz4Decompress(#[from] lz4_flex::block::DecompressError),
    #[error(transparent)]
    Id(#[from] rdx_types::Error),
    #[error(transparent)]
    Merkle(#[from] rdx_merkle::Error),
    #[error(transparent)]
    Storage(#[from] rdx_storage::Error),
}
