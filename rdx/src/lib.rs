//! RDX: a self-describing, causally-ordered, mergeable binary data model,
//! plus a content-addressed immutable brick store built on top of it.
//!
//! The codec (§3.1–§3.3) and comparator/merge machinery (§4.5–§4.8) have no
//! notion of a file; the brick/brix layers (§4.9–§4.12) are the only parts
//! that touch storage, and only through the capability traits in
//! `rdx_storage`.

pub mod brick;
pub mod brix;
pub mod codec;
pub mod compare;
pub mod error;
pub mod heap;
pub mod iter;
pub mod merge;
pub mod normalize;
pub mod options;
pub mod tlv;

pub use brick::{BrickReader, BrickWriter, Scan};
pub use brix::{Brix, BrixScan};
pub use codec::{flatten, read_rdx, write_rdx, Rdx};
pub use error::{Error, Result};
pub use iter::Iter;
pub use merge::{merge, merge_container};
pub use normalize::normalize;
pub use options::{BrickWriterOptions, BrixOptions};

pub use rdx_merkle::{PeakLine, Sha256};
pub use rdx_types::{Id, Kind, Order};
