use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while parsing or manipulating identifiers and the
/// varint/zigzag byte forms that carry them.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("bad id syntax")]
    BadIdSyntax,
    #[error("id source or sequence exceeds 60 bits")]
    OutOfRange,
    #[error("unexpected end of varint byte stream")]
    Incomplete,
    #[error("unrecognized kind tag byte")]
    BadKind,
}
