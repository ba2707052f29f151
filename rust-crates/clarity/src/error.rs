use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("input ended before the value was complete")]
    UnexpectedEnd,
    #[error("{0} trailing byte(s) after the value")]
    TrailingBytes(usize),
    #[error("unknown type prefix {0:#04x}")]
    UnknownTypePrefix(u8),
    #[error("value nesting exceeds {0} levels")]
    DepthExceeded(usize),
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("string-utf8 payload is not valid UTF-8")]
    InvalidUtf8,
    #[error("string-ascii payload contains non-ASCII bytes")]
    NotAscii,
    #[error("{what} of length {len} does not fit its length prefix")]
    LengthOverflow { what: &'static str, len: usize },
    #[error("invalid c32 character {0:?}")]
    InvalidC32Character(char),
    #[error("invalid address {0:?}")]
    InvalidAddress(String),
    #[error("address checksum mismatch")]
    ChecksumMismatch,
}
