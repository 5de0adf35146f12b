use std::fmt;

/// The stable taxonomy from the page database's error surface: `memory`,
/// `invalid_path`, `internal`, `no_page`. Every variant carries a
/// human-readable message, truncated so a single error can never grow
/// unbounded in memory.
const MAX_ERROR_MESSAGE: usize = 10_000;

pub type DbResult<T, E = Error> = Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Allocation failure anywhere in the core.
    #[error("memory error: {0}")]
    Memory(String),

    /// Filesystem problem creating or accessing the database directory.
    #[error("invalid database path: {0}")]
    InvalidPath(String),

    /// Unexpected error from the underlying KV engine (I/O, map-full,
    /// corruption) or a malformed on-disk record.
    #[error("internal storage error: {0}")]
    Internal(String),

    /// A URL/hash was required to be present but was not found.
    #[error("no such page: {0}")]
    NoPage(String),
}

/// Truncates `s` to at most `max_len` bytes, backing off to the nearest
/// preceding char boundary so the cut never lands inside a multi-byte
/// UTF-8 sequence (`String::truncate` panics in that case).
pub(crate) fn truncate_at_char_boundary(s: &mut String, max_len: usize) {
    if s.len() <= max_len {
        return;
    }
    let mut boundary = max_len;
    while !s.is_char_boundary(boundary) {
        boundary -= 1;
    }
    s.truncate(boundary);
}

impl Error {
    fn truncated(msg: impl fmt::Display) -> String {
        let mut msg = msg.to_string();
        truncate_at_char_boundary(&mut msg, MAX_ERROR_MESSAGE);
        msg
    }

    pub(crate) fn memory(msg: impl fmt::Display) -> Error {
        Error::Memory(Self::truncated(msg))
    }

    pub(crate) fn invalid_path(msg: impl fmt::Display) -> Error {
        Error::InvalidPath(Self::truncated(msg))
    }

    pub(crate) fn internal(msg: impl fmt::Display) -> Error {
        Error::Internal(Self::truncated(msg))
    }

    pub(crate) fn no_page(url: impl fmt::Display) -> Error {
        Error::NoPage(Self::truncated(url))
    }
}

impl From<heed::Error> for Error {
    fn from(value: heed::Error) -> Self {
        match &value {
            heed::Error::Mdb(heed::MdbError::MapFull) => {
                Error::internal(format!("mmap region exhausted: {value}"))
            }
            _ => Error::internal(value),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::invalid_path(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_multibyte_message_without_panicking() {
        // Each "no_page" URL below is a three-byte char repeated so that
        // MAX_ERROR_MESSAGE (10_000, itself a multiple of... well, not of
        // 3) falls mid-character; a naive `String::truncate` would panic.
        let url: String = "\u{20AC}".repeat(MAX_ERROR_MESSAGE);
        let err = Error::no_page(&url);
        match err {
            Error::NoPage(msg) => assert!(msg.len() <= MAX_ERROR_MESSAGE),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn leaves_short_messages_untouched() {
        match Error::internal("short message") {
            Error::Internal(msg) => assert_eq!(msg, "short message"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
