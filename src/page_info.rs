use std::fmt;

use buff::Buff;

use crate::error::{truncate_at_char_boundary, DbResult, Error};

/// Fixed-size prefix of a dumped `PageInfo`: two `f64`, two `u64`, one
/// `f32`, and the `u16` URL-length tag (see the layout table in the module
/// docs below).
const FIXED_PREFIX_LEN: usize = 8 + 8 + 8 + 8 + 4 + 2;

/// Truncate length for the debug `Display` representation.
const PRINT_URL_MAX_LEN: usize = 512;

/// Persisted per-URL aggregate: crawl counts, first/last crawl times,
/// change count, last score, last content hash.
///
/// `dump`/`load` serialize this to the exact little-endian byte layout:
///
/// | Offset | Size | Field |
/// |-------:|-----:|-------|
/// | 0  | 8  | first_crawl (f64) |
/// | 8  | 8  | last_crawl (f64) |
/// | 16 | 8  | n_crawls (u64) |
/// | 24 | 8  | n_changes (u64) |
/// | 32 | 4  | score (f32) |
/// | 36 | 2  | url_length (u16) |
/// | 38 | url_length | url bytes |
/// | …  | 2  | content_hash_length (u16) |
/// | …  | content_hash_length | content_hash bytes |
#[derive(Debug, Clone, PartialEq)]
pub struct PageInfo {
    pub url: String,
    pub first_crawl: f64,
    pub last_crawl: f64,
    pub n_crawls: u64,
    pub n_changes: u64,
    pub score: f32,
    pub content_hash: Vec<u8>,
}

impl PageInfo {
    /// Serializes this `PageInfo` into the layout documented on the type.
    /// Fails if the URL or content hash is too long to fit the `u16`
    /// length tag §4.2 commits to, rather than silently wrapping the
    /// declared length while still writing the full (longer) bytes.
    pub fn dump(&self) -> DbResult<Vec<u8>> {
        let url_bytes = self.url.as_bytes();
        let hash_bytes = &self.content_hash;

        let url_len: u16 = url_bytes.len().try_into().map_err(|_| {
            Error::internal(format!(
                "page_info url is {} bytes, exceeds the u16 length tag",
                url_bytes.len()
            ))
        })?;
        let hash_len: u16 = hash_bytes.len().try_into().map_err(|_| {
            Error::internal(format!(
                "page_info content_hash is {} bytes, exceeds the u16 length tag",
                hash_bytes.len()
            ))
        })?;

        let total = FIXED_PREFIX_LEN + url_bytes.len() + 2 + hash_bytes.len();

        let mut out = vec![0u8; total];
        let mut buf = Buff::new(&mut out);
        buf.write(self.first_crawl);
        buf.write(self.last_crawl);
        buf.write(self.n_crawls);
        buf.write(self.n_changes);
        buf.write(self.score);
        buf.write(url_len);
        buf.write_slice(url_bytes);
        buf.write(hash_len);
        buf.write_slice(hash_bytes);
        debug_assert_eq!(buf.len(), total);

        Ok(out)
    }

    /// Deserializes a `PageInfo` previously produced by [`Self::dump`].
    /// Validates that the buffer length matches the declared field
    /// lengths; any mismatch is a corrupted-record error.
    pub fn load(bytes: &[u8]) -> DbResult<PageInfo> {
        if bytes.len() < FIXED_PREFIX_LEN {
            return Err(Error::internal(
                "page_info buffer shorter than the fixed header",
            ));
        }

        // `Buff` operates on a mutable slice; reading never mutates the
        // copy, so working off an owned copy of the (immutable) stored
        // bytes is sufficient.
        let mut owned = bytes.to_vec();
        let mut buf = Buff::new(&mut owned);

        let first_crawl: f64 = buf.read();
        let last_crawl: f64 = buf.read();
        let n_crawls: u64 = buf.read();
        let n_changes: u64 = buf.read();
        let score: f32 = buf.read();
        let url_length: u16 = buf.read();

        if buf.remaining() < url_length as usize + 2 {
            return Err(Error::internal(
                "page_info buffer truncated before the declared url",
            ));
        }
        let mut url_buf = vec![0u8; url_length as usize];
        buf.read_slice(&mut url_buf);
        let url = String::from_utf8(url_buf)
            .map_err(|_| Error::internal("page_info buffer has non-utf8 url bytes"))?;

        let content_hash_length: u16 = buf.read();
        if buf.remaining() < content_hash_length as usize {
            return Err(Error::internal(
                "page_info buffer truncated before the declared content hash",
            ));
        }
        let mut content_hash = vec![0u8; content_hash_length as usize];
        buf.read_slice(&mut content_hash);

        if buf.remaining() != 0 {
            return Err(Error::internal(
                "page_info buffer has trailing bytes past the declared fields",
            ));
        }

        Ok(PageInfo {
            url,
            first_crawl,
            last_crawl,
            n_crawls,
            n_changes,
            score,
            content_hash,
        })
    }

    /// Estimates how often this page's content changes, for use by
    /// external recrawl schedulers. Zero until at least two crawls have
    /// been observed.
    pub fn rate(&self) -> f32 {
        if self.n_crawls < 2 {
            return 0.0;
        }
        let elapsed_secs = (self.last_crawl - self.first_crawl).max(1.0);
        (self.n_changes as f64 / elapsed_secs) as f32
    }
}

/// Formats a Unix timestamp (seconds) the way C's `ctime` would, e.g.
/// `Mon Jan  1 08:01:59 2015` — always 24 bytes.
fn format_ctime(epoch_secs: f64) -> String {
    use chrono::DateTime;

    match DateTime::from_timestamp(epoch_secs as i64, 0) {
        Some(dt) => dt.format("%a %b %e %H:%M:%S %Y").to_string(),
        None => "?".repeat(24),
    }
}

/// Renders a count in the fixed 8-byte exponential form the debug
/// representation uses: `d.dde±dd`.
fn format_exp8(value: f64) -> String {
    if value == 0.0 {
        return "0.00e+00".to_string();
    }
    let mut exponent = value.abs().log10().floor() as i32;
    let mut mantissa = value / 10f64.powi(exponent);
    if mantissa.abs() >= 10.0 {
        mantissa /= 10.0;
        exponent += 1;
    } else if mantissa.abs() < 1.0 {
        mantissa *= 10.0;
        exponent -= 1;
    }
    let sign = if exponent >= 0 { '+' } else { '-' };
    format!("{mantissa:.2}e{sign}{:02}", exponent.abs())
}

/// Printed representation intended only for human inspection: fixed-width
/// `first_crawl last_crawl n_crawls n_changes url`, URL truncated at 512
/// bytes.
impl fmt::Display for PageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut url = self.url.clone();
        truncate_at_char_boundary(&mut url, PRINT_URL_MAX_LEN);
        write!(
            f,
            "{} {} {} {} {}",
            format_ctime(self.first_crawl),
            format_ctime(self.last_crawl),
            format_exp8(self.n_crawls as f64),
            format_exp8(self.n_changes as f64),
            url
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PageInfo {
        PageInfo {
            url: "http://example.com/a".to_string(),
            first_crawl: 1000.0,
            last_crawl: 3000.0,
            n_crawls: 3,
            n_changes: 1,
            score: 0.5,
            content_hash: vec![0xAA, 0xBB, 0xCC],
        }
    }

    #[test]
    fn dump_load_round_trip() {
        let info = sample();
        assert_eq!(PageInfo::load(&info.dump().unwrap()).unwrap(), info);
    }

    #[test]
    fn dump_load_round_trip_with_empty_fields() {
        let info = PageInfo {
            url: String::new(),
            first_crawl: 0.0,
            last_crawl: 0.0,
            n_crawls: 0,
            n_changes: 0,
            score: 0.0,
            content_hash: Vec::new(),
        };
        assert_eq!(PageInfo::load(&info.dump().unwrap()).unwrap(), info);
    }

    #[test]
    fn load_rejects_short_buffer() {
        assert!(PageInfo::load(&[0u8; 4]).is_err());
    }

    #[test]
    fn load_rejects_truncated_url() {
        let mut bytes = sample().dump().unwrap();
        bytes.truncate(bytes.len() - 1);
        assert!(PageInfo::load(&bytes).is_err());
    }

    #[test]
    fn dump_rejects_url_longer_than_u16_max() {
        let mut info = sample();
        info.url = "a".repeat(u16::MAX as usize + 1);
        assert!(info.dump().is_err());
    }

    #[test]
    fn dump_rejects_content_hash_longer_than_u16_max() {
        let mut info = sample();
        info.content_hash = vec![0u8; u16::MAX as usize + 1];
        assert!(info.dump().is_err());
    }

    #[test]
    fn rate_is_zero_below_two_crawls() {
        let mut info = sample();
        info.n_crawls = 1;
        assert_eq!(info.rate(), 0.0);
    }

    #[test]
    fn rate_matches_change_count_over_elapsed_time() {
        // first_crawl=0, last_crawl=100, n_crawls=3, n_changes=2 => ~0.02
        let info = PageInfo {
            first_crawl: 0.0,
            last_crawl: 100.0,
            n_crawls: 3,
            n_changes: 2,
            ..sample()
        };
        assert!((info.rate() - 0.02).abs() < 1e-6);
    }

    #[test]
    fn display_is_bounded_and_truncates_long_urls() {
        let mut info = sample();
        info.url = "a".repeat(1000);
        let rendered = info.to_string();
        assert!(rendered.len() <= 24 + 1 + 24 + 1 + 8 + 1 + 8 + 1 + PRINT_URL_MAX_LEN);
    }

    #[test]
    fn display_truncates_multibyte_urls_without_panicking() {
        // 200 three-byte chars = 600 bytes; byte offset 512 falls mid-char,
        // so a naive `String::truncate(512)` would panic here.
        let mut info = sample();
        info.url = "\u{20AC}".repeat(200);
        let rendered = info.to_string();
        let url_part = rendered.rsplit(' ').next().unwrap();
        assert!(url_part.len() <= PRINT_URL_MAX_LEN);
    }
}
