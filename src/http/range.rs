//! HTTP Range request parsing module
//!
//! Single `bytes` ranges only, per RFC 9110 §14. Multi-range and other units
//! are ignored and the full representation is served.

use std::ops::RangeInclusive;

/// Outcome of evaluating a `Range` header against a body length
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteRange {
    /// No usable Range header: send everything
    Full,
    /// Inclusive byte span to send with 206
    Partial(RangeInclusive<usize>),
    /// Range lies outside the body: answer 416
    Unsatisfiable,
}

/// Evaluate a `Range` header value
///
/// Supported formats:
/// - `bytes=start-end` - Specific range
/// - `bytes=start-` - From start to end
/// - `bytes=-suffix` - Last suffix bytes
///
/// # Examples
/// ```
/// use hyper_render::http::range::{parse_range, ByteRange};
/// assert_eq!(parse_range(Some("bytes=0-99"), 1000), ByteRange::Partial(0..=99));
/// assert_eq!(parse_range(None, 1000), ByteRange::Full);
/// ```
pub fn parse_range(header: Option<&str>, len: usize) -> ByteRange {
    let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return ByteRange::Full;
    };
    if spec.contains(',') {
        return ByteRange::Full;
    }
    let Some((first, last)) = spec.split_once('-') else {
        return ByteRange::Full;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        return suffix_range(last, len);
    }

    let Ok(start) = first.parse::<usize>() else {
        return ByteRange::Full;
    };
    if start >= len {
        return ByteRange::Unsatisfiable;
    }

    let end = if last.is_empty() {
        len - 1
    } else {
        match last.parse::<usize>() {
            Ok(e) => e.min(len - 1),
            Err(_) => return ByteRange::Full,
        }
    };

    if start > end {
        ByteRange::Unsatisfiable
    } else {
        ByteRange::Partial(start..=end)
    }
}

/// `bytes=-N`: the last N bytes, the whole body when N exceeds it
fn suffix_range(count: &str, len: usize) -> ByteRange {
    let Ok(count) = count.parse::<usize>() else {
        return ByteRange::Full;
    };
    if count == 0 || len == 0 {
        return ByteRange::Unsatisfiable;
    }
    ByteRange::Partial(len.saturating_sub(count)..=len - 1)
}
