//! HTTP Range request parsing module
//!
//! Single byte-range support (RFC 7233) for seekable asset streams.

/// Parsed, clamped byte range, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    #[inline]
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value
    pub fn content_range(&self, total_size: u64) -> String {
        format!("bytes {}-{}/{total_size}", self.start, self.end)
    }
}

/// Range header parse result
#[derive(Debug, PartialEq, Eq)]
pub enum RangeParseResult {
    /// Valid range request
    Valid(ByteRange),
    /// Range cannot be satisfied for this size, should return 416
    NotSatisfiable,
    /// No Range header or unsupported form, serve full content
    None,
}

/// Parse HTTP Range header (single range only, bytes unit)
///
/// Supported formats:
/// - `bytes=start-end` - Specific range
/// - `bytes=start-` - From start to end
/// - `bytes=-suffix` - Last suffix bytes
///
/// Multi-range requests are answered with the full content.
pub fn parse_range_header(range_header: Option<&str>, size: u64) -> RangeParseResult {
    let Some(spec) = range_header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeParseResult::None;
    };

    if spec.contains(',') {
        return RangeParseResult::None;
    }

    let Some((start_str, end_str)) = spec.split_once('-') else {
        return RangeParseResult::None;
    };
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    if start_str.is_empty() {
        return parse_suffix_range(end_str, size);
    }

    parse_standard_range(start_str, end_str, size)
}

/// Check an `If-Range` precondition against the current validator
///
/// Only entity tags are supported, a date never matches since assets
/// carry no modification time.
pub fn if_range_matches(if_range: Option<&str>, etag: &str) -> bool {
    if_range.map_or(true, |v| v.trim() == etag)
}

/// Parse suffix range (e.g. "-500")
fn parse_suffix_range(suffix_str: &str, size: u64) -> RangeParseResult {
    let Ok(suffix) = suffix_str.parse::<u64>() else {
        return RangeParseResult::None;
    };

    if suffix == 0 || size == 0 {
        return RangeParseResult::NotSatisfiable;
    }

    // Suffix larger than the content selects all of it
    RangeParseResult::Valid(ByteRange {
        start: size.saturating_sub(suffix),
        end: size - 1,
    })
}

/// Parse standard range (e.g. "0-99" or "100-")
fn parse_standard_range(start_str: &str, end_str: &str, size: u64) -> RangeParseResult {
    let Ok(start) = start_str.parse::<u64>() else {
        return RangeParseResult::None;
    };

    if start >= size {
        return RangeParseResult::NotSatisfiable;
    }

    let end = if end_str.is_empty() {
        size - 1
    } else {
        let Ok(e) = end_str.parse::<u64>() else {
            return RangeParseResult::None;
        };
        if e < start {
            return RangeParseResult::None;
        }
        e.min(size - 1)
    };

    RangeParseResult::Valid(ByteRange { start, end })
}
