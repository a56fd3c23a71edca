//! `Range: bytes=<start>-<end>` handling
//!
//! Only the first `bytes=<digits>-<digits?>` occurrence in the header is
//! honored. Anything else (suffix ranges, garbage) means "whole file".

/// Resolved byte window of one response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte, inclusive
    pub start: u64,
    /// Last byte, inclusive
    pub end: u64,
    /// Size of the whole file
    pub size: u64,
}

/// The requested window holds no bytes of the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unsatisfiable;

impl ByteRange {
    /// Resolve an optional `Range` header against a file of `size` bytes
    ///
    /// A missing or unrecognized header selects the whole file, an omitted
    /// end means the last byte, and an end past EOF is clamped to the last
    /// byte. A start after the end, or any range on an empty file, is
    /// [`Unsatisfiable`].
    pub fn resolve(header: Option<&str>, size: u64) -> Result<Self, Unsatisfiable> {
        let last = size.checked_sub(1).ok_or(Unsatisfiable)?;

        let (start, end) = match header.and_then(parse_range_header) {
            Some((start, end)) => (start, end.map_or(last, |end| end.min(last))),
            None => (0, last),
        };

        if start > end {
            return Err(Unsatisfiable);
        }

        Ok(Self { start, end, size })
    }

    /// Number of bytes in the window
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` header
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.size)
    }
}

/// Find the first `bytes=<start>-<end?>` in a header value
pub fn parse_range_header(header: &str) -> Option<(u64, Option<u64>)> {
    header
        .match_indices("bytes=")
        .find_map(|(idx, prefix)| parse_spec(&header[idx + prefix.len()..]))
}

/// Parse `<start>-<end?>` at the beginning of `spec`, ignoring what follows
fn parse_spec(spec: &str) -> Option<(u64, Option<u64>)> {
    let start_len = leading_digits(spec);
    if start_len == 0 {
        return None;
    }
    let start = spec[..start_len].parse().ok()?;

    let rest = spec[start_len..].strip_prefix('-')?;
    let end_len = leading_digits(rest);
    let end = if end_len == 0 {
        None
    } else {
        Some(rest[..end_len].parse().ok()?)
    };

    Some((start, end))
}

fn leading_digits(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_digit).count()
}
