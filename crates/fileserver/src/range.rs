//! HTTP `Range` header parsing

/// Inclusive byte interval of a file served in one response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeWindow {
    pub start: u64,
    pub end: u64,
}

impl RangeWindow {
    /// Number of bytes in the window
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` header of a 206 response
    pub fn content_range(&self, file_size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, file_size)
    }
}

/// A `Range` header that cannot be served
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("range not satisfiable for file of {file_size} bytes")]
    Unsatisfiable { file_size: u64 },
}

impl RangeError {
    /// Value for the `Content-Range` header of a 416 response
    pub fn content_range(&self) -> String {
        match self {
            RangeError::Unsatisfiable { file_size } => format!("bytes */{}", file_size),
        }
    }
}

/// Parse a `bytes=<start>-<end>` header against a file of `file_size` bytes
///
/// `end` defaults to the last byte. Only a single range is accepted, and
/// the window must satisfy `start <= end < file_size`; anything else is
/// unsatisfiable rather than silently clamped.
pub fn parse_range(header: &str, file_size: u64) -> Result<RangeWindow, RangeError> {
    let unsatisfiable = RangeError::Unsatisfiable { file_size };

    let byte_range = header
        .trim()
        .strip_prefix("bytes=")
        .ok_or_else(|| unsatisfiable.clone())?;

    if byte_range.contains(',') {
        return Err(unsatisfiable);
    }

    let (start, end) = byte_range.split_once('-').ok_or_else(|| unsatisfiable.clone())?;
    let (start, end) = (start.trim(), end.trim());

    let start = parse_bound(start).ok_or_else(|| unsatisfiable.clone())?;
    let end = if end.is_empty() {
        file_size.checked_sub(1).ok_or_else(|| unsatisfiable.clone())?
    } else {
        parse_bound(end).ok_or_else(|| unsatisfiable.clone())?
    };

    if start > end || end >= file_size {
        return Err(unsatisfiable);
    }

    Ok(RangeWindow { start, end })
}

// Plain decimal digits only; `u64::from_str` would also accept a leading '+'.
fn parse_bound(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
