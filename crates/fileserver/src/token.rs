//! Opaque path tokens for carrying filesystem paths through URLs

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// URL-safe alphabet, no padding on encode, padding tolerated on decode
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors produced when a token cannot be turned back into a path
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Token is not valid base64
    #[error("malformed path token: {0}")]
    Malformed(#[from] base64::DecodeError),
    /// Decoded bytes are not a path on this platform
    #[error("path token does not decode to a valid path")]
    InvalidPath,
}

/// A reversible, URL-safe encoding of one filesystem path
///
/// Tokens are never inspected by callers. They are handed to the client
/// inside links and only turned back into a path with [`PathToken::decode`]
/// at the request boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct PathToken(String);

impl PathToken {
    /// Encode a path into a token
    pub fn encode(path: &Path) -> Self {
        PathToken(TOKEN_ENGINE.encode(path_bytes(path)))
    }

    /// Decode the token back into the path it was created from
    ///
    /// # Errors
    /// Returns [`TokenError`] when the token is not something [`PathToken::encode`]
    /// could have produced.
    pub fn decode(&self) -> Result<PathBuf, TokenError> {
        let bytes = TOKEN_ENGINE.decode(self.0.as_bytes())?;
        path_from_bytes(bytes)
    }

    /// Raw token text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the token is the empty string
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for PathToken {
    fn from(token: String) -> Self {
        PathToken(token)
    }
}

impl From<&str> for PathToken {
    fn from(token: &str) -> Self {
        PathToken(token.to_string())
    }
}

impl fmt::Display for PathToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> &[u8] {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes()
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> Result<PathBuf, TokenError> {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;
    Ok(PathBuf::from(OsString::from_vec(bytes)))
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> std::borrow::Cow<'_, [u8]> {
    match path.to_string_lossy() {
        std::borrow::Cow::Borrowed(s) => std::borrow::Cow::Borrowed(s.as_bytes()),
        std::borrow::Cow::Owned(s) => std::borrow::Cow::Owned(s.into_bytes()),
    }
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> Result<PathBuf, TokenError> {
    String::from_utf8(bytes)
        .map(PathBuf::from)
        .map_err(|_| TokenError::InvalidPath)
}
