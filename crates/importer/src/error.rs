// ABOUTME: Error types for the importer including the ErrorCode enum and ImportError struct.
// ABOUTME: Provides categorized errors with convenience constructors and boolean helpers.

use std::fmt;

/// Error codes representing different categories of import failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidUrl,
    Fetch,
    Status(u16),
    NotFound,
    Decode,
    Store,
    Io,
    Convert,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::InvalidUrl => write!(f, "invalid URL"),
            ErrorCode::Fetch => write!(f, "fetch error"),
            ErrorCode::Status(status) => write!(f, "HTTP status {}", status),
            ErrorCode::NotFound => write!(f, "not found"),
            ErrorCode::Decode => write!(f, "decode error"),
            ErrorCode::Store => write!(f, "store error"),
            ErrorCode::Io => write!(f, "I/O error"),
            ErrorCode::Convert => write!(f, "conversion error"),
        }
    }
}

/// The main error type for import operations.
///
/// `target` is whatever the failing operation was aimed at: a URL, a
/// collection name or a file path.
#[derive(Debug, thiserror::Error)]
pub struct ImportError {
    pub code: ErrorCode,
    pub target: String,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wp2payload: {} {}: {}", self.op, self.target, self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl ImportError {
    fn with_code(
        code: ErrorCode,
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            target: target.into(),
            op: op.into(),
            source,
        }
    }

    /// Create an InvalidUrl error.
    pub fn invalid_url(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::InvalidUrl, target, op, source)
    }

    /// Create a Fetch (transport) error.
    pub fn fetch(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::Fetch, target, op, source)
    }

    /// Create an error for a non-success HTTP status.
    pub fn status(
        target: impl Into<String>,
        op: impl Into<String>,
        status: u16,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::Status(status), target, op, source)
    }

    pub fn not_found(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::NotFound, target, op, source)
    }

    pub fn decode(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::Decode, target, op, source)
    }

    pub fn store(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::Store, target, op, source)
    }

    pub fn io(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::Io, target, op, source)
    }

    pub fn convert(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::Convert, target, op, source)
    }

    /// HTTP status carried by this error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self.code {
            ErrorCode::Status(status) => Some(status),
            _ => None,
        }
    }

    /// Returns true for an HTTP 404.
    pub fn is_not_found_status(&self) -> bool {
        self.code == ErrorCode::Status(404)
    }

    /// Returns true if this is a Status error.
    pub fn is_status(&self) -> bool {
        matches!(self.code, ErrorCode::Status(_))
    }

    /// Returns true if this is a Fetch error.
    pub fn is_fetch(&self) -> bool {
        self.code == ErrorCode::Fetch
    }

    /// Returns true if this is a Store error.
    pub fn is_store(&self) -> bool {
        self.code == ErrorCode::Store
    }

    /// Returns true if this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NotFound
    }

    /// Returns true if this is an InvalidUrl error.
    pub fn is_invalid_url(&self) -> bool {
        self.code == ErrorCode::InvalidUrl
    }

    /// Returns true if this is a Decode error.
    pub fn is_decode(&self) -> bool {
        self.code == ErrorCode::Decode
    }

    /// Returns true if this is an Io error.
    pub fn is_io(&self) -> bool {
        self.code == ErrorCode::Io
    }

    /// Source chain rendered on one line, for the failure log.
    pub fn detail(&self) -> Option<String> {
        self.source.as_ref().map(|src| format!("{:#}", src))
    }
}

impl From<wp2payload_richtext::ConvertError> for ImportError {
    fn from(err: wp2payload_richtext::ConvertError) -> Self {
        ImportError::convert("content", "Convert", Some(anyhow::Error::new(err)))
    }
}
