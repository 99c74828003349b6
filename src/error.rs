//! Error taxonomy for the annotation engine.
//!
//! Only [`DocumentLoadError`] is fatal to a session. Render and persistence
//! failures are local to one page and never abort the session.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

/// Stable machine-readable code and retry hint for surfaced errors.
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// The score's PDF could not be opened.
#[derive(Debug, thiserror::Error)]
pub enum DocumentLoadError {
    /// The PDF bytes could not be fetched from the score service.
    #[error("failed to fetch document: {0}")]
    Fetch(#[from] PersistenceError),

    /// The rasterizer rejected the bytes.
    #[error("not a valid PDF: {0}")]
    InvalidPdf(String),

    /// The document opened but has no pages.
    #[error("document has no pages")]
    Empty,
}

/// Rasterizing a frame failed. The previous frame stays on screen.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The rasterizer failed on one page.
    #[error("failed to render page {page}: {reason}")]
    Page { page: u32, reason: String },

    /// A newer render request replaced this one before it completed.
    #[error("render ticket {0} superseded")]
    Superseded(u64),
}

/// Saving or loading an annotation document failed.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// The request never produced a response.
    #[error("annotation service request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status other than 404 on load.
    #[error("annotation service returned status {status}")]
    Status { status: u16, body: String },

    /// The stored document could not be parsed.
    #[error("malformed annotation document: {0}")]
    Malformed(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The service base URL cannot carry the score paths.
    #[error("invalid annotation service URL: {0}")]
    InvalidUrl(String),
}

/// Anything an [`crate::session::AnnotationSession`] call can surface.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    DocumentLoad(#[from] DocumentLoadError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl ErrorCode for DocumentLoadError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "E_DOCUMENT_FETCH",
            Self::InvalidPdf(_) => "E_INVALID_PDF",
            Self::Empty => "E_EMPTY_DOCUMENT",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Fetch(e) if e.retryable())
    }
}

impl ErrorCode for RenderError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Page { .. } => "E_RENDER_PAGE",
            Self::Superseded(_) => "E_RENDER_SUPERSEDED",
        }
    }
}

impl ErrorCode for PersistenceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "E_PERSIST_TRANSPORT",
            Self::Status { .. } => "E_PERSIST_STATUS",
            Self::Malformed(_) => "E_PERSIST_MALFORMED",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::InvalidUrl(_) => "E_INVALID_URL",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { status: 429 | 500..=599, .. })
    }
}

impl ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::DocumentLoad(e) => e.error_code(),
            Self::Persistence(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::DocumentLoad(e) => e.retryable(),
            Self::Persistence(e) => e.retryable(),
        }
    }
}
