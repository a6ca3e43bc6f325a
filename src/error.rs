use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur when the
/// tools query the identity service, merge the credential report, or move
/// data in and out of workbooks.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when a sheet does not follow the expected conventions.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Transport-level failures while talking to the identity service.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A structured error response returned by the identity service.
    #[error("IAM API error {code}: {message}")]
    Api { code: String, message: String },

    /// Raised when an API response body cannot be parsed as XML.
    #[error("malformed API response: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Raised when the credential report content cannot be decoded.
    #[error("credential report decode error: {0}")]
    ReportDecode(#[from] base64::DecodeError),

    /// Raised when the credential report CSV cannot be parsed.
    #[error("credential report parse error: {0}")]
    ReportParse(#[from] csv::Error),

    /// Raised when the credential report is still pending at the deadline.
    #[error("credential report not ready after {}s", .waited.as_secs())]
    ReportDeadline { waited: Duration },

    /// Raised when request signing fails.
    #[error("request signing error: {0}")]
    Signing(String),

    /// Raised when a required credential variable is absent from the
    /// environment.
    #[error("missing environment variable {0}")]
    MissingCredentials(&'static str),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ToolError {
    /// Returns the provider error code when this is a structured API error.
    pub fn api_code(&self) -> Option<&str> {
        match self {
            ToolError::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}
