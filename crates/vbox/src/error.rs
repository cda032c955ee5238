//! Error types for vboxctl-vbox.

use thiserror::Error;

/// Result type alias for vboxctl-vbox operations.
pub type Result<T> = std::result::Result<T, VboxError>;

/// `VBOX_E_OBJECT_NOT_FOUND`, raised by `IVirtualBox::findMachine` for unknown names.
pub const VBOX_E_OBJECT_NOT_FOUND: u32 = 0x80BB_0001;

/// Errors that can occur while talking to the VirtualBox web service.
#[derive(Debug, Error)]
pub enum VboxError {
    /// Endpoint or request could not be built
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level failure reaching vboxwebsrv
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success HTTP status without a SOAP fault body
    #[error("web service returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// SOAP fault raised by the hypervisor
    #[error("SOAP fault {code}: {message}")]
    Fault {
        /// `faultcode` element
        code: String,
        /// `faultstring` element
        message: String,
        /// COM result code from the fault detail, if present
        result_code: Option<i64>,
    },

    /// Response did not have the expected shape
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VboxError {
    /// Whether this is a fault carrying the given COM result code.
    ///
    /// vboxwebsrv reports result codes either signed or unsigned, so both
    /// spellings of the same 32-bit value match.
    pub fn has_result_code(&self, expected: u32) -> bool {
        match self {
            VboxError::Fault {
                result_code: Some(code),
                ..
            } => u32::try_from(*code)
                .or_else(|_| i32::try_from(*code).map(|signed| signed as u32))
                .is_ok_and(|code| code == expected),
            _ => false,
        }
    }

    /// Whether the hypervisor reported that the requested object does not exist.
    pub fn is_object_not_found(&self) -> bool {
        self.has_result_code(VBOX_E_OBJECT_NOT_FOUND)
    }
}
