use crate::qrcode::DataTooLong;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QrError {
    #[error("Configuration error in `{field}`: {reason}")]
    Config { field: String, reason: String },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Message read error: {reason}")]
    MessageRead { reason: String },

    #[error("QR encoding failed: {0}")]
    Encode(#[from] DataTooLong),

    #[error("Image rendering failed: {0}")]
    Render(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QrError {
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for failures that belong to a single message rather than to the
    /// processor's construction. Hosts route these per message.
    pub fn is_per_message(&self) -> bool {
        matches!(
            self,
            Self::MessageRead { .. } | Self::Encode(_) | Self::Render(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, QrError>;
