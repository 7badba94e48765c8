use thiserror::Error;

pub type Result<T> = std::result::Result<T, SocialError>;

/// Error taxonomy of the social core. Callers map these onto their surface:
/// the REST layer to status codes, the gateway to a `MessageError` event on
/// the originating channel.
#[derive(Error, Debug)]
pub enum SocialError {
    /// Malformed payload: missing kind-required field, stray field, unknown
    /// kind. Rejected, never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown sender/receiver/counterpart. Rejected, no partial write.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Channel credential invalid or expired. Refused before any state
    /// mutation.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Backing store unavailable or failed mid-operation.
    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl SocialError {
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{} not found", what))
    }

    pub fn validation(msg: &str) -> Self {
        Self::Validation(msg.to_string())
    }
}
