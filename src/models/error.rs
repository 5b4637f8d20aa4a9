use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Response for an error
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    pub error: String,
}

/// Failure taxonomy of the collaboration core.
///
/// `NotFoundOrExpired` deliberately does not distinguish a token that never
/// existed from one that was revoked or has expired.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// Caller lacks ownership rights over the document
    #[error("caller is not authorized to manage this document")]
    Unauthorized,

    /// Valid share token, but the slot does not grant edit access
    #[error("share link does not grant edit access")]
    Forbidden,

    /// Share token unknown, revoked or expired
    #[error("share link not found or expired")]
    NotFoundOrExpired,

    /// Document missing, or caller is neither owner nor collaborator
    #[error("document not found or access denied")]
    NotFoundOrForbidden,

    /// Unparsable payload from a client or the bus; dropped, never fatal
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// The presence registry has been stopped and accepts no connections
    #[error("presence registry is not running")]
    RegistryStopped,

    /// Connection id is not registered with the relay
    #[error("unknown connection")]
    UnknownConnection,
}
