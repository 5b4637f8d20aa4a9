use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access level granted by a share link.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SharePermission {
    View,
    Edit,
}

/// A shared text document as the persistence collaborator exposes it.
///
/// The relay never mutates `content` directly; it reads the share slot to
/// authorize anonymous access and relays change notifications. A document
/// holds at most one share token at a time; generating a new one replaces
/// the previous slot.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub owner_id: i64,
    pub collaborator_ids: Vec<i64>,
    pub share_token: Option<String>,
    pub share_enabled: bool,
    pub share_permission: SharePermission,
    pub share_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Check if the share link is currently valid
    pub fn is_share_valid(&self) -> bool {
        if !self.share_enabled {
            return false;
        }
        match self.share_expires_at {
            Some(expires_at) => expires_at > Utc::now(),
            None => true,
        }
    }

    /// Owner or collaborator access
    pub fn can_access(&self, user_id: i64) -> bool {
        self.owner_id == user_id || self.collaborator_ids.contains(&user_id)
    }
}

/// One snapshot in a document's append-only version chain.
///
/// `version_number` is strictly increasing per document, starting at 1,
/// assigned as max+1 at creation time and never reused.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DocumentVersion {
    pub id: i64,
    pub document_id: i64,
    pub content: String,
    pub author_id: i64,
    pub version_number: i64,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a document
#[derive(Deserialize, Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Partial update applied through the authoritative update path
#[derive(Deserialize, Debug, Clone, Default)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
}
