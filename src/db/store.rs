use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::models::{Document, DocumentPatch, DocumentVersion, SharePermission};

/// In-memory stand-in for the persistence collaborator.
///
/// All state sits behind a single async mutex, which doubles as the
/// transaction boundary: a content update and the version record it
/// produces are applied under one lock acquisition, so they either both
/// happen or neither does, and version numbers are assigned serially per
/// document.
#[derive(Default)]
pub struct DocumentStore {
    inner: Mutex<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    documents: HashMap<i64, Document>,
    versions: HashMap<i64, Vec<DocumentVersion>>,
    last_document_id: i64,
    last_version_id: i64,
}

impl StoreInner {
    fn next_version_number(&self, document_id: i64) -> i64 {
        self.versions
            .get(&document_id)
            .and_then(|chain| chain.iter().map(|v| v.version_number).max())
            .map(|max| max + 1)
            .unwrap_or(1)
    }

    fn append_version(&mut self, document_id: i64, content: String, author_id: i64) {
        let version_number = self.next_version_number(document_id);
        self.last_version_id += 1;
        self.versions
            .entry(document_id)
            .or_default()
            .push(DocumentVersion {
                id: self.last_version_id,
                document_id,
                content,
                author_id,
                version_number,
                created_at: Utc::now(),
            });
    }
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document and record version 1 of its content.
    pub async fn create_document(&self, title: String, content: String, owner_id: i64) -> Document {
        let mut inner = self.inner.lock().await;
        inner.last_document_id += 1;
        let now = Utc::now();
        let document = Document {
            id: inner.last_document_id,
            title,
            content: content.clone(),
            owner_id,
            collaborator_ids: Vec::new(),
            share_token: None,
            share_enabled: false,
            share_permission: SharePermission::Edit,
            share_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        inner.documents.insert(document.id, document.clone());
        inner.append_version(document.id, content, owner_id);
        document
    }

    pub async fn get(&self, document_id: i64) -> Option<Document> {
        self.inner.lock().await.documents.get(&document_id).cloned()
    }

    /// Documents the user owns or collaborates on
    pub async fn list_for_user(&self, user_id: i64) -> Vec<Document> {
        let inner = self.inner.lock().await;
        let mut documents: Vec<Document> = inner
            .documents
            .values()
            .filter(|d| d.can_access(user_id))
            .cloned()
            .collect();
        documents.sort_by_key(|d| d.id);
        documents
    }

    /// Apply a patch; a content change appends the next version in the same
    /// transaction. Returns `None` when the document does not exist.
    pub async fn update_document(
        &self,
        document_id: i64,
        patch: DocumentPatch,
        author_id: i64,
    ) -> Option<Document> {
        let mut inner = self.inner.lock().await;
        let document = inner.documents.get_mut(&document_id)?;
        if let Some(title) = patch.title {
            document.title = title;
        }
        let new_content = patch.content.clone();
        if let Some(content) = patch.content {
            document.content = content;
        }
        document.updated_at = Utc::now();
        let updated = document.clone();
        if let Some(content) = new_content {
            inner.append_version(document_id, content, author_id);
        }
        Some(updated)
    }

    pub async fn delete_document(&self, document_id: i64) -> bool {
        let mut inner = self.inner.lock().await;
        inner.versions.remove(&document_id);
        inner.documents.remove(&document_id).is_some()
    }

    pub async fn add_collaborator(&self, document_id: i64, collaborator_id: i64) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.documents.get_mut(&document_id) {
            Some(document) => {
                if !document.collaborator_ids.contains(&collaborator_id) {
                    document.collaborator_ids.push(collaborator_id);
                }
                true
            }
            None => false,
        }
    }

    pub async fn remove_collaborator(&self, document_id: i64, collaborator_id: i64) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.documents.get_mut(&document_id) {
            Some(document) => {
                document.collaborator_ids.retain(|id| *id != collaborator_id);
                true
            }
            None => false,
        }
    }

    /// Versions of a document, newest first
    pub async fn versions(&self, document_id: i64) -> Vec<DocumentVersion> {
        let inner = self.inner.lock().await;
        let mut chain = inner
            .versions
            .get(&document_id)
            .cloned()
            .unwrap_or_default();
        chain.sort_by_key(|v| std::cmp::Reverse(v.version_number));
        chain
    }

    pub async fn find_version(&self, version_id: i64) -> Option<DocumentVersion> {
        let inner = self.inner.lock().await;
        inner
            .versions
            .values()
            .flatten()
            .find(|v| v.id == version_id)
            .cloned()
    }

    /// Next version number the chain would assign: max + 1, or 1 when empty
    pub async fn next_version_number(&self, document_id: i64) -> i64 {
        self.inner.lock().await.next_version_number(document_id)
    }

    /// Install a share token, replacing any previous slot.
    pub async fn set_share(
        &self,
        document_id: i64,
        token: String,
        permission: SharePermission,
        expires_at: Option<DateTime<Utc>>,
    ) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.documents.get_mut(&document_id) {
            Some(document) => {
                document.share_token = Some(token);
                document.share_enabled = true;
                document.share_permission = permission;
                document.share_expires_at = expires_at;
                document.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Disable sharing. The token string is retained for audit; validity
    /// checks fail on the cleared flag alone.
    pub async fn disable_share(&self, document_id: i64) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.documents.get_mut(&document_id) {
            Some(document) => {
                document.share_enabled = false;
                document.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub async fn find_by_share_token(&self, token: &str) -> Option<Document> {
        let inner = self.inner.lock().await;
        inner
            .documents
            .values()
            .find(|d| d.share_token.as_deref() == Some(token))
            .cloned()
    }

    /// Token uniqueness is checked across all documents, not per document.
    pub async fn token_exists(&self, token: &str) -> bool {
        let inner = self.inner.lock().await;
        inner
            .documents
            .values()
            .any(|d| d.share_token.as_deref() == Some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn next_version_number_starts_at_one() {
        let store = DocumentStore::new();
        assert_eq!(store.next_version_number(99).await, 1);
    }

    #[tokio::test]
    async fn create_records_initial_version() {
        let store = DocumentStore::new();
        let doc = store
            .create_document("notes".into(), "first".into(), 7)
            .await;
        let versions = store.versions(doc.id).await;
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version_number, 1);
        assert_eq!(versions[0].content, "first");
        assert_eq!(versions[0].author_id, 7);
        assert_eq!(store.next_version_number(doc.id).await, 2);
    }

    #[tokio::test]
    async fn title_only_update_does_not_version() {
        let store = DocumentStore::new();
        let doc = store.create_document("a".into(), "body".into(), 1).await;
        let updated = store
            .update_document(
                doc.id,
                DocumentPatch {
                    title: Some("b".into()),
                    content: None,
                },
                1,
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "b");
        assert_eq!(store.versions(doc.id).await.len(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_document_is_none_and_versionless() {
        let store = DocumentStore::new();
        let res = store
            .update_document(
                404,
                DocumentPatch {
                    title: None,
                    content: Some("x".into()),
                },
                1,
            )
            .await;
        assert!(res.is_none());
        assert!(store.versions(404).await.is_empty());
    }

    #[tokio::test]
    async fn versions_come_back_newest_first() {
        let store = DocumentStore::new();
        let doc = store.create_document("a".into(), "v1".into(), 1).await;
        for content in ["v2", "v3"] {
            store
                .update_document(
                    doc.id,
                    DocumentPatch {
                        title: None,
                        content: Some(content.into()),
                    },
                    1,
                )
                .await
                .unwrap();
        }
        let numbers: Vec<i64> = store
            .versions(doc.id)
            .await
            .iter()
            .map(|v| v.version_number)
            .collect();
        assert_eq!(numbers, vec![3, 2, 1]);
    }
}
