use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::RngCore;
use serde_json::json;
use tracing::info;

use crate::bus::EventBus;
use crate::db::DocumentStore;
use crate::models::{
    Document, DocumentPatch, DocumentVersion, NewDocument, RelayError, SharePermission,
};

/// The document-service boundary: authoritative updates, the append-only
/// version chain, and the share-link authority.
///
/// Every content update appends a version in the same store transaction
/// and publishes a `document.updated` event on the bus, which re-enters
/// the relay through the bridge. That indirect path coexists with the
/// direct in-room relay; consumers see at-least-once, possibly duplicate
/// delivery and must dedupe client-side.
pub struct DocumentService {
    store: Arc<DocumentStore>,
    bus: EventBus,
}

impl DocumentService {
    pub fn new(store: Arc<DocumentStore>, bus: EventBus) -> Self {
        Self { store, bus }
    }

    pub async fn create(&self, new: NewDocument, user_id: i64) -> Document {
        let document = self
            .store
            .create_document(new.title, new.content, user_id)
            .await;
        info!("Document {} created by user {}", document.id, user_id);
        document
    }

    /// Update through the authoritative path. Owner or collaborator only;
    /// a content change versions and broadcasts.
    pub async fn update(
        &self,
        document_id: i64,
        patch: DocumentPatch,
        user_id: i64,
    ) -> Result<Document, RelayError> {
        let document = self
            .store
            .get(document_id)
            .await
            .ok_or(RelayError::NotFoundOrForbidden)?;
        if !document.can_access(user_id) {
            return Err(RelayError::NotFoundOrForbidden);
        }
        self.apply_update(document_id, patch, user_id).await
    }

    async fn apply_update(
        &self,
        document_id: i64,
        patch: DocumentPatch,
        author_id: i64,
    ) -> Result<Document, RelayError> {
        let content_changed = patch.content.is_some();
        let updated = self
            .store
            .update_document(document_id, patch, author_id)
            .await
            .ok_or(RelayError::NotFoundOrForbidden)?;
        if content_changed {
            self.bus.publish(
                "document.updated",
                json!({
                    "document": updated,
                    "user_id": author_id,
                    "timestamp": Utc::now().to_rfc3339(),
                }),
            );
        }
        Ok(updated)
    }

    /// Owner only
    pub async fn delete(&self, document_id: i64, user_id: i64) -> Result<(), RelayError> {
        let document = self
            .store
            .get(document_id)
            .await
            .ok_or(RelayError::NotFoundOrForbidden)?;
        if document.owner_id != user_id {
            return Err(RelayError::NotFoundOrForbidden);
        }
        self.store.delete_document(document_id).await;
        info!("Document {} deleted by user {}", document_id, user_id);
        Ok(())
    }

    pub async fn get_all(&self, user_id: i64) -> Vec<Document> {
        self.store.list_for_user(user_id).await
    }

    /// Owner or collaborator access
    pub async fn get_by_id(&self, document_id: i64, user_id: i64) -> Result<Document, RelayError> {
        let document = self
            .store
            .get(document_id)
            .await
            .ok_or(RelayError::NotFoundOrForbidden)?;
        if !document.can_access(user_id) {
            return Err(RelayError::NotFoundOrForbidden);
        }
        Ok(document)
    }

    pub async fn add_collaborator(
        &self,
        document_id: i64,
        collaborator_id: i64,
        user_id: i64,
    ) -> Result<(), RelayError> {
        self.ensure_owner(document_id, user_id).await?;
        self.store.add_collaborator(document_id, collaborator_id).await;
        Ok(())
    }

    pub async fn remove_collaborator(
        &self,
        document_id: i64,
        collaborator_id: i64,
        user_id: i64,
    ) -> Result<(), RelayError> {
        self.ensure_owner(document_id, user_id).await?;
        self.store
            .remove_collaborator(document_id, collaborator_id)
            .await;
        Ok(())
    }

    pub async fn get_versions(
        &self,
        document_id: i64,
        user_id: i64,
    ) -> Result<Vec<DocumentVersion>, RelayError> {
        self.get_by_id(document_id, user_id).await?;
        Ok(self.store.versions(document_id).await)
    }

    /// Re-apply a snapshot through the normal update path. Restoring
    /// version N at current max M yields version M+1 carrying N's content;
    /// the chain is never truncated or rewound.
    pub async fn restore_version(
        &self,
        version_id: i64,
        user_id: i64,
    ) -> Result<Document, RelayError> {
        let version = self
            .store
            .find_version(version_id)
            .await
            .ok_or(RelayError::NotFoundOrForbidden)?;
        self.update(
            version.document_id,
            DocumentPatch {
                title: None,
                content: Some(version.content),
            },
            user_id,
        )
        .await
    }

    /// Issue a share capability. Owner only; the new token takes over the
    /// document's single share slot, so the previous token dies with it.
    pub async fn generate_share_link(
        &self,
        document_id: i64,
        user_id: i64,
        permission: SharePermission,
        expires_in_days: Option<i64>,
    ) -> Result<String, RelayError> {
        let document = self
            .store
            .get(document_id)
            .await
            .ok_or(RelayError::Unauthorized)?;
        if document.owner_id != user_id {
            return Err(RelayError::Unauthorized);
        }

        let token = loop {
            let candidate = new_share_token();
            if !self.store.token_exists(&candidate).await {
                break candidate;
            }
        };
        let expires_at = expires_in_days.map(|days| Utc::now() + Duration::days(days));
        self.store
            .set_share(document_id, token.clone(), permission, expires_at)
            .await;
        info!("Share link issued for document {}", document_id);
        Ok(token)
    }

    /// Owner only. Disables the slot; the token string may linger but can
    /// no longer resolve.
    pub async fn revoke_share_link(
        &self,
        document_id: i64,
        user_id: i64,
    ) -> Result<(), RelayError> {
        let document = self
            .store
            .get(document_id)
            .await
            .ok_or(RelayError::Unauthorized)?;
        if document.owner_id != user_id {
            return Err(RelayError::Unauthorized);
        }
        self.store.disable_share(document_id).await;
        info!("Share link revoked for document {}", document_id);
        Ok(())
    }

    /// Resolve a capability token. Unknown, revoked and expired tokens are
    /// indistinguishable to the caller.
    pub async fn get_by_share_token(&self, token: &str) -> Result<Document, RelayError> {
        match self.store.find_by_share_token(token).await {
            Some(document) if document.is_share_valid() => Ok(document),
            _ => Err(RelayError::NotFoundOrExpired),
        }
    }

    /// Anonymous edit through a share capability. The document owner is
    /// recorded as the version author; anonymous editors are not separately
    /// attributed.
    pub async fn update_by_share_token(
        &self,
        token: &str,
        patch: DocumentPatch,
    ) -> Result<Document, RelayError> {
        let document = self.get_by_share_token(token).await?;
        if document.share_permission != SharePermission::Edit {
            return Err(RelayError::Forbidden);
        }
        self.apply_update(document.id, patch, document.owner_id).await
    }

    async fn ensure_owner(&self, document_id: i64, user_id: i64) -> Result<Document, RelayError> {
        let document = self
            .store
            .get(document_id)
            .await
            .ok_or(RelayError::Unauthorized)?;
        if document.owner_id != user_id {
            return Err(RelayError::Unauthorized);
        }
        Ok(document)
    }
}

fn new_share_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: i64 = 1;
    const COLLABORATOR: i64 = 2;
    const STRANGER: i64 = 3;

    fn service() -> DocumentService {
        DocumentService::new(Arc::new(DocumentStore::new()), EventBus::new(64))
    }

    async fn seeded(service: &DocumentService) -> Document {
        service
            .create(
                NewDocument {
                    title: "notes".into(),
                    content: "v1".into(),
                },
                OWNER,
            )
            .await
    }

    fn content_patch(content: &str) -> DocumentPatch {
        DocumentPatch {
            title: None,
            content: Some(content.into()),
        }
    }

    #[tokio::test]
    async fn update_versions_sequentially() {
        let service = service();
        let doc = seeded(&service).await;
        for (i, content) in ["v2", "v3", "v4"].iter().enumerate() {
            let updated = service
                .update(doc.id, content_patch(content), OWNER)
                .await
                .unwrap();
            assert_eq!(updated.content, *content);
            let versions = service.get_versions(doc.id, OWNER).await.unwrap();
            assert_eq!(versions[0].version_number, i as i64 + 2);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_number_densely() {
        let service = Arc::new(service());
        let doc = seeded(&service).await;
        let mut handles = Vec::new();
        for i in 0..10 {
            let service = service.clone();
            let id = doc.id;
            handles.push(tokio::spawn(async move {
                service
                    .update(id, content_patch(&format!("edit {i}")), OWNER)
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let mut numbers: Vec<i64> = service
            .get_versions(doc.id, OWNER)
            .await
            .unwrap()
            .iter()
            .map(|v| v.version_number)
            .collect();
        numbers.sort_unstable();
        // 1 from creation plus one per successful save, no repeats, no gaps
        assert_eq!(numbers, (1..=11).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn restore_appends_instead_of_rewinding() {
        let service = service();
        let doc = seeded(&service).await;
        for content in ["v2", "v3", "v4", "v5"] {
            service
                .update(doc.id, content_patch(content), OWNER)
                .await
                .unwrap();
        }
        let versions = service.get_versions(doc.id, OWNER).await.unwrap();
        let second = versions.iter().find(|v| v.version_number == 2).unwrap();

        let restored = service.restore_version(second.id, OWNER).await.unwrap();
        assert_eq!(restored.content, "v2");

        let after = service.get_versions(doc.id, OWNER).await.unwrap();
        assert_eq!(after.len(), 6);
        assert_eq!(after[0].version_number, 6);
        assert_eq!(after[0].content, "v2");
        // History below stays readable and untouched
        for n in 1..=5 {
            assert!(after.iter().any(|v| v.version_number == n));
        }
    }

    #[tokio::test]
    async fn update_is_gated_on_owner_or_collaborator() {
        let service = service();
        let doc = seeded(&service).await;
        let err = service
            .update(doc.id, content_patch("nope"), STRANGER)
            .await
            .unwrap_err();
        assert_eq!(err, RelayError::NotFoundOrForbidden);

        service
            .add_collaborator(doc.id, COLLABORATOR, OWNER)
            .await
            .unwrap();
        service
            .update(doc.id, content_patch("ok"), COLLABORATOR)
            .await
            .unwrap();

        service
            .remove_collaborator(doc.id, COLLABORATOR, OWNER)
            .await
            .unwrap();
        let err = service
            .update(doc.id, content_patch("gone"), COLLABORATOR)
            .await
            .unwrap_err();
        assert_eq!(err, RelayError::NotFoundOrForbidden);
    }

    #[tokio::test]
    async fn only_the_owner_manages_sharing_and_collaborators() {
        let service = service();
        let doc = seeded(&service).await;
        let err = service
            .generate_share_link(doc.id, STRANGER, SharePermission::View, None)
            .await
            .unwrap_err();
        assert_eq!(err, RelayError::Unauthorized);
        let err = service.revoke_share_link(doc.id, STRANGER).await.unwrap_err();
        assert_eq!(err, RelayError::Unauthorized);
        let err = service
            .add_collaborator(doc.id, STRANGER, STRANGER)
            .await
            .unwrap_err();
        assert_eq!(err, RelayError::Unauthorized);
    }

    #[tokio::test]
    async fn regenerating_invalidates_the_previous_token() {
        let service = service();
        let doc = seeded(&service).await;
        let first = service
            .generate_share_link(doc.id, OWNER, SharePermission::View, None)
            .await
            .unwrap();
        assert!(service.get_by_share_token(&first).await.is_ok());

        let second = service
            .generate_share_link(doc.id, OWNER, SharePermission::View, None)
            .await
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(
            service.get_by_share_token(&first).await.unwrap_err(),
            RelayError::NotFoundOrExpired
        );
        assert!(service.get_by_share_token(&second).await.is_ok());
    }

    #[tokio::test]
    async fn expired_token_fails_even_while_enabled() {
        let service = service();
        let doc = seeded(&service).await;
        let token = service
            .generate_share_link(doc.id, OWNER, SharePermission::Edit, Some(-1))
            .await
            .unwrap();
        let fetched = service.get_all(OWNER).await.remove(0);
        assert!(fetched.share_enabled);
        assert_eq!(
            service.get_by_share_token(&token).await.unwrap_err(),
            RelayError::NotFoundOrExpired
        );
    }

    #[tokio::test]
    async fn revoked_token_fails_immediately_but_is_retained() {
        let service = service();
        let doc = seeded(&service).await;
        let token = service
            .generate_share_link(doc.id, OWNER, SharePermission::Edit, Some(7))
            .await
            .unwrap();
        service.revoke_share_link(doc.id, OWNER).await.unwrap();
        assert_eq!(
            service.get_by_share_token(&token).await.unwrap_err(),
            RelayError::NotFoundOrExpired
        );
        let fetched = service.get_by_id(doc.id, OWNER).await.unwrap();
        assert_eq!(fetched.share_token.as_deref(), Some(token.as_str()));
    }

    #[tokio::test]
    async fn view_permission_rejects_anonymous_edits() {
        let service = service();
        let doc = seeded(&service).await;
        let token = service
            .generate_share_link(doc.id, OWNER, SharePermission::View, None)
            .await
            .unwrap();
        let err = service
            .update_by_share_token(&token, content_patch("nope"))
            .await
            .unwrap_err();
        assert_eq!(err, RelayError::Forbidden);
    }

    #[tokio::test]
    async fn anonymous_edits_are_attributed_to_the_owner() {
        let service = service();
        let doc = seeded(&service).await;
        let token = service
            .generate_share_link(doc.id, OWNER, SharePermission::Edit, None)
            .await
            .unwrap();
        let updated = service
            .update_by_share_token(&token, content_patch("from the link"))
            .await
            .unwrap();
        assert_eq!(updated.content, "from the link");

        let versions = service.get_versions(doc.id, OWNER).await.unwrap();
        assert_eq!(versions[0].version_number, 2);
        assert_eq!(versions[0].author_id, OWNER);
    }

    #[tokio::test]
    async fn content_updates_publish_on_the_bus() {
        let store = Arc::new(DocumentStore::new());
        let bus = EventBus::new(64);
        let mut rx = bus.subscribe();
        let service = DocumentService::new(store, bus);
        let doc = seeded(&service).await;
        service
            .update(doc.id, content_patch("v2"), OWNER)
            .await
            .unwrap();

        let raw = rx.recv().await.unwrap();
        let event: crate::models::BusEvent = serde_json::from_str(&raw).unwrap();
        assert_eq!(event.event, "document.updated");
        assert_eq!(event.data["document"]["id"], doc.id);
        assert_eq!(event.data["user_id"], OWNER);
    }

    #[tokio::test]
    async fn title_only_update_does_not_broadcast() {
        let store = Arc::new(DocumentStore::new());
        let bus = EventBus::new(64);
        let mut rx = bus.subscribe();
        let service = DocumentService::new(store, bus);
        let doc = seeded(&service).await;
        service
            .update(
                doc.id,
                DocumentPatch {
                    title: Some("renamed".into()),
                    content: None,
                },
                OWNER,
            )
            .await
            .unwrap();
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn delete_is_owner_only() {
        let service = service();
        let doc = seeded(&service).await;
        assert_eq!(
            service.delete(doc.id, STRANGER).await.unwrap_err(),
            RelayError::NotFoundOrForbidden
        );
        service.delete(doc.id, OWNER).await.unwrap();
        assert_eq!(
            service.get_by_id(doc.id, OWNER).await.unwrap_err(),
            RelayError::NotFoundOrForbidden
        );
    }
}
