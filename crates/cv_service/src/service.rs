//! The six vault operations.

use std::collections::BTreeSet;
use std::sync::Arc;

use cv_store::store::SEARCH_WEBSITE_NAME;
use cv_store::{Credential, CredentialFilter, CredentialPatch, Page, StoreError, VaultStore};
use tracing::{error, info, warn};

use crate::error::{VaultError, VaultResult};
use crate::requests::{AddCredentialRequest, EditFields, ListQuery};

/// List searches only ever look at the website name.
const LIST_SEARCH_FIELDS: &[&str] = &[SEARCH_WEBSITE_NAME];

/// Stateless operation layer.  Clone freely; the store is shared.
#[derive(Clone)]
pub struct VaultService {
    store: Arc<dyn VaultStore>,
}

impl VaultService {
    pub fn new(store: Arc<dyn VaultStore>) -> Self {
        Self { store }
    }

    /// Store a new credential.  Returns the new record's id.
    pub async fn add(&self, owner_id: &str, req: AddCredentialRequest) -> VaultResult<String> {
        let existing = self
            .store
            .find_owned(
                owner_id,
                &CredentialFilter::by_site(&req.website_name, &req.website_url),
            )
            .await
            .map_err(|e| internal("add", e))?;
        if existing.is_some() {
            warn!("[vault] add: duplicate entry owner={}", owner_id);
            return Err(VaultError::Conflict);
        }

        // The pre-check can race; the table constraint is what decides.
        match self.store.insert(req.into_new_credential(owner_id)).await {
            Ok(cred) => {
                info!("[vault] add: owner={} id={}", owner_id, cred.id);
                Ok(cred.id)
            }
            Err(StoreError::DuplicateEntry) => {
                warn!("[vault] add: lost insert race owner={}", owner_id);
                Err(VaultError::Conflict)
            }
            Err(e) => Err(internal("add", e)),
        }
    }

    /// One page of the owner's credentials, optionally filtered by a website
    /// name search.  An empty page is `NotFound`.
    pub async fn list(&self, owner_id: &str, query: &ListQuery) -> VaultResult<Page<Credential>> {
        let page = self
            .store
            .find_many_owned(
                owner_id,
                &CredentialFilter::default(),
                query.search_term(),
                LIST_SEARCH_FIELDS,
                query.page_request(),
            )
            .await
            .map_err(|e| internal("list", e))?;

        if page.is_empty() {
            return Err(VaultError::NotFound);
        }
        Ok(page)
    }

    pub async fn get_one(&self, owner_id: &str, id: &str) -> VaultResult<Credential> {
        self.store
            .find_owned(owner_id, &CredentialFilter::by_id(id))
            .await
            .map_err(|e| internal("get_one", e))?
            .ok_or(VaultError::NotFound)
    }

    /// Apply an arbitrary JSON field map to an owned record.  Renaming onto
    /// another entry's website name and url is a `Conflict`.
    pub async fn edit(
        &self,
        owner_id: &str,
        id: &str,
        fields: serde_json::Value,
    ) -> VaultResult<Credential> {
        let patch = CredentialPatch::from(EditFields::from_json(fields)?);

        match self.store.update_owned(owner_id, id, &patch).await {
            Ok(Some(cred)) => {
                info!("[vault] edit: owner={} id={}", owner_id, id);
                Ok(cred)
            }
            Ok(None) => Err(VaultError::NotFound),
            Err(StoreError::DuplicateEntry) => {
                warn!("[vault] edit: duplicate entry owner={} id={}", owner_id, id);
                Err(VaultError::Conflict)
            }
            Err(e) => Err(internal("edit", e)),
        }
    }

    /// Returns the number of records deleted (always 1 on success).
    pub async fn delete_one(&self, owner_id: &str, id: &str) -> VaultResult<u64> {
        if id.trim().is_empty() {
            return Err(VaultError::InvalidInput("id is required".to_string()));
        }

        let deleted = self
            .store
            .delete_owned(owner_id, id)
            .await
            .map_err(|e| internal("delete_one", e))?;
        if deleted == 0 {
            return Err(VaultError::NotFound);
        }
        info!("[vault] delete_one: owner={} id={}", owner_id, id);
        Ok(deleted)
    }

    /// Delete every owned record in `ids`.  Ids that are missing or belong to
    /// someone else are skipped; the count covers only what was deleted.
    pub async fn delete_many(&self, owner_id: &str, ids: &[String]) -> VaultResult<u64> {
        if ids.is_empty() {
            return Err(VaultError::InvalidInput(
                "at least one id is required".to_string(),
            ));
        }
        let unique: Vec<String> = ids.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();

        let deleted = self
            .store
            .delete_many_owned(owner_id, &unique)
            .await
            .map_err(|e| internal("delete_many", e))?;
        if deleted == 0 {
            return Err(VaultError::NotFound);
        }
        info!(
            "[vault] delete_many: owner={} requested={} deleted={}",
            owner_id,
            unique.len(),
            deleted
        );
        Ok(deleted)
    }
}

fn internal(op: &str, err: StoreError) -> VaultError {
    error!("[vault] {}: store failure: {}", op, err);
    VaultError::Internal
}
