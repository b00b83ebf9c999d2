//! Request shapes handed over by the transport layer.

use cv_store::{CipherPair, CredentialPatch, NewCredential, PageRequest};
use serde::{Deserialize, Serialize};

use crate::error::VaultError;

/// Raw Add body.  Username and password are already ciphertext; each comes
/// with the iv it was encrypted under.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCredentialRequest {
    pub website_name: String,
    pub website_url: String,
    pub username: String,
    pub password: String,
    pub username_iv: String,
    pub password_iv: String,
    #[serde(default)]
    pub password_strength: i64,
}

impl AddCredentialRequest {
    pub(crate) fn into_new_credential(self, owner_id: &str) -> NewCredential {
        NewCredential {
            owner_id: owner_id.to_string(),
            website_name: self.website_name,
            url: self.website_url,
            username: CipherPair::new(self.username, self.username_iv),
            password: CipherPair::new(self.password, self.password_iv),
            password_strength: self.password_strength,
        }
    }
}

/// Query-string values exactly as received; parsing is done here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::parse(self.page.as_deref(), self.limit.as_deref())
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }
}

/// Editable fields, named as in the Add body.  Anything else in the map
/// (`id`, `ownerId`, timestamps, typos) is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EditFields {
    pub website_name: Option<String>,
    #[serde(alias = "url")]
    pub website_url: Option<String>,
    pub username: Option<String>,
    pub username_iv: Option<String>,
    pub password: Option<String>,
    pub password_iv: Option<String>,
    pub password_strength: Option<i64>,
}

impl EditFields {
    /// Parse an arbitrary JSON field map.
    pub fn from_json(value: serde_json::Value) -> Result<Self, VaultError> {
        if !value.is_object() {
            return Err(VaultError::InvalidInput(
                "edit fields must be a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| VaultError::InvalidInput(e.to_string()))
    }
}

impl From<EditFields> for CredentialPatch {
    fn from(fields: EditFields) -> Self {
        CredentialPatch {
            website_name: fields.website_name,
            url: fields.website_url,
            username_cipher: fields.username,
            username_iv: fields.username_iv,
            password_cipher: fields.password,
            password_iv: fields.password_iv,
            password_strength: fields.password_strength,
        }
    }
}
