//! Credential records and the row shape they map to/from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque ciphertext plus the initialization vector it was produced with.
/// Never decrypted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherPair {
    pub cipher: String,
    pub iv: String,
}

impl CipherPair {
    pub fn new(cipher: impl Into<String>, iv: impl Into<String>) -> Self {
        Self {
            cipher: cipher.into(),
            iv: iv.into(),
        }
    }
}

/// A stored vault entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub id: String,
    pub owner_id: String,
    pub website_name: String,
    pub url: String,
    pub username: CipherPair,
    pub password: CipherPair,
    pub password_strength: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input to [`crate::VaultStore::insert`]; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub owner_id: String,
    pub website_name: String,
    pub url: String,
    pub username: CipherPair,
    pub password: CipherPair,
    pub password_strength: i64,
}

/// Equality filter on a single record, applied on top of the owner scope.
#[derive(Debug, Clone, Default)]
pub struct CredentialFilter {
    pub id: Option<String>,
    pub website_name: Option<String>,
    pub url: Option<String>,
}

impl CredentialFilter {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn by_site(website_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: None,
            website_name: Some(website_name.into()),
            url: Some(url.into()),
        }
    }
}

/// Partial update.  `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialPatch {
    pub website_name: Option<String>,
    pub url: Option<String>,
    pub username_cipher: Option<String>,
    pub username_iv: Option<String>,
    pub password_cipher: Option<String>,
    pub password_iv: Option<String>,
    pub password_strength: Option<i64>,
}

impl CredentialPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Flat row as stored in the `credentials` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CredentialRow {
    pub id: String,
    pub owner_id: String,
    pub website_name: String,
    pub url: String,
    pub username_cipher: String,
    pub username_iv: String,
    pub password_cipher: String,
    pub password_iv: String,
    pub password_strength: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CredentialRow> for Credential {
    fn from(row: CredentialRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            website_name: row.website_name,
            url: row.url,
            username: CipherPair::new(row.username_cipher, row.username_iv),
            password: CipherPair::new(row.password_cipher, row.password_iv),
            password_strength: row.password_strength,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_serialises_with_camel_case_pairs() {
        let now = Utc::now();
        let cred = Credential {
            id: "c-1".into(),
            owner_id: "alice".into(),
            website_name: "GitHub".into(),
            url: "https://github.com".into(),
            username: CipherPair::new("aa", "01"),
            password: CipherPair::new("bb", "02"),
            password_strength: 4,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&cred).unwrap();
        assert_eq!(json["websiteName"], "GitHub");
        assert_eq!(json["ownerId"], "alice");
        assert_eq!(json["username"]["cipher"], "aa");
        assert_eq!(json["password"]["iv"], "02");
        assert_eq!(json["passwordStrength"], 4);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(CredentialPatch::default().is_empty());
        let patch = CredentialPatch {
            password_strength: Some(1),
            ..CredentialPatch::default()
        };
        assert!(!patch.is_empty());
    }
}
