//! cv_service — Vault operations for the Credential Vault
//!
//! Six operations (add, list, get, edit, delete, delete-many), each taking an
//! already-authenticated owner id as an explicit argument.  Ownership is
//! enforced by the store's owned-record locator; this layer validates input
//! shape and maps store outcomes onto [`VaultError`].

pub mod error;
pub mod requests;
pub mod service;

pub use error::{VaultError, VaultResult};
pub use requests::{AddCredentialRequest, EditFields, ListQuery};
pub use service::VaultService;
