//! cv_store — Owner-scoped credential storage for the Credential Vault
//!
//! # Storage model
//! Records live in a single SQLite table.  Username and password arrive
//! already encrypted as `(cipher, iv)` pairs and are stored verbatim; this
//! crate never sees plaintext.
//!
//! # Ownership
//! Every query is built through [`store::Owned`], which pins the owner id into
//! the `WHERE` clause.  Uniqueness of `(owner_id, website_name, url)` is a
//! table constraint, so concurrent inserts cannot both succeed.
//!
//! # Migration
//! SQLx migrations in `migrations/` are run on open.

pub mod db;
pub mod error;
pub mod models;
pub mod paginate;
pub mod store;

pub use db::{Store, StoreOptions};
pub use error::{StoreError, StoreResult};
pub use models::{CipherPair, Credential, CredentialFilter, CredentialPatch, NewCredential};
pub use paginate::{Page, PageInfo, PageRequest};
pub use store::VaultStore;
