//! Owner-scoped persistence operations over credential records.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::Store;
use crate::error::{StoreError, StoreResult};
use crate::models::{Credential, CredentialFilter, CredentialPatch, CredentialRow, NewCredential};
use crate::paginate::{fold, paginate, Filter, Page, PageRequest, Paginated};

const COLUMNS: &str = "id, owner_id, website_name, url, username_cipher, username_iv, \
                       password_cipher, password_iv, password_strength, created_at, updated_at";

/// SQLite caps bound parameters per statement; ids are deleted in batches.
const DELETE_BATCH: usize = 500;

/// Column names callers may pass as search fields.
pub const SEARCH_WEBSITE_NAME: &str = "website_name";
pub const SEARCH_URL: &str = "url";

impl Paginated for CredentialRow {
    const TABLE: &'static str = "credentials";
    const COLUMNS: &'static str = COLUMNS;
    const ORDER_BY: &'static str = "seq ASC, id ASC";
    const SEARCHABLE: &'static [(&'static str, &'static str)] = &[
        (SEARCH_WEBSITE_NAME, "website_name_folded"),
        (SEARCH_URL, "url_folded"),
    ];
}

/// Persistence contract for the vault.  Every method takes the owner id and
/// must never touch a row belonging to anyone else.
#[async_trait]
pub trait VaultStore: Send + Sync {
    /// At most one owned record matching `filter`.
    async fn find_owned(
        &self,
        owner_id: &str,
        filter: &CredentialFilter,
    ) -> StoreResult<Option<Credential>>;

    /// One page of owned records matching `filter` and, if present, `search`
    /// within `search_fields`.
    async fn find_many_owned(
        &self,
        owner_id: &str,
        filter: &CredentialFilter,
        search: Option<&str>,
        search_fields: &[&'static str],
        page: PageRequest,
    ) -> StoreResult<Page<Credential>>;

    /// Insert a new record.  Fails with [`StoreError::DuplicateEntry`] when the
    /// owner already has an entry for the same website name and url.
    async fn insert(&self, new: NewCredential) -> StoreResult<Credential>;

    /// Apply `patch` to an owned record.  `None` if absent or not owned.
    async fn update_owned(
        &self,
        owner_id: &str,
        id: &str,
        patch: &CredentialPatch,
    ) -> StoreResult<Option<Credential>>;

    /// Rows deleted: 0 or 1.
    async fn delete_owned(&self, owner_id: &str, id: &str) -> StoreResult<u64>;

    /// Delete every owned record whose id is in `ids`; foreign ids are skipped.
    async fn delete_many_owned(&self, owner_id: &str, ids: &[String]) -> StoreResult<u64>;
}

/// The owned-record locator.  The only place that turns an owner id plus a
/// record filter into a `WHERE` clause.
#[derive(Debug, Clone, Copy)]
pub struct Owned<'a> {
    owner_id: &'a str,
}

impl<'a> Owned<'a> {
    pub fn new(owner_id: &'a str) -> Self {
        Self { owner_id }
    }

    pub fn filter(&self, filter: &CredentialFilter) -> Filter {
        Filter::new()
            .eq("owner_id", self.owner_id)
            .eq_opt("id", filter.id.as_deref())
            .eq_opt("website_name", filter.website_name.as_deref())
            .eq_opt("url", filter.url.as_deref())
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>, filter: &CredentialFilter) {
        self.filter(filter).push_where(qb);
    }
}

#[async_trait]
impl VaultStore for Store {
    async fn find_owned(
        &self,
        owner_id: &str,
        filter: &CredentialFilter,
    ) -> StoreResult<Option<Credential>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM credentials"));
        Owned::new(owner_id).push_where(&mut qb, filter);
        qb.push(" ORDER BY seq ASC LIMIT 1");

        let row: Option<CredentialRow> = qb.build_query_as().fetch_optional(&self.pool).await?;
        debug!("[store] find_owned: owner={} found={}", owner_id, row.is_some());
        Ok(row.map(Credential::from))
    }

    async fn find_many_owned(
        &self,
        owner_id: &str,
        filter: &CredentialFilter,
        search: Option<&str>,
        search_fields: &[&'static str],
        page: PageRequest,
    ) -> StoreResult<Page<Credential>> {
        let base = Owned::new(owner_id).filter(filter);
        let rows: Page<CredentialRow> =
            paginate(&self.pool, &base, search, search_fields, page).await?;
        debug!(
            "[store] find_many_owned: owner={} page={} returned={} total={}",
            owner_id,
            rows.page_info.page,
            rows.records.len(),
            rows.page_info.total_count
        );
        Ok(rows.map(Credential::from))
    }

    async fn insert(&self, new: NewCredential) -> StoreResult<Credential> {
        let now = Utc::now();
        let row: CredentialRow = sqlx::query_as(&format!(
            "INSERT INTO credentials (id, owner_id, website_name, url, website_name_folded, url_folded, \
             username_cipher, username_iv, password_cipher, password_iv, password_strength, \
             created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&new.owner_id)
        .bind(&new.website_name)
        .bind(&new.url)
        .bind(fold(&new.website_name))
        .bind(fold(&new.url))
        .bind(&new.username.cipher)
        .bind(&new.username.iv)
        .bind(&new.password.cipher)
        .bind(&new.password.iv)
        .bind(new.password_strength)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from)
        .inspect_err(|e| {
            if matches!(e, StoreError::DuplicateEntry) {
                warn!("[store] insert: duplicate entry for owner={}", new.owner_id);
            }
        })?;

        debug!("[store] insert: owner={} id={}", row.owner_id, row.id);
        Ok(row.into())
    }

    async fn update_owned(
        &self,
        owner_id: &str,
        id: &str,
        patch: &CredentialPatch,
    ) -> StoreResult<Option<Credential>> {
        if patch.is_empty() {
            return self.find_owned(owner_id, &CredentialFilter::by_id(id)).await;
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE credentials SET ");
        {
            let mut set = qb.separated(", ");
            let text_columns = [
                ("website_name", &patch.website_name),
                ("url", &patch.url),
                ("username_cipher", &patch.username_cipher),
                ("username_iv", &patch.username_iv),
                ("password_cipher", &patch.password_cipher),
                ("password_iv", &patch.password_iv),
            ];
            for (column, value) in text_columns {
                if let Some(value) = value {
                    set.push(column)
                        .push_unseparated(" = ")
                        .push_bind_unseparated(value.clone());
                }
            }
            let folded_columns = [
                ("website_name_folded", &patch.website_name),
                ("url_folded", &patch.url),
            ];
            for (column, value) in folded_columns {
                if let Some(value) = value {
                    set.push(column)
                        .push_unseparated(" = ")
                        .push_bind_unseparated(fold(value));
                }
            }
            if let Some(strength) = patch.password_strength {
                set.push("password_strength")
                    .push_unseparated(" = ")
                    .push_bind_unseparated(strength);
            }
            set.push("updated_at")
                .push_unseparated(" = ")
                .push_bind_unseparated(Utc::now());
        }
        Owned::new(owner_id).push_where(&mut qb, &CredentialFilter::by_id(id));
        qb.push(format!(" RETURNING {COLUMNS}"));

        let row: Option<CredentialRow> = qb
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)
            .inspect_err(|e| {
                if matches!(e, StoreError::DuplicateEntry) {
                    warn!("[store] update_owned: duplicate entry owner={} id={}", owner_id, id);
                }
            })?;
        debug!("[store] update_owned: owner={} id={} updated={}", owner_id, id, row.is_some());
        Ok(row.map(Credential::from))
    }

    async fn delete_owned(&self, owner_id: &str, id: &str) -> StoreResult<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM credentials");
        Owned::new(owner_id).push_where(&mut qb, &CredentialFilter::by_id(id));
        let affected = qb.build().execute(&self.pool).await?.rows_affected();
        debug!("[store] delete_owned: owner={} id={} deleted={}", owner_id, id, affected);
        Ok(affected)
    }

    async fn delete_many_owned(&self, owner_id: &str, ids: &[String]) -> StoreResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut affected = 0;
        for batch in ids.chunks(DELETE_BATCH) {
            let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM credentials");
            Owned::new(owner_id).push_where(&mut qb, &CredentialFilter::default());
            qb.push(" AND id IN (");
            {
                let mut list = qb.separated(", ");
                for id in batch {
                    list.push_bind(id.clone());
                }
            }
            qb.push(")");
            affected += qb.build().execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;

        debug!(
            "[store] delete_many_owned: owner={} requested={} deleted={}",
            owner_id,
            ids.len(),
            affected
        );
        Ok(affected)
    }
}
