use std::sync::Arc;

use cv_service::{AddCredentialRequest, ListQuery, VaultError, VaultService};
use cv_store::{CipherPair, Store};
use serde_json::json;

async fn memory_service() -> (VaultService, Store) {
    let store = Store::open_in_memory().await.expect("open store");
    (VaultService::new(Arc::new(store.clone())), store)
}

fn request(name: &str, url: &str) -> AddCredentialRequest {
    AddCredentialRequest {
        website_name: name.to_string(),
        website_url: url.to_string(),
        username: format!("{name}-user-ct"),
        password: format!("{name}-pass-ct"),
        username_iv: "00112233445566778899aabb".to_string(),
        password_iv: "ffeeddccbbaa998877665544".to_string(),
        password_strength: 3,
    }
}

async fn row_count(store: &Store) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM credentials")
        .fetch_one(&store.pool)
        .await
        .expect("count rows")
}

fn list_query(page: &str, limit: &str, search: Option<&str>) -> ListQuery {
    ListQuery {
        page: Some(page.to_string()),
        limit: Some(limit.to_string()),
        search: search.map(str::to_string),
    }
}

#[tokio::test]
async fn add_then_get_returns_cipher_pairs_verbatim() {
    let (svc, _) = memory_service().await;
    let req = request("GitHub", "https://github.com");
    let id = svc.add("alice", req.clone()).await.unwrap();

    let cred = svc.get_one("alice", &id).await.unwrap();
    assert_eq!(cred.owner_id, "alice");
    assert_eq!(cred.website_name, "GitHub");
    assert_eq!(cred.url, "https://github.com");
    assert_eq!(cred.username, CipherPair::new(req.username, req.username_iv));
    assert_eq!(cred.password, CipherPair::new(req.password, req.password_iv));
    assert_eq!(cred.password_strength, 3);
}

#[tokio::test]
async fn duplicate_add_conflicts_without_mutation() {
    let (svc, store) = memory_service().await;
    svc.add("alice", request("GitHub", "https://github.com")).await.unwrap();
    let before = row_count(&store).await;

    let err = svc
        .add("alice", request("GitHub", "https://github.com"))
        .await
        .unwrap_err();
    assert_eq!(err, VaultError::Conflict);
    assert_eq!(row_count(&store).await, before);

    // Another owner may hold the same site.
    svc.add("bob", request("GitHub", "https://github.com")).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_adds_store_exactly_one_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(&dir.path().join("vault.db")).await.unwrap();
    let svc = VaultService::new(Arc::new(store.clone()));

    let (a, b) = tokio::join!(
        {
            let svc = svc.clone();
            async move { svc.add("alice", request("Bank", "https://bank.example")).await }
        },
        {
            let svc = svc.clone();
            async move { svc.add("alice", request("Bank", "https://bank.example")).await }
        }
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(VaultError::Conflict)))
            .count(),
        1
    );
    assert_eq!(row_count(&store).await, 1);
    store.close().await;
}

#[tokio::test]
async fn foreign_records_are_invisible_and_untouchable() {
    let (svc, store) = memory_service().await;
    let bobs = svc.add("bob", request("Bank", "https://bank.example")).await.unwrap();
    svc.add("alice", request("Mail", "https://mail.example")).await.unwrap();

    assert_eq!(svc.get_one("alice", &bobs).await, Err(VaultError::NotFound));
    assert_eq!(
        svc.edit("alice", &bobs, json!({"websiteName": "stolen"})).await,
        Err(VaultError::NotFound)
    );
    assert_eq!(svc.delete_one("alice", &bobs).await, Err(VaultError::NotFound));
    assert_eq!(
        svc.delete_many("alice", &[bobs.clone()]).await,
        Err(VaultError::NotFound)
    );

    let page = svc.list("alice", &ListQuery::default()).await.unwrap();
    assert!(page.records.iter().all(|c| c.owner_id == "alice"));

    let still_bobs = svc.get_one("bob", &bobs).await.unwrap();
    assert_eq!(still_bobs.website_name, "Bank");
    assert_eq!(row_count(&store).await, 2);
}

#[tokio::test]
async fn delete_many_counts_only_owned_ids() {
    let (svc, _) = memory_service().await;
    let a1 = svc.add("alice", request("A1", "https://a1")).await.unwrap();
    let a2 = svc.add("alice", request("A2", "https://a2")).await.unwrap();
    let a3 = svc.add("alice", request("A3", "https://a3")).await.unwrap();
    let b1 = svc.add("bob", request("B1", "https://b1")).await.unwrap();

    let deleted = svc
        .delete_many("alice", &[a1.clone(), b1.clone(), a2.clone(), a1.clone()])
        .await
        .unwrap();
    assert_eq!(deleted, 2);

    assert!(svc.get_one("alice", &a3).await.is_ok());
    assert!(svc.get_one("bob", &b1).await.is_ok());
    assert_eq!(svc.get_one("alice", &a1).await, Err(VaultError::NotFound));
}

#[tokio::test]
async fn list_paginates_twenty_five_records() {
    let (svc, _) = memory_service().await;
    for i in 0..25 {
        svc.add("alice", request(&format!("site-{i:02}"), &format!("https://{i}.example")))
            .await
            .unwrap();
    }

    let first = svc.list("alice", &list_query("1", "10", None)).await.unwrap();
    assert_eq!(first.records.len(), 10);
    assert_eq!(first.page_info.total_pages, 3);
    assert_eq!(first.page_info.total_count, 25);
    assert_eq!(first.records[0].website_name, "site-00");

    let last = svc.list("alice", &list_query("3", "10", None)).await.unwrap();
    assert_eq!(last.records.len(), 5);
    assert_eq!(last.records[4].website_name, "site-24");

    assert_eq!(
        svc.list("alice", &list_query("4", "10", None)).await,
        Err(VaultError::NotFound)
    );
}

#[tokio::test]
async fn list_falls_back_on_garbage_paging() {
    let (svc, _) = memory_service().await;
    for i in 0..12 {
        svc.add("alice", request(&format!("s{i}"), "https://x")).await.unwrap();
    }

    let page = svc
        .list("alice", &list_query("first", "lots", None))
        .await
        .unwrap();
    assert_eq!(page.page_info.page, 1);
    assert_eq!(page.page_info.limit, 10);
    assert_eq!(page.records.len(), 10);
}

#[tokio::test]
async fn list_with_maximal_paging_values_is_not_found() {
    let (svc, _) = memory_service().await;
    svc.add("alice", request("GitHub", "https://github.com")).await.unwrap();

    assert_eq!(
        svc.list("alice", &list_query("4294967295", "4294967295", None)).await,
        Err(VaultError::NotFound)
    );
    assert_eq!(
        svc.list("alice", &list_query("99999999999999999999", "10", None)).await,
        Err(VaultError::NotFound)
    );
}

#[tokio::test]
async fn list_search_folds_non_ascii_case() {
    let (svc, _) = memory_service().await;
    svc.add("alice", request("ÉBAY", "https://ebay.at")).await.unwrap();

    let page = svc
        .list("alice", &list_query("1", "10", Some("ébay")))
        .await
        .unwrap();
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].website_name, "ÉBAY");
}

#[tokio::test]
async fn list_search_matches_website_name_only() {
    let (svc, _) = memory_service().await;
    svc.add("alice", request("GitHub", "https://github.com")).await.unwrap();
    svc.add("alice", request("Mail", "https://github-mail.example")).await.unwrap();

    let page = svc
        .list("alice", &list_query("1", "10", Some("github")))
        .await
        .unwrap();
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].website_name, "GitHub");

    assert_eq!(
        svc.list("alice", &list_query("1", "10", Some("nothing-here"))).await,
        Err(VaultError::NotFound)
    );
}

#[tokio::test]
async fn list_on_empty_vault_is_not_found() {
    let (svc, _) = memory_service().await;
    assert_eq!(
        svc.list("alice", &ListQuery::default()).await,
        Err(VaultError::NotFound)
    );
}

#[tokio::test]
async fn edit_missing_id_is_not_found_and_changes_nothing() {
    let (svc, _) = memory_service().await;
    let id = svc.add("alice", request("GitHub", "https://github.com")).await.unwrap();
    let before = svc.get_one("alice", &id).await.unwrap();

    assert_eq!(
        svc.edit("alice", "does-not-exist", json!({"websiteName": "X"})).await,
        Err(VaultError::NotFound)
    );
    assert_eq!(svc.get_one("alice", &id).await.unwrap(), before);
}

#[tokio::test]
async fn edit_applies_partial_fields() {
    let (svc, _) = memory_service().await;
    let id = svc.add("alice", request("GitHub", "https://github.com")).await.unwrap();

    let updated = svc
        .edit(
            "alice",
            &id,
            json!({"password": "new-ct", "passwordIv": "new-iv", "passwordStrength": 4}),
        )
        .await
        .unwrap();
    assert_eq!(updated.password, CipherPair::new("new-ct", "new-iv"));
    assert_eq!(updated.password_strength, 4);
    assert_eq!(updated.website_name, "GitHub");

    let unchanged = svc.edit("alice", &id, json!({})).await.unwrap();
    assert_eq!(unchanged, updated);
}

#[tokio::test]
async fn edit_onto_existing_tuple_conflicts() {
    let (svc, _) = memory_service().await;
    svc.add("alice", request("GitHub", "https://github.com")).await.unwrap();
    let other = svc.add("alice", request("GitLab", "https://gitlab.com")).await.unwrap();

    assert_eq!(
        svc.edit(
            "alice",
            &other,
            json!({"websiteName": "GitHub", "websiteUrl": "https://github.com"})
        )
        .await,
        Err(VaultError::Conflict)
    );
    assert_eq!(svc.get_one("alice", &other).await.unwrap().website_name, "GitLab");
}

#[tokio::test]
async fn delete_one_reports_count_then_not_found() {
    let (svc, _) = memory_service().await;
    let id = svc.add("alice", request("GitHub", "https://github.com")).await.unwrap();

    assert_eq!(svc.delete_one("alice", &id).await, Ok(1));
    assert_eq!(svc.delete_one("alice", &id).await, Err(VaultError::NotFound));
    assert!(matches!(
        svc.delete_one("alice", "").await,
        Err(VaultError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn ids_are_not_reused_after_delete() {
    let (svc, _) = memory_service().await;
    let first = svc.add("alice", request("GitHub", "https://github.com")).await.unwrap();
    svc.delete_one("alice", &first).await.unwrap();
    let second = svc.add("alice", request("GitHub", "https://github.com")).await.unwrap();
    assert_ne!(first, second);
}
