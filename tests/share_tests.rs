mod common;

use chrono::Utc;

use doc_vault::share::{AccessLevel, RevokeMode, ViewerStrategy};
use doc_vault::storage::models::{ShareGrant, ShareType};

use common::{seed_document, seed_user, share_engine, test_env};

// ============================================================================
// create_share
// ============================================================================

#[tokio::test]
async fn test_create_public_link_mints_and_caches_url() {
    let env = test_env();
    let shares = share_engine(&env);
    seed_document(&env, "d1", "u1", "report.pdf", b"bytes").await;

    let grant = shares
        .create_share("u1", "d1", ShareType::PublicLink)
        .await
        .unwrap();

    assert_eq!(grant.doc_id, "d1");
    assert_eq!(grant.granting_uid, "u1");
    assert!(grant.signed_url.is_some());
    let expires_at = grant.expires_at.unwrap();
    let ttl = expires_at - Utc::now();
    assert!(ttl > chrono::Duration::hours(23));
    assert!(ttl <= chrono::Duration::hours(24));

    // Persisted under its token
    let stored = env.db.get_share(&grant.id).unwrap().unwrap();
    assert_eq!(stored.share_type, ShareType::PublicLink);
}

#[tokio::test]
async fn test_create_restricted_share_mints_nothing() {
    let env = test_env();
    let shares = share_engine(&env);
    seed_document(&env, "d1", "u1", "report.pdf", b"bytes").await;

    let grant = shares
        .create_share("u1", "d1", ShareType::Restricted)
        .await
        .unwrap();

    assert_eq!(grant.signed_url, None);
    assert_eq!(grant.expires_at, None);
}

#[tokio::test]
async fn test_create_share_requires_ownership() {
    let env = test_env();
    let shares = share_engine(&env);
    seed_document(&env, "d1", "u1", "report.pdf", b"bytes").await;

    let err = shares
        .create_share("intruder", "d1", ShareType::PublicLink)
        .await
        .unwrap_err();
    // Same shape as a missing document; no existence leakage
    assert_eq!(err.code(), "not_found");

    let err = shares
        .create_share("u1", "no-such-doc", ShareType::PublicLink)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "not_found");
}

// ============================================================================
// add_recipients / resolve_viewer
// ============================================================================

#[tokio::test]
async fn test_add_recipients_resolves_and_reports_unknown_emails() {
    let env = test_env();
    let shares = share_engine(&env);
    seed_document(&env, "d1", "u1", "report.pdf", b"bytes").await;
    seed_user(&env, "u2", "ana@example.com");
    seed_user(&env, "u3", "bo@example.com");

    let emails = vec![
        "ana@example.com".to_string(),
        "bo@example.com".to_string(),
        "ghost@example.com".to_string(),
    ];
    let report = shares
        .add_recipients("u1", "d1", &emails, AccessLevel::View)
        .await
        .unwrap();

    assert_eq!(report.added.len(), 2);
    assert_eq!(report.unresolved_emails, vec!["ghost@example.com".to_string()]);

    let doc = env.db.get_document("d1").unwrap().unwrap();
    assert!(doc.shared_to.contains("u2"));
    assert!(doc.shared_to.contains("u3"));
    assert!(doc.shared_from.contains("u1"));
}

#[tokio::test]
async fn test_add_recipients_is_idempotent_union() {
    let env = test_env();
    let shares = share_engine(&env);
    seed_document(&env, "d1", "u1", "report.pdf", b"bytes").await;
    seed_user(&env, "u2", "ana@example.com");

    let emails = vec!["ana@example.com".to_string()];
    shares
        .add_recipients("u1", "d1", &emails, AccessLevel::View)
        .await
        .unwrap();
    let report = shares
        .add_recipients("u1", "d1", &emails, AccessLevel::Edit)
        .await
        .unwrap();

    // Second add changes nothing
    assert!(report.added.is_empty());
    let doc = env.db.get_document("d1").unwrap().unwrap();
    assert_eq!(doc.shared_to.len(), 1);
}

#[tokio::test]
async fn test_add_recipients_requires_ownership() {
    let env = test_env();
    let shares = share_engine(&env);
    seed_document(&env, "d1", "u1", "report.pdf", b"bytes").await;
    seed_user(&env, "u2", "ana@example.com");

    let err = shares
        .add_recipients("u2", "d1", &["ana@example.com".to_string()], AccessLevel::View)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[tokio::test]
async fn test_resolve_viewer_owner_recipient_stranger() {
    let env = test_env();
    let shares = share_engine(&env);
    seed_document(&env, "d1", "u1", "report.pdf", b"bytes").await;
    seed_user(&env, "u2", "ana@example.com");
    shares
        .add_recipients("u1", "d1", &["ana@example.com".to_string()], AccessLevel::View)
        .await
        .unwrap();

    assert!(shares.resolve_viewer("u1", "d1").await.is_ok());
    assert!(shares.resolve_viewer("u2", "d1").await.is_ok());

    let err = shares.resolve_viewer("stranger", "d1").await.unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[tokio::test]
async fn test_shared_with_me_listing_carries_provenance() {
    let env = test_env();
    let shares = share_engine(&env);
    seed_document(&env, "d1", "u1", "report.pdf", b"bytes").await;
    seed_user(&env, "u2", "ana@example.com");
    shares
        .add_recipients("u1", "d1", &["ana@example.com".to_string()], AccessLevel::View)
        .await
        .unwrap();

    let listed = env.db.list_documents_shared_with("u2").unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "d1");
    assert!(listed[0].shared_from.contains("u1"));
}

// ============================================================================
// access_public_grant
// ============================================================================

#[tokio::test]
async fn test_restricted_grant_always_denies() {
    let env = test_env();
    let shares = share_engine(&env);
    seed_document(&env, "d1", "u1", "report.pdf", b"bytes").await;

    let grant = shares
        .create_share("u1", "d1", ShareType::Restricted)
        .await
        .unwrap();

    let err = shares.access_public_grant(&grant.id).await.unwrap_err();
    assert_eq!(err.code(), "access_restricted");
}

#[tokio::test]
async fn test_public_grant_serves_cached_url_while_fresh() {
    let env = test_env();
    let shares = share_engine(&env);
    seed_document(&env, "d1", "u1", "clip.mp4", b"video").await;

    let grant = shares
        .create_share("u1", "d1", ShareType::PublicLink)
        .await
        .unwrap();

    let link = shares.access_public_grant(&grant.id).await.unwrap();
    assert_eq!(link.url, grant.signed_url.unwrap());
    assert_eq!(link.viewer, ViewerStrategy::MediaInline);
    assert_eq!(link.file_name, "clip.mp4");
}

#[tokio::test]
async fn test_public_grant_wraps_office_documents() {
    let env = test_env();
    let shares = share_engine(&env);
    seed_document(&env, "d1", "u1", "slides.pptx", b"deck").await;

    let grant = shares
        .create_share("u1", "d1", ShareType::PublicLink)
        .await
        .unwrap();

    let link = shares.access_public_grant(&grant.id).await.unwrap();
    assert_eq!(link.viewer, ViewerStrategy::OfficeGview);
    assert!(link.url.starts_with("https://docs.google.com/gview?url="));
}

#[tokio::test]
async fn test_expired_public_grant_signals_expiry_without_reminting() {
    let env = test_env();
    let shares = share_engine(&env);
    seed_document(&env, "d1", "u1", "report.pdf", b"bytes").await;

    // A grant whose cached URL expired an hour ago
    let grant = ShareGrant {
        id: "stale-token".to_string(),
        doc_id: "d1".to_string(),
        granting_uid: "u1".to_string(),
        share_type: ShareType::PublicLink,
        signed_url: Some("http://localhost:8080/blob/documents/u1/report.pdf?expires=0&sig=x".to_string()),
        expires_at: Some(Utc::now() - chrono::Duration::hours(1)),
        created_at: Utc::now() - chrono::Duration::hours(25),
    };
    env.db.insert_share(&grant).unwrap();

    let err = shares.access_public_grant("stale-token").await.unwrap_err();
    assert_eq!(err.code(), "link_expired");

    // The grant was not refreshed behind the owner's back
    let stored = env.db.get_share("stale-token").unwrap().unwrap();
    assert!(stored.expires_at.unwrap() < Utc::now());
}

#[tokio::test]
async fn test_unknown_grant_token_is_not_found() {
    let env = test_env();
    let shares = share_engine(&env);

    let err = shares.access_public_grant("no-such-token").await.unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[tokio::test]
async fn test_grant_dies_with_its_document() {
    let env = test_env();
    let shares = share_engine(&env);
    seed_document(&env, "d1", "u1", "report.pdf", b"bytes").await;

    let grant = shares
        .create_share("u1", "d1", ShareType::PublicLink)
        .await
        .unwrap();

    env.db.delete_document("d1", "u1").unwrap();

    let err = shares.access_public_grant(&grant.id).await.unwrap_err();
    assert_eq!(err.code(), "not_found");
}

// ============================================================================
// revoke_share
// ============================================================================

#[tokio::test]
async fn test_owner_revoke_clears_recipients_and_link_grants() {
    let env = test_env();
    let shares = share_engine(&env);
    seed_document(&env, "d1", "u1", "report.pdf", b"bytes").await;
    seed_user(&env, "u2", "ana@example.com");
    seed_user(&env, "u3", "bo@example.com");

    shares
        .add_recipients(
            "u1",
            "d1",
            &["ana@example.com".to_string(), "bo@example.com".to_string()],
            AccessLevel::View,
        )
        .await
        .unwrap();
    let link = shares
        .create_share("u1", "d1", ShareType::PublicLink)
        .await
        .unwrap();
    let restricted = shares
        .create_share("u1", "d1", ShareType::Restricted)
        .await
        .unwrap();

    let outcome = shares
        .revoke_share("u1", "d1", RevokeMode::Owner, None)
        .await
        .unwrap();
    assert_eq!(outcome.removed_recipients, 2);
    assert_eq!(outcome.deleted_grants, 1);

    // Former recipients are denied like strangers
    let err = shares.resolve_viewer("u2", "d1").await.unwrap_err();
    assert_eq!(err.code(), "not_found");

    // The link grant is gone; the restricted grant survives (and still denies)
    assert!(env.db.get_share(&link.id).unwrap().is_none());
    assert!(env.db.get_share(&restricted.id).unwrap().is_some());

    let doc = env.db.get_document("d1").unwrap().unwrap();
    assert!(doc.shared_to.is_empty());
}

#[tokio::test]
async fn test_owner_revoke_subset_keeps_other_recipients() {
    let env = test_env();
    let shares = share_engine(&env);
    seed_document(&env, "d1", "u1", "report.pdf", b"bytes").await;
    seed_user(&env, "u2", "ana@example.com");
    seed_user(&env, "u3", "bo@example.com");
    shares
        .add_recipients(
            "u1",
            "d1",
            &["ana@example.com".to_string(), "bo@example.com".to_string()],
            AccessLevel::View,
        )
        .await
        .unwrap();

    let outcome = shares
        .revoke_share("u1", "d1", RevokeMode::Owner, Some(&["u2".to_string()]))
        .await
        .unwrap();
    assert_eq!(outcome.removed_recipients, 1);

    assert!(shares.resolve_viewer("u3", "d1").await.is_ok());
    let err = shares.resolve_viewer("u2", "d1").await.unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[tokio::test]
async fn test_owner_revoke_requires_ownership() {
    let env = test_env();
    let shares = share_engine(&env);
    seed_document(&env, "d1", "u1", "report.pdf", b"bytes").await;

    let err = shares
        .revoke_share("u2", "d1", RevokeMode::Owner, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[tokio::test]
async fn test_recipient_can_leave_idempotently() {
    let env = test_env();
    let shares = share_engine(&env);
    seed_document(&env, "d1", "u1", "report.pdf", b"bytes").await;
    seed_user(&env, "u2", "ana@example.com");
    shares
        .add_recipients("u1", "d1", &["ana@example.com".to_string()], AccessLevel::View)
        .await
        .unwrap();

    let outcome = shares
        .revoke_share("u2", "d1", RevokeMode::Recipient, None)
        .await
        .unwrap();
    assert_eq!(outcome.removed_recipients, 1);
    assert!(shares.resolve_viewer("u2", "d1").await.is_err());

    // Leaving again is a success, not an error
    let outcome = shares
        .revoke_share("u2", "d1", RevokeMode::Recipient, None)
        .await
        .unwrap();
    assert_eq!(outcome.removed_recipients, 0);

    // The recipient index is clean
    assert!(env.db.list_documents_shared_with("u2").unwrap().is_empty());
}

// ============================================================================
// open_document
// ============================================================================

#[tokio::test]
async fn test_open_mints_fresh_short_ttl_link() {
    let env = test_env();
    let shares = share_engine(&env);
    seed_document(&env, "d1", "u1", "report.pdf", b"bytes").await;

    let first = shares.open_document("u1", "d1").await.unwrap();
    let second = shares.open_document("u1", "d1").await.unwrap();

    // Fresh mint per access, roughly ten minutes out
    let ttl = first.expires_at - Utc::now();
    assert!(ttl <= chrono::Duration::minutes(10));
    assert!(ttl > chrono::Duration::minutes(9));
    assert!(first.url.contains("/blob/documents/u1/report.pdf"));
    assert!(second.url.contains("/blob/documents/u1/report.pdf"));
}

#[tokio::test]
async fn test_open_allowed_for_recipient_denied_for_stranger() {
    let env = test_env();
    let shares = share_engine(&env);
    seed_document(&env, "d1", "u1", "report.pdf", b"bytes").await;
    seed_user(&env, "u2", "ana@example.com");
    shares
        .add_recipients("u1", "d1", &["ana@example.com".to_string()], AccessLevel::View)
        .await
        .unwrap();

    assert!(shares.open_document("u2", "d1").await.is_ok());

    let err = shares.open_document("nobody", "d1").await.unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[tokio::test]
async fn test_open_trashed_document_is_rejected() {
    let env = test_env();
    let shares = share_engine(&env);
    let engine = common::lifecycle_engine(&env);
    let doc = seed_document(&env, "d1", "u1", "report.pdf", b"bytes").await;

    engine.trash(&doc).await;

    let err = shares.open_document("u1", "d1").await.unwrap_err();
    assert_eq!(err.code(), "validation_error");
}
