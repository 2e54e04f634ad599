//! Integration tests for repository lifecycles: tag conflicts, entry
//! delete cascades, share revocation, and session validation.
//!
//! These run against a live PostgreSQL instance and are ignored by
//! default; run them with `cargo test -- --ignored`.

use biblio_core::{
    AnnotationRepository, CreateAnnotationRequest, CreateEntryRequest, CreateProjectRequest,
    CreateTagRequest, EntryRepository, Error, ProjectRef, ProjectRepository, SessionRepository,
    ShareRepository, TagRepository, Tier,
};
use biblio_db::test_fixtures::{ensure_schema, seed_user, DEFAULT_TEST_DATABASE_URL};
use biblio_db::Database;
use chrono::Duration;
use uuid::Uuid;

async fn setup_db() -> Database {
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_TEST_DATABASE_URL.to_string());
    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to test database");
    ensure_schema(&db.pool).await.expect("Failed to create schema");
    db
}

fn unique_name(stem: &str) -> String {
    format!("{}-{}", stem, Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_duplicate_tag_name_conflicts_case_insensitively() {
    let db = setup_db().await;
    let user = seed_user(&db.pool, Tier::Free).await.unwrap();

    let name = unique_name("bayes");
    db.tags
        .create(
            user,
            CreateTagRequest {
                name: name.clone(),
                color: Some("#336699".to_string()),
                group_name: None,
            },
        )
        .await
        .unwrap();

    let err = db
        .tags
        .create(
            user,
            CreateTagRequest {
                name: name.to_uppercase(),
                color: None,
                group_name: None,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Conflict(_)), "got {:?}", err);
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_same_tag_name_allowed_across_users() {
    let db = setup_db().await;
    let alice = seed_user(&db.pool, Tier::Free).await.unwrap();
    let bob = seed_user(&db.pool, Tier::Free).await.unwrap();

    let name = unique_name("shared");
    for user in [alice, bob] {
        db.tags
            .create(
                user,
                CreateTagRequest {
                    name: name.clone(),
                    color: None,
                    group_name: None,
                },
            )
            .await
            .unwrap();
    }
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_entry_delete_cascades() {
    let db = setup_db().await;
    let user = seed_user(&db.pool, Tier::Light).await.unwrap();

    let tag = db
        .tags
        .create(
            user,
            CreateTagRequest {
                name: unique_name("cascade"),
                color: None,
                group_name: None,
            },
        )
        .await
        .unwrap();

    let entry = db
        .entries
        .insert(
            user,
            CreateEntryRequest {
                project_id: None,
                title: "Doomed Entry".to_string(),
                authors: vec!["Smith, J.".to_string()],
                tags: Some(vec![tag]),
            },
        )
        .await
        .unwrap();

    db.annotations
        .create(
            user,
            entry,
            CreateAnnotationRequest {
                body: "key source for chapter 2".to_string(),
            },
        )
        .await
        .unwrap();

    db.entries.delete(user, entry).await.unwrap();

    let err = db.entries.fetch(user, entry).await.unwrap_err();
    assert!(matches!(err, Error::EntryNotFound(_)));
    let annotations = db.annotations.list_for_entry(user, entry).await.unwrap();
    assert!(annotations.is_empty());
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_share_link_lifecycle() {
    let db = setup_db().await;
    let user = seed_user(&db.pool, Tier::Pro).await.unwrap();

    let slug = unique_name("shared-proj");
    let project_id = db
        .projects
        .create(
            user,
            CreateProjectRequest {
                slug: slug.clone(),
                name: "Shared Project".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();

    db.entries
        .insert(
            user,
            CreateEntryRequest {
                project_id: Some(project_id),
                title: "Public Paper".to_string(),
                authors: vec![],
                tags: None,
            },
        )
        .await
        .unwrap();

    let created = db.shares.create(user, project_id).await.unwrap();
    assert!(created.token.starts_with("bib_pub_"));

    let view = db.shares.resolve(&created.token).await.unwrap().unwrap();
    assert_eq!(view.project_name, "Shared Project");
    assert_eq!(view.entries.len(), 1);

    db.shares.revoke(user, created.link.id).await.unwrap();

    // A revoked token resolves exactly like an unknown one.
    assert!(db.shares.resolve(&created.token).await.unwrap().is_none());
    assert!(db.shares.resolve("bib_pub_bogus").await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_other_users_cannot_revoke_a_share() {
    let db = setup_db().await;
    let owner = seed_user(&db.pool, Tier::Pro).await.unwrap();
    let other = seed_user(&db.pool, Tier::Pro).await.unwrap();

    let project_id = db
        .projects
        .create(
            owner,
            CreateProjectRequest {
                slug: unique_name("owner-proj"),
                name: "Owner Project".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();

    let created = db.shares.create(owner, project_id).await.unwrap();
    let err = db.shares.revoke(other, created.link.id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    // Still resolvable: the foreign revoke must not have landed.
    assert!(db.shares.resolve(&created.token).await.unwrap().is_some());
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_project_fetch_by_id_and_slug() {
    let db = setup_db().await;
    let user = seed_user(&db.pool, Tier::Light).await.unwrap();

    let slug = unique_name("thesis");
    let id = db
        .projects
        .create(
            user,
            CreateProjectRequest {
                slug: slug.clone(),
                name: "Thesis Sources".to_string(),
                description: Some("chapter bibliography".to_string()),
            },
        )
        .await
        .unwrap();

    let by_id = db.projects.fetch(user, &ProjectRef::Id(id)).await.unwrap();
    let by_slug = db
        .projects
        .fetch(user, &ProjectRef::Slug(slug))
        .await
        .unwrap();
    assert_eq!(by_id.id, by_slug.id);
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_session_validation_round_trip() {
    let db = setup_db().await;
    let user = seed_user(&db.pool, Tier::Light).await.unwrap();

    let token = db.sessions.mint(user, Duration::hours(1)).await.unwrap();
    assert!(token.starts_with("bib_sess_"));

    let auth = db.sessions.validate(&token).await.unwrap().unwrap();
    assert_eq!(auth.id, user);
    assert_eq!(auth.tier, Tier::Light);

    db.sessions.revoke(&token).await.unwrap();
    assert!(db.sessions.validate(&token).await.unwrap().is_none());

    // Wrong-prefix and unknown tokens resolve to nothing.
    assert!(db.sessions.validate("not-a-token").await.unwrap().is_none());
    assert!(db
        .sessions
        .validate("bib_sess_unknown")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_entries_list_is_tenant_scoped() {
    let db = setup_db().await;
    let alice = seed_user(&db.pool, Tier::Free).await.unwrap();
    let bob = seed_user(&db.pool, Tier::Free).await.unwrap();

    db.entries
        .insert(
            alice,
            CreateEntryRequest {
                project_id: None,
                title: "Alice Only".to_string(),
                authors: vec![],
                tags: None,
            },
        )
        .await
        .unwrap();

    let listed = db
        .entries
        .list(bob, Default::default())
        .await
        .unwrap();
    assert!(listed.entries.iter().all(|e| e.entry.user_id == bob));
    assert!(!listed.entries.iter().any(|e| e.entry.title == "Alice Only"));
}
