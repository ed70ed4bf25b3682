use std::sync::Arc;

use document_service_core::{
    ContentType, DocumentError, DocumentId, DocumentManager, DocumentStatus, EventKind,
    InMemoryRepository, MiddlewareRegistry, Params, PublicationState, SchemaRegistry,
    ServiceConfig,
};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

const ARTICLE: &str = "api::article.article";
const AUTHOR: &str = "api::author.author";
const SETTINGS: &str = "api::settings.settings";

fn schemas() -> SchemaRegistry {
    SchemaRegistry::new()
        .with(ContentType::new(ARTICLE).localized().relation("author", AUTHOR))
        .with(ContentType::new(AUTHOR))
        .with(ContentType::new(SETTINGS).without_draft_and_publish())
}

fn manager_with(repo: InMemoryRepository) -> DocumentManager {
    DocumentManager::new(
        Arc::new(repo),
        schemas(),
        MiddlewareRegistry::new(),
        ServiceConfig::default(),
    )
}

fn manager() -> DocumentManager {
    manager_with(InMemoryRepository::new())
}

async fn create_article(manager: &DocumentManager, locale: Option<&str>, title: &str) -> DocumentId {
    let mut params = Params::new().data(json!({ "title": title }));
    if let Some(locale) = locale {
        params = params.locale(locale);
    }
    let created = manager.documents(ARTICLE).unwrap().create(params).await.unwrap();
    created.document_id
}

#[tokio::test]
async fn create_without_locale_uses_default_locale() {
    let manager = manager();
    let articles = manager.documents(ARTICLE).unwrap();
    let id = create_article(&manager, None, "A").await;

    let found = articles
        .find_one(&id, Params::new().locale("en"))
        .await
        .unwrap()
        .expect("draft should exist");

    assert_eq!(found.get("title"), Some(&json!("A")));
    assert_eq!(found.locale.as_deref(), Some("en"));
    assert!(found.published_at.is_none());
    assert_eq!(found.status, DocumentStatus::Draft);
}

#[tokio::test]
async fn non_localized_types_ignore_locale_argument() {
    let manager = manager();
    let authors = manager.documents(AUTHOR).unwrap();

    let created = authors
        .create(Params::new().locale("fr").data(json!({ "name": "Ada" })))
        .await
        .unwrap();
    assert_eq!(created.locale, None);

    let found = authors
        .find_one(&created.document_id, Params::new().locale("de"))
        .await
        .unwrap();
    assert!(found.is_some());
}

#[tokio::test]
async fn create_rejects_wildcard_locale_and_status() {
    let manager = manager();
    let articles = manager.documents(ARTICLE).unwrap();

    let err = articles
        .create(Params::new().locale("*").data(json!({ "title": "A" })))
        .await
        .unwrap_err();
    assert!(err.is_validation());

    // Status on create is forced to draft rather than rejected.
    let created = articles
        .create(Params::new().published().data(json!({ "title": "A" })))
        .await
        .unwrap();
    assert!(created.is_draft());
}

#[tokio::test]
async fn unknown_document_yields_none() {
    let manager = manager();
    let articles = manager.documents(ARTICLE).unwrap();
    let missing = DocumentId::generate();

    assert_eq!(assert_ok!(articles.find_one(&missing, Params::new()).await), None);
    assert_eq!(assert_ok!(articles.update(&missing, Params::new().data(json!({}))).await), None);
    assert_eq!(assert_ok!(articles.publish(&missing, Params::new()).await), None);
    assert_eq!(assert_ok!(articles.unpublish(&missing, Params::new()).await), None);
    assert_eq!(assert_ok!(articles.discard_draft(&missing, Params::new()).await), None);
    assert_eq!(assert_ok!(articles.clone_document(&missing, Params::new()).await), None);
    assert_eq!(assert_ok!(articles.delete(&missing, Params::new()).await).count, 0);
}

#[tokio::test]
async fn unknown_content_type_is_an_error() {
    let manager = manager();
    assert!(matches!(
        manager.documents("api::missing.missing"),
        Err(DocumentError::UnknownContentType(uid)) if uid == "api::missing.missing"
    ));
}

#[tokio::test]
async fn document_id_survives_every_transition() {
    let manager = manager();
    let articles = manager.documents(ARTICLE).unwrap();
    let id = create_article(&manager, None, "A").await;

    let updated = articles
        .update(&id, Params::new().data(json!({ "title": "B" })))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.document_id, id);

    let published = articles.publish(&id, Params::new()).await.unwrap().unwrap();
    assert_eq!(published.document_id, id);
    assert!(published.versions.iter().all(|v| v.document_id == id));

    let discarded = articles.discard_draft(&id, Params::new()).await.unwrap().unwrap();
    assert_eq!(discarded.document_id, id);

    let unpublished = articles.unpublish(&id, Params::new()).await.unwrap().unwrap();
    assert_eq!(unpublished.document_id, id);
    assert_eq!(articles.count(Params::new().locale("*")).await.unwrap(), 1);
}

#[tokio::test]
async fn publish_touches_only_the_requested_locale() {
    let manager = manager();
    let articles = manager.documents(ARTICLE).unwrap();
    let id = create_article(&manager, Some("en"), "Hello").await;
    articles
        .update(&id, Params::new().locale("fr").data(json!({ "title": "Bonjour" })))
        .await
        .unwrap();

    let published = articles
        .publish(&id, Params::new().locale("en"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(published.versions.len(), 1);
    assert_eq!(published.versions[0].locale.as_deref(), Some("en"));

    let french = articles
        .find_one(&id, Params::new().locale("fr").published())
        .await
        .unwrap();
    assert!(french.is_none());
    let french_draft = articles
        .find_one(&id, Params::new().locale("fr"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(french_draft.status, DocumentStatus::Draft);
}

#[tokio::test]
async fn publishing_twice_replaces_the_published_row() {
    let manager = manager();
    let articles = manager.documents(ARTICLE).unwrap();
    let id = create_article(&manager, None, "A").await;

    articles.publish(&id, Params::new()).await.unwrap();
    articles.publish(&id, Params::new()).await.unwrap();

    let published = articles
        .count(Params::new().published().filters(json!({ "documentId": id.as_str() })))
        .await
        .unwrap();
    assert_eq!(published, 1);
}

#[tokio::test]
async fn modified_status_follows_draft_divergence() {
    let manager = manager();
    let articles = manager.documents(ARTICLE).unwrap();
    let id = create_article(&manager, None, "Original").await;
    articles.publish(&id, Params::new()).await.unwrap();

    let draft = articles.find_one(&id, Params::new().draft()).await.unwrap().unwrap();
    assert_eq!(draft.status, DocumentStatus::Published);

    articles
        .update(&id, Params::new().data(json!({ "title": "Changed" })))
        .await
        .unwrap();

    let draft = articles.find_one(&id, Params::new().draft()).await.unwrap().unwrap();
    assert_eq!(draft.status, DocumentStatus::Modified);
    let published = articles
        .find_one(&id, Params::new().published())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(published.get("title"), Some(&json!("Original")));

    articles.discard_draft(&id, Params::new()).await.unwrap();
    let draft = articles.find_one(&id, Params::new().draft()).await.unwrap().unwrap();
    assert_eq!(draft.status, DocumentStatus::Published);
    assert_eq!(draft.get("title"), Some(&json!("Original")));
}

#[tokio::test]
async fn delete_many_rejects_status() {
    let manager = manager();
    let articles = manager.documents(ARTICLE).unwrap();
    create_article(&manager, None, "A").await;

    for filters in [json!({}), json!({ "title": "A" }), json!({ "title": { "$null": true } })] {
        let err = assert_err!(
            articles
                .delete_many(Params::new().filters(filters).draft())
                .await
        );
        assert!(err.is_validation());
    }
    assert_eq!(articles.count(Params::new().locale("*")).await.unwrap(), 1);
}

#[tokio::test]
async fn delete_many_by_ids_and_filters() {
    let manager = manager();
    let articles = manager.documents(ARTICLE).unwrap();
    let first = create_article(&manager, None, "keep").await;
    let second = create_article(&manager, None, "drop").await;
    let third = create_article(&manager, None, "drop").await;

    let deleted = articles
        .delete_many(Params::new().filters(json!({ "title": "drop" })))
        .await
        .unwrap();
    assert_eq!(deleted.count, 2);

    let deleted = articles
        .delete_many(Params::new().document_ids(Vec::new()))
        .await
        .unwrap();
    assert_eq!(deleted.count, 0);

    let deleted = articles
        .delete_many(Params::new().document_ids([first.clone(), second, third]))
        .await
        .unwrap();
    assert_eq!(deleted.count, 1);
    assert!(articles.find_one(&first, Params::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn unpublish_leaves_only_the_draft() {
    let manager = manager();
    let articles = manager.documents(ARTICLE).unwrap();
    let id = create_article(&manager, None, "A").await;
    articles.publish(&id, Params::new()).await.unwrap();

    let remaining = articles.unpublish(&id, Params::new()).await.unwrap().unwrap();
    assert_eq!(remaining.versions.len(), 1);
    assert!(remaining.versions[0].is_draft());

    let published = articles
        .find_many(Params::new().published().filters(json!({ "documentId": id.as_str() })))
        .await
        .unwrap();
    assert!(published.is_empty());
}

#[tokio::test]
async fn clone_respects_locale_scope() {
    let manager = manager();
    let articles = manager.documents(ARTICLE).unwrap();
    let source = create_article(&manager, Some("en"), "Hello").await;
    articles
        .update(&source, Params::new().locale("fr").data(json!({ "title": "Bonjour" })))
        .await
        .unwrap();

    let single = articles
        .clone_document(
            &source,
            Params::new().locale("en").data(json!({ "title": "Clone" })),
        )
        .await
        .unwrap()
        .unwrap();
    assert_ne!(single.document_id, source);
    assert_eq!(single.versions.len(), 1);
    let version = &single.versions[0];
    assert_eq!(version.locale.as_deref(), Some("en"));
    assert!(version.is_draft());
    assert_eq!(version.get("title"), Some(&json!("Clone")));

    let every = articles
        .clone_document(&source, Params::new().data(json!({ "title": "Clone" })))
        .await
        .unwrap()
        .unwrap();
    let mut locales: Vec<_> = every
        .versions
        .iter()
        .filter_map(|v| v.locale.clone())
        .collect();
    locales.sort();
    assert_eq!(locales, vec!["en", "fr"]);
}

#[tokio::test]
async fn delete_with_wildcard_removes_every_row() {
    let repo = InMemoryRepository::new();
    let manager = manager_with(repo.clone());
    let articles = manager.documents(ARTICLE).unwrap();
    let id = create_article(&manager, Some("en"), "Hello").await;
    articles
        .update(&id, Params::new().locale("fr").data(json!({ "title": "Bonjour" })))
        .await
        .unwrap();
    articles.publish(&id, Params::new().locale("*")).await.unwrap();
    assert_eq!(repo.row_count().await, 4);

    let deleted = articles.delete(&id, Params::new().locale("*")).await.unwrap();
    assert_eq!(deleted.count, 4);
    assert_eq!(repo.row_count().await, 0);
}

#[tokio::test]
async fn delete_without_locale_covers_all_locales() {
    let manager = manager();
    let articles = manager.documents(ARTICLE).unwrap();
    let id = create_article(&manager, Some("en"), "Hello").await;
    articles
        .update(&id, Params::new().locale("fr").data(json!({ "title": "Bonjour" })))
        .await
        .unwrap();

    let deleted = articles.delete(&id, Params::new()).await.unwrap();
    assert_eq!(deleted.count, 2);
}

#[tokio::test]
async fn update_materializes_draft_from_published() {
    let repo = InMemoryRepository::new();
    let manager = manager_with(repo.clone());
    let articles = manager.documents(ARTICLE).unwrap();
    let id = create_article(&manager, None, "A").await;
    articles.publish(&id, Params::new()).await.unwrap();
    articles.delete_many(Params::new().filters(json!({ "documentId": id.as_str(), "publishedAt": { "$null": true } }))).await.unwrap();
    assert_eq!(repo.row_count().await, 1);

    let updated = articles
        .update(&id, Params::new().data(json!({ "body": "text" })))
        .await
        .unwrap()
        .unwrap();
    assert!(updated.is_draft());
    assert_eq!(updated.get("title"), Some(&json!("A")));
    assert_eq!(updated.get("body"), Some(&json!("text")));
    assert_eq!(updated.status, DocumentStatus::Modified);
}

#[tokio::test]
async fn unique_violation_rolls_back_the_transaction() {
    let repo = InMemoryRepository::new().with_unique_fields(ARTICLE, ["slug"]);
    let manager = manager_with(repo.clone());
    let articles = manager.documents(ARTICLE).unwrap();

    articles
        .create(Params::new().data(json!({ "title": "A", "slug": "a" })))
        .await
        .unwrap();
    let err = articles
        .create(Params::new().data(json!({ "title": "B", "slug": "a" })))
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());
    assert_eq!(repo.row_count().await, 1);

    // The published copy lives in its own uniqueness scope.
    let first = articles.find_first(Params::new()).await.unwrap().unwrap();
    assert_ok!(articles.publish(&first.document_id, Params::new()).await);
}

#[tokio::test]
async fn find_page_reports_pagination() {
    let manager = manager();
    let articles = manager.documents(ARTICLE).unwrap();
    for n in 0..5 {
        create_article(&manager, None, &format!("T{n}")).await;
    }

    let page = articles
        .find_page(Params::new().page(2).page_size(2).sort("title:asc"))
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 5);
    assert_eq!(page.pagination.page_count, 3);
    let titles: Vec<_> = page.results.iter().map(|d| d.get("title").cloned()).collect();
    assert_eq!(titles, vec![Some(json!("T2")), Some(json!("T3"))]);

    let err = articles.find_page(Params::new().page(0)).await.unwrap_err();
    assert!(err.is_validation());

    let err = articles
        .find_page(Params::new().page(usize::MAX))
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn find_many_sorts_limits_and_projects() {
    let manager = manager();
    let articles = manager.documents(ARTICLE).unwrap();
    for title in ["b", "c", "a"] {
        articles
            .create(Params::new().data(json!({ "title": title, "body": "x" })))
            .await
            .unwrap();
    }

    let found = articles
        .find_many(
            Params::new()
                .sort("title:desc")
                .start(1)
                .limit(1)
                .fields(["title"]),
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("title"), Some(&json!("b")));
    assert!(found[0].get("body").is_none());

    let err = articles
        .find_many(Params::new().filters(json!({ "title": { "$bogus": 1 } })))
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentError::Filter(_)));
}

#[tokio::test]
async fn metadata_lists_sibling_locales_and_status() {
    let manager = manager();
    let articles = manager.documents(ARTICLE).unwrap();
    let id = create_article(&manager, Some("en"), "Hello").await;
    articles
        .update(&id, Params::new().locale("fr").data(json!({ "title": "Bonjour" })))
        .await
        .unwrap();
    articles.publish(&id, Params::new().locale("en")).await.unwrap();

    let found = articles
        .find_one(&id, Params::new().locale("en").with_metadata())
        .await
        .unwrap()
        .unwrap();
    let meta = found.meta.expect("metadata requested");
    assert_eq!(meta.available_status.len(), 1);
    assert!(meta.available_status[0].published_at.is_some());
    let locales: Vec<_> = meta
        .available_locales
        .iter()
        .map(|l| l.locale.clone())
        .collect();
    assert_eq!(locales, vec![Some("fr".to_string())]);

    let plain = articles.find_one(&id, Params::new()).await.unwrap().unwrap();
    assert!(plain.meta.is_none());
}

#[tokio::test]
async fn populate_resolves_relations_in_matching_state() {
    let manager = manager();
    let authors = manager.documents(AUTHOR).unwrap();
    let articles = manager.documents(ARTICLE).unwrap();

    let author = authors
        .create(Params::new().data(json!({ "name": "Ada" })))
        .await
        .unwrap();
    let article = articles
        .create(Params::new().data(json!({
            "title": "A",
            "author": author.document_id.as_str()
        })))
        .await
        .unwrap();

    let found = articles
        .find_one(&article.document_id, Params::new().populate(["author"]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.get("author").and_then(|a| a.get("name")), Some(&json!("Ada")));

    // The author has no published version yet.
    articles.publish(&article.document_id, Params::new()).await.unwrap();
    let published = articles
        .find_one(&article.document_id, Params::new().published().populate(["*"]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(published.get("author"), Some(&json!(null)));

    let unpopulated = articles
        .find_one(&article.document_id, Params::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unpopulated.get("author"), Some(&json!(author.document_id.as_str())));
}

#[tokio::test]
async fn types_without_draft_and_publish() {
    let manager = manager();
    let settings = manager.documents(SETTINGS).unwrap();

    let created = settings
        .create(Params::new().data(json!({ "theme": "dark" })))
        .await
        .unwrap();
    assert_eq!(created.status, DocumentStatus::Published);

    let found = settings
        .find_one(&created.document_id, Params::new().published())
        .await
        .unwrap();
    assert!(found.is_some());

    let err = settings
        .publish(&created.document_id, Params::new())
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn audit_fields_record_the_actor() {
    let manager = manager();
    let articles = manager.documents(ARTICLE).unwrap();

    let created = articles
        .create(Params::new().actor("alice").data(json!({ "title": "A" })))
        .await
        .unwrap();
    assert_eq!(created.created_by.as_deref(), Some("alice"));

    let updated = articles
        .update(
            &created.document_id,
            Params::new().actor("bob").data(json!({ "title": "B" })),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.created_by.as_deref(), Some("alice"));
    assert_eq!(updated.updated_by.as_deref(), Some("bob"));
}

#[tokio::test]
async fn system_fields_in_data_are_ignored() {
    let manager = manager();
    let articles = manager.documents(ARTICLE).unwrap();

    let created = articles
        .create(Params::new().data(json!({
            "title": "A",
            "documentId": "forged",
            "publishedAt": "2024-01-01T00:00:00Z"
        })))
        .await
        .unwrap();
    assert_ne!(created.document_id.as_str(), "forged");
    assert!(created.is_draft());
}

#[tokio::test]
async fn lifecycle_events_follow_commits() {
    let manager = manager();
    let mut events = manager.subscribe();
    let articles = manager.documents(ARTICLE).unwrap();

    let id = create_article(&manager, None, "A").await;
    articles.publish(&id, Params::new()).await.unwrap();
    articles.delete(&id, Params::new()).await.unwrap();

    let kinds: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
        .map(|event| {
            assert_eq!(event.document_id, id);
            event.kind
        })
        .collect();
    assert_eq!(kinds, vec![EventKind::Create, EventKind::Publish, EventKind::Delete]);

    // A rejected call publishes nothing.
    let _ = articles
        .delete_many(Params::new().status(PublicationState::Draft))
        .await;
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn discard_draft_keeps_other_locales() {
    let manager = manager();
    let articles = manager.documents(ARTICLE).unwrap();
    let id = create_article(&manager, Some("en"), "Hello").await;
    articles
        .update(&id, Params::new().locale("fr").data(json!({ "title": "Bonjour" })))
        .await
        .unwrap();
    articles.publish(&id, Params::new().locale("*")).await.unwrap();
    for (locale, title) in [("en", "Hello again"), ("fr", "Bonjour encore")] {
        articles
            .update(&id, Params::new().locale(locale).data(json!({ "title": title })))
            .await
            .unwrap();
    }

    let discarded = articles
        .discard_draft(&id, Params::new().locale("en"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(discarded.versions.len(), 1);
    assert_eq!(discarded.versions[0].locale.as_deref(), Some("en"));

    let english = articles.find_one(&id, Params::new().locale("en")).await.unwrap().unwrap();
    assert_eq!(english.get("title"), Some(&json!("Hello")));
    assert_eq!(english.status, DocumentStatus::Published);

    let french = articles.find_one(&id, Params::new().locale("fr")).await.unwrap().unwrap();
    assert_eq!(french.get("title"), Some(&json!("Bonjour encore")));
    assert_eq!(french.status, DocumentStatus::Modified);
}

#[tokio::test]
async fn discard_draft_skips_locales_without_both_versions() {
    let repo = InMemoryRepository::new();
    let manager = manager_with(repo.clone());
    let articles = manager.documents(ARTICLE).unwrap();
    let id = create_article(&manager, Some("en"), "Hello").await;
    articles.publish(&id, Params::new().locale("en")).await.unwrap();
    articles
        .update(&id, Params::new().locale("en").data(json!({ "title": "Hello again" })))
        .await
        .unwrap();
    articles
        .update(&id, Params::new().locale("fr").data(json!({ "title": "Bonjour" })))
        .await
        .unwrap();

    let discarded = articles.discard_draft(&id, Params::new()).await.unwrap().unwrap();
    let locales: Vec<_> = discarded.versions.iter().map(|v| v.locale.clone()).collect();
    assert_eq!(locales, vec![Some("en".to_string())]);

    let french = articles.find_one(&id, Params::new().locale("fr")).await.unwrap().unwrap();
    assert_eq!(french.get("title"), Some(&json!("Bonjour")));
    assert_eq!(french.status, DocumentStatus::Draft);

    // A published-only locale does not get a draft back.
    articles
        .delete_many(Params::new().filters(json!({
            "documentId": id.as_str(),
            "locale": "en",
            "publishedAt": { "$null": true }
        })))
        .await
        .unwrap();
    let discarded = articles
        .discard_draft(&id, Params::new().locale("en"))
        .await
        .unwrap()
        .unwrap();
    assert!(discarded.versions.is_empty());
    assert_eq!(repo.row_count().await, 2);
}

#[tokio::test]
async fn publish_across_locales_is_atomic() {
    let repo = InMemoryRepository::new().with_unique_fields(ARTICLE, ["slug"]);
    let manager = manager_with(repo.clone());
    let articles = manager.documents(ARTICLE).unwrap();

    // Holds the published French slug "x" while its draft moves on.
    let other = articles
        .create(Params::new().locale("fr").data(json!({ "slug": "x" })))
        .await
        .unwrap()
        .document_id;
    articles.publish(&other, Params::new().locale("fr")).await.unwrap();
    articles
        .update(&other, Params::new().locale("fr").data(json!({ "slug": "y" })))
        .await
        .unwrap();

    let id = articles
        .create(Params::new().locale("en").data(json!({ "slug": "x" })))
        .await
        .unwrap()
        .document_id;
    articles
        .update(&id, Params::new().locale("fr").data(json!({ "slug": "x" })))
        .await
        .unwrap();
    assert_eq!(repo.row_count().await, 4);

    let err = articles
        .publish(&id, Params::new().locale("*"))
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());
    assert_eq!(repo.row_count().await, 4);
    for locale in ["en", "fr"] {
        let published = articles
            .find_one(&id, Params::new().locale(locale).published())
            .await
            .unwrap();
        assert!(published.is_none(), "{locale} must stay unpublished");
    }
}

#[tokio::test]
async fn clone_across_locales_is_atomic() {
    let repo = InMemoryRepository::new().with_unique_fields(ARTICLE, ["slug"]);
    let manager = manager_with(repo.clone());
    let articles = manager.documents(ARTICLE).unwrap();

    let source = articles
        .create(Params::new().locale("en").data(json!({ "slug": "a" })))
        .await
        .unwrap()
        .document_id;
    articles
        .update(&source, Params::new().locale("fr").data(json!({ "slug": "b" })))
        .await
        .unwrap();
    articles
        .create(Params::new().locale("fr").data(json!({ "slug": "c" })))
        .await
        .unwrap();
    assert_eq!(repo.row_count().await, 3);

    let err = articles
        .clone_document(&source, Params::new().data(json!({ "slug": "c" })))
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());
    assert_eq!(repo.row_count().await, 3);
    let clones = articles
        .count(Params::new().locale("*").filters(json!({ "slug": "c" })))
        .await
        .unwrap();
    assert_eq!(clones, 1);
}

#[tokio::test]
async fn discard_draft_across_locales_is_atomic() {
    let repo = InMemoryRepository::new().with_unique_fields(ARTICLE, ["slug"]);
    let manager = manager_with(repo.clone());
    let articles = manager.documents(ARTICLE).unwrap();

    let id = articles
        .create(Params::new().locale("en").data(json!({ "slug": "e" })))
        .await
        .unwrap()
        .document_id;
    articles
        .update(&id, Params::new().locale("fr").data(json!({ "slug": "f" })))
        .await
        .unwrap();
    articles.publish(&id, Params::new().locale("*")).await.unwrap();
    for (locale, slug) in [("en", "e2"), ("fr", "f2")] {
        articles
            .update(&id, Params::new().locale(locale).data(json!({ "slug": slug })))
            .await
            .unwrap();
    }
    // Takes the French draft slug the discard would restore.
    articles
        .create(Params::new().locale("fr").data(json!({ "slug": "f" })))
        .await
        .unwrap();
    assert_eq!(repo.row_count().await, 5);

    let err = articles
        .discard_draft(&id, Params::new().locale("*"))
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());
    assert_eq!(repo.row_count().await, 5);
    let english = articles.find_one(&id, Params::new().locale("en")).await.unwrap().unwrap();
    assert_eq!(english.get("slug"), Some(&json!("e2")));
}
