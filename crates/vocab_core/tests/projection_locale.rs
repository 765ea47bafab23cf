use serde_json::json;
use std::sync::Arc;
use vocab_core::db::open_db_in_memory;
use vocab_core::{
    localize_items, EngineConfig, Item, ItemQuery, LogNotifier, RequestContext,
    SqliteVocabularyRepository, Vocabulary, VocabularyService, VocabularyType,
};

fn items(raw: serde_json::Value) -> Vec<Item> {
    serde_json::from_value(raw).unwrap()
}

#[test]
fn get_languages_returns_active_items_with_scheme() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVocabularyRepository::try_new(&conn).unwrap();
    let service = VocabularyService::new(repo, Arc::new(LogNotifier), EngineConfig::default());

    let mut languages = Vocabulary::new("languages", "Languages", VocabularyType::Manageable);
    languages.items = items(json!([
        {"name": "English", "qcode": "en", "is_active": true},
        {"name": "Dead", "qcode": "xx", "is_active": false}
    ]));
    service
        .create(vec![languages], &RequestContext::default())
        .unwrap();

    let found = service.get_languages().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].item.name.as_deref(), Some("English"));
    assert_eq!(found[0].scheme, "languages");

    let encoded = serde_json::to_value(&found[0]).unwrap();
    assert_eq!(
        encoded,
        json!({"name": "English", "qcode": "en", "scheme": "languages"})
    );
}

#[test]
fn get_items_filters_by_qcode_name_and_state() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVocabularyRepository::try_new(&conn).unwrap();
    let service = VocabularyService::new(repo, Arc::new(LogNotifier), EngineConfig::default());

    let mut genre = Vocabulary::new("genre", "Genre", VocabularyType::Manageable);
    genre.items = items(json!([
        {"name": "Feature", "qcode": "feature", "translations": {"name": {"fr": "Reportage"}}},
        {"name": "Opinion", "qcode": "opinion", "is_active": false},
        {"name": "Analysis", "qcode": "analysis"}
    ]));
    service.create(vec![genre], &RequestContext::default()).unwrap();

    assert_eq!(
        service.get_items("genre", &ItemQuery::default()).unwrap().len(),
        2
    );
    assert_eq!(
        service
            .get_items("genre", &ItemQuery::default().any_state())
            .unwrap()
            .len(),
        3
    );

    let by_qcode = service
        .get_items("genre", &ItemQuery::qcode("analysis"))
        .unwrap();
    assert_eq!(by_qcode.len(), 1);
    assert_eq!(by_qcode[0].item.name.as_deref(), Some("Analysis"));

    assert!(service
        .get_items("genre", &ItemQuery::qcode("opinion"))
        .unwrap()
        .is_empty());

    let by_translated_name = service
        .get_items("genre", &ItemQuery::name("REPORTAGE").with_lang("fr"))
        .unwrap();
    assert_eq!(by_translated_name[0].item.qcode.as_deref(), Some("feature"));

    assert!(service
        .get_items("missing", &ItemQuery::default())
        .unwrap()
        .is_empty());
}

#[test]
fn locale_overlay_is_pure() {
    let source = items(json!([
        {"name": "Global", "translations": {"name": {"fr": "Monde"}}}
    ]));
    let snapshot = source.clone();

    let french = localize_items(&source, Some("fr"));
    assert_eq!(french[0].name.as_deref(), Some("Monde"));

    let german = localize_items(&source, Some("de"));
    assert_eq!(german[0].name.as_deref(), Some("Global"));

    assert_eq!(source, snapshot);
}
