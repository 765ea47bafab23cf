use serde_json::json;
use std::collections::BTreeMap;
use vocab_core::db::open_db_in_memory;
use vocab_core::{
    FieldTypeFilter, Item, RepoError, SelectionType, SqliteVocabularyRepository, ValidationError,
    Vocabulary, VocabularyListQuery, VocabularyRepository, VocabularyType, VocabularyUpdate,
};

fn vocabulary(id: &str) -> Vocabulary {
    Vocabulary::new(id, id.to_uppercase(), VocabularyType::Manageable)
}

#[test]
fn insert_and_find_roundtrip_keeps_items_and_unknown_keys() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVocabularyRepository::try_new(&conn).unwrap();

    let mut genre = vocabulary("genre");
    genre.items = serde_json::from_value(json!([
        {"name": "Feature", "qcode": "feature", "color": "#fff"},
        {"name": "Opinion", "qcode": "opinion", "is_active": false}
    ]))
    .unwrap();
    repo.insert(&[genre]).unwrap();

    let loaded = repo.find_one("genre").unwrap().unwrap();
    assert_eq!(loaded.display_name, "GENRE");
    assert_eq!(loaded.items.len(), 2);
    assert_eq!(loaded.items[0].extra.get("color"), Some(&json!("#fff")));
    assert!(!loaded.items[1].is_active());
    assert!(loaded.created_at.is_some());
    assert!(!loaded.is_deleted);
}

#[test]
fn insert_batch_is_all_or_nothing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVocabularyRepository::try_new(&conn).unwrap();
    repo.insert(&[vocabulary("urgency")]).unwrap();

    let err = repo
        .insert(&[vocabulary("genre"), vocabulary("urgency")])
        .unwrap_err();
    assert!(matches!(err, RepoError::AlreadyExists(id) if id == "urgency"));
    assert!(repo.find_one("genre").unwrap().is_none());
}

#[test]
fn insert_rejects_invalid_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVocabularyRepository::try_new(&conn).unwrap();

    let err = repo.insert(&[vocabulary("bad id")]).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::InvalidId(_))
    ));
}

#[test]
fn patch_overlays_present_fields_only() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVocabularyRepository::try_new(&conn).unwrap();
    let mut genre = vocabulary("genre");
    genre.description = Some("Story genres".to_string());
    repo.insert(&[genre]).unwrap();

    let patched = repo
        .patch("genre", &VocabularyUpdate::items(vec![Item::named("Feature")]))
        .unwrap();
    assert_eq!(patched.items.len(), 1);
    assert_eq!(patched.description.as_deref(), Some("Story genres"));

    let loaded = repo.find_one("genre").unwrap().unwrap();
    assert_eq!(loaded, patched);
}

#[test]
fn patch_missing_vocabulary_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVocabularyRepository::try_new(&conn).unwrap();

    let err = repo
        .patch("missing", &VocabularyUpdate::default())
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == "missing"));
}

#[test]
fn soft_delete_moves_vocabulary_to_tombstones() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVocabularyRepository::try_new(&conn).unwrap();
    repo.insert(&[vocabulary("genre")]).unwrap();

    repo.soft_delete("genre").unwrap();
    assert!(repo.find_one("genre").unwrap().is_none());
    assert!(repo.find_deleted("genre").unwrap().unwrap().is_deleted);
    assert!(matches!(
        repo.soft_delete("genre").unwrap_err(),
        RepoError::NotFound(_)
    ));
    assert!(matches!(
        repo.insert(&[vocabulary("genre")]).unwrap_err(),
        RepoError::AlreadyExists(_)
    ));
}

#[test]
fn replace_requires_active_row() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVocabularyRepository::try_new(&conn).unwrap();
    repo.insert(&[vocabulary("genre")]).unwrap();

    let mut replacement = vocabulary("genre");
    replacement.display_name = "Genres".to_string();
    repo.replace(&replacement).unwrap();
    assert_eq!(
        repo.find_one("genre").unwrap().unwrap().display_name,
        "Genres"
    );

    repo.soft_delete("genre").unwrap();
    assert!(matches!(
        repo.replace(&replacement).unwrap_err(),
        RepoError::NotFound(_)
    ));
}

#[test]
fn list_filters_on_indexed_columns() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVocabularyRepository::try_new(&conn).unwrap();

    let mut custom_text = vocabulary("custom_text");
    custom_text.field_type = Some("text".to_string());

    let mut services = vocabulary("categories");
    services.service = Some(BTreeMap::from([("all".to_string(), 1)]));

    let mut hidden = vocabulary("hidden");
    hidden.service = Some(BTreeMap::from([("all".to_string(), 1)]));
    hidden.selection_type = Some(SelectionType::DoNotShow);

    let system = Vocabulary::new("crop_sizes", "Crop sizes", VocabularyType::Unmanageable);

    repo.insert(&[custom_text, services, hidden, system]).unwrap();
    repo.insert(&[vocabulary("gone")]).unwrap();
    repo.soft_delete("gone").unwrap();

    let ids = |query: VocabularyListQuery| -> Vec<String> {
        repo.list(&query)
            .unwrap()
            .into_iter()
            .map(|vocabulary| vocabulary.id)
            .collect()
    };

    assert_eq!(
        ids(VocabularyListQuery::default()),
        vec!["categories", "crop_sizes", "custom_text", "hidden"]
    );
    assert_eq!(
        ids(VocabularyListQuery {
            field_type: FieldTypeFilter::Present,
            ..VocabularyListQuery::default()
        }),
        vec!["custom_text"]
    );
    assert_eq!(
        ids(VocabularyListQuery {
            field_type: FieldTypeFilter::Equals("text".to_string()),
            ..VocabularyListQuery::default()
        }),
        vec!["custom_text"]
    );
    assert_eq!(
        ids(VocabularyListQuery {
            kind: Some(VocabularyType::Unmanageable),
            ..VocabularyListQuery::default()
        }),
        vec!["crop_sizes"]
    );
    assert_eq!(
        ids(VocabularyListQuery {
            field_type: FieldTypeFilter::Absent,
            has_service: Some(true),
            selection_type: Some(SelectionType::DoNotShow),
            ..VocabularyListQuery::default()
        }),
        vec!["hidden"]
    );
    assert_eq!(
        ids(VocabularyListQuery {
            include_deleted: true,
            ..VocabularyListQuery::default()
        })
        .len(),
        5
    );
}
