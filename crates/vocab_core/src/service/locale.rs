//! Locale overlay for vocabulary items.
//!
//! # Invariants
//! - Inputs are never mutated; callers get fresh copies.
//! - A translation only replaces a field the item already carries.

use crate::model::vocabulary::Item;

/// Returns `items` with `translations[field][language]` laid over `field`.
///
/// `None` or a blank language returns plain copies.
pub fn localize_items(items: &[Item], language: Option<&str>) -> Vec<Item> {
    match language.map(str::trim).filter(|lang| !lang.is_empty()) {
        Some(language) => items
            .iter()
            .map(|item| localize_item(item, language))
            .collect(),
        None => items.to_vec(),
    }
}

/// Returns a copy of `item` resolved for `language`.
pub fn localize_item(item: &Item, language: &str) -> Item {
    let mut localized = item.clone();
    let Some(translations) = item.translations.as_ref() else {
        return localized;
    };

    for (field, values) in translations {
        if field == "translations" || item.field(field).is_none() {
            continue;
        }
        if let Some(value) = values.get(language) {
            localized.set_field(field, value.clone());
        }
    }
    localized
}
