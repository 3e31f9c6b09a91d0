//! Collection request matching.

use vitaguide_core::CollectionId;

use crate::catalog::CollectionEntry;

use super::patterns;

/// Used when the live collection table cannot be fetched. Best effort: ids
/// are handles, which the catalogue adapter resolves by handle.
const FALLBACK_COLLECTIONS: &[(&str, &str)] = &[
    ("sommeil", "Sommeil"),
    ("energie", "Énergie"),
    ("immunite", "Immunité"),
    ("stress", "Stress"),
    ("digestion", "Digestion"),
    ("minceur", "Minceur"),
    ("sport", "Sport"),
    ("beaute", "Beauté"),
    ("vitamines", "Vitamines"),
    ("mineraux", "Minéraux"),
    ("best-sellers", "Best-sellers"),
];

/// The static collection table.
#[must_use]
pub fn fallback_collections() -> Vec<CollectionEntry> {
    FALLBACK_COLLECTIONS
        .iter()
        .map(|(handle, title)| CollectionEntry {
            id: CollectionId::new(*handle),
            handle: (*handle).to_string(),
            title: (*title).to_string(),
        })
        .collect()
}

/// The collection a lower-cased message asks for, if any.
///
/// Needs a trigger word ("collection", "gamme", ...) and a title or handle
/// from `table`. The longest matching name wins.
#[must_use]
pub fn requested_collection(message: &str, table: &[CollectionEntry]) -> Option<CollectionId> {
    if !patterns::mentions_collection(message) {
        return None;
    }

    table
        .iter()
        .filter_map(|entry| {
            let title = entry.title.to_lowercase();
            let handle = entry.handle.replace('-', " ");
            [title, handle]
                .into_iter()
                .filter(|name| !name.is_empty() && contains_word(message, name))
                .map(|name| name.chars().count())
                .max()
                .map(|len| (len, entry))
        })
        .max_by_key(|(len, _)| *len)
        .map(|(_, entry)| entry.id.clone())
}

/// Whole-word containment, so "sport" does not match "transport".
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack.get(..start).and_then(|s| s.chars().next_back());
        let after = haystack
            .get(start + needle.len()..)
            .and_then(|s| s.chars().next());
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
