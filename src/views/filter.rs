use std::collections::BTreeSet;

use crate::models::MediaItem;

/// Client-side narrowing of an already fetched list
///
/// Pure and synchronous: no network calls, input order preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    /// Case-insensitive substring over title, description and director
    pub query: Option<String>,
    /// Exact genre
    pub genre: Option<String>,
}

impl CatalogFilter {
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            genre: None,
        }
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn matches(&self, item: &MediaItem) -> bool {
        let query_ok = match self.query.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(query) => {
                let query = query.to_lowercase();
                [
                    Some(item.title.as_str()),
                    item.description.as_deref(),
                    item.director.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&query))
            }
        };

        let genre_ok = match self.genre.as_deref() {
            None | Some("") => true,
            Some(genre) => item.genre.as_deref() == Some(genre),
        };

        query_ok && genre_ok
    }

    pub fn apply<'a>(&self, items: impl IntoIterator<Item = &'a MediaItem>) -> Vec<&'a MediaItem> {
        items.into_iter().filter(|item| self.matches(item)).collect()
    }
}

/// Distinct genres, sorted
pub fn genres<'a>(items: impl IntoIterator<Item = &'a MediaItem>) -> Vec<String> {
    items
        .into_iter()
        .filter_map(|item| item.genre.as_deref())
        .filter(|genre| !genre.trim().is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
