use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::AppError;

pub mod media_item;
pub mod review;
pub mod watchlist;

pub use media_item::{MediaDraft, MediaItem, RatingSummary};
pub use review::{Rating, Review, ReviewRequest};
pub use watchlist::WatchlistEntry;

/// Declares a numeric identifier newtype that is transparent on the wire
macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a movie or TV series
    MovieId
);
numeric_id!(
    /// Identifier of a review
    ReviewId
);
numeric_id!(
    /// Identifier of a user account
    UserId
);

/// Kind of catalog item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
    #[default]
    Movie,
    TvSeries,
}

impl MediaType {
    pub fn as_param(&self) -> &'static str {
        match self {
            MediaType::Movie => "MOVIE",
            MediaType::TvSeries => "TV_SERIES",
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_param())
    }
}

impl FromStr for MediaType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MOVIE" => Ok(MediaType::Movie),
            "TV_SERIES" | "SERIES" => Ok(MediaType::TvSeries),
            other => Err(AppError::Validation(format!("Unknown media type: {}", other))),
        }
    }
}

/// Server-side ordering of the catalog list
///
/// Ordering depends on aggregates only the server has in full, so it is never
/// applied to a cached list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Server default order (newest first), no `sort` parameter sent
    ///
    /// The server has no separate recency ordering; `recent` parses to this.
    #[default]
    #[serde(alias = "", alias = "recent")]
    None,
    /// Highest average review rating first
    Rating,
    /// Most reviewed first
    Reviews,
    /// Highest IMDB rating first
    Imdb,
}

impl SortKey {
    /// Value for the `sort` query parameter, `None` when it must be omitted
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            SortKey::None => None,
            SortKey::Rating => Some("rating"),
            SortKey::Reviews => Some("reviews"),
            SortKey::Imdb => Some("imdb"),
        }
    }
}

impl Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_param().unwrap_or(""))
    }
}

impl FromStr for SortKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "recent" | "newest" => Ok(SortKey::None),
            "rating" => Ok(SortKey::Rating),
            "reviews" => Ok(SortKey::Reviews),
            "imdb" => Ok(SortKey::Imdb),
            other => Err(AppError::Validation(format!("Unknown sort key: {}", other))),
        }
    }
}

/// Parameters of a catalog list fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovieQuery {
    pub media_type: Option<MediaType>,
    pub sort: SortKey,
}

impl MovieQuery {
    pub fn new(media_type: Option<MediaType>, sort: SortKey) -> Self {
        Self { media_type, sort }
    }

    /// Query string pairs, omitting unset parameters
    pub fn to_pairs(&self) -> Vec<(&'static str, &'static str)> {
        let mut pairs = Vec::new();
        if let Some(media_type) = self.media_type {
            pairs.push(("type", media_type.as_param()));
        }
        if let Some(sort) = self.sort.as_param() {
            pairs.push(("sort", sort));
        }
        pairs
    }
}
