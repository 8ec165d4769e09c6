use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{MovieId, ReviewId, UserId};
use crate::error::AppError;

/// Star rating on the 1-10 scale
///
/// The star widget offers five stars, each worth two points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(value: u8) -> Result<Self, AppError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(AppError::Validation(format!(
                "Rating must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )))
        }
    }

    /// Maps a click on star `stars` (1-5) to a rating
    pub fn from_stars(stars: u8) -> Result<Self, AppError> {
        if !(1..=5).contains(&stars) {
            return Err(AppError::Validation("Please select a rating".to_string()));
        }
        Self::new(stars * 2)
    }

    /// Number of filled stars shown for this rating
    pub fn stars(&self) -> u8 {
        self.0.div_ceil(2)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = AppError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// A review as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub username: String,
    pub movie_id: MovieId,
    #[serde(default)]
    pub movie_title: Option<String>,
    #[serde(default)]
    pub movie_image_url: Option<String>,
    pub rating: Rating,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

/// Body of a create or update review request
///
/// An absent comment is sent as `null`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReviewRequest {
    pub rating: Rating,
    pub comment: Option<String>,
}

impl ReviewRequest {
    pub fn new(rating: Rating, comment: Option<String>) -> Self {
        Self { rating, comment }
    }
}

/// Client-side mean of a set of reviews
///
/// Secondary display value only; the server aggregate is authoritative.
pub fn local_average<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> Option<f64> {
    let (sum, count) = reviews
        .into_iter()
        .fold((0u32, 0u32), |(sum, count), r| (sum + r.rating.value() as u32, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum as f64 / count as f64)
    }
}
