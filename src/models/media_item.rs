use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

use super::{MediaType, MovieId};
use crate::error::{AppError, AppResult};

/// A movie or TV series as returned by the catalog API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Comma separated cast list
    #[serde(default)]
    pub actors: Option<String>,
    #[serde(rename = "type", default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub seasons: Option<u32>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub imdb_rating: Option<f64>,
    /// Username of the owner
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
    /// Server-computed mean of all review ratings
    #[serde(default)]
    pub average_rating: Option<f64>,
    /// Sent as `null` by endpoints that embed the item without aggregates
    #[serde(default, deserialize_with = "null_as_zero")]
    pub review_count: u64,
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or_default())
}

/// Server-computed aggregate rating of an item
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingSummary {
    pub average_rating: Option<f64>,
    pub review_count: u64,
}

impl MediaItem {
    pub fn summary(&self) -> RatingSummary {
        RatingSummary {
            average_rating: self.average_rating,
            review_count: self.review_count,
        }
    }

    pub fn is_series(&self) -> bool {
        self.media_type == MediaType::TvSeries
    }

    /// Seasons and episodes, only ever reported for TV series
    pub fn series_info(&self) -> Option<(Option<u32>, Option<u32>)> {
        if self.is_series() {
            Some((self.seasons, self.episodes))
        } else {
            None
        }
    }

    pub fn actor_list(&self) -> Vec<String> {
        self.actors
            .as_deref()
            .map(|actors| {
                actors
                    .split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_owned_by(&self, username: &str) -> bool {
        self.created_by.as_deref() == Some(username)
    }
}

/// Create/update payload for a catalog item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MediaDraft {
    pub title: String,
    pub description: Option<String>,
    pub release_year: Option<i32>,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub image_url: Option<String>,
    pub actors: Option<String>,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub seasons: Option<u32>,
    pub episodes: Option<u32>,
    pub imdb_id: Option<String>,
    pub imdb_rating: Option<f64>,
}

impl MediaDraft {
    pub fn movie(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            media_type: MediaType::Movie,
            ..Default::default()
        }
    }

    pub fn series(title: impl Into<String>, seasons: Option<u32>, episodes: Option<u32>) -> Self {
        Self {
            title: title.into(),
            media_type: MediaType::TvSeries,
            seasons,
            episodes,
            ..Default::default()
        }
    }

    /// Checks the draft before it is sent
    ///
    /// Seasons and episodes are only accepted on TV series and must be
    /// positive; the IMDB rating lives on a 0-10 scale.
    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }

        match self.media_type {
            MediaType::Movie => {
                if self.seasons.is_some() || self.episodes.is_some() {
                    return Err(AppError::Validation(
                        "Seasons and episodes are only allowed for TV series".to_string(),
                    ));
                }
            }
            MediaType::TvSeries => {
                if self.seasons == Some(0) || self.episodes == Some(0) {
                    return Err(AppError::Validation(
                        "Seasons and episodes must be positive".to_string(),
                    ));
                }
            }
        }

        if let Some(rating) = self.imdb_rating {
            if !(0.0..=10.0).contains(&rating) {
                return Err(AppError::Validation(format!(
                    "IMDB rating must be between 0 and 10, got {}",
                    rating
                )));
            }
        }

        Ok(())
    }
}

impl From<&MediaItem> for MediaDraft {
    fn from(item: &MediaItem) -> Self {
        Self {
            title: item.title.clone(),
            description: item.description.clone(),
            release_year: item.release_year,
            genre: item.genre.clone(),
            director: item.director.clone(),
            image_url: item.image_url.clone(),
            actors: item.actors.clone(),
            media_type: item.media_type,
            seasons: item.seasons,
            episodes: item.episodes,
            imdb_id: item.imdb_id.clone(),
            imdb_rating: item.imdb_rating,
        }
    }
}
