use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{MediaItem, MovieId};

/// One bookmarked item on the viewer's watchlist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    #[serde(default)]
    pub id: Option<i64>,
    pub movie: MediaItem,
    #[serde(default)]
    pub added_at: Option<NaiveDateTime>,
}

impl WatchlistEntry {
    pub fn movie_id(&self) -> MovieId {
        self.movie.id
    }
}
