//! Remote catalog API abstraction
//!
//! Every component above this layer talks to the MediaHub REST API through
//! `RemoteApi`, one method per resource/verb pair. Implementations never retry
//! and never touch local caches; retry and rollback decisions belong to the
//! caller.

use crate::{
    error::AppResult,
    models::{
        MediaDraft, MediaItem, MovieId, MovieQuery, Review, ReviewId, ReviewRequest,
        WatchlistEntry,
    },
};

pub mod http;
pub mod request_id;

pub use http::HttpRemoteClient;
pub use request_id::RequestId;

/// Typed access to the movies, reviews and watchlist resources
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RemoteApi: Send + Sync {
    /// `GET /movies?type=&sort=`
    async fn list_movies(&self, query: MovieQuery) -> AppResult<Vec<MediaItem>>;

    /// `GET /movies/search?keyword=`
    ///
    /// Matches title, description, director or genre on the server.
    async fn search_movies(&self, keyword: &str) -> AppResult<Vec<MediaItem>>;

    /// `GET /movies/{id}`
    async fn get_movie(&self, id: MovieId) -> AppResult<MediaItem>;

    /// `POST /movies`
    async fn create_movie(&self, draft: &MediaDraft) -> AppResult<MediaItem>;

    /// `PUT /movies/{id}`, owner only
    async fn update_movie(&self, id: MovieId, draft: &MediaDraft) -> AppResult<MediaItem>;

    /// `DELETE /movies/{id}`, owner only
    async fn delete_movie(&self, id: MovieId) -> AppResult<()>;

    /// `GET /movies/{id}/reviews`
    async fn list_reviews(&self, movie_id: MovieId) -> AppResult<Vec<Review>>;

    /// `POST /movies/{id}/reviews`
    async fn create_review(&self, movie_id: MovieId, request: &ReviewRequest)
        -> AppResult<Review>;

    /// `PUT /reviews/{id}`, author only
    async fn update_review(&self, review_id: ReviewId, request: &ReviewRequest)
        -> AppResult<Review>;

    /// `DELETE /reviews/{id}`, author only
    async fn delete_review(&self, review_id: ReviewId) -> AppResult<()>;

    /// `GET /users/me/reviews`
    async fn my_reviews(&self) -> AppResult<Vec<Review>>;

    /// `GET /watchlist`
    async fn watchlist(&self) -> AppResult<Vec<WatchlistEntry>>;

    /// `POST /watchlist/movies/{id}`
    async fn add_to_watchlist(&self, movie_id: MovieId) -> AppResult<WatchlistEntry>;

    /// `DELETE /watchlist/movies/{id}`
    async fn remove_from_watchlist(&self, movie_id: MovieId) -> AppResult<()>;
}
