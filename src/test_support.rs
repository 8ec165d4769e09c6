//! Shared fixtures for unit tests
//!
//! `FakeRemote` is an in-memory catalog server. Individual calls can be held
//! at a gate so tests can poll a future while its remote call is in flight,
//! and can be made to fail with a chosen error.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use crate::{
    context::{AppContext, Notifier, Severity, Viewer},
    error::{AppError, AppResult},
    models::{
        MediaDraft, MediaItem, MediaType, MovieId, MovieQuery, Rating, Review, ReviewId,
        ReviewRequest, SortKey, UserId, WatchlistEntry,
    },
    services::RemoteApi,
};

pub(crate) const VIEWER_NAME: &str = "neo";

pub(crate) fn viewer() -> Viewer {
    Viewer::new(VIEWER_NAME).with_id(UserId(1))
}

pub(crate) fn signed_in(notifier: Arc<RecordingNotifier>) -> AppContext {
    AppContext::new(Some(viewer()), notifier)
}

pub(crate) fn movie(id: i64, title: &str) -> MediaItem {
    MediaItem {
        id: MovieId(id),
        title: title.to_string(),
        description: None,
        release_year: None,
        genre: None,
        director: None,
        image_url: None,
        actors: None,
        media_type: MediaType::Movie,
        seasons: None,
        episodes: None,
        imdb_id: None,
        imdb_rating: None,
        created_by: None,
        created_at: None,
        updated_at: None,
        average_rating: None,
        review_count: 0,
    }
}

pub(crate) fn review(
    id: i64,
    movie_id: i64,
    username: &str,
    rating: u8,
    comment: Option<&str>,
) -> Review {
    Review {
        id: ReviewId(id),
        user_id: None,
        username: username.to_string(),
        movie_id: MovieId(movie_id),
        movie_title: None,
        movie_image_url: None,
        rating: Rating::new(rating).unwrap(),
        comment: comment.map(str::to_string),
        created_at: None,
        updated_at: None,
    }
}

/// Notifier that remembers everything it was told
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    messages: Mutex<Vec<(String, Severity)>>,
    redirects: AtomicUsize,
}

impl RecordingNotifier {
    pub(crate) fn messages(&self) -> Vec<(String, Severity)> {
        self.messages.lock().unwrap().clone()
    }

    fn with_severity(&self, severity: Severity) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(_, s)| *s == severity)
            .map(|(message, _)| message)
            .collect()
    }

    pub(crate) fn errors(&self) -> Vec<String> {
        self.with_severity(Severity::Error)
    }

    pub(crate) fn successes(&self) -> Vec<String> {
        self.with_severity(Severity::Success)
    }

    pub(crate) fn login_redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        self.messages
            .lock()
            .unwrap()
            .push((message.to_string(), severity));
    }

    fn login_required(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Catalog {
    movies: Vec<MediaItem>,
    reviews: Vec<Review>,
    watchlist: Vec<MovieId>,
    next_id: i64,
    calls: Vec<String>,
}

/// In-memory remote with per-call gates and failure injection
///
/// Gate and failure keys are either an operation name (`"list_reviews"`) or
/// a recorded call (`"add_to_watchlist:1"`).
pub(crate) struct FakeRemote {
    catalog: Mutex<Catalog>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    failures: Mutex<HashMap<String, AppError>>,
}

impl FakeRemote {
    pub(crate) fn with_movies(movies: Vec<MediaItem>) -> Self {
        Self {
            catalog: Mutex::new(Catalog {
                movies,
                next_id: 100,
                ..Catalog::default()
            }),
            gates: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Blocks matching calls until permits are added to the returned gate
    pub(crate) fn hold(&self, key: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates
            .lock()
            .unwrap()
            .insert(key.to_string(), gate.clone());
        gate
    }

    pub(crate) fn fail(&self, key: &str, error: AppError) {
        self.failures
            .lock()
            .unwrap()
            .insert(key.to_string(), error);
    }

    pub(crate) fn recover(&self, key: &str) {
        self.failures.lock().unwrap().remove(key);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.catalog.lock().unwrap().calls.clone()
    }

    /// Number of calls made to operation `op`
    pub(crate) fn count(&self, op: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.split(':').next() == Some(op))
            .count()
    }

    pub(crate) fn movie(&self, id: MovieId) -> Option<MediaItem> {
        let catalog = self.catalog.lock().unwrap();
        catalog.movies.iter().find(|m| m.id == id).cloned()
    }

    pub(crate) fn put_review(&self, review: Review) {
        self.catalog.lock().unwrap().reviews.push(review);
    }

    pub(crate) fn reviews_for(&self, movie_id: MovieId) -> Vec<Review> {
        let catalog = self.catalog.lock().unwrap();
        catalog
            .reviews
            .iter()
            .filter(|r| r.movie_id == movie_id)
            .cloned()
            .collect()
    }

    pub(crate) fn put_on_watchlist(&self, movie_id: MovieId) {
        self.catalog.lock().unwrap().watchlist.push(movie_id);
    }

    pub(crate) fn on_watchlist(&self, movie_id: MovieId) -> bool {
        self.catalog.lock().unwrap().watchlist.contains(&movie_id)
    }

    /// Records the call, waits at its gate, then applies any injected failure
    async fn enter(&self, call: String) -> AppResult<()> {
        let op = call.split(':').next().unwrap_or_default().to_string();
        self.catalog.lock().unwrap().calls.push(call.clone());

        let gate = {
            let gates = self.gates.lock().unwrap();
            gates.get(&call).or_else(|| gates.get(&op)).cloned()
        };
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        let failures = self.failures.lock().unwrap();
        match failures.get(&call).or_else(|| failures.get(&op)) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn find_movie(catalog: &Catalog, id: MovieId) -> AppResult<MediaItem> {
        catalog
            .movies
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(Some(format!("Movie not found with id: {}", id))))
    }

    fn next_id(catalog: &mut Catalog) -> i64 {
        catalog.next_id += 1;
        catalog.next_id
    }

    fn owned_movie(catalog: &Catalog, id: MovieId) -> AppResult<usize> {
        let index = catalog
            .movies
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| AppError::NotFound(Some(format!("Movie not found with id: {}", id))))?;
        if !catalog.movies[index].is_owned_by(VIEWER_NAME) {
            return Err(AppError::RequestFailed {
                status: Some(403),
                message: Some("You can only modify your own movies".to_string()),
            });
        }
        Ok(index)
    }
}

fn apply_draft(item: &mut MediaItem, draft: &MediaDraft) {
    item.title = draft.title.clone();
    item.description = draft.description.clone();
    item.release_year = draft.release_year;
    item.genre = draft.genre.clone();
    item.director = draft.director.clone();
    item.image_url = draft.image_url.clone();
    item.actors = draft.actors.clone();
    item.media_type = draft.media_type;
    item.seasons = draft.seasons;
    item.episodes = draft.episodes;
    item.imdb_id = draft.imdb_id.clone();
    item.imdb_rating = draft.imdb_rating;
}

#[async_trait::async_trait]
impl RemoteApi for FakeRemote {
    async fn list_movies(&self, query: MovieQuery) -> AppResult<Vec<MediaItem>> {
        let params: Vec<String> = query
            .to_pairs()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        self.enter(format!("list_movies:{}", params.join("&")))
            .await?;

        let catalog = self.catalog.lock().unwrap();
        let mut movies: Vec<MediaItem> = catalog
            .movies
            .iter()
            .filter(|m| query.media_type.map_or(true, |t| m.media_type == t))
            .cloned()
            .collect();

        match query.sort {
            SortKey::None => {}
            SortKey::Rating => movies.sort_by(|a, b| {
                b.average_rating
                    .unwrap_or(-1.0)
                    .total_cmp(&a.average_rating.unwrap_or(-1.0))
            }),
            SortKey::Reviews => movies.sort_by(|a, b| b.review_count.cmp(&a.review_count)),
            SortKey::Imdb => movies.sort_by(|a, b| {
                b.imdb_rating
                    .unwrap_or(-1.0)
                    .total_cmp(&a.imdb_rating.unwrap_or(-1.0))
            }),
        }

        Ok(movies)
    }

    async fn search_movies(&self, keyword: &str) -> AppResult<Vec<MediaItem>> {
        self.enter(format!("search_movies:{}", keyword)).await?;

        let keyword = keyword.to_lowercase();
        let catalog = self.catalog.lock().unwrap();
        Ok(catalog
            .movies
            .iter()
            .filter(|m| m.title.to_lowercase().contains(&keyword))
            .cloned()
            .collect())
    }

    async fn get_movie(&self, id: MovieId) -> AppResult<MediaItem> {
        self.enter(format!("get_movie:{}", id)).await?;
        Self::find_movie(&self.catalog.lock().unwrap(), id)
    }

    async fn create_movie(&self, draft: &MediaDraft) -> AppResult<MediaItem> {
        self.enter("create_movie".to_string()).await?;
        draft.validate()?;

        let mut catalog = self.catalog.lock().unwrap();
        let id = Self::next_id(&mut catalog);
        let mut item = movie(id, &draft.title);
        apply_draft(&mut item, draft);
        item.created_by = Some(VIEWER_NAME.to_string());
        catalog.movies.push(item.clone());
        Ok(item)
    }

    async fn update_movie(&self, id: MovieId, draft: &MediaDraft) -> AppResult<MediaItem> {
        self.enter(format!("update_movie:{}", id)).await?;
        draft.validate()?;

        let mut catalog = self.catalog.lock().unwrap();
        let index = Self::owned_movie(&catalog, id)?;
        apply_draft(&mut catalog.movies[index], draft);
        Ok(catalog.movies[index].clone())
    }

    async fn delete_movie(&self, id: MovieId) -> AppResult<()> {
        self.enter(format!("delete_movie:{}", id)).await?;

        let mut catalog = self.catalog.lock().unwrap();
        let index = Self::owned_movie(&catalog, id)?;
        catalog.movies.remove(index);
        catalog.reviews.retain(|r| r.movie_id != id);
        catalog.watchlist.retain(|m| *m != id);
        Ok(())
    }

    async fn list_reviews(&self, movie_id: MovieId) -> AppResult<Vec<Review>> {
        self.enter(format!("list_reviews:{}", movie_id)).await?;
        Ok(self.reviews_for(movie_id))
    }

    async fn create_review(&self, movie_id: MovieId, request: &ReviewRequest) -> AppResult<Review> {
        self.enter(format!("create_review:{}", movie_id)).await?;

        let mut catalog = self.catalog.lock().unwrap();
        let item = Self::find_movie(&catalog, movie_id)?;
        if catalog
            .reviews
            .iter()
            .any(|r| r.movie_id == movie_id && r.username == VIEWER_NAME)
        {
            return Err(AppError::RequestFailed {
                status: Some(400),
                message: Some("You have already reviewed this movie".to_string()),
            });
        }

        let id = Self::next_id(&mut catalog);
        let mut created = review(id, movie_id.0, VIEWER_NAME, request.rating.value(), None);
        created.user_id = Some(UserId(1));
        created.comment = request.comment.clone();
        created.movie_title = Some(item.title);
        catalog.reviews.push(created.clone());
        Ok(created)
    }

    async fn update_review(&self, review_id: ReviewId, request: &ReviewRequest) -> AppResult<Review> {
        self.enter(format!("update_review:{}", review_id)).await?;

        let mut catalog = self.catalog.lock().unwrap();
        let existing = catalog
            .reviews
            .iter_mut()
            .find(|r| r.id == review_id)
            .ok_or_else(|| AppError::NotFound(Some("Review not found".to_string())))?;
        existing.rating = request.rating;
        existing.comment = request.comment.clone();
        Ok(existing.clone())
    }

    async fn delete_review(&self, review_id: ReviewId) -> AppResult<()> {
        self.enter(format!("delete_review:{}", review_id)).await?;

        let mut catalog = self.catalog.lock().unwrap();
        let before = catalog.reviews.len();
        catalog.reviews.retain(|r| r.id != review_id);
        if catalog.reviews.len() == before {
            return Err(AppError::NotFound(Some("Review not found".to_string())));
        }
        Ok(())
    }

    async fn my_reviews(&self) -> AppResult<Vec<Review>> {
        self.enter("my_reviews".to_string()).await?;

        let catalog = self.catalog.lock().unwrap();
        Ok(catalog
            .reviews
            .iter()
            .filter(|r| r.username == VIEWER_NAME)
            .cloned()
            .collect())
    }

    async fn watchlist(&self) -> AppResult<Vec<WatchlistEntry>> {
        self.enter("watchlist".to_string()).await?;

        let catalog = self.catalog.lock().unwrap();
        catalog
            .watchlist
            .iter()
            .map(|id| {
                Ok(WatchlistEntry {
                    id: Some(id.0),
                    movie: Self::find_movie(&catalog, *id)?,
                    added_at: None,
                })
            })
            .collect()
    }

    async fn add_to_watchlist(&self, movie_id: MovieId) -> AppResult<WatchlistEntry> {
        self.enter(format!("add_to_watchlist:{}", movie_id)).await?;

        let mut catalog = self.catalog.lock().unwrap();
        let item = Self::find_movie(&catalog, movie_id)?;
        if catalog.watchlist.contains(&movie_id) {
            return Err(AppError::RequestFailed {
                status: Some(400),
                message: Some("Movie already in your watchlist".to_string()),
            });
        }
        catalog.watchlist.push(movie_id);
        Ok(WatchlistEntry {
            id: Some(movie_id.0),
            movie: item,
            added_at: None,
        })
    }

    async fn remove_from_watchlist(&self, movie_id: MovieId) -> AppResult<()> {
        self.enter(format!("remove_from_watchlist:{}", movie_id))
            .await?;

        let mut catalog = self.catalog.lock().unwrap();
        if !catalog.watchlist.contains(&movie_id) {
            return Err(AppError::NotFound(Some(
                "Movie not found in your watchlist".to_string(),
            )));
        }
        catalog.watchlist.retain(|m| *m != movie_id);
        Ok(())
    }
}
