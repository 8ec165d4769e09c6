use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    context::AppContext,
    error::{AppError, AppResult},
    models::{MovieId, Rating, Review, ReviewId, WatchlistEntry},
    services::RemoteApi,
    state::{EntityCache, ReviewReconciler, ToggleOutcome, WatchlistSet},
};

#[derive(Default)]
struct DashboardState {
    entries: Vec<WatchlistEntry>,
    reviews: EntityCache<Review>,
    /// One per movie so edits of the same movie run one at a time
    reconcilers: HashMap<MovieId, Arc<ReviewReconciler>>,
}

/// The viewer's own watchlist and reviews
pub struct DashboardView {
    remote: Arc<dyn RemoteApi>,
    context: AppContext,
    watchlist: WatchlistSet,
    state: Mutex<DashboardState>,
}

impl DashboardView {
    pub fn new(remote: Arc<dyn RemoteApi>, context: AppContext) -> Self {
        Self {
            watchlist: WatchlistSet::new(remote.clone(), context.clone()),
            remote,
            context,
            state: Mutex::new(DashboardState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DashboardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetches the watchlist and the viewer's reviews concurrently
    pub async fn load(&self) -> AppResult<()> {
        self.context.require_viewer()?;

        let (entries, reviews) = tokio::join!(self.watchlist.load(), self.remote.my_reviews());

        let mut first_error = None;
        let mut state = self.lock();

        match entries {
            Ok(entries) => state.entries = entries,
            Err(e) => {
                self.context.report(&e, "Failed to load watchlist");
                first_error = Some(e);
            }
        }
        match reviews {
            Ok(reviews) => state.reviews.put_all(reviews),
            Err(e) => {
                self.context.report(&e, "Failed to load your reviews");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        tracing::info!(
            watchlist = state.entries.len(),
            reviews = state.reviews.len(),
            "Dashboard loaded"
        );

        first_error.map_or(Ok(()), Err)
    }

    /// Watchlist entries still on the list, including optimistic removals
    pub fn watchlist_entries(&self) -> Vec<WatchlistEntry> {
        let members = self.watchlist.members();
        self.lock()
            .entries
            .iter()
            .filter(|entry| members.contains(&entry.movie_id()))
            .cloned()
            .collect()
    }

    pub fn my_reviews(&self) -> Vec<Review> {
        self.lock().reviews.values().cloned().collect()
    }

    pub async fn remove_from_watchlist(&self, movie_id: MovieId) -> AppResult<ToggleOutcome> {
        let outcome = self.watchlist.remove(movie_id).await?;
        if !self.watchlist.is_member(movie_id) {
            self.lock()
                .entries
                .retain(|entry| entry.movie_id() != movie_id);
        }
        Ok(outcome)
    }

    /// Re-rates or re-words one of the viewer's reviews
    pub async fn edit_review(
        &self,
        review_id: ReviewId,
        rating: Rating,
        comment: Option<String>,
    ) -> AppResult<Review> {
        let reconciler = self.reconciler_for(review_id)?;
        let saved = reconciler.submit(rating, comment).await?;

        let mut state = self.lock();
        if saved.id != review_id {
            state.reviews.remove(&review_id);
        }
        state.reviews.put(saved.clone());

        Ok(saved)
    }

    pub async fn delete_review(&self, review_id: ReviewId) -> AppResult<()> {
        let reconciler = self.reconciler_for(review_id)?;
        let deleted = reconciler.delete().await?;

        let mut state = self.lock();
        state.reviews.remove(&review_id);
        if let Some(deleted) = deleted {
            state.reviews.remove(&deleted);
        }

        Ok(())
    }

    fn reconciler_for(&self, review_id: ReviewId) -> AppResult<Arc<ReviewReconciler>> {
        let mut state = self.lock();
        let movie_id = state
            .reviews
            .get(&review_id)
            .map(|review| review.movie_id)
            .ok_or_else(|| AppError::NotFound(Some("Review not found".to_string())))?;

        let reconciler = state.reconcilers.entry(movie_id).or_insert_with(|| {
            Arc::new(ReviewReconciler::new(
                self.remote.clone(),
                self.context.clone(),
                movie_id,
            ))
        });

        Ok(reconciler.clone())
    }
}
