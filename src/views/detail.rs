use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    context::{AppContext, Severity},
    error::{AppError, AppResult},
    models::{review::local_average, MediaDraft, MediaItem, MovieId, Rating, Review},
    services::RemoteApi,
    state::{EntityCache, ReviewReconciler, ToggleOutcome, WatchlistSet},
};

#[derive(Default)]
struct DetailState {
    subject: Option<MovieId>,
    items: EntityCache<MediaItem>,
    reviews: EntityCache<Review>,
    reconciler: Option<Arc<ReviewReconciler>>,
}

/// The single item screen with its reviews
///
/// Results that arrive after the viewer navigated to another item are
/// dropped rather than written to the current screen.
pub struct DetailView {
    remote: Arc<dyn RemoteApi>,
    context: AppContext,
    watchlist: WatchlistSet,
    state: Mutex<DetailState>,
}

impl DetailView {
    pub fn new(remote: Arc<dyn RemoteApi>, context: AppContext) -> Self {
        Self {
            watchlist: WatchlistSet::new(remote.clone(), context.clone()),
            remote,
            context,
            state: Mutex::new(DetailState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DetailState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subject(&self) -> Option<MovieId> {
        self.lock().subject
    }

    fn is_current(&self, movie_id: MovieId) -> bool {
        self.subject() == Some(movie_id)
    }

    /// Makes `movie_id` the current subject and loads it
    pub async fn open(&self, movie_id: MovieId) -> AppResult<()> {
        let reconciler = Arc::new(ReviewReconciler::new(
            self.remote.clone(),
            self.context.clone(),
            movie_id,
        ));
        {
            let mut state = self.lock();
            state.subject = Some(movie_id);
            state.reviews.clear();
            state.reconciler = Some(reconciler.clone());
        }

        let load_watchlist = async {
            if self.context.is_authenticated() {
                self.watchlist.load().await.map(|_| ())
            } else {
                Ok(())
            }
        };
        let (item, reviews, watchlist) = tokio::join!(
            self.remote.get_movie(movie_id),
            self.remote.list_reviews(movie_id),
            load_watchlist
        );

        if !self.is_current(movie_id) {
            tracing::debug!(movie_id = %movie_id, "Discarding results for movie no longer shown");
            return Ok(());
        }

        let item = match item {
            Ok(item) => item,
            Err(e) => {
                self.context.report(&e, "Failed to load movie");
                return Err(e);
            }
        };
        if let Err(e) = &watchlist {
            self.context.report(e, "Failed to load watchlist");
        }

        let reviews = reviews.inspect_err(|e| self.context.report(e, "Failed to load reviews"));
        if let Ok(reviews) = &reviews {
            reconciler.sync_from(reviews);
        }

        let mut state = self.lock();
        if state.subject != Some(movie_id) {
            return Ok(());
        }
        state.items.put(item);
        if let Ok(reviews) = reviews {
            state.reviews.put_all(reviews);
        }

        tracing::info!(movie_id = %movie_id, reviews = state.reviews.len(), "Movie detail loaded");

        Ok(())
    }

    pub fn item(&self) -> Option<MediaItem> {
        let state = self.lock();
        state.subject.and_then(|id| state.items.get(&id).cloned())
    }

    pub fn reviews(&self) -> Vec<Review> {
        self.lock().reviews.values().cloned().collect()
    }

    pub fn own_review(&self) -> Option<Review> {
        let reconciler = self.lock().reconciler.clone()?;
        reconciler.state().review().cloned()
    }

    /// Mean of the fetched reviews; the item's server aggregate takes precedence
    pub fn local_average(&self) -> Option<f64> {
        local_average(self.lock().reviews.values())
    }

    /// Whether the viewer owns the current item and may edit or delete it
    pub fn can_edit(&self) -> bool {
        match (self.context.viewer(), self.item()) {
            (Some(viewer), Some(item)) => item.is_owned_by(&viewer.username),
            _ => false,
        }
    }

    pub fn is_on_watchlist(&self) -> bool {
        self.subject()
            .is_some_and(|movie_id| self.watchlist.is_member(movie_id))
    }

    pub async fn toggle_watchlist(&self) -> AppResult<ToggleOutcome> {
        let movie_id = self.current_subject()?;
        self.watchlist.toggle(movie_id).await
    }

    pub async fn submit_review(&self, rating: Rating, comment: Option<String>) -> AppResult<Review> {
        let reconciler = self.reconciler()?;
        let saved = reconciler.submit(rating, comment).await?;
        self.store_review(&saved);
        Ok(saved)
    }

    pub async fn quick_rate(&self, rating: Rating) -> AppResult<Review> {
        let reconciler = self.reconciler()?;
        let saved = reconciler.quick_rate(rating).await?;
        self.store_review(&saved);
        Ok(saved)
    }

    pub async fn delete_review(&self) -> AppResult<()> {
        let reconciler = self.reconciler()?;
        if let Some(review_id) = reconciler.delete().await? {
            let mut state = self.lock();
            if state.subject == Some(reconciler.movie_id()) {
                state.reviews.remove(&review_id);
            }
        }
        Ok(())
    }

    /// Saves edits to the current item; the server rejects non-owners
    pub async fn save_movie(&self, draft: &MediaDraft) -> AppResult<MediaItem> {
        let movie_id = self.current_subject()?;
        draft.validate()?;
        self.context.require_viewer()?;

        let updated = match self.remote.update_movie(movie_id, draft).await {
            Ok(updated) => updated,
            Err(e) => {
                self.context.report(&e, "Failed to update movie");
                return Err(e);
            }
        };

        {
            let mut state = self.lock();
            if state.subject == Some(movie_id) {
                state.items.put(updated.clone());
            }
        }
        self.context
            .notify("Movie updated successfully!", Severity::Success);

        Ok(updated)
    }

    /// Deletes the current item and closes the screen
    pub async fn delete_movie(&self) -> AppResult<()> {
        let movie_id = self.current_subject()?;
        self.context.require_viewer()?;

        if let Err(e) = self.remote.delete_movie(movie_id).await {
            self.context.report(&e, "Failed to delete movie");
            return Err(e);
        }

        {
            let mut state = self.lock();
            state.items.remove(&movie_id);
            if state.subject == Some(movie_id) {
                state.subject = None;
                state.reviews.clear();
                state.reconciler = None;
            }
        }
        self.context
            .notify("Movie deleted successfully", Severity::Success);

        Ok(())
    }

    fn current_subject(&self) -> AppResult<MovieId> {
        self.subject()
            .ok_or_else(|| AppError::Validation("No movie is open".to_string()))
    }

    fn reconciler(&self) -> AppResult<Arc<ReviewReconciler>> {
        self.lock()
            .reconciler
            .clone()
            .ok_or_else(|| AppError::Validation("No movie is open".to_string()))
    }

    fn store_review(&self, review: &Review) {
        let mut state = self.lock();
        if state.subject == Some(review.movie_id) {
            state.reviews.put(review.clone());
        }
    }
}
