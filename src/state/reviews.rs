use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    context::{AppContext, Severity, Viewer},
    error::{AppError, AppResult},
    models::{MovieId, Rating, Review, ReviewId, ReviewRequest},
    services::RemoteApi,
};

/// The viewer's review of one movie
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ReviewState {
    #[default]
    NoReview,
    Saved(Review),
}

impl ReviewState {
    pub fn review(&self) -> Option<&Review> {
        match self {
            ReviewState::NoReview => None,
            ReviewState::Saved(review) => Some(review),
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, ReviewState::Saved(_))
    }
}

/// Keeps at most one review per (viewer, movie)
///
/// Every mutation first re-reads the movie's reviews so that create versus
/// update is decided against the server, not a possibly stale local copy.
/// Mutations through one reconciler run one at a time.
pub struct ReviewReconciler {
    remote: Arc<dyn RemoteApi>,
    context: AppContext,
    movie_id: MovieId,
    state: Mutex<ReviewState>,
    ops: tokio::sync::Mutex<()>,
}

impl ReviewReconciler {
    pub fn new(remote: Arc<dyn RemoteApi>, context: AppContext, movie_id: MovieId) -> Self {
        Self {
            remote,
            context,
            movie_id,
            state: Mutex::new(ReviewState::NoReview),
            ops: tokio::sync::Mutex::new(()),
        }
    }

    pub fn movie_id(&self) -> MovieId {
        self.movie_id
    }

    fn lock(&self) -> MutexGuard<'_, ReviewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ReviewState {
        self.lock().clone()
    }

    /// Derives the state from an already fetched review list
    pub fn sync_from(&self, reviews: &[Review]) -> ReviewState {
        let state = match self.context.viewer() {
            Some(viewer) => derive(viewer, self.movie_id, reviews),
            None => ReviewState::NoReview,
        };
        *self.lock() = state.clone();
        state
    }

    /// Fetches the movie's reviews and derives the state from them
    pub async fn refresh(&self) -> AppResult<Vec<Review>> {
        let reviews = self.remote.list_reviews(self.movie_id).await?;
        self.sync_from(&reviews);
        Ok(reviews)
    }

    /// Creates or updates the viewer's review
    ///
    /// `comment` of `None` keeps whatever comment the review already has;
    /// a blank string clears it.
    pub async fn submit(&self, rating: Rating, comment: Option<String>) -> AppResult<Review> {
        let viewer = self.context.require_viewer()?.clone();
        let _guard = self.ops.lock().await;

        let result = self.save(&viewer, rating, comment).await;
        if let Err(e) = &result {
            self.context.report(e, "Failed to submit review");
        }

        result
    }

    /// One-click rating; keeps any existing comment
    pub async fn quick_rate(&self, rating: Rating) -> AppResult<Review> {
        self.submit(rating, None).await
    }

    /// Deletes the viewer's review, returning its id if there was one
    pub async fn delete(&self) -> AppResult<Option<ReviewId>> {
        let viewer = self.context.require_viewer()?.clone();
        let _guard = self.ops.lock().await;

        let result = self.remove(&viewer).await;
        if let Err(e) = &result {
            self.context.report(e, "Failed to delete review");
        }

        result
    }

    async fn current(&self, viewer: &Viewer) -> AppResult<Option<Review>> {
        let reviews = self.remote.list_reviews(self.movie_id).await?;
        let state = derive(viewer, self.movie_id, &reviews);
        *self.lock() = state.clone();

        Ok(match state {
            ReviewState::Saved(review) => Some(review),
            ReviewState::NoReview => None,
        })
    }

    async fn save(
        &self,
        viewer: &Viewer,
        rating: Rating,
        comment: Option<String>,
    ) -> AppResult<Review> {
        let existing = self.current(viewer).await?;

        let comment = match comment {
            None => existing.as_ref().and_then(|review| review.comment.clone()),
            Some(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
        };
        let request = ReviewRequest::new(rating, comment);

        let saved = match &existing {
            Some(review) => {
                tracing::debug!(review_id = %review.id, movie_id = %self.movie_id, "Updating existing review");
                self.remote.update_review(review.id, &request).await?
            }
            None => {
                tracing::debug!(movie_id = %self.movie_id, "No review yet, creating one");
                self.remote.create_review(self.movie_id, &request).await?
            }
        };

        *self.lock() = ReviewState::Saved(saved.clone());

        let message = if existing.is_some() {
            "Review updated"
        } else {
            "Review submitted successfully!"
        };
        self.context.notify(message, Severity::Success);

        Ok(saved)
    }

    async fn remove(&self, viewer: &Viewer) -> AppResult<Option<ReviewId>> {
        let Some(review) = self.current(viewer).await? else {
            tracing::debug!(movie_id = %self.movie_id, "No review to delete");
            return Ok(None);
        };

        match self.remote.delete_review(review.id).await {
            Ok(()) => {}
            Err(AppError::NotFound(_)) => {
                tracing::debug!(review_id = %review.id, "Review already gone on the server");
            }
            Err(e) => return Err(e),
        }

        *self.lock() = ReviewState::NoReview;
        self.context.notify("Review deleted", Severity::Success);

        Ok(Some(review.id))
    }
}

fn derive(viewer: &Viewer, movie_id: MovieId, reviews: &[Review]) -> ReviewState {
    reviews
        .iter()
        .find(|review| review.movie_id == movie_id && viewer.authored(review))
        .cloned()
        .map_or(ReviewState::NoReview, ReviewState::Saved)
}
