use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    context::{AppContext, Severity},
    error::AppResult,
    models::{MediaDraft, MediaItem, MediaType, MovieId, MovieQuery, RatingSummary, SortKey},
    services::RemoteApi,
    state::{EntityCache, ToggleOutcome, WatchlistSet},
    views::filter::{self, CatalogFilter},
};

#[derive(Debug, Default)]
struct ListingState {
    query: MovieQuery,
    items: EntityCache<MediaItem>,
    /// Bumped on every fetch; only the latest fetch may write `items`
    generation: u64,
    loading: bool,
}

/// The catalog list screen
pub struct ListingView {
    remote: Arc<dyn RemoteApi>,
    context: AppContext,
    watchlist: WatchlistSet,
    state: Mutex<ListingState>,
}

impl ListingView {
    pub fn new(remote: Arc<dyn RemoteApi>, context: AppContext, query: MovieQuery) -> Self {
        Self {
            watchlist: WatchlistSet::new(remote.clone(), context.clone()),
            remote,
            context,
            state: Mutex::new(ListingState {
                query,
                ..ListingState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ListingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn query(&self) -> MovieQuery {
        self.lock().query
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn watchlist(&self) -> &WatchlistSet {
        &self.watchlist
    }

    /// Loads the list and, for a signed-in viewer, the watchlist
    ///
    /// A watchlist failure is reported but does not fail the mount.
    pub async fn mount(&self) -> AppResult<()> {
        if self.context.is_authenticated() {
            let (listed, watchlist) = tokio::join!(self.refresh(), self.watchlist.load());
            if let Err(e) = watchlist {
                self.context.report(&e, "Failed to load watchlist");
            }
            listed
        } else {
            self.refresh().await
        }
    }

    /// Switches the server-side ordering, re-fetching once if it changed
    pub async fn set_sort(&self, sort: SortKey) -> AppResult<bool> {
        {
            let mut state = self.lock();
            if state.query.sort == sort {
                return Ok(false);
            }
            state.query.sort = sort;
        }

        tracing::debug!(sort = %sort, "Sort changed");
        self.refresh().await?;
        Ok(true)
    }

    /// Switches between movies and series, re-fetching once if it changed
    pub async fn set_media_type(&self, media_type: Option<MediaType>) -> AppResult<bool> {
        {
            let mut state = self.lock();
            if state.query.media_type == media_type {
                return Ok(false);
            }
            state.query.media_type = media_type;
        }

        tracing::debug!(media_type = ?media_type, "Media type changed");
        self.refresh().await?;
        Ok(true)
    }

    /// Fetches the list for the current query and replaces the cache
    ///
    /// If another fetch started meanwhile, this result is discarded.
    pub async fn refresh(&self) -> AppResult<()> {
        let (generation, query) = {
            let mut state = self.lock();
            state.generation += 1;
            state.loading = true;
            (state.generation, state.query)
        };

        let result = self.remote.list_movies(query).await;

        let mut state = self.lock();
        if state.generation != generation {
            tracing::debug!(
                generation,
                current = state.generation,
                "Discarding stale movie list"
            );
            return Ok(());
        }
        state.loading = false;

        match result {
            Ok(items) => {
                tracing::debug!(results = items.len(), sort = %query.sort, "Movie list cached");
                state.items.put_all(items);
                Ok(())
            }
            Err(e) => {
                drop(state);
                self.context.report(&e, "Failed to load movies");
                Err(e)
            }
        }
    }

    /// Cached items in fetch order
    pub fn items(&self) -> Vec<MediaItem> {
        self.lock().items.values().cloned().collect()
    }

    pub fn filtered(&self, filter: &CatalogFilter) -> Vec<MediaItem> {
        let state = self.lock();
        filter
            .apply(state.items.values())
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn genres(&self) -> Vec<String> {
        filter::genres(self.lock().items.values())
    }

    /// Server aggregate as of the last list fetch
    pub fn summary(&self, movie_id: MovieId) -> Option<RatingSummary> {
        self.lock().items.get(&movie_id).map(MediaItem::summary)
    }

    pub fn is_on_watchlist(&self, movie_id: MovieId) -> bool {
        self.watchlist.is_member(movie_id)
    }

    pub async fn toggle_watchlist(&self, movie_id: MovieId) -> AppResult<ToggleOutcome> {
        self.watchlist.toggle(movie_id).await
    }

    /// Adds a new item from the add-movie form
    pub async fn create_movie(&self, draft: &MediaDraft) -> AppResult<MediaItem> {
        draft.validate()?;
        self.context.require_viewer()?;

        let created = match self.remote.create_movie(draft).await {
            Ok(created) => created,
            Err(e) => {
                self.context.report(&e, "Failed to add movie");
                return Err(e);
            }
        };

        self.lock().items.put(created.clone());
        self.context
            .notify("Movie added successfully!", Severity::Success);

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, ErrorCategory};
    use crate::services::remote::MockRemoteApi;
    use crate::test_support::{movie, signed_in, FakeRemote, RecordingNotifier};
    use tokio_test::{assert_pending, assert_ready, task};

    fn rated(id: i64, title: &str, average: f64, count: u64) -> MediaItem {
        let mut item = movie(id, title);
        item.average_rating = Some(average);
        item.review_count = count;
        item
    }

    fn anonymous() -> AppContext {
        AppContext::anonymous(Arc::new(RecordingNotifier::default()))
    }

    #[tokio::test]
    async fn test_filtering_makes_no_network_calls() {
        let mut mock = MockRemoteApi::new();
        mock.expect_list_movies().times(1).returning(|_| {
            Ok(vec![
                movie(1, "The Matrix"),
                movie(2, "Inception"),
                movie(3, "Matrix Reloaded"),
            ])
        });

        let view = ListingView::new(Arc::new(mock), anonymous(), MovieQuery::default());
        view.mount().await.unwrap();

        let titles: Vec<String> = view
            .filtered(&CatalogFilter::query("matrix"))
            .into_iter()
            .map(|m| m.title)
            .collect();

        assert_eq!(titles, vec!["The Matrix", "Matrix Reloaded"]);
    }

    #[tokio::test]
    async fn test_sort_change_refetches_once_and_replaces_list() {
        let mut mock = MockRemoteApi::new();
        mock.expect_list_movies()
            .withf(|query| query.sort == SortKey::None)
            .times(1)
            .returning(|_| Ok(vec![movie(1, "The Matrix"), movie(2, "Inception")]));
        mock.expect_list_movies()
            .withf(|query| query.sort == SortKey::Rating)
            .times(1)
            .returning(|_| Ok(vec![rated(2, "Inception", 9.0, 4)]));

        let view = ListingView::new(Arc::new(mock), anonymous(), MovieQuery::default());
        view.mount().await.unwrap();

        assert_eq!(view.set_sort(SortKey::Rating).await, Ok(true));
        assert_eq!(view.set_sort(SortKey::Rating).await, Ok(false));

        let ids: Vec<MovieId> = view.items().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![MovieId(2)]);
        assert_eq!(
            view.summary(MovieId(2)),
            Some(RatingSummary {
                average_rating: Some(9.0),
                review_count: 4
            })
        );
        assert_eq!(view.summary(MovieId(1)), None);
    }

    #[tokio::test]
    async fn test_stale_fetch_is_discarded() {
        let fake = Arc::new(FakeRemote::with_movies(vec![
            rated(1, "The Matrix", 7.0, 2),
            rated(2, "Inception", 9.0, 5),
        ]));
        let gate = fake.hold("list_movies:type=MOVIE");
        let view = ListingView::new(
            fake.clone(),
            anonymous(),
            MovieQuery::new(Some(MediaType::Movie), SortKey::None),
        );

        let mut first = task::spawn(view.mount());
        assert_pending!(first.poll());
        assert!(view.is_loading());

        view.set_sort(SortKey::Rating).await.unwrap();
        assert!(!view.is_loading());

        gate.add_permits(1);
        assert_eq!(assert_ready!(first.poll()), Ok(()));

        let ids: Vec<MovieId> = view.items().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![MovieId(2), MovieId(1)]);
        assert_eq!(
            fake.calls(),
            vec!["list_movies:type=MOVIE", "list_movies:type=MOVIE&sort=rating"]
        );
    }

    #[tokio::test]
    async fn test_media_type_change_refetches() {
        let mut series = movie(2, "Dark");
        series.media_type = MediaType::TvSeries;
        let fake = Arc::new(FakeRemote::with_movies(vec![movie(1, "Heat"), series]));
        let view = ListingView::new(
            fake.clone(),
            anonymous(),
            MovieQuery::new(Some(MediaType::Movie), SortKey::None),
        );
        view.mount().await.unwrap();

        assert_eq!(view.set_media_type(Some(MediaType::TvSeries)).await, Ok(true));

        let titles: Vec<String> = view.items().into_iter().map(|m| m.title).collect();
        assert_eq!(titles, vec!["Dark"]);
        assert_eq!(fake.count("list_movies"), 2);
    }

    #[tokio::test]
    async fn test_mount_seeds_watchlist_for_viewer() {
        let fake = Arc::new(FakeRemote::with_movies(vec![
            movie(1, "The Matrix"),
            movie(2, "Inception"),
        ]));
        fake.put_on_watchlist(MovieId(2));
        let view = ListingView::new(
            fake.clone(),
            signed_in(Arc::new(RecordingNotifier::default())),
            MovieQuery::default(),
        );

        view.mount().await.unwrap();

        assert!(view.is_on_watchlist(MovieId(2)));
        assert!(!view.is_on_watchlist(MovieId(1)));

        view.toggle_watchlist(MovieId(1)).await.unwrap();
        assert!(fake.on_watchlist(MovieId(1)));
    }

    #[tokio::test]
    async fn test_watchlist_failure_does_not_fail_mount() {
        let fake = Arc::new(FakeRemote::with_movies(vec![movie(1, "The Matrix")]));
        fake.fail(
            "watchlist",
            AppError::NetworkUnavailable("offline".to_string()),
        );
        let notifier = Arc::new(RecordingNotifier::default());
        let view = ListingView::new(fake, signed_in(notifier.clone()), MovieQuery::default());

        view.mount().await.unwrap();

        assert_eq!(view.items().len(), 1);
        assert_eq!(notifier.errors(), vec!["Failed to load watchlist"]);
    }

    #[tokio::test]
    async fn test_list_failure_is_reported() {
        let fake = Arc::new(FakeRemote::with_movies(Vec::new()));
        fake.fail(
            "list_movies",
            AppError::RequestFailed {
                status: Some(500),
                message: None,
            },
        );
        let notifier = Arc::new(RecordingNotifier::default());
        let view = ListingView::new(
            fake,
            AppContext::anonymous(notifier.clone()),
            MovieQuery::default(),
        );

        let err = view.mount().await.unwrap_err();

        assert_eq!(err.category(), ErrorCategory::RequestFailed);
        assert!(!view.is_loading());
        assert_eq!(notifier.errors(), vec!["Failed to load movies"]);
    }

    #[tokio::test]
    async fn test_create_movie_validates_before_sending() {
        let mut mock = MockRemoteApi::new();
        mock.expect_create_movie().times(0);
        let view = ListingView::new(
            Arc::new(mock),
            signed_in(Arc::new(RecordingNotifier::default())),
            MovieQuery::default(),
        );

        let mut draft = MediaDraft::movie("Heat");
        draft.seasons = Some(2);

        let err = view.create_movie(&draft).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[tokio::test]
    async fn test_create_movie_adds_to_cache() {
        let fake = Arc::new(FakeRemote::with_movies(vec![movie(1, "The Matrix")]));
        let notifier = Arc::new(RecordingNotifier::default());
        let view = ListingView::new(fake, signed_in(notifier.clone()), MovieQuery::default());
        view.mount().await.unwrap();

        let mut draft = MediaDraft::movie("Heat");
        draft.genre = Some("Crime".to_string());
        let created = view.create_movie(&draft).await.unwrap();

        assert_eq!(view.items().last().map(|m| m.id), Some(created.id));
        assert_eq!(view.genres(), vec!["Crime"]);
        assert_eq!(notifier.successes(), vec!["Movie added successfully!"]);
    }
}
