use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    context::{AppContext, Severity},
    error::{AppError, AppResult},
    models::{MovieId, WatchlistEntry},
    services::RemoteApi,
    state::optimistic::optimistic,
};

/// Result of a membership change request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The remote store confirmed the change
    Applied,
    /// Membership already matched the request; nothing was sent
    Unchanged,
    /// A call already in flight targets the same state; the request was dropped
    Coalesced,
    /// The opposite change is in flight; this one runs once it resolves
    Queued,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    /// End state the outstanding remote call is establishing
    target: bool,
    /// Latest opposite request received while the call was outstanding
    queued: Option<bool>,
}

#[derive(Debug, Default)]
struct Membership {
    members: HashSet<MovieId>,
    in_flight: HashMap<MovieId, InFlight>,
}

impl Membership {
    fn set(&mut self, movie_id: MovieId, member: bool) {
        if member {
            self.members.insert(movie_id);
        } else {
            self.members.remove(&movie_id);
        }
    }
}

/// The viewer's watchlist as seen by one screen
///
/// Changes are applied locally first and rolled back if the remote call
/// fails. Per movie, at most one remote call is outstanding: repeats of the
/// in-flight target are dropped and opposite requests are queued, last
/// request winning.
pub struct WatchlistSet {
    remote: Arc<dyn RemoteApi>,
    context: AppContext,
    inner: Mutex<Membership>,
}

impl WatchlistSet {
    pub fn new(remote: Arc<dyn RemoteApi>, context: AppContext) -> Self {
        Self {
            remote,
            context,
            inner: Mutex::new(Membership::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Membership> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_member(&self, movie_id: MovieId) -> bool {
        self.lock().members.contains(&movie_id)
    }

    /// Whether a remote change for `movie_id` is still outstanding
    pub fn is_pending(&self, movie_id: MovieId) -> bool {
        self.lock().in_flight.contains_key(&movie_id)
    }

    pub fn members(&self) -> HashSet<MovieId> {
        self.lock().members.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().members.is_empty()
    }

    /// Replaces membership with a freshly fetched snapshot
    ///
    /// Movies with a change in flight keep their optimistic value; the
    /// outstanding call decides their final state.
    pub fn seed(&self, movie_ids: impl IntoIterator<Item = MovieId>) {
        let mut inner = self.lock();
        let mut members: HashSet<MovieId> = movie_ids.into_iter().collect();

        for movie_id in inner.in_flight.keys() {
            if inner.members.contains(movie_id) {
                members.insert(*movie_id);
            } else {
                members.remove(movie_id);
            }
        }

        inner.members = members;
    }

    /// Fetches the watchlist and seeds membership from it
    pub async fn load(&self) -> AppResult<Vec<WatchlistEntry>> {
        let entries = self.remote.watchlist().await?;
        self.seed(entries.iter().map(WatchlistEntry::movie_id));

        tracing::debug!(entries = entries.len(), "Watchlist membership loaded");

        Ok(entries)
    }

    pub async fn add(&self, movie_id: MovieId) -> AppResult<ToggleOutcome> {
        self.request(movie_id, true).await
    }

    pub async fn remove(&self, movie_id: MovieId) -> AppResult<ToggleOutcome> {
        self.request(movie_id, false).await
    }

    /// Flips membership relative to what the screen currently shows
    pub async fn toggle(&self, movie_id: MovieId) -> AppResult<ToggleOutcome> {
        let want = !self.is_member(movie_id);
        self.request(movie_id, want).await
    }

    async fn request(&self, movie_id: MovieId, want: bool) -> AppResult<ToggleOutcome> {
        self.context.require_viewer()?;

        {
            let mut inner = self.lock();

            if let Some(flight) = inner.in_flight.get_mut(&movie_id) {
                let latest = flight.queued.unwrap_or(flight.target);
                if latest == want {
                    tracing::debug!(movie_id = %movie_id, member = want, "Duplicate watchlist request dropped");
                    return Ok(ToggleOutcome::Coalesced);
                }

                flight.queued = if want == flight.target { None } else { Some(want) };
                let outcome = if flight.queued.is_some() {
                    ToggleOutcome::Queued
                } else {
                    ToggleOutcome::Coalesced
                };

                inner.set(movie_id, want);
                tracing::debug!(movie_id = %movie_id, member = want, outcome = ?outcome, "Watchlist request while in flight");
                return Ok(outcome);
            }

            if inner.members.contains(&movie_id) == want {
                return Ok(ToggleOutcome::Unchanged);
            }

            inner.in_flight.insert(
                movie_id,
                InFlight {
                    target: want,
                    queued: None,
                },
            );
        }

        self.drive(movie_id, want).await
    }

    /// Runs the in-flight call for `movie_id`, then any request queued behind it
    async fn drive(&self, movie_id: MovieId, mut want: bool) -> AppResult<ToggleOutcome> {
        let mut guard = InFlightGuard {
            set: self,
            movie_id,
            confirmed: !want,
            armed: true,
        };

        loop {
            let result = optimistic(
                || self.lock().set(movie_id, want),
                || self.call_remote(movie_id, want),
                || self.lock().set(movie_id, !want),
            )
            .await;

            let mut inner = self.lock();

            if let Err(e) = result {
                // The rollback restored the pre-call state, which is what any
                // queued opposite request asked for.
                inner.in_flight.remove(&movie_id);
                drop(inner);
                guard.disarm();

                self.context.report(&e, failure_message(want));
                return Err(e);
            }
            guard.confirmed = want;

            let queued = inner
                .in_flight
                .get_mut(&movie_id)
                .and_then(|flight| flight.queued.take());

            match queued {
                Some(next) if next != want => {
                    if let Some(flight) = inner.in_flight.get_mut(&movie_id) {
                        flight.target = next;
                    }
                    tracing::debug!(movie_id = %movie_id, member = next, "Applying queued watchlist change");
                    want = next;
                }
                _ => {
                    inner.in_flight.remove(&movie_id);
                    drop(inner);
                    guard.disarm();

                    self.context.notify(success_message(want), Severity::Success);
                    return Ok(ToggleOutcome::Applied);
                }
            }
        }
    }

    async fn call_remote(&self, movie_id: MovieId, member: bool) -> AppResult<()> {
        if member {
            match self.remote.add_to_watchlist(movie_id).await {
                Ok(_) => Ok(()),
                Err(e @ AppError::RequestFailed { status: Some(400 | 409), .. }) => {
                    if self.remote_has(movie_id).await {
                        tracing::debug!(movie_id = %movie_id, "Movie already on remote watchlist");
                        Ok(())
                    } else {
                        Err(e)
                    }
                }
                Err(e) => Err(e),
            }
        } else {
            match self.remote.remove_from_watchlist(movie_id).await {
                Err(AppError::NotFound(_)) => {
                    tracing::debug!(movie_id = %movie_id, "Movie already absent from remote watchlist");
                    Ok(())
                }
                other => other,
            }
        }
    }

    /// Re-reads the remote watchlist after a rejected add
    async fn remote_has(&self, movie_id: MovieId) -> bool {
        match self.remote.watchlist().await {
            Ok(entries) => entries.iter().any(|entry| entry.movie_id() == movie_id),
            Err(e) => {
                tracing::warn!(movie_id = %movie_id, error = %e, "Could not re-read watchlist");
                false
            }
        }
    }
}

/// Clears a movie's in-flight entry if its driving future is dropped
///
/// Membership falls back to the last state the server confirmed.
struct InFlightGuard<'a> {
    set: &'a WatchlistSet,
    movie_id: MovieId,
    confirmed: bool,
    armed: bool,
}

impl InFlightGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let mut inner = self.set.lock();
        inner.in_flight.remove(&self.movie_id);
        inner.set(self.movie_id, self.confirmed);

        tracing::debug!(
            movie_id = %self.movie_id,
            member = self.confirmed,
            "Watchlist change abandoned before completion"
        );
    }
}

fn success_message(member: bool) -> &'static str {
    if member {
        "Added to watchlist"
    } else {
        "Removed from watchlist"
    }
}

fn failure_message(member: bool) -> &'static str {
    if member {
        "Failed to add to watchlist"
    } else {
        "Failed to remove from watchlist"
    }
}
