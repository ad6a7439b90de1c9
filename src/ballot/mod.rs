use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};

use crate::api::PollApi;
use crate::error::PollError;
use crate::models::{BallotRecord, Poll};
use crate::util::{read_json, write_json_atomic};

/// Per-poll voting state as seen by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallotState {
    NotVoted,
    /// A cast is in flight; collapses to `Voted` on success or back to
    /// `NotVoted` on failure.
    Voting,
    /// Terminal for this client session.
    Voted,
}

/// Durable mapping of poll id to the ballot this client cast.
///
/// The session-scoped replacement for ad-hoc browser storage: explicit
/// load/save/clear lifecycle, one JSON document on disk, no expiry.
pub struct BallotStore {
    path: PathBuf,
    records: HashMap<String, BallotRecord>,
}

impl BallotStore {
    pub fn load(path: &Path) -> Result<Self, PollError> {
        let records = match read_json(path) {
            Ok(Some(records)) => records,
            Ok(None) => HashMap::new(),
            Err(err) => {
                warn!("unreadable ballot file {}, starting empty: {err}", path.display());
                HashMap::new()
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn has_voted(&self, poll_id: &str) -> bool {
        self.records.contains_key(poll_id)
    }

    pub fn choice(&self, poll_id: &str) -> Option<&BallotRecord> {
        self.records.get(poll_id)
    }

    /// Records the ballot and persists it before returning, so a reload
    /// cannot re-enable voting on a poll that was already voted on.
    pub fn record(&mut self, poll_id: &str, option: &str) -> Result<(), PollError> {
        self.records
            .insert(poll_id.to_string(), BallotRecord::new(option.to_string()));
        self.save()
    }

    pub fn clear(&mut self, poll_id: &str) -> Result<bool, PollError> {
        let removed = self.records.remove(poll_id).is_some();
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    fn save(&self) -> Result<(), PollError> {
        write_json_atomic(&self.path, &self.records)
    }
}

/// Enforces at-most-one-vote-per-poll from this client and owns the
/// `NotVoted -> Voting -> Voted` transition around each cast.
///
/// Enforcement is client-side only: a voter with no local record is always
/// `NotVoted`, even if they voted from another client.
pub struct BallotGuard {
    api: Arc<dyn PollApi>,
    store: BallotStore,
    in_flight: HashSet<String>,
}

impl BallotGuard {
    pub fn new(api: Arc<dyn PollApi>, store: BallotStore) -> Self {
        Self {
            api,
            store,
            in_flight: HashSet::new(),
        }
    }

    pub fn state(&self, poll_id: &str) -> BallotState {
        if self.store.has_voted(poll_id) {
            BallotState::Voted
        } else if self.in_flight.contains(poll_id) {
            BallotState::Voting
        } else {
            BallotState::NotVoted
        }
    }

    pub fn has_voted(&self, poll_id: &str) -> bool {
        self.store.has_voted(poll_id)
    }

    pub fn choice(&self, poll_id: &str) -> Option<&BallotRecord> {
        self.store.choice(poll_id)
    }

    /// Casts a vote for `option` on `poll` and returns the refreshed poll.
    ///
    /// The local guard runs before any network call: a poll this client
    /// already voted on fails with `AlreadyVoted`, an option outside the
    /// poll's current set fails with `InvalidOption`. A failed cast is never
    /// auto-retried; the double-submission risk belongs to the caller.
    pub async fn cast(&mut self, poll: &Poll, option: &str) -> Result<Poll, PollError> {
        if self.store.has_voted(&poll.id) {
            return Err(PollError::AlreadyVoted);
        }
        if option.trim().is_empty() || !poll.has_option(option) {
            return Err(PollError::InvalidOption(option.to_string()));
        }
        // a second submit while one is outstanding must not double-send
        if !self.in_flight.insert(poll.id.clone()) {
            return Err(PollError::AlreadyVoted);
        }

        let outcome = self.api.cast_vote(&poll.id, option).await;
        self.in_flight.remove(&poll.id);
        outcome?;

        self.store.record(&poll.id, option)?;
        info!("ballot recorded for poll {}: {option}", poll.id);

        // Immediate refresh so the caller renders the updated counts. The
        // vote already landed; a failed refresh keeps the previous view.
        match self.api.get_poll(&poll.id).await {
            Ok(updated) => Ok(updated),
            Err(err) => {
                warn!("vote recorded but refresh of poll {} failed: {err}", poll.id);
                Ok(poll.clone())
            }
        }
    }
}
