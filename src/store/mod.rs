use std::path::PathBuf;

use log::{info, warn};
use tokio::sync::RwLock;

use crate::error::PollError;
use crate::models::{Poll, PollSummary};
use crate::util::{read_json, write_json_atomic};

/// The vote store: polls and their counts, persisted to a JSON file after
/// every mutation. Counts only ever move through `vote`, so they are
/// monotonically non-decreasing for the lifetime of a poll.
pub struct PollStore {
    path: Option<PathBuf>,
    polls: RwLock<Vec<Poll>>,
}

impl PollStore {
    /// Opens the store, reloading any previously persisted polls. A missing
    /// or unreadable file starts the store empty. `None` keeps the store
    /// purely in memory.
    pub fn open(path: Option<PathBuf>) -> Self {
        let polls = match &path {
            Some(path) => match read_json::<Vec<Poll>>(path) {
                Ok(Some(polls)) => {
                    info!("loaded {} poll(s) from {}", polls.len(), path.display());
                    polls
                }
                Ok(None) => Vec::new(),
                Err(err) => {
                    warn!("unreadable poll file {}, starting empty: {err}", path.display());
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        Self {
            path,
            polls: RwLock::new(polls),
        }
    }

    pub async fn create(&self, question: &str, options: &[String]) -> Result<Poll, PollError> {
        // duplicate labels collapse to the first occurrence
        let mut labels: Vec<String> = Vec::new();
        for option in options {
            if !labels.iter().any(|label| label == option) {
                labels.push(option.clone());
            }
        }
        if labels.len() < 2 {
            return Err(PollError::TooFewOptions);
        }

        let poll = Poll::new(question.to_string(), labels);
        let mut polls = self.polls.write().await;
        polls.push(poll.clone());
        self.persist(&polls)?;
        info!("created poll {} ({})", poll.id, poll.question);
        Ok(poll)
    }

    pub async fn get(&self, poll_id: &str) -> Result<Poll, PollError> {
        self.polls
            .read()
            .await
            .iter()
            .find(|poll| poll.id == poll_id)
            .cloned()
            .ok_or(PollError::NotFound)
    }

    /// Adds one vote to `option` and returns the updated poll.
    pub async fn vote(&self, poll_id: &str, option: &str) -> Result<Poll, PollError> {
        let mut polls = self.polls.write().await;
        let poll = polls
            .iter_mut()
            .find(|poll| poll.id == poll_id)
            .ok_or(PollError::NotFound)?;
        let target = poll
            .options
            .iter_mut()
            .find(|candidate| candidate.label == option)
            .ok_or_else(|| PollError::InvalidOption(option.to_string()))?;

        target.votes += 1;
        let updated = poll.clone();
        self.persist(&polls)?;
        Ok(updated)
    }

    pub async fn list(&self) -> Vec<PollSummary> {
        self.polls.read().await.iter().map(Poll::summary).collect()
    }

    fn persist(&self, polls: &[Poll]) -> Result<(), PollError> {
        match &self.path {
            Some(path) => write_json_atomic(path, &polls),
            None => Ok(()),
        }
    }
}
