pub mod http;

use async_trait::async_trait;

use crate::error::PollError;
use crate::models::{Poll, PollSummary};

/// Contract the client core consumes from the vote store.
///
/// The store owns the counts; nothing on this side of the seam mutates them
/// except through `cast_vote`.
#[async_trait]
pub trait PollApi: Send + Sync {
    async fn get_poll(&self, poll_id: &str) -> Result<Poll, PollError>;

    async fn cast_vote(&self, poll_id: &str, option: &str) -> Result<(), PollError>;

    async fn list_polls(&self) -> Result<Vec<PollSummary>, PollError>;

    /// Returns the id of the new poll.
    async fn create_poll(&self, question: &str, options: &[String]) -> Result<String, PollError>;
}
