use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub question: String,
    pub options: Vec<PollOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOption {
    #[serde(rename = "option")]
    pub label: String,
    pub votes: u64,
}

/// One row of the poll index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSummary {
    pub id: String,
    pub question: String,
}

/// Client-local evidence that this client already voted on a poll.
/// Not a source of truth; the counts live in the vote store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotRecord {
    pub option: String,
    pub cast_at: DateTime<Utc>,
}

impl Poll {
    pub fn new(question: String, labels: Vec<String>) -> Self {
        let options = labels
            .into_iter()
            .map(|label| PollOption { label, votes: 0 })
            .collect();

        Self {
            id: Uuid::new_v4().to_string(),
            question,
            options,
        }
    }

    pub fn has_option(&self, label: &str) -> bool {
        self.options.iter().any(|option| option.label == label)
    }

    pub fn total_votes(&self) -> u64 {
        self.options.iter().map(|option| option.votes).sum()
    }

    pub fn summary(&self) -> PollSummary {
        PollSummary {
            id: self.id.clone(),
            question: self.question.clone(),
        }
    }
}

impl BallotRecord {
    pub fn new(option: String) -> Self {
        Self {
            option,
            cast_at: Utc::now(),
        }
    }
}
