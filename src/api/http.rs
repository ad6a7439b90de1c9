use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::api::PollApi;
use crate::error::PollError;
use crate::models::{Poll, PollOption, PollSummary};

/// A slow request must never block the next scheduled refresh tick.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Vote store client over its REST interface.
pub struct HttpPollApi {
    base_url: String,
    client: Client,
}

#[derive(Deserialize)]
struct PollBody {
    question: String,
    options: Vec<PollOption>,
}

#[derive(Serialize)]
struct VoteBody<'a> {
    poll_id: &'a str,
    option: &'a str,
}

#[derive(Serialize)]
struct CreateBody<'a> {
    question: &'a str,
    options: &'a [String],
}

#[derive(Deserialize)]
struct CreatedBody {
    poll_id: String,
}

impl HttpPollApi {
    pub fn new(base_url: &str) -> Result<Self, PollError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PollError::Config(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl PollApi for HttpPollApi {
    async fn get_poll(&self, poll_id: &str) -> Result<Poll, PollError> {
        let url = format!("{}/api/poll/{}", self.base_url, poll_id);
        debug!("GET {url}");
        let response = self.client.get(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(PollError::NotFound),
            status if status.is_success() => {
                let body: PollBody = response.json().await?;
                Ok(Poll {
                    id: poll_id.to_string(),
                    question: body.question,
                    options: body.options,
                })
            }
            status => Err(PollError::Transient(format!("vote store replied {status}"))),
        }
    }

    async fn cast_vote(&self, poll_id: &str, option: &str) -> Result<(), PollError> {
        let url = format!("{}/api/poll/vote", self.base_url);
        debug!("POST {url} poll_id={poll_id} option={option}");
        let response = self
            .client
            .post(&url)
            .json(&VoteBody { poll_id, option })
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(PollError::NotFound),
            StatusCode::BAD_REQUEST => Err(PollError::InvalidOption(option.to_string())),
            status if status.is_success() => Ok(()),
            status => Err(PollError::Transient(format!("vote store replied {status}"))),
        }
    }

    async fn list_polls(&self) -> Result<Vec<PollSummary>, PollError> {
        let url = format!("{}/api/poll", self.base_url);
        debug!("GET {url}");
        let response = self.client.get(&url).send().await?;

        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            status => Err(PollError::Transient(format!("vote store replied {status}"))),
        }
    }

    async fn create_poll(&self, question: &str, options: &[String]) -> Result<String, PollError> {
        let url = format!("{}/api/poll/create", self.base_url);
        debug!("POST {url} question={question}");
        let response = self
            .client
            .post(&url)
            .json(&CreateBody { question, options })
            .send()
            .await?;

        match response.status() {
            StatusCode::BAD_REQUEST => Err(PollError::TooFewOptions),
            status if status.is_success() => {
                let body: CreatedBody = response.json().await?;
                Ok(body.poll_id)
            }
            status => Err(PollError::Transient(format!("vote store replied {status}"))),
        }
    }
}
