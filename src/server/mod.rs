use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::info;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;

use crate::error::PollError;
use crate::store::PollStore;

pub fn router(store: Arc<PollStore>) -> Router {
    Router::new()
        .route("/api/poll/create", post(create_poll))
        .route("/api/poll/vote", post(cast_vote))
        .route("/api/poll", get(list_polls))
        .route("/api/poll/{poll_id}", get(get_poll))
        .with_state(store)
}

pub async fn serve(store: Arc<PollStore>, addr: SocketAddr) -> Result<(), PollError> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, store).await
}

/// Serves on an already-bound listener; tests bind to an ephemeral port.
pub async fn serve_on(listener: TcpListener, store: Arc<PollStore>) -> Result<(), PollError> {
    info!("vote store listening on {}", listener.local_addr()?);
    axum::serve(listener, router(store)).await?;
    Ok(())
}

#[derive(Deserialize)]
struct CreateRequest {
    question: String,
    options: Vec<String>,
}

#[derive(Deserialize)]
struct VoteRequest {
    poll_id: String,
    option: String,
}

async fn create_poll(
    State(store): State<Arc<PollStore>>,
    Json(request): Json<CreateRequest>,
) -> Response {
    match store.create(&request.question, &request.options).await {
        Ok(poll) => (StatusCode::OK, Json(json!({ "poll_id": poll.id }))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn get_poll(State(store): State<Arc<PollStore>>, Path(poll_id): Path<String>) -> Response {
    match store.get(&poll_id).await {
        Ok(poll) => (
            StatusCode::OK,
            Json(json!({ "question": poll.question, "options": poll.options })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn cast_vote(
    State(store): State<Arc<PollStore>>,
    Json(request): Json<VoteRequest>,
) -> Response {
    match store.vote(&request.poll_id, &request.option).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "message": "vote recorded" }))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn list_polls(State(store): State<Arc<PollStore>>) -> Response {
    (StatusCode::OK, Json(store.list().await)).into_response()
}

fn error_response(err: PollError) -> Response {
    let status = match err {
        PollError::NotFound => StatusCode::NOT_FOUND,
        PollError::InvalidOption(_) | PollError::TooFewOptions => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "detail": err.to_string() }))).into_response()
}
