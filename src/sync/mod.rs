use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::api::PollApi;
use crate::error::PollError;
use crate::models::Poll;

pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(3);

/// What the renderer sees. Replaced wholesale on each successful fetch, so
/// a subscriber can never observe a torn read between options.
#[derive(Debug, Clone)]
pub enum PollView {
    /// Nothing fetched yet.
    Pending,
    Live(Poll),
    /// The store answered definitively that the poll does not exist.
    Missing,
}

impl PollView {
    pub fn poll(&self) -> Option<&Poll> {
        match self {
            PollView::Live(poll) => Some(poll),
            _ => None,
        }
    }
}

/// Keeps a local view of one poll approximately fresh.
///
/// Spawns a background task that fetches immediately, then on a fixed
/// period until `stop()`. Only that task writes the view, so two fetch
/// completions cannot interleave.
pub struct PollWatcher {
    view_rx: watch::Receiver<PollView>,
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl PollWatcher {
    pub fn spawn(api: Arc<dyn PollApi>, poll_id: &str, period: Duration) -> Self {
        let (view_tx, view_rx) = watch::channel(PollView::Pending);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let poll_id = poll_id.to_string();
        let handle = tokio::spawn(refresh_loop(api, poll_id, period, view_tx, shutdown_rx));

        Self {
            view_rx,
            shutdown_tx,
            handle: Some(handle),
        }
    }

    /// Independent handle on the view for a renderer to await changes on.
    pub fn subscribe(&self) -> watch::Receiver<PollView> {
        self.view_rx.clone()
    }

    pub fn view(&self) -> PollView {
        self.view_rx.borrow().clone()
    }

    /// Stops the refresh task. Once this returns, no further view write can
    /// occur; an in-flight fetch is dropped, not applied. Idempotent.
    pub async fn stop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                if err.is_panic() {
                    error!("refresh task panicked: {err}");
                }
            }
        }
    }
}

async fn refresh_loop(
    api: Arc<dyn PollApi>,
    poll_id: String,
    period: Duration,
    view_tx: watch::Sender<PollView>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!("watching poll {poll_id} every {period:?}");

    // The first tick completes immediately. A fetch outlasting the period
    // skips ticks rather than queueing them, so requests never overlap.
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            _ = shutdown_rx.changed() => break,
            fetched = api.get_poll(&poll_id) => apply(&view_tx, &poll_id, fetched),
        }
    }

    info!("stopped watching poll {poll_id}");
}

fn apply(view_tx: &watch::Sender<PollView>, poll_id: &str, fetched: Result<Poll, PollError>) {
    match fetched {
        Ok(poll) => {
            view_tx.send_replace(PollView::Live(poll));
        }
        Err(PollError::NotFound) => {
            warn!("poll {poll_id} is gone from the vote store");
            view_tx.send_replace(PollView::Missing);
        }
        Err(err) => {
            // keep the previous view; retried at the next tick, no backoff
            warn!("refresh of poll {poll_id} failed: {err}");
        }
    }
}
