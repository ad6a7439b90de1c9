use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use rusty_poll::api::PollApi;
use rusty_poll::api::http::HttpPollApi;
use rusty_poll::ballot::{BallotGuard, BallotStore};
use rusty_poll::error::PollError;
use rusty_poll::results::percentages;
use rusty_poll::server;
use rusty_poll::store::PollStore;
use rusty_poll::sync::{PollView, PollWatcher};

const FAST_PERIOD: Duration = Duration::from_millis(50);

async fn spawn_store() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let store = Arc::new(PollStore::open(None));
    let handle = tokio::spawn(async move {
        server::serve_on(listener, store).await.unwrap();
    });
    (format!("http://{addr}"), handle)
}

fn options(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|label| label.to_string()).collect()
}

#[tokio::test]
async fn poll_lifecycle_over_http() {
    let (base_url, server) = spawn_store().await;
    let api = HttpPollApi::new(&base_url).unwrap();

    let poll_id = api
        .create_poll("Tea or coffee?", &options(&["Tea", "Coffee"]))
        .await
        .unwrap();

    let index = api.list_polls().await.unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index[0].id, poll_id);
    assert_eq!(index[0].question, "Tea or coffee?");

    let fresh = api.get_poll(&poll_id).await.unwrap();
    assert_eq!(fresh.total_votes(), 0);

    api.cast_vote(&poll_id, "Coffee").await.unwrap();

    let after = api.get_poll(&poll_id).await.unwrap();
    assert_eq!(after.options[0].votes, 0);
    assert_eq!(after.options[1].votes, 1);

    let shares = percentages(&after);
    assert_eq!(shares[0].percent, 0.0);
    assert_eq!(shares[1].percent, 100.0);

    server.abort();
}

#[tokio::test]
async fn unknown_poll_is_not_found() {
    let (base_url, server) = spawn_store().await;
    let api = HttpPollApi::new(&base_url).unwrap();

    let err = api.get_poll("no-such-poll").await.unwrap_err();
    assert!(matches!(err, PollError::NotFound));

    let err = api.cast_vote("no-such-poll", "Tea").await.unwrap_err();
    assert!(matches!(err, PollError::NotFound));

    server.abort();
}

#[tokio::test]
async fn vote_for_unknown_option_is_rejected() {
    let (base_url, server) = spawn_store().await;
    let api = HttpPollApi::new(&base_url).unwrap();

    let poll_id = api
        .create_poll("Tea or coffee?", &options(&["Tea", "Coffee"]))
        .await
        .unwrap();
    let err = api.cast_vote(&poll_id, "Juice").await.unwrap_err();
    assert!(matches!(err, PollError::InvalidOption(_)));

    server.abort();
}

#[tokio::test]
async fn create_with_one_option_is_rejected() {
    let (base_url, server) = spawn_store().await;
    let api = HttpPollApi::new(&base_url).unwrap();

    let err = api
        .create_poll("Lonely?", &options(&["only"]))
        .await
        .unwrap_err();
    assert!(matches!(err, PollError::TooFewOptions));

    server.abort();
}

#[tokio::test]
async fn watcher_picks_up_new_votes() {
    let (base_url, server) = spawn_store().await;
    let api: Arc<HttpPollApi> = Arc::new(HttpPollApi::new(&base_url).unwrap());

    let poll_id = api
        .create_poll("Tea or coffee?", &options(&["Tea", "Coffee"]))
        .await
        .unwrap();

    let mut watcher = PollWatcher::spawn(api.clone(), &poll_id, FAST_PERIOD);
    let mut view_rx = watcher.subscribe();

    // first refresh happens immediately
    view_rx.changed().await.unwrap();
    let initial = view_rx.borrow_and_update().clone();
    assert_eq!(initial.poll().unwrap().total_votes(), 0);

    api.cast_vote(&poll_id, "Tea").await.unwrap();

    let mut seen = 0;
    for _ in 0..50 {
        view_rx.changed().await.unwrap();
        let view = view_rx.borrow_and_update().clone();
        seen = view.poll().unwrap().total_votes();
        if seen == 1 {
            break;
        }
    }
    assert_eq!(seen, 1, "watcher never observed the new vote");

    watcher.stop().await;
    server.abort();
}

#[tokio::test]
async fn transient_failure_keeps_previous_view() {
    let (base_url, server) = spawn_store().await;
    let api: Arc<HttpPollApi> = Arc::new(HttpPollApi::new(&base_url).unwrap());

    let poll_id = api
        .create_poll("Tea or coffee?", &options(&["Tea", "Coffee"]))
        .await
        .unwrap();
    api.cast_vote(&poll_id, "Coffee").await.unwrap();

    let mut watcher = PollWatcher::spawn(api.clone(), &poll_id, FAST_PERIOD);
    let mut view_rx = watcher.subscribe();
    view_rx.changed().await.unwrap();
    let live = view_rx.borrow_and_update().clone();
    assert_eq!(live.poll().unwrap().total_votes(), 1);

    // kill the store; every refresh from here on fails
    server.abort();
    sleep(FAST_PERIOD * 6).await;

    let view = watcher.view();
    let poll = view.poll().expect("previous view was dropped");
    assert_eq!(poll.total_votes(), 1);
    assert_eq!(poll.options[1].votes, 1);

    watcher.stop().await;
}

#[tokio::test]
async fn stop_halts_view_updates() {
    let (base_url, server) = spawn_store().await;
    let api: Arc<HttpPollApi> = Arc::new(HttpPollApi::new(&base_url).unwrap());

    let poll_id = api
        .create_poll("Tea or coffee?", &options(&["Tea", "Coffee"]))
        .await
        .unwrap();

    let mut watcher = PollWatcher::spawn(api.clone(), &poll_id, FAST_PERIOD);
    let mut view_rx = watcher.subscribe();
    view_rx.changed().await.unwrap();
    view_rx.borrow_and_update();

    watcher.stop().await;
    // stopping twice is fine
    watcher.stop().await;

    api.cast_vote(&poll_id, "Tea").await.unwrap();
    sleep(FAST_PERIOD * 4).await;

    let view = watcher.view();
    assert_eq!(
        view.poll().unwrap().total_votes(),
        0,
        "view changed after stop()"
    );

    server.abort();
}

#[tokio::test]
async fn deleted_poll_reports_missing() {
    // a store that never knew the poll: the watcher should say so
    let (base_url, server) = spawn_store().await;
    let api: Arc<HttpPollApi> = Arc::new(HttpPollApi::new(&base_url).unwrap());

    let mut watcher = PollWatcher::spawn(api, "ghost", FAST_PERIOD);
    let mut view_rx = watcher.subscribe();
    view_rx.changed().await.unwrap();
    assert!(matches!(&*view_rx.borrow_and_update(), PollView::Missing));

    watcher.stop().await;
    server.abort();
}

#[tokio::test]
async fn guard_blocks_second_vote_end_to_end() {
    let (base_url, server) = spawn_store().await;
    let api: Arc<HttpPollApi> = Arc::new(HttpPollApi::new(&base_url).unwrap());

    let poll_id = api
        .create_poll("Tea or coffee?", &options(&["Tea", "Coffee"]))
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let ballots = BallotStore::load(&dir.path().join("ballots.json")).unwrap();
    let mut guard = BallotGuard::new(api.clone(), ballots);

    let poll = api.get_poll(&poll_id).await.unwrap();
    let updated = guard.cast(&poll, "Coffee").await.unwrap();
    assert_eq!(updated.options[1].votes, 1);
    assert!(guard.has_voted(&poll_id));

    let err = guard.cast(&updated, "Tea").await.unwrap_err();
    assert!(matches!(err, PollError::AlreadyVoted));

    // the store itself was never asked a second time
    let fetched = api.get_poll(&poll_id).await.unwrap();
    assert_eq!(fetched.total_votes(), 1);

    server.abort();
}
