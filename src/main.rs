use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{error, warn};

use rusty_poll::api::PollApi;
use rusty_poll::api::http::HttpPollApi;
use rusty_poll::ballot::{BallotGuard, BallotStore};
use rusty_poll::error::PollError;
use rusty_poll::results::format_results;
use rusty_poll::server;
use rusty_poll::store::PollStore;
use rusty_poll::sync::{DEFAULT_REFRESH_PERIOD, PollView, PollWatcher};

#[derive(Parser, Debug)]
#[command(name = "rusty-poll", about = "Live poll client and vote store service")]
struct Cli {
    /// Base URL of the vote store (falls back to RUSTY_POLL_API)
    #[arg(long)]
    api: Option<String>,

    /// File holding this client's ballot records (falls back to RUSTY_POLL_BALLOTS)
    #[arg(long)]
    ballots: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the vote store service
    Serve {
        /// Address to bind (falls back to RUSTY_POLL_BIND)
        #[arg(long)]
        bind: Option<String>,

        /// File the store persists polls to (falls back to RUSTY_POLL_DATA)
        #[arg(long)]
        data: Option<PathBuf>,
    },

    /// List known polls
    List,

    /// Create a new poll
    Create {
        question: String,

        /// Poll option; pass at least twice
        #[arg(short = 'o', long = "option")]
        options: Vec<String>,
    },

    /// Fetch a poll once and print its results
    Show { poll_id: String },

    /// Watch a poll, re-rendering results as votes arrive (Ctrl-C to stop)
    Watch {
        poll_id: String,

        /// Refresh period in seconds (falls back to RUSTY_POLL_PERIOD_SECS)
        #[arg(long)]
        period: Option<u64>,
    },

    /// Cast a vote on a poll
    Vote { poll_id: String, option: String },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!("{err}");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), PollError> {
    let api_url = cli
        .api
        .clone()
        .unwrap_or_else(|| env_or("RUSTY_POLL_API", "http://localhost:8000"));
    let ballots_path = cli
        .ballots
        .clone()
        .unwrap_or_else(|| PathBuf::from(env_or("RUSTY_POLL_BALLOTS", "ballots.json")));

    match cli.command {
        Command::Serve { bind, data } => {
            let bind = bind.unwrap_or_else(|| env_or("RUSTY_POLL_BIND", "127.0.0.1:8000"));
            let addr: SocketAddr = bind
                .parse()
                .map_err(|_| PollError::Config(format!("invalid bind address '{bind}'")))?;
            let data = data.unwrap_or_else(|| PathBuf::from(env_or("RUSTY_POLL_DATA", "polls.json")));

            let store = Arc::new(PollStore::open(Some(data)));
            server::serve(store, addr).await
        }

        Command::List => {
            let api = HttpPollApi::new(&api_url)?;
            let polls = api.list_polls().await?;
            if polls.is_empty() {
                println!("no polls yet");
            }
            for poll in polls {
                println!("{}  {}", poll.id, poll.question);
            }
            Ok(())
        }

        Command::Create { question, options } => {
            let api = HttpPollApi::new(&api_url)?;
            if options.len() < 2 {
                return Err(PollError::TooFewOptions);
            }
            let poll_id = api.create_poll(&question, &options).await?;
            println!("created poll {poll_id}");
            Ok(())
        }

        Command::Show { poll_id } => {
            let api = HttpPollApi::new(&api_url)?;
            let poll = api.get_poll(&poll_id).await?;
            println!("{}", format_results(&poll));
            Ok(())
        }

        Command::Watch { poll_id, period } => {
            let period = period
                .or_else(|| env::var("RUSTY_POLL_PERIOD_SECS").ok().and_then(|s| s.parse().ok()))
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REFRESH_PERIOD);
            let api: Arc<dyn PollApi> = Arc::new(HttpPollApi::new(&api_url)?);
            watch(api, &ballots_path, &poll_id, period).await
        }

        Command::Vote { poll_id, option } => {
            let api = Arc::new(HttpPollApi::new(&api_url)?);
            let store = BallotStore::load(&ballots_path)?;
            let mut guard = BallotGuard::new(api.clone(), store);

            let poll = api.get_poll(&poll_id).await?;
            let updated = guard.cast(&poll, &option).await?;
            println!("{}", format_results(&updated));
            Ok(())
        }
    }
}

async fn watch(
    api: Arc<dyn PollApi>,
    ballots_path: &Path,
    poll_id: &str,
    period: Duration,
) -> Result<(), PollError> {
    let ballots = BallotStore::load(ballots_path)?;
    match ballots.choice(poll_id) {
        Some(record) => println!("you already voted '{}' on this poll", record.option),
        None => println!("no vote cast from this client yet"),
    }

    let mut watcher = PollWatcher::spawn(api, poll_id, period);
    let mut view_rx = watcher.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = view_rx.changed() => {
                if changed.is_err() {
                    warn!("refresh task ended unexpectedly");
                    break;
                }
                let view = view_rx.borrow_and_update().clone();
                match view {
                    PollView::Pending => {}
                    PollView::Missing => println!("poll {poll_id} not found"),
                    PollView::Live(poll) => println!("{}\n", format_results(&poll)),
                }
            }
        }
    }

    watcher.stop().await;
    Ok(())
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
