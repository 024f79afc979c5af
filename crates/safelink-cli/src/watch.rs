//! Live dashboard: snapshot, then pushes and operator commands on one task.

use chrono::Utc;
use safelink_client::sync::{refresh, transition_in_list};
use safelink_client::{ApiClient, ApiError, ClientConfig, ErrorKind, PushStream};
use safelink_core::feed::load_failure_message;
use safelink_core::view::AlertFilter;
use safelink_core::{Alert, AlertFeed, AlertId, AlertStatus, PushOutcome, ReviewAction, ReviewState};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::display;

const HELP: &str = "commands: refresh | report <id> | help | quit";

#[derive(Debug, PartialEq, Eq)]
enum WatchCommand {
    Refresh,
    Report(AlertId),
    Help,
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> Option<WatchCommand> {
    let mut parts = line.split_whitespace();
    let verb = parts.next()?.to_ascii_lowercase();
    let arg = parts.next();
    Some(match (verb.as_str(), arg) {
        ("r" | "refresh", None) => WatchCommand::Refresh,
        ("report", Some(id)) => match id.trim_start_matches('#').parse() {
            Ok(id) => WatchCommand::Report(id),
            Err(_) => WatchCommand::Unknown(line.trim().to_string()),
        },
        ("h" | "help" | "?", None) => WatchCommand::Help,
        ("q" | "quit" | "exit", None) => WatchCommand::Quit,
        _ => WatchCommand::Unknown(line.trim().to_string()),
    })
}

/// Wait for the next push, or forever once there is no connection.
async fn next_push(push: &mut Option<PushStream>) -> Option<Result<Alert, ApiError>> {
    match push {
        Some(stream) => stream.next_alert().await,
        None => std::future::pending().await,
    }
}

/// Operator input on a plain thread. The channel closes at end of input.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "reading operator input failed");
                    break;
                }
            }
        }
    });
    rx
}

/// Load a status-scoped feed. A failed load stays on the feed for the view
/// to render; only an expired session aborts the caller.
pub async fn load_feed(api: &ApiClient, feed: &mut AlertFeed) -> anyhow::Result<()> {
    match refresh(api, feed).await {
        Err(e) if e.is_session_expired() => {
            Err(anyhow::Error::new(e).context(load_failure_message(feed.scope())))
        }
        _ => Ok(()),
    }
}

fn render(feed: &AlertFeed, filter: &AlertFilter, review: &ReviewState) {
    display::print_dashboard(feed, filter, review, Utc::now());
    println!("{HELP}");
}

/// Run the live dashboard until the operator quits, presses Ctrl-C, or
/// closes stdin. The push connection is closed on every exit path.
pub async fn run(
    api: &ApiClient,
    config: &ClientConfig,
    filter: &AlertFilter,
) -> anyhow::Result<()> {
    let mut feed = AlertFeed::new(AlertStatus::New);
    let mut review = ReviewState::new();
    load_feed(api, &mut feed).await?;

    let connected = PushStream::connect_within(&config.alerts_ws_url(), config.timeout).await;
    let mut push = match connected {
        Ok(stream) => {
            info!(url = stream.url(), "live updates connected");
            Some(stream)
        }
        Err(e) => {
            warn!(error = %e, "live updates unavailable");
            eprintln!("Live updates unavailable; use `refresh` to resync.");
            None
        }
    };
    render(&feed, filter, &review);

    let mut lines = spawn_stdin_reader();

    let result = loop {
        tokio::select! {
            pushed = next_push(&mut push) => match pushed {
                Some(Ok(alert)) => {
                    let id = alert.id;
                    match feed.merge_push(alert) {
                        PushOutcome::Ignored => info!(id, "push outside feed scope ignored"),
                        _ => render(&feed, filter, &review),
                    }
                }
                Some(Err(e)) if e.kind() == ErrorKind::MalformedPushMessage => {
                    warn!(error = %e, "dropping malformed push message");
                }
                Some(Err(e)) => {
                    warn!(error = %e, "live updates stopped");
                    eprintln!("Live updates stopped; use `refresh` to resync.");
                    if let Some(stream) = push.take()
                        && let Err(e) = stream.close().await
                    {
                        warn!(error = %e, "closing push stream failed");
                    }
                }
                None => {
                    eprintln!("Live updates ended; use `refresh` to resync.");
                    push = None;
                }
            },
            line = lines.recv() => match line {
                Some(line) => match parse_command(&line) {
                    None => {}
                    Some(WatchCommand::Quit) => break Ok(()),
                    Some(WatchCommand::Help) => println!("{HELP}"),
                    Some(WatchCommand::Refresh) => {
                        if let Err(e) = load_feed(api, &mut feed).await {
                            break Err(e);
                        }
                        render(&feed, filter, &review);
                    }
                    Some(WatchCommand::Report(id)) => {
                        if !feed.contains(id) {
                            println!("Alert #{id} is not in the live feed.");
                            continue;
                        }
                        println!("{}", ReviewAction::ReportToAuthority.busy_label());
                        let action = ReviewAction::ReportToAuthority;
                        match transition_in_list(api, &mut review, &mut feed, id, action).await {
                            Ok(outcome) => {
                                render(&feed, filter, &review);
                                println!("{}", outcome.message);
                            }
                            Err(e) => println!("{e}"),
                        }
                    }
                    Some(WatchCommand::Unknown(input)) => {
                        println!("Unknown command {input:?}. {HELP}")
                    }
                },
                None => {
                    info!("operator input closed, leaving watch mode");
                    break Ok(());
                }
            },
            _ = tokio::signal::ctrl_c() => break Ok(()),
        }
    };

    if let Some(stream) = push.take()
        && let Err(e) = stream.close().await
    {
        warn!(error = %e, "closing push stream failed");
    }
    result
}
