mod config;
mod display;
mod watch;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use safelink_client::http::debug_check_failure;
use safelink_client::sync::{transition_detail, transition_in_list};
use safelink_client::{AlertQuery, ApiClient, ApiError, ErrorKind, SessionStore};
use safelink_core::view::{AlertFilter, category_preset};
use safelink_core::{
    AlertFeed, AlertId, AlertStatus, DebugCheckRequest, Feedback, FeedbackDecision, NewUser,
    ReviewAction, ReviewState, Role, Severity,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Settings;

#[derive(Parser)]
#[command(name = "safelink", version, about = "Review harmful-content alerts raised by SafeLink")]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and store the session token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "SAFELINK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Dashboard of new alerts: stats, critical bucket, and live feed.
    Alerts(FilterArgs),
    /// Live dashboard that follows pushed alerts until you quit.
    Watch(FilterArgs),
    /// Server-side alert search.
    Search(SearchArgs),
    /// Investigation queue or resolved archive.
    Cases {
        #[arg(value_enum)]
        queue: Queue,
    },
    /// Full alert record with evidence.
    Show { id: AlertId },
    /// Report a new alert to the authorities (moves it to investigating).
    Report { id: AlertId },
    /// Resolve a case from the investigation queue.
    Resolve { id: AlertId },
    /// Move an alert to investigating or resolved from its detail record.
    Transition { id: AlertId, status: AlertStatus },
    /// Approve or reject the classifier's verdict.
    Feedback {
        id: AlertId,
        #[arg(long)]
        decision: FeedbackDecision,
        #[arg(long = "category")]
        corrected_category: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List users, or add one (admin only).
    Users {
        #[command(subcommand)]
        action: Option<UsersCommand>,
    },
    /// Re-run the classifier on ad-hoc input.
    Debug {
        #[arg(long)]
        text: String,
        #[arg(long)]
        lang: Option<String>,
        #[arg(long)]
        video_path: Option<String>,
        /// Skip audio transcription for the video.
        #[arg(long)]
        no_audio: bool,
    },
}

#[derive(Subcommand)]
enum UsersCommand {
    Add {
        #[arg(long)]
        email: String,
        #[arg(long, env = "SAFELINK_NEW_USER_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "MODERATOR")]
        role: Role,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Queue {
    Investigating,
    Resolved,
}

impl Queue {
    fn scope(self) -> AlertStatus {
        match self {
            Self::Investigating => AlertStatus::Investigating,
            Self::Resolved => AlertStatus::Resolved,
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::Investigating => "Investigation Queue",
            Self::Resolved => "Resolved Cases",
        }
    }
}

#[derive(clap::Args)]
struct FilterArgs {
    #[arg(long)]
    severity: Option<Severity>,
    /// Category preset: all, harassment, hate-speech, child-abuse,
    /// elder-abuse, violent-act, murder-threat.
    #[arg(long, default_value = "all")]
    category: String,
    /// Free-text match against the whole alert.
    #[arg(long, short)]
    query: Option<String>,
}

impl FilterArgs {
    fn filter(&self) -> AlertFilter {
        AlertFilter {
            query: self.query.clone().unwrap_or_default(),
            severity: self.severity,
            category: category_preset(&self.category),
        }
    }
}

#[derive(clap::Args)]
struct SearchArgs {
    #[arg(long)]
    status: Option<AlertStatus>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    severity: Option<Severity>,
    #[arg(long, short)]
    q: Option<String>,
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    limit: Option<u32>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.settings.log).context("invalid log filter")?)
        .with_writer(std::io::stderr)
        .init();
    info!("safelink v{}", env!("CARGO_PKG_VERSION"));

    let store = cli.settings.session_store();
    let config = cli.settings.client_config();
    let mut api = ApiClient::new(&config).context("building HTTP client")?;
    if let Some(session) = store.load().context("reading stored session")? {
        api = api.with_session(session);
    }

    if let Err(e) = dispatch(cli.command, &api, &store, &config).await {
        report_failure(&e, &store)?;
    }
    Ok(())
}

/// Render a command failure. A rejected token is treated as expiry and
/// dropped from the store.
fn report_failure(err: &anyhow::Error, store: &SessionStore) -> anyhow::Result<()> {
    let api_err = err.chain().find_map(|c| c.downcast_ref::<ApiError>());
    match api_err {
        Some(e) if e.is_session_expired() => {
            warn!(error = %e, "session rejected, clearing stored token");
            store.clear().context("clearing stored session")?;
            eprintln!("Session expired. Sign in again with `safelink login`.");
        }
        Some(e) if e.kind() == ErrorKind::Network => {
            eprintln!("{err}: could not reach the SafeLink API ({e})");
        }
        _ => eprintln!("{err:#}"),
    }
    Ok(())
}

async fn dispatch(
    command: Command,
    api: &ApiClient,
    store: &SessionStore,
    config: &safelink_client::ClientConfig,
) -> anyhow::Result<()> {
    match command {
        Command::Login { email, password } => {
            let session = match api.login(&email, &password).await {
                Ok(session) => session,
                Err(e) if e.is_unauthorized() => {
                    anyhow::bail!("Login failed: invalid email or password")
                }
                Err(e) => return Err(anyhow::Error::new(e).context("Login failed")),
            };
            store.save(&session)?;
            let user = api
                .clone()
                .with_session(session)
                .current_user()
                .await
                .context("Login failed")?;
            println!("Signed in as {} ({}).", user.email, user.role);
        }
        Command::Logout => {
            store.clear()?;
            println!("Signed out.");
        }
        Command::Whoami => {
            let user = api.current_user().await.context("Failed to load user")?;
            println!("{} ({}), user #{}", user.email, user.role, user.id);
        }
        Command::Alerts(args) => {
            let mut feed = AlertFeed::new(AlertStatus::New);
            watch::load_feed(api, &mut feed).await?;
            display::print_dashboard(&feed, &args.filter(), &ReviewState::new(), Utc::now());
        }
        Command::Watch(args) => watch::run(api, config, &args.filter()).await?,
        Command::Search(args) => {
            let query = AlertQuery {
                status: args.status,
                category: args.category,
                severity: args.severity,
                q: args.q,
                page: args.page,
                limit: args.limit,
            };
            let alerts = api.search_alerts(&query).await.context("Failed to load alerts.")?;
            display::print_alert_list(&alerts, Utc::now());
        }
        Command::Cases { queue } => {
            let mut feed = AlertFeed::new(queue.scope());
            watch::load_feed(api, &mut feed).await?;
            display::print_queue(queue.title(), &feed, &ReviewState::new(), Utc::now());
        }
        Command::Show { id } => {
            let detail = api.get_alert(id).await.context("Failed to load alert")?;
            display::print_alert_card(&detail, api.base_url(), Utc::now());
        }
        Command::Report { id } => {
            let action = ReviewAction::ReportToAuthority;
            transition_from_queue(api, AlertStatus::New, id, action).await?;
        }
        Command::Resolve { id } => {
            let action = ReviewAction::MarkResolved;
            transition_from_queue(api, AlertStatus::Investigating, id, action).await?;
        }
        Command::Transition { id, status } => {
            let action = ReviewAction::for_target(status)?;
            let mut detail = api.get_alert(id).await.context("Failed to load alert")?;
            let mut review = ReviewState::new();
            println!("{}", action.busy_label());
            let done = transition_detail(api, &mut review, &mut detail, action).await?;
            println!("{}", done.outcome.message);
            if done.outcome.succeeded {
                if done.refreshed {
                    display::print_alert_card(&detail, api.base_url(), Utc::now());
                } else {
                    println!("Could not reload alert #{id}.");
                    println!("Run `safelink show {id}` for its current state.");
                }
            }
        }
        Command::Feedback {
            id,
            decision,
            corrected_category,
            notes,
        } => {
            let feedback = Feedback {
                decision,
                corrected_category: corrected_category.filter(|c| !c.trim().is_empty()),
                notes: notes.filter(|n| !n.trim().is_empty()),
            };
            let ack = api
                .submit_feedback(id, &feedback)
                .await
                .context("Failed to submit feedback")?;
            match ack.feedback_id {
                Some(fid) => println!("Feedback #{fid} recorded for alert #{id}."),
                None => println!("Feedback recorded for alert #{id}."),
            }
        }
        Command::Users { action: None } => {
            let users = api.list_users().await.map_err(users_error)?;
            display::print_users(&users);
        }
        Command::Users {
            action: Some(UsersCommand::Add { email, password, role }),
        } => {
            let user = api
                .create_user(&NewUser { email, password, role })
                .await
                .map_err(users_error)?;
            println!("Created user #{} {} ({}).", user.id, user.email, user.role);
        }
        Command::Debug {
            text,
            lang,
            video_path,
            no_audio,
        } => {
            let request = DebugCheckRequest::new(text, lang, video_path, !no_audio);
            match api.run_debug_check(&request).await {
                Ok(result) => display::print_debug_result(&result),
                Err(e) if e.is_session_expired() => return Err(e.into()),
                Err(e) => eprintln!("{}", debug_check_failure(&e)),
            }
        }
    }
    Ok(())
}

/// List-view transition: the alert must be visible in the `scope` queue.
async fn transition_from_queue(
    api: &ApiClient,
    scope: AlertStatus,
    id: AlertId,
    action: ReviewAction,
) -> anyhow::Result<()> {
    let mut feed = AlertFeed::new(scope);
    watch::load_feed(api, &mut feed).await?;
    if let Some(error) = feed.error() {
        anyhow::bail!("{error}");
    }
    if !feed.contains(id) {
        println!("Alert #{id} is not in the {scope} queue.");
        return Ok(());
    }
    let mut review = ReviewState::new();
    println!("{}", action.busy_label());
    let outcome = transition_in_list(api, &mut review, &mut feed, id, action).await?;
    println!("{}", outcome.message);
    Ok(())
}

/// Role refusals get the generic permission message; expiry is passed on.
fn users_error(err: ApiError) -> anyhow::Error {
    if err.is_unauthorized() && !err.is_session_expired() {
        warn!(error = %err, "user management refused");
        anyhow::anyhow!("Only ADMIN can view users")
    } else {
        anyhow::Error::new(err).context("Failed to load users")
    }
}
