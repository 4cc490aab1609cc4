//! CLI entry point for the notification hook binary.
//!
//! # Architecture overview
//!
//! `main.rs` is the thin coordination layer between the CLI surface and
//! the library crate. Its responsibilities are:
//!
//! 1. Parse CLI arguments (via `clap`).
//! 2. Initialize `tracing` once, level controlled by `RUST_LOG`.
//! 3. Dispatch to the `handle-hook`, `daemon`, or `focus-window`
//!    subcommand.
//!
//! `handle-hook` is the hot path, invoked fresh by Claude Code for every
//! lifecycle event: parse the stdin envelope, classify, dedup, gate on
//! cooldowns and the subject filter, deliver, then exit. Every stage
//! degrades rather than panics — a broken notification must never fail
//! the tool call it's reporting on.
//!
//! # Exit codes
//!
//! - `0` — delivered, suppressed by policy, or dropped by dispatch; all
//!   expected outcomes.
//! - `1` — the stdin envelope was not valid JSON.
//! - `2` — the event kind argument was not recognized.
//! - `3` — `--validate-config` found an invalid configuration.

use std::io::Read;

use clap::{Parser as ClapParser, Subcommand};

use clnotify::analyzer::{self, AnalyzerConfig};
use clnotify::config::Config;
use clnotify::dedup;
use clnotify::envelope::{self, Dispatch, EventKind};
use clnotify::notifier::{self, DeliveryInput, SoundScope};
use clnotify::session_state::{self, SessionStateRecord};
use clnotify::subject_filter;
use clnotify::summary::{self, SummaryInput};
use clnotify::transcript::Classification;
use clnotify::transcript_reader;
use clnotify::webhook::formatter::WebhookMessage;
use clnotify::webhook::WebhookEngine;
use clnotify::{cleanup, git};

#[derive(ClapParser)]
#[command(name = "clnotify", about = "Hook-driven notifications for AI coding assistant sessions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Handle a single lifecycle hook invocation; reads the envelope from stdin.
    HandleHook {
        /// One of: pre-tool-use, notification, stop, subagent-stop.
        event_kind: String,

        /// Load and validate configuration, then exit 3 on failure instead
        /// of processing an event.
        #[arg(long)]
        validate_config: bool,
    },
    /// Run the optional long-lived notification sidecar.
    Daemon,
    /// Stub: bringing a terminal window to the foreground is out of scope.
    FocusWindow,
    /// Print the crate version.
    Version,
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Command::HandleHook { event_kind, validate_config } => {
            if validate_config {
                run_validate_config()
            } else {
                run_handle_hook(&event_kind)
            }
        }
        Command::Daemon => {
            if let Err(e) = clnotify::daemon::run() {
                tracing::error!(error = %e, "daemon exited with error");
                1
            } else {
                0
            }
        }
        Command::FocusWindow => {
            clnotify::focus::run();
            0
        }
        Command::Version => {
            println!("clnotify {}", env!("CARGO_PKG_VERSION"));
            0
        }
    };

    std::process::exit(exit_code);
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

fn run_validate_config() -> i32 {
    let config = Config::load();
    match config.validate() {
        Ok(()) => {
            println!("config is valid");
            0
        }
        Err(e) => {
            eprintln!("invalid config: {e}");
            3
        }
    }
}

fn run_handle_hook(event_kind_raw: &str) -> i32 {
    let config = Config::load();

    let mut stdin_bytes = Vec::new();
    if let Err(e) = std::io::stdin().read_to_end(&mut stdin_bytes) {
        tracing::error!(error = %e, "failed to read stdin");
        return 1;
    }

    let envelope = match envelope::parse_envelope(&stdin_bytes) {
        Ok(env) => env,
        Err(e) => {
            tracing::error!(error = %e, "failed to parse hook envelope");
            return 1;
        }
    };

    if envelope::is_judge_mode_active(&config) {
        tracing::debug!("judge mode active, dropping");
        return 0;
    }

    let event = match EventKind::parse(event_kind_raw) {
        Ok(kind) => kind,
        Err(e) => {
            tracing::error!(error = %e, "unknown event kind");
            return 2;
        }
    };

    let (classification, window) = match envelope::dispatch(event, &envelope, &config) {
        Dispatch::Drop(reason) => {
            tracing::debug!(reason, "dropping invocation");
            return 0;
        }
        Dispatch::Classified(classification) => (classification, Vec::new()),
        Dispatch::RunAnalyzer => {
            let entries = match transcript_reader::read_transcript(std::path::Path::new(&envelope.transcript_path)) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::error!(error = %e, "failed to read transcript");
                    return 0;
                }
            };
            let analyzer_config = AnalyzerConfig { notify_on_text_response: config.behavior.notify_on_text_response };
            let result = analyzer::analyze(&entries, &analyzer_config);
            if result.classification.is_unknown() {
                tracing::debug!("analyzer produced no classification");
                return 0;
            }
            (result.classification, result.recent_window)
        }
    };

    let event_name = &envelope.hook_event_name;
    if !dedup::probe(&envelope.session_id, event_name) {
        tracing::debug!("early dedup probe found a concurrent winner");
        return 0;
    }
    if !dedup::acquire(&envelope.session_id, event_name) {
        tracing::debug!("lost dedup race for this event");
        return 0;
    }

    let summary_input = SummaryInput {
        classification: &classification,
        window: &window,
        cwd: &envelope.cwd,
        session_id: &envelope.session_id,
    };
    let message = summary::generate_summary(&summary_input);

    if !dedup::acquire_content_lock(&envelope.session_id, &message) {
        tracing::debug!("lost content-hash dedup race");
        return 0;
    }

    let mut record = SessionStateRecord::load(&envelope.session_id);
    let now = now_epoch();

    if matches!(classification, Classification::Question) {
        if session_state::should_suppress_question(&record, now, config.behavior.cooldown_after_complete_secs()) {
            tracing::debug!("question suppressed by post-completion cooldown");
            return 0;
        }
        if session_state::should_suppress_any(&record, now, config.behavior.cooldown_after_any_secs()) {
            tracing::debug!("question suppressed by any-notification cooldown");
            return 0;
        }
    }

    if session_state::is_duplicate_message(&record, &message, now, 180) {
        tracing::debug!("duplicate message suppressed");
        return 0;
    }

    let branch = git::resolve_git_branch(&envelope.cwd);
    let folder = folder_name(&envelope.cwd);
    if subject_filter::matches_any(&config.behavior.subject_filter, &classification, branch.as_deref(), &folder) {
        tracing::debug!("subject filter matched, dropping");
        return 0;
    }

    let title = title_for(&classification);
    let scope = SoundScope::new();
    let transport = notifier::default_transport();
    let delivery = DeliveryInput { classification: &classification, title: &title, body: &message };
    // The spawned sound thread is intentionally not joined here: SoundScope
    // already bounds its own completion (up to a 30s safety timeout) in
    // begin_shutdown() below, so joining it first would make that bound
    // moot if the thread were to hang.
    let _ = notifier::deliver(&config, &scope, transport.as_ref(), &delivery);

    let webhook_engine = if config.webhook.is_enabled() {
        Some(WebhookEngine::new(config.webhook.clone()))
    } else {
        None
    };
    if let Some(engine) = &webhook_engine {
        engine.send_async(WebhookMessage {
            title: title.clone(),
            body: message.clone(),
            status: classification.status_key().to_string(),
            session_id: envelope.session_id.clone(),
            timestamp: now,
        });
    }

    if let Some(engine) = &webhook_engine {
        engine.shutdown(clnotify::webhook::DEFAULT_SHUTDOWN_TIMEOUT);
    }
    scope.begin_shutdown();

    session_state::record_notification(&mut record, &classification, &message, &envelope.cwd, now);
    if let Err(e) = record.save() {
        tracing::warn!(error = %e, "failed to persist session state");
    }

    cleanup::sweep(cleanup::DEFAULT_MAX_AGE);

    0
}

fn title_for(classification: &Classification) -> String {
    match classification {
        Classification::TaskComplete => "Task complete".to_string(),
        Classification::ReviewComplete => "Review complete".to_string(),
        Classification::Question => "Question".to_string(),
        Classification::PlanReady => "Plan ready".to_string(),
        Classification::SessionLimitReached => "Session limit reached".to_string(),
        Classification::ApiError(_) => "API error".to_string(),
        Classification::Unknown => "Notification".to_string(),
    }
}

fn folder_name(cwd: &str) -> String {
    std::path::Path::new(cwd)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn now_epoch() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
