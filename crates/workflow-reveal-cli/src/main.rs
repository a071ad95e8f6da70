//! Reveal a streamed workflow run in the terminal.
//!
//! Usage:
//!   workflow-reveal https://www.douyin.com/video/7522          # video runner
//!   workflow-reveal --runner home https://www.douyin.com/user/x # home runner
//!   workflow-reveal --json https://v.test/1                    # final view as JSON
//!
//! Ctrl-C cancels the run silently.

mod render;

use std::io::Write as _;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use workflow_reveal::observability::init_observability;
use workflow_reveal::prelude::*;

use crate::render::{TextRenderer, summary};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Runner {
    /// Single video link; payloads carry a link.
    Video,
    /// Profile home page; payloads carry no link.
    Home,
}

#[derive(Parser)]
#[command(name = "workflow-reveal")]
#[command(about = "Run a workflow and reveal its streamed text chunk by chunk")]
struct Args {
    /// Link submitted to the workflow
    input: String,

    /// Which page preset to run
    #[arg(short, long, value_enum, default_value_t = Runner::Video)]
    runner: Runner,

    /// Override the workflow endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Delay between revealed chunks in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Print the raw frame log to stderr when the run ends
    #[arg(long)]
    raw_log: bool,

    /// Print the final view as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        let preset = match self.runner {
            Runner::Video => PipelineConfig::video_runner(),
            Runner::Home => PipelineConfig::home_runner(),
        };
        let mut config = preset.with_env();
        if let Some(endpoint) = &self.endpoint {
            config = config.endpoint(endpoint.clone());
        }
        if let Some(ms) = self.interval_ms {
            config = config.reveal_interval(Duration::from_millis(ms));
        }
        if self.raw_log {
            config = config.debug(true);
        }
        config
    }
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_observability();
    let args = Args::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&args)) {
        Ok(view) => finish(&args, &view),
        Err(e) => {
            eprintln!("error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<ViewState, RevealError> {
    let mut controller = RevealController::with_reqwest(args.pipeline_config())?;
    let mut updates = controller.subscribe();
    let session = controller.submit(&args.input)?;
    tracing::info!(
        session_id = %session.session_id(),
        endpoint = %controller.config().endpoint,
        "workflow run started"
    );

    let abort = session.abort_handle();
    let mut renderer = TextRenderer::default();
    let mut done = std::pin::pin!(session.wait());
    let mut watching = true;
    let view = loop {
        tokio::select! {
            result = &mut done => break result?,
            changed = updates.changed(), if watching => {
                if changed.is_err() {
                    watching = false;
                    continue;
                }
                let snapshot = updates.borrow_and_update().clone();
                print_fresh(&mut renderer, &snapshot);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("cancelling workflow run");
                abort.abort();
            }
        }
    };
    print_fresh(&mut renderer, &view);
    Ok(view)
}

fn print_fresh(renderer: &mut TextRenderer, view: &ViewState) {
    if let Some(fresh) = renderer.render(view) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(fresh.as_bytes());
        let _ = stdout.flush();
    }
}

fn finish(args: &Args, view: &ViewState) -> ExitCode {
    println!();
    if args.raw_log
        && let Some(raw) = &view.raw_log
    {
        eprintln!("{raw}");
    }
    if args.json {
        match serde_json::to_string_pretty(view) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("failed to serialize view: {e}"),
        }
    } else {
        for line in summary(view) {
            println!("{line}");
        }
    }
    match view.outcome() {
        Err(e) if !e.is_cancelled() => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}
