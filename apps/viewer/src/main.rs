use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{EpisodeOutcome, InteractionController, SessionStats, StartupMode};
use serde::Serialize;
use shared::{
    domain::{FormField, SurfacePoint, ViewParams},
    protocol::{ContinuationStyle, NavigationIntent},
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    task::JoinHandle,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod surface;

use commands::{parse_command, Command};
use config::{load_settings, Settings};
use surface::DirectorySurface;

#[derive(Parser, Debug)]
#[command(about = "Streams a fractal view tile by tile and navigates it from stdin")]
struct Args {
    #[arg(long, default_value = "viewer.toml")]
    config: PathBuf,
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Start with a parameterless request instead of `reset=1`.
    #[arg(long)]
    bare_startup: bool,
    /// Send `ctd=1` on follow-up requests instead of nothing.
    #[arg(long)]
    ctd_marker: bool,
    /// Print the final view and session counters as JSON on exit.
    #[arg(long)]
    json: bool,
}

impl Args {
    fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(endpoint) = &self.endpoint {
            settings.endpoint = endpoint.clone();
        }
        if let Some(dir) = &self.output_dir {
            settings.output_dir = dir.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            settings.timeout_ms = timeout_ms;
        }
        if self.bare_startup {
            settings.startup = StartupMode::Bare;
        }
        if self.ctd_marker {
            settings.continuation = ContinuationStyle::Marker;
        }
        settings
    }
}

#[derive(Serialize)]
struct SessionSummary {
    view: Option<ViewParams>,
    stats: SessionStats,
}

type Running = Option<JoinHandle<EpisodeOutcome>>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings = args.apply(load_settings(&args.config));
    let client_config = settings
        .client_config()
        .context("invalid viewer configuration")?;
    let surface = Arc::new(DirectorySurface::create(&settings.output_dir)?);
    let controller = InteractionController::over_http(&client_config, surface.clone())
        .context("failed to build tile client")?;
    info!(
        endpoint = %client_config.endpoint,
        output_dir = %settings.output_dir.display(),
        "viewer started"
    );

    let mut running: Running = controller.startup();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                warn!(%err, line = %line, "ignoring command");
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Wait => wait_for(&mut running).await,
            Command::Status => print_status(&controller, &surface),
            Command::Set(edits) => surface.edit_form(&edits),
            other => {
                let name = other.name();
                if let Some(handle) = handle_intent(&controller, &surface, other) {
                    running = Some(handle);
                } else {
                    info!(command = name, busy = controller.is_busy(), "input ignored");
                }
            }
        }
    }

    wait_for(&mut running).await;
    if args.json {
        let summary = SessionSummary {
            view: controller.last_view(),
            stats: controller.stats(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_status(&controller, &surface);
    }
    Ok(())
}

fn handle_intent(
    controller: &Arc<InteractionController>,
    surface: &DirectorySurface,
    command: Command,
) -> Running {
    match command {
        Command::Key(key) => controller.key_pressed(key),
        Command::Click { x, y } => {
            controller.surface_clicked(SurfacePoint::from_offsets(x, y, 0.0, 0.0))
        }
        Command::Submit(edits) => {
            surface.edit_form(&edits);
            controller.dispatch(NavigationIntent::form_from_view(&surface.form(), &[]))
        }
        Command::Set(_) | Command::Wait | Command::Status | Command::Quit => None,
    }
}

async fn wait_for(running: &mut Running) {
    let Some(handle) = running.take() else {
        return;
    };
    match handle.await {
        Ok(EpisodeOutcome::Completed(view)) => info!(x = %view.x, y = %view.y, "view ready"),
        Ok(EpisodeOutcome::SilentEnd) => info!("episode ended without a view"),
        Ok(EpisodeOutcome::Failed(err)) => warn!(%err, "episode failed"),
        Err(err) => error!(%err, "episode task aborted"),
    }
}

fn print_status(controller: &InteractionController, surface: &DirectorySurface) {
    let form = surface.form();
    let fields: Vec<String> = FormField::ALL
        .iter()
        .map(|field| format!("{}={}", field.label(), form.get(*field)))
        .collect();
    let stats = controller.stats();
    println!(
        "{} busy={} tiles={} episodes={} rejected={}",
        fields.join(" "),
        controller.is_busy(),
        surface.written_tiles().len(),
        stats.accepted,
        stats.rejected
    );
}
