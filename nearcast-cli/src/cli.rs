use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use inquire::{Confirm, CustomType, Select, Text};
use nearcast_core::{
    Config, Coordinates, RenderContext, Renderer, Screen, TriggerOutcome, WeatherFlow,
    location::{ConfiguredLocation, PermissionGate, StaticPermission},
    preferences::FilePreferenceStore,
    provider::{HttpIconLoader, source_from_config},
};
use std::{path::PathBuf, sync::Arc};
use tracing::debug;

use crate::terminal::{PromptPermissionGate, TerminalNotifier, TerminalScreen};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "nearcast", version, about = "Current weather where you are")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the API key and the location this machine reports.
    Configure,

    /// Fetch once and print the screen.
    Show {
        #[command(flatten)]
        location: LocationArgs,

        /// Also write the condition icon (PNG) to this path.
        #[arg(long)]
        icon_out: Option<PathBuf>,
    },

    /// Open the weather screen; refresh on demand.
    Run {
        #[command(flatten)]
        location: LocationArgs,
    },
}

#[derive(Debug, Args)]
pub struct LocationArgs {
    /// Latitude of the current fix; overrides the configured one.
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude of the current fix; overrides the configured one.
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Grant location access without asking.
    #[arg(long)]
    pub allow_location: bool,
}

impl LocationArgs {
    fn fix(&self, config: &Config) -> Option<Coordinates> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => config.location,
        }
    }

    fn gate(&self, config: &Config) -> Arc<dyn PermissionGate> {
        if self.allow_location {
            Arc::new(StaticPermission::granted())
        } else {
            Arc::new(PromptPermissionGate::new(config.location_authorized))
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { location, icon_out } => show(&location, icon_out).await,
            Command::Run { location } => interactive(&location).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Text::new("OpenWeather API key:")
        .with_initial_value(config.api_key.as_deref().unwrap_or_default())
        .prompt()?;
    config.set_api_key(api_key.trim().to_string());

    if Confirm::new("Set the location this machine reports?").with_default(true).prompt()? {
        let latitude = CustomType::<f64>::new("Latitude:")
            .with_error_message("Please type a decimal number")
            .prompt()?;
        let longitude = CustomType::<f64>::new("Longitude:")
            .with_error_message("Please type a decimal number")
            .prompt()?;
        config.set_location(Coordinates::new(latitude, longitude));
    }

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn build(
    config: &Config,
    args: &LocationArgs,
    sink: TerminalScreen,
) -> anyhow::Result<(WeatherFlow, RenderContext)> {
    let source = source_from_config(config)?;
    let renderer = Renderer::new(config.display.clone(), config.icon_base_url.clone());

    let (ctx, ui) = RenderContext::new(
        renderer,
        Arc::new(HttpIconLoader::new()),
        Arc::new(TerminalNotifier),
        Arc::new(sink),
    );

    let flow = WeatherFlow::new(
        args.gate(config),
        Arc::new(ConfiguredLocation::new(args.fix(config))),
        Arc::new(FilePreferenceStore::open_default()?),
        Arc::new(source),
        ui,
    );

    Ok((flow, ctx))
}

async fn show(args: &LocationArgs, icon_out: Option<PathBuf>) -> anyhow::Result<()> {
    let config = Config::load()?;
    let (flow, ctx) = build(&config, args, TerminalScreen::quiet())?;

    let outcome = flow.trigger().await;
    debug!(?outcome, "trigger finished");
    if outcome == TriggerOutcome::NoLocation {
        println!("No location available. Pass --lat/--lon or run `nearcast configure`.");
    }
    drop(flow);

    let screen = ctx.run().await;
    if screen == Screen::default() {
        return Ok(());
    }
    println!("{screen}");

    if let Some(path) = icon_out {
        match screen.icon.and_then(|icon| icon.image) {
            Some(image) => std::fs::write(&path, image)
                .with_context(|| format!("Failed to write icon: {}", path.display()))?,
            None => eprintln!("! Icon could not be loaded"),
        }
    }

    Ok(())
}

const REFRESH: &str = "Refresh weather";
const QUIT: &str = "Quit";

async fn interactive(args: &LocationArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let (flow, ctx) = build(&config, args, TerminalScreen::live())?;
    let render = tokio::spawn(ctx.run());

    loop {
        let choice = tokio::task::spawn_blocking(|| {
            Select::new("nearcast", vec![REFRESH, QUIT]).prompt()
        })
        .await??;

        if choice == QUIT {
            break;
        }

        if flow.trigger().await == TriggerOutcome::NoLocation {
            debug!("refresh skipped, no location");
        }
    }

    // Fetches still in flight are dropped with the screen.
    render.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location_args(argv: &[&str]) -> LocationArgs {
        let mut full = vec!["nearcast", "show"];
        full.extend_from_slice(argv);

        match Cli::try_parse_from(full).expect("arguments should parse").command {
            Command::Show { location, .. } => location,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    fn configured() -> Config {
        let mut config = Config::default();
        config.set_location(Coordinates::new(51.5, -0.12));
        config
    }

    #[test]
    fn flags_override_configured_fix() {
        let args = location_args(&["--lat", "-33.9", "--lon", "18.4"]);
        assert_eq!(args.fix(&configured()), Some(Coordinates::new(-33.9, 18.4)));
    }

    #[test]
    fn configured_fix_is_used_without_flags() {
        let args = location_args(&[]);
        assert_eq!(args.fix(&configured()), Some(Coordinates::new(51.5, -0.12)));
        assert_eq!(args.fix(&Config::default()), None);
    }

    #[test]
    fn lat_requires_lon() {
        assert!(Cli::try_parse_from(["nearcast", "show", "--lat", "1.0"]).is_err());
    }

    #[test]
    fn allow_location_bypasses_prompt() {
        let args = location_args(&["--allow-location"]);
        assert!(args.gate(&Config::default()).is_granted());
    }

    #[test]
    fn gate_follows_remembered_grant() {
        let args = location_args(&[]);
        assert!(!args.gate(&Config::default()).is_granted());

        let mut config = Config::default();
        config.location_authorized = true;
        assert!(args.gate(&config).is_granted());
    }
}
