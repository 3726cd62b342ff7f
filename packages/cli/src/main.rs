#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line client for the live ocean hazard map.
//!
//! ```text
//! hazard_map watch [--bounds N,S,E,W] [--for-secs 600]
//! hazard_map snapshot [--bounds N,S,E,W] [--no-heatmap] [--output scene.geojson]
//! hazard_map submit --title .. --description .. --location .. --lat .. --lng .. [--media a.jpg]
//! hazard_map login --username ..
//! ```
//!
//! Every command reads the built-in configuration, then `--config` if
//! given, then `HAZARD_MAP_API_URL`, `HAZARD_MAP_WS_URL` and
//! `HAZARD_MAP_TOKEN`.

mod commands;

use std::path::PathBuf;
use std::str::FromStr as _;

use clap::{Args, Parser, Subcommand};
use hazard_map_hazard_models::{HazardCategory, Severity};
use hazard_map_map_models::BoundingBox;
use hazard_map_submission::ReportDraft;
use hazard_map_sync::ClientConfig;

#[derive(Parser)]
#[command(name = "hazard_map", about = "Live ocean hazard map client")]
struct Cli {
    /// TOML file overriding the built-in configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the map, follow live updates and log every change
    Watch {
        /// Pan to this rectangle after loading (north,south,east,west)
        #[arg(long, value_parser = parse_bounds)]
        bounds: Option<BoundingBox>,
        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long)]
        for_secs: Option<u64>,
    },
    /// Load the map once and print it as GeoJSON
    Snapshot {
        /// Pan to this rectangle after loading (north,south,east,west)
        #[arg(long, value_parser = parse_bounds)]
        bounds: Option<BoundingBox>,
        #[arg(long)]
        no_heatmap: bool,
        #[arg(long)]
        no_markers: bool,
        #[arg(long)]
        no_hotspots: bool,
        /// Write the GeoJSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Submit a hazard report
    Submit(SubmitArgs),
    /// Log in and print the access token
    Login {
        #[arg(long)]
        username: String,
        /// Read from `HAZARD_MAP_PASSWORD` when omitted
        #[arg(long, env = "HAZARD_MAP_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Args)]
struct SubmitArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: String,
    /// Hazard category, e.g. `oil_spill` or `algal_bloom`
    #[arg(long, default_value = "oil_spill", value_parser = parse_category)]
    category: HazardCategory,
    /// 1 (minimal) to 5 (critical)
    #[arg(long, default_value = "3", value_parser = parse_severity)]
    severity: Severity,
    /// Place name, e.g. `Juhu Beach`
    #[arg(long)]
    location: String,
    #[arg(long, allow_hyphen_values = true)]
    lat: String,
    #[arg(long, allow_hyphen_values = true)]
    lng: String,
    /// Photo or video to attach (JPEG, PNG, MP4, AVI, MOV); repeatable
    #[arg(long)]
    media: Vec<PathBuf>,
    /// Mark the report as captured offline
    #[arg(long)]
    offline: bool,
    /// Classify the media first and raise the severity if it looks like a
    /// disaster
    #[arg(long)]
    classify: bool,
}

impl SubmitArgs {
    fn draft(&self) -> ReportDraft {
        let mut draft = ReportDraft::new(
            self.title.as_str(),
            self.description.as_str(),
            self.location.as_str(),
            self.lat.as_str(),
            self.lng.as_str(),
        );
        draft.category = self.category;
        draft.severity = self.severity;
        draft.is_offline_report = self.offline;
        draft
    }
}

fn parse_bounds(text: &str) -> Result<BoundingBox, String> {
    let parts = text
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("bounds must be four numbers: {e}"))?;

    let [north, south, east, west] = parts[..] else {
        return Err(format!("expected north,south,east,west, got {} values", parts.len()));
    };
    let bounds = BoundingBox::new(north, south, east, west);
    if bounds.is_valid() {
        Ok(bounds)
    } else {
        Err(format!("{text} is not a valid rectangle"))
    }
}

fn parse_category(text: &str) -> Result<HazardCategory, String> {
    match HazardCategory::from_str(text.trim()) {
        Ok(HazardCategory::Unknown) | Err(_) => Err(format!("unknown hazard category {text:?}")),
        Ok(category) => Ok(category),
    }
}

fn parse_severity(text: &str) -> Result<Severity, String> {
    let value: u8 = text.trim().parse().map_err(|e| format!("{e}"))?;
    Severity::from_value(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .try_init()
        .ok();

    let cli = Cli::parse();
    let config = ClientConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Watch { bounds, for_secs } => commands::watch(&config, bounds, for_secs).await?,
        Commands::Snapshot {
            bounds,
            no_heatmap,
            no_markers,
            no_hotspots,
            output,
        } => {
            let layers = hazard_map_render::LayerToggles {
                heatmap: !no_heatmap,
                markers: !no_markers,
                hotspots: !no_hotspots,
            };
            commands::snapshot(&config, bounds, layers, output.as_deref()).await?;
        }
        Commands::Submit(args) => commands::submit(&config, args).await?,
        Commands::Login { username, password } => {
            commands::login(&config, username, password).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use hazard_map_map_models::Coordinates;

    use super::*;

    #[test]
    fn bounds_argument() {
        assert_eq!(
            parse_bounds("20, 10, 80, 70"),
            Ok(BoundingBox::new(20.0, 10.0, 80.0, 70.0))
        );
        assert!(parse_bounds("10,20,80,70").is_err());
        assert!(parse_bounds("20,10,80").is_err());
        assert!(parse_bounds("north,10,80,70").is_err());
    }

    #[test]
    fn category_and_severity_arguments() {
        assert_eq!(parse_category("algal_bloom"), Ok(HazardCategory::AlgalBloom));
        assert!(parse_category("unknown").is_err());
        assert!(parse_category("cyclone").is_err());
        assert_eq!(parse_severity("5"), Ok(Severity::Critical));
        assert!(parse_severity("0").is_err());
    }

    #[test]
    fn submit_arguments_make_a_valid_draft() {
        let cli = Cli::try_parse_from([
            "hazard_map",
            "submit",
            "--title",
            "Oil sheen",
            "--description",
            "Rainbow film along the jetty",
            "--category",
            "chemical_spill",
            "--severity",
            "4",
            "--location",
            "Vizhinjam",
            "--lat",
            "8.38",
            "--lng",
            "-76.99",
            "--offline",
        ])
        .unwrap();
        let Commands::Submit(args) = cli.command else {
            panic!("expected submit");
        };

        let submission = args.draft().validate().unwrap();
        assert_eq!(submission.category, HazardCategory::ChemicalSpill);
        assert_eq!(submission.severity, Severity::High);
        assert_eq!(submission.position, Coordinates::new(8.38, -76.99));
        assert!(submission.is_offline_report);
        assert!(submission.media.is_empty());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory as _;
        Cli::command().debug_assert();
    }
}
