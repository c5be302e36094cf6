//! Command-line risk-zone renderer
//!
//! Geocodes a ZIP code, asks the prediction backend about the given date and
//! time, and writes a PNG map of the area with the risk disc on top.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use riskzone::{
    Geocoder, HttpPredictionService, PredictionRequest, RiskMapConfig, RiskMapProfile, RiskReport,
    RiskZoneMap, ZippopotamGeocoder,
};
use std::path::PathBuf;
use std::process;

#[derive(Debug, Clone, ValueEnum)]
enum Profile {
    /// OpenStreetMap tiles, zoom 13
    Standard,
    /// Local tile server and geocoder
    Offline,
    /// Closer zoom on a larger surface
    HighDetail,
}

#[derive(Parser)]
#[command(name = "riskzone")]
#[command(about = "Render a crime-risk map for a US ZIP code", long_about = None)]
struct Args {
    /// Five-digit US ZIP code
    #[arg(long)]
    zip: String,

    /// Date of interest, YYYY-MM-DD
    #[arg(long)]
    date: String,

    /// Time of interest, HH:MM
    #[arg(long)]
    time: String,

    /// Tile zoom level (0-19)
    #[arg(long)]
    zoom: Option<u8>,

    /// Disc radius in meters
    #[arg(long)]
    radius: Option<f64>,

    /// Surface width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Surface height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Where to write the PNG
    #[arg(long, default_value = "riskzone.png")]
    output: PathBuf,

    /// JSON config file; flags override its values
    #[arg(long, conflicts_with = "profile")]
    config: Option<PathBuf>,

    /// Built-in configuration preset
    #[arg(long, value_enum, default_value = "standard")]
    profile: Profile,

    /// Base URL of the prediction backend
    #[arg(long)]
    api_url: Option<String>,

    /// Only geocode and render the map
    #[arg(long)]
    skip_prediction: bool,
}

impl Args {
    fn load_config(&self) -> anyhow::Result<RiskMapConfig> {
        let mut config = match &self.config {
            Some(path) => RiskMapConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => match self.profile {
                Profile::Standard => RiskMapProfile::Standard,
                Profile::Offline => RiskMapProfile::Offline,
                Profile::HighDetail => RiskMapProfile::HighDetail,
            }
            .resolve(),
        };

        if let Some(zoom) = self.zoom {
            config.map.zoom = zoom;
        }
        if let Some(radius) = self.radius {
            config.map.radius_meters = radius;
        }
        if let Some(width) = self.width {
            config.map.width = width;
        }
        if let Some(height) = self.height {
            config.map.height = height;
        }
        if let Some(url) = &self.api_url {
            config.api.prediction_base_url = url.clone();
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = args.load_config()?;
    let geocoder = ZippopotamGeocoder::from_config(&config.api)?;

    let location = match geocoder.lookup(&args.zip).await {
        Some(location) => location,
        None => bail!("ZIP code not found: {}", args.zip),
    };
    log::info!(
        "{} resolves to {}, {} ({:.4}, {:.4})",
        location.zip_code,
        location.city,
        location.state,
        location.latitude,
        location.longitude
    );

    let report = if args.skip_prediction {
        None
    } else {
        let predictor = HttpPredictionService::from_config(&config.api)?;
        let request = PredictionRequest::new(&args.date, &args.time, &location.zip_code);
        Some(
            RiskReport::gather_for(location.clone(), &predictor, &request)
                .await
                .context("prediction failed")?,
        )
    };

    let zoom = config.map.zoom;
    let mut map = RiskZoneMap::from_config(config)?;
    let handle = match map.set_view(location.point(), zoom) {
        Some(handle) => handle,
        None => bail!("map did not start rendering"),
    };
    let rendered = handle.wait().await?;
    if rendered.drawn == 0 {
        log::warn!("no tiles could be loaded; the map shows only the overlay");
    }

    map.save_png(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;

    match report {
        Some(report) => print!("{}", report.summary()),
        None => println!(
            "{}, {} {} ({:.4}, {:.4})",
            location.city, location.state, location.zip_code, location.latitude, location.longitude
        ),
    }
    println!(
        "Map: {} ({}/{} tiles)",
        args.output.display(),
        rendered.drawn,
        rendered.requested
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    riskzone::init_logging();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
