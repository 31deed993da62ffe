//! Town generator CLI: writes the generated town as an SVG document.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use tracing::error;
use tracing_subscriber::EnvFilter;

use towngen::{Feature, Model, Palette, SvgRenderer, TownConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FeatureArg {
    On,
    Off,
    Random,
}

impl From<FeatureArg> for Feature {
    fn from(arg: FeatureArg) -> Feature {
        match arg {
            FeatureArg::On => Feature::Enabled,
            FeatureArg::Off => Feature::Disabled,
            FeatureArg::Random => Feature::Random,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "towngen", about = "Procedural medieval town generator")]
struct Args {
    /// Random seed (time-like entropy when unset)
    #[arg(long)]
    seed: Option<u32>,

    /// Number of city patches
    #[arg(long, default_value_t = 15)]
    patches: usize,

    /// Color palette: parchment, ink or night
    #[arg(long, default_value = "parchment")]
    palette: String,

    /// Output file; stdout when unset
    #[arg(long)]
    output: Option<PathBuf>,

    /// Rendered document size in pixels
    #[arg(long, default_value_t = 800.0)]
    size: f64,

    #[arg(long, value_enum, default_value_t = FeatureArg::Random)]
    plaza: FeatureArg,

    #[arg(long, value_enum, default_value_t = FeatureArg::Random)]
    citadel: FeatureArg,

    #[arg(long, value_enum, default_value_t = FeatureArg::Random)]
    walls: FeatureArg,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let Some(palette) = Palette::named(&args.palette) else {
        error!(palette = %args.palette, "unknown palette");
        return ExitCode::FAILURE;
    };

    let config = TownConfig {
        n_patches: args.patches,
        seed: args.seed,
        plaza: args.plaza.into(),
        citadel: args.citadel.into(),
        walls: args.walls.into(),
    };

    let model = match Model::new(&config) {
        Ok(model) => model,
        Err(err) => {
            error!(%err, "generation failed");
            return ExitCode::FAILURE;
        }
    };

    let document = SvgRenderer::new(&model, palette).render(args.size, args.size);

    match &args.output {
        Some(path) => {
            if let Err(err) = fs::write(path, document) {
                error!(%err, path = %path.display(), "failed to write output");
                return ExitCode::FAILURE;
            }
        }
        None => print!("{}", document),
    }

    ExitCode::SUCCESS
}
