use std::path::PathBuf;

use anyhow::Context as _;
use cd_synth::{
    BlendMode, ColorReference, DatasetLayout, SynthesisConfig, Synthesizer, TransformConfig,
    TruthMode,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "cd-synth", version, about = "Paste donor instances into change-detection scenes")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synthesize a dataset.
    Run(RunArgs),
    /// Print the default configuration as JSON.
    DefaultConfig,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Scene root holding A, B, label, label1 and label2.
    #[arg(long)]
    scenes: PathBuf,

    /// Donor root holding image and mask.
    #[arg(long)]
    donors: PathBuf,

    /// Output root; results go to <out>/<mode>_<truth>.
    #[arg(long)]
    out: PathBuf,

    /// Occupancy reference directory (defaults to <scenes>/label).
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Donor mask directory name under the donor root.
    #[arg(long, default_value = "mask")]
    mask_dir: String,

    /// Load the whole configuration from JSON; other options are ignored.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Blend modes, each producing its own output set.
    #[arg(long = "mode", value_enum, default_values_t = [ModeChoice::Poisson])]
    modes: Vec<ModeChoice>,

    /// Poisson dilation kernel size (9 for LEVIR-CD, 15 for WHU-CD).
    #[arg(long, default_value_t = 9)]
    dilation: u32,

    #[arg(long, value_enum, default_value_t = TruthChoice::Shadow)]
    truth: TruthChoice,

    /// Instances pasted into each scene.
    #[arg(long, default_value_t = 50)]
    count: usize,

    /// Failed placements tolerated per scene.
    #[arg(long, default_value_t = 2000)]
    max_attempts: usize,

    #[arg(long, default_value_t = 2020)]
    seed: u64,

    /// Match donor colors to the whole branch image instead of the pasted-over crop.
    #[arg(long)]
    scene_colors: bool,

    /// Raster file extension.
    #[arg(long, default_value = "png")]
    extension: String,

    /// Rotate donors by up to this many degrees.
    #[arg(long, conflicts_with = "scale")]
    rotate: Option<f32>,

    /// Scale donors by a factor drawn from MIN..=MAX.
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
    scale: Option<Vec<f32>>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeChoice {
    Direct,
    Gaussian,
    Box,
    Poisson,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TruthChoice {
    Binary,
    Shadow,
}

fn main() -> anyhow::Result<()> {
    setup_logging();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::DefaultConfig => {
            let json = serde_json::to_string_pretty(&SynthesisConfig::default())?;
            println!("{json}");
            Ok(())
        }
    }
}

fn setup_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn config_from_args(args: &RunArgs) -> anyhow::Result<SynthesisConfig> {
    if let Some(path) = &args.config {
        return SynthesisConfig::from_json_file(path)
            .with_context(|| format!("load configuration '{}'", path.display()));
    }

    let modes = args
        .modes
        .iter()
        .map(|choice| match choice {
            ModeChoice::Direct => BlendMode::Direct,
            ModeChoice::Gaussian => BlendMode::gaussian(),
            ModeChoice::Box => BlendMode::box_blur(),
            ModeChoice::Poisson => BlendMode::Poisson {
                dilation_size: args.dilation,
            },
        })
        .collect();
    let transform = match (args.rotate, args.scale.as_deref()) {
        (Some(max_degrees), _) => TransformConfig::Rotate { max_degrees },
        (None, Some(&[min, max])) => TransformConfig::Scale { min, max },
        _ => TransformConfig::None,
    };

    Ok(SynthesisConfig {
        target_count: args.count,
        modes,
        truth_mode: match args.truth {
            TruthChoice::Binary => TruthMode::Binary,
            TruthChoice::Shadow => TruthMode::Shadow,
        },
        max_attempts: args.max_attempts,
        seed: args.seed,
        color_reference: if args.scene_colors {
            ColorReference::Scene
        } else {
            ColorReference::Crop
        },
        extension: args.extension.clone(),
        transform,
    })
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let config = config_from_args(&args)?;
    let synthesizer = Synthesizer::new(config).context("validate configuration")?;

    let mut layout = DatasetLayout::new(&args.scenes, &args.donors, args.out.clone());
    layout.donor_mask_dir = args.donors.join(&args.mask_dir);
    if let Some(reference) = args.reference {
        layout.reference_dir = reference;
    }

    let summary = synthesizer
        .run(&layout)
        .with_context(|| format!("synthesize '{}'", args.scenes.display()))?;

    for mode in &summary.modes {
        println!(
            "{}: {} instances in {} scenes ({} short) -> {}",
            mode.mode,
            mode.placed,
            mode.scenes,
            mode.short_scenes,
            mode.output_dir.display()
        );
    }
    Ok(())
}
