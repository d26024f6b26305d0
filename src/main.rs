use clap::{Parser, Subcommand};
use instaframe::batch::{self, BatchSummary};
use instaframe::config::{self, FormatterConfig};
use instaframe::imaging::BackgroundType;
use instaframe::output;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Flags for the `format` command. Anything left unset comes from the config file.
#[derive(clap::Args, Clone)]
struct FormatArgs {
    /// Image files or directories (walked recursively for supported images)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Where formatted images are written
    #[arg(long, default_value = "instaframe-out")]
    out_dir: PathBuf,

    /// Target for the shorter side in pixels (320-2048)
    #[arg(long)]
    min_size: Option<u32>,

    /// Starting JPEG quality (0.0-1.0)
    #[arg(long)]
    quality: Option<f32>,

    /// Size budget in MB; quality is lowered until the file fits. Turns the
    /// size limit on even when the config file disables it
    #[arg(long, conflicts_with = "no_size_limit")]
    max_size_mb: Option<f64>,

    /// Disable the size budget and write lossless PNG
    #[arg(long)]
    no_size_limit: bool,

    /// Always scale to exactly min_size on the shorter side
    #[arg(long)]
    no_preserve: bool,

    /// Do not draw the drop shadow
    #[arg(long)]
    no_shadow: bool,

    /// Canvas background
    #[arg(long, value_enum)]
    background: Option<BackgroundType>,

    /// Prefix for output file names
    #[arg(long)]
    prefix: Option<String>,

    /// Print a JSON report instead of the text report
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
#[command(name = "instaframe")]
#[command(about = "Square photo formatter for Instagram-style uploads")]
#[command(long_about = "\
Square photo formatter for Instagram-style uploads

Each photo is scaled so its shorter side reaches --min-size, centered on a
square canvas over a white or blurred backdrop, optionally with a soft
shadow, and saved as <prefix><name>.jpg (or .png without a size budget).

Settings are read from ./instaframe.toml when present; flags override it.
Run 'instaframe gen-config' to generate a documented config file.

Set RUST_LOG=debug to trace every encode attempt of the size search.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Format images into square, upload-ready files
    Format(FormatArgs),
    /// Validate the config file and show the effective settings
    Check,
    /// Print a stock instaframe.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Format(args) => {
            let mut site_config = load_config(cli.config.as_ref())?;
            apply_overrides(&mut site_config, &args);
            site_config.validate()?;
            init_thread_pool(&site_config.processing);

            let files = batch::collect_inputs(&args.inputs);
            if files.is_empty() {
                return Err("no input images found".into());
            }
            let options = site_config.to_processing_options();
            let limits = site_config.to_encoding_limits();

            let mut outcomes = if args.json {
                batch::process_files(&files, &options, &limits, None)
            } else {
                let (tx, rx) = std::sync::mpsc::channel();
                let printer = std::thread::spawn(move || {
                    for event in rx {
                        for line in output::format_process_event(&event) {
                            println!("{}", line);
                        }
                    }
                });
                let outcomes = batch::process_files(&files, &options, &limits, Some(tx));
                printer
                    .join()
                    .map_err(|_| "progress printer panicked")?;
                println!();
                outcomes
            };

            let written =
                batch::write_outputs(&mut outcomes, &args.out_dir, &site_config.output.file_prefix)?;
            if args.json {
                println!("{}", output::format_json(&outcomes, &written)?);
            } else {
                output::print_batch_output(&outcomes, &written);
            }

            if BatchSummary::from_outcomes(&outcomes).failed > 0 {
                std::process::exit(1);
            }
        }
        Command::Check => {
            let path = config_path(cli.config.as_ref());
            let site_config = load_config(cli.config.as_ref())?;
            output::print_config_check(&site_config, &path, path.exists());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default: warnings only).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn config_path(explicit: Option<&PathBuf>) -> PathBuf {
    explicit
        .cloned()
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_FILE))
}

/// Load the config file. An explicitly named file must exist; the default
/// one is optional.
fn load_config(explicit: Option<&PathBuf>) -> Result<FormatterConfig, Box<dyn std::error::Error>> {
    let path = config_path(explicit);
    if explicit.is_some() && !path.exists() {
        return Err(format!("config file not found: {}", path.display()).into());
    }
    Ok(config::load_config(&path)?)
}

/// Layer command-line flags over the loaded config.
fn apply_overrides(site_config: &mut FormatterConfig, args: &FormatArgs) {
    let out = &mut site_config.output;
    if let Some(min_size) = args.min_size {
        out.min_size = min_size;
    }
    if let Some(quality) = args.quality {
        out.quality = quality;
    }
    if let Some(mb) = args.max_size_mb {
        out.size_limit = true;
        out.max_file_size_mb = mb;
    }
    if args.no_size_limit {
        out.size_limit = false;
    }
    if args.no_preserve {
        out.preserve_original_size = false;
    }
    if args.no_shadow {
        out.shadow = false;
    }
    if let Some(background) = args.background {
        out.background = background;
    }
    if let Some(prefix) = &args.prefix {
        out.file_prefix = prefix.clone();
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. User can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
