use clap::{Parser, Subcommand};
use image::ImageFormat;
use imgadjust::adjustment::Adjustment;
use imgadjust::areas::{AreaSource, MemoryAreaStore, SidecarAreaStore, read_areas_file};
use imgadjust::cache::{DiskCache, NoCache, ResultCache};
use imgadjust::config::{self, EngineConfig};
use imgadjust::imaging::{RustBackend, output_format};
use imgadjust::{Adjuster, Outcome, Pipeline, Source, logging};
use log::warn;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Shared flags for commands that produce images.
#[derive(clap::Args, Clone)]
struct CacheArgs {
    /// Bypass the result cache and recompute every image
    #[arg(long)]
    no_cache: bool,
}

/// Parameters of a single adjustment, for `serialize`.
#[derive(clap::Args)]
struct AdjustmentArgs {
    /// Adjustment name (unknown names fall back to the configured default)
    #[arg(long)]
    adjustment: String,
    #[arg(long)]
    width: Option<String>,
    #[arg(long)]
    height: Option<String>,
    #[arg(long)]
    max_width: Option<String>,
    #[arg(long)]
    max_height: Option<String>,
    /// Target ratio, `W:H` or a decimal
    #[arg(long)]
    ratio: Option<String>,
    /// Area name for `namedcrop`
    #[arg(long)]
    name: Option<String>,
}

impl AdjustmentArgs {
    fn pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("width", &self.width),
            ("height", &self.height),
            ("max_width", &self.max_width),
            ("max_height", &self.max_height),
            ("ratio", &self.ratio),
            ("name", &self.name),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
        .collect()
    }
}

#[derive(Parser)]
#[command(name = "imgadjust")]
#[command(about = "Chainable, area-aware image adjustments")]
#[command(long_about = "\
Chainable, area-aware image adjustments

An adjustment request is a pipeline of stages separated by '>', each stage
a name followed by '|'-separated positional values:

  fit|WIDTH|HEIGHT|MAX_WIDTH|MAX_HEIGHT     scale to fit inside a box
  crop|WIDTH|HEIGHT                        cut to size, sparing protected areas
  ratiocrop|RATIO                          cut to an aspect ratio (16:9 or 1.78)
  namedcrop|NAME                           cut to the protected area called NAME
  fill|WIDTH|HEIGHT|MAX_WIDTH|MAX_HEIGHT    crop to the target ratio, then scale

Blank positions mean 'not set', so 'fit|200' and 'fit||150' both work.
Example: 'ratiocrop|1:1>fit|256'.

Protected areas come from <image>.areas.json next to each image, or from
the file given with --areas:

  [{\"x1\": 21, \"y1\": 46, \"x2\": 70, \"y2\": 95, \"name\": \"face\", \"priority\": 1}]

Run 'imgadjust gen-config' to generate a documented imgadjust.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./imgadjust.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level override: error, warn, info, debug, trace
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the output dimensions of a request as JSON, without decoding pixels
    Info {
        image: PathBuf,
        requested: String,
        /// Area file to use instead of the image's sidecar
        #[arg(long)]
        areas: Option<PathBuf>,
    },
    /// Adjust one image
    Apply {
        image: PathBuf,
        requested: String,
        #[arg(long, short)]
        output: PathBuf,
        /// Area file to use instead of the image's sidecar
        #[arg(long)]
        areas: Option<PathBuf>,
        #[command(flatten)]
        cache: CacheArgs,
    },
    /// Adjust many images in parallel
    Batch {
        requested: String,
        #[arg(required = true)]
        images: Vec<PathBuf>,
        #[arg(long)]
        output_dir: PathBuf,
        #[command(flatten)]
        cache: CacheArgs,
    },
    /// Drop cached results of an image
    Invalidate {
        image: PathBuf,
        /// Only drop results whose pipeline reads protected areas
        #[arg(long)]
        areas_only: bool,
    },
    /// Remove cache entries whose result or source image is gone, and
    /// cache files the manifest doesn't list
    Clean,
    /// Print the request string for one adjustment
    Serialize(AdjustmentArgs),
    /// Print a stock imgadjust.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(cli.config.as_deref(), &std::env::current_dir()?)?;
    logging::init(cli.log_level.as_deref().unwrap_or(&config.logging.level));
    let backend = RustBackend::new();

    match cli.command {
        Command::Info {
            image,
            requested,
            areas,
        } => {
            let pipeline = Pipeline::parse(&requested)?;
            let ident = ident_for(&image);
            let areas = area_source(&ident, areas.as_deref())?;
            let adjuster = Adjuster::new(&backend, areas.as_ref(), &NoCache);
            let info = adjuster.info(&ident, &std::fs::read(&image)?, &pipeline)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Apply {
            image,
            requested,
            output,
            areas,
            cache,
        } => {
            let pipeline = Pipeline::parse(&requested)?;
            let ident = ident_for(&image);
            let areas = area_source(&ident, areas.as_deref())?;
            let results = result_cache(&config, &cache)?;
            let adjuster = Adjuster::new(&backend, areas.as_ref(), results.as_ref())
                .with_search(config.search_options());

            let adjusted = adjuster.adjust(&ident, &std::fs::read(&image)?, &pipeline)?;
            write_output(&output, &adjusted.bytes)?;
            println!(
                "{} → {} ({})",
                image.display(),
                output.display(),
                outcome_label(adjusted.outcome)
            );
        }
        Command::Batch {
            requested,
            images,
            output_dir,
            cache,
        } => {
            let pipeline = Pipeline::parse(&requested)?;
            let outputs = batch_output_paths(&output_dir, &images)?;
            let idents: Vec<String> = images.iter().map(|p| ident_for(p)).collect();
            let contents = images
                .iter()
                .map(std::fs::read)
                .collect::<Result<Vec<_>, _>>()?;
            let sources: Vec<Source<'_>> = idents
                .iter()
                .zip(&contents)
                .map(|(ident, bytes)| Source { ident, bytes })
                .collect();

            let areas = SidecarAreaStore::new(".");
            let results = result_cache(&config, &cache)?;
            let adjuster = Adjuster::new(&backend, &areas, results.as_ref())
                .with_search(config.search_options());
            let (adjusted, stats) = adjuster.adjust_many(&sources, &pipeline);

            std::fs::create_dir_all(&output_dir)?;
            let mut failed = 0;
            for ((image, output), result) in images.iter().zip(&outputs).zip(adjusted) {
                match result {
                    Ok(adjusted) => {
                        write_output(output, &adjusted.bytes)?;
                        println!("{} → {}", image.display(), output.display());
                    }
                    Err(e) => {
                        failed += 1;
                        eprintln!("{}: {e}", image.display());
                    }
                }
            }
            println!("Cache: {stats}");
            if failed > 0 {
                return Err(format!("{failed} of {} images failed", images.len()).into());
            }
        }
        Command::Invalidate { image, areas_only } => {
            let cache = DiskCache::open(config.cache.path())?;
            let removed = cache.invalidate(&ident_for(&image), areas_only)?;
            println!("Removed {removed} cached result(s) for {}", image.display());
        }
        Command::Clean => {
            let cache = DiskCache::open(config.cache.path())?;
            let stats = cache.clean(|ident| Path::new(ident).exists())?;
            println!("Cleaned {}: {stats}", cache.root().display());
        }
        Command::Serialize(args) => {
            let registry = config.registry();
            if registry.get(&args.adjustment).is_none() {
                warn!(
                    "Unknown adjustment {:?}, using {}",
                    args.adjustment,
                    registry.default_kind()
                );
            }
            let kind = registry.get_or_default(&args.adjustment);
            let pairs: Vec<(&str, Option<&str>)> = args
                .pairs()
                .into_iter()
                .map(|(key, value)| (key, Some(value)))
                .collect();
            let adjustment = Adjustment::from_params(kind, &pairs)?;
            println!("{adjustment}");
        }
        // Printed before the config is loaded.
        Command::GenConfig => {}
    }

    Ok(())
}

/// Identifier used for area lookup and cache keys.
fn ident_for(image: &Path) -> String {
    image.to_string_lossy().into_owned()
}

/// Areas from an explicit file, or the image's sidecar.
fn area_source(
    ident: &str,
    file: Option<&Path>,
) -> Result<Box<dyn AreaSource>, Box<dyn std::error::Error>> {
    match file {
        Some(path) => {
            let mut store = MemoryAreaStore::new();
            store.set(ident, read_areas_file(ident, path)?)?;
            Ok(Box::new(store))
        }
        None => Ok(Box::new(SidecarAreaStore::new("."))),
    }
}

fn result_cache(
    config: &EngineConfig,
    args: &CacheArgs,
) -> Result<Box<dyn ResultCache>, Box<dyn std::error::Error>> {
    if args.no_cache || !config.cache.enabled {
        return Ok(Box::new(NoCache));
    }
    Ok(Box::new(DiskCache::open(config.cache.path())?))
}

/// `<output_dir>/<stem>.<ext>`, with the extension of the format actually written.
fn batch_output_path(output_dir: &Path, image: &Path) -> PathBuf {
    let source_format = ImageFormat::from_path(image).unwrap_or(ImageFormat::Png);
    let ext = output_format(source_format)
        .extensions_str()
        .first()
        .copied()
        .unwrap_or("png");
    let stem = image.file_stem().unwrap_or(image.as_os_str());
    output_dir.join(stem).with_extension(ext)
}

/// Output paths for a batch. Two inputs that would land on the same file
/// are an error.
fn batch_output_paths(output_dir: &Path, images: &[PathBuf]) -> Result<Vec<PathBuf>, String> {
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    let mut outputs = Vec::with_capacity(images.len());
    for image in images {
        let output = batch_output_path(output_dir, image);
        if let Some(first) = claimed.insert(output.clone(), image.as_path()) {
            return Err(format!(
                "{} and {} would both be written to {}",
                first.display(),
                image.display(),
                output.display()
            ));
        }
        outputs.push(output);
    }
    Ok(outputs)
}

fn write_output(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
}

fn outcome_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Hit => "cached",
        Outcome::Computed => "computed",
        Outcome::Duplicate => "computed concurrently",
    }
}
