//! ArchForge CLI - Bridge interface for the presentation pipeline
//!
//! Commands: normalize, pack, seeds, run
//! Outputs JSON to stdout, logs to stderr
//! Returns non-zero on validation failure

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use archforge_core::{
    config::PipelineConfig,
    generation::NoProgress,
    geometry::MassingOverride,
    panels::{required_panels, PanelType},
    seed::derive_seeds,
    spec::validate_schema,
    OfflineRenderer, PipelineRequest, PresentationPipeline,
};

const EXIT_INPUT: u8 = 1;
const EXIT_VALIDATION: u8 = 2;

#[derive(Parser)]
#[command(name = "archforge-cli")]
#[command(about = "ArchForge CLI - Consistent multi-panel architectural sheets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pipeline configuration (TOML); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Repair a raw design description and check it against the schema
    Normalize {
        /// JSON input file, or - for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
    },

    /// Build the canonical geometry pack
    Pack {
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Write each control image as <panel>.svg into this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,

        #[arg(long)]
        width: Option<f64>,

        #[arg(long)]
        depth: Option<f64>,
    },

    /// Print the seed sequence for a base seed
    Seeds {
        #[arg(short, long)]
        base: u64,

        #[arg(short, long, default_value_t = 1)]
        floors: usize,
    },

    /// Run the full pipeline against the offline renderer
    Run {
        #[arg(short, long, default_value = "-")]
        input: String,

        #[arg(short, long)]
        seed: Option<u64>,

        /// Output sheet PNG
        #[arg(short, long, default_value = "sheet.png")]
        out: PathBuf,

        /// Skip inter-call delays
        #[arg(long)]
        no_delays: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn read_input(source: &str) -> Result<Value, String> {
    let text = if source == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).map_err(|e| format!("Failed to read stdin: {}", e))?;
        buf
    } else {
        fs::read_to_string(source).map_err(|e| format!("Failed to read {}: {}", source, e))?
    };
    serde_json::from_str(&text).map_err(|e| format!("Invalid JSON input: {}", e))
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, String> {
    match path {
        Some(p) => PipelineConfig::load(p).map_err(|e| e.to_string()),
        None => Ok(PipelineConfig::default()),
    }
}

fn print(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => println!(r#"{{"success": false, "error": "{}"}}"#, e),
    }
}

fn fail(code: u8, error: impl ToString) -> ExitCode {
    print(&json!({ "success": false, "error": error.to_string() }));
    ExitCode::from(code)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => return fail(EXIT_INPUT, format!("Failed to load config: {}", e)),
    };

    match cli.command {
        Commands::Normalize { input } => {
            let raw = match read_input(&input) {
                Ok(v) => v,
                Err(e) => return fail(EXIT_INPUT, e),
            };
            let normalized = archforge_core::normalize(&raw);
            let schema = validate_schema(&normalized.spec);
            print(&json!({
                "success": schema.valid,
                "spec": normalized.spec,
                "repairs": normalized.repairs,
                "schema": schema,
            }));
            if schema.valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_VALIDATION)
            }
        }

        Commands::Pack { input, out_dir, width, depth } => {
            let raw = match read_input(&input) {
                Ok(v) => v,
                Err(e) => return fail(EXIT_INPUT, e),
            };
            let mut request = PipelineRequest::new(raw);
            if width.is_some() || depth.is_some() {
                request.massing = Some(MassingOverride { width_m: width, depth_m: depth, floor_height_m: None });
            }
            let pipeline = match PresentationPipeline::new(Arc::new(OfflineRenderer::new()), config) {
                Ok(p) => p,
                Err(e) => return fail(EXIT_INPUT, e),
            };
            let prepared = match pipeline.prepare(&request) {
                Ok(p) => p,
                Err(e) if e.is_validation_failure() => return fail(EXIT_VALIDATION, e),
                Err(e) => return fail(EXIT_INPUT, e),
            };
            let pack = &prepared.geometry.pack;

            if let Some(dir) = out_dir {
                if let Err(e) = fs::create_dir_all(&dir) {
                    return fail(EXIT_INPUT, format!("Failed to create {}: {}", dir.display(), e));
                }
                for panel in pack.panels.values() {
                    let path = dir.join(format!("{}.svg", panel.panel.key()));
                    if let Err(e) = fs::write(&path, &panel.control_image) {
                        return fail(EXIT_INPUT, format!("Failed to write {}: {}", path.display(), e));
                    }
                }
            }

            let panels: Vec<Value> = pack
                .panels
                .values()
                .map(|p| json!({
                    "panel": p.panel,
                    "blend_strength": p.blend_strength,
                    "size": [p.width, p.height],
                    "image_hash": p.image_hash,
                }))
                .collect();
            print(&json!({
                "success": true,
                "spec_hash": prepared.spec.hash(),
                "geometry_hash": pack.geometry_hash,
                "status": pack.status,
                "dimensions": prepared.geometry.model.dimensions(),
                "panels": panels,
            }));
            ExitCode::SUCCESS
        }

        Commands::Seeds { base, floors } => {
            let panels: Vec<PanelType> = required_panels(floors.max(1));
            print(&json!({ "success": true, "base_seed": base, "seeds": derive_seeds(base, &panels) }));
            ExitCode::SUCCESS
        }

        Commands::Run { input, seed, out, no_delays } => {
            let raw = match read_input(&input) {
                Ok(v) => v,
                Err(e) => return fail(EXIT_INPUT, e),
            };
            let mut config = config;
            if no_delays {
                config.generation.clear_delays();
            }
            let pipeline = match PresentationPipeline::new(Arc::new(OfflineRenderer::new()), config) {
                Ok(p) => p,
                Err(e) => return fail(EXIT_INPUT, e),
            };
            let mut request = PipelineRequest::new(raw);
            request.base_seed = seed;

            let (_cancel, cancel_rx) = watch::channel(false);
            match pipeline.run(&request, cancel_rx, &NoProgress).await {
                Ok(run) => {
                    if let Err(e) = fs::write(&out, &run.sheet.png) {
                        return fail(EXIT_INPUT, format!("Failed to write {}: {}", out.display(), e));
                    }
                    print(&json!({ "success": true, "sheet_path": out, "run": run.report }));
                    ExitCode::SUCCESS
                }
                Err(e) if e.is_validation_failure() => {
                    let report = match &e {
                        archforge_core::PipelineError::Gate(gate) => json!(gate.report()),
                        _ => Value::Null,
                    };
                    print(&json!({ "success": false, "error": e.to_string(), "report": report }));
                    ExitCode::from(EXIT_VALIDATION)
                }
                Err(e) => fail(EXIT_INPUT, e),
            }
        }
    }
}
