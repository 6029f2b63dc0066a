use clap::{Parser, Subcommand};
use pf_app::{AppResult, Severity, SimulationResult, Variant, simulate};
use pf_project::{EngineConfig, ProjectError};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pf-cli")]
#[command(about = "PlantFlow CLI - wastewater, digestion and biogas process simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate project file syntax and structure
    Validate {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
    },
    /// Run one variant and print the result as JSON
    Run {
        /// liquid, solids_to_gas, gas_only or hybrid
        #[arg(value_parser = parse_variant)]
        variant: Variant,
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Engine configuration YAML replacing the built-in calibration
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print a one-line-per-item digest instead of JSON
        #[arg(long)]
        brief: bool,
    },
    /// Print the built-in engine configuration as YAML
    DefaultConfig,
}

fn parse_variant(text: &str) -> Result<Variant, String> {
    Variant::from_key(text).ok_or_else(|| {
        let known: Vec<&str> = Variant::ALL.iter().map(|v| v.key()).collect();
        format!("unknown variant '{text}' (expected one of {})", known.join(", "))
    })
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Run {
            variant,
            project_path,
            config,
            brief,
        } => cmd_run(variant, &project_path, config.as_deref(), brief),
        Commands::DefaultConfig => cmd_default_config(),
    }
}

fn cmd_validate(project_path: &Path) -> AppResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = pf_project::load(project_path)?;
    println!(
        "✓ Project is valid ({} feed streams, {} outputs, {} overrides)",
        project.feed_streams.len(),
        project.outputs.len(),
        project.overrides.len()
    );
    Ok(())
}

fn cmd_run(variant: Variant, project_path: &Path, config_path: Option<&Path>, brief: bool) -> AppResult<()> {
    let project = pf_project::load(project_path)?;
    let config = match config_path {
        Some(path) => pf_project::load_config_yaml(path)?,
        None => EngineConfig::default(),
    };

    let result = simulate(variant, &project, &config)?;
    if brief {
        print_brief(&result);
    } else {
        let json = serde_json::to_string_pretty(&result).map_err(ProjectError::from)?;
        println!("{json}");
    }
    Ok(())
}

fn print_brief(result: &SimulationResult) {
    println!(
        "{} run: {} stages, {} equipment items, converged: {} after {} iterations",
        result.variant,
        result.stages.len(),
        result.equipment.len(),
        result.convergence.achieved,
        result.convergence.iterations
    );
    for stage in &result.stages {
        println!("  {} ({:.1} {})", stage.name, stage.influent.flow(), stage.influent.flow_unit());
    }
    for item in &result.equipment {
        println!("  {} x{} {} [{}]", item.id, item.quantity, item.equipment_type, item.design_basis);
    }
    for (key, metric) in &result.summary {
        println!("  {key}: {} {}", metric.value, metric.unit);
    }
    for w in &result.warnings {
        let mark = match w.severity {
            Severity::Info => "i",
            Severity::Warning => "!",
            Severity::Error => "✗",
        };
        println!("  {mark} {}: {}", w.field, w.message);
    }
}

fn cmd_default_config() -> AppResult<()> {
    let yaml = serde_yaml::to_string(&EngineConfig::default()).map_err(ProjectError::from)?;
    print!("{yaml}");
    Ok(())
}
