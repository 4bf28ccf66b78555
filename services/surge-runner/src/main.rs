//! `surge`: run virtual-user HTTP load tests described in YAML scenarios.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use surge_runner::{ResultsReport, ScenarioFile, ScenarioRunner};

#[derive(Parser)]
#[command(name = "surge")]
#[command(about = "Virtual-user HTTP load generator", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "SURGE_LOG", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a load test from a scenario file
    Run {
        /// Path to scenario YAML file
        #[arg(short, long)]
        scenario: PathBuf,

        /// Override number of virtual users
        #[arg(short, long)]
        users: Option<u32>,

        /// Override test duration in seconds
        #[arg(short, long)]
        duration: Option<u64>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,

        /// Answer every request locally instead of hitting the network
        #[arg(long)]
        dry_run: bool,
    },

    /// Check a scenario file without running it
    Validate {
        /// Path to scenario YAML file
        #[arg(short, long)]
        scenario: PathBuf,
    },

    /// List scenarios in a directory
    List {
        /// Scenarios directory
        #[arg(short, long, default_value = "scenarios")]
        dir: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so report output stays machine readable.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run {
            scenario,
            users,
            duration,
            output,
            dry_run,
        } => {
            info!(path = %scenario.display(), "Loading scenario");
            let mut config = ScenarioFile::from_file(&scenario)?;

            if let Some(u) = users {
                config.users = u;
            }
            if let Some(d) = duration {
                config.duration_secs = d;
            }
            config.validate()?;

            eprintln!("Scenario: {}", config.name);
            if !config.description.is_empty() {
                eprintln!("  {}", config.description);
            }
            eprintln!("  Users: {}", config.users);
            eprintln!("  Duration: {}s", config.duration_secs);
            eprintln!("  Steps: {}", config.steps.len());
            eprintln!();

            let runner = ScenarioRunner::new(config).dry_run(dry_run);
            let results = runner.run().await?;

            match output {
                OutputFormat::Json => {
                    println!("{}", ResultsReport::format_json(&results)?);
                }
                OutputFormat::Csv => {
                    println!("{}", ResultsReport::csv_header());
                    println!("{}", ResultsReport::format_csv(&results));
                }
                OutputFormat::Table => {
                    println!("{}", ResultsReport::format_table(&results));
                }
            }
            Ok(())
        }
        Commands::Validate { scenario } => {
            let config = ScenarioFile::from_file(&scenario)?;
            config.validate()?;
            println!(
                "✓ {} is valid: {} users, {}s, {} steps",
                scenario.display(),
                config.users,
                config.duration_secs,
                config.steps.len()
            );
            for (index, step) in config.steps.iter().enumerate() {
                println!(
                    "  {}. {} {} {}",
                    index + 1,
                    step.display_name(index),
                    step.method.to_uppercase(),
                    step.url.as_deref().unwrap_or_default()
                );
            }
            Ok(())
        }
        Commands::List { dir } => {
            println!("Available scenarios in {}:", dir.display());
            println!();

            let mut scenarios = Vec::new();
            for entry in std::fs::read_dir(&dir)?.flatten() {
                let path = entry.path();
                let is_yaml = matches!(
                    path.extension().and_then(|s| s.to_str()),
                    Some("yaml") | Some("yml")
                );
                if !is_yaml {
                    continue;
                }
                if let Ok(config) = ScenarioFile::from_file(&path) {
                    let file_name = entry.file_name().to_string_lossy().to_string();
                    scenarios.push((file_name, config.name, config.description));
                }
            }
            scenarios.sort_by(|a, b| a.0.cmp(&b.0));

            if scenarios.is_empty() {
                println!("No scenario files found");
            }
            for (file_name, name, description) in scenarios {
                println!("  {} - {}", file_name, name);
                if !description.is_empty() {
                    println!("    {}", description);
                }
            }
            Ok(())
        }
    }
}
