use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use moodtrack_insights::analysis::{analyze, Analysis};
use moodtrack_insights::config::PersonaConfig;
use moodtrack_insights::persona::{resolve_persona, PersonaClient};
use moodtrack_insights::{ingest, report, summary};

#[derive(Parser)]
#[command(name = "moodtrack")]
#[command(about = "Listening-mood baseline and insight detection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Play history (recently-played JSON or CSV)
    #[arg(long)]
    plays: PathBuf,
    /// Audio features (audio-features JSON or CSV)
    #[arg(long)]
    features: PathBuf,
    /// Listener UTC offset used for calendar days and late-night hours, e.g. +02:00
    #[arg(long, env = "MOODTRACK_UTC_OFFSET")]
    utc_offset: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect insights from the listening history
    Analyze {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Print per-day mood metrics
    Metrics {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Print the personal baseline
    Baseline {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long)]
        label: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Ask the persona collaborator to describe the listener
    Persona {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
}

fn run_analysis(input: &InputArgs) -> anyhow::Result<Analysis> {
    let offset = input
        .utc_offset
        .as_deref()
        .map(ingest::parse_offset)
        .transpose()?;
    let plays = ingest::load_plays(&input.plays, offset)?;
    let features = ingest::load_features(&input.features)?;
    Ok(analyze(&plays, &features))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to encode output")?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("failed to install log subscriber")?;

    match cli.command {
        Commands::Analyze { input, format } => {
            let analysis = run_analysis(&input)?;
            match format {
                Format::Json => print_json(&analysis.insights)?,
                Format::Text => {
                    if analysis.insights.is_empty() {
                        println!("No listening days with audio features found.");
                        return Ok(());
                    }

                    println!("Insights:");
                    for insight in analysis.insights.iter() {
                        let severity = insight
                            .severity
                            .map(|s| format!(", {s}"))
                            .unwrap_or_default();
                        println!("- {} ({}{})", insight.title, insight.kind, severity);
                        println!("  {}", insight.description);
                        if let Some(label) = &insight.action_label {
                            println!("  Suggested: {label}");
                        }
                    }
                }
            }
        }
        Commands::Metrics { input, format } => {
            let analysis = run_analysis(&input)?;
            match format {
                Format::Json => print_json(&analysis.metrics)?,
                Format::Text => {
                    if analysis.metrics.is_empty() {
                        println!("No listening days with audio features found.");
                        return Ok(());
                    }

                    for day in analysis.metrics.iter() {
                        println!(
                            "{} plays {} ({:.1} min) valence {:.2} energy {:.2} diversity {:.2} late-night {:.0}%",
                            day.date,
                            day.count,
                            day.listening_time_minutes,
                            day.valence,
                            day.energy,
                            day.diversity,
                            day.late_night_ratio * 100.0
                        );
                    }
                }
            }
        }
        Commands::Baseline { input, format } => {
            let analysis = run_analysis(&input)?;
            let baseline = analysis.baseline;
            match format {
                Format::Json => print_json(&baseline)?,
                Format::Text => {
                    println!("{}", summary::mood_description(&baseline));
                    println!(
                        "valence {:.2} (std {:.2}), energy {:.2} (std {:.2})",
                        baseline.avg_valence,
                        baseline.std_valence,
                        baseline.avg_energy,
                        baseline.std_energy
                    );
                    println!(
                        "{:.0} min/day, diversity {:.0}% across {} days",
                        baseline.avg_listening_time,
                        baseline.avg_diversity * 100.0,
                        analysis.metrics.len()
                    );
                }
            }
        }
        Commands::Report { input, label, out } => {
            let analysis = run_analysis(&input)?;
            let report = report::build_report(label.as_deref(), &analysis);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Persona { input, top } => {
            let analysis = run_analysis(&input)?;
            let tracks = summary::top_tracks(&analysis.enriched, top);
            let stats = summary::feature_summary(&analysis.enriched);
            let client = PersonaClient::new(PersonaConfig::from_env()?);
            let persona = resolve_persona(&client, &tracks, &stats).await;
            print_json(&persona)?;
        }
    }

    Ok(())
}
