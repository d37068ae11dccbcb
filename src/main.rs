use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use datacustodian::app::pipeline_use_case::PipelineUseCase;
use datacustodian::config::Config;
use datacustodian::domain::CUSTOMER_SCHEMA;
use datacustodian::infra::csv_reader::CsvRowReader;
use datacustodian::infra::csv_writer::CsvDatasetWriter;
use datacustodian::infra::report_sink::FileReportSink;
use datacustodian::logging;
use datacustodian::pipeline::engine::PipelineState;
use datacustodian::pipeline::report::RunOutcome;

#[derive(Parser)]
#[command(name = "datacustodian")]
#[command(about = "Customer data cleaning, validation, and PII masking pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: clean, validate, detect PII, mask, save
    Run {
        /// Path to the raw customer dataset
        #[arg(long, default_value = "customers_raw.csv")]
        input: String,
        /// Directory for datasets and reports
        #[arg(long, default_value = "outputs")]
        output_dir: String,
        /// Optional config file (defaults to ./config.toml if present)
        #[arg(long)]
        config: Option<String>,
    },
    /// Profile the raw dataset without transforming it
    Profile {
        /// Path to the raw customer dataset
        #[arg(long, default_value = "customers_raw.csv")]
        input: String,
        /// Directory for the profile report
        #[arg(long, default_value = "outputs")]
        output_dir: String,
        /// Optional config file (defaults to ./config.toml if present)
        #[arg(long)]
        config: Option<String>,
    },
}

fn load_config(path: Option<&str>) -> Result<Config, Box<dyn std::error::Error>> {
    match path {
        Some(p) => Ok(Config::load(&PathBuf::from(p))?),
        None => Ok(Config::load_or_default()?),
    }
}

fn build_use_case(input: &str, output_dir: &str, config: Config) -> PipelineUseCase {
    PipelineUseCase::new(
        config,
        Box::new(CsvRowReader::new(input, CUSTOMER_SCHEMA.clone())),
        Box::new(CsvDatasetWriter::new(output_dir)),
        Box::new(FileReportSink::new(output_dir)),
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            output_dir,
            config,
        } => {
            println!("🔄 Running data custodian pipeline...");
            let config = load_config(config.as_deref())?;
            let use_case = build_use_case(&input, &output_dir, config);

            match use_case.run().await {
                Ok(run) => {
                    println!("\n📊 Pipeline Results:");
                    println!("   Rows processed: {}", run.cleaned.len());
                    println!("   Cleaning changes: {}", run.clean_summary.total_changes());
                    println!(
                        "   Validation: {}/{} rows passed, {} warning(s), {} critical(s)",
                        run.validation.rows_passed,
                        run.validation.total_rows,
                        run.validation.warning_count,
                        run.validation.critical_count
                    );
                    if let Some(exposure) = &run.exposure {
                        println!(
                            "   PII: {} finding(s), {} fully exposed row(s)",
                            exposure.findings.len(),
                            exposure.fully_exposed_rows
                        );
                    }
                    println!("   Output dir: {}", output_dir);

                    match run.state {
                        PipelineState::Saved => {
                            info!(run_id = %run.report.run_id, "run saved");
                            println!("✅ Pipeline completed successfully");
                        }
                        PipelineState::Aborted => {
                            let reason = match &run.report.outcome {
                                Some(RunOutcome::Aborted { reason }) => reason.clone(),
                                _ => "unknown".to_string(),
                            };
                            error!(%reason, "run aborted");
                            println!("❌ Pipeline aborted: {}", reason);
                            std::process::exit(1);
                        }
                        other => {
                            error!(?other, "run ended in a non-terminal state");
                            std::process::exit(1);
                        }
                    }
                }
                Err(e) => {
                    error!("Pipeline failed: {}", e);
                    println!("❌ Pipeline failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Profile {
            input,
            output_dir,
            config,
        } => {
            println!("🔎 Profiling raw dataset...");
            let config = load_config(config.as_deref())?;
            let use_case = build_use_case(&input, &output_dir, config);

            match use_case.profile().await {
                Ok(profile) => {
                    println!("\n📊 Quality Profile:");
                    println!("   Rows: {}", profile.total_rows);
                    println!("   Columns: {}", profile.total_columns);
                    println!(
                        "   Columns with missing values: {}",
                        profile.columns_with_gaps()
                    );
                    println!("✅ Profile written to {}", output_dir);
                }
                Err(e) => {
                    error!("Profiling failed: {}", e);
                    println!("❌ Profiling failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
