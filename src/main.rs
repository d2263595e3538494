//! find-candidate: rank a folder of CVs against a job description

use clap::Parser;
use find_candidate::cli::{self, Cli, Commands, ConfigAction};
use find_candidate::config::Config;
use find_candidate::input::InputManager;
use find_candidate::output::ConsoleFormatter;
use find_candidate::pipeline::{Crew, CrewInputs};
use find_candidate::{FindCandidateError, Result};
use log::{error, info};
use std::path::Path;
use std::process;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // OPENAI_API_KEY and friends may live in a local .env
    dotenvy::dotenv().ok();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    // Reset and path work on the file itself, even when it does not parse
    if let Commands::Config {
        action: Some(action @ (ConfigAction::Reset | ConfigAction::Path)),
    } = &cli.command
    {
        if let Err(e) = run_config_file_action(action, cli.config.as_deref()) {
            error!("Command failed: {}", e);
            eprintln!("❌ {}", e);
            process::exit(1);
        }
        return;
    }

    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("❌ {}", e);
            process::exit(1);
        }
    };

    // Execute command
    if let Err(e) = run_command(cli.command, config, cli.config.as_deref()).await {
        error!("Command failed: {}", e);
        eprintln!("❌ {}", e);
        process::exit(1);
    }
}

async fn run_command(command: Commands, mut config: Config, config_path: Option<&Path>) -> Result<()> {
    match command {
        Commands::Rank {
            job,
            job_file,
            cv_folder,
            output,
            format,
            no_llm,
            model,
            top,
        } => {
            info!("Starting candidate ranking");

            if let Some(path) = &job_file {
                cli::validate_file_extension(path, &["txt", "md", "pdf"])
                    .map_err(|e| FindCandidateError::InvalidInput(format!("Job description file: {}", e)))?;
            }
            if let Some(format) = &format {
                config.report.format = cli::parse_output_format(format).map_err(FindCandidateError::InvalidInput)?;
            }
            if let Some(folder) = cv_folder {
                config.input.cv_folder = folder;
            }
            if let Some(path) = output {
                config.report.output_path = path;
            }
            if let Some(model) = model {
                config.llm.model = model;
            }
            if let Some(top) = top {
                config.report.top_n = top;
            }
            if no_llm {
                config.llm.enabled = false;
            }

            let job_description = InputManager::new()
                .load_job_description(job.as_deref(), job_file.as_deref())
                .await?;

            println!("🚀 Candidate ranking");
            println!("📂 CV folder: {}", config.input.cv_folder.display());
            println!("💼 Job description: {} characters", job_description.len());
            if config.llm.enabled {
                println!("🤖 LLM model: {}", config.llm.model);
            } else {
                println!("⚠️  LLM analysis disabled");
            }

            let report_path = config.report.output_path.clone();
            let inputs = CrewInputs {
                job_description,
                cv_folder: config.input.cv_folder.clone(),
                output_path: Some(report_path.clone()),
            };
            let console = ConsoleFormatter::new(config.report.color_output);
            let mut crew = Crew::from_config(config)?.with_progress(true);

            println!("\n🔄 Running pipeline...");
            let output = crew.kickoff(inputs).await?;

            for task in &output.task_outputs {
                println!("  ✓ {} ({}ms): {}", task.task.name(), task.elapsed_ms, task.summary);
            }

            println!("\n{}", console.format_report(&output.report));
            println!("📁 Report saved to: {}", report_path.display());
        }

        Commands::Extract { cv_folder, no_llm } => {
            if let Some(folder) = cv_folder {
                config.input.cv_folder = folder;
            }
            if no_llm {
                config.llm.enabled = false;
            }

            let folder = config.input.cv_folder.clone();
            let mut crew = Crew::from_config(config)?.with_progress(true);
            let (profiles, skipped) = crew.extract_profiles(folder).await?;

            println!("{}", serde_json::to_string_pretty(&profiles)?);
            for cv in &skipped {
                eprintln!("⚠️  Skipped {}: {}", cv.file_name, cv.reason);
            }
        }

        Commands::Config { action } => match action {
            Some(ConfigAction::Show) | None => {
                let content = toml::to_string_pretty(&config)
                    .map_err(|e| FindCandidateError::Configuration(format!("Failed to serialize config: {}", e)))?;
                println!("⚙️  Current Configuration\n");
                println!("{}", content);
            }
            Some(action) => run_config_file_action(&action, config_path)?,
        },
    }

    Ok(())
}

fn run_config_file_action(action: &ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Reset => {
            println!("🔄 Resetting configuration to defaults...");
            let path = Config::reset(custom_path)?;
            println!("✅ Configuration reset successfully: {}", path.display());
        }
        ConfigAction::Path => {
            println!("{}", Config::resolve_path(custom_path).display());
        }
        ConfigAction::Show => {}
    }
    Ok(())
}
