use std::io::Read;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use workout_planner::ai_client::AiClient;
use workout_planner::api::{self, ApiState};
use workout_planner::config::AppConfig;
use workout_planner::models::{DailyWorkout, UserProfile};
use workout_planner::plan_cache::PlanCache;
use workout_planner::plan_parser::parse_workout_plan_report;
use workout_planner::planner::{PlanError, WeeklyPlanner};
use workout_planner::summary::{format_day_details, format_day_line, format_week_overview};

#[derive(Parser)]
#[command(name = "workout-planner", version, about = "Generate and read weekly workout plans")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse plan text from a file, or `-` for stdin
    Parse {
        path: String,
        #[arg(long)]
        json: bool,
    },
    /// Show this week's plan, generating one if none is cached
    Week {
        /// Discard the cached plan and generate a new one
        #[arg(long)]
        refresh: bool,
        /// Print the exercises of every day
        #[arg(long)]
        details: bool,
        #[arg(long)]
        json: bool,
    },
    /// Forget the cached plan
    Clear,
    /// Serve the HTTP API
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load configuration")?;

    match cli.command {
        Command::Parse { path, json } => parse_file(&path, json),
        Command::Week {
            refresh,
            details,
            json,
        } => show_week(&config, refresh, details, json).await,
        Command::Clear => {
            open_cache(&config)?.clear()?;
            info!("Cleared cached workout plan");
            Ok(())
        }
        Command::Serve => {
            let state = ApiState {
                planner: Arc::new(build_planner(&config)?),
                profile: Arc::new(load_profile(&config)?),
            };
            api::run_server(state, &config.api_bind_addr, &config.cors_allowed_origins).await
        }
    }
}

fn parse_file(path: &str, json: bool) -> anyhow::Result<()> {
    let text = if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read plan from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?
    };

    let report = parse_workout_plan_report(&text);
    for skipped in &report.skipped {
        warn!("Skipped block {}: {}", skipped.index + 1, skipped.reason);
    }
    if report.workouts.is_empty() {
        return Err(anyhow!(PlanError::Unparsable));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report.workouts)?);
    } else {
        print_days(&report.workouts);
    }
    Ok(())
}

async fn show_week(config: &AppConfig, refresh: bool, details: bool, json: bool) -> anyhow::Result<()> {
    let planner = build_planner(config)?;
    let profile = load_profile(config)?;
    let today = chrono::Local::now().date_naive();

    let plan = if refresh {
        planner.regenerate(&profile, today).await?
    } else {
        planner.load_week(&profile, today).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else if details {
        println!("{}", plan.week_title);
        print_days(&plan.workouts);
    } else {
        print!("{}", format_week_overview(&plan));
    }
    Ok(())
}

fn print_days(days: &[DailyWorkout]) {
    for day in days {
        println!("{}", format_day_line(day));
        print!("{}", format_day_details(day));
    }
}

fn open_cache(config: &AppConfig) -> anyhow::Result<PlanCache> {
    PlanCache::open(&config.database_url)
        .with_context(|| format!("Failed to open plan cache at {}", config.database_url))
}

fn build_planner(config: &AppConfig) -> anyhow::Result<WeeklyPlanner<AiClient>> {
    let client = AiClient::with_settings(config.gemini_api_key.clone(), config.generation_settings());
    if !client.has_api_key() {
        warn!("GEMINI_API_KEY is not set; only cached plans can be served");
    }
    let cache = Arc::new(Mutex::new(open_cache(config)?));
    Ok(WeeklyPlanner::new(client, cache))
}

fn load_profile(config: &AppConfig) -> anyhow::Result<UserProfile> {
    UserProfile::load(&config.profile_path).context("Please complete your profile setup first")
}
