pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use irongpt_core::config::{ConfigOverrides, LoadOptions};

use commands::plan::PlanKind;
use commands::profile::ProfileUpdate;

#[derive(Debug, Parser)]
#[command(
    name = "irongpt",
    about = "IronGPT fitness coach CLI",
    long_about = "Chat with the IronGPT coach, manage the athlete profile, inspect generated plans and check runtime readiness.",
    after_help = "Examples:\n  irongpt chat\n  irongpt profile set --weight-kg 82 --activity very_active\n  irongpt plan workout\n  irongpt doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to an irongpt.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the configured log level")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Override the persisted state file path")]
    state_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive coaching chat (/reset clears, /quit exits)")]
    Chat,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, state file access and LLM endpoint settings")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Show or update the athlete profile used for plan generation")]
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    #[command(about = "Render the stored workout or nutrition plan")]
    Plan {
        #[arg(value_enum)]
        kind: PlanArg,
    },
}

#[derive(Debug, Subcommand)]
enum ProfileAction {
    Show,
    Set {
        #[arg(long)]
        weight_kg: Option<f64>,
        #[arg(long)]
        height_cm: Option<f64>,
        #[arg(long)]
        age: Option<u32>,
        #[arg(long, help = "male|female|other")]
        gender: Option<String>,
        #[arg(long, help = "sedentary|lightly_active|moderately_active|very_active|extra_active")]
        activity: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PlanArg {
    Workout,
    Nutrition,
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                log_level: self.log_level.clone(),
                state_path: self.state_path.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    let result = match cli.command {
        Command::Chat => commands::chat::run(options),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
        Command::Doctor { json } => commands::doctor::run(options, json),
        Command::Profile { action: ProfileAction::Show } => commands::profile::show(options),
        Command::Profile {
            action: ProfileAction::Set { weight_kg, height_cm, age, gender, activity },
        } => commands::profile::set(
            options,
            ProfileUpdate { weight_kg, height_cm, age, gender, activity },
        ),
        Command::Plan { kind } => {
            let kind = match kind {
                PlanArg::Workout => PlanKind::Workout,
                PlanArg::Nutrition => PlanKind::Nutrition,
            };
            commands::plan::run(options, kind)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
