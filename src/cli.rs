use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::report::ReportTier;

#[derive(Parser, Debug)]
#[command(author, version, about = "Meal plans and health reports from quiz answers", long_about = None)]
pub struct Cli {
    /// Skip the narrative service even when an API key is configured
    #[arg(long, global = true)]
    pub no_rewrite: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    /// Path to a JSON file with the quiz answers
    #[arg(short, long)]
    pub profile: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate a multi-day meal plan
    MealPlan {
        #[command(flatten)]
        input: ProfileArgs,
        /// Number of days (defaults to MEAL_PLAN_DAYS)
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Generate narrative sections and the rule output
    Narratives {
        #[command(flatten)]
        input: ProfileArgs,
    },
    /// Generate the full validated report bundle
    Report {
        #[command(flatten)]
        input: ProfileArgs,
        #[arg(short, long, default_value = "free")]
        tier: ReportTier,
        #[arg(long)]
        order_id: Option<String>,
        /// May be repeated
        #[arg(long = "add-on")]
        add_ons: Vec<String>,
        #[arg(short, long)]
        days: Option<u32>,
    },
}

impl Command {
    pub fn profile_path(&self) -> &PathBuf {
        match self {
            Command::MealPlan { input, .. } | Command::Narratives { input } | Command::Report { input, .. } => {
                &input.profile
            }
        }
    }
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
