pub mod commands;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::process::ExitCode;

use crate::commands::plan::PlanArgs;
use crate::commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "curate",
    about = "Curate recommendation CLI",
    long_about = "Rank catalog items for a profile, solve constrained multi-section plans, and inspect configuration.",
    after_help = "Examples:\n  curate rank --profile eater-1 --limit 5\n  curate plan --profile eater-1 --sections 2 --per-section 3\n  curate config"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq)]
pub enum Command {
    #[command(about = "Rank every catalog item for a profile with per-dimension explanations")]
    Rank {
        #[arg(long, help = "Profile identifier")]
        profile: String,
        #[arg(long, help = "Only print the N best candidates")]
        limit: Option<usize>,
    },
    #[command(about = "Fill sections with the best-scoring items under rating and price bounds")]
    Plan {
        #[arg(long, help = "Profile identifier")]
        profile: String,
        #[arg(long, default_value_t = 2)]
        sections: usize,
        #[arg(long, default_value_t = 3)]
        per_section: usize,
        #[arg(long, default_value = "7", help = "Minimum summed rating per section")]
        min_section_rating: Decimal,
        #[arg(long, default_value = "7", help = "Maximum summed price per section")]
        max_section_price: Decimal,
        #[arg(long, default_value = "13", help = "Maximum summed price across all sections")]
        max_total_price: Decimal,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn execute(command: Command) -> CommandResult {
    match command {
        Command::Rank { profile, limit } => commands::rank::run(&profile, limit),
        Command::Plan {
            profile,
            sections,
            per_section,
            min_section_rating,
            max_section_price,
            max_total_price,
        } => commands::plan::run(&PlanArgs {
            profile,
            sections,
            per_section,
            min_section_rating,
            max_section_price,
            max_total_price,
        }),
        Command::Config => commands::config::run(),
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let result = execute(cli.command);

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
