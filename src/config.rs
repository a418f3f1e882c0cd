use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::engine::parlay::ParlaySettings;
use crate::pipeline::ScanSettings;

/// Value-bet detector and parlay builder
#[derive(Parser, Debug, Clone)]
#[command(name = "parlay-scout", version, about)]
pub struct Config {
    /// SQLite database holding candidate bets
    #[arg(long, env = "DATABASE_PATH", default_value = "bets.db", global = true)]
    pub database_path: String,

    /// SQLite database with imported team statistics (defaults to the bets database)
    #[arg(long, env = "STATS_DB_PATH", global = true)]
    pub stats_db_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Evaluate scraped matches, save value legs and print parlays
    Scan(ScanArgs),
    /// Grade pending bets against final scores
    Settle {
        /// JSON list of {match, home_goals, away_goals, home_corners?, away_corners?}
        #[arg(long)]
        scores: PathBuf,
    },
    /// Print won/lost counts of saved bets
    Stats,
    /// Load team statistics into the stats database
    ImportStats {
        /// JSON object of {team: {stat: value}}
        #[arg(long)]
        input: PathBuf,

        #[arg(long, default_value = "current")]
        season: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Scraped document: {teams: [...], matches: [...]}
    #[arg(long)]
    pub input: PathBuf,

    /// Minimum estimated-minus-implied probability for a value leg
    #[arg(long, env = "VALUE_MARGIN", default_value = "0.05")]
    pub value_margin: f64,

    /// Lowest leg odd admitted to parlays
    #[arg(long, env = "MIN_LEG_ODD", default_value = "1.1")]
    pub min_leg_odd: f64,

    /// Highest leg odd admitted to parlays
    #[arg(long, env = "MAX_LEG_ODD", default_value = "2.0")]
    pub max_leg_odd: f64,

    /// Minimum combined parlay odd
    #[arg(long, env = "PARLAY_TARGET", default_value = "2.0")]
    pub parlay_target: f64,

    #[arg(long, env = "MAX_PARLAY_LEGS", default_value = "3")]
    pub max_parlay_legs: usize,

    /// Allow parlays mixing legs of different matches
    #[arg(long, env = "ALLOW_CROSS_MATCH", default_value = "true", action = clap::ArgAction::Set)]
    pub allow_cross_match: bool,

    /// Largest leg pool searched for parlays; the search is exhaustive
    #[arg(long, env = "MAX_PARLAY_POOL", default_value = "40")]
    pub max_parlay_pool: usize,

    /// Matches evaluated at the same time
    #[arg(long, env = "CONCURRENCY", default_value = "4")]
    pub concurrency: usize,

    /// Parlays printed in the summary
    #[arg(long, default_value = "20")]
    pub top: usize,

    /// Write the full report as JSON
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Sofascore API base URL; enables event lookups for team names
    #[arg(long, env = "SOFASCORE_API_URL")]
    pub sofascore_api_url: Option<String>,

    /// Evaluate without saving value legs
    #[arg(long, default_value = "false")]
    pub dry_run: bool,
}

impl ScanArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..1.0).contains(&self.value_margin) {
            anyhow::bail!("value_margin must be in [0.0, 1.0)");
        }
        if self.min_leg_odd < 1.0 || self.min_leg_odd > self.max_leg_odd {
            anyhow::bail!("leg odd window must satisfy 1.0 <= min_leg_odd <= max_leg_odd");
        }
        if self.parlay_target < 1.0 {
            anyhow::bail!("parlay_target must be at least 1.0");
        }
        if self.max_parlay_legs < 1 {
            anyhow::bail!("max_parlay_legs must be at least 1");
        }
        if self.max_parlay_pool < 1 {
            anyhow::bail!("max_parlay_pool must be at least 1");
        }
        if self.concurrency < 1 {
            anyhow::bail!("concurrency must be at least 1");
        }
        Ok(())
    }

    pub fn settings(&self) -> ScanSettings {
        ScanSettings {
            value_margin: self.value_margin,
            min_leg_odd: self.min_leg_odd,
            max_leg_odd: self.max_leg_odd,
            parlay: ParlaySettings {
                target_odd: self.parlay_target,
                max_legs: self.max_parlay_legs,
                allow_cross_match: self.allow_cross_match,
            },
            max_parlay_pool: self.max_parlay_pool,
            concurrency: self.concurrency,
        }
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_path.trim().is_empty() {
            anyhow::bail!("database_path must not be empty");
        }
        match &self.command {
            Command::Scan(args) => args.validate(),
            Command::ImportStats { season, .. } if season.trim().is_empty() => {
                anyhow::bail!("season must not be empty")
            }
            _ => Ok(()),
        }
    }

    /// Path of the team statistics database
    pub fn stats_db(&self) -> &str {
        self.stats_db_path.as_deref().unwrap_or(&self.database_path)
    }
}
