use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

use parlay_scout::config::{Command, Config, ScanArgs};
use parlay_scout::db::Database;
use parlay_scout::engine::MatchEvaluator;
use parlay_scout::pipeline::{self, ScanReport};
use parlay_scout::sources::{ChainResolver, RecordTeams, SofascoreClient, TeamResolver, UrlSlugResolver};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    match &config.command {
        Command::Scan(args) => scan(&config, &db, args).await,
        Command::Settle { scores } => {
            let scores = pipeline::load_scores(scores)?;
            let report = pipeline::settle_pending(&db, &scores)?;
            info!(
                "Settled {} won, {} lost ({} ungradable, {} still waiting)",
                report.won, report.lost, report.ungradable, report.waiting
            );
            Ok(())
        }
        Command::Stats => {
            let stats = db.bet_stats()?;
            println!(
                "total={} won={} lost={} pct_won={:.1}%",
                stats.total, stats.won, stats.lost, stats.pct_won
            );
            Ok(())
        }
        Command::ImportStats { input, season } => {
            let stats_db = Database::open(config.stats_db())?;
            let written = pipeline::import_team_stats(&stats_db, input, season)?;
            info!("Imported statistics for {} team(s), season {}", written, season);
            Ok(())
        }
    }
}

async fn scan(config: &Config, db: &Database, args: &ScanArgs) -> Result<()> {
    let doc = pipeline::load_document(&args.input)?;
    info!(
        "Loaded {} matches and {} team records from {}",
        doc.matches.len(),
        doc.teams.len(),
        args.input.display()
    );

    // Team names: record first, then the page slug, then Sofascore when configured
    let mut resolvers: Vec<Arc<dyn TeamResolver>> = vec![Arc::new(RecordTeams), Arc::new(UrlSlugResolver)];
    if let Some(url) = &args.sofascore_api_url {
        resolvers.insert(1, Arc::new(SofascoreClient::new(Some(url))?));
    }
    let stats_db = match &config.stats_db_path {
        Some(path) => Database::open(path)?,
        None => db.clone(),
    };
    let evaluator = MatchEvaluator::new(Arc::new(ChainResolver::new(resolvers)), Arc::new(stats_db));

    let mut cache = pipeline::seed_cache(&doc);
    let report = pipeline::run_scan(&doc, &evaluator, &mut cache, &args.settings()).await;

    if args.dry_run {
        info!("Dry run: {} value legs not saved", report.value_legs.len());
    } else {
        let saved = db.save_candidates(&report.value_legs)?;
        info!("Saved {} candidate bets", saved);
    }

    if let Some(path) = &args.output {
        pipeline::write_report(&report, path)?;
        info!("Report written to {}", path.display());
    }
    print_report(&report, args.top);
    Ok(())
}

fn print_report(report: &ScanReport, top: usize) {
    for m in &report.matches {
        let teams = match (&m.home, &m.away) {
            (Some(home), Some(away)) => format!("{} x {}", home, away),
            _ => "teams unknown".to_string(),
        };
        println!("{} [{}] score={:.3} {}", m.match_id, teams, m.score, m.reason);
        for leg in &m.legs {
            println!(
                "    {:<20} odd={:<6.2} delta={:.3} {}",
                leg.market,
                leg.odd,
                leg.delta,
                leg.bookmaker.as_deref().unwrap_or("-")
            );
        }
    }

    if report.parlays.is_empty() {
        warn!("No parlay reached the target odd");
        return;
    }
    println!("\nTop parlays:");
    for (i, parlay) in report.parlays.iter().take(top).enumerate() {
        let legs: Vec<String> = parlay
            .legs
            .iter()
            .map(|l| format!("{} {}", l.match_id, l.market))
            .collect();
        println!(
            "{:>3}. odd={:.2} total_delta={:.3} | {}",
            i + 1,
            parlay.odd,
            parlay.total_delta,
            legs.join(" + ")
        );
    }
}
