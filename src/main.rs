use clap::{Args, Parser, Subcommand};
use flexi_logger::{FlexiLoggerError, Logger, LoggerHandle};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::prelude::*;
use rummy_planner::game::GameError;
use rummy_planner::rng::GameRng;
use rummy_planner::simulation::{
    run_game, BotSession, ConfigError, Evaluation, GameResult, MatchConfig, MatchTally,
};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Node budget used when neither the config file nor the command line sets one
const DEFAULT_MAX_NODES: u64 = 20_000;

#[derive(Parser)]
#[command(name = "rummy-planner")]
#[command(about = "Rummy bots that plan each turn by search", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log planner decisions (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args, Clone, Default)]
struct MatchArgs {
    /// JSON match config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of players
    #[arg(short, long)]
    players: Option<usize>,

    /// Evaluation strategy for every seat
    #[arg(long, value_enum)]
    strategy: Option<Evaluation>,

    /// Meld-search node budget per search root
    #[arg(long)]
    max_nodes: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch of games between planner bots (default)
    Run {
        /// Number of games to simulate
        #[arg(short = 'n', long = "games", default_value = "100")]
        num_games: usize,

        /// Seed for reproducibility; game i uses seed + i
        #[arg(short, long)]
        seed: Option<u64>,

        /// Write a JSON report here
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        match_args: MatchArgs,
    },

    /// Compare two evaluation strategies head to head
    Compare {
        /// First strategy
        #[arg(value_enum)]
        first: Evaluation,

        /// Second strategy
        #[arg(value_enum)]
        second: Evaluation,

        /// Number of seeds; each is played twice with seats swapped
        #[arg(short = 'n', long = "games", default_value = "100")]
        num_games: usize,

        /// Seed for reproducibility
        #[arg(short, long)]
        seed: Option<u64>,

        #[command(flatten)]
        match_args: MatchArgs,
    },

    /// Play one seat over the line protocol on stdin/stdout
    Bot {
        /// Seed for determinization
        #[arg(short, long)]
        seed: Option<u64>,

        #[command(flatten)]
        match_args: MatchArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    let _logger = match init_logging(cli.verbose) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("✗ Failed to start logger: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Run {
            num_games,
            seed,
            report,
            match_args,
        }) => {
            let config = load_config(&match_args);
            run_simulation(&config, num_games, seed, report);
        }
        Some(Commands::Compare {
            first,
            second,
            num_games,
            seed,
            match_args,
        }) => {
            let config = load_config(&match_args);
            compare_strategies(&config, first, second, num_games, seed);
        }
        Some(Commands::Bot { seed, match_args }) => {
            let config = load_config(&match_args);
            run_bot(&config, seed);
        }
        None => {
            let config = load_config(&MatchArgs::default());
            run_simulation(&config, 100, None, None);
        }
    }
}

fn init_logging(verbose: bool) -> Result<LoggerHandle, FlexiLoggerError> {
    Logger::try_with_env_or_str(if verbose { "debug" } else { "info" })?
        .format(flexi_logger::colored_default_format)
        .log_to_stderr()
        .start()
}

fn load_config(args: &MatchArgs) -> MatchConfig {
    match build_config(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Failed to load config: {}", e);
            std::process::exit(1);
        }
    }
}

/// Config file first, then command-line overrides
fn build_config(args: &MatchArgs) -> Result<MatchConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => MatchConfig::from_file(path)?,
        None => MatchConfig::default(),
    };
    if let Some(players) = args.players {
        config.players = players;
    }
    if let Some(strategy) = args.strategy {
        config.planner.evaluation = strategy;
        config.strategies.clear();
    }
    config.planner.max_nodes = args
        .max_nodes
        .or(config.planner.max_nodes)
        .or(Some(DEFAULT_MAX_NODES));
    config.validate()?;
    Ok(config)
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} games ({eta})") {
        bar.set_style(style);
    }
    bar
}

fn run_batch(config: &MatchConfig, seeds: &[u64], bar: &ProgressBar) -> Result<Vec<GameResult>, GameError> {
    seeds
        .par_iter()
        .map(|seed| {
            let result = run_game(config, *seed);
            bar.inc(1);
            result
        })
        .collect()
}

fn tally(players: usize, results: &[GameResult]) -> MatchTally {
    results.iter().fold(MatchTally::new(players), |mut tally, result| {
        tally.record(result);
        tally
    })
}

#[derive(Serialize)]
struct Report<'a> {
    generated_at: String,
    seed: u64,
    config: &'a MatchConfig,
    tally: &'a MatchTally,
    games: &'a [GameResult],
}

fn run_simulation(config: &MatchConfig, num_games: usize, seed: Option<u64>, report: Option<PathBuf>) {
    let base_seed = seed.unwrap_or_else(|| GameRng::new(None).seed());

    println!("\n=== Rummy Planner Simulator ===\n");
    println!("Players: {}", config.players);
    for seat in 0..config.players {
        let planner = config.seat_planner(seat);
        println!("  Seat {}: {}", seat, planner.evaluation);
    }
    println!("Node budget: {:?}", config.planner.max_nodes);
    println!("Games: {}", num_games);
    println!("Seed: {}", base_seed);
    println!();

    let start = std::time::Instant::now();
    let seeds: Vec<u64> = (0..num_games).map(|i| base_seed.wrapping_add(i as u64)).collect();
    let bar = progress_bar(num_games);
    let results = match run_batch(config, &seeds, &bar) {
        Ok(results) => results,
        Err(e) => {
            bar.abandon();
            eprintln!("✗ Game failed: {}", e);
            std::process::exit(1);
        }
    };
    bar.finish_and_clear();
    let elapsed = start.elapsed();

    let tally = tally(config.players, &results);
    println!("=== Results ===\n");
    print!("{}", tally);
    println!();
    println!(
        "Simulation completed in {:.2?} ({:.1} games/sec)",
        elapsed,
        num_games as f64 / elapsed.as_secs_f64()
    );

    if let Some(path) = report {
        let report = Report {
            generated_at: chrono::Utc::now().to_rfc3339(),
            seed: base_seed,
            config,
            tally: &tally,
            games: &results,
        };
        let written = serde_json::to_string_pretty(&report)
            .map_err(io::Error::from)
            .and_then(|json| std::fs::write(&path, json));
        match written {
            Ok(()) => info!("report written to {}", path.display()),
            Err(e) => eprintln!("✗ Failed to write report '{}': {}", path.display(), e),
        }
    }
}

/// Seat 0 and seat 1 exchanged, so a swapped game tallies by strategy
fn swap_seats(result: &GameResult) -> GameResult {
    GameResult {
        scores: result.scores.iter().rev().copied().collect(),
        winner: 1 - result.winner,
        went_out: result.went_out.map(|seat| 1 - seat),
        ..result.clone()
    }
}

fn compare_strategies(
    base: &MatchConfig,
    first: Evaluation,
    second: Evaluation,
    num_games: usize,
    seed: Option<u64>,
) {
    let base_seed = seed.unwrap_or_else(|| GameRng::new(None).seed());
    let forward = MatchConfig {
        players: 2,
        strategies: vec![first, second],
        ..base.clone()
    };
    let backward = MatchConfig {
        strategies: vec![second, first],
        ..forward.clone()
    };

    println!("\n=== Rummy Strategy Comparison ===\n");
    println!("Strategy 1: {}", first);
    println!("Strategy 2: {}", second);
    println!("Seeds: {} (each played from both seats)", num_games);
    println!("Seed: {}", base_seed);
    println!();

    let start = std::time::Instant::now();
    let seeds: Vec<u64> = (0..num_games).map(|i| base_seed.wrapping_add(i as u64)).collect();
    let bar = progress_bar(num_games * 2);
    let results = run_batch(&forward, &seeds, &bar).and_then(|forward_results| {
        let backward_results = run_batch(&backward, &seeds, &bar)?;
        Ok((forward_results, backward_results))
    });
    let (forward_results, backward_results) = match results {
        Ok(results) => results,
        Err(e) => {
            bar.abandon();
            eprintln!("✗ Game failed: {}", e);
            std::process::exit(1);
        }
    };
    bar.finish_and_clear();
    let elapsed = start.elapsed();

    let swapped: Vec<GameResult> = backward_results.iter().map(swap_seats).collect();
    let by_strategy = tally(2, &forward_results).merge(tally(2, &swapped));

    let label1 = format!("1: {}", first);
    let label2 = format!("2: {}", second);
    println!("=== Results ===\n");
    println!("{:20} {:>18} {:>18}", "Metric", label1, label2);
    println!("{:-<58}", "");
    println!(
        "{:20} {:>17.1}% {:>17.1}%",
        "Win rate",
        by_strategy.win_rate(0) * 100.0,
        by_strategy.win_rate(1) * 100.0
    );
    println!(
        "{:20} {:>18.2} {:>18.2}",
        "Avg score",
        by_strategy.average_score(0),
        by_strategy.average_score(1)
    );
    println!(
        "{:20} {:>18} {:>18}",
        "Went out", by_strategy.went_out[0], by_strategy.went_out[1]
    );

    println!();
    let (score1, score2) = (by_strategy.average_score(0), by_strategy.average_score(1));
    if score1 > score2 {
        println!("✓ {} scores {:.2} more per game", first, score1 - score2);
    } else if score2 > score1 {
        println!("✓ {} scores {:.2} more per game", second, score2 - score1);
    } else {
        println!("Both strategies score the same on average");
    }

    println!("\nCompleted in {:.2?}", elapsed);
}

fn run_bot(config: &MatchConfig, seed: Option<u64>) {
    let mut session = BotSession::new(config.planner, seed);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("✗ Failed to read input: {}", e);
                std::process::exit(1);
            }
        };
        match session.handle_line(&line) {
            Ok(replies) => {
                for reply in replies {
                    if writeln!(stdout, "{}", reply).is_err() {
                        std::process::exit(1);
                    }
                }
                let _ = stdout.flush();
            }
            Err(e) => {
                eprintln!("✗ {}", e);
                std::process::exit(1);
            }
        }
        if session.is_finished() {
            break;
        }
    }
}
