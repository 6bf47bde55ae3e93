use std::{path::PathBuf, sync::Arc};

use clap::{Parser, ValueEnum};
use database::{ChildStore, DatabaseConfig};
use rand::{rngs::StdRng, SeedableRng};
use simulation::{
    run_matching_game, run_puzzle_game, PlayOptions, SimulationConfig, SimulationError, Trackers,
};
use strategies::{DefaultStrategy, InputStrategy, RandomStrategy};
use types::{ChildId, MatchGameState, MatchStrategy, PuzzleState, PuzzleStrategy, SystemClock};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Game {
    Puzzle,
    Matching,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Player {
    Default,
    Random,
    Input,
}

#[derive(Parser, Debug)]
struct Params {
    /// YAML file with simulation settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    child: Option<String>,

    #[arg(short, long, value_enum, default_value = "puzzle")]
    game: Game,

    #[arg(short, long, value_enum, default_value = "default")]
    player: Player,

    #[arg(long)]
    grid_size: Option<usize>,

    /// Values to deal as pairs, e.g. `--pairs cat --pairs dog`
    #[arg(long = "pairs")]
    pair_values: Vec<String>,

    #[arg(long)]
    mismatch_delay_ms: Option<u64>,

    #[arg(long)]
    database_url: Option<String>,

    #[arg(short = 'n', long, default_value_t = 1)]
    games: u32,

    #[arg(long)]
    seed: Option<u64>,
}

fn load_config(args: &Params) -> Result<SimulationConfig, SimulationError> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_file(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(child) = &args.child {
        config.child_id = child.clone();
    }
    if let Some(grid_size) = args.grid_size {
        config.grid_size = grid_size;
    }
    if !args.pair_values.is_empty() {
        config.pair_values = args.pair_values.clone();
    }
    if let Some(delay) = args.mismatch_delay_ms {
        config.mismatch_delay_ms = delay;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    Ok(config)
}

fn puzzle_player(player: Player) -> Box<dyn PuzzleStrategy> {
    match player {
        Player::Default => Box::new(DefaultStrategy::default()),
        Player::Random => Box::new(RandomStrategy::default()),
        Player::Input => Box::new(InputStrategy::default()),
    }
}

fn matching_player(player: Player) -> Box<dyn MatchStrategy> {
    match player {
        Player::Default => Box::new(DefaultStrategy::default()),
        Player::Random => Box::new(RandomStrategy::default()),
        Player::Input => Box::new(InputStrategy::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Params::parse();
    log::info!("args: {args:?}");

    let config = load_config(&args)?;
    let child_id = ChildId::parse(&config.child_id)?;
    let db_config =
        DatabaseConfig::from_cli_or_env_or_yaml(args.database_url.clone(), config.database_url.clone());
    let store = db_config.connect().await.map_err(SimulationError::from)?;
    let trackers = Trackers::new(
        ChildStore::new(Arc::new(store)),
        Arc::new(SystemClock),
        config.activity_log_capacity,
    );
    let options = PlayOptions::from(&config);
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    for round in 1..=args.games {
        log::info!("Game {round} of {}", args.games);
        match args.game {
            Game::Puzzle => {
                let mut puzzle = match trackers.progress.load_puzzle(child_id.as_str()).await {
                    Some(saved) if saved.grid_size() == config.grid_size => {
                        log::info!("Resuming saved puzzle after {} moves", saved.move_count());
                        saved
                    }
                    _ => PuzzleState::new_with_rng(config.grid_size, &mut rng)?,
                };
                let mut player = puzzle_player(args.player);
                let summary =
                    run_puzzle_game(&trackers, &child_id, &mut puzzle, player.as_mut(), options)
                        .await?;
                log::info!("{summary:?}");
            }
            Game::Matching => {
                let mut game = match trackers.progress.load_card_game(child_id.as_str()).await {
                    Some(saved) => {
                        log::info!("Resuming saved card game at move {}", saved.move_count());
                        saved
                    }
                    None => MatchGameState::new_with_rng(&config.pair_values, &mut rng)?,
                };
                let mut player = matching_player(args.player);
                let summary =
                    run_matching_game(&trackers, &child_id, &mut game, player.as_mut(), options)
                        .await?;
                log::info!("{summary:?}");
            }
        }
    }

    let weekly = trackers
        .learning_time
        .get_weekly_stats(child_id.as_str())
        .await;
    println!("This week: {weekly}");
    println!(
        "Card games: {:?}",
        trackers.progress.overall_stats(child_id.as_str()).await
    );
    let activities = trackers
        .activities
        .query_activities(child_id.as_str())
        .await;
    println!("{}", serde_json::to_string_pretty(&activities)?);
    Ok(())
}
