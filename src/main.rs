use std::time::Duration;

use anyhow::{ensure, Context, Result};
use checkers_core::{Board, Color, GameOutcome};
use checkers_engine::genetic::{DEFAULT_POPULATION, MUTATION_RATE};
use checkers_engine::{CheckersAi, EngineError, GeneticConfig, Player, SearchLimits, Strategy};
use clap::Parser;
use log::{debug, info, warn};

// Games still running after this many plies are drawn
const MOVE_LIMIT: usize = 150;

/// Headless checkers matches between two computer players.
#[derive(Parser, Debug)]
#[command(name = "checkers", version)]
struct Args {
    /// Strategy for black: minimax, alpha-beta, negamax, negascout or genetic
    #[arg(long, default_value = "alpha-beta")]
    black: Strategy,

    /// Strategy for white
    #[arg(long, default_value = "genetic")]
    white: Strategy,

    /// Search depth in plies for both sides
    #[arg(short, long, default_value_t = 4)]
    depth: u8,

    /// Overrides --depth for black
    #[arg(long)]
    black_depth: Option<u8>,

    /// Overrides --depth for white
    #[arg(long)]
    white_depth: Option<u8>,

    /// Genetic population size
    #[arg(long, default_value_t = DEFAULT_POPULATION)]
    population: usize,

    #[arg(long, default_value_t = MUTATION_RATE)]
    mutation_rate: f64,

    /// Seed for the genetic players and evaluation noise
    #[arg(long)]
    seed: Option<u64>,

    /// Relative evaluation noise, e.g. 0.03
    #[arg(long)]
    noise: Option<f64>,

    /// Per-move search deadline in milliseconds
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Split tree searches over all cores
    #[arg(long)]
    parallel: bool,

    #[arg(long, default_value_t = MOVE_LIMIT)]
    move_limit: usize,

    #[arg(short, long, default_value_t = 1)]
    games: usize,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Default)]
struct SideStats {
    moves: u32,
    think_time: Duration,
}

impl SideStats {
    fn average(&self) -> Duration {
        if self.moves == 0 {
            Duration::ZERO
        } else {
            self.think_time / self.moves
        }
    }
}

#[derive(Debug)]
struct GameRecord {
    outcome: GameOutcome,
    plies: usize,
    black: SideStats,
    white: SideStats,
}

fn build_player(args: &Args, color: Color) -> CheckersAi {
    let (strategy, depth, seed) = match color {
        Color::Black => (args.black, args.black_depth, args.seed),
        Color::White => (args.white, args.white_depth, args.seed.map(|s| s.wrapping_add(1))),
    };
    let genetic = GeneticConfig {
        population_size: args.population,
        mutation_rate: args.mutation_rate,
        seed,
    };
    let limits = match args.deadline_ms {
        Some(ms) => SearchLimits::with_deadline(Duration::from_millis(ms)),
        None => SearchLimits::default(),
    };

    let mut ai = CheckersAi::new(Player::new(color, strategy, depth.unwrap_or(args.depth)))
        .with_genetic(genetic)
        .with_limits(limits)
        .parallel(args.parallel);
    if let Some(noise) = args.noise {
        ai = ai.with_eval_noise(noise);
    }
    ai
}

// The decided result with `mover` to play, with a stuck mover losing.
fn decided(board: &Board, mover: Color) -> Option<GameOutcome> {
    board.outcome(mover).map(|outcome| match outcome {
        GameOutcome::NoMove(stuck) => {
            info!("{stuck} cannot move and loses");
            GameOutcome::win_for(stuck.opponent())
        }
        other => other,
    })
}

fn play_game(
    black: &mut CheckersAi,
    white: &mut CheckersAi,
    start: Board,
    move_limit: usize,
) -> Result<GameRecord> {
    let mut board = start;
    let mut mover = Color::Black;
    let mut stats = [SideStats::default(), SideStats::default()];

    let mut plies = 0;
    // The position is judged before the limit so a deciding last ply still counts.
    let outcome = loop {
        if let Some(outcome) = decided(&board, mover) {
            break outcome;
        }
        if plies >= move_limit {
            break GameOutcome::Draw;
        }

        let (ai, side) = match mover {
            Color::Black => (&mut *black, &mut stats[0]),
            Color::White => (&mut *white, &mut stats[1]),
        };
        match ai.choose_move(&board) {
            Ok(choice) => {
                board = board
                    .play(choice.mv, mover)
                    .with_context(|| format!("{mover} chose an illegal move"))?;
                side.moves += 1;
                side.think_time += choice.elapsed;
                debug!("ply {plies}: {mover} {} (score {})\n{board}", choice.mv, choice.score);
            }
            Err(EngineError::DegenerateGeneticPopulation) => {
                warn!("{mover} found no usable population and passes");
            }
            Err(err) => return Err(err).with_context(|| format!("{mover} failed to pick a move")),
        }
        mover = mover.opponent();
        plies += 1;
    };

    let [black_stats, white_stats] = stats;
    Ok(GameRecord {
        outcome,
        plies,
        black: black_stats,
        white: white_stats,
    })
}

fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    ensure!(args.population > 0, "population must hold at least one chromosome");
    ensure!(args.games > 0, "nothing to play: --games is 0");

    let mut black = build_player(&args, Color::Black);
    let mut white = build_player(&args, Color::White);
    info!(
        "{} games: black {} depth {}, white {} depth {}",
        args.games,
        black.player().strategy,
        black.player().ply_depth,
        white.player().strategy,
        white.player().ply_depth
    );

    let (mut black_wins, mut white_wins, mut draws) = (0, 0, 0);
    let mut black_think = Duration::ZERO;
    let mut white_think = Duration::ZERO;
    for game in 1..=args.games {
        let record = play_game(&mut black, &mut white, Board::new(), args.move_limit)
            .with_context(|| format!("game {game} aborted"))?;
        match record.outcome {
            GameOutcome::BlackWins => black_wins += 1,
            GameOutcome::WhiteWins => white_wins += 1,
            _ => draws += 1,
        }
        black_think += record.black.average();
        white_think += record.white.average();
        info!(
            "game {game}: {} after {} plies (black avg {:?}, white avg {:?})",
            record.outcome,
            record.plies,
            record.black.average(),
            record.white.average()
        );
    }

    let games = u32::try_from(args.games).unwrap_or(u32::MAX);
    info!(
        "round over: black {black_wins}, white {white_wins}, draws {draws}; \
         average think time black {:?}, white {:?}",
        black_think / games,
        white_think / games
    );
    Ok(())
}
