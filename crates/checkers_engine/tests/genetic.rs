//! Genetic search scenarios played through the public API.

use checkers_core::{legal_moves, Board, CheckersError, Color, Move, Square};
use checkers_engine::genetic::{get_all_chromosomes, Gene};
use checkers_engine::{
    choose_move_genetic, CheckersAi, Chromosome, EngineError, GeneticConfig, Player,
    ReservationTree, StaticEvaluator, Strategy,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn sq(row: u8, col: u8) -> Square {
    Square::new(row, col).unwrap()
}

fn seeded(seed: u64, population_size: usize) -> GeneticConfig {
    GeneticConfig {
        population_size,
        seed: Some(seed),
        ..GeneticConfig::default()
    }
}

#[test]
fn stuck_side_reports_no_moves() {
    let board = Board::from_rows(&[
        "........", "........", "........", "........", "........", "........", "b.......",
        ".w......",
    ])
    .unwrap();
    let config = seeded(5, 4);
    let result = choose_move_genetic(&mut config.rng(), &board, Color::Black, 3, &config, &StaticEvaluator);
    assert_eq!(
        result,
        Err(EngineError::Core(CheckersError::NoMovesAvailable { color: Color::Black }))
    );
}

#[test]
fn forced_capture_is_the_only_opening_gene() {
    let board = Board::from_rows(&[
        "........", "..b.....", "...w....", "........", "........", "........", ".....w..",
        "........",
    ])
    .unwrap();
    let jump = Move::new(sq(1, 2), sq(3, 4));
    assert_eq!(legal_moves(&board, Color::Black), vec![jump]);

    let mut rng = StdRng::seed_from_u64(9);
    let population = get_all_chromosomes(&mut rng, &board, Color::Black, 0, 4, 6);
    for chromosome in population.iter().flatten() {
        assert_eq!(chromosome.opening_move(), Some(jump));
    }

    let config = seeded(9, 6);
    let outcome =
        choose_move_genetic(&mut config.rng(), &board, Color::Black, 4, &config, &StaticEvaluator).unwrap();
    assert_eq!(outcome.best_move, jump);
    assert_eq!(outcome.survivor_move(), Some(jump));
}

#[test]
fn population_shrinks_to_one_survivor() {
    let board = Board::new();
    for size in [1, 2, 5, 8] {
        let config = seeded(21, size);
        let outcome =
            choose_move_genetic(&mut config.rng(), &board, Color::White, 4, &config, &StaticEvaluator).unwrap();
        assert!(legal_moves(&board, Color::White).contains(&outcome.best_move));
        assert!(!outcome.survivor.is_empty());
        // Each generation drops one chromosome until a single one remains,
        // unless identical lines merge in the tree first.
        assert!(outcome.generations < size.max(1));
    }
}

#[test]
fn tree_paths_keep_every_distinct_line() {
    let board = Board::new();
    let mut rng = StdRng::seed_from_u64(33);
    let population: Vec<Chromosome> = get_all_chromosomes(&mut rng, &board, Color::Black, 0, 5, 10)
        .into_iter()
        .flatten()
        .collect();
    let mut tree = ReservationTree::from_population(Color::Black, &population);
    tree.evaluate(&StaticEvaluator).unwrap();

    let paths = tree.paths();
    assert_eq!(paths.len(), tree.leaf_count());
    for path in &paths {
        let moves: Vec<Move> = path.moves().collect();
        assert!(population
            .iter()
            .any(|c| c.moves().collect::<Vec<_>>().starts_with(&moves)));
        let replayed = path
            .genes
            .iter()
            .try_fold(board, |position, gene: &Gene| position.play(gene.mv, gene.mover));
        assert_eq!(replayed.ok(), path.leaf().map(|gene| gene.board));
    }
}

#[test]
fn seeded_players_repeat_their_games() {
    let play = || {
        let mut black = CheckersAi::new(Player::new(Color::Black, Strategy::Genetic, 3))
            .with_genetic(seeded(17, 4));
        let mut white = CheckersAi::new(Player::new(Color::White, Strategy::Genetic, 3))
            .with_genetic(seeded(18, 4));
        let mut board = Board::new();
        let mut moves = Vec::new();
        for turn in 0..12 {
            let ai = if turn % 2 == 0 { &mut black } else { &mut white };
            let color = ai.player().color;
            if board.outcome(color).is_some() {
                break;
            }
            let choice = ai.choose_move(&board).unwrap();
            board = board.play(choice.mv, color).unwrap();
            moves.push(choice.mv);
        }
        moves
    };
    assert_eq!(play(), play());
}
