//! Population-based move selection.
//!
//! Random playouts from the current position form the population. They are
//! merged by shared move prefix into a [`ReservationTree`], scored by minimax
//! backpropagation over that tree, then bred (crossover and mutation) and
//! culled one individual per generation until a single line survives.

use checkers_core::{legal_moves, Board, CheckersError, Color, Move};
use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::evaluation::Evaluator;
use crate::reservation::ReservationTree;
use crate::EngineError;

pub const DEFAULT_POPULATION: usize = 4;
pub const MUTATION_RATE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneticConfig {
    pub population_size: usize,
    /// Chance that each chromosome is mutated in a generation.
    pub mutation_rate: f64,
    /// Fixed seed for reproducible games; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: DEFAULT_POPULATION,
            mutation_rate: MUTATION_RATE,
            seed: None,
        }
    }
}

impl GeneticConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(EngineError::InvalidConfig(format!(
                "mutation rate {} is outside [0, 1]",
                self.mutation_rate
            )));
        }
        Ok(())
    }

    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// One move of a playout together with the position it produced and the
/// side that played it. `score` is filled in by tree evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Gene {
    pub mv: Move,
    pub board: Board,
    pub mover: Color,
    pub score: i32,
}

impl Gene {
    pub fn new(mv: Move, board: Board, mover: Color) -> Self {
        Self {
            mv,
            board,
            mover,
            score: 0,
        }
    }
}

/// One playout from the root position, first move first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chromosome {
    pub genes: Vec<Gene>,
    pub fitness: usize,
}

impl Chromosome {
    pub fn new(genes: Vec<Gene>) -> Self {
        let mut chromosome = Self { genes, fitness: 0 };
        chromosome.refresh_fitness();
        chromosome
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn opening_move(&self) -> Option<Move> {
        self.genes.first().map(|gene| gene.mv)
    }

    pub fn leaf(&self) -> Option<&Gene> {
        self.genes.last()
    }

    pub fn moves(&self) -> impl Iterator<Item = Move> + '_ {
        self.genes.iter().map(|gene| gene.mv)
    }

    /// Number of genes whose score agrees with the leaf's score.
    pub fn refresh_fitness(&mut self) {
        self.fitness = match self.leaf() {
            Some(leaf) => {
                let outcome = leaf.score;
                self.genes.iter().filter(|gene| gene.score == outcome).count()
            }
            None => 0,
        };
    }

    /// Two parents with the same opening move keep their common prefix and
    /// swap everything from the first differing move on. Parents that open
    /// differently are returned unchanged.
    pub fn crossover(&self, other: &Chromosome) -> (Chromosome, Chromosome) {
        if self.opening_move().is_none() || self.opening_move() != other.opening_move() {
            return (self.clone(), other.clone());
        }
        let split = self
            .moves()
            .zip(other.moves())
            .take_while(|(a, b)| a == b)
            .count();

        let first = self.genes[..split]
            .iter()
            .chain(&other.genes[split..])
            .cloned()
            .collect();
        let second = other.genes[..split]
            .iter()
            .chain(&self.genes[split..])
            .cloned()
            .collect();
        (Chromosome::new(first), Chromosome::new(second))
    }

    /// Keeps a random non-empty prefix and regrows the rest of the line with
    /// a fresh random playout up to `depth_limit` plies.
    pub fn mutate<R: Rng + ?Sized>(&self, rng: &mut R, depth_limit: usize) -> Chromosome {
        if self.genes.is_empty() {
            return self.clone();
        }
        let cut = rng.gen_range(1..=self.genes.len());
        let mut genes = self.genes[..cut].to_vec();
        if let Some(last) = genes.last().cloned() {
            grow(rng, &mut genes, &last.board, last.mover.opponent(), cut, depth_limit);
        }
        Chromosome::new(genes)
    }
}

/// A random playout from `board` with `color` to move at `ply`, continued
/// until `depth_limit`, a finished game, or a side with no move. Returns
/// `None` for a dead playout that could not make a single move.
pub fn build_chromosome<R: Rng + ?Sized>(
    rng: &mut R,
    board: &Board,
    color: Color,
    ply: usize,
    depth_limit: usize,
) -> Option<Chromosome> {
    let mut genes = Vec::new();
    grow(rng, &mut genes, board, color, ply, depth_limit);
    if genes.is_empty() {
        None
    } else {
        Some(Chromosome::new(genes))
    }
}

fn grow<R: Rng + ?Sized>(
    rng: &mut R,
    genes: &mut Vec<Gene>,
    board: &Board,
    color: Color,
    ply: usize,
    depth_limit: usize,
) {
    if ply >= depth_limit || board.is_game_over() {
        return;
    }
    let moves = legal_moves(board, color);
    let mv = match moves.choose(rng) {
        Some(&mv) => mv,
        None => return,
    };
    let next = board.apply_move(mv);
    genes.push(Gene::new(mv, next, color));
    grow(rng, genes, &next, color.opponent(), ply + 1, depth_limit);
}

/// The initial population: `population_size` independent playouts. Dead
/// playouts are kept as `None` so the caller can tell them apart.
pub fn get_all_chromosomes<R: Rng + ?Sized>(
    rng: &mut R,
    board: &Board,
    color: Color,
    ply: usize,
    depth_limit: usize,
    population_size: usize,
) -> Vec<Option<Chromosome>> {
    (0..population_size)
        .map(|_| build_chromosome(rng, board, color, ply, depth_limit))
        .collect()
}

/// Result of a genetic search.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneticOutcome {
    /// Best root move found by the last tree evaluation.
    pub best_move: Move,
    /// Its backed-up score, from the mover's side.
    pub score: i32,
    /// The last chromosome standing.
    pub survivor: Chromosome,
    pub generations: usize,
}

impl GeneticOutcome {
    pub fn survivor_move(&self) -> Option<Move> {
        self.survivor.opening_move()
    }
}

/// Chooses a move for `color` by evolving random playouts of `ply_depth`
/// plies. Fails with `NoMovesAvailable` when `color` cannot move and with
/// `DegenerateGeneticPopulation` when no usable population can be built.
pub fn choose_move_genetic<R: Rng + ?Sized, E: Evaluator + ?Sized>(
    rng: &mut R,
    board: &Board,
    color: Color,
    ply_depth: u8,
    config: &GeneticConfig,
    evaluator: &E,
) -> Result<GeneticOutcome, EngineError> {
    config.validate()?;
    if legal_moves(board, color).is_empty() {
        return Err(CheckersError::NoMovesAvailable { color }.into());
    }
    let depth_limit = usize::from(ply_depth.max(1));

    let initial = get_all_chromosomes(rng, board, color, 0, depth_limit, config.population_size);
    if initial.is_empty() || initial.iter().any(Option::is_none) {
        warn!(
            "genetic search for {color}: {} of {} playouts died",
            initial.iter().filter(|c| c.is_none()).count(),
            initial.len()
        );
        return Err(EngineError::DegenerateGeneticPopulation);
    }
    let initial: Vec<Chromosome> = initial.into_iter().flatten().collect();

    let mut tree = ReservationTree::from_population(color, &initial);
    let (mut score, mut best_move) = tree
        .evaluate(evaluator)
        .ok_or(EngineError::DegenerateGeneticPopulation)?;
    let mut population = tree.paths();
    let mut generations = 0;

    while population.len() > 1 {
        generations += 1;
        breed(rng, &mut population, config.mutation_rate, depth_limit);

        tree = ReservationTree::from_population(color, &population);
        trace!("generation {generations}: {} nodes, {} leaves", tree.len(), tree.leaf_count());
        (score, best_move) = tree
            .evaluate(evaluator)
            .ok_or(EngineError::DegenerateGeneticPopulation)?;
        population = tree.paths();

        if population.len() > 1 {
            cull_weakest(&mut population);
        }
        debug!(
            "generation {generations}: {} survivors, root best {best_move} ({score})",
            population.len()
        );
    }

    let survivor = population
        .pop()
        .ok_or(EngineError::DegenerateGeneticPopulation)?;
    info!(
        "genetic search for {color}: {best_move} (score {score}) after {generations} generations"
    );
    Ok(GeneticOutcome {
        best_move,
        score,
        survivor,
        generations,
    })
}

// Crossover of neighbouring pairs, then independent mutation.
fn breed<R: Rng + ?Sized>(
    rng: &mut R,
    population: &mut [Chromosome],
    mutation_rate: f64,
    depth_limit: usize,
) {
    for pair in population.chunks_exact_mut(2) {
        let (first, second) = pair[0].crossover(&pair[1]);
        pair[0] = first;
        pair[1] = second;
    }
    for chromosome in population.iter_mut() {
        if rng.gen_bool(mutation_rate) {
            *chromosome = chromosome.mutate(rng, depth_limit);
        }
    }
}

// Drops the single least fit chromosome; the earliest one on ties.
fn cull_weakest(population: &mut Vec<Chromosome>) {
    let weakest = population
        .iter()
        .enumerate()
        .min_by_key(|(index, chromosome)| (chromosome.fitness, *index))
        .map(|(index, _)| index);
    if let Some(index) = weakest {
        population.remove(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::StaticEvaluator;

    fn line(board: &Board, color: Color, moves: &[(u8, u8, u8, u8)]) -> Chromosome {
        let mut board = *board;
        let mut mover = color;
        let mut genes = Vec::new();
        for &(fr, fc, tr, tc) in moves {
            let mv = Move::from_coords(fr, fc, tr, tc).unwrap();
            board = board.play(mv, mover).unwrap();
            genes.push(Gene::new(mv, board, mover));
            mover = mover.opponent();
        }
        Chromosome::new(genes)
    }

    #[test]
    fn playout_alternates_sides_and_respects_depth() {
        let mut rng = StdRng::seed_from_u64(3);
        let board = Board::new();
        let chromosome = build_chromosome(&mut rng, &board, Color::Black, 0, 5).unwrap();
        assert_eq!(chromosome.len(), 5);
        let mut position = board;
        for (i, gene) in chromosome.genes.iter().enumerate() {
            let expected = if i % 2 == 0 { Color::Black } else { Color::White };
            assert_eq!(gene.mover, expected);
            position = position.play(gene.mv, gene.mover).unwrap();
            assert_eq!(position, gene.board);
        }
    }

    #[test]
    fn playout_with_no_moves_is_dead() {
        let board = Board::from_rows(&[
            "........", "........", "........", "........", "........", "........", "b.......",
            ".w......",
        ])
        .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(build_chromosome(&mut rng, &board, Color::Black, 0, 3).is_none());
        let population = get_all_chromosomes(&mut rng, &board, Color::Black, 0, 3, 4);
        assert_eq!(population.len(), 4);
        assert!(population.iter().all(Option::is_none));
    }

    #[test]
    fn crossover_swaps_tails_after_divergence() {
        let board = Board::new();
        let a = line(&board, Color::Black, &[(2, 1, 3, 0), (5, 0, 4, 1), (1, 0, 2, 1)]);
        let b = line(&board, Color::Black, &[(2, 1, 3, 0), (5, 2, 4, 3), (2, 3, 3, 4)]);
        let (c1, c2) = a.crossover(&b);

        assert_eq!(c1.genes[0], a.genes[0]);
        assert_eq!(c2.genes[0], b.genes[0]);
        assert_eq!(c1.genes[1..], b.genes[1..]);
        assert_eq!(c2.genes[1..], a.genes[1..]);
    }

    #[test]
    fn crossover_leaves_incompatible_parents_alone() {
        let board = Board::new();
        let a = line(&board, Color::Black, &[(2, 1, 3, 0), (5, 0, 4, 1)]);
        let b = line(&board, Color::Black, &[(2, 3, 3, 4), (5, 0, 4, 1)]);
        let (c1, c2) = a.crossover(&b);
        assert_eq!(c1, a);
        assert_eq!(c2, b);
    }

    #[test]
    fn mutation_keeps_the_opening_move() {
        let board = Board::new();
        let mut rng = StdRng::seed_from_u64(11);
        let parent = build_chromosome(&mut rng, &board, Color::Black, 0, 6).unwrap();
        for _ in 0..20 {
            let child = parent.mutate(&mut rng, 6);
            assert_eq!(child.opening_move(), parent.opening_move());
            assert!(!child.is_empty() && child.len() <= 6);
            for (i, gene) in child.genes.iter().enumerate() {
                let expected = if i % 2 == 0 { Color::Black } else { Color::White };
                assert_eq!(gene.mover, expected);
            }
        }
    }

    #[test]
    fn fitness_counts_genes_matching_the_leaf() {
        let board = Board::new();
        let mut chromosome = line(&board, Color::Black, &[(2, 1, 3, 0), (5, 0, 4, 1), (1, 0, 2, 1)]);
        let scores = [5, 7, 5];
        for (gene, score) in chromosome.genes.iter_mut().zip(scores) {
            gene.score = score;
        }
        chromosome.refresh_fitness();
        assert_eq!(chromosome.fitness, 2);
    }

    #[test]
    fn cull_removes_the_least_fit() {
        let board = Board::new();
        let mut population: Vec<Chromosome> = (0..3)
            .map(|_| line(&board, Color::Black, &[(2, 1, 3, 0)]))
            .collect();
        population[0].fitness = 3;
        population[1].fitness = 1;
        population[2].fitness = 2;
        cull_weakest(&mut population);
        let left: Vec<usize> = population.iter().map(|c| c.fitness).collect();
        assert_eq!(left, vec![3, 2]);
    }

    #[test]
    fn seeded_search_is_reproducible_and_legal() {
        let board = Board::new();
        let config = GeneticConfig {
            population_size: 8,
            seed: Some(42),
            ..GeneticConfig::default()
        };
        let first = choose_move_genetic(&mut config.rng(), &board, Color::Black, 3, &config, &StaticEvaluator)
            .unwrap();
        let second = choose_move_genetic(&mut config.rng(), &board, Color::Black, 3, &config, &StaticEvaluator)
            .unwrap();
        assert_eq!(first, second);

        let legal = legal_moves(&board, Color::Black);
        assert!(legal.contains(&first.best_move));
        assert!(first.survivor_move().is_some_and(|mv| legal.contains(&mv)));
        assert!(first.generations >= 1);
    }

    #[test]
    fn invalid_mutation_rate_is_rejected() {
        let config = GeneticConfig {
            mutation_rate: 1.5,
            ..GeneticConfig::default()
        };
        let result = choose_move_genetic(
            &mut config.rng(),
            &Board::new(),
            Color::Black,
            2,
            &config,
            &StaticEvaluator,
        );
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn empty_population_is_degenerate() {
        let config = GeneticConfig {
            population_size: 0,
            seed: Some(1),
            ..GeneticConfig::default()
        };
        let result = choose_move_genetic(
            &mut config.rng(),
            &Board::new(),
            Color::Black,
            2,
            &config,
            &StaticEvaluator,
        );
        assert_eq!(result, Err(EngineError::DegenerateGeneticPopulation));
    }
}
