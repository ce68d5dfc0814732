// Prefix-sharing tree over a population of playouts. Nodes live in one arena
// and refer to each other by index; a child always has a larger index than
// its parent, which lets evaluation run as a single reverse sweep.
use checkers_core::{Color, Move};
use log::trace;

use crate::evaluation::Evaluator;
use crate::genetic::{Chromosome, Gene};
use crate::search::INFINITY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct ReservationNode {
    gene: Option<Gene>, // the move reaching this node; none at the root
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    level: usize,
    score: i32,
}

#[derive(Debug, Clone)]
pub struct ReservationTree {
    nodes: Vec<ReservationNode>,
    root_color: Color,
    best: Option<(i32, Move)>,
}

impl ReservationTree {
    pub const ROOT: NodeId = NodeId(0);

    /// An empty tree whose root position has `root_color` to move.
    pub fn new(root_color: Color) -> Self {
        Self {
            nodes: vec![ReservationNode {
                gene: None,
                parent: None,
                children: Vec::new(),
                level: 0,
                score: 0,
            }],
            root_color,
            best: None,
        }
    }

    pub fn from_population(root_color: Color, population: &[Chromosome]) -> Self {
        let mut tree = Self::new(root_color);
        for chromosome in population {
            tree.insert(chromosome);
        }
        tree
    }

    /// Walks down the tree following the chromosome's moves and adds a
    /// branch at the first move no existing child matches.
    pub fn insert(&mut self, chromosome: &Chromosome) {
        let mut parent = Self::ROOT;
        for gene in &chromosome.genes {
            parent = match self.find_child(parent, gene.mv) {
                Some(child) => child,
                None => self.add_child(parent, gene.clone()),
            };
        }
    }

    fn find_child(&self, parent: NodeId, mv: Move) -> Option<NodeId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|child| self.nodes[child.0].gene.as_ref().is_some_and(|g| g.mv == mv))
    }

    fn add_child(&mut self, parent: NodeId, gene: Gene) -> NodeId {
        let id = NodeId(self.nodes.len());
        let level = self.nodes[parent.0].level + 1;
        self.nodes.push(ReservationNode {
            gene: Some(gene),
            parent: Some(parent),
            children: Vec::new(),
            level,
            score: 0,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when nothing but the root is present.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn gene(&self, id: NodeId) -> Option<&Gene> {
        self.nodes[id.0].gene.as_ref()
    }

    pub fn level(&self, id: NodeId) -> usize {
        self.nodes[id.0].level
    }

    /// Backed-up score of a node after [`ReservationTree::evaluate`].
    pub fn score(&self, id: NodeId) -> i32 {
        self.nodes[id.0].score
    }

    /// Best root `(score, move)` of the last evaluation.
    pub fn best(&self) -> Option<(i32, Move)> {
        self.best
    }

    fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, node)| node.children.is_empty())
            .map(|(index, _)| NodeId(index))
    }

    /// Minimax backpropagation. Scores are kept from the root mover's side:
    /// a leaf is evaluated from the side that made its move and flipped if
    /// that was the opponent; an inner node takes the maximum of its
    /// children when the root mover is to play there and the minimum
    /// otherwise. The root keeps the last child whose score is at least the
    /// best seen so far. Returns that `(score, move)`, or `None` for a tree
    /// without moves.
    pub fn evaluate<E: Evaluator + ?Sized>(&mut self, evaluator: &E) -> Option<(i32, Move)> {
        for index in (1..self.nodes.len()).rev() {
            let node = &self.nodes[index];
            let gene = match node.gene.as_ref() {
                Some(gene) => gene,
                None => continue,
            };
            let score = if node.children.is_empty() {
                let raw = evaluator.evaluate(&gene.board, gene.mover);
                if gene.mover == self.root_color {
                    raw
                } else {
                    -raw
                }
            } else {
                let scores = node.children.iter().map(|child| self.nodes[child.0].score);
                if gene.mover.opponent() == self.root_color {
                    scores.max().unwrap_or(-INFINITY)
                } else {
                    scores.min().unwrap_or(INFINITY)
                }
            };
            self.nodes[index].score = score;
        }

        let mut best: Option<(i32, Move)> = None;
        for child in &self.nodes[0].children {
            let node = &self.nodes[child.0];
            if let Some(gene) = node.gene.as_ref() {
                if best.map_or(true, |(score, _)| node.score >= score) {
                    best = Some((node.score, gene.mv));
                }
            }
        }
        if let Some((score, _)) = best {
            self.nodes[0].score = score;
        }
        trace!("reservation tree: {} nodes, best {best:?}", self.nodes.len());
        self.best = best;
        best
    }

    /// Rebuilds one chromosome per root-to-leaf path, in leaf order, with
    /// each gene carrying its node's backed-up score and fitness refreshed.
    pub fn paths(&self) -> Vec<Chromosome> {
        self.leaves()
            .map(|leaf| {
                let mut genes = Vec::with_capacity(self.level(leaf));
                let mut cursor = Some(leaf);
                while let Some(id) = cursor {
                    if let Some(gene) = self.gene(id) {
                        genes.push(Gene {
                            score: self.score(id),
                            ..gene.clone()
                        });
                    }
                    cursor = self.parent(id);
                }
                genes.reverse();
                Chromosome::new(genes)
            })
            .collect()
    }
}
