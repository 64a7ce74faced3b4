//! Cost-aware A* search over grid cells.
//!
//! The search is generic over a [`SearchSpace`], which supplies the legal
//! successors of a cell and the cost of stepping into one. Nothing is
//! cached between calls: callers recompute a path whenever the goal or
//! the cost landscape changes.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crowdgrid_types::Position;
use tracing::trace;

use crate::distance;

/// The graph an A* search runs over.
pub trait SearchSpace {
    /// Cells reachable in one step from `cell`.
    fn successors(&self, cell: Position) -> Vec<Position>;

    /// Cost of stepping from `from` into the adjacent cell `to`.
    fn step_cost(&self, from: Position, to: Position) -> f64;

    /// Lower-bound estimate of the remaining cost from `from` to `goal`.
    fn estimate(&self, from: Position, goal: Position) -> f64 {
        distance::diagonal(from, goal)
    }
}

/// Total order over path costs.
#[derive(Debug, Clone, Copy)]
struct Cost(f64);

impl PartialEq for Cost {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0).is_eq()
    }
}

impl Eq for Cost {}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Find a cheapest path from `start` to `goal`.
///
/// Returns the ordered cells from `start` to `goal`, both inclusive, so
/// the next step is the element at index 1. Returns an empty sequence when
/// `start == goal` or the goal cannot be reached.
///
/// Uses a `BTreeSet` keyed on `(estimated total, insertion order, cell)`
/// as the open list; equal estimates are expanded first-in first-out,
/// which keeps the result independent of hash ordering.
pub fn find_path<S: SearchSpace + ?Sized>(
    space: &S,
    start: Position,
    goal: Position,
) -> Vec<Position> {
    if start == goal {
        return Vec::new();
    }

    // Best known cost from start.
    let mut best: BTreeMap<Position, f64> = BTreeMap::new();
    // Predecessor map for path reconstruction.
    let mut came_from: BTreeMap<Position, Position> = BTreeMap::new();
    let mut closed: BTreeSet<Position> = BTreeSet::new();
    let mut open: BTreeSet<(Cost, u64, Position)> = BTreeSet::new();
    let mut order: u64 = 0;

    best.insert(start, 0.0);
    open.insert((Cost(space.estimate(start, goal)), order, start));

    while let Some((_, _, current)) = open.pop_first() {
        if current == goal {
            return reconstruct(&came_from, start, goal);
        }
        if !closed.insert(current) {
            continue; // Stale entry for an already expanded cell.
        }
        let Some(&base) = best.get(&current) else {
            continue;
        };

        for next in space.successors(current) {
            if closed.contains(&next) {
                continue;
            }
            let tentative = base + space.step_cost(current, next);
            let improves = best.get(&next).is_none_or(|&known| tentative < known);
            if improves {
                best.insert(next, tentative);
                came_from.insert(next, current);
                order = order.saturating_add(1);
                let priority = tentative + space.estimate(next, goal);
                open.insert((Cost(priority), order, next));
            }
        }
    }

    trace!(%start, %goal, expanded = closed.len(), "Goal unreachable");
    Vec::new()
}

fn reconstruct(
    came_from: &BTreeMap<Position, Position>,
    start: Position,
    goal: Position,
) -> Vec<Position> {
    let mut path = vec![goal];
    let mut current = goal;
    // Every predecessor hop is distinct, so the walk is bounded.
    for _ in 0..came_from.len() {
        let Some(&previous) = came_from.get(&current) else {
            break;
        };
        path.push(previous);
        current = previous;
        if current == start {
            break;
        }
    }
    if current != start {
        return Vec::new();
    }
    path.reverse();
    path
}
