//! Parlay search over a pool of value legs.
//!
//! Brute force: every combination of 1..=max_legs distinct legs is
//! visited, so work grows with C(pool, max_legs). That is fine for pools of
//! a few dozen legs and nothing more; the pipeline caps the pool before
//! calling in here and there is no early exit.

use std::cmp::Ordering;

use crate::db::models::{Leg, Parlay};

pub const DEFAULT_TARGET_ODD: f64 = 2.0;
pub const DEFAULT_MAX_LEGS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParlaySettings {
    /// Minimum combined odd
    pub target_odd: f64,
    pub max_legs: usize,
    /// When false every leg of a parlay must belong to the same match
    pub allow_cross_match: bool,
}

impl Default for ParlaySettings {
    fn default() -> Self {
        ParlaySettings {
            target_odd: DEFAULT_TARGET_ODD,
            max_legs: DEFAULT_MAX_LEGS,
            allow_cross_match: true,
        }
    }
}

/// Number of combinations the search visits for a pool, saturating.
pub fn search_size(pool: usize, max_legs: usize) -> u128 {
    (1..=max_legs.min(pool)).fold(0u128, |acc, r| acc.saturating_add(binomial(pool, r)))
}

fn binomial(n: usize, r: usize) -> u128 {
    (0..r).fold(1u128, |acc, i| acc.saturating_mul((n - i) as u128) / (i as u128 + 1))
}

/// All combinations whose combined odd reaches the target, best first:
/// descending total delta, then ascending odd.
pub fn generate_parlays(legs: &[Leg], settings: &ParlaySettings) -> Vec<Parlay> {
    let mut out = Vec::new();
    let mut chosen = Vec::with_capacity(settings.max_legs);
    for size in 1..=settings.max_legs.min(legs.len()) {
        extend(legs, settings, size, 0, &mut chosen, &mut out);
    }
    out.sort_by(rank);
    out
}

/// Depth-first walk in lexicographic index order. A prefix that already
/// mixes matches is abandoned when cross-match parlays are disallowed.
fn extend(
    legs: &[Leg],
    settings: &ParlaySettings,
    size: usize,
    start: usize,
    chosen: &mut Vec<usize>,
    out: &mut Vec<Parlay>,
) {
    if chosen.len() == size {
        let odd: f64 = chosen.iter().map(|&i| legs[i].odd).product();
        if odd >= settings.target_odd {
            out.push(Parlay {
                legs: chosen.iter().map(|&i| legs[i].clone()).collect(),
                odd,
                total_delta: chosen.iter().map(|&i| legs[i].delta).sum(),
            });
        }
        return;
    }

    let remaining = size - chosen.len();
    for i in start..=legs.len() - remaining {
        if !settings.allow_cross_match {
            if let Some(&first) = chosen.first() {
                if legs[i].match_id != legs[first].match_id {
                    continue;
                }
            }
        }
        chosen.push(i);
        extend(legs, settings, size, i + 1, chosen, out);
        chosen.pop();
    }
}

fn rank(a: &Parlay, b: &Parlay) -> Ordering {
    b.total_delta
        .total_cmp(&a.total_delta)
        .then_with(|| a.odd.total_cmp(&b.odd))
}
