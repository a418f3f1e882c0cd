//! Probability estimates for totals and three-way result markets.
//!
//! Both models are heuristics, not calibrated predictors:
//! - **Totals**: the combined count (goals or corners) is taken as
//!   Poisson(λ) with λ the sum of both teams' per-game averages.
//! - **1X2**: a weighted goal/corner/shot differential fed through a
//!   logistic curve, with a fixed draw probability.
//!
//! The 1X2 weights and the constant draw share were chosen by hand and
//! have never been fitted against results.

use serde::{Deserialize, Serialize};

use super::classifier::Selection;
use super::stats::TeamStats;

const GOAL_WEIGHT: f64 = 0.6;
const CORNER_WEIGHT: f64 = 0.25;
const SHOT_WEIGHT: f64 = 0.15;
/// Logistic scale: p_home = 1 / (1 + e^(-score / SCALE))
const LOGISTIC_SCALE: f64 = 2.0;
const HOME_MIN: f64 = 0.02;
const HOME_MAX: f64 = 0.98;
const DRAW_PROBABILITY: f64 = 0.12;
const AWAY_MIN: f64 = 0.01;

/// Used whenever the logistic model cannot produce a finite estimate.
pub const FALLBACK_PRIOR: MatchProbabilities = MatchProbabilities {
    home: 0.5,
    draw: 0.15,
    away: 0.35,
};

/// Home/draw/away probability triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchProbabilities {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl MatchProbabilities {
    pub fn for_selection(&self, selection: Selection) -> f64 {
        match selection {
            Selection::Home => self.home,
            Selection::Draw => self.draw,
            Selection::Away => self.away,
        }
    }
}

/// P(X = k) for X ~ Poisson(λ).
pub fn poisson_pmf(lambda: f64, k: u32) -> f64 {
    // p(k) = p(k-1) * λ / k, avoids k! overflow
    let mut p = (-lambda).exp();
    for i in 1..=k {
        p *= lambda / i as f64;
        if p == 0.0 {
            break;
        }
    }
    p
}

/// P(X <= k) for X ~ Poisson(λ).
///
/// Summation stops once the terms are past the mode and no longer move the
/// sum, so the work is O(λ) however large `k` is.
pub fn poisson_cdf(lambda: f64, k: u32) -> f64 {
    let mut term = (-lambda).exp();
    let mut sum = term;
    for i in 1..=k {
        term *= lambda / i as f64;
        sum += term;
        if i as f64 > lambda && term <= f64::EPSILON * sum {
            break;
        }
    }
    sum.min(1.0)
}

/// P(total > floor(line)): over 2.5 needs 3 or more, over 3 needs 4 or more.
///
/// Callers skip non-positive λ before getting here.
pub fn prob_over_line(lambda: f64, line: f64) -> f64 {
    if line < 0.0 {
        return 1.0;
    }
    let threshold = line.floor() as u32;
    (1.0 - poisson_cdf(lambda, threshold)).max(0.0)
}

/// Complement of [`prob_over_line`].
pub fn prob_under_line(lambda: f64, line: f64) -> f64 {
    1.0 - prob_over_line(lambda, line)
}

/// Home/draw/away estimate from two teams' statistics, `home` first.
///
/// Falls back to [`FALLBACK_PRIOR`] when the model yields a non-finite
/// value (e.g. overflowing differentials).
pub fn compute_match_probabilities(home: &TeamStats, away: &TeamStats) -> MatchProbabilities {
    logistic_probabilities(home, away).unwrap_or(FALLBACK_PRIOR)
}

fn logistic_probabilities(home: &TeamStats, away: &TeamStats) -> Option<MatchProbabilities> {
    let goal_diff = home.goal_balance() - away.goal_balance();
    let corner_diff = home.corners() - away.corners();
    let shot_diff = home.shots() - away.shots();

    let score = GOAL_WEIGHT * goal_diff + CORNER_WEIGHT * corner_diff + SHOT_WEIGHT * shot_diff;
    let decay = (-score / LOGISTIC_SCALE).exp();
    if !decay.is_finite() {
        return None;
    }

    let p_home = (1.0 / (1.0 + decay)).clamp(HOME_MIN, HOME_MAX);
    let p_draw = DRAW_PROBABILITY;
    let p_away = (1.0 - p_home - p_draw).max(AWAY_MIN);
    Some(MatchProbabilities {
        home: p_home,
        draw: p_draw,
        away: p_away,
    })
}
