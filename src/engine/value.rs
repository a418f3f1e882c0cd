//! Value detection: price each classified market against the bookmaker's
//! implied probability and keep the ones with enough edge.

use std::collections::HashSet;
use tracing::debug;

use crate::db::models::{Leg, RawMarket};

use super::classifier::{classify_market, matching_rule, MarketDescriptor, MarketKind};
use super::probability::{compute_match_probabilities, prob_over_line, prob_under_line};
use super::stats::{expected_total, TeamStats, CORNER_KEYS, GOAL_KEYS};

/// Minimum estimated-minus-implied probability for a leg.
pub const DEFAULT_VALUE_MARGIN: f64 = 0.05;

/// 1 / odd, for finite positive odds.
pub fn implied_probability(odd: f64) -> Option<f64> {
    (odd.is_finite() && odd > 0.0).then(|| 1.0 / odd)
}

/// Edge of an estimate over the bookmaker price, `Some` only when it
/// reaches `margin`.
pub fn value_delta(estimated: f64, odd: f64, margin: f64) -> Option<f64> {
    let delta = estimated - implied_probability(odd)?;
    (delta >= margin).then_some(delta)
}

/// Estimated probability that the market wins, or `None` when the
/// statistics carry no usable signal for it.
pub fn estimate_probability(
    market: &MarketDescriptor,
    home: Option<&TeamStats>,
    away: Option<&TeamStats>,
) -> Option<f64> {
    match market.kind {
        MarketKind::GoalsOver | MarketKind::GoalsUnder => {
            total_probability(market, expected_total(home, away, GOAL_KEYS))
        }
        MarketKind::CornersOver | MarketKind::CornersUnder => {
            total_probability(market, expected_total(home, away, CORNER_KEYS))
        }
        MarketKind::OneXTwo => {
            let (home, away) = (home?, away?);
            let selection = market.selection?;
            Some(compute_match_probabilities(home, away).for_selection(selection))
        }
    }
}

fn total_probability(market: &MarketDescriptor, lambda: f64) -> Option<f64> {
    if lambda <= 0.0 {
        return None;
    }
    let line = market.line?;
    match market.kind {
        MarketKind::GoalsOver | MarketKind::CornersOver => Some(prob_over_line(lambda, line)),
        MarketKind::GoalsUnder | MarketKind::CornersUnder => Some(prob_under_line(lambda, line)),
        MarketKind::OneXTwo => None,
    }
}

/// Drop repeated quotes: same type, selection, name, odd and bookmaker.
/// The first occurrence wins.
pub fn dedupe_markets(markets: &[RawMarket]) -> Vec<&RawMarket> {
    let mut seen = HashSet::new();
    markets
        .iter()
        .filter(|m| {
            seen.insert((
                m.market_type.clone(),
                m.selection.clone(),
                m.name.clone(),
                m.decimal_odd().unwrap_or(0.0).to_bits(),
                m.bookmaker_name().map(ToString::to_string),
            ))
        })
        .collect()
}

/// Price every market of one match and return the value legs.
///
/// Markets with an unusable odd, unrecognized text or no estimate are
/// skipped; nothing here fails.
pub fn evaluate_markets(
    match_id: &str,
    markets: &[RawMarket],
    home: Option<&TeamStats>,
    away: Option<&TeamStats>,
    value_margin: f64,
) -> Vec<Leg> {
    let mut legs = Vec::new();
    for raw in dedupe_markets(markets) {
        let Some(odd) = raw.decimal_odd() else {
            debug!("{}: skipping market with unusable odd {:?}", match_id, raw.odd);
            continue;
        };
        let Some(descriptor) = classify_market(raw) else {
            debug!("{}: unrecognized market {:?}", match_id, raw.name.as_deref().or(raw.market_type.as_deref()));
            continue;
        };
        let Some(estimated) = estimate_probability(&descriptor, home, away) else {
            debug!("{}: no estimate for {}", match_id, descriptor.label());
            continue;
        };
        if let Some(delta) = value_delta(estimated, odd, value_margin) {
            debug!(
                "{}: value leg {} @ {} (rule {}, delta {:.3})",
                match_id,
                descriptor.label(),
                odd,
                matching_rule(raw).unwrap_or("-"),
                delta
            );
            legs.push(Leg {
                odd,
                delta,
                market: descriptor.label(),
                descriptor,
                bookmaker: raw.bookmaker_name().map(ToString::to_string),
                match_id: match_id.to_string(),
                match_url: None,
            });
        }
    }
    legs
}
