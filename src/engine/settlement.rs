//! Grading of placed legs once a match has finished.

use serde::{Deserialize, Serialize};

use crate::db::models::FinalScore;

use super::classifier::{MarketDescriptor, MarketKind, Selection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Won,
    Lost,
}

impl Outcome {
    fn from_bool(won: bool) -> Self {
        if won {
            Outcome::Won
        } else {
            Outcome::Lost
        }
    }
}

/// Result side of a final score.
pub fn winning_selection(score: &FinalScore) -> Selection {
    match score.home_goals.cmp(&score.away_goals) {
        std::cmp::Ordering::Greater => Selection::Home,
        std::cmp::Ordering::Equal => Selection::Draw,
        std::cmp::Ordering::Less => Selection::Away,
    }
}

/// Grade a market against a final score.
///
/// Over wins strictly above the line and under strictly below it, so an
/// integer line hit exactly loses both ways. `None` when the market cannot
/// be graded: no line, no selection, or no corner counts for a corners market.
pub fn grade_leg(market: &MarketDescriptor, score: &FinalScore) -> Option<Outcome> {
    match market.kind {
        MarketKind::GoalsOver | MarketKind::GoalsUnder => {
            let total = (score.home_goals + score.away_goals) as f64;
            grade_total(market, total)
        }
        MarketKind::CornersOver | MarketKind::CornersUnder => {
            let total = (score.home_corners? + score.away_corners?) as f64;
            grade_total(market, total)
        }
        MarketKind::OneXTwo => {
            let selection = market.selection?;
            Some(Outcome::from_bool(selection == winning_selection(score)))
        }
    }
}

fn grade_total(market: &MarketDescriptor, total: f64) -> Option<Outcome> {
    let line = market.line?;
    let won = match market.kind {
        MarketKind::GoalsOver | MarketKind::CornersOver => total > line,
        MarketKind::GoalsUnder | MarketKind::CornersUnder => total < line,
        MarketKind::OneXTwo => return None,
    };
    Some(Outcome::from_bool(won))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(home_goals: u32, away_goals: u32, corners: Option<(u32, u32)>) -> FinalScore {
        FinalScore {
            match_id: "m".into(),
            home_goals,
            away_goals,
            home_corners: corners.map(|c| c.0),
            away_corners: corners.map(|c| c.1),
        }
    }

    fn ou(kind: MarketKind, line: f64) -> MarketDescriptor {
        MarketDescriptor {
            kind,
            line: Some(line),
            selection: None,
        }
    }

    #[test]
    fn goals_totals() {
        let s = score(2, 1, None);
        assert_eq!(grade_leg(&ou(MarketKind::GoalsOver, 2.5), &s), Some(Outcome::Won));
        assert_eq!(grade_leg(&ou(MarketKind::GoalsUnder, 2.5), &s), Some(Outcome::Lost));
        assert_eq!(grade_leg(&ou(MarketKind::GoalsOver, 3.0), &s), Some(Outcome::Lost));
        assert_eq!(grade_leg(&ou(MarketKind::GoalsUnder, 3.0), &s), Some(Outcome::Lost));
    }

    #[test]
    fn corners_need_counts() {
        let market = ou(MarketKind::CornersUnder, 9.5);
        assert_eq!(grade_leg(&market, &score(0, 0, None)), None);
        assert_eq!(grade_leg(&market, &score(0, 0, Some((4, 3)))), Some(Outcome::Won));
    }

    #[test]
    fn result_market() {
        let mut market = MarketDescriptor {
            kind: MarketKind::OneXTwo,
            line: None,
            selection: Some(Selection::Draw),
        };
        assert_eq!(grade_leg(&market, &score(1, 1, None)), Some(Outcome::Won));
        assert_eq!(grade_leg(&market, &score(2, 1, None)), Some(Outcome::Lost));
        market.selection = None;
        assert_eq!(grade_leg(&market, &score(1, 1, None)), None);
    }

    #[test]
    fn winning_side() {
        assert_eq!(winning_selection(&score(0, 3, None)), Selection::Away);
        assert_eq!(winning_selection(&score(3, 0, None)), Selection::Home);
    }
}
