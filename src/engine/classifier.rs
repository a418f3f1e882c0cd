//! Free-text market classification.
//!
//! Bookmaker pages describe markets in loose English/Portuguese text
//! ("Total de gols Over 2.5", "Escanteios menos de 9,5", "Casa"). The
//! classifier turns the concatenated text of a [`RawMarket`] into a typed
//! [`MarketDescriptor`] by running an ordered rule list; the first rule that
//! matches wins:
//!
//! 1. **over/under cue**: a cue word immediately followed by a line
//! 2. **loose numeric**: any line anywhere, as long as some cue word appears
//! 3. **1X2**: result-market indicators, with the selection resolved from
//!    the dedicated selection field
//!
//! Text matching none of them is unrecognized (`None`), which callers treat
//! as "no signal".

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::db::models::RawMarket;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketKind {
    #[serde(rename = "GOALS_OVER")]
    GoalsOver,
    #[serde(rename = "GOALS_UNDER")]
    GoalsUnder,
    #[serde(rename = "CORNERS_OVER")]
    CornersOver,
    #[serde(rename = "CORNERS_UNDER")]
    CornersUnder,
    #[serde(rename = "1X2")]
    OneXTwo,
}

impl MarketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketKind::GoalsOver => "GOALS_OVER",
            MarketKind::GoalsUnder => "GOALS_UNDER",
            MarketKind::CornersOver => "CORNERS_OVER",
            MarketKind::CornersUnder => "CORNERS_UNDER",
            MarketKind::OneXTwo => "1X2",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GOALS_OVER" => Some(MarketKind::GoalsOver),
            "GOALS_UNDER" => Some(MarketKind::GoalsUnder),
            "CORNERS_OVER" => Some(MarketKind::CornersOver),
            "CORNERS_UNDER" => Some(MarketKind::CornersUnder),
            "1X2" | "ONE_X_TWO" => Some(MarketKind::OneXTwo),
            _ => None,
        }
    }

    fn over_under(domain: Domain, side: Side) -> Self {
        match (domain, side) {
            (Domain::Goals, Side::Over) => MarketKind::GoalsOver,
            (Domain::Goals, Side::Under) => MarketKind::GoalsUnder,
            (Domain::Corners, Side::Over) => MarketKind::CornersOver,
            (Domain::Corners, Side::Under) => MarketKind::CornersUnder,
        }
    }
}

impl fmt::Display for MarketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of a three-way result market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Selection {
    Home,
    Draw,
    Away,
}

impl Selection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Selection::Home => "HOME",
            Selection::Draw => "DRAW",
            Selection::Away => "AWAY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "HOME" | "1" => Some(Selection::Home),
            "DRAW" | "X" => Some(Selection::Draw),
            "AWAY" | "2" => Some(Selection::Away),
            _ => None,
        }
    }
}

/// Typed market produced by [`classify_market`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketDescriptor {
    pub kind: MarketKind,
    /// Over/under threshold; `None` for result markets
    pub line: Option<f64>,
    pub selection: Option<Selection>,
}

impl MarketDescriptor {
    /// `"{KIND}@{LINE}"` when a line exists, else `"{KIND}"`.
    ///
    /// Lines always carry a decimal point (`GOALS_OVER@3.0`), which keeps
    /// labels stable for [`MarketDescriptor::from_label`].
    pub fn label(&self) -> String {
        match self.line {
            Some(line) => format!("{}@{:?}", self.kind, line),
            None => self.kind.to_string(),
        }
    }

    /// Inverse of [`MarketDescriptor::label`]. The selection is not part of
    /// the label and has to be supplied separately.
    pub fn from_label(label: &str, selection: Option<Selection>) -> Option<Self> {
        let (kind, line) = match label.split_once('@') {
            Some((kind, line)) => (MarketKind::parse(kind)?, Some(line.trim().parse::<f64>().ok()?)),
            None => (MarketKind::parse(label)?, None),
        };
        Some(MarketDescriptor {
            kind,
            line,
            selection,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Domain {
    Goals,
    Corners,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Over,
    Under,
}

/// Lowercased text fields of a market.
struct MarketText {
    /// type + selection + name + context, space separated
    search: String,
    selection: String,
}

impl MarketText {
    fn from_raw(raw: &RawMarket) -> Self {
        let search = [
            raw.market_type.as_deref(),
            raw.selection.as_deref(),
            raw.name.as_deref(),
            raw.context.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

        MarketText {
            search,
            selection: raw.selection.as_deref().unwrap_or_default().trim().to_lowercase(),
        }
    }

    fn contains_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.search.contains(n))
    }

    fn domain(&self) -> Domain {
        if self.contains_any(CORNER_STEMS) {
            Domain::Corners
        } else {
            Domain::Goals
        }
    }
}

const CORNER_STEMS: &[&str] = &["corn", "escante"];
const OU_KEYWORDS: &[&str] = &["over", "under", "o/u", "total", "mais", "menos"];
const UNDER_KEYWORDS: &[&str] = &["under", "menos"];
const RESULT_KEYWORDS: &[&str] = &["home", "away", "draw", "empate", "casa", "visitante"];

fn cue_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(over|under|mais de|menos de|o/u|total)\s*([0-9]+(?:[.,][05])?)")
            .expect("cue pattern is valid")
    })
}

fn line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+(?:[.,][05])?").expect("line pattern is valid"))
}

fn parse_line(raw: &str) -> Option<f64> {
    raw.replace(',', ".").parse::<f64>().ok()
}

type Rule = fn(&MarketText) -> Option<MarketDescriptor>;

/// Evaluated in order; precedence is part of the contract.
const RULES: [(&str, Rule); 3] = [
    ("over_under_cue", over_under_cue),
    ("loose_numeric", loose_numeric),
    ("one_x_two", one_x_two),
];

/// Classify a raw market. `None` means unrecognized.
pub fn classify_market(raw: &RawMarket) -> Option<MarketDescriptor> {
    let text = MarketText::from_raw(raw);
    RULES.iter().find_map(|(_, rule)| rule(&text))
}

/// Name of the rule that classified the market, for diagnostics.
pub fn matching_rule(raw: &RawMarket) -> Option<&'static str> {
    let text = MarketText::from_raw(raw);
    RULES
        .iter()
        .find(|(_, rule)| rule(&text).is_some())
        .map(|(name, _)| *name)
}

/// Cue word directly followed by a line: "over 2.5", "mais de 9,5".
/// UNDER when "under"/"menos" appears anywhere in the text, else OVER.
fn over_under_cue(text: &MarketText) -> Option<MarketDescriptor> {
    let caps = cue_regex().captures(&text.search)?;
    let line = parse_line(caps.get(2)?.as_str())?;
    let side = if text.contains_any(UNDER_KEYWORDS) {
        Side::Under
    } else {
        Side::Over
    };
    Some(MarketDescriptor {
        kind: MarketKind::over_under(text.domain(), side),
        line: Some(line),
        selection: None,
    })
}

/// First number anywhere, provided any over/under keyword appears.
fn loose_numeric(text: &MarketText) -> Option<MarketDescriptor> {
    if !text.contains_any(OU_KEYWORDS) {
        return None;
    }
    let line = parse_line(line_regex().find(&text.search)?.as_str())?;
    let side = if text.contains_any(UNDER_KEYWORDS) {
        Side::Under
    } else {
        Side::Over
    };
    Some(MarketDescriptor {
        kind: MarketKind::over_under(text.domain(), side),
        line: Some(line),
        selection: None,
    })
}

fn one_x_two(text: &MarketText) -> Option<MarketDescriptor> {
    let s = &text.search;
    let indicated = s.contains("1x2")
        || (s.contains('1') && s.contains('x') && s.contains('2'))
        || text.contains_any(RESULT_KEYWORDS);
    if !indicated {
        return None;
    }
    Some(MarketDescriptor {
        kind: MarketKind::OneXTwo,
        line: None,
        selection: resolve_selection(&text.selection),
    })
}

fn resolve_selection(sel: &str) -> Option<Selection> {
    if sel.contains("casa") || sel.contains("home") || sel == "1" {
        Some(Selection::Home)
    } else if sel.contains("visitante") || sel.contains("away") || sel == "2" {
        Some(Selection::Away)
    } else if sel.contains("empate") || sel.contains("draw") || sel == "x" {
        Some(Selection::Draw)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(market_type: Option<&str>, selection: Option<&str>, name: Option<&str>, context: Option<&str>) -> RawMarket {
        RawMarket {
            market_type: market_type.map(Into::into),
            selection: selection.map(Into::into),
            name: name.map(Into::into),
            context: context.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn goals_over_from_name() {
        let d = classify_market(&market(None, None, Some("Total de gols Over 2.5"), None)).unwrap();
        assert_eq!(d.kind, MarketKind::GoalsOver);
        assert_eq!(d.line, Some(2.5));
        assert_eq!(d.selection, None);
    }

    #[test]
    fn corners_under_from_context() {
        let d = classify_market(&market(None, None, None, Some("Escanteios under 9"))).unwrap();
        assert_eq!(d.kind, MarketKind::CornersUnder);
        assert_eq!(d.line, Some(9.0));
    }

    #[test]
    fn one_x_two_home_selection() {
        let d = classify_market(&market(Some("1X2"), Some("1"), None, None)).unwrap();
        assert_eq!(d.kind, MarketKind::OneXTwo);
        assert_eq!(d.line, None);
        assert_eq!(d.selection, Some(Selection::Home));
    }

    #[test]
    fn comma_decimal_and_portuguese_cues() {
        let d = classify_market(&market(None, None, Some("Gols: menos de 3,5"), None)).unwrap();
        assert_eq!(d.kind, MarketKind::GoalsUnder);
        assert_eq!(d.line, Some(3.5));

        let d = classify_market(&market(None, None, Some("Escanteios mais de 10,5"), None)).unwrap();
        assert_eq!(d.kind, MarketKind::CornersOver);
        assert_eq!(d.line, Some(10.5));
    }

    #[test]
    fn generic_total_cue_reads_as_over() {
        let d = classify_market(&market(None, None, Some("Total 2.5"), None)).unwrap();
        assert_eq!(d.kind, MarketKind::GoalsOver);
        let d = classify_market(&market(None, None, Some("O/U 3"), Some("corners"))).unwrap();
        assert_eq!(d.kind, MarketKind::CornersOver);
        assert_eq!(d.line, Some(3.0));
    }

    #[test]
    fn generic_cue_takes_side_from_the_selection() {
        let d = classify_market(&market(Some("O/U 2.5"), Some("Under"), None, None)).unwrap();
        assert_eq!(d.kind, MarketKind::GoalsUnder);
        assert_eq!(d.line, Some(2.5));

        let raw = market(Some("Total 2.5"), Some("Under"), None, None);
        assert_eq!(matching_rule(&raw), Some("over_under_cue"));
        assert_eq!(classify_market(&raw).unwrap().kind, MarketKind::GoalsUnder);

        let d = classify_market(&market(Some("Escanteios total 9.5"), Some("Menos"), None, None)).unwrap();
        assert_eq!(d.kind, MarketKind::CornersUnder);
    }

    #[test]
    fn loose_numeric_rule_when_number_is_detached() {
        // the number precedes the cue, so only the loose rule can match
        let raw = market(None, None, Some("2.5 gols - under"), None);
        assert_eq!(matching_rule(&raw), Some("loose_numeric"));
        let d = classify_market(&raw).unwrap();
        assert_eq!(d.kind, MarketKind::GoalsUnder);
        assert_eq!(d.line, Some(2.5));
    }

    #[test]
    fn cue_rule_takes_precedence_over_result_keywords() {
        let raw = market(Some("casa"), None, Some("over 1.5"), None);
        assert_eq!(matching_rule(&raw), Some("over_under_cue"));
        assert_eq!(classify_market(&raw).unwrap().kind, MarketKind::GoalsOver);
    }

    #[test]
    fn result_selection_keywords() {
        let cases = [
            ("Casa", Some(Selection::Home)),
            ("Visitante", Some(Selection::Away)),
            ("2", Some(Selection::Away)),
            ("Empate", Some(Selection::Draw)),
            ("X", Some(Selection::Draw)),
            ("Flamengo", None),
        ];
        for (sel, expected) in cases {
            let d = classify_market(&market(Some("1X2"), Some(sel), None, None)).unwrap();
            assert_eq!(d.kind, MarketKind::OneXTwo);
            assert_eq!(d.selection, expected, "selection {sel}");
        }
    }

    #[test]
    fn unrecognized_text() {
        assert_eq!(classify_market(&market(None, None, Some("Ambas marcam: sim"), None)), None);
        assert_eq!(classify_market(&RawMarket::default()), None);
    }

    #[test]
    fn classification_is_idempotent() {
        let raw = market(Some("Gols"), Some("Mais de 2,5"), Some("Total"), Some("<span>2.5</span>"));
        assert_eq!(classify_market(&raw), classify_market(&raw));
    }

    #[test]
    fn label_round_trips_through_from_label() {
        let d = MarketDescriptor {
            kind: MarketKind::CornersUnder,
            line: Some(9.0),
            selection: None,
        };
        assert_eq!(d.label(), "CORNERS_UNDER@9.0");
        assert_eq!(MarketDescriptor::from_label(&d.label(), None), Some(d));

        let r = MarketDescriptor::from_label("1X2", Some(Selection::Draw)).unwrap();
        assert_eq!(r.kind, MarketKind::OneXTwo);
        assert_eq!(r.label(), "1X2");
        assert_eq!(MarketDescriptor::from_label("BTTS", None), None);
    }
}
