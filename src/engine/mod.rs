pub mod cache;
pub mod classifier;
pub mod evaluator;
pub mod parlay;
pub mod probability;
pub mod settlement;
pub mod stats;
pub mod text;
pub mod value;

pub use cache::TeamStatsCache;
pub use classifier::{classify_market, MarketDescriptor, MarketKind, Selection};
pub use evaluator::MatchEvaluator;
pub use parlay::{generate_parlays, ParlaySettings};
pub use probability::{compute_match_probabilities, MatchProbabilities};
pub use stats::{summarize_numeric_stats, TeamStats};
pub use text::normalize_name;
pub use value::evaluate_markets;
