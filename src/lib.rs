pub mod config;
pub mod db;
pub mod engine;
pub mod pipeline;
pub mod sources;

pub use db::Database;
pub use engine::MatchEvaluator;
