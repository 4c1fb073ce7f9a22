//! # Natural Language to Inventory SQL
//!
//! This crate answers free-form questions about an inventory and sales
//! database with read-only SQL. Questions are normalized, matched against an
//! ordered list of intent rules that render parameterized templates, and
//! otherwise handed to a generative model with retrieved few-shot examples.
//! Accepted SQL is cached per normalized question and every statement passes a
//! read-only guard before it reaches the database.
//!
//! The entry point is [`QueryEngine`], assembled with [`QueryEngineBuilder`].

pub mod cache;
pub mod constants;
pub mod dates;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod generator;
pub mod prompts;
pub mod providers;
pub mod question;
pub mod router;
pub mod templates;
pub mod training;
pub mod types;

pub use cache::QueryCache;
pub use dates::{Clock, DateResolver, FixedClock, SystemClock};
pub use engine::{QueryEngine, QueryEngineBuilder};
pub use errors::EngineError;
pub use types::{
    AppConfig, EngineStatus, FailureKind, GeneratorConfig, Intent, QueryResponse, QuerySource,
    SqlCandidate, SqlQuery, TrainingItem,
};
