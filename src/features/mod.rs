//! Feature derivation
//!
//! Converts normalized games into per-team, per-game features.

pub mod outcome;
pub mod pipeline;
pub mod standings;
pub mod team_view;
pub mod temporal;
pub mod window;

pub use outcome::MatchOutcome;
pub use pipeline::{FeaturePipeline, PipelineOutput, TeamGameFeatures};
pub use team_view::TeamGameRecord;
pub use temporal::{TemporalFeatureEngine, TemporalFeatures};
