//! Service layer: configuration, startup wiring and request orchestration.

pub mod config;
pub mod orchestrator;
pub mod services;

pub use config::AppConfig;
pub use orchestrator::{Recommendation, RecommendationRequest, RecommendationService};
pub use services::AppServices;
