//! Test harness for the recommendation and search services.
//!
//! Loads configuration from `REELMIX_*`, wires the services, then prints
//! recommendations for one user and the results of one semantic query.

use anyhow::Result;
use chrono::Utc;
use data_loader::UserId;
use rand::SeedableRng;
use rand::rngs::StdRng;
use server::{AppConfig, AppServices, RecommendationRequest};
use sources::{ProfileConfig, build_preference_profile};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting ReelMix server test harness");

    let config = AppConfig::from_env()?;
    let services = AppServices::initialize(&config).await?;

    let user_id: UserId = 1;
    let limit = 20;
    let profile = build_preference_profile(
        &services.data_index,
        user_id,
        Utc::now(),
        &ProfileConfig::default(),
    )?;

    info!("Getting recommendations for user {} (limit: {})", user_id, limit);
    let request = RecommendationRequest::new(limit).with_serendipity(true);
    let mut rng = StdRng::from_os_rng();
    let recommendations = services
        .recommendations
        .recommend(&profile, request, &mut rng)
        .await?;

    info!("Received {} recommendations:", recommendations.len());
    for (i, rec) in recommendations.iter().enumerate() {
        info!(
            "{}. {} ({}) - Score: {:.3} {}",
            i + 1,
            rec.title,
            rec.release_year.map(|y| y.to_string()).unwrap_or_else(|| "????".to_string()),
            rec.score,
            rec.tag_labels().join(" ")
        );
        if !rec.reason.is_empty() {
            info!("   {}", rec.reason);
        }
    }

    let query = "a quiet film about grief and healing";
    let response = services.search.search(query, 10).await?;
    info!(
        "Search '{}' returned {} results (fallback: {}, {:.1} ms)",
        query, response.total, response.fallback, response.timing.total_ms
    );
    for hit in &response.results {
        info!("   {} [{:.3}]", hit.movie.title, hit.relevance);
    }

    Ok(())
}
