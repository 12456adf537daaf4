use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::{Genre, Mood, PersonalityType, UserId, Weather};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ranking::RequestSignals;
use server::{AppConfig, AppServices, Recommendation, RecommendationRequest};
use sources::{build_preference_profile, AgeRating, ProfileConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// ReelMix - hybrid movie recommendations and semantic search
#[derive(Parser)]
#[command(name = "reelmix")]
#[command(about = "Context-aware movie recommendations and natural-language search", long_about = None)]
struct Cli {
    /// Catalog directory; overrides REELMIX_DATA_DIR and the snapshot paths below it
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get movie recommendations for a user
    Recommend {
        #[arg(long)]
        user_id: UserId,

        /// Personality code, e.g. INTJ (defaults to the user's own)
        #[arg(long)]
        personality: Option<PersonalityType>,

        /// sunny, rainy, cloudy or snowy
        #[arg(long)]
        weather: Option<Weather>,

        /// relaxed, tense, excited, emotional, imaginative, light, gloomy or stifled
        #[arg(long)]
        mood: Option<Mood>,

        /// family, teen or adult
        #[arg(long)]
        age_rating: Option<AgeRating>,

        #[arg(long, default_value = "20")]
        limit: usize,

        /// Mix a few out-of-taste discoveries into the list
        #[arg(long)]
        serendipity: bool,

        /// Seed for serendipity sampling
        #[arg(long)]
        seed: Option<u64>,

        /// Show tags and scores for each recommendation
        #[arg(long)]
        explain: bool,
    },

    /// Natural-language movie search
    Search {
        #[arg(long)]
        query: String,

        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Show a user's preference profile
    User {
        #[arg(long)]
        user_id: UserId,
    },

    /// Measure recommendation latency
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }

    println!("Loading catalog from {}...", config.data_dir.display());
    let start = Instant::now();
    let services = Arc::new(
        AppServices::initialize(&config)
            .await
            .context("Failed to initialize services")?,
    );
    println!("{} Ready in {:?}", "✓".green(), start.elapsed());

    match cli.command {
        Commands::Recommend {
            user_id,
            personality,
            weather,
            mood,
            age_rating,
            limit,
            serendipity,
            seed,
            explain,
        } => {
            let mut signals = RequestSignals::new();
            signals.personality = personality;
            signals.weather = weather;
            signals.mood = mood;

            let mut request = RecommendationRequest::new(limit)
                .with_signals(signals)
                .with_serendipity(serendipity);
            request.age_rating = age_rating;

            handle_recommend(&services, user_id, request, seed, explain).await?
        }
        Commands::Search { query, limit } => handle_search(&services, &query, limit).await?,
        Commands::User { user_id } => handle_user(&services, user_id)?,
        Commands::Benchmark {
            requests,
            concurrent,
        } => handle_benchmark(services, requests, concurrent).await?,
    }

    Ok(())
}

/// Handle the 'recommend' command
async fn handle_recommend(
    services: &AppServices,
    user_id: UserId,
    mut request: RecommendationRequest,
    seed: Option<u64>,
    explain: bool,
) -> Result<()> {
    let profile = build_preference_profile(
        &services.data_index,
        user_id,
        Utc::now(),
        &ProfileConfig::default(),
    )?;

    // Fall back to the user's stored personality
    if request.signals.personality.is_none() {
        request.signals.personality = profile.personality;
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let start = Instant::now();
    let recommendations = services
        .recommendations
        .recommend(&profile, request, &mut rng)
        .await?;

    print_recommendations(&recommendations, explain);
    println!(
        "\n{} recommendations in {:?} (group: {})",
        recommendations.len(),
        start.elapsed(),
        profile.experiment_group
    );
    Ok(())
}

/// Handle the 'search' command
async fn handle_search(services: &AppServices, query: &str, limit: usize) -> Result<()> {
    let response = services.search.search(query, limit).await?;

    let mode = if response.fallback {
        "keyword".yellow()
    } else {
        "semantic".green()
    };
    println!(
        "{} ({}{})",
        format!("Search results for '{}':", query).bold().blue(),
        mode,
        if response.cached { ", cached" } else { "" }
    );

    for (i, hit) in response.results.iter().enumerate() {
        let year = hit
            .movie
            .release_year()
            .map(|y| y.to_string())
            .unwrap_or_else(|| "????".to_string());
        if response.fallback {
            println!(
                "{}. {} ({}) [{}]",
                (i + 1).to_string().green(),
                hit.movie.title,
                year,
                join_genres(&hit.movie.genres)
            );
        } else {
            println!(
                "{}. {} ({}) [{}] - relevance {:.3}, similarity {:.3}",
                (i + 1).to_string().green(),
                hit.movie.title,
                year,
                join_genres(&hit.movie.genres),
                hit.relevance,
                hit.similarity
            );
        }
    }

    let t = response.timing;
    println!(
        "\n{} results in {:.1} ms (embed {:.1}, search {:.1}, rerank {:.1})",
        response.total, t.total_ms, t.embedding_ms, t.search_ms, t.rerank_ms
    );
    Ok(())
}

/// Handle the 'user' command
fn handle_user(services: &AppServices, user_id: UserId) -> Result<()> {
    let data_index = &services.data_index;
    let user = data_index
        .get_user(user_id)
        .ok_or_else(|| anyhow!("User {} not found", user_id))?;
    let profile = build_preference_profile(data_index, user_id, Utc::now(), &ProfileConfig::default())?;

    println!("{}", format!("User ID: {}", user_id).bold().blue());
    println!(
        "{}Personality: {}",
        "• ".green(),
        user.personality
            .map(|p| p.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    );
    println!("{}Experiment group: {}", "• ".green(), user.experiment_group);

    let ratings = data_index.get_user_ratings(user_id);
    let avg_rating = if ratings.is_empty() {
        0.0
    } else {
        ratings.iter().map(|r| r.rating).sum::<f32>() / ratings.len() as f32
    };
    println!("{}Favorites: {}", "• ".cyan(), profile.favorites.len());
    println!("{}Ratings: {}", "• ".cyan(), ratings.len());
    println!("{}Average rating: {:.2}", "• ".cyan(), avg_rating);
    println!("{}Similar-movie neighbors: {}", "• ".cyan(), profile.similar_ids.len());

    println!("Top genres:");
    let top = profile.top_genres(5);
    if top.is_empty() {
        println!("  (no recent history)");
    }
    for genre in top {
        let weight = profile.genre_counts.get(&genre).copied().unwrap_or(0);
        println!("  - {} (weight {})", genre, weight);
    }

    let mut top_rated: Vec<_> = ratings.iter().collect();
    top_rated.sort_by(|a, b| {
        b.rating
            .partial_cmp(&a.rating)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.timestamp.cmp(&a.timestamp))
    });
    println!("Top rated movies:");
    for rating in top_rated.iter().take(5) {
        if let Some(movie) = data_index.get_movie(rating.movie_id) {
            println!("  - {} (Rating: {})", movie.title, rating.rating);
        }
    }

    Ok(())
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    services: Arc<AppServices>,
    requests: usize,
    concurrent: usize,
) -> Result<()> {
    let user_ids = services.data_index.user_ids();
    if user_ids.is_empty() {
        return Err(anyhow!("Catalog has no users to benchmark with"));
    }
    if requests == 0 {
        return Err(anyhow!("--requests must be at least 1"));
    }

    let mut rng = StdRng::from_os_rng();
    let picks: Vec<UserId> = (0..requests)
        .map(|_| user_ids[rng.random_range(0..user_ids.len())])
        .collect();

    let semaphore = Arc::new(Semaphore::new(concurrent.max(1)));
    let wall = Instant::now();
    let mut handles = Vec::with_capacity(requests);
    for (i, user_id) in picks.into_iter().enumerate() {
        let services = services.clone();
        let semaphore = semaphore.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let start = Instant::now();
            let profile = build_preference_profile(
                &services.data_index,
                user_id,
                Utc::now(),
                &ProfileConfig::default(),
            )?;
            let request = RecommendationRequest::new(20)
                .with_signals(RequestSignals {
                    personality: profile.personality,
                    ..RequestSignals::default()
                })
                .with_serendipity(true);
            let mut rng = StdRng::seed_from_u64(i as u64);
            services
                .recommendations
                .recommend(&profile, request, &mut rng)
                .await?;
            Ok::<_, anyhow::Error>(start.elapsed())
        }));
    }

    let mut timings = Vec::with_capacity(requests);
    for handle in handles {
        timings.push(handle.await??);
    }
    let wall = wall.elapsed();

    timings.sort();
    let total: Duration = timings.iter().sum();
    let avg_latency = total / timings.len() as u32;
    let throughput = requests as f64 / wall.as_secs_f64();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Requests: {} ({} concurrent)", requests, concurrent.max(1));
    println!("Wall time: {:?}", wall);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(&timings, 0.50));
    println!("P95 latency: {:?}", percentile(&timings, 0.95));
    println!("P99 latency: {:?}", percentile(&timings, 0.99));
    println!("Throughput: {:.2} requests/second", throughput);

    Ok(())
}

/// Nearest-rank percentile over sorted samples
fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let rank = (p * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

fn join_genres(genres: &[Genre]) -> String {
    genres
        .iter()
        .map(|g| g.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Helper function to format and print recommendations
fn print_recommendations(recommendations: &[Recommendation], explain: bool) {
    println!("{}", "Movie Recommendations:".bold().blue());
    if recommendations.is_empty() {
        println!("  (nothing matched)");
        return;
    }

    for (i, rec) in recommendations.iter().enumerate() {
        println!(
            "{}. {} ({}) [{}] - Score: {:.3}",
            (i + 1).to_string().green(),
            rec.title,
            rec.release_year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "????".to_string()),
            join_genres(&rec.genres),
            rec.score
        );
        if !rec.reason.is_empty() {
            println!("   {}", rec.reason.italic());
        }
        if explain {
            let tags: Vec<String> = rec
                .tags
                .iter()
                .map(|t| format!("{} ({:.2})", t.label, t.score))
                .collect();
            println!("   Tags: {}", tags.join(", ").dimmed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_nearest_rank() {
        let samples: Vec<Duration> = (1..=100).map(Duration::from_millis).collect();
        assert_eq!(percentile(&samples, 0.50), Duration::from_millis(50));
        assert_eq!(percentile(&samples, 0.95), Duration::from_millis(95));
        assert_eq!(percentile(&samples, 0.99), Duration::from_millis(99));
        assert_eq!(percentile(&[], 0.5), Duration::ZERO);
    }

    #[test]
    fn test_recommend_flags_parse() {
        let cli = Cli::try_parse_from([
            "reelmix",
            "recommend",
            "--user-id",
            "3",
            "--personality",
            "intj",
            "--weather",
            "rainy",
            "--mood",
            "gloomy",
            "--age-rating",
            "teen",
            "--serendipity",
        ])
        .unwrap();

        match cli.command {
            Commands::Recommend {
                user_id,
                personality,
                weather,
                mood,
                age_rating,
                limit,
                serendipity,
                ..
            } => {
                assert_eq!(user_id, 3);
                assert_eq!(personality, Some(PersonalityType::Intj));
                assert_eq!(weather, Some(Weather::Rainy));
                assert_eq!(mood, Some(Mood::Gloomy));
                assert_eq!(age_rating, Some(AgeRating::Teen));
                assert_eq!(limit, 20);
                assert!(serendipity);
            }
            _ => panic!("expected recommend"),
        }
    }

    #[test]
    fn test_unknown_weather_is_rejected() {
        let result = Cli::try_parse_from(["reelmix", "recommend", "--user-id", "1", "--weather", "foggy"]);
        assert!(result.is_err());
    }
}
