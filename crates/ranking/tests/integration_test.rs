//! Integration tests for scoring and diversity.
//!
//! Score a small catalog end to end and check the ordering guarantees of
//! the post-processing chain.

use cf_model::CfPredictor;
use data_loader::{EmotionCluster, Genre, Mood, Movie, PersonalityType, Weather};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ranking::diversity::{ConsecutiveGenreLimit, FreshnessQuota, GenreCap};
use ranking::tags::DISCOVERY;
use ranking::{
    DiversityPass, DiversityPipeline, HybridScorer, RequestSignals, ScoredCandidate,
    SerendipityConfig, WeightVector, generate_reason, inject_serendipity,
};
use sources::UserPreferenceProfile;
use std::collections::HashMap;
use std::sync::Arc;

fn movie(id: u32, genres: Vec<Genre>, year: i32, quality: f32) -> Movie {
    let mut m = Movie::new(id, format!("Movie {}", id), genres);
    m.release_date = chrono::NaiveDate::from_ymd_opt(year, 3, 1);
    m.weighted_score = quality;
    m.vote_average = quality;
    m
}

fn create_test_catalog() -> Vec<Movie> {
    let mut movies = Vec::new();
    for id in 1..=12 {
        let mut m = movie(id, vec![Genre::Action, Genre::Thriller], 2018, 7.0);
        m.trait_scores.set(PersonalityType::Entj, 0.9 - id as f32 * 0.01);
        movies.push(m);
    }
    for id in 13..=18 {
        let mut m = movie(id, vec![Genre::Drama], 2019, 7.2);
        m.trait_scores.set(PersonalityType::Entj, 0.5);
        m.context_scores.set(Weather::Rainy, 0.8);
        movies.push(m);
    }
    movies.push(movie(19, vec![Genre::Comedy], 2025, 6.5));
    movies.push(movie(20, vec![Genre::Romance], 1988, 8.1));
    movies
}

fn scorer() -> HybridScorer {
    HybridScorer::new(Arc::new(CfPredictor::unavailable()))
}

fn ids(list: &[ScoredCandidate]) -> Vec<u32> {
    list.iter().map(|c| c.id()).collect()
}

#[test]
fn test_quality_factor_separates_equal_raw_scores() {
    let mut a = movie(1, vec![Genre::Drama], 2010, 9.0);
    a.trait_scores.set(PersonalityType::Intj, 0.9);
    let mut b = movie(2, vec![Genre::Drama], 2010, 6.0);
    b.context_scores.set(Weather::Rainy, 0.9);

    let signals = RequestSignals::new()
        .with_personality(PersonalityType::Intj)
        .with_weather(Weather::Rainy);
    let weights = WeightVector::new(0.5, 0.5, 0.0, 0.0, 0.0);

    let scored = scorer().score_with_weights(
        vec![b, a],
        &UserPreferenceProfile::anonymous(),
        &signals,
        weights,
    );

    assert_eq!(ids(&scored), vec![1, 2]);
    assert!((scored[0].score - 0.45).abs() < 1e-6);
    assert!((scored[1].score - 0.3825).abs() < 1e-6);
}

#[test]
fn test_scores_stay_in_unit_interval() {
    let mut movies = create_test_catalog();
    for m in movies.iter_mut() {
        m.popularity = 10_000.0;
        m.emotion_scores.set(EmotionCluster::Tension, 1.0);
    }
    let profile = UserPreferenceProfile::anonymous()
        .with_genre_count(Genre::Action, 9)
        .with_genre_count(Genre::Thriller, 9)
        .with_genre_count(Genre::Drama, 9)
        .with_similar_ids(1..=20);
    let signals = RequestSignals::new()
        .with_personality(PersonalityType::Entj)
        .with_weather(Weather::Rainy)
        .with_mood(Mood::Tense);

    let scored = scorer().score_with_weights(
        movies,
        &profile,
        &signals,
        WeightVector::new(2.0, 2.0, 2.0, 2.0, 2.0),
    );
    assert!(scored.iter().all(|c| (0.0..=1.0).contains(&c.score)));
}

#[test]
fn test_genre_cap_twenty_of_one_genre() {
    let mut input: Vec<ScoredCandidate> = (1..=20)
        .map(|id| ScoredCandidate::new(movie(id, vec![Genre::Horror], 2015, 7.0), 0.9, vec![]))
        .collect();

    // Nothing to backfill with: seven capped plus thirteen deferred
    let out = GenreCap::default().apply(input.clone(), 20);
    assert_eq!(out.len(), 20);
    assert_eq!(ids(&out), (1..=20).collect::<Vec<_>>());

    // With alternatives present the cap holds for the first twenty
    let others = [Genre::Comedy, Genre::Drama, Genre::Crime];
    input.extend((21..=40).map(|id| {
        let genre = others[id as usize % others.len()];
        ScoredCandidate::new(movie(id, vec![genre], 2015, 7.0), 0.5, vec![])
    }));
    let out = GenreCap::default().apply(input, 20);
    let horror = out
        .iter()
        .filter(|c| c.primary_genre() == Some(Genre::Horror))
        .count();
    assert_eq!(horror, 7);
    assert_eq!(out.len(), 20);
}

#[test]
fn test_consecutive_limit_relaxes_for_single_genre_pool() {
    let input: Vec<ScoredCandidate> = (1..=9)
        .map(|id| ScoredCandidate::new(movie(id, vec![Genre::Western], 2015, 7.0), 0.5, vec![]))
        .collect();
    let out = ConsecutiveGenreLimit::default().apply(input, 9);
    assert_eq!(ids(&out), (1..=9).collect::<Vec<_>>());
}

#[test]
fn test_full_chain_preserves_candidates() {
    let profile = UserPreferenceProfile::anonymous()
        .with_genre_count(Genre::Action, 4)
        .with_genre_count(Genre::Thriller, 3);
    let signals = RequestSignals::new()
        .with_personality(PersonalityType::Entj)
        .with_weather(Weather::Rainy);

    let scored = scorer().score(create_test_catalog(), &profile, &signals);
    let pool = scored.len();

    let pipeline = DiversityPipeline::new()
        .add_pass(GenreCap::default())
        .add_pass(ConsecutiveGenreLimit::default())
        .add_pass(FreshnessQuota::default().with_current_year(2026));
    let ranked = pipeline.apply(scored, pool);

    // Reordered, never lost or duplicated
    let mut sorted = ids(&ranked);
    sorted.sort_unstable();
    assert_eq!(sorted, (1..=20).collect::<Vec<_>>());

    // Freshness pulls the recent comedy and the classic romance up front
    assert_eq!(ranked[0].id(), 19);
    assert_eq!(ranked[1].id(), 20);

    // Cap of max(floor(20 · 0.35), 2) = 7 applies to the first seven actions
    let head: Vec<Option<Genre>> = ranked[2..].iter().map(|c| c.primary_genre()).collect();
    let first_actions = head.iter().take(9).filter(|g| **g == Some(Genre::Action)).count();
    assert!(first_actions <= 7);
}

#[test]
fn test_serendipity_after_truncation() {
    let profile = UserPreferenceProfile::anonymous().with_genre_count(Genre::Action, 4);
    let scored = scorer().score(create_test_catalog(), &profile, &RequestSignals::new());

    let mut ranked = scored;
    ranked.truncate(10);

    let pool = vec![
        movie(100, vec![Genre::Documentary], 2012, 8.3),
        movie(101, vec![Genre::Music], 2020, 7.4),
    ];
    let mut rng = StdRng::seed_from_u64(2026);
    let out = inject_serendipity(
        ranked,
        10,
        pool,
        &profile.top_genres(3),
        &SerendipityConfig::default(),
        &mut rng,
    );

    assert_eq!(out.len(), 10);
    // main list of 9; injection at floor(9 · 0.7) = 6
    assert!(out[6].has_tag(DISCOVERY));
    assert_eq!(out.iter().filter(|c| c.has_tag(DISCOVERY)).count(), 1);
}

#[test]
fn test_every_tagged_candidate_gets_a_reason() {
    let profile = UserPreferenceProfile::anonymous()
        .with_genre_count(Genre::Action, 4)
        .with_genre_count(Genre::Thriller, 3);
    let signals = RequestSignals::new().with_weather(Weather::Rainy);

    let scored = scorer().score(create_test_catalog(), &profile, &signals);
    let reasons: HashMap<u32, String> = scored
        .iter()
        .map(|c| (c.id(), generate_reason(c, &signals, 2026)))
        .collect();

    for c in &scored {
        if !c.tags.is_empty() {
            assert!(!reasons[&c.id()].is_empty(), "movie {} has no reason", c.id());
        }
    }
}
