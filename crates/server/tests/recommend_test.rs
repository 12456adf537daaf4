//! End-to-end tests for the recommendation service over an in-memory
//! catalog.

use async_trait::async_trait;
use cf_model::CfPredictor;
use chrono::{Datelike, NaiveDate, Utc};
use data_loader::{DataIndex, ExperimentGroup, Genre, Movie, MovieId, PersonalityType, User};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ranking::tags::DISCOVERY;
use ranking::{HybridScorer, RequestSignals};
use semantic::InMemoryCache;
use server::{AppConfig, AppServices, RecommendationRequest, RecommendationService};
use sources::{
    AgeRating, InMemoryStore, MovieFilter, MovieStore, Page, ProfileConfig, SortOrder, StoreError,
    UserPreferenceProfile, build_preference_profile,
};
use std::sync::Arc;

// ============================================================================
// Fixtures
// ============================================================================

const USER: u32 = 7;

fn mid_age_date() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(Utc::now().year() - 5, 6, 1)
}

fn movie(id: MovieId, genres: Vec<Genre>, quality: f32, popularity: f32) -> Movie {
    let mut m = Movie::new(id, format!("Movie {}", id), genres);
    m.release_date = mid_age_date();
    m.weighted_score = quality;
    m.vote_average = quality;
    m.popularity = popularity;
    m
}

/// 14 Action titles on top, 6 Drama below them, two off-taste gems at the
/// bottom, and two favorited titles that must never come back.
fn create_test_index() -> Arc<DataIndex> {
    let mut index = DataIndex::new();

    for id in 1..=14 {
        let mut m = movie(id, vec![Genre::Action], 7.0, 50.0);
        m.trait_scores.set(PersonalityType::Entj, 0.9 - id as f32 * 0.01);
        if id == 14 {
            m.certification = Some("18".to_string());
        }
        index.insert_movie(m);
    }
    for id in 15..=20 {
        let mut m = movie(id, vec![Genre::Drama], 6.8, 40.0);
        m.trait_scores.set(PersonalityType::Entj, 0.3);
        index.insert_movie(m);
    }
    index.insert_movie(movie(30, vec![Genre::Documentary], 8.5, 5.0));
    let mut animated = movie(31, vec![Genre::Animation], 7.6, 4.0);
    animated.certification = Some("ALL".to_string());
    index.insert_movie(animated);

    index.insert_movie(movie(40, vec![Genre::Action], 7.0, 60.0));
    index.insert_movie(movie(41, vec![Genre::Action, Genre::Thriller], 7.0, 60.0));

    index.insert_user(User {
        id: USER,
        experiment_group: ExperimentGroup::Control,
        personality: Some(PersonalityType::Entj),
    });
    index.insert_favorite(USER, 40);
    index.insert_favorite(USER, 41);

    Arc::new(index)
}

fn create_profile(index: &DataIndex) -> UserPreferenceProfile {
    build_preference_profile(index, USER, Utc::now(), &ProfileConfig::default()).unwrap()
}

fn create_service(index: Arc<DataIndex>) -> RecommendationService {
    let store: Arc<dyn MovieStore> = Arc::new(InMemoryStore::new(index));
    RecommendationService::new(store, HybridScorer::new(Arc::new(CfPredictor::unavailable())))
        .with_current_year(Utc::now().year())
}

fn entj_request(limit: usize) -> RecommendationRequest {
    RecommendationRequest::new(limit)
        .with_signals(RequestSignals::new().with_personality(PersonalityType::Entj))
}

struct DownStore;

#[async_trait]
impl MovieStore for DownStore {
    async fn query(
        &self,
        _filter: &MovieFilter,
        _order: SortOrder,
        _page: Page,
    ) -> Result<Vec<Movie>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn fetch_by_ids(&self, _ids: &[MovieId]) -> Result<Vec<Movie>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

// ============================================================================
// Recommendation flow
// ============================================================================

#[tokio::test]
async fn test_recommend_respects_limit_and_skips_favorites() {
    let index = create_test_index();
    let profile = create_profile(&index);
    let service = create_service(index);
    let mut rng = StdRng::seed_from_u64(1);

    let recs = service.recommend(&profile, entj_request(10), &mut rng).await.unwrap();

    assert_eq!(recs.len(), 10);
    assert!(recs.iter().all(|r| r.movie_id != 40 && r.movie_id != 41));
    assert_eq!(recs[0].movie_id, 1);
    assert!(recs[0].tag_labels().contains(&"#ENTJ"));
    assert!(!recs[0].reason.is_empty());
}

#[tokio::test]
async fn test_diversity_breaks_up_genre_runs() {
    let index = create_test_index();
    let profile = create_profile(&index);
    let service = create_service(index);
    let mut rng = StdRng::seed_from_u64(1);

    let recs = service.recommend(&profile, entj_request(10), &mut rng).await.unwrap();

    let primaries: Vec<Genre> = recs.iter().map(|r| r.genres[0]).collect();
    for run in primaries.windows(3) {
        assert!(
            !(run[0] == run[1] && run[1] == run[2]),
            "three in a row: {:?}",
            primaries
        );
    }
    assert!(primaries.contains(&Genre::Drama));
}

#[tokio::test]
async fn test_without_diversity_order_is_pure_score() {
    let index = create_test_index();
    let profile = create_profile(&index);
    let service = create_service(index).with_diversity(None);
    let mut rng = StdRng::seed_from_u64(1);

    let recs = service.recommend(&profile, entj_request(10), &mut rng).await.unwrap();

    assert!(!service.diversity_enabled());
    let ids: Vec<MovieId> = recs.iter().map(|r| r.movie_id).collect();
    assert_eq!(ids, (1..=10).collect::<Vec<_>>());
    for pair in recs.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn test_family_rating_drops_adult_titles() {
    let index = create_test_index();
    let profile = create_profile(&index);
    let service = create_service(index);
    let mut rng = StdRng::seed_from_u64(1);

    let open = service.recommend(&profile, entj_request(50), &mut rng).await.unwrap();
    let family = service
        .recommend(&profile, entj_request(50).with_age_rating(AgeRating::Family), &mut rng)
        .await
        .unwrap();

    assert_eq!(open.len(), 22);
    assert!(open.iter().any(|r| r.movie_id == 14));
    assert_eq!(family.len(), 21);
    assert!(family.iter().all(|r| r.movie_id != 14));
}

#[tokio::test]
async fn test_serendipity_adds_one_discovery() {
    let index = create_test_index();
    let profile = create_profile(&index);
    let service = create_service(index);
    let mut rng = StdRng::seed_from_u64(42);

    let request = entj_request(10).with_serendipity(true);
    let recs = service.recommend(&profile, request, &mut rng).await.unwrap();

    assert_eq!(recs.len(), 10);
    let discoveries: Vec<usize> = recs
        .iter()
        .enumerate()
        .filter(|(_, r)| r.tag_labels().contains(&DISCOVERY))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(discoveries, vec![6]);

    let pick = &recs[6];
    assert!(pick.movie_id == 30 || pick.movie_id == 31);
    assert_eq!(pick.score, 0.0);
    assert!(!pick.genres.contains(&Genre::Action));
}

#[tokio::test]
async fn test_anonymous_profile_gets_no_discovery() {
    let service = create_service(create_test_index());
    let mut rng = StdRng::seed_from_u64(42);

    let request = entj_request(10).with_serendipity(true);
    let recs = service
        .recommend(&UserPreferenceProfile::anonymous(), request, &mut rng)
        .await
        .unwrap();

    assert_eq!(recs.len(), 10);
    assert!(recs.iter().all(|r| !r.tag_labels().contains(&DISCOVERY)));
}

#[tokio::test]
async fn test_zero_limit_is_empty() {
    let index = create_test_index();
    let profile = create_profile(&index);
    let service = create_service(index);
    let mut rng = StdRng::seed_from_u64(1);

    let recs = service.recommend(&profile, entj_request(0), &mut rng).await.unwrap();
    assert!(recs.is_empty());
}

#[tokio::test]
async fn test_store_failure_is_an_error() {
    let service = RecommendationService::new(
        Arc::new(DownStore),
        HybridScorer::new(Arc::new(CfPredictor::unavailable())),
    );
    let mut rng = StdRng::seed_from_u64(1);

    let result = service
        .recommend(&UserPreferenceProfile::anonymous(), entj_request(5), &mut rng)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_recommendation_serializes_with_reason() {
    let index = create_test_index();
    let profile = create_profile(&index);
    let service = create_service(index);
    let mut rng = StdRng::seed_from_u64(1);

    let recs = service.recommend(&profile, entj_request(1), &mut rng).await.unwrap();
    let json = serde_json::to_value(&recs[0]).unwrap();

    assert_eq!(json["movie_id"], 1);
    assert!(json["reason"].is_string());
    assert_eq!(json["genres"][0], "Action");
}

// ============================================================================
// Service wiring
// ============================================================================

#[tokio::test]
async fn test_services_without_index_fall_back_to_keywords() {
    let index = create_test_index();
    let store: Arc<dyn MovieStore> = Arc::new(InMemoryStore::new(index.clone()));
    let config = AppConfig::default();

    let services = AppServices::from_parts(
        &config,
        index,
        store,
        Arc::new(CfPredictor::unavailable()),
        None,
        Arc::new(InMemoryCache::new()),
    )
    .unwrap();

    assert!(services.recommendations.diversity_enabled());
    assert!(!services.search.is_available());

    let response = services.search.search("movie 3", 5).await.unwrap();
    assert!(response.fallback);
    assert!(!response.results.is_empty());
    assert!(response.results.iter().all(|h| h.movie.title.contains("Movie 3")));
}

#[tokio::test]
async fn test_services_honor_diversity_flag() {
    let index = create_test_index();
    let store: Arc<dyn MovieStore> = Arc::new(InMemoryStore::new(index.clone()));
    let config = AppConfig {
        diversity_enabled: false,
        ..AppConfig::default()
    };

    let services = AppServices::from_parts(
        &config,
        index,
        store,
        Arc::new(CfPredictor::unavailable()),
        None,
        Arc::new(InMemoryCache::new()),
    )
    .unwrap();

    assert!(!services.recommendations.diversity_enabled());
}
