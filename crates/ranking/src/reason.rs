//! Template-based recommendation reasons.
//!
//! One short English sentence per recommendation, built from the candidate's
//! tags and the request signals. No external calls. Where a template pool
//! has several variants the choice is keyed on the movie id, so the same
//! movie always gets the same sentence.

use crate::tags::mood_from_label;
use crate::tags::{SIMILAR_PICKS, TASTE_MATCH};
use crate::types::{RequestSignals, ScoredCandidate, Tag, TagKind};
use data_loader::{AffinityKey, Genre, Mood, Movie, PersonalityType, Temperament, Weather};
use std::collections::HashSet;

/// Years before the current year at or beyond which a title is a classic
const CLASSIC_AGE: i32 = 10;
/// Titles at most this many years old count as recent
const RECENT_AGE: i32 = 2;
const MASTERPIECE_VOTE: f32 = 8.0;
/// Trait tags above this get a type-specific sentence
const STRONG_TRAIT: f32 = 0.7;

fn pick(movie: &Movie, options: &[String]) -> String {
    options[movie.id as usize % options.len()].clone()
}

fn genre_name(movie: &Movie) -> &'static str {
    movie.primary_genre().map(Genre::as_str).unwrap_or("movie")
}

fn weather_phrase(weather: Weather) -> &'static str {
    match weather {
        Weather::Sunny => "a sunny day",
        Weather::Rainy => "a rainy day",
        Weather::Cloudy => "a cloudy day",
        Weather::Snowy => "a snowy day",
    }
}

fn mood_phrase(mood: Mood) -> &'static str {
    match mood {
        Mood::Relaxed => "relaxed",
        Mood::Tense => "on-edge",
        Mood::Excited => "excited",
        Mood::Emotional => "emotional",
        Mood::Imaginative => "imaginative",
        Mood::Light => "light-hearted",
        Mood::Gloomy => "gloomy",
        Mood::Stifled => "cooped-up",
    }
}

// ============================================================================
// Compound reasons
// ============================================================================

fn compound_reason(
    kinds: &HashSet<TagKind>,
    movie: &Movie,
    signals: &RequestSignals,
) -> Option<String> {
    let genre = genre_name(movie);
    let has_trait = kinds.contains(&TagKind::Trait);

    if has_trait
        && let (Some(p), Some(w)) = (signals.personality, signals.weather)
    {
        let (p, w) = (p.as_str(), weather_phrase(w));
        return Some(pick(
            movie,
            &[
                format!("An {} pick that plays even better on {}", p, w),
                format!("A {} for {} that suits the {} in you", genre, w, p),
            ],
        ));
    }

    if has_trait
        && let (Some(p), Some(m)) = (signals.personality, signals.mood)
    {
        let (p, m) = (p.as_str(), mood_phrase(m));
        return Some(pick(
            movie,
            &[
                format!("Just right for an {} feeling {}", p, m),
                format!("A {} for the {} {}", genre, m, p),
            ],
        ));
    }

    if let (Some(w), Some(m)) = (signals.weather, signals.mood) {
        return Some(format!(
            "A perfect choice for {} when you're feeling {}",
            weather_phrase(w),
            mood_phrase(m)
        ));
    }

    if kinds.contains(&TagKind::Personal) && kinds.contains(&TagKind::Rating) {
        return Some("Right up your alley, and critically acclaimed too".to_string());
    }

    if has_trait
        && kinds.contains(&TagKind::Rating)
        && let Some(p) = signals.personality
    {
        return Some(format!(
            "A {:.1}-rated gem {} types love",
            movie.vote_average,
            p.as_str()
        ));
    }

    None
}

// ============================================================================
// Single-signal reasons
// ============================================================================

fn mood_reason(mood: Mood) -> String {
    match mood {
        Mood::Relaxed => "A warm, comforting story to unwind with",
        Mood::Tense => "Edge-of-your-seat tension from start to finish",
        Mood::Excited => "High-energy action to lift your mood",
        Mood::Emotional => "A moving story that runs deep",
        Mood::Imaginative => "Escape into a world of pure imagination",
        Mood::Light => "Easy, breezy fun with no strings attached",
        Mood::Gloomy => "For when you need a good cry",
        Mood::Stifled => "A cathartic release when everything feels stuck",
    }
    .to_string()
}

fn personal_reason(tag: &Tag, movie: &Movie) -> String {
    match tag.label.as_str() {
        TASTE_MATCH => pick(
            movie,
            &[
                format!("A hidden gem in {}, a genre you love", genre_name(movie)),
                "Close in spirit to the movies you saved".to_string(),
            ],
        ),
        SIMILAR_PICKS => "Similar to movies you rated highly".to_string(),
        _ => "Made for your taste".to_string(),
    }
}

fn trait_reason(personality: PersonalityType, score: f32, movie: &Movie) -> String {
    let p = personality.as_str();
    let genre = genre_name(movie);

    if score > STRONG_TRAIT {
        let specific = match personality {
            PersonalityType::Intj => Some(format!("A cerebral {} INTJs tend to love", genre)),
            PersonalityType::Intp => Some(format!("A {} built for the analytical INTP", genre)),
            PersonalityType::Enfp => Some(format!("A {} for the imaginative ENFP", genre)),
            PersonalityType::Infj => Some("Recommended for the insight-seeking INFJ".to_string()),
            PersonalityType::Entj => Some(format!("A {} that matches the ENTJ's drive", genre)),
            _ => None,
        };
        if let Some(reason) = specific {
            return reason;
        }
    }

    let options = match personality.temperament() {
        Temperament::Analyst => [
            format!("Perfect for the logic-loving {}", p),
            format!("Squarely in the {} wheelhouse", p),
        ],
        Temperament::Diplomat => [
            format!("For the empathetic, feeling-driven {}", p),
            format!("A great fit for the {} temperament", p),
        ],
        Temperament::Sentinel => [
            format!("Suits the steady, grounded {}", p),
            format!("A great fit for the {} temperament", p),
        ],
        Temperament::Explorer => [
            format!("The spontaneous {} will enjoy this one", p),
            format!("A great fit for the {} temperament", p),
        ],
    };
    pick(movie, &options)
}

fn weather_reason(weather: Weather, movie: &Movie) -> String {
    let specific = match (weather, movie.primary_genre()) {
        (Weather::Rainy, Some(Genre::Drama)) => Some("Unwind with a quiet drama while it rains"),
        (Weather::Rainy, Some(Genre::Romance)) => Some("A romance that's even better with rain on the window"),
        (Weather::Rainy, Some(Genre::Thriller)) => Some("A rainy night calls for a gripping thriller"),
        (Weather::Sunny, Some(Genre::Adventure)) => Some("An adventure as bright as the weather"),
        (Weather::Sunny, Some(Genre::Comedy)) => Some("A comedy as cheerful as a sunny day"),
        (Weather::Cloudy, Some(Genre::Mystery)) => Some("A mystery to match the overcast mood"),
        (Weather::Snowy, Some(Genre::Animation)) => Some("Cozy animation for a snowy day"),
        (Weather::Snowy, Some(Genre::Family)) => Some("A snow-day movie for the whole family"),
        _ => None,
    };
    if let Some(reason) = specific {
        return reason.to_string();
    }

    match weather {
        Weather::Rainy => "A movie made for rainy-day feelings",
        Weather::Sunny => "A feel-good movie for sunny weather",
        Weather::Cloudy => "Something to sink into on a grey day",
        Weather::Snowy => "A cozy watch for a snowy day",
    }
    .to_string()
}

fn quality_reason(movie: &Movie, current_year: i32) -> String {
    if movie.vote_average >= MASTERPIECE_VOTE {
        return format!("A {:.1}-rated masterpiece", movie.vote_average);
    }
    match movie.release_year() {
        Some(year) if year <= current_year - CLASSIC_AGE => "A timeless classic".to_string(),
        Some(year) if year >= current_year - RECENT_AGE => {
            "A recent hit you shouldn't miss".to_string()
        }
        _ => "Well-rated and well worth your time".to_string(),
    }
}

fn kind_priority(kind: TagKind) -> u8 {
    match kind {
        TagKind::Personal => 0,
        TagKind::Trait => 1,
        TagKind::Context => 2,
        TagKind::Rating => 3,
        TagKind::Serendipity => 9,
    }
}

/// One-sentence reason for a recommendation; empty when nothing applies.
///
/// Compound reasons (two signals together) win over single-tag reasons.
/// Otherwise tags are considered by kind (personal, trait, context, rating)
/// and then by descending score; the first one with a template decides.
pub fn generate_reason(
    candidate: &ScoredCandidate,
    signals: &RequestSignals,
    current_year: i32,
) -> String {
    let movie = &candidate.movie;
    let kinds: HashSet<TagKind> = candidate.tags.iter().map(|t| t.kind).collect();

    if let Some(reason) = compound_reason(&kinds, movie, signals) {
        return reason;
    }

    let mut tags: Vec<&Tag> = candidate.tags.iter().collect();
    tags.sort_by(|a, b| {
        kind_priority(a.kind)
            .cmp(&kind_priority(b.kind))
            .then(b.score.total_cmp(&a.score))
    });

    for tag in tags {
        match tag.kind {
            TagKind::Personal => {
                return match mood_from_label(&tag.label) {
                    Some(mood) => mood_reason(mood),
                    None => personal_reason(tag, movie),
                };
            }
            TagKind::Trait => {
                if let Some(p) = signals.personality {
                    return trait_reason(p, tag.score, movie);
                }
            }
            TagKind::Context => {
                if let Some(w) = signals.weather {
                    return weather_reason(w, movie);
                }
            }
            TagKind::Rating => return quality_reason(movie, current_year),
            TagKind::Serendipity => {}
        }
    }

    String::new()
}
