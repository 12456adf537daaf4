//! Tag labels.

use crate::types::{Tag, TagKind};
use data_loader::{AffinityKey, Mood, PersonalityType, Weather};

pub const TASTE_MATCH: &str = "#TasteMatch";
pub const SIMILAR_PICKS: &str = "#SimilarPicks";
pub const MASTERPIECE: &str = "#Masterpiece";
pub const DISCOVERY: &str = "#Discovery";

pub fn trait_label(personality: PersonalityType) -> String {
    format!("#{}", personality.as_str())
}

pub fn weather_label(weather: Weather) -> &'static str {
    match weather {
        Weather::Sunny => "#SunnyDay",
        Weather::Rainy => "#RainyDay",
        Weather::Cloudy => "#CloudyDay",
        Weather::Snowy => "#SnowyDay",
    }
}

pub fn mood_label(mood: Mood) -> &'static str {
    match mood {
        Mood::Relaxed => "#Relaxed",
        Mood::Tense => "#Tense",
        Mood::Excited => "#Excited",
        Mood::Emotional => "#Emotional",
        Mood::Imaginative => "#Imaginative",
        Mood::Light => "#Light",
        Mood::Gloomy => "#Gloomy",
        Mood::Stifled => "#Stifled",
    }
}

/// Reverse of [`mood_label`]; mood tags share the personal kind, so the
/// label is the only way to tell them apart
pub fn mood_from_label(label: &str) -> Option<Mood> {
    Mood::ALL.into_iter().find(|m| mood_label(*m) == label)
}

impl Tag {
    pub fn personality(personality: PersonalityType, score: f32) -> Self {
        Tag::new(TagKind::Trait, trait_label(personality), score)
    }

    pub fn weather(weather: Weather, score: f32) -> Self {
        Tag::new(TagKind::Context, weather_label(weather), score)
    }

    pub fn mood(mood: Mood, score: f32) -> Self {
        Tag::new(TagKind::Personal, mood_label(mood), score)
    }

    pub fn taste_match(score: f32) -> Self {
        Tag::new(TagKind::Personal, TASTE_MATCH, score)
    }

    pub fn similar_picks(score: f32) -> Self {
        Tag::new(TagKind::Personal, SIMILAR_PICKS, score)
    }

    pub fn masterpiece(score: f32) -> Self {
        Tag::new(TagKind::Rating, MASTERPIECE, score)
    }

    pub fn discovery() -> Self {
        Tag::new(TagKind::Serendipity, DISCOVERY, 0.0)
    }
}
