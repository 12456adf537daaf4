//! Closed key sets and fixed-size affinity arrays.
//!
//! Every movie carries three small affinity tables: one score per personality
//! type, one per weather context and one per emotion cluster. The key sets are
//! closed, so each table is a plain array indexed by the key's ordinal rather
//! than a string-keyed map.
//!
//! Values are always inside [0, 1]. Anything else that arrives from a catalog
//! (NaN, strings, unknown keys) is dropped on the way in and reads back as
//! "absent", which scorers treat as 0.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use crate::error::DataLoadError;

/// A closed set of keys that index an [`AffinityMap`].
pub trait AffinityKey: Copy + Eq + fmt::Debug + 'static {
    /// Every key, in ordinal order
    const ALL: &'static [Self];

    /// Position of this key inside an affinity array
    fn index(self) -> usize;

    /// Canonical spelling used in catalogs and labels
    fn as_str(self) -> &'static str;

    /// Case-insensitive lookup by canonical spelling
    fn parse_key(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.as_str().eq_ignore_ascii_case(s))
    }
}

// =============================================================================
// Personality types
// =============================================================================

/// The 16 four-letter personality codes used as trait-affinity keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PersonalityType {
    Intj,
    Intp,
    Entj,
    Entp,
    Infj,
    Infp,
    Enfj,
    Enfp,
    Istj,
    Isfj,
    Estj,
    Esfj,
    Istp,
    Isfp,
    Estp,
    Esfp,
}

/// Temperament groups used when phrasing trait-based reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temperament {
    /// NT types
    Analyst,
    /// NF types
    Diplomat,
    /// SJ types
    Sentinel,
    /// SP types
    Explorer,
}

impl PersonalityType {
    pub fn temperament(self) -> Temperament {
        use PersonalityType::*;
        match self {
            Intj | Intp | Entj | Entp => Temperament::Analyst,
            Infj | Infp | Enfj | Enfp => Temperament::Diplomat,
            Istj | Isfj | Estj | Esfj => Temperament::Sentinel,
            Istp | Isfp | Estp | Esfp => Temperament::Explorer,
        }
    }
}

impl AffinityKey for PersonalityType {
    const ALL: &'static [Self] = &[
        Self::Intj,
        Self::Intp,
        Self::Entj,
        Self::Entp,
        Self::Infj,
        Self::Infp,
        Self::Enfj,
        Self::Enfp,
        Self::Istj,
        Self::Isfj,
        Self::Estj,
        Self::Esfj,
        Self::Istp,
        Self::Isfp,
        Self::Estp,
        Self::Esfp,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Intj => "INTJ",
            Self::Intp => "INTP",
            Self::Entj => "ENTJ",
            Self::Entp => "ENTP",
            Self::Infj => "INFJ",
            Self::Infp => "INFP",
            Self::Enfj => "ENFJ",
            Self::Enfp => "ENFP",
            Self::Istj => "ISTJ",
            Self::Isfj => "ISFJ",
            Self::Estj => "ESTJ",
            Self::Esfj => "ESFJ",
            Self::Istp => "ISTP",
            Self::Isfp => "ISFP",
            Self::Estp => "ESTP",
            Self::Esfp => "ESFP",
        }
    }
}

// =============================================================================
// Weather contexts
// =============================================================================

/// Weather condition supplied with a request; the context-affinity key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weather {
    Sunny,
    Rainy,
    Cloudy,
    Snowy,
}

impl AffinityKey for Weather {
    const ALL: &'static [Self] = &[Self::Sunny, Self::Rainy, Self::Cloudy, Self::Snowy];

    fn index(self) -> usize {
        self as usize
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Sunny => "sunny",
            Self::Rainy => "rainy",
            Self::Cloudy => "cloudy",
            Self::Snowy => "snowy",
        }
    }
}

// =============================================================================
// Emotion clusters and moods
// =============================================================================

/// The seven emotion clusters scored per movie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmotionCluster {
    Healing,
    Tension,
    Energy,
    Romance,
    Deep,
    Fantasy,
    Light,
}

impl AffinityKey for EmotionCluster {
    const ALL: &'static [Self] = &[
        Self::Healing,
        Self::Tension,
        Self::Energy,
        Self::Romance,
        Self::Deep,
        Self::Fantasy,
        Self::Light,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Healing => "healing",
            Self::Tension => "tension",
            Self::Energy => "energy",
            Self::Romance => "romance",
            Self::Deep => "deep",
            Self::Fantasy => "fantasy",
            Self::Light => "light",
        }
    }
}

/// A mood the user can pick; each one maps to one or two emotion clusters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mood {
    Relaxed,
    Tense,
    Excited,
    Emotional,
    Imaginative,
    Light,
    Gloomy,
    Stifled,
}

impl Mood {
    pub const ALL: [Mood; 8] = [
        Mood::Relaxed,
        Mood::Tense,
        Mood::Excited,
        Mood::Emotional,
        Mood::Imaginative,
        Mood::Light,
        Mood::Gloomy,
        Mood::Stifled,
    ];

    /// Emotion clusters averaged into the mood sub-score
    pub fn clusters(self) -> &'static [EmotionCluster] {
        use EmotionCluster as E;
        match self {
            Mood::Relaxed => &[E::Healing],
            Mood::Tense => &[E::Tension],
            Mood::Excited => &[E::Energy],
            Mood::Emotional => &[E::Romance, E::Deep],
            Mood::Imaginative => &[E::Fantasy],
            Mood::Light => &[E::Light],
            Mood::Gloomy => &[E::Deep, E::Healing],
            Mood::Stifled => &[E::Energy, E::Tension],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Relaxed => "relaxed",
            Mood::Tense => "tense",
            Mood::Excited => "excited",
            Mood::Emotional => "emotional",
            Mood::Imaginative => "imaginative",
            Mood::Light => "light",
            Mood::Gloomy => "gloomy",
            Mood::Stifled => "stifled",
        }
    }
}

macro_rules! impl_from_str {
    ($($ty:ty => $field:literal),* $(,)?) => {
        $(
            impl FromStr for $ty {
                type Err = DataLoadError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    <$ty as AffinityKey>::parse_key(s).ok_or_else(|| DataLoadError::InvalidValue {
                        field: $field.to_string(),
                        value: s.to_string(),
                    })
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }

            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.serialize_str(<$ty as AffinityKey>::as_str(*self))
                }
            }

            impl<'de> Deserialize<'de> for $ty {
                fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                    let raw = String::deserialize(deserializer)?;
                    raw.parse().map_err(serde::de::Error::custom)
                }
            }
        )*
    };
}

impl_from_str! {
    PersonalityType => "personality",
    Weather => "weather",
    EmotionCluster => "emotion cluster",
}

impl FromStr for Mood {
    type Err = DataLoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DataLoadError::InvalidValue {
                field: "mood".to_string(),
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// AffinityMap
// =============================================================================

/// Fixed-size affinity table indexed by a closed key set.
///
/// `N` must equal `K::ALL.len()`; use the aliases below rather than naming
/// the const parameter directly.
#[derive(Clone, Copy, PartialEq)]
pub struct AffinityMap<K, const N: usize> {
    values: [Option<f32>; N],
    _key: PhantomData<K>,
}

pub type TraitAffinity = AffinityMap<PersonalityType, 16>;
pub type ContextAffinity = AffinityMap<Weather, 4>;
pub type EmotionAffinity = AffinityMap<EmotionCluster, 7>;

impl<K: AffinityKey, const N: usize> AffinityMap<K, N> {
    pub fn new() -> Self {
        Self {
            values: [None; N],
            _key: PhantomData,
        }
    }

    /// Store a value, clamped into [0, 1]. Non-finite values clear the slot.
    pub fn set(&mut self, key: K, value: f32) {
        if let Some(slot) = self.values.get_mut(key.index()) {
            *slot = value.is_finite().then(|| value.clamp(0.0, 1.0));
        }
    }

    /// Builder-style [`set`](Self::set)
    pub fn with(mut self, key: K, value: f32) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: K) -> Option<f32> {
        self.values.get(key.index()).copied().flatten()
    }

    /// Value for `key`, or 0 when absent
    pub fn score(&self, key: K) -> f32 {
        self.get(key).unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, f32)> + '_ {
        K::ALL
            .iter()
            .copied()
            .filter_map(move |key| self.get(key).map(|value| (key, value)))
    }
}

impl<K: AffinityKey, const N: usize> Default for AffinityMap<K, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: AffinityKey, const N: usize> fmt::Debug for AffinityMap<K, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(k, v)| (k.as_str(), v)))
            .finish()
    }
}

impl<K: AffinityKey, const N: usize> Serialize for AffinityMap<K, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter().map(|(k, v)| (k.as_str(), v)))
    }
}

impl<'de, K: AffinityKey, const N: usize> Deserialize<'de> for AffinityMap<K, N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Malformed entries are skipped, not rejected: a bad score reads as 0.
        let raw: Option<HashMap<String, serde_json::Value>> = Option::deserialize(deserializer)?;
        let mut map = Self::new();
        for (key, value) in raw.into_iter().flatten() {
            if let (Some(key), Some(value)) = (K::parse_key(&key), value.as_f64()) {
                map.set(key, value as f32);
            }
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_sets_are_closed() {
        assert_eq!(PersonalityType::ALL.len(), 16);
        assert_eq!(Weather::ALL.len(), 4);
        assert_eq!(EmotionCluster::ALL.len(), 7);
        for (i, key) in PersonalityType::ALL.iter().enumerate() {
            assert_eq!(key.index(), i);
        }
    }

    #[test]
    fn test_parse_keys_case_insensitive() {
        assert_eq!("intj".parse::<PersonalityType>().unwrap(), PersonalityType::Intj);
        assert_eq!(" Rainy ".parse::<Weather>().unwrap(), Weather::Rainy);
        assert_eq!("GLOOMY".parse::<Mood>().unwrap(), Mood::Gloomy);
        assert!("drizzle".parse::<Weather>().is_err());
    }

    #[test]
    fn test_set_clamps_and_drops_nan() {
        let map = ContextAffinity::new()
            .with(Weather::Sunny, 1.7)
            .with(Weather::Rainy, -0.2)
            .with(Weather::Snowy, f32::NAN);

        assert_eq!(map.get(Weather::Sunny), Some(1.0));
        assert_eq!(map.get(Weather::Rainy), Some(0.0));
        assert_eq!(map.get(Weather::Snowy), None);
        assert_eq!(map.score(Weather::Cloudy), 0.0);
    }

    #[test]
    fn test_deserialize_skips_malformed_entries() {
        let json = r#"{"healing": 0.8, "tension": "high", "nonsense": 0.4, "deep": 3}"#;
        let map: EmotionAffinity = serde_json::from_str(json).unwrap();

        assert_eq!(map.get(EmotionCluster::Healing), Some(0.8));
        assert_eq!(map.get(EmotionCluster::Tension), None);
        assert_eq!(map.get(EmotionCluster::Deep), Some(1.0));
        assert_eq!(map.iter().count(), 2);
    }

    #[test]
    fn test_deserialize_null_is_empty() {
        let map: TraitAffinity = serde_json::from_str("null").unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_mood_cluster_table() {
        assert_eq!(Mood::Relaxed.clusters(), &[EmotionCluster::Healing]);
        assert_eq!(
            Mood::Emotional.clusters(),
            &[EmotionCluster::Romance, EmotionCluster::Deep]
        );
        for mood in Mood::ALL {
            let n = mood.clusters().len();
            assert!((1..=2).contains(&n));
        }
    }

    #[test]
    fn test_keys_serialize_as_canonical_strings() {
        assert_eq!(serde_json::to_string(&PersonalityType::Entj).unwrap(), r#""ENTJ""#);
        let parsed: PersonalityType = serde_json::from_str(r#""infp""#).unwrap();
        assert_eq!(parsed, PersonalityType::Infp);
        assert!(serde_json::from_str::<Weather>(r#""foggy""#).is_err());
    }

    #[test]
    fn test_temperament_groups() {
        assert_eq!(PersonalityType::Intj.temperament(), Temperament::Analyst);
        assert_eq!(PersonalityType::Enfp.temperament(), Temperament::Diplomat);
        assert_eq!(PersonalityType::Isfj.temperament(), Temperament::Sentinel);
        assert_eq!(PersonalityType::Estp.temperament(), Temperament::Explorer);
    }
}
