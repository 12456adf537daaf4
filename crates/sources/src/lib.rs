//! # Sources Crate
//!
//! Where candidate movies and user preferences come from.
//!
//! ## Components
//!
//! ### Movie Store
//! A typed query interface (`MovieFilter`, `SortOrder`, `Page`) behind the
//! async `MovieStore` trait. `InMemoryStore` answers from a shared
//! `DataIndex`; other backends plug in behind the same trait.
//!
//! ### Candidate Pools
//! - Hybrid pool: quality ≥ 6.0, favorites excluded, optional age-rating
//!   allow-list, most popular first, 200 movies
//! - Serendipity pool: high quality, outside the user's top genres
//!
//! ### Preference Profile
//! Favorites, recent high ratings, genre counts and similarity neighbors,
//! gathered once per request.
//!
//! ## Example Usage
//!
//! ```ignore
//! use sources::{fetch_candidates, build_preference_profile, InMemoryStore};
//! use std::sync::Arc;
//!
//! let data_index = Arc::new(DataIndex::load_from_files(dir)?);
//! let store = InMemoryStore::new(data_index.clone());
//!
//! let profile = build_preference_profile(&data_index, user_id, Utc::now(), &ProfileConfig::default())?;
//! let pool = fetch_candidates(&store, &profile, None, &CandidatePoolConfig::default()).await?;
//! ```

pub mod certification;
pub mod pool;
pub mod profile;
pub mod store;

pub use certification::AgeRating;
pub use pool::{fetch_candidates, fetch_serendipity_pool, CandidatePoolConfig};
pub use profile::{build_preference_profile, ProfileConfig, UserPreferenceProfile};
pub use store::{InMemoryStore, MovieFilter, MovieStore, Page, SortOrder, StoreError};
