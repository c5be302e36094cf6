//! City lists for picking a location
//!
//! Both functions take their inputs explicitly and build a fresh list; the
//! first spelling of a city wins when duplicates differ only in case.

use super::geocode::Location;
use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CityEntry {
    pub city: String,
    /// Two-letter state abbreviation
    pub state: String,
}

impl CityEntry {
    pub fn new(city: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            state: state.into(),
        }
    }

    fn key(&self) -> (String, String) {
        (
            self.city.trim().to_lowercase(),
            self.state.trim().to_lowercase(),
        )
    }
}

impl fmt::Display for CityEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.city, self.state)
    }
}

impl From<&Location> for CityEntry {
    fn from(location: &Location) -> Self {
        Self::new(location.city.trim(), location.state.trim())
    }
}

/// Cities of the given locations, once each, sorted by state then city
pub fn distinct_cities(locations: &[Location]) -> Vec<CityEntry> {
    dedup_sorted(locations.iter().map(CityEntry::from))
}

/// Union of both lists with the same de-duplication and ordering
pub fn merge_city_lists(sampled: &[CityEntry], major: &[CityEntry]) -> Vec<CityEntry> {
    dedup_sorted(sampled.iter().chain(major).cloned())
}

fn dedup_sorted(entries: impl Iterator<Item = CityEntry>) -> Vec<CityEntry> {
    let mut seen = FxHashSet::default();
    let mut cities: Vec<CityEntry> = entries
        .filter(|entry| !entry.city.trim().is_empty())
        .filter(|entry| seen.insert(entry.key()))
        .collect();

    cities.sort_by_cached_key(|entry| {
        let (city, state) = entry.key();
        (state, city)
    });
    cities
}
