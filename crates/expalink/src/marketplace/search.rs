//! Directory search and shortlist ranking.
//!
//! Ranking is a pure function over the eligible candidates so it can be exercised without a
//! store. Distances closer than [`DISTANCE_TIE_KM`] are grouped into the same band before
//! sorting, which keeps the comparator a total order while still letting the featured flag and
//! rating decide between professionals who are effectively equidistant.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{GeoPoint, Professional};
use super::error::MarketplaceError;
use super::repository::{DirectoryFilter, MarketplaceStore};
use super::service::MarketplaceService;
use super::subscription::CheckoutGateway;
use crate::config::MarketplaceConfig;

/// Adjacent distances within this gap count as tied.
pub const DISTANCE_TIE_KM: f64 = 0.1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub profession: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub origin: Option<GeoPoint>,
}

impl SearchQuery {
    pub fn for_profession(profession: impl Into<String>) -> Self {
        Self {
            profession: profession.into(),
            ..Self::default()
        }
    }

    pub fn near(mut self, latitude: f64, longitude: f64) -> Self {
        self.origin = Some(GeoPoint::new(latitude, longitude));
        self
    }

    pub fn speaking(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn in_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    /// Store-level filter. The city only applies when no coordinates were supplied.
    pub fn directory_filter(&self) -> DirectoryFilter {
        let city = match self.origin {
            Some(_) => None,
            None => self
                .city
                .as_deref()
                .map(title_case)
                .filter(|city| !city.is_empty()),
        };
        DirectoryFilter {
            profession: Some(self.profession.trim().to_string()),
            language: self
                .language
                .as_deref()
                .map(str::trim)
                .filter(|language| !language.is_empty())
                .map(str::to_string),
            city,
            online_only: true,
        }
    }
}

/// `"las palmas"` -> `"Las Palmas"`.
pub fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Order eligible candidates and cut the shortlist.
pub fn rank(
    mut candidates: Vec<Professional>,
    origin: Option<GeoPoint>,
    config: &MarketplaceConfig,
) -> Vec<Professional> {
    let Some(origin) = origin else {
        candidates.sort_by(|a, b| by_featured(a, b).then_with(|| by_rating(a, b)));
        candidates.truncate(config.shortlist_size);
        return candidates;
    };

    for pro in candidates.iter_mut() {
        pro.distance_km = pro.coordinates().map(|point| origin.distance_km(&point));
    }

    let within_radius = |pro: &Professional| {
        pro.distance_km
            .is_some_and(|km| km <= config.search_radius_km)
    };

    let mut ranked = if candidates.iter().any(within_radius) {
        let mut nearby: Vec<Professional> = candidates.into_iter().filter(within_radius).collect();
        let bands = distance_bands(&nearby);
        nearby.sort_by(|a, b| {
            by_featured(a, b)
                .then_with(|| band_of(&bands, a).cmp(&band_of(&bands, b)))
                .then_with(|| by_rating(a, b))
                .then_with(|| by_distance(a, b))
        });
        nearby
    } else {
        debug!(
            radius_km = config.search_radius_km,
            "no professional within radius, falling back to distance order"
        );
        candidates.sort_by(|a, b| by_distance(a, b).then_with(|| by_rating(a, b)));
        candidates
    };

    ranked.truncate(config.shortlist_size);
    ranked
}

fn by_featured(a: &Professional, b: &Professional) -> Ordering {
    b.is_featured.cmp(&a.is_featured)
}

fn by_rating(a: &Professional, b: &Professional) -> Ordering {
    b.rating.total_cmp(&a.rating)
}

/// Ascending distance with unknown distances last.
fn by_distance(a: &Professional, b: &Professional) -> Ordering {
    match (a.distance_km, b.distance_km) {
        (Some(left), Some(right)) => left.total_cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Band index per professional id; a new band starts whenever the gap exceeds the tie tolerance.
fn distance_bands(candidates: &[Professional]) -> HashMap<String, usize> {
    let mut sorted: Vec<(&str, f64)> = candidates
        .iter()
        .filter_map(|pro| pro.distance_km.map(|km| (pro.id.0.as_str(), km)))
        .collect();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut bands = HashMap::with_capacity(sorted.len());
    let mut band = 0usize;
    let mut previous: Option<f64> = None;
    for (id, km) in sorted {
        if previous.is_some_and(|last| km - last > DISTANCE_TIE_KM) {
            band += 1;
        }
        previous = Some(km);
        bands.insert(id.to_string(), band);
    }
    bands
}

fn band_of(bands: &HashMap<String, usize>, pro: &Professional) -> usize {
    bands.get(&pro.id.0).copied().unwrap_or(usize::MAX)
}

impl<S, C> MarketplaceService<S, C>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    /// Curated shortlist of online professionals for the query.
    pub fn search(&self, query: &SearchQuery) -> Result<Vec<Professional>, MarketplaceError> {
        if query.profession.trim().is_empty() {
            return Err(MarketplaceError::validation("profession is required"));
        }

        let candidates = self.store.find_professionals(&query.directory_filter())?;
        let eligible = candidates.len();
        let ranked = rank(candidates, query.origin, &self.config);
        debug!(
            profession = %query.profession,
            eligible,
            returned = ranked.len(),
            "directory search ranked"
        );
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::domain::ProfessionalId;

    fn pro(id: &str, featured: bool, rating: f32, coords: Option<(f64, f64)>) -> Professional {
        let mut pro = Professional::new(ProfessionalId(id.to_string()), id);
        pro.is_featured = featured;
        pro.rating = rating;
        if let Some((lat, lng)) = coords {
            pro.latitude = Some(lat);
            pro.longitude = Some(lng);
        }
        pro
    }

    fn ids(ranked: &[Professional]) -> Vec<&str> {
        ranked.iter().map(|pro| pro.id.0.as_str()).collect()
    }

    #[test]
    fn title_case_normalises_city_names() {
        assert_eq!(title_case("madrid"), "Madrid");
        assert_eq!(title_case("  las   PALMAS "), "Las Palmas");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn without_origin_featured_then_rating() {
        let ranked = rank(
            vec![
                pro("plain-high", false, 4.9, None),
                pro("featured-low", true, 3.0, None),
                pro("plain-low", false, 4.1, None),
            ],
            None,
            &MarketplaceConfig::default(),
        );
        assert_eq!(ids(&ranked), ["featured-low", "plain-high", "plain-low"]);
    }

    #[test]
    fn shortlist_is_capped() {
        let candidates = (0..10)
            .map(|index| pro(&format!("pro-{index}"), false, 4.0, None))
            .collect();
        let ranked = rank(candidates, None, &MarketplaceConfig::default());
        assert_eq!(ranked.len(), 6);
    }

    #[test]
    fn band_groups_chained_near_ties() {
        let mut candidates = vec![
            pro("a", false, 4.0, None),
            pro("b", false, 4.0, None),
            pro("c", false, 4.0, None),
        ];
        candidates[0].distance_km = Some(10.0);
        candidates[1].distance_km = Some(10.05);
        candidates[2].distance_km = Some(10.3);
        let bands = distance_bands(&candidates);
        assert_eq!(bands["a"], bands["b"]);
        assert!(bands["c"] > bands["b"]);
    }

    #[test]
    fn unknown_distance_is_dropped_when_narrowing() {
        let ranked = rank(
            vec![
                pro("nearby", false, 4.0, Some((40.42, -3.70))),
                pro("nowhere", true, 5.0, None),
            ],
            Some(GeoPoint::new(40.4168, -3.7038)),
            &MarketplaceConfig::default(),
        );
        assert_eq!(ids(&ranked), ["nearby"]);
    }

    #[test]
    fn unknown_distance_sorts_last_in_fallback() {
        let ranked = rank(
            vec![
                pro("nowhere", true, 5.0, None),
                pro("barcelona", false, 4.0, Some((41.3851, 2.1734))),
            ],
            Some(GeoPoint::new(40.4168, -3.7038)),
            &MarketplaceConfig::default(),
        );
        assert_eq!(ids(&ranked), ["barcelona", "nowhere"]);
        assert!(ranked[1].distance_km.is_none());
    }

    #[test]
    fn city_filter_is_ignored_when_coordinates_are_given() {
        let query = SearchQuery::for_profession("Plumber").in_city("sevilla");
        assert_eq!(query.directory_filter().city.as_deref(), Some("Sevilla"));

        let located = query.near(37.38, -5.98);
        assert!(located.directory_filter().city.is_none());
    }
}
