// src/linkedin/geo.rs
use serde::Serialize;

use crate::error::{Result, ScoutError};

/// LinkedIn geo codes for the supported metro regions.
pub const DEFAULT_GEO_CODES: &[(&str, u64)] = &[
    ("Melbourne", 101452733),
    ("Sydney", 105072130),
    ("Perth", 102890883),
    ("Brisbane", 100446943),
    ("Adelaide", 101620260),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
    pub city: String,
    pub geo_code: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoTable {
    regions: Vec<Region>,
}

impl Default for GeoTable {
    fn default() -> Self {
        Self {
            regions: DEFAULT_GEO_CODES
                .iter()
                .map(|(city, code)| Region {
                    city: city.to_string(),
                    geo_code: *code,
                })
                .collect(),
        }
    }
}

impl GeoTable {
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        let mut regions: Vec<Region> = Vec::new();

        for (city, geo_code) in entries {
            let city = city.trim().to_string();
            if city.is_empty() {
                return Err(ScoutError::config("geo_codes entry with empty city"));
            }
            if regions
                .iter()
                .any(|r| r.city.eq_ignore_ascii_case(&city) || r.geo_code == geo_code)
            {
                return Err(ScoutError::config(format!(
                    "Duplicate geo_codes entry: {} ({})",
                    city, geo_code
                )));
            }
            regions.push(Region { city, geo_code });
        }

        if regions.is_empty() {
            return Err(ScoutError::config("geo_codes must not be empty"));
        }

        Ok(Self { regions })
    }

    /// Resolve a city name (or a free-form string mentioning one, such as
    /// "Perth, Western Australia") to its geo code.
    pub fn code_for(&self, location: &str) -> Result<u64> {
        let needle = location.trim().to_lowercase();

        self.regions
            .iter()
            .find(|r| r.city.to_lowercase() == needle)
            .or_else(|| {
                self.regions
                    .iter()
                    .find(|r| needle.contains(&r.city.to_lowercase()))
            })
            .map(|r| r.geo_code)
            .ok_or_else(|| ScoutError::UnknownLocation(location.to_string()))
    }

    pub fn region(&self, geo_code: u64) -> Result<&Region> {
        self.regions
            .iter()
            .find(|r| r.geo_code == geo_code)
            .ok_or(ScoutError::UnknownGeoCode(geo_code))
    }

    pub fn contains_code(&self, geo_code: u64) -> bool {
        self.regions.iter().any(|r| r.geo_code == geo_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_codes() {
        let table = GeoTable::default();
        assert_eq!(table.code_for("Melbourne").unwrap(), 101452733);
        assert_eq!(table.code_for("sydney").unwrap(), 105072130);
        assert_eq!(table.code_for("Perth, Western Australia").unwrap(), 102890883);
        assert_eq!(table.code_for("Brisbane").unwrap(), 100446943);
        assert_eq!(table.code_for("Adelaide").unwrap(), 101620260);
    }

    #[test]
    fn test_unknown_location_fails() {
        let table = GeoTable::default();
        assert!(matches!(
            table.code_for("Auckland"),
            Err(ScoutError::UnknownLocation(_))
        ));
    }

    #[test]
    fn test_unknown_code_fails() {
        let table = GeoTable::default();
        assert!(matches!(table.region(42), Err(ScoutError::UnknownGeoCode(42))));
        assert_eq!(table.region(102890883).unwrap().city, "Perth");
        assert!(table.contains_code(102890883));
        assert!(!table.contains_code(42));
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert!(GeoTable::from_entries(vec![
            ("Perth".to_string(), 1),
            ("perth".to_string(), 2)
        ])
        .is_err());
        assert!(GeoTable::from_entries(Vec::<(String, u64)>::new()).is_err());
    }
}
