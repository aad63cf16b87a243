//! Named launch sites and their coordinates

use crate::error::{PredictorError, Result};
use crate::models::Coordinates;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Launch site known to the advisor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchSite {
    pub name: String,
    #[serde(flatten)]
    pub coordinates: Coordinates,
}

/// Lookup table from site name to coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct SiteRegistry {
    sites: BTreeMap<String, Coordinates>,
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::empty()
            .with_site("Cape Canaveral", 28.3922, -80.6077)
            .with_site("Kennedy LC-39A", 28.5733, -80.6469)
            .with_site("VAFB SLC 4E", 34.6328, -120.6108)
    }
}

impl SiteRegistry {
    pub fn empty() -> Self {
        Self { sites: BTreeMap::new() }
    }

    pub fn with_site(mut self, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        self.insert(name, Coordinates { latitude, longitude });
        self
    }

    /// Add or replace a site
    pub fn insert(&mut self, name: impl Into<String>, coordinates: Coordinates) {
        self.sites.insert(name.into(), coordinates);
    }

    pub fn resolve(&self, name: &str) -> Result<Coordinates> {
        self.sites.get(name).copied().ok_or_else(|| PredictorError::SiteNotFound {
            site: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sites.contains_key(name)
    }

    /// All sites in name order
    pub fn sites(&self) -> Vec<LaunchSite> {
        self.sites
            .iter()
            .map(|(name, coordinates)| LaunchSite {
                name: name.clone(),
                coordinates: *coordinates,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

impl FromIterator<LaunchSite> for SiteRegistry {
    fn from_iter<I: IntoIterator<Item = LaunchSite>>(iter: I) -> Self {
        let mut registry = Self::empty();
        for site in iter {
            registry.insert(site.name, site.coordinates);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sites() {
        let registry = SiteRegistry::default();
        assert_eq!(registry.len(), 3);

        let cape = registry.resolve("Cape Canaveral").unwrap();
        assert_eq!(cape.latitude, 28.3922);
        assert_eq!(cape.longitude, -80.6077);
        assert!(registry.contains("VAFB SLC 4E"));
    }

    #[test]
    fn test_unknown_site() {
        let err = SiteRegistry::default().resolve("Baikonur").unwrap_err();
        assert!(matches!(err, PredictorError::SiteNotFound { ref site } if site == "Baikonur"));
    }

    #[test]
    fn test_sites_sorted_by_name() {
        let names: Vec<String> = SiteRegistry::default().sites().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Cape Canaveral", "Kennedy LC-39A", "VAFB SLC 4E"]);
    }

    #[test]
    fn test_insert_overrides_coordinates() {
        let registry = SiteRegistry::default().with_site("Cape Canaveral", 1.0, 2.0);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.resolve("Cape Canaveral").unwrap().latitude, 1.0);
    }

    #[test]
    fn test_launch_site_json_is_flat() {
        let site: LaunchSite =
            serde_json::from_str(r#"{"name":"Boca Chica","latitude":25.997,"longitude":-97.157}"#).unwrap();
        let registry: SiteRegistry = std::iter::once(site).collect();
        assert_eq!(registry.resolve("Boca Chica").unwrap().longitude, -97.157);
    }
}
