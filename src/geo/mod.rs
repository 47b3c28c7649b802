//! Geographic analysis of site coordinates.
//!
//! Everything here works against a [`RegionProfile`]: a bounding box, a list
//! of provinces and the major cities used for priority and accessibility
//! scoring. The built-in profile is Philippines Region 2 (Cagayan Valley).
//!
//! Coordinates are pulled out of free-form records by [`extract_sites`];
//! points outside the profile's bounds are dropped before any analysis.

pub mod coverage;

use serde::Serialize;

use crate::dataset::{Dataset, Record};

pub use coverage::{
    Cluster, CoverageMetrics, GapAnalysis, GapPoint, Placement, accessibility_score,
    analyze_service_gaps, cluster_sites, coverage_metrics, optimal_placements,
};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

// ---------------------------------------------------------------------------
// Region profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct City {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.south && lat <= self.north && lng >= self.west && lng <= self.east
    }

    /// Rough area in km², treating a degree as 111 km on both axes.
    pub fn approx_area_km2(&self) -> f64 {
        (self.north - self.south) * (self.east - self.west) * 111.0 * 111.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionProfile {
    pub name: &'static str,
    pub center: (f64, f64),
    pub bounds: Bounds,
    pub provinces: Vec<&'static str>,
    pub major_cities: Vec<City>,
}

impl Default for RegionProfile {
    fn default() -> Self {
        Self::region2()
    }
}

impl RegionProfile {
    pub fn region2() -> Self {
        Self {
            name: "Philippines Region 2",
            center: (17.5, 121.5),
            bounds: Bounds {
                north: 18.5,
                south: 16.5,
                east: 122.5,
                west: 120.5,
            },
            provinces: vec!["Cagayan", "Isabela", "Nueva Vizcaya", "Quirino", "Batanes"],
            major_cities: vec![
                City { name: "Tuguegarao", lat: 17.6132, lng: 121.7270 },
                City { name: "Ilagan", lat: 17.1367, lng: 121.8889 },
                City { name: "Santiago", lat: 16.6877, lng: 121.5495 },
                City { name: "Bayombong", lat: 16.4817, lng: 121.1506 },
                City { name: "Cabarroguis", lat: 16.6167, lng: 121.6333 },
                City { name: "Basco", lat: 20.4487, lng: 121.9702 },
            ],
        }
    }

    /// Nearest major city and its distance in km.
    pub fn nearest_city(&self, lat: f64, lng: f64) -> Option<(&City, f64)> {
        self.major_cities
            .iter()
            .map(|c| (c, haversine_km(lat, lng, c.lat, c.lng)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A record with usable in-region coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Site {
    pub lat: f64,
    pub lng: f64,
    /// Position of the source record in the dataset.
    pub index: usize,
}

/// Great-circle distance in kilometres.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Spreadsheet columns R and S hold latitude/longitude in the site sheet.
const POSITIONAL_LAT: usize = 17;
const POSITIONAL_LNG: usize = 18;

fn record_coordinates(record: &Record) -> Option<(f64, f64)> {
    let fields: Vec<&str> = record.fields().collect();

    if fields.len() > POSITIONAL_LNG {
        let lat = record.number(fields[POSITIONAL_LAT]);
        let lng = record.number(fields[POSITIONAL_LNG]);
        if let (Some(lat), Some(lng)) = (lat, lng) {
            return Some((lat, lng));
        }
    }

    let lat_field = fields
        .iter()
        .find(|f| f.to_ascii_lowercase().contains("lat"))?;
    let lng_field = fields.iter().find(|f| {
        let lower = f.to_ascii_lowercase();
        lower.contains("lng") || lower.contains("long")
    })?;
    Some((record.number(lat_field)?, record.number(lng_field)?))
}

/// Sites whose coordinates parse and fall inside the profile's bounds.
pub fn extract_sites(dataset: &Dataset, profile: &RegionProfile) -> Vec<Site> {
    dataset
        .records()
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let (lat, lng) = record_coordinates(record)?;
            profile
                .bounds
                .contains(lat, lng)
                .then_some(Site { lat, lng, index })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

/// Site counts per province, assigned by latitude/longitude bands.
pub fn province_distribution(sites: &[Site]) -> Vec<(&'static str, usize)> {
    vec![
        ("Cagayan", count_where(sites, |s| s.lat > 17.8)),
        ("Isabela", count_where(sites, |s| s.lat >= 16.9 && s.lat <= 17.8)),
        ("Nueva Vizcaya", count_where(sites, |s| s.lat < 16.9 && s.lng < 121.3)),
        ("Quirino", count_where(sites, |s| s.lat < 16.9 && s.lng >= 121.3)),
    ]
}

fn count_where(sites: &[Site], pred: impl Fn(&Site) -> bool) -> usize {
    sites.iter().filter(|s| pred(s)).count()
}

/// Province holding the most sites; ties go to the first listed.
pub fn dominant_province(sites: &[Site]) -> Option<&'static str> {
    if sites.is_empty() {
        return None;
    }
    province_distribution(sites)
        .into_iter()
        .fold(None, |best: Option<(&'static str, usize)>, (name, n)| match best {
            Some((_, m)) if m >= n => best,
            _ => Some((name, n)),
        })
        .map(|(name, _)| name)
}

/// Clusters (at 0.05 km) with at least five members vs. at most two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DensityAreas {
    pub high: usize,
    pub low: usize,
}

pub fn density_areas(sites: &[Site]) -> DensityAreas {
    let clusters = cluster_sites(sites, 0.05);
    DensityAreas {
        high: clusters.iter().filter(|c| c.len() >= 5).count(),
        low: clusters.iter().filter(|c| c.len() <= 2).count(),
    }
}

pub fn strategic_recommendations(sites: &[Site]) -> Vec<String> {
    let mut recs = Vec::new();
    if sites.len() < 10 {
        recs.push("🎯 Consider expanding coverage".to_string());
    }
    if cluster_sites(sites, coverage::DEFAULT_CLUSTER_KM)
        .iter()
        .any(|c| c.len() > 8)
    {
        recs.push("⚖️ Rebalance dense areas".to_string());
    }
    recs.push("📈 Monitor performance trends".to_string());
    recs
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Everything the geo view shows for one dataset.
#[derive(Debug, Clone, Serialize)]
pub struct GeoReport {
    pub region: &'static str,
    pub record_count: usize,
    pub site_count: usize,
    pub cluster_count: usize,
    pub coverage: CoverageMetrics,
    pub provinces: Vec<(&'static str, usize)>,
    pub dominant_province: Option<&'static str>,
    pub density: DensityAreas,
    pub accessibility: u32,
    pub improvement_potential: u32,
    pub placements: Vec<Placement>,
    pub recommendations: Vec<String>,
}

impl GeoReport {
    pub fn build(dataset: &Dataset, profile: &RegionProfile) -> Self {
        let sites = extract_sites(dataset, profile);
        let gaps = analyze_service_gaps(&sites, profile);
        Self {
            region: profile.name,
            record_count: dataset.len(),
            site_count: sites.len(),
            cluster_count: cluster_sites(&sites, coverage::DEFAULT_CLUSTER_KM).len(),
            coverage: coverage_metrics(&sites, profile),
            provinces: province_distribution(&sites),
            dominant_province: dominant_province(&sites),
            density: density_areas(&sites),
            accessibility: accessibility_score(&sites, profile),
            improvement_potential: gaps.improvement_potential,
            placements: optimal_placements(&gaps, profile),
            recommendations: strategic_recommendations(&sites),
        }
    }

    /// Insight bullets in display order.
    pub fn insights(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match self.dominant_province {
            Some(p) => lines.push(format!("Distribution: Concentrated in {p}")),
            None => lines.push("Distribution: No sites within region bounds".to_string()),
        }
        lines.push(format!("High density: {} areas", self.density.high));
        lines.push(format!("Low density: {} areas", self.density.low));
        lines.push(format!("Accessibility: {}/10", self.accessibility));
        lines.extend(self.recommendations.iter().cloned());
        lines
    }

    pub fn render(&self) -> String {
        if self.record_count == 0 {
            return "No data available for geographic analysis".to_string();
        }
        if self.site_count == 0 {
            return format!(
                "🗺️ **Geographic Analysis: {}**\n\nNo valid coordinates found in {} records",
                self.region, self.record_count
            );
        }

        let mut out = format!("🗺️ **Geographic Analysis: {}**\n\n", self.region);
        out.push_str(&format!(
            "📍 {} locations analyzed\n🎯 {} geographic clusters found\n\n",
            self.site_count, self.cluster_count
        ));
        out.push_str(&format!(
            "**Coverage**\n📊 Coverage density: {}\n🎯 Coverage quality: {}\n⚠️ Gap areas: {}\n📐 Estimated coverage: {}%\n\n",
            self.coverage.density, self.coverage.quality, self.coverage.gaps, self.coverage.percentage
        ));
        out.push_str("**Geographic Insights**\n");
        for line in self.insights() {
            out.push_str(&format!("• {line}\n"));
        }
        if !self.placements.is_empty() {
            out.push_str(&format!(
                "\n**Suggested Locations** (coverage improvement potential: {}%)\n",
                self.improvement_potential
            ));
            for (i, p) in self.placements.iter().enumerate() {
                out.push_str(&format!(
                    "{}. {:.4}, {:.4} (priority {:.0}%): {}\n",
                    i + 1,
                    p.lat,
                    p.lng,
                    p.priority * 100.0,
                    p.reason
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(lat: f64, lng: f64) -> Site {
        Site { lat, lng, index: 0 }
    }

    #[test]
    fn haversine_known_distance() {
        // Tuguegarao to Ilagan is roughly 55 km.
        let d = haversine_km(17.6132, 121.7270, 17.1367, 121.8889);
        assert!((d - 55.7).abs() < 1.5, "got {d}");
        assert_eq!(haversine_km(17.0, 121.0, 17.0, 121.0), 0.0);
    }

    #[test]
    fn extraction_prefers_named_columns_and_filters_bounds() {
        let ds = Dataset::new(vec![
            Record::new().with("Latitude", "17.61").with("Longitude", "121.72"),
            Record::new().with("Latitude", "14.60").with("Longitude", "120.98"),
            Record::new().with("Latitude", "n/a").with("Longitude", "121.72"),
        ]);
        let sites = extract_sites(&ds, &RegionProfile::region2());
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].index, 0);
    }

    #[test]
    fn extraction_uses_columns_r_and_s_in_wide_rows() {
        let mut record = Record::new();
        for i in 0..17 {
            record.insert(format!("col{i}"), "x");
        }
        record.insert("R", "16.95");
        record.insert("S", "121.60");
        let sites = extract_sites(&Dataset::new(vec![record]), &RegionProfile::region2());
        assert_eq!(sites, vec![Site { lat: 16.95, lng: 121.60, index: 0 }]);
    }

    #[test]
    fn province_bands() {
        let sites = [site(18.0, 121.7), site(17.2, 121.8), site(16.6, 121.1), site(16.6, 121.6)];
        assert_eq!(
            province_distribution(&sites),
            vec![("Cagayan", 1), ("Isabela", 1), ("Nueva Vizcaya", 1), ("Quirino", 1)]
        );
        assert_eq!(dominant_province(&sites), Some("Cagayan"));
        assert_eq!(dominant_province(&[site(17.0, 121.5), site(17.1, 121.5)]), Some("Isabela"));
        assert_eq!(dominant_province(&[]), None);
    }

    #[test]
    fn recommendations_for_sparse_data() {
        let recs = strategic_recommendations(&[site(17.0, 121.5)]);
        assert_eq!(recs, vec!["🎯 Consider expanding coverage", "📈 Monitor performance trends"]);
    }

    #[test]
    fn report_without_coordinates() {
        let ds = Dataset::new(vec![Record::new().with("Site", "A")]);
        let report = GeoReport::build(&ds, &RegionProfile::region2());
        assert_eq!(report.site_count, 0);
        assert!(report.render().contains("No valid coordinates found in 1 records"));
        assert_eq!(
            GeoReport::build(&Dataset::empty(), &RegionProfile::region2()).render(),
            "No data available for geographic analysis"
        );
    }

    #[test]
    fn nearest_city_lookup() {
        let profile = RegionProfile::region2();
        let (city, d) = profile.nearest_city(17.61, 121.73).unwrap();
        assert_eq!(city.name, "Tuguegarao");
        assert!(d < 1.0);
    }
}
