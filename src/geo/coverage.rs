//! Clustering, coverage estimates and service-gap search.

use std::fmt;

use serde::Serialize;

use super::{RegionProfile, Site, haversine_km};

/// Default clustering radius in km.
pub const DEFAULT_CLUSTER_KM: f64 = 0.1;
/// Assumed service radius of one site in km.
pub const SERVICE_RADIUS_KM: f64 = 10.0;
/// Grid resolution of the gap scan, in degrees.
pub const GAP_GRID_STEP: f64 = 0.05;
/// A grid point farther than this from every site is a gap, in km.
pub const GAP_MAX_DISTANCE_KM: f64 = 0.1;

// ---------------------------------------------------------------------------
// Clustering
// ---------------------------------------------------------------------------

/// Sites grouped around a seed site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub seed: Site,
    /// Positions into the input slice, seed first.
    pub members: Vec<usize>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Greedy single-pass clustering.
///
/// Each unassigned site seeds a cluster and absorbs every later unassigned
/// site within `max_distance_km` of the seed.
pub fn cluster_sites(sites: &[Site], max_distance_km: f64) -> Vec<Cluster> {
    let mut assigned = vec![false; sites.len()];
    let mut clusters = Vec::new();

    for (i, seed) in sites.iter().enumerate() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;
        let mut members = vec![i];

        for (j, other) in sites.iter().enumerate() {
            if assigned[j] {
                continue;
            }
            if haversine_km(seed.lat, seed.lng, other.lat, other.lng) <= max_distance_km {
                assigned[j] = true;
                members.push(j);
            }
        }

        clusters.push(Cluster { seed: *seed, members });
    }

    clusters
}

// ---------------------------------------------------------------------------
// Coverage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Density {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Quality {
    Excellent,
    Good,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GapLevel {
    Many,
    Few,
    Minimal,
}

impl fmt::Display for Density {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Excellent => write!(f, "Excellent"),
            Self::Good => write!(f, "Good"),
            Self::NeedsImprovement => write!(f, "Needs Improvement"),
        }
    }
}

impl fmt::Display for GapLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoverageMetrics {
    pub density: Density,
    pub quality: Quality,
    pub gaps: GapLevel,
    /// Estimated share of the region within a service radius, 0..=100.
    pub percentage: u32,
}

/// Coverage estimate assuming every site serves a fixed radius.
///
/// Overlap is approximated by a flat factor: 0.7 above ten sites, else 0.9.
pub fn coverage_metrics(sites: &[Site], profile: &RegionProfile) -> CoverageMetrics {
    let n = sites.len();
    let region_area = profile.bounds.approx_area_km2();
    let overlap = if n > 10 { 0.7 } else { 0.9 };
    let covered = n as f64 * std::f64::consts::PI * SERVICE_RADIUS_KM.powi(2) * overlap;
    let pct = if region_area > 0.0 {
        (covered / region_area * 100.0).min(100.0)
    } else {
        0.0
    };

    CoverageMetrics {
        density: match n {
            n if n > 20 => Density::High,
            n if n > 10 => Density::Medium,
            _ => Density::Low,
        },
        quality: if pct > 70.0 {
            Quality::Excellent
        } else if pct > 50.0 {
            Quality::Good
        } else {
            Quality::NeedsImprovement
        },
        gaps: match n {
            n if n < 5 => GapLevel::Many,
            n if n < 15 => GapLevel::Few,
            _ => GapLevel::Minimal,
        },
        percentage: pct.round() as u32,
    }
}

/// Mean per-site accessibility on a 0..=10 scale, rounded.
///
/// Each site starts at 5 and gains up to 3 points per major city within
/// 30 km, capped at 10.
pub fn accessibility_score(sites: &[Site], profile: &RegionProfile) -> u32 {
    if sites.is_empty() {
        return 0;
    }
    let total: f64 = sites
        .iter()
        .map(|s| {
            let bonus: f64 = profile
                .major_cities
                .iter()
                .map(|c| haversine_km(s.lat, s.lng, c.lat, c.lng))
                .filter(|d| *d < 30.0)
                .map(|d| (30.0 - d) / 30.0 * 3.0)
                .sum();
            (5.0 + bonus).min(10.0)
        })
        .sum();
    (total / sites.len() as f64).round() as u32
}

// ---------------------------------------------------------------------------
// Service gaps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GapPoint {
    pub lat: f64,
    pub lng: f64,
    /// Distance to the nearest site in km; infinite with no sites.
    #[serde(skip)]
    pub gap_km: f64,
    pub priority: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapAnalysis {
    pub gap_count: usize,
    pub grid_points: usize,
    pub improvement_potential: u32,
    /// Gap points with priority above 0.7, highest first.
    pub priority_areas: Vec<GapPoint>,
}

/// Base priority plus up to 0.5 per major city within 50 km, capped at 1.
pub fn location_priority(lat: f64, lng: f64, profile: &RegionProfile) -> f64 {
    let bonus: f64 = profile
        .major_cities
        .iter()
        .map(|c| haversine_km(lat, lng, c.lat, c.lng))
        .filter(|d| *d < 50.0)
        .map(|d| (50.0 - d) / 50.0 * 0.5)
        .sum();
    (0.3 + bonus).min(1.0)
}

/// Scan a regular grid over the region for points no site serves.
pub fn analyze_service_gaps(sites: &[Site], profile: &RegionProfile) -> GapAnalysis {
    let b = &profile.bounds;
    let lat_steps = ((b.north - b.south) / GAP_GRID_STEP).round() as usize;
    let lng_steps = ((b.east - b.west) / GAP_GRID_STEP).round() as usize;

    let mut gaps = Vec::new();
    for i in 0..=lat_steps {
        let lat = b.south + i as f64 * GAP_GRID_STEP;
        for j in 0..=lng_steps {
            let lng = b.west + j as f64 * GAP_GRID_STEP;
            let nearest = sites
                .iter()
                .map(|s| haversine_km(lat, lng, s.lat, s.lng))
                .fold(f64::INFINITY, f64::min);
            if nearest > GAP_MAX_DISTANCE_KM {
                gaps.push(GapPoint {
                    lat,
                    lng,
                    gap_km: nearest,
                    priority: location_priority(lat, lng, profile),
                });
            }
        }
    }

    let nominal_points = (lat_steps * lng_steps).max(1);
    let gap_pct = gaps.len() as f64 / nominal_points as f64 * 100.0;

    let mut priority_areas: Vec<GapPoint> =
        gaps.iter().copied().filter(|g| g.priority > 0.7).collect();
    priority_areas.sort_by(|a, b| b.priority.total_cmp(&a.priority));

    GapAnalysis {
        gap_count: gaps.len(),
        grid_points: (lat_steps + 1) * (lng_steps + 1),
        improvement_potential: gap_pct.round().min(100.0) as u32,
        priority_areas,
    }
}

/// A suggested new site location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub priority: f64,
    pub reason: String,
}

/// Top five priority gap points, each with a nearest-city reason.
pub fn optimal_placements(gaps: &GapAnalysis, profile: &RegionProfile) -> Vec<Placement> {
    gaps.priority_areas
        .iter()
        .take(5)
        .enumerate()
        .map(|(i, area)| {
            let reason = match profile.nearest_city(area.lat, area.lng) {
                Some((city, d)) => format!("Service gap near {} ({d:.1}km away)", city.name),
                None => "Service gap".to_string(),
            };
            Placement {
                id: format!("optimal-{}", i + 1),
                lat: area.lat,
                lng: area.lng,
                priority: area.priority,
                reason,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(lat: f64, lng: f64) -> Site {
        Site { lat, lng, index: 0 }
    }

    #[test]
    fn clustering_is_greedy_around_seed() {
        // ~0.05 km apart, then one far away.
        let sites = [site(17.0, 121.5), site(17.0004, 121.5), site(17.5, 121.5)];
        let clusters = cluster_sites(&sites, DEFAULT_CLUSTER_KM);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members, vec![0, 1]);
        assert_eq!(clusters[1].members, vec![2]);
    }

    #[test]
    fn coverage_bands() {
        let profile = RegionProfile::region2();
        let few = coverage_metrics(&[site(17.0, 121.5); 3], &profile);
        assert_eq!(few.density, Density::Low);
        assert_eq!(few.gaps, GapLevel::Many);
        assert_eq!(few.quality, Quality::NeedsImprovement);
        // 3 * pi * 100 * 0.9 / 49284 * 100 = 1.72%
        assert_eq!(few.percentage, 2);

        let many = coverage_metrics(&[site(17.0, 121.5); 200], &profile);
        assert_eq!(many.density, Density::High);
        assert_eq!(many.gaps, GapLevel::Minimal);
        assert_eq!(many.percentage, 89);
        assert_eq!(many.quality, Quality::Excellent);
    }

    #[test]
    fn accessibility_near_city_is_higher() {
        let profile = RegionProfile::region2();
        let at_city = accessibility_score(&[site(17.6132, 121.7270)], &profile);
        let remote = accessibility_score(&[site(18.4, 120.6)], &profile);
        assert_eq!(at_city, 8);
        assert_eq!(remote, 5);
        assert_eq!(accessibility_score(&[], &profile), 0);
    }

    #[test]
    fn priority_is_capped() {
        let profile = RegionProfile::region2();
        let p = location_priority(17.6132, 121.7270, &profile);
        assert!(p <= 1.0 && p > 0.7);
        assert_eq!(location_priority(18.5, 120.5, &profile), 0.3);
    }

    #[test]
    fn placements_are_top_five_with_reasons() {
        let profile = RegionProfile::region2();
        let gaps = analyze_service_gaps(&[site(17.6132, 121.7270)], &profile);
        assert_eq!(gaps.grid_points, 41 * 41);
        assert!(gaps.gap_count >= gaps.grid_points - 1);
        assert_eq!(gaps.improvement_potential, 100);

        let placements = optimal_placements(&gaps, &profile);
        assert_eq!(placements.len(), 5);
        assert_eq!(placements[0].id, "optimal-1");
        assert!(placements[0].reason.starts_with("Service gap near "));
        assert!(placements.windows(2).all(|w| w[0].priority >= w[1].priority));
    }
}
