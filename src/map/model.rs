use anyhow::{bail, Result};
use glam::DVec2;
use rayon::prelude::*;
use std::collections::HashMap;

use super::geometry::point_in_rings;
use super::scale::CASE_SCALE;
use super::spatial::CentroidGrid;
use super::view::Bounds;

const GRID_CELL: f64 = 20.0;
const AREA_EPSILON: f64 = 1e-9;

/// A polygonal region in planar map coordinates, keyed by FIPS code.
/// Produced by the boundary loaders.
#[derive(Debug, Clone)]
pub struct Region {
    pub fips: String,
    pub name: Option<String>,
    pub rings: Vec<Vec<DVec2>>,
}

#[derive(Debug, Clone)]
pub struct County {
    pub fips: String,
    pub name: Option<String>,
    pub rings: Vec<Vec<DVec2>>,
    pub centroid: DVec2,
    pub bounds: Bounds,
    /// Cumulative cases on the active date; zero when the table has no row.
    pub cases: u64,
}

#[derive(Debug, Clone)]
pub struct StateRegion {
    pub fips: String,
    pub name: Option<String>,
    pub rings: Vec<Vec<DVec2>>,
    pub bounds: Bounds,
}

/// Boundaries joined with the case table: counties carry the active date's
/// counts, states provide click targets, the mesh draws interior borders.
pub struct MapModel {
    pub counties: Vec<County>,
    pub states: Vec<StateRegion>,
    pub mesh: Vec<Vec<DVec2>>,
    pub home: Bounds,
    grid: CentroidGrid,
    names: HashMap<String, (String, String)>,
    state_names: HashMap<String, String>,
    /// County indexes sorted by descending cases, so small bubbles draw on
    /// top of large ones.
    order: Vec<usize>,
    max_radius: f64,
}

impl MapModel {
    pub fn build(
        counties: Vec<Region>,
        states: Vec<Region>,
        mesh: Vec<Vec<DVec2>>,
        document_bounds: Option<Bounds>,
        names: HashMap<String, (String, String)>,
    ) -> Result<Self> {
        let counties: Vec<County> = counties.into_par_iter().filter_map(build_county).collect();
        if counties.is_empty() {
            bail!("boundary document has no usable counties");
        }

        let states: Vec<StateRegion> = states
            .into_iter()
            .filter_map(|region| {
                let bounds = Bounds::from_points(region.rings.iter().flatten().copied())?;
                Some(StateRegion {
                    fips: region.fips,
                    name: region.name,
                    rings: region.rings,
                    bounds,
                })
            })
            .collect();

        let home = match document_bounds {
            Some(bounds) => bounds,
            None => counties
                .iter()
                .map(|c| c.bounds)
                .reduce(|mut a, b| {
                    a.merge(b);
                    a
                })
                .unwrap_or_else(|| Bounds::new(DVec2::ZERO, DVec2::ONE)),
        };

        let mut state_names: HashMap<String, String> = HashMap::new();
        for (fips, (_, state)) in &names {
            if let Some(prefix) = fips.get(..2) {
                state_names
                    .entry(prefix.to_string())
                    .or_insert_with(|| state.clone());
            }
        }
        for state in &states {
            if let Some(name) = &state.name {
                state_names.insert(state.fips.clone(), name.clone());
            }
        }

        let grid = CentroidGrid::build(counties.iter().map(|c| c.centroid).collect::<Vec<_>>(), GRID_CELL);
        let order = (0..counties.len()).collect();

        Ok(Self {
            counties,
            states,
            mesh,
            home,
            grid,
            names,
            state_names,
            order,
            max_radius: 0.0,
        })
    }

    /// Join one date's case counts onto the counties by exact FIPS match.
    /// Counties absent from the map fall back to zero.
    pub fn apply_cases(&mut self, cases: &HashMap<String, u64>) {
        for county in &mut self.counties {
            county.cases = cases.get(&county.fips).copied().unwrap_or(0);
        }
        let counties = &self.counties;
        self.order
            .sort_by(|&a, &b| counties[b].cases.cmp(&counties[a].cases).then(a.cmp(&b)));
        self.max_radius = self
            .counties
            .iter()
            .map(|c| CASE_SCALE.radius(c.cases as f64))
            .fold(0.0, f64::max);
    }

    /// County indexes in draw order, largest bubbles first.
    pub fn draw_order(&self) -> &[usize] {
        &self.order
    }

    /// The state containing a map-space point, if any.
    pub fn state_at(&self, point: DVec2) -> Option<usize> {
        self.states
            .iter()
            .position(|s| s.bounds.contains(point) && point_in_rings(point, &s.rings))
    }

    /// The bubble under a map-space point. Overlapping bubbles resolve to
    /// the smallest, which is the one drawn on top.
    pub fn bubble_at(&self, point: DVec2) -> Option<usize> {
        if self.max_radius <= 0.0 {
            return None;
        }
        self.grid
            .query_radius(point, self.max_radius)
            .into_iter()
            .filter(|&i| {
                let county = &self.counties[i];
                let radius = CASE_SCALE.radius(county.cases as f64);
                radius > 0.0 && point.distance(county.centroid) <= radius
            })
            .min_by(|&a, &b| self.counties[a].cases.cmp(&self.counties[b].cases))
    }

    /// "County, State" readout for a county, falling back to the case
    /// table's names and then to the raw FIPS code.
    pub fn county_label(&self, index: usize) -> String {
        let county = &self.counties[index];
        let fallback = self.names.get(&county.fips);
        let name = county
            .name
            .clone()
            .or_else(|| fallback.map(|(county, _)| county.clone()));
        let state = county
            .fips
            .get(..2)
            .and_then(|prefix| self.state_names.get(prefix))
            .cloned()
            .or_else(|| fallback.map(|(_, state)| state.clone()));
        match (name, state) {
            (Some(name), Some(state)) => format!("{}, {}", name, state),
            (Some(name), None) => name,
            _ => county.fips.clone(),
        }
    }

    pub fn state_label(&self, index: usize) -> String {
        let state = &self.states[index];
        state.name.clone().unwrap_or_else(|| state.fips.clone())
    }
}

fn build_county(region: Region) -> Option<County> {
    let bounds = Bounds::from_points(region.rings.iter().flatten().copied())?;
    Some(County {
        centroid: polygon_centroid(&region.rings),
        fips: region.fips,
        name: region.name,
        rings: region.rings,
        bounds,
        cases: 0,
    })
}

/// Area-weighted centroid over all rings; holes wind the other way and
/// subtract. Degenerate polygons fall back to the vertex mean.
fn polygon_centroid(rings: &[Vec<DVec2>]) -> DVec2 {
    let mut total_area = 0.0;
    let mut weighted = DVec2::ZERO;
    for ring in rings {
        if let Some((area, centroid)) = ring_area_centroid(ring) {
            total_area += area;
            weighted += centroid * area;
        }
    }
    if total_area.abs() > AREA_EPSILON {
        weighted / total_area
    } else {
        vertex_mean(rings)
    }
}

fn ring_area_centroid(ring: &[DVec2]) -> Option<(f64, DVec2)> {
    if ring.len() < 3 {
        return None;
    }
    let mut area2 = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        let cross = a.x * b.y - b.x * a.y;
        area2 += cross;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    if area2.abs() < AREA_EPSILON {
        return None;
    }
    Some((area2 / 2.0, DVec2::new(cx / (3.0 * area2), cy / (3.0 * area2))))
}

fn vertex_mean(rings: &[Vec<DVec2>]) -> DVec2 {
    let mut sum = DVec2::ZERO;
    let mut count = 0usize;
    for point in rings.iter().flatten() {
        sum += *point;
        count += 1;
    }
    if count == 0 {
        DVec2::ZERO
    } else {
        sum / count as f64
    }
}
