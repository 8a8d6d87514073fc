pub mod cases;
pub mod topology;

pub use cases::CaseTable;

use anyhow::{bail, Context, Result};
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Value};
use glam::DVec2;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::map::model::{MapModel, Region};
use crate::map::view::Bounds;
use topology::Topology;

/// Boundaries and case table, loaded and joined on the latest date.
pub struct WorldData {
    pub model: MapModel,
    pub cases: CaseTable,
}

/// Load the boundary document and the case table concurrently. Both loads
/// must succeed; either failure aborts the whole load.
pub fn load(boundaries: &Path, cases: &Path) -> Result<WorldData> {
    let (boundaries, cases) = rayon::join(
        || load_boundaries(boundaries),
        || CaseTable::load(cases),
    );
    let parts = boundaries?;
    let cases = cases?;

    info!(
        "loaded {} counties, {} states, {} case rows",
        parts.counties.len(),
        parts.states.len(),
        cases.len()
    );

    let model = MapModel::build(
        parts.counties,
        parts.states,
        parts.mesh,
        parts.bounds,
        cases.names(),
    )?;
    Ok(WorldData { model, cases })
}

struct BoundaryParts {
    counties: Vec<Region>,
    states: Vec<Region>,
    mesh: Vec<Vec<DVec2>>,
    bounds: Option<Bounds>,
}

/// The boundary file is either a topology document or a plain GeoJSON
/// feature collection; both carry pre-projected planar coordinates.
#[derive(Deserialize)]
#[serde(untagged)]
enum BoundaryDocument {
    Topology(Topology),
    Features(FeatureCollection),
}

fn load_boundaries(path: &Path) -> Result<BoundaryParts> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read boundary file {}", path.display()))?;
    parse_boundaries(bytes)
        .with_context(|| format!("failed to load boundaries from {}", path.display()))
}

fn parse_boundaries(mut bytes: Vec<u8>) -> Result<BoundaryParts> {
    let document: BoundaryDocument = simd_json::from_slice(&mut bytes)
        .context("expected a Topology or FeatureCollection document")?;
    match document {
        BoundaryDocument::Topology(topology) if topology.kind == "Topology" => {
            from_topology(topology)
        }
        BoundaryDocument::Topology(topology) => {
            bail!("unsupported document type {:?}", topology.kind)
        }
        BoundaryDocument::Features(features) => from_features(features),
    }
}

fn from_topology(topology: Topology) -> Result<BoundaryParts> {
    let arcs = topology.decode_arcs()?;
    debug!("decoded {} topology arcs", arcs.len());
    Ok(BoundaryParts {
        counties: topology.regions("counties", 5, &arcs)?,
        states: topology.regions("states", 2, &arcs)?,
        mesh: topology.interior_mesh("states", &arcs)?,
        bounds: topology.bbox_bounds(),
    })
}

/// A feature collection has no shared-arc structure, so features sort into
/// counties and states by FIPS length and the mesh falls back to the full
/// state outlines.
fn from_features(collection: FeatureCollection) -> Result<BoundaryParts> {
    let mut counties = Vec::new();
    let mut states = Vec::new();

    for feature in &collection.features {
        let Some(fips) = feature_fips(feature) else {
            continue;
        };
        let rings = feature_rings(feature);
        if rings.is_empty() {
            continue;
        }
        let region = Region {
            name: feature_name(feature),
            fips,
            rings,
        };
        if region.fips.len() <= 2 {
            states.push(region);
        } else {
            counties.push(region);
        }
    }

    if counties.is_empty() {
        bail!("feature collection has no county polygons");
    }

    let mesh = states
        .iter()
        .flat_map(|state| state.rings.iter().cloned())
        .collect();
    let bounds = collection.bbox.as_ref().and_then(|bbox| {
        if bbox.len() == 4 {
            Some(Bounds::new(
                DVec2::new(bbox[0], bbox[1]),
                DVec2::new(bbox[2], bbox[3]),
            ))
        } else {
            None
        }
    });

    Ok(BoundaryParts { counties, states, mesh, bounds })
}

fn feature_fips(feature: &Feature) -> Option<String> {
    let raw = match &feature.id {
        Some(Id::String(s)) => s.clone(),
        Some(Id::Number(n)) => n.as_u64()?.to_string(),
        None => feature
            .properties
            .as_ref()?
            .get("id")?
            .as_str()?
            .to_string(),
    };
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if raw.len() <= 2 {
        Some(format!("{:0>2}", raw))
    } else {
        Some(format!("{:0>5}", raw))
    }
}

fn feature_name(feature: &Feature) -> Option<String> {
    feature
        .properties
        .as_ref()?
        .get("name")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

fn feature_rings(feature: &Feature) -> Vec<Vec<DVec2>> {
    let mut rings = Vec::new();
    if let Some(geometry) = &feature.geometry {
        match &geometry.value {
            Value::Polygon(polygon) => {
                for ring in polygon {
                    rings.push(to_ring(ring));
                }
            }
            Value::MultiPolygon(polygons) => {
                for polygon in polygons {
                    for ring in polygon {
                        rings.push(to_ring(ring));
                    }
                }
            }
            _ => {}
        }
    }
    rings
}

fn to_ring(ring: &[Vec<f64>]) -> Vec<DVec2> {
    ring.iter()
        .filter(|p| p.len() >= 2)
        .map(|p| DVec2::new(p[0], p[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_topology_documents() {
        let raw = br#"{
            "type": "Topology",
            "objects": {
                "counties": {
                    "type": "GeometryCollection",
                    "geometries": [
                        {"type": "Polygon", "arcs": [[0]], "id": "01001"}
                    ]
                },
                "states": {
                    "type": "GeometryCollection",
                    "geometries": [
                        {"type": "Polygon", "arcs": [[0]], "id": "01"}
                    ]
                }
            },
            "arcs": [[[0, 0], [4, 0], [4, 4], [0, 4], [0, 0]]]
        }"#
        .to_vec();
        let parts = parse_boundaries(raw).unwrap();
        assert_eq!(parts.counties.len(), 1);
        assert_eq!(parts.counties[0].fips, "01001");
        assert_eq!(parts.states.len(), 1);
        // one region owns every arc, so there is no interior border
        assert!(parts.mesh.is_empty());
    }

    #[test]
    fn test_parses_feature_collections() {
        let raw = br#"{
            "type": "FeatureCollection",
            "bbox": [0, 0, 20, 10],
            "features": [
                {"type": "Feature", "id": "01001",
                 "properties": {"name": "Alpha"},
                 "geometry": {"type": "Polygon",
                              "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}},
                {"type": "Feature", "id": "01",
                 "properties": {"name": "West"},
                 "geometry": {"type": "Polygon",
                              "coordinates": [[[0,0],[20,0],[20,10],[0,10],[0,0]]]}}
            ]
        }"#
        .to_vec();
        let parts = parse_boundaries(raw).unwrap();
        assert_eq!(parts.counties.len(), 1);
        assert_eq!(parts.counties[0].name.as_deref(), Some("Alpha"));
        assert_eq!(parts.states.len(), 1);
        assert_eq!(parts.mesh.len(), 1);
        let bounds = parts.bounds.unwrap();
        assert_eq!(bounds.max, DVec2::new(20.0, 10.0));
    }

    #[test]
    fn test_numeric_feature_ids_pad_to_fips() {
        let raw = br#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "id": 1001,
                 "geometry": {"type": "Polygon",
                              "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}}
            ]
        }"#
        .to_vec();
        let parts = parse_boundaries(raw).unwrap();
        assert_eq!(parts.counties[0].fips, "01001");
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(parse_boundaries(b"{\"type\": \"Drivel\"}".to_vec()).is_err());
    }
}
