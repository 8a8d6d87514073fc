use anyhow::{bail, Context, Result};
use glam::DVec2;
use serde::Deserialize;
use std::collections::HashMap;

use crate::map::model::Region;
use crate::map::view::Bounds;

/// A topology document: regions share delta-encoded arcs instead of
/// repeating coordinates, so adjacent borders exist exactly once.
#[derive(Debug, Clone, Deserialize)]
pub struct Topology {
    #[serde(rename = "type")]
    pub kind: String,
    pub objects: HashMap<String, TopoGeometry>,
    /// Arc coordinates; delta-encoded when `transform` is present.
    pub arcs: Vec<Vec<Vec<f64>>>,
    #[serde(default)]
    pub transform: Option<Transform>,
    #[serde(default)]
    pub bbox: Option<Vec<f64>>,
}

/// Quantization transform: absolute = cumulative-delta * scale + translate.
#[derive(Debug, Clone, Deserialize)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum TopoGeometry {
    GeometryCollection {
        geometries: Vec<TopoGeometry>,
    },
    Polygon {
        arcs: Vec<Vec<i32>>,
        #[serde(default)]
        id: Option<RegionId>,
        #[serde(default)]
        properties: Option<RegionProperties>,
    },
    MultiPolygon {
        arcs: Vec<Vec<Vec<i32>>>,
        #[serde(default)]
        id: Option<RegionId>,
        #[serde(default)]
        properties: Option<RegionProperties>,
    },
}

/// Region ids appear as strings in the US atlas and as bare numbers in
/// other atlases; both normalize to a zero-padded FIPS string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RegionId {
    Text(String),
    Number(f64),
}

impl RegionId {
    pub fn to_fips(&self, width: usize) -> String {
        match self {
            RegionId::Text(s) if s.len() < width && s.bytes().all(|b| b.is_ascii_digit()) => {
                format!("{:0>width$}", s)
            }
            RegionId::Text(s) => s.clone(),
            RegionId::Number(n) => format!("{:0width$}", *n as u64),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegionProperties {
    #[serde(default)]
    pub name: Option<String>,
}

impl Topology {
    /// Parse a topology document. simd-json mutates the buffer in place.
    pub fn parse(bytes: &mut [u8]) -> Result<Self> {
        let topo: Topology =
            simd_json::from_slice(bytes).context("failed to parse topology document")?;
        if topo.kind != "Topology" {
            bail!("expected a Topology document, got {:?}", topo.kind);
        }
        Ok(topo)
    }

    /// Decode every arc to absolute coordinates, applying the quantization
    /// transform when present.
    pub fn decode_arcs(&self) -> Result<Vec<Vec<DVec2>>> {
        self.arcs
            .iter()
            .enumerate()
            .map(|(i, arc)| {
                decode_arc(arc, self.transform.as_ref())
                    .with_context(|| format!("malformed arc {}", i))
            })
            .collect()
    }

    /// Document bounds from the bbox member, if it carries one.
    pub fn bbox_bounds(&self) -> Option<Bounds> {
        let bbox = self.bbox.as_ref()?;
        if bbox.len() != 4 {
            return None;
        }
        Some(Bounds::new(
            DVec2::new(bbox[0], bbox[1]),
            DVec2::new(bbox[2], bbox[3]),
        ))
    }

    /// Extract the named object's polygon regions. Geometries without an id
    /// cannot join the case table and are skipped.
    pub fn regions(&self, object: &str, fips_width: usize, arcs: &[Vec<DVec2>]) -> Result<Vec<Region>> {
        let geometry = self
            .objects
            .get(object)
            .with_context(|| format!("topology has no {:?} object", object))?;

        let mut regions = Vec::new();
        collect_regions(geometry, fips_width, arcs, &mut regions)?;
        Ok(regions)
    }

    /// Interior borders of the named object: the polyline of every arc
    /// referenced by two distinct regions (shared, not coastline).
    pub fn interior_mesh(&self, object: &str, arcs: &[Vec<DVec2>]) -> Result<Vec<Vec<DVec2>>> {
        let geometry = self
            .objects
            .get(object)
            .with_context(|| format!("topology has no {:?} object", object))?;

        // owners[arc] = Some(region index) after one owner, usize::MAX once shared
        let mut owners: HashMap<usize, usize> = HashMap::new();
        let mut next_region = 0usize;
        mark_arc_owners(geometry, &mut next_region, &mut owners);

        let mut shared: Vec<usize> = owners
            .iter()
            .filter(|(_, &owner)| owner == usize::MAX)
            .map(|(&arc, _)| arc)
            .collect();
        shared.sort_unstable();

        shared
            .into_iter()
            .map(|arc| {
                arcs.get(arc)
                    .cloned()
                    .with_context(|| format!("arc index {} out of range", arc))
            })
            .collect()
    }
}

fn decode_arc(arc: &[Vec<f64>], transform: Option<&Transform>) -> Result<Vec<DVec2>> {
    let mut points = Vec::with_capacity(arc.len());
    match transform {
        Some(t) => {
            let mut qx = 0.0;
            let mut qy = 0.0;
            for position in arc {
                let [dx, dy] = position_xy(position)?;
                qx += dx;
                qy += dy;
                points.push(DVec2::new(
                    qx * t.scale[0] + t.translate[0],
                    qy * t.scale[1] + t.translate[1],
                ));
            }
        }
        None => {
            for position in arc {
                let [x, y] = position_xy(position)?;
                points.push(DVec2::new(x, y));
            }
        }
    }
    Ok(points)
}

fn position_xy(position: &[f64]) -> Result<[f64; 2]> {
    if position.len() < 2 {
        bail!("position has {} coordinates", position.len());
    }
    Ok([position[0], position[1]])
}

/// Resolve an arc reference: negative values are ones'-complement indexes
/// into the arc list, traversed in reverse.
fn arc_ref(index: i32) -> (usize, bool) {
    if index < 0 {
        (!index as usize, true)
    } else {
        (index as usize, false)
    }
}

/// Assemble one ring from its arc references. Consecutive arcs share their
/// join point, which is dropped before each append.
fn assemble_ring(arc_indexes: &[i32], arcs: &[Vec<DVec2>]) -> Result<Vec<DVec2>> {
    let mut ring: Vec<DVec2> = Vec::new();
    for &index in arc_indexes {
        let (arc, reversed) = arc_ref(index);
        let points = arcs
            .get(arc)
            .with_context(|| format!("arc index {} out of range", arc))?;
        if !ring.is_empty() {
            ring.pop();
        }
        if reversed {
            ring.extend(points.iter().rev());
        } else {
            ring.extend(points.iter());
        }
    }
    Ok(ring)
}

fn collect_regions(
    geometry: &TopoGeometry,
    fips_width: usize,
    arcs: &[Vec<DVec2>],
    out: &mut Vec<Region>,
) -> Result<()> {
    match geometry {
        TopoGeometry::GeometryCollection { geometries } => {
            for g in geometries {
                collect_regions(g, fips_width, arcs, out)?;
            }
        }
        TopoGeometry::Polygon { arcs: rings, id, properties } => {
            if let Some(id) = id {
                out.push(Region {
                    fips: id.to_fips(fips_width),
                    name: properties.as_ref().and_then(|p| p.name.clone()),
                    rings: rings
                        .iter()
                        .map(|r| assemble_ring(r, arcs))
                        .collect::<Result<_>>()?,
                });
            }
        }
        TopoGeometry::MultiPolygon { arcs: polygons, id, properties } => {
            if let Some(id) = id {
                out.push(Region {
                    fips: id.to_fips(fips_width),
                    name: properties.as_ref().and_then(|p| p.name.clone()),
                    rings: polygons
                        .iter()
                        .flat_map(|polygon| polygon.iter())
                        .map(|r| assemble_ring(r, arcs))
                        .collect::<Result<_>>()?,
                });
            }
        }
    }
    Ok(())
}

fn mark_arc_owners(
    geometry: &TopoGeometry,
    next_region: &mut usize,
    owners: &mut HashMap<usize, usize>,
) {
    fn mark(rings: &[Vec<i32>], region: usize, owners: &mut HashMap<usize, usize>) {
        for ring in rings {
            for &index in ring {
                let (arc, _) = arc_ref(index);
                match owners.get_mut(&arc) {
                    None => {
                        owners.insert(arc, region);
                    }
                    Some(owner) if *owner != region => *owner = usize::MAX,
                    Some(_) => {}
                }
            }
        }
    }

    match geometry {
        TopoGeometry::GeometryCollection { geometries } => {
            for g in geometries {
                mark_arc_owners(g, next_region, owners);
            }
        }
        TopoGeometry::Polygon { arcs, .. } => {
            mark(arcs, *next_region, owners);
            *next_region += 1;
        }
        TopoGeometry::MultiPolygon { arcs, .. } => {
            for polygon in arcs {
                mark(polygon, *next_region, owners);
            }
            *next_region += 1;
        }
    }
}
