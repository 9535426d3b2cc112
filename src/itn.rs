//! Legacy `.itn` polygon files
//!
//! An `.itn` file is an INI document with a single `[Polygon]` section whose
//! keys encode vertex coordinates as `poly_x_{p}_{v}` / `poly_y_{p}_{v}`,
//! `p` being the polygon index within the file and `v` the vertex index
//! within that polygon. Keys are matched case-insensitively.

use ini::{Ini, Properties};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::CodecError;

/// Name of the only section read or written.
pub const POLYGON_SECTION: &str = "Polygon";

/// File extension of legacy polygon files.
pub const ITN_EXTENSION: &str = "itn";

/// Polygon index -> ordered vertex list.
pub type PolygonMap = BTreeMap<usize, Vec<(f64, f64)>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

impl Axis {
    fn name(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
        }
    }
}

/// Split a `poly_{x|y}_{p}_{v}` key into its parts. Returns `None` for keys
/// that do not follow the pattern.
fn parse_key(key: &str) -> Option<(Axis, usize, usize)> {
    let lower = key.trim().to_ascii_lowercase();
    let mut parts = lower.split('_');
    if parts.next()? != "poly" {
        return None;
    }
    let axis = match parts.next()? {
        "x" => Axis::X,
        "y" => Axis::Y,
        _ => return None,
    };
    let polygon = parts.next()?.parse().ok()?;
    let vertex = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((axis, polygon, vertex))
}

/// Group flat coordinate entries into polygons.
///
/// Entries whose key does not match `poly_x_*`/`poly_y_*` are ignored.
/// Vertices are ordered by their vertex index. A vertex with only one of
/// its coordinates, a non-numeric or non-finite value, or a repeated key
/// is an error.
pub fn decode<'a, I>(entries: I) -> Result<PolygonMap, CodecError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut grouped: BTreeMap<usize, BTreeMap<usize, (Option<f64>, Option<f64>)>> =
        BTreeMap::new();

    for (key, value) in entries {
        let Some((axis, polygon, vertex)) = parse_key(key) else {
            continue;
        };
        let coordinate = value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|c| c.is_finite())
            .ok_or_else(|| CodecError::InvalidCoordinate {
                key: key.to_string(),
                value: value.to_string(),
            })?;

        let slot = grouped.entry(polygon).or_default().entry(vertex).or_default();
        let target = match axis {
            Axis::X => &mut slot.0,
            Axis::Y => &mut slot.1,
        };
        if target.replace(coordinate).is_some() {
            return Err(CodecError::DuplicateCoordinate {
                key: key.trim().to_ascii_lowercase(),
            });
        }
    }

    let mut polygons = PolygonMap::new();
    for (polygon, vertices) in grouped {
        let mut points = Vec::with_capacity(vertices.len());
        for (vertex, pair) in vertices {
            match pair {
                (Some(x), Some(y)) => points.push((x, y)),
                (None, _) => {
                    return Err(CodecError::UnpairedCoordinate {
                        polygon,
                        vertex,
                        missing: Axis::X.name(),
                    })
                }
                (_, None) => {
                    return Err(CodecError::UnpairedCoordinate {
                        polygon,
                        vertex,
                        missing: Axis::Y.name(),
                    })
                }
            }
        }
        polygons.insert(polygon, points);
    }
    Ok(polygons)
}

/// Flatten one polygon into `poly_x_{index}_{j}` / `poly_y_{index}_{j}` entries.
pub fn encode(index: usize, vertices: &[(f64, f64)]) -> Vec<(String, String)> {
    let mut entries = Vec::with_capacity(vertices.len() * 2);
    for (j, &(x, y)) in vertices.iter().enumerate() {
        entries.push((format!("poly_x_{}_{}", index, j), x.to_string()));
        entries.push((format!("poly_y_{}_{}", index, j), y.to_string()));
    }
    entries
}

/// Read every polygon stored in an `.itn` file.
pub fn read_itn_file(path: &Path) -> Result<PolygonMap, CodecError> {
    read_itn(path).map_err(|e| e.in_file(path))
}

fn read_itn(path: &Path) -> Result<PolygonMap, CodecError> {
    let document = Ini::load_from_file(path)?;
    let section = document
        .section(Some(POLYGON_SECTION))
        .ok_or_else(|| CodecError::MissingSection {
            section: POLYGON_SECTION.to_string(),
        })?;
    decode(section.iter())
}

/// Build an `.itn` document from polygons given in output order; each
/// polygon is keyed by its position in the slice.
pub fn build_itn_document(polygons: &[Vec<(f64, f64)>]) -> Ini {
    let mut document = Ini::new();
    let section = document
        .entry(Some(POLYGON_SECTION.to_string()))
        .or_insert_with(Properties::new);
    for (index, vertices) in polygons.iter().enumerate() {
        for (key, value) in encode(index, vertices) {
            section.insert(key, value);
        }
    }
    document
}

/// Write polygons to an `.itn` file, replacing any existing file.
pub fn write_itn_file(path: &Path, polygons: &[Vec<(f64, f64)>]) -> Result<(), CodecError> {
    build_itn_document(polygons)
        .write_to_file(path)
        .map_err(|e| CodecError::from(e).in_file(path))
}
