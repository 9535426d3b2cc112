//! Polygon geometry helpers built on `geo`.

use geo::{Coord, LineString, Polygon};

/// Shape-type string used as the display name of imported annotations.
pub const POLYGON_GEOM_TYPE: &str = "Polygon";

/// Build a polygon from an ordered vertex list. The exterior ring is closed
/// automatically; no validity check is applied.
pub fn polygon_from_vertices(vertices: &[(f64, f64)]) -> Polygon<f64> {
    Polygon::new(LineString::from(vertices.to_vec()), vec![])
}

/// Exterior boundary including the closing vertex.
pub fn boundary(polygon: &Polygon<f64>) -> Vec<(f64, f64)> {
    polygon.exterior().coords().map(|c| (c.x, c.y)).collect()
}

/// Exterior vertices without the closing vertex.
pub fn open_ring(polygon: &Polygon<f64>) -> Vec<(f64, f64)> {
    let coords = &polygon.exterior().0;
    let end = match (coords.first(), coords.last()) {
        (Some(first), Some(last)) if coords.len() > 1 && first == last => coords.len() - 1,
        _ => coords.len(),
    };
    coords[..end].iter().map(|c| (c.x, c.y)).collect()
}

/// Number of distinct vertices on the exterior ring.
pub fn distinct_vertex_count(polygon: &Polygon<f64>) -> usize {
    let mut seen: Vec<Coord<f64>> = Vec::new();
    for coord in polygon.exterior().coords() {
        if !seen.contains(coord) {
            seen.push(*coord);
        }
    }
    seen.len()
}

/// A polygon needs at least three distinct vertices to enclose an area.
pub fn is_valid_polygon(polygon: &Polygon<f64>) -> bool {
    distinct_vertex_count(polygon) >= 3
}
