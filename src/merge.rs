//! Vertex deduplication.
//!
//! [`merge`] collapses coordinates that agree within a tolerance on every axis
//! into one [`Vertex`] of a shared arena. Polygons keep `u32` indices into it.

use crate::geometry::Polygon;
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Merge tolerance used when the configuration does not set one.
pub const DEFAULT_MERGE_TOLERANCE: f64 = 1e-8;

/// A shared vertex of the merged surface.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: DVec3,
    /// Unit average of the normals of every polygon using this vertex.
    pub normal: DVec3,
}

/// A polygon as indices into [`MergedSurface::vertices`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexedPolygon {
    pub indices: Vec<u32>,
    pub normal: DVec3,
}

/// Vertex arena plus indexed polygons.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedSurface {
    pub vertices: Vec<Vertex>,
    pub polygons: Vec<IndexedPolygon>,
    /// Polygons that lost a corner to merging and were dropped.
    pub collapsed: usize,
}

impl MergedSurface {
    pub fn position(&self, index: u32) -> DVec3 {
        self.vertices[index as usize].position
    }

    /// Rebuilds standalone polygons from the arena.
    pub fn to_polygons(&self) -> Vec<Polygon> {
        self.polygons
            .iter()
            .map(|p| Polygon::new(p.indices.iter().map(|&i| self.position(i)).collect()))
            .collect()
    }

    /// Edges used by exactly one polygon, directed along that polygon's winding.
    pub fn boundary_edges(&self) -> Vec<(u32, u32)> {
        let mut counts: HashMap<(u32, u32), usize> = HashMap::new();
        for polygon in &self.polygons {
            for (a, b) in polygon_edges(&polygon.indices) {
                *counts.entry(normalize_edge(a, b)).or_default() += 1;
            }
        }

        self.polygons
            .iter()
            .flat_map(|p| polygon_edges(&p.indices))
            .filter(|&(a, b)| counts.get(&normalize_edge(a, b)) == Some(&1))
            .collect()
    }
}

fn normalize_edge(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

fn polygon_edges(indices: &[u32]) -> impl Iterator<Item = (u32, u32)> + '_ {
    let n = indices.len();
    (0..n).map(move |i| (indices[i], indices[(i + 1) % n]))
}

/// Deduplicates the vertices of `polygons`.
///
/// Each coordinate is compared against the unique set built so far; it reuses
/// the first vertex whose deltas are all below `tolerance`. Vertex normals are
/// the renormalised unweighted mean of the unit normals of the polygons using
/// the vertex. A polygon left with fewer than three distinct indices is dropped,
/// and the arena keeps only vertices referenced by a surviving polygon.
pub fn merge(polygons: &[Polygon], tolerance: f64) -> MergedSurface {
    let mut positions: Vec<DVec3> = Vec::new();
    let mut normal_sums: Vec<DVec3> = Vec::new();
    let mut indexed: Vec<IndexedPolygon> = Vec::with_capacity(polygons.len());
    let mut collapsed = 0;
    let limit = DVec3::splat(tolerance);

    for polygon in polygons {
        let normal = polygon.normal();
        let mut indices: Vec<u32> = Vec::with_capacity(polygon.len());

        for &p in &polygon.vertices {
            let index = match positions.iter().position(|&q| (p - q).abs().cmplt(limit).all()) {
                Some(i) => i,
                None => {
                    positions.push(p);
                    normal_sums.push(DVec3::ZERO);
                    positions.len() - 1
                }
            };
            let index = index as u32;
            if indices.last() != Some(&index) {
                indices.push(index);
            }
        }
        if indices.len() > 1 && indices.first() == indices.last() {
            indices.pop();
        }

        if indices.len() < 3 {
            collapsed += 1;
            continue;
        }
        for &i in &indices {
            normal_sums[i as usize] += normal;
        }
        indexed.push(IndexedPolygon { indices, normal });
    }

    // Corners of collapsed polygons may have been registered without any
    // surviving polygon referencing them.
    let mut used = vec![false; positions.len()];
    for polygon in &indexed {
        for &i in &polygon.indices {
            used[i as usize] = true;
        }
    }
    let mut remap = vec![0u32; positions.len()];
    let mut vertices = Vec::with_capacity(positions.len());
    for (i, (position, sum)) in positions.into_iter().zip(normal_sums).enumerate() {
        if used[i] {
            remap[i] = vertices.len() as u32;
            vertices.push(Vertex {
                position,
                normal: sum.normalize_or_zero(),
            });
        }
    }
    for polygon in &mut indexed {
        for i in &mut polygon.indices {
            *i = remap[*i as usize];
        }
    }

    debug!(
        "Merged {} polygons into {} unique vertices ({} collapsed)",
        indexed.len(),
        vertices.len(),
        collapsed
    );

    MergedSurface {
        vertices,
        polygons: indexed,
        collapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn shared_edge_pair(jitter: f64) -> Vec<Polygon> {
        vec![
            Polygon::triangle(DVec3::ZERO, DVec3::X, DVec3::Y),
            Polygon::triangle(
                DVec3::new(1.0 + jitter, 0.0, 0.0),
                DVec3::new(1.0, 1.0, 0.0),
                DVec3::new(0.0, 1.0 - jitter, 0.0),
            ),
        ]
    }

    #[test]
    fn test_shared_edge_merges_to_four_vertices() {
        let merged = merge(&shared_edge_pair(5e-7), 1e-6);
        assert_eq!(merged.vertices.len(), 4);
        assert_eq!(merged.polygons[0].indices, vec![0, 1, 2]);
        assert_eq!(merged.polygons[1].indices, vec![1, 3, 2]);
        assert_eq!(merged.boundary_edges().len(), 4);
    }

    #[test]
    fn test_distant_vertices_stay_apart() {
        let merged = merge(&shared_edge_pair(1e-3), 1e-6);
        assert_eq!(merged.vertices.len(), 6);
        assert_eq!(merged.boundary_edges().len(), 6);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let once = merge(&shared_edge_pair(5e-7), 1e-6);
        let twice = merge(&once.to_polygons(), 1e-6);
        let positions = |m: &MergedSurface| m.vertices.iter().map(|v| v.position).collect::<Vec<_>>();
        let indices = |m: &MergedSurface| {
            m.polygons
                .iter()
                .map(|p| p.indices.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(positions(&once), positions(&twice));
        assert_eq!(indices(&once), indices(&twice));
    }

    #[test]
    fn test_vertex_normal_is_unweighted_mean() {
        // Two faces folded 90 degrees along the shared X axis edge.
        let polygons = vec![
            Polygon::triangle(DVec3::ZERO, DVec3::X, DVec3::Y),
            Polygon::triangle(DVec3::X, DVec3::ZERO, DVec3::new(0.0, 0.0, 5.0)),
        ];
        let merged = merge(&polygons, 1e-9);
        let shared = merged.vertices[0].normal;
        let expected = (DVec3::Z + DVec3::Y).normalize();
        assert_relative_eq!(shared.x, expected.x, epsilon = 1e-12);
        assert_relative_eq!(shared.y, expected.y, epsilon = 1e-12);
        assert_relative_eq!(shared.z, expected.z, epsilon = 1e-12);
    }

    #[test]
    fn test_collapsed_polygon_is_dropped() {
        let polygons = vec![Polygon::triangle(
            DVec3::ZERO,
            DVec3::new(1e-9, 0.0, 0.0),
            DVec3::Y,
        )];
        let merged = merge(&polygons, 1e-6);
        assert!(merged.polygons.is_empty());
        assert_eq!(merged.collapsed, 1);
        assert!(merged.vertices.is_empty());
    }

    #[test]
    fn test_collapsed_corners_leave_no_orphans() {
        let polygons = vec![
            Polygon::triangle(
                DVec3::new(5.0, 5.0, 5.0),
                DVec3::new(5.0 + 1e-9, 5.0, 5.0),
                DVec3::new(6.0, 5.0, 5.0),
            ),
            Polygon::triangle(DVec3::ZERO, DVec3::X, DVec3::Y),
        ];
        let merged = merge(&polygons, 1e-6);

        assert_eq!(merged.collapsed, 1);
        assert_eq!(merged.vertices.len(), 3);
        assert_eq!(merged.polygons[0].indices, vec![0, 1, 2]);
        assert_eq!(merged.position(1), DVec3::X);
        for vertex in &merged.vertices {
            assert_relative_eq!(vertex.normal.length(), 1.0, epsilon = 1e-12);
        }
    }
}
