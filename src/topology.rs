//! Edge adjacency checks for triangle meshes.

use std::collections::HashMap;

/// Undirected and directed edge usage of a triangle list.
#[derive(Debug, Clone)]
pub struct EdgeTopology {
    /// Maps edge (v0, v1), v0 < v1, to the number of triangles using it.
    undirected: HashMap<(u32, u32), usize>,
    /// Maps the directed edge v0 -> v1 to its use count.
    directed: HashMap<(u32, u32), usize>,
}

impl EdgeTopology {
    pub fn build(triangles: &[[u32; 3]]) -> Self {
        let mut undirected: HashMap<(u32, u32), usize> = HashMap::new();
        let mut directed: HashMap<(u32, u32), usize> = HashMap::new();

        for tri in triangles {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                *undirected.entry(normalize_edge(a, b)).or_default() += 1;
                *directed.entry((a, b)).or_default() += 1;
            }
        }

        Self {
            undirected,
            directed,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.undirected.len()
    }

    /// Edges with exactly one adjacent triangle.
    pub fn boundary_edge_count(&self) -> usize {
        self.undirected.values().filter(|&&n| n == 1).count()
    }

    /// Edges with more than two adjacent triangles.
    pub fn non_manifold_edge_count(&self) -> usize {
        self.undirected.values().filter(|&&n| n > 2).count()
    }

    /// Every edge is shared by exactly two triangles.
    pub fn is_closed_manifold(&self) -> bool {
        !self.undirected.is_empty() && self.undirected.values().all(|&n| n == 2)
    }

    /// Each directed edge appears once and is matched by its reverse.
    pub fn is_consistently_oriented(&self) -> bool {
        self.directed
            .iter()
            .all(|(&(a, b), &n)| n == 1 && self.directed.get(&(b, a)) == Some(&1))
    }
}

fn normalize_edge(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}
