use glam::DVec3;

use crate::geo::GeoSample;

pub type TriangleId = u32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: DVec3,
    pub geo: GeoSample,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub id: TriangleId,
    pub indices: [u32; 3],
    pub normal: DVec3,
}

/// Lattice as delivered by the builder: samples in row-major order plus
/// triangle corner indices. Positions are not yet in any Cartesian frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LatticeMesh {
    pub width: usize,
    pub height: usize,
    pub samples: Vec<GeoSample>,
    pub triangles: Vec<[u32; 3]>,
}

/// Normalized, render-ready terrain. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainMesh {
    pub width: usize,
    pub height: usize,
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
}

impl TerrainMesh {
    pub fn triangle(&self, id: TriangleId) -> Option<&Triangle> {
        self.triangles.get(id as usize)
    }

    pub fn corners(&self, triangle: &Triangle) -> [&Vertex; 3] {
        triangle.indices.map(|i| &self.vertices[i as usize])
    }

    pub fn positions(&self, triangle: &Triangle) -> [DVec3; 3] {
        triangle.indices.map(|i| self.vertices[i as usize].position)
    }

    pub fn provenance(&self, triangle: &Triangle) -> [&GeoSample; 3] {
        triangle.indices.map(|i| &self.vertices[i as usize].geo)
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}

pub fn face_normal(p: [DVec3; 3]) -> DVec3 {
    (p[1] - p[0]).cross(p[2] - p[0]).normalize_or_zero()
}
