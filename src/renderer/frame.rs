use std::sync::Arc;

use glam::{DVec2, DVec3};
use rayon::prelude::*;

use crate::mesh::{TerrainMesh, TriangleId};
use crate::renderer::camera::{CameraPose, ClipVertex, FrustumPolicy, Projector, Viewport};
use crate::renderer::raster::{RasterBuffer, Rasterizer};

/// A triangle that survived the frustum test, in raster space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedTriangle {
    pub id: TriangleId,
    pub screen: [DVec2; 3],
    pub depth: [f64; 3],
    pub inv_w: [f64; 3],
}

pub struct ProjectedMesh {
    triangles: Vec<ProjectedTriangle>,
    slots: Vec<Option<u32>>,
}

impl ProjectedMesh {
    pub fn project(mesh: &TerrainMesh, projector: &Projector, viewport: Viewport) -> Self {
        let vertices: Vec<Option<ClipVertex>> = mesh
            .vertices
            .par_iter()
            .map(|v| {
                projector
                    .project(v.position)
                    .filter(|c| projector.inside(c.ndc))
            })
            .collect();

        let triangles: Vec<ProjectedTriangle> = mesh
            .triangles
            .par_iter()
            .filter_map(|t| {
                let [a, b, c] = t.indices.map(|i| vertices[i as usize]);
                let corners = [a?, b?, c?];
                Some(ProjectedTriangle {
                    id: t.id,
                    screen: corners.map(|v| viewport.to_screen(v.ndc)),
                    depth: corners.map(|v| v.ndc.z),
                    inv_w: corners.map(|v| 1.0 / v.w),
                })
            })
            .collect();

        let mut slots = vec![None; mesh.triangle_count()];
        for (slot, t) in triangles.iter().enumerate() {
            slots[t.id as usize] = Some(slot as u32);
        }

        log::debug!(
            "projected {} of {} triangles",
            triangles.len(),
            mesh.triangle_count()
        );
        Self { triangles, slots }
    }

    pub fn triangles(&self) -> &[ProjectedTriangle] {
        &self.triangles
    }

    pub fn get(&self, id: TriangleId) -> Option<&ProjectedTriangle> {
        let slot = (*self.slots.get(id as usize)?)?;
        self.triangles.get(slot as usize)
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// Everything the picking stage needs from one broad render: the mesh, the
/// camera it was seen through, the surviving triangles and the filled buffer.
/// Immutable once rendered.
pub struct RenderedFrame {
    mesh: Arc<TerrainMesh>,
    camera: CameraPose,
    viewport: Viewport,
    policy: FrustumPolicy,
    projected: ProjectedMesh,
    buffer: RasterBuffer,
}

impl RenderedFrame {
    pub fn render(
        mesh: Arc<TerrainMesh>,
        camera: CameraPose,
        viewport: Viewport,
        policy: FrustumPolicy,
    ) -> Self {
        let start = std::time::Instant::now();
        let projector = Projector::new(&camera, policy);
        let projected = ProjectedMesh::project(&mesh, &projector, viewport);

        let rasterizer = Rasterizer::new(viewport);
        let mut buffer = RasterBuffer::new(viewport);
        rasterizer.rasterize(projected.triangles(), &mut buffer);

        log::info!(
            "broad pass: {} triangles, {} pixels covered in {:?}",
            projected.len(),
            buffer.covered_pixels(),
            start.elapsed()
        );

        Self {
            mesh,
            camera,
            viewport,
            policy,
            projected,
            buffer,
        }
    }

    pub fn mesh(&self) -> &TerrainMesh {
        &self.mesh
    }

    pub fn camera(&self) -> &CameraPose {
        &self.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Buffer pixel a model-space point lands on, or `None` when the frustum
    /// test rejects it.
    pub fn locate(&self, point: DVec3) -> Option<(u32, u32)> {
        let projector = Projector::new(&self.camera, self.policy);
        let clip = projector
            .project(point)
            .filter(|c| projector.inside(c.ndc))?;
        Some(self.viewport.to_pixel(clip.ndc))
    }

    pub fn projected(&self) -> &ProjectedMesh {
        &self.projected
    }

    pub fn buffer(&self) -> &RasterBuffer {
        &self.buffer
    }
}
