use std::fmt;

use glam::DVec3;

use crate::geo::GeoSample;
use crate::mesh::TriangleId;
use crate::renderer::frame::RenderedFrame;
use crate::renderer::raster::{PickProbe, Rasterizer};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickResult {
    pub pixel: (i64, i64),
    pub triangle_id: TriangleId,
    pub weights: [f64; 3],
    pub geo: GeoSample,
}

/// Nothing was rendered under the queried pixel. An expected outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoPrimitiveAtPixel {
    pub x: i64,
    pub y: i64,
}

impl fmt::Display for NoPrimitiveAtPixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no primitive at pixel ({}, {})", self.x, self.y)
    }
}

/// Answers pixel queries against one rendered frame.
///
/// Queries address the output image. When the frame was rendered at
/// `supersample` times that size, a query reads the buffer pixel at the centre
/// of its `supersample x supersample` block.
pub struct PickResolver {
    frame: RenderedFrame,
    rasterizer: Rasterizer,
    supersample: u32,
}

impl PickResolver {
    pub fn new(frame: RenderedFrame) -> Self {
        let rasterizer = Rasterizer::new(frame.viewport());
        Self {
            frame,
            rasterizer,
            supersample: 1,
        }
    }

    pub fn with_supersample(mut self, supersample: u32) -> Self {
        self.supersample = supersample.max(1);
        self
    }

    pub fn frame(&self) -> &RenderedFrame {
        &self.frame
    }

    pub fn supersample(&self) -> u32 {
        self.supersample
    }

    fn buffer_pixel(&self, x: i64, y: i64) -> Option<(i64, i64)> {
        let s = self.supersample as i64;
        let centre = |v: i64| v.checked_mul(s)?.checked_add(s / 2);
        let (bx, by) = (centre(x)?, centre(y)?);
        self.frame.viewport().contains(bx, by).then_some((bx, by))
    }

    /// Output pixel a model-space point appears under.
    pub fn locate(&self, point: DVec3) -> Option<(u32, u32)> {
        let (bx, by) = self.frame.locate(point)?;
        Some((bx / self.supersample, by / self.supersample))
    }

    /// Resolve a pixel to the triangle under it and the interpolated source
    /// location. Reads the frame only; repeated calls give identical results.
    pub fn pick(&self, x: i64, y: i64) -> Result<PickResult, NoPrimitiveAtPixel> {
        let miss = NoPrimitiveAtPixel { x, y };
        let (bx, by) = self.buffer_pixel(x, y).ok_or(miss)?;
        let candidates = self.frame.buffer().unique_candidates_at(bx, by);
        if candidates.is_empty() {
            return Err(miss);
        }

        let projected = self.frame.projected();
        let subset = candidates.iter().filter_map(|&id| projected.get(id));
        let mut probe = PickProbe::new(bx as u32, by as u32);
        self.rasterizer.rasterize(subset, &mut probe);
        let hit = probe.hit().ok_or(miss)?;

        let mesh = self.frame.mesh();
        let triangle = mesh.triangle(hit.triangle).ok_or(miss)?;
        let weights = hit.weights.to_array();
        let geo = GeoSample::interpolate(mesh.provenance(triangle), weights);

        log::debug!(
            "pick ({x}, {y}) at buffer ({bx}, {by}): triangle {} of {} candidates",
            hit.triangle,
            candidates.len()
        );
        Ok(PickResult {
            pixel: (x, y),
            triangle_id: hit.triangle,
            weights,
            geo,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::mesh::{MeshBuilder, normalize};
    use crate::renderer::camera::{CameraPose, FrustumPolicy, Viewport};

    fn overhead() -> PickResolver {
        overhead_at(1)
    }

    fn overhead_at(supersample: u32) -> PickResolver {
        let samples = (0..4).flat_map(|r| {
            (0..4).map(move |c| {
                GeoSample::new(
                    43.4513 + r as f64 * 0.00001,
                    -80.4960 + c as f64 * 0.00001,
                    100.0 + (r + c) as f64 * 0.1,
                )
            })
        });
        let lattice = MeshBuilder::from_samples(4, 4, samples).unwrap();
        let (mesh, _) = normalize(lattice).unwrap();
        let camera = CameraPose {
            position: DVec3::new(0.5, 2.0, 0.5),
            pitch: 90.0_f64.to_radians(),
            aspect: 1.0,
            ..Default::default()
        };
        let frame = RenderedFrame::render(
            Arc::new(mesh),
            camera,
            Viewport::new(64, 64).scaled(supersample),
            FrustumPolicy::Symmetric,
        );
        PickResolver::new(frame).with_supersample(supersample)
    }

    #[test]
    fn hit_is_deterministic() {
        let resolver = overhead();
        let first = resolver.pick(32, 32).unwrap();
        let second = resolver.pick(32, 32).unwrap();
        assert_eq!(first, second);
        let sum: f64 = first.weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(first.weights.iter().all(|w| *w >= -1e-9));
    }

    #[test]
    fn hit_lies_inside_the_lattice() {
        let resolver = overhead();
        let hit = resolver.pick(32, 32).unwrap();
        assert!(hit.geo.latitude >= 43.4513 - 1e-12 && hit.geo.latitude <= 43.45133 + 1e-12);
        assert!(hit.geo.longitude >= -80.4960 - 1e-12 && hit.geo.longitude <= -80.49597 + 1e-12);
        assert!(hit.geo.elevation >= 100.0 - 1e-9 && hit.geo.elevation <= 100.6 + 1e-9);
    }

    #[test]
    fn empty_pixels_miss() {
        let resolver = overhead();
        assert_eq!(resolver.pick(0, 0), Err(NoPrimitiveAtPixel { x: 0, y: 0 }));
        assert_eq!(resolver.pick(-3, 500), Err(NoPrimitiveAtPixel { x: -3, y: 500 }));
    }

    #[test]
    fn narrow_pass_agrees_with_broad_owner() {
        let resolver = overhead();
        for (x, y) in [(30, 30), (32, 35), (35, 33)] {
            let owner = resolver.frame().buffer().pixel(x, y).unwrap().primitive;
            let hit = resolver.pick(x, y).unwrap();
            assert_eq!(owner, Some(hit.triangle_id));
        }
    }

    #[test]
    fn supersampled_queries_read_the_block_centre() {
        let plain = overhead();
        let fine = overhead_at(4);
        assert_eq!(fine.frame().viewport(), Viewport::new(256, 256));
        for (x, y) in [(30, 30), (32, 35), (35, 33)] {
            let a = plain.pick(x, y).unwrap();
            let b = fine.pick(x, y).unwrap();
            assert_eq!(b.pixel, (x, y));
            assert!((a.geo.latitude - b.geo.latitude).abs() < 0.00001);
            assert!((a.geo.longitude - b.geo.longitude).abs() < 0.00001);
        }
        assert_eq!(fine.pick(64, 0), Err(NoPrimitiveAtPixel { x: 64, y: 0 }));
        assert!(fine.pick(i64::MAX, 3).is_err());
    }

    #[test]
    fn located_vertex_picks_back_to_itself() {
        for supersample in [1, 4] {
            let resolver = overhead_at(supersample);
            let vertex = resolver.frame().mesh().vertices[5];
            let (x, y) = resolver.locate(vertex.position).unwrap();
            let hit = resolver.pick(x as i64, y as i64).unwrap();
            assert!((hit.geo.latitude - vertex.geo.latitude).abs() <= 0.00001);
            assert!((hit.geo.longitude - vertex.geo.longitude).abs() <= 0.00001);
        }
        assert!(overhead().locate(DVec3::new(0.5, 3.0, 0.5)).is_none());
    }
}
