//! CPU triangle fill shared by the broad render pass and the narrow pick pass.
//!
//! Both passes walk the same edge-function loop; they differ only in the
//! [`RasterTarget`] that receives fragments and in the pixel window it asks for.

use glam::{DVec2, DVec3};

use crate::mesh::TriangleId;
use crate::renderer::camera::Viewport;
use crate::renderer::frame::ProjectedTriangle;

const EDGE_EPSILON: f64 = 1e-12;
const AREA_EPSILON: f64 = 1e-12;
const NO_CANDIDATE: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pixel {
    pub depth: f64,
    pub primitive: Option<TriangleId>,
}

impl Default for Pixel {
    fn default() -> Self {
        Self {
            depth: f64::INFINITY,
            primitive: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub x: u32,
    pub y: u32,
    pub triangle: TriangleId,
    pub depth: f64,
    /// Perspective-correct barycentric weights of the pixel centre.
    pub weights: DVec3,
}

/// Half-open pixel window `[x0, x1) x [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

impl PixelRect {
    pub fn full(viewport: Viewport) -> Self {
        Self {
            x0: 0,
            y0: 0,
            x1: viewport.width as i64,
            y1: viewport.height as i64,
        }
    }

    pub fn single(x: u32, y: u32) -> Self {
        Self {
            x0: x as i64,
            y0: y as i64,
            x1: x as i64 + 1,
            y1: y as i64 + 1,
        }
    }
}

pub trait RasterTarget {
    fn window(&self) -> PixelRect;
    fn fragment(&mut self, fragment: Fragment);
}

#[derive(Debug, Clone, Copy)]
struct CandidateNode {
    triangle: TriangleId,
    next: u32,
}

/// Depth-tested primitive-identity buffer plus, per pixel, every triangle
/// that touched it in arrival order.
///
/// Candidate lists share one arena: each pixel holds the head of a list that
/// is prepended to, so a supersampled buffer costs four bytes per empty pixel.
pub struct RasterBuffer {
    viewport: Viewport,
    pixels: Vec<Pixel>,
    heads: Vec<u32>,
    nodes: Vec<CandidateNode>,
}

impl RasterBuffer {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            pixels: vec![Pixel::default(); viewport.pixel_count()],
            heads: vec![NO_CANDIDATE; viewport.pixel_count()],
            nodes: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(Pixel::default());
        self.heads.fill(NO_CANDIDATE);
        self.nodes.clear();
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        self.viewport
            .contains(x, y)
            .then(|| y as usize * self.viewport.width as usize + x as usize)
    }

    pub fn pixel(&self, x: i64, y: i64) -> Option<&Pixel> {
        self.index(x, y).map(|i| &self.pixels[i])
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn candidates_at(&self, x: i64, y: i64) -> Vec<TriangleId> {
        let mut out = Vec::new();
        let mut next = self.index(x, y).map_or(NO_CANDIDATE, |i| self.heads[i]);
        while next != NO_CANDIDATE {
            let node = self.nodes[next as usize];
            out.push(node.triangle);
            next = node.next;
        }
        out.reverse();
        out
    }

    /// Candidates at a pixel with duplicates removed, first occurrence kept.
    pub fn unique_candidates_at(&self, x: i64, y: i64) -> Vec<TriangleId> {
        let mut out: Vec<TriangleId> = Vec::new();
        for id in self.candidates_at(x, y) {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }

    pub fn covered_pixels(&self) -> usize {
        self.pixels.iter().filter(|p| p.primitive.is_some()).count()
    }
}

impl RasterTarget for RasterBuffer {
    fn window(&self) -> PixelRect {
        PixelRect::full(self.viewport)
    }

    fn fragment(&mut self, f: Fragment) {
        let i = f.y as usize * self.viewport.width as usize + f.x as usize;
        self.nodes.push(CandidateNode {
            triangle: f.triangle,
            next: self.heads[i],
        });
        self.heads[i] = (self.nodes.len() - 1) as u32;
        let pixel = &mut self.pixels[i];
        if f.depth < pixel.depth {
            pixel.depth = f.depth;
            pixel.primitive = Some(f.triangle);
        }
    }
}

/// One-pixel scratch target for the narrow pass.
pub struct PickProbe {
    x: u32,
    y: u32,
    nearest: Option<Fragment>,
}

impl PickProbe {
    pub fn new(x: u32, y: u32) -> Self {
        Self {
            x,
            y,
            nearest: None,
        }
    }

    pub fn hit(&self) -> Option<Fragment> {
        self.nearest
    }
}

impl RasterTarget for PickProbe {
    fn window(&self) -> PixelRect {
        PixelRect::single(self.x, self.y)
    }

    fn fragment(&mut self, f: Fragment) {
        if self.nearest.is_none_or(|n| f.depth < n.depth) {
            self.nearest = Some(f);
        }
    }
}

pub struct Rasterizer {
    viewport: Viewport,
}

impl Rasterizer {
    pub fn new(viewport: Viewport) -> Self {
        Self { viewport }
    }

    pub fn rasterize<'a, I, T>(&self, triangles: I, target: &mut T)
    where
        I: IntoIterator<Item = &'a ProjectedTriangle>,
        T: RasterTarget + ?Sized,
    {
        let window = target.window();
        let full = PixelRect::full(self.viewport);
        let window = PixelRect {
            x0: window.x0.max(full.x0),
            y0: window.y0.max(full.y0),
            x1: window.x1.min(full.x1),
            y1: window.y1.min(full.y1),
        };
        for t in triangles {
            fill(t, window, &mut *target);
        }
    }
}

fn edge(a: DVec2, b: DVec2, p: DVec2) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn fill<T: RasterTarget + ?Sized>(t: &ProjectedTriangle, window: PixelRect, target: &mut T) {
    let [a, b, c] = t.screen;
    let area = edge(a, b, c);
    if area.abs() < AREA_EPSILON {
        return;
    }

    let min = a.min(b).min(c);
    let max = a.max(b).max(c);
    let x0 = (min.x.floor() as i64 - 1).max(window.x0);
    let y0 = (min.y.floor() as i64 - 1).max(window.y0);
    let x1 = (max.x.ceil() as i64 + 1).min(window.x1);
    let y1 = (max.y.ceil() as i64 + 1).min(window.y1);

    for py in y0..y1 {
        for px in x0..x1 {
            let p = DVec2::new(px as f64 + 0.5, py as f64 + 0.5);
            // dividing by the signed area makes either winding positive inside
            let w = DVec3::new(edge(b, c, p), edge(c, a, p), edge(a, b, p)) / area;
            if w.min_element() < -EDGE_EPSILON {
                continue;
            }

            let depth = w.dot(DVec3::from(t.depth));
            let perspective = w * DVec3::from(t.inv_w);
            let weights = perspective / perspective.element_sum();

            target.fragment(Fragment {
                x: px as u32,
                y: py as u32,
                triangle: t.id,
                depth,
                weights,
            });
        }
    }
}
