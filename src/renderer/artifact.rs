use std::path::Path;

use glam::DVec3;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::error::ConfigError;
use crate::mesh::TerrainMesh;
use crate::renderer::raster::RasterBuffer;

pub const DEFAULT_FILL: Rgba<u8> = Rgba([0xff, 0xb5, 0xb5, 0xff]);
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

const LIGHT_DIR: DVec3 = DVec3::new(0.75, 0.5, 1.0);
const AMBIENT: f64 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub fill: Rgba<u8>,
    pub background: Rgba<u8>,
    /// Modulate the fill by a flat Lambert term per triangle.
    pub shade: bool,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            fill: DEFAULT_FILL,
            background: TRANSPARENT,
            shade: false,
        }
    }
}

impl Palette {
    pub fn from_hex(fill: &str, background: &str, shade: bool) -> Result<Self, ConfigError> {
        Ok(Self {
            fill: parse_hex(fill)?,
            background: parse_hex(background)?,
            shade,
        })
    }
}

/// `#rrggbb` or `#rrggbbaa`; `transparent` is accepted as a name.
pub fn parse_hex(s: &str) -> Result<Rgba<u8>, ConfigError> {
    if s.eq_ignore_ascii_case("transparent") {
        return Ok(TRANSPARENT);
    }
    let invalid = || ConfigError::Invalid(format!("bad colour {s:?}"));
    let hex = s.strip_prefix('#').ok_or_else(invalid)?;
    if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
        return Err(invalid());
    }

    let mut rgba = [0xff; 4];
    for (i, channel) in rgba.iter_mut().enumerate().take(hex.len() / 2) {
        *channel = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
    }
    Ok(Rgba(rgba))
}

fn shaded(color: Rgba<u8>, normal: DVec3) -> Rgba<u8> {
    let lambert = normal.dot(LIGHT_DIR.normalize()).max(0.0);
    let k = AMBIENT + (1.0 - AMBIENT) * lambert;
    let [r, g, b, a] = color.0;
    let scale = |c: u8| (c as f64 * k).round().clamp(0.0, 255.0) as u8;
    Rgba([scale(r), scale(g), scale(b), a])
}

/// One image pixel per buffer cell, coloured by the depth winner.
pub fn render_image(buffer: &RasterBuffer, mesh: &TerrainMesh, palette: &Palette) -> RgbaImage {
    let viewport = buffer.viewport();
    RgbaImage::from_fn(viewport.width, viewport.height, |x, y| {
        let owner = buffer
            .pixel(x as i64, y as i64)
            .and_then(|p| p.primitive)
            .and_then(|id| mesh.triangle(id));
        match owner {
            Some(t) if palette.shade => shaded(palette.fill, t.normal),
            Some(_) => palette.fill,
            None => palette.background,
        }
    })
}

/// Render a supersampled buffer and filter it down to the output size.
pub fn render_artifact(
    buffer: &RasterBuffer,
    mesh: &TerrainMesh,
    palette: &Palette,
    supersample: u32,
) -> RgbaImage {
    let full = render_image(buffer, mesh, palette);
    if supersample <= 1 {
        return full;
    }
    let width = (full.width() / supersample).max(1);
    let height = (full.height() / supersample).max(1);
    imageops::resize(&full, width, height, FilterType::Triangle)
}

pub fn save_png(img: &RgbaImage, path: &Path) -> Result<(), image::ImageError> {
    img.save_with_format(path, image::ImageFormat::Png)?;
    log::info!(
        "wrote {}x{} image to {}",
        img.width(),
        img.height(),
        path.display()
    );
    Ok(())
}
