//! Geodetic to local Cartesian conversion and unit-scale normalization.
//!
//! The local frame is right-handed: X points north, Y up, Z east, all in
//! meters from the south-west corner of the lattice at its lowest elevation.
//! Dividing by the largest absolute component brings the model into [-1, 1]
//! so camera math does not mix meter-sized and unit-sized magnitudes.

use glam::DVec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{GeodesicError, NormalizeError};
use crate::geo::GeoSample;
use crate::geo::geodesic::{easting, northing};
use crate::mesh::types::{LatticeMesh, TerrainMesh, Triangle, Vertex, face_normal};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationConstants {
    pub reference_latitude: f64,
    pub reference_longitude: f64,
    pub min_elevation: f64,
    pub max_extent: f64,
    pub extent_x: f64,
    pub extent_y: f64,
    pub extent_z: f64,
}

impl NormalizationConstants {
    pub fn local_meters(&self, geo: &GeoSample) -> Result<DVec3, GeodesicError> {
        local_meters(
            self.reference_latitude,
            self.reference_longitude,
            self.min_elevation,
            geo,
        )
    }

    /// Run an arbitrary geographic point (a camera, a marker) through the same
    /// pipeline the mesh vertices went through.
    pub fn to_model(&self, geo: &GeoSample) -> Result<DVec3, GeodesicError> {
        Ok(self.local_meters(geo)? / self.max_extent)
    }

    pub fn denormalize(&self, model: DVec3) -> DVec3 {
        model * self.max_extent
    }
}

fn local_meters(
    ref_lat: f64,
    ref_lng: f64,
    min_elevation: f64,
    geo: &GeoSample,
) -> Result<DVec3, GeodesicError> {
    Ok(DVec3::new(
        northing(ref_lat, ref_lng, geo.latitude)?,
        geo.elevation - min_elevation,
        easting(ref_lat, ref_lng, geo.longitude)?,
    ))
}

/// Consumes the raw lattice, so a mesh can only ever be normalized once.
pub fn normalize(
    lattice: LatticeMesh,
) -> Result<(TerrainMesh, NormalizationConstants), NormalizeError> {
    let LatticeMesh {
        width,
        height,
        samples,
        triangles,
    } = lattice;

    let (ref_lat, ref_lng, min_elevation) = samples.iter().fold(
        (f64::INFINITY, f64::INFINITY, f64::INFINITY),
        |(lat, lng, elev), s| {
            (
                lat.min(s.latitude),
                lng.min(s.longitude),
                elev.min(s.elevation),
            )
        },
    );

    let local = samples
        .par_iter()
        .map(|s| local_meters(ref_lat, ref_lng, min_elevation, s))
        .collect::<Result<Vec<_>, _>>()?;

    let extent = local
        .iter()
        .fold(DVec3::ZERO, |acc, p| acc.max(p.abs()));
    let max_extent = extent.max_element();
    if !max_extent.is_finite() || max_extent <= 0.0 {
        return Err(NormalizeError::DegenerateExtent);
    }

    let vertices: Vec<Vertex> = local
        .into_iter()
        .zip(samples)
        .map(|(p, geo)| Vertex {
            position: p / max_extent,
            geo,
        })
        .collect();

    // A heightfield's footprint keeps one orientation across the whole
    // lattice, so the first triangle decides the winding for all of them.
    let flip = triangles.first().is_some_and(|t| {
        face_normal((*t).map(|i| vertices[i as usize].position)).y < 0.0
    });

    let triangles = triangles
        .into_iter()
        .enumerate()
        .map(|(id, t)| {
            let indices = if flip { [t[0], t[2], t[1]] } else { t };
            Triangle {
                id: id as u32,
                indices,
                normal: face_normal(indices.map(|i| vertices[i as usize].position)),
            }
        })
        .collect();

    let constants = NormalizationConstants {
        reference_latitude: ref_lat,
        reference_longitude: ref_lng,
        min_elevation,
        max_extent,
        extent_x: extent.x,
        extent_y: extent.y,
        extent_z: extent.z,
    };
    log::debug!(
        "normalized {} vertices, max extent {:.3} m",
        vertices.len(),
        max_extent
    );

    Ok((
        TerrainMesh {
            width,
            height,
            vertices,
            triangles,
        },
        constants,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MeshBuilder;

    fn hilly(width: usize, height: usize, lat_step: f64, lng_step: f64) -> LatticeMesh {
        let samples = (0..height).flat_map(|r| {
            (0..width).map(move |c| {
                GeoSample::new(
                    43.4513 + r as f64 * lat_step,
                    -80.4960 + c as f64 * lng_step,
                    330.0 + ((r * 7 + c * 3) % 5) as f64 * 0.4,
                )
            })
        });
        MeshBuilder::from_samples(width, height, samples).unwrap()
    }

    #[test]
    fn unit_scale_and_ground_at_zero() {
        let (mesh, constants) = normalize(hilly(5, 4, 0.00001, 0.00001)).unwrap();
        let mut max = 0.0f64;
        let mut min_y = f64::INFINITY;
        for v in &mesh.vertices {
            max = max.max(v.position.abs().max_element());
            min_y = min_y.min(v.position.y);
        }
        assert!((max - 1.0).abs() < 1e-12);
        assert!(min_y.abs() < 1e-12);
        assert_eq!(constants.min_elevation, 330.0);
        assert_eq!(constants.reference_latitude, 43.4513);
        assert_eq!(constants.reference_longitude, -80.4960);
    }

    #[test]
    fn denormalize_round_trips() {
        let (mesh, constants) = normalize(hilly(4, 4, 0.00002, 0.00001)).unwrap();
        for v in &mesh.vertices {
            let meters = constants.local_meters(&v.geo).unwrap();
            let back = constants.denormalize(v.position);
            assert!((meters - back).abs().max_element() < 1e-9);
        }
    }

    #[test]
    fn to_model_matches_vertices() {
        let (mesh, constants) = normalize(hilly(3, 3, 0.00001, 0.00001)).unwrap();
        let v = mesh.vertices[4];
        let p = constants.to_model(&v.geo).unwrap();
        assert!((p - v.position).length() < 1e-12);
    }

    #[test]
    fn normals_point_up_for_any_scan_direction() {
        for (lat_step, lng_step) in [
            (0.00001, 0.00001),
            (-0.00001, 0.00001),
            (0.00001, -0.00001),
            (-0.00001, -0.00001),
        ] {
            let (mesh, _) = normalize(hilly(4, 3, lat_step, lng_step)).unwrap();
            for t in &mesh.triangles {
                assert!(t.normal.y > 0.0, "{lat_step} {lng_step}: {:?}", t.normal);
            }
        }
    }

    #[test]
    fn ids_are_dense() {
        let (mesh, _) = normalize(hilly(3, 5, 0.00001, 0.00001)).unwrap();
        for (i, t) in mesh.triangles.iter().enumerate() {
            assert_eq!(t.id as usize, i);
        }
    }
}
