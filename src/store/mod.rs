//! Row-structured JSON tables handed between the build and render stages.

use std::fs;
use std::path::{Path, PathBuf};

use glam::DVec3;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::geo::GeoSample;
use crate::mesh::{NormalizationConstants, TerrainMesh, Triangle, Vertex, face_normal};

pub const VERTICES_FILE: &str = "vertices.json";
pub const TRIANGLES_FILE: &str = "triangles.json";
pub const PROPERTIES_FILE: &str = "properties.json";
pub const SAMPLES_FILE: &str = "samples.json";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexRow {
    pub index: u32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriangleRow {
    pub id: u32,
    pub v1: u32,
    pub v2: u32,
    pub v3: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    pub width: usize,
    pub height: usize,
    pub constants: NormalizationConstants,
}

pub struct TableStore {
    dir: PathBuf,
}

impl TableStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn has_mesh(&self) -> bool {
        [VERTICES_FILE, TRIANGLES_FILE, PROPERTIES_FILE]
            .iter()
            .all(|f| self.dir.join(f).is_file())
    }

    pub fn save_mesh(
        &self,
        mesh: &TerrainMesh,
        constants: &NormalizationConstants,
    ) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;

        let vertices: Vec<VertexRow> = mesh
            .vertices
            .iter()
            .enumerate()
            .map(|(i, v)| VertexRow {
                index: i as u32,
                x: v.position.x,
                y: v.position.y,
                z: v.position.z,
                latitude: v.geo.latitude,
                longitude: v.geo.longitude,
                elevation: v.geo.elevation,
            })
            .collect();
        let triangles: Vec<TriangleRow> = mesh
            .triangles
            .iter()
            .map(|t| TriangleRow {
                id: t.id,
                v1: t.indices[0],
                v2: t.indices[1],
                v3: t.indices[2],
            })
            .collect();
        let properties = Properties {
            width: mesh.width,
            height: mesh.height,
            constants: *constants,
        };

        self.write(VERTICES_FILE, &vertices)?;
        self.write(TRIANGLES_FILE, &triangles)?;
        self.write(PROPERTIES_FILE, &properties)?;
        log::info!(
            "saved {} vertices and {} triangles to {}",
            vertices.len(),
            triangles.len(),
            self.dir.display()
        );
        Ok(())
    }

    pub fn load_mesh(&self) -> Result<(TerrainMesh, NormalizationConstants), StoreError> {
        let rows: Vec<VertexRow> = self.read(VERTICES_FILE)?;
        let triangle_rows: Vec<TriangleRow> = self.read(TRIANGLES_FILE)?;
        let properties: Properties = self.read(PROPERTIES_FILE)?;

        let Properties {
            width,
            height,
            constants,
        } = properties;
        if rows.len() != width * height {
            return Err(StoreError::Inconsistent(format!(
                "{} vertex rows for a {width}x{height} lattice",
                rows.len()
            )));
        }
        let expected_triangles = 2 * width.saturating_sub(1) * height.saturating_sub(1);
        if triangle_rows.len() != expected_triangles {
            return Err(StoreError::Inconsistent(format!(
                "{} triangle rows, expected {expected_triangles}",
                triangle_rows.len()
            )));
        }

        let mut vertices = Vec::with_capacity(rows.len());
        for (i, row) in rows.into_iter().enumerate() {
            if row.index as usize != i {
                return Err(StoreError::Inconsistent(format!(
                    "vertex row {i} carries index {}",
                    row.index
                )));
            }
            vertices.push(Vertex {
                position: DVec3::new(row.x, row.y, row.z),
                geo: GeoSample::new(row.latitude, row.longitude, row.elevation),
            });
        }

        let mut triangles = Vec::with_capacity(triangle_rows.len());
        for (i, row) in triangle_rows.into_iter().enumerate() {
            if row.id as usize != i {
                return Err(StoreError::Inconsistent(format!(
                    "triangle row {i} carries id {}",
                    row.id
                )));
            }
            let indices = [row.v1, row.v2, row.v3];
            if let Some(bad) = indices.iter().find(|&&v| v as usize >= vertices.len()) {
                return Err(StoreError::Inconsistent(format!(
                    "triangle {} references missing vertex {bad}",
                    row.id
                )));
            }
            triangles.push(Triangle {
                id: row.id,
                indices,
                normal: face_normal(indices.map(|v| vertices[v as usize].position)),
            });
        }

        log::info!(
            "loaded {} vertices and {} triangles from {}",
            vertices.len(),
            triangles.len(),
            self.dir.display()
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

    pub fn has_samples(&self) -> bool {
        self.dir.join(SAMPLES_FILE).is_file()
    }

    pub fn save_samples(&self, samples: &[GeoSample]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        self.write(SAMPLES_FILE, samples)
    }

    pub fn load_samples(&self) -> Result<Vec<GeoSample>, StoreError> {
        self.read(SAMPLES_FILE)
    }

    fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(value)?;
        fs::write(self.dir.join(name), json)?;
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<T, StoreError> {
        let content = fs::read_to_string(self.dir.join(name))?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{MeshBuilder, normalize};

    fn scratch(name: &str) -> TableStore {
        let dir = std::env::temp_dir().join(format!(
            "terrain-pick-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        TableStore::new(dir)
    }

    fn mesh() -> (TerrainMesh, NormalizationConstants, Vec<GeoSample>) {
        let samples: Vec<GeoSample> = (0..3)
            .flat_map(|r| {
                (0..4).map(move |c| {
                    GeoSample::new(
                        43.45135 + r as f64 * 0.0000123,
                        -80.494 - c as f64 * 0.0000171,
                        331.25 + (r * c) as f64 * 0.37,
                    )
                })
            })
            .collect();
        let lattice = MeshBuilder::from_samples(4, 3, samples.iter().copied()).unwrap();
        let (mesh, constants) = normalize(lattice).unwrap();
        (mesh, constants, samples)
    }

    #[test]
    fn mesh_tables_round_trip_exactly() {
        let store = scratch("round-trip");
        let (mesh, constants, samples) = mesh();
        assert!(!store.has_mesh());
        store.save_mesh(&mesh, &constants).unwrap();
        store.save_samples(&samples).unwrap();
        assert!(store.has_mesh());

        let (loaded, loaded_constants) = store.load_mesh().unwrap();
        assert_eq!(loaded, mesh);
        assert_eq!(loaded_constants, constants);
        assert_eq!(store.load_samples().unwrap(), samples);
        fs::remove_dir_all(store.dir()).unwrap();
    }

    #[test]
    fn rejects_dangling_indices() {
        let store = scratch("dangling");
        let (mesh, constants, _) = mesh();
        store.save_mesh(&mesh, &constants).unwrap();

        let mut rows: Vec<TriangleRow> = store.read(TRIANGLES_FILE).unwrap();
        rows[3].v2 = 99;
        store.write(TRIANGLES_FILE, &rows).unwrap();
        assert!(matches!(store.load_mesh(), Err(StoreError::Inconsistent(_))));

        rows[3].v2 = 1;
        rows[5].id = 0;
        store.write(TRIANGLES_FILE, &rows).unwrap();
        assert!(matches!(store.load_mesh(), Err(StoreError::Inconsistent(_))));
        fs::remove_dir_all(store.dir()).unwrap();
    }

    #[test]
    fn missing_tables_are_io_errors() {
        let store = scratch("missing");
        assert!(matches!(store.load_mesh(), Err(StoreError::Io(_))));
    }
}
