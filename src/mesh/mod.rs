pub mod builder;
pub mod normalize;
pub mod types;

pub use builder::MeshBuilder;
pub use normalize::{NormalizationConstants, normalize};
pub use types::{LatticeMesh, TerrainMesh, Triangle, TriangleId, Vertex, face_normal};
