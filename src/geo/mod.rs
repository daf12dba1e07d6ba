pub mod geodesic;
pub mod presets;
pub mod sample;
pub mod source;

pub use presets::{LATTICE_PRESETS, LatticePreset, find_preset};
pub use sample::{GeoSample, GridSpec, POSITION_TOLERANCE};
pub use source::{ElevationSource, FnSource, Hill, ReplaySource, SyntheticSource, sample_lattice};
