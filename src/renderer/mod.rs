pub mod artifact;
pub mod camera;
pub mod frame;
pub mod pick;
pub mod raster;

pub use artifact::{Palette, render_artifact, render_image, save_png};
pub use camera::{CameraPose, ClipVertex, FrustumPolicy, Projector, Viewport};
pub use frame::{ProjectedMesh, ProjectedTriangle, RenderedFrame};
pub use pick::{NoPrimitiveAtPixel, PickResolver, PickResult};
pub use raster::{Fragment, PickProbe, Pixel, PixelRect, RasterBuffer, RasterTarget, Rasterizer};
