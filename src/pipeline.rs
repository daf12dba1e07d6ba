//! Stage wiring shared by the CLI and the integration tests.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::geo::{ElevationSource, GeoSample, ReplaySource, sample_lattice};
use crate::mesh::{MeshBuilder, NormalizationConstants, TerrainMesh, normalize};
use crate::renderer::{PickResolver, RenderedFrame};
use crate::store::TableStore;

pub struct BuiltMesh {
    pub samples: Vec<GeoSample>,
    pub mesh: TerrainMesh,
    pub constants: NormalizationConstants,
}

/// Sample the configured lattice, triangulate it as samples arrive, then
/// normalize. Any source failure aborts with no mesh.
pub fn build_mesh<S: ElevationSource + ?Sized>(
    config: &Config,
    source: &mut S,
    show_progress: bool,
) -> Result<BuiltMesh> {
    let start = Instant::now();
    let spec = config.lattice.grid_spec()?;
    let mut builder = MeshBuilder::for_grid(&spec)?;
    let samples = sample_lattice(&spec, source, &mut builder, show_progress)?;
    let (mesh, constants) = normalize(builder.finish()?)?;

    log::info!(
        "built {}x{} mesh: {} triangles, extent {:.1} m, in {:?}",
        mesh.width,
        mesh.height,
        mesh.triangle_count(),
        constants.max_extent,
        start.elapsed()
    );
    Ok(BuiltMesh {
        samples,
        mesh,
        constants,
    })
}

/// Build from the configured source (or a recorded sample table) and persist
/// every table.
pub fn build_and_store(config: &Config, store: &TableStore, replay: bool) -> Result<BuiltMesh> {
    let built = if replay {
        let mut source = ReplaySource::new(recorded_samples(config, store)?);
        build_mesh(config, &mut source, config.progress)?
    } else {
        let mut source = config.terrain.clone();
        build_mesh(config, &mut source, config.progress)?
    };
    store.save_samples(&built.samples)?;
    store.save_mesh(&built.mesh, &built.constants)?;
    Ok(built)
}

/// The recorded sample table, checked to cover exactly the configured lattice.
fn recorded_samples(config: &Config, store: &TableStore) -> Result<Vec<GeoSample>> {
    if !store.has_samples() {
        return Err(StoreError::Inconsistent(format!(
            "no recorded samples in {}",
            store.dir().display()
        ))
        .into());
    }
    let samples = store.load_samples()?;
    let expected = config.lattice.grid_spec()?.len();
    if samples.len() != expected {
        return Err(StoreError::Inconsistent(format!(
            "{} recorded samples for a lattice of {expected}",
            samples.len()
        ))
        .into());
    }
    Ok(samples)
}

pub fn load_or_build(
    config: &Config,
    store: &TableStore,
) -> Result<(TerrainMesh, NormalizationConstants)> {
    if store.has_mesh() {
        return Ok(store.load_mesh()?);
    }
    log::info!("no tables in {}, building first", store.dir().display());
    let built = build_and_store(config, store, false)?;
    Ok((built.mesh, built.constants))
}

pub fn render_frame(
    config: &Config,
    mesh: TerrainMesh,
    constants: &NormalizationConstants,
) -> Result<RenderedFrame> {
    let viewport = config.render.raster_viewport();
    let camera = config.camera.pose(constants, viewport)?;
    log::debug!(
        "camera at {:?}, front {:?}",
        camera.position,
        camera.front()
    );
    Ok(RenderedFrame::render(
        Arc::new(mesh),
        camera,
        viewport,
        config.render.frustum,
    ))
}

pub fn resolver(config: &Config, store: &TableStore) -> Result<PickResolver> {
    let (mesh, constants) = load_or_build(config, store)?;
    resolver_for(config, mesh, &constants)
}

fn resolver_for(
    config: &Config,
    mesh: TerrainMesh,
    constants: &NormalizationConstants,
) -> Result<PickResolver> {
    let frame = render_frame(config, mesh, constants)?;
    Ok(PickResolver::new(frame).with_supersample(config.render.supersample))
}

/// Output pixel a geographic point appears under. Elevation defaults to the
/// lowest terrain point.
pub fn locate(
    config: &Config,
    store: &TableStore,
    latitude: f64,
    longitude: f64,
    elevation: Option<f64>,
) -> Result<Option<(u32, u32)>> {
    let (mesh, constants) = load_or_build(config, store)?;
    let elevation = elevation.unwrap_or(constants.min_elevation);
    let point = constants.to_model(&GeoSample::new(latitude, longitude, elevation))?;
    Ok(resolver_for(config, mesh, &constants)?.locate(point))
}
