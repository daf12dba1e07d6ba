use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, GeodesicError};
use crate::geo::{GeoSample, GridSpec, SyntheticSource, find_preset};
use crate::mesh::NormalizationConstants;
use crate::renderer::{CameraPose, FrustumPolicy, Palette, Viewport};
use crate::service::ServiceOptions;

pub const MAX_SUPERSAMPLE: u32 = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeConfig {
    /// Named entry of the preset table; overrides the explicit bounds.
    pub preset: Option<String>,
    pub lat_start: f64,
    pub lng_start: f64,
    pub lat_end: f64,
    pub lng_end: f64,
    pub rows: usize,
    pub cols: usize,
    /// Sample spacing in degrees; when set, replaces `rows` and `cols`.
    pub resolution: Option<f64>,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            preset: None,
            lat_start: 43.45135,
            lng_start: -80.49400,
            lat_end: 43.45245,
            lng_end: -80.49600,
            rows: 24,
            cols: 24,
            resolution: None,
        }
    }
}

impl LatticeConfig {
    pub fn grid_spec(&self) -> Result<GridSpec, ConfigError> {
        let spec = match &self.preset {
            Some(name) => {
                let preset = find_preset(name).ok_or_else(|| {
                    ConfigError::Invalid(format!("unknown lattice preset {name:?}"))
                })?;
                GridSpec::new(preset.start, preset.end, preset.rows, preset.cols)
            }
            None => {
                let start = (self.lat_start, self.lng_start);
                let end = (self.lat_end, self.lng_end);
                match self.resolution {
                    Some(step) if !(step > 0.0) => {
                        return Err(ConfigError::Invalid(format!(
                            "resolution must be positive, got {step}"
                        )));
                    }
                    Some(step) => GridSpec::from_resolution(start, end, step, step),
                    None => GridSpec::new(start, end, self.rows, self.cols),
                }
            }
        };
        spec.map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above the lowest point of the terrain.
    pub height_above_ground: f64,
    pub yaw_deg: f64,
    pub pitch_deg: f64,
    pub fov_y_deg: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            latitude: 43.4515683,
            longitude: -80.4959493,
            height_above_ground: 30.0,
            yaw_deg: 0.0,
            pitch_deg: 20.0,
            fov_y_deg: 86.0,
            near: 0.001,
            far: 10.0,
        }
    }
}

impl CameraConfig {
    /// Places the camera in the model frame described by `constants`.
    pub fn pose(
        &self,
        constants: &NormalizationConstants,
        viewport: Viewport,
    ) -> Result<CameraPose, GeodesicError> {
        let eye = GeoSample::new(
            self.latitude,
            self.longitude,
            constants.min_elevation + self.height_above_ground,
        );
        Ok(CameraPose {
            position: constants.to_model(&eye)?,
            yaw: self.yaw_deg.to_radians(),
            pitch: self.pitch_deg.to_radians(),
            fov_y: self.fov_y_deg.to_radians(),
            aspect: viewport.aspect(),
            near: self.near,
            far: self.far,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub frustum: FrustumPolicy,
    pub fill: String,
    pub background: String,
    pub shade: bool,
    /// Render at this many buffer pixels per output pixel along each axis.
    pub supersample: u32,
    pub output: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            frustum: FrustumPolicy::default(),
            fill: "#ffb5b5".to_string(),
            background: "transparent".to_string(),
            shade: false,
            supersample: 4,
            output: PathBuf::from("render.png"),
        }
    }
}

impl RenderConfig {
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height)
    }

    /// Size of the broad-pass buffer.
    pub fn raster_viewport(&self) -> Viewport {
        self.viewport().scaled(self.supersample)
    }

    pub fn palette(&self) -> Result<Palette, ConfigError> {
        Palette::from_hex(&self.fill, &self.background, self.shade)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub bind: String,
    pub delivery_timeout_ms: u64,
    pub outbound_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            delivery_timeout_ms: 1000,
            outbound_capacity: 8,
        }
    }
}

impl ServiceConfig {
    pub fn options(&self) -> ServiceOptions {
        ServiceOptions {
            delivery_timeout: Duration::from_millis(self.delivery_timeout_ms),
            outbound_capacity: self.outbound_capacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub lattice: LatticeConfig,
    pub camera: CameraConfig,
    pub render: RenderConfig,
    pub service: ServiceConfig,
    pub terrain: SyntheticSource,
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            lattice: LatticeConfig::default(),
            camera: CameraConfig::default(),
            render: RenderConfig::default(),
            service: ServiceConfig::default(),
            terrain: SyntheticSource::default(),
            progress: true,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                log::info!("loading config from {}", p.display());
                Self::from_file(p)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.render.width == 0 || self.render.height == 0 {
            return invalid(format!(
                "viewport must be non-empty, got {}x{}",
                self.render.width, self.render.height
            ));
        }
        if !(1..=MAX_SUPERSAMPLE).contains(&self.render.supersample) {
            return invalid(format!(
                "supersample must lie in 1..={MAX_SUPERSAMPLE}, got {}",
                self.render.supersample
            ));
        }
        let fov = self.camera.fov_y_deg;
        if !(fov > 0.0 && fov < 180.0) {
            return invalid(format!("fov_y_deg must lie in (0, 180), got {fov}"));
        }
        if !(self.camera.near > 0.0 && self.camera.near < self.camera.far) {
            return invalid(format!(
                "need 0 < near < far, got near {} far {}",
                self.camera.near, self.camera.far
            ));
        }
        if self.service.outbound_capacity == 0 {
            return invalid("outbound_capacity must be at least 1".to_string());
        }
        self.lattice.grid_spec()?;
        self.render.palette()?;
        Ok(())
    }
}
