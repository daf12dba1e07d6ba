use std::collections::VecDeque;

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, SourceError};
use crate::geo::sample::{GeoSample, GridSpec};
use crate::mesh::MeshBuilder;

pub trait ElevationSource {
    fn elevation_at(&mut self, latitude: f64, longitude: f64) -> Result<GeoSample, SourceError>;
}

pub struct FnSource<F>(pub F);

impl<F> ElevationSource for FnSource<F>
where
    F: FnMut(f64, f64) -> Result<GeoSample, SourceError>,
{
    fn elevation_at(&mut self, latitude: f64, longitude: f64) -> Result<GeoSample, SourceError> {
        (self.0)(latitude, longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hill {
    pub latitude: f64,
    pub longitude: f64,
    pub height: f64,
    /// Gaussian radius in degrees.
    pub radius: f64,
}

/// Deterministic stand-in for the remote elevation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSource {
    pub base_elevation: f64,
    pub hills: Vec<Hill>,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self {
            base_elevation: 330.0,
            hills: vec![Hill {
                latitude: 43.4519,
                longitude: -80.4950,
                height: 4.0,
                radius: 0.0003,
            }],
        }
    }
}

impl SyntheticSource {
    pub fn flat(elevation: f64) -> Self {
        Self {
            base_elevation: elevation,
            hills: Vec::new(),
        }
    }

    pub fn height(&self, latitude: f64, longitude: f64) -> f64 {
        self.hills.iter().fold(self.base_elevation, |acc, h| {
            let d2 = (latitude - h.latitude).powi(2) + (longitude - h.longitude).powi(2);
            acc + h.height * (-d2 / (2.0 * h.radius * h.radius)).exp()
        })
    }
}

impl ElevationSource for SyntheticSource {
    fn elevation_at(&mut self, latitude: f64, longitude: f64) -> Result<GeoSample, SourceError> {
        Ok(GeoSample::new(
            latitude,
            longitude,
            self.height(latitude, longitude),
        ))
    }
}

/// Replays samples recorded by an earlier build, in their original order.
/// Each recorded sample must sit where the lattice asks for it.
pub struct ReplaySource {
    samples: VecDeque<GeoSample>,
}

impl ReplaySource {
    pub fn new(samples: Vec<GeoSample>) -> Self {
        Self {
            samples: samples.into(),
        }
    }
}

impl ElevationSource for ReplaySource {
    fn elevation_at(&mut self, latitude: f64, longitude: f64) -> Result<GeoSample, SourceError> {
        let sample = self
            .samples
            .pop_front()
            .ok_or_else(|| SourceError::new(latitude, longitude, "replay table exhausted"))?;
        if !sample.sits_at(latitude, longitude) {
            return Err(SourceError::new(
                latitude,
                longitude,
                format!(
                    "replay table holds ({}, {}) at this position",
                    sample.latitude, sample.longitude
                ),
            ));
        }
        Ok(sample)
    }
}

/// Query every lattice position in scan order and feed the builder as samples
/// arrive. The first collaborator failure aborts the whole build.
pub fn sample_lattice<S: ElevationSource + ?Sized>(
    spec: &GridSpec,
    source: &mut S,
    builder: &mut MeshBuilder,
    show_progress: bool,
) -> Result<Vec<GeoSample>, MeshError> {
    let progress = if show_progress {
        let pb = ProgressBar::new(spec.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} samples {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut recorded = Vec::with_capacity(spec.len());
    for (latitude, longitude) in spec.positions() {
        let sample = match source.elevation_at(latitude, longitude) {
            Ok(s) => s,
            Err(e) => {
                progress.abandon_with_message("aborted");
                return Err(e.into());
            }
        };
        builder.push(sample)?;
        recorded.push(sample);
        progress.inc(1);
    }

    progress.finish_with_message("downloaded");
    log::info!(
        "sampled {} positions, {} triangles emitted",
        recorded.len(),
        builder.triangle_count()
    );
    Ok(recorded)
}
