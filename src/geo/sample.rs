use serde::{Deserialize, Serialize};

use crate::error::MeshError;

/// Largest difference in degrees at which two positions count as the same
/// lattice point.
pub const POSITION_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoSample {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
}

impl GeoSample {
    pub fn new(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
        }
    }

    pub fn sits_at(&self, latitude: f64, longitude: f64) -> bool {
        (self.latitude - latitude).abs() <= POSITION_TOLERANCE
            && (self.longitude - longitude).abs() <= POSITION_TOLERANCE
    }

    /// Weighted blend of three samples; weights are expected to sum to one.
    pub fn interpolate(samples: [&GeoSample; 3], weights: [f64; 3]) -> Self {
        let mut out = GeoSample::default();
        for (s, w) in samples.iter().zip(weights) {
            out.latitude += s.latitude * w;
            out.longitude += s.longitude * w;
            out.elevation += s.elevation * w;
        }
        out
    }
}

/// Rectangular lattice of sample positions, scanned row-major.
/// Rows advance in latitude, columns in longitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub lat_start: f64,
    pub lng_start: f64,
    pub lat_end: f64,
    pub lng_end: f64,
    pub rows: usize,
    pub cols: usize,
}

impl GridSpec {
    pub fn new(
        start: (f64, f64),
        end: (f64, f64),
        rows: usize,
        cols: usize,
    ) -> Result<Self, MeshError> {
        if rows < 2 || cols < 2 {
            return Err(MeshError::InsufficientGrid {
                width: cols,
                height: rows,
            });
        }
        Ok(Self {
            lat_start: start.0,
            lng_start: start.1,
            lat_end: end.0,
            lng_end: end.1,
            rows,
            cols,
        })
    }

    /// Derive sample counts from a resolution in degrees. The span is divided
    /// by the step and rounded half away from zero.
    pub fn from_resolution(
        start: (f64, f64),
        end: (f64, f64),
        lat_step: f64,
        lng_step: f64,
    ) -> Result<Self, MeshError> {
        let rows = ((end.0 - start.0) / lat_step).abs().round() as usize + 1;
        let cols = ((end.1 - start.1) / lng_step).abs().round() as usize + 1;
        Self::new(start, end, rows, cols)
    }

    pub fn width(&self) -> usize {
        self.cols
    }

    pub fn height(&self) -> usize {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn lat_step(&self) -> f64 {
        (self.lat_end - self.lat_start) / (self.rows - 1) as f64
    }

    pub fn lng_step(&self) -> f64 {
        (self.lng_end - self.lng_start) / (self.cols - 1) as f64
    }

    pub fn position(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.lat_start + row as f64 * self.lat_step(),
            self.lng_start + col as f64 * self.lng_step(),
        )
    }

    pub fn positions(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        (0..self.rows).flat_map(move |r| (0..self.cols).map(move |c| self.position(r, c)))
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.lat_start + self.lat_end) * 0.5,
            (self.lng_start + self.lng_end) * 0.5,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_row_major() {
        let spec = GridSpec::new((10.0, 20.0), (10.2, 20.3), 3, 4).unwrap();
        let all: Vec<_> = spec.positions().collect();
        assert_eq!(all.len(), 12);
        assert_eq!(all[0], (10.0, 20.0));
        let (lat, lng) = all[3];
        assert!((lat - 10.0).abs() < 1e-12);
        assert!((lng - 20.3).abs() < 1e-12);
        let (lat, lng) = all[4];
        assert!((lat - 10.1).abs() < 1e-12);
        assert!((lng - 20.0).abs() < 1e-12);
    }

    #[test]
    fn resolution_rounds_span() {
        let spec =
            GridSpec::from_resolution((43.45135, -80.494), (43.45245, -80.496), 0.00001, 0.00001)
                .unwrap();
        assert_eq!(spec.rows, 111);
        assert_eq!(spec.cols, 201);
    }

    #[test]
    fn rejects_degenerate_lattice() {
        assert!(matches!(
            GridSpec::new((0.0, 0.0), (1.0, 1.0), 1, 5),
            Err(MeshError::InsufficientGrid { width: 5, height: 1 })
        ));
    }

    #[test]
    fn interpolation_hits_corners() {
        let a = GeoSample::new(1.0, 2.0, 3.0);
        let b = GeoSample::new(4.0, 5.0, 6.0);
        let c = GeoSample::new(7.0, 8.0, 9.0);
        assert_eq!(GeoSample::interpolate([&a, &b, &c], [0.0, 1.0, 0.0]), b);
        let mid = GeoSample::interpolate([&a, &b, &c], [1.0 / 3.0; 3]);
        assert!((mid.latitude - 4.0).abs() < 1e-12);
        assert!((mid.elevation - 6.0).abs() < 1e-12);
    }
}
