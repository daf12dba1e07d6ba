use std::collections::HashSet;
use std::ops::Range;

use crate::error::MeshError;
use crate::geo::{GeoSample, GridSpec, POSITION_TOLERANCE};
use crate::mesh::types::{LatticeMesh, TriangleId};

/// Incremental grid triangulator. Samples arrive in row-major order and the
/// two triangles of a cell are emitted as soon as its bottom-right corner
/// lands, so sampling and indexing interleave.
///
/// Every sample must sit on the lattice: samples of one row share a latitude
/// and samples of one column share a longitude. A builder made with
/// [`MeshBuilder::for_grid`] also pins each sample to its exact grid position.
pub struct MeshBuilder {
    width: usize,
    height: usize,
    grid: Option<GridSpec>,
    samples: Vec<GeoSample>,
    seen: HashSet<(u64, u64)>,
    triangles: Vec<[u32; 3]>,
}

impl MeshBuilder {
    pub fn new(width: usize, height: usize) -> Result<Self, MeshError> {
        if width < 2 || height < 2 {
            return Err(MeshError::InsufficientGrid { width, height });
        }
        Ok(Self {
            width,
            height,
            grid: None,
            samples: Vec::with_capacity(width * height),
            seen: HashSet::with_capacity(width * height),
            triangles: Vec::with_capacity(2 * (width - 1) * (height - 1)),
        })
    }

    pub fn for_grid(grid: &GridSpec) -> Result<Self, MeshError> {
        let mut builder = Self::new(grid.width(), grid.height())?;
        builder.grid = Some(*grid);
        Ok(builder)
    }

    pub fn from_samples<I>(
        width: usize,
        height: usize,
        samples: I,
    ) -> Result<LatticeMesh, MeshError>
    where
        I: IntoIterator<Item = GeoSample>,
    {
        let mut builder = Self::new(width, height)?;
        for sample in samples {
            builder.push(sample)?;
        }
        builder.finish()
    }

    /// Accept the next sample and return the ids of triangles it completed.
    pub fn push(&mut self, sample: GeoSample) -> Result<Range<TriangleId>, MeshError> {
        if self.is_complete() {
            return Err(MeshError::GridOverflow {
                expected: self.expected(),
            });
        }

        let index = self.samples.len();
        let (row, col) = (index / self.width, index % self.width);
        self.check_position(row, col, &sample)?;

        // +0.0 folds negative zero onto zero
        let key = (
            (sample.latitude + 0.0).to_bits(),
            (sample.longitude + 0.0).to_bits(),
        );
        if !self.seen.insert(key) {
            return Err(MeshError::DuplicateSample {
                latitude: sample.latitude,
                longitude: sample.longitude,
            });
        }

        self.samples.push(sample);

        let first = self.triangles.len() as TriangleId;
        if row >= 1 && col >= 1 {
            self.emit_cell(row - 1, col - 1);
        }
        Ok(first..self.triangles.len() as TriangleId)
    }

    fn check_position(&self, row: usize, col: usize, sample: &GeoSample) -> Result<(), MeshError> {
        let got = (sample.latitude, sample.longitude);
        let expected = match &self.grid {
            Some(grid) => grid.position(row, col),
            None => {
                let latitude = match col {
                    0 => got.0,
                    _ => self.samples[row * self.width].latitude,
                };
                let longitude = match row {
                    0 => got.1,
                    _ => self.samples[col].longitude,
                };
                (latitude, longitude)
            }
        };
        let off = (got.0 - expected.0).abs().max((got.1 - expected.1).abs());
        if off > POSITION_TOLERANCE {
            return Err(MeshError::IrregularLattice {
                row,
                col,
                expected,
                got,
            });
        }
        Ok(())
    }

    fn emit_cell(&mut self, row: usize, col: usize) {
        let w = self.width;
        let tl = (row * w + col) as u32;
        let tr = (row * w + col + 1) as u32;
        let bl = ((row + 1) * w + col) as u32;
        let br = ((row + 1) * w + col + 1) as u32;

        self.triangles.push([tl, bl, tr]);
        self.triangles.push([tr, bl, br]);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn expected(&self) -> usize {
        self.width * self.height
    }

    pub fn received(&self) -> usize {
        self.samples.len()
    }

    pub fn is_complete(&self) -> bool {
        self.received() == self.expected()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn finish(self) -> Result<LatticeMesh, MeshError> {
        if !self.is_complete() {
            return Err(MeshError::IncompleteGrid {
                expected: self.expected(),
                received: self.received(),
            });
        }
        Ok(LatticeMesh {
            width: self.width,
            height: self.height,
            samples: self.samples,
            triangles: self.triangles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lattice(width: usize, height: usize) -> Vec<GeoSample> {
        (0..height)
            .flat_map(|r| {
                (0..width).map(move |c| GeoSample::new(r as f64 * 0.001, c as f64 * 0.001, 0.0))
            })
            .collect()
    }

    #[test]
    fn counts_match_lattice() {
        for (w, h) in [(2, 2), (3, 3), (5, 2), (2, 7), (9, 4)] {
            let mesh = MeshBuilder::from_samples(w, h, lattice(w, h)).unwrap();
            assert_eq!(mesh.samples.len(), w * h);
            assert_eq!(mesh.triangles.len(), 2 * (w - 1) * (h - 1));
        }
    }

    #[test]
    fn edges_are_shared_exactly_once_inside() {
        let (w, h) = (6, 4);
        let mesh = MeshBuilder::from_samples(w, h, lattice(w, h)).unwrap();

        let mut edges: HashMap<(u32, u32), usize> = HashMap::new();
        for t in &mesh.triangles {
            for k in 0..3 {
                let (a, b) = (t[k], t[(k + 1) % 3]);
                *edges.entry((a.min(b), a.max(b))).or_default() += 1;
            }
        }

        let on_boundary = |a: u32, b: u32| {
            let (ra, ca) = (a as usize / w, a as usize % w);
            let (rb, cb) = (b as usize / w, b as usize % w);
            (ra == rb && (ra == 0 || ra == h - 1)) || (ca == cb && (ca == 0 || ca == w - 1))
        };

        let mut boundary = 0;
        for (&(a, b), &n) in &edges {
            if on_boundary(a, b) {
                assert_eq!(n, 1, "boundary edge {a}-{b}");
                boundary += 1;
            } else {
                assert_eq!(n, 2, "interior edge {a}-{b}");
            }
        }
        assert_eq!(boundary, 2 * (w - 1) + 2 * (h - 1));
    }

    #[test]
    fn triangles_have_distinct_corners() {
        let mesh = MeshBuilder::from_samples(4, 3, lattice(4, 3)).unwrap();
        for t in &mesh.triangles {
            assert!(t[0] != t[1] && t[1] != t[2] && t[0] != t[2]);
        }
    }

    #[test]
    fn emits_once_second_row_reaches_a_cell() {
        let (w, h) = (4, 3);
        let mut builder = MeshBuilder::new(w, h).unwrap();
        let samples = lattice(w, h);
        for s in &samples[..w] {
            assert!(builder.push(*s).unwrap().is_empty());
        }
        assert!(builder.push(samples[w]).unwrap().is_empty());
        assert_eq!(builder.push(samples[w + 1]).unwrap(), 0..2);
        assert_eq!(builder.triangles()[0], [0, 4, 1]);
        assert_eq!(builder.triangles()[1], [1, 4, 5]);
    }

    #[test]
    fn column_major_stream_is_irregular() {
        let (w, h) = (3, 3);
        let samples = lattice(w, h);
        let transposed = (0..w).flat_map(|c| (0..h).map(move |r| r * w + c));
        let result = MeshBuilder::from_samples(w, h, transposed.map(|i| samples[i]));
        assert_eq!(
            result.unwrap_err(),
            MeshError::IrregularLattice {
                row: 0,
                col: 1,
                expected: (0.0, 0.0),
                got: (0.001, 0.0),
            }
        );
    }

    #[test]
    fn grid_pins_every_position() {
        let grid = GridSpec::new((0.0, 0.0), (0.002, 0.003), 3, 4).unwrap();
        let positions: Vec<_> = grid.positions().collect();

        let mut builder = MeshBuilder::for_grid(&grid).unwrap();
        for &(lat, lng) in &positions[..5] {
            builder.push(GeoSample::new(lat, lng, 1.0)).unwrap();
        }
        // right row and column pattern, wrong place
        let (lat, lng) = positions[5];
        assert!(matches!(
            builder.push(GeoSample::new(lat, lng + 0.5, 1.0)),
            Err(MeshError::IrregularLattice { row: 1, col: 1, .. })
        ));

        let mut shifted = MeshBuilder::for_grid(&grid).unwrap();
        assert!(matches!(
            shifted.push(GeoSample::new(1.0, 0.0, 1.0)),
            Err(MeshError::IrregularLattice { row: 0, col: 0, .. })
        ));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            MeshBuilder::new(1, 4),
            Err(MeshError::InsufficientGrid { .. })
        ));

        let mut builder = MeshBuilder::new(2, 2).unwrap();
        builder.push(GeoSample::new(1.0, 1.0, 5.0)).unwrap();
        assert!(matches!(
            builder.push(GeoSample::new(1.0, 1.0, 6.0)),
            Err(MeshError::DuplicateSample { .. })
        ));

        let err = builder.finish().unwrap_err();
        assert_eq!(
            err,
            MeshError::IncompleteGrid {
                expected: 4,
                received: 1
            }
        );

        let mut full = MeshBuilder::new(2, 2).unwrap();
        for s in lattice(2, 2) {
            full.push(s).unwrap();
        }
        assert!(matches!(
            full.push(GeoSample::new(9.0, 9.0, 0.0)),
            Err(MeshError::GridOverflow { expected: 4 })
        ));
    }
}
