pub struct LatticePreset {
    pub name: &'static str,
    pub description: &'static str,
    pub start: (f64, f64),
    pub end: (f64, f64),
    pub rows: usize,
    pub cols: usize,
}

pub const LATTICE_PRESETS: &[LatticePreset] = &[
    LatticePreset {
        name: "campus",
        description: "Street block sampled at roughly one meter.",
        start: (43.45135, -80.49400),
        end: (43.45245, -80.49600),
        rows: 111,
        cols: 201,
    },
    LatticePreset {
        name: "campus-coarse",
        description: "Same block at a tenth of the resolution, cheap to sample.",
        start: (43.45135, -80.49400),
        end: (43.45245, -80.49600),
        rows: 12,
        cols: 21,
    },
    LatticePreset {
        name: "corridor",
        description: "Narrow north-south strip, two samples wide.",
        start: (43.45175, -80.494799),
        end: (43.45250, -80.494800),
        rows: 332,
        cols: 2,
    },
    LatticePreset {
        name: "district",
        description: "Wide square area for overview renders.",
        start: (43.45050, -80.49300),
        end: (43.45270, -80.49600),
        rows: 220,
        cols: 220,
    },
];

pub fn find_preset(name: &str) -> Option<&'static LatticePreset> {
    LATTICE_PRESETS.iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GridSpec;

    #[test]
    fn presets_form_valid_lattices() {
        for p in LATTICE_PRESETS {
            let spec = GridSpec::new(p.start, p.end, p.rows, p.cols);
            assert!(spec.is_ok(), "{}", p.name);
        }
        assert!(find_preset("campus").is_some());
        assert!(find_preset("nowhere").is_none());
    }
}
