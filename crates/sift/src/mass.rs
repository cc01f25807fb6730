use serde::{Deserialize, Serialize};

pub const H2O: f64 = 18.010565;
pub const PROTON: f64 = 1.007276;
pub const NEUTRON: f64 = 1.00335;
pub const NH3: f64 = 17.026548;

#[derive(Copy, Clone, Serialize, Deserialize, Debug, PartialEq, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum Tolerance {
    Ppm(f64, f64),
    Da(f64, f64),
}

impl Tolerance {
    /// Compute the (`lower`, `upper`) window (in Da) for for a monoisotopic
    /// mass and a given tolerance
    pub fn bounds(&self, center: f64) -> (f64, f64) {
        match self {
            Tolerance::Ppm(lo, hi) => {
                let delta_lo = center * lo / 1_000_000.0;
                let delta_hi = center * hi / 1_000_000.0;
                (center + delta_lo, center + delta_hi)
            }
            Tolerance::Da(lo, hi) => (center + lo, center + hi),
        }
    }

    pub fn contains(&self, center: f64, rhs: f64) -> bool {
        let (lo, hi) = self.bounds(center);
        rhs >= lo && rhs <= hi
    }
}

/// Convert an observed m/z at `charge` into a neutral mass
pub fn mz_to_mass(mz: f64, charge: u8) -> f64 {
    (mz - PROTON) * charge as f64
}

/// Convert a neutral mass into the m/z observed at `charge`
pub fn mass_to_mz(mass: f64, charge: u8) -> f64 {
    mass / charge as f64 + PROTON
}

pub trait Mass {
    fn monoisotopic(&self) -> f64;
}

#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Serialize)]
pub enum Residue {
    // Standard amino acid residue
    Just(char),
    // Amino acid residue with a mass modification
    Mod(char, f64),
}

impl Mass for Residue {
    fn monoisotopic(&self) -> f64 {
        match self {
            Residue::Just(c) => c.monoisotopic(),
            Residue::Mod(c, m) => c.monoisotopic() + m,
        }
    }
}

pub const VALID_AA: [char; 22] = [
    'A', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'V', 'W',
    'Y', 'U', 'O',
];

impl Mass for char {
    fn monoisotopic(&self) -> f64 {
        match self {
            'A' => 71.03711,
            'R' => 156.1011,
            'N' => 114.04293,
            'D' => 115.02694,
            'C' => 103.00919,
            'E' => 129.04259,
            'Q' => 128.05858,
            'G' => 57.02146,
            'H' => 137.05891,
            'I' => 113.08406,
            'L' => 113.08406,
            'K' => 128.09496,
            'M' => 131.0405,
            'F' => 147.0684,
            'P' => 97.05276,
            'S' => 87.03203,
            'T' => 101.04768,
            'W' => 186.07931,
            'Y' => 163.06333,
            'V' => 99.06841,
            'U' => 150.95363,
            'O' => 237.14773,
            _ => unreachable!("BUG: invalid amino acid {}", self),
        }
    }
}

impl std::fmt::Display for Residue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Residue::Just(c) => write!(f, "{}", c),
            Residue::Mod(c, m) => {
                if m.is_sign_positive() {
                    write!(f, "{}[+{}]", c, m)
                } else {
                    write!(f, "{}[{}]", c, m)
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{mass_to_mz, mz_to_mass, Mass, Tolerance, VALID_AA};

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn smoke() {
        for ch in VALID_AA {
            assert!(ch.monoisotopic() > 0.0);
        }
    }

    #[test]
    fn tolerances() {
        assert!(close(
            Tolerance::Ppm(-10.0, 20.0).bounds(1000.0),
            (999.99, 1000.02)
        ));
        assert!(close(
            Tolerance::Ppm(-10.0, 10.0).bounds(487.0),
            (486.99513, 487.00487)
        ));
        assert!(close(
            Tolerance::Da(-0.5, 0.5).bounds(1000.0),
            (999.5, 1000.5)
        ));
        assert!(Tolerance::Ppm(-50.0, 50.0).contains(1000.0, 1000.049));
        assert!(!Tolerance::Ppm(-50.0, 50.0).contains(1000.0, 1000.051));
    }

    #[test]
    fn charge_conversion() {
        let mass = mz_to_mass(501.0, 2);
        assert!((mass_to_mz(mass, 2) - 501.0).abs() < 1e-9);
        assert!((mz_to_mass(101.007276, 1) - 100.0).abs() < 1e-9);
    }
}
