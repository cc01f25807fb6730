use serde::{Deserialize, Serialize};

use crate::mass::{Mass, NH3, PROTON};
use crate::peptide::Peptide;

const CO: f64 = 27.994915;
const H: f64 = 1.007825;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    A,
    B,
    C,
    X,
    Y,
    /// z-dot (radical) ion, as produced by electron-based dissociation
    Z,
}

/// Fragmentation method used to acquire the MS2 spectra
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum DissociationType {
    HCD,
    CID,
    /// Ion trap CID, acquired at low (nominal mass) fragment resolution
    LowCID,
    ETD,
    EThcD,
}

impl DissociationType {
    /// Ion series produced by this fragmentation method
    pub fn ion_kinds(&self) -> Vec<Kind> {
        match self {
            DissociationType::HCD | DissociationType::CID | DissociationType::LowCID => {
                vec![Kind::B, Kind::Y]
            }
            DissociationType::ETD => vec![Kind::C, Kind::Z],
            DissociationType::EThcD => vec![Kind::B, Kind::Y, Kind::C, Kind::Z],
        }
    }

    /// Neutral mass shift `s` such that a fragment and its complementary
    /// fragment sum to `precursor + s`
    ///
    /// EThcD has no single shift: b/y and c/z pairs need different ones
    pub fn complementary_shift(&self) -> Option<f64> {
        match self {
            DissociationType::HCD | DissociationType::CID | DissociationType::LowCID => Some(0.0),
            DissociationType::ETD => Some(PROTON),
            DissociationType::EThcD => None,
        }
    }

    /// Fragment masses are only resolved to the nominal mass grid
    pub fn is_low_resolution(&self) -> bool {
        matches!(self, DissociationType::LowCID)
    }
}

/// Theoretical fragment ion
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ion {
    pub kind: Kind,
    /// Neutral fragment mass (no charge)
    pub monoisotopic_mass: f64,
    /// Fragment number, counted from the terminus the ion retains
    pub ordinal: usize,
}

/// Generate fragment ions for a candidate peptide
pub struct IonSeries<'p> {
    pub kind: Kind,
    cumulative_mass: f64,
    peptide: &'p Peptide,
    idx: usize,
}

impl<'p> IonSeries<'p> {
    /// Create a new [`IonSeries`] iterator for a specified peptide
    pub fn new(peptide: &'p Peptide, kind: Kind) -> Self {
        let nterm = peptide.nterm.unwrap_or_default();
        let cumulative_mass = match kind {
            Kind::A => nterm - CO,
            Kind::B => nterm,
            Kind::C => nterm + NH3,
            Kind::X => peptide.monoisotopic - nterm + CO - 2.0 * H,
            Kind::Y => peptide.monoisotopic - nterm,
            Kind::Z => peptide.monoisotopic - nterm - NH3 + H,
        };
        Self {
            kind,
            cumulative_mass,
            peptide,
            idx: 0,
        }
    }
}

impl<'p> Iterator for IonSeries<'p> {
    type Item = Ion;

    // Dynamic programming solution - memoize cumulative mass of
    // peptide fragment for fast fragment ion generation
    fn next(&mut self) -> Option<Self::Item> {
        if self.idx + 1 >= self.peptide.sequence.len() {
            return None;
        }
        let r = self.peptide.sequence.get(self.idx)?;

        self.cumulative_mass += match self.kind {
            Kind::A | Kind::B | Kind::C => r.monoisotopic(),
            Kind::X | Kind::Y | Kind::Z => -r.monoisotopic(),
        };
        self.idx += 1;

        let ordinal = match self.kind {
            Kind::A | Kind::B | Kind::C => self.idx,
            Kind::X | Kind::Y | Kind::Z => self.peptide.sequence.len() - self.idx,
        };

        Some(Ion {
            kind: self.kind,
            monoisotopic_mass: self.cumulative_mass,
            ordinal,
        })
    }
}
