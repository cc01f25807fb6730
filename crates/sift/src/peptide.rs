use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ion_series::{Ion, IonSeries, Kind};
use crate::mass::{Mass, Residue, H2O, VALID_AA};

#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub struct Peptide {
    pub decoy: bool,
    pub sequence: Vec<Residue>,
    pub nterm: Option<f64>,
    pub cterm: Option<f64>,
    pub monoisotopic: f64,
}

/// A peptide as handed over by whatever produced the candidate list: an
/// unmodified sequence and a target/decoy label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeptideSource {
    pub sequence: String,
    #[serde(default)]
    pub decoy: bool,
}

impl Peptide {
    fn set_nterm_mod(&mut self, m: f64) {
        if self.nterm.is_none() {
            self.nterm = Some(m);
            self.monoisotopic += m;
        }
    }

    fn set_cterm_mod(&mut self, m: f64) {
        if self.cterm.is_none() {
            self.cterm = Some(m);
            self.monoisotopic += m;
        }
    }

    pub fn label(&self) -> i32 {
        match self.decoy {
            true => -1,
            false => 1,
        }
    }

    /// Apply a static modification to a peptide in-place
    ///
    /// `^` targets the peptide N-terminus and `$` the C-terminus
    pub fn static_mod(&mut self, residue: char, mass: f64) {
        match residue {
            '^' => return self.set_nterm_mod(mass),
            '$' => return self.set_cterm_mod(mass),
            _ => {}
        }

        for resi in self.sequence.iter_mut() {
            // Don't overwrite an already modified amino acid!
            match resi {
                Residue::Just(c) if *c == residue => {
                    self.monoisotopic += mass;
                    *resi = Residue::Mod(residue, mass);
                }
                _ => {}
            }
        }
    }

    /// Create an iterator that will produce all singly-modified peptides with
    /// the given variable modification
    pub fn variable_mod(&self, residue: char, mass: f64) -> VariableMod<'_> {
        VariableMod {
            peptide: self,
            index: 0,
            residue,
            mass,
        }
    }

    /// Apply variable modifications, then static modifications to a peptide
    pub fn apply(
        mut self,
        variable_mods: &[(char, f64)],
        static_mods: &HashMap<char, f64>,
    ) -> Vec<Peptide> {
        if variable_mods.is_empty() {
            for (resi, mass) in static_mods {
                self.static_mod(*resi, *mass);
            }
            vec![self]
        } else {
            let mut peptides = variable_mods.iter().fold(vec![self], |acc, (resi, mass)| {
                acc.iter()
                    .flat_map(|peptide| peptide.variable_mod(*resi, *mass))
                    .collect()
            });
            peptides.iter_mut().for_each(|p| {
                for (resi, mass) in static_mods {
                    p.static_mod(*resi, *mass);
                }
            });
            peptides
        }
    }

    /// Theoretical neutral fragment masses for the requested ion series,
    /// sorted from low to high mass
    pub fn fragments(&self, kinds: &[Kind]) -> Vec<Ion> {
        let mut ions = kinds
            .iter()
            .flat_map(|kind| IonSeries::new(self, *kind))
            .collect::<Vec<_>>();
        ions.sort_by(|a, b| a.monoisotopic_mass.total_cmp(&b.monoisotopic_mass));
        ions
    }
}

pub struct VariableMod<'a> {
    peptide: &'a Peptide,
    index: usize,
    residue: char,
    mass: f64,
}

impl<'a> Iterator for VariableMod<'a> {
    type Item = Peptide;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index == 0
            && !self.peptide.sequence.is_empty()
            && (self.residue == '^' || self.residue == '$')
        {
            self.index = self.peptide.sequence.len();
            let mut modified = self.peptide.clone();
            match self.residue {
                '^' if self.peptide.nterm.is_none() => modified.set_nterm_mod(self.mass),
                '$' if self.peptide.cterm.is_none() => modified.set_cterm_mod(self.mass),
                _ => return self.next(),
            }
            return Some(modified);
        }

        while self.index < self.peptide.sequence.len() {
            match self.peptide.sequence[self.index] {
                Residue::Just(r) if r == self.residue => {
                    let mut modified = self.peptide.clone();
                    modified.sequence[self.index] = Residue::Mod(r, self.mass);
                    modified.monoisotopic += self.mass;
                    self.index += 1;
                    return Some(modified);
                }
                _ => self.index += 1,
            }
        }
        if self.index == self.peptide.sequence.len() {
            self.index += 1;
            return Some(self.peptide.clone());
        }
        None
    }
}

impl TryFrom<&str> for Peptide {
    type Error = char;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mut sequence = Vec::with_capacity(value.len());
        let mut monoisotopic = H2O;

        for c in value.chars() {
            if !VALID_AA.contains(&c) {
                return Err(c);
            }
            monoisotopic += c.monoisotopic();
            sequence.push(Residue::Just(c));
        }

        if sequence.is_empty() {
            return Err(' ');
        }

        Ok(Peptide {
            decoy: false,
            sequence,
            monoisotopic,
            nterm: None,
            cterm: None,
        })
    }
}

impl TryFrom<&PeptideSource> for Peptide {
    type Error = char;

    fn try_from(value: &PeptideSource) -> Result<Self, Self::Error> {
        let mut peptide = Peptide::try_from(value.sequence.as_str())?;
        peptide.decoy = value.decoy;
        Ok(peptide)
    }
}

impl std::fmt::Display for Peptide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(m) = self.nterm {
            if m.is_sign_positive() {
                write!(f, "[+{}]-", m)?;
            } else {
                write!(f, "[{}]-", m)?;
            }
        }
        for residue in &self.sequence {
            write!(f, "{}", residue)?;
        }
        if let Some(m) = self.cterm {
            if m.is_sign_positive() {
                write!(f, "-[+{}]", m)?;
            } else {
                write!(f, "-[{}]", m)?;
            }
        }
        Ok(())
    }
}
