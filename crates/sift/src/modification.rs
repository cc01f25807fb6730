use std::{
    collections::HashMap,
    fmt::{Display, Write},
    str::FromStr,
};

use crate::mass::VALID_AA;

/// Where a modification may be placed on a peptide
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModificationSpecificity {
    PeptideN,
    PeptideC,
    Residue(char),
}

impl ModificationSpecificity {
    /// Residue key understood by [`crate::peptide::Peptide::static_mod`] and
    /// [`crate::peptide::Peptide::variable_mod`]
    pub fn as_char(&self) -> char {
        match self {
            ModificationSpecificity::PeptideN => '^',
            ModificationSpecificity::PeptideC => '$',
            ModificationSpecificity::Residue(c) => *c,
        }
    }
}

impl Display for ModificationSpecificity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_char(self.as_char())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InvalidModification {
    Empty,
    InvalidResidue(char),
    TooLong(String),
}

impl FromStr for ModificationSpecificity {
    type Err = InvalidModification;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let first = chars.next().ok_or(InvalidModification::Empty)?;
        if chars.next().is_some() {
            return Err(InvalidModification::TooLong(s.into()));
        }
        match first {
            '^' => Ok(ModificationSpecificity::PeptideN),
            '$' => Ok(ModificationSpecificity::PeptideC),
            c if VALID_AA.contains(&c) => Ok(ModificationSpecificity::Residue(c)),
            c => Err(InvalidModification::InvalidResidue(c)),
        }
    }
}

fn report(err: InvalidModification) {
    match err {
        InvalidModification::Empty => {
            log::error!("Skipping invalid modification string: empty")
        }
        InvalidModification::InvalidResidue(c) => {
            log::error!(
                "Skipping invalid modification string: unrecognized residue ({})",
                c
            )
        }
        InvalidModification::TooLong(s) => {
            log::error!("Skipping invalid modification string: {} is too long", s)
        }
    }
}

pub fn validate_mods(input: Option<HashMap<String, f64>>) -> HashMap<char, f64> {
    let mut output = HashMap::new();
    if let Some(input) = input {
        for (s, mass) in input {
            match ModificationSpecificity::from_str(&s) {
                Ok(m) => {
                    output.insert(m.as_char(), mass);
                }
                Err(e) => report(e),
            }
        }
    }
    output
}

/// Flatten variable modifications into `(residue, mass)` pairs, sorted so
/// that peptide enumeration order does not depend on hash map iteration
pub fn validate_var_mods(input: Option<HashMap<String, Vec<f64>>>) -> Vec<(char, f64)> {
    let mut output = Vec::new();
    if let Some(input) = input {
        for (s, masses) in input {
            match ModificationSpecificity::from_str(&s) {
                Ok(m) => output.extend(masses.into_iter().map(|mass| (m, mass))),
                Err(e) => report(e),
            }
        }
    }
    output.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.total_cmp(&b.1)));
    output
        .into_iter()
        .map(|(m, mass)| (m.as_char(), mass))
        .collect()
}
