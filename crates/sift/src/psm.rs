use serde::Serialize;

use crate::database::PeptideIx;
use crate::ion_series::Kind;
use crate::spectrum::ProcessedSpectrum;

/// Scores closer than this are considered tied
pub const SCORE_TOLERANCE: f64 = 1e-9;

/// An experimental peak explained by a theoretical fragment
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct MatchedIon {
    pub kind: Kind,
    pub ordinal: usize,
    /// Neutral mass of the theoretical fragment, or of its complement if
    /// `complementary` is set
    pub theoretical_mass: f64,
    pub experimental_mass: f64,
    pub intensity: f64,
    pub complementary: bool,
}

/// A peptide explaining a spectrum, and the precursor notch it was accepted under
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Candidate {
    pub peptide: PeptideIx,
    pub notch: usize,
    pub matched_peaks: usize,
    /// Only populated when match annotation is requested
    pub matched_ions: Vec<MatchedIon>,
}

/// Best match(es) for a single spectrum
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpectralMatch {
    /// Position of the spectrum in the searched slice
    pub scan_index: usize,
    pub spec_id: String,
    pub file_id: usize,
    pub precursor_mass: f64,
    pub precursor_charge: u8,
    pub rt: f64,
    pub score: f64,
    pub runner_up_score: f64,
    /// Best scoring candidates, in the order they were found. More than one
    /// entry means the match is ambiguous
    pub candidates: Vec<Candidate>,
    /// `score_histogram[i]` is the number of precursor-compatible peptides
    /// with an indexed score of `i + 1`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_histogram: Option<Vec<u32>>,
}

impl SpectralMatch {
    pub fn new(
        scan_index: usize,
        spectrum: &ProcessedSpectrum,
        candidate: Candidate,
        score: f64,
        runner_up_score: f64,
    ) -> Self {
        SpectralMatch {
            scan_index,
            spec_id: spectrum.id.clone(),
            file_id: spectrum.file_id,
            precursor_mass: spectrum.precursor_mass,
            precursor_charge: spectrum.precursor_charge,
            rt: spectrum.scan_start_time,
            score,
            runner_up_score,
            candidates: vec![candidate],
            score_histogram: None,
        }
    }

    /// Merge another candidate into this match.
    ///
    /// * A better score replaces every current candidate, and the replaced
    ///   score becomes the runner-up
    /// * A tied score is kept as an ambiguous alternative when
    ///   `report_ambiguity` is set
    /// * Anything else can only raise the runner-up score
    pub fn add_or_replace(&mut self, candidate: Candidate, score: f64, report_ambiguity: bool) {
        if score - self.score > SCORE_TOLERANCE {
            self.candidates.clear();
            self.candidates.push(candidate);
            if self.score - self.runner_up_score > SCORE_TOLERANCE {
                self.runner_up_score = self.score;
            }
            self.score = score;
        } else if score - self.score > -SCORE_TOLERANCE && report_ambiguity {
            self.candidates.push(candidate);
        } else if score - self.runner_up_score > SCORE_TOLERANCE {
            self.runner_up_score = score;
        }
    }

    /// Highest scoring candidate (the first one found, if tied)
    pub fn best(&self) -> &Candidate {
        &self.candidates[0]
    }

    pub fn is_ambiguous(&self) -> bool {
        self.candidates.len() > 1
    }

    /// The precursor notch, if every candidate agrees on it
    pub fn resolved_notch(&self) -> Option<usize> {
        let notch = self.candidates.first()?.notch;
        self.candidates
            .iter()
            .all(|c| c.notch == notch)
            .then_some(notch)
    }

    pub fn delta_score(&self, score_cutoff: f64) -> f64 {
        self.score - self.runner_up_score.max(score_cutoff)
    }
}
