use std::io::Write;

use anyhow::Context;
use rayon::prelude::*;
use serde::Serialize;
use sift_core::psm::{MatchedIon, SpectralMatch};

use crate::input::Search;
use crate::runner::Runner;

/// One identified peptide for one spectrum, as written to `results.json`
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub filename: String,
    pub spec_id: String,
    pub scan_index: usize,
    pub peptide: String,
    /// 1 for targets, -1 for decoys
    pub label: i32,
    pub expmass: f64,
    pub calcmass: f64,
    pub charge: u8,
    pub rt: f64,
    pub notch: usize,
    pub score: f64,
    pub delta_score: f64,
    pub matched_peaks: usize,
    /// Another candidate tied with this one
    pub ambiguous: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matched_ions: Vec<MatchedIon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_histogram: Option<Vec<u32>>,
}

#[derive(Serialize)]
pub struct SiftResults<'a> {
    pub parameters: &'a Search,
    pub matches: Vec<MatchRecord>,
}

impl Runner {
    pub fn serialize_match(&self, psm: &SpectralMatch, filenames: &[String]) -> Vec<MatchRecord> {
        let cutoff = self.parameters.search.score_cutoff;
        let filename = filenames.get(psm.file_id).cloned().unwrap_or_default();
        psm.candidates
            .iter()
            .map(|candidate| {
                let peptide = &self.database[candidate.peptide];
                MatchRecord {
                    filename: filename.clone(),
                    spec_id: psm.spec_id.clone(),
                    scan_index: psm.scan_index,
                    peptide: peptide.to_string(),
                    label: peptide.label(),
                    expmass: psm.precursor_mass,
                    calcmass: peptide.monoisotopic,
                    charge: psm.precursor_charge,
                    rt: psm.rt,
                    notch: candidate.notch,
                    score: psm.score,
                    delta_score: psm.delta_score(cutoff),
                    matched_peaks: candidate.matched_peaks,
                    ambiguous: psm.is_ambiguous(),
                    matched_ions: candidate.matched_ions.clone(),
                    score_histogram: psm.score_histogram.clone(),
                }
            })
            .collect()
    }

    pub fn write_results(
        &self,
        results: &[Option<SpectralMatch>],
        filenames: &[String],
    ) -> anyhow::Result<String> {
        let path = self.parameters.output_directory.join("results.json");

        let matches = results
            .par_iter()
            .filter_map(Option::as_ref)
            .flat_map_iter(|psm| self.serialize_match(psm, filenames))
            .collect::<Vec<_>>();

        let output = SiftResults {
            parameters: &self.parameters,
            matches,
        };
        let file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create `{}`", path.display()))?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &output)?;
        writer.flush()?;

        Ok(path.display().to_string())
    }
}
