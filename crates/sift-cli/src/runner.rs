use std::sync::atomic::AtomicBool;
use std::time::Instant;

use anyhow::Context;
use log::info;
use rayon::prelude::*;
use sift_core::database::IndexedDatabase;
use sift_core::peptide::PeptideSource;
use sift_core::psm::SpectralMatch;
use sift_core::search::{Progress, Searcher};
use sift_core::spectrum::{
    sort_by_precursor_mass, ProcessedSpectrum, RawSpectrum, SpectrumProcessor,
};

use super::input::Search;

pub struct Runner {
    pub database: IndexedDatabase,
    pub parameters: Search,
    start: Instant,
}

/// What a completed run produced
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub spectra: usize,
    pub matched: usize,
    pub output: String,
}

impl Runner {
    pub fn new(parameters: Search) -> anyhow::Result<Self> {
        let start = Instant::now();

        let peptides: Vec<PeptideSource> = sift_core::read_json(&parameters.peptides)
            .with_context(|| format!("Failed to read peptides from `{}`", parameters.peptides))?;

        let database = parameters
            .database
            .clone()
            .build(&peptides)
            .with_context(|| {
                format!("Failed to build database from `{}`", parameters.peptides)
            })?;

        info!(
            "generated {} fragments, {} peptides in {:#?}",
            database.index.size(),
            database.peptides.len(),
            start.elapsed()
        );

        Ok(Self {
            database,
            parameters,
            start,
        })
    }

    fn read_processed_spectra(&self) -> anyhow::Result<Vec<ProcessedSpectrum>> {
        let start = Instant::now();
        let settings = self.parameters.processing;

        let mut spectra = Vec::new();
        for (file_id, path) in self.parameters.spectra_paths.iter().enumerate() {
            let raw: Vec<RawSpectrum> = sift_core::read_json(path)
                .with_context(|| format!("Failed to read spectra from `{}`", path))?;
            info!("- {}: read {} spectra", path, raw.len());

            let processor = SpectrumProcessor::new(
                settings.take_top_n,
                settings.min_fragment_mz,
                settings.max_fragment_mz,
                file_id,
            );
            spectra.par_extend(raw.into_par_iter().map(|spectrum| processor.process(spectrum)));
        }
        sort_by_precursor_mass(&mut spectra);

        info!("- file IO: {:8} ms", start.elapsed().as_millis());
        Ok(spectra)
    }

    fn search_processed_spectra(
        &self,
        spectra: &[ProcessedSpectrum],
    ) -> anyhow::Result<Vec<Option<SpectralMatch>>> {
        let acceptor = self.parameters.acceptor.clone().build();
        info!("precursor acceptor: {}", acceptor.name());

        let searcher = Searcher::new(&self.database, acceptor.as_ref(), &self.parameters.search)?;
        let cancel = AtomicBool::new(false);
        let results = searcher.search(spectra, &cancel, |progress: Progress| {
            match progress.percent % 10 {
                0 => info!("{:>3}% - {}", progress.percent, progress.message),
                _ => log::debug!("{:>3}% - {}", progress.percent, progress.message),
            }
        })?;
        Ok(results)
    }

    pub fn run(self) -> anyhow::Result<Summary> {
        let spectra = self.read_processed_spectra()?;
        let results = self.search_processed_spectra(&spectra)?;

        let matched = results.iter().filter(|psm| psm.is_some()).count();
        let ambiguous = results
            .iter()
            .flatten()
            .filter(|psm| psm.is_ambiguous())
            .count();
        let decoys = results
            .iter()
            .flatten()
            .filter(|psm| self.database[psm.best().peptide].decoy)
            .count();
        info!(
            "matched {} of {} spectra ({} ambiguous, {} decoy)",
            matched,
            spectra.len(),
            ambiguous,
            decoys
        );

        let output = self.write_results(&results, &self.parameters.spectra_paths)?;
        info!("wrote {}", output);

        let run_time = (Instant::now() - self.start).as_secs();
        info!("finished in {}s", run_time);

        Ok(Summary {
            spectra: spectra.len(),
            matched,
            output,
        })
    }
}
