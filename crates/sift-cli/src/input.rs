use std::path::PathBuf;

use anyhow::{ensure, Context};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use sift_core::{acceptor::AcceptorConfig, database, mass::Tolerance, search};

#[derive(Serialize)]
/// Actual search parameters - may include overrides or default values not set by user
pub struct Search {
    pub version: String,
    pub database: database::Parameters,
    pub search: search::Parameters,
    pub acceptor: AcceptorConfig,
    pub processing: ProcessingSettings,
    pub peptides: String,
    pub spectra_paths: Vec<String>,

    #[serde(skip_serializing)]
    pub output_directory: PathBuf,
}

#[derive(Deserialize)]
/// Input search parameters deserialized from JSON file
pub struct Input {
    database: database::Builder,
    search: Option<search::Builder>,
    acceptor: Option<AcceptorConfig>,
    processing: Option<ProcessingOptions>,
    peptides: Option<String>,
    spectra_paths: Option<Vec<String>>,
    output_directory: Option<String>,
}

#[derive(Serialize, Deserialize, Default, Debug)]
pub struct ProcessingOptions {
    take_top_n: Option<usize>,
    min_fragment_mz: Option<f64>,
    max_fragment_mz: Option<f64>,
}

/// How raw spectra are turned into searchable peak lists
#[derive(Copy, Clone, Serialize, Debug, PartialEq)]
pub struct ProcessingSettings {
    pub take_top_n: usize,
    pub min_fragment_mz: f64,
    pub max_fragment_mz: f64,
}

impl From<ProcessingOptions> for ProcessingSettings {
    fn from(value: ProcessingOptions) -> Self {
        let default = Self::default();
        let settings = Self {
            take_top_n: value.take_top_n.unwrap_or(default.take_top_n),
            min_fragment_mz: value.min_fragment_mz.unwrap_or(default.min_fragment_mz),
            max_fragment_mz: value.max_fragment_mz.unwrap_or(default.max_fragment_mz),
        };
        if settings.min_fragment_mz >= settings.max_fragment_mz {
            log::warn!(
                "processing.min_fragment_mz ({}) is not below max_fragment_mz ({}), every peak will be dropped",
                settings.min_fragment_mz,
                settings.max_fragment_mz
            );
        }
        settings
    }
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            take_top_n: 200,
            min_fragment_mz: 0.0,
            max_fragment_mz: 2000.0,
        }
    }
}

impl Input {
    pub fn from_arguments(matches: ArgMatches) -> anyhow::Result<Self> {
        let path = matches
            .get_one::<String>("parameters")
            .context("missing path to configuration parameters")?;
        let mut input = Input::load(path)
            .with_context(|| format!("Failed to read parameters from `{path}`"))?;

        // Handle JSON configuration overrides
        if let Some(output_directory) = matches.get_one::<String>("output_directory") {
            log::trace!("overriding `output_directory` parameter.");
            input.output_directory = Some(output_directory.into());
        }
        if let Some(peptides) = matches.get_one::<String>("peptides") {
            log::trace!("overriding `peptides` parameter.");
            input.peptides = Some(peptides.into());
        }
        if let Some(spectra_paths) = matches.get_many::<String>("spectra_paths") {
            log::trace!("overriding `spectra_paths` parameter.");
            input.spectra_paths = Some(spectra_paths.into_iter().map(|p| p.into()).collect());
        }

        let search = input.search.get_or_insert_with(Default::default);
        if let Some(threads) = matches.get_one::<u16>("threads").copied() {
            log::trace!("overriding `search.max_threads` parameter.");
            search.max_threads = Some(threads as usize);
        }
        search.max_threads = search.max_threads.or_else(|| Some(num_cpus::get()));
        if matches.get_flag("annotate-matches") {
            search.annotate_matches = Some(true);
        }

        ensure!(
            input.peptides.is_some(),
            "`peptides` must be set. For more information try '--help'"
        );
        ensure!(
            input.spectra_paths.is_some(),
            "`spectra_paths` must be set. For more information try '--help'"
        );

        Ok(input)
    }

    pub fn load<S: AsRef<std::path::Path>>(path: S) -> anyhow::Result<Self> {
        sift_core::read_json(path).map_err(anyhow::Error::from)
    }

    fn check_tolerances(tolerance: &Tolerance) {
        let (lo, hi) = match tolerance {
            Tolerance::Ppm(lo, hi) | Tolerance::Da(lo, hi) => (lo, hi),
        };
        if lo > hi {
            log::warn!(
                "Lower tolerance bound is above the upper bound, nothing can match: [{} - {}]",
                lo,
                hi
            );
        }
    }

    pub fn build(mut self) -> anyhow::Result<Search> {
        let search = self.search.unwrap_or_default().make_parameters();
        self.database.update_dissociation(search.dissociation);
        let database = self.database.make_parameters();

        Self::check_tolerances(&search.fragment_tol);
        search.complementary_shift()?;

        let peptides = self
            .peptides
            .context("'peptides' must be provided!")?;
        let spectra_paths = self
            .spectra_paths
            .context("'spectra_paths' must be provided!")?;

        let output_directory = match self.output_directory {
            Some(path) => {
                let path = PathBuf::from(path);
                std::fs::create_dir_all(&path).with_context(|| {
                    format!("Failed to create output directory `{}`", path.display())
                })?;
                path
            }
            None => std::env::current_dir()?,
        };

        Ok(Search {
            version: clap::crate_version!().into(),
            database,
            search,
            acceptor: self.acceptor.unwrap_or_default(),
            processing: self.processing.map(Into::into).unwrap_or_default(),
            peptides,
            spectra_paths,
            output_directory,
        })
    }
}
