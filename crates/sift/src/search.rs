use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use fnv::FnvHashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::acceptor::MassDiffAcceptor;
use crate::database::IndexedDatabase;
use crate::ion_series::DissociationType;
use crate::mass::Tolerance;
use crate::psm::SpectralMatch;
use crate::scoring::{Scorer, Scratch};
use crate::spectrum::ProcessedSpectrum;
use crate::Error;

/// Search settings as read from a configuration file; every field is
/// optional and falls back to a default in [`Builder::make_parameters`]
#[derive(Deserialize, Serialize, Default, Clone, Debug)]
pub struct Builder {
    /// Fragment tolerance used for candidate bins and refined scoring
    pub fragment_tol: Option<Tolerance>,
    /// Minimum score for a peptide to be reported
    pub score_cutoff: Option<f64>,
    pub dissociation: Option<DissociationType>,
    /// Also match the complement of every fragment
    pub complementary_ions: Option<bool>,
    /// Override (or supply) the complementary ion mass shift for a
    /// dissociation type
    pub complementary_shifts: Option<FnvHashMap<DissociationType, f64>>,
    /// Keep every tied best candidate instead of only the first
    pub report_ambiguity: Option<bool>,
    /// Attach an indexed score histogram to each match
    pub calculate_evalue: Option<bool>,
    pub max_mass_that_fragment_ion_score_is_doubled: Option<f64>,
    pub max_threads: Option<usize>,
    /// Keep the list of matched fragments for each candidate
    pub annotate_matches: Option<bool>,
}

impl Builder {
    pub fn make_parameters(self) -> Parameters {
        Parameters {
            fragment_tol: self.fragment_tol.unwrap_or(Tolerance::Ppm(-20.0, 20.0)),
            score_cutoff: self.score_cutoff.unwrap_or(5.0),
            dissociation: self.dissociation.unwrap_or(DissociationType::HCD),
            complementary_ions: self.complementary_ions.unwrap_or(false),
            complementary_shifts: self.complementary_shifts.unwrap_or_default(),
            report_ambiguity: self.report_ambiguity.unwrap_or(true),
            calculate_evalue: self.calculate_evalue.unwrap_or(false),
            max_mass_that_fragment_ion_score_is_doubled: self
                .max_mass_that_fragment_ion_score_is_doubled
                .unwrap_or(0.0),
            max_threads: self
                .max_threads
                .unwrap_or_else(rayon::current_num_threads)
                .max(1),
            annotate_matches: self.annotate_matches.unwrap_or(false),
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct Parameters {
    pub fragment_tol: Tolerance,
    pub score_cutoff: f64,
    pub dissociation: DissociationType,
    pub complementary_ions: bool,
    pub complementary_shifts: FnvHashMap<DissociationType, f64>,
    pub report_ambiguity: bool,
    pub calculate_evalue: bool,
    pub max_mass_that_fragment_ion_score_is_doubled: f64,
    pub max_threads: usize,
    pub annotate_matches: bool,
}

impl Parameters {
    /// Complementary ion mass shift for the configured dissociation type,
    /// or `None` if complementary ions are disabled
    pub fn complementary_shift(&self) -> Result<Option<f64>, Error> {
        if !self.complementary_ions {
            return Ok(None);
        }
        self.complementary_shifts
            .get(&self.dissociation)
            .copied()
            .or_else(|| self.dissociation.complementary_shift())
            .map(Some)
            .ok_or(Error::MissingComplementaryShift(self.dissociation))
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Builder::default().make_parameters()
    }
}

/// Share of the scans that have been searched
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Progress {
    pub percent: u8,
    pub message: String,
}

/// Split `[0, scans)` into at most `workers` contiguous ranges of (nearly)
/// equal size
pub fn partition_scans(scans: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1).min(scans);
    if workers == 0 {
        return Vec::new();
    }

    let (size, extra) = (scans / workers, scans % workers);
    let mut start = 0;
    (0..workers)
        .map(|worker| {
            let len = size + (worker < extra) as usize;
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

/// Turns completed scan counts into coalesced, non-decreasing percentage
/// reports
struct ProgressTracker<'a, F> {
    total: usize,
    completed: AtomicUsize,
    last: AtomicU8,
    reported: Mutex<u8>,
    callback: &'a F,
}

impl<'a, F: Fn(Progress) + Sync> ProgressTracker<'a, F> {
    fn new(total: usize, callback: &'a F) -> Self {
        callback(Progress {
            percent: 0,
            message: format!("searching {} spectra", total),
        });
        ProgressTracker {
            total,
            completed: AtomicUsize::new(0),
            last: AtomicU8::new(0),
            reported: Mutex::new(0),
            callback,
        }
    }

    fn tick(&self) {
        let done = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        let percent = (done * 100 / self.total.max(1)).min(100) as u8;
        if percent <= self.last.load(Ordering::Relaxed) {
            return;
        }

        let mut reported = match self.reported.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // The 100% report is reserved for `finish`
        if percent > *reported && percent < 100 {
            *reported = percent;
            self.last.store(percent, Ordering::Relaxed);
            (self.callback)(Progress {
                percent,
                message: format!("searched {}/{} spectra", done, self.total),
            });
        }
    }

    fn finish(self, cancelled: bool) {
        let done = self.completed.load(Ordering::Relaxed);
        let message = match cancelled {
            true => format!("cancelled after {}/{} spectra", done, self.total),
            false => format!("searched {}/{} spectra", done, self.total),
        };
        (self.callback)(Progress {
            percent: 100,
            message,
        });
    }
}

pub struct Searcher<'db> {
    pub scorer: Scorer<'db>,
    pub max_threads: usize,
}

impl<'db> Searcher<'db> {
    /// Validate the configuration against the database. Any error is
    /// reported here, before a search is started
    pub fn new(
        db: &'db IndexedDatabase,
        acceptor: &'db dyn MassDiffAcceptor,
        parameters: &Parameters,
    ) -> Result<Self, Error> {
        let scorer = Scorer::new(db, acceptor, parameters)?;
        log::trace!(
            "search parameters: {:?}, acceptor: {}",
            parameters,
            acceptor.name()
        );
        Ok(Searcher {
            scorer,
            max_threads: parameters.max_threads.max(1),
        })
    }

    /// Search every spectrum against the database. The result for
    /// `spectra[i]` is stored at position `i`, and is `None` if no peptide
    /// passed the score cutoff or the scan was skipped due to cancellation.
    ///
    /// `cancel` is checked before every scan; scans already started are
    /// allowed to finish. `progress` is called from worker threads.
    pub fn search<F>(
        &self,
        spectra: &[ProcessedSpectrum],
        cancel: &AtomicBool,
        progress: F,
    ) -> Result<Vec<Option<SpectralMatch>>, Error>
    where
        F: Fn(Progress) + Sync,
    {
        let start = Instant::now();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_threads)
            .build()
            .map_err(|e| Error::ThreadPool(e.to_string()))?;

        let ranges = partition_scans(spectra.len(), self.max_threads);
        let mut results: Vec<Option<SpectralMatch>> = vec![None; spectra.len()];

        let mut slots = Vec::with_capacity(ranges.len());
        let mut rest = results.as_mut_slice();
        for range in &ranges {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
            slots.push(head);
            rest = tail;
        }

        let tracker = ProgressTracker::new(spectra.len(), &progress);
        pool.install(|| {
            ranges
                .par_iter()
                .zip(slots.into_par_iter())
                .for_each(|(range, slots)| {
                    let mut scratch = Scratch::new(self.scorer.db);
                    for (scan, slot) in range.clone().zip(slots.iter_mut()) {
                        if cancel.load(Ordering::Relaxed) {
                            break;
                        }
                        self.scorer.score(scan, &spectra[scan], &mut scratch, slot);
                        tracker.tick();
                    }
                })
        });

        let cancelled = cancel.load(Ordering::Relaxed);
        tracker.finish(cancelled);

        let duration = start.elapsed().as_millis().max(1) as usize;
        let matched = results.iter().filter(|slot| slot.is_some()).count();
        log::info!(
            "- search:  {:8} ms ({} spectra/s), {} of {} spectra matched",
            duration,
            spectra.len() * 1000 / duration,
            matched,
            spectra.len()
        );
        if cancelled {
            log::warn!("search was cancelled, results are incomplete");
        }

        Ok(results)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn partitions() {
        assert_eq!(partition_scans(10, 3), vec![0..4, 4..7, 7..10]);
        assert_eq!(partition_scans(2, 4), vec![0..1, 1..2]);
        assert_eq!(partition_scans(5, 0), vec![0..5]);
        assert!(partition_scans(0, 4).is_empty());
    }

    #[quickcheck]
    fn partitions_are_disjoint_and_cover(scans: u16, workers: u8) -> bool {
        let scans = scans as usize;
        let ranges = partition_scans(scans, workers as usize);
        let mut next = 0;
        for range in &ranges {
            if range.start != next || range.is_empty() {
                return false;
            }
            next = range.end;
        }
        let (min, max) = ranges.iter().fold((usize::MAX, 0), |(min, max), r| {
            (min.min(r.len()), max.max(r.len()))
        });
        next == scans && (ranges.is_empty() || max - min <= 1)
    }

    #[test]
    fn complementary_shift_overrides() {
        let parameters = Builder {
            complementary_ions: Some(true),
            dissociation: Some(DissociationType::EThcD),
            ..Default::default()
        }
        .make_parameters();
        assert!(matches!(
            parameters.complementary_shift(),
            Err(Error::MissingComplementaryShift(DissociationType::EThcD))
        ));

        let parameters: Builder = serde_json::from_str(
            r#"{
                "complementary_ions": true,
                "dissociation": "EThcD",
                "complementary_shifts": { "EThcD": 1.0 }
            }"#,
        )
        .unwrap();
        let parameters = parameters.make_parameters();
        assert_eq!(parameters.complementary_shift().unwrap(), Some(1.0));

        let parameters = Parameters::default();
        assert_eq!(parameters.complementary_shift().unwrap(), None);
        assert_eq!(parameters.fragment_tol, Tolerance::Ppm(-20.0, 20.0));
        assert_eq!(parameters.score_cutoff, 5.0);
        assert!(parameters.report_ambiguity);
        assert!(parameters.max_threads >= 1);
    }
}
