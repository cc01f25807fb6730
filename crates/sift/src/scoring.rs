use crate::acceptor::{MassDiffAcceptor, PrecursorWindow};
use crate::database::{bin_range, nominal_bin, IndexedDatabase, PeptideIx};
use crate::ion_series::Kind;
use crate::mass::Tolerance;
use crate::peptide::Peptide;
use crate::psm::{Candidate, MatchedIon, SpectralMatch};
use crate::search::Parameters;
use crate::spectrum::{select_closest_peak, ProcessedSpectrum};
use crate::Error;

/// Number of fragment-bin hits per peptide for the scan being scored
#[derive(Clone, Debug, Default)]
pub struct ScoringTable {
    scores: Vec<u8>,
}

impl ScoringTable {
    pub fn new(peptides: usize) -> Self {
        ScoringTable {
            scores: vec![0; peptides],
        }
    }

    /// Reset every score to zero, keeping the allocation
    pub fn clear(&mut self) {
        self.scores.fill(0);
    }

    /// Add one hit for `peptide`. Returns the new score, or `None` if the
    /// score was already saturated at `u8::MAX`
    #[inline]
    pub fn increment(&mut self, peptide: PeptideIx) -> Option<u8> {
        let score = &mut self.scores[peptide.0 as usize];
        *score = score.checked_add(1)?;
        Some(*score)
    }

    /// Set the score of `peptide` to 1. Returns true if it was still zero
    #[inline]
    pub fn mark(&mut self, peptide: PeptideIx) -> bool {
        std::mem::replace(&mut self.scores[peptide.0 as usize], 1) == 0
    }

    #[inline]
    pub fn get(&self, peptide: PeptideIx) -> u8 {
        self.scores[peptide.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Iterate over every peptide with a non-zero score
    pub fn hits(&self) -> impl Iterator<Item = (PeptideIx, u8)> + '_ {
        self.scores
            .iter()
            .enumerate()
            .filter(|(_, &score)| score > 0)
            .map(|(idx, &score)| (PeptideIx(idx as u32), score))
    }
}

/// Per-worker buffers, reused from one scan to the next
#[derive(Clone, Debug, Default)]
pub struct Scratch {
    pub table: ScoringTable,
    /// Peptides that reached the score cutoff and passed the precursor check,
    /// in the order they did so
    pub observed: Vec<PeptideIx>,
    /// Candidate fragment bins for the current scan
    pub bins: Vec<usize>,
}

impl Scratch {
    pub fn new(db: &IndexedDatabase) -> Self {
        Scratch {
            table: ScoringTable::new(db.peptides.len()),
            observed: Vec::with_capacity(1024),
            bins: Vec::with_capacity(4096),
        }
    }

    pub fn clear(&mut self) {
        self.table.clear();
        self.observed.clear();
        self.bins.clear();
    }
}

pub struct Scorer<'db> {
    pub db: &'db IndexedDatabase,
    pub acceptor: &'db dyn MassDiffAcceptor,
    pub fragment_tol: Tolerance,
    /// Minimum refined score to report a PSM
    pub score_cutoff: f64,
    /// Indexed score at which a peptide becomes a candidate for refinement
    pub byte_cutoff: u8,
    /// Ion series used for refined scoring
    pub ion_kinds: Vec<Kind>,
    /// Neutral mass shift used to derive complementary fragments, if
    /// complementary ions are enabled
    pub complementary_shift: Option<f64>,
    pub max_mass_that_fragment_ion_score_is_doubled: f64,
    /// Look up a single nominal mass bin per peak, and record every peptide
    /// with at least one hit instead of counting hits
    pub low_resolution: bool,
    pub report_ambiguity: bool,
    pub calculate_evalue: bool,
    pub annotate_matches: bool,
}

impl<'db> Scorer<'db> {
    /// Validate `parameters` against `db`, resolving the complementary ion
    /// shift for the configured dissociation type
    pub fn new(
        db: &'db IndexedDatabase,
        acceptor: &'db dyn MassDiffAcceptor,
        parameters: &Parameters,
    ) -> Result<Self, Error> {
        if db.peptides.is_empty() {
            return Err(Error::EmptyPeptideIndex);
        }
        if db.bins_per_dalton == 0 {
            return Err(Error::InvalidBinsPerDalton(db.bins_per_dalton));
        }
        let complementary_shift = parameters.complementary_shift()?;
        let low_resolution = parameters.dissociation.is_low_resolution();
        if low_resolution != db.nominal_mass_bins {
            return Err(Error::BinningMismatch(parameters.dissociation));
        }

        Ok(Scorer {
            db,
            acceptor,
            fragment_tol: parameters.fragment_tol,
            score_cutoff: parameters.score_cutoff,
            byte_cutoff: parameters.score_cutoff.floor().clamp(1.0, u8::MAX as f64) as u8,
            ion_kinds: parameters.dissociation.ion_kinds(),
            complementary_shift,
            max_mass_that_fragment_ion_score_is_doubled: parameters
                .max_mass_that_fragment_ion_score_is_doubled,
            low_resolution,
            report_ambiguity: parameters.report_ambiguity,
            calculate_evalue: parameters.calculate_evalue,
            annotate_matches: parameters.annotate_matches,
        })
    }

    #[inline]
    fn push_bins(&self, floor: i64, ceiling: i64, bins: &mut Vec<usize>) {
        for bin in floor.max(0)..=ceiling {
            if !self.db.index.bin(bin as usize).is_empty() {
                bins.push(bin as usize);
            }
        }
    }

    /// Collect every non-empty fragment bin within tolerance of a peak, and,
    /// if enabled, the bins its complementary fragment would fall into.
    ///
    /// Peaks closer together than the bin width would otherwise visit the
    /// same bins twice, so each peak starts no earlier than one past the
    /// previous peak's ceiling.
    pub fn candidate_bins(&self, spectrum: &ProcessedSpectrum, bins: &mut Vec<usize>) {
        bins.clear();
        if self.low_resolution {
            return self.nominal_candidate_bins(spectrum, bins);
        }
        let last = self.db.index.len() as i64 - 1;
        let bpd = self.db.bins_per_dalton;

        let mut next_floor = 0;
        for peak in &spectrum.peaks {
            let (floor, ceiling) = bin_range(self.fragment_tol.bounds(peak.mass), bpd);
            let floor = floor.max(next_floor);
            next_floor = ceiling + 1;
            let ceiling = ceiling.min(last);

            self.push_bins(floor, ceiling, bins);

            if let Some(shift) = self.complementary_shift {
                let center = ((spectrum.precursor_mass + shift) * bpd as f64).round() as i64;
                self.push_bins(center - ceiling, (center - floor).min(last), bins);
            }
        }
    }

    /// Every peak, and its complementary fragment if enabled, maps onto the
    /// one bin holding its nominal mass
    fn nominal_candidate_bins(&self, spectrum: &ProcessedSpectrum, bins: &mut Vec<usize>) {
        let last = self.db.index.len() as i64 - 1;
        let bpd = self.db.bins_per_dalton;
        let mut push = |mass: f64| {
            let bin = nominal_bin(mass, bpd);
            if (0..=last).contains(&bin) && !self.db.index.bin(bin as usize).is_empty() {
                bins.push(bin as usize);
            }
        };

        for peak in &spectrum.peaks {
            push(peak.mass);
            if let Some(shift) = self.complementary_shift {
                push(spectrum.precursor_mass + shift - peak.mass);
            }
        }
    }

    /// First pass: count fragment-bin hits for every peptide inside the
    /// precursor window, recording peptides whose count lands exactly on the
    /// cutoff while the acceptor accepts their mass.
    ///
    /// A peptide that is rejected at the moment it reaches the cutoff is
    /// never recorded, even though its score may keep growing.
    ///
    /// Low resolution scans skip the counting: every accepted peptide is
    /// recorded the first time any of its bins is hit.
    pub fn index_score(&self, spectrum: &ProcessedSpectrum, scratch: &mut Scratch) {
        scratch.clear();

        let window = PrecursorWindow::new(self.acceptor, spectrum.precursor_mass);
        if window.is_empty() {
            return;
        }

        self.candidate_bins(spectrum, &mut scratch.bins);

        // Positions in the candidate bin list (not masses!) are compared
        // against the doubling threshold
        let doubled_below =
            self.max_mass_that_fragment_ion_score_is_doubled * self.db.bins_per_dalton as f64;

        for (i, &bin) in scratch.bins.iter().enumerate() {
            let ids = self.db.index.bin(bin);
            let (lowest, highest) = self.db.admissible_range(ids, &window);

            if self.low_resolution {
                for &id in &ids[lowest..=highest] {
                    if scratch.table.mark(id)
                        && self
                            .acceptor
                            .accepts(spectrum.precursor_mass, self.db[id].monoisotopic)
                            .is_some()
                    {
                        scratch.observed.push(id);
                    }
                }
                continue;
            }
            let repeats = match self.max_mass_that_fragment_ion_score_is_doubled > 0.0
                && (i as f64) < doubled_below
            {
                true => 2,
                false => 1,
            };

            for _ in 0..repeats {
                for &id in &ids[lowest..=highest] {
                    if scratch.table.increment(id) == Some(self.byte_cutoff)
                        && self
                            .acceptor
                            .accepts(spectrum.precursor_mass, self.db[id].monoisotopic)
                            .is_some()
                    {
                        scratch.observed.push(id);
                    }
                }
            }
        }
    }

    /// Match every theoretical fragment (and complementary fragment, if
    /// enabled) to the closest peak within the fragment tolerance.
    ///
    /// Each matched fragment scores `1 + intensity / total ion current`
    pub fn fine_score(
        &self,
        spectrum: &ProcessedSpectrum,
        peptide: &Peptide,
    ) -> (f64, Vec<MatchedIon>) {
        let fragments = peptide.fragments(&self.ion_kinds);
        let mut matched = Vec::new();

        for ion in &fragments {
            if let Some(peak) =
                select_closest_peak(&spectrum.peaks, ion.monoisotopic_mass, self.fragment_tol)
            {
                matched.push(MatchedIon {
                    kind: ion.kind,
                    ordinal: ion.ordinal,
                    theoretical_mass: ion.monoisotopic_mass,
                    experimental_mass: peak.mass,
                    intensity: peak.intensity,
                    complementary: false,
                });
            }
        }

        if let Some(shift) = self.complementary_shift {
            for ion in &fragments {
                let mass = spectrum.precursor_mass + shift - ion.monoisotopic_mass;
                if let Some(peak) = select_closest_peak(&spectrum.peaks, mass, self.fragment_tol) {
                    matched.push(MatchedIon {
                        kind: ion.kind,
                        ordinal: ion.ordinal,
                        theoretical_mass: mass,
                        experimental_mass: peak.mass,
                        intensity: peak.intensity,
                        complementary: true,
                    });
                }
            }
        }

        let score = matched
            .iter()
            .map(|ion| match spectrum.total_intensity > 0.0 {
                true => 1.0 + ion.intensity / spectrum.total_intensity,
                false => 1.0,
            })
            .sum();
        (score, matched)
    }

    /// Second pass: re-score the top indexed candidates precisely, and merge
    /// them into the result slot for this scan
    pub fn assemble(
        &self,
        scan_index: usize,
        spectrum: &ProcessedSpectrum,
        scratch: &Scratch,
        slot: &mut Option<SpectralMatch>,
    ) {
        let table = &scratch.table;
        let best = match scratch.observed.iter().map(|&id| table.get(id)).max() {
            Some(best) => best,
            None => return,
        };

        for &id in scratch.observed.iter().filter(|&&id| table.get(id) == best) {
            let peptide = &self.db[id];
            let notch = match self
                .acceptor
                .accepts(spectrum.precursor_mass, peptide.monoisotopic)
            {
                Some(notch) => notch,
                None => continue,
            };

            let (score, matched_ions) = self.fine_score(spectrum, peptide);
            if score < self.score_cutoff {
                continue;
            }

            let candidate = Candidate {
                peptide: id,
                notch,
                matched_peaks: matched_ions.len(),
                matched_ions: match self.annotate_matches {
                    true => matched_ions,
                    false => Vec::new(),
                },
            };

            match slot {
                Some(psm) => psm.add_or_replace(candidate, score, self.report_ambiguity),
                None => {
                    let runner_up = scratch
                        .observed
                        .iter()
                        .map(|&other| table.get(other))
                        .filter(|&other| other < best)
                        .max()
                        .map(f64::from)
                        .unwrap_or(self.score_cutoff);
                    *slot = Some(SpectralMatch::new(
                        scan_index, spectrum, candidate, score, runner_up,
                    ));
                }
            }
        }

        if self.calculate_evalue {
            if let Some(psm) = slot {
                psm.score_histogram = Some(self.score_histogram(spectrum, table));
            }
        }
    }

    /// Number of precursor-compatible peptides at each indexed score, from 1
    /// up to the highest score observed
    pub fn score_histogram(&self, spectrum: &ProcessedSpectrum, table: &ScoringTable) -> Vec<u32> {
        let mut histogram = Vec::new();
        for (id, score) in table.hits() {
            if self
                .acceptor
                .accepts(spectrum.precursor_mass, self.db[id].monoisotopic)
                .is_none()
            {
                continue;
            }
            let score = score as usize;
            if histogram.len() < score {
                histogram.resize(score, 0);
            }
            histogram[score - 1] += 1;
        }
        histogram
    }

    /// Run both scoring passes for a single scan
    pub fn score(
        &self,
        scan_index: usize,
        spectrum: &ProcessedSpectrum,
        scratch: &mut Scratch,
        slot: &mut Option<SpectralMatch>,
    ) {
        self.index_score(spectrum, scratch);
        self.assemble(scan_index, spectrum, scratch, slot);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::acceptor::{OpenSearch, SingleAbsoluteAroundZero};
    use crate::database::{FragmentIndex, IndexedDatabase};
    use crate::ion_series::DissociationType;
    use crate::search::Builder;
    use crate::spectrum::Peak;

    fn database(bins: usize, contents: &[(usize, u32)]) -> IndexedDatabase {
        let peptides = ["GGGGGK", "PEPTIDE", "PEPTIDEK"]
            .iter()
            .map(|s| Peptide::try_from(*s).unwrap())
            .collect::<Vec<_>>();
        let mut index = vec![Vec::new(); bins];
        for &(bin, id) in contents {
            index[bin].push(PeptideIx(id));
        }
        let index = FragmentIndex::from_bins(index, &peptides).unwrap();
        IndexedDatabase::new(peptides, index, 10, DissociationType::HCD.ion_kinds()).unwrap()
    }

    fn spectrum(precursor_mass: f64, masses: &[f64]) -> ProcessedSpectrum {
        ProcessedSpectrum {
            precursor_mass,
            peaks: masses
                .iter()
                .map(|&mass| Peak {
                    mass,
                    intensity: 1.0,
                })
                .collect(),
            total_intensity: masses.len() as f64,
            ..Default::default()
        }
    }

    fn parameters(builder: Builder) -> Parameters {
        builder.make_parameters()
    }

    #[test]
    fn scoring_table() {
        let mut table = ScoringTable::new(2);
        for _ in 0..255 {
            assert!(table.increment(PeptideIx(1)).is_some());
        }
        assert_eq!(table.increment(PeptideIx(1)), None);
        assert_eq!(table.get(PeptideIx(1)), 255);
        assert_eq!(table.hits().collect::<Vec<_>>(), vec![(PeptideIx(1), 255)]);
        table.clear();
        assert_eq!(table.len(), 2);
        assert_eq!(table.hits().count(), 0);
    }

    #[test]
    fn candidate_bins_dedup() {
        // 10 bins per Dalton, every bin populated
        let db = database(100, &(0..100).map(|b| (b, 0)).collect::<Vec<_>>());
        let params = parameters(Builder {
            fragment_tol: Some(Tolerance::Da(-0.1, 0.1)),
            ..Default::default()
        });
        let acceptor = OpenSearch;
        let scorer = Scorer::new(&db, &acceptor, &params).unwrap();

        // [1.05, 1.25] -> 10..=13; [1.08, 1.28] is fully covered already;
        // [1.22, 1.42] -> 12..=15 starts at 14; [9.85, 10.05] is clamped
        let mut bins = Vec::new();
        scorer.candidate_bins(&spectrum(500.0, &[1.15, 1.18, 1.32, 9.95]), &mut bins);
        assert_eq!(bins, vec![10, 11, 12, 13, 14, 15, 98, 99]);
    }

    #[test]
    fn complementary_bins() {
        let db = database(200, &(0..200).map(|b| (b, 0)).collect::<Vec<_>>());
        let params = parameters(Builder {
            fragment_tol: Some(Tolerance::Da(-0.1, 0.1)),
            complementary_ions: Some(true),
            dissociation: Some(DissociationType::ETD),
            ..Default::default()
        });
        let acceptor = OpenSearch;
        let scorer = Scorer::new(&db, &acceptor, &params).unwrap();
        let shift = scorer.complementary_shift.unwrap();

        let precursor = 15.0;
        let mut bins = Vec::new();
        scorer.candidate_bins(&spectrum(precursor, &[4.05]), &mut bins);

        let (f, c) = (39, 42);
        let center = ((precursor + shift) * 10.0).round() as usize;
        assert_eq!(center, 160);
        let mut expected = (f..=c).collect::<Vec<_>>();
        expected.extend(center - c..=center - f);
        assert_eq!(bins, expected);

        // Complementary bins past the end of the index are clamped
        scorer.candidate_bins(&spectrum(19.3, &[0.25]), &mut bins);
        assert_eq!(bins, vec![1, 2, 3, 4, 199]);
    }

    #[test]
    fn missing_complementary_shift() {
        let db = database(10, &[]);
        let params = parameters(Builder {
            complementary_ions: Some(true),
            dissociation: Some(DissociationType::EThcD),
            ..Default::default()
        });
        let acceptor = OpenSearch;
        assert!(matches!(
            Scorer::new(&db, &acceptor, &params),
            Err(Error::MissingComplementaryShift(DissociationType::EThcD))
        ));
    }

    #[test]
    fn nominal_candidate_bins() {
        let mut db = database(200, &(0..200).map(|b| (b, 0)).collect::<Vec<_>>());
        db.nominal_mass_bins = true;
        let params = parameters(Builder {
            dissociation: Some(DissociationType::LowCID),
            ..Default::default()
        });
        let acceptor = OpenSearch;
        let scorer = Scorer::new(&db, &acceptor, &params).unwrap();
        assert!(scorer.low_resolution);

        // Both peaks round to a nominal mass of 4 (40.02 bins), no dedup
        let mut bins = Vec::new();
        scorer.candidate_bins(&spectrum(15.0, &[4.05, 4.3, 25.0]), &mut bins);
        assert_eq!(bins, vec![40, 40]);

        let params = parameters(Builder {
            dissociation: Some(DissociationType::LowCID),
            complementary_ions: Some(true),
            ..Default::default()
        });
        let scorer = Scorer::new(&db, &acceptor, &params).unwrap();
        // 15.0 - 4.05 and 15.0 - 4.3 both round to a nominal mass of 11
        scorer.candidate_bins(&spectrum(15.0, &[4.05, 4.3]), &mut bins);
        assert_eq!(bins, vec![40, 110, 40, 110]);
    }

    #[test]
    fn binning_must_match_resolution() {
        let db = database(10, &[]);
        let params = parameters(Builder {
            dissociation: Some(DissociationType::LowCID),
            ..Default::default()
        });
        let acceptor = OpenSearch;
        assert!(matches!(
            Scorer::new(&db, &acceptor, &params),
            Err(Error::BinningMismatch(DissociationType::LowCID))
        ));

        let mut db = database(10, &[]);
        db.nominal_mass_bins = true;
        assert!(matches!(
            Scorer::new(&db, &acceptor, &parameters(Builder::default())),
            Err(Error::BinningMismatch(DissociationType::HCD))
        ));
    }

    #[test]
    fn low_resolution_records_every_hit_once() {
        let mut db = database(100, &[(40, 0), (40, 1), (80, 1)]);
        db.nominal_mass_bins = true;
        // Default cutoff of 5 is never reached, but does not apply here
        let params = parameters(Builder {
            dissociation: Some(DissociationType::LowCID),
            ..Default::default()
        });
        let acceptor = OpenSearch;
        let scorer = Scorer::new(&db, &acceptor, &params).unwrap();

        let mut scratch = Scratch::new(&db);
        scorer.index_score(&spectrum(800.0, &[4.05, 4.3, 8.0]), &mut scratch);
        assert_eq!(scratch.bins, vec![40, 40, 80]);
        assert_eq!(
            scratch.table.hits().collect::<Vec<_>>(),
            vec![(PeptideIx(0), 1), (PeptideIx(1), 1)]
        );
        assert_eq!(scratch.observed, vec![PeptideIx(0), PeptideIx(1)]);

        let mut table = ScoringTable::new(1);
        assert!(table.mark(PeptideIx(0)));
        assert!(!table.mark(PeptideIx(0)));
        assert_eq!(table.get(PeptideIx(0)), 1);
    }

    #[test]
    fn index_score_is_idempotent() {
        let db = database(
            100,
            &[(10, 0), (10, 1), (10, 2), (20, 1), (20, 2), (30, 2)],
        );
        let params = parameters(Builder {
            fragment_tol: Some(Tolerance::Da(-0.01, 0.01)),
            score_cutoff: Some(2.0),
            ..Default::default()
        });
        let acceptor = OpenSearch;
        let scorer = Scorer::new(&db, &acceptor, &params).unwrap();
        let query = spectrum(800.0, &[1.05, 2.05, 3.05]);

        let mut scratch = Scratch::new(&db);
        scorer.index_score(&query, &mut scratch);
        let first = (
            scratch.table.hits().collect::<Vec<_>>(),
            scratch.observed.clone(),
        );
        assert_eq!(
            first.0,
            vec![(PeptideIx(0), 1), (PeptideIx(1), 2), (PeptideIx(2), 3)]
        );
        // Recorded once, when passing through the cutoff in bin 20
        assert_eq!(first.1, vec![PeptideIx(1), PeptideIx(2)]);

        scorer.index_score(&query, &mut scratch);
        assert_eq!(first.0, scratch.table.hits().collect::<Vec<_>>());
        assert_eq!(first.1, scratch.observed);
    }

    #[test]
    fn precursor_window_limits_scoring() {
        let db = database(100, &[(10, 0), (10, 1), (10, 2)]);
        let params = parameters(Builder {
            fragment_tol: Some(Tolerance::Da(-0.01, 0.01)),
            score_cutoff: Some(1.0),
            ..Default::default()
        });
        let acceptor = SingleAbsoluteAroundZero { da: 0.5 };
        let scorer = Scorer::new(&db, &acceptor, &params).unwrap();

        let mut scratch = Scratch::new(&db);
        scorer.index_score(&spectrum(db.peptides[1].monoisotopic, &[1.05]), &mut scratch);
        assert_eq!(scratch.observed, vec![PeptideIx(1)]);
        // Out of window peptides may be visited, but never recorded
        assert_eq!(scratch.table.get(PeptideIx(2)), 0);
    }

    #[test]
    fn score_histogram_counts() {
        let db = database(100, &[(10, 0), (10, 1), (10, 2), (20, 0), (20, 1)]);
        let params = parameters(Builder {
            fragment_tol: Some(Tolerance::Da(-0.01, 0.01)),
            ..Default::default()
        });
        let acceptor = OpenSearch;
        let scorer = Scorer::new(&db, &acceptor, &params).unwrap();
        let query = spectrum(db.peptides[1].monoisotopic, &[1.05, 2.05]);

        let mut scratch = Scratch::new(&db);
        scorer.index_score(&query, &mut scratch);
        // GGGGGK and PEPTIDE are hit twice, PEPTIDEK once
        assert_eq!(scorer.score_histogram(&query, &scratch.table), vec![1, 2]);

        // GGGGGK is too light to be within 200 Da of PEPTIDE
        let acceptor = SingleAbsoluteAroundZero { da: 200.0 };
        let scorer = Scorer::new(&db, &acceptor, &params).unwrap();
        assert_eq!(scorer.score_histogram(&query, &scratch.table), vec![1, 1]);

        assert!(scorer
            .score_histogram(&query, &ScoringTable::new(3))
            .is_empty());
    }

    #[test]
    fn doubling_uses_bin_list_position() {
        let db = database(100, &[(10, 1), (50, 1)]);
        let params = parameters(Builder {
            fragment_tol: Some(Tolerance::Da(-0.01, 0.01)),
            max_mass_that_fragment_ion_score_is_doubled: Some(0.1),
            ..Default::default()
        });
        let acceptor = OpenSearch;
        let scorer = Scorer::new(&db, &acceptor, &params).unwrap();

        // Threshold 0.1 Da * 10 bins/Da => only the first candidate bin counts
        // twice, even though bin 50 is 5 Da
        let mut scratch = Scratch::new(&db);
        scorer.index_score(&spectrum(800.0, &[1.05, 5.05]), &mut scratch);
        assert_eq!(scratch.bins, vec![10, 50]);
        assert_eq!(scratch.table.get(PeptideIx(1)), 3);
    }

    #[test]
    fn fine_score_and_runner_up() {
        let peptides = ["GGGGGK", "PEPTIDE", "EDITPEP"]
            .iter()
            .map(|s| Peptide::try_from(*s).unwrap())
            .collect::<Vec<_>>();
        let masses = peptides[1]
            .fragments(&[Kind::B, Kind::Y])
            .iter()
            .map(|ion| ion.monoisotopic_mass)
            .collect::<Vec<_>>();
        let bins = 10_000;
        let mut index = vec![Vec::new(); bins];
        for (id, peptide) in peptides.iter().enumerate() {
            for ion in peptide.fragments(&[Kind::B, Kind::Y]) {
                let bin = (ion.monoisotopic_mass * 10.0).floor() as usize;
                if !index[bin].contains(&PeptideIx(id as u32)) {
                    index[bin].push(PeptideIx(id as u32));
                }
            }
        }
        for bin in index.iter_mut() {
            bin.sort_by(|a, b| {
                peptides[a.0 as usize]
                    .monoisotopic
                    .total_cmp(&peptides[b.0 as usize].monoisotopic)
            });
        }
        let index = FragmentIndex::from_bins(index, &peptides).unwrap();
        let db = IndexedDatabase::new(peptides, index, 10, vec![Kind::B, Kind::Y]).unwrap();

        let params = parameters(Builder {
            fragment_tol: Some(Tolerance::Da(-0.02, 0.02)),
            score_cutoff: Some(2.0),
            ..Default::default()
        });
        let acceptor = OpenSearch;
        let scorer = Scorer::new(&db, &acceptor, &params).unwrap();
        let query = spectrum(db.peptides[1].monoisotopic, &masses);

        let (score, matched) = scorer.fine_score(&query, &db.peptides[1]);
        assert_eq!(matched.len(), 12);
        assert!((score - 13.0).abs() < 1e-9);

        let mut scratch = Scratch::new(&db);
        let mut slot = None;
        scorer.score(0, &query, &mut scratch, &mut slot);
        let psm = slot.unwrap();
        assert_eq!(psm.best().peptide, PeptideIx(1));
        assert!((psm.score - 13.0).abs() < 1e-9);
        assert!(psm.runner_up_score < scratch.table.get(PeptideIx(1)) as f64);
        assert!(psm.runner_up_score >= 2.0);
        assert!(psm.score_histogram.is_none());
        assert!(psm.best().matched_ions.is_empty());
        assert_eq!(psm.best().matched_peaks, 12);
    }
}
