use crate::acceptor::PrecursorWindow;
use crate::ion_series::{DissociationType, Kind};
use crate::modification::{validate_mods, validate_var_mods};
use crate::peptide::{Peptide, PeptideSource};
use crate::Error;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

pub const DEFAULT_BINS_PER_DALTON: u32 = 1000;

#[derive(Deserialize, Serialize, Default, Clone, Debug)]
/// Parameters used for generating the fragment index
pub struct Builder {
    /// Number of fragment bins per Dalton
    pub bins_per_dalton: Option<u32>,
    /// Minimum (neutral) fragment mass that will be stored in the index
    pub fragment_min_mass: Option<f64>,
    /// Maximum (neutral) fragment mass that will be stored in the index
    pub fragment_max_mass: Option<f64>,
    /// Minimum peptide monoisotopic mass that will be fragmented
    pub peptide_min_mass: Option<f64>,
    /// Maximum peptide monoisotopic mass that will be fragmented
    pub peptide_max_mass: Option<f64>,
    /// Which kind of fragment ions to index (a, b, c, x, y, z)
    pub ion_kinds: Option<Vec<Kind>>,
    /// Minimum ion ordinal to be indexed: 2 will remove b1/y1 ions,
    /// 3 will remove b1/b2/y1/y2 ions, etc
    pub min_ion_index: Option<usize>,
    /// Static modifications to add to matching amino acids
    pub static_mods: Option<HashMap<String, f64>>,
    /// Variable modifications to add to matching amino acids
    pub variable_mods: Option<HashMap<String, Vec<f64>>>,
    /// Snap fragment masses onto the nominal mass grid before binning, for
    /// low resolution (ion trap) fragment spectra
    pub nominal_mass_bins: Option<bool>,
}

impl Builder {
    pub fn make_parameters(self) -> Parameters {
        Parameters {
            bins_per_dalton: self.bins_per_dalton.unwrap_or(DEFAULT_BINS_PER_DALTON),
            fragment_min_mass: self.fragment_min_mass.unwrap_or(150.0),
            fragment_max_mass: self.fragment_max_mass.unwrap_or(2000.0),
            peptide_min_mass: self.peptide_min_mass.unwrap_or(0.0),
            peptide_max_mass: self.peptide_max_mass.unwrap_or(f64::MAX),
            ion_kinds: self
                .ion_kinds
                .unwrap_or_else(|| DissociationType::HCD.ion_kinds()),
            min_ion_index: self.min_ion_index.unwrap_or(1),
            static_mods: validate_mods(self.static_mods),
            variable_mods: validate_var_mods(self.variable_mods),
            nominal_mass_bins: self.nominal_mass_bins.unwrap_or(false),
        }
    }

    /// Index the ion series and fragment binning used by `dissociation`,
    /// unless they were explicitly configured
    pub fn update_dissociation(&mut self, dissociation: DissociationType) {
        if self.ion_kinds.is_none() {
            self.ion_kinds = Some(dissociation.ion_kinds());
        }
        if self.nominal_mass_bins.is_none() {
            self.nominal_mass_bins = Some(dissociation.is_low_resolution());
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct Parameters {
    pub bins_per_dalton: u32,
    pub fragment_min_mass: f64,
    pub fragment_max_mass: f64,
    pub peptide_min_mass: f64,
    pub peptide_max_mass: f64,
    pub ion_kinds: Vec<Kind>,
    pub min_ion_index: usize,
    static_mods: HashMap<char, f64>,
    variable_mods: Vec<(char, f64)>,
    pub nominal_mass_bins: bool,
}

impl Parameters {
    fn modify(&self, sources: &[PeptideSource]) -> Vec<Peptide> {
        log::trace!("modifying peptides");
        let mut peptides = sources
            .par_iter()
            .filter_map(|source| match Peptide::try_from(source) {
                Ok(peptide) => Some(peptide),
                Err(c) => {
                    log::warn!(
                        "skipping peptide `{}`: invalid residue '{}'",
                        source.sequence,
                        c
                    );
                    None
                }
            })
            .flat_map_iter(|peptide| {
                peptide
                    .apply(&self.variable_mods, &self.static_mods)
                    .into_iter()
                    .filter(|peptide| {
                        peptide.monoisotopic >= self.peptide_min_mass
                            && peptide.monoisotopic <= self.peptide_max_mass
                    })
            })
            .collect::<Vec<_>>();

        log::trace!("sorting and deduplicating peptides");

        // Identical sequences must end up adjacent for `dedup_by`, even when
        // an isobaric peptide (I/L) shares their mass
        peptides.par_sort_unstable_by(|a, b| {
            a.monoisotopic
                .total_cmp(&b.monoisotopic)
                .then_with(|| {
                    a.sequence
                        .partial_cmp(&b.sequence)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.nterm.partial_cmp(&b.nterm).unwrap_or(Ordering::Equal))
                .then_with(|| a.cterm.partial_cmp(&b.cterm).unwrap_or(Ordering::Equal))
                .then_with(|| a.decoy.cmp(&b.decoy))
        });
        peptides.dedup_by(|remove, keep| {
            if remove.sequence == keep.sequence
                && remove.nterm == keep.nterm
                && remove.cterm == keep.cterm
            {
                // Shared between a target and a decoy: call it a target
                keep.decoy &= remove.decoy;
                true
            } else {
                false
            }
        });
        peptides
    }

    pub fn build(self, sources: &[PeptideSource]) -> Result<IndexedDatabase, Error> {
        if self.bins_per_dalton == 0 {
            return Err(Error::InvalidBinsPerDalton(self.bins_per_dalton));
        }

        let peptides = self.modify(sources);
        if peptides.is_empty() {
            return Err(Error::EmptyPeptideIndex);
        }
        log::trace!("generating fragments");

        // All theoretical fragments are neutral masses - the z=1 assumption
        // is applied to experimental peaks during spectrum processing
        let mut fragments = peptides
            .par_iter()
            .enumerate()
            .flat_map_iter(|(idx, peptide)| {
                peptide
                    .fragments(&self.ion_kinds)
                    .into_iter()
                    .filter(|ion| {
                        ion.ordinal >= self.min_ion_index
                            && ion.monoisotopic_mass >= self.fragment_min_mass
                            && ion.monoisotopic_mass <= self.fragment_max_mass
                    })
                    .map(move |ion| {
                        let bin = match self.nominal_mass_bins {
                            true => nominal_bin(ion.monoisotopic_mass, self.bins_per_dalton),
                            false => mass_to_bin(ion.monoisotopic_mass, self.bins_per_dalton),
                        };
                        (bin as usize, PeptideIx(idx as u32))
                    })
            })
            .collect::<Vec<_>>();
        log::trace!("finalizing index");

        // Peptides are already sorted by mass, so sorting each bin by
        // `PeptideIx` also sorts it by peptide mass
        fragments.par_sort_unstable();
        fragments.dedup();

        let bins = mass_to_bin(self.fragment_max_mass, self.bins_per_dalton) as usize + 1;
        let index = FragmentIndex::from_sorted(bins, &fragments);

        log::info!(
            "indexed {} fragments from {} peptides into {} bins",
            index.size(),
            peptides.len(),
            index.len()
        );

        Ok(IndexedDatabase {
            peptides,
            index,
            bins_per_dalton: self.bins_per_dalton,
            ion_kinds: self.ion_kinds,
            nominal_mass_bins: self.nominal_mass_bins,
        })
    }
}

#[derive(Hash, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PeptideIx(pub u32);

/// Inverted index from fragment bin to the peptides that produce a fragment
/// in that bin, stored in compressed (offsets + ids) form.
///
/// # Invariants
///
/// * `offsets.len() == bins + 1`
/// * ids within each bin are sorted ascending by peptide monoisotopic mass
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FragmentIndex {
    offsets: Vec<usize>,
    ids: Vec<PeptideIx>,
}

impl FragmentIndex {
    /// Build from `(bin, peptide)` pairs already sorted by bin, then by mass
    fn from_sorted(bins: usize, fragments: &[(usize, PeptideIx)]) -> Self {
        let mut offsets = Vec::with_capacity(bins + 1);
        let mut ids = Vec::with_capacity(fragments.len());
        offsets.push(0);
        let mut iter = fragments.iter().peekable();
        for bin in 0..bins {
            while let Some((_, id)) = iter.next_if(|(b, _)| *b == bin) {
                ids.push(*id);
            }
            offsets.push(ids.len());
        }
        FragmentIndex { offsets, ids }
    }

    /// Create an index from externally built bins, checking that every id
    /// refers to a peptide and that each bin is sorted by peptide mass
    pub fn from_bins(bins: Vec<Vec<PeptideIx>>, peptides: &[Peptide]) -> Result<Self, Error> {
        let mut offsets = Vec::with_capacity(bins.len() + 1);
        let mut ids = Vec::with_capacity(bins.iter().map(Vec::len).sum());
        offsets.push(0);
        for (bin, contents) in bins.into_iter().enumerate() {
            let mut last = f64::NEG_INFINITY;
            for id in &contents {
                let peptide = peptides
                    .get(id.0 as usize)
                    .ok_or(Error::PeptideOutOfRange { bin, id: id.0 })?;
                if peptide.monoisotopic < last {
                    return Err(Error::UnsortedBin { bin });
                }
                last = peptide.monoisotopic;
            }
            ids.extend(contents);
            offsets.push(ids.len());
        }
        Ok(FragmentIndex { offsets, ids })
    }

    /// Number of bins
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of indexed fragments
    pub fn size(&self) -> usize {
        self.ids.len()
    }

    /// Peptides with a fragment in `bin`, sorted by peptide mass
    #[inline]
    pub fn bin(&self, bin: usize) -> &[PeptideIx] {
        &self.ids[self.offsets[bin]..self.offsets[bin + 1]]
    }
}

pub struct IndexedDatabase {
    pub peptides: Vec<Peptide>,
    pub index: FragmentIndex,
    pub bins_per_dalton: u32,
    pub ion_kinds: Vec<Kind>,
    /// Fragments were binned on the nominal mass grid
    pub nominal_mass_bins: bool,
}

impl IndexedDatabase {
    /// Assemble a database from a pre-sorted peptide list and an externally
    /// built fragment index
    pub fn new(
        peptides: Vec<Peptide>,
        index: FragmentIndex,
        bins_per_dalton: u32,
        ion_kinds: Vec<Kind>,
    ) -> Result<Self, Error> {
        if bins_per_dalton == 0 {
            return Err(Error::InvalidBinsPerDalton(bins_per_dalton));
        }
        if peptides.is_empty() {
            return Err(Error::EmptyPeptideIndex);
        }
        Ok(IndexedDatabase {
            peptides,
            index,
            bins_per_dalton,
            ion_kinds,
            nominal_mass_bins: false,
        })
    }

    /// Inclusive `[lowest, highest]` positions within a bin that need to be
    /// scored for peptides inside `window`.
    ///
    /// The lower bound is an approximate seed that may undershoot by a few
    /// positions. The upper bound is seeded the same way and then walked
    /// forward over every peptide lighter than `window.highest`.
    pub fn admissible_range(&self, bin: &[PeptideIx], window: &PrecursorWindow) -> (usize, usize) {
        admissible_range(bin, |id| self[*id].monoisotopic, window)
    }
}

impl std::ops::Index<PeptideIx> for IndexedDatabase {
    type Output = Peptide;

    fn index(&self, index: PeptideIx) -> &Self::Output {
        &self.peptides[index.0 as usize]
    }
}

/// Map a mass onto its fragment bin
#[inline]
pub fn mass_to_bin(mass: f64, bins_per_dalton: u32) -> i64 {
    (mass * bins_per_dalton as f64).floor() as i64
}

/// Spacing of the nominal (integer-like) mass grid that low resolution
/// fragment masses are rounded onto
pub const NOMINAL_MASS_SPACING: f64 = 1.0005079;

/// Round a mass onto the nominal mass grid, then map it onto its fragment bin
#[inline]
pub fn nominal_bin(mass: f64, bins_per_dalton: u32) -> i64 {
    mass_to_bin(
        (mass / NOMINAL_MASS_SPACING).round() * NOMINAL_MASS_SPACING,
        bins_per_dalton,
    )
}

/// `[floor(min * bpd), ceil(max * bpd)]` for a tolerance window `(min, max)`.
/// The result is not clamped to the bounds of any index.
#[inline]
pub fn bin_range((min, max): (f64, f64), bins_per_dalton: u32) -> (i64, i64) {
    let bpd = bins_per_dalton as f64;
    ((min * bpd).floor() as i64, (max * bpd).ceil() as i64)
}

/// Approximate binary search over a slice sorted ascending by `mass`.
///
/// Narrows `[l, r]` until fewer than two elements remain, then steps back
/// once. The returned index never lies past the first element whose mass is
/// `>= target`, but may fall short of it by a couple of positions. An empty
/// slice yields 0.
pub fn approximate_search<T, F>(slice: &[T], mass: F, target: f64) -> usize
where
    F: Fn(&T) -> f64,
{
    let mut m = 0isize;
    let mut l = 0isize;
    let mut r = slice.len() as isize - 1;
    while l <= r {
        m = l + (r - l) / 2;
        if r - l < 2 {
            break;
        }
        if mass(&slice[m as usize]) < target {
            l = m + 1;
        } else {
            r = m - 1;
        }
    }
    if m > 0 {
        m -= 1;
    }
    m as usize
}

/// Inclusive index range of a non-empty, mass-sorted slice covering every
/// element with `window.lowest <= mass < window.highest`. Infinite sides of
/// the window skip the search on that side.
pub fn admissible_range<T, F>(slice: &[T], mass: F, window: &PrecursorWindow) -> (usize, usize)
where
    F: Fn(&T) -> f64,
{
    let lowest = match window.bounded_below() {
        true => approximate_search(slice, &mass, window.lowest),
        false => 0,
    };

    let mut highest = slice.len().saturating_sub(1);
    if window.bounded_above() {
        highest = approximate_search(slice, &mass, window.highest);
        for j in highest..slice.len() {
            if mass(&slice[j]) < window.highest {
                highest = j;
            } else {
                break;
            }
        }
    }
    (lowest, highest)
}

/// Return the widest `left` and `right` indices into a `slice` (sorted by the
/// function `key`) such that all values between `low` and `high` are
/// contained in `slice[left..right]`
///
/// # Invariants
///
/// * `slice[left] <= low || left == 0`
/// * `slice[right] <= high && (slice[right+1] > high || right == slice.len())`
/// * `0 <= left <= right <= slice.len()`
#[inline]
pub fn binary_search_slice<T, F, S>(slice: &[T], key: F, low: S, high: S) -> (usize, usize)
where
    F: Fn(&T, &S) -> Ordering,
{
    let left_idx = match slice.binary_search_by(|a| key(a, &low)) {
        Ok(idx) | Err(idx) => {
            let mut idx = idx.saturating_sub(1);
            while idx > 0 && key(&slice[idx], &low) != Ordering::Less {
                idx -= 1;
            }
            idx
        }
    };

    let right_idx = match slice[left_idx..].binary_search_by(|a| key(a, &high)) {
        Ok(idx) | Err(idx) => {
            let mut idx = idx + left_idx;
            while idx < slice.len() && key(&slice[idx], &high) != Ordering::Greater {
                idx = idx.saturating_add(1);
            }
            idx.min(slice.len())
        }
    };
    (left_idx, right_idx)
}
