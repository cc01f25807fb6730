use serde::{Deserialize, Serialize};

use crate::database::binary_search_slice;
use crate::mass::{mz_to_mass, Tolerance, PROTON};

/// A charge-less peak at monoisotopic mass
#[derive(PartialEq, PartialOrd, Copy, Clone, Default, Debug, Serialize, Deserialize)]
pub struct Peak {
    pub mass: f64,
    pub intensity: f64,
}

/// A centroided MS2 spectrum, prior to any processing
#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawSpectrum {
    /// Scan ID
    pub id: String,
    /// Retention time
    #[serde(default)]
    pub scan_start_time: f64,
    /// Selected ion m/z
    pub precursor_mz: f64,
    /// Selected ion charge
    pub precursor_charge: u8,
    /// Fragment m/z values
    pub mz: Vec<f64>,
    /// Fragment intensities, parallel to `mz`
    pub intensity: Vec<f64>,
}

pub struct SpectrumProcessor {
    pub take_top_n: usize,
    pub max_fragment_mz: f64,
    pub min_fragment_mz: f64,
    pub file_id: usize,
}

#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessedSpectrum {
    /// Scan ID
    pub id: String,
    /// File ID
    pub file_id: usize,
    /// Retention time
    pub scan_start_time: f64,
    /// Neutral monoisotopic precursor mass
    pub precursor_mass: f64,
    pub precursor_charge: u8,
    /// MS peaks, sorted by mass in ascending order
    pub peaks: Vec<Peak>,
    /// Total ion current
    pub total_intensity: f64,
}

/// Binary search followed by linear search to select the closest peak to `mass` within `tolerance` window
pub fn select_closest_peak(peaks: &[Peak], mass: f64, tolerance: Tolerance) -> Option<&Peak> {
    let (lo, hi) = tolerance.bounds(mass);
    let (i, j) = binary_search_slice(peaks, |peak, query| peak.mass.total_cmp(query), lo, hi);

    let mut best_peak = None;
    let mut min_eps = f64::MAX;
    for peak in peaks[i..j]
        .iter()
        .filter(|peak| peak.mass >= lo && peak.mass <= hi)
    {
        let eps = (peak.mass - mass).abs();
        if eps < min_eps {
            min_eps = eps;
            best_peak = Some(peak);
        }
    }
    best_peak
}

/// Order spectra by ascending precursor mass, keeping the relative order of
/// spectra with identical precursor masses
pub fn sort_by_precursor_mass(spectra: &mut [ProcessedSpectrum]) {
    spectra.sort_by(|a, b| a.precursor_mass.total_cmp(&b.precursor_mass));
}

impl SpectrumProcessor {
    /// Create a new [`SpectrumProcessor`]
    ///
    /// # Arguments
    /// * `take_top_n`: Keep only the top N most intense peaks from the spectrum
    /// * `min_fragment_mz`: Keep only fragments >= this m/z
    /// * `max_fragment_mz`: Keep only fragments <= this m/z
    /// * `file_id`: Store this value in all [`ProcessedSpectrum`]
    pub fn new(
        take_top_n: usize,
        min_fragment_mz: f64,
        max_fragment_mz: f64,
        file_id: usize,
    ) -> Self {
        Self {
            take_top_n,
            min_fragment_mz,
            max_fragment_mz,
            file_id,
        }
    }

    pub fn process(&self, spectrum: RawSpectrum) -> ProcessedSpectrum {
        if spectrum.mz.len() != spectrum.intensity.len() {
            log::warn!(
                "scan {}: {} m/z values but {} intensities, ignoring unpaired values",
                spectrum.id,
                spectrum.mz.len(),
                spectrum.intensity.len()
            );
        }

        // Fragments are assumed to be singly charged
        let mut peaks = spectrum
            .mz
            .iter()
            .zip(spectrum.intensity.iter())
            .filter(|&(mz, _)| *mz >= self.min_fragment_mz && *mz <= self.max_fragment_mz)
            .map(|(mz, &intensity)| Peak {
                mass: mz - PROTON,
                intensity,
            })
            .collect::<Vec<_>>();
        peaks.sort_by(|a, b| b.intensity.total_cmp(&a.intensity));
        peaks.truncate(self.take_top_n);

        peaks.sort_by(|a, b| a.mass.total_cmp(&b.mass));
        let total_intensity = peaks.iter().map(|peak| peak.intensity).sum::<f64>();

        let charge = match spectrum.precursor_charge {
            0 => {
                log::warn!("scan {}: missing precursor charge, assuming 1", spectrum.id);
                1
            }
            z => z,
        };

        ProcessedSpectrum {
            id: spectrum.id,
            file_id: self.file_id,
            scan_start_time: spectrum.scan_start_time,
            precursor_mass: mz_to_mass(spectrum.precursor_mz, charge),
            precursor_charge: charge,
            peaks,
            total_intensity,
        }
    }
}

impl Default for SpectrumProcessor {
    fn default() -> Self {
        SpectrumProcessor::new(200, 0.0, 2000.0, 0)
    }
}
