//! Precursor mass acceptance policies
//!
//! Every acceptor applies its tolerance to the *observed* precursor mass, and
//! inverts it to find which theoretical peptide masses could have produced
//! that observation. A peptide can be accepted under one of several notches
//! (allowed mass shifts); the index of the matching notch is reported back so
//! that downstream consumers can tell e.g. a +1 Da isotope error apart from an
//! exact match.

use serde::{Deserialize, Serialize};

use crate::mass::{Tolerance, NEUTRON};

/// A window of admissible peptide masses for a single notch
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AllowedInterval {
    pub notch: usize,
    pub min: f64,
    pub max: f64,
}

pub trait MassDiffAcceptor: Send + Sync {
    /// Return the notch under which `candidate` explains `observed`, if any
    fn accepts(&self, observed: f64, candidate: f64) -> Option<usize>;

    /// Admissible theoretical peptide mass intervals (one per notch) for an
    /// observed precursor mass
    fn allowed_intervals(&self, observed: f64) -> Vec<AllowedInterval>;

    fn name(&self) -> String;
}

/// Smallest/largest theoretical peptide mass that any notch of an acceptor
/// could map back onto an observed precursor mass
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PrecursorWindow {
    pub lowest: f64,
    pub highest: f64,
}

impl PrecursorWindow {
    pub fn new<A: MassDiffAcceptor + ?Sized>(acceptor: &A, observed: f64) -> Self {
        let intervals = acceptor.allowed_intervals(observed);
        if intervals.is_empty() {
            // Nothing can be accepted: an empty window
            return PrecursorWindow {
                lowest: f64::INFINITY,
                highest: f64::NEG_INFINITY,
            };
        }
        let lowest = intervals
            .iter()
            .map(|i| i.min)
            .fold(f64::INFINITY, f64::min);
        let highest = intervals
            .iter()
            .map(|i| i.max)
            .fold(f64::NEG_INFINITY, f64::max);
        PrecursorWindow { lowest, highest }
    }

    pub fn bounded_below(&self) -> bool {
        self.lowest != f64::NEG_INFINITY
    }

    pub fn bounded_above(&self) -> bool {
        self.highest != f64::INFINITY
    }

    pub fn is_empty(&self) -> bool {
        self.lowest > self.highest
    }
}

/// Single notch: the peptide mass must fall within `ppm` parts-per-million
/// of the observed precursor mass
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SinglePpmAroundZero {
    pub ppm: f64,
}

impl MassDiffAcceptor for SinglePpmAroundZero {
    fn accepts(&self, observed: f64, candidate: f64) -> Option<usize> {
        match Tolerance::Ppm(-self.ppm, self.ppm).contains(observed, candidate) {
            true => Some(0),
            false => None,
        }
    }

    fn allowed_intervals(&self, observed: f64) -> Vec<AllowedInterval> {
        let (min, max) = Tolerance::Ppm(-self.ppm, self.ppm).bounds(observed);
        vec![AllowedInterval { notch: 0, min, max }]
    }

    fn name(&self) -> String {
        format!("{}ppmAroundZero", self.ppm)
    }
}

/// Single notch: the peptide mass must fall within `da` Daltons of the
/// observed precursor mass
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SingleAbsoluteAroundZero {
    pub da: f64,
}

impl MassDiffAcceptor for SingleAbsoluteAroundZero {
    fn accepts(&self, observed: f64, candidate: f64) -> Option<usize> {
        match (observed - candidate).abs() <= self.da {
            true => Some(0),
            false => None,
        }
    }

    fn allowed_intervals(&self, observed: f64) -> Vec<AllowedInterval> {
        vec![AllowedInterval {
            notch: 0,
            min: observed - self.da,
            max: observed + self.da,
        }]
    }

    fn name(&self) -> String {
        format!("{}daltonsAroundZero", self.da)
    }
}

/// A discrete set of allowed mass shifts (observed - theoretical), each with
/// the same tolerance. Notch `i` corresponds to `shifts[i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct DotMassDiffAcceptor {
    pub shifts: Vec<f64>,
    pub tolerance: Tolerance,
}

impl DotMassDiffAcceptor {
    /// Notches for C13 isotope errors `min..=max`, e.g. `-1..=3`
    pub fn isotope_errors(min: i8, max: i8, tolerance: Tolerance) -> Self {
        DotMassDiffAcceptor {
            shifts: (min..=max).map(|i| i as f64 * NEUTRON).collect(),
            tolerance,
        }
    }
}

impl MassDiffAcceptor for DotMassDiffAcceptor {
    fn accepts(&self, observed: f64, candidate: f64) -> Option<usize> {
        let (lo, hi) = self.tolerance.bounds(observed);
        self.shifts.iter().position(|shift| {
            let shifted = candidate + shift;
            shifted >= lo && shifted <= hi
        })
    }

    fn allowed_intervals(&self, observed: f64) -> Vec<AllowedInterval> {
        let (lo, hi) = self.tolerance.bounds(observed);
        self.shifts
            .iter()
            .enumerate()
            .map(|(notch, shift)| AllowedInterval {
                notch,
                min: lo - shift,
                max: hi - shift,
            })
            .collect()
    }

    fn name(&self) -> String {
        format!(
            "{:?}@{}",
            self.tolerance,
            self.shifts
                .iter()
                .map(|s| format!("{:.4}", s))
                .collect::<Vec<_>>()
                .join(",")
        )
    }
}

/// Continuous ranges of allowed mass shifts (observed - theoretical).
/// Notch `i` corresponds to `intervals[i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct IntervalMassDiffAcceptor {
    pub intervals: Vec<(f64, f64)>,
}

impl MassDiffAcceptor for IntervalMassDiffAcceptor {
    fn accepts(&self, observed: f64, candidate: f64) -> Option<usize> {
        let delta = observed - candidate;
        self.intervals
            .iter()
            .position(|&(lo, hi)| delta >= lo && delta <= hi)
    }

    fn allowed_intervals(&self, observed: f64) -> Vec<AllowedInterval> {
        self.intervals
            .iter()
            .enumerate()
            .map(|(notch, &(lo, hi))| AllowedInterval {
                notch,
                min: observed - hi,
                max: observed - lo,
            })
            .collect()
    }

    fn name(&self) -> String {
        format!("{:?}", self.intervals)
    }
}

/// Accept every peptide regardless of precursor mass
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct OpenSearch;

impl MassDiffAcceptor for OpenSearch {
    fn accepts(&self, _: f64, _: f64) -> Option<usize> {
        Some(0)
    }

    fn allowed_intervals(&self, _: f64) -> Vec<AllowedInterval> {
        vec![AllowedInterval {
            notch: 0,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }]
    }

    fn name(&self) -> String {
        "OpenSearch".into()
    }
}

/// Deserializable description of a [`MassDiffAcceptor`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AcceptorConfig {
    Ppm {
        ppm: f64,
    },
    Absolute {
        da: f64,
    },
    Dot {
        shifts: Vec<f64>,
        tolerance: Tolerance,
    },
    IsotopeErrors {
        min: i8,
        max: i8,
        tolerance: Tolerance,
    },
    Interval {
        intervals: Vec<(f64, f64)>,
    },
    Open,
}

impl Default for AcceptorConfig {
    fn default() -> Self {
        AcceptorConfig::Ppm { ppm: 5.0 }
    }
}

impl AcceptorConfig {
    pub fn build(self) -> Box<dyn MassDiffAcceptor> {
        match self {
            AcceptorConfig::Ppm { ppm } => Box::new(SinglePpmAroundZero { ppm }),
            AcceptorConfig::Absolute { da } => Box::new(SingleAbsoluteAroundZero { da }),
            AcceptorConfig::Dot { shifts, tolerance } => {
                Box::new(DotMassDiffAcceptor { shifts, tolerance })
            }
            AcceptorConfig::IsotopeErrors {
                min,
                max,
                tolerance,
            } => Box::new(DotMassDiffAcceptor::isotope_errors(min, max, tolerance)),
            AcceptorConfig::Interval { intervals } => {
                Box::new(IntervalMassDiffAcceptor { intervals })
            }
            AcceptorConfig::Open => Box::new(OpenSearch),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn single_notch() {
        let acceptor = SingleAbsoluteAroundZero { da: 0.5 };
        assert_eq!(acceptor.accepts(1000.0, 1000.4), Some(0));
        assert_eq!(acceptor.accepts(1000.0, 1000.6), None);
        let window = PrecursorWindow::new(&acceptor, 1000.0);
        assert_eq!(
            window,
            PrecursorWindow {
                lowest: 999.5,
                highest: 1000.5
            }
        );
        assert!(window.bounded_below() && window.bounded_above());

        let acceptor = SinglePpmAroundZero { ppm: 10.0 };
        assert_eq!(acceptor.accepts(1000.0, 1000.009), Some(0));
        assert_eq!(acceptor.accepts(1000.0, 1000.011), None);
        assert_eq!(acceptor.name(), "10ppmAroundZero");
    }

    #[test]
    fn dot_notches() {
        let acceptor = DotMassDiffAcceptor::isotope_errors(0, 2, Tolerance::Da(-0.01, 0.01));
        assert_eq!(acceptor.accepts(1000.0, 1000.0), Some(0));
        assert_eq!(acceptor.accepts(1000.0 + NEUTRON, 1000.0), Some(1));
        assert_eq!(acceptor.accepts(1000.0 + 2.0 * NEUTRON, 1000.0), Some(2));
        assert_eq!(acceptor.accepts(1000.5, 1000.0), None);

        // Every candidate accepted by a notch must lie in that notch's interval
        let observed = 1002.0;
        for interval in acceptor.allowed_intervals(observed) {
            let mid = (interval.min + interval.max) / 2.0;
            assert_eq!(acceptor.accepts(observed, mid), Some(interval.notch));
        }

        let window = PrecursorWindow::new(&acceptor, observed);
        assert!((window.lowest - (observed - 0.01 - 2.0 * NEUTRON)).abs() < 1e-9);
        assert!((window.highest - (observed + 0.01)).abs() < 1e-9);
    }

    #[test]
    fn interval_notches() {
        let acceptor = IntervalMassDiffAcceptor {
            intervals: vec![(-0.1, 0.1), (15.9, 16.1)],
        };
        assert_eq!(acceptor.accepts(1016.0, 1000.0), Some(1));
        assert_eq!(acceptor.accepts(1000.05, 1000.0), Some(0));
        assert_eq!(acceptor.accepts(1008.0, 1000.0), None);
        let window = PrecursorWindow::new(&acceptor, 1016.0);
        assert!((window.lowest - 999.9).abs() < 1e-9);
        assert!((window.highest - 1016.1).abs() < 1e-9);
    }

    #[test]
    fn open_search_is_unbounded() {
        let window = PrecursorWindow::new(&OpenSearch, 1234.5);
        assert!(!window.bounded_below());
        assert!(!window.bounded_above());
        assert!(!window.is_empty());
        assert_eq!(OpenSearch.accepts(1.0, 5000.0), Some(0));
    }

    #[test]
    fn deserialize_config() {
        let config: AcceptorConfig = serde_json::from_str(
            r#"{"kind": "isotope_errors", "min": -1, "max": 3, "tolerance": {"ppm": [-10, 10]}}"#,
        )
        .unwrap();
        let acceptor = config.build();
        assert_eq!(acceptor.allowed_intervals(1000.0).len(), 5);
        assert_eq!(acceptor.accepts(1000.0, 1000.0), Some(1));

        let config: AcceptorConfig = serde_json::from_str(r#"{"kind": "open"}"#).unwrap();
        assert_eq!(config, AcceptorConfig::Open);
    }
}
