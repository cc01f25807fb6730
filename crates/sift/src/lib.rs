pub mod acceptor;
pub mod database;
pub mod ion_series;
pub mod mass;
pub mod modification;
pub mod peptide;
pub mod psm;
pub mod scoring;
pub mod search;
pub mod spectrum;

use std::path::Path;

use ion_series::DissociationType;

#[derive(Debug)]
pub enum Error {
    /// Complementary ions were requested, but no mass shift is known for
    /// this dissociation type
    MissingComplementaryShift(DissociationType),
    /// The fragment index was binned for a different fragment resolution
    /// than the dissociation type being searched
    BinningMismatch(DissociationType),
    EmptyPeptideIndex,
    InvalidBinsPerDalton(u32),
    /// Peptide ids inside a fragment bin are not sorted by mass
    UnsortedBin { bin: usize },
    PeptideOutOfRange { bin: usize, id: u32 },
    ThreadPool(String),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingComplementaryShift(d) => write!(
                f,
                "complementary ions requested, but no mass shift is configured for {:?}",
                d
            ),
            Self::BinningMismatch(d) => write!(
                f,
                "fragment index binning does not match the resolution of {:?} spectra",
                d
            ),
            Self::EmptyPeptideIndex => write!(f, "peptide index is empty"),
            Self::InvalidBinsPerDalton(bpd) => {
                write!(f, "invalid number of bins per Dalton: {}", bpd)
            }
            Self::UnsortedBin { bin } => {
                write!(f, "fragment bin {} is not sorted by peptide mass", bin)
            }
            Self::PeptideOutOfRange { bin, id } => {
                write!(f, "fragment bin {} references unknown peptide {}", bin, id)
            }
            Self::ThreadPool(e) => write!(f, "failed to build thread pool: {}", e),
            Self::Io(e) => e.fmt(f),
            Self::Json(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

pub fn read_json<S, T>(path: S) -> Result<T, Error>
where
    S: AsRef<Path>,
    T: for<'de> serde::Deserialize<'de>,
{
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}
