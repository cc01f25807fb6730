use sift_cli::input::Input;
use sift_cli::runner::Runner;
use sift_core::ion_series::Kind;
use sift_core::mass::{mass_to_mz, PROTON};
use sift_core::peptide::Peptide;
use sift_core::spectrum::RawSpectrum;

fn raw_spectrum(id: &str, sequence: &str) -> RawSpectrum {
    let peptide = Peptide::try_from(sequence).unwrap();
    let mz = peptide
        .fragments(&[Kind::B, Kind::Y])
        .iter()
        .map(|ion| ion.monoisotopic_mass + PROTON)
        .collect::<Vec<_>>();
    RawSpectrum {
        id: id.into(),
        scan_start_time: 10.0,
        precursor_mz: mass_to_mz(peptide.monoisotopic, 2),
        precursor_charge: 2,
        intensity: vec![100.0; mz.len()],
        mz,
    }
}

#[test]
fn integration() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let peptides = dir.path().join("peptides.json");
    let spectra = dir.path().join("spectra.json");
    let parameters = dir.path().join("parameters.json");
    let output = dir.path().join("output");

    std::fs::write(
        &peptides,
        serde_json::to_string(&serde_json::json!([
            { "sequence": "LESLIEK" },
            { "sequence": "PEPTIDEK" },
            { "sequence": "KEDITPEP", "decoy": true },
            { "sequence": "EFGELLR" },
        ]))?,
    )?;
    std::fs::write(
        &spectra,
        serde_json::to_string(&vec![
            raw_spectrum("scan=1", "PEPTIDEK"),
            raw_spectrum("scan=2", "GGGGGGGK"),
            raw_spectrum("scan=3", "EFGELLR"),
        ])?,
    )?;
    std::fs::write(
        &parameters,
        serde_json::to_string(&serde_json::json!({
            "database": { "bins_per_dalton": 100, "fragment_min_mass": 0.0 },
            "search": { "max_threads": 2, "annotate_matches": true },
            "acceptor": { "kind": "ppm", "ppm": 10.0 },
            "peptides": peptides,
            "spectra_paths": [spectra],
            "output_directory": output,
        }))?,
    )?;

    let search = Input::load(&parameters)?.build()?;
    assert_eq!(search.processing.take_top_n, 200);
    let summary = Runner::new(search)?.run()?;
    assert_eq!(summary.spectra, 3);
    assert_eq!(summary.matched, 2);

    let results: serde_json::Value =
        serde_json::from_reader(std::fs::File::open(output.join("results.json"))?)?;
    let matches = results["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 2);

    let first = matches
        .iter()
        .find(|m| m["spec_id"] == "scan=1")
        .expect("PEPTIDEK should be identified");
    assert_eq!(first["peptide"], "PEPTIDEK");
    assert_eq!(first["label"], 1);
    assert_eq!(first["notch"], 0);
    assert_eq!(first["matched_peaks"], 14);
    assert_eq!(first["matched_ions"].as_array().unwrap().len(), 14);

    // Scans are searched in order of precursor mass: GGGGGGGK, EFGELLR, PEPTIDEK
    assert_eq!(first["scan_index"], 2);
    assert_eq!(matches[0]["spec_id"], "scan=3");
    assert_eq!(matches[0]["scan_index"], 1);
    assert_eq!(results["parameters"]["search"]["max_threads"], 2);

    Ok(())
}

#[test]
fn missing_paths_are_rejected() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let parameters = dir.path().join("parameters.json");
    std::fs::write(&parameters, r#"{ "database": {} }"#)?;

    assert!(Input::load(&parameters)?.build().is_err());
    Ok(())
}
