use clap::{value_parser, Arg, Command, ValueHint};
use sift_cli::input::Input;
use sift_cli::runner::Runner;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::default()
        .filter_level(log::LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("SIFT_LOG", "error,sift=info"))
        .init();

    let matches = Command::new("sift")
        .version(clap::crate_version!())
        .about("Fragment-bin indexed peptide spectrum matching")
        .arg(
            Arg::new("parameters")
                .required(true)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to configuration parameters (JSON file)")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("spectra_paths")
                .num_args(1..)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Paths to spectra (JSON files) to process. Overrides spectra files listed in the \
                     configuration file.",
                )
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("peptides")
                .short('p')
                .long("peptides")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path to candidate peptides (JSON file). Overrides the peptide file \
                     specified in the configuration file.",
                )
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("output_directory")
                .short('o')
                .long("output_directory")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path where search results will be written. \
                     Overrides the directory specified in the configuration file.",
                )
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .value_parser(value_parser!(u16).range(1..))
                .help("Number of threads used for searching (default = # of CPUs)")
                .value_hint(ValueHint::Other),
        )
        .arg(
            Arg::new("annotate-matches")
                .long("annotate-matches")
                .action(clap::ArgAction::SetTrue)
                .help("Write matched fragments for every reported candidate"),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    let input = Input::from_arguments(matches)?;
    let parameters = input.build()?;

    let summary = Runner::new(parameters).and_then(|runner| runner.run())?;
    log::trace!("{:?}", summary);

    Ok(())
}
