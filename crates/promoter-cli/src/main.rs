use anyhow::{Context, Result};
use clap::{Arg, ArgGroup, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::io;
use std::path::PathBuf;

use promoter_cli::config::{service_args, service_config_from_arguments};
use promoter_cli::predict::input::read_fasta;
use promoter_cli::predict::output::write_predictions;
use promoter_cli::predict::predict_records;
use promoter_cli::serve::serve_lines;
use promoter_core::{
    KappaEncoder, PredictionRequest, PredictionService, SequenceValidator,
};

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Warn)
        .parse_env(env_logger::Env::default().filter_or("PROMOTER_LOG", "warn,promoter=info"))
        .init();

    let matches = Command::new("promoter")
        .version(clap::crate_version!())
        .about("Ensemble promoter prediction for 150 nt DNA sequences")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("predict")
                .about("Predict a single sequence or every record of a FASTA file")
                .arg(
                    Arg::new("organism")
                        .short('g')
                        .long("organism")
                        .help("Organism whose model ensemble is queried")
                        .required(true)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new()),
                )
                .arg(
                    Arg::new("sequence")
                        .short('s')
                        .long("sequence")
                        .help("DNA sequence of exactly 150 bases")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new()),
                )
                .arg(
                    Arg::new("fasta")
                        .short('f')
                        .long("fasta")
                        .help("FASTA file with one candidate sequence per record")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .group(
                    ArgGroup::new("input")
                        .args(["sequence", "fasta"])
                        .required(true),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output_file")
                        .help(
                            "File the FASTA prediction table is written to (.csv or .tsv). \
                             Defaults to stdout.",
                        )
                        .requires("fasta")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .args(service_args()),
        )
        .subcommand(
            Command::new("serve")
                .about("Answer JSON-lines prediction requests from stdin")
                .args(service_args()),
        )
        .subcommand(
            Command::new("encode")
                .about("Print the kappa feature vector of a sequence")
                .arg(
                    Arg::new("sequence")
                        .short('s')
                        .long("sequence")
                        .help("DNA sequence of exactly 150 bases")
                        .required(true)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new()),
                ),
        )
        .subcommand(
            Command::new("organisms")
                .about("List organisms with a model directory")
                .args(service_args()),
        )
        .subcommand(
            Command::new("models")
                .about("Load and list the models of an organism")
                .arg(
                    Arg::new("organism")
                        .short('g')
                        .long("organism")
                        .required(true)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new()),
                )
                .args(service_args()),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("predict", sub_m)) => handle_predict(sub_m),
        Some(("serve", sub_m)) => handle_serve(sub_m),
        Some(("encode", sub_m)) => handle_encode(sub_m),
        Some(("organisms", sub_m)) => handle_organisms(sub_m),
        Some(("models", sub_m)) => handle_models(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn build_service(matches: &ArgMatches) -> Result<PredictionService> {
    let config = service_config_from_arguments(matches)?;
    log::debug!(
        "[promoter] Service config:\n{}",
        serde_json::to_string_pretty(&config).unwrap_or_default()
    );
    Ok(PredictionService::new(&config))
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    let service = build_service(matches)?;
    let organism: &String = matches
        .get_one("organism")
        .context("--organism is required")?;

    if let Some(fasta_path) = matches.get_one::<PathBuf>("fasta") {
        let records = read_fasta(fasta_path)?;
        let outcome = match predict_records(&service, &records, organism) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Prediction failed: {:#}", e);
                std::process::exit(1)
            }
        };
        write_predictions(
            &outcome.rows,
            matches.get_one::<PathBuf>("output_file").map(PathBuf::as_path),
        )?;
        eprintln!(
            "[promoter] Predicted {} of {} record(s) for {} ({} rejected).",
            outcome.predicted,
            records.len(),
            organism,
            outcome.rejected.len()
        );
        return Ok(());
    }

    let sequence: &String = matches
        .get_one("sequence")
        .context("--sequence or --fasta is required")?;
    let response = service.handle(&PredictionRequest {
        sequence: sequence.clone(),
        organism: organism.clone(),
    });
    println!("{}", serde_json::to_string_pretty(&response.body)?);

    if !response.is_success() {
        log::error!("Request failed with status {}", response.status);
        std::process::exit(1)
    }
    Ok(())
}

fn handle_serve(matches: &ArgMatches) -> Result<()> {
    let service = build_service(matches)?;
    log::info!(
        "[promoter] Serving JSON-lines requests from {:?}",
        service.registry().root()
    );
    let answered = serve_lines(&service, io::stdin().lock(), io::stdout().lock())?;
    log::info!("[promoter] Answered {} request(s)", answered);
    Ok(())
}

fn handle_encode(matches: &ArgMatches) -> Result<()> {
    let sequence: &String = matches
        .get_one("sequence")
        .context("--sequence is required")?;
    let encoded = SequenceValidator::new()
        .validate(sequence)
        .and_then(|seq| KappaEncoder::new().encode(&seq));
    match encoded {
        Ok(features) => {
            println!("{}", serde_json::to_string(&features)?);
            Ok(())
        }
        Err(e) => {
            log::error!("Encoding failed: {}", e);
            std::process::exit(1)
        }
    }
}

fn handle_organisms(matches: &ArgMatches) -> Result<()> {
    let service = build_service(matches)?;
    for organism in service.registry().list_organisms()? {
        println!("{}", organism);
    }
    Ok(())
}

fn handle_models(matches: &ArgMatches) -> Result<()> {
    let service = build_service(matches)?;
    let organism: &String = matches
        .get_one("organism")
        .context("--organism is required")?;

    let models = match service.models(organism) {
        Ok(models) => models,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1)
        }
    };
    for (name, model) in &models.models {
        println!("{}\t{}\t{}", name, model.format(), model.describe());
    }
    for skipped in &models.skipped {
        eprintln!("[promoter] skipped {}", skipped);
    }
    Ok(())
}
