use std::env;
use std::path::PathBuf;
use std::process::exit;

use clap::{arg, command, value_parser, ArgMatches, Command};

use crate::batch::{run, LogProgress, RunSettings};
use crate::options::ProcessingOptions;

mod batch;
mod classify;
mod coords;
mod debug;
mod geometry;
mod image_utils;
mod interpret;
mod options;
mod report;
mod types;

fn main() {
    init_logging();

    let matches = cli().get_matches();

    let (input_dir, output_dir, coords_file) =
        resolve_inputs(&matches).unwrap_or_else(|message| fail(message));

    let mut options = match matches.get_one::<String>("config") {
        Some(path) => ProcessingOptions::from_json_file(&PathBuf::from(path))
            .unwrap_or_else(|e| fail(format!("Error: {}", e))),
        None => ProcessingOptions::default(),
    };
    if let Some(extensions) = matches.get_many::<String>("extensions") {
        options.extensions = extensions.map(|ext| ext.trim().to_string()).collect();
    }

    let settings = RunSettings {
        jobs: matches.get_one::<usize>("jobs").copied().unwrap_or(0),
        debug: matches.get_flag("debug"),
    };

    match run(
        &input_dir,
        &output_dir,
        &coords_file,
        &options,
        &settings,
        &LogProgress,
    ) {
        // Per-image failures have already been logged by `run`.
        Ok(_) => {
            println!(
                "Processing images done. Output files on: {}",
                output_dir.display()
            );
        }
        Err(e) => fail(format!("Error: {}", e)),
    }
}

/// Logs at `info` unless the `LOG` environment variable says otherwise.
fn init_logging() {
    let filters = env::var("LOG").unwrap_or_else(|_| "info".to_string());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();
}

/// Checks the positional arguments, returning the input directory, output
/// directory and coordinates file, or the message to exit with.
fn resolve_inputs(matches: &ArgMatches) -> Result<(PathBuf, PathBuf, PathBuf), String> {
    let input_dir = matches
        .get_one::<String>("input_images_dir")
        .map(PathBuf::from)
        .ok_or("No input directory containing images provided!")?;
    if !input_dir.is_dir() {
        return Err(format!(
            "Input directory: {} does not exist.",
            input_dir.display()
        ));
    }

    let output_dir = matches
        .get_one::<String>("output_directory")
        .map(PathBuf::from)
        .ok_or("No output directory provided!")?;

    let coords_file = matches
        .get_one::<String>("coords_data_file")
        .map(PathBuf::from)
        .ok_or("No file provided for image coordinates!")?;
    if !coords_file.is_file() {
        return Err(format!(
            "Coords data file: {} does not exist.",
            coords_file.display()
        ));
    }

    Ok((input_dir, output_dir, coords_file))
}

fn fail(message: String) -> ! {
    eprintln!("{}", message);
    exit(1);
}

// Positional arguments are optional here so that missing ones are reported
// with our own messages and exit code.
fn cli() -> Command {
    command!()
        .arg(arg!(input_images_dir: [INPUT_IMAGES_DIR] "Directory containing the scanned forms"))
        .arg(arg!(output_directory: [OUTPUT_DIRECTORY] "Directory to write annotated images and reports to"))
        .arg(arg!(coords_data_file: [COORDS_DATA_FILE] "File listing the bubble coordinates of each question"))
        .arg(
            arg!(-e --extensions <EXTENSIONS> "Image file extensions to allow, comma separated (default: jpg,png)")
                .required(false)
                .value_delimiter(','),
        )
        .arg(arg!(-c --config <PATH> "Path to a JSON file with processing options").required(false))
        .arg(
            arg!(-j --jobs <N> "Number of images to process concurrently (default: one per core)")
                .required(false)
                .value_parser(value_parser!(usize)),
        )
        .arg(arg!(-d --debug "Write intermediate debug images to the output directory"))
}
