// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pagewerk — local PDF merge, split, compression, and unlock toolkit.
//
// Entry point. Initialises logging, loads the engine configuration, runs one
// command, and prints its result record as JSON. Failures print a structured
// error report instead.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pagewerk_core::{EngineConfig, ErrorReport};

#[derive(Parser, Debug)]
#[command(name = "pagewerk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON engine configuration; defaults apply to anything left out
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Page count, encryption, metadata, and page geometry
    Inspect {
        file: PathBuf,

        /// Also print a rough compression estimate
        #[arg(long)]
        estimate: bool,
    },

    /// Concatenate documents; append `@PAGES` to select pages, e.g. `a.pdf@1-3,5`
    Merge {
        /// Two or more inputs, in output order
        #[arg(required = true, num_args = 2..)]
        inputs: Vec<String>,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,

        /// Output name, without extension
        #[arg(short, long, default_value = "merged")]
        name: String,
    },

    /// Split one document into many
    Split {
        file: PathBuf,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,

        /// Pages per output file
        #[arg(long, conflicts_with = "range")]
        every: Option<usize>,

        /// Inclusive 1-based range with optional name, e.g. `3-7:chapter_two`
        #[arg(long, conflicts_with = "every")]
        range: Vec<String>,
    },

    /// Shrink a document with the layered compression strategies
    Compress {
        file: PathBuf,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,

        /// low, medium, or high
        #[arg(short, long, default_value = "medium")]
        level: String,

        /// Output name, without extension (default: `<stem>_compressed`)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Remove password protection
    Unlock {
        file: PathBuf,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,

        /// Known password; without it common passwords are tried
        #[arg(short, long)]
        password: Option<String>,

        /// Extra candidate tried before the built-in list (repeatable)
        #[arg(long = "try")]
        candidates: Vec<String>,
    },

    /// Drop print and edit restrictions by rewriting without encryption
    Unrestrict {
        file: PathBuf,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,

        /// User password, if the document needs one to open
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Build one PDF from images, one page each
    Images {
        /// Image files in page order; missing or unsupported ones are skipped
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,

        /// Output name, without extension
        #[arg(short, long, default_value = "images")]
        name: String,

        /// auto, a4, letter, legal, or WIDTHxHEIGHT in points
        #[arg(long, default_value = "auto")]
        page_size: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let outcome = load_config(cli.config.as_deref()).and_then(|config| commands::run(cli.command, &config));
    match outcome {
        Ok(output) => {
            print_json(&output.record);
            if output.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            tracing::error!(code = err.code(), "{err}");
            let report = ErrorReport::from_error(&err);
            match serde_json::to_string_pretty(&report) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("{err}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> pagewerk_core::error::Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("cannot render result: {err}"),
    }
}
