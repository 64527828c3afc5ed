//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use clap::{App, Arg};
use netsim_tools::config::{Config, Logging, LoggingFmtStyle};
use netsim_tools::event::Replay;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::prelude::*;

fn init_tracing(config: &Logging) {
    // Logs go to stderr, stdout is reserved for the replay summary.
    let stderr = config.enabled.then(|| {
        let log_level_filter = LevelFilter::from_level(tracing::Level::TRACE);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(config.fmt.show_thread_id)
            .with_file(config.fmt.show_source)
            .with_line_number(config.fmt.show_source)
            .with_ansi(config.fmt.colors);
        let layer = match config.fmt.style {
            LoggingFmtStyle::Compact => layer.compact().boxed(),
            LoggingFmtStyle::Full => layer.boxed(),
            LoggingFmtStyle::Json => layer.json().boxed(),
            LoggingFmtStyle::Pretty => layer.pretty().boxed(),
        };
        layer.with_filter(log_level_filter)
    });

    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive("netsim=debug".parse().unwrap())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr)
        .init();
}

// ===== main =====

fn main() {
    // Parse command-line parameters.
    let matches = App::new("Replay events")
        .about("Replay routing events from a record file")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("file")
                .help("Specify a configuration file."),
        )
        .arg(
            Arg::with_name("FILENAME")
                .help("Events file path")
                .required(true)
                .index(1),
        )
        .get_matches();

    // Read configuration file.
    let config = match matches.value_of("config") {
        Some(config_file) => match Config::load(config_file) {
            Ok(config) => config,
            Err(error) => {
                eprintln!("Failed to parse configuration file: {error}");
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    // Initialize tracing.
    init_tracing(&config.logging);
    info!("starting up");

    // Create protocol state engines.
    let mut replay = match Replay::new(&config) {
        Ok(replay) => replay,
        Err(error) => {
            error.log();
            eprintln!("Failed to start replay: {error}");
            std::process::exit(1);
        }
    };

    // Push events from the record file.
    let filename = matches.value_of("FILENAME").unwrap();
    let events = match std::fs::read_to_string(filename) {
        Ok(events) => events,
        Err(error) => {
            eprintln!("Unable to read record file: {error}");
            std::process::exit(1);
        }
    };
    for (lineno, line) in events.lines().enumerate() {
        if let Err(error) = replay.process_line(lineno + 1, line) {
            error.log();
        }
    }

    // Print the final state.
    let summary = replay.summary();
    match serde_json::to_string_pretty(&summary) {
        Ok(summary) => println!("{summary}"),
        Err(error) => {
            eprintln!("Failed to encode summary: {error}");
            std::process::exit(1);
        }
    }
}
