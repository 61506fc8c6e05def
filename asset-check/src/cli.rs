// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;

use bpaf::{batteries::verbose_by_slice, construct, long, positional, OptionParser, Parser};
use tracing::level_filters::LevelFilter;

#[derive(Debug, Clone)]
pub struct Options {
    pub verbosity_level: LevelFilter,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load and release every asset in an asset database.
    Check {
        database: PathBuf,
        settings: Option<PathBuf>,
    },
    /// Print the identifiers of the given asset names.
    Hash { names: Vec<String> },
}

pub fn options() -> OptionParser<Options> {
    let verbosity_level = verbose_by_slice(
        3,
        [
            LevelFilter::OFF,
            LevelFilter::ERROR,
            LevelFilter::WARN,
            LevelFilter::INFO,
            LevelFilter::DEBUG,
            LevelFilter::TRACE,
        ],
    );

    let check = check_command();
    let hash = hash_command();
    let command = construct!([check, hash]);

    construct!(Options {
        verbosity_level,
        command,
    })
    .to_options()
    .descr("Checks that the assets listed in an asset database load cleanly")
}

fn check_command() -> impl Parser<Command> {
    let database = long("db")
        .help("Selects the asset database file to check")
        .argument::<PathBuf>("FILE")
        .complete_shell(bpaf::ShellComp::File { mask: Some("*.adf") });

    let settings = long("config")
        .help("Selects a JSON settings file with arena sizes and the fallback mesh")
        .argument::<PathBuf>("FILE")
        .complete_shell(bpaf::ShellComp::File {
            mask: Some("*.json"),
        })
        .optional();

    construct!(Command::Check { database, settings })
        .to_options()
        .descr("Loads every asset in the database, then releases them all")
        .command("check")
}

fn hash_command() -> impl Parser<Command> {
    let names = positional::<String>("NAME")
        .help("Asset names to hash into asset database identifiers")
        .some("at least one name is required");

    construct!(Command::Hash { names })
        .to_options()
        .descr("Prints the asset database identifier of each name")
        .command("hash")
}
