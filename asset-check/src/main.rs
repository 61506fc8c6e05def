// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

mod check;
mod cli;
mod headless;
mod settings;

use std::process::ExitCode;

use cli::Command;
use engine::Sid;
use tracing::error;

fn main() -> ExitCode {
    let options = cli::options().run();

    tracing_subscriber::fmt()
        .with_max_level(options.verbosity_level)
        .with_writer(std::io::stderr)
        .init();

    match run(options.command) {
        Ok(exit_code) => exit_code,
        Err(err) => {
            error!("{err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Hash { names } => {
            for name in names {
                println!("{} {name}", Sid::from_name(&name));
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Check { database, settings } => {
            let settings = settings::read(settings.as_deref())?;
            let summary = check::check(&database, &settings)?;
            summary.print();
            if summary.passed() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
