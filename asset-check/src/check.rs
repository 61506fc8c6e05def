// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::Path;

use anyhow::Context;
use engine::{
    allocators::LinearAllocator,
    resources::{AssetKind, LoadReport, Resources},
};
use tracing::{debug, info};

use crate::{headless::HeadlessPlatform, settings::CheckSettings};

/// The results of loading and releasing every asset in a database.
#[derive(Debug)]
pub struct CheckSummary {
    pub asset_count: usize,
    pub skipped_lines: usize,
    pub report: LoadReport,
    /// Native objects still alive after releasing everything.
    pub leaked_objects: usize,
    /// Heap allocations still alive after the engine has been dropped.
    pub leaked_allocations: usize,
}

impl CheckSummary {
    pub fn passed(&self) -> bool {
        self.report.total_failed() == 0 && self.leaked_objects == 0 && self.leaked_allocations == 0
    }

    pub fn print(&self) {
        println!(
            "{} assets in the database, {} malformed lines skipped.",
            self.asset_count, self.skipped_lines,
        );
        for kind in AssetKind::ALL {
            let loaded = self.report.loaded[kind];
            let fallbacks = self.report.fallbacks[kind];
            let failed = self.report.failed[kind];
            if loaded + failed == 0 {
                continue;
            }
            println!(
                "{:<16} {loaded:>4} loaded ({fallbacks} with fallback), {failed:>4} failed",
                kind.name(),
            );
        }
        if self.leaked_objects > 0 {
            println!("{} native objects were not released.", self.leaked_objects);
        }
        if self.leaked_allocations > 0 {
            println!("{} heap allocations were not freed.", self.leaked_allocations);
        }
    }
}

/// Loads every asset listed in the asset database at `database_path`,
/// releases them all, and checks that nothing leaked. Asset paths in the
/// database are relative to the database file's directory.
pub fn check(database_path: &Path, settings: &CheckSettings) -> anyhow::Result<CheckSummary> {
    let asset_root = database_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let database_file = database_path
        .file_name()
        .and_then(|name| name.to_str())
        .context("The asset database path does not end in a valid UTF-8 file name")?;
    debug!(
        "Checking {database_file} with asset root {}.",
        asset_root.display(),
    );

    let platform = HeadlessPlatform::new(asset_root);
    let persistent_arena = LinearAllocator::new(&platform, settings.persistent_arena_size())
        .context("Failed to allocate the persistent arena")?;

    let mut summary = {
        let mut resources = Resources::init(
            &platform,
            &persistent_arena,
            settings.resource_config(),
            database_file,
        )
        .context("Failed to initialize the resource manager")?;

        let report = resources.load_all();
        info!(
            "Loaded {} assets, {} failed.",
            report.total_loaded(),
            report.total_failed(),
        );
        resources.release_all();

        CheckSummary {
            asset_count: resources.database().len(),
            skipped_lines: resources.database().skipped_lines(),
            report,
            leaked_objects: platform.live_native_objects(),
            leaked_allocations: 0,
        }
    };

    drop(persistent_arena);
    summary.leaked_allocations = platform.live_heap_allocations();
    Ok(summary)
}
