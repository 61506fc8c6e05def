// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{fs, path::Path};

use anyhow::Context;
use engine::{resources::ResourceConfig, Sid};
use serde::{Deserialize, Serialize};

const DEFAULT_PERSISTENT_ARENA_SIZE: usize = 1024 * 1024;

/// The settings file for asset-check: memory budgets and the fallback mesh.
///
/// Has enum variants for breaking changes in the format of the settings file,
/// but [`read`] always returns the newest variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "settings_file_version", rename_all = "snake_case")]
pub enum CheckSettings {
    V1 {
        #[serde(default = "default_scratch_arena_size")]
        scratch_arena_size: usize,
        #[serde(default = "default_persistent_arena_size")]
        persistent_arena_size: usize,
        /// Name of the fallback mesh, hashed into its identifier.
        #[serde(default = "default_fallback_mesh")]
        fallback_mesh: String,
    },
}

impl Default for CheckSettings {
    fn default() -> Self {
        CheckSettings::V1 {
            scratch_arena_size: default_scratch_arena_size(),
            persistent_arena_size: default_persistent_arena_size(),
            fallback_mesh: default_fallback_mesh(),
        }
    }
}

impl CheckSettings {
    pub fn resource_config(&self) -> ResourceConfig {
        let CheckSettings::V1 {
            scratch_arena_size,
            fallback_mesh,
            ..
        } = self;
        ResourceConfig {
            scratch_arena_size: *scratch_arena_size,
            fallback_mesh: Sid::from_name(fallback_mesh),
            ..ResourceConfig::default()
        }
    }

    pub fn persistent_arena_size(&self) -> usize {
        let CheckSettings::V1 {
            persistent_arena_size,
            ..
        } = self;
        *persistent_arena_size
    }
}

fn default_scratch_arena_size() -> usize {
    ResourceConfig::default().scratch_arena_size
}

fn default_persistent_arena_size() -> usize {
    DEFAULT_PERSISTENT_ARENA_SIZE
}

fn default_fallback_mesh() -> String {
    String::from("cube")
}

/// Reads the settings file, or returns the defaults if no file was given.
pub fn read(settings: Option<&Path>) -> anyhow::Result<CheckSettings> {
    let settings = match settings {
        Some(path) => {
            let settings = fs::read_to_string(path).with_context(|| {
                format!("Failed to open the settings file {}", path.display())
            })?;
            serde_json::from_str(&settings).context("Failed to parse the settings file")?
        }
        None => CheckSettings::default(),
    };

    // NOTE: When there's new versions of CheckSettings, convert to the newest
    // here (the rest of the tool assumes it)

    Ok(settings)
}
