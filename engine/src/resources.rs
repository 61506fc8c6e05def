// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Asset database driven loading and releasing of meshes, shaders, sounds and
//! fonts.

mod asset_database;
mod file_reader;
mod loaded_asset;
mod obj;

use enum_map::EnumMap;
use platform::{
    GeometryShaderHandle, MeshHandle, PixelShaderHandle, Platform, SoundHandle,
    VertexShaderHandle,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    allocators::{LinearAllocator, TempAllocator},
    collections::{GrowableVec, IdTable},
    Sid,
};

pub use asset_database::{
    AdfError, AssetDatabase, AssetEntry, AssetInfo, AssetKind, AssetPath, ASSET_MAX_PATH_LENGTH,
};
pub use file_reader::{read_file, ReadError};
pub use loaded_asset::LoadedAsset;
pub use obj::{parse_obj, MeshData, ObjError};

pub const MESH_CAPACITY: usize = 256;
pub const VERTEX_SHADER_CAPACITY: usize = 16;
pub const PIXEL_SHADER_CAPACITY: usize = 16;
pub const GEOMETRY_SHADER_CAPACITY: usize = 8;
pub const SOUND_CAPACITY: usize = 16;
pub const FONT_CAPACITY: usize = 16;
/// Capacity of the asset info and load state tables, i.e. the maximum amount
/// of distinct identifiers in the asset database.
pub const ASSET_CAPACITY: usize = 512;

/// The mesh used in place of meshes which are missing or not loaded.
pub const FALLBACK_MESH: Sid = Sid::from_name("cube");

/// Tunables for [`Resources`].
#[derive(Debug, Clone, Copy)]
pub struct ResourceConfig {
    /// Size of the scratch arena, which needs to fit the largest asset file
    /// along with its parsed form.
    pub scratch_arena_size: usize,
    /// Initial capacity of the scratch arena's checkpoint stack.
    pub checkpoint_capacity: usize,
    /// Mesh substituted for meshes which failed to load or aren't loaded.
    pub fallback_mesh: Sid,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        ResourceConfig {
            scratch_arena_size: 10 * 1024 * 1024,
            checkpoint_capacity: 10,
            fallback_mesh: FALLBACK_MESH,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InitError {
    #[error("not enough memory for the scratch arena")]
    OutOfMemory,
    #[error("could not read the asset database: {0}")]
    DatabaseUnreadable(#[from] ReadError),
    #[error("could not parse the asset database: {0}")]
    Database(#[from] AdfError),
    #[error("the asset database has more than {} distinct assets", ASSET_CAPACITY)]
    TableFull,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("{0} is not in the asset database")]
    UnknownAsset(Sid),
    #[error("{0} does not have a known asset kind")]
    UnknownKind(Sid),
    #[error("could not read {path}: {source}")]
    Read { path: AssetPath, source: ReadError },
    #[error("could not parse the mesh: {0}")]
    Mesh(#[from] ObjError),
    #[error("the platform could not create the {0} asset")]
    Backend(AssetKind),
    #[error("the {0} table is full")]
    TableFull(AssetKind),
}

/// Per-kind counts of the outcomes of [`Resources::load_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: EnumMap<AssetKind, u32>,
    /// Meshes loaded from the fallback mesh's file since their own file could
    /// not be read. Also counted in `loaded`.
    pub fallbacks: EnumMap<AssetKind, u32>,
    pub failed: EnumMap<AssetKind, u32>,
}

impl LoadReport {
    pub fn total_loaded(&self) -> u32 {
        self.loaded.values().sum()
    }

    pub fn total_failed(&self) -> u32 {
        self.failed.values().sum()
    }
}

/// Owner of every loaded asset, keyed by the identifiers in the asset
/// database.
///
/// Assets are loaded explicitly with [`Resources::load`] or
/// [`Resources::load_all`], and stay loaded until [`Resources::release`],
/// [`Resources::release_all`], or until the [`Resources`] is dropped.
pub struct Resources<'eng> {
    platform: &'eng dyn Platform,
    config: ResourceConfig,
    scratch: TempAllocator<'eng>,
    database: AssetDatabase<'eng>,
    assets: IdTable<AssetInfo, ASSET_CAPACITY>,
    load_states: IdTable<bool, ASSET_CAPACITY>,
    meshes: IdTable<MeshHandle, MESH_CAPACITY>,
    vertex_shaders: IdTable<VertexShaderHandle, VERTEX_SHADER_CAPACITY>,
    pixel_shaders: IdTable<PixelShaderHandle, PIXEL_SHADER_CAPACITY>,
    geometry_shaders: IdTable<GeometryShaderHandle, GEOMETRY_SHADER_CAPACITY>,
    sounds: IdTable<SoundHandle, SOUND_CAPACITY>,
    fonts: IdTable<GrowableVec<'eng, u8>, FONT_CAPACITY>,
}

impl<'eng> Resources<'eng> {
    /// Reads and parses the asset database at `database_path`. The database
    /// is stored in `persistent_arena`, which needs to outlive the
    /// [`Resources`]. Nothing is loaded yet.
    pub fn init(
        platform: &'eng dyn Platform,
        persistent_arena: &'eng LinearAllocator,
        config: ResourceConfig,
        database_path: &str,
    ) -> Result<Resources<'eng>, InitError> {
        let mut scratch =
            TempAllocator::new(platform, config.scratch_arena_size, config.checkpoint_capacity)
                .ok_or(InitError::OutOfMemory)?;

        let database = scratch.scope(|arena| -> Result<_, InitError> {
            let bytes = read_file(platform, arena, database_path)?;
            Ok(AssetDatabase::parse(&bytes, persistent_arena)?)
        })?;
        info!(
            "Asset database {database_path} has {} assets ({} lines skipped).",
            database.len(),
            database.skipped_lines(),
        );

        let mut resources = Resources {
            platform,
            config,
            scratch,
            database,
            assets: IdTable::new(),
            load_states: IdTable::new(),
            meshes: IdTable::new(),
            vertex_shaders: IdTable::new(),
            pixel_shaders: IdTable::new(),
            geometry_shaders: IdTable::new(),
            sounds: IdTable::new(),
            fonts: IdTable::new(),
        };

        // The database has no repeated identifiers, so nothing is replaced.
        for entry in resources.database.entries() {
            if resources.assets.insert(entry.id, entry.info).is_err()
                || resources.load_states.insert(entry.id, false).is_err()
            {
                return Err(InitError::TableFull);
            }
        }

        Ok(resources)
    }

    /// Loads every asset in the database, in file order. Failures are logged
    /// and counted in the report, and don't stop the rest from loading.
    pub fn load_all(&mut self) -> LoadReport {
        let mut report = LoadReport::default();
        for i in 0..self.database.len() {
            let AssetEntry { id, info } = self.database.entries()[i];
            match self.load_counting_fallbacks(id) {
                Ok(used_fallback) => {
                    report.loaded[info.kind] += 1;
                    if used_fallback {
                        report.fallbacks[info.kind] += 1;
                    }
                }
                Err(err) => {
                    warn!("Failed to load {id} ({}): {err}.", info.path);
                    report.failed[info.kind] += 1;
                }
            }
        }
        report
    }

    /// Loads the asset with the given identifier, replacing (and releasing)
    /// the previously loaded version if there is one.
    pub fn load(&mut self, id: Sid) -> Result<(), LoadError> {
        self.load_counting_fallbacks(id).map(|_| ())
    }

    fn load_counting_fallbacks(&mut self, id: Sid) -> Result<bool, LoadError> {
        let info = *self.assets.get(id).ok_or(LoadError::UnknownAsset(id))?;
        let mut used_fallback = false;
        let asset = match info.kind {
            AssetKind::None => return Err(LoadError::UnknownKind(id)),
            AssetKind::Mesh => {
                let (mesh, fallback) = self.load_mesh(&info)?;
                used_fallback = fallback;
                LoadedAsset::Mesh(mesh)
            }
            AssetKind::VertexShader => {
                debug!("Compiling vertex shader {}.", info.path);
                self.load_with(&info, |platform, source| platform.compile_vertex_shader(source))
                    .map(LoadedAsset::VertexShader)?
            }
            AssetKind::PixelShader => {
                debug!("Compiling pixel shader {}.", info.path);
                self.load_with(&info, |platform, source| platform.compile_pixel_shader(source))
                    .map(LoadedAsset::PixelShader)?
            }
            AssetKind::GeometryShader => {
                debug!("Compiling geometry shader {}.", info.path);
                self.load_with(&info, |platform, source| platform.compile_geometry_shader(source))
                    .map(LoadedAsset::GeometryShader)?
            }
            AssetKind::AudioOgg => self
                .load_with(&info, |platform, bytes| platform.decode_ogg(bytes))
                .map(LoadedAsset::Sound)?,
            AssetKind::Font => self
                .load_with(&info, |platform, bytes| GrowableVec::from_slice(platform, bytes))
                .map(LoadedAsset::Font)?,
        };
        self.store(id, asset)?;
        Ok(used_fallback)
    }

    /// Reads the file into the scratch arena and hands the bytes to `create`.
    fn load_with<T>(
        &mut self,
        info: &AssetInfo,
        create: impl FnOnce(&'eng dyn Platform, &[u8]) -> Option<T>,
    ) -> Result<T, LoadError> {
        let platform = self.platform;
        self.scratch.scope(|arena| {
            let bytes = read_file(platform, arena, &info.path).map_err(|source| LoadError::Read {
                path: info.path,
                source,
            })?;
            create(platform, &bytes).ok_or(LoadError::Backend(info.kind))
        })
    }

    /// Loads a mesh from its OBJ file, or from the fallback mesh's file if
    /// the mesh's own file can't be read. The returned bool is true in the
    /// latter case.
    fn load_mesh(&mut self, info: &AssetInfo) -> Result<(MeshHandle, bool), LoadError> {
        let platform = self.platform;
        let fallback_path = self
            .assets
            .get(self.config.fallback_mesh)
            .filter(|fallback| fallback.kind == AssetKind::Mesh)
            .map(|fallback| fallback.path);

        self.scratch.scope(|arena| {
            let (bytes, used_fallback) = match read_file(platform, arena, &info.path) {
                Ok(bytes) => (bytes, false),
                Err(source) => {
                    let Some(fallback_path) = fallback_path else {
                        return Err(LoadError::Read {
                            path: info.path,
                            source,
                        });
                    };
                    warn!(
                        "Could not read mesh {} ({source}), using {fallback_path} instead.",
                        info.path,
                    );
                    let bytes = read_file(platform, arena, &fallback_path).map_err(|source| {
                        LoadError::Read {
                            path: fallback_path,
                            source,
                        }
                    })?;
                    (bytes, true)
                }
            };

            let mesh = parse_obj(&bytes, arena)?;
            debug!(
                "Creating mesh with {} vertices of {} floats.",
                mesh.vertex_count(),
                mesh.vertex_stride,
            );
            let handle = platform
                .create_mesh(&mesh.vertices, mesh.vertex_stride, &mesh.indices)
                .ok_or(LoadError::Backend(AssetKind::Mesh))?;
            Ok((handle, used_fallback))
        })
    }

    /// Inserts the asset into its table and marks it loaded. The asset is
    /// released if it doesn't fit.
    fn store(&mut self, id: Sid, asset: LoadedAsset<'eng>) -> Result<(), LoadError> {
        let kind = asset.kind();
        let stored = match asset {
            LoadedAsset::Mesh(mesh) => wrap(self.meshes.insert(id, mesh), LoadedAsset::Mesh),
            LoadedAsset::VertexShader(shader) => wrap(
                self.vertex_shaders.insert(id, shader),
                LoadedAsset::VertexShader,
            ),
            LoadedAsset::PixelShader(shader) => wrap(
                self.pixel_shaders.insert(id, shader),
                LoadedAsset::PixelShader,
            ),
            LoadedAsset::GeometryShader(shader) => wrap(
                self.geometry_shaders.insert(id, shader),
                LoadedAsset::GeometryShader,
            ),
            LoadedAsset::Sound(sound) => wrap(self.sounds.insert(id, sound), LoadedAsset::Sound),
            LoadedAsset::Font(bytes) => wrap(self.fonts.insert(id, bytes), LoadedAsset::Font),
        };

        match stored {
            Ok(previous) => {
                if let Some(previous) = previous {
                    debug!("Releasing the previously loaded version of {id}.");
                    previous.release(self.platform);
                }
                if let Some(loaded) = self.load_states.get_mut(id) {
                    *loaded = true;
                }
                Ok(())
            }
            Err(rejected) => {
                rejected.release(self.platform);
                Err(LoadError::TableFull(kind))
            }
        }
    }

    /// Releases the asset if it's loaded. Returns true if something was
    /// released.
    pub fn release(&mut self, id: Sid) -> bool {
        let Some(info) = self.assets.get(id) else {
            return false;
        };
        let removed = match info.kind {
            AssetKind::None => None,
            AssetKind::Mesh => self.meshes.remove(id).map(LoadedAsset::Mesh),
            AssetKind::VertexShader => self.vertex_shaders.remove(id).map(LoadedAsset::VertexShader),
            AssetKind::PixelShader => self.pixel_shaders.remove(id).map(LoadedAsset::PixelShader),
            AssetKind::GeometryShader => self
                .geometry_shaders
                .remove(id)
                .map(LoadedAsset::GeometryShader),
            AssetKind::AudioOgg => self.sounds.remove(id).map(LoadedAsset::Sound),
            AssetKind::Font => self.fonts.remove(id).map(LoadedAsset::Font),
        };
        if let Some(loaded) = self.load_states.get_mut(id) {
            *loaded = false;
        }
        match removed {
            Some(asset) => {
                asset.release(self.platform);
                true
            }
            None => false,
        }
    }

    /// Releases every loaded asset.
    pub fn release_all(&mut self) {
        let mut released = 0;
        for i in 0..self.database.len() {
            let id = self.database.entries()[i].id;
            if self.release(id) {
                released += 1;
            }
        }
        debug!("Released {released} assets.");
    }

    pub fn is_loaded(&self, id: Sid) -> bool {
        self.load_states.get(id).copied().unwrap_or(false)
    }

    pub fn asset_info(&self, id: Sid) -> Option<&AssetInfo> {
        self.assets.get(id)
    }

    pub fn database(&self) -> &AssetDatabase<'eng> {
        &self.database
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    /// Returns the mesh, or the fallback mesh if `id` is not loaded. None if
    /// neither is loaded.
    pub fn mesh(&self, id: Sid) -> Option<MeshHandle> {
        if let Some(mesh) = self.loaded(id, &self.meshes) {
            return Some(*mesh);
        }
        debug!("Mesh {id} is not loaded, using the fallback mesh.");
        self.loaded(self.config.fallback_mesh, &self.meshes).copied()
    }

    pub fn vertex_shader(&self, id: Sid) -> Option<VertexShaderHandle> {
        self.loaded_or_log(id, "Vertex shader", &self.vertex_shaders).copied()
    }

    pub fn pixel_shader(&self, id: Sid) -> Option<PixelShaderHandle> {
        self.loaded_or_log(id, "Pixel shader", &self.pixel_shaders).copied()
    }

    pub fn geometry_shader(&self, id: Sid) -> Option<GeometryShaderHandle> {
        self.loaded_or_log(id, "Geometry shader", &self.geometry_shaders).copied()
    }

    pub fn sound(&self, id: Sid) -> Option<SoundHandle> {
        self.loaded_or_log(id, "Sound", &self.sounds).copied()
    }

    /// The raw bytes of the font file.
    pub fn font_data(&self, id: Sid) -> Option<&[u8]> {
        self.loaded_or_log(id, "Font", &self.fonts).map(|bytes| &bytes[..])
    }

    fn loaded<'a, V, const N: usize>(&self, id: Sid, table: &'a IdTable<V, N>) -> Option<&'a V> {
        if !self.is_loaded(id) {
            return None;
        }
        table.get(id)
    }

    fn loaded_or_log<'a, V, const N: usize>(
        &self,
        id: Sid,
        what: &str,
        table: &'a IdTable<V, N>,
    ) -> Option<&'a V> {
        let value = self.loaded(id, table);
        if value.is_none() {
            debug!("{what} {id} is not loaded.");
        }
        value
    }
}

impl Drop for Resources<'_> {
    fn drop(&mut self) {
        self.release_all();
    }
}

fn wrap<'eng, V>(
    inserted: Result<Option<V>, V>,
    into_asset: fn(V) -> LoadedAsset<'eng>,
) -> Result<Option<LoadedAsset<'eng>>, LoadedAsset<'eng>> {
    match inserted {
        Ok(previous) => Ok(previous.map(into_asset)),
        Err(rejected) => Err(into_asset(rejected)),
    }
}
