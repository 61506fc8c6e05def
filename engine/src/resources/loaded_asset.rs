// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use platform::{
    GeometryShaderHandle, MeshHandle, PixelShaderHandle, Platform, SoundHandle,
    VertexShaderHandle,
};

use crate::collections::GrowableVec;

use super::AssetKind;

/// A loaded asset on its way into (or out of) its table in
/// [`Resources`](super::Resources).
#[derive(Debug)]
pub enum LoadedAsset<'platform> {
    Mesh(MeshHandle),
    VertexShader(VertexShaderHandle),
    PixelShader(PixelShaderHandle),
    GeometryShader(GeometryShaderHandle),
    Sound(SoundHandle),
    Font(GrowableVec<'platform, u8>),
}

impl LoadedAsset<'_> {
    pub fn kind(&self) -> AssetKind {
        match self {
            LoadedAsset::Mesh(_) => AssetKind::Mesh,
            LoadedAsset::VertexShader(_) => AssetKind::VertexShader,
            LoadedAsset::PixelShader(_) => AssetKind::PixelShader,
            LoadedAsset::GeometryShader(_) => AssetKind::GeometryShader,
            LoadedAsset::Sound(_) => AssetKind::AudioOgg,
            LoadedAsset::Font(_) => AssetKind::Font,
        }
    }

    /// Destroys the native object, or frees the font bytes.
    pub fn release(self, platform: &dyn Platform) {
        match self {
            LoadedAsset::Mesh(mesh) => platform.release_mesh(mesh),
            LoadedAsset::VertexShader(shader) => platform.release_vertex_shader(shader),
            LoadedAsset::PixelShader(shader) => platform.release_pixel_shader(shader),
            LoadedAsset::GeometryShader(shader) => platform.release_geometry_shader(shader),
            LoadedAsset::Sound(sound) => platform.release_sound(sound),
            LoadedAsset::Font(mut bytes) => bytes.release(),
        }
    }
}
