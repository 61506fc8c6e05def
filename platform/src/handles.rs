// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

#[allow(unused_imports)] // used in docs
use crate::Platform;

macro_rules! native_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new handle. Should only be created in the platform
            /// implementation, which also knows what the inner value refers
            /// to.
            pub fn new(id: u64) -> $name {
                $name(id)
            }

            /// Returns the value passed into the constructor.
            pub fn inner(self) -> u64 {
                self.0
            }
        }
    };
}

native_handle!(
    /// Handle to a vertex and index buffer pair created by
    /// [`Platform::create_mesh`].
    MeshHandle
);

native_handle!(
    /// Handle to a compiled vertex shader, created by
    /// [`Platform::compile_vertex_shader`].
    VertexShaderHandle
);

native_handle!(
    /// Handle to a compiled pixel shader, created by
    /// [`Platform::compile_pixel_shader`].
    PixelShaderHandle
);

native_handle!(
    /// Handle to a compiled geometry shader, created by
    /// [`Platform::compile_geometry_shader`].
    GeometryShaderHandle
);

native_handle!(
    /// Handle to a decoded, playable sound, created by
    /// [`Platform::decode_ogg`].
    SoundHandle
);
