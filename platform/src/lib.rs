// SPDX-FileCopyrightText: 2024 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! This crate revolves around the [`Platform`] trait, which can be
//! implemented to provide a "platform implementation" for the engine: heap
//! memory, file reading, and the graphics and audio backends which turn asset
//! bytes into native objects.
//!
//! This is split off of the main engine crate so that the engine and the
//! platform implementation can be compiled independently.

#![no_std]
#![warn(missing_docs)]

mod handles;
mod io;

use core::ffi::c_void;

pub use handles::*;
pub use io::*;

/// A trait for using platform-dependent features from the engine without
/// depending on any platform implementation directly.
///
/// All the functions have a `&self` parameter, so that the methods can access
/// some (possibly internally mutable) state, but still keeping the platform
/// object as widely usable as possible (a "platform" is about as global an
/// object as you get). Also, none of these functions are (supposed to be) hot,
/// and this trait is object safe, so using &dyn [`Platform`] should be fine
/// performance-wise, and will hopefully help with compilation times by avoiding
/// generics.
pub trait Platform {
    /// Allocate the given amount of bytes (returning a null pointer on error).
    /// Not called often from the engine, memory is allocated in big chunks, so
    /// this can be slow and defensively implemented.
    ///
    /// The returned pointer must be aligned for any type the engine stores in
    /// it. In practice, 16 bytes is enough.
    fn malloc(&self, size: usize) -> *mut c_void;

    /// Free the memory allocated by [`Platform::malloc`].
    ///
    /// ## Safety
    ///
    /// - `ptr` must have been returned by [`Platform::malloc`] of this same
    ///   platform, with the same `size`.
    /// - Since the implementation is free to free the memory, the memory
    ///   pointed at by the given pointer shouldn't be accessed after calling
    ///   this.
    unsafe fn free(&self, ptr: *mut c_void, size: usize);

    /// Open a file for reading. Returns None if the file can't be read.
    fn open_file(&self, path: &str) -> Option<FileHandle>;

    /// Returns the size of the file in bytes, or None if it can't be
    /// determined.
    fn file_size(&self, file: FileHandle) -> Option<u64>;

    /// Fill `buffer` from the `file` starting at offset `first_byte`. Blocks
    /// until the read is done. Returns `false` if the read failed or the file
    /// did not have enough bytes to fill the buffer.
    fn read_file(&self, file: FileHandle, first_byte: u64, buffer: &mut [u8]) -> bool;

    /// Close a file opened with [`Platform::open_file`].
    fn close_file(&self, file: FileHandle);

    /// Create a mesh out of tightly packed `f32` vertex data, `vertex_stride`
    /// floats per vertex, and triangle list indices. Returns None if the mesh
    /// could not be created.
    fn create_mesh(&self, vertices: &[f32], vertex_stride: usize, indices: &[u16])
        -> Option<MeshHandle>;

    /// Destroy a mesh created with [`Platform::create_mesh`].
    fn release_mesh(&self, mesh: MeshHandle);

    /// Compile vertex shader source code. Returns None if compilation fails.
    fn compile_vertex_shader(&self, source: &[u8]) -> Option<VertexShaderHandle>;

    /// Destroy a shader created with [`Platform::compile_vertex_shader`].
    fn release_vertex_shader(&self, shader: VertexShaderHandle);

    /// Compile pixel shader source code. Returns None if compilation fails.
    fn compile_pixel_shader(&self, source: &[u8]) -> Option<PixelShaderHandle>;

    /// Destroy a shader created with [`Platform::compile_pixel_shader`].
    fn release_pixel_shader(&self, shader: PixelShaderHandle);

    /// Compile geometry shader source code. Returns None if compilation
    /// fails.
    fn compile_geometry_shader(&self, source: &[u8]) -> Option<GeometryShaderHandle>;

    /// Destroy a shader created with [`Platform::compile_geometry_shader`].
    fn release_geometry_shader(&self, shader: GeometryShaderHandle);

    /// Decode the contents of an Ogg Vorbis file into a playable sound.
    /// Returns None if the data could not be decoded.
    fn decode_ogg(&self, bytes: &[u8]) -> Option<SoundHandle>;

    /// Destroy a sound created with [`Platform::decode_ogg`].
    fn release_sound(&self, sound: SoundHandle);
}
