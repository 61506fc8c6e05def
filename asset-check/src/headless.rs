// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use core::ffi::c_void;
use std::{
    alloc::{self, Layout},
    cell::{Cell, RefCell},
    collections::HashMap,
    fs::File,
    io::{Cursor, ErrorKind, Read, Seek, SeekFrom},
    path::PathBuf,
};

use platform::{
    FileHandle, GeometryShaderHandle, MeshHandle, PixelShaderHandle, Platform, SoundHandle,
    VertexShaderHandle,
};
use symphonia::{
    core::{
        codecs::DecoderOptions,
        errors::Error as SymphoniaError,
        formats::FormatOptions,
        io::{MediaSourceStream, MediaSourceStreamOptions},
        meta::MetadataOptions,
        probe::Hint,
    },
    default,
};
use tracing::{debug, trace, warn};

/// Alignment of every [`Platform::malloc`] allocation.
const MALLOC_ALIGN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NativeObject {
    Mesh,
    VertexShader,
    PixelShader,
    GeometryShader,
    Sound { frames: u64 },
}

/// A [`Platform`] without a GPU or an audio device: files are read from disk,
/// and the "native objects" are validated and then just counted, so that
/// leaks and double releases can be detected.
pub struct HeadlessPlatform {
    asset_root: PathBuf,
    open_files: RefCell<HashMap<u64, File>>,
    native_objects: RefCell<HashMap<u64, NativeObject>>,
    next_handle: Cell<u64>,
    heap_allocations: Cell<usize>,
}

impl HeadlessPlatform {
    /// Creates a platform which resolves file paths relative to
    /// `asset_root`.
    pub fn new(asset_root: PathBuf) -> HeadlessPlatform {
        HeadlessPlatform {
            asset_root,
            open_files: RefCell::new(HashMap::new()),
            native_objects: RefCell::new(HashMap::new()),
            next_handle: Cell::new(0),
            heap_allocations: Cell::new(0),
        }
    }

    /// The amount of meshes, shaders and sounds which have been created but
    /// not released.
    pub fn live_native_objects(&self) -> usize {
        self.native_objects.borrow().len()
    }

    pub fn live_heap_allocations(&self) -> usize {
        self.heap_allocations.get()
    }

    fn next_handle(&self) -> u64 {
        let handle = self.next_handle.get() + 1;
        self.next_handle.set(handle);
        handle
    }

    fn create(&self, object: NativeObject) -> u64 {
        let handle = self.next_handle();
        self.native_objects.borrow_mut().insert(handle, object);
        trace!("Created {object:?} with handle {handle}.");
        handle
    }

    fn release(&self, handle: u64, kind: &str) {
        match self.native_objects.borrow_mut().remove(&handle) {
            Some(object) => trace!("Released {object:?} with handle {handle}."),
            None => warn!("Tried to release {kind} {handle}, which is not alive."),
        }
    }
}

impl Platform for HeadlessPlatform {
    fn malloc(&self, size: usize) -> *mut c_void {
        let Ok(layout) = Layout::from_size_align(size, MALLOC_ALIGN) else {
            return std::ptr::null_mut();
        };
        if layout.size() == 0 {
            return std::ptr::null_mut();
        }
        // Safety: the layout has a non-zero size.
        let ptr = unsafe { alloc::alloc(layout) };
        if !ptr.is_null() {
            self.heap_allocations.set(self.heap_allocations.get() + 1);
        }
        ptr as *mut c_void
    }

    unsafe fn free(&self, ptr: *mut c_void, size: usize) {
        // Safety: the caller guarantees that ptr is from malloc with the same
        // size, so the layout is valid and matches the allocation.
        unsafe {
            let layout = Layout::from_size_align_unchecked(size, MALLOC_ALIGN);
            alloc::dealloc(ptr as *mut u8, layout);
        }
        self.heap_allocations.set(self.heap_allocations.get() - 1);
    }

    fn open_file(&self, path: &str) -> Option<FileHandle> {
        let full_path = self.asset_root.join(path);
        match File::open(&full_path) {
            Ok(file) => {
                let handle = self.next_handle();
                self.open_files.borrow_mut().insert(handle, file);
                Some(FileHandle::new(handle))
            }
            Err(err) => {
                debug!("Could not open {}: {err}", full_path.display());
                None
            }
        }
    }

    fn file_size(&self, file: FileHandle) -> Option<u64> {
        let open_files = self.open_files.borrow();
        let metadata = open_files.get(&file.inner())?.metadata().ok()?;
        Some(metadata.len())
    }

    fn read_file(&self, file: FileHandle, first_byte: u64, buffer: &mut [u8]) -> bool {
        let mut open_files = self.open_files.borrow_mut();
        let Some(file) = open_files.get_mut(&file.inner()) else {
            return false;
        };
        let result = file
            .seek(SeekFrom::Start(first_byte))
            .and_then(|_| file.read_exact(buffer));
        if let Err(err) = &result {
            debug!("File read failed: {err}");
        }
        result.is_ok()
    }

    fn close_file(&self, file: FileHandle) {
        self.open_files.borrow_mut().remove(&file.inner());
    }

    fn create_mesh(
        &self,
        vertices: &[f32],
        vertex_stride: usize,
        indices: &[u16],
    ) -> Option<MeshHandle> {
        if vertex_stride == 0 || vertices.len() % vertex_stride != 0 {
            warn!("Mesh vertex data is not a whole number of vertices.");
            return None;
        }
        let vertex_count = vertices.len() / vertex_stride;
        if let Some(index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            warn!("Mesh index {index} is out of bounds for {vertex_count} vertices.");
            return None;
        }
        Some(MeshHandle::new(self.create(NativeObject::Mesh)))
    }

    fn release_mesh(&self, mesh: MeshHandle) {
        self.release(mesh.inner(), "mesh");
    }

    fn compile_vertex_shader(&self, source: &[u8]) -> Option<VertexShaderHandle> {
        shader_source_is_plausible(source)
            .then(|| VertexShaderHandle::new(self.create(NativeObject::VertexShader)))
    }

    fn release_vertex_shader(&self, shader: VertexShaderHandle) {
        self.release(shader.inner(), "vertex shader");
    }

    fn compile_pixel_shader(&self, source: &[u8]) -> Option<PixelShaderHandle> {
        shader_source_is_plausible(source)
            .then(|| PixelShaderHandle::new(self.create(NativeObject::PixelShader)))
    }

    fn release_pixel_shader(&self, shader: PixelShaderHandle) {
        self.release(shader.inner(), "pixel shader");
    }

    fn compile_geometry_shader(&self, source: &[u8]) -> Option<GeometryShaderHandle> {
        shader_source_is_plausible(source)
            .then(|| GeometryShaderHandle::new(self.create(NativeObject::GeometryShader)))
    }

    fn release_geometry_shader(&self, shader: GeometryShaderHandle) {
        self.release(shader.inner(), "geometry shader");
    }

    fn decode_ogg(&self, bytes: &[u8]) -> Option<SoundHandle> {
        match count_ogg_frames(bytes) {
            Ok(frames) => Some(SoundHandle::new(self.create(NativeObject::Sound { frames }))),
            Err(err) => {
                warn!("Could not decode Ogg Vorbis audio: {err}");
                None
            }
        }
    }

    fn release_sound(&self, sound: SoundHandle) {
        self.release(sound.inner(), "sound");
    }
}

/// There's no shader compiler without a graphics driver, so the best that
/// can be done is checking for non-empty text.
fn shader_source_is_plausible(source: &[u8]) -> bool {
    match std::str::from_utf8(source) {
        Ok(source) => !source.trim().is_empty(),
        Err(_) => false,
    }
}

/// Decodes the whole first track of the Ogg file, returning the amount of
/// audio frames in it.
fn count_ogg_frames(bytes: &[u8]) -> Result<u64, SymphoniaError> {
    let mut hint = Hint::new();
    hint.with_extension("ogg");

    let source = MediaSourceStream::new(
        Box::new(Cursor::new(bytes.to_vec())),
        MediaSourceStreamOptions::default(),
    );
    let mut source = default::get_probe().format(
        &hint,
        source,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let Some(track) = source.format.default_track() else {
        return Err(SymphoniaError::DecodeError("no audio tracks"));
    };
    let mut decoder =
        default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut frames = 0;
    loop {
        let packet = match source.format.next_packet() {
            Ok(packet) => packet,
            // End of stream.
            Err(SymphoniaError::IoError(err)) if err.kind() == ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err),
        };
        match decoder.decode(&packet) {
            Ok(decoded) => frames += decoded.frames() as u64,
            // Recoverable according to the Decoder::decode docs.
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(err) => return Err(err),
        }
    }

    trace!("Decoded {frames} audio frames.");
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use std::{env, fs};

    use platform::Platform;

    use super::{count_ogg_frames, HeadlessPlatform};

    #[test]
    fn reads_files_relative_to_the_asset_root() {
        let root = env::temp_dir().join(format!("asset-check-headless-{}", std::process::id()));
        fs::create_dir_all(root.join("data")).unwrap();
        fs::write(root.join("data/hello.txt"), "hello world").unwrap();

        let platform = HeadlessPlatform::new(root.clone());
        let file = platform.open_file("data/hello.txt").unwrap();
        assert_eq!(Some(11), platform.file_size(file));
        let mut buffer = [0; 5];
        assert!(platform.read_file(file, 6, &mut buffer));
        assert_eq!(b"world", &buffer);
        assert!(!platform.read_file(file, 8, &mut buffer));
        platform.close_file(file);
        assert!(platform.open_file("data/missing.txt").is_none());

        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn validates_meshes_and_counts_native_objects() {
        let platform = HeadlessPlatform::new(env::temp_dir());
        let vertices = [0.0; 12];
        assert!(platform.create_mesh(&vertices, 4, &[0, 1, 3]).is_none());
        assert!(platform.create_mesh(&vertices, 5, &[0, 1, 2]).is_none());
        let mesh = platform.create_mesh(&vertices, 4, &[0, 1, 2]).unwrap();
        let shader = platform.compile_vertex_shader(b"void main() {}").unwrap();
        assert!(platform.compile_pixel_shader(b"   ").is_none());
        assert!(platform.decode_ogg(b"OggS but not really").is_none());
        assert_eq!(2, platform.live_native_objects());

        platform.release_mesh(mesh);
        platform.release_vertex_shader(shader);
        assert_eq!(0, platform.live_native_objects());
    }

    #[test]
    fn decodes_ogg_vorbis() {
        // Two silent 256-sample blocks, which overlap into 128 frames.
        let silence = include_bytes!("../test-data/silence.ogg");
        assert_eq!(128, count_ogg_frames(silence).unwrap());

        let platform = HeadlessPlatform::new(env::temp_dir());
        let sound = platform.decode_ogg(silence).unwrap();
        assert_eq!(1, platform.live_native_objects());
        platform.release_sound(sound);
        assert_eq!(0, platform.live_native_objects());
    }

    #[test]
    fn malloc_and_free_are_counted() {
        let platform = HeadlessPlatform::new(env::temp_dir());
        let ptr = platform.malloc(100);
        assert!(!ptr.is_null());
        assert_eq!(0, ptr as usize % 64);
        assert_eq!(1, platform.live_heap_allocations());
        unsafe { platform.free(ptr, 100) };
        assert_eq!(0, platform.live_heap_allocations());
        assert!(platform.malloc(0).is_null());
    }
}
