// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use core::{
    cell::{Cell, RefCell},
    ffi::c_void,
};

use platform::{
    FileHandle, GeometryShaderHandle, MeshHandle, PixelShaderHandle, Platform, SoundHandle,
    VertexShaderHandle,
};
use std::{collections::HashMap, string::String, vec::Vec};

#[derive(Clone, Copy)]
#[repr(C, align(64))]
struct VeryAlignedThing([u8; 64]);
const VERY_ALIGNED_THING: VeryAlignedThing = VeryAlignedThing([0; 64]);

/// Shader sources containing this fail to compile.
pub const SHADER_ERROR_MARKER: &[u8] = b"#error";
/// Sounds not starting with this fail to decode.
pub const OGG_MAGIC: &[u8] = b"OggS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeObject {
    Mesh { vertex_count: usize, index_count: usize },
    VertexShader,
    PixelShader,
    GeometryShader,
    Sound,
}

/// In-memory [`Platform`] for tests: files are byte buffers added with
/// [`TestPlatform::add_file`], and the backends hand out counted handles
/// which panic if they're released twice.
#[derive(Default)]
pub struct TestPlatform {
    heap_allocations: Cell<usize>,
    files: RefCell<HashMap<String, Vec<u8>>>,
    open_files: RefCell<HashMap<u64, String>>,
    native_objects: RefCell<HashMap<u64, NativeObject>>,
    next_handle: Cell<u64>,
    fail_mesh_creation: Cell<bool>,
}

impl TestPlatform {
    pub fn new() -> TestPlatform {
        TestPlatform::default()
    }

    pub fn add_file(&self, path: &str, contents: impl Into<Vec<u8>>) {
        self.files.borrow_mut().insert(path.into(), contents.into());
    }

    pub fn live_heap_allocations(&self) -> usize {
        self.heap_allocations.get()
    }

    pub fn open_file_count(&self) -> usize {
        self.open_files.borrow().len()
    }

    /// The amount of created and not yet released meshes, shaders and sounds.
    pub fn live_native_objects(&self) -> usize {
        self.native_objects.borrow().len()
    }

    pub fn mesh_info(&self, mesh: MeshHandle) -> Option<NativeObject> {
        self.native_objects.borrow().get(&mesh.inner()).copied()
    }

    pub fn set_fail_mesh_creation(&self, fail: bool) {
        self.fail_mesh_creation.set(fail);
    }

    fn create(&self, object: NativeObject) -> u64 {
        let handle = self.next_handle.get() + 1;
        self.next_handle.set(handle);
        self.native_objects.borrow_mut().insert(handle, object);
        handle
    }

    fn release(&self, handle: u64, expected: fn(&NativeObject) -> bool) {
        let object = self.native_objects.borrow_mut().remove(&handle);
        match object {
            Some(object) if expected(&object) => {}
            Some(object) => panic!("handle {handle} released as the wrong kind: {object:?}"),
            None => panic!("handle {handle} released twice or never created"),
        }
    }
}

impl Platform for TestPlatform {
    fn malloc(&self, size: usize) -> *mut c_void {
        let count = size.div_ceil(size_of::<VeryAlignedThing>());
        let byte_vec: Vec<VeryAlignedThing> = std::vec![VERY_ALIGNED_THING; count];
        let vec_ptr: *mut VeryAlignedThing = byte_vec.leak().as_mut_ptr();
        self.heap_allocations.set(self.heap_allocations.get() + 1);
        vec_ptr as *mut c_void
    }

    unsafe fn free(&self, ptr: *mut c_void, size: usize) {
        let count = size.div_ceil(size_of::<VeryAlignedThing>());
        let vec_ptr = ptr as *mut VeryAlignedThing;
        // Safety: ptr was allocated by a leaked Vec<VeryAlignedThing> in
        // malloc, with the same `size`, so the length and capacity match the
        // original Vec.
        let byte_vec: Vec<VeryAlignedThing> = unsafe { Vec::from_raw_parts(vec_ptr, count, count) };
        drop(byte_vec);
        self.heap_allocations.set(self.heap_allocations.get() - 1);
    }

    fn open_file(&self, path: &str) -> Option<FileHandle> {
        if !self.files.borrow().contains_key(path) {
            return None;
        }
        let handle = self.next_handle.get() + 1;
        self.next_handle.set(handle);
        self.open_files.borrow_mut().insert(handle, path.into());
        Some(FileHandle::new(handle))
    }

    fn file_size(&self, file: FileHandle) -> Option<u64> {
        let open_files = self.open_files.borrow();
        let path = open_files.get(&file.inner())?;
        self.files.borrow().get(path).map(|bytes| bytes.len() as u64)
    }

    fn read_file(&self, file: FileHandle, first_byte: u64, buffer: &mut [u8]) -> bool {
        let open_files = self.open_files.borrow();
        let files = self.files.borrow();
        let Some(bytes) = open_files.get(&file.inner()).and_then(|path| files.get(path)) else {
            return false;
        };
        let start = first_byte as usize;
        let Some(src) = bytes.get(start..start + buffer.len()) else {
            return false;
        };
        buffer.copy_from_slice(src);
        true
    }

    fn close_file(&self, file: FileHandle) {
        let closed = self.open_files.borrow_mut().remove(&file.inner());
        assert!(closed.is_some(), "closed a file that wasn't open");
    }

    fn create_mesh(
        &self,
        vertices: &[f32],
        vertex_stride: usize,
        indices: &[u16],
    ) -> Option<MeshHandle> {
        if self.fail_mesh_creation.get() || vertex_stride == 0 {
            return None;
        }
        let handle = self.create(NativeObject::Mesh {
            vertex_count: vertices.len() / vertex_stride,
            index_count: indices.len(),
        });
        Some(MeshHandle::new(handle))
    }

    fn release_mesh(&self, mesh: MeshHandle) {
        self.release(mesh.inner(), |object| {
            matches!(object, NativeObject::Mesh { .. })
        });
    }

    fn compile_vertex_shader(&self, source: &[u8]) -> Option<VertexShaderHandle> {
        compiles(source).then(|| VertexShaderHandle::new(self.create(NativeObject::VertexShader)))
    }

    fn release_vertex_shader(&self, shader: VertexShaderHandle) {
        self.release(shader.inner(), |object| *object == NativeObject::VertexShader);
    }

    fn compile_pixel_shader(&self, source: &[u8]) -> Option<PixelShaderHandle> {
        compiles(source).then(|| PixelShaderHandle::new(self.create(NativeObject::PixelShader)))
    }

    fn release_pixel_shader(&self, shader: PixelShaderHandle) {
        self.release(shader.inner(), |object| *object == NativeObject::PixelShader);
    }

    fn compile_geometry_shader(&self, source: &[u8]) -> Option<GeometryShaderHandle> {
        compiles(source)
            .then(|| GeometryShaderHandle::new(self.create(NativeObject::GeometryShader)))
    }

    fn release_geometry_shader(&self, shader: GeometryShaderHandle) {
        self.release(shader.inner(), |object| *object == NativeObject::GeometryShader);
    }

    fn decode_ogg(&self, bytes: &[u8]) -> Option<SoundHandle> {
        bytes
            .starts_with(OGG_MAGIC)
            .then(|| SoundHandle::new(self.create(NativeObject::Sound)))
    }

    fn release_sound(&self, sound: SoundHandle) {
        self.release(sound.inner(), |object| *object == NativeObject::Sound);
    }
}

fn compiles(source: &[u8]) -> bool {
    !source.is_empty()
        && !source
            .windows(SHADER_ERROR_MARKER.len())
            .any(|window| window == SHADER_ERROR_MARKER)
}
