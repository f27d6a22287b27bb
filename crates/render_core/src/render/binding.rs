//! GPU resource binding caches
//!
//! Vertex arrays, instance buffers and textures are created lazily on first
//! bind and keyed by [`ResourceId`]. Each cache registers a disposal callback
//! on the source resource; the callback only queues the id, and the queue is
//! drained at the start of every bind, releasing GPU handles exactly once.
//! Rebinding the already-current handle does not reach the backend.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::backend::{BackendError, BufferHandle, GraphicsBackend, TextureHandle, VertexArrayHandle};
use super::geometry::{Geometry, Primitive};
use super::mesh::InstancedMesh;
use super::resource::{Disposal, ResourceId};
use super::texture::Texture2D;

/// Binding errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// The resource was disposed
    #[error("Resource {0:?} was disposed")]
    Disposed(ResourceId),

    /// Geometry cannot be drawn
    #[error("Invalid geometry {id:?}: {reason}")]
    InvalidGeometry {
        /// Geometry id
        id: ResourceId,
        /// What is wrong with it
        reason: &'static str,
    },

    /// The backend refused to create the GPU object
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Ids of disposed resources, filled by disposal callbacks
#[derive(Debug, Default)]
struct EvictionQueue(Rc<RefCell<Vec<ResourceId>>>);

impl EvictionQueue {
    fn watch(&self, disposal: &Disposal) {
        let queue: Weak<RefCell<Vec<ResourceId>>> = Rc::downgrade(&self.0);
        disposal.on_dispose(move |id| {
            if let Some(queue) = queue.upgrade() {
                queue.borrow_mut().push(id);
            }
        });
    }

    fn drain(&self) -> Vec<ResourceId> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

/// What to draw after a successful geometry bind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRange {
    /// Topology
    pub primitive: Primitive,
    /// Index count when indexed, vertex count otherwise
    pub count: usize,
    /// Whether to draw with indices
    pub indexed: bool,
}

#[derive(Debug, Clone, Copy)]
struct InstanceBuffers {
    transforms: BufferHandle,
    colors: BufferHandle,
}

/// Vertex arrays per geometry and instance buffers per instanced mesh
#[derive(Debug, Default)]
pub struct BufferCache {
    vertex_arrays: HashMap<ResourceId, VertexArrayHandle>,
    instances: HashMap<ResourceId, InstanceBuffers>,
    current: Option<VertexArrayHandle>,
    current_instances: Option<(VertexArrayHandle, BufferHandle)>,
    evicted: EvictionQueue,
}

impl BufferCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the geometry's vertex array current, creating it on first use
    pub fn bind<B: GraphicsBackend + ?Sized>(
        &mut self,
        geometry: &Geometry,
        backend: &mut B,
    ) -> Result<DrawRange, BindError> {
        self.purge(backend);

        let id = geometry.id();
        if geometry.is_disposed() {
            return Err(BindError::Disposed(id));
        }
        if geometry.attributes().is_empty() {
            return Err(BindError::InvalidGeometry { id, reason: "no vertex attributes" });
        }
        if geometry.vertex_count() == 0 {
            return Err(BindError::InvalidGeometry { id, reason: "no vertex data" });
        }

        let handle = match self.vertex_arrays.get(&id) {
            Some(handle) => *handle,
            None => {
                let handle = backend.create_vertex_array(geometry.vertices(), geometry.indices(), geometry.attributes())?;
                self.evicted.watch(geometry.disposal());
                self.vertex_arrays.insert(id, handle);
                log::debug!("Created vertex array {} for geometry {}", handle.0, id.0);
                handle
            }
        };

        if self.current != Some(handle) {
            backend.bind_vertex_array(handle);
            self.current = Some(handle);
        }

        let indexed = !geometry.indices().is_empty();
        Ok(DrawRange {
            primitive: geometry.primitive,
            count: if indexed { geometry.indices().len() } else { geometry.vertex_count() },
            indexed,
        })
    }

    /// Upload touched instance data and attach the instance buffers to the
    /// current vertex array. Call after [`BufferCache::bind`].
    pub fn bind_instances<B: GraphicsBackend + ?Sized>(
        &mut self,
        mesh: &InstancedMesh,
        backend: &mut B,
    ) -> Result<(), BindError> {
        self.purge(backend);

        let id = mesh.id();
        if mesh.is_disposed() {
            return Err(BindError::Disposed(id));
        }

        let buffers = match self.instances.get(&id) {
            Some(buffers) => {
                if mesh.transforms_touched() {
                    backend.update_buffer(buffers.transforms, &mesh.transform_data());
                }
                if mesh.colors_touched() {
                    backend.update_buffer(buffers.colors, &mesh.color_data());
                }
                *buffers
            }
            None => {
                let buffers = InstanceBuffers {
                    transforms: backend.create_buffer(&mesh.transform_data())?,
                    colors: backend.create_buffer(&mesh.color_data())?,
                };
                self.evicted.watch(mesh.disposal());
                self.instances.insert(id, buffers);
                buffers
            }
        };
        mesh.mark_uploaded();

        if let Some(vertex_array) = self.current {
            if self.current_instances != Some((vertex_array, buffers.transforms)) {
                backend.bind_instance_buffers(buffers.transforms, buffers.colors);
                self.current_instances = Some((vertex_array, buffers.transforms));
            }
        }
        Ok(())
    }

    /// Release GPU objects of every disposed resource
    pub fn purge<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) {
        for id in self.evicted.drain() {
            if let Some(handle) = self.vertex_arrays.remove(&id) {
                log::debug!("Releasing vertex array {} of disposed geometry {}", handle.0, id.0);
                backend.delete_vertex_array(handle);
                if self.current == Some(handle) {
                    self.current = None;
                }
                if self.current_instances.is_some_and(|(vertex_array, _)| vertex_array == handle) {
                    self.current_instances = None;
                }
            }
            if let Some(buffers) = self.instances.remove(&id) {
                backend.delete_buffer(buffers.transforms);
                backend.delete_buffer(buffers.colors);
                if self.current_instances.is_some_and(|(_, transforms)| transforms == buffers.transforms) {
                    self.current_instances = None;
                }
            }
        }
    }

    /// Forget which vertex array is current
    pub fn invalidate(&mut self) {
        self.current = None;
        self.current_instances = None;
    }

    /// Number of cached vertex arrays
    pub fn len(&self) -> usize {
        self.vertex_arrays.len()
    }

    /// Whether no vertex array is cached
    pub fn is_empty(&self) -> bool {
        self.vertex_arrays.is_empty()
    }
}

/// Texture objects per texture
#[derive(Debug, Default)]
pub struct TextureCache {
    textures: HashMap<ResourceId, TextureHandle>,
    current: HashMap<u32, TextureHandle>,
    evicted: EvictionQueue,
}

impl TextureCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a texture to a unit, creating it on first use
    pub fn bind<B: GraphicsBackend + ?Sized>(
        &mut self,
        texture: &Texture2D,
        unit: u32,
        backend: &mut B,
    ) -> Result<TextureHandle, BindError> {
        self.purge(backend);

        let id = texture.id();
        if texture.is_disposed() {
            return Err(BindError::Disposed(id));
        }

        let handle = match self.textures.get(&id) {
            Some(handle) => *handle,
            None => {
                let handle = backend.create_texture(texture.width(), texture.height(), texture.pixels())?;
                self.evicted.watch(texture.disposal());
                self.textures.insert(id, handle);
                log::debug!("Created texture {} ({}x{})", handle.0, texture.width(), texture.height());
                handle
            }
        };

        if self.current.get(&unit) != Some(&handle) {
            backend.bind_texture(unit, handle);
            self.current.insert(unit, handle);
        }
        Ok(handle)
    }

    /// Release texture objects of every disposed texture
    pub fn purge<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) {
        for id in self.evicted.drain() {
            if let Some(handle) = self.textures.remove(&id) {
                log::debug!("Releasing texture {} of disposed texture {}", handle.0, id.0);
                backend.delete_texture(handle);
                self.current.retain(|_, bound| *bound != handle);
            }
        }
    }

    /// Forget which textures are bound
    pub fn invalidate(&mut self) {
        self.current.clear();
    }

    /// Number of cached textures
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Whether no texture is cached
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}
