//! Forward renderer
//!
//! One call to [`Renderer::render`] draws a frame:
//!
//! 1. react to resizes, clear
//! 2. propagate world transforms, refresh the camera view
//! 3. rebuild render lists if the topology changed
//! 4. fold lights into the light block
//! 5. cull, sort and draw opaque meshes front to back
//! 6. draw transparent meshes back to front without depth writes
//!
//! Failures are contained per mesh: the mesh is logged and skipped, the
//! frame goes on.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use crate::core::RendererConfig;
use crate::events::{Event, EventHandler, WindowEvent};
use crate::foundation::math::{Mat4, Vec2, Vec3};
use crate::scene::{Camera, Fog, NodeId, NodeKind, Scene, SceneError};
use crate::spatial::{BoundingSphere, Frustum};

use super::backend::{BackendError, GraphicsBackend};
use super::binding::{BindError, BufferCache, TextureCache};
use super::geometry::Geometry;
use super::lights::LightAggregator;
use super::material::{Material, MaterialKind};
use super::mesh::InstancedMesh;
use super::program::{CompiledProgram, ProgramCache};
use super::shader::{ShaderError, ShaderVariantKey};
use super::state::StateCache;
use super::uniform::{Uniform, UniformError, UniformValue};

/// Name of the uniform block holding projection and view matrices
pub const CAMERA_BLOCK: &str = "ub_Camera";

/// Texture unit used for the color map
const COLOR_MAP_UNIT: u32 = 0;

/// Renderer errors
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Rejected configuration
    #[error("Invalid renderer configuration: {0}")]
    Config(String),

    /// Scene lookup failed
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// Shader assembly failed
    #[error(transparent)]
    Shader(#[from] ShaderError),

    /// Uniform write rejected
    #[error(transparent)]
    Uniform(#[from] UniformError),

    /// Backend failure
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Resource could not be bound
    #[error(transparent)]
    Bind(#[from] BindError),

    /// Variant failed to build earlier and is skipped
    #[error("Shader variant {0:#x} is invalid")]
    InvalidProgram(u64),
}

/// Counters for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Meshes drawn
    pub rendered: usize,
    /// Meshes rejected by the frustum
    pub culled: usize,
    /// Meshes skipped because of an error
    pub skipped: usize,
    /// Lights folded into the frame, ambient included
    pub lights: usize,
}

/// Framebuffer size tracked from window events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    changed: bool,
}

impl Viewport {
    /// Viewport of the given size, applied on the next frame
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height, changed: true }
    }

    /// Record a new size
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("Ignoring empty viewport {width}x{height}");
            return;
        }
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.changed = true;
        }
    }

    fn take_changed(&mut self) -> bool {
        std::mem::replace(&mut self.changed, false)
    }
}

impl EventHandler for Viewport {
    fn on_event(&mut self, event: &Event) -> bool {
        if let Event::Window(WindowEvent::Resized { width, height }) = event {
            self.resize(*width, *height);
        }
        false
    }
}

struct DrawItem {
    id: NodeId,
    depth: f32,
}

/// Draws a [`Scene`] through a [`GraphicsBackend`]
pub struct Renderer<B: GraphicsBackend> {
    backend: B,
    config: RendererConfig,
    programs: ProgramCache,
    buffers: BufferCache,
    textures: TextureCache,
    lights: LightAggregator,
    state: StateCache,
    viewport: Rc<RefCell<Viewport>>,
    camera_block: Option<[f32; 32]>,
    draw_items: Vec<DrawItem>,
    frame: u64,
}

impl<B: GraphicsBackend> Renderer<B> {
    /// Create a renderer after validating its configuration
    pub fn new(backend: B, config: RendererConfig) -> Result<Self, RenderError> {
        config.validate().map_err(RenderError::Config)?;
        log::info!(
            "Renderer {}x{}, {} lights, {} cached programs",
            config.width,
            config.height,
            config.max_lights,
            config.program_cache_capacity
        );
        Ok(Self {
            backend,
            programs: ProgramCache::new(config.program_cache_capacity),
            buffers: BufferCache::new(),
            textures: TextureCache::new(),
            lights: LightAggregator::new(config.max_lights),
            state: StateCache::new(),
            viewport: Rc::new(RefCell::new(Viewport::new(config.width, config.height))),
            camera_block: None,
            draw_items: Vec::new(),
            frame: 0,
            config,
        })
    }

    /// Backend
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable backend. Call [`Renderer::reset_state`] after changing state
    /// behind the renderer's back.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Configuration
    pub const fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Program cache
    pub const fn programs(&self) -> &ProgramCache {
        &self.programs
    }

    /// Mutable program cache, to register shader snippets through
    /// [`ProgramCache::register_snippet`]
    pub fn programs_mut(&mut self) -> &mut ProgramCache {
        &mut self.programs
    }

    /// Shared viewport, to subscribe to window events:
    /// `bus.subscribe(EventTopic::Window, &renderer.viewport_handle())`
    pub fn viewport_handle(&self) -> Rc<RefCell<Viewport>> {
        Rc::clone(&self.viewport)
    }

    /// Resize the framebuffer directly
    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.viewport.borrow_mut().resize(width, height);
    }

    /// Forget every cached backend state
    pub fn reset_state(&mut self) {
        self.state.reset();
        self.buffers.invalidate();
        self.textures.invalidate();
        self.lights.invalidate();
        self.camera_block = None;
    }

    /// Number of frames rendered
    pub const fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Draw one frame
    pub fn render(&mut self, scene: &mut Scene, camera: &mut Camera) -> FrameStats {
        let mut stats = FrameStats::default();
        self.frame += 1;

        let viewport = {
            let mut viewport = self.viewport.borrow_mut();
            if viewport.take_changed() {
                log::debug!("Viewport resized to {}x{}", viewport.width, viewport.height);
                camera.resize(viewport.width, viewport.height);
            }
            *viewport
        };
        self.state.set_viewport(0, 0, viewport.width, viewport.height, &mut self.backend);
        self.state.set_clear_color(self.config.clear_color, &mut self.backend);
        self.state.set_depth_mask(true, &mut self.backend);
        self.backend.clear(true, true);

        scene.update_transform_hierarchy();
        camera.update_view();
        scene.process_scene();
        let scene: &Scene = scene;
        let lists = scene.render_lists();

        self.lights.reset();
        for id in lists.lights() {
            let Some(node) = scene.get(*id) else { continue };
            if let NodeKind::Light(light) = node.kind() {
                self.lights.add_light(light, node.cached_world_transform(), camera.view_matrix());
            }
        }
        let counts = self.lights.counts();
        stats.lights = counts.ambient + counts.total();
        self.lights.upload_if_needed(&mut self.backend);
        self.upload_camera(camera);

        let frustum = camera.frustum();
        let eye = camera.position();
        let forward = camera.forward();

        let mut items = std::mem::take(&mut self.draw_items);
        Self::collect_visible(scene, lists.opaque(), &frustum, &eye, &forward, &mut items, &mut stats);
        items.sort_by(|a, b| a.depth.partial_cmp(&b.depth).unwrap_or(Ordering::Equal));
        for item in &items {
            self.draw_counted(scene, item.id, viewport, &mut stats);
        }

        Self::collect_visible(scene, lists.transparent(), &frustum, &eye, &forward, &mut items, &mut stats);
        if self.config.sort_transparent {
            items.sort_by(|a, b| b.depth.partial_cmp(&a.depth).unwrap_or(Ordering::Equal));
        }
        if !items.is_empty() {
            self.state.set_depth_mask(false, &mut self.backend);
            for item in &items {
                self.draw_counted(scene, item.id, viewport, &mut stats);
            }
            self.state.set_depth_mask(true, &mut self.backend);
        }
        items.clear();
        self.draw_items = items;

        log::trace!(
            "Frame {}: {} rendered, {} culled, {} skipped, {} lights",
            self.frame,
            stats.rendered,
            stats.culled,
            stats.skipped,
            stats.lights
        );
        stats
    }

    fn upload_camera(&mut self, camera: &Camera) {
        let mut block = [0.0_f32; 32];
        block[..16].copy_from_slice(camera.projection_matrix().as_slice());
        block[16..].copy_from_slice(camera.view_matrix().as_slice());
        if self.camera_block != Some(block) {
            self.backend.upload_uniform_block(CAMERA_BLOCK, bytemuck::cast_slice(&block));
            self.camera_block = Some(block);
        }
    }

    /// Replace `items` with the live, visible, unculled drawables of `ids`
    /// and their view depth
    fn collect_visible(
        scene: &Scene,
        ids: &[NodeId],
        frustum: &Frustum,
        eye: &Vec3,
        forward: &Vec3,
        items: &mut Vec<DrawItem>,
        stats: &mut FrameStats,
    ) {
        items.clear();
        items.reserve(ids.len());
        for id in ids {
            let Some(node) = scene.get(*id) else { continue };
            let (material, local_sphere) = match node.kind() {
                NodeKind::Mesh(mesh) => (mesh.material(), mesh.geometry().bounding_sphere()),
                NodeKind::InstancedMesh(mesh) => (mesh.material(), mesh.bounding_sphere()),
                NodeKind::Group | NodeKind::Light(_) => continue,
            };
            if !material.is_visible() {
                continue;
            }

            let world = node.cached_world_transform();
            let sphere: BoundingSphere = local_sphere.transformed(world);
            if node.frustum_culled && !sphere.is_empty() && !frustum.intersects_sphere(&sphere) {
                stats.culled += 1;
                continue;
            }

            let center = if sphere.is_empty() { node.cached_world_position() } else { sphere.center };
            items.push(DrawItem { id: *id, depth: (center - eye).dot(forward) });
        }
    }

    fn draw_counted(&mut self, scene: &Scene, id: NodeId, viewport: Viewport, stats: &mut FrameStats) {
        match self.draw_node(scene, id, viewport) {
            Ok(()) => stats.rendered += 1,
            Err(RenderError::InvalidProgram(hash)) => {
                log::trace!("Skipping node {id:?} with invalid shader variant {hash:#x}");
                stats.skipped += 1;
            }
            Err(e) => {
                let name = scene.get(id).map_or("", |n| n.name.as_str());
                log::warn!("Skipping node {id:?} '{name}': {e}");
                stats.skipped += 1;
            }
        }
    }

    fn draw_node(&mut self, scene: &Scene, id: NodeId, viewport: Viewport) -> Result<(), RenderError> {
        let node = scene.get(id).ok_or(SceneError::NodeNotFound(id))?;
        let (geometry, material, instanced): (&Geometry, &Material, Option<&InstancedMesh>) = match node.kind() {
            NodeKind::Mesh(mesh) => (mesh.geometry().as_ref(), mesh.material(), None),
            NodeKind::InstancedMesh(mesh) => (mesh.geometry().as_ref(), mesh.material(), Some(mesh)),
            NodeKind::Group | NodeKind::Light(_) => return Ok(()),
        };

        let key = ShaderVariantKey::resolve(material, &self.lights.counts(), scene).with_instancing(instanced.is_some());
        let handle = self.programs.get_program(&key, material, &mut self.backend).handle();
        for evicted in self.programs.take_evicted() {
            self.state.invalidate_program(evicted);
        }
        let handle = handle.ok_or(RenderError::InvalidProgram(key.hash()))?;

        let range = self.buffers.bind(geometry, &mut self.backend)?;
        let instances = match instanced {
            Some(mesh) => {
                self.buffers.bind_instances(mesh, &mut self.backend)?;
                mesh.count()
            }
            None => 1,
        };
        if key.texture_map {
            if let Some(texture) = material.active_texture() {
                self.textures.bind(texture, COLOR_MAP_UNIT, &mut self.backend)?;
            }
        }

        self.state.use_program(handle, &mut self.backend);
        self.state.apply_material(material, &mut self.backend);

        let program = self.programs.program_mut(&key).ok_or(RenderError::InvalidProgram(key.hash()))?;
        set_draw_uniforms(program, material, node.cached_world_transform(), &key, scene.fog(), &self.lights, viewport);
        program.update_uniforms(&mut self.backend);

        if range.indexed {
            self.backend.draw_elements(range.primitive, range.count, instances);
        } else {
            self.backend.draw_arrays(range.primitive, range.count, instances);
        }
        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
fn set_draw_uniforms(
    program: &mut CompiledProgram,
    material: &Material,
    world: &Mat4,
    key: &ShaderVariantKey,
    fog: Option<&Fog>,
    lights: &LightAggregator,
    viewport: Viewport,
) {
    program.set_builtin(Uniform::Model, *world);
    program.set_builtin(Uniform::Opacity, material.opacity);
    program.set_builtin(Uniform::Resolution, UniformValue::Vec2(Vec2::new(viewport.width as f32, viewport.height as f32)));

    match material.kind() {
        MaterialKind::Flat { color } => {
            program.set_builtin(Uniform::Color, *color);
        }
        MaterialKind::Phong { diffuse, specular, shininess } => {
            program.set_builtin(Uniform::AmbientLight, lights.ambient());
            program.set_builtin(Uniform::DiffuseColor, *diffuse);
            program.set_builtin(Uniform::SpecularColor, *specular);
            program.set_builtin(Uniform::Shininess, *shininess);
        }
        MaterialKind::Shader(shader) => {
            program.set_builtin(Uniform::AmbientLight, lights.ambient());
            for (name, value) in &shader.uniforms {
                if let Err(e) = program.set_uniform(name, *value) {
                    log::error!("{e}");
                }
            }
        }
    }

    if key.texture_map {
        if let Some(texture) = material.active_texture() {
            program.set_builtin(Uniform::TextureMap, UniformValue::Int(COLOR_MAP_UNIT as i32));
            program.set_builtin(Uniform::TextureTransform, UniformValue::Mat3(texture.transform()));
        }
    }

    if let (true, Some(fog)) = (key.fog, fog) {
        program.set_builtin(Uniform::FogColor, fog.color());
        program.set_builtin(Uniform::FogType, fog.type_index());
        match *fog {
            Fog::Linear { near, far, .. } => {
                program.set_builtin(Uniform::FogNear, near);
                program.set_builtin(Uniform::FogFar, far);
            }
            Fog::Exponential { density, .. } => {
                program.set_builtin(Uniform::FogDensity, density);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventTopic;
    use crate::foundation::math::Color;
    use crate::render::backend::{BackendCall, HeadlessBackend};
    use crate::render::geometry::VertexAttribute;
    use crate::render::light::Light;
    use crate::render::lights::LIGHT_BLOCK;
    use crate::render::material::ShaderMaterial;
    use crate::render::mesh::Mesh;
    use crate::scene::Node;

    fn renderer() -> Renderer<HeadlessBackend> {
        Renderer::new(HeadlessBackend::new(), RendererConfig::new().with_size(800, 600)).unwrap()
    }

    fn camera() -> Camera {
        let mut camera = Camera::perspective(60.0, 800.0 / 600.0, 0.1, 100.0);
        camera.transform_mut().set_position(Vec3::new(0.0, 0.0, 10.0));
        camera
    }

    fn quad() -> Rc<Geometry> {
        #[rustfmt::skip]
        let vertices = vec![
            -1.0, -1.0, 0.0,  0.0, 0.0, 1.0,
             1.0, -1.0, 0.0,  0.0, 0.0, 1.0,
             1.0,  1.0, 0.0,  0.0, 0.0, 1.0,
            -1.0,  1.0, 0.0,  0.0, 0.0, 1.0,
        ];
        Rc::new(Geometry::with_indices(
            vertices,
            vec![0, 1, 2, 0, 2, 3],
            vec![VertexAttribute::position(), VertexAttribute::normal()],
        ))
    }

    fn mesh_at(material: Material, position: Vec3) -> Node {
        Node::mesh(Mesh::new(quad(), material)).with_position(position)
    }

    fn draws(backend: &HeadlessBackend) -> Vec<BackendCall> {
        backend.calls().iter().filter(|c| matches!(c, BackendCall::Draw { .. })).cloned().collect()
    }

    #[test]
    fn test_render_draws_visible_meshes() {
        let mut renderer = renderer();
        let mut scene = Scene::new();
        let mut camera = camera();
        scene.add_to_root(mesh_at(Material::phong(Color::WHITE), Vec3::zeros()));
        scene.add_to_root(mesh_at(Material::flat(Color::WHITE), Vec3::new(2.0, 0.0, 0.0)));
        scene.add_to_root(Node::light(Light::ambient(Color::WHITE, 0.2)));
        scene.add_to_root(Node::light(Light::directional(Color::WHITE, 1.0)).with_position(Vec3::new(0.0, 5.0, 5.0)));

        let stats = renderer.render(&mut scene, &mut camera);
        assert_eq!(stats, FrameStats { rendered: 2, culled: 0, skipped: 0, lights: 2 });
        assert_eq!(
            draws(renderer.backend()),
            vec![BackendCall::Draw { primitive: crate::render::geometry::Primitive::Triangles, count: 6, instances: 1, indexed: true }; 2]
        );
        assert!(renderer.backend().uniform_block(LIGHT_BLOCK).is_some());
        assert!(renderer.backend().uniform_block(CAMERA_BLOCK).is_some());
    }

    #[test]
    fn test_static_frame_reuploads_nothing() {
        let mut renderer = renderer();
        let mut scene = Scene::new();
        let mut camera = camera();
        scene.add_to_root(mesh_at(Material::phong(Color::WHITE), Vec3::zeros()));
        scene.add_to_root(Node::light(Light::point(Color::WHITE, 1.0)).with_position(Vec3::new(0.0, 2.0, 2.0)));

        renderer.render(&mut scene, &mut camera);
        renderer.backend_mut().clear_calls();
        renderer.render(&mut scene, &mut camera);

        let backend = renderer.backend();
        assert_eq!(backend.uniform_upload_count(), 0);
        assert_eq!(backend.count_calls(|c| matches!(c, BackendCall::UploadUniformBlock(_))), 0);
        assert_eq!(backend.count_calls(|c| matches!(c, BackendCall::UseProgram(_) | BackendCall::BindVertexArray(_))), 0);
        assert_eq!(backend.draw_count(), 1);
        assert_eq!(renderer.programs().compile_count(), 1);
    }

    #[test]
    fn test_frames_reuse_scene_lists_and_draw_buffer() {
        let mut renderer = renderer();
        let mut scene = Scene::new();
        let mut camera = camera();
        for i in 0..4 {
            scene.add_to_root(mesh_at(Material::flat(Color::WHITE), Vec3::new(i as f32, 0.0, 0.0)));
        }
        scene.add_to_root(mesh_at(Material::flat(Color::WHITE).with_transparent(true), Vec3::zeros()));

        renderer.render(&mut scene, &mut camera);
        let lists = scene.render_lists().opaque().as_ptr();
        let capacity = renderer.draw_items.capacity();
        assert!(capacity >= 4);
        assert!(renderer.draw_items.is_empty());

        let stats = renderer.render(&mut scene, &mut camera);
        assert_eq!(stats.rendered, 5);
        assert_eq!(scene.render_lists().opaque().as_ptr(), lists);
        assert_eq!(renderer.draw_items.capacity(), capacity);
    }

    #[test]
    fn test_moving_a_mesh_uploads_only_its_model_matrix() {
        let mut renderer = renderer();
        let mut scene = Scene::new();
        let mut camera = camera();
        let id = scene.add_to_root(mesh_at(Material::flat(Color::WHITE), Vec3::zeros()));

        renderer.render(&mut scene, &mut camera);
        renderer.backend_mut().clear_calls();
        scene.get_mut(id).unwrap().transform_mut().translate(Vec3::new(0.5, 0.0, 0.0));
        renderer.render(&mut scene, &mut camera);

        assert_eq!(renderer.backend().uniform_upload_count(), 1);
    }

    #[test]
    fn test_offscreen_meshes_are_culled() {
        let mut renderer = renderer();
        let mut scene = Scene::new();
        let mut camera = camera();
        scene.add_to_root(mesh_at(Material::flat(Color::WHITE), Vec3::new(0.0, 0.0, 50.0)));
        let mut unculled = mesh_at(Material::flat(Color::WHITE), Vec3::new(0.0, 0.0, 50.0));
        unculled.frustum_culled = false;
        scene.add_to_root(unculled);

        let stats = renderer.render(&mut scene, &mut camera);
        assert_eq!(stats.culled, 1);
        assert_eq!(stats.rendered, 1);
    }

    #[test]
    fn test_transparent_pass_is_sorted_back_to_front() {
        let mut renderer = renderer();
        let mut scene = Scene::new();
        let mut camera = camera();
        let glass = || Material::flat(Color::WHITE).with_transparent(true);
        let triangle = Rc::new(Geometry::new(
            vec![-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0],
            vec![VertexAttribute::position()],
        ));
        // Near quad is added first, so only sorting puts the far triangle ahead of it.
        scene.add_to_root(mesh_at(glass(), Vec3::new(0.0, 0.0, 2.0)));
        scene.add_to_root(Node::mesh(Mesh::new(triangle, glass())).with_position(Vec3::new(0.0, 0.0, -2.0)));
        scene.add_to_root(mesh_at(Material::flat(Color::WHITE), Vec3::new(0.0, 0.0, -5.0)));

        renderer.render(&mut scene, &mut camera);
        let calls = renderer.backend().calls();
        let counts: Vec<usize> = draws(renderer.backend())
            .iter()
            .filter_map(|c| match c {
                BackendCall::Draw { count, .. } => Some(*count),
                _ => None,
            })
            .collect();
        assert_eq!(counts, vec![6, 3, 6]);

        let mask_off = calls.iter().position(|c| *c == BackendCall::DepthMask(false)).unwrap();
        let mask_on = calls.iter().rposition(|c| *c == BackendCall::DepthMask(true)).unwrap();
        let draws_between = calls[mask_off..mask_on].iter().filter(|c| matches!(c, BackendCall::Draw { .. })).count();
        assert_eq!(draws_between, 2);
    }

    #[test]
    fn test_broken_shader_skips_only_its_mesh() {
        let mut renderer = renderer();
        let mut scene = Scene::new();
        let mut camera = camera();
        let broken = Material::shader(ShaderMaterial::new(
            "#version 330 core\n#pragma inject_attributes\n#error unsupported\n",
            "#version 330 core\n#pragma inject_attributes\n",
        ));
        scene.add_to_root(mesh_at(broken, Vec3::zeros()));
        scene.add_to_root(mesh_at(Material::flat(Color::WHITE), Vec3::zeros()));

        let stats = renderer.render(&mut scene, &mut camera);
        assert_eq!((stats.rendered, stats.skipped), (1, 1));
        let stats = renderer.render(&mut scene, &mut camera);
        assert_eq!((stats.rendered, stats.skipped), (1, 1));
        assert_eq!(renderer.programs().compile_count(), 2);
    }

    #[test]
    fn test_invalid_and_disposed_geometry_is_skipped() {
        let mut renderer = renderer();
        let mut scene = Scene::new();
        let mut camera = camera();
        let empty = Rc::new(Geometry::new(Vec::new(), vec![VertexAttribute::position()]));
        scene.add_to_root(Node::mesh(Mesh::new(empty, Material::flat(Color::WHITE))));
        let disposed = quad();
        disposed.dispose();
        scene.add_to_root(Node::mesh(Mesh::new(disposed, Material::flat(Color::WHITE))));

        let stats = renderer.render(&mut scene, &mut camera);
        assert_eq!(stats.skipped, 2);
        assert_eq!(renderer.backend().draw_count(), 0);
    }

    #[test]
    fn test_removed_geometry_is_released() {
        let mut renderer = renderer();
        let mut scene = Scene::new();
        let mut camera = camera();
        let id = scene.add_to_root(mesh_at(Material::flat(Color::WHITE), Vec3::zeros()));
        scene.add_to_root(mesh_at(Material::flat(Color::WHITE), Vec3::new(1.0, 0.0, 0.0)));

        renderer.render(&mut scene, &mut camera);
        assert_eq!(renderer.backend().live_vertex_arrays(), 2);

        drop(scene.remove(id).unwrap());
        let stats = renderer.render(&mut scene, &mut camera);
        assert_eq!(stats.rendered, 1);
        assert_eq!(renderer.backend().live_vertex_arrays(), 1);
    }

    #[test]
    fn test_instanced_mesh_draws_once_with_all_instances() {
        let mut renderer = renderer();
        let mut scene = Scene::new();
        let mut camera = camera();
        let mut instanced = InstancedMesh::new(quad(), Material::flat(Color::WHITE), 4);
        for i in 0..4 {
            let offset = Vec3::new(i as f32 * 2.0 - 3.0, 0.0, 0.0);
            instanced.set_transform_at(i, Mat4::new_translation(&offset)).unwrap();
        }
        scene.add_to_root(Node::instanced(instanced));

        let stats = renderer.render(&mut scene, &mut camera);
        assert_eq!(stats.rendered, 1);
        assert!(matches!(draws(renderer.backend()).as_slice(), [BackendCall::Draw { instances: 4, .. }]));
        assert_eq!(renderer.backend().live_buffers(), 2);
    }

    #[test]
    fn test_resize_event_reaches_camera_and_viewport() {
        let mut renderer = renderer();
        let mut scene = Scene::new();
        let mut camera = camera();
        scene.events_mut().subscribe(EventTopic::Window, &renderer.viewport_handle());
        scene.events_mut().publish(&Event::Window(WindowEvent::Resized { width: 400, height: 400 }));

        renderer.render(&mut scene, &mut camera);
        assert!(renderer.backend().calls().contains(&BackendCall::SetViewport(400, 400)));
        assert!(matches!(camera.projection(), crate::scene::Projection::Perspective { aspect, .. } if (*aspect - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_fog_uniforms_follow_scene_fog() {
        let mut renderer = renderer();
        let mut scene = Scene::new();
        let mut camera = camera();
        scene.set_fog(Some(Fog::Linear { color: Color::WHITE, near: 1.0, far: 20.0 }));
        let material = Material::flat(Color::WHITE);
        scene.add_to_root(mesh_at(material.clone(), Vec3::zeros()));

        renderer.render(&mut scene, &mut camera);
        let key = ShaderVariantKey::resolve(&material, &renderer.lights.counts(), &scene);
        assert!(key.fog);
        let program = renderer.programs.program_mut(&key).unwrap();
        assert_eq!(program.uniform(Uniform::FogFar.name()).and_then(|s| s.value().copied()), Some(UniformValue::Float(20.0)));
    }

    #[test]
    fn test_bad_config_is_rejected() {
        let config = RendererConfig::new().with_max_lights(99);
        assert!(matches!(Renderer::new(HeadlessBackend::new(), config), Err(RenderError::Config(_))));
    }
}
