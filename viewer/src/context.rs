//! Renderer state owned by the frame loop
//!
//! The region, cameras, active backend and bound program all live here and
//! are only touched from the frame-loop thread. The GPU half is optional so
//! the same state machine runs headless in tests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use irmf_core::axes::{AxesPass, main_axes};
use irmf_core::camera::{CameraRig, DragMode, PresetId, Trackball, WheelDelta};
use irmf_core::config::Config;
use irmf_core::hud::HudCamera;
use irmf_core::metadata::{DEFAULT_PALETTE, IrmfDocument, MAX_MATERIALS, MetadataError};
use irmf_core::region::{Axis, Bound, BoundingRegion, RegionEdit};
use irmf_core::slicer::Resolution;
use winit::window::Window;

use crate::graphics::{
    AxesRenderer, FieldBinding, FrameScene, FrameUniforms, GraphicsError, Gpu, HudRenderer, RenderBackend, scene_view_proj,
};
use crate::shader_gen::{
    BackendKind, CacheDirIncludes, CompileError, CompiledProgram, Diagnostic, FieldSource, IncludeResolver,
    NoIncludes, build,
};

/// Result of a compile request, tagged with the request's generation.
#[derive(Debug)]
pub struct CompileOutcome {
    pub generation: u64,
    pub backend: BackendKind,
    pub result: Result<CompiledProgram, CompileError>,
}

/// What [`RendererContext::apply_compile`] did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStatus {
    /// The program is now bound
    Bound,
    /// Compilation or pipeline creation failed; the previous program stays
    Failed,
    /// A newer request was already applied, or the backend changed since
    Stale,
}

/// Minimum time between two attempts to acquire a device from `render`.
const REACQUIRE_INTERVAL: Duration = Duration::from_secs(1);

/// What `render` does about the device before drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceAction {
    Draw,
    Reacquire,
    Skip,
}

/// `since_attempt` is the time since the last acquire attempt made by
/// `render`, if any.
fn device_action(has_device: bool, has_window: bool, since_attempt: Option<Duration>) -> DeviceAction {
    if has_device {
        DeviceAction::Draw
    } else if !has_window || since_attempt.is_some_and(|elapsed| elapsed < REACQUIRE_INTERVAL) {
        DeviceAction::Skip
    } else {
        DeviceAction::Reacquire
    }
}

/// Device-side state. Dropped as a whole when the device must be re-acquired.
struct GpuState {
    gpu: Gpu,
    binding: FieldBinding,
    hud: HudRenderer,
    axes: AxesRenderer,
    backend: Option<RenderBackend>,
}

impl GpuState {
    fn new(gpu: Gpu) -> Self {
        let binding = FieldBinding::new(gpu.device());
        let hud = HudRenderer::new(gpu.device(), gpu.surface_format(), gpu.width(), gpu.height());
        let axes = AxesRenderer::new(gpu.device(), gpu.surface_format());
        Self {
            gpu,
            binding,
            hud,
            axes,
            backend: None,
        }
    }
}

struct BoundProgram {
    generation: u64,
    program: CompiledProgram,
}

pub struct RendererContext {
    config: Config,
    /// Config changed at runtime and should be written back on exit
    config_dirty: bool,
    field: FieldSource,
    document: Option<IrmfDocument>,
    region: BoundingRegion,
    rig: CameraRig,
    trackball: Trackball,
    hud: HudCamera,
    backend: BackendKind,
    resolution: Resolution,
    palette: [[f32; 4]; MAX_MATERIALS],
    includes: Box<dyn IncludeResolver>,

    next_generation: u64,
    applied_generation: u64,
    bound: Option<BoundProgram>,
    diagnostics: Vec<Diagnostic>,

    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    last_reacquire: Option<Instant>,
}

impl RendererContext {
    /// Creates a headless context for a `width` x `height` canvas.
    pub fn new(config: Config, width: u32, height: u32) -> Self {
        let region = BoundingRegion::default();
        let aspect = if height == 0 { 1.0 } else { width as f32 / height as f32 };
        let includes: Box<dyn IncludeResolver> = match config.includes.resolved_cache_dir() {
            Some(dir) => Box::new(CacheDirIncludes::new(dir)),
            None => Box::new(NoIncludes),
        };
        Self {
            rig: CameraRig::new(region, aspect, config.camera.clone()),
            trackball: Trackball::new(config.trackball.clone(), width, height),
            hud: HudCamera::new(config.hud.clone(), width, height),
            resolution: config.slicer.resolution,
            field: FieldSource::new("", Default::default(), vec![]),
            document: None,
            region,
            backend: BackendKind::default(),
            palette: DEFAULT_PALETTE.map(|c| c.to_uniform()),
            includes,
            next_generation: 0,
            applied_generation: 0,
            bound: None,
            diagnostics: Vec::new(),
            window: None,
            gpu: None,
            last_reacquire: None,
            config_dirty: false,
            config,
        }
    }

    /// Replaces the include resolver used by later compiles.
    pub fn set_include_resolver(&mut self, includes: Box<dyn IncludeResolver>) {
        self.includes = includes;
    }

    /// Attaches a window; the device is acquired now and re-acquired after
    /// device loss.
    pub fn attach_window(&mut self, window: Arc<Window>) -> anyhow::Result<()> {
        self.window = Some(window);
        self.ensure_gpu()
    }

    fn ensure_gpu(&mut self) -> anyhow::Result<()> {
        if self.gpu.as_ref().is_some_and(|state| !state.gpu.is_lost()) {
            return Ok(());
        }
        let Some(window) = self.window.clone() else {
            return Ok(());
        };
        if self.gpu.take().is_some() {
            tracing::warn!("Re-acquiring graphics device");
        }
        let mut state = GpuState::new(Gpu::new(window, self.config.window.vsync)?);

        // Restore the last good program on the fresh device.
        if let Some(bound) = &self.bound {
            match RenderBackend::build(&state.gpu, &state.binding, &bound.program) {
                Ok(backend) => state.backend = Some(backend),
                Err(e) => tracing::error!("{e}"),
            }
        }
        self.on_resize_state(&mut state);
        self.gpu = Some(state);
        Ok(())
    }

    fn on_resize_state(&self, state: &mut GpuState) {
        if let Some(window) = &self.window {
            let size = window.inner_size();
            state.gpu.resize(size.width, size.height);
            state.hud.resize(state.gpu.device(), state.gpu.width(), state.gpu.height());
        }
    }

    /// Parses `text` as an IRMF document and makes it the current program.
    ///
    /// The region, palette and (if the document asks for one) resolution are
    /// taken from the header. Nothing is compiled until
    /// [`request_compile`](Self::request_compile).
    ///
    /// # Errors
    ///
    /// Returns the header error; the context is unchanged in that case.
    pub fn load_document(&mut self, text: impl Into<String>) -> Result<(), MetadataError> {
        let text = text.into();
        let document = IrmfDocument::parse(&text)?;

        if let Some(r) = document.header.options.resolution {
            match Resolution::try_from(r) {
                Ok(resolution) => self.resolution = resolution,
                Err(e) => tracing::warn!("{e}"),
            }
        }
        self.palette = document.header.options.palette();
        self.field = FieldSource::from_document(&document, text);
        let edit = self.region.replace(document.region());
        self.region_changed(edit);

        tracing::info!(
            "Loaded {} document with {} material(s)",
            document.dialect().name(),
            document.header.materials.len()
        );
        self.document = Some(document);
        Ok(())
    }

    /// Composes and compiles the current program for the active backend.
    pub fn request_compile(&mut self) -> CompileOutcome {
        if let Err(e) = self.ensure_gpu() {
            tracing::error!("Failed to acquire graphics device: {e:#}");
        }
        self.next_generation += 1;
        let generation = self.next_generation;
        let result = build(&self.field, self.backend, self.includes.as_ref());
        tracing::debug!("Compile request {generation} finished (ok: {})", result.is_ok());
        CompileOutcome {
            generation,
            backend: self.backend,
            result,
        }
    }

    /// Binds a finished compile unless something newer has been applied.
    ///
    /// On any failure the previously bound program and its pipeline stay in
    /// place, and the diagnostics describe what went wrong.
    pub fn apply_compile(&mut self, outcome: CompileOutcome) -> ApplyStatus {
        if outcome.generation <= self.applied_generation || outcome.backend != self.backend {
            tracing::debug!("Ignoring stale compile {}", outcome.generation);
            return ApplyStatus::Stale;
        }
        self.applied_generation = outcome.generation;

        let program = match outcome.result {
            Ok(program) => program,
            Err(e) => {
                tracing::warn!("{e}");
                self.diagnostics = e.diagnostics();
                return ApplyStatus::Failed;
            }
        };

        if let Some(state) = self.gpu.as_mut() {
            match RenderBackend::build(&state.gpu, &state.binding, &program) {
                Ok(backend) => state.backend = Some(backend),
                Err(e) => {
                    tracing::error!("{e}");
                    self.diagnostics = vec![Diagnostic::error(e.to_string(), None)];
                    if e.requires_reinit() {
                        self.teardown_gpu(&e);
                    }
                    return ApplyStatus::Failed;
                }
            }
        }

        tracing::info!(
            "Bound {} program (generation {})",
            program.backend.name(),
            outcome.generation
        );
        self.diagnostics = program.warnings.clone();
        self.bound = Some(BoundProgram {
            generation: outcome.generation,
            program,
        });
        ApplyStatus::Bound
    }

    /// Requests and applies a compile in one go.
    pub fn recompile(&mut self) -> ApplyStatus {
        let outcome = self.request_compile();
        self.apply_compile(outcome)
    }

    fn teardown_gpu(&mut self, reason: &GraphicsError) {
        tracing::warn!("Tearing down graphics device: {reason}");
        self.gpu = None;
    }

    /// Switches backend, discarding the old backend's program and pipeline,
    /// then compiles for the new one. Region and camera are untouched.
    pub fn set_backend(&mut self, backend: BackendKind) -> ApplyStatus {
        if backend == self.backend {
            return ApplyStatus::Stale;
        }
        tracing::info!("Switching to {} backend", backend.name());
        self.backend = backend;
        self.bound = None;
        if let Some(state) = self.gpu.as_mut() {
            state.backend = None;
        }
        self.recompile()
    }

    /// Moves one face of the region, clamping against its pair.
    pub fn edit_region(&mut self, bound: Bound, axis: Axis, value: f32) -> RegionEdit {
        let edit = self.region.clamp_edit(bound, axis, value);
        self.region_changed(edit);
        edit
    }

    fn region_changed(&mut self, edit: RegionEdit) {
        if edit.changed {
            self.rig.set_region(self.region, edit.resized);
            if edit.resized {
                self.trackball.reset();
            }
        }
    }

    /// Shows or hides the world axes.
    pub fn toggle_axes(&mut self) {
        self.config.axes.show = !self.config.axes.show;
        self.config_dirty = true;
        tracing::info!("Axes {}", if self.config.axes.show { "shown" } else { "hidden" });
    }

    /// Switches the world axes between drawn over and behind the field.
    pub fn toggle_axes_show_through(&mut self) {
        self.config.axes.show_through = !self.config.axes.show_through;
        self.config_dirty = true;
        tracing::info!("Axes show-through {}", self.config.axes.show_through);
    }

    /// Moves the slicer resolution one step and remembers it as the default
    /// for documents that do not ask for one.
    pub fn step_resolution(&mut self, up: bool) {
        let next = if up {
            self.resolution.step_up()
        } else {
            self.resolution.step_down()
        };
        self.set_resolution(next);
        if self.config.slicer.resolution != next {
            self.config.slicer.resolution = next;
            self.config_dirty = true;
        }
    }

    /// Config to write back on exit, `None` when nothing changed at runtime.
    pub fn changed_config(&self) -> Option<&Config> {
        self.config_dirty.then_some(&self.config)
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        if resolution != self.resolution {
            tracing::info!("Slicer resolution {resolution}");
            self.resolution = resolution;
        }
    }

    /// Applies a new canvas size to the cameras, the HUD and the surface.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.rig.resize(width, height);
        self.trackball.handle_resize(width, height);
        self.hud.resize(width, height);
        if let Some(state) = self.gpu.as_mut() {
            state.gpu.resize(width, height);
            state.hud.resize(state.gpu.device(), state.gpu.width(), state.gpu.height());
        }
        tracing::debug!("Resized to {width}x{height}");
    }

    pub fn apply_preset(&mut self, id: PresetId) {
        self.trackball.reset();
        self.rig.apply_preset(id);
        tracing::info!("View preset {}", id.preset().name);
    }

    /// Preset under a canvas pixel, if the pixel is on the HUD widget.
    pub fn pick_hud(&self, x: f32, y: f32) -> Option<PresetId> {
        self.hud.pick(x, y)
    }

    /// Left press in the main view: leaves orthographic, then starts a drag.
    pub fn begin_drag(&mut self, mode: DragMode, x: f32, y: f32) {
        if mode == DragMode::Rotate && self.rig.click() {
            self.trackball.reset();
        }
        self.trackball.begin(mode, x, y);
    }

    pub fn drag(&mut self, x: f32, y: f32) {
        self.trackball.drag(x, y);
    }

    pub fn end_drag(&mut self) {
        self.trackball.end();
    }

    pub fn wheel(&mut self, delta: WheelDelta) {
        self.trackball.wheel(delta);
    }

    /// Advances controls and the HUD camera by one frame.
    pub fn update(&mut self) {
        self.rig.update_controls(&mut self.trackball);
        self.hud.sync(self.rig.orientation(), self.rig.mode());
    }

    /// Makes sure a usable device exists before a frame is drawn.
    ///
    /// A lost device is dropped, and with a window attached a new one is
    /// acquired (at most once per [`REACQUIRE_INTERVAL`]) with the bound
    /// program rebuilt on it. Returns whether a device is ready.
    fn prepare_device(&mut self) -> bool {
        if self.gpu.as_ref().is_some_and(|state| state.gpu.is_lost()) {
            self.teardown_gpu(&GraphicsError::DeviceLost);
        }
        let action = device_action(
            self.gpu.is_some(),
            self.window.is_some(),
            self.last_reacquire.map(|at| at.elapsed()),
        );
        match action {
            DeviceAction::Draw => true,
            DeviceAction::Skip => false,
            DeviceAction::Reacquire => {
                self.last_reacquire = Some(Instant::now());
                if let Err(e) = self.ensure_gpu() {
                    tracing::error!("Failed to acquire graphics device: {e:#}");
                }
                self.gpu.is_some()
            }
        }
    }

    /// Draws one frame. Without a device (headless, or while a lost device
    /// cannot be replaced) only the camera state advances.
    pub fn render(&mut self) {
        self.update();
        if !self.prepare_device() {
            return;
        }
        let Some(state) = self.gpu.as_ref() else {
            return;
        };

        let uniforms = FrameUniforms::new(
            self.backend,
            &FrameScene {
                region: &self.region,
                rig: &self.rig,
                resolution: self.resolution,
                raymarch: &self.config.raymarch,
                palette: self.palette,
            },
        );
        state.binding.write(state.gpu.queue(), &uniforms);

        let frame = match state.gpu.acquire() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Timeout) => return,
            Err(e) => {
                tracing::error!("Failed to acquire surface texture: {e}");
                return;
            }
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = state
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let axes_pass = self.config.axes.pass();
        let axes = main_axes(&self.region);
        let axes_view_proj = scene_view_proj(self.backend, &self.rig);
        let clear = wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT);
        if axes_pass == AxesPass::BeforeField {
            state.axes.render(state.gpu.queue(), &mut encoder, &view, axes_view_proj, &axes, clear);
        }
        let field_load = match axes_pass {
            AxesPass::BeforeField => wgpu::LoadOp::Load,
            _ => clear,
        };

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Field Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: field_load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            if let Some(backend) = state.backend.as_ref().filter(|b| b.kind() == self.backend) {
                pass.set_bind_group(0, state.binding.bind_group(), &[]);
                backend.draw(&mut pass, self.resolution.get());
            }
        }

        if axes_pass == AxesPass::AfterField {
            let load = wgpu::LoadOp::Load;
            state.axes.render(state.gpu.queue(), &mut encoder, &view, axes_view_proj, &axes, load);
        }
        state.hud.render(state.gpu.queue(), &mut encoder, &view, &self.hud);

        state.gpu.queue().submit(std::iter::once(encoder.finish()));
        state.gpu.window().pre_present_notify();
        frame.present();
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn document(&self) -> Option<&IrmfDocument> {
        self.document.as_ref()
    }

    pub fn field(&self) -> &FieldSource {
        &self.field
    }

    pub fn region(&self) -> &BoundingRegion {
        &self.region
    }

    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    pub fn hud(&self) -> &HudCamera {
        &self.hud
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Diagnostics from the latest applied compile.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn bound_program(&self) -> Option<&CompiledProgram> {
        self.bound.as_ref().map(|b| &b.program)
    }

    /// Generation of the bound program, 0 when nothing is bound.
    pub fn bound_generation(&self) -> u64 {
        self.bound.as_ref().map_or(0, |b| b.generation)
    }

    pub fn has_gpu(&self) -> bool {
        self.gpu.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use irmf_core::camera::Projection;
    use irmf_core::metadata::{Dialect, STARTUP_DOCUMENT};

    const WGSL_DOCUMENT: &str = "/*{
  irmf: \"1.0\",
  language: \"wgsl\",
  materials: [\"PLA\"],
  max: [2,3,4],
  min: [-2,-3,-4],
  options: { resolution: 128 },
  units: \"mm\",
}*/

fn mainModel4(xyz: vec3f) -> vec4f {
    let r = length(xyz);
    return vec4f(select(0.0, 1.0, r <= 2.0), 0.0, 0.0, r - 2.0);
}
";

    fn context() -> RendererContext {
        let mut ctx = RendererContext::new(Config::default(), 1280, 720);
        ctx.set_include_resolver(Box::new(NoIncludes));
        ctx
    }

    fn startup() -> RendererContext {
        let mut ctx = context();
        ctx.load_document(STARTUP_DOCUMENT).unwrap();
        ctx
    }

    #[test]
    fn test_compile_binds_program() {
        let mut ctx = startup();
        assert!(ctx.bound_program().is_none());
        assert_eq!(ctx.recompile(), ApplyStatus::Bound);
        assert_eq!(ctx.bound_generation(), 1);
        assert_eq!(ctx.bound_program().map(|p| p.backend), Some(BackendKind::Slicer));
        assert!(ctx.diagnostics().is_empty());
        assert!(!ctx.has_gpu());
    }

    #[test]
    fn test_stale_outcome_never_replaces_newer() {
        let mut ctx = startup();
        let older = ctx.request_compile();
        ctx.load_document(WGSL_DOCUMENT).unwrap();
        let newer = ctx.request_compile();
        assert!(newer.generation > older.generation);

        assert_eq!(ctx.apply_compile(newer), ApplyStatus::Bound);
        assert_eq!(ctx.apply_compile(older), ApplyStatus::Stale);
        assert_eq!(ctx.bound_program().map(|p| p.dialect), Some(Dialect::Wgsl));
    }

    #[test]
    fn test_stale_failure_keeps_newer_diagnostics() {
        let mut ctx = startup();
        let broken = STARTUP_DOCUMENT.replace("float r = length(xyz - pos);", "float r = length(xyz - pos)");
        ctx.load_document(broken).unwrap();
        let older = ctx.request_compile();
        ctx.load_document(STARTUP_DOCUMENT).unwrap();
        let newer = ctx.request_compile();

        assert_eq!(ctx.apply_compile(newer), ApplyStatus::Bound);
        assert_eq!(ctx.apply_compile(older), ApplyStatus::Stale);
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_failed_compile_keeps_previous_program() {
        let mut ctx = startup();
        assert_eq!(ctx.recompile(), ApplyStatus::Bound);
        let good = ctx.bound_program().cloned();

        let broken = STARTUP_DOCUMENT.replace("return r <= radius ? 1.0 : 0.0;", "return r <= radius ? 1.0 : ;");
        ctx.load_document(broken).unwrap();
        assert_eq!(ctx.recompile(), ApplyStatus::Failed);

        assert_eq!(ctx.bound_program().cloned(), good);
        assert_eq!(ctx.bound_generation(), 1);
        let error = crate::shader_gen::first_error(ctx.diagnostics()).unwrap();
        // Line 11 of the document holds the return statement.
        assert_eq!(error.location.map(|p| p.line), Some(11));
    }

    #[test]
    fn test_load_document_sets_region_and_resolution() {
        let mut ctx = context();
        ctx.load_document(WGSL_DOCUMENT).unwrap();
        assert_eq!(ctx.region().min(), Vec3::new(-2.0, -3.0, -4.0));
        assert_eq!(ctx.region().max(), Vec3::new(2.0, 3.0, 4.0));
        assert_eq!(ctx.resolution().get(), 128);
        assert_eq!(ctx.rig().target(), Vec3::ZERO);
        assert_eq!(ctx.rig().last_preset(), Some(PresetId::DEFAULT));
    }

    #[test]
    fn test_invalid_document_changes_nothing() {
        let mut ctx = startup();
        let before = *ctx.region();
        let err = ctx.load_document("not a document").unwrap_err();
        assert_eq!(err.line(), 1);
        assert_eq!(*ctx.region(), before);
        assert_eq!(ctx.field().dialect, Dialect::Glsl);
    }

    #[test]
    fn test_set_backend_recompiles_and_keeps_camera() {
        let mut ctx = startup();
        ctx.recompile();
        ctx.apply_preset(PresetId::Top);
        let pose = ctx.rig().pose();
        let region = *ctx.region();

        assert_eq!(ctx.set_backend(BackendKind::Raymarcher), ApplyStatus::Bound);
        assert_eq!(ctx.backend(), BackendKind::Raymarcher);
        assert_eq!(ctx.bound_program().map(|p| p.backend), Some(BackendKind::Raymarcher));
        assert_eq!(ctx.rig().pose(), pose);
        assert_eq!(*ctx.region(), region);

        // A compile requested for the old backend is stale after switching.
        let mut other = startup();
        let outcome = other.request_compile();
        let outcome = CompileOutcome {
            generation: ctx.bound_generation() + 10,
            ..outcome
        };
        assert_eq!(ctx.apply_compile(outcome), ApplyStatus::Stale);
    }

    #[test]
    fn test_raymarcher_rejects_many_materials_and_keeps_slicer_usable() {
        let mut ctx = context();
        let doc = WGSL_DOCUMENT
            .replace("materials: [\"PLA\"]", "materials: [\"a\",\"b\",\"c\",\"d\",\"e\"]")
            .replace(
                "fn mainModel4(xyz: vec3f) -> vec4f {\n    let r = length(xyz);\n    return vec4f(select(0.0, 1.0, r <= 2.0), 0.0, 0.0, r - 2.0);\n}",
                "fn mainModel9(xyz: vec3f) -> mat3x3f {\n    return mat3x3f(vec3f(1.0), vec3f(0.0), vec3f(0.0));\n}",
            );
        ctx.load_document(doc).unwrap();
        assert_eq!(ctx.recompile(), ApplyStatus::Bound);
        assert_eq!(ctx.set_backend(BackendKind::Raymarcher), ApplyStatus::Failed);
        assert!(ctx.diagnostics()[0].message.contains("unsupported"));
        assert_eq!(ctx.set_backend(BackendKind::Slicer), ApplyStatus::Bound);
    }

    #[test]
    fn test_edit_region_clamps_and_reframes_on_resize() {
        let mut ctx = startup();
        ctx.apply_preset(PresetId::Right);
        let edit = ctx.edit_region(Bound::Min, Axis::X, 7.0);
        assert!(edit.changed && edit.resized);
        assert_eq!(ctx.region().min().x, 7.0);
        assert_eq!(ctx.region().max().x, 7.0);
        assert_eq!(ctx.rig().last_preset(), Some(PresetId::DEFAULT));
        assert_eq!(ctx.rig().target(), ctx.region().center());

        let edit = ctx.edit_region(Bound::Max, Axis::X, 7.0);
        assert!(!edit.changed);
    }

    #[test]
    fn test_resize_updates_cameras_and_hud() {
        let mut ctx = startup();
        ctx.on_resize(800, 400);
        assert!((ctx.rig().aspect() - 2.0).abs() < 1e-6);
        let vp = ctx.hud().viewport();
        assert_eq!((vp.width, vp.height), (256, 256));
        assert_eq!((vp.x, vp.y), (544, 0));

        ctx.on_resize(200, 100);
        let vp = ctx.hud().viewport();
        assert_eq!((vp.width, vp.height), (200, 100));
    }

    #[test]
    fn test_click_in_ortho_switches_to_perspective() {
        let mut ctx = startup();
        ctx.apply_preset(PresetId::Front);
        assert_eq!(ctx.rig().mode(), Projection::Orthographic);
        ctx.begin_drag(DragMode::Rotate, 10.0, 10.0);
        ctx.end_drag();
        assert_eq!(ctx.rig().mode(), Projection::Perspective);
    }

    #[test]
    fn test_lost_device_is_reacquired_with_window() {
        assert_eq!(device_action(true, true, None), DeviceAction::Draw);
        assert_eq!(device_action(false, true, None), DeviceAction::Reacquire);
        assert_eq!(
            device_action(false, true, Some(REACQUIRE_INTERVAL + Duration::from_millis(1))),
            DeviceAction::Reacquire
        );
        // Failed attempts are retried, but not every frame.
        assert_eq!(device_action(false, true, Some(Duration::from_millis(16))), DeviceAction::Skip);
        assert_eq!(device_action(false, false, None), DeviceAction::Skip);
    }

    #[test]
    fn test_teardown_keeps_program_for_rebuild() {
        let mut ctx = startup();
        assert_eq!(ctx.recompile(), ApplyStatus::Bound);
        let good = ctx.bound_program().cloned();

        ctx.teardown_gpu(&GraphicsError::DeviceLost);
        ctx.render();
        assert!(!ctx.has_gpu());
        assert!(ctx.last_reacquire.is_none());
        // The program survives to be rebuilt on the next device.
        assert_eq!(ctx.bound_program().cloned(), good);
        assert_eq!(ctx.bound_generation(), 1);
    }

    #[test]
    fn test_axes_toggles_mark_config_changed() {
        let mut ctx = startup();
        assert!(ctx.changed_config().is_none());
        assert_eq!(ctx.config().axes.pass(), AxesPass::AfterField);

        ctx.toggle_axes_show_through();
        assert_eq!(ctx.config().axes.pass(), AxesPass::BeforeField);
        ctx.toggle_axes();
        assert_eq!(ctx.config().axes.pass(), AxesPass::Hidden);

        let changed = ctx.changed_config().unwrap();
        assert!(!changed.axes.show);
        assert!(!changed.axes.show_through);
    }

    #[test]
    fn test_stepped_resolution_becomes_default() {
        let mut ctx = context();
        ctx.load_document(WGSL_DOCUMENT).unwrap();
        ctx.step_resolution(true);
        assert_eq!(ctx.resolution().get(), 256);
        let changed = ctx.changed_config().unwrap();
        assert_eq!(changed.slicer.resolution.get(), 256);

        // The document's own resolution is not written back.
        let mut ctx = context();
        ctx.load_document(WGSL_DOCUMENT).unwrap();
        assert!(ctx.changed_config().is_none());
    }

    #[test]
    fn test_render_headless_syncs_hud() {
        let mut ctx = startup();
        ctx.apply_preset(PresetId::Top);
        ctx.render();
        assert_eq!(ctx.hud().projection(), ctx.rig().mode());
        // The HUD camera looks along the same axis as the main camera.
        let main_dir = (ctx.rig().pose().position - ctx.rig().target()).normalize();
        let hud_dir = ctx.hud().position().normalize();
        assert!(main_dir.dot(hud_dir) > 0.999);
    }
}
