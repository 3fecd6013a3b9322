//! Window, input and frame loop
//!
//! Wraps a [`RendererContext`] in winit's `ApplicationHandler`. Every event is
//! translated into a context call on the event-loop thread; the context never
//! sees winit types except the window handle.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use irmf_core::camera::{DragMode, PresetId, WheelDelta};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, ModifiersState, NamedKey};
use winit::window::{Window, WindowId};

use crate::context::{ApplyStatus, RendererContext};
use crate::shader_gen::Diagnostic;

/// Label used in log lines for documents that did not come from disk.
pub const BUILTIN_LABEL: &str = "<startup>";

/// Something the user asked for through the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Preset(PresetId),
    ToggleBackend,
    Recompile,
    ResolutionUp,
    ResolutionDown,
    ToggleAxes,
    ToggleAxesShowThrough,
}

/// Maps a key press to a command.
///
/// Presets 0 through 9 sit on the digit keys, 10 through 13 on `Q`, `W`, `E`
/// and `R`.
pub fn command_for_key(key: &Key, modifiers: ModifiersState) -> Option<Command> {
    match key {
        Key::Named(NamedKey::F5) => Some(Command::Recompile),
        Key::Named(NamedKey::Enter) if modifiers.control_key() => Some(Command::Recompile),
        Key::Character(c) => {
            let mut chars = c.chars();
            let ch = chars.next()?.to_ascii_lowercase();
            if chars.next().is_some() {
                return None;
            }
            match ch {
                '0'..='9' => PresetId::from_index(ch as usize - '0' as usize).map(Command::Preset),
                'q' => PresetId::from_index(10).map(Command::Preset),
                'w' => PresetId::from_index(11).map(Command::Preset),
                'e' => PresetId::from_index(12).map(Command::Preset),
                'r' => PresetId::from_index(13).map(Command::Preset),
                'b' => Some(Command::ToggleBackend),
                'a' => Some(Command::ToggleAxes),
                't' => Some(Command::ToggleAxesShowThrough),
                '[' => Some(Command::ResolutionDown),
                ']' => Some(Command::ResolutionUp),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Logs diagnostics as `file:line:col: severity: message`.
pub fn log_diagnostics(label: &str, diagnostics: &[Diagnostic]) {
    for d in diagnostics {
        if d.is_error() {
            tracing::error!("{label}:{d}");
        } else {
            tracing::warn!("{label}:{d}");
        }
    }
}

pub struct ViewerApp {
    context: RendererContext,
    /// Document on disk, re-read on every recompile
    path: Option<PathBuf>,
    window: Option<Arc<Window>>,
    cursor: (f32, f32),
    modifiers: ModifiersState,
    dragging: bool,
    exit_error: Option<anyhow::Error>,
}

impl ViewerApp {
    /// `context` should already hold the document loaded from `path`.
    pub fn new(context: RendererContext, path: Option<PathBuf>) -> Self {
        Self {
            context,
            path,
            window: None,
            cursor: (0.0, 0.0),
            modifiers: ModifiersState::empty(),
            dragging: false,
            exit_error: None,
        }
    }

    fn label(&self) -> String {
        self.path
            .as_ref()
            .map_or_else(|| BUILTIN_LABEL.to_string(), |p| p.display().to_string())
    }

    fn title(&self) -> String {
        let name = self
            .context
            .document()
            .and_then(|d| d.header.title.clone())
            .unwrap_or_else(|| self.label());
        format!("IRMF Viewer - {name} ({})", self.context.backend().name())
    }

    fn update_title(&self) {
        if let Some(window) = &self.window {
            window.set_title(&self.title());
        }
    }

    fn report(&self, status: ApplyStatus) {
        match status {
            ApplyStatus::Bound => {
                if !self.context.diagnostics().is_empty() {
                    log_diagnostics(&self.label(), self.context.diagnostics());
                }
            }
            ApplyStatus::Failed => {
                log_diagnostics(&self.label(), self.context.diagnostics());
                if self.context.bound_program().is_some() {
                    tracing::warn!("Keeping the previous program");
                }
            }
            ApplyStatus::Stale => {}
        }
    }

    /// Re-reads the document from disk, then compiles it.
    fn reload(&mut self) {
        if let Some(path) = &self.path {
            let label = path.display().to_string();
            match std::fs::read_to_string(path) {
                Ok(text) => {
                    if let Err(e) = self.context.load_document(text) {
                        tracing::error!("{label}:{}: error: {e}", e.line());
                        return;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to read {label}: {e}");
                    return;
                }
            }
        }
        let status = self.context.recompile();
        self.report(status);
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::Preset(id) => self.context.apply_preset(id),
            Command::ToggleBackend => {
                let status = self.context.set_backend(self.context.backend().toggled());
                self.report(status);
                self.update_title();
            }
            Command::Recompile => {
                self.reload();
                self.update_title();
            }
            Command::ResolutionUp => self.context.step_resolution(true),
            Command::ResolutionDown => self.context.step_resolution(false),
            Command::ToggleAxes => self.context.toggle_axes(),
            Command::ToggleAxesShowThrough => self.context.toggle_axes_show_through(),
        }
    }

    /// Writes settings changed at runtime back to the config file.
    fn save_config(&self) {
        if let Some(config) = self.context.changed_config() {
            match irmf_core::config::save(config) {
                Ok(()) => tracing::info!("Saved settings"),
                Err(e) => tracing::warn!("Failed to save settings: {e}"),
            }
        }
    }

    fn on_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        if let Some(command) = command_for_key(&event.logical_key, self.modifiers) {
            tracing::debug!("Command {command:?}");
            self.execute(command);
        }
    }

    fn on_mouse_button(&mut self, state: ElementState, button: MouseButton) {
        let (x, y) = self.cursor;
        match state {
            ElementState::Pressed => {
                let mode = match button {
                    MouseButton::Left => {
                        if let Some(id) = self.context.pick_hud(x, y) {
                            self.context.apply_preset(id);
                            return;
                        }
                        DragMode::Rotate
                    }
                    MouseButton::Middle => DragMode::Zoom,
                    MouseButton::Right => DragMode::Pan,
                    _ => return,
                };
                self.context.begin_drag(mode, x, y);
                self.dragging = true;
            }
            ElementState::Released => {
                if self.dragging {
                    self.context.end_drag();
                    self.dragging = false;
                }
            }
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window_config = &self.context.config().window;
        let window_attributes = Window::default_attributes()
            .with_title(self.title())
            .with_inner_size(winit::dpi::LogicalSize::new(window_config.width, window_config.height));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.exit_error = Some(anyhow::Error::new(e).context("Failed to create window"));
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        self.context.on_resize(size.width, size.height);
        if let Err(e) = self.context.attach_window(window.clone()) {
            self.exit_error = Some(e.context("Failed to initialize graphics"));
            event_loop.exit();
            return;
        }
        self.window = Some(window);

        let status = self.context.recompile();
        self.report(status);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Window close requested");
                self.save_config();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if size.width > 0 && size.height > 0 {
                    self.context.on_resize(size.width, size.height);
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput { event, .. } => self.on_key(&event),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
                if self.dragging {
                    self.context.drag(self.cursor.0, self.cursor.1);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => self.on_mouse_button(state, button),
            WindowEvent::MouseWheel { delta, .. } => {
                // winit reports scrolling up as positive; up zooms in.
                let delta = match delta {
                    MouseScrollDelta::LineDelta(_, y) => WheelDelta::Lines(-y),
                    MouseScrollDelta::PixelDelta(p) => WheelDelta::Pixels(-p.y as f32),
                };
                self.context.wheel(delta);
            }
            WindowEvent::RedrawRequested => self.context.render(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        // The trackball damps over several frames, so keep drawing.
        event_loop.set_control_flow(ControlFlow::Wait);
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Runs the viewer until its window closes.
pub fn run(mut app: ViewerApp) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.run_app(&mut app).context("Event loop error")?;
    match app.exit_error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
