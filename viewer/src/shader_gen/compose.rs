//! Program assembly
//!
//! Every program is `prelude + [leading block] + user code + epilogue`. The
//! composer remembers how many lines precede the user code so compiler
//! positions can be mapped back to the document.

use hashbrown::HashSet;
use irmf_core::materials::{ColorMixer, MaterialLayout, color_mixer};
use irmf_core::metadata::{Dialect, IrmfDocument, MAX_MATERIALS};

use super::diagnostics::{Diagnostic, SourcePos};
use super::error::CompileError;
use super::includes::{IncludeResolver, include_url, nested_include_url, parse_directive};

const PRELUDE_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/prelude.wgsl"));
const PRELUDE_GLSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/prelude.glsl"));
const SLICER_VS_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/slicer_vs.wgsl"));
const SLICER_FS_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/slicer_fs.wgsl"));
const SLICER_FS_GLSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/slicer_fs.glsl"));
const RAYMARCH_HELPERS_WGSL: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/shaders/raymarch_helpers.wgsl"
));
const RAYMARCH_VS_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/raymarch_vs.wgsl"));
const RAYMARCH_FS_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/raymarch_fs.wgsl"));
const RAYMARCH_FS_GLSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/raymarch_fs.glsl"));
const COLOR_MOD_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/color_mod.wgsl"));
const HSV_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/hsv.wgsl"));
const HSL_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/hsl.wgsl"));
const HSV_GLSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/hsv.glsl"));
const HSL_GLSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/hsl.glsl"));

/// Nesting limit for includes pulled in by other includes.
const MAX_INCLUDE_DEPTH: usize = 8;

/// Which renderer a program is assembled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendKind {
    #[default]
    Slicer,
    Raymarcher,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Slicer => "slicer",
            BackendKind::Raymarcher => "raymarcher",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            BackendKind::Slicer => BackendKind::Raymarcher,
            BackendKind::Raymarcher => BackendKind::Slicer,
        }
    }
}

/// The user's program and what the header says about it.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSource {
    /// Full document text; the header comment is part of it so that line
    /// numbers match the file
    pub text: String,
    pub dialect: Dialect,
    pub materials: Vec<String>,
}

impl FieldSource {
    pub fn new(text: impl Into<String>, dialect: Dialect, materials: Vec<String>) -> Self {
        Self {
            text: text.into(),
            dialect,
            materials,
        }
    }

    pub fn from_document(document: &IrmfDocument, text: impl Into<String>) -> Self {
        Self::new(text, document.dialect(), document.header.materials.clone())
    }
}

/// Assembled program text plus the mapping back to the user's lines.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedProgram {
    pub text: String,
    pub dialect: Dialect,
    pub backend: BackendKind,
    /// WGSL vertex stage for GLSL programs; WGSL programs carry their own
    pub vertex: Option<String>,
    /// Warnings raised while assembling (unresolved includes)
    pub diagnostics: Vec<Diagnostic>,
    /// Materials with their own palette color, in palette order
    pub palette_names: Vec<String>,
    user_offset: u32,
    user_lines: u32,
}

impl ComposedProgram {
    /// Lines of `text` preceding the user's first line.
    pub fn user_offset(&self) -> u32 {
        self.user_offset
    }

    pub fn user_lines(&self) -> u32 {
        self.user_lines
    }

    /// Maps a 1-based position in `text` to the user's document.
    ///
    /// Positions inside the prelude or epilogue map to `None`.
    pub fn remap(&self, line: u32, column: u32) -> Option<SourcePos> {
        let user_line = line.checked_sub(self.user_offset)?;
        (1..=self.user_lines)
            .contains(&user_line)
            .then_some(SourcePos { line: user_line, column })
    }
}

#[derive(Default)]
struct Assembly {
    text: String,
}

impl Assembly {
    fn push(&mut self, block: &str) {
        if block.is_empty() {
            return;
        }
        self.text.push_str(block);
        if !block.ends_with('\n') {
            self.text.push('\n');
        }
    }

    fn lines(&self) -> u32 {
        self.text.bytes().filter(|&b| b == b'\n').count() as u32
    }
}

/// Builds the program for `backend` from the user's source.
///
/// Only the active backend's vertex block is included, so `main_vs` is
/// defined exactly once whichever backend is selected.
///
/// # Errors
///
/// Returns [`CompileError::Unsupported`] when the material count does not fit
/// the backend.
pub fn compose(
    source: &FieldSource,
    backend: BackendKind,
    resolver: &dyn IncludeResolver,
) -> Result<ComposedProgram, CompileError> {
    let count = source.materials.len();
    if count > MAX_MATERIALS {
        return Err(CompileError::Unsupported(format!(
            "{count} materials declared, at most {MAX_MATERIALS} are supported"
        )));
    }
    let layout = MaterialLayout::for_count(count);
    if backend == BackendKind::Raymarcher && layout != MaterialLayout::Vec4 {
        return Err(CompileError::Unsupported(format!(
            "the raymarcher reads a signed distance from mainModel4; this model declares {count} materials (at most 4)"
        )));
    }

    let (user, directives) = strip_directives(&source.text, source.dialect);
    let mut includes = IncludeSet::new(resolver);
    for (line, path) in &directives {
        includes.add_top_level(*line, path);
    }

    let names: Vec<String> = if source.materials.is_empty() {
        vec!["material".to_string()]
    } else {
        source.materials.clone()
    };
    let mixer = color_mixer(&names, source.dialect);

    let mut asm = Assembly::default();
    let (user_offset, vertex) = match (source.dialect, backend) {
        (Dialect::Wgsl, BackendKind::Slicer) => {
            asm.push(PRELUDE_WGSL);
            asm.push(&includes.text);
            asm.push(SLICER_VS_WGSL);
            let offset = asm.lines();
            asm.push(&user);
            asm.push(&slicer_epilogue(&mixer, Dialect::Wgsl));
            (offset, None)
        }
        (Dialect::Wgsl, BackendKind::Raymarcher) => {
            asm.push(PRELUDE_WGSL);
            asm.push(RAYMARCH_HELPERS_WGSL);
            asm.push(&includes.text);
            let offset = asm.lines();
            asm.push(&user);
            asm.push(RAYMARCH_VS_WGSL);
            asm.push(RAYMARCH_FS_WGSL);
            (offset, None)
        }
        (Dialect::Glsl, BackendKind::Slicer) => {
            asm.push(PRELUDE_GLSL);
            asm.push(&includes.text);
            let offset = asm.lines();
            asm.push(&user);
            asm.push(&slicer_epilogue(&mixer, Dialect::Glsl));
            (offset, Some(vertex_module(SLICER_VS_WGSL)))
        }
        (Dialect::Glsl, BackendKind::Raymarcher) => {
            asm.push(PRELUDE_GLSL);
            asm.push(&includes.text);
            let offset = asm.lines();
            asm.push(&user);
            asm.push(RAYMARCH_FS_GLSL);
            (offset, Some(vertex_module(RAYMARCH_VS_WGSL)))
        }
    };

    tracing::debug!(
        "Composed {} {} program: {} prelude lines, {} include(s)",
        source.dialect.name(),
        backend.name(),
        user_offset,
        includes.seen.len()
    );

    Ok(ComposedProgram {
        text: asm.text,
        dialect: source.dialect,
        backend,
        vertex,
        diagnostics: includes.diagnostics,
        palette_names: mixer.palette_names,
        user_offset,
        user_lines: user.lines().count().max(1) as u32,
    })
}

fn vertex_module(block: &str) -> String {
    let mut asm = Assembly::default();
    asm.push(PRELUDE_WGSL);
    asm.push(block);
    asm.text
}

/// Comments out `#include` lines (and `#version` in GLSL, which the prelude
/// already declares) without changing the line count.
fn strip_directives(text: &str, dialect: Dialect) -> (String, Vec<(u32, String)>) {
    let mut directives = Vec::new();
    let mut lines = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if let Some(path) = parse_directive(line) {
            directives.push((i as u32 + 1, path.to_string()));
            lines.push(format!("// {}", line.trim()));
        } else if dialect == Dialect::Glsl && line.trim_start().starts_with("#version") {
            lines.push(format!("// {}", line.trim()));
        } else {
            lines.push(line.to_string());
        }
    }
    (lines.join("\n"), directives)
}

/// Include text gathered for one program, dependencies first.
struct IncludeSet<'r> {
    resolver: &'r dyn IncludeResolver,
    seen: HashSet<String>,
    text: String,
    diagnostics: Vec<Diagnostic>,
}

impl<'r> IncludeSet<'r> {
    fn new(resolver: &'r dyn IncludeResolver) -> Self {
        Self {
            resolver,
            seen: HashSet::new(),
            text: String::new(),
            diagnostics: Vec::new(),
        }
    }

    fn add_top_level(&mut self, line: u32, path: &str) {
        match include_url(path) {
            Ok(url) => self.expand(url, line, 0),
            Err(e) => self.warn(e.to_string(), line),
        }
    }

    fn expand(&mut self, url: String, line: u32, depth: usize) {
        if depth > MAX_INCLUDE_DEPTH {
            self.warn(format!("include {url} nested too deeply"), line);
            return;
        }
        if !self.seen.insert(url.clone()) {
            return;
        }
        let text = match self.resolver.resolve(&url) {
            Ok(text) => text,
            Err(e) => {
                self.warn(e.to_string(), line);
                return;
            }
        };
        tracing::debug!("Resolved include {url}");

        let mut body = String::with_capacity(text.len());
        for l in text.split('\n') {
            if let Some(path) = parse_directive(l) {
                match nested_include_url(&url, path) {
                    Ok(child) => self.expand(child, line, depth + 1),
                    Err(e) => self.warn(e.to_string(), line),
                }
                body.push_str("// ");
                body.push_str(l.trim());
            } else {
                body.push_str(l);
            }
            body.push('\n');
        }
        self.text.push_str(&body);
    }

    fn warn(&mut self, message: String, line: u32) {
        tracing::warn!("line {line}: {message}");
        self.diagnostics
            .push(Diagnostic::warning(message, Some(SourcePos { line, column: 1 })));
    }
}

/// The slicer fragment stage with the material read and color mixer filled in.
fn slicer_epilogue(mixer: &ColorMixer, dialect: Dialect) -> String {
    let entry = mixer.layout.entry_point();
    let (template, helpers, materials, output) = match dialect {
        Dialect::Wgsl => {
            let mut helpers = String::new();
            if mixer.uses_hsv || mixer.uses_hsl {
                helpers.push_str(COLOR_MOD_WGSL);
            }
            if mixer.uses_hsv {
                helpers.push_str(HSV_WGSL);
            }
            if mixer.uses_hsl {
                helpers.push_str(HSL_WGSL);
            }
            (
                SLICER_FS_WGSL,
                helpers,
                format!("    let m = {entry}(in.v_xyz.xyz);"),
                format!("    return {};", mixer.expression),
            )
        }
        Dialect::Glsl => {
            let mut helpers = String::new();
            if mixer.uses_hsv {
                helpers.push_str(HSV_GLSL);
            }
            if mixer.uses_hsl {
                helpers.push_str(HSL_GLSL);
            }
            let ty = match mixer.layout {
                MaterialLayout::Vec4 => "vec4",
                MaterialLayout::Mat3 => "mat3",
                MaterialLayout::Mat4 => "mat4",
            };
            (
                SLICER_FS_GLSL,
                helpers,
                format!("    {ty} m;\n    {entry}(m, v_xyz.xyz);"),
                format!("    out_FragColor = {};", mixer.expression),
            )
        }
    };
    template
        .replace("//FS_COLOR_HELPERS", &helpers)
        .replace("//FS_MATERIALS", &materials)
        .replace("//FS_OUTPUT", &output)
}
