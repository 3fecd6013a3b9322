//! Front-end compilation with naga
//!
//! Composed programs are parsed and validated here so that errors come back
//! with positions. GLSL programs are translated to WGSL for the device.

use irmf_core::metadata::Dialect;
use naga::valid::{Capabilities, ModuleInfo, ValidationFlags, Validator};

use super::compose::{BackendKind, ComposedProgram};
use super::diagnostics::Diagnostic;
use super::error::CompileError;

/// Vertex entry point in every composed program.
pub const VERTEX_ENTRY: &str = "main_vs";
/// Fragment entry point in every composed program.
pub const FRAGMENT_ENTRY: &str = "main";

/// A validated program, ready for pipeline creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProgram {
    pub backend: BackendKind,
    pub dialect: Dialect,
    /// WGSL holding [`FRAGMENT_ENTRY`]
    pub fragment: String,
    /// WGSL holding [`VERTEX_ENTRY`] when it is not part of `fragment`
    pub vertex: Option<String>,
    pub warnings: Vec<Diagnostic>,
    pub palette_names: Vec<String>,
}

impl CompiledProgram {
    pub fn vertex_source(&self) -> &str {
        self.vertex.as_deref().unwrap_or(&self.fragment)
    }
}

/// Parses and validates `program`.
///
/// # Errors
///
/// Returns [`CompileError::Diagnostics`] with positions in the user's
/// document, or [`CompileError::Translate`] if GLSL could not be written back
/// out as WGSL.
pub fn compile(program: &ComposedProgram) -> Result<CompiledProgram, CompileError> {
    let module = match program.dialect {
        Dialect::Wgsl => parse_wgsl(program)?,
        Dialect::Glsl => parse_glsl(program)?,
    };
    let info = validate(program, &module)?;

    let fragment = match program.dialect {
        Dialect::Wgsl => program.text.clone(),
        Dialect::Glsl => naga::back::wgsl::write_string(&module, &info, naga::back::wgsl::WriterFlags::empty())
            .map_err(|e| CompileError::Translate {
                dialect: "GLSL",
                message: e.to_string(),
            })?,
    };

    Ok(CompiledProgram {
        backend: program.backend,
        dialect: program.dialect,
        fragment,
        vertex: program.vertex.clone(),
        warnings: program.diagnostics.clone(),
        palette_names: program.palette_names.clone(),
    })
}

fn parse_wgsl(program: &ComposedProgram) -> Result<naga::Module, CompileError> {
    naga::front::wgsl::parse_str(&program.text).map_err(|e| {
        let location = e
            .location(&program.text)
            .and_then(|loc| program.remap(loc.line_number, loc.line_position));
        CompileError::Diagnostics(vec![Diagnostic::error(e.message(), location)])
    })
}

fn parse_glsl(program: &ComposedProgram) -> Result<naga::Module, CompileError> {
    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options::from(naga::ShaderStage::Fragment);
    frontend.parse(&options, &program.text).map_err(|e| {
        let diagnostics = e
            .errors
            .iter()
            .map(|err| {
                let loc = err.meta.location(&program.text);
                Diagnostic::error(err.kind.to_string(), program.remap(loc.line_number, loc.line_position))
            })
            .collect();
        CompileError::Diagnostics(diagnostics)
    })
}

fn validate(program: &ComposedProgram, module: &naga::Module) -> Result<ModuleInfo, CompileError> {
    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::default());
    validator.validate(module).map_err(|e| {
        let location = e
            .location(&program.text)
            .and_then(|loc| program.remap(loc.line_number, loc.line_position));
        CompileError::Diagnostics(vec![Diagnostic::error(error_chain(e.as_inner()), location)])
    })
}

/// `error: cause: cause` on one line.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
