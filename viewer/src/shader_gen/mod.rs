//! Field program composition and compilation
//!
//! The user's `mainModel4` is wrapped in a fixed prelude (uniforms, varyings)
//! and a backend-specific epilogue, then checked with naga:
//!
//! - Slicer: samples the field on each slice and mixes material colors
//! - Raymarcher: full-screen triangle plus a sphere-tracing loop
//!
//! Compiler positions are mapped back to the user's document, so the caller
//! never sees line numbers from the assembled text.

mod compiler;
mod compose;
mod diagnostics;
mod error;
mod includes;

pub use compiler::{CompiledProgram, FRAGMENT_ENTRY, VERTEX_ENTRY, compile};
pub use compose::{BackendKind, ComposedProgram, FieldSource, compose};
pub use diagnostics::{Diagnostic, Severity, SourcePos, first_error};
pub use error::{CompileError, IncludeError};
pub use includes::{CacheDirIncludes, IncludeResolver, MemoryIncludes, NoIncludes, include_url};

/// Composes and compiles in one step.
///
/// # Errors
///
/// See [`compose`] and [`compile`].
pub fn build(
    source: &FieldSource,
    backend: BackendKind,
    resolver: &dyn IncludeResolver,
) -> Result<CompiledProgram, CompileError> {
    compile(&compose(source, backend, resolver)?)
}

#[cfg(test)]
mod tests;
