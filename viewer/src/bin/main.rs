//! IRMF Viewer
//!
//! Renders an IRMF field program with the slicer or the raymarcher.
//!
//! # Usage
//!
//! ```bash
//! irmf-viewer model.irmf
//! irmf-viewer model.irmf --backend raymarch --preset 4
//! irmf-viewer model.irmf --check
//! irmf-viewer model.irmf --format > tidy.irmf
//! ```
//!
//! # Keyboard Shortcuts
//!
//! - 0-9, Q, W, E, R: View presets
//! - B: Toggle slicer / raymarcher
//! - F5, Ctrl+Enter: Reload the file and recompile
//! - [ and ]: Fewer / more slices
//! - A: Show / hide the world axes
//! - T: Draw the axes over / behind the model

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use irmf_core::camera::PresetId;
use irmf_core::metadata::STARTUP_DOCUMENT;
use irmf_core::slicer::Resolution;
use irmf_viewer::app::{BUILTIN_LABEL, ViewerApp, run};
use irmf_viewer::context::{ApplyStatus, RendererContext};
use irmf_viewer::shader_gen::BackendKind;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Slicer,
    Raymarch,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Slicer => BackendKind::Slicer,
            BackendArg::Raymarch => BackendKind::Raymarcher,
        }
    }
}

#[derive(Parser)]
#[command(name = "irmf-viewer")]
#[command(author, version, about = "Interactive viewer for IRMF implicit field models")]
struct Args {
    /// IRMF document to view (the built-in sphere model when omitted)
    file: Option<PathBuf>,

    /// Rendering backend
    #[arg(long, short = 'b', value_enum, default_value = "slicer")]
    backend: BackendArg,

    /// Number of slices (32, 64, 128, 256, 512, 1024 or 2048)
    #[arg(long, short = 'r')]
    resolution: Option<u32>,

    /// Initial view preset (0-13)
    #[arg(long, short = 'p', value_parser = clap::value_parser!(u8).range(0..14))]
    preset: Option<u8>,

    /// Compile only, print diagnostics and exit non-zero on errors
    #[arg(long)]
    check: bool,

    /// Print the document with a canonical header and exit
    #[arg(long, conflicts_with = "check")]
    format: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = irmf_core::config::load();

    let (text, label) = match &args.file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            (text, path.display().to_string())
        }
        None => (STARTUP_DOCUMENT.to_string(), BUILTIN_LABEL.to_string()),
    };

    if args.format {
        let document = irmf_core::IrmfDocument::parse(&text)
            .map_err(|e| anyhow::anyhow!("{label}:{}: error: {e}", e.line()))?;
        print!("{}", document.format()?);
        return Ok(());
    }

    let mut context = RendererContext::new(config.clone(), config.window.width, config.window.height);
    context
        .load_document(text)
        .map_err(|e| anyhow::anyhow!("{label}:{}: error: {e}", e.line()))?;

    if let Some(r) = args.resolution {
        let resolution = Resolution::try_from(r).map_err(anyhow::Error::msg)?;
        context.set_resolution(resolution);
    }
    if let Some(index) = args.preset {
        let id = PresetId::from_index(index as usize).context("Preset out of range")?;
        context.apply_preset(id);
    }

    let backend = BackendKind::from(args.backend);
    if args.check {
        return check(&mut context, backend, &label);
    }

    if backend != context.backend() {
        // Compiles headless here; the window picks the program up on resume.
        context.set_backend(backend);
    }
    run(ViewerApp::new(context, args.file))
}

fn check(context: &mut RendererContext, backend: BackendKind, label: &str) -> Result<()> {
    let status = if backend == context.backend() {
        context.recompile()
    } else {
        context.set_backend(backend)
    };
    for d in context.diagnostics() {
        println!("{label}:{d}");
    }
    match status {
        ApplyStatus::Bound => {
            println!("{label}: ok ({} backend)", backend.name());
            Ok(())
        }
        _ => anyhow::bail!("{label}: failed to compile for the {} backend", backend.name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_flag() {
        let args = Args::try_parse_from(["irmf-viewer", "model.irmf", "--format"]).unwrap();
        assert!(args.format);
        assert!(Args::try_parse_from(["irmf-viewer", "model.irmf", "--format", "--check"]).is_err());
    }
}
