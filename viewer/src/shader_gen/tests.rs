use super::*;
use irmf_core::metadata::{Dialect, IrmfDocument, STARTUP_DOCUMENT};

const WGSL_SPHERE: &str = "fn mainModel4(xyz: vec3f) -> vec4f {
    let r = length(xyz);
    let inside = select(0.0, 1.0, r <= 5.0);
    return vec4f(inside, 0.0, 0.0, r - 5.0);
}
";

const GLSL_SPHERE: &str = "void mainModel4(out vec4 materials, in vec3 xyz) {
    float r = length(xyz);
    materials = vec4(r <= 5.0 ? 1.0 : 0.0, 0.0, 0.0, r - 5.0);
}
";

const BACKENDS: [BackendKind; 2] = [BackendKind::Slicer, BackendKind::Raymarcher];

fn source(text: &str, dialect: Dialect) -> FieldSource {
    FieldSource::new(text, dialect, vec!["PLA".to_string()])
}

fn validate_wgsl(source: &str) -> Result<naga::Module, String> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| format!("WGSL parse error: {}", e.emit_to_string(source)))?;
    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| format!("Validation error: {e:?}"))?;
    Ok(module)
}

fn entry_points(module: &naga::Module) -> Vec<(String, naga::ShaderStage)> {
    module
        .entry_points
        .iter()
        .map(|ep| (ep.name.clone(), ep.stage))
        .collect()
}

fn errors(err: &CompileError) -> Vec<Diagnostic> {
    err.diagnostics().into_iter().filter(Diagnostic::is_error).collect()
}

/// Header line, `n - 2` numbered statements, return, closing brace.
fn long_wgsl_program(n: usize) -> Vec<String> {
    let mut lines = vec!["fn mainModel4(xyz: vec3f) -> vec4f {".to_string()];
    for i in 2..n - 1 {
        lines.push(format!("    let a{i} = {i}.0;"));
    }
    lines.push("    return vec4f(1.0, 0.0, 0.0, length(xyz) - 5.0);".to_string());
    lines.push("}".to_string());
    lines
}

#[test]
fn test_wgsl_programs_validate() {
    for backend in BACKENDS {
        let composed = compose(&source(WGSL_SPHERE, Dialect::Wgsl), backend, &NoIncludes).unwrap();
        assert!(composed.vertex.is_none());
        let module = validate_wgsl(&composed.text).unwrap_or_else(|e| panic!("{backend:?}: {e}"));
        let eps = entry_points(&module);
        assert!(eps.contains(&(VERTEX_ENTRY.to_string(), naga::ShaderStage::Vertex)));
        assert!(eps.contains(&(FRAGMENT_ENTRY.to_string(), naga::ShaderStage::Fragment)));

        let compiled = compile(&composed).unwrap();
        assert_eq!(compiled.vertex_source(), compiled.fragment);
    }
}

#[test]
fn test_glsl_programs_translate_to_wgsl() {
    for backend in BACKENDS {
        let compiled = build(&source(GLSL_SPHERE, Dialect::Glsl), backend, &NoIncludes)
            .unwrap_or_else(|e| panic!("{backend:?}: {:?}", e.diagnostics()));
        assert_eq!(compiled.dialect, Dialect::Glsl);

        let fragment = validate_wgsl(&compiled.fragment).unwrap();
        assert_eq!(
            entry_points(&fragment),
            vec![(FRAGMENT_ENTRY.to_string(), naga::ShaderStage::Fragment)]
        );
        let vertex = validate_wgsl(compiled.vertex_source()).unwrap();
        assert_eq!(
            entry_points(&vertex),
            vec![(VERTEX_ENTRY.to_string(), naga::ShaderStage::Vertex)]
        );
    }
}

#[test]
fn test_startup_document_compiles_for_both_backends() {
    let document = IrmfDocument::parse(STARTUP_DOCUMENT).unwrap();
    let field = FieldSource::from_document(&document, STARTUP_DOCUMENT);
    assert_eq!(field.dialect, Dialect::Glsl);
    for backend in BACKENDS {
        let compiled = build(&field, backend, &NoIncludes)
            .unwrap_or_else(|e| panic!("{backend:?}: {:?}", e.diagnostics()));
        assert!(compiled.warnings.is_empty());
    }
}

#[test]
fn test_main_vs_defined_once_per_backend() {
    for backend in BACKENDS {
        let composed = compose(&source(WGSL_SPHERE, Dialect::Wgsl), backend, &NoIncludes).unwrap();
        assert_eq!(composed.text.matches("fn main_vs").count(), 1, "{backend:?}");

        let composed = compose(&source(GLSL_SPHERE, Dialect::Glsl), backend, &NoIncludes).unwrap();
        assert_eq!(composed.text.matches("main_vs").count(), 0);
        let vertex = composed.vertex.unwrap();
        assert_eq!(vertex.matches("fn main_vs").count(), 1, "{backend:?}");
    }

    // Each backend carries its own vertex stage.
    let slicer = compose(&source(WGSL_SPHERE, Dialect::Wgsl), BackendKind::Slicer, &NoIncludes).unwrap();
    let raymarch = compose(&source(WGSL_SPHERE, Dialect::Wgsl), BackendKind::Raymarcher, &NoIncludes).unwrap();
    assert!(slicer.text.contains("instance_index"));
    assert!(!raymarch.text.contains("instance_index"));
}

#[test]
fn test_remap_first_middle_and_last_line() {
    let lines = long_wgsl_program(300);
    let text = lines.join("\n");
    for dialect in [Dialect::Wgsl, Dialect::Glsl] {
        for backend in BACKENDS {
            let composed = compose(&source(&text, dialect), backend, &NoIncludes).unwrap();
            let offset = composed.user_offset();
            assert_eq!(composed.user_lines(), 300);

            // The offset is exact: assembled line offset + 1 is user line 1.
            let assembled: Vec<&str> = composed.text.lines().collect();
            assert_eq!(assembled[offset as usize], lines[0]);
            assert_eq!(assembled[offset as usize + 149], lines[149]);
            assert_eq!(assembled[offset as usize + 299], lines[299]);

            for user_line in [1, 150, 300] {
                assert_eq!(
                    composed.remap(offset + user_line, 7),
                    Some(SourcePos { line: user_line, column: 7 })
                );
            }
            assert_eq!(composed.remap(offset, 1), None);
            assert_eq!(composed.remap(offset + 301, 1), None);
            assert_eq!(composed.remap(1, 1), None);
        }
    }
}

#[test]
fn test_raymarch_offset_includes_helpers() {
    let slicer = compose(&source(WGSL_SPHERE, Dialect::Wgsl), BackendKind::Slicer, &NoIncludes).unwrap();
    let raymarch = compose(&source(WGSL_SPHERE, Dialect::Wgsl), BackendKind::Raymarcher, &NoIncludes).unwrap();
    assert_ne!(slicer.user_offset(), raymarch.user_offset());
    for composed in [&slicer, &raymarch] {
        let first = composed.text.lines().nth(composed.user_offset() as usize);
        assert_eq!(first, WGSL_SPHERE.lines().next());
    }
}

#[test]
fn test_error_on_last_line_of_long_program() {
    let mut lines = long_wgsl_program(300);
    lines[299] = "}}".to_string();
    let text = lines.join("\n");
    for backend in BACKENDS {
        let err = build(&source(&text, Dialect::Wgsl), backend, &NoIncludes).unwrap_err();
        let errs = errors(&err);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].location.map(|p| p.line), Some(300), "{backend:?}: {errs:?}");
    }
}

#[test]
fn test_syntax_error_on_line_three_reports_line_three() {
    let text = "fn mainModel4(xyz: vec3f) -> vec4f {
    let r = length(xyz);
    let d = r - ;
    return vec4f(1.0, 0.0, 0.0, d);
}
";
    for backend in BACKENDS {
        let err = build(&source(text, Dialect::Wgsl), backend, &NoIncludes).unwrap_err();
        let errs = errors(&err);
        assert_eq!(errs.len(), 1, "{errs:?}");
        let pos = errs[0].location.unwrap();
        assert_eq!(pos.line, 3);
        assert!(first_error(&errs).is_some());
        assert_eq!(pos.byte_offset(text).map(|o| &text[o..o + 1]), Some(";"));
    }

    let text = "void mainModel4(out vec4 materials, in vec3 xyz) {
    float r = length(xyz);
    float d = r - ;
    materials = vec4(1.0, 0.0, 0.0, d);
}
";
    for backend in BACKENDS {
        let err = build(&source(text, Dialect::Glsl), backend, &NoIncludes).unwrap_err();
        let first = first_error(&err.diagnostics()).cloned().unwrap();
        assert_eq!(first.location.map(|p| p.line), Some(3), "{backend:?}: {first}");
    }
}

#[test]
fn test_error_lines_count_the_header() {
    let text = "/*{
  irmf: \"1.0\",
  language: \"wgsl\",
  materials: [\"PLA\"],
  max: [5,5,5],
  min: [-5,-5,-5],
  units: \"mm\",
}*/

fn mainModel4(xyz: vec3f) -> vec4f {
    return vec4f(1.0, 0.0, 0.0, length(xyz) - 5.0)
}
";
    let document = IrmfDocument::parse(text).unwrap();
    let field = FieldSource::from_document(&document, text);
    assert_eq!(field.dialect, Dialect::Wgsl);
    let err = build(&field, BackendKind::Slicer, &NoIncludes).unwrap_err();
    let errs = errors(&err);
    assert_eq!(errs.len(), 1);
    // The missing `;` is noticed at the closing brace.
    assert_eq!(errs[0].location.map(|p| p.line), Some(12));
}

#[test]
fn test_includes_are_spliced_before_user_code() {
    let mut includes = MemoryIncludes::new();
    includes.insert(
        "lygia/math/scale.wgsl",
        "#include \"./twice.wgsl\"\nconst SCALE: f32 = 0.5;\n",
    );
    includes.insert("lygia/math/twice.wgsl", "fn twice(x: f32) -> f32 { return 2.0 * x; }\n");

    let text = "#include \"lygia/math/scale.wgsl\"
fn mainModel4(xyz: vec3f) -> vec4f {
    let r = twice(length(xyz) * SCALE);
    return vec4f(1.0, 0.0, 0.0, r - 5.0);
}
";
    for backend in BACKENDS {
        let composed = compose(&source(text, Dialect::Wgsl), backend, &includes).unwrap();
        assert!(composed.diagnostics.is_empty());
        let twice = composed.text.find("fn twice").unwrap();
        let scale = composed.text.find("const SCALE").unwrap();
        let user = composed.text.find("fn mainModel4").unwrap();
        assert!(twice < scale && scale < user);
        assert_eq!(
            composed.text.lines().nth(composed.user_offset() as usize),
            Some("// #include \"lygia/math/scale.wgsl\"")
        );
        compile(&composed).unwrap();
    }

    // Positions stay exact with includes in front.
    let broken = text.replace("r - 5.0", "r - ");
    let err = build(&source(&broken, Dialect::Wgsl), BackendKind::Slicer, &includes).unwrap_err();
    assert_eq!(errors(&err)[0].location.map(|p| p.line), Some(4));
}

#[test]
fn test_unresolved_include_warns_on_its_line() {
    let text = format!("// helpers\n#include \"lygia/sdf/boxSDF.wgsl\"\n#include \"local.wgsl\"\n{WGSL_SPHERE}");
    let compiled = build(&source(&text, Dialect::Wgsl), BackendKind::Slicer, &NoIncludes).unwrap();
    let lines: Vec<u32> = compiled
        .warnings
        .iter()
        .map(|d| {
            assert_eq!(d.severity, Severity::Warning);
            d.location.unwrap().line
        })
        .collect();
    assert_eq!(lines, vec![2, 3]);
}

#[test]
fn test_glsl_version_line_is_commented_out() {
    let text = format!("#version 300 es\n{GLSL_SPHERE}");
    let composed = compose(&source(&text, Dialect::Glsl), BackendKind::Slicer, &NoIncludes).unwrap();
    assert_eq!(composed.text.matches("#version").count(), 2);
    assert!(composed.text.starts_with("#version 450"));
    assert_eq!(composed.user_lines(), 5);
    compile(&composed).unwrap();
}

#[test]
fn test_raymarcher_rejects_more_than_four_materials() {
    let names: Vec<String> = (1..=5).map(|i| format!("m{i}")).collect();
    let field = FieldSource::new(WGSL_SPHERE, Dialect::Wgsl, names);
    let err = compose(&field, BackendKind::Raymarcher, &NoIncludes).unwrap_err();
    assert!(matches!(err, CompileError::Unsupported(_)));
    assert_eq!(err.diagnostics().len(), 1);
    assert!(err.diagnostics()[0].location.is_none());
}

#[test]
fn test_slicer_nine_materials_use_mat3() {
    let text = "fn mainModel9(xyz: vec3f) -> mat3x3f {
    let r = select(0.0, 1.0, length(xyz) <= 5.0);
    return mat3x3f(r, 0.0, 0.0, 0.0, r, 0.0, 0.0, 0.0, r);
}
";
    let names: Vec<String> = (1..=9).map(|i| format!("m{i}")).collect();
    let field = FieldSource::new(text, Dialect::Wgsl, names);
    let composed = compose(&field, BackendKind::Slicer, &NoIncludes).unwrap();
    assert!(composed.text.contains("let m = mainModel9(in.v_xyz.xyz);"));
    assert_eq!(composed.palette_names.len(), 9);
    validate_wgsl(&composed.text).unwrap();
}

#[test]
fn test_color_helpers_only_when_needed() {
    let hsv_names = vec!["PLA.H".to_string(), "PLA.S".to_string(), "PLA.V".to_string()];

    let plain = compose(&source(WGSL_SPHERE, Dialect::Wgsl), BackendKind::Slicer, &NoIncludes).unwrap();
    assert!(!plain.text.contains("fn hsv"));
    assert!(!plain.text.contains("//FS_"));

    let field = FieldSource::new(WGSL_SPHERE, Dialect::Wgsl, hsv_names.clone());
    let composed = compose(&field, BackendKind::Slicer, &NoIncludes).unwrap();
    assert!(composed.text.contains("fn hsv"));
    assert!(!composed.text.contains("fn hsl"));
    assert!(composed.palette_names.is_empty());
    validate_wgsl(&composed.text).unwrap();

    let field = FieldSource::new(GLSL_SPHERE, Dialect::Glsl, hsv_names);
    let compiled = build(&field, BackendKind::Slicer, &NoIncludes)
        .unwrap_or_else(|e| panic!("{:?}", e.diagnostics()));
    validate_wgsl(&compiled.fragment).unwrap();
}
