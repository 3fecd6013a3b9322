//! IRMF document header
//!
//! An IRMF document starts with a JSON header wrapped in a block comment:
//!
//! ```text
//! /*{
//!   irmf: "1.0",
//!   materials: ["PLA"],
//!   max: [5,5,5],
//!   min: [-5,-5,-5],
//!   units: "mm",
//! }*/
//! ...shader source...
//! ```
//!
//! The header is parsed leniently (unquoted keys, trailing commas) because
//! documents are hand-edited. Since the header is a comment in both shader
//! dialects, the whole document is handed to the compiler unchanged and
//! diagnostics refer to document lines.

use glam::Vec3;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::region::BoundingRegion;

/// Maximum number of materials in an IRMF 1.0 model.
pub const MAX_MATERIALS: usize = 16;

const HEADER_START: &str = "/*{";
const HEADER_END: &str = "\n}*/";

/// Header parse and validation failures.
///
/// Every variant knows the 1-based document line to highlight.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetadataError {
    #[error("unable to find leading \"/*{{\"")]
    MissingStart,
    #[error("unable to find trailing \"}}*/\"")]
    MissingEnd { line: usize },
    #[error("unable to parse JSON header: {message}")]
    Json { message: String },
    #[error("invalid header: {message}")]
    Invalid { message: String, line: usize },
    #[error("encoding {encoding:?} is not supported, store the shader source as plain text")]
    UnsupportedEncoding { encoding: String, line: usize },
}

impl MetadataError {
    /// 1-based line of the document the error refers to.
    pub fn line(&self) -> usize {
        match self {
            MetadataError::MissingStart => 1,
            MetadataError::Json { .. } => 2,
            MetadataError::MissingEnd { line }
            | MetadataError::Invalid { line, .. }
            | MetadataError::UnsupportedEncoding { line, .. } => *line,
        }
    }
}

/// Shader language of the document body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Glsl,
    Wgsl,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Glsl => "glsl",
            Dialect::Wgsl => "wgsl",
        }
    }
}

/// A palette color: red, green and blue in `0..=255`, alpha in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Rgba(pub [f64; 4]);

impl Rgba {
    /// Normalized color as uploaded to the shader.
    pub fn to_uniform(self) -> [f32; 4] {
        let [r, g, b, a] = self.0;
        [(r / 255.0) as f32, (g / 255.0) as f32, (b / 255.0) as f32, a as f32]
    }

    /// Inverse of [`Rgba::to_uniform`], rounding channels to integers.
    pub fn from_uniform(c: [f32; 4]) -> Self {
        let channel = |v: f32| (0.5 + 255.0 * f64::from(v)).floor();
        Rgba([channel(c[0]), channel(c[1]), channel(c[2]), f64::from(c[3])])
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        compact_numbers(&self.0, serializer)
    }
}

/// Default palette, `color1` through `color16`.
pub const DEFAULT_PALETTE: [Rgba; MAX_MATERIALS] = [
    Rgba([255.0, 0.0, 0.0, 1.0]),
    Rgba([0.0, 255.0, 0.0, 1.0]),
    Rgba([0.0, 0.0, 255.0, 1.0]),
    Rgba([255.0, 255.0, 0.0, 1.0]),
    Rgba([0.0, 255.0, 255.0, 1.0]),
    Rgba([255.0, 0.0, 255.0, 1.0]),
    Rgba([128.0, 0.0, 0.0, 1.0]),
    Rgba([0.0, 128.0, 0.0, 1.0]),
    Rgba([0.0, 0.0, 128.0, 1.0]),
    Rgba([128.0, 128.0, 0.0, 1.0]),
    Rgba([0.0, 128.0, 128.0, 1.0]),
    Rgba([128.0, 0.0, 128.0, 1.0]),
    Rgba([64.0, 128.0, 64.0, 1.0]),
    Rgba([128.0, 64.0, 128.0, 1.0]),
    Rgba([64.0, 64.0, 128.0, 1.0]),
    Rgba([64.0, 128.0, 128.0, 1.0]),
];

/// Viewer options stored in the header.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IrmfOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<u32>,
    /// `color1` .. `color16` and any keys this viewer does not interpret
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl IrmfOptions {
    /// Palette color `n` (1-based), if present and well formed.
    pub fn color(&self, n: usize) -> Option<Rgba> {
        let value = self.extra.get(&format!("color{n}"))?;
        serde_json::from_value(value.clone()).ok()
    }

    pub fn set_color(&mut self, n: usize, color: Rgba) {
        if let Ok(value) = serde_json::to_value(color) {
            self.extra.insert(format!("color{n}"), value);
        }
    }

    /// Uniform palette with header colors overriding the defaults.
    pub fn palette(&self) -> [[f32; 4]; MAX_MATERIALS] {
        std::array::from_fn(|i| self.color(i + 1).unwrap_or(DEFAULT_PALETTE[i]).to_uniform())
    }
}

/// The JSON header. Field order is the order `format` writes keys in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IrmfHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default)]
    pub irmf: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Dialect>,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default, serialize_with = "compact_numbers")]
    pub max: Vec<f64>,
    #[serde(default, serialize_with = "compact_numbers")]
    pub min: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub options: IrmfOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub units: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl IrmfHeader {
    pub fn dialect(&self) -> Dialect {
        self.language.unwrap_or_default()
    }

    /// Region spanned by `min` and `max`. Only meaningful after validation.
    pub fn region(&self) -> BoundingRegion {
        let v = |a: &[f64]| match a {
            [x, y, z] => Vec3::new(*x as f32, *y as f32, *z as f32),
            _ => Vec3::ZERO,
        };
        BoundingRegion::new(v(&self.min), v(&self.max))
    }

    /// Checks the header against IRMF 1.0. `header_text` is the raw header,
    /// used to locate the offending key.
    pub fn validate(&self, header_text: &str) -> Result<(), MetadataError> {
        let invalid = |key: &str, message: String| MetadataError::Invalid {
            message,
            line: key_line(header_text, key),
        };

        if self.irmf != "1.0" {
            return Err(invalid("irmf", format!("unsupported IRMF version: {:?}", self.irmf)));
        }
        if self.materials.is_empty() {
            return Err(invalid("materials", "must list at least one material name".into()));
        }
        if self.materials.len() > MAX_MATERIALS {
            return Err(invalid(
                "materials",
                format!(
                    "IRMF 1.0 only supports up to {MAX_MATERIALS} materials, found {}",
                    self.materials.len()
                ),
            ));
        }
        if self.max.len() != 3 {
            return Err(invalid("max", format!("max must have only 3 values, found {}", self.max.len())));
        }
        if self.min.len() != 3 {
            return Err(invalid("min", format!("min must have only 3 values, found {}", self.min.len())));
        }
        if self.units.is_empty() {
            return Err(invalid("units", "units are required by IRMF 1.0".into()));
        }
        for (i, axis) in ["x", "y", "z"].iter().enumerate() {
            if self.min[i] >= self.max[i] {
                return Err(invalid(
                    "min",
                    format!(
                        "min.{axis} ({}) must be strictly less than max.{axis} ({})",
                        self.min[i], self.max[i]
                    ),
                ));
            }
        }
        if let Some(res) = self.options.resolution
            && !crate::slicer::Resolution::SUPPORTED.contains(&res)
        {
            return Err(invalid("resolution", format!("unsupported resolution: {res}")));
        }
        if let Some(encoding) = &self.encoding {
            return Err(MetadataError::UnsupportedEncoding {
                encoding: encoding.clone(),
                line: key_line(header_text, "encoding"),
            });
        }
        Ok(())
    }
}

/// A parsed IRMF document.
#[derive(Debug, Clone, PartialEq)]
pub struct IrmfDocument {
    pub header: IrmfHeader,
    /// Shader source following the header
    pub body: String,
}

impl IrmfDocument {
    /// Parses and validates `source`.
    pub fn parse(source: &str) -> Result<Self, MetadataError> {
        if !source.starts_with(HEADER_START) {
            return Err(MetadataError::MissingStart);
        }
        let end = find_header_end(source).ok_or_else(|| MetadataError::MissingEnd {
            line: unterminated_line(source),
        })?;

        // `{ ... }` without the comment markers
        let json = &source[2..end + 2];
        let header: IrmfHeader = serde_json::from_str(&relax_json(json))
            .map_err(|e| MetadataError::Json { message: e.to_string() })?;
        header.validate(json)?;

        let body_start = (end + HEADER_END.len() + 1).min(source.len());
        Ok(Self {
            header,
            body: source[body_start..].to_string(),
        })
    }

    /// Checks the header. [`IrmfDocument::parse`] already does this; call it
    /// again after editing the header in place.
    pub fn validate(&self) -> Result<(), MetadataError> {
        self.header.validate("")
    }

    /// Canonical text: pretty JSON header with compact arrays, then the body.
    pub fn format(&self) -> Result<String, MetadataError> {
        let pretty = serde_json::to_string_pretty(&self.header)
            .map_err(|e| MetadataError::Json { message: e.to_string() })?;
        Ok(format!("/*{}*/\n{}", compact_arrays(&pretty), self.body))
    }

    pub fn dialect(&self) -> Dialect {
        self.header.dialect()
    }

    pub fn region(&self) -> BoundingRegion {
        self.header.region()
    }

    /// Number of newlines before the body starts.
    pub fn header_lines(&self, source: &str) -> usize {
        source.len().checked_sub(self.body.len()).map_or(0, |n| {
            source[..n].bytes().filter(|&b| b == b'\n').count()
        })
    }
}

/// The built-in model shown when no document is given.
pub const STARTUP_DOCUMENT: &str = r#"/*{
  irmf: "1.0",
  materials: ["PLA"],
  max: [5,5,5],
  min: [-5,-5,-5],
  units: "mm",
}*/

float sphere(in vec3 pos, in float radius, in vec3 xyz) {
  float r = length(xyz - pos);
  return r <= radius ? 1.0 : 0.0;
}

// 1.0 is the cube; the sphere is carved out of it.
void mainModel4(out vec4 materials, in vec3 xyz) {
  float radius = 6.0;
  materials = vec4(1.0 - sphere(vec3(0.0), radius, xyz), 0.0, 0.0, 0.0);
}
"#;

/// Byte offset of the `\n` starting the header terminator.
fn find_header_end(source: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(i) = source[from..].find(HEADER_END) {
        let at = from + i;
        let after = at + HEADER_END.len();
        match source.as_bytes().get(after) {
            None | Some(b'\n') | Some(b'\r') => return Some(at),
            _ => from = at + 1,
        }
    }
    None
}

/// Best guess for where an unterminated header was meant to end.
fn unterminated_line(source: &str) -> usize {
    ["*/", "}*", "}"]
        .iter()
        .find_map(|needle| {
            source
                .lines()
                .position(|l| l.contains(needle))
                .map(|i| i + 1)
                .filter(|&line| line > 2)
        })
        .unwrap_or(1)
}

/// 1-based line of the first line mentioning `key` as an object key.
fn key_line(header_text: &str, key: &str) -> usize {
    let quoted = format!("\"{key}\"");
    header_text
        .lines()
        .position(|line| {
            let l = line.trim_start();
            l.starts_with(&quoted) || (l.starts_with(key) && l[key.len()..].trim_start().starts_with(':'))
        })
        // The header text starts at the `{` on line 1 of the document.
        .map_or(2, |i| i + 1)
}

/// Turns hand-written JavaScript-style objects into strict JSON: bare keys
/// are quoted and trailing commas dropped. String literals are left alone.
fn relax_json(src: &str) -> String {
    let chars: Vec<char> = src.chars().collect();
    let mut out = String::with_capacity(src.len() + 32);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                let start = i;
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                let end = (i + 1).min(chars.len());
                out.extend(&chars[start..end]);
                i = end;
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
                i += 1;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let is_key = chars[i..].iter().find(|c| !c.is_whitespace()) == Some(&':');
                if is_key {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                } else {
                    out.push_str(&word);
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Removes whitespace inside arrays, outside string literals.
fn compact_arrays(pretty: &str) -> String {
    let mut out = String::with_capacity(pretty.len());
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for c in pretty.chars() {
        if in_string {
            out.push(c);
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth > 0 => continue,
            _ => {}
        }
        out.push(c);
    }
    out
}

/// Writes integral values without a fractional part (`5` rather than `5.0`).
fn compact_numbers<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(values.len()))?;
    for &v in values {
        if v.fract() == 0.0 && v.abs() < 1e15 {
            seq.serialize_element(&(v as i64))?;
        } else {
            seq.serialize_element(&v)?;
        }
    }
    seq.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(header: &str, body: &str) -> String {
        format!("/*{{\n{header}\n}}*/\n{body}")
    }

    #[test]
    fn test_parse_startup_document() {
        let d = IrmfDocument::parse(STARTUP_DOCUMENT).unwrap();
        assert_eq!(d.header.irmf, "1.0");
        assert_eq!(d.header.materials, vec!["PLA"]);
        assert_eq!(d.header.units, "mm");
        assert_eq!(d.dialect(), Dialect::Glsl);
        assert_eq!(d.region(), BoundingRegion::default());
        assert!(d.body.starts_with("\nfloat sphere"));
        assert_eq!(d.header_lines(STARTUP_DOCUMENT), 7);
    }

    #[test]
    fn test_strict_json_and_wgsl_language() {
        let src = doc(
            r#"  "irmf": "1.0", "language": "wgsl", "materials": ["a", "b"],
  "max": [1, 2, 3], "min": [0, 0, 0], "units": "mm""#,
            "fn mainModel4(xyz: vec3f) -> vec4f { return vec4f(1.0); }\n",
        );
        let d = IrmfDocument::parse(&src).unwrap();
        assert_eq!(d.dialect(), Dialect::Wgsl);
        assert_eq!(d.header.max, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_missing_start() {
        let err = IrmfDocument::parse("void main() {}").unwrap_err();
        assert_eq!(err, MetadataError::MissingStart);
        assert_eq!(err.line(), 1);
    }

    #[test]
    fn test_missing_end_points_at_closing_line() {
        let src = "/*{\n  irmf: \"1.0\",\n  units: \"mm\"\n}*\nvoid f() {}\n";
        let err = IrmfDocument::parse(src).unwrap_err();
        assert!(matches!(err, MetadataError::MissingEnd { .. }));
        assert_eq!(err.line(), 4);
    }

    #[test]
    fn test_bad_json_is_line_two() {
        let err = IrmfDocument::parse(&doc("  irmf: 1.0.0", "")).unwrap_err();
        assert!(matches!(err, MetadataError::Json { .. }));
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn test_validation_messages() {
        let base = |extra: &str| {
            doc(
                &format!("  irmf: \"1.0\",\n  materials: [\"PLA\"],\n  units: \"mm\",\n{extra}"),
                "",
            )
        };

        let err = IrmfDocument::parse(&base("  max: [5,5,5],\n  min: [5,-5,-5],")).unwrap_err();
        assert_eq!(err.to_string(), "invalid header: min.x (5) must be strictly less than max.x (5)");
        assert_eq!(err.line(), 6);

        let err = IrmfDocument::parse(&base("  max: [5,5],\n  min: [-5,-5,-5],")).unwrap_err();
        assert_eq!(err.to_string(), "invalid header: max must have only 3 values, found 2");
        assert_eq!(err.line(), 5);

        let many: Vec<String> = (0..17).map(|i| format!("\"m{i}\"")).collect();
        let src = doc(
            &format!(
                "  irmf: \"1.0\",\n  materials: [{}],\n  max: [1,1,1],\n  min: [0,0,0],\n  units: \"mm\",",
                many.join(",")
            ),
            "",
        );
        let err = IrmfDocument::parse(&src).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid header: IRMF 1.0 only supports up to 16 materials, found 17"
        );
        assert_eq!(err.line(), 3);
    }

    #[test]
    fn test_missing_units() {
        let src = doc("  irmf: \"1.0\",\n  materials: [\"PLA\"],\n  max: [1,1,1],\n  min: [0,0,0],", "");
        let err = IrmfDocument::parse(&src).unwrap_err();
        assert_eq!(err.to_string(), "invalid header: units are required by IRMF 1.0");
    }

    #[test]
    fn test_gzip_encoding_is_rejected() {
        let src = doc(
            "  encoding: \"gzip+base64\",\n  irmf: \"1.0\",\n  materials: [\"PLA\"],\n  max: [1,1,1],\n  min: [0,0,0],\n  units: \"mm\",",
            "H4sIAAAAAAAA",
        );
        let err = IrmfDocument::parse(&src).unwrap_err();
        assert!(matches!(err, MetadataError::UnsupportedEncoding { .. }));
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn test_relax_json_leaves_strings_alone() {
        let relaxed = relax_json(r#"{ title: "a, b: c}", materials: ["x",], }"#);
        assert_eq!(relaxed, r#"{ "title": "a, b: c}", "materials": ["x"] }"#);
    }

    #[test]
    fn test_format_is_canonical() {
        let d = IrmfDocument::parse(STARTUP_DOCUMENT).unwrap();
        let formatted = d.format().unwrap();
        let expected = "/*{\n  \"irmf\": \"1.0\",\n  \"materials\": [\"PLA\"],\n  \"max\": [5,5,5],\n  \"min\": [-5,-5,-5],\n  \"options\": {},\n  \"units\": \"mm\"\n}*/\n";
        assert!(formatted.starts_with(expected), "{formatted}");
        assert!(formatted.ends_with(&d.body));

        // Formatting is stable.
        let again = IrmfDocument::parse(&formatted).unwrap();
        assert_eq!(again.format().unwrap(), formatted);
    }

    #[test]
    fn test_format_keeps_spaces_in_material_names() {
        let mut d = IrmfDocument::parse(STARTUP_DOCUMENT).unwrap();
        d.header.materials = vec!["PLA blue".into(), "steel".into()];
        let formatted = d.format().unwrap();
        assert!(formatted.contains("\"materials\": [\"PLA blue\",\"steel\"]"));
    }

    #[test]
    fn test_options_palette() {
        let src = doc(
            "  irmf: \"1.0\",\n  materials: [\"PLA\"],\n  max: [1,1,1],\n  min: [0,0,0],\n  options: { resolution: 256, color1: [0,255,0,0.5] },\n  units: \"mm\",",
            "",
        );
        let d = IrmfDocument::parse(&src).unwrap();
        assert_eq!(d.header.options.resolution, Some(256));
        let palette = d.header.options.palette();
        assert_eq!(palette[0], [0.0, 1.0, 0.0, 0.5]);
        assert_eq!(palette[1], [0.0, 1.0, 0.0, 1.0]);

        let mut opts = IrmfOptions::default();
        opts.set_color(3, Rgba::from_uniform([0.5, 0.25, 1.0, 1.0]));
        assert_eq!(opts.color(3), Some(Rgba([128.0, 64.0, 255.0, 1.0])));
        let json = serde_json::to_string(&opts).unwrap();
        assert_eq!(json, r#"{"color3":[128,64,255,1]}"#);
    }

    #[test]
    fn test_unsupported_resolution() {
        let src = doc(
            "  irmf: \"1.0\",\n  materials: [\"PLA\"],\n  max: [1,1,1],\n  min: [0,0,0],\n  options: { resolution: 100 },\n  units: \"mm\",",
            "",
        );
        let err = IrmfDocument::parse(&src).unwrap_err();
        assert!(err.to_string().contains("unsupported resolution: 100"));
    }
}
