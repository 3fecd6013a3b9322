//! Material color mixing for the slicer
//!
//! Each material weight is tinted with a palette color and the results are
//! summed. Three materials named `NAME.H`, `NAME.S`, `NAME.V` (or `.H/.S/.L`,
//! `.R/.G/.B`) are instead treated as the channels of one full-color model.

use std::collections::BTreeMap;

use crate::metadata::Dialect;

/// 1-based material indices of one full-color triplet, in channel order
/// (h, s, v), (h, s, l) or (r, g, b).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Triplet(pub usize, pub usize, pub usize);

impl Triplet {
    fn is_complete(&self) -> bool {
        self.0 != 0 && self.1 != 0 && self.2 != 0
    }

    fn indices(&self) -> [usize; 3] {
        [self.0, self.1, self.2]
    }
}

/// Full-color models found in a material list, keyed by base name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MaterialClasses {
    pub hsv: BTreeMap<String, Triplet>,
    pub hsl: BTreeMap<String, Triplet>,
    pub rgb: BTreeMap<String, Triplet>,
}

/// Groups suffixed material names into complete color triplets.
///
/// `.H` and `.S` count toward both HSV and HSL; whichever model is missing
/// its third channel is dropped.
pub fn classify_materials<S: AsRef<str>>(names: &[S]) -> MaterialClasses {
    let mut classes = MaterialClasses::default();
    for (i, name) in names.iter().enumerate() {
        let name = name.as_ref();
        let Some((base, suffix)) = name.rsplit_once('.') else {
            continue;
        };
        if base.is_empty() {
            continue;
        }
        let n = i + 1;
        match suffix {
            "H" => {
                slot(&mut classes.hsv, base).0 = n;
                slot(&mut classes.hsl, base).0 = n;
            }
            "S" => {
                slot(&mut classes.hsv, base).1 = n;
                slot(&mut classes.hsl, base).1 = n;
            }
            "V" => slot(&mut classes.hsv, base).2 = n,
            "L" => slot(&mut classes.hsl, base).2 = n,
            "R" => slot(&mut classes.rgb, base).0 = n,
            "G" => slot(&mut classes.rgb, base).1 = n,
            "B" => slot(&mut classes.rgb, base).2 = n,
            _ => {}
        }
    }
    classes.hsv.retain(|_, t| t.is_complete());
    classes.hsl.retain(|_, t| t.is_complete());
    classes.rgb.retain(|_, t| t.is_complete());
    classes
}

fn slot<'a>(map: &'a mut BTreeMap<String, Triplet>, base: &str) -> &'a mut Triplet {
    map.entry(base.to_string()).or_default()
}

/// How the user function hands back material weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialLayout {
    /// `vec4`, materials 1..=4
    Vec4,
    /// 3x3 matrix, materials 5..=9
    Mat3,
    /// 4x4 matrix, materials 10..=16
    Mat4,
}

impl MaterialLayout {
    pub fn for_count(count: usize) -> Self {
        match count {
            0..=4 => MaterialLayout::Vec4,
            5..=9 => MaterialLayout::Mat3,
            _ => MaterialLayout::Mat4,
        }
    }

    /// Name of the user function for this layout.
    pub fn entry_point(self) -> &'static str {
        match self {
            MaterialLayout::Vec4 => "mainModel4",
            MaterialLayout::Mat3 => "mainModel9",
            MaterialLayout::Mat4 => "mainModel16",
        }
    }

    /// Expression reading material `n` (1-based) out of `m`.
    pub fn accessor(self, n: usize) -> String {
        let i = n.saturating_sub(1);
        match self {
            MaterialLayout::Vec4 => format!("m.{}", ["x", "y", "z", "w"][i.min(3)]),
            MaterialLayout::Mat3 => format!("m[{}][{}]", i / 3, i % 3),
            MaterialLayout::Mat4 => format!("m[{}][{}]", i / 4, i % 4),
        }
    }
}

/// Generated color expression plus what it needs from the surrounding shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorMixer {
    pub layout: MaterialLayout,
    /// Expression of type `vec4` assigned to the fragment output
    pub expression: String,
    /// Material names that get their own palette entry, in palette order
    pub palette_names: Vec<String>,
    pub uses_hsv: bool,
    pub uses_hsl: bool,
}

/// Builds the slicer's color expression for `names`.
pub fn color_mixer<S: AsRef<str>>(names: &[S], dialect: Dialect) -> ColorMixer {
    let classes = classify_materials(names);
    let layout = MaterialLayout::for_count(names.len());
    let acc = |n: usize| layout.accessor(n);
    let vec4 = match dialect {
        Dialect::Glsl => "vec4",
        Dialect::Wgsl => "vec4f",
    };

    let mut used = vec![false; names.len() + 1];
    let mut terms = Vec::new();
    let mut mark = |t: &Triplet| {
        for n in t.indices() {
            if let Some(u) = used.get_mut(n) {
                *u = true;
            }
        }
    };

    for t in classes.hsv.values() {
        mark(t);
        terms.push(format!("hsv({},{},{})", acc(t.0), acc(t.1), acc(t.2)));
    }
    for t in classes.hsl.values() {
        mark(t);
        terms.push(format!("hsl({},{},{})", acc(t.0), acc(t.1), acc(t.2)));
    }
    for t in classes.rgb.values() {
        mark(t);
        let (r, g, b) = (acc(t.0), acc(t.1), acc(t.2));
        terms.push(format!("{vec4}({r},{g},{b},max({r},max({g},{b})))"));
    }

    let mut palette_names = Vec::new();
    for (i, name) in names.iter().enumerate() {
        let n = i + 1;
        if used[n] {
            continue;
        }
        let color = match dialect {
            Dialect::Glsl => format!("u_color{}", palette_names.len() + 1),
            Dialect::Wgsl => format!("u.colors[{}]", palette_names.len()),
        };
        terms.push(format!("{color}*{}", acc(n)));
        palette_names.push(name.as_ref().to_string());
    }

    let scale = match dialect {
        Dialect::Glsl => "u_d",
        Dialect::Wgsl => "in.u_d",
    };
    ColorMixer {
        layout,
        expression: format!("{scale}*({})", terms.join(" + ")),
        palette_names,
        uses_hsv: !classes.hsv.is_empty(),
        uses_hsl: !classes.hsl.is_empty(),
    }
}
