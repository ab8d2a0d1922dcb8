//! CSS optimization with lightningcss.
//!
//! The generated CSS goes through parse, minify and print twice. The first
//! pass flattens nesting, which can leave identical selectors next to each
//! other; only the second pass merges those.
//!
//! When a source map is requested the maps of both passes are chained (and
//! chained onto the compiler's input map if one is given), and the media
//! range fixup below shifts generated columns so the final map still lines
//! up with the rewritten text.

use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use lightningcss::targets::{Browsers, Features, Targets};
use parcel_sourcemap::SourceMap;
use regex::Regex;
use std::sync::{Arc, LazyLock, RwLock};
use tracing::{trace, warn};

use crate::error::OptimizeError;

/// Pseudo-classes from component frameworks that lightningcss does not know.
const BENIGN_PSEUDOS: [&str; 3] = ["deep", "slotted", "global"];

/// `(width >= X)` / `(width <= X)`, which some browsers still reject.
static MEDIA_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*width\s*(>=|<=)\s*([^)\s]+)\s*\)").expect("valid regex")
});

/// Browsers the generated CSS must run in (Tailwind v4's baseline).
/// Versions are `major << 16 | minor << 8`.
fn targets() -> Targets {
    Targets {
        browsers: Some(Browsers {
            chrome: Some(111 << 16),
            firefox: Some(128 << 16),
            safari: Some((16 << 16) | (4 << 8)),
            ..Browsers::default()
        }),
        include: Features::Nesting,
        exclude: Features::empty(),
    }
}

#[derive(Debug, Clone)]
pub struct OptimizeOptions {
    /// File name recorded in diagnostics and the source map.
    pub file: String,
    pub minify: bool,
    /// Emit a source map for the output.
    pub sourcemap: bool,
    /// Source map of the input CSS (JSON), chained into the output map.
    pub input_map: Option<String>,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            file: "windpress.css".to_string(),
            minify: false,
            sourcemap: false,
            input_map: None,
        }
    }
}

impl OptimizeOptions {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Self::default()
        }
    }

    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    pub fn with_sourcemap(mut self, sourcemap: bool, input_map: Option<String>) -> Self {
        self.sourcemap = sourcemap;
        self.input_map = input_map;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Optimized {
    pub code: String,
    /// Source map JSON, present when requested.
    pub map: Option<String>,
    /// Non-benign warnings from the parser.
    pub warnings: Vec<String>,
}

struct Pass {
    code: String,
    map: Option<SourceMap>,
}

/// Optimize generated CSS.
pub fn optimize(css: &str, options: &OptimizeOptions) -> Result<Optimized, OptimizeError> {
    let mut warnings = Vec::new();
    let first = transform(css, options, &mut warnings)?;
    let second = transform(&first.code, options, &mut warnings)?;

    let (code, final_map) = rewrite_media_ranges(&second.code, second.map, options.minify);

    let map = match final_map {
        Some(mut map) => {
            if let Some(mut first_map) = first.map {
                map.extends(&mut first_map).map_err(sourcemap_error)?;
            }
            if let Some(input) = &options.input_map {
                let mut input_map = SourceMap::from_json("/", input).map_err(sourcemap_error)?;
                map.extends(&mut input_map).map_err(sourcemap_error)?;
            }
            Some(map.to_json(None).map_err(sourcemap_error)?)
        }
        None => None,
    };

    for warning in &warnings {
        warn!("{}: {}", options.file, warning);
    }

    Ok(Optimized { code, map, warnings })
}

fn transform(css: &str, options: &OptimizeOptions, warnings: &mut Vec<String>) -> Result<Pass, OptimizeError> {
    let collected = Arc::new(RwLock::new(Vec::new()));

    let mut stylesheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: options.file.clone(),
            error_recovery: true,
            warnings: Some(collected.clone()),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| OptimizeError::Parse {
        file: options.file.clone(),
        message: e.to_string(),
    })?;

    stylesheet
        .minify(MinifyOptions {
            targets: targets(),
            ..MinifyOptions::default()
        })
        .map_err(|e| OptimizeError::Minify {
            file: options.file.clone(),
            message: e.to_string(),
        })?;

    let mut map = if options.sourcemap {
        let mut map = SourceMap::new("/");
        map.add_source(&options.file);
        map.set_source_content(0, css).map_err(sourcemap_error)?;
        Some(map)
    } else {
        None
    };

    let result = stylesheet
        .to_css(PrinterOptions {
            minify: options.minify,
            source_map: map.as_mut(),
            targets: targets(),
            ..PrinterOptions::default()
        })
        .map_err(|e| OptimizeError::Print {
            file: options.file.clone(),
            message: e.to_string(),
        })?;

    if let Ok(list) = collected.read() {
        for warning in list.iter() {
            let message = warning.to_string();
            if is_benign(&message) {
                trace!("ignoring benign warning: {message}");
            } else if !warnings.contains(&message) {
                warnings.push(message);
            }
        }
    }

    Ok(Pass {
        code: result.code,
        map,
    })
}

pub(crate) fn is_benign(message: &str) -> bool {
    BENIGN_PSEUDOS.iter().any(|name| {
        message.contains(&format!(":{name}")) || (message.contains("pseudo") && message.contains(name))
    })
}

/// Rewrite media range syntax into `min-width`/`max-width`, shifting source
/// map columns on each edited line. Matches are applied right to left so
/// earlier offsets stay valid.
fn rewrite_media_ranges(code: &str, mut map: Option<SourceMap>, minify: bool) -> (String, Option<SourceMap>) {
    let mut lines = Vec::new();

    for (line_index, line) in code.split('\n').enumerate() {
        let matches: Vec<_> = MEDIA_RANGE_RE.captures_iter(line).collect();
        if matches.is_empty() {
            lines.push(line.to_string());
            continue;
        }

        let mut text = line.to_string();
        for caps in matches.iter().rev() {
            let Some(whole) = caps.get(0) else { continue };
            let feature = if &caps[1] == ">=" { "min-width" } else { "max-width" };
            let replacement = if minify {
                format!("({feature}:{})", &caps[2])
            } else {
                format!("({feature}: {})", &caps[2])
            };

            let delta = replacement.len() as i64 - whole.len() as i64;
            text.replace_range(whole.range(), &replacement);

            if let Some(map) = map.as_mut().filter(|_| delta != 0) {
                if let Err(e) = map.offset_columns(line_index as u32, whole.end() as u32, delta) {
                    trace!("no mappings to shift on line {line_index}: {e:?}");
                }
            }
        }
        lines.push(text);
    }

    (lines.join("\n"), map)
}

fn sourcemap_error(err: parcel_sourcemap::SourceMapError) -> OptimizeError {
    OptimizeError::SourceMap(format!("{err:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_pass_merges_duplicate_rules() {
        let out = optimize("a{color:red}a{color:red}", &OptimizeOptions::default().with_minify(true)).unwrap();
        assert_eq!(out.code.trim(), "a{color:red}");
        assert!(out.map.is_none());
    }

    #[test]
    fn test_double_pass_merges_rules_left_by_flattening() {
        let css = ".btn{color:red;&:hover{color:blue}}.btn:hover{color:blue}";
        let options = OptimizeOptions::default().with_minify(true);
        let hovers = |code: &str| code.matches(".btn:hover{").count();

        let single = transform(css, &options, &mut Vec::new()).unwrap();
        assert_eq!(hovers(&single.code), 2);

        let out = optimize(css, &options).unwrap();
        assert_eq!(hovers(&out.code), 1);
        assert!(out.code.matches('{').count() < single.code.matches('{').count());
        assert!(!out.code.contains('&'));
    }

    #[test]
    fn test_rewrite_media_ranges() {
        let (code, _) = rewrite_media_ranges("@media (width>=768px){.a{color:red}}", None, true);
        assert_eq!(code, "@media (min-width:768px){.a{color:red}}");

        let (code, _) = rewrite_media_ranges("@media (width <= 40rem) {", None, false);
        assert_eq!(code, "@media (max-width: 40rem) {");
    }

    #[test]
    fn test_optimize_never_emits_range_syntax() {
        let css = "@media (min-width: 768px) { .md\\:p-4 { padding: 1rem } }";
        let out = optimize(css, &OptimizeOptions::default().with_minify(true)).unwrap();
        assert!(!out.code.contains("width>="));
        assert!(out.code.contains("768px"));
    }

    #[test]
    fn test_sourcemap_requested() {
        let css = ".a { color: red; }\n.b { color: blue; }\n";
        let out = optimize(css, &OptimizeOptions::new("main.css").with_sourcemap(true, None)).unwrap();
        let map: serde_json::Value = serde_json::from_str(out.map.as_deref().unwrap()).unwrap();
        assert_eq!(map["version"], 3);
        assert!(map["sources"].as_array().unwrap().iter().any(|s| s.as_str().unwrap().ends_with("main.css")));
    }

    #[test]
    fn test_benign_warning_filter() {
        assert!(is_benign("Unsupported pseudo class or element: deep"));
        assert!(is_benign("Unknown selector :slotted(div)"));
        assert!(!is_benign("Unexpected token Semicolon"));
    }
}
