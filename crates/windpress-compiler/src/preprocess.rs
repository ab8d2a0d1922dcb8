//! Entrypoint preprocessing before compilation.

use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{ParserOptions, StyleSheet};
use lightningcss::targets::{Features, Targets};
use regex::Regex;
use std::sync::LazyLock;

static APPLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@apply\b[^;{}]*;?").expect("valid regex"));

/// Flatten nested rules (`.a { &:hover {} }` -> `.a:hover {}`).
///
/// Tailwind at-rules (`@theme`, `@plugin`, `@apply`, ...) are kept as-is.
/// Returns an error message when the CSS cannot be parsed or when printing
/// would lose an `@apply`; callers should fall back to the original text.
pub fn flatten_nesting(css: &str, filename: &str) -> Result<String, String> {
    let stylesheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: filename.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| e.to_string())?;

    let targets = Targets {
        include: Features::Nesting,
        ..Targets::default()
    };
    let result = stylesheet
        .to_css(PrinterOptions {
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;

    let before = css.matches("@apply").count();
    let after = result.code.matches("@apply").count();
    if before != after {
        return Err(format!("nesting pass dropped {} @apply rule(s)", before - after.min(before)));
    }

    Ok(result.code)
}

/// Remove every `@apply` rule. Used in non-strict mode, where unknown
/// utilities in `@apply` would otherwise fail the whole build.
pub fn strip_apply(css: &str) -> String {
    APPLY_RE.replace_all(css, "").into_owned()
}
