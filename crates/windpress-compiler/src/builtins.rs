//! Tailwind core stylesheets bundled into every resolver volume.
//!
//! `@import "tailwindcss"` must resolve without a network round trip, so the
//! package entry and the utilities layer live at fixed virtual paths. The
//! theme and preflight files they import are large and versioned, and come
//! from the CDN.

use windpress_volume::Volume;

pub const TAILWIND_INDEX: &str = "/node_modules/tailwindcss/index.css";
pub const TAILWIND_UTILITIES: &str = "/node_modules/tailwindcss/utilities.css";

const INDEX_CSS: &str = "@layer theme, base, components, utilities;

@import './theme.css' layer(theme);
@import './preflight.css' layer(base);
@import './utilities.css' layer(utilities);
";

const UTILITIES_CSS: &str = "@tailwind utilities;\n";

/// Entrypoint used for Tailwind v3 builds when the volume has no `/main.css`.
pub const LEGACY_MAIN_CSS: &str = "@tailwind base;\n@tailwind components;\n@tailwind utilities;\n";

pub fn stylesheets() -> [(&'static str, &'static str); 2] {
    [(TAILWIND_INDEX, INDEX_CSS), (TAILWIND_UTILITIES, UTILITIES_CSS)]
}

/// Copy of `volume` with the built-in stylesheets merged under user files.
pub fn with_builtins(volume: &Volume) -> Volume {
    volume.with_fallbacks(stylesheets())
}
