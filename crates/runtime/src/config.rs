use std::path::PathBuf;

pub const PROGRAM_NAME: &str = "packrat";
pub const PROGRAM_LOG_LEVEL: &str = "PACKRAT_LOG_LEVEL";
pub const GALLERY_FILE_NAME: &str = "gallery.json";

/// Upper bound on parenthesis nesting accepted by the search parser.
pub const DEFAULT_MAX_QUERY_DEPTH: usize = 100;
pub const MAX_QUERY_DEPTH_ENV: &str = "PACKRAT_MAX_QUERY_DEPTH";
/// Hard limit on any configured depth. Parsing this deep stays well inside a
/// 2 MiB thread stack.
pub const MAX_QUERY_DEPTH_CEILING: usize = 128;

pub fn xdg_or_home(xdg_var: &str, home_suffix: &str) -> PathBuf {
    match std::env::var_os(xdg_var) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(home_suffix),
    }
}

pub fn data_dir() -> PathBuf {
    xdg_or_home("XDG_DATA_HOME", ".local/share").join(PROGRAM_NAME)
}

/// Default gallery fixture consulted by the CLI when `--gallery` is absent.
pub fn default_gallery_path() -> PathBuf {
    data_dir().join(GALLERY_FILE_NAME)
}

/// Maximum nesting depth for queries.
///
/// `PACKRAT_MAX_QUERY_DEPTH` overrides the default; zero or unparsable
/// values are ignored and larger ones are capped at
/// [`MAX_QUERY_DEPTH_CEILING`].
pub fn max_query_depth() -> usize {
    std::env::var(MAX_QUERY_DEPTH_ENV)
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|&depth| depth > 0)
        .unwrap_or(DEFAULT_MAX_QUERY_DEPTH)
        .min(MAX_QUERY_DEPTH_CEILING)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
