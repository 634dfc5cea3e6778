use std::path::{Path, PathBuf};

/// Normalize separators in a sample path
///
/// SFZ files written on Windows use backslashes; on other platforms these are
/// converted to forward slashes.
///
/// ```
/// use xrni_sfz::parser::path_utils::normalize_path;
///
/// #[cfg(not(windows))]
/// assert_eq!(normalize_path("samples\\piano\\C4.wav"), "samples/piano/C4.wav");
/// ```
pub fn normalize_path(path: &str) -> String {
    if cfg!(windows) {
        path.to_string()
    } else {
        path.replace('\\', "/")
    }
}

/// Combine a `default_path` with a sample path
///
/// Absolute sample paths are returned unchanged.
pub fn combine_sample_path(default_path: &str, sample_path: &str) -> PathBuf {
    let sample_path = normalize_path(sample_path);
    let path = Path::new(&sample_path);
    if path.is_absolute() {
        return path.to_path_buf();
    }

    let mut combined = normalize_path(default_path);
    if !combined.is_empty() && !combined.ends_with('/') && !combined.ends_with('\\') {
        combined.push('/');
    }
    combined.push_str(&sample_path);
    PathBuf::from(combined)
}

/// Resolve a sample path the way SFZ players do
///
/// 1. Absolute paths are used directly
/// 2. Relative paths are prefixed with `default_path`, if any
/// 3. A path that is still relative is taken from the SFZ file's directory
///
/// ```
/// use xrni_sfz::parser::path_utils::resolve_absolute_path;
/// use std::path::{Path, PathBuf};
///
/// let resolved = resolve_absolute_path(
///     "piano.wav",
///     Some("samples/"),
///     Some(Path::new("/music/instruments/piano.sfz")),
/// );
/// assert_eq!(resolved, PathBuf::from("/music/instruments/samples/piano.wav"));
/// ```
pub fn resolve_absolute_path(
    sample_path: &str,
    default_path: Option<&str>,
    sfz_file_path: Option<&Path>,
) -> PathBuf {
    let sample_path = normalize_path(sample_path);
    let mut path = PathBuf::from(&sample_path);
    if path.is_absolute() {
        return path;
    }

    if let Some(default_path) = default_path {
        path = combine_sample_path(default_path, &sample_path);
    }

    if !path.is_absolute() {
        if let Some(sfz_path) = sfz_file_path {
            let sfz_dir = sfz_path.parent().unwrap_or_else(|| Path::new(""));
            path = sfz_dir.join(path);
        }
    }

    path
}
