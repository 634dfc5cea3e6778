//! Sample lookup tolerant of case mismatches.
//!
//! SFZ libraries authored on case-insensitive filesystems often reference
//! `Piano_C4.WAV` while the file on disk is `piano_c4.wav`.

use std::fs;
use std::path::{Component, Path, PathBuf};

use xrni_core::SampleResolver;

/// Resolves the exact path first, then matches each missing component
/// against its directory ignoring case.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseInsensitiveResolver;

impl SampleResolver for CaseInsensitiveResolver {
    fn resolve(&self, path: &Path) -> Option<PathBuf> {
        if path.is_file() {
            return Some(path.to_path_buf());
        }

        let mut resolved = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Normal(name) => {
                    let candidate = resolved.join(name);
                    if candidate.exists() {
                        resolved = candidate;
                        continue;
                    }
                    let wanted = name.to_string_lossy().to_lowercase();
                    let dir = if resolved.as_os_str().is_empty() {
                        Path::new(".")
                    } else {
                        resolved.as_path()
                    };
                    let found = fs::read_dir(dir).ok()?.flatten().find(|entry| {
                        entry.file_name().to_string_lossy().to_lowercase() == wanted
                    })?;
                    resolved.push(found.file_name());
                }
                other => resolved.push(other.as_os_str()),
            }
        }

        if resolved.is_file() {
            log::debug!("Resolved {} as {}", path.display(), resolved.display());
            Some(resolved)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_exact_and_case_insensitive_matches() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("Samples")).unwrap();
        let actual = dir.path().join("Samples").join("piano_c4.wav");
        fs::write(&actual, b"RIFF").unwrap();

        let resolver = CaseInsensitiveResolver;
        assert_eq!(resolver.resolve(&actual), Some(actual.clone()));
        assert_eq!(
            resolver.resolve(&dir.path().join("SAMPLES").join("Piano_C4.WAV")),
            Some(actual)
        );
        assert_eq!(
            resolver.resolve(&dir.path().join("samples").join("missing.wav")),
            None
        );
    }
}
