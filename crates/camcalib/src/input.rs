use crate::config::ConfigError;
use std::path::PathBuf;

/// Expand a glob pattern into the list of candidate images.
///
/// Paths are returned in the order of the glob expansion, sorted alphabetically within
/// each directory. Entries that cannot be read are logged and skipped. No match is not
/// an error; the run simply finds no observation.
///
/// # Errors
///
/// Returns an error if the pattern is not a valid glob.
pub fn resolve_inputs(pattern: &str) -> Result<Vec<PathBuf>, ConfigError> {
    let entries = glob::glob(pattern).map_err(|e| ConfigError::InvalidGlob {
        pattern: pattern.to_string(),
        reason: e.msg.to_string(),
    })?;

    let paths = entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!("skipping unreadable input {}: {}", e.path().display(), e);
                None
            }
        })
        .collect::<Vec<_>>();

    log::debug!("{} input(s) match {:?}", paths.len(), pattern);

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_inputs() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        for name in ["b.png", "a.png", "c.jpg"] {
            std::fs::write(tmp_dir.path().join(name), b"")?;
        }

        let pattern = tmp_dir.path().join("*.png");
        let paths = resolve_inputs(&pattern.to_string_lossy())?;
        assert_eq!(
            paths,
            vec![tmp_dir.path().join("a.png"), tmp_dir.path().join("b.png")]
        );

        let pattern = tmp_dir.path().join("*.bmp");
        assert!(resolve_inputs(&pattern.to_string_lossy())?.is_empty());

        Ok(())
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            resolve_inputs("images/[*.png"),
            Err(ConfigError::InvalidGlob { .. })
        ));
    }
}
