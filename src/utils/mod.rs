//! Utility functions for slateboard

use anyhow::{anyhow, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Ensure a directory exists, creating it if necessary
pub fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    } else if !path.is_dir() {
        return Err(anyhow!("Path exists but is not a directory: {:?}", path));
    }
    Ok(())
}

/// Get the XDG config directory for slateboard
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?
        .join("slateboard");

    Ok(config_dir)
}

/// Expand `~/` and environment variables such as `$XDG_CONFIG_HOME`
pub fn expand_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full_with_context(
        path,
        || dirs::home_dir().map(|home| home.to_string_lossy().into_owned()),
        |var| std::env::var(var).map(Some),
    )
    .map_err(|e| anyhow!("Failed to expand path '{}': {}", path, e))?;

    Ok(PathBuf::from(expanded.as_ref()))
}

/// Format duration as human readable string
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs > 0 && millis == 0 {
        format!("{secs}s")
    } else if secs > 0 {
        format!("{secs}.{millis:03}s")
    } else {
        format!("{millis}ms")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_expand_path() {
        assert_eq!(expand_path("./plugins").unwrap(), PathBuf::from("./plugins"));

        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_path("~/plugins").unwrap(), home.join("plugins"));

        std::env::set_var("SLATEBOARD_TEST_DIR", "/opt/slate");
        assert_eq!(
            expand_path("$SLATEBOARD_TEST_DIR/plugins").unwrap(),
            PathBuf::from("/opt/slate/plugins")
        );

        assert!(expand_path("$SLATEBOARD_SURELY_UNSET_VAR/x").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(15)), "15s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.500s");
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
    }

    #[test]
    fn test_ensure_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a/b");

        ensure_directory(&nested).unwrap();
        assert!(nested.is_dir());

        let file = temp_dir.path().join("file");
        fs::write(&file, "x").unwrap();
        assert!(ensure_directory(&file).is_err());
    }
}
