//! CLI execution context.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use cart_sync::SyncConfig;

use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    /// Sync configuration.
    pub config: SyncConfig,
    /// Where the configuration came from, if a file was found.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context, reading the given config file or searching the
    /// directory tree for one.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let config_path = match config_path {
            Some(path) => Some(PathBuf::from(path)),
            None => SyncConfig::discover(&cwd),
        };

        let config = match &config_path {
            Some(path) => {
                output.debug(&format!("Using config {}", path.display()));
                SyncConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))?
            }
            None => SyncConfig::default(),
        };

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
        })
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        if PathBuf::from(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.cwd.join(path)
        }
    }

    /// Read and parse a JSON file.
    pub fn read_json(&self, path: &str) -> Result<serde_json::Value> {
        let path = self.resolve_path(path);
        let content =
            std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_explicit_config_and_read_relative_json() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("cart-sync.toml");
        std::fs::write(
            &config_path,
            "[storage]\nprimary_key = \"shop_cart\"\nlegacy_keys = []\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("cart.json"), r#"[{"sku":"a"}]"#).unwrap();

        let mut ctx = Context::load(config_path.to_str(), Output::new(false, true)).unwrap();
        ctx.cwd = dir.path().to_path_buf();

        assert_eq!(ctx.config.storage.primary_key, "shop_cart");
        assert_eq!(ctx.config_path.as_deref(), Some(config_path.as_path()));
        assert_eq!(ctx.read_json("cart.json").unwrap()[0]["sku"], "a");
        assert!(ctx.read_json("missing.json").is_err());
    }
}
