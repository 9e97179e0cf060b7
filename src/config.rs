use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "NGP_CONFIG";

const SAMPLE: &str = r#"# ngp configuration
# {line}, {file} and {pattern} are substituted; do not quote them.
editor = "vim +{line} {file}"
# file names always scanned, whatever their extension
files = "Makefile Kconfig CMakeLists.txt"
# extensions scanned unless -r is given
extensions = ".c .h .cpp .hpp .rs .py .go .java .js .ts .sh"
"#;

/// On-disk shape: every key is optional here so a missing one gets a precise error.
#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    editor: Option<String>,
    files: Option<String>,
    extensions: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub editor: String,
    pub files: Vec<String>,
    pub extensions: Vec<String>,
    pub source: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = locate()?;
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        let mut config =
            Self::parse(&content).with_context(|| format!("in config {}", path.display()))?;
        config.source = path.to_path_buf();
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        let Some(editor) = raw.editor else {
            bail!("config: no editor string found");
        };
        let Some(files) = raw.files else {
            bail!("config: no files string found");
        };
        let Some(extensions) = raw.extensions else {
            bail!("config: no extensions string found");
        };
        if editor.trim().is_empty() {
            bail!("config: editor string is empty");
        }
        Ok(Self {
            editor,
            files: split_list(&files),
            extensions: split_list(&extensions),
            source: PathBuf::new(),
        })
    }

    /// Commented sample to start a config file from.
    pub fn default_contents() -> &'static str {
        SAMPLE
    }
}

fn split_list(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

/// Search order after `$NGP_CONFIG`: user config dir, `~/.ngprc.toml`, `/etc/ngprc.toml`.
pub fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("ngp").join("config.toml"));
    }
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".ngprc.toml"));
    }
    paths.push(PathBuf::from("/etc/ngprc.toml"));
    paths
}

fn locate() -> Result<PathBuf> {
    if let Some(explicit) = std::env::var_os(CONFIG_ENV) {
        let path = PathBuf::from(explicit);
        if !path.is_file() {
            bail!(
                "config file {} (from ${}) not found",
                path.display(),
                CONFIG_ENV
            );
        }
        return Ok(path);
    }

    let candidates = candidate_paths();
    if let Some(found) = candidates.iter().find(|p| p.is_file()) {
        return Ok(found.clone());
    }

    let searched: Vec<String> = candidates
        .iter()
        .map(|p| format!("  {}", p.display()))
        .collect();
    bail!(
        "configuration file has not been found; searched:\n{}\n\nexample config:\n{}",
        searched.join("\n"),
        Config::default_contents()
    )
}
