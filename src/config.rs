use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Directory holding the vector index file and the registry snapshot.
    pub data_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: default_chunk_size(),
            overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1600
}
fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_threshold")]
    pub default_threshold: f32,
    /// Nearest-neighbor over-fetch multiplier compensating for threshold and
    /// tag filtering.
    #[serde(default = "default_overfetch")]
    pub overfetch_factor: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_threshold: default_threshold(),
            overfetch_factor: default_overfetch(),
        }
    }
}

fn default_limit() -> usize {
    5
}
fn default_threshold() -> f32 {
    0.3
}
fn default_overfetch() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_embed_model")]
    pub embed_model: String,
    #[serde(default = "default_generate_model")]
    pub generate_model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generate_temperature")]
    pub generate_temperature: f32,
    #[serde(default = "default_generate_max_tokens")]
    pub generate_max_tokens: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            embed_model: default_embed_model(),
            generate_model: default_generate_model(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            generate_temperature: default_generate_temperature(),
            generate_max_tokens: default_generate_max_tokens(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_embed_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_generate_model() -> String {
    "llama3.2".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    5
}
fn default_generate_temperature() -> f32 {
    0.2
}
fn default_generate_max_tokens() -> u32 {
    2000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    Ok(config)
}

/// Reject parameter combinations the pipelines assume away, in particular
/// `overlap >= size`, which the chunker does not defend against itself.
pub fn validate(config: &Config) -> Result<()> {
    if config.chunking.size == 0 {
        anyhow::bail!("chunking.size must be > 0");
    }

    if config.chunking.overlap >= config.chunking.size {
        anyhow::bail!(
            "chunking.overlap ({}) must be smaller than chunking.size ({})",
            config.chunking.overlap,
            config.chunking.size
        );
    }

    if config.retrieval.default_limit < 1 {
        anyhow::bail!("retrieval.default_limit must be >= 1");
    }

    if !(0.0..=1.0).contains(&config.retrieval.default_threshold) {
        anyhow::bail!("retrieval.default_threshold must be in [0.0, 1.0]");
    }

    if config.retrieval.overfetch_factor < 1 {
        anyhow::bail!("retrieval.overfetch_factor must be >= 1");
    }

    if config.backend.embed_model.is_empty() {
        anyhow::bail!("backend.embed_model must not be empty");
    }

    if config.backend.generate_model.is_empty() {
        anyhow::bail!("backend.generate_model must not be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = parse("[store]\ndata_dir = \"./data\"\n").unwrap();
        assert_eq!(config.chunking.size, 1600);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.retrieval.default_limit, 5);
        assert_eq!(config.retrieval.overfetch_factor, 3);
        assert_eq!(config.backend.embed_model, "nomic-embed-text");
        assert_eq!(config.server.bind, "127.0.0.1:7341");
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let err = parse(
            "[store]\ndata_dir = \"./data\"\n[chunking]\nsize = 100\noverlap = 100\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn test_threshold_range_enforced() {
        let err = parse(
            "[store]\ndata_dir = \"./data\"\n[retrieval]\ndefault_threshold = 1.5\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("default_threshold"));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err =
            parse("[store]\ndata_dir = \"./data\"\n[chunking]\nsize = 0\n").unwrap_err();
        assert!(err.to_string().contains("size"));
    }
}
