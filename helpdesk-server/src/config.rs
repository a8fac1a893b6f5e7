use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, bail};
use helpdesk_rag::RagConfig;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8088;
pub const DEFAULT_FEEDBACK_LOG: &str = "evaluation_logs.jsonl";

/// Which embedding provider the server indexes and queries with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmbedderKind {
    /// Offline lexical hashing embedder.
    #[default]
    Hashing,
    /// OpenAI embeddings API; needs `OPENAI_API_KEY`.
    #[cfg(feature = "openai")]
    OpenAI,
}

impl FromStr for EmbedderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hashing" => Ok(EmbedderKind::Hashing),
            #[cfg(feature = "openai")]
            "openai" => Ok(EmbedderKind::OpenAI),
            other => bail!("unsupported embedder '{other}'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub catalogue_path: PathBuf,
    pub feedback_log_path: PathBuf,
    pub embedder: EmbedderKind,
    pub rag: RagConfig,
}

impl ServerConfig {
    pub fn new(catalogue_path: impl Into<PathBuf>) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            catalogue_path: catalogue_path.into(),
            feedback_log_path: PathBuf::from(DEFAULT_FEEDBACK_LOG),
            embedder: EmbedderKind::default(),
            rag: RagConfig::default(),
        }
    }

    /// Read `HELPDESK_*` variables from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let catalogue = lookup("HELPDESK_CATALOGUE")
            .filter(|value| !value.trim().is_empty())
            .context("HELPDESK_CATALOGUE must point at the issue/solution catalogue")?;
        let mut config = Self::new(catalogue);

        if let Some(host) = lookup("HELPDESK_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("HELPDESK_PORT") {
            config.port = port.parse().with_context(|| format!("invalid HELPDESK_PORT '{port}'"))?;
        }
        if let Some(path) = lookup("HELPDESK_FEEDBACK_LOG") {
            config.feedback_log_path = PathBuf::from(path);
        }
        if let Some(kind) = lookup("HELPDESK_EMBEDDER") {
            config.embedder = kind.parse()?;
        }

        let mut rag = RagConfig::builder();
        if let Some(top_k) = lookup("HELPDESK_TOP_K") {
            rag = rag.top_k(
                top_k.parse().with_context(|| format!("invalid HELPDESK_TOP_K '{top_k}'"))?,
            );
        }
        if let Some(threshold) = lookup("HELPDESK_CONFIDENCE_THRESHOLD") {
            let threshold = threshold
                .parse()
                .with_context(|| format!("invalid HELPDESK_CONFIDENCE_THRESHOLD '{threshold}'"))?;
            rag = rag.confidence_threshold(threshold);
        }
        config.rag = rag.build()?;

        Ok(config)
    }
}
