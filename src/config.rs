use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub oracle: OracleCfg,
    #[serde(default)]
    pub batching: Batching,
    #[serde(default)]
    pub smoothing: Smoothing,
    #[serde(default)]
    pub resolver: Resolver,
    #[serde(default)]
    pub reconciler: Reconciler,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// A stable, normalization-friendly string for hashing.
    pub fn normalized_for_hash(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            global: Default::default(),
            paths: Default::default(),
            limits: Default::default(),
            oracle: Default::default(),
            batching: Default::default(),
            smoothing: Default::default(),
            resolver: Default::default(),
            reconciler: Default::default(),
            output: Default::default(),
            logging: Default::default(),
            debug: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Global {
    pub job_name: String,
    pub resume: bool,
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            job_name: "default".into(),
            resume: true,
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub out_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            out_dir: "out".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    pub max_input_pages: usize,
    pub job_timeout_seconds: u64,
}
impl Default for Limits {
    fn default() -> Self {
        Self {
            max_input_pages: 20000,
            job_timeout_seconds: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleCfg {
    pub base_url: String,
    /// Name of the environment variable holding the API key. The key
    /// itself never lives in config files.
    pub api_key_env: String,
    pub model: String,
    pub vision_model: String,
    pub request_timeout_seconds: u64,
    pub max_retries: u32,
    pub backoff_base_seconds: f64,
    pub backoff_max_seconds: f64,
    pub max_parallel_requests: usize,
}
impl Default for OracleCfg {
    fn default() -> Self {
        Self {
            base_url: "https://ai-models.autocomply.ca".into(),
            api_key_env: "AUTOCOMPLY_API_KEY".into(),
            model: "gemini-2.5-flash".into(),
            vision_model: "gemini-2.5-flash".into(),
            request_timeout_seconds: 120,
            max_retries: 3,
            backoff_base_seconds: 1.0,
            backoff_max_seconds: 60.0,
            max_parallel_requests: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batching {
    pub batch_size: usize,
    pub context_pages: usize,
    pub first_lines: usize,
    pub last_lines: usize,
}
impl Default for Batching {
    fn default() -> Self {
        Self {
            batch_size: 55,
            context_pages: 3,
            first_lines: 3,
            last_lines: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Smoothing {
    pub window: usize,
    pub max_run_pages: usize,
    pub high_confidence: f32,
    pub confidence_reduction: f32,
}
impl Default for Smoothing {
    fn default() -> Self {
        Self {
            window: 3,
            max_run_pages: 1,
            high_confidence: 85.0,
            confidence_reduction: 0.9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolver {
    pub max_iterations: u32,
    pub small_section_pages: usize,
    pub low_confidence: f32,
    pub final_confidence: f32,
    pub context_pages: usize,
    pub vision_fallback: bool,
    pub vision_max_pages: usize,
}
impl Default for Resolver {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            small_section_pages: 2,
            low_confidence: 50.0,
            final_confidence: 85.0,
            context_pages: 2,
            vision_fallback: true,
            vision_max_pages: 40,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reconciler {
    pub max_section_pages: usize,
    pub accept_similarity: f32,
    pub salient_lines: usize,
}
impl Default for Reconciler {
    fn default() -> Self {
        Self {
            max_section_pages: 1,
            accept_similarity: 0.75,
            salient_lines: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub write_sections: bool,
    pub write_report_json: bool,
    pub write_labels_json: bool,
    pub sections_filename: String,
    pub report_filename: String,
    pub labels_filename: String,
    pub write_index_json: bool,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            write_sections: true,
            write_report_json: true,
            write_labels_json: false,
            sections_filename: "sections.json".into(),
            report_filename: "report.json".into(),
            labels_filename: "labels.json".into(),
            write_index_json: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debug {
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            dump_effective_config: true,
        }
    }
}
