use crate::category::Category;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A caption-less text query covering a batch of page snippets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub prompt: String,
    pub model: String,
}

/// A single-page image query for pages whose text carries no signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionRequest {
    pub page_index: usize,
    pub page_image: String,
    pub prompt: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub enum OracleJob {
    Ask(AskRequest),
    Vision(VisionRequest),
}

/// One parsed reply triple. `category: None` means the oracle named a
/// number outside the closed set; the merge treats it as UNKNOWN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPrediction {
    pub page_index: usize,
    pub category: Option<Category>,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleDiag {
    pub base_url: String,
    pub model: String,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

fn triple_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\d{1,6})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3}(?:\.\d+)?)\s*$")
            .expect("triple regex")
    })
}

/// Parse a free-form oracle reply into prediction triples. The wire format
/// is one `page, category-number, confidence` line per page, 1-based page
/// numbers. Headers, fences and anything else that does not parse is
/// ignored; a malformed reply yields fewer predictions, never an error.
pub fn parse_reply(raw: &str) -> Vec<RawPrediction> {
    let mut out: Vec<RawPrediction> = Vec::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('`') || line.starts_with("Page Number") {
            continue;
        }
        let Some(caps) = triple_re().captures(line) else {
            continue;
        };

        let page_number: usize = match caps[1].parse() {
            Ok(n) => n,
            Err(_) => continue,
        };
        if page_number == 0 {
            continue;
        }
        let category = caps[2]
            .parse::<u8>()
            .ok()
            .and_then(Category::from_number);
        let confidence: f32 = caps[3].parse().unwrap_or(0.0);

        out.push(RawPrediction {
            page_index: page_number - 1,
            category,
            confidence: confidence.clamp(0.0, 100.0),
        });
    }
    out.sort_by_key(|p| p.page_index);
    out
}
