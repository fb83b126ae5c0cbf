use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// One extracted page. Immutable once loaded; owned by the corpus for the
/// lifetime of a run.
#[derive(Debug, Clone)]
pub struct Page {
    pub index: usize,
    pub lines: Vec<String>,
    /// Pre-rendered page image (base64 PNG) from the extraction
    /// collaborator, when available. Enables vision re-queries.
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Corpus {
    pub pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CorpusFile {
    Texts(Vec<String>),
    Entries { pages: Vec<PageEntry> },
}

#[derive(Debug, Deserialize)]
struct PageEntry {
    #[serde(default)]
    text: String,
    #[serde(default)]
    image: Option<String>,
}

impl Corpus {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading corpus: {}", path.display()))?;
        let file: CorpusFile =
            serde_json::from_str(&raw).with_context(|| "parsing corpus JSON")?;

        let pages = match file {
            CorpusFile::Texts(texts) => texts
                .into_iter()
                .enumerate()
                .map(|(i, t)| Page {
                    index: i,
                    lines: split_lines(&t),
                    image: None,
                })
                .collect(),
            CorpusFile::Entries { pages } => pages
                .into_iter()
                .enumerate()
                .map(|(i, e)| Page {
                    index: i,
                    lines: split_lines(&e.text),
                    image: e.image,
                })
                .collect(),
        };

        Ok(Corpus { pages })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn has_images(&self) -> bool {
        self.pages.iter().any(|p| p.image.is_some())
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .lines()
        .map(|l| l.to_string())
        .collect()
}

/// Drop empty and punctuation-only lines; fold single-word fragments into
/// the preceding line so headers split by the extractor stay comparable.
pub fn salient_lines(page: &Page) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for raw in &page.lines {
        let line = raw.trim();
        if line.is_empty() || !line.chars().any(|c| c.is_alphanumeric()) {
            continue;
        }
        let words = line
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect::<String>()
            .split_whitespace()
            .count();

        if words > 1 {
            cleaned.push(line.to_string());
        } else if let Some(last) = cleaned.last_mut() {
            last.push(' ');
            last.push_str(line);
        }
    }
    cleaned
}

/// Compact per-page snippet for oracle prompts: the first `first_n` and
/// last `last_n` salient lines, elided in the middle. Page numbers in
/// snippets are 1-based to match the wire format.
pub fn page_snippet(page: &Page, first_n: usize, last_n: usize) -> Option<String> {
    let lines = salient_lines(page);
    if lines.is_empty() {
        return None;
    }

    let first: Vec<&str> = lines.iter().take(first_n).map(|s| s.as_str()).collect();
    let last: Vec<&str> = if lines.len() > first_n {
        let skip = lines.len().saturating_sub(last_n).max(first_n);
        lines[skip..].iter().map(|s| s.as_str()).collect()
    } else {
        Vec::new()
    };

    let mut out = format!("Page {}:\n{}", page.index + 1, first.join("\n"));
    if !last.is_empty() {
        out.push_str("\n...\n");
        out.push_str(&last.join("\n"));
    }
    Some(out)
}
