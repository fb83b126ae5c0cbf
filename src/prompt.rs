use crate::batch_plan::Batch;
use crate::category::ALL_CATEGORIES;
use crate::config::Config;
use crate::corpus::{page_snippet, Corpus};
use std::fmt::Write;

fn category_listing() -> String {
    let mut out = String::new();
    for cat in ALL_CATEGORIES {
        let _ = writeln!(out, "{} - {}", cat.number(), cat.name());
    }
    out
}

/// Instructions for a first-pass batch. The reply contract is one CSV
/// triple per page: `Page Number, Category Number, Confidence Score`.
pub fn main_instructions() -> String {
    format!(
        "You are analyzing pages from a corporate Minute Book. Below are text samples \
         extracted from each page. Identify which of the 10 possible Minute Book sections \
         each page most likely belongs to.\n\n\
         The possible categories are (use EXACTLY these number mappings):\n{}\n\
         Instructions:\n\
         - Each section appears AT MOST ONCE and forms a CONTINUOUS block of pages.\n\
         - Not all sections are present in every document.\n\
         - Sections appear in ascending numeric order; once a section ends it never returns.\n\
         - Pages marked as context are informational; still answer for every listed page.\n\
         - Confidence score must be 0-100; use lower scores for ambiguous pages.\n\
         - Do NOT explain your reasoning.\n\n\
         Output format (CSV), one line per page:\n\
         Page Number, Category Number, Confidence Score\n\n\
         Example:\n1, 1, 95\n2, 1, 90\n\n\
         Answer in this exact format for ALL pages below:",
        category_listing()
    )
}

/// Instructions for a resolver re-query, anchored by the flanking
/// sections so the oracle re-reads the suspect span in context.
pub fn repair_instructions(context_before: &str, context_after: &str) -> String {
    format!(
        "You are re-examining a suspect span of a corporate Minute Book classification.\n\
         {before}{after}\n\
         Re-classify the pages below so they fit logically between the surrounding \
         sections. Each section appears AT MOST ONCE and sections are continuous blocks.\n\n\
         The possible categories are:\n{cats}\n\
         Output format (CSV), one line per page:\n\
         Page Number, Category Number, Confidence Score\n\n\
         Do NOT explain your reasoning.",
        before = if context_before.is_empty() {
            String::new()
        } else {
            format!("{context_before}\n")
        },
        after = if context_after.is_empty() {
            String::new()
        } else {
            format!("{context_after}\n")
        },
        cats = category_listing()
    )
}

/// Instructions for a single-page vision query. The page number is named
/// so the reply stays in the shared CSV format.
pub fn vision_instructions(page_number: usize) -> String {
    format!(
        "This image is page {page_number} of a corporate Minute Book. Decide which of \
         the 10 possible sections it belongs to.\n\n\
         The possible categories are (use EXACTLY these number mappings):\n{}\n\
         Output exactly one CSV line and nothing else:\n\
         {page_number}, Category Number, Confidence Score",
        category_listing()
    )
}

/// Render the text body of a batch: a compact snippet for every page in
/// the context-widened window, skipping pages with no salient text.
pub fn batch_text(cfg: &Config, corpus: &Corpus, batch: &Batch) -> String {
    let mut out = String::new();
    for idx in batch.context_pages() {
        let Some(page) = corpus.pages.get(idx) else {
            continue;
        };
        let Some(snippet) = page_snippet(
            page,
            cfg.batching.first_lines,
            cfg.batching.last_lines,
        ) else {
            continue;
        };
        out.push_str(&snippet);
        out.push_str("\n\n");
    }
    out.trim_end().to_string()
}

/// Full prompt for one ask batch.
pub fn ask_prompt(cfg: &Config, corpus: &Corpus, batch: &Batch, instructions: &str) -> String {
    format!("{}\n\n{}", instructions, batch_text(cfg, corpus, batch))
}
