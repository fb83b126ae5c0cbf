use crate::category::Category;
use crate::label::PageLabel;
use anyhow::{bail, Result};
use serde::Serialize;

/// A maximal contiguous run of same-category pages. `category: None` is
/// an UNKNOWN run; those exist only mid-pipeline and never reach output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionSpan {
    pub category: Option<Category>,
    pub start_page: usize, // 0-based inclusive
    pub end_page: usize,   // 0-based inclusive
    pub avg_confidence: f32,
}

impl SectionSpan {
    pub fn num_pages(&self) -> usize {
        self.end_page - self.start_page + 1
    }
}

/// Collapse the label sequence into sections. Pure derivation: sections
/// are always rebuilt from scratch, never patched, so they cannot drift
/// from the labels they summarize.
pub fn aggregate(labels: &[PageLabel]) -> Vec<SectionSpan> {
    let mut sections: Vec<SectionSpan> = Vec::new();
    let mut start = 0usize;

    for i in 1..=labels.len() {
        let run_ended = i == labels.len() || labels[i].category != labels[start].category;
        if !run_ended {
            continue;
        }

        let span = &labels[start..i];
        let sum: f32 = span.iter().map(|l| l.confidence).sum();
        sections.push(SectionSpan {
            category: labels[start].category,
            start_page: start,
            end_page: i - 1,
            avg_confidence: sum / span.len() as f32,
        });
        start = i;
    }

    sections
}

/// Verify that sections partition [0, page_count) exactly. A violation
/// is a programming fault, not an input problem; it aborts the run
/// rather than letting invalid output escape.
pub fn check_coverage(sections: &[SectionSpan], page_count: usize) -> Result<()> {
    if page_count == 0 {
        bail!("invariant violation: empty document has no sections to check");
    }
    let mut expected = 0usize;
    for section in sections {
        if section.start_page != expected {
            bail!(
                "invariant violation: section at page {} does not continue at page {}",
                section.start_page + 1,
                expected + 1
            );
        }
        if section.end_page < section.start_page {
            bail!(
                "invariant violation: empty section at page {}",
                section.start_page + 1
            );
        }
        expected = section.end_page + 1;
    }
    if expected != page_count {
        bail!(
            "invariant violation: sections cover {} of {} pages",
            expected,
            page_count
        );
    }
    Ok(())
}
