use crate::config::Config;
use serde::{Deserialize, Serialize};

/// One oracle request window. The primary range [start_page, end_page] is
/// authoritative; the context margin is sent for cross-batch continuity
/// only and its labels are advisory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub start_page: usize, // 0-based inclusive
    pub end_page: usize,   // 0-based inclusive
    pub context_start: usize,
    pub context_end: usize,
}

impl Batch {
    pub fn context_pages(&self) -> impl Iterator<Item = usize> + '_ {
        self.context_start..=self.context_end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPlan {
    pub page_count: usize,
    pub batches: Vec<Batch>,
}

impl BatchPlan {
    /// Split [0, page_count) into disjoint primary ranges of at most
    /// `batch_size` pages, each widened by up to `context_pages` of
    /// context on either side. The first and last batch get reduced
    /// context at the document edges; that is expected, not an error.
    pub fn from_page_count(cfg: &Config, page_count: usize) -> BatchPlan {
        let size = cfg.batching.batch_size.max(1);
        let margin = cfg.batching.context_pages;

        let mut batches = Vec::new();
        let mut start = 0usize;
        while start < page_count {
            let end = (start + size - 1).min(page_count - 1);
            batches.push(Self::with_context(start, end, margin, page_count));
            start = end + 1;
        }

        BatchPlan { page_count, batches }
    }

    /// A single targeted batch for a resolver re-query: the suspect span
    /// plus a context margin drawn from the flanking sections.
    pub fn targeted(
        start_page: usize,
        end_page: usize,
        margin: usize,
        page_count: usize,
    ) -> Batch {
        Self::with_context(start_page, end_page.min(page_count - 1), margin, page_count)
    }

    fn with_context(start: usize, end: usize, margin: usize, page_count: usize) -> Batch {
        Batch {
            start_page: start,
            end_page: end,
            context_start: start.saturating_sub(margin),
            context_end: (end + margin).min(page_count.saturating_sub(1)),
        }
    }
}
