use crate::category::Category;
use crate::oracle::RawPrediction;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LabelSource {
    Ask,
    Vision,
}

/// Current classification of one page. `category: None` is the UNKNOWN
/// state; it never survives to emission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageLabel {
    pub page_index: usize,
    pub category: Option<Category>,
    pub confidence: f32,
    pub source: LabelSource,
    pub is_final: bool,
}

impl PageLabel {
    pub fn unknown(page_index: usize) -> Self {
        PageLabel {
            page_index,
            category: None,
            confidence: 0.0,
            source: LabelSource::Ask,
            is_final: false,
        }
    }
}

/// Versioned per-page label state. Merges replace the whole vector rather
/// than patching entries, so readers always observe a consistent sequence;
/// the pipeline thread is the single writer.
#[derive(Debug, Clone)]
pub struct LabelMap {
    labels: Vec<PageLabel>,
    version: u64,
}

impl LabelMap {
    pub fn new(page_count: usize) -> Self {
        LabelMap {
            labels: (0..page_count).map(PageLabel::unknown).collect(),
            version: 0,
        }
    }

    pub fn page_count(&self) -> usize {
        self.labels.len()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn labels(&self) -> &[PageLabel] {
        &self.labels
    }

    pub fn get(&self, page_index: usize) -> Option<&PageLabel> {
        self.labels.get(page_index)
    }

    /// Merge a batch of oracle predictions. The newest result wins, except
    /// that a finalized page is only replaced by a strictly more confident
    /// prediction. Confidence at or above `final_threshold` finalizes the
    /// page, removing it from future re-query targets.
    pub fn merge_predictions(
        &mut self,
        predictions: &[RawPrediction],
        source: LabelSource,
        final_threshold: f32,
    ) {
        let mut next = self.labels.clone();
        for pred in predictions {
            let Some(slot) = next.get_mut(pred.page_index) else {
                continue;
            };
            if slot.is_final && pred.confidence <= slot.confidence {
                continue;
            }
            let confidence = pred.confidence.clamp(0.0, 100.0);
            *slot = PageLabel {
                page_index: pred.page_index,
                category: pred.category,
                confidence,
                source,
                is_final: pred.category.is_some() && confidence >= final_threshold,
            };
        }
        self.labels = next;
        self.version += 1;
    }

    /// Swap in a transformed label sequence (post-smoothing). The
    /// replacement must describe the same pages.
    pub fn replace(&mut self, labels: Vec<PageLabel>) {
        debug_assert_eq!(labels.len(), self.labels.len());
        self.labels = labels;
        self.version += 1;
    }

    /// Recategorize a page span for a reconciler merge. Confidences are
    /// kept, never fabricated.
    pub fn relabel_span(&mut self, start: usize, end: usize, category: Category) {
        let mut next = self.labels.clone();
        for idx in start..=end.min(next.len().saturating_sub(1)) {
            let slot = &mut next[idx];
            slot.category = Some(category);
        }
        self.labels = next;
        self.version += 1;
    }

    pub fn all_final(&self) -> bool {
        self.labels.iter().all(|l| l.is_final)
    }

    pub fn unknown_pages(&self) -> Vec<usize> {
        self.labels
            .iter()
            .filter(|l| l.category.is_none())
            .map(|l| l.page_index)
            .collect()
    }
}
