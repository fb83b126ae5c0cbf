use crate::category::Category;
use crate::config::Smoothing;
use crate::label::PageLabel;

/// Sliding-window majority smoothing. A run of at most `max_run_pages`
/// pages whose flanking window votes for a single other category (two or
/// more agreeing pages) is recategorized into that category, with its
/// confidence scaled by `confidence_reduction`. Runs containing any label
/// at or above `high_confidence` are never overridden, and UNKNOWN is
/// never adopted as a winner.
///
/// Conversions can cascade (a converted run merges with a neighbor and
/// exposes the next short run), so passes repeat until the sequence stops
/// changing, bounded by the page count. Returning the fixpoint makes the
/// whole function idempotent: smooth(smooth(l)) == smooth(l).
pub fn smooth(labels: &[PageLabel], cfg: &Smoothing) -> Vec<PageLabel> {
    let mut current = labels.to_vec();
    for _ in 0..labels.len().max(1) {
        let next = smooth_pass(&current, cfg);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn smooth_pass(labels: &[PageLabel], cfg: &Smoothing) -> Vec<PageLabel> {
    if labels.is_empty() {
        return Vec::new();
    }

    let half = (cfg.window.max(1) / 2).max(1);
    let max_run = cfg.max_run_pages.max(1);
    let mut out = labels.to_vec();

    for (start, end) in runs(labels) {
        let len = end - start + 1;
        if len > max_run {
            continue;
        }
        if labels[start..=end]
            .iter()
            .any(|l| l.confidence >= cfg.high_confidence)
        {
            continue;
        }

        let Some(winner) = margin_majority(labels, start, end, half) else {
            continue;
        };
        if Some(winner) == labels[start].category {
            continue;
        }

        for slot in &mut out[start..=end] {
            slot.category = Some(winner);
            slot.confidence *= cfg.confidence_reduction;
            slot.is_final = false;
        }
    }

    out
}

/// Majority vote over the pages flanking a run: up to `half` pages on
/// each side. Needs at least two agreeing votes; UNKNOWN never wins; a
/// tie resolves to the earliest voting page, keeping the result
/// deterministic.
fn margin_majority(
    labels: &[PageLabel],
    start: usize,
    end: usize,
    half: usize,
) -> Option<Category> {
    let lo = start.saturating_sub(half);
    let hi = (end + half).min(labels.len() - 1);

    let votes = labels[lo..start].iter().chain(labels[end + 1..=hi].iter());
    let mut best: Option<(Category, usize)> = None;
    for vote in votes {
        let Some(cat) = vote.category else {
            continue;
        };
        let count = labels[lo..start]
            .iter()
            .chain(labels[end + 1..=hi].iter())
            .filter(|l| l.category == Some(cat))
            .count();
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((cat, count)),
        }
    }

    best.filter(|&(_, count)| count >= 2).map(|(cat, _)| cat)
}

/// Maximal same-category runs as (start, end) index pairs.
pub fn runs(labels: &[PageLabel]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = 0;
    for i in 1..=labels.len() {
        if i == labels.len() || labels[i].category != labels[start].category {
            out.push((start, i - 1));
            start = i;
        }
    }
    out
}
