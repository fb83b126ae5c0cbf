use crate::aggregate::{aggregate, SectionSpan};
use crate::config::Reconciler;
use crate::corpus::{salient_lines, Corpus};
use crate::label::LabelMap;
use std::collections::BTreeSet;
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;

/// Final zero-query pass: very small residual sections whose salient
/// text closely matches an adjacent section are folded into it. Trades a
/// small amount of possible inaccuracy for zero marginal oracle cost.
///
/// Returns the number of sections merged away.
pub fn reconcile(cfg: &Reconciler, corpus: &Corpus, labels: &mut LabelMap) -> usize {
    let mut merged = 0usize;

    // Each merge changes the section list, so rebuild and rescan until a
    // full scan applies nothing. Bounded by the section count.
    loop {
        let sections = aggregate(labels.labels());
        if sections.len() < 2 {
            break;
        }

        let Some((idx, neighbor_idx)) = find_merge(cfg, corpus, &sections) else {
            break;
        };

        let target = &sections[idx];
        let neighbor = &sections[neighbor_idx];
        let Some(category) = neighbor.category else {
            break;
        };
        info!(
            "reconciler: folding {}-page section at pages {}-{} into {}",
            target.num_pages(),
            target.start_page + 1,
            target.end_page + 1,
            category.name()
        );
        labels.relabel_span(target.start_page, target.end_page, category);
        merged += 1;
    }

    merged
}

/// Scan for the first isolated section with a qualifying neighbor.
/// Qualifies when the similarity to the best adjacent section reaches
/// the acceptance threshold and beats every non-adjacent section.
fn find_merge(
    cfg: &Reconciler,
    corpus: &Corpus,
    sections: &[SectionSpan],
) -> Option<(usize, usize)> {
    for (idx, section) in sections.iter().enumerate() {
        if section.num_pages() > cfg.max_section_pages.max(1) {
            continue;
        }

        let own_tokens = section_tokens(corpus, section, cfg.salient_lines);
        if own_tokens.is_empty() {
            continue;
        }

        let mut best_adjacent: Option<(usize, f32)> = None;
        let mut best_other: f32 = 0.0;

        for (other_idx, other) in sections.iter().enumerate() {
            if other_idx == idx || other.category.is_none() {
                continue;
            }
            let sim = similarity(
                &own_tokens,
                &section_tokens(corpus, other, cfg.salient_lines),
            );
            let adjacent = other_idx + 1 == idx || other_idx == idx + 1;
            if adjacent {
                match best_adjacent {
                    Some((_, best)) if sim <= best => {}
                    _ => best_adjacent = Some((other_idx, sim)),
                }
            } else {
                best_other = best_other.max(sim);
            }
        }

        if let Some((neighbor_idx, sim)) = best_adjacent {
            debug!(
                "reconciler: pages {}-{} similarity {:.2} to neighbor, {:.2} elsewhere",
                section.start_page + 1,
                section.end_page + 1,
                sim,
                best_other
            );
            if sim >= cfg.accept_similarity && sim > best_other {
                return Some((idx, neighbor_idx));
            }
        }
    }
    None
}

/// Token bag for a section: salient lines from the pages nearest the
/// section edges, normalized for comparison.
fn section_tokens(corpus: &Corpus, section: &SectionSpan, lines_per_page: usize) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    let edge_pages = [section.start_page, section.end_page];
    for &page_idx in edge_pages.iter().take(section.num_pages().min(2)) {
        let Some(page) = corpus.pages.get(page_idx) else {
            continue;
        };
        for line in salient_lines(page).iter().take(lines_per_page.max(1)) {
            for token in normalize_tokens(line) {
                tokens.insert(token);
            }
        }
    }
    tokens
}

/// NFKD-fold a line into lowercase alphanumeric tokens, dropping
/// combining marks so accented and plain spellings compare equal.
fn normalize_tokens(line: &str) -> Vec<String> {
    line.nfkd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .filter(|t| t.len() > 1)
        .map(|t| t.to_string())
        .collect()
}

/// Overlap coefficient over token sets: |A ∩ B| / min(|A|, |B|).
/// Symmetric and bounded to [0, 1].
pub fn similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count();
    inter as f32 / a.len().min(b.len()) as f32
}

/// Absorb any UNKNOWN run left after reconciliation into its larger
/// flanking section, so no UNKNOWN page survives to emission.
pub fn absorb_unknown_runs(labels: &mut LabelMap) -> anyhow::Result<()> {
    loop {
        let sections = aggregate(labels.labels());
        let Some(idx) = sections.iter().position(|s| s.category.is_none()) else {
            return Ok(());
        };

        let prev = idx.checked_sub(1).map(|i| &sections[i]);
        let next = sections.get(idx + 1);
        let chosen = match (prev, next) {
            (Some(p), Some(n)) => {
                if n.num_pages() > p.num_pages() {
                    n
                } else {
                    p
                }
            }
            (Some(p), None) => p,
            (None, Some(n)) => n,
            (None, None) => {
                anyhow::bail!("no page could be classified; refusing to emit sections")
            }
        };
        let category = chosen
            .category
            .ok_or_else(|| anyhow::anyhow!("adjacent section is unlabeled"))?;

        let target = &sections[idx];
        info!(
            "absorbing {} unknown page(s) at {}-{} into {}",
            target.num_pages(),
            target.start_page + 1,
            target.end_page + 1,
            category.name()
        );
        labels.relabel_span(target.start_page, target.end_page, category);
    }
}
