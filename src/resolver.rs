use crate::aggregate::{aggregate, SectionSpan};
use crate::batch_plan::BatchPlan;
use crate::config::Config;
use crate::corpus::{salient_lines, Corpus};
use crate::label::{LabelMap, LabelSource};
use crate::oracle::{
    dispatch, AskRequest, Oracle, OracleError, OracleJob, RawPrediction, VisionRequest,
};
use crate::prompt;
use crate::smooth::smooth;
use anyhow::{anyhow, bail, Result};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResolverOutcome {
    /// A full scan found zero suspect sections.
    Stable,
    /// The iteration cap was hit; the last section list stands as-is.
    Exhausted,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolverReport {
    pub outcome: ResolverOutcome,
    pub iterations: u32,
    pub requeries: usize,
    pub vision_queries: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SuspectReason {
    Island,
    LowConfidence,
    Unknown,
}

#[derive(Debug, Clone)]
struct Suspect {
    start_page: usize,
    end_page: usize,
    reason: SuspectReason,
}

/// Iterative repair loop. Scans the aggregated sections for anomalies,
/// re-queries the oracle on just those spans with flanking context, and
/// merges the newest labels back in, until a scan comes up clean or the
/// iteration cap is reached. The cap is a hard cost-control requirement:
/// oracle noise can otherwise manufacture fresh disagreements forever.
pub fn resolve<O: Oracle + ?Sized>(
    cfg: &Config,
    oracle: &O,
    corpus: &Corpus,
    labels: &mut LabelMap,
    started: Instant,
) -> Result<ResolverReport> {
    let max_iterations = cfg.resolver.max_iterations.max(1);
    let mut requeries = 0usize;
    let mut vision_queries = 0usize;
    let mut vision_budget = cfg.resolver.vision_max_pages;

    for iteration in 0..max_iterations {
        if cfg.limits.job_timeout_seconds > 0
            && started.elapsed().as_secs() > cfg.limits.job_timeout_seconds
        {
            bail!(
                "job timeout exceeded: {}s",
                cfg.limits.job_timeout_seconds
            );
        }

        let sections = aggregate(labels.labels());
        let suspects = detect_suspects(cfg, &sections, labels);
        debug!(iteration, suspects = suspects.len(), "resolver scan");

        if suspects.is_empty() {
            info!("resolver stable after {} iteration(s)", iteration);
            return Ok(ResolverReport {
                outcome: ResolverOutcome::Stable,
                iterations: iteration,
                requeries,
                vision_queries,
            });
        }

        let jobs = build_jobs(cfg, corpus, labels, &sections, &suspects, &mut vision_budget);
        if jobs.is_empty() {
            // Every suspect page is already final; nothing left to ask.
            info!("resolver stable: all suspect pages finalized");
            return Ok(ResolverReport {
                outcome: ResolverOutcome::Stable,
                iterations: iteration,
                requeries,
                vision_queries,
            });
        }

        for job in &jobs {
            match job.kind {
                JobKind::Ask => requeries += 1,
                JobKind::Vision => vision_queries += 1,
            }
        }

        debug!("resolving {} span(s)", jobs.len());
        let oracle_jobs: Vec<OracleJob> = jobs.iter().map(|j| j.job.clone()).collect();
        let results = dispatch(oracle, &oracle_jobs, cfg.oracle.max_parallel_requests);

        // Single-writer merge, in job (page) order.
        for (job, result) in jobs.iter().zip(results) {
            let predictions = match result {
                Ok(p) => p,
                Err(err) if err.is_fatal() => return Err(anyhow!(err)),
                Err(err) => {
                    warn!(
                        "re-query for pages {}-{} failed: {err}",
                        job.targets.first().map(|p| p + 1).unwrap_or(0),
                        job.targets.last().map(|p| p + 1).unwrap_or(0)
                    );
                    Vec::new()
                }
            };
            let merged = cover_targets(&predictions, &job.targets);
            labels.merge_predictions(&merged, job.source, cfg.resolver.final_confidence);
        }

        let smoothed = smooth(labels.labels(), &cfg.smoothing);
        labels.replace(smoothed);
    }

    info!("resolver exhausted after {} iterations", max_iterations);
    Ok(ResolverReport {
        outcome: ResolverOutcome::Exhausted,
        iterations: max_iterations,
        requeries,
        vision_queries,
    })
}

/// Flag anomalous sections: small islands between larger same-category
/// neighbors, low aggregate confidence, and UNKNOWN runs.
fn detect_suspects(cfg: &Config, sections: &[SectionSpan], labels: &LabelMap) -> Vec<Suspect> {
    let mut suspects = Vec::new();

    for (idx, section) in sections.iter().enumerate() {
        let reason = if section.category.is_none() {
            Some(SuspectReason::Unknown)
        } else if is_island(cfg, sections, idx) {
            Some(SuspectReason::Island)
        } else if section.avg_confidence < cfg.resolver.low_confidence {
            Some(SuspectReason::LowConfidence)
        } else {
            None
        };

        let Some(reason) = reason else { continue };

        // Cancellation: spans whose pages are all final are never
        // re-queried, which is how runs finish early.
        let has_open_page = (section.start_page..=section.end_page)
            .any(|i| labels.get(i).map(|l| !l.is_final).unwrap_or(false));
        if !has_open_page {
            continue;
        }

        debug!(
            "suspect {:?}: pages {}-{} ({} pages, avg {:.1})",
            reason,
            section.start_page + 1,
            section.end_page + 1,
            section.num_pages(),
            section.avg_confidence
        );
        suspects.push(Suspect {
            start_page: section.start_page,
            end_page: section.end_page,
            reason,
        });
    }

    suspects
}

fn is_island(cfg: &Config, sections: &[SectionSpan], idx: usize) -> bool {
    let section = &sections[idx];
    if section.num_pages() > cfg.resolver.small_section_pages {
        return false;
    }
    let (Some(prev), Some(next)) = (
        idx.checked_sub(1).map(|i| &sections[i]),
        sections.get(idx + 1),
    ) else {
        return false;
    };
    prev.category.is_some()
        && prev.category == next.category
        && prev.num_pages() > section.num_pages()
        && next.num_pages() > section.num_pages()
}

#[derive(Debug, Clone, Copy)]
enum JobKind {
    Ask,
    Vision,
}

struct PlannedJob {
    job: OracleJob,
    kind: JobKind,
    source: LabelSource,
    /// Pages this job is authoritative for, in page order.
    targets: Vec<usize>,
}

/// Turn suspects into oracle jobs. Pages with no salient text escalate
/// to single-page vision queries when the corpus carries images and the
/// vision budget allows; everything else becomes a targeted ask batch
/// with flanking-section context.
fn build_jobs(
    cfg: &Config,
    corpus: &Corpus,
    labels: &LabelMap,
    sections: &[SectionSpan],
    suspects: &[Suspect],
    vision_budget: &mut usize,
) -> Vec<PlannedJob> {
    let page_count = corpus.page_count();
    let mut jobs = Vec::new();

    for suspect in suspects {
        let open_pages: Vec<usize> = (suspect.start_page..=suspect.end_page)
            .filter(|&i| labels.get(i).map(|l| !l.is_final).unwrap_or(false))
            .collect();
        if open_pages.is_empty() {
            continue;
        }

        let mut ask_pages: Vec<usize> = Vec::new();
        for &page_idx in &open_pages {
            let page = &corpus.pages[page_idx];
            let textless = salient_lines(page).is_empty();
            if cfg.resolver.vision_fallback
                && *vision_budget > 0
                && textless
                && page.image.is_some()
            {
                *vision_budget -= 1;
                jobs.push(PlannedJob {
                    job: OracleJob::Vision(VisionRequest {
                        page_index: page_idx,
                        page_image: page.image.clone().unwrap_or_default(),
                        prompt: prompt::vision_instructions(page_idx + 1),
                        model: cfg.oracle.vision_model.clone(),
                    }),
                    kind: JobKind::Vision,
                    source: LabelSource::Vision,
                    targets: vec![page_idx],
                });
            } else {
                ask_pages.push(page_idx);
            }
        }

        if ask_pages.is_empty() {
            continue;
        }
        debug!(
            "re-query {:?} span: pages {}-{}, {} target page(s)",
            suspect.reason,
            suspect.start_page + 1,
            suspect.end_page + 1,
            ask_pages.len()
        );
        let lo = *ask_pages.first().unwrap_or(&suspect.start_page);
        let hi = *ask_pages.last().unwrap_or(&suspect.end_page);
        let batch = BatchPlan::targeted(lo, hi, cfg.resolver.context_pages, page_count);

        let (before, after) = flanking_context(sections, suspect);
        let instructions = prompt::repair_instructions(&before, &after);
        let query = prompt::ask_prompt(cfg, corpus, &batch, &instructions);

        jobs.push(PlannedJob {
            job: OracleJob::Ask(AskRequest {
                prompt: query,
                model: cfg.oracle.model.clone(),
            }),
            kind: JobKind::Ask,
            source: LabelSource::Ask,
            targets: ask_pages,
        });
    }

    jobs
}

fn flanking_context(sections: &[SectionSpan], suspect: &Suspect) -> (String, String) {
    let mut before = String::new();
    let mut after = String::new();
    for section in sections {
        let Some(category) = section.category else {
            continue;
        };
        if section.end_page + 1 == suspect.start_page {
            before = format!(
                "The section before this span is '{}' (pages {}-{}).",
                category.name(),
                section.start_page + 1,
                section.end_page + 1
            );
        }
        if suspect.end_page + 1 == section.start_page {
            after = format!(
                "The section after this span is '{}' (pages {}-{}).",
                category.name(),
                section.start_page + 1,
                section.end_page + 1
            );
        }
    }
    (before, after)
}

/// A later query fully supersedes the current label for every page it
/// targeted: replies covering a target page pass through, and targets
/// the oracle skipped degrade to explicit UNKNOWN entries. Predictions
/// for context-only pages are advisory and dropped.
fn cover_targets(predictions: &[RawPrediction], targets: &[usize]) -> Vec<RawPrediction> {
    targets
        .iter()
        .map(|&page_idx| {
            predictions
                .iter()
                .find(|p| p.page_index == page_idx)
                .copied()
                .unwrap_or(RawPrediction {
                    page_index: page_idx,
                    category: None,
                    confidence: 0.0,
                })
        })
        .collect()
}
