use crate::{
    aggregate::{aggregate, check_coverage},
    batch_plan::BatchPlan,
    config::Config,
    corpus::Corpus,
    label::{LabelMap, LabelSource, PageLabel},
    oracle::{dispatch, AskRequest, Oracle, OracleJob},
    prompt,
    reconcile::{absorb_unknown_runs, reconcile},
    report::{JobReport, SectionOut, SectionReport, SectionsDoc},
    resolver,
    smooth::smooth,
};
use anyhow::{anyhow, bail, Result};
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct Pipeline<'a, O: Oracle + ?Sized> {
    cfg: Config,
    oracle: &'a O,
}

#[derive(Debug)]
pub struct JobOutput {
    pub sections: SectionsDoc,
    pub report: JobReport,
    pub labels: Vec<PageLabel>,
}

impl<'a, O: Oracle + ?Sized> Pipeline<'a, O> {
    pub fn new(cfg: &Config, oracle: &'a O) -> Self {
        Self {
            cfg: cfg.clone(),
            oracle,
        }
    }

    /// Full run: plan batches, fan out the first classification pass,
    /// smooth, aggregate, repair discontinuities, reconcile isolated
    /// sections, then emit the section list with its cost report.
    pub fn run_job(&self, corpus: &Corpus) -> Result<JobOutput> {
        let started = Instant::now();
        let page_count = corpus.page_count();
        if page_count == 0 {
            bail!("corpus has zero pages");
        }
        if self.cfg.limits.max_input_pages > 0 && page_count > self.cfg.limits.max_input_pages {
            bail!("corpus exceeds max_input_pages: {page_count}");
        }

        let plan = BatchPlan::from_page_count(&self.cfg, page_count);
        info!(
            "plan pages={} batches={} batch_size={} context={}",
            page_count,
            plan.batches.len(),
            self.cfg.batching.batch_size,
            self.cfg.batching.context_pages
        );
        debug!(?plan, "batch plan");

        let mut labels = LabelMap::new(page_count);
        self.initial_pass(corpus, &plan, &mut labels)?;

        let smoothed = smooth(labels.labels(), &self.cfg.smoothing);
        labels.replace(smoothed);

        let resolver_report =
            resolver::resolve(&self.cfg, self.oracle, corpus, &mut labels, started)?;

        let reconciled = reconcile(&self.cfg.reconciler, corpus, &mut labels);
        absorb_unknown_runs(&mut labels)?;

        let spans = aggregate(labels.labels());
        check_coverage(&spans, page_count)?;

        let mut sections = Vec::new();
        let mut section_reports = Vec::new();
        for span in &spans {
            let category = span.category.ok_or_else(|| {
                anyhow!(
                    "invariant violation: unknown pages at {}-{} after absorption",
                    span.start_page + 1,
                    span.end_page + 1
                )
            })?;
            sections.push(SectionOut {
                name: category.name().to_string(),
                start_page: span.start_page + 1,
                end_page: span.end_page + 1,
            });
            section_reports.push(SectionReport {
                name: category.name().to_string(),
                start_page: span.start_page + 1,
                end_page: span.end_page + 1,
                num_pages: span.num_pages(),
                avg_confidence: span.avg_confidence,
            });
        }

        let report = JobReport {
            total_pages: page_count,
            oracle_calls: self.oracle.calls_made(),
            elapsed_seconds: started.elapsed().as_secs_f64(),
            resolver: resolver_report,
            reconciled_sections: reconciled,
            sections: section_reports,
        };

        info!(
            "run complete: {} sections, {} oracle calls, {:.1}s",
            report.sections.len(),
            report.oracle_calls,
            report.elapsed_seconds
        );

        Ok(JobOutput {
            sections: SectionsDoc { sections },
            report,
            labels: labels.labels().to_vec(),
        })
    }

    /// First pass: every batch goes out concurrently; labels merge back
    /// in batch order on this thread (the single writer). A failed batch
    /// degrades its own pages to UNKNOWN and the run continues; only
    /// auth-class errors abort.
    fn initial_pass(
        &self,
        corpus: &Corpus,
        plan: &BatchPlan,
        labels: &mut LabelMap,
    ) -> Result<()> {
        let instructions = prompt::main_instructions();
        let jobs: Vec<OracleJob> = plan
            .batches
            .iter()
            .map(|batch| {
                OracleJob::Ask(AskRequest {
                    prompt: prompt::ask_prompt(&self.cfg, corpus, batch, &instructions),
                    model: self.cfg.oracle.model.clone(),
                })
            })
            .collect();

        let results = dispatch(self.oracle, &jobs, self.cfg.oracle.max_parallel_requests);

        for (batch, result) in plan.batches.iter().zip(results) {
            let predictions = match result {
                Ok(p) => p,
                Err(err) if err.is_fatal() => return Err(anyhow!(err)),
                Err(err) => {
                    warn!(
                        "batch {}-{} failed; pages degrade to UNKNOWN: {err}",
                        batch.start_page + 1,
                        batch.end_page + 1
                    );
                    continue;
                }
            };
            // Context-page labels are advisory; only primary pages merge.
            let primary: Vec<_> = predictions
                .into_iter()
                .filter(|p| p.page_index >= batch.start_page && p.page_index <= batch.end_page)
                .collect();
            labels.merge_predictions(
                &primary,
                LabelSource::Ask,
                self.cfg.resolver.final_confidence,
            );
        }

        Ok(())
    }
}
