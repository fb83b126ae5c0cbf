use minute_split::{
    category::Category,
    config::Config,
    corpus::{Corpus, Page},
    oracle::{AskRequest, Oracle, OracleDiag, OracleError, RawPrediction, VisionRequest},
    pipeline::Pipeline,
    resolver::ResolverOutcome,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

struct ScriptedOracle {
    asks: Mutex<VecDeque<Result<Vec<RawPrediction>, OracleError>>>,
    calls: AtomicU64,
}

impl ScriptedOracle {
    fn new(asks: Vec<Result<Vec<RawPrediction>, OracleError>>) -> Self {
        Self {
            asks: Mutex::new(asks.into()),
            calls: AtomicU64::new(0),
        }
    }
}

impl Oracle for ScriptedOracle {
    fn ask(&self, _req: &AskRequest) -> Result<Vec<RawPrediction>, OracleError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.asks
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn vision(&self, _req: &VisionRequest) -> Result<Vec<RawPrediction>, OracleError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(Vec::new())
    }

    fn health(&self) -> Result<OracleDiag, OracleError> {
        Ok(OracleDiag {
            base_url: "scripted".into(),
            model: "scripted".into(),
            ok: true,
            error: None,
        })
    }

    fn calls_made(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

fn corpus(page_count: usize) -> Corpus {
    Corpus {
        pages: (0..page_count)
            .map(|i| Page {
                index: i,
                lines: vec![
                    format!("HEADING FOR PAGE {}", i + 1),
                    "some body text of the page".to_string(),
                ],
                image: None,
            })
            .collect(),
    }
}

fn pred(page_index: usize, category: Category, confidence: f32) -> RawPrediction {
    RawPrediction {
        page_index,
        category: Some(category),
        confidence,
    }
}

fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.oracle.max_parallel_requests = 1;
    cfg.batching.batch_size = 4;
    cfg.batching.context_pages = 1;
    cfg
}

#[test]
fn emitted_sections_partition_the_document() {
    let cfg = test_config();
    let corpus = corpus(9);

    // Three batches: 0-3, 4-7, 8. The second mislabels a 2-page run
    // with low confidence; the resolver repairs it with one re-query.
    let oracle = ScriptedOracle::new(vec![
        Ok((0..4).map(|i| pred(i, Category::ArticlesAmendments, 90.0)).collect()),
        Ok(vec![
            pred(4, Category::ByLaws, 40.0),
            pred(5, Category::ByLaws, 40.0),
            pred(6, Category::MinutesResolutions, 90.0),
            pred(7, Category::MinutesResolutions, 90.0),
        ]),
        Ok(vec![pred(8, Category::MinutesResolutions, 90.0)]),
        // Resolver re-query for the suspect span.
        Ok(vec![
            pred(4, Category::MinutesResolutions, 91.0),
            pred(5, Category::MinutesResolutions, 90.0),
        ]),
    ]);

    let output = Pipeline::new(&cfg, &oracle).run_job(&corpus).unwrap();

    assert_eq!(output.report.resolver.outcome, ResolverOutcome::Stable);
    assert_eq!(output.report.resolver.requeries, 1);
    assert_eq!(output.report.oracle_calls, 4);

    let sections = &output.sections.sections;
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].name, "Articles & Amendments");
    assert_eq!(sections[0].start_page, 1);
    assert_eq!(sections[0].end_page, 4);
    assert_eq!(sections[1].name, "Minutes & Resolutions");
    assert_eq!(sections[1].start_page, 5);
    assert_eq!(sections[1].end_page, 9);

    // Partition property: 1-indexed, ascending, no gaps or overlaps.
    let mut expected = 1;
    for section in sections {
        assert_eq!(section.start_page, expected);
        assert!(section.end_page >= section.start_page);
        expected = section.end_page + 1;
    }
    assert_eq!(expected, 10);

    // No UNKNOWN leakage into the final labels.
    assert!(output.labels.iter().all(|l| l.category.is_some()));
}

#[test]
fn omitted_page_heals_without_extra_queries_when_neighbors_agree() {
    let cfg = test_config();
    let corpus = corpus(8);

    // The oracle skips page 6 (wire numbering) entirely; the smoothing
    // window closes the gap at zero marginal cost.
    let oracle = ScriptedOracle::new(vec![
        Ok((0..4).map(|i| pred(i, Category::MinutesResolutions, 90.0)).collect()),
        Ok(vec![
            pred(4, Category::MinutesResolutions, 90.0),
            pred(6, Category::MinutesResolutions, 90.0),
            pred(7, Category::MinutesResolutions, 90.0),
        ]),
    ]);

    let output = Pipeline::new(&cfg, &oracle).run_job(&corpus).unwrap();
    assert_eq!(output.report.oracle_calls, 2);
    assert_eq!(output.report.resolver.requeries, 0);
    assert_eq!(output.sections.sections.len(), 1);
    assert_eq!(output.sections.sections[0].end_page, 8);
}

#[test]
fn auth_failure_aborts_without_output() {
    let cfg = test_config();
    let corpus = corpus(6);

    let oracle = ScriptedOracle::new(vec![
        Err(OracleError::Auth { status: 401 }),
    ]);

    let err = Pipeline::new(&cfg, &oracle).run_job(&corpus).unwrap_err();
    assert!(err.to_string().contains("authentication"));
}

#[test]
fn failed_batch_degrades_and_resolver_recovers() {
    let cfg = test_config();
    let corpus = corpus(8);

    let oracle = ScriptedOracle::new(vec![
        Ok((0..4).map(|i| pred(i, Category::ShareholderRegister, 90.0)).collect()),
        Err(OracleError::Exhausted {
            attempts: 3,
            message: "timed out".into(),
        }),
        // Re-query covers the degraded span.
        Ok((4..8).map(|i| pred(i, Category::SecuritiesRegister, 90.0)).collect()),
    ]);

    let output = Pipeline::new(&cfg, &oracle).run_job(&corpus).unwrap();
    assert_eq!(output.report.resolver.outcome, ResolverOutcome::Stable);
    assert_eq!(output.sections.sections.len(), 2);
    assert_eq!(output.sections.sections[1].name, "Securities Register");
    assert_eq!(output.sections.sections[1].start_page, 5);
}
