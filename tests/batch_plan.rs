use minute_split::{batch_plan::BatchPlan, config::Config};

#[test]
fn batches_partition_page_range() {
    let cfg = Config::default();
    let plan = BatchPlan::from_page_count(&cfg, 101);
    assert!(!plan.batches.is_empty());
    assert_eq!(plan.batches[0].start_page, 0);
    assert_eq!(plan.batches.last().unwrap().end_page, 100);

    let mut expected = 0;
    for batch in &plan.batches {
        assert_eq!(batch.start_page, expected);
        assert!(batch.end_page >= batch.start_page);
        expected = batch.end_page + 1;
    }
    assert_eq!(expected, 101);
}

#[test]
fn context_is_clamped_at_edges() {
    let mut cfg = Config::default();
    cfg.batching.batch_size = 10;
    cfg.batching.context_pages = 3;
    let plan = BatchPlan::from_page_count(&cfg, 25);

    let first = &plan.batches[0];
    assert_eq!(first.context_start, 0);
    assert_eq!(first.context_end, 12);

    let last = plan.batches.last().unwrap();
    assert_eq!(last.context_start, 17);
    assert_eq!(last.context_end, 24);
}

#[test]
fn targeted_batch_covers_span_with_margin() {
    let batch = BatchPlan::targeted(10, 12, 2, 100);
    assert_eq!(batch.start_page, 10);
    assert_eq!(batch.end_page, 12);
    assert_eq!(batch.context_start, 8);
    assert_eq!(batch.context_end, 14);

    let edge = BatchPlan::targeted(0, 1, 3, 5);
    assert_eq!(edge.context_start, 0);
    assert_eq!(edge.context_end, 4);
}
