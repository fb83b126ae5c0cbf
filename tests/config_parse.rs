use minute_split::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../minute-split.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert!(cfg.oracle.max_parallel_requests >= 1);
    assert!(cfg.batching.batch_size >= 1);
    assert!(cfg.smoothing.window % 2 == 1);
    assert!(!cfg.paths.out_dir.is_empty());
}

#[test]
fn defaults_are_consistent() {
    let cfg = Config::default();
    // The reconciler catches what the resolver deems too small to fix.
    assert!(cfg.reconciler.max_section_pages < cfg.resolver.small_section_pages);
    assert!(cfg.resolver.low_confidence < cfg.resolver.final_confidence);
}
