use minute_split::{
    aggregate::aggregate,
    category::Category,
    config::Smoothing,
    label::{LabelSource, PageLabel},
    smooth::smooth,
};

fn label(idx: usize, category: Option<Category>, confidence: f32) -> PageLabel {
    PageLabel {
        page_index: idx,
        category,
        confidence,
        source: LabelSource::Ask,
        is_final: false,
    }
}

fn seq(cats: &[Option<Category>], confidence: f32) -> Vec<PageLabel> {
    cats.iter()
        .enumerate()
        .map(|(i, c)| label(i, *c, confidence))
        .collect()
}

const A: Option<Category> = Some(Category::MinutesResolutions);
const B: Option<Category> = Some(Category::ByLaws);

#[test]
fn lone_disagreement_collapses_into_surrounding_section() {
    let labels = seq(&[A, A, A, B, A, A, A], 50.0);
    let smoothed = smooth(&labels, &Smoothing::default());

    assert!(smoothed.iter().all(|l| l.category == A));
    let sections = aggregate(&smoothed);
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].start_page, 0);
    assert_eq!(sections[0].end_page, 6);
}

#[test]
fn smoothing_is_idempotent() {
    let u: Option<Category> = None;
    let cases = vec![
        seq(&[A, B, A, B, A, B, A], 40.0),
        seq(&[A, A, u, A, B, B, B, A, B], 30.0),
        seq(&[B, A, A, A, u, u, A], 55.0),
        seq(&[u, u, u], 0.0),
    ];
    let cfg = Smoothing::default();
    for labels in cases {
        let once = smooth(&labels, &cfg);
        let twice = smooth(&once, &cfg);
        assert_eq!(once, twice);
    }
}

#[test]
fn high_confidence_labels_survive_majority_pressure() {
    let mut labels = seq(&[A, A, B, A, A], 60.0);
    labels[2].confidence = 95.0;
    let smoothed = smooth(&labels, &Smoothing::default());
    assert_eq!(smoothed[2].category, B);
    assert_eq!(smoothed[2].confidence, 95.0);
}

#[test]
fn unknown_is_never_adopted() {
    let u: Option<Category> = None;
    let labels = seq(&[u, B, u], 20.0);
    let smoothed = smooth(&labels, &Smoothing::default());
    assert_eq!(smoothed[1].category, B);
}

#[test]
fn ambiguous_boundary_is_preserved() {
    // One vote per side: no strict majority, nothing changes.
    let labels = seq(&[A, B, Some(Category::DirectorsRegister)], 50.0);
    let smoothed = smooth(&labels, &Smoothing::default());
    assert_eq!(smoothed, labels);
}
