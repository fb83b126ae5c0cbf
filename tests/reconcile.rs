use minute_split::{
    aggregate::aggregate,
    category::Category,
    config::Reconciler,
    corpus::{Corpus, Page},
    label::{LabelMap, LabelSource},
    oracle::RawPrediction,
    reconcile::{absorb_unknown_runs, reconcile},
};

fn corpus(pages: Vec<&str>) -> Corpus {
    Corpus {
        pages: pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| Page {
                index: i,
                lines: text.lines().map(|l| l.to_string()).collect(),
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

fn labels_from(preds: &[RawPrediction], page_count: usize) -> LabelMap {
    let mut labels = LabelMap::new(page_count);
    labels.merge_predictions(preds, LabelSource::Ask, 101.0);
    labels
}

const MINUTES_HEADING: &str =
    "MINUTES OF THE ANNUAL MEETING OF THE SHAREHOLDERS\nRESOLVED THAT the following";

#[test]
fn similar_single_page_section_folds_into_neighbor() {
    let mut pages = vec![MINUTES_HEADING; 6];
    pages.push("MINUTES OF THE ANNUAL MEETING OF THE SHAREHOLDERS\nRESOLVED FURTHER");
    pages.extend(vec![
        "REGISTER OF DIRECTORS\nNAME AND ADDRESS OF DIRECTOR\nDATE ELECTED";
        5
    ]);
    let corpus = corpus(pages);

    let mut preds = Vec::new();
    for i in 0..6 {
        preds.push(pred(i, Category::MinutesResolutions, 90.0));
    }
    // A stray one-page label the resolver left behind.
    preds.push(pred(6, Category::ByLaws, 55.0));
    for i in 7..12 {
        preds.push(pred(i, Category::DirectorsRegister, 90.0));
    }
    let mut labels = labels_from(&preds, 12);

    let merged = reconcile(&Reconciler::default(), &corpus, &mut labels);
    assert_eq!(merged, 1);

    let sections = aggregate(labels.labels());
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].category, Some(Category::MinutesResolutions));
    assert_eq!(sections[0].end_page, 6);
    // Confidences were carried over, not invented.
    assert_eq!(labels.get(6).unwrap().confidence, 55.0);
}

#[test]
fn dissimilar_small_section_is_left_alone() {
    let mut pages = vec![MINUTES_HEADING; 4];
    pages.push("SHARE CERTIFICATE NO 7\nONE HUNDRED COMMON SHARES");
    pages.extend(vec![MINUTES_HEADING; 4]);
    let corpus = corpus(pages);

    let mut preds = Vec::new();
    for i in 0..9 {
        let cat = if i == 4 {
            Category::ShareCertificates
        } else {
            Category::MinutesResolutions
        };
        preds.push(pred(i, cat, 90.0));
    }
    let mut labels = labels_from(&preds, 9);

    let merged = reconcile(&Reconciler::default(), &corpus, &mut labels);
    assert_eq!(merged, 0);
    assert_eq!(aggregate(labels.labels()).len(), 3);
}

#[test]
fn leftover_unknown_runs_absorb_into_larger_neighbor() {
    let preds = vec![
        pred(0, Category::ArticlesAmendments, 80.0),
        pred(1, Category::ArticlesAmendments, 80.0),
        pred(4, Category::ByLaws, 80.0),
    ];
    let mut labels = labels_from(&preds, 5);
    assert_eq!(labels.unknown_pages(), vec![2, 3]);

    absorb_unknown_runs(&mut labels).unwrap();
    assert!(labels.unknown_pages().is_empty());

    let sections = aggregate(labels.labels());
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].category, Some(Category::ArticlesAmendments));
    assert_eq!(sections[0].end_page, 3);
}

#[test]
fn fully_unknown_document_refuses_to_emit() {
    let mut labels = LabelMap::new(4);
    assert!(absorb_unknown_runs(&mut labels).is_err());
}
