use minute_split::category::Category;
use minute_split::oracle::parse_reply;

#[test]
fn parses_csv_triples() {
    let raw = "1, 1, 95\n2, 1, 90\n3, 4, 72.5\n";
    let preds = parse_reply(raw);
    assert_eq!(preds.len(), 3);
    assert_eq!(preds[0].page_index, 0);
    assert_eq!(preds[0].category, Some(Category::ArticlesAmendments));
    assert_eq!(preds[2].page_index, 2);
    assert_eq!(preds[2].category, Some(Category::MinutesResolutions));
    assert_eq!(preds[2].confidence, 72.5);
}

#[test]
fn noise_lines_are_ignored_not_fatal() {
    let raw = "```csv\nPage Number, Category Number, Confidence Score\n\
               1, 2, 88\nas requested:\n2, two, 90\n3, 2, 85\n```\n";
    let preds = parse_reply(raw);
    assert_eq!(preds.len(), 2);
    assert_eq!(preds[0].page_index, 0);
    assert_eq!(preds[1].page_index, 2);
}

#[test]
fn omitted_pages_are_simply_absent() {
    // A 3-page batch where the oracle answered pages 3 and 5 only.
    let preds = parse_reply("3, 4, 80\n5, 4, 75\n");
    let answered: Vec<usize> = preds.iter().map(|p| p.page_index).collect();
    assert_eq!(answered, vec![2, 4]);
    assert!(!answered.contains(&3));
}

#[test]
fn out_of_set_category_number_becomes_unknown() {
    let preds = parse_reply("7, 11, 60\n7, 0, 60\n");
    assert_eq!(preds.len(), 2);
    assert!(preds.iter().all(|p| p.category.is_none()));
}

#[test]
fn confidence_is_clamped() {
    let preds = parse_reply("1, 3, 250\n");
    assert_eq!(preds[0].confidence, 100.0);
}

#[test]
fn free_form_labels_map_onto_the_closed_set() {
    assert_eq!(Category::parse("By Laws"), Some(Category::ByLaws));
    assert_eq!(Category::parse("by-laws"), Some(Category::ByLaws));
    assert_eq!(
        Category::parse("  Unanimous Shareholder Agreement "),
        Some(Category::UnanimousShareholderAgreement)
    );
    assert_eq!(Category::parse("cover page"), None);
    assert_eq!(Category::parse(""), None);
}
