use crate::resolver::ResolverReport;
use serde::{Deserialize, Serialize};

/// The required output document: 1-indexed, gap-free, in page order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionsDoc {
    pub sections: Vec<SectionOut>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionOut {
    pub name: String,
    pub start_page: usize,
    pub end_page: usize,
}

/// Cost and quality accounting for one run.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub total_pages: usize,
    pub oracle_calls: u64,
    pub elapsed_seconds: f64,
    pub resolver: ResolverReport,
    pub reconciled_sections: usize,
    pub sections: Vec<SectionReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionReport {
    pub name: String,
    pub start_page: usize,
    pub end_page: usize,
    pub num_pages: usize,
    pub avg_confidence: f32,
}
