use serde::{Deserialize, Serialize};

/// The closed set of minute book section names. Documents may omit
/// categories, but no other category ever appears in output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    ArticlesAmendments,
    ByLaws,
    UnanimousShareholderAgreement,
    MinutesResolutions,
    DirectorsRegister,
    OfficersRegister,
    ShareholderRegister,
    SecuritiesRegister,
    ShareCertificates,
    UltimateBeneficialOwnerRegister,
}

pub const ALL_CATEGORIES: [Category; 10] = [
    Category::ArticlesAmendments,
    Category::ByLaws,
    Category::UnanimousShareholderAgreement,
    Category::MinutesResolutions,
    Category::DirectorsRegister,
    Category::OfficersRegister,
    Category::ShareholderRegister,
    Category::SecuritiesRegister,
    Category::ShareCertificates,
    Category::UltimateBeneficialOwnerRegister,
];

impl Category {
    /// Canonical output name. Must match the emitter contract exactly.
    pub fn name(&self) -> &'static str {
        match self {
            Category::ArticlesAmendments => "Articles & Amendments",
            Category::ByLaws => "By Laws",
            Category::UnanimousShareholderAgreement => "Unanimous Shareholder Agreement",
            Category::MinutesResolutions => "Minutes & Resolutions",
            Category::DirectorsRegister => "Directors Register",
            Category::OfficersRegister => "Officers Register",
            Category::ShareholderRegister => "Shareholder Register",
            Category::SecuritiesRegister => "Securities Register",
            Category::ShareCertificates => "Share Certificates",
            Category::UltimateBeneficialOwnerRegister => "Ultimate Beneficial Owner Register",
        }
    }

    /// Wire number used in prompts and replies (1-based, stable order).
    pub fn number(&self) -> u8 {
        ALL_CATEGORIES
            .iter()
            .position(|c| c == self)
            .map(|i| (i + 1) as u8)
            .unwrap_or(0)
    }

    pub fn from_number(n: u8) -> Option<Category> {
        if n == 0 {
            return None;
        }
        ALL_CATEGORIES.get((n - 1) as usize).copied()
    }

    /// Map a free-form label back onto the closed set. Exact names match
    /// first; otherwise the label is folded to lowercase alphanumerics and
    /// matched by containment, tolerating oracle spelling drift.
    pub fn parse(label: &str) -> Option<Category> {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return None;
        }
        for cat in ALL_CATEGORIES {
            if cat.name() == trimmed {
                return Some(cat);
            }
        }

        let folded = fold(trimmed);
        if folded.is_empty() {
            return None;
        }
        for cat in ALL_CATEGORIES {
            let canon = fold(cat.name());
            if folded.contains(&canon) || canon.contains(&folded) {
                return Some(cat);
            }
        }
        None
    }
}

fn fold(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}
