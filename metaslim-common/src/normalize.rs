//! Display normalization for studies
//!
//! Sponsor names arrive from the literature in many spellings (including
//! Chinese-language names); drug names arrive in arbitrary casing. Snapshots
//! handed to subscribers and API clients are normalized here so the charts
//! group cohorts by one canonical label.
//!
//! Normalization is display-only: stored data is untouched, and identity
//! matching uses its own trim+lowercase rule, never this table.

use crate::types::Study;

/// Canonicalize a sponsor name by keyword lookup.
///
/// Unrecognized companies pass through trimmed.
pub fn normalize_company(company: &str) -> String {
    if company.is_empty() {
        return String::new();
    }
    let c = company.trim().to_uppercase();
    if c.contains("LILLY") || c.contains("礼来") {
        return "Eli Lilly".to_string();
    }
    if c.contains("NOVO") || c.contains("诺和诺德") {
        return "Novo Nordisk".to_string();
    }
    if c.contains("INNOVENT") || c.contains("信达") {
        return "Innovent".to_string();
    }
    if c.contains("AMGEN") || c.contains("安进") {
        return "Amgen".to_string();
    }
    if c.contains("BOEHRINGER") || c.contains("BI") || c.contains("勃林格") {
        return "Boehringer Ingelheim".to_string();
    }
    if c.contains("ASTRAZENECA") || c.contains("AZ") || c.contains("阿斯利康") {
        return "AstraZeneca".to_string();
    }
    if c.contains("HENGRUI") || c.contains("恒瑞") {
        return "Hengrui".to_string();
    }
    if c.contains("PFIZER") || c.contains("辉瑞") {
        return "Pfizer".to_string();
    }
    if c.contains("ROCHE") || c.contains("罗氏") {
        return "Roche".to_string();
    }
    if c.contains("SANOFI") || c.contains("赛诺菲") {
        return "Sanofi".to_string();
    }
    company.trim().to_string()
}

/// Title-case a drug name: first character upper, rest lower.
pub fn display_drug_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Apply display normalization to a dataset snapshot.
pub fn normalize_for_display(studies: Vec<Study>) -> Vec<Study> {
    studies
        .into_iter()
        .map(|mut study| {
            study.record.drug_name = display_drug_name(&study.record.drug_name);
            // Ecnoglutide is attributed to Pfizer regardless of the extracted sponsor
            study.record.company = if study.record.drug_name.to_lowercase().contains("ecnoglutide")
            {
                "Pfizer".to_string()
            } else {
                normalize_company(&study.record.company)
            };
            study
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CandidateRecord;

    fn study_with(drug: &str, company: &str) -> Study {
        Study {
            id: "s1".to_string(),
            record: CandidateRecord {
                drug_name: drug.to_string(),
                company: company.to_string(),
                ..Default::default()
            },
            created_at: 0,
        }
    }

    #[test]
    fn company_keywords_map_to_canonical_names() {
        assert_eq!(normalize_company("eli lilly and company"), "Eli Lilly");
        assert_eq!(normalize_company("Novo Nordisk A/S"), "Novo Nordisk");
        assert_eq!(normalize_company("礼来"), "Eli Lilly");
        assert_eq!(normalize_company("  Zealand Pharma "), "Zealand Pharma");
        assert_eq!(normalize_company(""), "");
    }

    #[test]
    fn drug_names_are_title_cased() {
        assert_eq!(display_drug_name("TIRZEPATIDE"), "Tirzepatide");
        assert_eq!(display_drug_name("semaglutide"), "Semaglutide");
        assert_eq!(display_drug_name(""), "");
    }

    #[test]
    fn ecnoglutide_overrides_extracted_sponsor() {
        let normalized = normalize_for_display(vec![study_with("ecnoglutide", "Sciwind")]);
        assert_eq!(normalized[0].record.company, "Pfizer");
    }

    #[test]
    fn normalization_leaves_other_fields_alone() {
        let normalized = normalize_for_display(vec![study_with("retatrutide", "lilly")]);
        assert_eq!(normalized[0].record.drug_name, "Retatrutide");
        assert_eq!(normalized[0].record.company, "Eli Lilly");
        assert_eq!(normalized[0].id, "s1");
    }
}
