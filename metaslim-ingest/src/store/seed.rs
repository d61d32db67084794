//! Reference studies seeded into an empty local store
//!
//! Gives a fresh installation something to chart before the first
//! extraction. Landmark published results; reconciliation treats them like
//! any other study (a real extraction of the same cohort updates in place).

use metaslim_common::{CandidateRecord, DoseObservation, Formulation};

pub fn seed_records() -> Vec<CandidateRecord> {
    vec![
        CandidateRecord {
            drug_name: "Tirzepatide".to_string(),
            drug_class: "GIP/GLP-1 RA".to_string(),
            company: "Eli Lilly".to_string(),
            trial_name: "SURMOUNT-1".to_string(),
            phase: "Phase 3".to_string(),
            has_t2d: false,
            is_chinese_cohort: false,
            duration_weeks: 72,
            formulation: Formulation::SubcutaneousInjection,
            frequency: "once weekly".to_string(),
            summary: Some(
                "Tirzepatide substantially reduced body weight in adults with obesity or \
                 overweight without diabetes."
                    .to_string(),
            ),
            doses: vec![
                DoseObservation {
                    dose: "5mg".to_string(),
                    weight_loss_percent: 15.0,
                    nausea_percent: 24.6,
                    vomiting_percent: 8.3,
                    diarrhea_percent: 18.7,
                    constipation_percent: 16.8,
                    sae_percent: 2.6,
                },
                DoseObservation {
                    dose: "10mg".to_string(),
                    weight_loss_percent: 19.5,
                    nausea_percent: 33.3,
                    vomiting_percent: 10.7,
                    diarrhea_percent: 21.2,
                    constipation_percent: 17.1,
                    sae_percent: 2.6,
                },
                DoseObservation {
                    dose: "15mg".to_string(),
                    weight_loss_percent: 20.9,
                    nausea_percent: 31.0,
                    vomiting_percent: 12.2,
                    diarrhea_percent: 23.0,
                    constipation_percent: 11.7,
                    sae_percent: 2.6,
                },
            ],
        },
        CandidateRecord {
            drug_name: "Semaglutide".to_string(),
            drug_class: "GLP-1 RA".to_string(),
            company: "Novo Nordisk".to_string(),
            trial_name: "STEP 1".to_string(),
            phase: "Phase 3".to_string(),
            has_t2d: false,
            is_chinese_cohort: false,
            duration_weeks: 68,
            formulation: Formulation::SubcutaneousInjection,
            frequency: "once weekly".to_string(),
            summary: Some(
                "Semaglutide 2.4mg produced significant weight loss in adults with \
                 overweight or obesity."
                    .to_string(),
            ),
            doses: vec![DoseObservation {
                dose: "2.4mg".to_string(),
                weight_loss_percent: 14.9,
                nausea_percent: 44.2,
                vomiting_percent: 24.8,
                diarrhea_percent: 31.5,
                constipation_percent: 23.4,
                sae_percent: 9.8,
            }],
        },
    ]
}
