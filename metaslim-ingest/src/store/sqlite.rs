//! Local SQLite study store
//!
//! The fallback backend used whenever no Firestore project is configured.
//! Dose observations are stored as a JSON column; everything else is flat.

use super::{seed_records, StoreError, StudyStore};
use async_trait::async_trait;
use chrono::Utc;
use metaslim_common::events::{EventBus, MetaslimEvent};
use metaslim_common::{CandidateRecord, DoseObservation, Formulation, Study, StudyId};
use sqlx::{Row, SqlitePool};
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

pub struct SqliteStore {
    pool: SqlitePool,
    bus: EventBus,
}

impl SqliteStore {
    /// Wrap an initialized pool.
    ///
    /// Seeds the reference dataset when the studies table is empty so a
    /// fresh installation has something to chart.
    pub async fn new(pool: SqlitePool, bus: EventBus) -> Result<Self, StoreError> {
        let store = Self { pool, bus };

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM studies")
            .fetch_one(&store.pool)
            .await?;
        if count == 0 {
            for record in seed_records() {
                store.insert(&record).await?;
            }
            info!("Seeded empty study database with reference studies");
        }

        Ok(store)
    }

    /// Insert without emitting a change event (seeding, internal use)
    async fn insert(&self, record: &CandidateRecord) -> Result<StudyId, StoreError> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().timestamp_millis();
        let doses_json = serde_json::to_string(&record.doses)?;

        sqlx::query(
            r#"
            INSERT INTO studies (
                id, drug_name, drug_class, company, trial_name, phase,
                has_t2d, is_chinese_cohort, duration_weeks, formulation,
                frequency, doses, summary, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&record.drug_name)
        .bind(&record.drug_class)
        .bind(&record.company)
        .bind(&record.trial_name)
        .bind(&record.phase)
        .bind(record.has_t2d)
        .bind(record.is_chinese_cohort)
        .bind(record.duration_weeks)
        .bind(record.formulation.as_str())
        .bind(&record.frequency)
        .bind(doses_json)
        .bind(&record.summary)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    fn notify(&self) {
        self.bus.emit_lossy(MetaslimEvent::StudiesChanged {
            timestamp: Utc::now(),
        });
    }
}

fn study_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Study, StoreError> {
    let doses_json: String = row.get("doses");
    let doses: Vec<DoseObservation> = serde_json::from_str(&doses_json)?;
    let formulation: String = row.get("formulation");

    Ok(Study {
        id: row.get("id"),
        record: CandidateRecord {
            drug_name: row.get("drug_name"),
            drug_class: row.get("drug_class"),
            company: row.get("company"),
            trial_name: row.get("trial_name"),
            phase: row.get("phase"),
            has_t2d: row.get("has_t2d"),
            is_chinese_cohort: row.get("is_chinese_cohort"),
            duration_weeks: row.get("duration_weeks"),
            formulation: Formulation::from_wire(&formulation),
            frequency: row.get("frequency"),
            doses,
            summary: row.get("summary"),
        },
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl StudyStore for SqliteStore {
    async fn add(&self, record: &CandidateRecord) -> Result<StudyId, StoreError> {
        let id = self.insert(record).await?;
        self.notify();
        Ok(id)
    }

    async fn update(&self, id: &str, record: &CandidateRecord) -> Result<(), StoreError> {
        let doses_json = serde_json::to_string(&record.doses)?;

        let result = sqlx::query(
            r#"
            UPDATE studies SET
                drug_name = ?, drug_class = ?, company = ?, trial_name = ?,
                phase = ?, has_t2d = ?, is_chinese_cohort = ?,
                duration_weeks = ?, formulation = ?, frequency = ?,
                doses = ?, summary = ?
            WHERE id = ?
            "#,
        )
        .bind(&record.drug_name)
        .bind(&record.drug_class)
        .bind(&record.company)
        .bind(&record.trial_name)
        .bind(&record.phase)
        .bind(record.has_t2d)
        .bind(record.is_chinese_cohort)
        .bind(record.duration_weeks)
        .bind(record.formulation.as_str())
        .bind(&record.frequency)
        .bind(doses_json)
        .bind(&record.summary)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.notify();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM studies WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.notify();
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM studies").execute(&self.pool).await?;
        self.notify();
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Study>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, drug_name, drug_class, company, trial_name, phase,
                   has_t2d, is_chinese_cohort, duration_weeks, formulation,
                   frequency, doses, summary, created_at
            FROM studies
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(study_from_row).collect()
    }

    fn changes(&self) -> broadcast::Receiver<MetaslimEvent> {
        self.bus.subscribe()
    }
}
