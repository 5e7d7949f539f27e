//! PostgreSQL-backed record-request and lab-result repositories
//!
//! The decision path is a single conditional UPDATE keyed on the stored
//! status still being `pending`; a request decided concurrently simply
//! matches zero rows.

use crate::models::{LabResult, RecordRequest, RecordType, RequestDecision, RequestStatus};
use crate::repository::{LabResultRepository, RecordRequestRepository};
use async_trait::async_trait;
use database_layer::DatabasePool;
use error_common::{ClinicError, Result};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

pub struct PostgresRecordRequestRepository {
    pool: DatabasePool,
}

impl PostgresRecordRequestRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_request(row: &PgRow) -> Result<RecordRequest> {
    let get = |e: sqlx::Error| ClinicError::Database(e.to_string());

    let record_type: String = row.try_get("record_type").map_err(get)?;
    let record_type = RecordType::parse(&record_type).ok_or_else(|| {
        ClinicError::Database(format!("request row carries invalid record type `{record_type}`"))
    })?;
    let status: String = row.try_get("status").map_err(get)?;
    let status = RequestStatus::parse(&status).ok_or_else(|| {
        ClinicError::Database(format!("request row carries invalid status `{status}`"))
    })?;

    Ok(RecordRequest {
        id: row.try_get("id").map_err(get)?,
        patient_id: row.try_get("patient_id").map_err(get)?,
        record_type,
        record_id: row.try_get("record_id").map_err(get)?,
        reason: row.try_get("reason").map_err(get)?,
        status,
        reviewed_by: row.try_get("reviewed_by").map_err(get)?,
        decided_at: row.try_get("decided_at").map_err(get)?,
        denial_reason: row.try_get("denial_reason").map_err(get)?,
        expires_at: row.try_get("expires_at").map_err(get)?,
        created_at: row.try_get("created_at").map_err(get)?,
    })
}

#[async_trait]
impl RecordRequestRepository for PostgresRecordRequestRepository {
    async fn insert(&self, request: &RecordRequest) -> Result<RecordRequest> {
        sqlx::query(
            r#"
            INSERT INTO record_requests (
                id, patient_id, record_type, record_id, reason, status,
                reviewed_by, decided_at, denial_reason, expires_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(request.id)
        .bind(request.patient_id)
        .bind(request.record_type.as_str())
        .bind(request.record_id)
        .bind(&request.reason)
        .bind(request.status.as_str())
        .bind(request.reviewed_by)
        .bind(request.decided_at)
        .bind(&request.denial_reason)
        .bind(request.expires_at)
        .bind(request.created_at)
        .execute(self.pool.pool())
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(request.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RecordRequest>> {
        let row = sqlx::query("SELECT * FROM record_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        row.as_ref().map(row_to_request).transpose()
    }

    async fn decide(
        &self,
        id: Uuid,
        decision: &RequestDecision,
    ) -> Result<Option<RecordRequest>> {
        let row = sqlx::query(
            r#"
            UPDATE record_requests
            SET status = $2, reviewed_by = $3, decided_at = $4,
                denial_reason = $5, expires_at = $6
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(decision.status.as_str())
        .bind(decision.reviewed_by)
        .bind(decision.decided_at)
        .bind(&decision.denial_reason)
        .bind(decision.expires_at)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(row_to_request(&row)?)),
            None => match self.find_by_id(id).await? {
                Some(_) => Ok(None),
                None => Err(ClinicError::not_found("record request", id)),
            },
        }
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<RecordRequest>> {
        let rows = sqlx::query(
            "SELECT * FROM record_requests WHERE patient_id = $1 ORDER BY created_at",
        )
        .bind(patient_id)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        rows.iter().map(row_to_request).collect()
    }
}

pub struct PostgresLabResultRepository {
    pool: DatabasePool,
}

impl PostgresLabResultRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_lab_result(row: &PgRow) -> Result<LabResult> {
    let get = |e: sqlx::Error| ClinicError::Database(e.to_string());
    Ok(LabResult {
        id: row.try_get("id").map_err(get)?,
        patient_id: row.try_get("patient_id").map_err(get)?,
        test_name: row.try_get("test_name").map_err(get)?,
        result_summary: row.try_get("result_summary").map_err(get)?,
        attachment_key: row.try_get("attachment_key").map_err(get)?,
        recorded_by: row.try_get("recorded_by").map_err(get)?,
        recorded_at: row.try_get("recorded_at").map_err(get)?,
    })
}

#[async_trait]
impl LabResultRepository for PostgresLabResultRepository {
    async fn insert(&self, result: &LabResult) -> Result<LabResult> {
        sqlx::query(
            r#"
            INSERT INTO lab_results (
                id, patient_id, test_name, result_summary,
                attachment_key, recorded_by, recorded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(result.id)
        .bind(result.patient_id)
        .bind(&result.test_name)
        .bind(&result.result_summary)
        .bind(&result.attachment_key)
        .bind(result.recorded_by)
        .bind(result.recorded_at)
        .execute(self.pool.pool())
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(result.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LabResult>> {
        let row = sqlx::query("SELECT * FROM lab_results WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        row.as_ref().map(row_to_lab_result).transpose()
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<LabResult>> {
        let rows = sqlx::query(
            "SELECT * FROM lab_results WHERE patient_id = $1 ORDER BY recorded_at",
        )
        .bind(patient_id)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        rows.iter().map(row_to_lab_result).collect()
    }
}
