//! PostgreSQL-backed appointment repository
//!
//! The capacity-guarded insert runs inside a serializable transaction: the
//! subselect counting the doctor's non-cancelled appointments and the insert
//! commit together or not at all, so two concurrent bookings cannot both
//! claim the last slot. A lost race surfaces as a serialization failure,
//! which the caller's retry policy handles.

use crate::models::{
    Appointment, AppointmentDetails, AppointmentSearchQuery, AppointmentStatus, SlotWindow,
};
use crate::repository::AppointmentRepository;
use async_trait::async_trait;
use database_layer::{classify, DatabasePool, TransactionManager};
use error_common::{ClinicError, Result};
use sqlx::postgres::PgRow;
use sqlx::{QueryBuilder, Row};
use tracing::debug;
use uuid::Uuid;

pub struct PostgresAppointmentRepository {
    pool: DatabasePool,
    tx: TransactionManager,
}

impl PostgresAppointmentRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            tx: TransactionManager::new(pool.clone()),
            pool,
        }
    }
}

fn row_to_appointment(row: &PgRow) -> Result<Appointment> {
    let get = |e: sqlx::Error| ClinicError::Database(e.to_string());

    let status: String = row.try_get("status").map_err(get)?;
    let status = AppointmentStatus::parse(&status).ok_or_else(|| {
        ClinicError::Database(format!("appointment row carries invalid status `{status}`"))
    })?;

    let details: serde_json::Value = row.try_get("details").map_err(get)?;
    let details: AppointmentDetails = serde_json::from_value(details)
        .map_err(|e| ClinicError::Database(format!("invalid details payload: {e}")))?;

    Ok(Appointment {
        id: row.try_get("id").map_err(get)?,
        patient_id: row.try_get("patient_id").map_err(get)?,
        doctor_id: row.try_get("doctor_id").map_err(get)?,
        scheduled_at: row.try_get("scheduled_at").map_err(get)?,
        status,
        reason: row.try_get("reason").map_err(get)?,
        details,
        fee: row.try_get("fee").map_err(get)?,
        reference_number: row.try_get("reference_number").map_err(get)?,
        status_note: row.try_get("status_note").map_err(get)?,
        created_at: row.try_get("created_at").map_err(get)?,
        updated_at: row.try_get("updated_at").map_err(get)?,
    })
}

fn details_json(details: &AppointmentDetails) -> Result<serde_json::Value> {
    serde_json::to_value(details)
        .map_err(|e| ClinicError::Database(format!("cannot serialize details: {e}")))
}

#[async_trait]
impl AppointmentRepository for PostgresAppointmentRepository {
    async fn insert_if_capacity(
        &self,
        appointment: &Appointment,
        window: SlotWindow,
        capacity: u32,
    ) -> Result<bool> {
        let doctor_id = appointment.doctor_id.ok_or_else(|| {
            ClinicError::validation("doctor_id", "capacity-checked insert requires a doctor")
        })?;
        let window_start = window.date.and_time(window.start);
        let window_end = window.date.and_time(window.end);

        let mut tx = self.tx.begin_serializable().await.map_err(ClinicError::from)?;

        let result = sqlx::query(
            r#"
            INSERT INTO appointments (
                id, patient_id, doctor_id, scheduled_at, status, reason,
                details, fee, reference_number, status_note, created_at, updated_at
            )
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12
            WHERE (
                SELECT COUNT(*) FROM appointments
                WHERE doctor_id = $3
                  AND scheduled_at >= $13 AND scheduled_at < $14
                  AND status <> 'cancelled'
            ) < $15
            "#,
        )
        .bind(appointment.id)
        .bind(appointment.patient_id)
        .bind(doctor_id)
        .bind(appointment.scheduled_at)
        .bind(appointment.status.as_str())
        .bind(&appointment.reason)
        .bind(details_json(&appointment.details)?)
        .bind(appointment.fee)
        .bind(&appointment.reference_number)
        .bind(&appointment.status_note)
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .bind(window_start)
        .bind(window_end)
        .bind(capacity as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| ClinicError::from(classify(e)))?;

        TransactionManager::commit(tx).await.map_err(ClinicError::from)?;

        debug!(
            appointment_id = %appointment.id,
            inserted = result.rows_affected() > 0,
            "capacity-guarded insert"
        );
        Ok(result.rows_affected() > 0)
    }

    async fn insert(&self, appointment: &Appointment) -> Result<Appointment> {
        sqlx::query(
            r#"
            INSERT INTO appointments (
                id, patient_id, doctor_id, scheduled_at, status, reason,
                details, fee, reference_number, status_note, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(appointment.id)
        .bind(appointment.patient_id)
        .bind(appointment.doctor_id)
        .bind(appointment.scheduled_at)
        .bind(appointment.status.as_str())
        .bind(&appointment.reason)
        .bind(details_json(&appointment.details)?)
        .bind(appointment.fee)
        .bind(&appointment.reference_number)
        .bind(&appointment.status_note)
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .execute(self.pool.pool())
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(appointment.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>> {
        let row = sqlx::query("SELECT * FROM appointments WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        row.as_ref().map(row_to_appointment).transpose()
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        new_status: AppointmentStatus,
        note: Option<String>,
    ) -> Result<Option<Appointment>> {
        let row = sqlx::query(
            r#"
            UPDATE appointments
            SET status = $3, status_note = $4, updated_at = now()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected.as_str())
        .bind(new_status.as_str())
        .bind(&note)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| ClinicError::from(classify(e)))?;

        match row {
            Some(row) => Ok(Some(row_to_appointment(&row)?)),
            // Distinguish a lost race from a missing row
            None => match self.find_by_id(id).await? {
                Some(_) => Ok(None),
                None => Err(ClinicError::not_found("appointment", id)),
            },
        }
    }

    async fn update(&self, appointment: &Appointment) -> Result<Appointment> {
        let result = sqlx::query(
            r#"
            UPDATE appointments SET
                doctor_id = $2, scheduled_at = $3, status = $4, reason = $5,
                details = $6, fee = $7, status_note = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(appointment.id)
        .bind(appointment.doctor_id)
        .bind(appointment.scheduled_at)
        .bind(appointment.status.as_str())
        .bind(&appointment.reason)
        .bind(details_json(&appointment.details)?)
        .bind(appointment.fee)
        .bind(&appointment.status_note)
        .bind(appointment.updated_at)
        .execute(self.pool.pool())
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(ClinicError::not_found("appointment", appointment.id));
        }
        Ok(appointment.clone())
    }

    async fn count_in_window(&self, doctor_id: Uuid, window: SlotWindow) -> Result<u32> {
        let window_start = window.date.and_time(window.start);
        let window_end = window.date.and_time(window.end);

        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM appointments
            WHERE doctor_id = $1
              AND scheduled_at >= $2 AND scheduled_at < $3
              AND status <> 'cancelled'
            "#,
        )
        .bind(doctor_id)
        .bind(window_start)
        .bind(window_end)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(count.max(0) as u32)
    }

    async fn search(&self, query: &AppointmentSearchQuery) -> Result<Vec<Appointment>> {
        let mut builder = QueryBuilder::new("SELECT * FROM appointments WHERE 1=1");

        if let Some(patient_id) = query.patient_id {
            builder.push(" AND patient_id = ").push_bind(patient_id);
        }
        if let Some(doctor_id) = query.doctor_id {
            builder.push(" AND doctor_id = ").push_bind(doctor_id);
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(from) = query.from {
            builder.push(" AND scheduled_at >= ").push_bind(from);
        }
        if let Some(to) = query.to {
            builder.push(" AND scheduled_at <= ").push_bind(to);
        }
        builder.push(" ORDER BY scheduled_at");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = builder
            .build()
            .fetch_all(self.pool.pool())
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        rows.iter().map(row_to_appointment).collect()
    }

    async fn find_unassigned(&self) -> Result<Vec<Appointment>> {
        let rows = sqlx::query("SELECT * FROM appointments WHERE doctor_id IS NULL")
            .fetch_all(self.pool.pool())
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        rows.iter().map(row_to_appointment).collect()
    }

    async fn assign_doctor_bulk(&self, doctor_id: Uuid) -> Result<u64> {
        // Single statement: the batch commits or rolls back as one.
        let result = sqlx::query(
            "UPDATE appointments SET doctor_id = $1, updated_at = now() WHERE doctor_id IS NULL",
        )
        .bind(doctor_id)
        .execute(self.pool.pool())
        .await
        .map_err(|e| ClinicError::from(classify(e)))?;

        Ok(result.rows_affected())
    }
}
