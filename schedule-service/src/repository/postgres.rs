//! PostgreSQL-backed schedule repository
//!
//! Storage keeps the recurrence as two nullable columns (`weekday`,
//! `one_off_date`); exactly one is populated, enforced by the domain type on
//! the way in and checked on the way out.

use crate::models::{ApprovalStatus, Recurrence, Schedule, ScheduleFilter};
use crate::repository::ScheduleRepository;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use database_layer::DatabasePool;
use error_common::{ClinicError, Result};
use sqlx::postgres::PgRow;
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

pub struct PostgresScheduleRepository {
    pool: DatabasePool,
}

impl PostgresScheduleRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

pub(crate) fn weekday_to_i16(weekday: Weekday) -> i16 {
    weekday.num_days_from_monday() as i16
}

pub(crate) fn weekday_from_i16(value: i16) -> Result<Weekday> {
    Ok(match value {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        6 => Weekday::Sun,
        other => {
            return Err(ClinicError::Database(format!(
                "schedule row carries invalid weekday {other}"
            )))
        }
    })
}

fn approval_from_str(value: &str) -> Result<ApprovalStatus> {
    match value {
        "pending" => Ok(ApprovalStatus::Pending),
        "approved" => Ok(ApprovalStatus::Approved),
        other => Err(ClinicError::Database(format!(
            "schedule row carries invalid approval status `{other}`"
        ))),
    }
}

fn row_to_schedule(row: &PgRow) -> Result<Schedule> {
    let weekday: Option<i16> = row
        .try_get("weekday")
        .map_err(|e| ClinicError::Database(e.to_string()))?;
    let one_off_date: Option<NaiveDate> = row
        .try_get("one_off_date")
        .map_err(|e| ClinicError::Database(e.to_string()))?;

    let recurrence = match (weekday, one_off_date) {
        (Some(w), None) => Recurrence::Weekly(weekday_from_i16(w)?),
        (None, Some(date)) => Recurrence::OneOff(date),
        _ => {
            return Err(ClinicError::Database(
                "schedule row must carry exactly one of weekday / one_off_date".to_string(),
            ))
        }
    };

    let approval: String = row
        .try_get("approval")
        .map_err(|e| ClinicError::Database(e.to_string()))?;
    let max_appointments: i32 = row
        .try_get("max_appointments")
        .map_err(|e| ClinicError::Database(e.to_string()))?;

    let get = |e: sqlx::Error| ClinicError::Database(e.to_string());
    Ok(Schedule {
        id: row.try_get("id").map_err(get)?,
        doctor_id: row.try_get("doctor_id").map_err(get)?,
        recurrence,
        start_time: row.try_get("start_time").map_err(get)?,
        end_time: row.try_get("end_time").map_err(get)?,
        is_available: row.try_get("is_available").map_err(get)?,
        approval: approval_from_str(&approval)?,
        max_appointments: max_appointments.max(0) as u32,
        notes: row.try_get("notes").map_err(get)?,
        rejection_note: row.try_get("rejection_note").map_err(get)?,
        created_at: row.try_get("created_at").map_err(get)?,
        updated_at: row.try_get("updated_at").map_err(get)?,
    })
}

fn recurrence_columns(recurrence: &Recurrence) -> (Option<i16>, Option<NaiveDate>) {
    match recurrence {
        Recurrence::Weekly(w) => (Some(weekday_to_i16(*w)), None),
        Recurrence::OneOff(date) => (None, Some(*date)),
    }
}

#[async_trait]
impl ScheduleRepository for PostgresScheduleRepository {
    async fn create(&self, schedule: &Schedule) -> Result<Schedule> {
        debug!(schedule_id = %schedule.id, doctor_id = %schedule.doctor_id, "inserting schedule");
        let (weekday, one_off_date) = recurrence_columns(&schedule.recurrence);

        sqlx::query(
            r#"
            INSERT INTO schedules (
                id, doctor_id, weekday, one_off_date, start_time, end_time,
                is_available, approval, max_appointments, notes, rejection_note,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(schedule.id)
        .bind(schedule.doctor_id)
        .bind(weekday)
        .bind(one_off_date)
        .bind(schedule.start_time)
        .bind(schedule.end_time)
        .bind(schedule.is_available)
        .bind(schedule.approval.as_str())
        .bind(schedule.max_appointments as i32)
        .bind(&schedule.notes)
        .bind(&schedule.rejection_note)
        .bind(schedule.created_at)
        .bind(schedule.updated_at)
        .execute(self.pool.pool())
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(schedule.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Schedule>> {
        let row = sqlx::query("SELECT * FROM schedules WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        row.as_ref().map(row_to_schedule).transpose()
    }

    async fn update(&self, schedule: &Schedule) -> Result<Schedule> {
        let (weekday, one_off_date) = recurrence_columns(&schedule.recurrence);

        let result = sqlx::query(
            r#"
            UPDATE schedules SET
                weekday = $2, one_off_date = $3, start_time = $4, end_time = $5,
                is_available = $6, approval = $7, max_appointments = $8,
                notes = $9, rejection_note = $10, updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(schedule.id)
        .bind(weekday)
        .bind(one_off_date)
        .bind(schedule.start_time)
        .bind(schedule.end_time)
        .bind(schedule.is_available)
        .bind(schedule.approval.as_str())
        .bind(schedule.max_appointments as i32)
        .bind(&schedule.notes)
        .bind(&schedule.rejection_note)
        .bind(schedule.updated_at)
        .execute(self.pool.pool())
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(ClinicError::not_found("schedule", schedule.id));
        }
        Ok(schedule.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM schedules WHERE id = $1")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        filter: &ScheduleFilter,
    ) -> Result<Vec<Schedule>> {
        let rows = sqlx::query("SELECT * FROM schedules WHERE doctor_id = $1")
            .bind(doctor_id)
            .fetch_all(self.pool.pool())
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        // Filter predicates are shared with the in-memory store to keep the
        // two surfaces behaviorally identical.
        rows.iter()
            .map(row_to_schedule)
            .filter(|result| match result {
                Ok(schedule) => filter.accepts(schedule),
                Err(_) => true,
            })
            .collect()
    }

    async fn find_matching(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Vec<Schedule>> {
        let weekday = weekday_to_i16(date.weekday());

        let rows = sqlx::query(
            r#"
            SELECT * FROM schedules
            WHERE doctor_id = $1
              AND (one_off_date = $2 OR (one_off_date IS NULL AND weekday = $3))
              AND start_time <= $4 AND $4 < end_time
            "#,
        )
        .bind(doctor_id)
        .bind(date)
        .bind(weekday)
        .bind(time)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        rows.iter().map(row_to_schedule).collect()
    }
}
