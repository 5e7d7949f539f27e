use crate::models::{
    ApprovalStatus, CreateScheduleRequest, Schedule, ScheduleFilter, UpdateScheduleRequest,
};
use crate::repository::ScheduleRepository;
use chrono::{NaiveTime, Utc};
use error_common::{ClinicError, Result};
use identity_context::{Action, ActorContext, Role};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Schedule store operations: declare, approve, edit, delete, query.
pub struct ScheduleService {
    repo: Arc<dyn ScheduleRepository>,
}

impl ScheduleService {
    pub fn new(repo: Arc<dyn ScheduleRepository>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> Arc<dyn ScheduleRepository> {
        self.repo.clone()
    }

    /// Declare a new availability window; enters the approval queue as
    /// `Pending`. Doctors may only declare for themselves.
    pub async fn create_schedule(
        &self,
        ctx: &ActorContext,
        request: CreateScheduleRequest,
    ) -> Result<Schedule> {
        ctx.authorize(Action::CreateSchedule)?;
        if ctx.role == Role::Doctor && ctx.user_id != request.doctor_id {
            return Err(ClinicError::AccessDenied {
                role: ctx.role.to_string(),
                action: "create schedules for another doctor".to_string(),
            });
        }

        validate_window(request.start_time, request.end_time)?;
        validate_capacity(request.max_appointments)?;

        let now = Utc::now();
        let schedule = Schedule {
            id: Uuid::new_v4(),
            doctor_id: request.doctor_id,
            recurrence: request.recurrence,
            start_time: request.start_time,
            end_time: request.end_time,
            is_available: true,
            approval: ApprovalStatus::Pending,
            max_appointments: request.max_appointments,
            notes: request.notes,
            rejection_note: None,
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.create(&schedule).await?;
        info!(
            schedule_id = %created.id,
            doctor_id = %created.doctor_id,
            "schedule created, pending approval"
        );
        Ok(created)
    }

    /// Approve a pending schedule. Idempotent: approving an already-approved
    /// schedule is a no-op, not an error.
    pub async fn approve_schedule(&self, ctx: &ActorContext, schedule_id: Uuid) -> Result<Schedule> {
        ctx.authorize(Action::ApproveSchedule)?;

        let mut schedule = self.require(schedule_id).await?;
        if schedule.approval == ApprovalStatus::Approved {
            debug!(%schedule_id, "schedule already approved; no-op");
            return Ok(schedule);
        }

        schedule.approval = ApprovalStatus::Approved;
        schedule.rejection_note = None;
        schedule.updated_at = Utc::now();

        let updated = self.repo.update(&schedule).await?;
        info!(%schedule_id, approver = %ctx.user_id, "schedule approved");
        Ok(updated)
    }

    /// Full overwrite of the mutable fields.
    pub async fn edit_schedule(
        &self,
        ctx: &ActorContext,
        schedule_id: Uuid,
        request: UpdateScheduleRequest,
    ) -> Result<Schedule> {
        ctx.authorize(Action::EditSchedule)?;

        validate_window(request.start_time, request.end_time)?;
        validate_capacity(request.max_appointments)?;

        let mut schedule = self.require(schedule_id).await?;
        schedule.recurrence = request.recurrence;
        schedule.start_time = request.start_time;
        schedule.end_time = request.end_time;
        schedule.is_available = request.is_available;
        schedule.max_appointments = request.max_appointments;
        schedule.notes = request.notes;
        schedule.rejection_note = request.rejection_note;
        schedule.updated_at = Utc::now();

        let updated = self.repo.update(&schedule).await?;
        info!(%schedule_id, editor = %ctx.user_id, "schedule edited");
        Ok(updated)
    }

    /// Hard delete. Existing appointments are matched to schedules by
    /// recomputed overlap, so none reference this row; the delete is not
    /// blocked on their account.
    pub async fn delete_schedule(&self, ctx: &ActorContext, schedule_id: Uuid) -> Result<()> {
        ctx.authorize(Action::DeleteSchedule)?;

        self.require(schedule_id).await?;
        self.repo.delete(schedule_id).await?;
        info!(%schedule_id, deleted_by = %ctx.user_id, "schedule deleted");
        Ok(())
    }

    pub async fn schedules_for_doctor(
        &self,
        doctor_id: Uuid,
        filter: &ScheduleFilter,
    ) -> Result<Vec<Schedule>> {
        self.repo.list_for_doctor(doctor_id, filter).await
    }

    pub async fn get_schedule(&self, schedule_id: Uuid) -> Result<Schedule> {
        self.require(schedule_id).await
    }

    async fn require(&self, schedule_id: Uuid) -> Result<Schedule> {
        self.repo
            .find_by_id(schedule_id)
            .await?
            .ok_or_else(|| ClinicError::not_found("schedule", schedule_id))
    }
}

fn validate_window(start: NaiveTime, end: NaiveTime) -> Result<()> {
    if end <= start {
        return Err(ClinicError::validation(
            "end_time",
            format!("end time {end} must be after start time {start}"),
        ));
    }
    Ok(())
}

fn validate_capacity(max_appointments: u32) -> Result<()> {
    if max_appointments < 1 {
        return Err(ClinicError::validation(
            "max_appointments",
            "capacity must be at least 1",
        ));
    }
    Ok(())
}
