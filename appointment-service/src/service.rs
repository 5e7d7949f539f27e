//! Appointment booking and lifecycle orchestration
//!
//! Booking is capacity-checked against the doctor's approved schedule for the
//! requested slot: the count-and-insert happens atomically in the repository,
//! so concurrent bookings cannot exceed `max_appointments`. Status changes go
//! through a compare-and-set with a bounded retry on conflict, re-validating
//! the transition against the freshly read state on every attempt.

use crate::lifecycle::validate_transition;
use crate::models::{
    reference_number, Appointment, AppointmentSearchQuery, AppointmentStatus,
    BookAppointmentRequest, BookingConfig, SlotWindow,
};
use crate::repository::{AppointmentRepository, DoctorDirectory};
use chrono::Utc;
use error_common::{ClinicError, Result, RetryPolicy};
use events_bus::{emit, NotificationEvent, NotificationKind, NotificationPublisher, RelatedEntity};
use identity_context::{Action, ActorContext, Role};
use logger_redacted::PhiRedactor;
use rust_decimal::Decimal;
use schedule_service::{Schedule, ScheduleRepository};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub struct AppointmentService {
    repo: Arc<dyn AppointmentRepository>,
    schedules: Arc<dyn ScheduleRepository>,
    directory: Arc<dyn DoctorDirectory>,
    publisher: Arc<dyn NotificationPublisher>,
    redactor: PhiRedactor,
    retry: RetryPolicy,
    config: BookingConfig,
}

impl AppointmentService {
    pub fn new(
        repo: Arc<dyn AppointmentRepository>,
        schedules: Arc<dyn ScheduleRepository>,
        directory: Arc<dyn DoctorDirectory>,
        publisher: Arc<dyn NotificationPublisher>,
        config: BookingConfig,
    ) -> Self {
        let retry = RetryPolicy::new(
            config.retry_attempts,
            Duration::from_millis(config.retry_backoff_ms),
        );
        Self {
            repo,
            schedules,
            directory,
            publisher,
            redactor: PhiRedactor::default(),
            retry,
            config,
        }
    }

    /// Book an appointment in `pending` status.
    ///
    /// With a doctor assigned, the slot must fall inside one of the doctor's
    /// approved, available schedules and that schedule must have capacity
    /// left; otherwise the booking fails with `CapacityExceeded`. Unassigned
    /// bookings (no doctor yet) are a staff-only intake path and skip the
    /// capacity check, to be repaired later via doctor assignment.
    #[instrument(skip(self, actor, request), fields(patient_id = %request.patient_id))]
    pub async fn book_appointment(
        &self,
        actor: &ActorContext,
        request: BookAppointmentRequest,
    ) -> Result<Appointment> {
        actor.require_self_or_staff(request.patient_id, Action::BookAppointment)?;
        validate_booking(&request)?;

        let appointment = self.new_appointment(&request);

        let booked = match request.doctor_id {
            Some(doctor_id) => {
                if !self.directory.exists(doctor_id).await? {
                    return Err(ClinicError::not_found("doctor", doctor_id));
                }
                self.book_against_schedule(appointment, doctor_id).await?
            }
            None => {
                if !actor.is_staff_or_admin() {
                    return Err(ClinicError::validation(
                        "doctor_id",
                        "a doctor must be chosen when booking",
                    ));
                }
                self.repo.insert(&appointment).await?
            }
        };

        info!(
            appointment_id = %booked.id,
            reference = %booked.reference_number,
            "appointment booked"
        );

        emit(
            self.publisher.as_ref(),
            NotificationEvent::new(
                booked.patient_id,
                NotificationKind::AppointmentBooked,
                "Appointment booked",
                format!(
                    "Your appointment {} on {} has been received and is pending confirmation.",
                    booked.reference_number,
                    booked.scheduled_at.format("%Y-%m-%d %H:%M"),
                ),
            )
            .about(RelatedEntity::appointment(booked.id)),
        )
        .await;

        Ok(booked)
    }

    async fn book_against_schedule(
        &self,
        appointment: Appointment,
        doctor_id: Uuid,
    ) -> Result<Appointment> {
        let date = appointment.date();
        let schedule = self
            .bookable_schedule(doctor_id, &appointment)
            .await?
            .ok_or(ClinicError::CapacityExceeded { doctor_id, date })?;

        let window = SlotWindow {
            date,
            start: schedule.start_time,
            end: schedule.end_time,
        };
        let capacity = schedule.max_appointments;

        // Serialization failures under contention are transient; retry the
        // whole guarded insert a bounded number of times.
        let inserted = self
            .retry
            .run("book_appointment", || {
                let appointment = appointment.clone();
                async move {
                    self.repo
                        .insert_if_capacity(&appointment, window, capacity)
                        .await
                }
            })
            .await?;

        if !inserted {
            return Err(ClinicError::CapacityExceeded { doctor_id, date });
        }
        Ok(appointment)
    }

    async fn bookable_schedule(
        &self,
        doctor_id: Uuid,
        appointment: &Appointment,
    ) -> Result<Option<Schedule>> {
        let matching = self
            .schedules
            .find_matching(doctor_id, appointment.date(), appointment.time())
            .await?;
        Ok(matching.into_iter().find(|s| s.is_bookable()))
    }

    fn new_appointment(&self, request: &BookAppointmentRequest) -> Appointment {
        let id = Uuid::new_v4();
        let now = Utc::now();
        Appointment {
            id,
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            scheduled_at: request.scheduled_at,
            status: AppointmentStatus::Pending,
            reason: request.reason.clone(),
            details: request.details.clone(),
            fee: request.fee,
            reference_number: reference_number(
                &self.config.reference_prefix,
                request.scheduled_at,
                id,
            ),
            status_note: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition an appointment's status, validating against the state
    /// machine on every attempt. Doctors, staff and admins may apply any
    /// valid transition; a patient may only cancel their own appointment.
    #[instrument(skip(self, actor, note), fields(appointment_id = %id, to = %new_status))]
    pub async fn update_status(
        &self,
        actor: &ActorContext,
        id: Uuid,
        new_status: AppointmentStatus,
        note: Option<String>,
    ) -> Result<Appointment> {
        let current = self.require(id).await?;
        self.authorize_status_change(actor, &current, new_status)?;

        let updated = self
            .retry
            .run("update_status", || {
                let note = note.clone();
                async move {
                    // Re-read inside the attempt so the transition check sees
                    // the freshest state, not the one this call started from.
                    let fresh = self.require(id).await?;
                    validate_transition(fresh.status, new_status)?;
                    match self
                        .repo
                        .update_status(id, fresh.status, new_status, note)
                        .await?
                    {
                        Some(updated) => Ok(updated),
                        None => Err(ClinicError::ConcurrencyConflict(format!(
                            "appointment {id} changed status concurrently"
                        ))),
                    }
                }
            })
            .await?;

        if let Some(note) = &updated.status_note {
            info!(
                appointment_id = %id,
                status = %updated.status,
                note = %self.redactor.redact(note),
                "appointment status updated"
            );
        } else {
            info!(appointment_id = %id, status = %updated.status, "appointment status updated");
        }

        emit(
            self.publisher.as_ref(),
            NotificationEvent::new(
                updated.patient_id,
                NotificationKind::AppointmentStatusChanged,
                "Appointment update",
                format!(
                    "Your appointment {} is now {}.",
                    updated.reference_number, updated.status
                ),
            )
            .about(RelatedEntity::appointment(updated.id)),
        )
        .await;

        Ok(updated)
    }

    fn authorize_status_change(
        &self,
        actor: &ActorContext,
        appointment: &Appointment,
        new_status: AppointmentStatus,
    ) -> Result<()> {
        // A patient cancelling their own appointment is the one carve-out
        // from the staff-side status-update gate.
        if actor.role == Role::Patient {
            if appointment.patient_id == actor.user_id
                && new_status == AppointmentStatus::Cancelled
            {
                return Ok(());
            }
            return Err(ClinicError::AccessDenied {
                role: actor.role.to_string(),
                action: Action::UpdateAppointmentStatus.describe().to_string(),
            });
        }
        actor.authorize(Action::UpdateAppointmentStatus)
    }

    /// Assign a doctor to a single unassigned appointment. Re-assigning the
    /// same doctor is a no-op; changing an existing assignment is not a
    /// remediation concern and is rejected.
    pub async fn assign_doctor(
        &self,
        actor: &ActorContext,
        appointment_id: Uuid,
        doctor_id: Uuid,
    ) -> Result<Appointment> {
        actor.authorize(Action::RunRemediation)?;
        if !self.directory.exists(doctor_id).await? {
            return Err(ClinicError::not_found("doctor", doctor_id));
        }

        let mut appointment = self.require(appointment_id).await?;
        match appointment.doctor_id {
            Some(existing) if existing == doctor_id => Ok(appointment),
            Some(existing) => Err(ClinicError::InvalidState {
                entity: "appointment",
                current: format!("assigned to doctor {existing}"),
                attempted: format!("assign doctor {doctor_id}"),
            }),
            None => {
                appointment.doctor_id = Some(doctor_id);
                appointment.updated_at = Utc::now();
                self.repo.update(&appointment).await
            }
        }
    }

    /// Bulk repair: assign `doctor_id` to every appointment that has none.
    /// The batch is all-or-nothing; if the doctor does not exist, nothing is
    /// modified and the error reports how many records would have been
    /// touched.
    #[instrument(skip(self, actor))]
    pub async fn assign_default_doctor(
        &self,
        actor: &ActorContext,
        doctor_id: Uuid,
    ) -> Result<u64> {
        actor.authorize(Action::RunRemediation)?;

        if !self.directory.exists(doctor_id).await? {
            let pending = self.repo.find_unassigned().await?.len();
            warn!(
                %doctor_id,
                would_affect = pending,
                "default doctor lookup failed; no appointments modified"
            );
            return Err(ClinicError::validation(
                "doctor_id",
                format!(
                    "default doctor {doctor_id} not found; {pending} unassigned appointment(s) left untouched"
                ),
            ));
        }

        let assigned = self.repo.assign_doctor_bulk(doctor_id).await?;
        info!(%doctor_id, assigned, "bulk doctor assignment applied");
        Ok(assigned)
    }

    /// Structured snapshot for the external document renderer.
    pub async fn consultation_snapshot(
        &self,
        actor: &ActorContext,
        appointment_id: Uuid,
    ) -> Result<crate::documents::DocumentSnapshot> {
        let appointment = self.get_appointment(actor, appointment_id).await?;
        Ok(crate::documents::DocumentSnapshot::from_appointment(
            &appointment,
        ))
    }

    /// Fetch a single appointment. Patients see only their own.
    pub async fn get_appointment(&self, actor: &ActorContext, id: Uuid) -> Result<Appointment> {
        let appointment = self.require(id).await?;
        if actor.role == Role::Patient && appointment.patient_id != actor.user_id {
            return Err(ClinicError::not_found("appointment", id));
        }
        Ok(appointment)
    }

    /// Search appointments. A patient's query is pinned to their own records
    /// regardless of the filter they supply.
    pub async fn search(
        &self,
        actor: &ActorContext,
        mut query: AppointmentSearchQuery,
    ) -> Result<Vec<Appointment>> {
        if actor.role == Role::Patient {
            query.patient_id = Some(actor.user_id);
        }
        self.repo.search(&query).await
    }

    async fn require(&self, id: Uuid) -> Result<Appointment> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ClinicError::not_found("appointment", id))
    }
}

fn validate_booking(request: &BookAppointmentRequest) -> Result<()> {
    if request.reason.trim().is_empty() {
        return Err(ClinicError::validation("reason", "reason must not be empty"));
    }
    if request.fee < Decimal::ZERO {
        return Err(ClinicError::validation("fee", "fee must not be negative"));
    }
    Ok(())
}
