use crate::models::{Appointment, AppointmentSearchQuery, AppointmentStatus, SlotWindow};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use dashmap::DashSet;
use error_common::{ClinicError, Result};
use schedule_service::BookedSlotSource;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub mod postgres;

/// Storage interface for appointments
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Insert `appointment` only while fewer than `capacity` non-cancelled
    /// appointments occupy the same doctor's window. The count and the
    /// insert are one atomic step; `false` means the slot was full.
    async fn insert_if_capacity(
        &self,
        appointment: &Appointment,
        window: SlotWindow,
        capacity: u32,
    ) -> Result<bool>;

    /// Unconstrained insert, for intake paths with no assigned doctor
    async fn insert(&self, appointment: &Appointment) -> Result<Appointment>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>>;

    /// Compare-and-set on status: applies `new_status` (and the note) only
    /// if the stored status still equals `expected`. `Ok(None)` reports a
    /// lost race; the caller re-reads and re-validates before retrying.
    async fn update_status(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        new_status: AppointmentStatus,
        note: Option<String>,
    ) -> Result<Option<Appointment>>;

    async fn update(&self, appointment: &Appointment) -> Result<Appointment>;

    /// Non-cancelled appointments for the doctor inside the window
    async fn count_in_window(&self, doctor_id: Uuid, window: SlotWindow) -> Result<u32>;

    async fn search(&self, query: &AppointmentSearchQuery) -> Result<Vec<Appointment>>;

    async fn find_unassigned(&self) -> Result<Vec<Appointment>>;

    /// Assign `doctor_id` to every unassigned appointment, all-or-nothing.
    /// Returns how many rows changed.
    async fn assign_doctor_bulk(&self, doctor_id: Uuid) -> Result<u64>;
}

/// Lookup for doctors known to the clinic; the appointment core only needs
/// existence checks, the full profile lives elsewhere.
#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn exists(&self, doctor_id: Uuid) -> Result<bool>;
}

pub struct InMemoryDoctorDirectory {
    doctors: DashSet<Uuid>,
}

impl InMemoryDoctorDirectory {
    pub fn new() -> Self {
        Self {
            doctors: DashSet::new(),
        }
    }

    pub fn register(&self, doctor_id: Uuid) {
        self.doctors.insert(doctor_id);
    }
}

impl Default for InMemoryDoctorDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DoctorDirectory for InMemoryDoctorDirectory {
    async fn exists(&self, doctor_id: Uuid) -> Result<bool> {
        Ok(self.doctors.contains(&doctor_id))
    }
}

fn occupies_window(
    appointment: &Appointment,
    doctor_id: Uuid,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> bool {
    appointment.consumes_slot()
        && appointment.doctor_id == Some(doctor_id)
        && appointment.date() == date
        && start <= appointment.time()
        && appointment.time() < end
}

/// In-memory appointment store for tests and development.
///
/// One lock over the whole map serializes the count-and-insert, giving the
/// same atomicity the Postgres store gets from its guarded insert.
pub struct InMemoryAppointmentRepository {
    appointments: Arc<Mutex<HashMap<Uuid, Appointment>>>,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self {
            appointments: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryAppointmentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn insert_if_capacity(
        &self,
        appointment: &Appointment,
        window: SlotWindow,
        capacity: u32,
    ) -> Result<bool> {
        let doctor_id = appointment.doctor_id.ok_or_else(|| {
            ClinicError::validation("doctor_id", "capacity-checked insert requires a doctor")
        })?;

        let mut map = self.appointments.lock().await;
        let booked = map
            .values()
            .filter(|a| occupies_window(a, doctor_id, window.date, window.start, window.end))
            .count() as u32;

        if booked >= capacity {
            return Ok(false);
        }
        map.insert(appointment.id, appointment.clone());
        Ok(true)
    }

    async fn insert(&self, appointment: &Appointment) -> Result<Appointment> {
        self.appointments
            .lock()
            .await
            .insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>> {
        Ok(self.appointments.lock().await.get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        new_status: AppointmentStatus,
        note: Option<String>,
    ) -> Result<Option<Appointment>> {
        let mut map = self.appointments.lock().await;
        let appointment = map
            .get_mut(&id)
            .ok_or_else(|| ClinicError::not_found("appointment", id))?;

        if appointment.status != expected {
            return Ok(None);
        }

        appointment.status = new_status;
        appointment.status_note = note;
        appointment.updated_at = Utc::now();
        Ok(Some(appointment.clone()))
    }

    async fn update(&self, appointment: &Appointment) -> Result<Appointment> {
        let mut map = self.appointments.lock().await;
        if !map.contains_key(&appointment.id) {
            return Err(ClinicError::not_found("appointment", appointment.id));
        }
        map.insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }

    async fn count_in_window(&self, doctor_id: Uuid, window: SlotWindow) -> Result<u32> {
        let map = self.appointments.lock().await;
        Ok(map
            .values()
            .filter(|a| occupies_window(a, doctor_id, window.date, window.start, window.end))
            .count() as u32)
    }

    async fn search(&self, query: &AppointmentSearchQuery) -> Result<Vec<Appointment>> {
        let map = self.appointments.lock().await;
        let mut matches: Vec<Appointment> = map
            .values()
            .filter(|a| query.accepts(a))
            .cloned()
            .collect();
        matches.sort_by_key(|a| a.scheduled_at);
        if let Some(limit) = query.limit {
            matches.truncate(limit);
        }
        Ok(matches)
    }

    async fn find_unassigned(&self) -> Result<Vec<Appointment>> {
        let map = self.appointments.lock().await;
        Ok(map
            .values()
            .filter(|a| a.doctor_id.is_none())
            .cloned()
            .collect())
    }

    async fn assign_doctor_bulk(&self, doctor_id: Uuid) -> Result<u64> {
        // The single map lock makes the batch atomic by construction.
        let mut map = self.appointments.lock().await;
        let mut changed = 0u64;
        for appointment in map.values_mut() {
            if appointment.doctor_id.is_none() {
                appointment.doctor_id = Some(doctor_id);
                appointment.updated_at = Utc::now();
                changed += 1;
            }
        }
        Ok(changed)
    }
}

/// Adapts the appointment store to the schedule service's availability seam.
pub struct AppointmentSlotSource {
    repo: Arc<dyn AppointmentRepository>,
}

impl AppointmentSlotSource {
    pub fn new(repo: Arc<dyn AppointmentRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl BookedSlotSource for AppointmentSlotSource {
    async fn booked_count(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<u32> {
        self.repo
            .count_in_window(doctor_id, SlotWindow { date, start, end })
            .await
    }
}
