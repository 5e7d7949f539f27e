// Slot availability calculation
use crate::models::Schedule;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use error_common::Result;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Seam to the appointment store: how many non-cancelled appointments a
/// doctor already has on a date within a time window. Appointments are
/// matched to schedules by recomputing this overlap, not by a stored
/// schedule reference.
#[async_trait]
pub trait BookedSlotSource: Send + Sync {
    async fn booked_count(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<u32>;
}

/// Derives the currently bookable slot count for a schedule on a date.
///
/// This is the read-only display arithmetic; the count it returns can be
/// stale by the time a booking lands. The booking path performs its own
/// atomic count-and-insert and does not rely on this value.
pub struct AvailabilityCalculator {
    booked: Arc<dyn BookedSlotSource>,
}

impl AvailabilityCalculator {
    pub fn new(booked: Arc<dyn BookedSlotSource>) -> Self {
        Self { booked }
    }

    /// `max(0, capacity - booked)`; zero whenever the schedule is
    /// unapproved, flagged unavailable, or does not apply on `on_date`.
    pub async fn available_slot_count(
        &self,
        schedule: &Schedule,
        on_date: NaiveDate,
    ) -> Result<u32> {
        if !schedule.is_bookable() || !schedule.matches_date(on_date) {
            return Ok(0);
        }

        let booked = self
            .booked
            .booked_count(
                schedule.doctor_id,
                on_date,
                schedule.start_time,
                schedule.end_time,
            )
            .await?;

        let available = schedule.max_appointments.saturating_sub(booked);
        debug!(
            schedule_id = %schedule.id,
            %on_date,
            booked,
            available,
            "computed slot availability"
        );
        Ok(available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApprovalStatus, Recurrence};
    use chrono::{Utc, Weekday};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedBookedSource(AtomicU32);

    #[async_trait]
    impl BookedSlotSource for FixedBookedSource {
        async fn booked_count(
            &self,
            _doctor_id: Uuid,
            _date: NaiveDate,
            _start: NaiveTime,
            _end: NaiveTime,
        ) -> Result<u32> {
            Ok(self.0.load(Ordering::SeqCst))
        }
    }

    fn monday_schedule(max_appointments: u32) -> Schedule {
        Schedule {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            recurrence: Recurrence::Weekly(Weekday::Mon),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            is_available: true,
            approval: ApprovalStatus::Approved,
            max_appointments,
            notes: None,
            rejection_note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn a_monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, 7).unwrap()
    }

    #[tokio::test]
    async fn subtracts_booked_from_capacity() {
        let calc = AvailabilityCalculator::new(Arc::new(FixedBookedSource(AtomicU32::new(1))));
        let count = calc
            .available_slot_count(&monday_schedule(3), a_monday())
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn overbooked_schedule_reports_zero_not_negative() {
        let calc = AvailabilityCalculator::new(Arc::new(FixedBookedSource(AtomicU32::new(5))));
        let count = calc
            .available_slot_count(&monday_schedule(3), a_monday())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn pending_approval_yields_zero_regardless_of_arithmetic() {
        let calc = AvailabilityCalculator::new(Arc::new(FixedBookedSource(AtomicU32::new(0))));
        let mut schedule = monday_schedule(3);
        schedule.approval = ApprovalStatus::Pending;
        let count = calc
            .available_slot_count(&schedule, a_monday())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn unavailable_flag_yields_zero_even_when_approved() {
        let calc = AvailabilityCalculator::new(Arc::new(FixedBookedSource(AtomicU32::new(0))));
        let mut schedule = monday_schedule(3);
        schedule.is_available = false;
        let count = calc
            .available_slot_count(&schedule, a_monday())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn non_matching_date_yields_zero() {
        let calc = AvailabilityCalculator::new(Arc::new(FixedBookedSource(AtomicU32::new(0))));
        let tuesday = NaiveDate::from_ymd_opt(2026, 9, 8).unwrap();
        let count = calc
            .available_slot_count(&monday_schedule(3), tuesday)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
