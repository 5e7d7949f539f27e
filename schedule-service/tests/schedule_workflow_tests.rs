//! Schedule store workflow tests against the in-memory repository

use chrono::{NaiveDate, NaiveTime, Weekday};
use error_common::ClinicError;
use identity_context::ActorContext;
use schedule_service::{
    ApprovalStatus, CreateScheduleRequest, InMemoryScheduleRepository, Recurrence, ScheduleFilter,
    ScheduleService, UpdateScheduleRequest,
};
use std::sync::Arc;
use uuid::Uuid;

fn service() -> ScheduleService {
    ScheduleService::new(Arc::new(InMemoryScheduleRepository::new()))
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

fn weekly_request(doctor_id: Uuid, weekday: Weekday) -> CreateScheduleRequest {
    CreateScheduleRequest {
        doctor_id,
        recurrence: Recurrence::Weekly(weekday),
        start_time: hm(9, 0),
        end_time: hm(12, 0),
        max_appointments: 4,
        notes: None,
    }
}

#[tokio::test]
async fn created_schedule_starts_pending() {
    let service = service();
    let doctor_id = Uuid::new_v4();
    let ctx = ActorContext::doctor(doctor_id);

    let schedule = service
        .create_schedule(&ctx, weekly_request(doctor_id, Weekday::Mon))
        .await
        .unwrap();

    assert_eq!(schedule.approval, ApprovalStatus::Pending);
    assert!(schedule.is_available);
    assert!(!schedule.is_bookable());
}

#[tokio::test]
async fn rejects_inverted_time_window() {
    let service = service();
    let doctor_id = Uuid::new_v4();
    let ctx = ActorContext::doctor(doctor_id);

    let mut request = weekly_request(doctor_id, Weekday::Mon);
    request.start_time = hm(12, 0);
    request.end_time = hm(9, 0);

    let err = service.create_schedule(&ctx, request).await.unwrap_err();
    assert!(matches!(err, ClinicError::Validation { ref field, .. } if field == "end_time"));
}

#[tokio::test]
async fn rejects_zero_capacity() {
    let service = service();
    let doctor_id = Uuid::new_v4();
    let ctx = ActorContext::doctor(doctor_id);

    let mut request = weekly_request(doctor_id, Weekday::Mon);
    request.max_appointments = 0;

    let err = service.create_schedule(&ctx, request).await.unwrap_err();
    assert!(
        matches!(err, ClinicError::Validation { ref field, .. } if field == "max_appointments")
    );
}

#[tokio::test]
async fn doctors_cannot_declare_for_colleagues() {
    let service = service();
    let ctx = ActorContext::doctor(Uuid::new_v4());

    let err = service
        .create_schedule(&ctx, weekly_request(Uuid::new_v4(), Weekday::Tue))
        .await
        .unwrap_err();
    assert!(matches!(err, ClinicError::AccessDenied { .. }));
}

#[tokio::test]
async fn approval_is_idempotent() {
    let service = service();
    let doctor_id = Uuid::new_v4();
    let doctor = ActorContext::doctor(doctor_id);
    let staff = ActorContext::staff(Uuid::new_v4());

    let schedule = service
        .create_schedule(&doctor, weekly_request(doctor_id, Weekday::Mon))
        .await
        .unwrap();

    let first = service.approve_schedule(&staff, schedule.id).await.unwrap();
    let second = service.approve_schedule(&staff, schedule.id).await.unwrap();

    assert_eq!(first.approval, ApprovalStatus::Approved);
    assert_eq!(second.approval, ApprovalStatus::Approved);
    assert_eq!(first.updated_at, second.updated_at);
    assert!(second.is_bookable());
}

#[tokio::test]
async fn patients_cannot_approve() {
    let service = service();
    let doctor_id = Uuid::new_v4();
    let doctor = ActorContext::doctor(doctor_id);

    let schedule = service
        .create_schedule(&doctor, weekly_request(doctor_id, Weekday::Mon))
        .await
        .unwrap();

    let err = service
        .approve_schedule(&ActorContext::patient(Uuid::new_v4()), schedule.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ClinicError::AccessDenied { .. }));
}

#[tokio::test]
async fn edit_overwrites_mutable_fields() {
    let service = service();
    let doctor_id = Uuid::new_v4();
    let doctor = ActorContext::doctor(doctor_id);
    let staff = ActorContext::staff(Uuid::new_v4());

    let schedule = service
        .create_schedule(&doctor, weekly_request(doctor_id, Weekday::Mon))
        .await
        .unwrap();

    let one_off = NaiveDate::from_ymd_opt(2026, 10, 5).unwrap();
    let updated = service
        .edit_schedule(
            &staff,
            schedule.id,
            UpdateScheduleRequest {
                recurrence: Recurrence::OneOff(one_off),
                start_time: hm(14, 0),
                end_time: hm(17, 0),
                is_available: false,
                max_appointments: 2,
                notes: Some("afternoon cover".to_string()),
                rejection_note: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.recurrence, Recurrence::OneOff(one_off));
    assert_eq!(updated.max_appointments, 2);
    assert!(!updated.is_available);
}

#[tokio::test]
async fn edit_of_missing_schedule_is_not_found() {
    let service = service();
    let staff = ActorContext::staff(Uuid::new_v4());

    let err = service
        .edit_schedule(
            &staff,
            Uuid::new_v4(),
            UpdateScheduleRequest {
                recurrence: Recurrence::Weekly(Weekday::Fri),
                start_time: hm(9, 0),
                end_time: hm(10, 0),
                is_available: true,
                max_appointments: 1,
                notes: None,
                rejection_note: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClinicError::NotFound { entity: "schedule", .. }));
}

#[tokio::test]
async fn delete_removes_the_schedule() {
    let service = service();
    let doctor_id = Uuid::new_v4();
    let doctor = ActorContext::doctor(doctor_id);
    let staff = ActorContext::staff(Uuid::new_v4());

    let schedule = service
        .create_schedule(&doctor, weekly_request(doctor_id, Weekday::Wed))
        .await
        .unwrap();

    service.delete_schedule(&staff, schedule.id).await.unwrap();

    let err = service.get_schedule(schedule.id).await.unwrap_err();
    assert!(matches!(err, ClinicError::NotFound { .. }));
}

#[tokio::test]
async fn filters_by_weekday_approval_and_availability() {
    let service = service();
    let doctor_id = Uuid::new_v4();
    let doctor = ActorContext::doctor(doctor_id);
    let staff = ActorContext::staff(Uuid::new_v4());

    let monday = service
        .create_schedule(&doctor, weekly_request(doctor_id, Weekday::Mon))
        .await
        .unwrap();
    service
        .create_schedule(&doctor, weekly_request(doctor_id, Weekday::Tue))
        .await
        .unwrap();
    service.approve_schedule(&staff, monday.id).await.unwrap();

    let approved_mondays = service
        .schedules_for_doctor(
            doctor_id,
            &ScheduleFilter {
                weekday: Some(Weekday::Mon),
                approval: Some(ApprovalStatus::Approved),
                is_available: Some(true),
            },
        )
        .await
        .unwrap();
    assert_eq!(approved_mondays.len(), 1);
    assert_eq!(approved_mondays[0].id, monday.id);

    let pending = service
        .schedules_for_doctor(
            doctor_id,
            &ScheduleFilter {
                approval: Some(ApprovalStatus::Pending),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
}
