//! Record-access request workflow tests against the in-memory repositories

use chrono::{Duration, Utc};
use error_common::ClinicError;
use events_bus::{InMemoryPublisher, NotificationKind};
use identity_context::ActorContext;
use records_service::{
    InMemoryFileStore, InMemoryLabResultRepository, InMemoryRecordRequestRepository, NewLabResult,
    RecordService, RecordType, RequestStatus, SubmitRecordRequest,
};
use std::sync::Arc;
use uuid::Uuid;

struct Harness {
    publisher: Arc<InMemoryPublisher>,
    service: RecordService,
}

fn harness() -> Harness {
    let publisher = Arc::new(InMemoryPublisher::new());
    let service = RecordService::new(
        Arc::new(InMemoryRecordRequestRepository::new()),
        Arc::new(InMemoryLabResultRepository::new()),
        Arc::new(InMemoryFileStore::new()),
        publisher.clone(),
    );
    Harness { publisher, service }
}

fn submission(patient_id: Uuid, record_id: Uuid) -> SubmitRecordRequest {
    SubmitRecordRequest {
        patient_id,
        record_type: RecordType::LabRecord,
        record_id,
        reason: "sharing results with an external consultant".into(),
    }
}

#[tokio::test]
async fn submitted_request_starts_pending() {
    let h = harness();
    let patient_id = Uuid::new_v4();

    let request = h
        .service
        .submit_request(
            &ActorContext::patient(patient_id),
            submission(patient_id, Uuid::new_v4()),
        )
        .await
        .unwrap();

    assert_eq!(request.status, RequestStatus::Pending);
    assert!(request.reviewed_by.is_none());
    assert!(!request.is_access_currently_valid(Utc::now()));
}

#[tokio::test]
async fn only_the_patient_themselves_may_submit() {
    let h = harness();
    let patient_id = Uuid::new_v4();

    let err = h
        .service
        .submit_request(
            &ActorContext::patient(Uuid::new_v4()),
            submission(patient_id, Uuid::new_v4()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClinicError::AccessDenied { .. }));

    let err = h
        .service
        .submit_request(
            &ActorContext::staff(Uuid::new_v4()),
            submission(patient_id, Uuid::new_v4()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClinicError::AccessDenied { .. }));
}

#[tokio::test]
async fn denial_then_any_second_decision_fails() {
    let h = harness();
    let patient_id = Uuid::new_v4();
    let staff = ActorContext::staff(Uuid::new_v4());

    let request = h
        .service
        .submit_request(
            &ActorContext::patient(patient_id),
            submission(patient_id, Uuid::new_v4()),
        )
        .await
        .unwrap();

    let denied = h
        .service
        .deny_request(&staff, request.id, "insufficient justification".into())
        .await
        .unwrap();
    assert_eq!(denied.status, RequestStatus::Denied);
    assert_eq!(
        denied.denial_reason.as_deref(),
        Some("insufficient justification")
    );
    assert!(!denied.is_access_currently_valid(Utc::now()));

    let err = h
        .service
        .deny_request(&staff, request.id, "still no".into())
        .await
        .unwrap_err();
    assert!(matches!(err, ClinicError::InvalidState { .. }));

    let err = h
        .service
        .approve_request(&staff, request.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClinicError::InvalidState { .. }));
}

#[tokio::test]
async fn empty_denial_reason_leaves_request_pending() {
    let h = harness();
    let patient_id = Uuid::new_v4();
    let staff = ActorContext::staff(Uuid::new_v4());

    let request = h
        .service
        .submit_request(
            &ActorContext::patient(patient_id),
            submission(patient_id, Uuid::new_v4()),
        )
        .await
        .unwrap();

    let err = h
        .service
        .deny_request(&staff, request.id, "   ".into())
        .await
        .unwrap_err();
    assert!(matches!(err, ClinicError::Validation { ref field, .. } if field == "reason"));

    let unchanged = h.service.get_request(&staff, request.id).await.unwrap();
    assert_eq!(unchanged.status, RequestStatus::Pending);
}

#[tokio::test]
async fn approval_stamps_reviewer_and_respects_expiry() {
    let h = harness();
    let patient_id = Uuid::new_v4();
    let reviewer_id = Uuid::new_v4();
    let staff = ActorContext::staff(reviewer_id);

    let request = h
        .service
        .submit_request(
            &ActorContext::patient(patient_id),
            submission(patient_id, Uuid::new_v4()),
        )
        .await
        .unwrap();

    let expires = Utc::now() + Duration::hours(24);
    let approved = h
        .service
        .approve_request(&staff, request.id, Some(expires))
        .await
        .unwrap();

    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.reviewed_by, Some(reviewer_id));
    assert!(approved.decided_at.is_some());
    assert!(approved.is_access_currently_valid(Utc::now()));
    assert!(!approved.is_access_currently_valid(expires + Duration::seconds(1)));
}

#[tokio::test]
async fn decisions_are_gated_to_staff_and_admins() {
    let h = harness();
    let patient_id = Uuid::new_v4();

    let request = h
        .service
        .submit_request(
            &ActorContext::patient(patient_id),
            submission(patient_id, Uuid::new_v4()),
        )
        .await
        .unwrap();

    for actor in [
        ActorContext::patient(patient_id),
        ActorContext::doctor(Uuid::new_v4()),
    ] {
        let err = h
            .service
            .approve_request(&actor, request.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::AccessDenied { .. }));
    }
}

#[tokio::test]
async fn decisions_notify_the_requesting_patient() {
    let h = harness();
    let patient_id = Uuid::new_v4();
    let staff = ActorContext::staff(Uuid::new_v4());

    let first = h
        .service
        .submit_request(
            &ActorContext::patient(patient_id),
            submission(patient_id, Uuid::new_v4()),
        )
        .await
        .unwrap();
    let second = h
        .service
        .submit_request(
            &ActorContext::patient(patient_id),
            submission(patient_id, Uuid::new_v4()),
        )
        .await
        .unwrap();

    h.service.approve_request(&staff, first.id, None).await.unwrap();
    h.service
        .deny_request(&staff, second.id, "duplicate request".into())
        .await
        .unwrap();

    let events = h.publisher.published().await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, NotificationKind::RecordRequestApproved);
    assert_eq!(events[1].kind, NotificationKind::RecordRequestDenied);
    assert!(events.iter().all(|e| e.recipient_id == patient_id));
}

#[tokio::test]
async fn patients_see_only_their_own_requests() {
    let h = harness();
    let patient_a = Uuid::new_v4();
    let patient_b = Uuid::new_v4();

    let request = h
        .service
        .submit_request(
            &ActorContext::patient(patient_a),
            submission(patient_a, Uuid::new_v4()),
        )
        .await
        .unwrap();

    let err = h
        .service
        .get_request(&ActorContext::patient(patient_b), request.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ClinicError::NotFound { .. }));

    let err = h
        .service
        .requests_for_patient(&ActorContext::patient(patient_b), patient_a)
        .await
        .unwrap_err();
    assert!(matches!(err, ClinicError::AccessDenied { .. }));

    let own = h
        .service
        .requests_for_patient(&ActorContext::patient(patient_a), patient_a)
        .await
        .unwrap();
    assert_eq!(own.len(), 1);
}

#[tokio::test]
async fn approved_request_unlocks_the_lab_attachment_until_expiry() {
    let h = harness();
    let patient_id = Uuid::new_v4();
    let doctor = ActorContext::doctor(Uuid::new_v4());
    let staff = ActorContext::staff(Uuid::new_v4());
    let patient = ActorContext::patient(patient_id);

    let lab_result = h
        .service
        .record_lab_result(
            &doctor,
            NewLabResult {
                patient_id,
                test_name: "full blood count".into(),
                result_summary: "within reference ranges".into(),
                attachment: Some(b"%PDF-1.7 report".to_vec()),
            },
        )
        .await
        .unwrap();
    assert!(lab_result.attachment_key.is_some());

    // without an approved request the patient is refused
    let err = h
        .service
        .open_lab_attachment(&patient, lab_result.id, None, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, ClinicError::AccessDenied { .. }));

    let request = h
        .service
        .submit_request(&patient, submission(patient_id, lab_result.id))
        .await
        .unwrap();

    // still pending: no access
    let err = h
        .service
        .open_lab_attachment(&patient, lab_result.id, Some(request.id), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, ClinicError::AccessDenied { .. }));

    let expires = Utc::now() + Duration::hours(1);
    h.service
        .approve_request(&staff, request.id, Some(expires))
        .await
        .unwrap();

    let bytes = h
        .service
        .open_lab_attachment(&patient, lab_result.id, Some(request.id), Utc::now())
        .await
        .unwrap();
    assert_eq!(bytes, b"%PDF-1.7 report");

    // past expiry the same request no longer grants access
    let err = h
        .service
        .open_lab_attachment(
            &patient,
            lab_result.id,
            Some(request.id),
            expires + Duration::minutes(1),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClinicError::AccessDenied { .. }));

    // staff never needed a request
    h.service
        .open_lab_attachment(&staff, lab_result.id, None, Utc::now())
        .await
        .unwrap();
}

#[tokio::test]
async fn lab_results_are_recorded_by_clinical_roles_only() {
    let h = harness();
    let patient_id = Uuid::new_v4();

    let err = h
        .service
        .record_lab_result(
            &ActorContext::patient(patient_id),
            NewLabResult {
                patient_id,
                test_name: "lipid panel".into(),
                result_summary: "pending".into(),
                attachment: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClinicError::AccessDenied { .. }));
}
