//! Record-request workflow and lab-result orchestration
//!
//! A decision lands exactly once: the repository applies it only against a
//! still-pending request, so the second of two racing decisions observes a
//! terminal state and fails with `InvalidState`.

use crate::models::{
    LabResult, NewLabResult, RecordRequest, RequestDecision, RequestStatus, SubmitRecordRequest,
};
use crate::repository::{LabResultRepository, RecordRequestRepository};
use crate::storage::FileStore;
use chrono::{DateTime, Utc};
use error_common::{ClinicError, Result};
use events_bus::{emit, NotificationEvent, NotificationKind, NotificationPublisher, RelatedEntity};
use identity_context::{Action, ActorContext, Role};
use logger_redacted::PhiRedactor;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

pub struct RecordService {
    requests: Arc<dyn RecordRequestRepository>,
    labs: Arc<dyn LabResultRepository>,
    files: Arc<dyn FileStore>,
    publisher: Arc<dyn NotificationPublisher>,
    redactor: PhiRedactor,
}

impl RecordService {
    pub fn new(
        requests: Arc<dyn RecordRequestRepository>,
        labs: Arc<dyn LabResultRepository>,
        files: Arc<dyn FileStore>,
        publisher: Arc<dyn NotificationPublisher>,
    ) -> Self {
        Self {
            requests,
            labs,
            files,
            publisher,
            redactor: PhiRedactor::default(),
        }
    }

    /// Submit a new access request in `Pending` status. Patients submit for
    /// themselves only.
    #[instrument(skip(self, ctx, request), fields(patient_id = %request.patient_id))]
    pub async fn submit_request(
        &self,
        ctx: &ActorContext,
        request: SubmitRecordRequest,
    ) -> Result<RecordRequest> {
        ctx.authorize(Action::SubmitRecordRequest)?;
        if ctx.user_id != request.patient_id {
            return Err(ClinicError::AccessDenied {
                role: ctx.role.to_string(),
                action: "submit record requests for another patient".to_string(),
            });
        }
        if request.reason.trim().is_empty() {
            return Err(ClinicError::validation("reason", "reason must not be empty"));
        }

        let record_request = RecordRequest {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            record_type: request.record_type,
            record_id: request.record_id,
            reason: request.reason,
            status: RequestStatus::Pending,
            reviewed_by: None,
            decided_at: None,
            denial_reason: None,
            expires_at: None,
            created_at: Utc::now(),
        };
        let stored = self.requests.insert(&record_request).await?;

        info!(
            request_id = %stored.id,
            record_type = stored.record_type.as_str(),
            "record-access request submitted"
        );
        Ok(stored)
    }

    /// Approve a pending request, optionally with an expiry after which the
    /// granted access lapses.
    #[instrument(skip(self, ctx), fields(request_id = %request_id))]
    pub async fn approve_request(
        &self,
        ctx: &ActorContext,
        request_id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<RecordRequest> {
        ctx.authorize(Action::DecideRecordRequest)?;

        let decision = RequestDecision::approval(ctx.user_id, expires_at);
        let approved = self.apply_decision(request_id, &decision).await?;

        emit(
            self.publisher.as_ref(),
            NotificationEvent::new(
                approved.patient_id,
                NotificationKind::RecordRequestApproved,
                "Record access approved",
                match approved.expires_at {
                    Some(expires) => format!(
                        "Your record-access request was approved and is valid until {}.",
                        expires.format("%Y-%m-%d %H:%M UTC"),
                    ),
                    None => "Your record-access request was approved.".to_string(),
                },
            )
            .about(RelatedEntity::record_request(approved.id)),
        )
        .await;

        Ok(approved)
    }

    /// Deny a pending request. The reason is mandatory; an empty one leaves
    /// the request untouched at `Pending`.
    #[instrument(skip(self, ctx, reason), fields(request_id = %request_id))]
    pub async fn deny_request(
        &self,
        ctx: &ActorContext,
        request_id: Uuid,
        reason: String,
    ) -> Result<RecordRequest> {
        ctx.authorize(Action::DecideRecordRequest)?;
        if reason.trim().is_empty() {
            return Err(ClinicError::validation(
                "reason",
                "a denial must carry a reason",
            ));
        }

        let decision = RequestDecision::denial(ctx.user_id, reason.clone());
        let denied = self.apply_decision(request_id, &decision).await?;

        info!(
            request_id = %denied.id,
            reason = %self.redactor.redact(&reason),
            "record-access request denied"
        );

        emit(
            self.publisher.as_ref(),
            NotificationEvent::new(
                denied.patient_id,
                NotificationKind::RecordRequestDenied,
                "Record access denied",
                format!("Your record-access request was denied: {reason}"),
            )
            .about(RelatedEntity::record_request(denied.id)),
        )
        .await;

        Ok(denied)
    }

    async fn apply_decision(
        &self,
        request_id: Uuid,
        decision: &RequestDecision,
    ) -> Result<RecordRequest> {
        match self.requests.decide(request_id, decision).await? {
            Some(decided) => Ok(decided),
            None => {
                let current = self.require_request(request_id).await?;
                Err(ClinicError::InvalidState {
                    entity: "record request",
                    current: current.status.to_string(),
                    attempted: format!("mark {}", decision.status),
                })
            }
        }
    }

    /// Fetch a single request. Patients see only their own.
    pub async fn get_request(&self, ctx: &ActorContext, request_id: Uuid) -> Result<RecordRequest> {
        let request = self.require_request(request_id).await?;
        if ctx.role == Role::Patient && request.patient_id != ctx.user_id {
            return Err(ClinicError::not_found("record request", request_id));
        }
        Ok(request)
    }

    pub async fn requests_for_patient(
        &self,
        ctx: &ActorContext,
        patient_id: Uuid,
    ) -> Result<Vec<RecordRequest>> {
        if ctx.role == Role::Patient && ctx.user_id != patient_id {
            return Err(ClinicError::AccessDenied {
                role: ctx.role.to_string(),
                action: "list another patient's record requests".to_string(),
            });
        }
        self.requests.list_for_patient(patient_id).await
    }

    /// Record a lab result, storing any attachment behind the file-store
    /// seam and keeping only the returned key.
    #[instrument(skip(self, ctx, result), fields(patient_id = %result.patient_id))]
    pub async fn record_lab_result(
        &self,
        ctx: &ActorContext,
        result: NewLabResult,
    ) -> Result<LabResult> {
        ctx.authorize(Action::RecordLabResult)?;
        if result.test_name.trim().is_empty() {
            return Err(ClinicError::validation(
                "test_name",
                "test name must not be empty",
            ));
        }

        let attachment_key = match result.attachment {
            Some(bytes) => Some(self.files.put(bytes).await?),
            None => None,
        };

        let lab_result = LabResult {
            id: Uuid::new_v4(),
            patient_id: result.patient_id,
            test_name: result.test_name,
            result_summary: result.result_summary,
            attachment_key,
            recorded_by: ctx.user_id,
            recorded_at: Utc::now(),
        };
        self.labs.insert(&lab_result).await
    }

    /// Open a lab result's attachment. Staff, doctors and admins read
    /// directly; a patient must hold a currently valid approved request for
    /// that lab record.
    pub async fn open_lab_attachment(
        &self,
        ctx: &ActorContext,
        lab_result_id: Uuid,
        via_request: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Vec<u8>> {
        let lab_result = self
            .labs
            .find_by_id(lab_result_id)
            .await?
            .ok_or_else(|| ClinicError::not_found("lab result", lab_result_id))?;

        if ctx.role == Role::Patient {
            self.check_patient_access(ctx, &lab_result, via_request, now)
                .await?;
        }

        let key = lab_result.attachment_key.as_deref().ok_or_else(|| {
            ClinicError::validation("attachment_key", "lab result has no attachment")
        })?;
        self.files
            .get(key)
            .await?
            .ok_or_else(|| ClinicError::External(format!("attachment `{key}` is missing")))
    }

    async fn check_patient_access(
        &self,
        ctx: &ActorContext,
        lab_result: &LabResult,
        via_request: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let denied = || ClinicError::AccessDenied {
            role: ctx.role.to_string(),
            action: "open lab attachments without a valid approved request".to_string(),
        };

        let request_id = via_request.ok_or_else(denied)?;
        let request = self.require_request(request_id).await?;

        let grants_access = request.patient_id == ctx.user_id
            && request.record_id == lab_result.id
            && request.is_access_currently_valid(now);
        if !grants_access {
            return Err(denied());
        }
        Ok(())
    }

    async fn require_request(&self, id: Uuid) -> Result<RecordRequest> {
        self.requests
            .find_by_id(id)
            .await?
            .ok_or_else(|| ClinicError::not_found("record request", id))
    }
}
