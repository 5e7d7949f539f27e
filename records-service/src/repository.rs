use crate::models::{LabResult, RecordRequest, RequestDecision, RequestStatus};
use async_trait::async_trait;
use dashmap::DashMap;
use error_common::{ClinicError, Result};
use uuid::Uuid;

pub mod postgres;

/// Storage interface for record-access requests
#[async_trait]
pub trait RecordRequestRepository: Send + Sync {
    async fn insert(&self, request: &RecordRequest) -> Result<RecordRequest>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RecordRequest>>;

    /// Apply `decision` only while the request is still `Pending`.
    /// `Ok(None)` means the request was already decided.
    async fn decide(&self, id: Uuid, decision: &RequestDecision)
        -> Result<Option<RecordRequest>>;

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<RecordRequest>>;
}

/// Storage interface for lab results
#[async_trait]
pub trait LabResultRepository: Send + Sync {
    async fn insert(&self, result: &LabResult) -> Result<LabResult>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LabResult>>;

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<LabResult>>;
}

/// In-memory request repository for tests and development
pub struct InMemoryRecordRequestRepository {
    requests: DashMap<Uuid, RecordRequest>,
}

impl InMemoryRecordRequestRepository {
    pub fn new() -> Self {
        Self {
            requests: DashMap::new(),
        }
    }
}

impl Default for InMemoryRecordRequestRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordRequestRepository for InMemoryRecordRequestRepository {
    async fn insert(&self, request: &RecordRequest) -> Result<RecordRequest> {
        self.requests.insert(request.id, request.clone());
        Ok(request.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RecordRequest>> {
        Ok(self.requests.get(&id).map(|entry| entry.value().clone()))
    }

    async fn decide(
        &self,
        id: Uuid,
        decision: &RequestDecision,
    ) -> Result<Option<RecordRequest>> {
        // get_mut holds the shard lock, making the check-and-set atomic.
        let mut entry = self
            .requests
            .get_mut(&id)
            .ok_or_else(|| ClinicError::not_found("record request", id))?;

        if entry.status != RequestStatus::Pending {
            return Ok(None);
        }
        entry.status = decision.status;
        entry.reviewed_by = Some(decision.reviewed_by);
        entry.decided_at = Some(decision.decided_at);
        entry.denial_reason = decision.denial_reason.clone();
        entry.expires_at = decision.expires_at;
        Ok(Some(entry.clone()))
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<RecordRequest>> {
        let mut requests: Vec<RecordRequest> = self
            .requests
            .iter()
            .filter(|entry| entry.value().patient_id == patient_id)
            .map(|entry| entry.value().clone())
            .collect();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }
}

/// In-memory lab-result repository for tests and development
pub struct InMemoryLabResultRepository {
    results: DashMap<Uuid, LabResult>,
}

impl InMemoryLabResultRepository {
    pub fn new() -> Self {
        Self {
            results: DashMap::new(),
        }
    }
}

impl Default for InMemoryLabResultRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LabResultRepository for InMemoryLabResultRepository {
    async fn insert(&self, result: &LabResult) -> Result<LabResult> {
        self.results.insert(result.id, result.clone());
        Ok(result.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LabResult>> {
        Ok(self.results.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<LabResult>> {
        let mut results: Vec<LabResult> = self
            .results
            .iter()
            .filter(|entry| entry.value().patient_id == patient_id)
            .map(|entry| entry.value().clone())
            .collect();
        results.sort_by_key(|r| r.recorded_at);
        Ok(results)
    }
}
