use crate::models::{Schedule, ScheduleFilter};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use dashmap::DashMap;
use error_common::Result;
use std::sync::Arc;
use uuid::Uuid;

pub mod postgres;

/// Storage interface for doctor schedules
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn create(&self, schedule: &Schedule) -> Result<Schedule>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Schedule>>;

    /// Full-row overwrite
    async fn update(&self, schedule: &Schedule) -> Result<Schedule>;

    async fn delete(&self, id: Uuid) -> Result<()>;

    async fn list_for_doctor(&self, doctor_id: Uuid, filter: &ScheduleFilter)
        -> Result<Vec<Schedule>>;

    /// Schedules for a doctor that apply on `date` and cover `time`
    async fn find_matching(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Vec<Schedule>>;
}

/// In-memory schedule repository for tests and development
pub struct InMemoryScheduleRepository {
    schedules: Arc<DashMap<Uuid, Schedule>>,
}

impl InMemoryScheduleRepository {
    pub fn new() -> Self {
        Self {
            schedules: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemoryScheduleRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScheduleRepository for InMemoryScheduleRepository {
    async fn create(&self, schedule: &Schedule) -> Result<Schedule> {
        self.schedules.insert(schedule.id, schedule.clone());
        Ok(schedule.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Schedule>> {
        Ok(self.schedules.get(&id).map(|entry| entry.value().clone()))
    }

    async fn update(&self, schedule: &Schedule) -> Result<Schedule> {
        self.schedules.insert(schedule.id, schedule.clone());
        Ok(schedule.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.schedules.remove(&id);
        Ok(())
    }

    async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        filter: &ScheduleFilter,
    ) -> Result<Vec<Schedule>> {
        Ok(self
            .schedules
            .iter()
            .filter(|entry| entry.value().doctor_id == doctor_id)
            .filter(|entry| filter.accepts(entry.value()))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn find_matching(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Vec<Schedule>> {
        Ok(self
            .schedules
            .iter()
            .filter(|entry| {
                let s = entry.value();
                s.doctor_id == doctor_id && s.matches_date(date) && s.covers_time(time)
            })
            .map(|entry| entry.value().clone())
            .collect())
    }
}
