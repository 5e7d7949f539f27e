use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// When a schedule applies: every week on a given day, or one specific date.
/// A one-off date overrides any weekly declaration for matching purposes by
/// construction — a schedule carries exactly one of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Recurrence {
    Weekly(Weekday),
    OneOff(NaiveDate),
}

impl Recurrence {
    pub fn matches_date(&self, date: NaiveDate) -> bool {
        match self {
            Recurrence::Weekly(weekday) => date.weekday() == *weekday,
            Recurrence::OneOff(day) => date == *day,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A doctor's declared availability window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub recurrence: Recurrence,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
    pub approval: ApprovalStatus,
    pub max_appointments: u32,
    pub notes: Option<String>,
    pub rejection_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    /// Approved and flagged available — the only state that yields capacity
    pub fn is_bookable(&self) -> bool {
        self.is_available && self.approval == ApprovalStatus::Approved
    }

    pub fn matches_date(&self, date: NaiveDate) -> bool {
        self.recurrence.matches_date(date)
    }

    /// Half-open window: start inclusive, end exclusive
    pub fn covers_time(&self, time: NaiveTime) -> bool {
        self.start_time <= time && time < self.end_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleRequest {
    pub doctor_id: Uuid,
    pub recurrence: Recurrence,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_appointments: u32,
    pub notes: Option<String>,
}

/// Full overwrite of a schedule's mutable fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateScheduleRequest {
    pub recurrence: Recurrence,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
    pub max_appointments: u32,
    pub notes: Option<String>,
    pub rejection_note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleFilter {
    /// Matches weekly schedules on this day; one-off schedules never match
    pub weekday: Option<Weekday>,
    pub approval: Option<ApprovalStatus>,
    pub is_available: Option<bool>,
}

impl ScheduleFilter {
    pub fn accepts(&self, schedule: &Schedule) -> bool {
        if let Some(weekday) = self.weekday {
            match schedule.recurrence {
                Recurrence::Weekly(w) if w == weekday => {}
                _ => return false,
            }
        }
        if let Some(approval) = self.approval {
            if schedule.approval != approval {
                return false;
            }
        }
        if let Some(available) = self.is_available {
            if schedule.is_available != available {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(recurrence: Recurrence) -> Schedule {
        Schedule {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            recurrence,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            is_available: true,
            approval: ApprovalStatus::Approved,
            max_appointments: 2,
            notes: None,
            rejection_note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn weekly_recurrence_matches_every_monday() {
        let s = schedule(Recurrence::Weekly(Weekday::Mon));
        // 2026-09-07 and 2026-09-14 are Mondays
        assert!(s.matches_date(NaiveDate::from_ymd_opt(2026, 9, 7).unwrap()));
        assert!(s.matches_date(NaiveDate::from_ymd_opt(2026, 9, 14).unwrap()));
        assert!(!s.matches_date(NaiveDate::from_ymd_opt(2026, 9, 8).unwrap()));
    }

    #[test]
    fn one_off_recurrence_matches_only_its_date() {
        let day = NaiveDate::from_ymd_opt(2026, 9, 7).unwrap();
        let s = schedule(Recurrence::OneOff(day));
        assert!(s.matches_date(day));
        // same weekday, different week
        assert!(!s.matches_date(NaiveDate::from_ymd_opt(2026, 9, 14).unwrap()));
    }

    #[test]
    fn time_window_is_half_open() {
        let s = schedule(Recurrence::Weekly(Weekday::Mon));
        assert!(s.covers_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap()));
        assert!(s.covers_time(NaiveTime::from_hms_opt(9, 59, 0).unwrap()));
        assert!(!s.covers_time(NaiveTime::from_hms_opt(10, 0, 0).unwrap()));
        assert!(!s.covers_time(NaiveTime::from_hms_opt(8, 59, 0).unwrap()));
    }

    #[test]
    fn unapproved_or_unavailable_is_never_bookable() {
        let mut s = schedule(Recurrence::Weekly(Weekday::Mon));
        assert!(s.is_bookable());
        s.approval = ApprovalStatus::Pending;
        assert!(!s.is_bookable());
        s.approval = ApprovalStatus::Approved;
        s.is_available = false;
        assert!(!s.is_bookable());
    }

    #[test]
    fn weekday_filter_never_matches_one_off_schedules() {
        let day = NaiveDate::from_ymd_opt(2026, 9, 7).unwrap(); // a Monday
        let one_off = schedule(Recurrence::OneOff(day));
        let filter = ScheduleFilter {
            weekday: Some(Weekday::Mon),
            ..Default::default()
        };
        assert!(!filter.accepts(&one_off));
        assert!(filter.accepts(&schedule(Recurrence::Weekly(Weekday::Mon))));
    }
}
