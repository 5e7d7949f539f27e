use crate::models::{ActorContext, Role};
use error_common::{ClinicError, Result};
use uuid::Uuid;

/// Operations gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateSchedule,
    ApproveSchedule,
    EditSchedule,
    DeleteSchedule,
    BookAppointment,
    UpdateAppointmentStatus,
    RunRemediation,
    SubmitRecordRequest,
    DecideRecordRequest,
    RecordLabResult,
}

impl Action {
    pub fn describe(&self) -> &'static str {
        match self {
            Action::CreateSchedule => "create schedules",
            Action::ApproveSchedule => "approve schedules",
            Action::EditSchedule => "edit schedules",
            Action::DeleteSchedule => "delete schedules",
            Action::BookAppointment => "book appointments",
            Action::UpdateAppointmentStatus => "update appointment status",
            Action::RunRemediation => "run remediation tooling",
            Action::SubmitRecordRequest => "submit record requests",
            Action::DecideRecordRequest => "decide record requests",
            Action::RecordLabResult => "record lab results",
        }
    }

    fn permitted_for(&self, role: Role) -> bool {
        match self {
            Action::CreateSchedule => {
                matches!(role, Role::Doctor | Role::ClinicalStaff | Role::Admin)
            }
            Action::ApproveSchedule | Action::EditSchedule | Action::DeleteSchedule => {
                matches!(role, Role::ClinicalStaff | Role::Admin)
            }
            Action::BookAppointment => true,
            Action::UpdateAppointmentStatus => {
                matches!(role, Role::Doctor | Role::ClinicalStaff | Role::Admin)
            }
            Action::RunRemediation => matches!(role, Role::Admin),
            Action::SubmitRecordRequest => matches!(role, Role::Patient),
            Action::DecideRecordRequest => matches!(role, Role::ClinicalStaff | Role::Admin),
            Action::RecordLabResult => {
                matches!(role, Role::Doctor | Role::ClinicalStaff | Role::Admin)
            }
        }
    }
}

impl ActorContext {
    /// Gate an operation on the actor's role.
    pub fn authorize(&self, action: Action) -> Result<()> {
        if action.permitted_for(self.role) {
            Ok(())
        } else {
            Err(ClinicError::AccessDenied {
                role: self.role.to_string(),
                action: action.describe().to_string(),
            })
        }
    }

    /// Patients may only act on their own records; other roles act on anyone's.
    pub fn require_self_or_staff(&self, owner_id: Uuid, action: Action) -> Result<()> {
        self.authorize(action)?;
        if self.role == Role::Patient && self.user_id != owner_id {
            return Err(ClinicError::AccessDenied {
                role: self.role.to_string(),
                action: format!("{} for another patient", action.describe()),
            });
        }
        Ok(())
    }
}
