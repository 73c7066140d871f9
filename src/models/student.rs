use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::filter::types::{FieldDef, FieldKind};

/// Table / collection name.
pub const STUDENTS: &str = "students";

/// Fields the list route may filter, select and sort on.
pub static STUDENT_FIELDS: &[FieldDef] = &[
    FieldDef::new("id", FieldKind::Text),
    FieldDef::new("studentId", FieldKind::Text),
    FieldDef::new("firstName", FieldKind::Text),
    FieldDef::new("lastName", FieldKind::Text),
    FieldDef::new("email", FieldKind::Text),
    FieldDef::new("course", FieldKind::Text),
    FieldDef::new("enrollmentYear", FieldKind::Integer),
    FieldDef::new("gpa", FieldKind::Number),
    FieldDef::new("status", FieldKind::Text),
    FieldDef::new("phone", FieldKind::Text),
    FieldDef::new("address", FieldKind::Object),
    FieldDef::nested("address.street"),
    FieldDef::nested("address.city"),
    FieldDef::nested("address.state"),
    FieldDef::nested("address.zipCode"),
    FieldDef::nested("address.country"),
    FieldDef::new("emergencyContact", FieldKind::Object),
    FieldDef::nested("emergencyContact.name"),
    FieldDef::nested("emergencyContact.phone"),
    FieldDef::nested("emergencyContact.relation"),
    FieldDef::new("skills", FieldKind::TextList),
    FieldDef::new("notes", FieldKind::Text),
    FieldDef::new("createdAt", FieldKind::Timestamp),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudentStatus {
    #[default]
    Active,
    Graduated,
    Suspended,
    Dropped,
}

impl StudentStatus {
    pub const ALL: [StudentStatus; 4] = [
        StudentStatus::Active,
        StudentStatus::Graduated,
        StudentStatus::Suspended,
        StudentStatus::Dropped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Active => "Active",
            StudentStatus::Graduated => "Graduated",
            StudentStatus::Suspended => "Suspended",
            StudentStatus::Dropped => "Dropped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
}

/// Client-writable part of a student, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentDraft {
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub course: String,
    pub enrollment_year: i32,
    pub gpa: Option<f64>,
    pub status: StudentStatus,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub emergency_contact: Option<EmergencyContact>,
    pub skills: Vec<String>,
    pub notes: Option<String>,
}

/// A stored student record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub course: String,
    pub enrollment_year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpa: Option<f64>,
    #[serde(default)]
    pub status: StudentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Student {
    /// Assign the system fields to a fresh draft. `createdAt` is cut to
    /// microseconds, the precision a `TIMESTAMPTZ` column keeps.
    pub fn create(draft: StudentDraft) -> Self {
        Self::from_draft(Uuid::new_v4(), Utc::now().trunc_subsecs(6), draft)
    }

    pub fn from_draft(id: Uuid, created_at: DateTime<Utc>, draft: StudentDraft) -> Self {
        Self {
            id,
            student_id: draft.student_id,
            first_name: draft.first_name,
            last_name: draft.last_name,
            email: draft.email,
            course: draft.course,
            enrollment_year: draft.enrollment_year,
            gpa: draft.gpa,
            status: draft.status,
            phone: draft.phone,
            address: draft.address,
            emergency_contact: draft.emergency_contact,
            skills: draft.skills,
            notes: draft.notes,
            created_at,
        }
    }

    /// Replace every client-writable field, keeping `id` and `createdAt`.
    pub fn with_draft(self, draft: StudentDraft) -> Self {
        Self::from_draft(self.id, self.created_at, draft)
    }
}
