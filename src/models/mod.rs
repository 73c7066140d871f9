pub mod student;
pub mod validate;

pub use student::{Address, EmergencyContact, Student, StudentDraft, StudentStatus, STUDENT_FIELDS};
pub use validate::ValidationError;
