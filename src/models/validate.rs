use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use super::student::{Address, EmergencyContact, Student, StudentDraft, StudentStatus};

/// Server-assigned fields a request body may not carry.
pub const SYSTEM_FIELDS: &[&str] = &["id", "createdAt"];

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?-u)^\w+([\.-]?\w+)*@\w+([\.-]?\w+)*(\.\w{2,3})+$").expect("valid email regex")
});

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{10}$").expect("valid phone regex"));

pub const GPA_MIN: f64 = 0.0;
pub const GPA_MAX: f64 = 4.0;

/// Per-field validation failures; `message` joins them for display.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub field_errors: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn new(field_errors: BTreeMap<String, String>) -> Self {
        let message = field_errors.values().cloned().collect::<Vec<_>>().join(", ");
        Self { message, field_errors }
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut field_errors = BTreeMap::new();
        field_errors.insert(field.into(), message.into());
        Self::new(field_errors)
    }
}

/// Require a JSON object and reject system fields.
pub fn body_object(body: Value) -> Result<Map<String, Value>, ValidationError> {
    let Value::Object(map) = body else {
        return Err(ValidationError::single("body", "Request body must be a JSON object"));
    };
    let mut errors = BTreeMap::new();
    for field in SYSTEM_FIELDS {
        if map.contains_key(*field) {
            errors.insert(field.to_string(), format!("System field '{}' cannot be set", field));
        }
    }
    if errors.is_empty() {
        Ok(map)
    } else {
        Err(ValidationError::new(errors))
    }
}

/// Overlay `patch` on the stored record's writable fields. `null` clears a field.
pub fn merge_patch(current: &Student, patch: Map<String, Value>) -> Result<Map<String, Value>, ValidationError> {
    let Value::Object(mut merged) = serde_json::to_value(current)
        .map_err(|e| ValidationError::single("body", e.to_string()))?
    else {
        return Err(ValidationError::single("body", "stored record is not an object"));
    };
    for field in SYSTEM_FIELDS {
        merged.remove(*field);
    }
    for (key, value) in patch {
        if value.is_null() {
            merged.remove(&key);
        } else {
            merged.insert(key, value);
        }
    }
    Ok(merged)
}

/// Validate a full document into a draft. Every failing field is reported.
pub fn validate_student(doc: &Map<String, Value>) -> Result<StudentDraft, ValidationError> {
    let mut v = Validator { doc, errors: BTreeMap::new() };

    let student_id = v.required_text("studentId", "Please add a Student ID", true);
    let first_name = v.required_text("firstName", "Please add a first name", true);
    let last_name = v.required_text("lastName", "Please add a last name", true);
    let email = v.required_text("email", "Please add an email", false);
    if let Some(email) = &email {
        if !EMAIL_PATTERN.is_match(email) {
            v.fail("email", "Please add a valid email");
        }
    }
    let course = v.required_text("course", "Please add a course", false);
    let enrollment_year = v.enrollment_year();
    let gpa = v.gpa();
    let status = v.status();
    let phone = v.optional_text("phone");
    if let Some(phone) = &phone {
        if !PHONE_PATTERN.is_match(phone) {
            v.fail("phone", "Please add a valid 10-digit phone number");
        }
    }
    let address = v.object("address").map(|m| Address {
        street: member(&m, "street"),
        city: member(&m, "city"),
        state: member(&m, "state"),
        zip_code: member(&m, "zipCode"),
        country: member(&m, "country"),
    });
    let emergency_contact = v.object("emergencyContact").map(|m| EmergencyContact {
        name: member(&m, "name"),
        phone: member(&m, "phone"),
        relation: member(&m, "relation"),
    });
    let skills = v.skills();
    let notes = v.optional_text("notes");

    if !v.errors.is_empty() {
        return Err(ValidationError::new(v.errors));
    }

    match (student_id, first_name, last_name, email, course, enrollment_year) {
        (Some(student_id), Some(first_name), Some(last_name), Some(email), Some(course), Some(enrollment_year)) => {
            Ok(StudentDraft {
                student_id,
                first_name,
                last_name,
                email,
                course,
                enrollment_year,
                gpa,
                status,
                phone,
                address,
                emergency_contact,
                skills,
                notes,
            })
        }
        _ => Err(ValidationError::single("body", "Missing required fields")),
    }
}

struct Validator<'a> {
    doc: &'a Map<String, Value>,
    errors: BTreeMap<String, String>,
}

impl Validator<'_> {
    fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_insert_with(|| message.into());
    }

    fn present(&self, field: &str) -> Option<&Value> {
        self.doc.get(field).filter(|v| !v.is_null())
    }

    fn text(&mut self, field: &str) -> Option<String> {
        let value = self.present(field)?.clone();
        match as_text(&value) {
            Some(text) => Some(text),
            None => {
                self.fail(field, format!("{} must be a string", field));
                None
            }
        }
    }

    fn required_text(&mut self, field: &str, message: &str, trim: bool) -> Option<String> {
        let text = self.text(field).map(|t| if trim { t.trim().to_string() } else { t });
        match text {
            Some(t) if !t.is_empty() => Some(t),
            _ => {
                self.fail(field, message);
                None
            }
        }
    }

    fn optional_text(&mut self, field: &str) -> Option<String> {
        self.text(field)
    }

    fn number(&mut self, field: &str) -> Option<f64> {
        let value = self.present(field)?;
        let n = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match n.filter(|n| n.is_finite()) {
            Some(n) => Some(n),
            None => {
                self.fail(field, format!("{} must be a number", field));
                None
            }
        }
    }

    fn enrollment_year(&mut self) -> Option<i32> {
        if self.present("enrollmentYear").is_none() {
            self.fail("enrollmentYear", "Please add enrollment year");
            return None;
        }
        let year = self.number("enrollmentYear")?;
        if year.fract() != 0.0 || year < i32::MIN as f64 || year > i32::MAX as f64 {
            self.fail("enrollmentYear", "enrollmentYear must be a whole number");
            return None;
        }
        Some(year as i32)
    }

    fn gpa(&mut self) -> Option<f64> {
        let gpa = self.number("gpa")?;
        if !(GPA_MIN..=GPA_MAX).contains(&gpa) {
            self.fail("gpa", format!("GPA must be between {} and {:.1}", GPA_MIN, GPA_MAX));
            return None;
        }
        Some(gpa)
    }

    fn status(&mut self) -> StudentStatus {
        let Some(value) = self.present("status") else {
            return StudentStatus::default();
        };
        match value.as_str().and_then(StudentStatus::parse) {
            Some(status) => status,
            None => {
                let allowed: Vec<_> = StudentStatus::ALL.iter().map(|s| s.as_str()).collect();
                self.fail("status", format!("Status must be one of {}", allowed.join(", ")));
                StudentStatus::default()
            }
        }
    }

    fn object(&mut self, field: &str) -> Option<Map<String, Value>> {
        match self.present(field)? {
            Value::Object(map) => Some(map.clone()),
            _ => {
                self.fail(field, format!("{} must be an object", field));
                None
            }
        }
    }

    fn skills(&mut self) -> Vec<String> {
        let Some(value) = self.present("skills") else {
            return Vec::new();
        };
        let items: Vec<Value> = match value {
            Value::Array(items) => items.clone(),
            single => vec![single.clone()],
        };
        let mut skills = Vec::with_capacity(items.len());
        for item in items.iter().filter(|i| !i.is_null()) {
            match as_text(item) {
                Some(text) => skills.push(text),
                None => {
                    self.fail("skills", "skills must be a list of strings");
                    return Vec::new();
                }
            }
        }
        skills
    }
}

/// Strings as-is; numbers and booleans are cast to their text form.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn member(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(as_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn valid() -> Value {
        json!({
            "studentId": "  S-100 ",
            "firstName": " Grace ",
            "lastName": "Hopper",
            "email": "grace.hopper@navy.mil",
            "course": "Computer Science",
            "enrollmentYear": "2022",
        })
    }

    #[test]
    fn applies_defaults_and_trims() {
        let draft = validate_student(&doc(valid())).unwrap();
        assert_eq!(draft.student_id, "S-100");
        assert_eq!(draft.first_name, "Grace");
        assert_eq!(draft.enrollment_year, 2022);
        assert_eq!(draft.status, StudentStatus::Active);
        assert!(draft.skills.is_empty());
        assert_eq!(draft.gpa, None);
    }

    #[test]
    fn reports_every_missing_required_field() {
        let err = validate_student(&Map::new()).unwrap_err();
        let fields: Vec<_> = err.field_errors.keys().map(String::as_str).collect();
        assert_eq!(
            fields,
            vec!["course", "email", "enrollmentYear", "firstName", "lastName", "studentId"]
        );
        assert_eq!(err.field_errors["studentId"], "Please add a Student ID");
    }

    #[test]
    fn blank_required_text_is_missing() {
        let mut body = valid();
        body["firstName"] = json!("   ");
        let err = validate_student(&doc(body)).unwrap_err();
        assert_eq!(err.field_errors["firstName"], "Please add a first name");
    }

    #[test]
    fn rejects_bad_email_phone_gpa_and_status() {
        let mut body = valid();
        body["email"] = json!("not-an-email");
        body["phone"] = json!("12345");
        body["gpa"] = json!(4.5);
        body["status"] = json!("Expelled");
        let err = validate_student(&doc(body)).unwrap_err();
        assert_eq!(err.field_errors["email"], "Please add a valid email");
        assert_eq!(err.field_errors["phone"], "Please add a valid 10-digit phone number");
        assert!(err.field_errors.contains_key("gpa"));
        assert!(err.field_errors.contains_key("status"));
    }

    #[test]
    fn email_word_characters_are_ascii_only() {
        for email in ["ñ@x.com", "jose@exámple.com", "ana@example.çom"] {
            let mut body = valid();
            body["email"] = json!(email);
            let err = validate_student(&doc(body)).unwrap_err();
            assert_eq!(err.field_errors["email"], "Please add a valid email", "{}", email);
        }

        let mut body = valid();
        body["email"] = json!("jose_2.l-b@uni-x.edu");
        assert!(validate_student(&doc(body)).is_ok());
    }

    #[test]
    fn accepts_numeric_strings_and_single_skill() {
        let mut body = valid();
        body["gpa"] = json!("3.75");
        body["skills"] = json!("Rust");
        body["phone"] = json!("0123456789");
        let draft = validate_student(&doc(body)).unwrap();
        assert_eq!(draft.gpa, Some(3.75));
        assert_eq!(draft.skills, vec!["Rust"]);
    }

    #[test]
    fn gpa_bounds_are_inclusive() {
        for gpa in [0.0, 4.0] {
            let mut body = valid();
            body["gpa"] = json!(gpa);
            assert_eq!(validate_student(&doc(body)).unwrap().gpa, Some(gpa));
        }
    }

    #[test]
    fn body_must_not_carry_system_fields() {
        let err = body_object(json!({ "id": "x", "createdAt": "2024-01-01" })).unwrap_err();
        assert_eq!(err.field_errors.len(), 2);
        assert!(body_object(json!([1, 2])).is_err());
        assert!(body_object(json!({ "unknown": 1 })).is_ok());
    }

    #[test]
    fn merge_patch_overlays_and_clears() {
        let student = Student::create(validate_student(&doc(valid())).unwrap());
        let merged = merge_patch(&student, doc(json!({ "course": "Physics", "notes": "hi" }))).unwrap();
        assert_eq!(merged["course"], "Physics");
        assert_eq!(merged["firstName"], "Grace");
        assert!(!merged.contains_key("id"));

        let cleared = merge_patch(&student, doc(json!({ "course": null }))).unwrap();
        let err = validate_student(&cleared).unwrap_err();
        assert_eq!(err.field_errors["course"], "Please add a course");
    }
}
