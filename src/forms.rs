//! FormSession: transient draft state for one create/edit/view operation.
//!
//! The draft is independent of the cached record until a save succeeds;
//! validation runs on submit, not per keystroke, and a failed save never
//! discards what the user typed.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::api::Backend;
use crate::error::ApiError;
use crate::store::{Collection, RemoteStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
    /// Read-only; never transitions to saving.
    View,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Editing,
    Saving,
    Committed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Date,
    Checkbox,
    Select(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    Required,
    NotANumber,
    Negative,
    InvalidDate,
    InvalidOption,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Required => f.write_str("required"),
            FieldError::NotANumber => f.write_str("must be a number"),
            FieldError::Negative => f.write_str("must not be negative"),
            FieldError::InvalidDate => f.write_str("must be a date (YYYY-MM-DD)"),
            FieldError::InvalidOption => f.write_str("not one of the allowed values"),
        }
    }
}

#[derive(Debug)]
pub enum SubmitError {
    /// Client-side check failed before any network call; the offending
    /// fields are flagged individually.
    Validation(Vec<(&'static str, FieldError)>),
    /// View sessions cannot save.
    ReadOnly,
    /// The backend rejected the save; the draft survives.
    Remote(ApiError),
}

pub struct FormSession {
    collection: Collection,
    mode: FormMode,
    state: FormState,
    fields: &'static [FieldSpec],
    record_id: Option<i64>,
    draft: BTreeMap<&'static str, String>,
    field_errors: BTreeMap<&'static str, FieldError>,
    server_error: Option<String>,
}

impl FormSession {
    pub fn create(collection: Collection) -> FormSession {
        FormSession {
            collection,
            mode: FormMode::Create,
            state: FormState::Editing,
            fields: fields_for(collection),
            record_id: None,
            draft: BTreeMap::new(),
            field_errors: BTreeMap::new(),
            server_error: None,
        }
    }

    /// Seed an edit session from a shallow copy of the target record. The
    /// cached record itself is never touched until the save succeeds.
    pub fn edit(collection: Collection, record: &Value) -> FormSession {
        let mut session = FormSession::create(collection);
        session.mode = FormMode::Edit;
        session.record_id = extract_id(collection, record);
        for spec in session.fields {
            if let Some(text) = seed_value(record, spec.key) {
                session.draft.insert(spec.key, text);
            }
        }
        session
    }

    pub fn view(collection: Collection, record: &Value) -> FormSession {
        let mut session = FormSession::edit(collection, record);
        session.mode = FormMode::View;
        session
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.draft.get(key).map(String::as_str)
    }

    pub fn field_error(&self, key: &str) -> Option<FieldError> {
        self.field_errors.get(key).copied()
    }

    pub fn server_error(&self) -> Option<&str> {
        self.server_error.as_deref()
    }

    /// Update one draft field. A no-op outside the editing state or in view
    /// mode.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        if self.state != FormState::Editing || self.mode == FormMode::View {
            return;
        }
        if let Some(spec) = self.fields.iter().find(|s| s.key == key) {
            self.draft.insert(spec.key, value.into());
        }
    }

    /// Run the submit-time checks and build the outgoing payload with
    /// coerced field types. Empty numeric input is absent, not zero.
    fn validate(&mut self) -> Result<Value, Vec<(&'static str, FieldError)>> {
        let mut errors: Vec<(&'static str, FieldError)> = Vec::new();
        let mut payload = Map::new();

        for spec in self.fields {
            let raw = self.draft.get(spec.key).map(String::as_str).unwrap_or("");
            let trimmed = raw.trim();

            if trimmed.is_empty() {
                if spec.required {
                    errors.push((spec.key, FieldError::Required));
                }
                continue;
            }

            match spec.kind {
                FieldKind::Text => {
                    payload.insert(spec.key.to_string(), Value::from(trimmed));
                }
                FieldKind::Number => match trimmed.parse::<Decimal>() {
                    Ok(n) if n < Decimal::ZERO => errors.push((spec.key, FieldError::Negative)),
                    Ok(n) => {
                        payload.insert(spec.key.to_string(), decimal_value(n));
                    }
                    Err(_) => errors.push((spec.key, FieldError::NotANumber)),
                },
                FieldKind::Date => match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
                    Ok(date) => {
                        payload.insert(
                            spec.key.to_string(),
                            Value::from(date.format("%Y-%m-%d").to_string()),
                        );
                    }
                    Err(_) => errors.push((spec.key, FieldError::InvalidDate)),
                },
                FieldKind::Checkbox => {
                    let on = matches!(trimmed, "1" | "true" | "yes" | "Y" | "y" | "on");
                    payload.insert(spec.key.to_string(), Value::from(if on { 1 } else { 0 }));
                }
                FieldKind::Select(options) => {
                    if options.iter().any(|o| *o == trimmed) {
                        payload.insert(spec.key.to_string(), Value::from(trimmed));
                    } else {
                        errors.push((spec.key, FieldError::InvalidOption));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(Value::Object(payload))
        } else {
            Err(errors)
        }
    }

    /// Submit the draft through the store. On success the session commits;
    /// on failure it returns to editing with the server message attached and
    /// every entered value intact.
    pub async fn submit<B: Backend>(
        &mut self,
        store: &RemoteStore<B>,
    ) -> Result<Value, SubmitError> {
        if self.mode == FormMode::View {
            return Err(SubmitError::ReadOnly);
        }
        if self.state != FormState::Editing {
            return Err(SubmitError::ReadOnly);
        }

        self.field_errors.clear();
        let payload = match self.validate() {
            Ok(payload) => payload,
            Err(errors) => {
                for (key, err) in &errors {
                    self.field_errors.insert(key, *err);
                }
                return Err(SubmitError::Validation(errors));
            }
        };

        self.state = FormState::Saving;
        self.server_error = None;

        let result = match (self.mode, self.record_id) {
            (FormMode::Edit, Some(id)) => store.update(self.collection, id, payload).await,
            _ => store.create(self.collection, payload).await,
        };

        match result {
            Ok(saved) => {
                self.state = FormState::Committed;
                Ok(saved)
            }
            Err(err) => {
                // Back to editing; the draft is untouched.
                self.state = FormState::Editing;
                self.server_error = Some(
                    err.server_message()
                        .map(str::to_string)
                        .unwrap_or_else(|| err.to_string()),
                );
                Err(SubmitError::Remote(err))
            }
        }
    }
}

/// JSON number when f64 carries the value exactly, otherwise the decimal's
/// string form. Precision is never silently dropped or zeroed.
fn decimal_value(n: Decimal) -> Value {
    match n.to_f64().and_then(serde_json::Number::from_f64) {
        Some(num) if num.as_f64().and_then(Decimal::from_f64) == Some(n) => Value::Number(num),
        _ => Value::from(n.to_string()),
    }
}

/// Stringify one record field for the draft, checking both key conventions.
fn seed_value(record: &Value, key: &str) -> Option<String> {
    let value = record
        .get(key)
        .or_else(|| record.get(key.to_ascii_uppercase()))?;
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        _ => None,
    }
}

fn extract_id(collection: Collection, record: &Value) -> Option<i64> {
    let key = id_key(collection)?;
    record
        .get(key)
        .or_else(|| record.get(key.to_ascii_uppercase()))
        .and_then(Value::as_i64)
}

fn id_key(collection: Collection) -> Option<&'static str> {
    match collection {
        Collection::Donors => Some("donor_id"),
        Collection::Donations => Some("donation_id"),
        Collection::Personnel => Some("personnel_id"),
        Collection::Schedules => Some("schedule_id"),
        Collection::Payments => Some("payment_id"),
        Collection::GiftTypes => Some("gift_type_id"),
        Collection::GiftDistributions => Some("distribution_id"),
        Collection::StatsSummary | Collection::StatsMonthly => None,
    }
}

const SEGMENT_OPTIONS: &[&str] = &[
    "Individual",
    "High Income",
    "Corporate",
    "Foundation",
    "Small Business",
];

const CATEGORY_OPTIONS: &[&str] = &[
    "General Fund",
    "Education",
    "Healthcare",
    "Emergency Relief",
    "Capital Campaign",
    "Scholarship",
    "Environment",
    "Research",
    "Youth Programs",
    "Arts & Culture",
    "Endowment",
];

const SOURCE_OPTIONS: &[&str] = &["Online", "Mail", "Check", "Wire Transfer"];

const ACCESS_LEVEL_OPTIONS: &[&str] = &["Admin", "Manager", "Staff", "Volunteer"];

const AVAILABILITY_OPTIONS: &[&str] = &["Available", "Busy", "Off"];

const DONOR_FIELDS: &[FieldSpec] = &[
    FieldSpec { key: "firstname", label: "First Name", kind: FieldKind::Text, required: true },
    FieldSpec { key: "lastname", label: "Last Name", kind: FieldKind::Text, required: true },
    FieldSpec { key: "contact_info", label: "Email", kind: FieldKind::Text, required: true },
    FieldSpec { key: "age", label: "Age", kind: FieldKind::Number, required: false },
    FieldSpec { key: "location", label: "Location", kind: FieldKind::Text, required: false },
    FieldSpec { key: "demographic_segment", label: "Segment", kind: FieldKind::Select(SEGMENT_OPTIONS), required: false },
    FieldSpec { key: "tax_id_number", label: "Tax ID Number", kind: FieldKind::Text, required: false },
    FieldSpec { key: "tax_jurisdiction", label: "Tax Jurisdiction", kind: FieldKind::Text, required: false },
];

const DONATION_FIELDS: &[FieldSpec] = &[
    FieldSpec { key: "donor_id", label: "Donor ID", kind: FieldKind::Number, required: true },
    FieldSpec { key: "amount", label: "Amount", kind: FieldKind::Number, required: true },
    FieldSpec { key: "donation_date", label: "Date", kind: FieldKind::Date, required: true },
    FieldSpec { key: "category", label: "Category", kind: FieldKind::Select(CATEGORY_OPTIONS), required: true },
    FieldSpec { key: "source", label: "Source", kind: FieldKind::Select(SOURCE_OPTIONS), required: false },
    FieldSpec { key: "is_in_exchange_for_gift", label: "In Exchange for Gift", kind: FieldKind::Checkbox, required: false },
    FieldSpec { key: "requires_tax_receipt", label: "Requires Tax Receipt", kind: FieldKind::Checkbox, required: false },
    FieldSpec { key: "deductible_amount", label: "Deductible Amount", kind: FieldKind::Number, required: false },
];

const PERSONNEL_FIELDS: &[FieldSpec] = &[
    FieldSpec { key: "firstname", label: "First Name", kind: FieldKind::Text, required: true },
    FieldSpec { key: "lastname", label: "Last Name", kind: FieldKind::Text, required: true },
    FieldSpec { key: "contact_info", label: "Contact", kind: FieldKind::Text, required: true },
    FieldSpec { key: "role", label: "Role", kind: FieldKind::Text, required: true },
    FieldSpec { key: "is_employee", label: "Employee", kind: FieldKind::Checkbox, required: false },
    FieldSpec { key: "is_volunteer", label: "Volunteer", kind: FieldKind::Checkbox, required: false },
    FieldSpec { key: "access_level", label: "Access Level", kind: FieldKind::Select(ACCESS_LEVEL_OPTIONS), required: true },
];

const SCHEDULE_FIELDS: &[FieldSpec] = &[
    FieldSpec { key: "personnel_id", label: "Personnel ID", kind: FieldKind::Number, required: true },
    FieldSpec { key: "schedule_date", label: "Date", kind: FieldKind::Date, required: true },
    FieldSpec { key: "start_time", label: "Start Time", kind: FieldKind::Text, required: true },
    FieldSpec { key: "end_time", label: "End Time", kind: FieldKind::Text, required: true },
    FieldSpec { key: "schedule_type", label: "Type", kind: FieldKind::Text, required: false },
    FieldSpec { key: "availability_status", label: "Availability", kind: FieldKind::Select(AVAILABILITY_OPTIONS), required: false },
];

const PAYMENT_FIELDS: &[FieldSpec] = &[
    FieldSpec { key: "personnel_id", label: "Personnel ID", kind: FieldKind::Number, required: true },
    FieldSpec { key: "amount", label: "Amount", kind: FieldKind::Number, required: true },
    FieldSpec { key: "payment_type", label: "Type", kind: FieldKind::Text, required: true },
    FieldSpec { key: "payment_date", label: "Date", kind: FieldKind::Date, required: true },
    FieldSpec { key: "is_employee_pay", label: "Employee Pay", kind: FieldKind::Checkbox, required: false },
];

const GIFT_TYPE_FIELDS: &[FieldSpec] = &[
    FieldSpec { key: "gift_name", label: "Name", kind: FieldKind::Text, required: true },
    FieldSpec { key: "category", label: "Category", kind: FieldKind::Text, required: false },
    FieldSpec { key: "gift_value", label: "Value", kind: FieldKind::Number, required: false },
];

const DISTRIBUTION_FIELDS: &[FieldSpec] = &[
    FieldSpec { key: "gift_type_id", label: "Gift Type ID", kind: FieldKind::Number, required: true },
    FieldSpec { key: "personnel_id", label: "Personnel ID", kind: FieldKind::Number, required: false },
    FieldSpec { key: "quantity", label: "Quantity", kind: FieldKind::Number, required: true },
    FieldSpec { key: "distribution_date", label: "Date", kind: FieldKind::Date, required: true },
    FieldSpec { key: "is_free", label: "Free of Charge", kind: FieldKind::Checkbox, required: false },
];

pub fn fields_for(collection: Collection) -> &'static [FieldSpec] {
    match collection {
        Collection::Donors => DONOR_FIELDS,
        Collection::Donations => DONATION_FIELDS,
        Collection::Personnel => PERSONNEL_FIELDS,
        Collection::Schedules => SCHEDULE_FIELDS,
        Collection::Payments => PAYMENT_FIELDS,
        Collection::GiftTypes => GIFT_TYPE_FIELDS,
        Collection::GiftDistributions => DISTRIBUTION_FIELDS,
        Collection::StatsSummary | Collection::StatsMonthly => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn edit_seeds_from_either_convention_without_mutating_record() {
        let record = json!({"DONOR_ID": 4, "FIRSTNAME": "Ada", "AGE": 36});
        let session = FormSession::edit(Collection::Donors, &record);
        assert_eq!(session.mode(), FormMode::Edit);
        assert_eq!(session.value("firstname"), Some("Ada"));
        assert_eq!(session.value("age"), Some("36"));
        assert_eq!(session.record_id, Some(4));
        // The source record is untouched.
        assert_eq!(record["FIRSTNAME"], "Ada");
    }

    #[test]
    fn validation_flags_only_offending_fields() {
        let mut session = FormSession::create(Collection::Donations);
        session.set("amount", "250.00");
        session.set("donation_date", "2024-05-01");
        session.set("category", "Education");
        // donor_id left empty on purpose
        let result = session.validate();
        let errors = result.expect_err("missing required field");
        assert_eq!(errors, vec![("donor_id", FieldError::Required)]);
        // Other entered values survive.
        assert_eq!(session.value("amount"), Some("250.00"));
        assert_eq!(session.value("category"), Some("Education"));
    }

    #[test]
    fn numeric_coercion_rejects_garbage_and_negatives() {
        let mut session = FormSession::create(Collection::Donations);
        session.set("donor_id", "1");
        session.set("donation_date", "2024-05-01");
        session.set("category", "Education");

        session.set("amount", "abc");
        assert!(matches!(
            session.validate().unwrap_err().as_slice(),
            [("amount", FieldError::NotANumber)]
        ));

        session.set("amount", "-5");
        assert!(matches!(
            session.validate().unwrap_err().as_slice(),
            [("amount", FieldError::Negative)]
        ));
    }

    #[test]
    fn empty_numeric_field_is_absent_not_zero() {
        let mut session = FormSession::create(Collection::Donations);
        session.set("donor_id", "1");
        session.set("amount", "100");
        session.set("donation_date", "2024-05-01");
        session.set("category", "Education");
        session.set("deductible_amount", "");
        let payload = session.validate().expect("valid");
        assert!(payload.get("deductible_amount").is_none());
        assert_eq!(payload["amount"], json!(100.0));
    }

    #[test]
    fn high_precision_amounts_survive_as_strings() {
        let mut session = FormSession::create(Collection::Donations);
        session.set("donor_id", "1");
        session.set("donation_date", "2024-05-01");
        session.set("category", "Education");
        session.set("amount", "123456789.123456789123456789");
        let payload = session.validate().expect("valid");
        // Beyond f64 precision: carried as the exact decimal string, not a
        // rounded (or zeroed) float.
        assert_eq!(payload["amount"], json!("123456789.123456789123456789"));
    }

    #[test]
    fn checkbox_coerces_to_flag_and_selects_are_checked() {
        let mut session = FormSession::create(Collection::Personnel);
        session.set("firstname", "Sam");
        session.set("lastname", "Lee");
        session.set("contact_info", "sam@org.test");
        session.set("role", "Coordinator");
        session.set("access_level", "Staff");
        session.set("is_volunteer", "true");
        let payload = session.validate().expect("valid");
        assert_eq!(payload["is_volunteer"], json!(1));

        session.set("access_level", "Superuser");
        assert!(matches!(
            session.validate().unwrap_err().as_slice(),
            [("access_level", FieldError::InvalidOption)]
        ));
    }

    #[test]
    fn view_mode_ignores_edits() {
        let record = json!({"donor_id": 1, "firstname": "Ada"});
        let mut session = FormSession::view(Collection::Donors, &record);
        session.set("firstname", "Changed");
        assert_eq!(session.value("firstname"), Some("Ada"));
    }
}
