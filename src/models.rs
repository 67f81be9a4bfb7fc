//! Canonical record schemas for every backend collection.
//!
//! The APEX variants disagree on key casing (`firstname` vs `FIRSTNAME`), so
//! each field decodes from both and the canonical name is the lowercase form.
//! Outgoing payloads are adapted in [`adapt_keys`]; the uppercase convention
//! is always the exact ASCII-uppercase of the canonical key.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::FieldConvention;
use crate::store::{Collection, Record};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Donor {
    #[serde(rename = "donor_id", alias = "DONOR_ID", default)]
    pub id: i64,
    #[serde(rename = "firstname", alias = "FIRSTNAME", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastname", alias = "LASTNAME", default)]
    pub last_name: Option<String>,
    #[serde(rename = "contact_info", alias = "CONTACT_INFO", default)]
    pub contact_info: Option<String>,
    #[serde(rename = "location", alias = "LOCATION", default)]
    pub location: Option<String>,
    #[serde(rename = "demographic_segment", alias = "DEMOGRAPHIC_SEGMENT", default)]
    pub demographic_segment: Option<String>,
    #[serde(rename = "age", alias = "AGE", default)]
    pub age: Option<i64>,
    #[serde(rename = "tax_id_number", alias = "TAX_ID_NUMBER", default)]
    pub tax_id_number: Option<String>,
    #[serde(rename = "tax_jurisdiction", alias = "TAX_JURISDICTION", default)]
    pub tax_jurisdiction: Option<String>,
    /// Server-derived running total, present on list endpoints that join it in.
    #[serde(rename = "total_donations", alias = "TOTAL_DONATIONS", default)]
    pub total_donations: Option<Decimal>,
}

impl Donor {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(f), Some(l)) => format!("{} {}", f, l),
            (Some(f), None) => f.clone(),
            (None, Some(l)) => l.clone(),
            (None, None) => "Anonymous".to_string(),
        }
    }

    pub fn level(&self) -> DonorLevel {
        DonorLevel::from_total(self.total_donations.unwrap_or_default())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Donation {
    #[serde(rename = "donation_id", alias = "DONATION_ID", default)]
    pub id: i64,
    #[serde(rename = "donor_id", alias = "DONOR_ID", default)]
    pub donor_id: Option<i64>,
    #[serde(rename = "amount", alias = "AMOUNT", default)]
    pub amount: Option<Decimal>,
    #[serde(
        rename = "donation_date",
        alias = "DONATION_DATE",
        default,
        deserialize_with = "lenient_date"
    )]
    pub date: Option<NaiveDate>,
    #[serde(rename = "category", alias = "CATEGORY", default)]
    pub category: Option<String>,
    #[serde(rename = "source", alias = "SOURCE", default)]
    pub source: Option<String>,
    #[serde(
        rename = "is_in_exchange_for_gift",
        alias = "IS_IN_EXCHANGE_FOR_GIFT",
        default,
        deserialize_with = "flag"
    )]
    pub is_in_exchange_for_gift: bool,
    #[serde(
        rename = "requires_tax_receipt",
        alias = "REQUIRES_TAX_RECEIPT",
        default,
        deserialize_with = "flag"
    )]
    pub requires_tax_receipt: bool,
    #[serde(rename = "deductible_amount", alias = "DEDUCTIBLE_AMOUNT", default)]
    pub deductible_amount: Option<Decimal>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Personnel {
    #[serde(rename = "personnel_id", alias = "PERSONNEL_ID", default)]
    pub id: i64,
    #[serde(rename = "firstname", alias = "FIRSTNAME", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastname", alias = "LASTNAME", default)]
    pub last_name: Option<String>,
    #[serde(rename = "contact_info", alias = "CONTACT_INFO", default)]
    pub contact_info: Option<String>,
    #[serde(rename = "role", alias = "ROLE", default)]
    pub role: Option<String>,
    #[serde(rename = "access_level", alias = "ACCESS_LEVEL", default)]
    pub access_level: Option<String>,
    // Not mutually exclusive; someone can be both.
    #[serde(rename = "is_employee", alias = "IS_EMPLOYEE", default, deserialize_with = "flag")]
    pub is_employee: bool,
    #[serde(rename = "is_volunteer", alias = "IS_VOLUNTEER", default, deserialize_with = "flag")]
    pub is_volunteer: bool,
}

impl Personnel {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(f), Some(l)) => format!("{} {}", f, l),
            (Some(f), None) => f.clone(),
            (None, Some(l)) => l.clone(),
            (None, None) => "—".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Schedule {
    #[serde(rename = "schedule_id", alias = "SCHEDULE_ID", default)]
    pub id: i64,
    #[serde(rename = "personnel_id", alias = "PERSONNEL_ID", default)]
    pub personnel_id: Option<i64>,
    #[serde(
        rename = "schedule_date",
        alias = "SCHEDULE_DATE",
        default,
        deserialize_with = "lenient_date"
    )]
    pub date: Option<NaiveDate>,
    #[serde(rename = "start_time", alias = "START_TIME", default)]
    pub start_time: Option<String>,
    #[serde(rename = "end_time", alias = "END_TIME", default)]
    pub end_time: Option<String>,
    #[serde(rename = "schedule_type", alias = "SCHEDULE_TYPE", default)]
    pub schedule_type: Option<String>,
    #[serde(rename = "availability_status", alias = "AVAILABILITY_STATUS", default)]
    pub availability_status: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Payment {
    #[serde(rename = "payment_id", alias = "PAYMENT_ID", default)]
    pub id: i64,
    #[serde(rename = "personnel_id", alias = "PERSONNEL_ID", default)]
    pub personnel_id: Option<i64>,
    #[serde(rename = "amount", alias = "AMOUNT", default)]
    pub amount: Option<Decimal>,
    #[serde(rename = "payment_type", alias = "PAYMENT_TYPE", default)]
    pub payment_type: Option<String>,
    #[serde(
        rename = "payment_date",
        alias = "PAYMENT_DATE",
        default,
        deserialize_with = "lenient_date"
    )]
    pub date: Option<NaiveDate>,
    #[serde(rename = "is_employee_pay", alias = "IS_EMPLOYEE_PAY", default, deserialize_with = "flag")]
    pub is_employee_pay: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GiftType {
    #[serde(rename = "gift_type_id", alias = "GIFT_TYPE_ID", default)]
    pub id: i64,
    #[serde(rename = "gift_name", alias = "GIFT_NAME", default)]
    pub name: Option<String>,
    #[serde(rename = "category", alias = "CATEGORY", default)]
    pub category: Option<String>,
    #[serde(rename = "gift_value", alias = "GIFT_VALUE", default)]
    pub value: Option<Decimal>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Distribution {
    #[serde(rename = "distribution_id", alias = "DISTRIBUTION_ID", default)]
    pub id: i64,
    #[serde(rename = "gift_type_id", alias = "GIFT_TYPE_ID", default)]
    pub gift_type_id: Option<i64>,
    #[serde(rename = "personnel_id", alias = "PERSONNEL_ID", default)]
    pub personnel_id: Option<i64>,
    #[serde(rename = "quantity", alias = "QUANTITY", default)]
    pub quantity: Option<i64>,
    #[serde(
        rename = "distribution_date",
        alias = "DISTRIBUTION_DATE",
        default,
        deserialize_with = "lenient_date"
    )]
    pub date: Option<NaiveDate>,
    #[serde(rename = "is_free", alias = "IS_FREE", default, deserialize_with = "flag")]
    pub is_free: bool,
}

/// Totals the backend precomputes at `/stats/summary`. Never persisted.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SummaryStats {
    #[serde(rename = "total_donors", alias = "TOTAL_DONORS", default)]
    pub total_donors: i64,
    #[serde(rename = "total_donations", alias = "TOTAL_DONATIONS", default)]
    pub total_donations: i64,
    #[serde(rename = "total_amount", alias = "TOTAL_DONATION_AMOUNT", default)]
    pub total_amount: Decimal,
    #[serde(rename = "total_employees", alias = "TOTAL_EMPLOYEES", default)]
    pub total_employees: i64,
    #[serde(rename = "total_volunteers", alias = "TOTAL_VOLUNTEERS", default)]
    pub total_volunteers: i64,
    #[serde(rename = "total_distributions", alias = "TOTAL_DISTRIBUTIONS", default)]
    pub total_distributions: i64,
}

/// One entry of the backend's `/stats/monthly` series.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MonthlyStat {
    #[serde(rename = "month", alias = "MONTH", default)]
    pub month: String,
    #[serde(rename = "total_amount", alias = "TOTAL_AMOUNT", default)]
    pub total_amount: Decimal,
    #[serde(rename = "donation_count", alias = "DONATION_COUNT", default)]
    pub donation_count: i64,
}

impl Record for Donor {
    const COLLECTION: Collection = Collection::Donors;
}
impl Record for Donation {
    const COLLECTION: Collection = Collection::Donations;
}
impl Record for Personnel {
    const COLLECTION: Collection = Collection::Personnel;
}
impl Record for Schedule {
    const COLLECTION: Collection = Collection::Schedules;
}
impl Record for Payment {
    const COLLECTION: Collection = Collection::Payments;
}
impl Record for GiftType {
    const COLLECTION: Collection = Collection::GiftTypes;
}
impl Record for Distribution {
    const COLLECTION: Collection = Collection::GiftDistributions;
}
impl Record for SummaryStats {
    const COLLECTION: Collection = Collection::StatsSummary;
}
impl Record for MonthlyStat {
    const COLLECTION: Collection = Collection::StatsMonthly;
}

/// Donor recognition tier, classified from cumulative giving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonorLevel {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl DonorLevel {
    pub fn from_total(total: Decimal) -> DonorLevel {
        if total >= Decimal::from(1_000_000) {
            DonorLevel::Diamond
        } else if total >= Decimal::from(500_000) {
            DonorLevel::Platinum
        } else if total >= Decimal::from(100_000) {
            DonorLevel::Gold
        } else if total >= Decimal::from(10_000) {
            DonorLevel::Silver
        } else {
            DonorLevel::Bronze
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DonorLevel::Bronze => "Bronze",
            DonorLevel::Silver => "Silver",
            DonorLevel::Gold => "Gold",
            DonorLevel::Platinum => "Platinum",
            DonorLevel::Diamond => "Diamond",
        }
    }
}

/// Resolve a donation's donor name against the cached donor list. A missing
/// weak reference is expected and renders as "Anonymous", never an error.
pub fn donor_display_name(donors: &[Donor], donor_id: Option<i64>) -> String {
    donor_id
        .and_then(|id| donors.iter().find(|d| d.id == id))
        .map(|d| d.display_name())
        .unwrap_or_else(|| "Anonymous".to_string())
}

/// Resolve a weak personnel reference for display; "—" when absent.
pub fn personnel_display_name(personnel: &[Personnel], personnel_id: Option<i64>) -> String {
    personnel_id
        .and_then(|id| personnel.iter().find(|p| p.id == id))
        .map(|p| p.display_name())
        .unwrap_or_else(|| "—".to_string())
}

/// Rewrite the top-level keys of an outgoing payload into the backend's
/// convention. Canonical keys are lowercase, so uppercase is a pure
/// ASCII-uppercase rewrite.
pub fn adapt_keys(payload: Value, convention: FieldConvention) -> Value {
    match (payload, convention) {
        (Value::Object(map), FieldConvention::Uppercase) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_ascii_uppercase(), v))
                .collect(),
        ),
        (other, _) => other,
    }
}

/// Accept `0`/`1`, booleans, and `"Y"`/`"N"` style strings for flag columns.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => {
            matches!(s.trim(), "1" | "Y" | "y" | "true" | "TRUE" | "True")
        }
        _ => false,
    })
}

/// Parse `YYYY-MM-DD`, tolerating an ORDS timestamp suffix.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|s| {
        // Not a byte slice: byte 10 may fall inside a multibyte character.
        let day = s.get(..10).unwrap_or(s.as_str());
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn donor_decodes_both_conventions() {
        let upper: Donor = serde_json::from_value(json!({
            "DONOR_ID": 7,
            "FIRSTNAME": "Ming",
            "LASTNAME": "Zhang",
            "TOTAL_DONATIONS": 300000
        }))
        .unwrap();
        assert_eq!(upper.id, 7);
        assert_eq!(upper.display_name(), "Ming Zhang");
        assert_eq!(upper.level(), DonorLevel::Gold);

        let lower: Donor = serde_json::from_value(json!({
            "donor_id": 7,
            "firstname": "Ming",
            "lastname": "Zhang"
        }))
        .unwrap();
        assert_eq!(lower.display_name(), "Ming Zhang");
        assert_eq!(lower.level(), DonorLevel::Bronze);
    }

    #[test]
    fn donation_flags_and_dates_are_lenient() {
        let d: Donation = serde_json::from_value(json!({
            "DONATION_ID": 3,
            "AMOUNT": "125.50",
            "DONATION_DATE": "2024-02-01T00:00:00Z",
            "REQUIRES_TAX_RECEIPT": 1,
            "IS_IN_EXCHANGE_FOR_GIFT": "N"
        }))
        .unwrap();
        assert_eq!(d.amount, Some(Decimal::new(12550, 2)));
        assert_eq!(d.date, Some(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()));
        assert!(d.requires_tax_receipt);
        assert!(!d.is_in_exchange_for_gift);
    }

    #[test]
    fn donation_date_tolerates_multibyte_garbage() {
        // A non-ASCII character straddling the date width must not panic.
        let d: Donation = serde_json::from_value(json!({
            "DONATION_ID": 9,
            "DONATION_DATE": "2024-02-0€ follow-up"
        }))
        .unwrap();
        assert_eq!(d.date, None);

        let ok: Donation = serde_json::from_value(json!({
            "DONATION_ID": 10,
            "DONATION_DATE": "2024-02-01T12:30:00Z"
        }))
        .unwrap();
        assert_eq!(ok.date, NaiveDate::from_ymd_opt(2024, 2, 1));
    }

    #[test]
    fn dangling_references_render_placeholders() {
        let donors = vec![];
        assert_eq!(donor_display_name(&donors, Some(99)), "Anonymous");
        assert_eq!(donor_display_name(&donors, None), "Anonymous");
        assert_eq!(personnel_display_name(&[], Some(4)), "—");
    }

    #[test]
    fn adapt_keys_uppercases_canonical_names() {
        let payload = json!({"firstname": "A", "contact_info": "a@b.c", "amount": 5});
        let adapted = adapt_keys(payload.clone(), FieldConvention::Uppercase);
        assert_eq!(adapted["FIRSTNAME"], "A");
        assert_eq!(adapted["CONTACT_INFO"], "a@b.c");
        assert_eq!(adapted["AMOUNT"], 5);
        let kept = adapt_keys(payload.clone(), FieldConvention::Lowercase);
        assert_eq!(kept, payload);
    }

    #[test]
    fn donor_levels_follow_thresholds() {
        assert_eq!(DonorLevel::from_total(Decimal::ZERO), DonorLevel::Bronze);
        assert_eq!(DonorLevel::from_total(Decimal::from(10_000)), DonorLevel::Silver);
        assert_eq!(DonorLevel::from_total(Decimal::from(999_999)), DonorLevel::Platinum);
        assert_eq!(DonorLevel::from_total(Decimal::from(1_000_000)), DonorLevel::Diamond);
    }
}
