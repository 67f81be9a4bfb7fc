//! Offline sample data set for disconnected development.
//!
//! Enabled only by the demo-mode flag; the live transport never falls back
//! here. Records use the uppercase ORDS convention so the same decoding path
//! is exercised as against a real backend.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{json, Value};

use crate::error::ApiError;

pub struct DemoBackend {
    collections: Mutex<HashMap<String, Vec<Value>>>,
}

impl Default for DemoBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoBackend {
    pub fn new() -> DemoBackend {
        DemoBackend {
            collections: Mutex::new(sample_data()),
        }
    }

    fn id_field(path: &str) -> Option<&'static str> {
        match path {
            "/donors" => Some("DONOR_ID"),
            "/donations" => Some("DONATION_ID"),
            "/personnel" => Some("PERSONNEL_ID"),
            "/schedules" => Some("SCHEDULE_ID"),
            "/payments" => Some("PAYMENT_ID"),
            "/gift-types" => Some("GIFT_TYPE_ID"),
            "/gift-distributions" => Some("DISTRIBUTION_ID"),
            _ => None,
        }
    }

    fn record_id(record: &Value, id_field: &str) -> Option<i64> {
        record.get(id_field).and_then(Value::as_i64)
    }

    fn stats_summary(collections: &HashMap<String, Vec<Value>>) -> Value {
        let donors = collections.get("/donors").map(Vec::len).unwrap_or(0);
        let donations = collections.get("/donations").cloned().unwrap_or_default();
        let personnel = collections.get("/personnel").cloned().unwrap_or_default();
        let distributions = collections
            .get("/gift-distributions")
            .map(Vec::len)
            .unwrap_or(0);

        let total_amount: f64 = donations
            .iter()
            .filter_map(|d| d.get("AMOUNT").and_then(Value::as_f64))
            .sum();
        let employees = personnel
            .iter()
            .filter(|p| p.get("IS_EMPLOYEE").and_then(Value::as_i64) == Some(1))
            .count();
        let volunteers = personnel
            .iter()
            .filter(|p| p.get("IS_VOLUNTEER").and_then(Value::as_i64) == Some(1))
            .count();

        json!({
            "TOTAL_DONORS": donors,
            "TOTAL_DONATIONS": donations.len(),
            "TOTAL_DONATION_AMOUNT": total_amount,
            "TOTAL_EMPLOYEES": employees,
            "TOTAL_VOLUNTEERS": volunteers,
            "TOTAL_DISTRIBUTIONS": distributions,
        })
    }

    fn stats_monthly(collections: &HashMap<String, Vec<Value>>) -> Value {
        let donations = collections.get("/donations").cloned().unwrap_or_default();
        let mut months: Vec<(String, f64, i64)> = Vec::new();
        for d in &donations {
            let Some(date) = d.get("DONATION_DATE").and_then(Value::as_str) else {
                continue;
            };
            let month = date.chars().take(7).collect::<String>();
            let amount = d.get("AMOUNT").and_then(Value::as_f64).unwrap_or(0.0);
            match months.iter_mut().find(|(m, _, _)| *m == month) {
                Some(entry) => {
                    entry.1 += amount;
                    entry.2 += 1;
                }
                None => months.push((month, amount, 1)),
            }
        }
        months.sort_by(|a, b| a.0.cmp(&b.0));
        Value::Array(
            months
                .into_iter()
                .map(|(month, amount, count)| {
                    json!({"MONTH": month, "TOTAL_AMOUNT": amount, "DONATION_COUNT": count})
                })
                .collect(),
        )
    }
}

impl super::Backend for DemoBackend {
    async fn get(&self, path: &str, _params: &[(String, String)]) -> Result<Value, ApiError> {
        let collections = self.collections.lock().expect("demo lock");
        match path {
            "/stats/summary" => Ok(Self::stats_summary(&collections)),
            "/stats/monthly" => Ok(Self::stats_monthly(&collections)),
            _ => match collections.get(path) {
                Some(records) => Ok(json!({ "items": records.clone() })),
                None => Err(ApiError::Http {
                    status: 404,
                    message: format!("no demo collection at {}", path),
                }),
            },
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let id_field = Self::id_field(path).ok_or_else(|| ApiError::Http {
            status: 404,
            message: format!("no demo collection at {}", path),
        })?;
        let mut collections = self.collections.lock().expect("demo lock");
        let records = collections.entry(path.to_string()).or_default();

        let next_id = records
            .iter()
            .filter_map(|r| Self::record_id(r, id_field))
            .max()
            .unwrap_or(0)
            + 1;
        let mut created = body.clone();
        if let Value::Object(map) = &mut created {
            map.insert(id_field.to_string(), json!(next_id));
        }
        records.push(created.clone());
        Ok(created)
    }

    async fn put(&self, path: &str, id: i64, body: &Value) -> Result<Value, ApiError> {
        let id_field = Self::id_field(path).ok_or_else(|| ApiError::Http {
            status: 404,
            message: format!("no demo collection at {}", path),
        })?;
        let mut collections = self.collections.lock().expect("demo lock");
        let records = collections.entry(path.to_string()).or_default();

        let Some(existing) = records
            .iter_mut()
            .find(|r| Self::record_id(r, id_field) == Some(id))
        else {
            return Err(ApiError::Http {
                status: 404,
                message: format!("record {} not found", id),
            });
        };

        // Partial update: merge the submitted fields over the stored record.
        if let (Value::Object(target), Value::Object(updates)) = (&mut *existing, body) {
            for (k, v) in updates {
                target.insert(k.clone(), v.clone());
            }
            target.insert(id_field.to_string(), json!(id));
        }
        Ok(existing.clone())
    }

    async fn delete(&self, path: &str, id: i64) -> Result<(), ApiError> {
        let id_field = Self::id_field(path).ok_or_else(|| ApiError::Http {
            status: 404,
            message: format!("no demo collection at {}", path),
        })?;
        let mut collections = self.collections.lock().expect("demo lock");
        let records = collections.entry(path.to_string()).or_default();
        let before = records.len();
        records.retain(|r| Self::record_id(r, id_field) != Some(id));
        if records.len() == before {
            return Err(ApiError::Http {
                status: 404,
                message: format!("record {} not found", id),
            });
        }
        Ok(())
    }
}

fn sample_data() -> HashMap<String, Vec<Value>> {
    let mut data = HashMap::new();

    data.insert(
        "/donors".to_string(),
        vec![
            json!({"DONOR_ID": 1, "FIRSTNAME": "Ming", "LASTNAME": "Zhang", "CONTACT_INFO": "zhangming@email.com", "LOCATION": "Beijing", "DEMOGRAPHIC_SEGMENT": "Individual", "AGE": 45, "TAX_ID_NUMBER": "T-1001", "TAX_JURISDICTION": "CN", "TOTAL_DONATIONS": 300000}),
            json!({"DONOR_ID": 2, "FIRSTNAME": "Li", "LASTNAME": "Wang", "CONTACT_INFO": "wangli@email.com", "LOCATION": "Shanghai", "DEMOGRAPHIC_SEGMENT": "Individual", "AGE": 38, "TOTAL_DONATIONS": 8000}),
            json!({"DONOR_ID": 3, "FIRSTNAME": "Sunshine", "LASTNAME": "Tech Co.", "CONTACT_INFO": "csr@suntech.com", "LOCATION": "Beijing", "DEMOGRAPHIC_SEGMENT": "Corporate", "TOTAL_DONATIONS": 600000}),
            json!({"DONOR_ID": 4, "FIRSTNAME": "Love Education", "LASTNAME": "Foundation", "CONTACT_INFO": "grants@loveedu.org", "LOCATION": "Beijing", "DEMOGRAPHIC_SEGMENT": "Foundation", "TOTAL_DONATIONS": 1000000}),
            json!({"DONOR_ID": 5, "FIRSTNAME": "Jun", "LASTNAME": "Sun", "CONTACT_INFO": "sunjun@email.com", "LOCATION": "Guangzhou", "DEMOGRAPHIC_SEGMENT": "High Income", "AGE": 52, "TOTAL_DONATIONS": 15000}),
        ],
    );

    data.insert(
        "/donations".to_string(),
        vec![
            json!({"DONATION_ID": 1, "DONOR_ID": 4, "AMOUNT": 1000000, "DONATION_DATE": "2024-02-01", "CATEGORY": "Education", "SOURCE": "Wire Transfer", "REQUIRES_TAX_RECEIPT": 1, "IS_IN_EXCHANGE_FOR_GIFT": 0, "DEDUCTIBLE_AMOUNT": 1000000}),
            json!({"DONATION_ID": 2, "DONOR_ID": 3, "AMOUNT": 500000, "DONATION_DATE": "2024-04-01", "CATEGORY": "Education", "SOURCE": "Wire Transfer", "REQUIRES_TAX_RECEIPT": 1, "IS_IN_EXCHANGE_FOR_GIFT": 0, "DEDUCTIBLE_AMOUNT": 500000}),
            json!({"DONATION_ID": 3, "DONOR_ID": 1, "AMOUNT": 200000, "DONATION_DATE": "2024-04-20", "CATEGORY": "Healthcare", "SOURCE": "Online", "REQUIRES_TAX_RECEIPT": 1, "IS_IN_EXCHANGE_FOR_GIFT": 0, "DEDUCTIBLE_AMOUNT": 200000}),
            json!({"DONATION_ID": 4, "DONOR_ID": 1, "AMOUNT": 100000, "DONATION_DATE": "2024-01-15", "CATEGORY": "General Fund", "SOURCE": "Check", "REQUIRES_TAX_RECEIPT": 0, "IS_IN_EXCHANGE_FOR_GIFT": 0}),
            json!({"DONATION_ID": 5, "DONOR_ID": 5, "AMOUNT": 15000, "DONATION_DATE": "2024-03-15", "CATEGORY": "Healthcare", "SOURCE": "Online", "REQUIRES_TAX_RECEIPT": 1, "IS_IN_EXCHANGE_FOR_GIFT": 1, "DEDUCTIBLE_AMOUNT": 12000}),
            json!({"DONATION_ID": 6, "DONOR_ID": 2, "AMOUNT": 8000, "DONATION_DATE": "2024-03-01", "CATEGORY": "Emergency Relief", "SOURCE": "Mail", "REQUIRES_TAX_RECEIPT": 0, "IS_IN_EXCHANGE_FOR_GIFT": 0}),
        ],
    );

    data.insert(
        "/personnel".to_string(),
        vec![
            json!({"PERSONNEL_ID": 1, "FIRSTNAME": "Sarah", "LASTNAME": "Chen", "CONTACT_INFO": "sarah@donorhub.org", "ROLE": "Program Director", "ACCESS_LEVEL": "Admin", "IS_EMPLOYEE": 1, "IS_VOLUNTEER": 0}),
            json!({"PERSONNEL_ID": 2, "FIRSTNAME": "David", "LASTNAME": "Liu", "CONTACT_INFO": "david@donorhub.org", "ROLE": "Coordinator", "ACCESS_LEVEL": "Staff", "IS_EMPLOYEE": 1, "IS_VOLUNTEER": 1}),
            json!({"PERSONNEL_ID": 3, "FIRSTNAME": "Emma", "LASTNAME": "Zhao", "CONTACT_INFO": "emma@volunteer.org", "ROLE": "Event Support", "ACCESS_LEVEL": "Volunteer", "IS_EMPLOYEE": 0, "IS_VOLUNTEER": 1}),
        ],
    );

    data.insert(
        "/schedules".to_string(),
        vec![
            json!({"SCHEDULE_ID": 1, "PERSONNEL_ID": 1, "SCHEDULE_DATE": "2024-05-06", "START_TIME": "09:00", "END_TIME": "17:00", "SCHEDULE_TYPE": "Office", "AVAILABILITY_STATUS": "Available"}),
            json!({"SCHEDULE_ID": 2, "PERSONNEL_ID": 3, "SCHEDULE_DATE": "2024-05-07", "START_TIME": "13:00", "END_TIME": "18:00", "SCHEDULE_TYPE": "Event", "AVAILABILITY_STATUS": "Busy"}),
        ],
    );

    data.insert(
        "/payments".to_string(),
        vec![
            json!({"PAYMENT_ID": 1, "PERSONNEL_ID": 1, "AMOUNT": 5200, "PAYMENT_TYPE": "Salary", "PAYMENT_DATE": "2024-04-30", "IS_EMPLOYEE_PAY": 1}),
            json!({"PAYMENT_ID": 2, "PERSONNEL_ID": 2, "AMOUNT": 3100, "PAYMENT_TYPE": "Salary", "PAYMENT_DATE": "2024-04-30", "IS_EMPLOYEE_PAY": 1}),
            json!({"PAYMENT_ID": 3, "PERSONNEL_ID": 3, "AMOUNT": 120, "PAYMENT_TYPE": "Stipend", "PAYMENT_DATE": "2024-05-02", "IS_EMPLOYEE_PAY": 0}),
        ],
    );

    data.insert(
        "/gift-types".to_string(),
        vec![
            json!({"GIFT_TYPE_ID": 1, "GIFT_NAME": "Tote Bag", "CATEGORY": "Merchandise", "GIFT_VALUE": 12}),
            json!({"GIFT_TYPE_ID": 2, "GIFT_NAME": "Gala Ticket", "CATEGORY": "Event", "GIFT_VALUE": 150}),
            json!({"GIFT_TYPE_ID": 3, "GIFT_NAME": "Thank-you Plaque", "CATEGORY": "Recognition", "GIFT_VALUE": 40}),
        ],
    );

    data.insert(
        "/gift-distributions".to_string(),
        vec![
            json!({"DISTRIBUTION_ID": 1, "GIFT_TYPE_ID": 1, "PERSONNEL_ID": 2, "QUANTITY": 50, "DISTRIBUTION_DATE": "2024-03-20", "IS_FREE": 1}),
            json!({"DISTRIBUTION_ID": 2, "GIFT_TYPE_ID": 2, "PERSONNEL_ID": 1, "QUANTITY": 10, "DISTRIBUTION_DATE": "2024-04-12", "IS_FREE": 0}),
        ],
    );

    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Backend;

    #[tokio::test]
    async fn create_assigns_fresh_ids() {
        let backend = DemoBackend::new();
        let created = backend
            .post("/donors", &json!({"FIRSTNAME": "New", "LASTNAME": "Donor"}))
            .await
            .expect("create");
        assert_eq!(created["DONOR_ID"], 6);

        let listed = backend.get("/donors", &[]).await.expect("list");
        let items = listed["items"].as_array().expect("items");
        assert_eq!(items.len(), 6);
    }

    #[tokio::test]
    async fn update_merges_and_delete_removes() {
        let backend = DemoBackend::new();
        let updated = backend
            .put("/donors", 2, &json!({"LOCATION": "Chengdu"}))
            .await
            .expect("update");
        assert_eq!(updated["LOCATION"], "Chengdu");
        assert_eq!(updated["FIRSTNAME"], "Li");

        backend.delete("/donors", 2).await.expect("delete");
        let missing = backend.put("/donors", 2, &json!({})).await;
        assert_eq!(missing.unwrap_err().status(), Some(404));
    }

    #[tokio::test]
    async fn stats_endpoints_reflect_current_data() {
        let backend = DemoBackend::new();
        let summary = backend.get("/stats/summary", &[]).await.expect("summary");
        assert_eq!(summary["TOTAL_DONORS"], 5);
        assert_eq!(summary["TOTAL_DONATIONS"], 6);

        let monthly = backend.get("/stats/monthly", &[]).await.expect("monthly");
        let months = monthly.as_array().expect("array");
        assert_eq!(months[0]["MONTH"], "2024-01");
        assert_eq!(months.last().unwrap()["MONTH"], "2024-04");
    }
}
