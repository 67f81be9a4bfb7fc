//! CSV exports for the reports section. Written by hand; the fields are few
//! and the quoting rules are small.

use std::collections::BTreeSet;

use crate::models::{donor_display_name, Donation, Donor};

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        let escaped = s.replace('"', "\"\"");
        format!("\"{}\"", escaped)
    } else {
        s.to_string()
    }
}

/// Donation export, donor names resolved against the cached donor list.
pub fn donations_csv(donations: &[Donation], donors: &[Donor]) -> String {
    let mut w = String::new();
    w.push_str("donation_id,donor,amount,date,category,source,deductible_amount,requires_tax_receipt\n");
    for d in donations {
        let donor = donor_display_name(donors, d.donor_id);
        let amount = d
            .amount
            .map(|a| format!("{:.2}", a))
            .unwrap_or_default();
        let date = d
            .date
            .map(|day| day.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let deductible = d
            .deductible_amount
            .map(|a| format!("{:.2}", a))
            .unwrap_or_default();
        w.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            d.id,
            csv_escape(&donor),
            csv_escape(&amount),
            csv_escape(&date),
            csv_escape(d.category.as_deref().unwrap_or("")),
            csv_escape(d.source.as_deref().unwrap_or("")),
            csv_escape(&deductible),
            if d.requires_tax_receipt { 1 } else { 0 },
        ));
    }
    w
}

pub fn donors_csv(donors: &[Donor]) -> String {
    let mut w = String::new();
    w.push_str("donor_id,name,contact_info,location,segment,level,total_donations\n");
    for d in donors {
        let total = d
            .total_donations
            .map(|t| format!("{:.2}", t))
            .unwrap_or_default();
        w.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            d.id,
            csv_escape(&d.display_name()),
            csv_escape(d.contact_info.as_deref().unwrap_or("")),
            csv_escape(d.location.as_deref().unwrap_or("")),
            csv_escape(d.demographic_segment.as_deref().unwrap_or("")),
            d.level().as_str(),
            csv_escape(&total),
        ));
    }
    w
}

/// Distinct calendar years present in the data, newest first.
pub fn available_years(donations: &[Donation]) -> Vec<i32> {
    let mut year_set: BTreeSet<i32> = BTreeSet::new();
    for d in donations {
        if let Some(date) = d.date {
            year_set.insert(chrono::Datelike::year(&date));
        }
    }
    let mut years: Vec<i32> = year_set.into_iter().collect();
    years.reverse();
    years
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn donor(id: i64, first: &str, last: &str) -> Donor {
        Donor {
            id,
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            contact_info: None,
            location: None,
            demographic_segment: None,
            age: None,
            tax_id_number: None,
            tax_jurisdiction: None,
            total_donations: None,
        }
    }

    fn donation(id: i64, donor_id: Option<i64>, amount: i64, date: &str) -> Donation {
        Donation {
            id,
            donor_id,
            amount: Some(Decimal::from(amount)),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
            category: Some("Education".to_string()),
            source: None,
            is_in_exchange_for_gift: false,
            requires_tax_receipt: true,
            deductible_amount: None,
        }
    }

    #[test]
    fn escaping_quotes_commas_and_quotes() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn donations_csv_resolves_donor_names() {
        let donors = vec![donor(1, "Ming", "Zhang")];
        let donations = vec![
            donation(10, Some(1), 500, "2024-02-01"),
            donation(11, Some(99), 25, "2023-11-05"),
        ];
        let csv = donations_csv(&donations, &donors);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("Ming Zhang"));
        assert!(lines[1].contains("500.00"));
        // Dangling donor id degrades to the placeholder, never an error.
        assert!(lines[2].contains("Anonymous"));
    }

    #[test]
    fn years_are_distinct_and_newest_first() {
        let donations = vec![
            donation(1, None, 5, "2023-01-01"),
            donation(2, None, 5, "2024-06-01"),
            donation(3, None, 5, "2023-09-09"),
        ];
        assert_eq!(available_years(&donations), vec![2024, 2023]);
    }
}
