//! Section-to-collection routing. Deliberately thin: it only answers "which
//! collections must be warm before this section renders"; navigation chrome
//! belongs to the front-end.

use std::str::FromStr;

use crate::store::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Dashboard,
    Donors,
    Donations,
    Personnel,
    Schedules,
    Payments,
    Gifts,
    Reports,
    Analytics,
}

impl Section {
    pub const ALL: [Section; 9] = [
        Section::Dashboard,
        Section::Donors,
        Section::Donations,
        Section::Personnel,
        Section::Schedules,
        Section::Payments,
        Section::Gifts,
        Section::Reports,
        Section::Analytics,
    ];

    /// Collections this section needs loaded.
    pub fn collections(&self) -> &'static [Collection] {
        match self {
            Section::Dashboard => &[
                Collection::StatsSummary,
                Collection::StatsMonthly,
                Collection::Donations,
            ],
            Section::Donors => &[Collection::Donors],
            Section::Donations => &[Collection::Donations, Collection::Donors],
            Section::Personnel => &[Collection::Personnel],
            Section::Schedules => &[Collection::Schedules, Collection::Personnel],
            Section::Payments => &[Collection::Payments, Collection::Personnel],
            Section::Gifts => &[Collection::GiftTypes, Collection::GiftDistributions],
            Section::Reports => &[Collection::Donations, Collection::Donors],
            Section::Analytics => &[
                Collection::Donations,
                Collection::Donors,
                Collection::StatsMonthly,
            ],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Section::Dashboard => "dashboard",
            Section::Donors => "donors",
            Section::Donations => "donations",
            Section::Personnel => "personnel",
            Section::Schedules => "schedules",
            Section::Payments => "payments",
            Section::Gifts => "gifts",
            Section::Reports => "reports",
            Section::Analytics => "analytics",
        }
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Section, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|section| section.name() == s.to_lowercase())
            .ok_or_else(|| format!("unknown section '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_parse_by_name() {
        assert_eq!("Donors".parse::<Section>().unwrap(), Section::Donors);
        assert!("unknown".parse::<Section>().is_err());
    }

    #[test]
    fn every_section_names_its_collections() {
        for section in Section::ALL {
            assert!(!section.collections().is_empty(), "{}", section.name());
        }
        assert!(Section::Dashboard
            .collections()
            .contains(&Collection::StatsSummary));
    }
}
