use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::group::id_as_string;
use crate::utils::format_date;

/// Columns requested from the `children_current_groups` view
pub const ROSTER_COLUMNS: &str = "child_id,group_id,last_name,first_name,middle_name,birth_date";

/// A child together with the group currently holding it.
/// Read-only here; membership changes go through `transfer_child_to_group`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    #[serde(deserialize_with = "id_as_string")]
    pub child_id: String,
    #[serde(deserialize_with = "id_as_string")]
    pub group_id: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

impl RosterEntry {
    /// Last, first and middle name joined by spaces, skipping blank parts
    pub fn full_name(&self) -> String {
        [&self.last_name, &self.first_name, &self.middle_name]
            .iter()
            .filter_map(|part| part.as_deref())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// List label: `Шевченко Тарас Григорович · 09.03.2019`
    pub fn label(&self) -> String {
        let date = self.birth_date.map(format_date).unwrap_or_default();
        format!("{} · {}", self.full_name(), date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(last: &str, first: &str, middle: Option<&str>) -> RosterEntry {
        RosterEntry {
            child_id: "c1".to_string(),
            group_id: "g1".to_string(),
            last_name: Some(last.to_string()),
            first_name: Some(first.to_string()),
            middle_name: middle.map(str::to_string),
            birth_date: NaiveDate::from_ymd_opt(2019, 3, 9),
        }
    }

    #[test]
    fn test_label_with_all_name_parts() {
        let child = entry("Шевченко", "Тарас", Some("Григорович"));
        assert_eq!(child.label(), "Шевченко Тарас Григорович · 09.03.2019");
    }

    #[test]
    fn test_full_name_skips_blank_middle_name() {
        let child = entry("Шевченко", "Тарас", Some("  "));
        assert_eq!(child.full_name(), "Шевченко Тарас");
    }

    #[test]
    fn test_label_without_birth_date() {
        let mut child = entry("Коваль", "Олена", None);
        child.birth_date = None;
        assert_eq!(child.label(), "Коваль Олена · ");
    }

    #[test]
    fn test_parse_view_row() {
        let json = r#"{"child_id":17,"group_id":"g-2","last_name":"Коваль","first_name":"Олена","middle_name":null,"birth_date":"2020-01-31"}"#;
        let child: RosterEntry = serde_json::from_str(json).expect("roster row");
        assert_eq!(child.child_id, "17");
        assert_eq!(child.group_id, "g-2");
        assert_eq!(child.birth_date, NaiveDate::from_ymd_opt(2020, 1, 31));
    }
}
