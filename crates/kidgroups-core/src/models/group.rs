use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Columns requested for every group row
pub const GROUP_COLUMNS: &str = "id,name,year_start,year_end,study_start_date,study_end_date";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(deserialize_with = "crate::models::group::id_as_string")]
    pub id: String,
    pub name: String,
    pub year_start: i32,
    pub year_end: i32,
    #[serde(default)]
    pub study_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub study_end_date: Option<NaiveDate>,
}

impl Group {
    /// Display label, e.g. `Сонечко (2024–2025)`
    pub fn label(&self) -> String {
        format!("{} ({}–{})", self.name, self.year_start, self.year_end)
    }

    /// Academic year key used by the management year filter, e.g. `2024-2025`
    pub fn year_key(&self) -> String {
        format!("{}-{}", self.year_start, self.year_end)
    }
}

/// Group fields that passed client-side validation.
/// Serializes to the argument names of `groups_create` / `groups_update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupDraft {
    #[serde(rename = "p_name")]
    pub name: String,
    #[serde(rename = "p_year_start")]
    pub year_start: i32,
    #[serde(rename = "p_year_end")]
    pub year_end: i32,
    #[serde(rename = "p_study_start_date")]
    pub study_start_date: Option<NaiveDate>,
    #[serde(rename = "p_study_end_date")]
    pub study_end_date: Option<NaiveDate>,
}

/// Row ids arrive as strings (uuid) or numbers (bigint) depending on the table.
pub(crate) fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}
