use thiserror::Error;

/// Client-side checks that fail before any gateway call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Choose the group to move children from")]
    NoSourceGroup,

    #[error("Choose the group to move children to")]
    NoTargetGroup,

    #[error("Source and target group must differ")]
    SameGroup,

    #[error("No children selected")]
    NothingSelected,

    #[error("Group name is required")]
    NameRequired,

    #[error("Start and end year are required")]
    YearRequired,

    #[error("Not a valid year: {0}")]
    InvalidYear(String),

    #[error("End year cannot be earlier than start year")]
    YearOrder,

    #[error("{field}: not a valid date (expected YYYY-MM-DD): {value}")]
    InvalidDate { field: &'static str, value: String },

    #[error("Study end date cannot be earlier than study start date")]
    DateOrder,
}
