use chrono::{DateTime, NaiveDate, Utc};

/// Format a date the way the kindergarten staff read it: `dd.mm.yyyy`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Case-insensitive substring match; an empty needle matches everything
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Human-readable age of a timestamp for the status bar
pub fn age_display(since: DateTime<Utc>) -> String {
    let minutes = (Utc::now() - since).num_minutes();
    if minutes < 1 {
        // Also covers clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        format!("{}h ago", (minutes + 30) / 60)
    } else {
        format!("{}d ago", (minutes + 720) / 1440)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2019, 3, 9).unwrap();
        assert_eq!(format_date(date), "09.03.2019");
    }

    #[test]
    fn test_contains_ignore_case() {
        assert!(contains_ignore_case("Сонечко (2024–2025)", "сонеч"));
        assert!(contains_ignore_case("Ромашка (2023–2024)", "2023"));
        assert!(contains_ignore_case("anything", ""));
        assert!(contains_ignore_case("anything", "   "));
        assert!(!contains_ignore_case("Ромашка", "бджілка"));
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Сонечко", 5), "Со...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
    }

    #[test]
    fn test_age_display() {
        assert_eq!(age_display(Utc::now()), "just now");
        assert_eq!(age_display(Utc::now() - Duration::minutes(5)), "5m ago");
        assert_eq!(age_display(Utc::now() - Duration::minutes(95)), "2h ago");
        assert_eq!(age_display(Utc::now() - Duration::days(3)), "3d ago");
        assert_eq!(age_display(Utc::now() + Duration::minutes(10)), "just now");
    }
}
