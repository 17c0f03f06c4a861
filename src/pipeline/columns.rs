// src/pipeline/columns.rs

/// Display label -> physical column(s) in the enrollments table.
///
/// There is no stored total column; totals are derived from the three age
/// columns at evaluation time.
pub const COLUMN_MAPPING: &[(&str, &[&str])] = &[
    ("Age Groups (All)", &["age_0_5", "age_5_18", "age_18_plus"]),
    ("Age 0-5 (Children)", &["age_0_5"]),
    ("Age 5-18 (Youth)", &["age_5_18"]),
    ("Age 18+ (Adults)", &["age_18_plus"]),
    ("Record Info", &["record_date", "updated_at"]),
];

/// Physical columns for a display label; unknown labels map to nothing.
pub fn columns_for_label(label: &str) -> &'static [&'static str] {
    COLUMN_MAPPING
        .iter()
        .find(|(display, _)| *display == label)
        .map(|(_, cols)| *cols)
        .unwrap_or(&[])
}

/// Reverse lookup: the first label that includes `column`, or the column itself.
pub fn display_name(column: &str) -> &str {
    COLUMN_MAPPING
        .iter()
        .find(|(_, cols)| cols.contains(&column))
        .map(|(display, _)| *display)
        .unwrap_or(column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_expand_to_columns() {
        assert_eq!(
            columns_for_label("Age Groups (All)"),
            &["age_0_5", "age_5_18", "age_18_plus"]
        );
        assert!(columns_for_label("Shoe Size").is_empty());
    }

    #[test]
    fn reverse_lookup_prefers_first_label() {
        assert_eq!(display_name("age_0_5"), "Age Groups (All)");
        assert_eq!(display_name("updated_at"), "Record Info");
        assert_eq!(display_name("pincode"), "pincode");
    }
}
