/// Split a space-separated foreground label field into labels.
///
/// An absent, empty or whitespace-only field yields no labels.
pub fn parse_labels(field: Option<&str>) -> Vec<String> {
    field
        .map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}
