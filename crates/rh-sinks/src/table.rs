use colored::Colorize;

use rh_types::Headers;

/// Two-column `Header | Value` table, rows sorted by header name.
///
/// Returns an empty string when there are no headers.
pub fn header_table(headers: &Headers) -> String {
    let rows = headers.sorted();
    if rows.is_empty() {
        return String::new();
    }

    let name_width = rows
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Header".len());

    let mut out = format!(
        "{} {} {}",
        format!("{:<name_width$}", "Header").bold(),
        "|".bright_black(),
        "Value".bold()
    );
    for (name, value) in rows {
        out.push('\n');
        out.push_str(&format!(
            "{:<name_width$} {} {}",
            name,
            "|".bright_black(),
            value
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_sorted_with_joined_values() {
        colored::control::set_override(false);
        let headers: Headers = [("hello", "world"), ("foo", "bar"), ("hello", "foobar")]
            .into_iter()
            .collect();

        let table = header_table(&headers);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Header | Value");
        assert_eq!(lines[1], "foo    | bar");
        assert_eq!(lines[2], "hello  | world,foobar");
    }

    #[test]
    fn wide_names_widen_first_column() {
        colored::control::set_override(false);
        let headers: Headers = [("content-type", "text/plain")].into_iter().collect();
        let table = header_table(&headers);
        assert!(table.starts_with("Header       | Value"));
        assert!(table.ends_with("content-type | text/plain"));
    }

    #[test]
    fn empty_headers_empty_table() {
        assert_eq!(header_table(&Headers::new()), "");
    }
}
