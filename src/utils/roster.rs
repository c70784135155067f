use serde::{Deserialize, Serialize};
use validator::Validate;

/// One roster line as supplied by the operator, before validation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RosterRow {
    #[validate(length(min = 1, message = "Candidate name cannot be empty"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub phone: Option<String>,
    pub college: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedRow {
    pub line: usize,
    pub email: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ParsedRoster {
    pub rows: Vec<RosterRow>,
    pub skipped: Vec<SkippedRow>,
}

/// Validates roster rows and deduplicates them by email (case-insensitive).
/// Invalid rows are reported individually; valid rows always survive.
pub fn validate_rows(rows: Vec<RosterRow>, known_emails: &[String]) -> ParsedRoster {
    let mut seen: std::collections::HashSet<String> =
        known_emails.iter().map(|e| e.to_lowercase()).collect();
    let mut out = ParsedRoster::default();

    for (idx, raw) in rows.into_iter().enumerate() {
        let line = idx + 1;
        let row = RosterRow {
            name: raw.name.trim().to_string(),
            email: raw.email.trim().to_string(),
            phone: raw.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            college: raw
                .college
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        };

        if let Err(errors) = row.validate() {
            out.skipped.push(SkippedRow {
                line,
                email: row.email.clone(),
                reason: flatten_errors(&errors),
            });
            continue;
        }

        let key = row.email.to_lowercase();
        if !seen.insert(key) {
            out.skipped.push(SkippedRow {
                line,
                email: row.email.clone(),
                reason: "duplicate email".to_string(),
            });
            continue;
        }

        out.rows.push(row);
    }

    out
}

/// Parses a CSV roster upload: `name,email,phone,college` with a header line.
pub fn parse_csv(data: &[u8]) -> crate::error::Result<Vec<RosterRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(RosterRow {
            name: record.get(0).unwrap_or("").to_string(),
            email: record.get(1).unwrap_or("").to_string(),
            phone: record.get(2).map(|s| s.to_string()).filter(|s| !s.is_empty()),
            college: record.get(3).map(|s| s.to_string()).filter(|s| !s.is_empty()),
        });
    }
    Ok(rows)
}

fn flatten_errors(errors: &validator::ValidationErrors) -> String {
    let mut parts: Vec<String> = Vec::new();
    for (field, errs) in errors.field_errors() {
        for err in errs {
            let msg = err
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| err.code.to_string());
            parts.push(format!("{}: {}", field, msg));
        }
    }
    parts.sort();
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, email: &str) -> RosterRow {
        RosterRow {
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            college: None,
        }
    }

    #[test]
    fn malformed_emails_are_skipped_and_reported() {
        let mut rows: Vec<RosterRow> = (0..97)
            .map(|i| row(&format!("Candidate {}", i), &format!("c{}@example.com", i)))
            .collect();
        rows.push(row("Bad One", "not-an-email"));
        rows.push(row("Bad Two", "also@nothing@"));
        rows.push(row("Bad Three", ""));

        let parsed = validate_rows(rows, &[]);
        assert_eq!(parsed.rows.len(), 97);
        assert_eq!(parsed.skipped.len(), 3);
        assert!(parsed.skipped.iter().all(|s| s.reason.contains("email")));
    }

    #[test]
    fn duplicate_emails_within_batch_are_skipped() {
        let rows = vec![
            row("A", "same@example.com"),
            row("B", "SAME@example.com"),
            row("C", "other@example.com"),
        ];
        let parsed = validate_rows(rows, &[]);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].reason, "duplicate email");
        assert_eq!(parsed.skipped[0].line, 2);
    }

    #[test]
    fn emails_already_in_session_are_skipped() {
        let rows = vec![row("A", "known@example.com"), row("B", "new@example.com")];
        let parsed = validate_rows(rows, &["known@example.com".to_string()]);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].email, "new@example.com");
        assert_eq!(parsed.skipped.len(), 1);
    }

    #[test]
    fn fields_are_trimmed_and_blanks_dropped() {
        let rows = vec![RosterRow {
            name: "  Alice  ".to_string(),
            email: " alice@example.com ".to_string(),
            phone: Some("  ".to_string()),
            college: Some(" MIT ".to_string()),
        }];
        let parsed = validate_rows(rows, &[]);
        assert_eq!(parsed.rows[0].name, "Alice");
        assert_eq!(parsed.rows[0].email, "alice@example.com");
        assert_eq!(parsed.rows[0].phone, None);
        assert_eq!(parsed.rows[0].college.as_deref(), Some("MIT"));
    }

    #[test]
    fn csv_roster_parses_with_header() {
        let data = b"name,email,phone,college\nAlice,alice@example.com,555-0100,MIT\nBob,bob@example.com,,\n";
        let rows = parse_csv(data).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Alice");
        assert_eq!(rows[0].phone.as_deref(), Some("555-0100"));
        assert_eq!(rows[1].college, None);
    }
}
