use crate::error::Result;
use crate::models::drive_candidate::DriveCandidate;
use crate::models::drive_session::DriveSession;
use rust_xlsxwriter::*;

pub struct ExportService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "csv" => Some(ExportFormat::Csv),
            "xlsx" => Some(ExportFormat::Xlsx),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

impl ExportService {
    /// Plain CSV snapshot of a drive's candidates.
    pub fn generate_candidates_csv(candidates: &[DriveCandidate]) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            "name",
            "email",
            "phone",
            "college",
            "status",
            "current_round",
            "aptitude_score",
            "technical_score",
            "qualification",
            "interview_scheduled",
        ])?;

        for c in candidates {
            writer.write_record([
                c.name.as_str(),
                c.email.as_str(),
                c.phone.as_deref().unwrap_or(""),
                c.college.as_deref().unwrap_or(""),
                c.registration_status.as_str(),
                &c.current_round.to_string(),
                &c.aptitude_score.map(|s| s.to_string()).unwrap_or_default(),
                &c.technical_score.map(|s| s.to_string()).unwrap_or_default(),
                c.qualification_status.as_str(),
                if c.interview_scheduled { "yes" } else { "no" },
            ])?;
        }

        writer
            .into_inner()
            .map_err(|e| crate::error::Error::Internal(format!("CSV buffer error: {}", e)))
    }

    /// Styled XLSX workbook for a drive's candidates.
    pub fn generate_candidates_xlsx(
        drive: &DriveSession,
        candidates: &[DriveCandidate],
    ) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Candidates")?;

        let header_bg = Color::RGB(0x0F172A);
        let header_text = Color::White;
        let alt_row = Color::RGB(0xF8FAFC);
        let border_color = Color::RGB(0xE2E8F0);
        let qualified_color = Color::RGB(0x10B981);
        let unqualified_color = Color::RGB(0xEF4444);
        let pending_color = Color::RGB(0x64748B);

        let columns = [
            ("#", 6.0),
            ("Name", 28.0),
            ("Email", 30.0),
            ("Phone", 16.0),
            ("College", 24.0),
            ("Status", 22.0),
            ("Round", 8.0),
            ("Aptitude", 10.0),
            ("Technical", 10.0),
            ("Qualification", 14.0),
            ("Interview", 10.0),
        ];

        for (i, (_, width)) in columns.iter().enumerate() {
            worksheet.set_column_width(i as u16, *width)?;
        }

        let title_format = Format::new()
            .set_font_size(14)
            .set_bold()
            .set_font_color(header_text)
            .set_background_color(header_bg)
            .set_align(FormatAlign::CenterAcross)
            .set_align(FormatAlign::VerticalCenter);
        worksheet.set_row_height(0, 30)?;
        let title = format!(
            "{} — exported {} ({} candidates)",
            drive.name,
            chrono::Utc::now().format("%d.%m.%Y %H:%M UTC"),
            candidates.len()
        );
        worksheet.merge_range(0, 0, 0, (columns.len() - 1) as u16, &title, &title_format)?;

        let header_format = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(header_text)
            .set_background_color(header_bg)
            .set_align(FormatAlign::Center)
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);
        for (i, (name, _)) in columns.iter().enumerate() {
            worksheet.write_string_with_format(1, i as u16, *name, &header_format)?;
        }

        for (idx, c) in candidates.iter().enumerate() {
            let row = 2 + idx as u32;
            let bg = if idx % 2 == 0 { alt_row } else { Color::White };
            let base_fmt = Format::new()
                .set_font_size(10)
                .set_background_color(bg)
                .set_border(FormatBorder::Thin)
                .set_border_color(border_color);
            let center_fmt = base_fmt.clone().set_align(FormatAlign::Center);

            worksheet.write_number_with_format(row, 0, (idx + 1) as f64, &center_fmt)?;
            worksheet.write_string_with_format(row, 1, &c.name, &base_fmt)?;
            worksheet.write_string_with_format(row, 2, &c.email, &base_fmt)?;
            worksheet.write_string_with_format(
                row,
                3,
                c.phone.as_deref().unwrap_or("—"),
                &base_fmt,
            )?;
            worksheet.write_string_with_format(
                row,
                4,
                c.college.as_deref().unwrap_or("—"),
                &base_fmt,
            )?;
            worksheet.write_string_with_format(row, 5, &c.registration_status, &center_fmt)?;
            worksheet.write_number_with_format(row, 6, c.current_round as f64, &center_fmt)?;

            for (col, score) in [(7u16, c.aptitude_score), (8u16, c.technical_score)] {
                match score {
                    Some(s) => {
                        worksheet.write_number_with_format(row, col, s as f64, &center_fmt)?
                    }
                    None => worksheet.write_string_with_format(row, col, "—", &center_fmt)?,
                };
            }

            let q_color = match c.qualification_status.as_str() {
                "qualified" => qualified_color,
                "not_qualified" => unqualified_color,
                _ => pending_color,
            };
            let q_fmt = Format::new()
                .set_font_size(10)
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(q_color)
                .set_align(FormatAlign::Center)
                .set_border(FormatBorder::Thin)
                .set_border_color(border_color);
            worksheet.write_string_with_format(row, 9, &c.qualification_status, &q_fmt)?;
            worksheet.write_string_with_format(
                row,
                10,
                if c.interview_scheduled { "yes" } else { "no" },
                &center_fmt,
            )?;
        }

        worksheet.set_freeze_panes(2, 0)?;
        if !candidates.is_empty() {
            worksheet.autofilter(
                1,
                0,
                1 + candidates.len() as u32,
                (columns.len() - 1) as u16,
            )?;
        }

        let buffer = workbook.save_to_buffer()?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn candidate(name: &str, email: &str) -> DriveCandidate {
        DriveCandidate {
            id: Uuid::new_v4(),
            drive_session_id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            phone: None,
            college: Some("MIT".into()),
            registration_token: "tok".into(),
            registration_status: "aptitude_completed".into(),
            aptitude_score: Some(72),
            technical_score: None,
            current_round: 2,
            qualification_status: "qualified".into(),
            interview_scheduled: false,
            screening_notified: false,
            last_notified_round: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn csv_contains_header_and_one_line_per_candidate() {
        let rows = vec![
            candidate("Alice", "alice@example.com"),
            candidate("Bob", "bob@example.com"),
        ];
        let bytes = ExportService::generate_candidates_csv(&rows).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.trim_end().lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("name,email"));
        assert!(lines[1].contains("alice@example.com"));
        assert!(lines[1].contains("72"));
    }

    #[test]
    fn format_parsing() {
        assert_eq!(ExportFormat::parse("csv"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::parse("xlsx"), Some(ExportFormat::Xlsx));
        assert_eq!(ExportFormat::parse("pdf"), None);
        assert_eq!(ExportFormat::Csv.extension(), "csv");
    }
}
