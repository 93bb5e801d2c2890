use super::ui;
use crate::aggregate::MonthlyReport;
use crate::core::{DataFunction, FetchResult};
use comfy_table::Cell;

impl MonthlyReport {
    /// Renders months as rows and fields as columns. Fields missing in a
    /// month are shown as "N/A".
    pub fn display_as_table(&self) -> String {
        if self.is_empty() {
            return ui::style_text("No monthly data", ui::StyleType::Subtle);
        }

        let fields = self.field_names();
        let mut table = ui::new_styled_table();

        let mut header = vec![ui::header_cell("Month")];
        header.extend(fields.iter().map(|field| ui::header_cell(field)));
        table.set_header(header);

        for (month, values) in &self.months {
            let mut row = vec![Cell::new(month.to_string())];
            row.extend(fields.iter().map(|field| {
                ui::format_optional_cell(values.get(*field).copied(), |v| format!("{v:.2}"))
            }));
            table.add_row(row);
        }

        table.to_string()
    }
}

/// Renders one row per requested function with its fetch status.
pub fn display_fetch_table(outcomes: &[(DataFunction, FetchResult)]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Function"),
        ui::header_cell("Status"),
        ui::header_cell("Bytes"),
    ]);

    for (function, outcome) in outcomes {
        let (status, bytes) = match outcome {
            Ok(body) => (ui::status_cell(true, "OK"), Some(body.len())),
            Err(e) => (ui::status_cell(false, &e.to_string()), None),
        };
        table.add_row(vec![
            Cell::new(function.to_string()),
            status,
            ui::format_optional_cell(bytes, |b| b.to_string()),
        ]);
    }

    let failed = outcomes.iter().filter(|(_, outcome)| outcome.is_err()).count();
    let mut output = table.to_string();
    output.push_str(&format!(
        "\n{} {}/{}",
        ui::style_text("Fetched:", ui::StyleType::TotalLabel),
        outcomes.len() - failed,
        outcomes.len()
    ));
    if failed > 0 {
        output.push_str(&format!(
            " {}",
            ui::style_text(&format!("({failed} failed)"), ui::StyleType::Error)
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FetchError;
    use reqwest::StatusCode;

    #[test]
    fn test_monthly_table_contains_all_fields() {
        console::set_colors_enabled(false);
        let report: MonthlyReport = serde_json::from_str(
            r#"{"Monthly Data": {"2023-05": {"4. close": 1.0}, "2023-06": {"5. volume": 136363.64}}}"#,
        )
        .unwrap();

        let output = report.display_as_table();
        assert!(output.contains("2023-05"));
        assert!(output.contains("2023-06"));
        assert!(output.contains("4. close"));
        assert!(output.contains("136363.64"));
        assert!(output.contains("N/A"));
    }

    #[test]
    fn test_empty_monthly_table() {
        console::set_colors_enabled(false);
        assert_eq!(MonthlyReport::default().display_as_table(), "No monthly data");
    }

    #[test]
    fn test_fetch_table_counts_failures() {
        console::set_colors_enabled(false);
        let outcomes: Vec<(DataFunction, FetchResult)> = vec![
            (DataFunction::Overview, Ok("{}".to_string())),
            (
                DataFunction::Earnings,
                Err(FetchError::Status {
                    function: DataFunction::Earnings,
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                }),
            ),
        ];

        let output = display_fetch_table(&outcomes);
        assert!(output.contains("OVERVIEW"));
        assert!(output.contains("EARNINGS"));
        assert!(output.contains("Fetched: 1/2"));
        assert!(output.contains("(1 failed)"));
    }
}
