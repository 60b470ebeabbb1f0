//! Table text formatting

use crate::data::{MONTH_COLUMN, MetricSeries};
use comfy_table::presets::NOTHING;
use comfy_table::{CellAlignment, ContentArrangement, Table};

/// Text for a missing value
pub const GAP: &str = "NaN";

/// Format a value exactly as read from the sheet
pub fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| GAP.to_string(), |v| v.to_string())
}

/// Fixed-width two column table: month and the source column
pub fn format_table(series: &MetricSeries) -> String {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Disabled)
        .set_header(vec![MONTH_COLUMN, series.column.as_str()]);

    for point in &series.points {
        table.add_row(vec![point.month.clone(), format_value(point.value)]);
    }

    for idx in 0..2 {
        if let Some(column) = table.column_mut(idx) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }

    table
        .lines()
        .map(|line| line.trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Message carrying the table for one dataset and metric
pub fn format_report(series: &MetricSeries) -> String {
    format!(
        "Компания: {}\nТип данных: {}\n\n{}",
        series.dataset,
        series.metric,
        format_table(series)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Metric, MetricPoint};

    fn series() -> MetricSeries {
        MetricSeries {
            dataset: "Acme".to_string(),
            metric: Metric::Profit,
            column: "Прибыль(2023)".to_string(),
            points: vec![
                MetricPoint {
                    month: "Январь".to_string(),
                    value: Some(1500000.0),
                },
                MetricPoint {
                    month: "Февраль".to_string(),
                    value: Some(-20.25),
                },
                MetricPoint {
                    month: "Март".to_string(),
                    value: None,
                },
            ],
        }
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(Some(1500000.0)), "1500000");
        assert_eq!(format_value(Some(0.1)), "0.1");
        assert_eq!(format_value(None), "NaN");
    }

    #[test]
    fn test_table_reproduces_values() {
        let text = format_table(&series());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("Месяц") && lines[0].contains("Прибыль(2023)"));
        assert!(lines[1].ends_with("1500000"));
        assert!(lines[2].ends_with("-20.25"));
        assert!(lines[3].ends_with("NaN"));
    }

    #[test]
    fn test_table_is_fixed_width() {
        let text = format_table(&series());
        let widths: Vec<usize> = text.lines().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "{widths:?}");
    }

    #[test]
    fn test_report_header() {
        let text = format_report(&series());
        assert!(text.starts_with("Компания: Acme\nТип данных: Прибыль\n\n"));
    }
}
