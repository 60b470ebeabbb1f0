//! Metric resolution
//!
//! A dataset answers metric queries only when every one of the four metric
//! tokens matches a column. A worksheet missing its tax column therefore
//! cannot serve income either.

use crate::data::source::DatasetSource;
use crate::data::table::Table;
use crate::error::{FinbotError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Header of the month column
pub const MONTH_COLUMN: &str = "Месяц";

/// The four metrics a dataset exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    Income,
    Expense,
    Profit,
    Tax,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Income, Metric::Expense, Metric::Profit, Metric::Tax];

    /// Token used both as the menu caption and to find the column
    pub fn token(self) -> &'static str {
        match self {
            Metric::Income => "Доход",
            Metric::Expense => "Расход",
            Metric::Profit => "Прибыль",
            Metric::Tax => "КПН",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.token() == token)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Column indices for the month and each metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub month: usize,
    pub income: usize,
    pub expense: usize,
    pub profit: usize,
    pub tax: usize,
}

impl ColumnMap {
    /// Resolve all columns of `table` or fail as a whole
    pub fn resolve(dataset: &str, table: &Table) -> Result<Self> {
        let month = table.column_exact(MONTH_COLUMN).ok_or_else(|| {
            FinbotError::column(dataset, format!("no '{MONTH_COLUMN}' column"))
        })?;

        let find = |metric: Metric| {
            let matches = table
                .headers
                .iter()
                .filter(|h| h.contains(metric.token()))
                .count();
            if matches > 1 {
                tracing::debug!(dataset, %metric, matches, "several columns match, using the first");
            }
            table.column_containing(metric.token()).ok_or_else(|| {
                FinbotError::column(dataset, format!("no column matches {metric}"))
            })
        };

        Ok(Self {
            month,
            income: find(Metric::Income)?,
            expense: find(Metric::Expense)?,
            profit: find(Metric::Profit)?,
            tax: find(Metric::Tax)?,
        })
    }

    pub fn column(&self, metric: Metric) -> usize {
        match metric {
            Metric::Income => self.income,
            Metric::Expense => self.expense,
            Metric::Profit => self.profit,
            Metric::Tax => self.tax,
        }
    }
}

/// One month's value; `None` is a gap in the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub month: String,
    pub value: Option<f64>,
}

/// A metric across months, in worksheet row order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub dataset: String,
    pub metric: Metric,
    /// Header of the source column the values came from
    pub column: String,
    pub points: Vec<MetricPoint>,
}

impl MetricSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn months(&self) -> impl Iterator<Item = &str> {
        self.points.iter().map(|p| p.month.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.points.iter().map(|p| p.value)
    }
}

/// Build the series for `metric` from an already loaded table
pub fn extract_series(dataset: &str, table: &Table, metric: Metric) -> Result<MetricSeries> {
    let columns = ColumnMap::resolve(dataset, table)?;
    tracing::debug!(dataset, ?columns, "resolved columns");

    let col = columns.column(metric);
    let points = (0..table.row_count())
        .map(|row| -> Result<MetricPoint> {
            let value = table.cell(row, col).numeric().map_err(|reason| {
                FinbotError::column(dataset, format!("row {}: {reason}", row + 2))
            })?;
            Ok(MetricPoint {
                month: table.cell(row, columns.month).label(),
                value,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(MetricSeries {
        dataset: dataset.to_string(),
        metric,
        column: table.headers[col].clone(),
        points,
    })
}

/// Looks up metric series in a dataset source
#[derive(Clone)]
pub struct DataResolver {
    source: Arc<dyn DatasetSource>,
}

impl DataResolver {
    pub fn new(source: Arc<dyn DatasetSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn DatasetSource> {
        &self.source
    }

    /// Resolve `metric` for `dataset`
    ///
    /// Any failure to produce a full series is reported as
    /// [`FinbotError::ColumnResolution`], except an unknown dataset name.
    pub fn resolve(&self, dataset: &str, metric: Metric) -> Result<MetricSeries> {
        let table = self.source.load(dataset).map_err(|e| match e {
            FinbotError::UnknownDataset(_) | FinbotError::ColumnResolution { .. } => e,
            other => FinbotError::column(dataset, other.to_string()),
        })?;
        extract_series(dataset, &table, metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::InMemorySource;
    use crate::data::table::Cell;

    const MONTHS: [&str; 12] = [
        "Январь", "Февраль", "Март", "Апрель", "Май", "Июнь", "Июль", "Август", "Сентябрь",
        "Октябрь", "Ноябрь", "Декабрь",
    ];

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    fn acme() -> Table {
        let rows = MONTHS
            .iter()
            .enumerate()
            .map(|(i, month)| {
                let income = 1000.0 * (i as f64 + 1.0);
                vec![
                    Cell::from(*month),
                    Cell::from(income),
                    Cell::from(income * 0.6),
                    Cell::from(income * 0.4),
                    Cell::from(income * 0.04),
                ]
            })
            .collect();
        Table::new(
            headers(&["Месяц", "Доход(2023)", "Расход(2023)", "Прибыль(2023)", "КПН(2023)"]),
            rows,
        )
    }

    fn beta() -> Table {
        Table::new(
            headers(&["Месяц", "Доход(2023)", "Расход(2023)", "КПН(2023)"]),
            vec![vec![
                Cell::from("Январь"),
                Cell::from(1.0),
                Cell::from(2.0),
                Cell::from(3.0),
            ]],
        )
    }

    fn resolver() -> DataResolver {
        let source = InMemorySource::new()
            .with_dataset("Acme", acme())
            .with_dataset("Beta", beta());
        DataResolver::new(Arc::new(source))
    }

    #[test]
    fn test_metric_tokens() {
        assert_eq!(Metric::from_token("Прибыль"), Some(Metric::Profit));
        assert_eq!(Metric::from_token("прибыль"), None);
        assert_eq!(Metric::Tax.to_string(), "КПН");
    }

    #[test]
    fn test_resolve_preserves_rows() {
        let table = acme();
        let series = resolver().resolve("Acme", Metric::Income).unwrap();

        assert_eq!(series.len(), table.row_count());
        assert_eq!(series.column, "Доход(2023)");
        assert_eq!(series.months().collect::<Vec<_>>(), MONTHS.to_vec());
        for (row, value) in series.values().enumerate() {
            assert_eq!(Cell::Number(value.unwrap()), *table.cell(row, 1));
        }
    }

    #[test]
    fn test_resolve_each_metric_column() {
        let resolver = resolver();
        for (metric, col) in Metric::ALL.into_iter().zip(1..) {
            let series = resolver.resolve("Acme", metric).unwrap();
            assert_eq!(series.column, acme().headers[col]);
            assert_eq!(series.metric, metric);
        }
    }

    #[test]
    fn test_missing_column_fails_every_metric() {
        let resolver = resolver();
        for metric in Metric::ALL {
            let err = resolver.resolve("Beta", metric).unwrap_err();
            assert!(
                matches!(err, FinbotError::ColumnResolution { ref dataset, .. } if dataset == "Beta"),
                "{metric}: {err}"
            );
        }
    }

    #[test]
    fn test_first_matching_column_wins() {
        let table = Table::new(
            headers(&["Месяц", "Доход план", "Доход факт", "Расход", "Прибыль", "КПН"]),
            vec![vec![
                Cell::from("Январь"),
                Cell::from(1.0),
                Cell::from(2.0),
                Cell::from(3.0),
                Cell::from(4.0),
                Cell::from(5.0),
            ]],
        );
        let series = extract_series("Plan", &table, Metric::Income).unwrap();
        assert_eq!(series.column, "Доход план");
        assert_eq!(series.points[0].value, Some(1.0));
    }

    #[test]
    fn test_missing_month_column() {
        let mut table = acme();
        table.headers[0] = "Период".to_string();
        assert!(matches!(
            extract_series("Acme", &table, Metric::Tax),
            Err(FinbotError::ColumnResolution { .. })
        ));
    }

    #[test]
    fn test_gaps_pass_through() {
        let mut table = acme();
        table.rows[3][1] = Cell::Empty;
        let series = extract_series("Acme", &table, Metric::Income).unwrap();
        assert_eq!(series.len(), 12);
        assert_eq!(series.points[3].value, None);
        assert_eq!(series.points[4].value, Some(5000.0));
    }

    #[test]
    fn test_non_numeric_value() {
        let mut table = acme();
        table.rows[0][2] = Cell::from("много");
        let err = extract_series("Acme", &table, Metric::Expense).unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_unknown_dataset() {
        assert!(matches!(
            resolver().resolve("Gamma", Metric::Income),
            Err(FinbotError::UnknownDataset(_))
        ));
    }
}
