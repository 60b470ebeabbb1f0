//! Dataset access and metric resolution

pub mod resolver;
pub mod source;
pub mod table;

pub use resolver::{ColumnMap, DataResolver, MONTH_COLUMN, Metric, MetricPoint, MetricSeries};
pub use source::{DatasetSource, InMemorySource, WorkbookSource};
pub use table::{Cell, Table};
