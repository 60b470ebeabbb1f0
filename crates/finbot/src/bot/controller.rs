//! Menu state machine
//!
//! The controller reads and writes the caller's [`Session`] but never keeps
//! it. A reply is either a menu transition or, for a metric, the full
//! table, chart and follow-up menu; failures produce one notice and leave
//! the session as it was.

use crate::bot::events::{Button, Event};
use crate::chart::ChartRenderer;
use crate::data::{DataResolver, DatasetSource, Metric, MetricSeries};
use crate::error::{FinbotError, Result};
use crate::interface::formatter::format_report;
use crate::interface::message::{Menu, MenuOption, Outbound, Reply};
use crate::interface::session::{MenuState, Session};
use std::sync::Arc;

/// Fixed user-facing texts
pub mod texts {
    pub const PICK_DATASET: &str = "Выберите компанию:";
    pub const PICK_METRIC: &str = "Выберите тип данных:";
    pub const WHAT_NEXT: &str = "Что вы хотите сделать дальше?";
    pub const RESTART_LABEL: &str = "🔄 Restart";
    pub const QUIT_LABEL: &str = "❌ Quit";
    pub const GOODBYE: &str = "Бот завершил работу. Для перезапуска введите /start.";
    pub const NO_DATA: &str = "Не удалось найти данные для компании.";
    pub const UNKNOWN_DATASET: &str = "Компания не найдена. Для перезапуска введите /start.";
    pub const PICK_DATASET_FIRST: &str =
        "Сначала выберите компанию. Для перезапуска введите /start.";
    pub const CHART_FAILED: &str = "Не удалось построить график.";
    pub const INTERNAL: &str = "Произошла ошибка. Для перезапуска введите /start.";
}

/// Interprets events against a session and produces replies
pub struct MenuController {
    datasets: Vec<String>,
    resolver: DataResolver,
    renderer: ChartRenderer,
}

impl MenuController {
    /// Create a controller; the dataset list is read once here
    pub fn new(source: Arc<dyn DatasetSource>, renderer: ChartRenderer) -> Result<Self> {
        let datasets = source.dataset_names()?;
        tracing::info!(count = datasets.len(), "loaded dataset catalog");
        Ok(Self {
            datasets,
            resolver: DataResolver::new(source),
            renderer,
        })
    }

    pub fn datasets(&self) -> &[String] {
        &self.datasets
    }

    pub fn is_known(&self, dataset: &str) -> bool {
        self.datasets.iter().any(|d| d == dataset)
    }

    /// Handle an event, turning every failure into a single notice
    pub fn handle(&self, event: &Event, session: &mut Session) -> Reply {
        match self.try_handle(event, session) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(%event, state = %session.state(), "event rejected: {e}");
                Reply::notice(notice_for(&e))
            }
        }
    }

    /// Handle an event, reporting failures as errors
    pub fn try_handle(&self, event: &Event, session: &mut Session) -> Result<Reply> {
        match event {
            Event::Start => Ok(Reply::single(Outbound::Menu(self.dataset_menu(false)))),
            Event::Restart => Ok(Reply::single(Outbound::Menu(self.dataset_menu(true)))),
            Event::DatasetChosen(name) => {
                if !self.is_known(name) {
                    return Err(FinbotError::UnknownDataset(name.clone()));
                }
                session.selected_dataset = Some(name.clone());
                tracing::info!(dataset = %name, "dataset selected");
                Ok(Reply::single(Outbound::Menu(metric_menu(
                    format!("Компания: {name}\n{}", texts::PICK_METRIC),
                    true,
                ))))
            }
            Event::MetricChosen(metric) => {
                let Some(dataset) = session.selected_dataset.as_deref() else {
                    return Err(FinbotError::InvalidTransition {
                        state: MenuState::AwaitingDataset.to_string(),
                        event: event.to_string(),
                    });
                };
                self.report(dataset, *metric)
            }
            Event::Quit => {
                session.clear();
                tracing::info!("session ended");
                Ok(Reply::notice(texts::GOODBYE))
            }
        }
    }

    /// Table, chart and follow-up menu for one metric
    fn report(&self, dataset: &str, metric: Metric) -> Result<Reply> {
        let series: MetricSeries = self.resolver.resolve(dataset, metric)?;
        let table = format_report(&series);
        let image = self.renderer.render(&series, metric.token())?;

        tracing::info!(dataset, %metric, points = series.len(), "report built");
        Ok(Reply::new(vec![
            Outbound::Text(table),
            Outbound::Image(image),
            Outbound::Menu(metric_menu(texts::WHAT_NEXT, false)),
        ]))
    }

    /// One option per dataset, in source order
    pub fn dataset_menu(&self, replace: bool) -> Menu {
        Menu {
            caption: texts::PICK_DATASET.to_string(),
            options: self
                .datasets
                .iter()
                .enumerate()
                .map(|(index, name)| {
                    MenuOption::new(name.clone(), Button::Dataset(index).payload())
                })
                .collect(),
            replace,
        }
    }
}

/// The four metrics followed by restart and quit
pub fn metric_menu(caption: impl Into<String>, replace: bool) -> Menu {
    let mut options: Vec<MenuOption> = Metric::ALL
        .into_iter()
        .map(|metric| MenuOption::new(metric.token(), Button::Metric(metric).payload()))
        .collect();
    options.push(MenuOption::new(texts::RESTART_LABEL, Button::Restart.payload()));
    options.push(MenuOption::new(texts::QUIT_LABEL, Button::Quit.payload()));

    Menu {
        caption: caption.into(),
        options,
        replace,
    }
}

/// User-facing notice for a failed event
pub fn notice_for(error: &FinbotError) -> &'static str {
    match error {
        FinbotError::UnknownDataset(_) => texts::UNKNOWN_DATASET,
        FinbotError::ColumnResolution { .. } => texts::NO_DATA,
        FinbotError::InvalidTransition { .. } => texts::PICK_DATASET_FIRST,
        FinbotError::Chart(_) => texts::CHART_FAILED,
        _ => texts::INTERNAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::testing::MockSource;
    use crate::data::{Cell, InMemorySource, Table};

    const MONTHS: [&str; 12] = [
        "Январь", "Февраль", "Март", "Апрель", "Май", "Июнь", "Июль", "Август", "Сентябрь",
        "Октябрь", "Ноябрь", "Декабрь",
    ];

    fn acme() -> Table {
        Table::new(
            ["Месяц", "Доход(2023)", "Расход(2023)", "Прибыль(2023)", "КПН(2023)"]
                .map(String::from)
                .to_vec(),
            MONTHS
                .iter()
                .enumerate()
                .map(|(i, m)| {
                    let income = 100.0 + i as f64 * 10.0;
                    vec![
                        Cell::from(*m),
                        Cell::from(income),
                        Cell::from(income / 2.0),
                        Cell::from(income / 2.0),
                        Cell::from(income / 20.0),
                    ]
                })
                .collect(),
        )
    }

    fn beta() -> Table {
        let mut table = acme();
        table.headers[3] = "Итог(2023)".to_string();
        table
    }

    fn controller() -> MenuController {
        let source = InMemorySource::new()
            .with_dataset("Acme", acme())
            .with_dataset("Beta", beta());
        MenuController::new(Arc::new(source), ChartRenderer::default()).unwrap()
    }

    fn menu(reply: &Reply, idx: usize) -> &Menu {
        match &reply.messages[idx] {
            Outbound::Menu(menu) => menu,
            other => panic!("expected menu, got {other:?}"),
        }
    }

    #[test]
    fn test_start_shows_datasets() {
        let controller = controller();
        let mut session = Session::with_dataset("Acme");
        let reply = controller.try_handle(&Event::Start, &mut session).unwrap();

        let menu = menu(&reply, 0);
        assert_eq!(menu.caption, texts::PICK_DATASET);
        assert!(!menu.replace);
        let labels: Vec<_> = menu.options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["Acme", "Beta"]);
        assert_eq!(menu.options[0].payload, "dataset:0");
        assert_eq!(menu.options[1].payload, "dataset:1");
        // start does not drop the selection
        assert_eq!(session, Session::with_dataset("Acme"));
    }

    #[test]
    fn test_restart_matches_start() {
        let controller = controller();
        let mut session = Session::default();
        let start = controller.try_handle(&Event::Start, &mut session).unwrap();
        let restart = controller.try_handle(&Event::Restart, &mut session).unwrap();
        assert_eq!(menu(&start, 0).options, menu(&restart, 0).options);
        assert!(menu(&restart, 0).replace);
    }

    #[test]
    fn test_dataset_choice_is_idempotent() {
        let controller = controller();
        let event = Event::DatasetChosen("Acme".to_string());

        let mut fresh = Session::default();
        let mut other = Session::with_dataset("Beta");
        let first = controller.try_handle(&event, &mut fresh).unwrap();
        let second = controller.try_handle(&event, &mut other).unwrap();
        let again = controller.try_handle(&event, &mut fresh).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, again);
        assert_eq!(fresh.selected_dataset.as_deref(), Some("Acme"));
        assert_eq!(other.selected_dataset.as_deref(), Some("Acme"));

        let menu = menu(&first, 0);
        assert_eq!(menu.caption, "Компания: Acme\nВыберите тип данных:");
        let labels: Vec<_> = menu.options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Доход", "Расход", "Прибыль", "КПН", "🔄 Restart", "❌ Quit"]
        );
    }

    #[test]
    fn test_long_cyrillic_sheet_name_fits_button() {
        // Worksheet names are capped at 31 characters
        let name = "ТОО Казахстанская Торговая Комп";
        assert_eq!(name.chars().count(), 31);

        let source = InMemorySource::new()
            .with_dataset("Acme", acme())
            .with_dataset(name, acme());
        let controller = MenuController::new(Arc::new(source), ChartRenderer::default()).unwrap();

        let menu = controller.dataset_menu(false);
        for option in &menu.options {
            assert!(option.payload.len() <= crate::bot::MAX_PAYLOAD_BYTES, "{}", option.payload);
        }
        assert_eq!(
            Event::decode(&menu.options[1].payload, controller.datasets()).unwrap(),
            Event::DatasetChosen(name.to_string())
        );
        for option in &metric_menu(texts::WHAT_NEXT, false).options {
            assert!(option.payload.len() <= crate::bot::MAX_PAYLOAD_BYTES);
        }
    }

    #[test]
    fn test_unknown_dataset() {
        let controller = controller();
        let mut session = Session::with_dataset("Acme");
        let event = Event::DatasetChosen("Gamma".to_string());

        assert!(matches!(
            controller.try_handle(&event, &mut session),
            Err(FinbotError::UnknownDataset(_))
        ));
        assert_eq!(
            controller.handle(&event, &mut session),
            Reply::notice(texts::UNKNOWN_DATASET)
        );
        assert_eq!(session, Session::with_dataset("Acme"));
    }

    #[test]
    fn test_metric_report_order() {
        let controller = controller();
        let mut session = Session::with_dataset("Acme");
        let reply = controller
            .try_handle(&Event::MetricChosen(Metric::Income), &mut session)
            .unwrap();

        assert_eq!(reply.kinds(), vec!["text", "image", "menu"]);

        let Outbound::Text(table) = &reply.messages[0] else {
            panic!("expected table text");
        };
        assert!(table.starts_with("Компания: Acme\nТип данных: Доход\n\n"));
        // header + 12 months after the two caption lines and blank line
        assert_eq!(table.lines().count(), 3 + 1 + 12);
        for (i, month) in MONTHS.iter().enumerate() {
            let value = (100.0 + i as f64 * 10.0).to_string();
            assert!(
                table.lines().any(|l| l.contains(month) && l.ends_with(&value)),
                "{month} {value}"
            );
        }

        let Outbound::Image(image) = &reply.messages[1] else {
            panic!("expected chart");
        };
        assert_eq!(image.mime_type, crate::chart::CHART_MIME);

        let menu = menu(&reply, 2);
        assert_eq!(menu.caption, texts::WHAT_NEXT);
        assert!(!menu.replace);
        assert_eq!(session, Session::with_dataset("Acme"));
    }

    #[test]
    fn test_missing_column_single_notice() {
        let controller = controller();
        let mut session = Session::with_dataset("Beta");

        for metric in Metric::ALL {
            let event = Event::MetricChosen(metric);
            assert!(matches!(
                controller.try_handle(&event, &mut session),
                Err(FinbotError::ColumnResolution { .. })
            ));
            let reply = controller.handle(&event, &mut session);
            assert_eq!(reply, Reply::notice(texts::NO_DATA));
        }
        assert_eq!(session, Session::with_dataset("Beta"));
    }

    #[test]
    fn test_metric_without_dataset_is_invalid() {
        let controller = controller();
        let mut session = Session::with_dataset("Acme");

        let reply = controller.try_handle(&Event::Quit, &mut session).unwrap();
        assert_eq!(reply, Reply::notice(texts::GOODBYE));
        assert_eq!(session.state(), MenuState::AwaitingDataset);

        let event = Event::MetricChosen(Metric::Tax);
        assert!(matches!(
            controller.try_handle(&event, &mut session),
            Err(FinbotError::InvalidTransition { .. })
        ));
        assert_eq!(
            controller.handle(&event, &mut session),
            Reply::notice(texts::PICK_DATASET_FIRST)
        );
    }

    #[test]
    fn test_source_failure_is_no_data() {
        let mut source = MockSource::new();
        source
            .expect_dataset_names()
            .returning(|| Ok(vec!["Acme".to_string()]));
        source
            .expect_load()
            .times(1)
            .returning(|_| Err(FinbotError::Workbook("file vanished".to_string())));

        let controller = MenuController::new(Arc::new(source), ChartRenderer::default()).unwrap();
        let mut session = Session::with_dataset("Acme");
        let reply = controller.handle(&Event::MetricChosen(Metric::Profit), &mut session);
        assert_eq!(reply, Reply::notice(texts::NO_DATA));
    }

    #[test]
    fn test_catalog_failure() {
        let mut source = MockSource::new();
        source
            .expect_dataset_names()
            .returning(|| Err(FinbotError::Workbook("missing".to_string())));

        assert!(MenuController::new(Arc::new(source), ChartRenderer::default()).is_err());
    }

    #[test]
    fn test_empty_sheet_reports_chart_failure() {
        let empty = Table::new(acme().headers, vec![]);
        let source = InMemorySource::new().with_dataset("Empty", empty);
        let controller = MenuController::new(Arc::new(source), ChartRenderer::default()).unwrap();

        let mut session = Session::with_dataset("Empty");
        let reply = controller.handle(&Event::MetricChosen(Metric::Income), &mut session);
        assert_eq!(reply, Reply::notice(texts::CHART_FAILED));
    }
}
