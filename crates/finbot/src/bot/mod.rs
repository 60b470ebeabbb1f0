//! Finance report bot
//!
//! This module ties the menu controller to the per-user session store.
//!
//! # Flow
//!
//! - **`/start`**: the user gets the list of companies
//! - **Company button**: the company is remembered and the metric menu shown
//! - **Metric button**: table, chart and the metric menu again
//! - **Restart / Quit**: back to the company list, or forget the company
//!
//! # Example
//!
//! ```rust,ignore
//! use finbot::bot::{BotService, Event};
//!
//! let service = BotService::from_config(&config)?;
//! let reply = service.dispatch("42", Event::Start).await?;
//! ```

pub mod controller;
pub mod events;

use crate::chart::ChartRenderer;
use crate::config::BotConfig;
use crate::data::{DatasetSource, WorkbookSource};
use crate::error::{FinbotError, Result};
use crate::interface::{Reply, Session, SessionStore};
use std::sync::Arc;

pub use controller::{MenuController, metric_menu, notice_for, texts};
pub use events::{Button, Event, MAX_PAYLOAD_BYTES};

/// Menu controller plus the sessions it works on
#[derive(Clone)]
pub struct BotService {
    controller: Arc<MenuController>,
    sessions: SessionStore,
}

impl BotService {
    pub fn new(controller: MenuController) -> Self {
        Self {
            controller: Arc::new(controller),
            sessions: SessionStore::new(),
        }
    }

    /// Build from a dataset source
    pub fn with_source(source: Arc<dyn DatasetSource>, renderer: ChartRenderer) -> Result<Self> {
        Ok(Self::new(MenuController::new(source, renderer)?))
    }

    /// Build from configuration, reading datasets from the configured workbook
    pub fn from_config(config: &BotConfig) -> Result<Self> {
        let source = WorkbookSource::new(&config.workbook_path);
        tracing::info!(path = %config.workbook_path.display(), "opening workbook");
        Self::with_source(
            Arc::new(source),
            ChartRenderer::new(config.chart_width, config.chart_height),
        )
    }

    pub fn controller(&self) -> &MenuController {
        &self.controller
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle one event for one user
    ///
    /// The user's session stays locked until the reply is built, so events
    /// from the same user are handled one at a time. Dataset loading and chart
    /// drawing run on the blocking pool.
    pub async fn dispatch(&self, user_id: &str, event: Event) -> Result<Reply> {
        let mut session = self.sessions.lock(user_id).await;
        let controller = Arc::clone(&self.controller);

        tracing::debug!(user_id, %event, state = %session.state(), "dispatching event");
        let (reply, _session) = tokio::task::spawn_blocking(move || {
            let reply = controller.handle(&event, &mut session);
            (reply, session)
        })
        .await
        .map_err(|e| FinbotError::Other(format!("event handler panicked: {e}")))?;

        Ok(reply)
    }

    /// Current session of a user
    pub async fn session(&self, user_id: &str) -> Session {
        self.sessions.get(user_id).await
    }

    /// Drop a user's session entirely
    pub fn forget(&self, user_id: &str) -> bool {
        self.sessions.clear(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Cell, InMemorySource, Metric, Table};
    use crate::interface::Outbound;

    fn service() -> BotService {
        let table = Table::new(
            ["Месяц", "Доход", "Расход", "Прибыль", "КПН"]
                .map(String::from)
                .to_vec(),
            vec![
                vec![
                    Cell::from("Январь"),
                    Cell::from(10.0),
                    Cell::from(4.0),
                    Cell::from(6.0),
                    Cell::from(1.0),
                ],
                vec![
                    Cell::from("Февраль"),
                    Cell::from(12.0),
                    Cell::from(5.0),
                    Cell::from(7.0),
                    Cell::from(1.2),
                ],
            ],
        );
        let source = InMemorySource::new().with_dataset("Acme", table);
        BotService::with_source(Arc::new(source), ChartRenderer::default()).unwrap()
    }

    #[tokio::test]
    async fn test_full_conversation() {
        let service = service();

        let reply = service.dispatch("u1", Event::Start).await.unwrap();
        assert_eq!(reply.kinds(), vec!["menu"]);

        service
            .dispatch("u1", Event::DatasetChosen("Acme".to_string()))
            .await
            .unwrap();
        assert_eq!(
            service.session("u1").await.selected_dataset.as_deref(),
            Some("Acme")
        );

        let reply = service
            .dispatch("u1", Event::MetricChosen(Metric::Expense))
            .await
            .unwrap();
        assert_eq!(reply.kinds(), vec!["text", "image", "menu"]);

        let reply = service.dispatch("u1", Event::Quit).await.unwrap();
        assert_eq!(reply, Reply::notice(texts::GOODBYE));
        assert_eq!(service.session("u1").await, Session::default());

        let reply = service
            .dispatch("u1", Event::MetricChosen(Metric::Expense))
            .await
            .unwrap();
        assert_eq!(reply, Reply::notice(texts::PICK_DATASET_FIRST));
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let service = service();
        service
            .dispatch("a", Event::DatasetChosen("Acme".to_string()))
            .await
            .unwrap();

        let reply = service
            .dispatch("b", Event::MetricChosen(Metric::Income))
            .await
            .unwrap();
        assert_eq!(reply, Reply::notice(texts::PICK_DATASET_FIRST));

        let reply = service
            .dispatch("a", Event::MetricChosen(Metric::Income))
            .await
            .unwrap();
        assert!(matches!(reply.messages[0], Outbound::Text(_)));
    }

    #[tokio::test]
    async fn test_concurrent_events_same_user() {
        let service = service();
        service
            .dispatch("u1", Event::DatasetChosen("Acme".to_string()))
            .await
            .unwrap();

        let handles: Vec<_> = Metric::ALL
            .into_iter()
            .map(|metric| {
                let service = service.clone();
                tokio::spawn(async move { service.dispatch("u1", Event::MetricChosen(metric)).await })
            })
            .collect();

        for handle in handles {
            let reply = handle.await.unwrap().unwrap();
            assert_eq!(reply.kinds(), vec!["text", "image", "menu"]);
        }
    }

    #[tokio::test]
    async fn test_forget() {
        let service = service();
        service.dispatch("u1", Event::Start).await.unwrap();
        assert!(service.forget("u1"));
        assert!(service.sessions().is_empty());
    }

    #[test]
    fn test_from_config_missing_workbook() {
        let config = BotConfig::builder()
            .workbook_path("/nonexistent/book.xlsx")
            .build()
            .unwrap();
        assert!(matches!(
            BotService::from_config(&config),
            Err(FinbotError::Workbook(_))
        ));
    }

    #[tokio::test]
    async fn test_workbook_conversation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("companies.xlsx");
        crate::data::source::testing::write_workbook(&path).unwrap();
        let config = BotConfig::builder().workbook_path(&path).build().unwrap();
        let service = BotService::from_config(&config).unwrap();

        let reply = service.dispatch("u1", Event::Start).await.unwrap();
        let Outbound::Menu(menu) = &reply.messages[0] else {
            panic!("expected the dataset menu, got {reply:?}");
        };
        let labels: Vec<_> = menu.options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["Acme", "Beta"]);

        let event = Event::decode(&menu.options[0].payload, service.controller().datasets()).unwrap();
        service.dispatch("u1", event).await.unwrap();
        let reply = service
            .dispatch("u1", Event::MetricChosen(Metric::Income))
            .await
            .unwrap();
        assert_eq!(reply.kinds(), vec!["text", "image", "menu"]);
        let Outbound::Text(table) = &reply.messages[0] else {
            panic!("expected the report table");
        };
        assert!(table.contains("2023-01-01"));
        assert!(table.contains("650.5"));

        service
            .dispatch("u1", Event::DatasetChosen("Beta".to_string()))
            .await
            .unwrap();
        let reply = service
            .dispatch("u1", Event::MetricChosen(Metric::Income))
            .await
            .unwrap();
        assert_eq!(reply, Reply::notice(texts::NO_DATA));
    }
}
