use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::auth::{IssueSuccess, TokenManager};
use crate::error::Result;

/// Log entry for dashboard display
#[derive(Clone, Debug)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: tracing::Level,
    pub message: String,
}

/// Outcome of the last issuance, as shown in the connection panel
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    Idle,
    Issuing,
    Connected,
    Failed(String),
}

/// Dashboard application state
pub struct DashboardApp {
    /// Shared token manager
    pub manager: Arc<TokenManager>,
    /// Log buffer for display
    pub log_buffer: Arc<Mutex<VecDeque<LogEntry>>>,
    /// Last issuance outcome
    pub status: ConnectionStatus,
    /// Should quit flag
    pub should_quit: bool,
    /// Lines scrolled back from the newest log entry; 0 follows the tail
    pub log_scroll: usize,
    /// Runtime that runs issuance off the UI loop
    runtime: Handle,
    outcome_tx: mpsc::UnboundedSender<Result<IssueSuccess>>,
    outcome_rx: mpsc::UnboundedReceiver<Result<IssueSuccess>>,
}

impl DashboardApp {
    /// Create a new dashboard application
    pub fn new(
        manager: Arc<TokenManager>,
        log_buffer: Arc<Mutex<VecDeque<LogEntry>>>,
        runtime: Handle,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            manager,
            log_buffer,
            status: ConnectionStatus::Idle,
            should_quit: false,
            log_scroll: 0,
            runtime,
            outcome_tx,
            outcome_rx,
        }
    }

    pub fn is_issuing(&self) -> bool {
        self.status == ConnectionStatus::Issuing
    }

    /// Start an issuance on the runtime; the result arrives via `poll_outcomes`
    pub fn request_issue(&mut self) {
        if self.is_issuing() {
            return;
        }

        self.status = ConnectionStatus::Issuing;
        tracing::info!("Requesting a new access token...");

        let manager = Arc::clone(&self.manager);
        let tx = self.outcome_tx.clone();
        self.runtime.spawn(async move {
            let outcome = manager.issue().await;
            // Receiver gone means the dashboard already quit
            let _ = tx.send(outcome);
        });
    }

    /// Apply finished issuances to the UI state
    pub fn poll_outcomes(&mut self) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            match outcome {
                Ok(_) => {
                    tracing::info!("✓ Access token issued");
                    self.status = ConnectionStatus::Connected;
                }
                Err(e) => {
                    tracing::error!("✗ Access token issuance failed: {}", e);
                    self.status = ConnectionStatus::Failed(e.to_string());
                }
            }
        }
    }

    /// Flip between mock and production for the next issuance
    pub fn toggle_environment(&mut self) {
        let next = self.manager.environment().toggled();
        self.manager.set_environment(next);
    }

    /// Scroll the log panel towards older entries, leaving tail-follow
    pub fn scroll_logs_back(&mut self, lines: usize) {
        let limit = self.log_len().saturating_sub(1);
        self.log_scroll = self.log_scroll.saturating_add(lines).min(limit);
    }

    /// Scroll towards newer entries; reaching the bottom resumes tail-follow
    pub fn scroll_logs_forward(&mut self, lines: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(lines);
    }

    pub fn scroll_logs_to_oldest(&mut self) {
        self.log_scroll = self.log_len().saturating_sub(1);
    }

    pub fn follow_logs(&mut self) {
        self.log_scroll = 0;
    }

    pub fn is_following_logs(&self) -> bool {
        self.log_scroll == 0
    }

    fn log_len(&self) -> usize {
        self.log_buffer.lock().map(|logs| logs.len()).unwrap_or(0)
    }

    /// Drop the held token locally
    pub fn revoke(&mut self) {
        self.manager.revoke();
        if !self.is_issuing() {
            self.status = ConnectionStatus::Idle;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::{
        Credentials, Endpoints, Environment, SystemClock, TokenRequest, TokenTransport,
        TransportResponse,
    };
    use crate::error::{TokenError, TransportErrorKind};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Answers every request with the same status and body
    pub(crate) struct CannedTransport {
        pub status: u16,
        pub body: String,
    }

    #[async_trait]
    impl TokenTransport for CannedTransport {
        async fn post_json(
            &self,
            _url: &str,
            _body: &TokenRequest<'_>,
        ) -> Result<TransportResponse> {
            if self.status == 0 {
                return Err(TokenError::transport(
                    TransportErrorKind::Timeout,
                    "operation timed out",
                ));
            }
            Ok(TransportResponse {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    pub(crate) fn test_manager(status: u16, body: &str) -> Arc<TokenManager> {
        Arc::new(TokenManager::with_parts(
            Credentials::new("appkey", "secretkey"),
            Environment::Mock,
            Endpoints::default(),
            Arc::new(CannedTransport {
                status,
                body: body.to_string(),
            }),
            Arc::new(SystemClock),
        ))
    }

    pub(crate) fn create_test_app(runtime: Handle) -> DashboardApp {
        DashboardApp::new(
            test_manager(200, r#"{"token":"abc","token_type":"bearer","expires_dt":"29991231235959"}"#),
            Arc::new(Mutex::new(VecDeque::new())),
            runtime,
        )
    }

    pub(crate) fn push_logs(app: &DashboardApp, count: usize) {
        let mut logs = app.log_buffer.lock().unwrap();
        for i in 0..count {
            logs.push_back(LogEntry {
                timestamp: Local::now(),
                level: tracing::Level::INFO,
                message: format!("entry-{:02}", i),
            });
        }
    }

    async fn wait_for_outcome(app: &mut DashboardApp) {
        for _ in 0..200 {
            app.poll_outcomes();
            if !app.is_issuing() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("issuance did not finish");
    }

    #[tokio::test]
    async fn test_issue_marshals_success_back() {
        let mut app = create_test_app(Handle::current());
        assert_eq!(app.status, ConnectionStatus::Idle);

        app.request_issue();
        assert!(app.is_issuing());

        wait_for_outcome(&mut app).await;
        assert_eq!(app.status, ConnectionStatus::Connected);
        assert!(app.manager.is_valid());
    }

    #[tokio::test]
    async fn test_issue_marshals_failure_back() {
        let mut app = DashboardApp::new(
            test_manager(0, ""),
            Arc::new(Mutex::new(VecDeque::new())),
            Handle::current(),
        );

        app.request_issue();
        wait_for_outcome(&mut app).await;

        match &app.status {
            ConnectionStatus::Failed(message) => assert!(message.contains("timeout")),
            other => panic!("unexpected status: {:?}", other),
        }
        assert!(!app.manager.is_valid());
    }

    #[tokio::test]
    async fn test_toggle_environment() {
        let mut app = create_test_app(Handle::current());
        assert_eq!(app.manager.environment(), Environment::Mock);

        app.toggle_environment();
        assert_eq!(app.manager.environment(), Environment::Production);
        assert_eq!(app.manager.base_url(), "https://api.kiwoom.com");

        app.toggle_environment();
        assert_eq!(app.manager.environment(), Environment::Mock);
    }

    #[tokio::test]
    async fn test_revoke_resets_status() {
        let mut app = create_test_app(Handle::current());
        app.request_issue();
        wait_for_outcome(&mut app).await;
        assert!(app.manager.is_valid());

        app.revoke();
        assert_eq!(app.status, ConnectionStatus::Idle);
        assert!(!app.manager.is_valid());
        assert_eq!(app.manager.current_info().token, "");
    }

    #[tokio::test]
    async fn test_log_scroll_clamps_to_buffer() {
        let mut app = create_test_app(Handle::current());
        assert!(app.is_following_logs());

        // Nothing to scroll back through yet
        app.scroll_logs_back(3);
        assert!(app.is_following_logs());

        push_logs(&app, 5);
        app.scroll_logs_back(100);
        assert_eq!(app.log_scroll, 4);

        app.scroll_logs_forward(2);
        assert_eq!(app.log_scroll, 2);
        assert!(!app.is_following_logs());

        app.scroll_logs_forward(10);
        assert!(app.is_following_logs());

        app.scroll_logs_to_oldest();
        assert_eq!(app.log_scroll, 4);
        app.follow_logs();
        assert!(app.is_following_logs());
    }
}
