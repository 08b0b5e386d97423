use chrono::{Local, Utc};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::Frame;

use super::app::DashboardApp;
use super::widgets;

pub fn render(frame: &mut Frame, app: &DashboardApp) {
    let size = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(8),
            Constraint::Length(10),
            Constraint::Length(1),
        ])
        .split(size);

    frame.render_widget(widgets::render_header(), chunks[0]);
    render_connection(frame, app, chunks[1]);
    render_token(frame, app, chunks[2]);
    render_log_panel(frame, app, chunks[3]);
    frame.render_widget(widgets::render_footer(Local::now()), chunks[4]);
}

fn render_connection(frame: &mut Frame, app: &DashboardApp, area: Rect) {
    let panel = widgets::render_connection_panel(
        app.manager.environment(),
        &app.manager.base_url(),
        &app.status,
    );
    frame.render_widget(panel, area);
}

fn render_token(frame: &mut Frame, app: &DashboardApp, area: Rect) {
    let info = app.manager.current_info();
    let panel = widgets::render_token_panel(&info, app.manager.expires_at(), Utc::now());
    frame.render_widget(panel, area);
}

fn render_log_panel(frame: &mut Frame, app: &DashboardApp, area: Rect) {
    // Copy out so the lock is not held while drawing
    let log_entries: Vec<_> = match app.log_buffer.lock() {
        Ok(logs) => logs.iter().cloned().collect(),
        Err(_) => Vec::new(),
    };

    let rows = area.height.saturating_sub(2) as usize;
    let log_panel = widgets::render_log_panel(&log_entries, app.log_scroll, rows);
    frame.render_widget(log_panel, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::app::tests::{create_test_app, push_logs};
    use crate::dashboard::app::LogEntry;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use tokio::runtime::Handle;

    fn screen_text(app: &DashboardApp) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();

        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[tokio::test]
    async fn test_renders_empty_state() {
        let app = create_test_app(Handle::current());
        let text = screen_text(&app);

        assert!(text.contains("Environment: mock"));
        assert!(text.contains("https://mockapi.kiwoom.com"));
        assert!(text.contains("No token has been issued."));
        assert!(text.contains("Not connected"));
    }

    #[tokio::test]
    async fn test_renders_issued_token() {
        let app = create_test_app(Handle::current());
        app.manager.issue().await.unwrap();
        let text = screen_text(&app);

        assert!(text.contains("Token type: bearer"));
        assert!(text.contains("Expires:    2999-12-31 23:59:59"));
        assert!(text.contains("Valid"));
        assert!(text.contains("abc"));
    }

    #[tokio::test]
    async fn test_log_panel_shows_newest_entry() {
        let app = create_test_app(Handle::current());
        push_logs(&app, 20);
        let text = screen_text(&app);

        assert!(text.contains("entry-19"));
        assert!(text.contains("entry-12"));
        assert!(!text.contains("entry-00"));
    }

    #[tokio::test]
    async fn test_log_panel_keeps_following_new_entries() {
        let app = create_test_app(Handle::current());
        push_logs(&app, 8);
        assert!(screen_text(&app).contains("entry-07"));

        app.log_buffer.lock().unwrap().push_back(LogEntry {
            timestamp: Local::now(),
            level: tracing::Level::INFO,
            message: "newest-line".to_string(),
        });
        assert!(screen_text(&app).contains("newest-line"));
    }

    #[tokio::test]
    async fn test_scrolled_back_log_panel_stops_following() {
        let mut app = create_test_app(Handle::current());
        push_logs(&app, 20);
        app.scroll_logs_back(5);
        let text = screen_text(&app);

        assert!(text.contains("entry-07"));
        assert!(text.contains("entry-14"));
        assert!(!text.contains("entry-19"));
        assert!(text.contains("End to follow"));
    }
}
