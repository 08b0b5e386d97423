use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

use super::app::DashboardApp;

const POLL_TIMEOUT: Duration = Duration::from_millis(250);

pub fn handle_events(app: &mut DashboardApp) -> io::Result<()> {
    if event::poll(POLL_TIMEOUT)? {
        if let Event::Key(key_event) = event::read()? {
            handle_key_event(app, key_event);
        }
    }
    Ok(())
}

fn handle_key_event(app: &mut DashboardApp, key: KeyEvent) {
    if key.kind != event::KeyEventKind::Press {
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.should_quit = true;
        }
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }
        KeyCode::Char('i') | KeyCode::Enter => {
            app.request_issue();
        }
        KeyCode::Char('e') => {
            app.toggle_environment();
        }
        KeyCode::Char('r') => {
            app.revoke();
        }
        KeyCode::Up => app.scroll_logs_back(1),
        KeyCode::Down => app.scroll_logs_forward(1),
        KeyCode::PageUp => app.scroll_logs_back(10),
        KeyCode::PageDown => app.scroll_logs_forward(10),
        KeyCode::Home => app.scroll_logs_to_oldest(),
        KeyCode::End => app.follow_logs(),
        _ => {}
    }
}
