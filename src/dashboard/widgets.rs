use std::ops::Range;

use chrono::{DateTime, Local, Utc};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};

use super::app::{ConnectionStatus, LogEntry};
use crate::auth::{format_expires_dt, Environment, TokenInfo};

const LABEL: Style = Style::new().fg(Color::Gray);

pub fn render_header() -> Paragraph<'static> {
    let text = Line::from(vec![
        Span::styled(
            "Kiwoom REST API Token Manager",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL))
        .centered()
}

pub fn render_connection_panel(
    environment: Environment,
    base_url: &str,
    status: &ConnectionStatus,
) -> Paragraph<'static> {
    let env_color = match environment {
        Environment::Production => Color::Red,
        Environment::Mock => Color::Yellow,
    };

    let (status_text, status_color) = match status {
        ConnectionStatus::Idle => ("Not connected".to_string(), Color::Gray),
        ConnectionStatus::Issuing => ("Issuing...".to_string(), Color::Yellow),
        ConnectionStatus::Connected => ("Connected".to_string(), Color::Green),
        ConnectionStatus::Failed(message) => (format!("Failed: {}", message), Color::Red),
    };

    let text = vec![
        Line::from(vec![
            Span::styled("Environment: ", LABEL),
            Span::styled(
                environment.as_str().to_string(),
                Style::default().fg(env_color).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Server:      ", LABEL),
            Span::raw(base_url.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Status:      ", LABEL),
            Span::styled(status_text, Style::default().fg(status_color)),
        ]),
    ];

    Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Connection"))
        .wrap(Wrap { trim: true })
}

pub fn render_token_panel(
    info: &TokenInfo,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Paragraph<'static> {
    let dash = || "-".to_string();

    let token_type = if info.token_type.is_empty() {
        dash()
    } else {
        info.token_type.clone()
    };

    let expires = if info.expires.is_empty() {
        dash()
    } else {
        format_expires_dt(&info.expires)
    };

    let (validity, validity_color) = if info.is_valid {
        let remaining = expires_at
            .map(|at| format!(" ({} left)", format_remaining(at - now)))
            .unwrap_or_default();
        (format!("Valid{}", remaining), Color::Green)
    } else if info.token.is_empty() {
        ("No token".to_string(), Color::Gray)
    } else {
        ("Expired".to_string(), Color::Red)
    };

    let token_line = if info.token.is_empty() {
        Line::from(Span::styled(
            "No token has been issued.",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(Span::raw(info.token.clone()))
    };

    let text = vec![
        Line::from(vec![
            Span::styled("Token type: ", LABEL),
            Span::raw(token_type),
        ]),
        Line::from(vec![Span::styled("Expires:    ", LABEL), Span::raw(expires)]),
        Line::from(vec![
            Span::styled("Validity:   ", LABEL),
            Span::styled(
                validity,
                Style::default()
                    .fg(validity_color)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        token_line,
    ];

    Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Access Token"))
        .wrap(Wrap { trim: false })
}

pub fn render_log_panel(logs: &[LogEntry], scroll: usize, rows: usize) -> List<'static> {
    let items: Vec<ListItem> = logs[visible_log_range(logs.len(), scroll, rows)]
        .iter()
        .map(|entry| {
            let level_color = match entry.level {
                tracing::Level::ERROR => Color::Red,
                tracing::Level::WARN => Color::Yellow,
                tracing::Level::INFO => Color::Green,
                tracing::Level::DEBUG => Color::Blue,
                tracing::Level::TRACE => Color::Gray,
            };

            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("[{}] ", entry.timestamp.format("%H:%M:%S")),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{:5} ", entry.level),
                    Style::default()
                        .fg(level_color)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(entry.message.clone()),
            ]))
        })
        .collect();

    let title = if scroll == 0 {
        "Logs (↑/↓ to scroll)"
    } else {
        "Logs (scrolled back, End to follow)"
    };

    List::new(items).block(Block::default().borders(Borders::ALL).title(title))
}

/// Window of `rows` entries ending `scroll` lines above the newest one
pub fn visible_log_range(len: usize, scroll: usize, rows: usize) -> Range<usize> {
    let end = len - scroll.min(len.saturating_sub(rows));
    end.saturating_sub(rows)..end
}

pub fn render_footer(now: DateTime<Local>) -> Paragraph<'static> {
    Paragraph::new(Line::from(vec![
        Span::styled(
            " [i] issue  [e] environment  [r] revoke  [q] quit ",
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!(" {}", now.format("%Y-%m-%d %H:%M:%S")),
            Style::default().fg(Color::DarkGray),
        ),
    ]))
}

/// Human-readable time left, e.g. `23h 59m`, `4m 10s`
pub fn format_remaining(remaining: chrono::Duration) -> String {
    let secs = remaining.num_seconds().max(0);
    let (days, hours, minutes, seconds) = (
        secs / 86_400,
        (secs % 86_400) / 3600,
        (secs % 3600) / 60,
        secs % 60,
    );

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
