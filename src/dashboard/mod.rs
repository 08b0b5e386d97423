pub mod app;
pub mod event_handler;
pub mod log_layer;
pub mod ui;
pub mod widgets;

use std::io;

use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::Terminal;

pub use app::DashboardApp;
pub use event_handler::handle_events;

/// Take over the terminal and run until the user quits
pub fn run(mut app: DashboardApp) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    let result = run_loop(&mut terminal, &mut app);

    // Restore the terminal even if the loop failed
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut DashboardApp) -> io::Result<()> {
    while !app.should_quit {
        app.poll_outcomes();
        terminal.draw(|frame| ui::render(frame, app))?;
        handle_events(app)?;
    }
    Ok(())
}
