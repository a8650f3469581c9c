use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;

use crate::db::Database;
use crate::ui::app::{App, InputMode, PendingAction, Screen};
use crate::ui::commands;
use crate::ui::util::{scroll_down, scroll_to_bottom, scroll_to_top, scroll_up};

pub(crate) fn as_tui(db: &mut Database) -> Result<()> {
    let mut app = App::new();
    app.refresh_all(db)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    tracing::info!("tui started");

    let result = run_app(&mut terminal, &mut app, db);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    match &result {
        Ok(()) => tracing::info!("tui exited"),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "tui aborted");
            eprintln!("Error: {e:?}");
        }
    }

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    db: &mut Database,
) -> Result<()> {
    while app.running {
        terminal.draw(|f| {
            let content_height = f.area().height.saturating_sub(3) as usize;
            app.visible_rows = content_height.max(1);
            crate::ui::render::render(f, app);
        })?;

        if let Event::Key(key) = event::read()? {
            if app.show_help {
                app.show_help = false;
                continue;
            }
            match app.input_mode {
                InputMode::Normal => handle_normal_input(key, app, db)?,
                InputMode::Command => handle_command_input(key, app, db)?,
                InputMode::Search => handle_search_input(key, app, db)?,
                InputMode::Editing => handle_editing_input(key, app, db)?,
                InputMode::Confirm => handle_confirm_input(key, app, db)?,
            }
        }
    }
    Ok(())
}

// ── Input handlers ───────────────────────────────────────────

fn handle_normal_input(key: event::KeyEvent, app: &mut App, db: &mut Database) -> Result<()> {
    match key.code {
        KeyCode::Char(':') => {
            app.input_mode = InputMode::Command;
            app.command_input.clear();
        }
        KeyCode::Char('/') => {
            app.input_mode = InputMode::Search;
            app.search_input.clear();
        }
        KeyCode::Char('q') | KeyCode::Char('c')
            if key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            app.running = false;
        }
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            for _ in 0..app.visible_rows / 2 {
                handle_move_down(app);
            }
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            for _ in 0..app.visible_rows / 2 {
                handle_move_up(app);
            }
        }
        KeyCode::Char('j') | KeyCode::Down => handle_move_down(app),
        KeyCode::Char('k') | KeyCode::Up => handle_move_up(app),
        KeyCode::Char('g') => handle_goto_top(app),
        KeyCode::Char('G') => handle_goto_bottom(app),
        KeyCode::Char('1') => switch_screen(app, db, Screen::Bills)?,
        KeyCode::Char('2') => switch_screen(app, db, Screen::Companies)?,
        KeyCode::Char('3') => switch_screen(app, db, Screen::Analysis)?,
        KeyCode::Tab => {
            let screens = Screen::all();
            let idx = screens.iter().position(|s| *s == app.screen).unwrap_or(0);
            let next = (idx + 1) % screens.len();
            switch_screen(app, db, screens[next])?;
        }
        KeyCode::BackTab => {
            let screens = Screen::all();
            let idx = screens.iter().position(|s| *s == app.screen).unwrap_or(0);
            let prev = if idx == 0 { screens.len() - 1 } else { idx - 1 };
            switch_screen(app, db, screens[prev])?;
        }
        KeyCode::Char('D') => match app.screen {
            Screen::Bills => commands::handle_command("delete", app, db)?,
            Screen::Companies => commands::handle_command("delete-company", app, db)?,
            Screen::Analysis => {}
        },
        KeyCode::Enter => handle_enter(app, db)?,
        KeyCode::Esc => handle_escape(app, db)?,
        KeyCode::Char('?') => {
            app.show_help = true;
        }
        _ => {}
    }
    Ok(())
}

fn handle_command_input(key: event::KeyEvent, app: &mut App, db: &mut Database) -> Result<()> {
    match key.code {
        KeyCode::Enter => {
            let input = app.command_input.clone();
            app.input_mode = InputMode::Normal;
            app.command_input.clear();
            commands::handle_command(&input, app, db)?;
        }
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            app.command_input.clear();
        }
        KeyCode::Backspace => {
            app.command_input.pop();
            if app.command_input.is_empty() {
                app.input_mode = InputMode::Normal;
            }
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.command_input.clear();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Char('w') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let trimmed = app.command_input.trim_end();
            if let Some(pos) = trimmed.rfind(' ') {
                app.command_input.truncate(pos + 1);
            } else {
                app.command_input.clear();
                app.input_mode = InputMode::Normal;
            }
        }
        KeyCode::Char(c) => {
            app.command_input.push(c);
        }
        _ => {}
    }
    Ok(())
}

/// Live filter: bills by company name, companies by name.
fn handle_search_input(key: event::KeyEvent, app: &mut App, db: &mut Database) -> Result<()> {
    if app.screen == Screen::Analysis {
        app.screen = Screen::Bills;
    }
    match key.code {
        KeyCode::Enter => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            app.search_input.clear();
            refresh_current(app, db)?;
        }
        KeyCode::Backspace => {
            app.search_input.pop();
            reset_cursor(app);
            refresh_current(app, db)?;
        }
        KeyCode::Char(c) => {
            app.search_input.push(c);
            reset_cursor(app);
            refresh_current(app, db)?;
        }
        _ => {}
    }
    Ok(())
}

fn handle_editing_input(key: event::KeyEvent, app: &mut App, db: &mut Database) -> Result<()> {
    match key.code {
        KeyCode::Enter => {
            let new_name = app.command_input.trim().to_string();
            app.command_input.clear();
            app.input_mode = InputMode::Normal;
            if new_name.is_empty() {
                app.set_status("Rename cancelled");
            } else {
                commands::handle_command(&format!("rename {new_name}"), app, db)?;
            }
        }
        KeyCode::Esc => {
            app.command_input.clear();
            app.input_mode = InputMode::Normal;
            app.set_status("Rename cancelled");
        }
        KeyCode::Backspace => {
            app.command_input.pop();
        }
        KeyCode::Char(c) => {
            app.command_input.push(c);
        }
        _ => {}
    }
    Ok(())
}

fn handle_confirm_input(key: event::KeyEvent, app: &mut App, db: &mut Database) -> Result<()> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            if let Some(action) = app.pending_action.take() {
                if let Err(e) = apply_pending(action, app, db) {
                    commands::report_error(app, "confirm", &e);
                }
            }
            app.input_mode = InputMode::Normal;
            app.confirm_message.clear();
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.pending_action = None;
            app.input_mode = InputMode::Normal;
            app.confirm_message.clear();
            app.set_status("Cancelled");
        }
        _ => {}
    }
    Ok(())
}

fn apply_pending(action: PendingAction, app: &mut App, db: &mut Database) -> Result<()> {
    match action {
        PendingAction::DeleteBill { key, label } => {
            if db.delete_bill(&key)? {
                app.set_status(format!("Deleted bill: {label}"));
            } else {
                app.set_status("Bill no longer exists");
            }
            app.refresh_all(db)?;
        }
        PendingAction::DeleteCompany { id, name } => {
            if !db.delete_company(id)? {
                app.set_status("Company no longer exists");
                return app.refresh_all(db);
            }
            if app
                .bill_filter_company
                .as_ref()
                .is_some_and(|c| c.id == Some(id))
            {
                app.bill_filter_company = None;
            }
            if app.city_company.as_deref() == Some(name.as_str()) {
                app.city_company = None;
                app.city_spending.clear();
            }
            app.refresh_all(db)?;
            app.set_status(format!("Deleted company: {name}"));
        }
    }
    Ok(())
}

// ── Navigation ───────────────────────────────────────────────

fn switch_screen(app: &mut App, db: &mut Database, screen: Screen) -> Result<()> {
    if app.screen == screen {
        return Ok(());
    }
    app.screen = screen;
    app.search_input.clear();
    app.set_status("");
    app.refresh_all(db)
}

fn refresh_current(app: &mut App, db: &mut Database) -> Result<()> {
    match app.screen {
        Screen::Companies => app.refresh_companies(db),
        _ => app.refresh_bills(db),
    }
}

fn reset_cursor(app: &mut App) {
    match app.screen {
        Screen::Companies => scroll_to_top(&mut app.company_index, &mut app.company_scroll),
        _ => scroll_to_top(&mut app.bill_index, &mut app.bill_scroll),
    }
}

fn handle_move_down(app: &mut App) {
    match app.screen {
        Screen::Bills => {
            let page = app.bill_page();
            scroll_down(&mut app.bill_index, &mut app.bill_scroll, app.bills.len(), page);
        }
        Screen::Companies => {
            let page = app.company_page();
            scroll_down(
                &mut app.company_index,
                &mut app.company_scroll,
                app.companies.len(),
                page,
            );
        }
        Screen::Analysis => {}
    }
}

fn handle_move_up(app: &mut App) {
    match app.screen {
        Screen::Bills => scroll_up(&mut app.bill_index, &mut app.bill_scroll),
        Screen::Companies => scroll_up(&mut app.company_index, &mut app.company_scroll),
        Screen::Analysis => {}
    }
}

fn handle_goto_top(app: &mut App) {
    match app.screen {
        Screen::Analysis => {}
        _ => reset_cursor(app),
    }
}

fn handle_goto_bottom(app: &mut App) {
    match app.screen {
        Screen::Bills => {
            let page = app.bill_page();
            scroll_to_bottom(&mut app.bill_index, &mut app.bill_scroll, app.bills.len(), page);
        }
        Screen::Companies => {
            let page = app.company_page();
            scroll_to_bottom(
                &mut app.company_index,
                &mut app.company_scroll,
                app.companies.len(),
                page,
            );
        }
        Screen::Analysis => {}
    }
}

/// On Companies, Enter opens the selected company's bills.
fn handle_enter(app: &mut App, db: &mut Database) -> Result<()> {
    if app.screen != Screen::Companies {
        return Ok(());
    }
    let Some(company) = app.selected_company().cloned() else {
        return Ok(());
    };
    app.set_status(format!("Filtering by company: {company}"));
    app.bill_filter_company = Some(company);
    app.screen = Screen::Bills;
    app.search_input.clear();
    scroll_to_top(&mut app.bill_index, &mut app.bill_scroll);
    app.refresh_all(db)
}

fn handle_escape(app: &mut App, db: &mut Database) -> Result<()> {
    let had_filters = !app.search_input.is_empty()
        || app.bill_filter_company.is_some()
        || app.bill_filter_year.is_some();
    app.search_input.clear();
    app.bill_filter_company = None;
    app.bill_filter_year = None;
    if had_filters {
        app.set_status("Filters cleared");
        app.refresh_all(db)?;
    } else {
        app.set_status("");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::models::{Bill, Company};
    use crossterm::event::KeyEvent;
    use rust_decimal_macros::dec;

    fn setup() -> (App, Database) {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_company(&Company::new("AEP")).unwrap();
        let aep = Company::with_id(id, "AEP");
        db.insert_bill(&Bill::new(1, 2024, aep.clone(), dec!(90))).unwrap();
        db.insert_bill(&Bill::new(2, 2024, aep, dec!(109))).unwrap();
        let mut app = App::new();
        app.refresh_all(&db).unwrap();
        (app, db)
    }

    fn confirm(app: &mut App, db: &mut Database) {
        let yes = KeyEvent::new(KeyCode::Char('y'), KeyModifiers::NONE);
        handle_confirm_input(yes, app, db).unwrap();
    }

    #[test]
    fn test_confirm_deletes_selected_bill() {
        let (mut app, mut db) = setup();
        commands::handle_command("delete", &mut app, &mut db).unwrap();
        confirm(&mut app, &mut db);

        assert_eq!(db.count_bills().unwrap(), 1);
        assert_eq!(app.bills.len(), 1);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.status_message, "Deleted bill: AEP January 2024");
    }

    #[test]
    fn test_confirm_on_stale_bill_keeps_running() {
        let (mut app, mut db) = setup();
        commands::handle_command("delete", &mut app, &mut db).unwrap();
        let key = app.selected_bill().unwrap().key().unwrap();
        db.delete_bill(&key).unwrap();

        confirm(&mut app, &mut db);
        assert!(app.running);
        assert_eq!(app.status_message, "Bill no longer exists");
    }

    #[test]
    fn test_confirm_on_stale_company_keeps_running() {
        let (mut app, mut db) = setup();
        app.screen = Screen::Companies;
        commands::handle_command("delete-company", &mut app, &mut db).unwrap();
        let id = app.selected_company().unwrap().id.unwrap();
        db.delete_company(id).unwrap();

        confirm(&mut app, &mut db);
        assert!(app.running);
        assert_eq!(app.status_message, "Company no longer exists");
        assert!(app.companies.is_empty());
    }

    #[test]
    fn test_cancel_clears_pending_action() {
        let (mut app, mut db) = setup();
        commands::handle_command("delete", &mut app, &mut db).unwrap();
        let no = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        handle_confirm_input(no, &mut app, &mut db).unwrap();

        assert!(app.pending_action.is_none());
        assert_eq!(db.count_bills().unwrap(), 2);
    }
}
