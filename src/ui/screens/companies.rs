use ratatui::{
    layout::{Constraint, Rect},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table},
    Frame,
};

use crate::ui::app::App;
use crate::ui::theme;
use crate::ui::util::truncate;

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let title = if app.search_input.is_empty() {
        format!("Companies ({})", app.companies.len())
    } else {
        format!(
            "Companies ({}) | search: '{}'",
            app.companies.len(),
            app.search_input
        )
    };

    if app.companies.is_empty() {
        let msg = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("No companies yet", theme::dim_style())),
            Line::from(""),
            Line::from(Span::styled(
                "Add one with :company <name>",
                theme::dim_style(),
            )),
        ])
        .centered()
        .block(theme::panel(title));
        f.render_widget(msg, area);
        return;
    }

    let header_cells = ["Id", "Name", "Bills"]
        .iter()
        .map(|h| Cell::from(*h).style(theme::header_style()));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .companies
        .iter()
        .enumerate()
        .skip(app.company_scroll)
        .take(area.height.saturating_sub(3) as usize)
        .map(|(i, company)| {
            let count = company
                .id
                .and_then(|id| app.bill_counts.get(&id))
                .copied()
                .unwrap_or(0);
            let style = if i == app.company_index {
                theme::selected_style()
            } else if i % 2 == 1 {
                theme::alt_row_style()
            } else {
                theme::normal_style()
            };
            Row::new(vec![
                Cell::from(format!("  {}", company.id.unwrap_or_default())),
                Cell::from(truncate(&company.name, 40)),
                Cell::from(count.to_string()),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(8),
        Constraint::Min(20),
        Constraint::Length(8),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(theme::panel(title));
    f.render_widget(table, area);
}
