use ratatui::{
    layout::{Constraint, Rect},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table},
    Frame,
};

use crate::analysis::month_name;
use crate::ui::app::App;
use crate::ui::theme;
use crate::ui::util::{format_amount, truncate};

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let mut title = format!("Bills ({})", app.bills.len());
    if let Some(company) = &app.bill_filter_company {
        title.push_str(&format!(" | {company}"));
    }
    if let Some(year) = app.bill_filter_year {
        title.push_str(&format!(" | {year}"));
    }
    if !app.search_input.is_empty() {
        title.push_str(&format!(" | search: '{}'", app.search_input));
    }

    if app.bills.is_empty() {
        let hint = if app.search_input.is_empty() && app.bill_filter_company.is_none() {
            "Add one with :add <company> <month> <year> <amount> or :import a CSV"
        } else {
            "Press Esc to clear the filters"
        };
        let msg = vec![
            Line::from(""),
            Line::from(Span::styled("No bills to show", theme::dim_style())),
            Line::from(""),
            Line::from(Span::styled(hint, theme::dim_style())),
        ];
        f.render_widget(
            Paragraph::new(msg).centered().block(theme::panel(title)),
            area,
        );
        return;
    }

    let header_cells = ["Period", "Company", "City", "Amount"]
        .iter()
        .map(|h| Cell::from(*h).style(theme::header_style()));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .bills
        .iter()
        .enumerate()
        .skip(app.bill_scroll)
        .take(area.height.saturating_sub(3) as usize)
        .map(|(i, bill)| {
            let style = if i == app.bill_index {
                theme::selected_style()
            } else if i % 2 == 1 {
                theme::alt_row_style()
            } else {
                theme::normal_style()
            };

            Row::new(vec![
                Cell::from(format!("  {:<9} {}", month_name(bill.month), bill.year)),
                Cell::from(truncate(&bill.company.name, 30)),
                Cell::from(truncate(bill.city.as_deref().unwrap_or("-"), 24)),
                Cell::from(Span::styled(
                    format_amount(bill.amount),
                    theme::amount_style(),
                )),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(18),
        Constraint::Min(20),
        Constraint::Length(24),
        Constraint::Length(14),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(theme::panel(title));
    f.render_widget(table, area);
}
