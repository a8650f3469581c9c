use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Paragraph},
    Frame,
};
use rust_decimal::prelude::ToPrimitive;

use crate::ui::app::{App, StatsView};
use crate::ui::theme;
use crate::ui::util::{format_amount, format_stat, truncate};

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Stat cards
            Constraint::Min(8),    // Summary + cities
        ])
        .split(area);

    render_stat_cards(f, chunks[0], app.stats.as_ref());

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);

    render_summary(f, bottom[0], app);
    render_city_chart(f, bottom[1], app);
}

fn render_stat_cards(f: &mut Frame, area: Rect, stats: Option<&StatsView>) {
    let Some(stats) = stats else {
        let msg = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "Select a company on the Companies screen, then run :stats <month> [range]",
                theme::dim_style(),
            )),
            Line::from(Span::styled(
                "Toggle :all to include every company",
                theme::dim_style(),
            )),
        ])
        .centered()
        .block(theme::panel("Statistics"));
        f.render_widget(msg, area);
        return;
    };

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(30),
            Constraint::Percentage(40),
        ])
        .split(area);

    let subtitle = format!(
        "{} | {} bill{}",
        stats.scope,
        stats.bill_count,
        if stats.bill_count == 1 { "" } else { "s" }
    );
    let mode: Vec<String> = stats.mode.iter().copied().map(format_stat).collect();

    render_card(f, cards[0], "Average", format_stat(stats.average), theme::GREEN, &subtitle);
    render_card(f, cards[1], "Median", format_stat(stats.median), theme::ACCENT, &subtitle);
    render_card(f, cards[2], "Mode", mode.join(", "), theme::PEACH, &subtitle);
}

fn render_card(f: &mut Frame, area: Rect, title: &str, value: String, color: Color, subtitle: &str) {
    let width = area.width.saturating_sub(4) as usize;
    let text = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            truncate(&value, width),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(truncate(subtitle, width), theme::dim_style())),
    ])
    .centered()
    .block(theme::panel(title));

    f.render_widget(text, area);
}

fn render_summary(f: &mut Frame, area: Rect, app: &App) {
    let mut lines = app.summary_lines.iter();
    let Some(title) = lines.next() else {
        let msg = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "Run :summary [month] [year]",
                theme::dim_style(),
            )),
        ])
        .centered()
        .block(theme::panel("Summary"));
        f.render_widget(msg, area);
        return;
    };

    let body: Vec<Line> = lines
        .map(|line| Line::from(Span::styled(format!(" {line}"), theme::normal_style())))
        .collect();
    f.render_widget(Paragraph::new(body).block(theme::panel(title.as_str())), area);
}

fn render_city_chart(f: &mut Frame, area: Rect, app: &App) {
    let title = match &app.city_company {
        Some(name) => format!("Spending by City | {name}"),
        None => "Spending by City".to_string(),
    };

    if app.city_spending.is_empty() {
        let msg = Paragraph::new(Line::from(Span::styled(
            "Select a company and run :cities",
            theme::dim_style(),
        )))
        .centered()
        .block(theme::panel(title));
        f.render_widget(msg, area);
        return;
    }

    let bars: Vec<Bar> = app
        .city_spending
        .iter()
        .map(|(city, total)| {
            Bar::default()
                .value(total.to_u64().unwrap_or(0))
                .text_value(format_amount(*total))
                .label(Line::from(truncate(city, 10)))
                .style(Style::default().fg(theme::ACCENT))
                .value_style(
                    Style::default()
                        .fg(theme::HEADER_BG)
                        .bg(theme::ACCENT)
                        .add_modifier(Modifier::BOLD),
                )
        })
        .collect();

    let chart = BarChart::default()
        .block(theme::panel(title))
        .data(BarGroup::default().bars(&bars))
        .bar_width(10)
        .bar_gap(1)
        .bar_style(Style::default().fg(theme::ACCENT));

    f.render_widget(chart, area);
}
