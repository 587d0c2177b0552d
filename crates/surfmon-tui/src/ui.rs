//! Dashboard rendering
//!
//! Every function here is a pure function of a [`DashboardView`].

use crate::app::DashboardView;
use ratatui::{prelude::*, widgets::*};
use surfmon_core::{Field, MessageRecord};

pub fn draw(frame: &mut Frame, view: &DashboardView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Banner
            Constraint::Length(14), // Recent messages
            Constraint::Min(0),     // Details
        ])
        .split(frame.area());

    draw_banner(frame, chunks[0], view);
    draw_recent(frame, chunks[1], view);
    draw_details(frame, chunks[2], view);
}

fn draw_banner(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let (status, color) = if view.forwarding_enabled {
        ("Enabled", Color::Green)
    } else {
        ("Disabled", Color::Red)
    };

    let line = Line::from(vec![
        Span::styled(
            " Windsurf Message Monitor ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(view.now.format("%Y-%m-%d %H:%M:%S").to_string()),
        Span::raw(" | API: "),
        Span::styled(status, Style::default().fg(color)),
        Span::raw(format!(" | Messages: {} ", view.total)),
    ]);

    let banner = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(banner, area);
}

fn draw_recent(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let header = Row::new(["Time", "Client Version", "Session ID", "Sent"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = view
        .recent
        .iter()
        .rev()
        .map(|record| {
            let fields = record.fields();
            let (icon, color) = if record.is_dispatched() {
                ("✓", Color::Green)
            } else {
                ("✗", Color::Red)
            };
            Row::new(vec![
                Cell::from(record.timestamp().format("%H:%M:%S").to_string()),
                Cell::from(fields.display(Field::ClientVersion).to_string()),
                Cell::from(fields.display(Field::SessionId).to_string()),
                Cell::from(icon).style(Style::default().fg(color)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Percentage(40),
            Constraint::Percentage(40),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .block(Block::default().title(" Recent Messages ").borders(Borders::ALL));

    frame.render_widget(table, area);
}

fn draw_details(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let block = Block::default().title(" Latest Message ").borders(Borders::ALL);

    let Some(record) = view.latest.as_deref() else {
        let placeholder = Paragraph::new("No message selected")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    };

    let details = Paragraph::new(detail_lines(record))
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(details, area);
}

fn detail_lines(record: &MessageRecord) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for section in record.detail_sections() {
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        lines.push(Line::styled(
            section.title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
        for (label, value) in section.entries {
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<18}", label), Style::default().fg(Color::Gray)),
                Span::raw(value),
            ]));
        }
    }
    lines
}
