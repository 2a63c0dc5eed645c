//! New-patient form screen.

use crate::patient::calc_age_str;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FormField {
    Name,
    BirthDate,
}

/// Editable state of the form. Preserved across a failed submission so the
/// user can correct and retry.
#[derive(Debug, Clone)]
pub struct FormState {
    pub name: String,
    pub birth_date: String,
    pub field: FormField,
    pub error: Option<String>,
    /// Set while a submission is waiting on the controller's answer.
    pub submitted: bool,
}

impl FormState {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            birth_date: String::new(),
            field: FormField::Name,
            error: None,
            submitted: false,
        }
    }

    pub fn toggle_field(&mut self) {
        self.field = match self.field {
            FormField::Name => FormField::BirthDate,
            FormField::BirthDate => FormField::Name,
        };
    }

    pub fn active_value_mut(&mut self) -> &mut String {
        match self.field {
            FormField::Name => &mut self.name,
            FormField::BirthDate => &mut self.birth_date,
        }
    }
}

impl Default for FormState {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders the new-patient form centered on the screen.
pub fn render_form(f: &mut Frame, state: &FormState, saving: bool) {
    let area = centered_rect(60, 14, f.area());

    let block = Block::default()
        .title("New patient")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let field_line = |label: &str, value: &str, active: bool| -> Line {
        let marker = if active { "> " } else { "  " };
        let style = if active {
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        Line::from(vec![
            Span::styled(format!("{marker}{label}: "), style),
            Span::styled(value.to_string(), style),
            Span::styled(if active { "▏" } else { "" }, style),
        ])
    };

    let mut lines = vec![
        field_line("Name", &state.name, state.field == FormField::Name),
        field_line(
            "Birth date (YYYY-MM-DD)",
            &state.birth_date,
            state.field == FormField::BirthDate,
        ),
    ];

    if !state.birth_date.trim().is_empty() {
        lines.push(Line::from(Span::styled(
            format!("  age: {}", calc_age_str(Some(&state.birth_date))),
            Style::default().fg(Color::DarkGray),
        )));
    }

    lines.push(Line::from(" "));
    if saving {
        lines.push(Line::from(Span::styled(
            "Saving…",
            Style::default().fg(Color::Yellow),
        )));
    } else if let Some(error) = &state.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    lines.push(Line::from(Span::styled(
        "[Tab] Switch field  [Enter] Save  [Esc] Cancel",
        Style::default().fg(Color::DarkGray),
    )));

    let paragraph = Paragraph::new(lines).block(block);
    f.render_widget(paragraph, area);
}

fn centered_rect(width_percent: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(area.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(area.height.saturating_sub(height) / 2),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}
