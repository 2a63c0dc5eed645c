//! Dashboard screen rendering.

use crate::consts::cli_consts::{MAX_ACTIVITY_LOGS, SNAPSHOT_LIMIT};
use crate::dashboard::{DashboardView, LoadPhase, SavePhase};
use crate::events::{Event, EventType, Source};
use crate::logging::LogLevel;
use crate::patient::calc_age;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::prelude::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use std::collections::VecDeque;
use std::time::Instant;

/// State for the dashboard screen: the latest controller view plus the
/// activity log and a few display-only facts.
#[derive(Debug)]
pub struct DashboardState {
    /// Latest view published by the controller task.
    pub view: DashboardView,

    /// A queue of events received from the controller task.
    pub events: VecDeque<Event>,

    /// Hostname of the store this dashboard is connected to.
    pub store_host: String,

    /// The start time of the application, used for computing uptime.
    pub start_time: Instant,
}

impl DashboardState {
    pub fn new(store_host: String) -> Self {
        Self {
            view: DashboardView::default(),
            events: VecDeque::new(),
            store_host,
            start_time: Instant::now(),
        }
    }

    /// Append an event, dropping the oldest once the log is full.
    pub fn add_event(&mut self, event: Event) {
        if self.events.len() >= MAX_ACTIVITY_LOGS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Get a ratatui color for an event source
    fn get_source_color(source: &Source) -> Color {
        match source {
            Source::Loader => Color::Cyan,
            Source::Creator => Color::Green,
        }
    }

    /// Format timestamp to include date but no year (MM-DD HH:MM:SS)
    fn format_compact_timestamp(timestamp: &str) -> String {
        // Extract from "YYYY-MM-DD HH:MM:SS" format to "MM-DD HH:MM:SS"
        if let Some(date_time) = timestamp.split_once(' ') {
            let date_part = date_time.0; // "YYYY-MM-DD"
            let time_part = date_time.1; // "HH:MM:SS"

            if let Some(month_day) = date_part.get(5..) {
                // Skip "YYYY-"
                format!("{} {}", month_day, time_part)
            } else {
                timestamp.to_string()
            }
        } else {
            timestamp.to_string()
        }
    }

    /// Clean HTTP error messages to show only essential information. Gateways
    /// in front of the store answer with whole HTML pages on 5xx; those are
    /// useless in a one-line log.
    fn clean_http_error_message(msg: &str) -> String {
        if msg.contains("<html>") || msg.contains("<!DOCTYPE") {
            for (code, label) in [
                (502, "Bad Gateway"),
                (503, "Service Unavailable"),
                (504, "Gateway Timeout"),
                (500, "Internal Server Error"),
                (429, "Rate Limited"),
            ] {
                if msg.contains(&code.to_string()) {
                    return format!("HTTP {} {}", code, label);
                }
            }
            return "HTTP error (server returned HTML)".to_string();
        }
        msg.to_string()
    }
}

/// Render the dashboard screen.
pub fn render_dashboard(f: &mut Frame, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3), // Title block
                Constraint::Min(0),    // Body area
                Constraint::Length(2), // Footer block
            ]
            .as_ref(),
        )
        .split(f.area());

    // Title section
    let version = env!("CARGO_PKG_VERSION");
    let title = Paragraph::new(format!("=== BARIPRONTO PATIENT REGISTRY v{} ===", version))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(title, chunks[0]);

    // Body layout: status column, then patients over logs
    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(28), Constraint::Percentage(72)].as_ref())
        .split(chunks[1]);

    render_status(f, state, body_chunks[0]);

    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
        .split(body_chunks[1]);

    render_patients(f, state, right_chunks[0]);
    render_logs(f, state, right_chunks[1]);

    // Footer
    let footer = Paragraph::new("[Q] Quit | [R] Refresh | [N] New patient")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::TOP));
    f.render_widget(footer, chunks[2]);
}

fn render_status(f: &mut Frame, state: &DashboardState, area: ratatui::layout::Rect) {
    let status_block = Block::default()
        .borders(Borders::RIGHT)
        .title("STATUS")
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    let view = &state.view;
    let loading = view.load_phase == LoadPhase::Loading;
    let counter = |value: u64| -> String {
        if loading {
            "…".to_string()
        } else {
            value.to_string()
        }
    };

    let mut status_lines = vec![
        Line::from(format!("STORE: {}", state.store_host)),
        Line::from(format!("TOTAL PATIENTS: {}", counter(view.total_patients))),
        Line::from(format!("TOTAL VISITS: {}", counter(view.total_visits))),
        Line::from(format!(
            "SNAPSHOT: {} of last {}",
            view.snapshot.len(),
            SNAPSHOT_LIMIT
        )),
    ];

    // Uptime in Days, Hours, Minutes, Seconds
    let uptime = state.start_time.elapsed();
    status_lines.push(Line::from(format!(
        "UPTIME: {}d {}h {}m {}s",
        uptime.as_secs() / 86400,
        (uptime.as_secs() % 86400) / 3600,
        (uptime.as_secs() % 3600) / 60,
        uptime.as_secs() % 60
    )));

    let load_line = match &view.load_phase {
        LoadPhase::Idle => Line::from("LOAD: idle"),
        LoadPhase::Loading => Line::from("LOAD: refreshing…"),
        LoadPhase::Ready => Line::from("LOAD: up to date"),
        LoadPhase::Failed(msg) => Line::from(vec![Span::styled(
            format!("LOAD FAILED: {}", DashboardState::clean_http_error_message(msg)),
            Style::default().fg(Color::Red),
        )]),
    };
    status_lines.push(load_line);

    match &view.save_phase {
        SavePhase::Idle | SavePhase::Ready => {}
        SavePhase::Saving => status_lines.push(Line::from("SAVE: saving…")),
        SavePhase::Failed(msg) => status_lines.push(Line::from(vec![Span::styled(
            format!("SAVE FAILED: {}", DashboardState::clean_http_error_message(msg)),
            Style::default().fg(Color::Red),
        )])),
    }

    let status_paragraph = Paragraph::new(status_lines)
        .block(status_block)
        .style(Style::default().fg(Color::Cyan))
        .wrap(Wrap { trim: true });
    f.render_widget(status_paragraph, area);
}

fn render_patients(f: &mut Frame, state: &DashboardState, area: ratatui::layout::Rect) {
    let view = &state.view;

    let lines: Vec<Line> = if view.snapshot.is_empty() {
        let hint = if view.load_phase == LoadPhase::Loading {
            "Loading…"
        } else {
            "No patients yet. Press [N] to add the first one."
        };
        vec![Line::from(Span::styled(
            hint,
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        view.snapshot
            .iter()
            .map(|patient| {
                let born = patient
                    .birth_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let age = calc_age(patient.birth_date);
                Line::from(vec![
                    Span::styled(
                        patient.name.clone(),
                        Style::default()
                            .fg(Color::White)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  born {} ({})", born, age),
                        Style::default().fg(Color::DarkGray),
                    ),
                ])
            })
            .collect()
    };

    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .title("PATIENTS")
                .borders(Borders::BOTTOM)
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(widget, area);
}

fn render_logs(f: &mut Frame, state: &DashboardState, area: ratatui::layout::Rect) {
    let log_lines: Vec<Line> = state
        .events
        .iter()
        .filter(|event| event.should_display())
        .rev() // newest first
        .map(|event| {
            let main_icon = match (event.event_type, event.log_level) {
                (EventType::Success, _) => "✅",
                (EventType::Error, LogLevel::Error) => "❌",
                (EventType::Error, LogLevel::Warn) => "⚠️",
                (EventType::Error, _) => "❌",
                (EventType::Refresh, _) => "🔄",
                (EventType::Shutdown, _) => "🔴",
            };

            let source_label = match event.source {
                Source::Loader => "Loader",
                Source::Creator => "Creator",
            };
            let source_color = DashboardState::get_source_color(&event.source);
            let compact_time = DashboardState::format_compact_timestamp(&event.timestamp);
            let cleaned_msg = DashboardState::clean_http_error_message(&event.msg);

            Line::from(vec![
                Span::raw(format!("{} ", main_icon)),
                Span::styled(
                    format!("{} ", compact_time),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("[{}] ", source_label),
                    Style::default()
                        .fg(source_color)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(cleaned_msg, Style::default().fg(source_color)),
            ])
        })
        .collect();

    let log_paragraph = if log_lines.is_empty() {
        Paragraph::new(vec![Line::from("Starting...")])
    } else {
        Paragraph::new(log_lines)
    };

    let log_widget = log_paragraph
        .block(
            Block::default()
                .title("LOGS")
                .borders(Borders::NONE)
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        )
        .wrap(Wrap { trim: true });

    f.render_widget(log_widget, area);
}
