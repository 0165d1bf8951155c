use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap};
use serde_json::Value;

use super::theme::*;
use super::{screen_title, truncate_to_width, wrap_to_width};
use crate::app::{App, Screen};
use crate::backend::StreamPhase;
use crate::backend::api::models::RunStatus;
use crate::controllers::TranscriptEntry;
use crate::store::StoreState;

pub(super) fn render_screen(
    f: &mut Frame<'_>,
    app: &App,
    state: &StoreState,
    palette: &Palette,
    area: Rect,
) {
    let strings = state.language.strings();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.border))
        .title(Span::styled(
            screen_title(app.screen, strings),
            Style::default().fg(palette.fg).add_modifier(Modifier::BOLD),
        ))
        .style(Style::default().bg(palette.panel_bg));
    let inner = block.inner(area);
    f.render_widget(block, area);

    match app.screen {
        Screen::Dashboard => render_dashboard(f, state, palette, inner),
        Screen::Brainstorm => render_brainstorm(f, app, palette, inner),
        Screen::Debate => render_debate(f, app, palette, inner),
        Screen::Training => render_training(f, app, palette, inner),
        Screen::Assistant => render_assistant(f, app, palette, inner),
    }
}

fn status_color(status: &RunStatus) -> Color {
    match status {
        RunStatus::Complete => STATUS_OK,
        RunStatus::Failed | RunStatus::Cancelled => STATUS_FAILED,
        _ => STATUS_ACTIVE,
    }
}

fn record_label(record: &Value) -> String {
    ["name", "label", "title", "id"]
        .iter()
        .find_map(|key| match record.get(*key) {
            Some(Value::String(text)) => Some(text.clone()),
            Some(Value::Number(number)) => Some(number.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| String::from("(unnamed)"))
}

fn render_dashboard(f: &mut Frame<'_>, state: &StoreState, palette: &Palette, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let text = Style::default().fg(palette.fg);
    let dim = Style::default().fg(palette.fg_dim);
    let mut providers: Vec<ListItem> = vec![ListItem::new(Line::from(Span::styled(
        format!("Providers ({})", state.providers.len()),
        text.add_modifier(Modifier::BOLD),
    )))];
    providers.extend(
        state
            .providers
            .iter()
            .map(|provider| ListItem::new(Span::styled(format!("  {}", record_label(provider)), text))),
    );
    f.render_widget(List::new(providers), columns[0]);

    let mut profiles: Vec<ListItem> = vec![ListItem::new(Line::from(Span::styled(
        format!("Profiles ({})", state.profiles.len()),
        text.add_modifier(Modifier::BOLD),
    )))];
    profiles.extend(
        state
            .profiles
            .iter()
            .map(|profile| ListItem::new(Span::styled(format!("  {}", record_label(profile)), text))),
    );
    profiles.push(ListItem::new(Span::raw("")));
    profiles.push(ListItem::new(Span::styled(
        truncate_to_width(
            state.language.strings().key_help(),
            columns[1].width as usize,
        ),
        dim,
    )));
    profiles.push(ListItem::new(Span::styled("Enter / Ctrl+R: refresh lists", dim)));
    f.render_widget(List::new(profiles), columns[1]);
}

fn render_brainstorm(f: &mut Frame<'_>, app: &App, palette: &Palette, area: Rect) {
    let snapshot = app.controllers.brainstorm.snapshot();
    let width = area.width.max(1) as usize;
    let mut lines: Vec<Line> = Vec::new();

    match &snapshot.run_id {
        None => lines.push(Line::from(Span::styled(
            "Enter a prompt to ask every profile in parallel.",
            Style::default().fg(palette.fg_dim),
        ))),
        Some(run_id) => {
            let state = if snapshot.is_running() { "running" } else { "finished" };
            lines.push(Line::from(Span::styled(
                format!("Run {run_id} ({state}): {}", snapshot.prompt),
                Style::default().fg(palette.fg).add_modifier(Modifier::BOLD),
            )));
        }
    }
    if let Some(error) = &snapshot.last_error {
        lines.push(Line::from(Span::styled(
            format!("! {error}"),
            Style::default().fg(STATUS_FAILED),
        )));
    }
    for result in &snapshot.results {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled(
                format!("{} ", result.profile_id),
                Style::default().fg(palette.fg).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("[{}]", result.status),
                Style::default().fg(status_color(&result.status)),
            ),
        ]));
        let body = result
            .output
            .as_deref()
            .or(result.error.as_deref())
            .unwrap_or("");
        for line in body.lines() {
            for segment in wrap_to_width(line, width) {
                lines.push(Line::from(Span::styled(segment, Style::default().fg(palette.fg))));
            }
        }
    }
    f.render_widget(Paragraph::new(lines), area);
}

fn render_debate(f: &mut Frame<'_>, app: &App, palette: &Palette, area: Rect) {
    let snapshot = app.controllers.debate.snapshot();
    let width = area.width.max(1) as usize;
    let mut lines: Vec<Line> = Vec::new();

    match &snapshot.debate_id {
        None => lines.push(Line::from(Span::styled(
            "Enter a topic to start a debate between all profiles. Ctrl+S stops it.",
            Style::default().fg(palette.fg_dim),
        ))),
        Some(id) => lines.push(Line::from(vec![
            Span::styled(
                format!("Debate {id}: {} ", snapshot.topic),
                Style::default().fg(palette.fg).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(
                    "[{} round {}/{}]",
                    snapshot.status.status,
                    snapshot.status.current_round,
                    snapshot.status.total_rounds
                ),
                Style::default().fg(status_color(&snapshot.status.status)),
            ),
        ])),
    }
    for notice in [&snapshot.notice, &snapshot.last_error].into_iter().flatten() {
        lines.push(Line::from(Span::styled(
            format!("! {notice}"),
            Style::default().fg(STATUS_FAILED),
        )));
    }
    for message in &snapshot.messages {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("{} (round {})", message.speaker_label(), message.round),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
        for line in message.content.lines() {
            for segment in wrap_to_width(line, width) {
                lines.push(Line::from(Span::styled(segment, Style::default().fg(palette.fg))));
            }
        }
    }

    // Keep the newest messages in view.
    let overflow = lines.len().saturating_sub(area.height as usize);
    let visible: Vec<Line> = lines.into_iter().skip(overflow).collect();
    f.render_widget(Paragraph::new(visible), area);
}

fn render_training(f: &mut Frame<'_>, app: &App, palette: &Palette, area: Rect) {
    let snapshot = app.controllers.training.snapshot();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let header = match &snapshot.active {
        Some(job) => Line::from(vec![
            Span::styled(
                format!("Job {} ", job.id),
                Style::default().fg(palette.fg).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("[{}] {}", job.status, job.message.as_deref().unwrap_or("")),
                Style::default().fg(status_color(&job.status)),
            ),
        ]),
        None => Line::from(Span::styled(
            "Enter a JSON training config (or a name). Ctrl+L loads logs, Ctrl+X cancels.",
            Style::default().fg(palette.fg_dim),
        )),
    };
    let mut header_lines = vec![header];
    if let Some(error) = &snapshot.last_error {
        header_lines.push(Line::from(Span::styled(
            format!("! {error}"),
            Style::default().fg(STATUS_FAILED),
        )));
    }
    f.render_widget(Paragraph::new(header_lines), rows[0]);

    if let Some(job) = &snapshot.active {
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(status_color(&job.status)).bg(palette.bg))
            .ratio(job.progress.clamp(0.0, 1.0));
        f.render_widget(gauge, rows[1]);
    }

    let lines: Vec<ListItem> = if snapshot.logs.is_empty() {
        snapshot
            .jobs
            .iter()
            .map(|job| {
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{} ", job.id), Style::default().fg(palette.fg)),
                    Span::styled(
                        format!("[{}] {:.0}%", job.status, job.progress * 100.0),
                        Style::default().fg(status_color(&job.status)),
                    ),
                ]))
            })
            .collect()
    } else {
        let skip = snapshot.logs.len().saturating_sub(rows[2].height as usize);
        snapshot
            .logs
            .iter()
            .skip(skip)
            .map(|line| ListItem::new(Span::styled(line.clone(), Style::default().fg(palette.fg_dim))))
            .collect()
    };
    f.render_widget(List::new(lines), rows[2]);
}

fn render_assistant(f: &mut Frame<'_>, app: &App, palette: &Palette, area: Rect) {
    let assistant = &app.controllers.assistant;
    let transcript = assistant.transcript();
    let width = area.width.max(1) as usize;

    let mut items: Vec<ListItem> = transcript
        .entries()
        .iter()
        .map(|entry| {
            let (title, title_style) = match entry {
                TranscriptEntry::User { .. } => (
                    String::from("You"),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                TranscriptEntry::Assistant { fell_back, .. } => (
                    if *fell_back {
                        String::from("Assistant (non-streaming)")
                    } else {
                        String::from("Assistant")
                    },
                    Style::default().fg(STATUS_OK).add_modifier(Modifier::BOLD),
                ),
                TranscriptEntry::Error { .. } => (
                    String::from("Error"),
                    Style::default().fg(STATUS_FAILED).add_modifier(Modifier::BOLD),
                ),
            };
            let mut lines = vec![Line::from(Span::styled(title, title_style))];
            for line in entry.text().lines() {
                for segment in wrap_to_width(line, width) {
                    lines.push(Line::from(Span::styled(segment, Style::default().fg(palette.fg))));
                }
            }
            ListItem::new(lines)
        })
        .collect();

    if let Some(live) = assistant.live() {
        let label = match live.phase {
            StreamPhase::Fallback => "Assistant (waiting for full reply)",
            _ => "Assistant ...",
        };
        let mut lines = vec![Line::from(Span::styled(
            label,
            Style::default().fg(STATUS_ACTIVE).add_modifier(Modifier::BOLD),
        ))];
        for line in live.text.lines() {
            for segment in wrap_to_width(line, width) {
                lines.push(Line::from(Span::styled(segment, Style::default().fg(palette.fg))));
            }
        }
        items.push(ListItem::new(lines));
    }

    let selected = if assistant.is_busy() {
        items.len().saturating_sub(1)
    } else {
        transcript.selected_index()
    };
    let mut list_state = ListState::default();
    if !items.is_empty() {
        list_state.select(Some(selected));
    }
    let list = List::new(items).highlight_style(Style::default().bg(palette.highlight_bg));
    f.render_stateful_widget(list, area, &mut list_state);

    if transcript.entries().is_empty() && !assistant.is_busy() {
        let hint = Paragraph::new("Ask the coding assistant anything. PageUp/PageDown scroll.")
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(palette.fg_dim));
        f.render_widget(hint, area);
    }
}
