use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::{App, HTTP_MODE_WARNING, Screen};
use crate::backend::TransportMode;
use crate::i18n::Strings;
use crate::store::StoreState;

mod screens;
mod theme;
use theme::*;

pub use theme::Palette;

fn cell_width(text: &str) -> u16 {
    UnicodeWidthStr::width(text).min(u16::MAX as usize) as u16
}

/// Which top banner, if any, the current backend state calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner {
    /// No backend answered; cannot be dismissed.
    Unreachable,
    /// Running against the HTTP server; dismissable and remembered.
    HttpMode,
}

pub fn banner_for(app: &App, state: &StoreState) -> Option<Banner> {
    match state.backend.as_ref()? {
        TransportMode::Unreachable => Some(Banner::Unreachable),
        TransportMode::Http(_) if !app.store.is_dismissed(HTTP_MODE_WARNING) => {
            Some(Banner::HttpMode)
        }
        _ => None,
    }
}

pub fn render(f: &mut Frame<'_>, app: &App) {
    let state = app.store.snapshot();
    let palette = Palette::for_theme(state.theme);
    let strings = state.language.strings();
    let size = f.size();

    f.render_widget(Block::default().style(Style::default().bg(palette.bg)), size);

    if let Some(message) = app.fatal.as_deref() {
        render_recovery(f, &palette, strings, message, size);
        return;
    }

    if size.width < 40 || size.height < 12 {
        let block = Paragraph::new("Terminal too small (need at least 40x12).")
            .wrap(Wrap { trim: true })
            .alignment(Alignment::Center)
            .style(Style::default().fg(palette.fg).bg(palette.bg));
        f.render_widget(block, size);
        return;
    }

    let banner = banner_for(app, &state);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(if banner.is_some() { 1 } else { 0 }),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(size);

    render_tabs(f, app, strings, vertical[0]);
    if let Some(banner) = banner {
        render_banner(f, banner, strings, vertical[1]);
    }
    screens::render_screen(f, app, &state, &palette, vertical[2]);
    render_composer(f, app, &palette, strings, vertical[3]);
    render_status_bar(f, app, &state, vertical[4]);
}

fn screen_title(screen: Screen, strings: &dyn Strings) -> &'static str {
    match screen {
        Screen::Dashboard => strings.dashboard_title(),
        Screen::Brainstorm => strings.brainstorm_title(),
        Screen::Debate => strings.debate_title(),
        Screen::Training => strings.training_title(),
        Screen::Assistant => strings.assistant_title(),
    }
}

fn render_tabs(f: &mut Frame<'_>, app: &App, strings: &dyn Strings, area: Rect) {
    f.render_widget(Clear, area);
    let mut spans = vec![Span::styled(
        " agentdeck ",
        Style::default()
            .fg(BAR_HIGHLIGHT_TEXT)
            .bg(BAR_BG)
            .add_modifier(Modifier::BOLD),
    )];
    for screen in Screen::ALL {
        let label = format!("[{}]", screen_title(screen, strings));
        let style = if screen == app.screen {
            Style::default()
                .fg(BAR_HIGHLIGHT_TEXT)
                .bg(BAR_HIGHLIGHT_BG)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(BAR_TEXT).bg(BAR_BG)
        };
        spans.push(Span::styled(label, style));
        spans.push(Span::styled(" ", Style::default().bg(BAR_BG)));
    }
    let bar = Paragraph::new(Line::from(spans)).style(Style::default().bg(BAR_BG));
    f.render_widget(bar, area);
}

fn render_banner(f: &mut Frame<'_>, banner: Banner, strings: &dyn Strings, area: Rect) {
    let (text, bg) = match banner {
        Banner::Unreachable => (strings.unreachable_banner(), BANNER_ERROR_BG),
        Banner::HttpMode => (strings.http_mode_notice(), BANNER_WARN_BG),
    };
    let text = truncate_to_width(text, area.width as usize);
    let paragraph = Paragraph::new(Span::styled(
        text,
        Style::default()
            .fg(BANNER_TEXT)
            .bg(bg)
            .add_modifier(Modifier::BOLD),
    ))
    .style(Style::default().bg(bg));
    f.render_widget(paragraph, area);
}

fn render_composer(
    f: &mut Frame<'_>,
    app: &App,
    palette: &Palette,
    strings: &dyn Strings,
    area: Rect,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.border_focus))
        .style(Style::default().bg(palette.panel_bg));
    let inner = block.inner(area);

    let content = if app.composer.is_empty() {
        Span::styled(strings.prompt_placeholder(), Style::default().fg(palette.fg_dim))
    } else {
        Span::styled(app.composer.buffer().to_string(), Style::default().fg(palette.fg))
    };
    f.render_widget(Paragraph::new(Line::from(content)).block(block), area);

    if app.screen.takes_prompt() && inner.width > 0 {
        let before = &app.composer.buffer()[..app.composer.cursor()];
        let offset = cell_width(before).min(inner.width.saturating_sub(1));
        f.set_cursor(inner.x + offset, inner.y);
    }
}

fn render_status_bar(f: &mut Frame<'_>, app: &App, state: &StoreState, area: Rect) {
    let mode = match &state.backend {
        None => String::from("[resolving]"),
        Some(TransportMode::Native) => String::from("[native]"),
        Some(TransportMode::Http(base)) => format!("[http {base}]"),
        Some(TransportMode::Unreachable) => String::from("[offline]"),
    };
    let user = state
        .current_user
        .as_ref()
        .and_then(|user| user.get("name").and_then(|name| name.as_str()))
        .map(|name| format!(" [{name}]"))
        .unwrap_or_default();
    let right = format!("{mode}{user} ");
    let available = (area.width as usize).saturating_sub(UnicodeWidthStr::width(right.as_str()) + 1);
    let left = format!(" {}", truncate_to_width(&app.status_message, available));
    let pad = (area.width as usize)
        .saturating_sub(UnicodeWidthStr::width(left.as_str()) + UnicodeWidthStr::width(right.as_str()));
    let line = Line::from(vec![
        Span::raw(left),
        Span::raw(" ".repeat(pad)),
        Span::raw(right),
    ]);
    let bar = Paragraph::new(line).style(Style::default().fg(BAR_TEXT).bg(BAR_BG));
    f.render_widget(bar, area);
}

fn render_recovery(
    f: &mut Frame<'_>,
    palette: &Palette,
    strings: &dyn Strings,
    message: &str,
    size: Rect,
) {
    let area = centered_rect(70, 50, size);
    f.render_widget(Clear, area);
    let lines = vec![
        Line::from(Span::styled(
            strings.recovery_title(),
            Style::default().fg(STATUS_FAILED).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(message.to_string(), Style::default().fg(palette.fg))),
        Line::from(""),
        Line::from(Span::styled(strings.recovery_help(), Style::default().fg(palette.fg_dim))),
    ];
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("agentdeck")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(STATUS_FAILED))
                .style(Style::default().bg(palette.panel_bg)),
        );
    f.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Cuts `text` to at most `width` terminal cells, marking the cut with `…`.
pub(crate) fn truncate_to_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut result = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + ch_width + 1 > width {
            break;
        }
        result.push(ch);
        used += ch_width;
    }
    result.push('…');
    result
}

pub(crate) fn wrap_to_width(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }
    if text.is_empty() {
        return vec![String::new()];
    }
    let mut result = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;
    for ch in text.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(1).max(1);
        if current_width + ch_width > width && !current.is_empty() {
            result.push(current);
            current = String::new();
            current_width = 0;
        }
        current.push(ch);
        current_width += ch_width;
    }
    result.push(current);
    result
}
