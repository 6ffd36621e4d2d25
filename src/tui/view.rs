use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Gauge, List, ListItem, Paragraph};

use crate::shared::DisplayState;

use super::mode::{Focus, TuiState};

pub fn render(frame: &mut Frame, area: Rect, ds: &DisplayState, ts: &TuiState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title + global volume
            Constraint::Min(8),    // grid + active cards
            Constraint::Length(1), // footer / confirmation prompt
        ])
        .split(area);

    draw_header(frame, sections[0], ds);
    draw_body(frame, sections[1], ds, ts);
    draw_footer(frame, sections[2], ts);

    if ts.picker_open {
        draw_picker(frame, area, ds, ts);
    }
}

fn draw_header(frame: &mut Frame, area: Rect, ds: &DisplayState) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let backdrop = ds.backdrop.as_deref().unwrap_or("none");
    let title = Paragraph::new(Line::from(vec![
        Span::styled("lull", Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)),
        Span::raw("  backdrop: "),
        Span::styled(backdrop, Style::default().fg(Color::Cyan)),
    ]))
    .block(Block::bordered());
    frame.render_widget(title, halves[0]);

    let volume = Gauge::default()
        .block(Block::bordered().title("global volume"))
        .gauge_style(Style::default().fg(Color::Magenta))
        .label(format!("{}%", (ds.global_volume * 100.0).round() as u32))
        .ratio(ds.global_volume as f64);
    frame.render_widget(volume, halves[1]);
}

fn draw_body(frame: &mut Frame, area: Rect, ds: &DisplayState, ts: &TuiState) {
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(38), Constraint::Percentage(62)])
        .split(area);

    draw_grid(frame, panes[0], ds, ts);
    draw_cards(frame, panes[1], ds, ts);
}

fn draw_grid(frame: &mut Frame, area: Rect, ds: &DisplayState, ts: &TuiState) {
    let items: Vec<ListItem> = ds
        .grid
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let marker = if cell.active { "● " } else { "○ " };
            let mut style = if cell.active {
                Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            if cell.unavailable {
                style = Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM);
            }
            if ts.focus == Focus::Grid && i == ts.grid_cursor {
                style = style.bg(Color::DarkGray);
            }
            let suffix = if cell.unavailable { "  (unavailable)" } else { "" };
            ListItem::new(Line::from(Span::styled(
                format!("{marker}{}{suffix}", cell.name),
                style,
            )))
        })
        .collect();

    let block = pane_block("sounds", ts.focus == Focus::Grid);
    if items.is_empty() {
        let empty = Paragraph::new("no WAV files found in sounds/").block(block);
        frame.render_widget(empty, area);
    } else {
        frame.render_widget(List::new(items).block(block), area);
    }
}

fn draw_cards(frame: &mut Frame, area: Rect, ds: &DisplayState, ts: &TuiState) {
    let mut lines: Vec<Line> = Vec::new();
    for (i, card) in ds.cards.iter().enumerate() {
        let selected = ts.focus == Focus::Cards && i == ts.card_cursor;
        let cursor = if selected { "▸ " } else { "  " };
        let mut style = Style::default().fg(Color::White);
        if selected {
            style = style.add_modifier(Modifier::BOLD);
        }
        let waiting = if card.waiting { "  ~gap" } else { "" };
        lines.push(Line::from(Span::styled(
            format!(
                "{cursor}{}  {:>3.0}%  {:.1}x  {}ms{waiting}",
                card.name,
                card.volume * 100.0,
                card.speed,
                card.loop_gap_ms,
            ),
            style,
        )));
        if card.expanded {
            lines.push(setting_bar("volume", card.volume, format!("{:.0}%", card.volume * 100.0)));
            lines.push(setting_bar(
                "speed ",
                (card.speed - 0.5) / 1.5,
                format!("{:.1}x", card.speed),
            ));
            lines.push(Line::from(Span::styled(
                format!("    gap    {} ms between plays", card.loop_gap_ms),
                Style::default().fg(Color::Gray),
            )));
        }
    }

    let block = pane_block("active", ts.focus == Focus::Cards);
    if lines.is_empty() {
        let empty = Paragraph::new("nothing playing, toggle a sound").block(block);
        frame.render_widget(empty, area);
    } else {
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}

fn setting_bar(label: &str, fraction: f32, value: String) -> Line<'static> {
    const WIDTH: usize = 20;
    let filled = ((fraction.clamp(0.0, 1.0) * WIDTH as f32).round() as usize).min(WIDTH);
    let bar = format!("{}{}", "█".repeat(filled), "─".repeat(WIDTH - filled));
    Line::from(vec![
        Span::styled(format!("    {label} "), Style::default().fg(Color::Gray)),
        Span::styled(bar, Style::default().fg(Color::Magenta)),
        Span::styled(format!(" {value}"), Style::default().fg(Color::Gray)),
    ])
}

fn draw_footer(frame: &mut Frame, area: Rect, ts: &TuiState) {
    let footer = if ts.confirm_clear {
        Line::from(Span::styled(
            "clear all sounds and settings? press y to confirm",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from(Span::styled(
            "tab panes  enter toggle  e edit  x remove  [ ] global  - = volume  , . speed  ; ' gap  b backdrop  c clear  esc quit",
            Style::default().fg(Color::DarkGray),
        ))
    };
    frame.render_widget(Paragraph::new(footer), area);
}

fn draw_picker(frame: &mut Frame, area: Rect, ds: &DisplayState, ts: &TuiState) {
    let popup = centered_rect(area, 40, (ds.backdrops.len() as u16 + 3).max(5));
    frame.render_widget(Clear, popup);

    let mut items: Vec<ListItem> = Vec::with_capacity(ds.backdrops.len() + 1);
    items.push(picker_item("none", false, !ds.backdrops.iter().any(|b| b.selected), ts.picker_cursor == 0));
    for (i, b) in ds.backdrops.iter().enumerate() {
        items.push(picker_item(
            &b.display_name,
            b.is_video,
            b.selected,
            ts.picker_cursor == i + 1,
        ));
    }

    let list = List::new(items).block(Block::bordered().title("backdrop"));
    frame.render_widget(list, popup);
}

fn picker_item(name: &str, is_video: bool, selected: bool, under_cursor: bool) -> ListItem<'static> {
    let marker = if selected { "● " } else { "○ " };
    let tag = if is_video { "  (video)" } else { "" };
    let mut style = Style::default().fg(Color::Gray);
    if selected {
        style = Style::default().fg(Color::Cyan);
    }
    if under_cursor {
        style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
    }
    ListItem::new(Line::from(Span::styled(format!("{marker}{name}{tag}"), style)))
}

fn pane_block(title: &'static str, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Magenta)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Block::bordered().title(title).border_style(style)
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width.saturating_sub(w)) / 2,
        y: area.y + (area.height.saturating_sub(h)) / 2,
        width: w,
        height: h,
    }
}
