use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use crate::shared::{DisplayState, InputEvent, MAX_SPEED, MIN_SPEED};

use super::mode::{Focus, TuiState};

const VOLUME_STEP: f32 = 0.05;
const SPEED_STEP: f32 = 0.1;
const GAP_STEP_MS: u64 = 100;

// Poll for input and resolve raw keys into semantic events for the core.
// The DisplayState from the current frame supplies the values the knob
// steps are applied to, so every emitted value is absolute.
pub fn poll_input(
    timeout: Duration,
    ts: &mut TuiState,
    ds: &DisplayState,
) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code, ts, ds));
    }
    Ok(vec![])
}

fn handle_key(code: KeyCode, ts: &mut TuiState, ds: &DisplayState) -> Vec<InputEvent> {
    // an armed clear prompt swallows the next key: y fires, anything cancels
    if ts.confirm_clear {
        ts.confirm_clear = false;
        return match code {
            KeyCode::Char('y') => vec![InputEvent::ClearAllConfirmed],
            _ => vec![],
        };
    }

    if ts.picker_open {
        return handle_picker_key(code, ts, ds);
    }

    match code {
        KeyCode::Esc => vec![InputEvent::Quit],
        KeyCode::Tab => {
            ts.focus = match ts.focus {
                Focus::Grid => Focus::Cards,
                Focus::Cards => Focus::Grid,
            };
            vec![]
        }

        KeyCode::Up | KeyCode::Char('k') => {
            move_cursor(ts, ds, -1);
            vec![]
        }
        KeyCode::Down | KeyCode::Char('j') => {
            move_cursor(ts, ds, 1);
            vec![]
        }

        KeyCode::Enter | KeyCode::Char(' ') => match ts.focus {
            Focus::Grid if !ds.grid.is_empty() => {
                vec![InputEvent::ToggleSound(ts.grid_cursor.min(ds.grid.len() - 1))]
            }
            Focus::Cards => selected_card(ts, ds)
                .map(|name| vec![InputEvent::ToggleExpanded(name)])
                .unwrap_or_default(),
            _ => vec![],
        },

        KeyCode::Char('e') => selected_card(ts, ds)
            .map(|name| vec![InputEvent::ToggleExpanded(name)])
            .unwrap_or_default(),

        KeyCode::Char('x') | KeyCode::Backspace | KeyCode::Delete => selected_card(ts, ds)
            .map(|name| vec![InputEvent::RemoveSound(name)])
            .unwrap_or_default(),

        // global volume knob
        KeyCode::Char('[') => vec![InputEvent::SetGlobalVolume(
            (ds.global_volume - VOLUME_STEP).clamp(0.0, 1.0),
        )],
        KeyCode::Char(']') => vec![InputEvent::SetGlobalVolume(
            (ds.global_volume + VOLUME_STEP).clamp(0.0, 1.0),
        )],

        // per-card knobs, applied to the selected card
        KeyCode::Char('-') => adjust_volume(ts, ds, -VOLUME_STEP),
        KeyCode::Char('=') => adjust_volume(ts, ds, VOLUME_STEP),
        KeyCode::Char(',') => adjust_speed(ts, ds, -SPEED_STEP),
        KeyCode::Char('.') => adjust_speed(ts, ds, SPEED_STEP),
        KeyCode::Char(';') => adjust_gap(ts, ds, false),
        KeyCode::Char('\'') => adjust_gap(ts, ds, true),

        KeyCode::Char('b') => {
            ts.picker_open = true;
            // start on the current selection
            ts.picker_cursor = ds
                .backdrops
                .iter()
                .position(|b| b.selected)
                .map(|i| i + 1)
                .unwrap_or(0);
            vec![]
        }

        KeyCode::Char('c') => {
            ts.confirm_clear = true;
            vec![]
        }

        _ => vec![],
    }
}

fn handle_picker_key(code: KeyCode, ts: &mut TuiState, ds: &DisplayState) -> Vec<InputEvent> {
    match code {
        KeyCode::Esc | KeyCode::Char('b') => {
            ts.picker_open = false;
            vec![]
        }
        KeyCode::Up | KeyCode::Char('k') => {
            ts.picker_cursor = ts.picker_cursor.saturating_sub(1);
            vec![]
        }
        KeyCode::Down | KeyCode::Char('j') => {
            ts.picker_cursor = (ts.picker_cursor + 1).min(ds.backdrops.len());
            vec![]
        }
        KeyCode::Enter => {
            ts.picker_open = false;
            let choice = if ts.picker_cursor == 0 {
                None
            } else {
                ds.backdrops
                    .get(ts.picker_cursor - 1)
                    .map(|b| b.file.clone())
            };
            vec![InputEvent::SelectBackdrop(choice)]
        }
        _ => vec![],
    }
}

fn move_cursor(ts: &mut TuiState, ds: &DisplayState, delta: isize) {
    match ts.focus {
        Focus::Grid => ts.grid_cursor = step(ts.grid_cursor, delta, ds.grid.len()),
        Focus::Cards => ts.card_cursor = step(ts.card_cursor, delta, ds.cards.len()),
    }
}

fn step(cursor: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let max = len - 1;
    if delta < 0 {
        cursor.saturating_sub(delta.unsigned_abs())
    } else {
        (cursor + delta as usize).min(max)
    }
}

fn selected_card(ts: &TuiState, ds: &DisplayState) -> Option<String> {
    ds.cards
        .get(ts.card_cursor.min(ds.cards.len().saturating_sub(1)))
        .map(|c| c.name.clone())
}

fn adjust_volume(ts: &TuiState, ds: &DisplayState, delta: f32) -> Vec<InputEvent> {
    card_value(ts, ds, |card| {
        InputEvent::AdjustSoundVolume(card.name.clone(), (card.volume + delta).clamp(0.0, 1.0))
    })
}

fn adjust_speed(ts: &TuiState, ds: &DisplayState, delta: f32) -> Vec<InputEvent> {
    card_value(ts, ds, |card| {
        InputEvent::AdjustSoundSpeed(
            card.name.clone(),
            (card.speed + delta).clamp(MIN_SPEED, MAX_SPEED),
        )
    })
}

fn adjust_gap(ts: &TuiState, ds: &DisplayState, up: bool) -> Vec<InputEvent> {
    card_value(ts, ds, |card| {
        let gap = if up {
            card.loop_gap_ms + GAP_STEP_MS
        } else {
            card.loop_gap_ms.saturating_sub(GAP_STEP_MS)
        };
        InputEvent::AdjustSoundLoopGap(card.name.clone(), gap)
    })
}

fn card_value(
    ts: &TuiState,
    ds: &DisplayState,
    make: impl Fn(&crate::shared::SoundCard) -> InputEvent,
) -> Vec<InputEvent> {
    ds.cards
        .get(ts.card_cursor.min(ds.cards.len().saturating_sub(1)))
        .map(|card| vec![make(card)])
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::SoundCard;

    fn display_with_cards(names: &[&str]) -> DisplayState {
        DisplayState {
            cards: names
                .iter()
                .map(|n| SoundCard {
                    name: n.to_string(),
                    volume: 0.5,
                    speed: 1.0,
                    loop_gap_ms: 0,
                    expanded: false,
                    waiting: false,
                })
                .collect(),
            global_volume: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn clear_needs_explicit_confirmation() {
        let mut ts = TuiState::default();
        let ds = DisplayState::default();
        assert!(handle_key(KeyCode::Char('c'), &mut ts, &ds).is_empty());
        assert!(ts.confirm_clear);
        // any key but y cancels
        assert!(handle_key(KeyCode::Char('n'), &mut ts, &ds).is_empty());
        assert!(!ts.confirm_clear);

        handle_key(KeyCode::Char('c'), &mut ts, &ds);
        let events = handle_key(KeyCode::Char('y'), &mut ts, &ds);
        assert_eq!(events, vec![InputEvent::ClearAllConfirmed]);
    }

    #[test]
    fn card_knobs_emit_absolute_values() {
        let mut ts = TuiState::default();
        ts.focus = Focus::Cards;
        let ds = display_with_cards(&["rain"]);
        let events = handle_key(KeyCode::Char('='), &mut ts, &ds);
        match events.as_slice() {
            [InputEvent::AdjustSoundVolume(name, v)] => {
                assert_eq!(name, "rain");
                assert!((v - 0.55).abs() < 1e-6);
            }
            other => panic!("expected AdjustSoundVolume, got {other:?}"),
        }
        let events = handle_key(KeyCode::Char('\''), &mut ts, &ds);
        assert_eq!(
            events,
            vec![InputEvent::AdjustSoundLoopGap("rain".to_string(), 100)]
        );
    }

    #[test]
    fn global_volume_clamps_at_the_top() {
        let mut ts = TuiState::default();
        let mut ds = DisplayState::default();
        ds.global_volume = 0.98;
        let events = handle_key(KeyCode::Char(']'), &mut ts, &ds);
        assert_eq!(events, vec![InputEvent::SetGlobalVolume(1.0)]);
    }

    #[test]
    fn picker_enter_on_first_row_clears_the_backdrop() {
        let mut ts = TuiState::default();
        ts.picker_open = true;
        ts.picker_cursor = 0;
        let ds = DisplayState::default();
        let events = handle_key(KeyCode::Enter, &mut ts, &ds);
        assert_eq!(events, vec![InputEvent::SelectBackdrop(None)]);
        assert!(!ts.picker_open);
    }
}
