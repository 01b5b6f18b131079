use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::time::Duration;

use crate::model::Dir;
use crate::sim::RoundAction;

/// Reads at most one action per tick: the first mappable keypress wins and
/// everything else pending is discarded, so buffered input can never unload
/// as a burst once the frog's cooldown clears.
pub(crate) fn poll_round_action() -> anyhow::Result<Option<RoundAction>> {
    let mut action = None;
    while event::poll(Duration::ZERO)? {
        if let Event::Key(k) = event::read()? {
            if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                if action.is_none() {
                    action = map_key(k.code);
                }
            }
        }
    }
    Ok(action)
}

pub(crate) fn map_key(code: KeyCode) -> Option<RoundAction> {
    match code {
        KeyCode::Up => Some(RoundAction::Move(Dir::Up)),
        KeyCode::Down => Some(RoundAction::Move(Dir::Down)),
        KeyCode::Left => Some(RoundAction::Move(Dir::Left)),
        KeyCode::Right => Some(RoundAction::Move(Dir::Right)),
        KeyCode::Char(' ') => Some(RoundAction::BoardToggle),
        _ => None,
    }
}

/// Throws away anything buffered, e.g. keys mashed during an end screen.
pub(crate) fn drain_pending() -> anyhow::Result<()> {
    while event::poll(Duration::ZERO)? {
        let _ = event::read()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_map_to_moves_and_space_toggles_boarding() {
        assert_eq!(map_key(KeyCode::Up), Some(RoundAction::Move(Dir::Up)));
        assert_eq!(map_key(KeyCode::Down), Some(RoundAction::Move(Dir::Down)));
        assert_eq!(map_key(KeyCode::Left), Some(RoundAction::Move(Dir::Left)));
        assert_eq!(map_key(KeyCode::Right), Some(RoundAction::Move(Dir::Right)));
        assert_eq!(map_key(KeyCode::Char(' ')), Some(RoundAction::BoardToggle));
    }

    #[test]
    fn unbound_keys_are_ignored() {
        assert_eq!(map_key(KeyCode::Char('x')), None);
        assert_eq!(map_key(KeyCode::Enter), None);
        assert_eq!(map_key(KeyCode::Esc), None);
    }
}
