use anyhow::{ensure, Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::style::Color;
use crossterm::terminal;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::thread;
use std::time::Instant;

use crate::config::{self, Paths, Settings};
use crate::input;
use crate::model::{Outcome, RoundState, END_SCREEN_PAUSE, FRAME_INTERVAL};
use crate::render::{self, Terminal, MENU_ITEMS, STATS_WIDTH};
use crate::sim;
use crate::storage::{self, HighScore};

enum MenuChoice {
    Start,
    Instructions,
    Exit,
}

pub(crate) fn run() -> Result<()> {
    let paths = config::project_paths()?;
    let settings = config::load_settings(&paths.settings_path);
    config::validate(&settings)?;

    // Playfield plus the stats panel must fit before we take over the screen.
    let (tw, th) = terminal::size().context("could not query terminal size")?;
    let need_w = settings.cols as u16 + 1 + STATS_WIDTH;
    let need_h = settings.rows as u16;
    ensure!(
        tw >= need_w && th >= need_h,
        "terminal too small: need {need_w}x{need_h}, have {tw}x{th}"
    );

    let mut term = Terminal::begin().context("could not initialise the terminal")?;
    let res = main_loop(&mut term, &settings, &paths);
    let restored = term.end();
    res.and(restored)
}

fn main_loop(term: &mut Terminal, settings: &Settings, paths: &Paths) -> Result<()> {
    loop {
        match menu_select(term)? {
            MenuChoice::Start => play_round(term, settings, paths)?,
            MenuChoice::Instructions => show_instructions(term)?,
            MenuChoice::Exit => return Ok(()),
        }
    }
}

fn menu_select(term: &mut Terminal) -> Result<MenuChoice> {
    let mut highlight = 0usize;
    loop {
        term.cur.clear(Color::Black);
        render::draw_menu(&mut term.cur, highlight);
        term.present(true)?;

        if let Event::Key(k) = event::read()? {
            if k.kind != KeyEventKind::Press {
                continue;
            }
            match k.code {
                KeyCode::Up => {
                    highlight = (highlight + MENU_ITEMS.len() - 1) % MENU_ITEMS.len();
                }
                KeyCode::Down => highlight = (highlight + 1) % MENU_ITEMS.len(),
                KeyCode::Enter => {
                    return Ok(match highlight {
                        0 => MenuChoice::Start,
                        1 => MenuChoice::Instructions,
                        _ => MenuChoice::Exit,
                    });
                }
                _ => {}
            }
        }
    }
}

fn show_instructions(term: &mut Terminal) -> Result<()> {
    term.cur.clear(Color::Black);
    render::draw_instructions(&mut term.cur);
    term.present(true)?;
    loop {
        if let Event::Key(k) = event::read()? {
            if k.kind == KeyEventKind::Press {
                return Ok(());
            }
        }
    }
}

/// One round, run to its terminal outcome. Per iteration: outcome check,
/// clock, at most one input, car motion, stork motion, frame, sleep — later
/// steps rely on the frog position the input step already settled.
fn play_round(term: &mut Terminal, settings: &Settings, paths: &Paths) -> Result<()> {
    let mut state = sim::new_round(settings, StdRng::from_entropy(), Instant::now());
    let best = storage::load_high_score(&paths.high_score_path);

    loop {
        if let Some(outcome) = sim::evaluate(&state) {
            return finish_round(term, paths, &state, outcome);
        }

        let action = input::poll_round_action()?;
        sim::tick(&mut state, action, Instant::now());

        term.cur.clear(Color::Black);
        render::draw_round(&mut term.cur, &state);
        render::draw_stats(&mut term.cur, &state, best);
        term.present(true)?;

        thread::sleep(FRAME_INTERVAL);
    }
}

fn finish_round(
    term: &mut Terminal,
    paths: &Paths,
    state: &RoundState,
    outcome: Outcome,
) -> Result<()> {
    let points = state.frog.points;
    let time = state.clock.time;

    let best = storage::load_high_score(&paths.high_score_path);
    let new_high = best.beaten_by(points, time);
    if new_high {
        storage::save_high_score_atomic(
            &paths.high_score_path,
            &HighScore {
                score: points,
                time,
            },
        )
        .context("could not persist the high score")?;
    }

    term.cur.clear(Color::Black);
    render::draw_end(&mut term.cur, outcome, points, time, new_high);
    term.present(true)?;
    thread::sleep(END_SCREEN_PAUSE);

    // Keys mashed during the pause must not leak into the menu.
    input::drain_pending()?;
    Ok(())
}
