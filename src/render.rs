use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

use crate::model::{Car, CarId, CellKind, Outcome, RoundState, COIN_SIGN, OBSTACLE_SIGN, STORK_SIGN};
use crate::storage::HighScore;

pub(crate) const STATS_WIDTH: u16 = 20;
pub(crate) const STATS_HEIGHT: u16 = 9;

pub(crate) const MENU_ITEMS: [&str; 3] = ["Start Game", "Instructions", "Exit"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }

    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }

    pub(crate) fn get(&self, x: u16, y: u16) -> Cell {
        self.cells[self.idx(x, y)]
    }

    pub(crate) fn clear(&mut self, bg: Color) {
        for c in &mut self.cells {
            c.ch = ' ';
            c.fg = Color::White;
            c.bg = bg;
        }
    }

    pub(crate) fn put_str(&mut self, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
        let mut xx = x;
        for ch in s.chars() {
            if xx >= self.w {
                break;
            }
            self.set(xx, y, Cell { ch, fg, bg });
            xx += 1;
        }
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn present(&mut self, diff_only: bool) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if diff_only && c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;
                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }
                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

fn terrain_cell(kind: CellKind) -> Cell {
    match kind {
        CellKind::Grass => Cell {
            ch: ' ',
            fg: Color::Black,
            bg: Color::Green,
        },
        CellKind::Road => Cell {
            ch: ' ',
            fg: Color::Black,
            bg: Color::White,
        },
        CellKind::Destination => Cell {
            ch: ' ',
            fg: Color::Black,
            bg: Color::Yellow,
        },
        CellKind::Obstacle => Cell {
            ch: OBSTACLE_SIGN,
            fg: Color::Red,
            bg: Color::Green,
        },
        CellKind::Coin => Cell {
            ch: COIN_SIGN,
            fg: Color::Yellow,
            bg: Color::Green,
        },
    }
}

fn car_color(car: &Car, carrying: bool) -> Color {
    if carrying {
        Color::Yellow
    } else if car.hostile {
        Color::Red
    } else {
        Color::Blue
    }
}

/// The whole frame derives from the round state; nothing here mutates it.
pub(crate) fn draw_round(buf: &mut CellBuffer, state: &RoundState) {
    let rows = state.board.rows;
    let cols = state.board.cols;

    draw_frame(buf, 0, 0, cols as u16, rows as u16);
    for row in 1..rows - 1 {
        for col in 1..cols - 1 {
            buf.set(
                col as u16,
                row as u16,
                terrain_cell(state.board.classify(row, col)),
            );
        }
    }

    for (i, car) in state.cars.iter().enumerate() {
        let fg = car_color(car, state.frog.carried == Some(CarId(i)));
        for cx in car.cells() {
            // Never draw over the border columns.
            if cx > 0 && cx < cols - 1 {
                buf.set(
                    cx as u16,
                    car.row as u16,
                    Cell {
                        ch: state.config.car_sign,
                        fg,
                        bg: Color::White,
                    },
                );
            }
        }
    }

    if state.stork.active {
        buf.set(
            state.stork.x as u16,
            state.stork.y as u16,
            Cell {
                ch: STORK_SIGN,
                fg: Color::Cyan,
                bg: Color::Black,
            },
        );
    }

    buf.set(
        state.frog.x as u16,
        state.frog.y as u16,
        Cell {
            ch: state.config.frog_sign,
            fg: Color::Green,
            bg: Color::Black,
        },
    );
}

pub(crate) fn draw_stats(buf: &mut CellBuffer, state: &RoundState, best: HighScore) {
    let x0 = state.board.cols as u16 + 1;
    draw_frame(buf, x0, 0, STATS_WIDTH, STATS_HEIGHT);

    let fg = Color::White;
    let bg = Color::Black;
    buf.put_str(x0 + 1, 1, &format!("Time: {}", state.clock.time), fg, bg);
    buf.put_str(x0 + 1, 2, &format!("Moves: {}", state.frog.moves_left), fg, bg);
    buf.put_str(x0 + 1, 3, &format!("Points: {}", state.frog.points), fg, bg);
    buf.put_str(
        x0 + 1,
        5,
        &format!("Best: {} ({}s)", best.score, best.time),
        fg,
        bg,
    );
}

pub(crate) fn draw_menu(buf: &mut CellBuffer, highlight: usize) {
    for (i, item) in MENU_ITEMS.iter().enumerate() {
        let (fg, bg) = if i == highlight {
            (Color::Black, Color::White)
        } else {
            (Color::White, Color::Black)
        };
        buf.put_str(5, 5 + i as u16, item, fg, bg);
    }
}

pub(crate) fn draw_instructions(buf: &mut CellBuffer) {
    let fg = Color::White;
    let bg = Color::Black;
    buf.put_str(5, 5, "Instructions:", fg, bg);
    buf.put_str(5, 7, "Use the arrow keys to move the frog.", fg, bg);
    buf.put_str(5, 9, "Space boards or leaves a stopped car.", fg, bg);
    buf.put_str(
        5,
        11,
        "Avoid cars and the stork and reach the other side of the road.",
        fg,
        bg,
    );
    buf.put_str(5, 13, "Press any key to return to the menu ...", fg, bg);
}

pub(crate) fn draw_end(
    buf: &mut CellBuffer,
    outcome: Outcome,
    points: u32,
    time: u32,
    new_high: bool,
) {
    let fg = Color::White;
    let bg = Color::Black;
    let title = match outcome {
        Outcome::Win => "You win!",
        Outcome::Lose => "You lose!",
    };
    buf.put_str(1, 1, title, fg, bg);
    if new_high {
        buf.put_str(1, 2, "New High Score!", Color::Yellow, bg);
    }
    buf.put_str(1, 3, &format!("Points: {points}"), fg, bg);
    buf.put_str(1, 4, &format!("Time: {time}"), fg, bg);
}

fn draw_frame(buf: &mut CellBuffer, x0: u16, y0: u16, w: u16, h: u16) {
    let fg = Color::White;
    let bg = Color::Black;
    let cell = |ch| Cell { ch, fg, bg };

    for x in x0 + 1..x0 + w - 1 {
        buf.set(x, y0, cell('─'));
        buf.set(x, y0 + h - 1, cell('─'));
    }
    for y in y0 + 1..y0 + h - 1 {
        buf.set(x0, y, cell('│'));
        buf.set(x0 + w - 1, y, cell('│'));
    }
    buf.set(x0, y0, cell('┌'));
    buf.set(x0 + w - 1, y0, cell('┐'));
    buf.set(x0, y0 + h - 1, cell('└'));
    buf.set(x0 + w - 1, y0 + h - 1, cell('┘'));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::sim::new_round;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Instant;

    #[test]
    fn terrain_glyphs_match_the_palette() {
        assert_eq!(terrain_cell(CellKind::Coin).ch, '*');
        assert_eq!(terrain_cell(CellKind::Coin).fg, Color::Yellow);
        assert_eq!(terrain_cell(CellKind::Obstacle).ch, 'X');
        assert_eq!(terrain_cell(CellKind::Grass).bg, Color::Green);
        assert_eq!(terrain_cell(CellKind::Road).bg, Color::White);
        assert_eq!(terrain_cell(CellKind::Destination).bg, Color::Yellow);
    }

    #[test]
    fn carrying_color_wins_over_hostility() {
        let car = Car {
            row: 2,
            x: 5,
            length: 2,
            dir: 1,
            speed: 1,
            respeed_x: 3,
            hostile: true,
        };
        assert_eq!(car_color(&car, true), Color::Yellow);
        assert_eq!(car_color(&car, false), Color::Red);
        let friendly = Car {
            hostile: false,
            ..car
        };
        assert_eq!(car_color(&friendly, false), Color::Blue);
    }

    #[test]
    fn frog_is_drawn_on_top_of_its_carrier() {
        let mut state = new_round(
            &Settings::default(),
            StdRng::seed_from_u64(1),
            Instant::now(),
        );
        let lane = state.board.lane_rows[0];
        state.cars[0] = Car {
            row: lane,
            x: 10,
            length: 2,
            dir: 1,
            speed: 1,
            respeed_x: -1000,
            hostile: false,
        };
        state.frog.x = 10;
        state.frog.y = lane;
        state.frog.carried = Some(CarId(0));

        let mut buf = CellBuffer::new(60, 24);
        draw_round(&mut buf, &state);

        assert_eq!(buf.get(10, lane as u16).ch, state.config.frog_sign);
        // The rest of the carrier shows the occupied color.
        assert_eq!(buf.get(11, lane as u16).ch, state.config.car_sign);
        assert_eq!(buf.get(11, lane as u16).fg, Color::Yellow);
    }
}
