use rand::rngs::StdRng;
use rand::Rng;
use std::time::{Duration, Instant};

use crate::config::Settings;

pub(crate) const OBSTACLE_COUNT: u32 = 30;
pub(crate) const COIN_COUNT: u32 = 10;
pub(crate) const OBSTACLE_SIGN: char = 'X';
pub(crate) const COIN_SIGN: char = '*';
pub(crate) const STORK_SIGN: char = 'S';

pub(crate) const MAX_MOVES: u32 = 5;
pub(crate) const STORK_DELAY_SECS: u32 = 5;
pub(crate) const CAR_NEAR_DISTANCE: i32 = 2;

pub(crate) const FRAME_RATE: u32 = 100;
pub(crate) const MAX_FRAME_RATE: u32 = 1000;
pub(crate) const FRAME_INTERVAL: Duration = Duration::from_millis(100);
pub(crate) const MOVE_COOLDOWN: Duration = Duration::from_millis(200);
pub(crate) const STORK_STEP_INTERVAL: Duration = Duration::from_secs(2);
pub(crate) const END_SCREEN_PAUSE: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CellKind {
    Grass,
    Road,
    Destination,
    Obstacle,
    Coin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    pub(crate) fn delta(self) -> (i32, i32) {
        match self {
            Dir::Up => (0, -1),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
        }
    }
}

/// Static terrain for one round. Row 0, row rows-1 and the outermost columns
/// are the border; row 1 is the destination strip; a fixed set of full-width
/// road rows hosts the cars. Mutated only when a coin is collected.
pub(crate) struct Board {
    pub(crate) rows: i32,
    pub(crate) cols: i32,
    cells: Vec<CellKind>,
    /// Road rows in order of discovery; index doubles as the lane index.
    pub(crate) lane_rows: Vec<i32>,
}

impl Board {
    pub(crate) fn generate(rows: i32, cols: i32, lanes: usize, rng: &mut StdRng) -> Self {
        let mut board = Self {
            rows,
            cols,
            cells: vec![CellKind::Grass; (rows * cols) as usize],
            lane_rows: Vec::with_capacity(lanes),
        };

        for col in 0..cols {
            board.set_kind(1, col, CellKind::Destination);
        }

        while board.lane_rows.len() < lanes {
            let row = rng.gen_range(2..=rows - 3);
            if board.lane_rows.contains(&row) {
                continue;
            }
            for col in 0..cols {
                board.set_kind(row, col, CellKind::Road);
            }
            board.lane_rows.push(row);
        }

        board.scatter(OBSTACLE_COUNT, CellKind::Obstacle, rng);
        board.scatter(COIN_COUNT, CellKind::Coin, rng);
        board
    }

    // Rejection sampling: terminates because config validation guarantees the
    // grass capacity exceeds the scatter counts.
    fn scatter(&mut self, count: u32, kind: CellKind, rng: &mut StdRng) {
        let mut placed = 0;
        while placed < count {
            let row = rng.gen_range(1..=self.rows - 2);
            let col = rng.gen_range(1..=self.cols - 2);
            if self.classify(row, col) == CellKind::Grass {
                self.set_kind(row, col, kind);
                placed += 1;
            }
        }
    }

    pub(crate) fn classify(&self, row: i32, col: i32) -> CellKind {
        self.cells[(row * self.cols + col) as usize]
    }

    pub(crate) fn set_kind(&mut self, row: i32, col: i32, kind: CellKind) {
        self.cells[(row * self.cols + col) as usize] = kind;
    }
}

/// Index into the round's car slab. Respawns reuse the slot, so the id stays
/// valid for the whole round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CarId(pub(crate) usize);

pub(crate) struct Car {
    pub(crate) row: i32,
    /// Leading cell; transiently outside the playfield around respawns.
    pub(crate) x: i32,
    pub(crate) length: i32,
    pub(crate) dir: i32,
    pub(crate) speed: u32,
    /// Crossing this x re-rolls the speed.
    pub(crate) respeed_x: i32,
    /// Hostile cars never yield to the frog and kill on contact.
    pub(crate) hostile: bool,
}

impl Car {
    pub(crate) fn cells(&self) -> impl Iterator<Item = i32> + '_ {
        (0..self.length).map(move |i| self.x + i * self.dir)
    }

    pub(crate) fn covers(&self, col: i32) -> bool {
        self.cells().any(|c| c == col)
    }

    pub(crate) fn fully_exited(&self, cols: i32) -> bool {
        (self.dir == 1 && self.x - self.length > cols - 2)
            || (self.dir == -1 && self.x < 1 - self.length)
    }
}

pub(crate) struct Frog {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) moves_left: u32,
    pub(crate) max_moves: u32,
    pub(crate) points: u32,
    pub(crate) carried: Option<CarId>,
    /// Last accepted move (directional or board/unboard); None before the
    /// first one, so the opening move is never rate-limited.
    pub(crate) last_move: Option<Instant>,
}

impl Frog {
    pub(crate) fn can_move(&self, now: Instant) -> bool {
        self.last_move
            .map_or(true, |t| now.duration_since(t) >= MOVE_COOLDOWN)
    }
}

pub(crate) struct Stork {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) delay_secs: u32,
    pub(crate) active: bool,
    pub(crate) last_step: Instant,
}

/// One driver, two cadences: a coarse per-second counter (regenerating frog
/// moves) and a cyclic countdown subdividing ticks for car speed gating.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Clock {
    pub(crate) time: u32,
    pub(crate) frame_acc: u32,
    pub(crate) cars_timing: u32,
    pub(crate) cars_time: u32,
}

impl Clock {
    pub(crate) fn new(car_speed: u32) -> Self {
        // Squaring widens the divisor range beyond the raw speed bound.
        let cars_timing = car_speed * car_speed;
        Self {
            time: 0,
            frame_acc: 0,
            cars_timing,
            cars_time: cars_timing,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Win,
    Lose,
}

/// Everything one round owns. Each per-tick system takes this by reference;
/// there is no other shared state.
pub(crate) struct RoundState {
    pub(crate) config: Settings,
    pub(crate) board: Board,
    pub(crate) cars: Vec<Car>,
    pub(crate) frog: Frog,
    pub(crate) stork: Stork,
    pub(crate) clock: Clock,
    pub(crate) rng: StdRng,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn board(seed: u64) -> Board {
        let mut rng = StdRng::seed_from_u64(seed);
        Board::generate(20, 30, 9, &mut rng)
    }

    #[test]
    fn destination_spans_row_one() {
        let b = board(1);
        for col in 0..30 {
            assert_eq!(b.classify(1, col), CellKind::Destination);
        }
    }

    #[test]
    fn lanes_are_distinct_full_road_rows_inside_bounds() {
        let b = board(2);
        assert_eq!(b.lane_rows.len(), 9);
        for (i, &row) in b.lane_rows.iter().enumerate() {
            assert!((2..=17).contains(&row), "lane row {row} out of range");
            assert!(!b.lane_rows[..i].contains(&row), "duplicate lane row");
            for col in 0..30 {
                assert_eq!(b.classify(row, col), CellKind::Road);
            }
        }
    }

    #[test]
    fn scatter_counts_and_placement() {
        for seed in 0..8 {
            let b = board(seed);
            let mut obstacles = 0;
            let mut coins = 0;
            for row in 0..20 {
                for col in 0..30 {
                    match b.classify(row, col) {
                        CellKind::Obstacle => {
                            obstacles += 1;
                            assert_ne!(row, 1);
                            assert!(!b.lane_rows.contains(&row));
                        }
                        CellKind::Coin => {
                            coins += 1;
                            assert_ne!(row, 1);
                            assert!(!b.lane_rows.contains(&row));
                        }
                        _ => {}
                    }
                }
            }
            assert_eq!(obstacles, OBSTACLE_COUNT);
            assert_eq!(coins, COIN_COUNT);
        }
    }

    #[test]
    fn car_footprint_follows_direction() {
        let east = Car {
            row: 4,
            x: 10,
            length: 3,
            dir: 1,
            speed: 1,
            respeed_x: 5,
            hostile: true,
        };
        assert!(east.covers(10) && east.covers(11) && east.covers(12));
        assert!(!east.covers(9) && !east.covers(13));

        let west = Car { dir: -1, ..east };
        assert!(west.covers(10) && west.covers(9) && west.covers(8));
        assert!(!west.covers(11));
    }

    #[test]
    fn car_exit_detection() {
        let mut car = Car {
            row: 4,
            x: 0,
            length: 2,
            dir: 1,
            speed: 1,
            respeed_x: 5,
            hostile: false,
        };
        car.x = 30; // trailing cell still near the border
        assert!(!car.fully_exited(30));
        car.x = 31;
        assert!(car.fully_exited(30));

        car.dir = -1;
        car.x = -1;
        assert!(!car.fully_exited(30));
        car.x = -2;
        assert!(car.fully_exited(30));
    }
}
