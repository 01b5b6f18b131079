use rand::rngs::StdRng;
use rand::Rng;
use std::time::Instant;

use crate::config::Settings;
use crate::model::{
    Board, Car, CarId, CellKind, Clock, Dir, Frog, Outcome, RoundState, Stork, CAR_NEAR_DISTANCE,
    FRAME_RATE, MAX_FRAME_RATE, MAX_MOVES, STORK_DELAY_SECS, STORK_STEP_INTERVAL,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RoundAction {
    Move(Dir),
    BoardToggle,
}

pub(crate) fn new_round(config: &Settings, mut rng: StdRng, now: Instant) -> RoundState {
    let board = Board::generate(config.rows, config.cols, config.lanes, &mut rng);
    let cars = board
        .lane_rows
        .iter()
        .map(|&row| spawn_car(row, config, &mut rng))
        .collect();
    let frog = spawn_frog(&board, &mut rng);
    let stork = spawn_stork(&board, &mut rng, now);
    RoundState {
        config: config.clone(),
        clock: Clock::new(config.car_speed),
        board,
        cars,
        frog,
        stork,
        rng,
    }
}

fn spawn_car(row: i32, config: &Settings, rng: &mut StdRng) -> Car {
    Car {
        row,
        x: rng.gen_range(1..=config.cols - 2 - config.car_length),
        length: rng.gen_range(1..=config.car_length),
        dir: if rng.gen_bool(0.5) { 1 } else { -1 },
        speed: rng.gen_range(1..=config.car_speed),
        respeed_x: rng.gen_range(1..=config.cols - 2 - config.car_length),
        hostile: rng.gen_bool(0.5),
    }
}

fn spawn_frog(board: &Board, rng: &mut StdRng) -> Frog {
    let y = board.rows - 2;
    let mut x = rng.gen_range(1..=board.cols - 2);
    while matches!(board.classify(y, x), CellKind::Obstacle | CellKind::Coin) {
        x = rng.gen_range(1..=board.cols - 2);
    }
    Frog {
        x,
        y,
        moves_left: MAX_MOVES,
        max_moves: MAX_MOVES,
        points: 0,
        carried: None,
        last_move: None,
    }
}

fn spawn_stork(board: &Board, rng: &mut StdRng, now: Instant) -> Stork {
    Stork {
        x: rng.gen_range(1..=board.cols - 2),
        y: board.rows - 2,
        delay_secs: STORK_DELAY_SECS,
        active: false,
        last_step: now,
    }
}

/// One simulation step. Ordering is load-bearing: the clock feeds the car
/// gates, input resolves before motion, and the caller evaluates the outcome
/// against post-motion positions on the next iteration.
pub(crate) fn tick(state: &mut RoundState, action: Option<RoundAction>, now: Instant) {
    advance_clock(state);
    if let Some(action) = action {
        apply_action(state, action, now);
    }
    advance_cars(state);
    advance_stork(state, now);
}

pub(crate) fn advance_clock(state: &mut RoundState) {
    state.clock.frame_acc += FRAME_RATE;
    if state.clock.frame_acc >= MAX_FRAME_RATE {
        state.clock.time += 1;
        state.clock.frame_acc = 0;
        if state.frog.moves_left < state.frog.max_moves {
            state.frog.moves_left += 1;
        }
    }
    state.clock.cars_time -= 1;
    if state.clock.cars_time == 0 {
        state.clock.cars_time = state.clock.cars_timing;
    }
}

pub(crate) fn apply_action(state: &mut RoundState, action: RoundAction, now: Instant) {
    if !state.frog.can_move(now) {
        return;
    }
    match action {
        RoundAction::BoardToggle => toggle_boarding(state, now),
        RoundAction::Move(dir) => move_frog(state, dir, now),
    }
}

fn toggle_boarding(state: &mut RoundState, now: Instant) {
    let frog = &mut state.frog;
    if frog.carried.is_some() {
        // Only step off inside the playfield.
        if frog.x > 0 && frog.x <= state.config.cols - 2 {
            frog.carried = None;
            frog.last_move = Some(now);
        }
        return;
    }
    let hit = state
        .cars
        .iter()
        .position(|car| car.row == frog.y && car.covers(frog.x));
    if let Some(i) = hit {
        frog.carried = Some(CarId(i));
        frog.last_move = Some(now);
    }
}

fn move_frog(state: &mut RoundState, dir: Dir, now: Instant) {
    if state.frog.moves_left == 0 || state.frog.carried.is_some() {
        return;
    }
    let (dx, dy) = dir.delta();
    let nx = state.frog.x + dx;
    let ny = state.frog.y + dy;
    if nx <= 0 || nx >= state.config.cols - 1 || ny <= 0 || ny >= state.config.rows - 1 {
        return;
    }
    match state.board.classify(ny, nx) {
        CellKind::Obstacle => return,
        CellKind::Coin => {
            state.board.set_kind(ny, nx, CellKind::Grass);
            state.frog.points += 1;
        }
        _ => {}
    }
    state.frog.x = nx;
    state.frog.y = ny;
    state.frog.moves_left -= 1;
    state.frog.last_move = Some(now);
}

pub(crate) fn advance_cars(state: &mut RoundState) {
    let RoundState {
        config,
        cars,
        frog,
        clock,
        rng,
        ..
    } = state;

    for (i, car) in cars.iter_mut().enumerate() {
        // Friendly cars yield while the frog stands next to them on their
        // lane; hostile cars never do.
        if clock.cars_time % car.speed == 0 && (car.hostile || !frog_near(frog, car)) {
            car.x += car.dir;
        }
        if car.x == car.respeed_x {
            car.speed = rng.gen_range(1..=config.car_speed);
        }
        if frog.carried == Some(CarId(i)) && clock.cars_time % car.speed == 0 {
            car.x += car.dir;
            frog.x = car.x;
        }
        if car.fully_exited(config.cols) {
            respawn_car(car, frog.carried == Some(CarId(i)), config, rng);
        }
    }
}

fn frog_near(frog: &Frog, car: &Car) -> bool {
    frog.y == car.row && car.cells().any(|c| (frog.x - c).abs() <= CAR_NEAR_DISTANCE)
}

fn respawn_car(car: &mut Car, carried: bool, config: &Settings, rng: &mut StdRng) {
    car.speed = rng.gen_range(1..=config.car_speed);
    car.respeed_x = rng.gen_range(1..=config.cols - 2 - config.car_length);
    if carried {
        // The carrier keeps its footprint; relocating it would rip the frog
        // off mid-ride.
        return;
    }
    car.length = rng.gen_range(1..=config.car_length);
    car.hostile = rng.gen_bool(0.5);
    car.x = if car.dir == 1 {
        -car.length
    } else {
        config.cols + car.length - 1
    };
}

pub(crate) fn advance_stork(state: &mut RoundState, now: Instant) {
    let RoundState { stork, frog, clock, .. } = state;
    if clock.time < stork.delay_secs {
        return;
    }
    if !stork.active {
        // First step happens a further interval after activation.
        stork.active = true;
        stork.last_step = now;
        return;
    }
    if now.duration_since(stork.last_step) < STORK_STEP_INTERVAL {
        return;
    }
    // Greedy per-axis pursuit; terrain does not constrain the stork.
    if stork.x < frog.x {
        stork.x += 1;
    } else if stork.x > frog.x {
        stork.x -= 1;
    }
    if stork.y < frog.y {
        stork.y += 1;
    } else if stork.y > frog.y {
        stork.y -= 1;
    }
    stork.last_step = now;
}

/// Loss takes precedence over the win check within a tick.
pub(crate) fn evaluate(state: &RoundState) -> Option<Outcome> {
    if car_collision(state) || stork_collision(state) {
        return Some(Outcome::Lose);
    }
    if state.frog.y == 1 {
        return Some(Outcome::Win);
    }
    None
}

fn car_collision(state: &RoundState) -> bool {
    state.frog.carried.is_none()
        && state
            .cars
            .iter()
            .any(|car| car.hostile && car.row == state.frog.y && car.covers(state.frog.x))
}

fn stork_collision(state: &RoundState) -> bool {
    state.stork.active
        && state.frog.carried.is_none()
        && state.stork.x == state.frog.x
        && state.stork.y == state.frog.y
}
