// the board is a fixed grid with a one cell wall ring on every side
// the snake moves 2 cells per horizontal step and 1 per vertical step,
// a terminal character is roughly twice as tall as it is wide
use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use colored::Colorize;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::input::Command;

pub const WIDTH: i32 = 40;
pub const HEIGHT: i32 = 20;
pub const TICK_INTERVAL_MS: u64 = 200;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Cell {
        Cell { x, y }
    }

    fn stepped(self, direction: Direction) -> Cell {
        match direction {
            Direction::Up => Cell::new(self.x, self.y - 1),
            Direction::Down => Cell::new(self.x, self.y + 1),
            Direction::Left => Cell::new(self.x - 2, self.y),
            Direction::Right => Cell::new(self.x + 2, self.y),
        }
    }

    fn on_wall_ring(self) -> bool {
        self.x <= 0 || self.x >= WIDTH - 1 || self.y <= 0 || self.y >= HEIGHT - 1
    }
}

pub struct GameState {
    body: VecDeque<Cell>, // the head is the first element
    fruit: Cell,
    direction: Direction,
    score: u32,
    game_over: bool,
    rng: StdRng,
}

impl GameState {
    pub fn new() -> GameState {
        Self::init(StdRng::from_os_rng())
    }

    pub fn with_seed(seed: u64) -> GameState {
        Self::init(StdRng::seed_from_u64(seed))
    }

    fn init(rng: StdRng) -> GameState {
        let mut body = VecDeque::new();
        body.push_back(Cell::new(WIDTH / 2, HEIGHT / 2));
        let mut state = GameState {
            body,
            fruit: Cell::new(0, 0),
            direction: Direction::Right,
            score: 0,
            game_over: false,
            rng,
        };
        state.generate_fruit();
        state
    }

    pub fn head(&self) -> Cell {
        *self.body.front().unwrap()
    }

    pub fn body(&self) -> &VecDeque<Cell> {
        &self.body
    }

    pub fn fruit(&self) -> Cell {
        self.fruit
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_over(&self) -> bool {
        self.game_over
    }

    pub fn steer(&mut self, direction: Direction) {
        if self.game_over {
            return;
        }
        // reversing through the neck would be an instant self collision
        if direction == self.direction.opposite() {
            return;
        }
        self.direction = direction;
    }

    pub fn quit(&mut self) {
        self.game_over = true;
    }

    pub fn update(&mut self) {
        if self.game_over {
            return;
        }
        let head = self.head();
        let new_head = head.stepped(self.direction);

        // the collision check runs against the whole pre-update body
        if self.body.contains(&new_head) || new_head.on_wall_ring() {
            self.game_over = true;
            return;
        }
        let consumed = self.eats_fruit(head, new_head);
        self.body.push_front(new_head);
        if consumed {
            self.score += 1;
            debug!("fruit eaten at ({}, {}), score {}", self.fruit.x, self.fruit.y, self.score);
            self.generate_fruit();
        } else {
            // cut off the tail by one to simulate movement
            self.body.pop_back();
        }
    }

    // horizontal steps move 2 cells, so a fruit sitting on the skipped
    // cell next to the old head counts as eaten too
    fn eats_fruit(&self, head: Cell, new_head: Cell) -> bool {
        if new_head == self.fruit {
            return true;
        }
        match self.direction {
            Direction::Left => head.x - 1 == self.fruit.x && head.y == self.fruit.y,
            Direction::Right => head.x + 1 == self.fruit.x && head.y == self.fruit.y,
            _ => false,
        }
    }

    fn generate_fruit(&mut self) {
        // the head starts on x = WIDTH / 2 and horizontal steps keep x
        // parity, so only cells of that parity are reachable head-on
        let parity = (WIDTH / 2) % 2;
        loop {
            let x = num::abs(self.rng.random::<i32>()) % (WIDTH - 3) + 1;
            let y = num::abs(self.rng.random::<i32>()) % (HEIGHT - 3) + 1;
            if x % 2 != parity {
                continue;
            }
            let fruit = Cell::new(x, y);
            if self.body.contains(&fruit) {
                continue;
            }
            self.fruit = fruit;
            break;
        }
    }

    pub fn frame(&self) -> String {
        let head = self.head();
        let mut out = format!("Score: {}\n", self.score);
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                let cell = Cell::new(x, y);
                if x == 0 || x == WIDTH - 1 || y == 0 || y == HEIGHT - 1 {
                    out.push('#');
                } else if cell == head {
                    if self.game_over {
                        out.push_str(&"X".red().to_string());
                    } else {
                        out.push_str(&"0".yellow().to_string());
                    }
                } else if self.body.iter().skip(1).any(|&c| c == cell) {
                    out.push_str(&"o".green().to_string());
                } else if cell == self.fruit {
                    out.push_str(&"F".red().to_string());
                } else {
                    out.push(' ');
                }
            }
            out.push('\n');
        }
        out
    }

    pub fn draw(&self) {
        clear_screen();
        print!("{}", self.frame());
    }
}

fn clear_screen() {
    print!("{}[2J", 27 as char);
    print!("{}[1;1H", 27 as char);
}

/// Runs the simulation until the game ends. Commands from the input
/// listener are applied between ticks, in arrival order.
pub fn play(state: &mut GameState, commands: Receiver<Command>) {
    let mut frame_start = Instant::now();
    loop {
        match commands.try_recv() {
            Ok(Command::Turn(direction)) => state.steer(direction),
            Ok(Command::Quit) => {
                info!("quit requested");
                state.quit();
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => panic!("input listener disconnected"),
        }
        if !state.is_over() {
            if frame_start.elapsed().as_millis() < u128::from(TICK_INTERVAL_MS) {
                // wait for the next tick
                thread::sleep(Duration::from_millis(3));
                continue;
            }
            frame_start = Instant::now();
            state.update();
        }
        state.draw();
        if state.is_over() {
            println!("Game Over");
            println!("Final Score: {}", state.score());
            info!("game over, final score {}", state.score());
            break;
        }
    }
}
