use std::io::{self, Read};
use std::process;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use circular_buffer::CircularBuffer;
use log::error;
use termios::{tcsetattr, Termios, ECHO, ICANON, TCSANOW};

use crate::game::Direction;

const ESC: u8 = 27;
const BRACKET: u8 = 91;

// arrow keys arrive as the three byte sequence ESC [ A..D
type SeqBuffer = CircularBuffer<8, u8>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Turn(Direction),
    Quit,
}

/// Puts stdin into raw mode and restores the previous settings on drop,
/// whichever way the game exits.
pub struct RawModeGuard {
    original: Termios,
}

impl RawModeGuard {
    pub fn acquire() -> io::Result<RawModeGuard> {
        // 0 is the file descriptor for stdin
        let original = Termios::from_fd(0)?;
        let mut raw = original;
        // no echo and no canonical mode, keys arrive without enter
        raw.c_lflag &= !(ICANON | ECHO);
        tcsetattr(0, TCSANOW, &raw)?;
        Ok(RawModeGuard { original })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = tcsetattr(0, TCSANOW, &self.original);
    }
}

pub struct KeyDecoder {
    buffer: SeqBuffer,
}

impl KeyDecoder {
    pub fn new() -> KeyDecoder {
        KeyDecoder { buffer: SeqBuffer::new() }
    }

    pub fn push(&mut self, byte: u8) {
        if self.buffer.is_full() {
            self.buffer.pop_front();
        }
        self.buffer.push_back(byte);
    }

    /// Consumes buffered bytes until a recognized key is found or the
    /// buffer runs out. An incomplete escape sequence stays buffered.
    pub fn next_command(&mut self) -> Option<Command> {
        loop {
            match *self.buffer.nth_front(0)? {
                ESC => {
                    if self.buffer.len() < 3 {
                        return None;
                    }
                    if *self.buffer.nth_front(1).unwrap() == BRACKET {
                        let code = *self.buffer.nth_front(2).unwrap();
                        self.drop_front(3);
                        match code {
                            65 => return Some(Command::Turn(Direction::Up)),
                            66 => return Some(Command::Turn(Direction::Down)),
                            67 => return Some(Command::Turn(Direction::Right)),
                            68 => return Some(Command::Turn(Direction::Left)),
                            _ => {} // not an arrow
                        }
                    } else {
                        // stray escape, discard it
                        self.buffer.pop_front();
                    }
                }
                b'k' => {
                    self.buffer.pop_front();
                    return Some(Command::Turn(Direction::Up));
                }
                b'j' => {
                    self.buffer.pop_front();
                    return Some(Command::Turn(Direction::Down));
                }
                b'h' => {
                    self.buffer.pop_front();
                    return Some(Command::Turn(Direction::Left));
                }
                b'l' => {
                    self.buffer.pop_front();
                    return Some(Command::Turn(Direction::Right));
                }
                b'q' | b'Q' => {
                    self.buffer.pop_front();
                    return Some(Command::Quit);
                }
                _ => {
                    self.buffer.pop_front();
                }
            }
        }
    }

    fn drop_front(&mut self, count: usize) {
        for _ in 0..count {
            self.buffer.pop_front();
        }
    }
}

/// Spawns the input listener thread. It blocks on stdin for the lifetime
/// of the process and forwards decoded commands to the simulation loop.
pub fn spawn_listener() -> Receiver<Command> {
    let (tx, rx) = mpsc::channel::<Command>();
    thread::spawn(move || {
        let mut decoder = KeyDecoder::new();
        let mut stdin = io::stdin();
        let mut byte: [u8; 1] = [0; 1];
        loop {
            if let Err(err) = stdin.read_exact(&mut byte) {
                // an unreadable input device is unrecoverable
                error!("stdin read failed: {err}");
                process::exit(1);
            }
            decoder.push(byte[0]);
            while let Some(command) = decoder.next_command() {
                if tx.send(command).is_err() {
                    // the game is gone, nothing left to do
                    return;
                }
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Direction::*;

    fn feed(decoder: &mut KeyDecoder, bytes: &[u8]) -> Vec<Command> {
        let mut commands = vec![];
        for &byte in bytes {
            decoder.push(byte);
            while let Some(command) = decoder.next_command() {
                commands.push(command);
            }
        }
        commands
    }

    #[test]
    fn letter_keys_map_to_turns() {
        let mut decoder = KeyDecoder::new();
        assert_eq!(
            feed(&mut decoder, b"hjkl"),
            vec![
                Command::Turn(Left),
                Command::Turn(Down),
                Command::Turn(Up),
                Command::Turn(Right),
            ]
        );
    }

    #[test]
    fn quit_is_case_insensitive() {
        let mut decoder = KeyDecoder::new();
        assert_eq!(feed(&mut decoder, b"q"), vec![Command::Quit]);
        assert_eq!(feed(&mut decoder, b"Q"), vec![Command::Quit]);
    }

    #[test]
    fn arrow_sequences_assemble_across_reads() {
        let mut decoder = KeyDecoder::new();
        decoder.push(ESC);
        assert_eq!(decoder.next_command(), None);
        decoder.push(BRACKET);
        assert_eq!(decoder.next_command(), None);
        decoder.push(65);
        assert_eq!(decoder.next_command(), Some(Command::Turn(Up)));

        assert_eq!(
            feed(&mut decoder, &[ESC, BRACKET, 66, ESC, BRACKET, 68, ESC, BRACKET, 67]),
            vec![Command::Turn(Down), Command::Turn(Left), Command::Turn(Right)]
        );
    }

    #[test]
    fn unrecognized_bytes_are_ignored() {
        let mut decoder = KeyDecoder::new();
        assert_eq!(feed(&mut decoder, b"zx7 \t"), vec![]);
    }

    #[test]
    fn corrupt_escape_prefixes_do_not_wedge_the_decoder() {
        let mut decoder = KeyDecoder::new();
        assert_eq!(feed(&mut decoder, &[ESC, BRACKET, 120, b'h']), vec![Command::Turn(Left)]);
        assert_eq!(feed(&mut decoder, &[ESC, b'x', b'x', b'j']), vec![Command::Turn(Down)]);
    }
}
