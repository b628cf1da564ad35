//! Shared test infrastructure for cue-sequencer integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use cue_sequencer::{BoardId, CueMatrix, GpioWriter, Port, relay_table};
use embedded_hal::delay::DelayNs;
use std::cell::RefCell;
use std::rc::Rc;

pub const NEGATIVE: BoardId = BoardId(0);
pub const POSITIVE: BoardId = BoardId(1);

// ============================================================================
// Event log
// ============================================================================

/// Everything the sequencer did to the outside world, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Write { board: BoardId, port: Port, value: u8 },
    Delay(u32),
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

pub fn write(board: BoardId, port: Port, value: u8) -> Event {
    Event::Write { board, port, value }
}

pub fn writes(log: &EventLog) -> Vec<Event> {
    log.borrow()
        .iter()
        .copied()
        .filter(|e| matches!(e, Event::Write { .. }))
        .collect()
}

pub fn delays(log: &EventLog) -> Vec<u32> {
    log.borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Delay(ms) => Some(*ms),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Mock hardware
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

/// Records every attempted write; writes matching `fail_when` return an error.
pub struct MockWriter {
    log: EventLog,
    fail_when: Box<dyn Fn(BoardId, Port, u8) -> bool>,
}

impl MockWriter {
    pub fn new(log: &EventLog) -> Self {
        Self::failing_when(log, |_, _, _| false)
    }

    pub fn failing_when(
        log: &EventLog,
        fail_when: impl Fn(BoardId, Port, u8) -> bool + 'static,
    ) -> Self {
        Self {
            log: Rc::clone(log),
            fail_when: Box::new(fail_when),
        }
    }
}

impl GpioWriter for MockWriter {
    type Error = MockError;

    fn write(&mut self, board: BoardId, port: Port, value: u8) -> Result<(), MockError> {
        self.log.borrow_mut().push(write(board, port, value));
        if (self.fail_when)(board, port, value) {
            Err(MockError)
        } else {
            Ok(())
        }
    }
}

/// Records each millisecond delay instead of sleeping.
pub struct MockDelay {
    log: EventLog,
}

impl MockDelay {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: Rc::clone(log),
        }
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.log.borrow_mut().push(Event::Delay(ms));
    }
}

/// Sleeps for real, for timing tests.
pub struct SleepDelay;

impl DelayNs for SleepDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}

// ============================================================================
// Test Helper Functions
// ============================================================================

/// Two fully populated 16-channel boards.
pub fn standard_matrix() -> CueMatrix {
    CueMatrix::build(&relay_table(NEGATIVE, 16), &relay_table(POSITIVE, 16))
}

pub fn new_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}
