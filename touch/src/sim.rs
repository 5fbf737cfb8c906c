//! Host-side stand-in for the electrode matrix, used by the unit tests.
//!
//! Each sense channel reads a static offset plus the sum of the couplings of
//! every drive line that is currently high. A touch is modelled as extra
//! coupling between one channel and one line.

use std::cell::RefCell;
use std::rc::Rc;

use crate::{AnalogSampler, DriveLineOutput};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Op {
    Set(usize, bool),
    Settle(u32),
    Select(usize),
    Read(usize),
}

/// Fault injected by `SimPanel::fail_after` or `SimPanel::fail_line`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fault;

struct State<const CH: usize, const LINES: usize> {
    lines: [bool; LINES],
    coupling: [[f32; LINES]; CH],
    offset: [f32; CH],
    vref: f32,
    full_scale: i32,
    reads_left: Option<usize>,
    failing_line: Option<usize>,
    log: Vec<Op>,
}

pub struct SimPanel<const CH: usize, const LINES: usize> {
    state: Rc<RefCell<State<CH, LINES>>>,
}

pub struct SimDrive<const CH: usize, const LINES: usize> {
    state: Rc<RefCell<State<CH, LINES>>>,
}

pub struct SimSampler<const CH: usize, const LINES: usize> {
    state: Rc<RefCell<State<CH, LINES>>>,
}

impl<const CH: usize, const LINES: usize> SimPanel<CH, LINES> {
    pub fn new(vref: f32, full_scale: i32) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                lines: [false; LINES],
                coupling: [[0.0; LINES]; CH],
                offset: [0.0; CH],
                vref,
                full_scale,
                reads_left: None,
                failing_line: None,
                log: Vec::new(),
            })),
        }
    }

    /// Drive and sample halves sharing this panel
    pub fn split(&self) -> (SimDrive<CH, LINES>, SimSampler<CH, LINES>) {
        (
            SimDrive {
                state: self.state.clone(),
            },
            SimSampler {
                state: self.state.clone(),
            },
        )
    }

    pub fn set_coupling(&self, channel: usize, line: usize, volts: f32) {
        self.state.borrow_mut().coupling[channel][line] = volts;
    }

    pub fn set_offset(&self, channel: usize, volts: f32) {
        self.state.borrow_mut().offset[channel] = volts;
    }

    /// Add coupling between one channel and one line
    pub fn touch(&self, channel: usize, line: usize, volts: f32) {
        self.state.borrow_mut().coupling[channel][line] += volts;
    }

    /// Let `reads` more conversions succeed, then fail every read
    pub fn fail_after(&self, reads: usize) {
        self.state.borrow_mut().reads_left = Some(reads);
    }

    /// Make every command to `line` fail, leaving its level unchanged
    pub fn fail_line(&self, line: usize) {
        self.state.borrow_mut().failing_line = Some(line);
    }

    pub fn heal(&self) {
        let mut state = self.state.borrow_mut();
        state.reads_left = None;
        state.failing_line = None;
    }

    pub fn set_lines(&self, lines: [bool; LINES]) {
        self.state.borrow_mut().lines = lines;
    }

    pub fn lines(&self) -> [bool; LINES] {
        self.state.borrow().lines
    }

    pub fn log(&self) -> Vec<Op> {
        self.state.borrow().log.clone()
    }
}

impl<const CH: usize, const LINES: usize> DriveLineOutput for SimDrive<CH, LINES> {
    type Error = Fault;

    fn set(&mut self, line: usize, high: bool) -> Result<(), Fault> {
        let mut state = self.state.borrow_mut();
        state.log.push(Op::Set(line, high));
        if state.failing_line == Some(line) {
            return Err(Fault);
        }
        state.lines[line] = high;
        Ok(())
    }

    fn settle(&mut self, ticks: u32) {
        self.state.borrow_mut().log.push(Op::Settle(ticks));
    }
}

impl<const CH: usize, const LINES: usize> AnalogSampler for SimSampler<CH, LINES> {
    type Error = Fault;

    fn select_channel(&mut self, channel: usize) -> Result<(), Fault> {
        self.state.borrow_mut().log.push(Op::Select(channel));
        Ok(())
    }

    fn read(&mut self, channel: usize) -> Result<i32, Fault> {
        let mut state = self.state.borrow_mut();
        state.log.push(Op::Read(channel));

        if let Some(left) = state.reads_left {
            if left == 0 {
                return Err(Fault);
            }
            state.reads_left = Some(left - 1);
        }

        let mut volts = state.offset[channel];
        for (line, &high) in state.lines.iter().enumerate() {
            if high {
                volts += state.coupling[channel][line];
            }
        }
        Ok((volts * state.full_scale as f32 / state.vref).round() as i32)
    }
}
