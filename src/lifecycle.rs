//! Lifecycle State
//!
//! Guards every store operation against use before open or after close.
//!
//! ## State Machine
//! ```text
//!                  begin_open            finish_open(ok)
//!  Uninitialized ─────────────► Opening ─────────────► Open
//!        ▲                         │                    │
//!        │ abort_open              │ finish_open(err)   │ begin_close
//!        └─────────────────────────┤                    ▼
//!                                  ▼                 Closing
//!                                Error ◄──────────────┤ finish_close(err)
//!                                                     │ finish_close(ok)
//!                                                     ▼
//!                                                   Closed
//! ```
//!
//! `Closed` and `Error` may be opened again. The state is a single
//! `AtomicU8`; every transition is a compare-and-swap so two callers racing
//! on `open` or `close` cannot both win.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{Result, StoreError};

/// Observable lifecycle state of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    Uninitialized = 0,
    Opening = 1,
    Open = 2,
    Closing = 3,
    Closed = 4,
    Error = 5,
}

impl State {
    fn from_u8(raw: u8) -> State {
        match raw {
            0 => State::Uninitialized,
            1 => State::Opening,
            2 => State::Open,
            3 => State::Closing,
            4 => State::Closed,
            _ => State::Error,
        }
    }
}

/// Atomic lifecycle flag shared by all callers of a store
#[derive(Debug)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(State::Uninitialized as u8),
        }
    }

    /// Current state
    pub fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == State::Open
    }

    /// Fail with `NotOpen` unless the store is open
    pub fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(StoreError::NotOpen)
        }
    }

    /// Claim the right to open. Returns the state to restore on abort.
    pub fn begin_open(&self) -> Result<State> {
        loop {
            let current = self.state();
            match current {
                // A close in flight still counts as open.
                State::Open | State::Opening | State::Closing => {
                    return Err(StoreError::AlreadyOpen)
                }
                State::Uninitialized | State::Closed | State::Error => {
                    if self.transition(current, State::Opening) {
                        return Ok(current);
                    }
                }
            }
        }
    }

    /// Complete an open started with [`begin_open`](Self::begin_open)
    pub fn finish_open(&self, success: bool) {
        let next = if success { State::Open } else { State::Error };
        self.state.store(next as u8, Ordering::Release);
    }

    /// Give up an open that failed before touching the substrate
    pub fn abort_open(&self, previous: State) {
        self.state.store(previous as u8, Ordering::Release);
    }

    /// Claim the right to close. `false` means there is nothing to close.
    pub fn begin_close(&self) -> bool {
        self.transition(State::Open, State::Closing)
    }

    /// Complete a close started with [`begin_close`](Self::begin_close)
    pub fn finish_close(&self, success: bool) {
        let next = if success { State::Closed } else { State::Error };
        self.state.store(next as u8, Ordering::Release);
    }

    fn transition(&self, from: State, to: State) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
