//! Public host-facing API for embedding the emulator core.

use std::time::Duration;

use crate::execute::{run_until_stopped, step_one};
use crate::memory::{ImmediateLayout, Memory};
use crate::output::Output;
use crate::state::{RegisterFile, RunState};
use crate::Fault;

/// Default wall-clock watchdog budget for a run.
pub const DEFAULT_WATCHDOG_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound that ends a run which never reaches `HALT`.
///
/// Expiry is checked once per instruction before fetch and is reported as
/// [`Completion::TimedOut`], never as a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Watchdog {
    /// Stop once this much wall-clock time has elapsed since the run began.
    WallClock(Duration),
    /// Stop after this many instructions retired during the run.
    InstructionBudget(u64),
    /// Never stop on the host's behalf.
    Unbounded,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::WallClock(DEFAULT_WATCHDOG_TIMEOUT)
    }
}

/// Top-level configuration for a machine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreConfig {
    /// Termination bound applied by [`Machine::run`].
    pub watchdog: Watchdog,
    /// Byte order for 32-bit immediates.
    pub immediate_layout: ImmediateLayout,
    /// Enables trace event dispatch in [`Machine::run_traced`].
    pub tracing_enabled: bool,
}

/// Result of a single [`Machine::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// Instruction retired and execution can continue.
    Retired {
        /// Encoded length of the retired instruction.
        len: u8,
    },
    /// `HALT` retired, or the machine was already halted.
    Halted,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Completion {
    /// Program executed `HALT`.
    Halted,
    /// Watchdog expired first.
    TimedOut,
}

/// Aggregated outcome of a [`Machine::run`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RunOutcome {
    /// Termination path.
    pub completion: Completion,
    /// Instructions retired during this call, `HALT` included.
    pub steps: u64,
}

impl RunOutcome {
    /// Returns `true` when the program halted on its own.
    #[must_use]
    pub const fn halted(&self) -> bool {
        matches!(self.completion, Completion::Halted)
    }
}

/// Events emitted at instruction boundaries when tracing is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceEvent {
    /// Instruction fetched at `pc`.
    InstructionStart {
        /// Address of the opcode byte.
        pc: u32,
        /// Raw opcode byte.
        raw: u8,
    },
    /// Byte written to memory through `(ptr+c)`.
    MemoryWrite {
        /// Target address.
        addr: u64,
        /// Stored value.
        value: u8,
    },
    /// Byte appended to the output stream.
    Output {
        /// Appended value.
        byte: u8,
    },
    /// `HALT` retired.
    Halted {
        /// Address of the `HALT` instruction.
        pc: u32,
    },
    /// Fault raised; the machine is now latched.
    FaultRaised {
        /// Raised fault.
        fault: Fault,
        /// Address of the faulting instruction.
        pc: u32,
    },
}

/// Sink for trace events, in execution order.
pub trait TraceSink {
    /// Records an event.
    fn on_event(&mut self, event: TraceEvent);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTrace;

impl TraceSink for NullTrace {
    fn on_event(&mut self, _event: TraceEvent) {}
}

impl TraceSink for Vec<TraceEvent> {
    fn on_event(&mut self, event: TraceEvent) {
        self.push(event);
    }
}

/// One emulated machine: registers, an owned memory image and its output.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Machine {
    pub(crate) config: CoreConfig,
    pub(crate) regs: RegisterFile,
    pub(crate) memory: Memory,
    pub(crate) output: Output,
    pub(crate) run_state: RunState,
}

impl Machine {
    /// Creates a machine over `image` with the default configuration.
    ///
    /// Execution starts at address 0 with every register zeroed.
    #[must_use]
    pub fn new(image: impl Into<Memory>) -> Self {
        Self::with_config(image, CoreConfig::default())
    }

    /// Creates a machine over `image` with an explicit configuration.
    #[must_use]
    pub fn with_config(image: impl Into<Memory>, config: CoreConfig) -> Self {
        Self {
            config,
            regs: RegisterFile::default(),
            memory: image.into(),
            output: Output::new(),
            run_state: RunState::Running,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Register file.
    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// Memory image, including any bytes the program wrote.
    #[must_use]
    pub const fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Output written so far.
    #[must_use]
    pub const fn output(&self) -> &Output {
        &self.output
    }

    /// Consumes the machine and returns its output.
    #[must_use]
    pub fn into_output(self) -> Output {
        self.output
    }

    /// Current run state.
    #[must_use]
    pub const fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Sets the entry point for the next instruction fetch.
    pub const fn set_pc(&mut self, pc: u32) {
        self.regs.set_pc(pc);
    }

    /// Sets the initial `ptr` value.
    pub const fn set_ptr(&mut self, ptr: u32) {
        self.regs.set_ptr(ptr);
    }

    /// Zeroes registers, clears output and run state, and keeps memory.
    pub fn reset(&mut self) {
        self.regs = RegisterFile::default();
        self.output = Output::new();
        self.run_state = RunState::Running;
    }

    /// Executes exactly one instruction.
    ///
    /// # Errors
    ///
    /// Returns the raised (or previously latched) [`Fault`].
    pub fn step(&mut self) -> Result<StepOutcome, Fault> {
        step_one(self, &mut NullTrace)
    }

    /// Runs until `HALT` or until the configured watchdog expires.
    ///
    /// # Errors
    ///
    /// Returns the [`Fault`] that aborted the run. Output produced before
    /// the fault stays available through [`Machine::output`].
    pub fn run(&mut self) -> Result<RunOutcome, Fault> {
        let watchdog = self.config.watchdog;
        run_until_stopped(self, watchdog, &mut NullTrace)
    }

    /// Runs with an explicit watchdog instead of the configured one.
    ///
    /// # Errors
    ///
    /// Returns the [`Fault`] that aborted the run.
    pub fn run_with_watchdog(&mut self, watchdog: Watchdog) -> Result<RunOutcome, Fault> {
        run_until_stopped(self, watchdog, &mut NullTrace)
    }

    /// Same as [`Machine::run`], forwarding trace events to `sink` when
    /// tracing is enabled in the configuration.
    ///
    /// # Errors
    ///
    /// Returns the [`Fault`] that aborted the run.
    pub fn run_traced(&mut self, sink: &mut dyn TraceSink) -> Result<RunOutcome, Fault> {
        let watchdog = self.config.watchdog;
        run_until_stopped(self, watchdog, sink)
    }
}
