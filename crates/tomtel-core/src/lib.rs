//! Core emulator crate for the Tomtel bytecode machine.

/// Fault taxonomy for host-level guard conditions.
pub mod fault;
pub use fault::{Fault, FaultClass};

/// Architectural register file and run-state primitives.
pub mod state;
pub use state::{
    Operand8, Reg32, Reg8, RegisterFamily, RegisterFile, RunState, PTR_C_SELECTOR,
    REGISTER_COUNT,
};

/// Flat memory image shared by code and data.
pub mod memory;
pub use memory::{checked_index, ImmediateLayout, Memory, IMMEDIATE32_BYTES};

/// Opcode classification tables and move-family encoding helpers.
pub mod encoding;
pub use encoding::{
    classify_opcode, encode_move, fixed_opcode_byte, move_selectors, resolve_move_code, Opcode,
    BYTE_MOVE_PREFIX, FIXED_OPCODE_TABLE, MOVE_FAMILY_MASK, SELECTOR_MASK, WIDE_MOVE_PREFIX,
};

/// Instruction decoder and resolved instruction form.
pub mod decoder;
pub use decoder::{DecodedInstruction, Decoder, Instruction};

/// Append-only output stream.
pub mod output;
pub use output::Output;

/// Public host-facing API: machine, configuration, outcomes, tracing.
pub mod api;
pub use api::{
    Completion, CoreConfig, Machine, NullTrace, RunOutcome, StepOutcome, TraceEvent, TraceSink,
    Watchdog, DEFAULT_WATCHDOG_TIMEOUT,
};

/// Watchdog bookkeeping.
pub mod timing;
pub use timing::WatchdogTimer;

/// Instruction execution pipeline.
pub mod execute;
pub use execute::{execute_instruction, run_until_stopped, step_one};

/// Instruction disassembly.
pub mod disasm;
pub use disasm::{disassemble_one, disassemble_range, DisassemblyRow};

/// Instruction encoder and program builder.
pub mod builder;
pub use builder::{encode, JumpPatch, ProgramBuilder};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
