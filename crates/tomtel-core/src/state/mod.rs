//! Architectural machine state primitives.

/// Register file and register selector types.
pub mod registers;
/// Run-state machine.
pub mod run_state;

pub use registers::{
    Operand8, Reg32, Reg8, RegisterFamily, RegisterFile, PTR_C_SELECTOR, REGISTER_COUNT,
};
pub use run_state::RunState;
