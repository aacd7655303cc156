//! Operand access shared by the move-family instructions.

use crate::api::Machine;
use crate::state::Operand8;
use crate::Fault;

/// Reads an 8-bit operand, dereferencing `(ptr+c)` through memory.
///
/// # Errors
///
/// Returns [`Fault::MemoryOutOfBounds`] when `ptr + c` is outside memory.
pub fn read_operand8(machine: &Machine, operand: Operand8) -> Result<u8, Fault> {
    match operand {
        Operand8::Reg(reg) => Ok(machine.regs.get8(reg)),
        Operand8::PtrC => machine.memory.read_u8(machine.regs.ptr_c_address()),
    }
}

/// Writes an 8-bit operand and returns the memory address written, if any.
///
/// # Errors
///
/// Returns [`Fault::MemoryOutOfBounds`] when `ptr + c` is outside memory.
pub fn write_operand8(
    machine: &mut Machine,
    operand: Operand8,
    value: u8,
) -> Result<Option<u64>, Fault> {
    match operand {
        Operand8::Reg(reg) => {
            machine.regs.set8(reg, value);
            Ok(None)
        }
        Operand8::PtrC => {
            let addr = machine.regs.ptr_c_address();
            machine.memory.write_u8(addr, value)?;
            Ok(Some(addr))
        }
    }
}
