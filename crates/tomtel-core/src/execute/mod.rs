//! Fetch, advance, execute.
//!
//! Each step fetches the instruction at `pc`, advances `pc` past it, then
//! applies its effect, so a jump target overrides the advance instead of
//! adding to it. Faults are precise: a faulting instruction leaves `pc`
//! at its own address and commits nothing.

mod helpers;

pub use helpers::{read_operand8, write_operand8};

use log::{debug, trace};

use crate::api::{Completion, Machine, RunOutcome, StepOutcome, TraceEvent, TraceSink, Watchdog};
use crate::decoder::{Decoder, Instruction};
use crate::state::{Reg8, RunState};
use crate::timing::WatchdogTimer;
use crate::Fault;

/// Executes one instruction against `machine`.
///
/// `pc` must already point past the instruction; `addr` is the address it
/// was fetched from.
///
/// # Errors
///
/// Returns [`Fault::MemoryOutOfBounds`] when a `(ptr+c)` operand is outside
/// memory. No state changes in that case.
pub fn execute_instruction<T: TraceSink + ?Sized>(
    instruction: &Instruction,
    addr: u32,
    machine: &mut Machine,
    sink: &mut T,
) -> Result<StepOutcome, Fault> {
    let tracing = machine.config.tracing_enabled;
    let regs = &mut machine.regs;
    let a = regs.get8(Reg8::A);
    let b = regs.get8(Reg8::B);

    match *instruction {
        Instruction::Add => regs.set8(Reg8::A, a.wrapping_add(b)),
        Instruction::Sub => regs.set8(Reg8::A, a.wrapping_sub(b)),
        Instruction::Xor => regs.set8(Reg8::A, a ^ b),
        Instruction::Cmp => regs.set8(Reg8::F, u8::from(a != b)),
        Instruction::Aptr { imm } => regs.set_ptr(regs.ptr().wrapping_add(u32::from(imm))),
        Instruction::Jez { target } => {
            if regs.get8(Reg8::F) == 0 {
                regs.set_pc(target);
            }
        }
        Instruction::Jnz { target } => {
            if regs.get8(Reg8::F) != 0 {
                regs.set_pc(target);
            }
        }
        Instruction::Mv { dest, src } => {
            let value = read_operand8(machine, src)?;
            let written = write_operand8(machine, dest, value)?;
            emit_memory_write(sink, tracing, written, value);
        }
        Instruction::Mvi { dest, imm } => {
            let written = write_operand8(machine, dest, imm)?;
            emit_memory_write(sink, tracing, written, imm);
        }
        Instruction::Mv32 { dest, src } => regs.set32(dest, regs.get32(src)),
        Instruction::Mvi32 { dest, imm } => regs.set32(dest, imm),
        Instruction::Out => {
            machine.output.push(a);
            if tracing {
                sink.on_event(TraceEvent::Output { byte: a });
            }
        }
        Instruction::Halt => {
            machine.run_state = RunState::Halted;
            if tracing {
                sink.on_event(TraceEvent::Halted { pc: addr });
            }
            return Ok(StepOutcome::Halted);
        }
    }

    Ok(StepOutcome::Retired {
        len: instruction.opcode().encoded_len(),
    })
}

fn emit_memory_write<T: TraceSink + ?Sized>(
    sink: &mut T,
    tracing: bool,
    written: Option<u64>,
    value: u8,
) {
    if let (true, Some(addr)) = (tracing, written) {
        sink.on_event(TraceEvent::MemoryWrite { addr, value });
    }
}

fn fetch_and_execute<T: TraceSink + ?Sized>(
    machine: &mut Machine,
    pc: u32,
    sink: &mut T,
) -> Result<StepOutcome, Fault> {
    let decoded = Decoder::decode(&machine.memory, pc)?;
    if machine.config.tracing_enabled {
        sink.on_event(TraceEvent::InstructionStart {
            pc,
            raw: decoded.raw,
        });
    }

    let instruction = decoded.resolve(&machine.memory, machine.config.immediate_layout)?;
    trace!("{pc:#010x}: {instruction}");

    machine.regs.set_pc(decoded.next_addr());
    execute_instruction(&instruction, pc, machine, sink)
}

/// Fetches, advances `pc`, and executes a single instruction.
///
/// A halted machine reports [`StepOutcome::Halted`] without executing and a
/// faulted machine returns its latched fault.
///
/// # Errors
///
/// Returns the fault raised by decode or execution, which is then latched.
pub fn step_one<T: TraceSink + ?Sized>(
    machine: &mut Machine,
    sink: &mut T,
) -> Result<StepOutcome, Fault> {
    match machine.run_state {
        RunState::Faulted(fault) => return Err(fault),
        RunState::Halted => return Ok(StepOutcome::Halted),
        RunState::Running => {}
    }

    let pc = machine.regs.pc();
    fetch_and_execute(machine, pc, sink).inspect_err(|&fault| {
        machine.regs.set_pc(pc);
        machine.run_state = RunState::Faulted(fault);
        debug!("fault at {pc:#010x}: {fault}");
        if machine.config.tracing_enabled {
            sink.on_event(TraceEvent::FaultRaised { fault, pc });
        }
    })
}

/// Steps until `HALT` retires or `watchdog` expires.
///
/// The watchdog is checked once per iteration, before each fetch.
///
/// # Errors
///
/// Returns the fault that aborted the run; output written before it remains
/// in the machine.
pub fn run_until_stopped<T: TraceSink + ?Sized>(
    machine: &mut Machine,
    watchdog: Watchdog,
    sink: &mut T,
) -> Result<RunOutcome, Fault> {
    debug!(
        "run starting at pc={:#010x} over {} bytes, watchdog {watchdog:?}",
        machine.regs.pc(),
        machine.memory.len()
    );

    let timer = WatchdogTimer::start(watchdog);
    let mut steps = 0_u64;
    loop {
        match machine.run_state {
            RunState::Faulted(fault) => return Err(fault),
            RunState::Halted => {
                return Ok(RunOutcome {
                    completion: Completion::Halted,
                    steps,
                })
            }
            RunState::Running => {}
        }

        if timer.expired(steps) {
            debug!(
                "watchdog expired after {steps} instructions at pc={:#010x}",
                machine.regs.pc()
            );
            return Ok(RunOutcome {
                completion: Completion::TimedOut,
                steps,
            });
        }

        let outcome = step_one(machine, sink)?;
        steps += 1;
        if outcome == StepOutcome::Halted {
            debug!(
                "halted after {steps} instructions, {} output bytes",
                machine.output.len()
            );
        }
    }
}
