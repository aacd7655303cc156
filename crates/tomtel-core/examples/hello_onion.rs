//! Assembles a string printer with `ProgramBuilder`, lists it, and runs it.

use log as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

use tomtel_core::{
    disassemble_range, CoreConfig, Machine, Memory, Operand8, ProgramBuilder, Reg32, Reg8,
    Watchdog,
};

const A: Operand8 = Operand8::Reg(Reg8::A);
const B: Operand8 = Operand8::Reg(Reg8::B);
const C: Operand8 = Operand8::Reg(Reg8::C);

fn assemble(text: &[u8]) -> Vec<u8> {
    // ptr is patched once the data address is known.
    let mut program = ProgramBuilder::new();
    program.mvi32(Reg32::Ptr, 0).mvi(C, 0);

    let top = program.here();
    program.mv(A, Operand8::PtrC).mvi(B, 0).cmp();
    let done = program.jez_forward();
    program
        .out()
        .mv(A, C)
        .mvi(B, 1)
        .add()
        .mv(C, A)
        .mvi(B, 0)
        .cmp()
        .jnz(top);
    let end = program.here();
    program.patch(done, end).halt();

    let data = program.here();
    program.data(text).data(&[0]);

    let mut image = program.finish();
    image[1..5].copy_from_slice(&data.to_le_bytes());
    image
}

fn main() {
    let image = assemble(b"Hello from the onion\n");

    let memory = Memory::from(image.as_slice());
    let config = CoreConfig {
        watchdog: Watchdog::InstructionBudget(100_000),
        ..CoreConfig::default()
    };
    for row in disassemble_range(0, 16, &memory, config.immediate_layout) {
        println!("{}", row.render());
    }

    let mut machine = Machine::with_config(image, config);
    match machine.run() {
        Ok(outcome) => {
            println!("-- {:?} after {} instructions", outcome.completion, outcome.steps);
            print!("{}", machine.output().to_string_lossy());
        }
        Err(fault) => eprintln!("fault: {fault}"),
    }
}
