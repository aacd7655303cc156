#![no_main]

use libfuzzer_sys::fuzz_target;
use tomtel_core::{
    disassemble_range, CoreConfig, Decoder, ImmediateLayout, Machine, Memory, TraceEvent,
    Watchdog,
};

fuzz_target!(|data: &[u8]| {
    let Some((&flags, image)) = data.split_first() else {
        return;
    };

    let layout = if flags & 1 == 0 {
        ImmediateLayout::LittleEndian
    } else {
        ImmediateLayout::LegacyDuplicatedHighByte
    };

    let memory = Memory::from(image);
    for addr in 0..u32::try_from(image.len().min(64)).unwrap_or(0) {
        if let Ok(decoded) = Decoder::decode(&memory, addr) {
            let _ = decoded.resolve(&memory, layout);
        }
    }
    let _ = disassemble_range(0, 64, &memory, layout);

    let config = CoreConfig {
        watchdog: Watchdog::InstructionBudget(4096),
        immediate_layout: layout,
        tracing_enabled: flags & 2 != 0,
    };
    let mut machine = Machine::with_config(image, config);
    let mut events: Vec<TraceEvent> = Vec::new();
    let _ = machine.run_traced(&mut events);
    assert!(machine.output().len() <= 4096);
});
