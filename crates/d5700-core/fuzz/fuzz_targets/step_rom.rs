#![no_main]

use d5700_core::{validate_rom, Cpu, Decoder, EventBus, ScriptedKeyboard, StepOutcome};
use libfuzzer_sys::fuzz_target;

const MAX_STEPS: usize = 4096;

fuzz_target!(|data: &[u8]| {
    if let [high, low, ..] = *data {
        let _ = Decoder::decode(u16::from_be_bytes([high, low]));
    }

    if validate_rom(data).is_err() {
        return;
    }

    let mut cpu = Cpu::new(EventBus::new());
    if cpu.load_program(data).is_err() {
        return;
    }

    let mut keyboard = ScriptedKeyboard::new(data.iter().copied());
    for _ in 0..MAX_STEPS {
        match cpu.step(&mut keyboard) {
            Ok(StepOutcome::Executed { .. }) => {
                let _ = cpu.tick_timer();
            }
            Ok(StepOutcome::Halted { .. }) | Err(_) => break,
        }
    }
});
