use crate::event::EmulatorEvent;
use crate::memory::{DataMemory, MemoryBank, Ram, Rom};
use crate::rom::{validate_rom, RomError};
use crate::state::RegisterFile;
use crate::Fault;

/// Complete CPU context: register file plus ROM and RAM.
///
/// One value of this type is the whole mutable machine; the lifecycle
/// controller guards it with a single lock shared by both clocks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CpuState {
    /// Register file.
    pub registers: RegisterFile,
    /// Program memory.
    pub rom: Rom,
    /// Working memory.
    pub ram: Ram,
}

impl CpuState {
    /// Creates a reset CPU with `program` in ROM.
    ///
    /// # Errors
    ///
    /// Returns any [`validate_rom`] failure.
    pub fn with_program(program: &[u8]) -> Result<Self, RomError> {
        let mut state = Self::default();
        state.load_program(program)?;
        Ok(state)
    }

    /// Validates `program`, resets registers and RAM, and installs the ROM.
    ///
    /// # Errors
    ///
    /// Returns any [`validate_rom`] failure; state is untouched on error.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), RomError> {
        validate_rom(program)?;
        self.rom.load(program)?;
        self.ram.clear();
        self.registers = RegisterFile::default();
        Ok(())
    }

    /// Bank selected by the memory-bank flag.
    #[must_use]
    pub const fn data_bank(&self) -> MemoryBank {
        self.registers.memory_bank()
    }

    /// Data memory selected by the memory-bank flag.
    #[must_use]
    pub fn data_memory(&self) -> &dyn DataMemory {
        match self.data_bank() {
            MemoryBank::Ram => &self.ram,
            MemoryBank::Rom => &self.rom,
        }
    }

    /// Mutable data memory selected by the memory-bank flag.
    pub fn data_memory_mut(&mut self) -> &mut dyn DataMemory {
        match self.data_bank() {
            MemoryBank::Ram => &mut self.ram,
            MemoryBank::Rom => &mut self.rom,
        }
    }

    /// Reads a byte from the selected data bank.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::AddressOutOfRange`] past the end of the bank.
    pub fn read_data(&self, address: u16) -> Result<u8, Fault> {
        self.data_memory().read_byte(address)
    }

    /// Writes a byte to the selected data bank.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::RomWriteRejected`] while ROM is selected and
    /// [`Fault::AddressOutOfRange`] past the end of RAM.
    pub fn write_data(&mut self, address: u16, value: u8) -> Result<(), Fault> {
        self.data_memory_mut().write_byte(address, value)
    }

    /// Fetches the instruction word at the program counter.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::AddressOutOfRange`] when the counter has run off ROM.
    pub fn fetch(&self) -> Result<u16, Fault> {
        self.rom.fetch_word(self.registers.pc())
    }

    /// Applies the CPU's own reaction to an event it published.
    ///
    /// The CPU is the first subscriber of its own events: a bank switch flips
    /// the flag and a timer set loads `T`, which in turn yields a follow-up
    /// [`EmulatorEvent::TimerTick`] for the remaining subscribers.
    pub fn react(&mut self, event: &EmulatorEvent) -> Option<EmulatorEvent> {
        match event {
            EmulatorEvent::SwitchMemory => {
                self.registers.toggle_memory_bank();
                None
            }
            EmulatorEvent::TimerSet(value) => {
                self.registers.set_timer(*value);
                Some(EmulatorEvent::TimerTick(*value))
            }
            EmulatorEvent::Halt { .. }
            | EmulatorEvent::TimerTick(_)
            | EmulatorEvent::DrawPixel { .. }
            | EmulatorEvent::Refresh => None,
        }
    }

    /// Performs one timer-clock decrement.
    ///
    /// Returns the tick event to publish, or `None` once `T` is zero.
    pub fn decrement_timer(&mut self) -> Option<EmulatorEvent> {
        self.registers
            .decrement_timer()
            .map(EmulatorEvent::TimerTick)
    }
}

#[cfg(test)]
mod tests {
    use super::CpuState;
    use crate::event::EmulatorEvent;
    use crate::memory::MemoryBank;
    use crate::rom::RomError;
    use crate::state::GeneralRegister;
    use crate::Fault;

    #[test]
    fn data_memory_follows_bank_flag() {
        let mut state = CpuState::with_program(&[0x5A, 0x00]).expect("valid");
        state.write_data(0x0100, 0xAA).expect("ram write");
        assert_eq!(state.read_data(0x0100), Ok(0xAA));

        assert_eq!(state.react(&EmulatorEvent::SwitchMemory), None);
        assert_eq!(state.data_bank(), MemoryBank::Rom);
        assert_eq!(state.read_data(0x0000), Ok(0x5A));
        assert_eq!(
            state.write_data(0x0100, 0xBB),
            Err(Fault::RomWriteRejected { address: 0x0100 })
        );

        state.react(&EmulatorEvent::SwitchMemory);
        assert_eq!(state.read_data(0x0100), Ok(0xAA));
    }

    #[test]
    fn timer_set_reaction_loads_timer_and_emits_tick() {
        let mut state = CpuState::default();
        assert_eq!(
            state.react(&EmulatorEvent::TimerSet(123)),
            Some(EmulatorEvent::TimerTick(123))
        );
        assert_eq!(state.registers.timer(), 123);
    }

    #[test]
    fn foreign_events_do_not_touch_state() {
        let mut state = CpuState::default();
        let before = state.clone();
        for event in [
            EmulatorEvent::TimerTick(3),
            EmulatorEvent::Refresh,
            EmulatorEvent::DrawPixel {
                x: 1,
                y: 2,
                value: b'A',
            },
            EmulatorEvent::Halt {
                message: String::from("done"),
            },
        ] {
            assert_eq!(state.react(&event), None);
        }
        assert_eq!(state, before);
    }

    #[test]
    fn timer_decrement_emits_ticks_until_zero() {
        let mut state = CpuState::default();
        state.registers.set_timer(2);
        assert_eq!(state.decrement_timer(), Some(EmulatorEvent::TimerTick(1)));
        assert_eq!(state.decrement_timer(), Some(EmulatorEvent::TimerTick(0)));
        assert_eq!(state.decrement_timer(), None);
    }

    #[test]
    fn load_program_resets_machine() {
        let mut state = CpuState::with_program(&[0x00, 0x00]).expect("valid");
        state.registers.set_gpr(GeneralRegister::R3, 9);
        state.registers.set_timer(4);
        state.write_data(0x0010, 0x77).expect("ram write");
        state.registers.toggle_memory_bank();

        state.load_program(&[0xB0, 0x05]).expect("valid");

        assert_eq!(state.registers.gpr(GeneralRegister::R3), 0);
        assert_eq!(state.registers.timer(), 0);
        assert_eq!(state.data_bank(), MemoryBank::Ram);
        assert_eq!(state.read_data(0x0010), Ok(0));
        assert_eq!(state.fetch(), Ok(0xB005));
    }

    #[test]
    fn invalid_program_leaves_state_untouched() {
        let mut state = CpuState::with_program(&[0xB0, 0x05]).expect("valid");
        state.registers.set_gpr(GeneralRegister::R1, 7);
        let before = state.clone();

        assert!(matches!(state.load_program(&[]), Err(RomError::Empty)));
        assert_eq!(state, before);
    }
}
