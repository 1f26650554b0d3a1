//! Machine execution engine for LEAP16.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::machine::{Memory, Registers};
use crate::machine::decode::{self, Instruction};
use crate::machine::memory::LoadError;
use serde::{Serialize, Deserialize};
use tracing::{debug, info, trace};

/// Width of the cycle counter.
///
/// `Wide` keeps a 64-bit count that wraps only at 2^64, which no real run
/// reaches. `Narrow` truncates the count to 16 bits so it wraps from 0xFFFF
/// back to 0, like the register-width counters of smaller variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterWidth {
    #[default]
    Wide,
    Narrow,
}

impl CounterWidth {
    /// Advance a counter by one cycle under this width.
    #[inline]
    pub fn increment(self, count: u64) -> u64 {
        match self {
            CounterWidth::Wide => count.wrapping_add(1),
            CounterWidth::Narrow => (count as u16).wrapping_add(1) as u64,
        }
    }
}

/// Machine configuration. Not architectural state: `reset` keeps it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub counter: CounterWidth,
}

/// The LEAP16 machine.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    /// Register file.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Cycles executed since creation or the last reset.
    pub cycles: u64,
    config: MachineConfig,
}

impl Machine {
    /// Create a new machine with zeroed state and a wide cycle counter.
    pub fn new() -> Self {
        Self::with_config(MachineConfig::default())
    }

    pub fn with_config(config: MachineConfig) -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            cycles: 0,
            config,
        }
    }

    pub fn config(&self) -> MachineConfig {
        self.config
    }

    /// Restore the all-zero state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.cycles = 0;
        debug!("machine reset");
    }

    /// Load a program image at address 0x0000.
    pub fn load_program(&mut self, program: &[u16]) -> Result<(), LoadError> {
        self.mem.load_program(program)?;
        debug!(words = program.len(), "program loaded");
        Ok(())
    }

    /// Execute exactly one instruction.
    ///
    /// Returns `true` if the instruction was HALT.
    pub fn cycle(&mut self) -> bool {
        // Fetch
        let ip = self.regs.ip();
        let word = self.mem.read(ip);

        // Advance before execute so leaps are relative to the next word
        self.regs.advance_ip();
        self.cycles = self.config.counter.increment(self.cycles);

        let instr = decode::decode(word);
        trace!(ip, word, ?instr, "cycle");

        self.execute(instr)
    }

    /// Run until HALT. There is no cycle limit; callers that need one loop
    /// on [`Machine::cycle`] themselves.
    pub fn run(&mut self) {
        while !self.cycle() {}
        info!(cycles = self.cycles, ip = self.regs.ip(), "halted");
    }

    fn execute(&mut self, instr: Instruction) -> bool {
        let regs = &mut self.regs;

        match instr {
            // ==================== Memory ====================

            Instruction::Load { base, offset, dest } => {
                let addr = regs.effective_address(base, offset as u16);
                regs.set(dest, self.mem.read(addr));
            }

            Instruction::Store { base, offset, src } => {
                let addr = regs.effective_address(base, offset as u16);
                self.mem.write(addr, regs.get(src));
            }

            // ==================== Arithmetic / Logic ====================

            Instruction::Add { x, y, dest } => {
                regs.set(dest, regs.get(x).wrapping_add(regs.get(y)));
            }

            Instruction::Sub { x, y, dest } => {
                regs.set(dest, regs.get(x).wrapping_sub(regs.get(y)));
            }

            Instruction::And { x, y, dest } => {
                regs.set(dest, regs.get(x) & regs.get(y));
            }

            Instruction::Or { x, y, dest } => {
                regs.set(dest, regs.get(x) | regs.get(y));
            }

            // amount is a 4-bit field, always below the word width
            Instruction::ShiftLeft { src, amount, dest } => {
                regs.set(dest, regs.get(src) << (amount & 0xF));
            }

            Instruction::ShiftRight { src, amount, dest } => {
                regs.set(dest, regs.get(src) >> (amount & 0xF));
            }

            // ==================== Control Flow ====================

            Instruction::Leap { base, offset } => {
                let target = regs.get(base).wrapping_add(offset as i16 as u16);
                regs.jump(target);
            }

            // Push first: a base of rE sees the decremented stack pointer
            Instruction::LeapLink { base, offset } => {
                let sp = regs.sp().wrapping_sub(1);
                regs.set(Registers::SP, sp);
                self.mem.write(sp, regs.ip());
                let target = regs.get(base).wrapping_add(offset as i16 as u16);
                regs.jump(target);
            }

            Instruction::ReturnLink => {
                let sp = regs.sp();
                regs.jump(self.mem.read(sp));
                regs.set(Registers::SP, sp.wrapping_add(1));
            }

            Instruction::LeapEqual { x, y, offset } => {
                if regs.get(x) == regs.get(y) {
                    regs.leap_relative(offset as i16 as u16);
                }
            }

            Instruction::LeapLess { x, y, offset } => {
                if regs.get(x) < regs.get(y) {
                    regs.leap_relative(offset as i16 as u16);
                }
            }

            Instruction::Halt => return true,

            Instruction::Unassigned(_) => {}
        }

        false
    }

    /// Whether the stack holds anything, i.e. rE is non-zero.
    pub fn stack_in_use(&self) -> bool {
        self.regs.sp() != 0
    }

    /// Stack contents from rE up to 0xFFFF. Empty when the stack is unused.
    pub fn stack(&self) -> &[u16] {
        if self.stack_in_use() {
            self.mem.tail(self.regs.sp())
        } else {
            &[]
        }
    }

    /// Whether the next word to fetch is HALT.
    pub fn at_halt(&self) -> bool {
        decode::opcode(self.mem.read(self.regs.ip())) == decode::Opcode::HALT
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("cycles", &self.cycles)
            .field("config", &self.config)
            .field("regs", &self.regs)
            .field("mem", &self.mem)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::decode::encode;
    use crate::machine::memory::MEMORY_SIZE;
    use proptest::prelude::*;

    fn make_program(instructions: &[Instruction]) -> Vec<u16> {
        instructions.iter().map(encode).collect()
    }

    fn machine_with(instructions: &[Instruction]) -> Machine {
        let mut machine = Machine::new();
        machine.load_program(&make_program(instructions)).unwrap();
        machine
    }

    #[test]
    fn test_halt_only_program() {
        let mut machine = machine_with(&[Instruction::Halt]);
        let before = machine.clone();

        assert!(machine.cycle());

        assert_eq!(machine.regs.ip(), 1);
        assert_eq!(machine.cycles, 1);
        for r in 0x0..=0xE {
            assert_eq!(machine.regs.get(r), before.regs.get(r));
        }
        assert_eq!(machine.mem, before.mem);
    }

    #[test]
    fn test_unassigned_opcodes_are_noops() {
        let mut machine = Machine::new();
        machine.load_program(&[0x1FFF, 0x9123, 0xF000]).unwrap();

        assert!(!machine.cycle());
        assert!(!machine.cycle());
        let mut expected = [0u16; 16];
        expected[0xF] = 2;
        assert_eq!(machine.regs, Registers::from(expected));
        assert_eq!(machine.cycles, 2);
        assert!(machine.cycle());
    }

    #[test]
    fn test_run_counts_cycles() {
        let mut machine = machine_with(&[
            Instruction::Unassigned(0x1),
            Instruction::Unassigned(0x9),
            Instruction::Unassigned(0x1),
            Instruction::Halt,
        ]);

        machine.run();

        assert_eq!(machine.cycles, 4);
        assert_eq!(machine.regs.ip(), 4);
    }

    #[test]
    fn test_arithmetic() {
        let mut machine = machine_with(&[
            Instruction::Add { x: 1, y: 2, dest: 3 },
            Instruction::Sub { x: 1, y: 2, dest: 4 },
            Instruction::And { x: 1, y: 2, dest: 5 },
            Instruction::Or { x: 1, y: 2, dest: 6 },
            Instruction::Halt,
        ]);
        machine.regs.set(1, 0x00F0);
        machine.regs.set(2, 0x0F30);

        machine.run();

        assert_eq!(machine.regs.get(3), 0x1020);
        assert_eq!(machine.regs.get(4), 0xF1C0);
        assert_eq!(machine.regs.get(5), 0x0030);
        assert_eq!(machine.regs.get(6), 0x0FF0);
    }

    #[test]
    fn test_add_wraps() {
        let mut machine = machine_with(&[Instruction::Add { x: 1, y: 2, dest: 3 }, Instruction::Halt]);
        machine.regs.set(1, 0xFFFF);
        machine.regs.set(2, 0x0002);
        machine.run();
        assert_eq!(machine.regs.get(3), 0x0001);
    }

    #[test]
    fn test_shifts() {
        let mut machine = machine_with(&[
            Instruction::ShiftLeft { src: 1, amount: 1, dest: 2 },
            Instruction::ShiftRight { src: 3, amount: 15, dest: 4 },
            Instruction::ShiftLeft { src: 5, amount: 0, dest: 6 },
            Instruction::ShiftRight { src: 5, amount: 0, dest: 7 },
            Instruction::Halt,
        ]);
        machine.regs.set(1, 0x8000);
        machine.regs.set(3, 0x8000);
        machine.regs.set(5, 0xA5A5);

        machine.run();

        assert_eq!(machine.regs.get(2), 0x0000);
        assert_eq!(machine.regs.get(4), 0x0001);
        assert_eq!(machine.regs.get(6), 0xA5A5);
        assert_eq!(machine.regs.get(7), 0xA5A5);
    }

    #[test]
    fn test_shift_round_trip_loses_bits() {
        let mut machine = machine_with(&[
            Instruction::ShiftLeft { src: 1, amount: 4, dest: 2 },
            Instruction::ShiftRight { src: 2, amount: 4, dest: 2 },
            Instruction::Halt,
        ]);
        machine.regs.set(1, 0xF00F);
        machine.run();
        assert_eq!(machine.regs.get(2), 0x000F);
    }

    #[test]
    fn test_store_then_load() {
        let mut machine = machine_with(&[
            Instruction::Store { base: 1, offset: 3, src: 2 },
            Instruction::Load { base: 1, offset: 3, dest: 4 },
            Instruction::Halt,
        ]);
        machine.regs.set(1, 0x0100);
        machine.regs.set(2, 0xCAFE);

        machine.run();

        assert_eq!(machine.mem.read(0x0103), 0xCAFE);
        assert_eq!(machine.regs.get(4), 0xCAFE);
    }

    #[test]
    fn test_effective_address_wraps() {
        let mut machine = machine_with(&[
            Instruction::Store { base: 1, offset: 0xF, src: 2 },
            Instruction::Halt,
        ]);
        machine.regs.set(1, 0xFFFF);
        machine.regs.set(2, 0x4242);

        machine.run();

        assert_eq!(machine.mem.read(0x000E), 0x4242);
    }

    #[test]
    fn test_leap_is_relative_to_advanced_ip() {
        // 0: LEAP rF, +1  -> skips word 1
        let mut machine = machine_with(&[
            Instruction::Leap { base: 0xF, offset: 1 },
            Instruction::Add { x: 0, y: 0, dest: 0 },
            Instruction::Halt,
        ]);
        machine.regs.set(0, 1);

        machine.run();

        assert_eq!(machine.regs.get(0), 1);
        assert_eq!(machine.cycles, 2);
    }

    #[test]
    fn test_leap_absolute_through_register() {
        let mut machine = machine_with(&[Instruction::Leap { base: 1, offset: -2 }]);
        machine.mem.write(0x0030, encode(&Instruction::Halt));
        machine.regs.set(1, 0x0032);

        machine.run();

        assert_eq!(machine.regs.ip(), 0x0031);
    }

    #[test]
    fn test_leap_link_then_return() {
        // 0: LL r0, 2   -> call address 2
        // 1: HALT
        // 2: RL
        let mut machine = machine_with(&[
            Instruction::LeapLink { base: 0, offset: 2 },
            Instruction::Halt,
            Instruction::ReturnLink,
        ]);

        assert!(!machine.cycle());
        assert_eq!(machine.regs.ip(), 2);
        assert_eq!(machine.regs.sp(), 0xFFFF);
        assert_eq!(machine.mem.read(0xFFFF), 1);
        assert_eq!(machine.stack(), &[1]);

        assert!(!machine.cycle());
        assert_eq!(machine.regs.ip(), 1);
        assert_eq!(machine.regs.sp(), 0);
        assert!(!machine.stack_in_use());

        assert!(machine.cycle());
    }

    #[test]
    fn test_leap_link_through_stack_pointer_uses_pushed_value() {
        // LL rE, 3 with rE = 0x0100: push lands at 0x00FF, target 0x00FF + 3
        let mut machine = machine_with(&[Instruction::LeapLink { base: Registers::SP, offset: 3 }]);
        machine.regs.set(Registers::SP, 0x0100);

        machine.cycle();

        assert_eq!(machine.regs.sp(), 0x00FF);
        assert_eq!(machine.mem.read(0x00FF), 1);
        assert_eq!(machine.regs.ip(), 0x0102);
    }

    #[test]
    fn test_leap_link_through_instruction_pointer() {
        // LL rF, -1 at 0x0010: return address 0x0011, target 0x0011 - 1
        let mut machine = Machine::new();
        machine.regs.jump(0x0010);
        machine.regs.set(Registers::SP, 0x0200);
        machine.mem.write(0x0010, encode(&Instruction::LeapLink { base: Registers::IP, offset: -1 }));

        machine.cycle();

        assert_eq!(machine.regs.sp(), 0x01FF);
        assert_eq!(machine.mem.read(0x01FF), 0x0011);
        assert_eq!(machine.regs.ip(), 0x0010);
    }

    #[test]
    fn test_leap_through_stack_pointer() {
        let mut machine = machine_with(&[Instruction::Leap { base: Registers::SP, offset: -4 }]);
        machine.regs.set(Registers::SP, 0x0100);

        machine.cycle();

        assert_eq!(machine.regs.sp(), 0x0100);
        assert_eq!(machine.regs.ip(), 0x00FC);
    }

    #[test]
    fn test_nested_calls() {
        // 0: LL r0, 3
        // 1: HALT
        // 2: RL
        // 3: LL r0, 2
        // 4: RL
        let mut machine = machine_with(&[
            Instruction::LeapLink { base: 0, offset: 3 },
            Instruction::Halt,
            Instruction::ReturnLink,
            Instruction::LeapLink { base: 0, offset: 2 },
            Instruction::ReturnLink,
        ]);

        machine.cycle();
        machine.cycle();
        assert_eq!(machine.stack(), &[4, 1]);

        machine.run();

        assert_eq!(machine.regs.ip(), 2);
        assert_eq!(machine.regs.sp(), 0);
        assert_eq!(machine.cycles, 5);
    }

    #[test]
    fn test_conditional_zero_offset_never_moves() {
        let mut machine = machine_with(&[
            Instruction::LeapEqual { x: 0, y: 0, offset: 0 },
            Instruction::LeapLess { x: 0, y: 1, offset: 0 },
            Instruction::Halt,
        ]);
        machine.regs.set(1, 5);

        assert!(!machine.cycle());
        assert_eq!(machine.regs.ip(), 1);
        assert!(!machine.cycle());
        assert_eq!(machine.regs.ip(), 2);
    }

    #[test]
    fn test_conditional_offsets() {
        for offset in [1i8, -1, 7, -8] {
            for instr in [
                Instruction::LeapEqual { x: 1, y: 2, offset },
                Instruction::LeapLess { x: 1, y: 2, offset },
            ] {
                let mut machine = Machine::new();
                machine.regs.jump(0x0100);
                machine.mem.write(0x0100, encode(&instr));
                machine.regs.set(1, 3);
                machine.regs.set(2, if matches!(instr, Instruction::LeapEqual { .. }) { 3 } else { 4 });

                machine.cycle();

                let expected = 0x0101u16.wrapping_add(offset as i16 as u16);
                assert_eq!(machine.regs.ip(), expected, "{instr:?}");
            }
        }
    }

    #[test]
    fn test_conditional_not_taken() {
        let mut machine = machine_with(&[
            Instruction::LeapEqual { x: 1, y: 2, offset: 7 },
            Instruction::LeapLess { x: 2, y: 1, offset: 7 },
            Instruction::Halt,
        ]);
        machine.regs.set(1, 1);
        machine.regs.set(2, 2);

        machine.run();

        assert_eq!(machine.cycles, 3);
    }

    #[test]
    fn test_less_than_is_unsigned() {
        let mut machine = machine_with(&[
            Instruction::LeapLess { x: 1, y: 2, offset: 1 },
            Instruction::Halt,
            Instruction::Halt,
        ]);
        machine.regs.set(1, 0x0001);
        machine.regs.set(2, 0x8000);

        machine.run();

        assert_eq!(machine.regs.ip(), 3);
    }

    #[test]
    fn test_countdown_loop() {
        // r1 = 3, r2 = 1, loop: r1 -= r2; if r1 == r0 skip back-edge
        // 0: SUB r1, r2, r1
        // 1: LEQ r1, r0, +1
        // 2: LEAP r0, 0
        // 3: HALT
        let mut machine = machine_with(&[
            Instruction::Sub { x: 1, y: 2, dest: 1 },
            Instruction::LeapEqual { x: 1, y: 0, offset: 1 },
            Instruction::Leap { base: 0, offset: 0 },
            Instruction::Halt,
        ]);
        machine.regs.set(1, 3);
        machine.regs.set(2, 1);

        machine.run();

        assert_eq!(machine.regs.get(1), 0);
        assert_eq!(machine.cycles, 3 * 2 + 2 + 1);
    }

    #[test]
    fn test_ip_wraps_at_top_of_memory() {
        let mut machine = Machine::new();
        machine.regs.jump(0xFFFF);
        machine.mem.write(0x0000, encode(&Instruction::Halt));

        assert!(!machine.cycle());
        assert_eq!(machine.regs.ip(), 0x0000);
        assert!(machine.cycle());
    }

    #[test]
    fn test_reset_matches_fresh_machine() {
        let mut machine = machine_with(&[
            Instruction::Add { x: 1, y: 1, dest: 2 },
            Instruction::LeapLink { base: 0, offset: 3 },
            Instruction::Halt,
            Instruction::Store { base: 0, offset: 9, src: 2 },
            Instruction::ReturnLink,
        ]);
        machine.regs.set(1, 21);
        machine.run();
        assert_ne!(machine, Machine::new());

        machine.reset();

        assert_eq!(machine, Machine::new());
    }

    #[test]
    fn test_reset_keeps_config() {
        let config = MachineConfig { counter: CounterWidth::Narrow };
        let mut machine = Machine::with_config(config);
        machine.cycle();
        machine.reset();
        assert_eq!(machine, Machine::with_config(config));
    }

    #[test]
    fn test_load_too_large_is_rejected() {
        let mut machine = machine_with(&[Instruction::Halt]);
        let before = machine.clone();

        let result = machine.load_program(&vec![0x2123; MEMORY_SIZE + 1]);

        assert!(matches!(result, Err(LoadError::ProgramTooLarge { .. })));
        assert_eq!(machine, before);
    }

    #[test]
    fn test_narrow_counter_wraps() {
        let mut machine = Machine::with_config(MachineConfig { counter: CounterWidth::Narrow });
        machine.cycles = 0xFFFF;
        machine.cycle();
        assert_eq!(machine.cycles, 0);
    }

    #[test]
    fn test_wide_counter_passes_16_bits() {
        let mut machine = Machine::new();
        machine.cycles = 0xFFFF;
        machine.cycle();
        assert_eq!(machine.cycles, 0x1_0000);

        machine.cycles = u64::MAX;
        machine.cycle();
        assert_eq!(machine.cycles, 0);
    }

    #[test]
    fn test_at_halt() {
        let machine = machine_with(&[Instruction::Halt]);
        assert!(machine.at_halt());
        assert!(!Machine::new().at_halt());
    }

    #[test]
    fn test_state_serializes() {
        let mut machine = machine_with(&[Instruction::Halt]);
        machine.run();

        let json = serde_json::to_string(&machine).unwrap();
        let restored: Machine = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, machine);
    }

    #[test]
    fn test_machines_are_independent_across_threads() {
        let handles: Vec<_> = (1..=4u16)
            .map(|n| {
                std::thread::spawn(move || {
                    let mut machine = machine_with(&[
                        Instruction::Add { x: 1, y: 1, dest: 1 },
                        Instruction::Halt,
                    ]);
                    machine.regs.set(1, n);
                    machine.run();
                    machine.regs.get(1)
                })
            })
            .collect();

        let results: Vec<u16> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results, vec![2, 4, 6, 8]);
    }

    proptest! {
        #[test]
        fn add_then_sub_is_identity(a in any::<u16>(), b in any::<u16>()) {
            let mut machine = machine_with(&[
                Instruction::Add { x: 1, y: 2, dest: 3 },
                Instruction::Sub { x: 3, y: 2, dest: 3 },
                Instruction::Halt,
            ]);
            machine.regs.set(1, a);
            machine.regs.set(2, b);
            machine.run();
            prop_assert_eq!(machine.regs.get(3), a);
        }

        #[test]
        fn shift_by_zero_is_identity(value in any::<u16>(), reg in 1u8..0xE) {
            let mut machine = machine_with(&[
                Instruction::ShiftLeft { src: reg, amount: 0, dest: reg },
                Instruction::ShiftRight { src: reg, amount: 0, dest: reg },
                Instruction::Halt,
            ]);
            machine.regs.set(reg, value);
            machine.run();
            prop_assert_eq!(machine.regs.get(reg), value);
        }

        #[test]
        fn store_load_round_trip(
            value in any::<u16>(),
            addr in 0x0100u16..=0xFFFF,
            rs in 1u8..0xE,
            rd in 1u8..0xE,
            rb in 1u8..0xE,
            offset in 0u8..16,
        ) {
            prop_assume!(rb != rs && rb != rd);
            let mut machine = machine_with(&[
                Instruction::Store { base: rb, offset, src: rs },
                Instruction::Load { base: rb, offset, dest: rd },
                Instruction::Halt,
            ]);
            machine.regs.set(rs, value);
            machine.regs.set(rb, addr.wrapping_sub(offset as u16));
            machine.run();
            prop_assert_eq!(machine.mem.read(addr), value);
            prop_assert_eq!(machine.regs.get(rd), value);
        }

        #[test]
        fn link_then_return_restores_ip(start in 0x0010u16..0xFF00, sp in any::<u16>()) {
            prop_assume!(sp.wrapping_sub(1) != start && sp.wrapping_sub(1) != 0x0008);
            let mut machine = Machine::new();
            machine.regs.jump(start);
            machine.regs.set(Registers::SP, sp);
            machine.regs.set(1, 0x0008);
            machine.mem.write(start, encode(&Instruction::LeapLink { base: 1, offset: 0 }));
            machine.mem.write(0x0008, encode(&Instruction::ReturnLink));

            machine.cycle();
            machine.cycle();

            prop_assert_eq!(machine.regs.ip(), start.wrapping_add(1));
            prop_assert_eq!(machine.regs.sp(), sp);
        }

        #[test]
        fn reset_after_random_program(program in prop::collection::vec(any::<u16>(), 1..64), steps in 0usize..200) {
            let mut machine = Machine::new();
            machine.load_program(&program).unwrap();
            for _ in 0..steps {
                if machine.cycle() {
                    break;
                }
            }
            machine.reset();
            prop_assert_eq!(machine, Machine::new());
        }
    }
}
