use mockall::mock;
use shadersim_core::common::constants::STAMP_FRAGMENTS;
use shadersim_core::common::{SimResult, SlotId};
use shadersim_core::core::protocol::{Partition, TextureAccess, Vec4};
use shadersim_core::emulator::ShaderEmulator;
use shadersim_core::isa::{Bank, DecodedInstruction};

mock! {
    pub Emulator {}
    impl ShaderEmulator for Emulator {
        fn reset_state(&mut self, slot: SlotId);
        fn load_state(&mut self, slot: SlotId, bank: Bank, values: &[Vec4], first: u32, count: usize);
        fn set_pc(&mut self, slot: SlotId, pc: u32);
        fn thread_pc(&self, slot: SlotId) -> u32;
        fn fetch_instruction(&mut self, slot: SlotId, pc: u32, partition: Partition) -> Option<DecodedInstruction>;
        fn read_state(&self, slot: SlotId, bank: Bank, count: usize) -> Vec<Vec4>;
        fn was_killed(&self, slot: SlotId) -> bool;
        fn load_program(&mut self, code: &[DecodedInstruction], pc: u32);
        fn execute(&mut self, slot: SlotId, pc: u32, instr: &DecodedInstruction);
        fn next_texture_access(&mut self) -> Option<TextureAccess>;
        fn complete_texture_access(&mut self, id: u64) -> SimResult<[SlotId; STAMP_FRAGMENTS]>;
    }
}

impl MockEmulator {
    /// A mock that accepts any admission traffic and never forms a texture access.
    pub fn permissive() -> Self {
        let mut emu = Self::new();
        let _ = emu.expect_reset_state().return_const(());
        let _ = emu.expect_load_state().return_const(());
        let _ = emu.expect_set_pc().return_const(());
        let _ = emu.expect_next_texture_access().returning(|| None);
        emu
    }
}
