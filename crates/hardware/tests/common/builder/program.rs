use shadersim_core::core::protocol::{InputMode, ShaderWork, Vec4};
use shadersim_core::isa::{DecodedInstruction, Opcode, Operand};

/// Builds a straight-line shader program.
#[derive(Default)]
pub struct ProgramBuilder(Vec<DecodedInstruction>);

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `MOV dst, src`.
    pub fn mov(mut self, dst: Operand, src: Operand) -> Self {
        self.0.push(DecodedInstruction::alu(Opcode::Mov, dst, &[src]));
        self
    }

    /// Scalar `MOV dst, src`.
    pub fn mov_scalar(mut self, dst: Operand, src: Operand) -> Self {
        self.0.push(DecodedInstruction::alu(Opcode::Mov, dst, &[src]).scalar());
        self
    }

    /// `TEX dst, coord`.
    pub fn tex(mut self, dst: Operand, coord: Operand) -> Self {
        self.0.push(DecodedInstruction::alu(Opcode::Tex, dst, &[coord]));
        self
    }

    /// `KIL src`.
    pub fn kil(mut self, src: Operand) -> Self {
        self.0.push(DecodedInstruction::alu(Opcode::Kil, Operand::temp(0), &[src]));
        self
    }

    /// `ZXP src`.
    pub fn zxp(mut self, src: Operand) -> Self {
        self.0.push(DecodedInstruction::alu(Opcode::Zxp, Operand::temp(0), &[src]));
        self
    }

    pub fn op(mut self, instr: DecodedInstruction) -> Self {
        self.0.push(instr);
        self
    }

    pub fn end(mut self) -> Vec<DecodedInstruction> {
        self.0.push(DecodedInstruction::end());
        self.0
    }
}

/// The value loaded into input attribute 0 of work item `id`.
pub fn attribute(id: u64) -> Vec4 {
    let v = id as f32;
    [v, v + 0.25, v + 0.5, v + 0.75]
}

/// `count` fragment work items with ids `first..`, each carrying `attribute(id)`.
pub fn fragments(first: u64, count: u64) -> Vec<ShaderWork> {
    (first..first + count)
        .map(|id| ShaderWork::new(id, InputMode::Fragment).with_attributes(vec![attribute(id)]))
        .collect()
}
