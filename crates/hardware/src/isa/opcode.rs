//! Shader opcodes and execution latencies.
//!
//! Latencies model the variable-latency array-of-structures ALU: the value is the number of
//! cycles from issue to result, before the writeback cycle the decode box adds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Shader instruction opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(missing_docs)]
pub enum Opcode {
    Nop,
    Add,
    Addi,
    Arl,
    Andp,
    Cos,
    Dp3,
    Dp4,
    Dph,
    Dst,
    Ex2,
    Exp,
    Flr,
    Frc,
    Lg2,
    Lit,
    Log,
    Mad,
    Max,
    Min,
    Mov,
    Mul,
    Muli,
    Rcp,
    Rsq,
    Setpeq,
    Setpgt,
    Sge,
    Setplt,
    Sin,
    Stpeqi,
    Slt,
    Stpgti,
    Stplti,
    Txl,
    Tex,
    Txb,
    Txp,
    Kil,
    Kls,
    Zxp,
    Zxs,
    Cmp,
    Cmpkil,
    Chs,
    Lda,
    Fxmul,
    Fxmad,
    Fxmad2,
    Ddx,
    Ddy,
    Jmp,
    End,
}

impl Opcode {
    /// Execution latency in cycles, excluding writeback.
    pub const fn latency(self) -> u32 {
        match self {
            Self::Flr => 0,
            Self::Nop
            | Self::Andp
            | Self::Txl
            | Self::Tex
            | Self::Txb
            | Self::Lda
            | Self::Jmp
            | Self::End => 1,
            Self::Addi | Self::Muli | Self::Stpeqi | Self::Stpgti | Self::Stplti => 2,
            Self::Add
            | Self::Arl
            | Self::Dp3
            | Self::Dp4
            | Self::Dph
            | Self::Frc
            | Self::Mad
            | Self::Max
            | Self::Min
            | Self::Mov
            | Self::Mul
            | Self::Setpeq
            | Self::Setpgt
            | Self::Sge
            | Self::Setplt
            | Self::Slt
            | Self::Kil
            | Self::Kls
            | Self::Zxp
            | Self::Zxs
            | Self::Cmp
            | Self::Cmpkil
            | Self::Chs
            | Self::Fxmul
            | Self::Fxmad
            | Self::Fxmad2 => 3,
            Self::Dst | Self::Lit => 4,
            Self::Ex2 | Self::Lg2 | Self::Rcp | Self::Rsq | Self::Txp => 5,
            Self::Exp | Self::Log => 9,
            Self::Cos | Self::Sin => 12,
            Self::Ddx | Self::Ddy => 16,
        }
    }

    /// Returns true for the program terminator.
    #[inline]
    pub const fn is_end(self) -> bool {
        matches!(self, Self::End)
    }

    /// Returns true for instructions that issue a texture access and block the thread
    /// until the result comes back.
    #[inline]
    pub const fn is_texture_load(self) -> bool {
        matches!(self, Self::Tex | Self::Txb | Self::Txl | Self::Txp | Self::Lda)
    }

    /// Returns true for early depth export instructions.
    #[inline]
    pub const fn is_zexport(self) -> bool {
        matches!(self, Self::Zxp | Self::Zxs)
    }

    /// Returns true for instructions that may kill the thread.
    #[inline]
    pub const fn is_kill(self) -> bool {
        matches!(self, Self::Kil | Self::Kls | Self::Cmpkil)
    }

    /// Returns true if the instruction writes its result register.
    #[inline]
    pub const fn writes_result(self) -> bool {
        !matches!(
            self,
            Self::End | Self::Nop | Self::Kil | Self::Kls | Self::Zxp | Self::Zxs | Self::Chs
        )
    }

    /// Assembly mnemonic.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Nop => "NOP",
            Self::Add => "ADD",
            Self::Addi => "ADDI",
            Self::Arl => "ARL",
            Self::Andp => "ANDP",
            Self::Cos => "COS",
            Self::Dp3 => "DP3",
            Self::Dp4 => "DP4",
            Self::Dph => "DPH",
            Self::Dst => "DST",
            Self::Ex2 => "EX2",
            Self::Exp => "EXP",
            Self::Flr => "FLR",
            Self::Frc => "FRC",
            Self::Lg2 => "LG2",
            Self::Lit => "LIT",
            Self::Log => "LOG",
            Self::Mad => "MAD",
            Self::Max => "MAX",
            Self::Min => "MIN",
            Self::Mov => "MOV",
            Self::Mul => "MUL",
            Self::Muli => "MULI",
            Self::Rcp => "RCP",
            Self::Rsq => "RSQ",
            Self::Setpeq => "SETPEQ",
            Self::Setpgt => "SETPGT",
            Self::Sge => "SGE",
            Self::Setplt => "SETPLT",
            Self::Sin => "SIN",
            Self::Stpeqi => "STPEQI",
            Self::Slt => "SLT",
            Self::Stpgti => "STPGTI",
            Self::Stplti => "STPLTI",
            Self::Txl => "TXL",
            Self::Tex => "TEX",
            Self::Txb => "TXB",
            Self::Txp => "TXP",
            Self::Kil => "KIL",
            Self::Kls => "KLS",
            Self::Zxp => "ZXP",
            Self::Zxs => "ZXS",
            Self::Cmp => "CMP",
            Self::Cmpkil => "CMPKIL",
            Self::Chs => "CHS",
            Self::Lda => "LDA",
            Self::Fxmul => "FXMUL",
            Self::Fxmad => "FXMAD",
            Self::Fxmad2 => "FXMAD2",
            Self::Ddx => "DDX",
            Self::Ddy => "DDY",
            Self::Jmp => "JMP",
            Self::End => "END",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
