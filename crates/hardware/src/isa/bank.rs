//! Register banks and operands.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::constants::{ADDR_BANK_REGS, OUTPUT_BANK_REGS, PRED_BANK_REGS, TEMP_BANK_REGS};

/// Register bank named by an operand or a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bank {
    /// Per-thread input attributes, loaded at admission.
    Input,
    /// Per-thread output attributes, read at transmission.
    Output,
    /// Constant (parameter) bank shared by a partition.
    Param,
    /// Temporary registers.
    Temp,
    /// Address registers used for relative constant access.
    Addr,
    /// Predicate registers.
    Pred,
    /// Texture sampler identifiers.
    Texture,
}

impl Bank {
    /// Returns true if the decode box tracks read-after-write hazards on this bank.
    #[inline]
    pub const fn tracks_reads(self) -> bool {
        matches!(self, Self::Temp | Self::Addr | Self::Pred)
    }

    /// Returns the number of hazard-tracked registers, or `None` for banks an
    /// instruction cannot write.
    #[inline]
    pub const fn writable_regs(self) -> Option<usize> {
        match self {
            Self::Temp => Some(TEMP_BANK_REGS),
            Self::Addr => Some(ADDR_BANK_REGS),
            Self::Pred => Some(PRED_BANK_REGS),
            Self::Output => Some(OUTPUT_BANK_REGS),
            Self::Input | Self::Param | Self::Texture => None,
        }
    }

    /// Short bank name used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Input => "in",
            Self::Output => "out",
            Self::Param => "c",
            Self::Temp => "r",
            Self::Addr => "a",
            Self::Pred => "p",
            Self::Texture => "tex",
        }
    }
}

/// A register reference: bank plus register index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operand {
    /// Register bank.
    pub bank: Bank,
    /// Register index inside the bank.
    pub reg: u32,
}

impl Operand {
    /// Creates an operand.
    #[inline(always)]
    pub const fn new(bank: Bank, reg: u32) -> Self {
        Self { bank, reg }
    }

    /// Temporary register `reg`.
    #[inline(always)]
    pub const fn temp(reg: u32) -> Self {
        Self::new(Bank::Temp, reg)
    }

    /// Input attribute `reg`.
    #[inline(always)]
    pub const fn input(reg: u32) -> Self {
        Self::new(Bank::Input, reg)
    }

    /// Output attribute `reg`.
    #[inline(always)]
    pub const fn output(reg: u32) -> Self {
        Self::new(Bank::Output, reg)
    }

    /// Constant register `reg`.
    #[inline(always)]
    pub const fn param(reg: u32) -> Self {
        Self::new(Bank::Param, reg)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.bank.name(), self.reg)
    }
}
