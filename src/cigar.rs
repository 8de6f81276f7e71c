//! CIGAR operations for sequencing reads.
//!
//! Operations are packed into a single `u32`: the four most significant bits
//! hold the operation kind, the remaining 28 bits hold the run length.

use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq)]
pub enum CigarErr {
    InvalidCigarFormat,
    UnsupportedCigarOperation(char),
}

impl std::fmt::Display for CigarErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CigarErr::InvalidCigarFormat => write!(f, "Invalid CIGAR format"),
            CigarErr::UnsupportedCigarOperation(op) => {
                write!(f, "Unsupported CIGAR operation: {op}")
            }
        }
    }
}

impl std::error::Error for CigarErr {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CigarOp {
    val: u32,
}

impl CigarOp {
    const OP_SHIFT: u32 = 28;
    const LEN_MASK: u32 = (1 << Self::OP_SHIFT) - 1;

    fn code(op: char) -> Option<u32> {
        match op {
            '=' => Some(0),
            'X' => Some(1),
            'I' => Some(2),
            'D' => Some(3),
            'M' => Some(4),
            'S' => Some(5),
            'H' => Some(6),
            'N' => Some(7),
            'P' => Some(8),
            _ => None,
        }
    }

    /// Panics on an unknown op or a length over 28 bits; use [`Self::try_new`] for untrusted input
    pub(crate) fn new(len: u32, op: char) -> Self {
        match Self::try_new(len, op) {
            Ok(op) => op,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn try_new(len: u32, op: char) -> Result<Self, CigarErr> {
        let code = Self::code(op).ok_or(CigarErr::UnsupportedCigarOperation(op))?;
        if len > Self::LEN_MASK {
            return Err(CigarErr::InvalidCigarFormat);
        }
        Ok(Self {
            val: (code << Self::OP_SHIFT) | len,
        })
    }

    pub fn op(&self) -> char {
        match self.val >> Self::OP_SHIFT {
            0 => '=',
            1 => 'X',
            2 => 'I',
            3 => 'D',
            4 => 'M',
            5 => 'S',
            6 => 'H',
            7 => 'N',
            _ => 'P',
        }
    }

    pub fn len(&self) -> u32 {
        self.val & Self::LEN_MASK
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Match-like operations align a read base against a reference base.
    pub fn is_match(&self) -> bool {
        matches!(self.op(), '=' | 'X' | 'M')
    }

    pub fn consumes_reference(&self) -> bool {
        matches!(self.op(), '=' | 'X' | 'M' | 'D' | 'N')
    }

    pub fn consumes_read(&self) -> bool {
        matches!(self.op(), '=' | 'X' | 'M' | 'I' | 'S')
    }

    pub fn reference_delta(&self) -> i64 {
        if self.consumes_reference() {
            self.len() as i64
        } else {
            0
        }
    }

    pub fn read_delta(&self) -> usize {
        if self.consumes_read() {
            self.len() as usize
        } else {
            0
        }
    }

    pub(crate) fn with_len(&self, len: u32) -> Self {
        Self {
            val: (self.val & !Self::LEN_MASK) | len,
        }
    }
}

impl std::fmt::Display for CigarOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.len(), self.op())
    }
}

/// Parse a SAM-style CIGAR string. `*` denotes an absent CIGAR.
pub fn parse_cigar(cigar: &str) -> Result<Vec<CigarOp>, CigarErr> {
    if cigar == "*" {
        return Ok(Vec::new());
    }

    let mut ops = Vec::new();
    let mut len: Option<u32> = None;

    for c in cigar.chars() {
        if let Some(digit) = c.to_digit(10) {
            let current = len.unwrap_or(0);
            len = Some(
                current
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(digit))
                    .ok_or(CigarErr::InvalidCigarFormat)?,
            );
        } else {
            let run = len.take().ok_or(CigarErr::InvalidCigarFormat)?;
            ops.push(CigarOp::try_new(run, c)?);
        }
    }

    if len.is_some() {
        return Err(CigarErr::InvalidCigarFormat);
    }

    Ok(ops)
}

pub fn cigar_to_string(ops: &[CigarOp]) -> String {
    if ops.is_empty() {
        return "*".to_string();
    }
    ops.iter().map(|op| op.to_string()).collect()
}

/// Number of read bases described by the CIGAR.
pub fn read_length(ops: &[CigarOp]) -> usize {
    ops.iter().map(|op| op.read_delta()).sum()
}

/// Number of reference bases spanned by the CIGAR.
pub fn reference_length(ops: &[CigarOp]) -> i64 {
    ops.iter().map(|op| op.reference_delta()).sum()
}
