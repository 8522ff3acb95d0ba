//! CPU affinity mask decoding for `Cpus_allowed:` values from /proc/<pid>/status.
//!
//! The kernel prints the mask as hex, split into comma-separated 32-bit groups
//! on machines with more than 32 CPUs (e.g. `ffffffff,ffffffff`). The decoded
//! mask keeps every bit the kernel reported.

use serde::{Serialize, Serializer};
use std::fmt;
use std::fmt::Write as _;

/// Narrowest rendering width, so small masks still print as a full byte.
pub const MIN_RENDER_BITS: usize = 8;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AffinityError {
    #[error("empty affinity mask")]
    Empty,

    #[error("invalid hex digit '{0}' in affinity mask")]
    InvalidDigit(char),
}

/// Bit-per-CPU affinity mask. Bit `i` is CPU `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuMask {
    bits: Vec<bool>,
}

impl CpuMask {
    /// Decodes a kernel hex mask. Width is four bits per hex digit, at least
    /// [`MIN_RENDER_BITS`].
    pub fn from_hex(raw: &str) -> Result<Self, AffinityError> {
        let digits: Vec<char> = raw.trim().chars().filter(|c| *c != ',').collect();
        if digits.is_empty() {
            return Err(AffinityError::Empty);
        }

        let width = (digits.len() * 4).max(MIN_RENDER_BITS);
        let mut bits = vec![false; width];

        // Least significant digit is last in the string.
        for (nibble_idx, c) in digits.iter().rev().enumerate() {
            let value = c.to_digit(16).ok_or(AffinityError::InvalidDigit(*c))?;
            for bit in 0..4 {
                bits[nibble_idx * 4 + bit] = value & (1 << bit) != 0;
            }
        }

        Ok(Self { bits })
    }

    /// Number of CPUs the task may run on.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    /// Iterator over the allowed CPU indices, ascending.
    pub fn cpus(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(i, set)| set.then_some(i))
    }

    /// Binary rendering, most significant bit first, over the full width.
    pub fn render(&self) -> String {
        self.bits
            .iter()
            .rev()
            .map(|b| if *b { '1' } else { '0' })
            .collect()
    }

    /// Compact range list in `Cpus_allowed_list` notation, e.g. `0-3,8`.
    pub fn cpu_list(&self) -> String {
        let mut out = String::new();
        let mut cpus = self.cpus().peekable();

        while let Some(start) = cpus.next() {
            let mut end = start;
            while cpus.peek() == Some(&(end + 1)) {
                end += 1;
                cpus.next();
            }
            if !out.is_empty() {
                out.push(',');
            }
            if start == end {
                let _ = write!(out, "{start}");
            } else {
                let _ = write!(out, "{start}-{end}");
            }
        }
        out
    }
}

impl fmt::Display for CpuMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.count(), self.render())
    }
}

impl Serialize for CpuMask {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("CpuMask", 3)?;
        s.serialize_field("count", &self.count())?;
        s.serialize_field("mask", &self.render())?;
        s.serialize_field("cpus", &self.cpu_list())?;
        s.end()
    }
}
