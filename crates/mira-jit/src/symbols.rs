//! Symbolication of native code addresses
//!
//! Maps absolute addresses inside a compiled function back to
//! human-readable labels derived from the mapping table. The instruction
//! decoder consumes this when rendering operands that reference the same
//! buffer (relative jumps and calls).

use crate::executable::NativeExecutable;
use crate::mapping::CodeOrigin;

/// A resolved symbol: label plus distance from the symbol's start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub label: String,
    pub offset: u32,
}

/// Address-to-label resolution, consumed by instruction decoders
pub trait SymbolProvider {
    /// Resolve an absolute address; None when the address is not ours to
    /// name (outside the code buffer).
    fn symbolicate(&self, address: usize) -> Option<Symbol>;
}

/// Symbol provider backed by a compiled function's mapping table
pub struct JitSymbols<'a> {
    executable: &'a NativeExecutable,
}

impl<'a> JitSymbols<'a> {
    pub fn new(executable: &'a NativeExecutable) -> Self {
        JitSymbols { executable }
    }
}

impl SymbolProvider for JitSymbols<'_> {
    fn symbolicate(&self, address: usize) -> Option<Symbol> {
        let code = self.executable.code();
        if !code.contains(address) {
            return None;
        }
        let native_offset = (address - code.base() as usize) as u32;
        let entry = self.executable.mapping().lookup(native_offset)?;

        let label = match entry.origin {
            CodeOrigin::EntryPoint(label) => label.as_str().to_string(),
            CodeOrigin::Block {
                block_index,
                bytecode_offset: 0,
            } => format!("Block {}", block_index + 1),
            CodeOrigin::Block {
                block_index,
                bytecode_offset,
            } => format!("{}:{:x}", block_index + 1, bytecode_offset),
        };

        Some(Symbol {
            label,
            offset: native_offset.saturating_sub(entry.native_offset),
        })
    }
}
