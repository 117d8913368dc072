//! Native-offset to bytecode-location mapping
//!
//! For every native offset where a new bytecode location begins, the code
//! generator records a mapping entry. The resulting table partitions the
//! code buffer into contiguous segments, each owned by exactly one
//! bytecode location. It is built once, sorted by native offset, and never
//! mutated afterward; lookups are nearest-preceding binary searches.

use std::fmt;

/// Label for a function-level region that is not part of any bytecode block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPointLabel {
    Prologue,
    Epilogue,
}

impl EntryPointLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryPointLabel::Prologue => "Prologue",
            EntryPointLabel::Epilogue => "Epilogue",
        }
    }
}

impl fmt::Display for EntryPointLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a stretch of native code was compiled from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeOrigin {
    /// An instruction inside a bytecode basic block
    Block {
        /// Index of the basic block in the bytecode executable
        block_index: u32,
        /// Byte offset of the instruction within the block's stream
        bytecode_offset: u32,
    },
    /// A function-level region emitted by the code generator itself
    EntryPoint(EntryPointLabel),
}

/// One row of the mapping table
///
/// Native code from `native_offset` up to (but not including) the next
/// entry's offset originates from `origin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingEntry {
    pub native_offset: u32,
    pub origin: CodeOrigin,
}

impl MappingEntry {
    pub fn block(native_offset: u32, block_index: u32, bytecode_offset: u32) -> Self {
        MappingEntry {
            native_offset,
            origin: CodeOrigin::Block {
                block_index,
                bytecode_offset,
            },
        }
    }

    pub fn entry_point(native_offset: u32, label: EntryPointLabel) -> Self {
        MappingEntry {
            native_offset,
            origin: CodeOrigin::EntryPoint(label),
        }
    }
}

/// Sorted table of mapping entries for one compiled function
#[derive(Debug, Default)]
pub struct MappingTable {
    entries: Vec<MappingEntry>,
}

impl MappingTable {
    /// Build a table from entries already ordered by the code generator.
    ///
    /// The producer guarantees strictly ascending, unique native offsets
    /// with the first entry at offset 0; this is checked in debug builds
    /// only.
    pub fn new(entries: Vec<MappingEntry>) -> Self {
        debug_assert!(
            entries
                .windows(2)
                .all(|w| w[0].native_offset < w[1].native_offset),
            "mapping entries must be strictly ascending"
        );
        debug_assert!(
            entries.first().map_or(true, |e| e.native_offset == 0),
            "first mapping entry must be at native offset 0"
        );
        MappingTable { entries }
    }

    /// Find the entry covering `native_offset` (nearest preceding entry).
    ///
    /// An offset before the first entry clamps to the first entry. Returns
    /// None only for an empty table.
    pub fn lookup(&self, native_offset: u32) -> Option<&MappingEntry> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = self
            .entries
            .partition_point(|e| e.native_offset <= native_offset);
        Some(&self.entries[idx.saturating_sub(1)])
    }

    /// All entries, ascending by native offset.
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
