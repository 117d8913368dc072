//! Interface to the bytecode side of the VM
//!
//! The bridge never owns bytecode. It queries the executable a function
//! was compiled from — block layout, instruction rendering, metadata —
//! through this trait, implemented by the VM's bytecode module (and by
//! fixtures in tests).

/// Source position of the function a bytecode executable was compiled from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub filename: String,
    pub line: u32,
    pub column: u32,
}

/// The bytecode executable a compiled function originates from
pub trait BytecodeExecutable {
    /// Declared name of the function.
    fn name(&self) -> &str;

    /// Where the function originates in source (disassembly header).
    fn source_location(&self) -> SourceLocation;

    /// Number of basic blocks.
    fn block_count(&self) -> usize;

    /// Byte length of a block's instruction stream.
    fn block_len(&self, block_index: u32) -> usize;

    /// Human-readable rendering of the instruction at `bytecode_offset`
    /// within a block's instruction stream.
    fn render_instruction(&self, block_index: u32, bytecode_offset: u32) -> String;
}

/// An owned position within a block's instruction stream
///
/// Returned by stack introspection so diagnostics can report a bytecode
/// location as if the interpreter were executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BytecodeCursor {
    pub block_index: u32,
    pub offset: u32,
}
