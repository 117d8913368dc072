//! Native-code runtime bridge for the Mira VM
//!
//! The interpreter hands hot functions to the JIT; what comes back is a
//! block of executable machine code plus a table mapping native byte
//! offsets to the bytecode locations they were compiled from. This crate
//! owns that code, invokes it with the platform calling convention, and
//! keeps diagnostics meaningful while machine code (not the interpreter)
//! is the executing frame:
//! - annotated disassembly listings (via an injected instruction decoder)
//! - native-stack to bytecode-cursor resolution (via an injected sampler)
//! - a thread-safe cache of compiled functions
//!
//! Code generation itself lives elsewhere; this crate trusts its producer
//! and only consumes finished code regions and mapping tables.

pub mod bytecode;
pub mod cache;
pub mod code;
pub mod disasm;
pub mod executable;
pub mod mapping;
pub mod stack;
pub mod symbols;

pub use bytecode::{BytecodeCursor, BytecodeExecutable, SourceLocation};
pub use cache::CodeCache;
pub use code::{map_executable, CodeBuffer, CodeMapError};
pub use disasm::{DecodedInstruction, InstructionDecoder};
pub use executable::{NativeEntryFn, NativeExecutable, Slot};
pub use mapping::{CodeOrigin, EntryPointLabel, MappingEntry, MappingTable};
pub use stack::{HostSampler, StackSampler, UnsupportedSampler};
pub use symbols::{JitSymbols, Symbol, SymbolProvider};
