//! A compiled function: executable code plus its bytecode mapping
//!
//! `NativeExecutable` is the object the VM holds for each function the JIT
//! has compiled. It owns the machine code, transfers control to it with
//! the platform calling convention, and answers the diagnostic queries
//! that keep error locations and stack traces meaningful while machine
//! code is the executing frame.

use crate::bytecode::{BytecodeCursor, BytecodeExecutable};
use crate::code::CodeBuffer;
use crate::disasm::{self, InstructionDecoder};
use crate::mapping::{CodeOrigin, MappingTable};
use crate::stack::StackSampler;

/// One NaN-boxed value slot in the VM's register or local-variable storage
pub type Slot = u64;

/// Entry point signature for compiled functions
///
/// Compiled code receives a pointer to the VM's mutable state, the
/// register slot array, and the local-variable slot array. Results and
/// control-flow effects travel through the VM state, not a return value.
pub type NativeEntryFn = unsafe extern "C" fn(vm: *mut (), registers: *mut Slot, locals: *mut Slot);

/// Return addresses examined per stack introspection
const MAX_CAPTURED_FRAMES: usize = 10;

/// JIT-compiled machine code for one function, with its bytecode mapping
pub struct NativeExecutable {
    code: CodeBuffer,
    mapping: MappingTable,
}

impl NativeExecutable {
    /// Aggregate a finished code buffer and its mapping table.
    ///
    /// Both come from the code generator; neither changes afterward.
    pub fn new(code: CodeBuffer, mapping: MappingTable) -> Self {
        NativeExecutable { code, mapping }
    }

    pub fn code(&self) -> &CodeBuffer {
        &self.code
    }

    pub fn mapping(&self) -> &MappingTable {
        &self.mapping
    }

    /// Transfer control to the compiled code.
    ///
    /// This is the one site where the buffer's bytes become code.
    ///
    /// # Safety
    /// The buffer must hold a complete function with the `NativeEntryFn`
    /// ABI starting at its base, and `registers`/`locals` must be at least
    /// as large as the bytecode this code was compiled from expects. No
    /// bounds are checked here.
    pub unsafe fn run(&self, vm: *mut (), registers: *mut Slot, locals: *mut Slot) {
        let entry: NativeEntryFn = std::mem::transmute(self.code.base());
        entry(vm, registers, locals);
    }

    /// Render an annotated disassembly listing of the compiled code.
    ///
    /// Diagnostic only; the caller decides where the text goes.
    pub fn render_disassembly(
        &self,
        bytecode: &dyn BytecodeExecutable,
        decoder: &mut dyn InstructionDecoder,
    ) -> String {
        disasm::render(self, bytecode, decoder)
    }

    /// Resolve the bytecode instruction the calling thread is currently
    /// executing inside this function's machine code.
    ///
    /// Captures the native call stack, skips frames outside the code
    /// buffer, and maps the most recent frame inside it back to a block
    /// offset. None when the platform cannot capture stacks, no captured
    /// frame lands in the buffer, or the mapped location is stale with
    /// respect to `bytecode`.
    pub fn current_bytecode_cursor(
        &self,
        bytecode: &dyn BytecodeExecutable,
        sampler: &dyn StackSampler,
    ) -> Option<BytecodeCursor> {
        let mut frames = [0usize; MAX_CAPTURED_FRAMES];
        let count = sampler.capture(&mut frames).min(MAX_CAPTURED_FRAMES);
        let base = self.code.base() as usize;

        for &address in &frames[..count] {
            if !self.code.contains(address) {
                continue;
            }
            // A return address points just past its call; step back one
            // byte so the lookup lands on the call site's own entry.
            let relative = address - base;
            if relative == 0 {
                continue;
            }
            let entry = match self.mapping.lookup((relative - 1) as u32) {
                Some(entry) => entry,
                None => continue,
            };
            if let CodeOrigin::Block {
                block_index,
                bytecode_offset,
            } = entry.origin
            {
                if (block_index as usize) < bytecode.block_count()
                    && (bytecode_offset as usize) < bytecode.block_len(block_index)
                {
                    return Some(BytecodeCursor {
                        block_index,
                        offset: bytecode_offset,
                    });
                }
            }
        }
        None
    }
}
