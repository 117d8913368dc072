//! Disassembly rendering with bytecode annotations
//!
//! Walks a compiled function's machine code with an injected streaming
//! decoder and interleaves the bytecode locations each stretch of native
//! code was compiled from. Diagnostic output only; decode failure ends
//! the walk instead of erroring, and whatever was rendered stands.

use std::fmt::Write;

use crate::bytecode::BytecodeExecutable;
use crate::executable::NativeExecutable;
use crate::mapping::CodeOrigin;
use crate::symbols::{JitSymbols, SymbolProvider};

/// Raw bytes of one decoded instruction shown per listing line
const BYTES_PER_LINE: usize = 7;

/// One decoded native instruction
pub struct DecodedInstruction {
    /// Instruction length in bytes
    pub length: usize,
    /// Mnemonic and operands, already symbolicated
    pub text: String,
}

/// Streaming decoder for the target instruction set
///
/// Implemented outside this crate, per architecture. Architectures
/// without a decoder have nothing to inject and simply cannot render
/// disassembly; everything else in the crate stays functional.
pub trait InstructionDecoder {
    /// Decode the instruction at the front of `bytes`.
    ///
    /// `vaddr` is the absolute address of `bytes[0]`; `symbols` resolves
    /// addresses referenced by operands. None ends the walk, either at end
    /// of stream or on bytes that do not decode.
    fn decode(
        &mut self,
        bytes: &[u8],
        vaddr: usize,
        symbols: &dyn SymbolProvider,
    ) -> Option<DecodedInstruction>;
}

pub(crate) fn render(
    executable: &NativeExecutable,
    bytecode: &dyn BytecodeExecutable,
    decoder: &mut dyn InstructionDecoder,
) -> String {
    let code = executable.code().as_bytes();
    let base = executable.code().base() as usize;
    let entries = executable.mapping().entries();
    let symbols = JitSymbols::new(executable);

    let mut out = String::new();
    let location = bytecode.source_location();
    let _ = writeln!(
        out,
        "Disassembly of '{}' ({}:{}:{}):",
        bytecode.name(),
        location.filename,
        location.line,
        location.column
    );

    let mut offset = 0usize;
    let mut next_entry = 0usize;

    loop {
        // Advance past entries the previous instruction stepped over, then
        // annotate when we sit exactly on an entry's native offset.
        while next_entry < entries.len() && offset > entries[next_entry].native_offset as usize {
            next_entry += 1;
        }
        if next_entry < entries.len() && offset == entries[next_entry].native_offset as usize {
            match entries[next_entry].origin {
                CodeOrigin::EntryPoint(label) => {
                    let _ = writeln!(out, "{}:", label);
                }
                CodeOrigin::Block {
                    block_index,
                    bytecode_offset,
                } => {
                    if bytecode_offset == 0 {
                        let _ = writeln!(out, "\nBlock {}:", block_index + 1);
                    }
                    let _ = writeln!(
                        out,
                        "{}:{:x} {}:",
                        block_index + 1,
                        bytecode_offset,
                        bytecode.render_instruction(block_index, bytecode_offset)
                    );
                }
            }
        }

        if offset >= code.len() {
            break;
        }
        let vaddr = base + offset;
        let instruction = match decoder.decode(&code[offset..], vaddr, &symbols) {
            Some(instruction) => instruction,
            None => break,
        };
        // A decoder may not step past the buffer, whatever length it claims.
        let length = instruction.length.clamp(1, code.len() - offset);

        let mut line = String::new();
        let _ = write!(line, "{:#018x}  ", vaddr);
        for i in 0..BYTES_PER_LINE {
            if i < length {
                let _ = write!(line, "{:02x} ", code[offset + i]);
            } else {
                line.push_str("   ");
            }
        }
        line.push(' ');
        line.push_str(&instruction.text);
        let _ = writeln!(out, "{}", line);

        // Continuation lines for instructions longer than one row of bytes,
        // each re-printing the address advanced by the bytes already shown.
        let mut printed = BYTES_PER_LINE;
        while printed < length {
            let mut cont = String::new();
            let _ = write!(cont, "{:#018x} ", vaddr + printed);
            for i in printed..(printed + BYTES_PER_LINE).min(length) {
                let _ = write!(cont, " {:02x}", code[offset + i]);
            }
            let _ = writeln!(out, "{}", cont);
            printed += BYTES_PER_LINE;
        }

        offset += length;
    }

    out
}
