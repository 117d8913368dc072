#![cfg(all(unix, any(target_arch = "x86_64", target_arch = "aarch64")))]

//! End-to-end tests of the native-code bridge.
//!
//! Builds a real function with Cranelift against the `NativeEntryFn` ABI,
//! places it in executable memory through `map_executable`, and drives it
//! through `NativeExecutable::run`, then exercises symbolication over the
//! same buffer.

use std::sync::Arc;

use cranelift_codegen::control::ControlPlane;
use cranelift_codegen::ir::{types, AbiParam, InstBuilder, MemFlags, Signature, UserFuncName};
use cranelift_codegen::isa::TargetIsa;
use cranelift_codegen::settings::{self, Configurable};
use cranelift_codegen::Context;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};

use mira_jit::{
    map_executable, EntryPointLabel, JitSymbols, MappingEntry, MappingTable, NativeExecutable,
    Slot, SymbolProvider,
};

fn host_isa() -> Arc<dyn TargetIsa> {
    let mut flag_builder = settings::builder();
    flag_builder.set("opt_level", "speed").unwrap();
    flag_builder.set("is_pic", "true").unwrap();
    let flags = settings::Flags::new(flag_builder);

    cranelift_native::builder()
        .expect("host architecture supported by cranelift")
        .finish(flags)
        .expect("ISA construction")
}

/// Compile `fn(vm, registers, locals)` that does
/// `registers[0] += 1; locals[0] = 99;` and returns.
fn compile_bump_function() -> Vec<u8> {
    let isa = host_isa();
    let pointer_type = isa.pointer_type();

    let mut ctx = Context::new();
    let mut signature = Signature::new(isa.default_call_conv());
    signature.params.push(AbiParam::new(pointer_type)); // vm state
    signature.params.push(AbiParam::new(pointer_type)); // registers
    signature.params.push(AbiParam::new(pointer_type)); // locals
    ctx.func.signature = signature;
    ctx.func.name = UserFuncName::user(0, 0);

    let mut builder_ctx = FunctionBuilderContext::new();
    {
        let mut builder = FunctionBuilder::new(&mut ctx.func, &mut builder_ctx);
        let block = builder.create_block();
        builder.append_block_params_for_function_params(block);
        builder.switch_to_block(block);
        builder.seal_block(block);

        let registers = builder.block_params(block)[1];
        let locals = builder.block_params(block)[2];

        let value = builder
            .ins()
            .load(types::I64, MemFlags::trusted(), registers, 0);
        let one = builder.ins().iconst(types::I64, 1);
        let bumped = builder.ins().iadd(value, one);
        builder.ins().store(MemFlags::trusted(), bumped, registers, 0);

        let ninety_nine = builder.ins().iconst(types::I64, 99);
        builder
            .ins()
            .store(MemFlags::trusted(), ninety_nine, locals, 0);

        builder.ins().return_(&[]);
        builder.finalize();
    }

    let mut ctrl_plane = ControlPlane::default();
    let compiled = ctx
        .compile(&*isa, &mut ctrl_plane)
        .expect("cranelift compilation");
    // A leaf function touching only its arguments needs no patching.
    assert!(compiled.buffer.relocs().is_empty());
    compiled.code_buffer().to_vec()
}

fn make_executable() -> NativeExecutable {
    let code_bytes = compile_bump_function();
    let code = map_executable(&code_bytes).expect("executable mapping");
    let mapping = MappingTable::new(vec![
        MappingEntry::entry_point(0, EntryPointLabel::Prologue),
        MappingEntry::block(1, 0, 0),
    ]);
    NativeExecutable::new(code, mapping)
}

#[test]
fn test_run_transfers_control_once() {
    let executable = make_executable();
    let code_len = executable.code().len();

    let mut vm_state = 0u64;
    let mut registers: Vec<Slot> = vec![41, 7, 7, 7];
    let mut locals: Vec<Slot> = vec![0, 0];

    unsafe {
        executable.run(
            &mut vm_state as *mut u64 as *mut (),
            registers.as_mut_ptr(),
            locals.as_mut_ptr(),
        );
    }

    // One call, one increment; everything else untouched.
    assert_eq!(registers, vec![42, 7, 7, 7]);
    assert_eq!(locals, vec![99, 0]);
    assert_eq!(vm_state, 0);

    // The bridge itself stays immutable across calls.
    assert_eq!(executable.code().len(), code_len);
    assert_eq!(executable.mapping().len(), 2);
    assert_eq!(
        executable.mapping().entries()[0],
        MappingEntry::entry_point(0, EntryPointLabel::Prologue)
    );
    assert_eq!(
        executable.mapping().entries()[1],
        MappingEntry::block(1, 0, 0)
    );
}

#[test]
fn test_run_is_repeatable() {
    let executable = make_executable();

    let mut vm_state = 0u64;
    let mut registers: Vec<Slot> = vec![0];
    let mut locals: Vec<Slot> = vec![0];

    for _ in 0..5 {
        unsafe {
            executable.run(
                &mut vm_state as *mut u64 as *mut (),
                registers.as_mut_ptr(),
                locals.as_mut_ptr(),
            );
        }
    }
    assert_eq!(registers[0], 5);
}

#[test]
fn test_symbolication_over_real_code() {
    let executable = make_executable();
    let symbols = JitSymbols::new(&executable);
    let base = executable.code().base() as usize;

    let prologue = symbols.symbolicate(base).unwrap();
    assert_eq!(prologue.label, "Prologue");
    assert_eq!(prologue.offset, 0);

    let block = symbols
        .symbolicate(base + executable.code().len() - 1)
        .unwrap();
    assert_eq!(block.label, "Block 1");

    assert!(symbols
        .symbolicate(base + executable.code().len())
        .is_none());
}
