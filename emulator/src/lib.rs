//! Shared support for the `emulate`/`elf2trace` binaries: the text-dumping
//! [`ir::IrBuilder`](riscvemu::ir::IrBuilder) implementation and the
//! [`tb::CodeFetch`](riscvemu::tb::CodeFetch) implementations that load a
//! guest binary for translation.

pub mod code_fetch;
pub mod text_builder;
