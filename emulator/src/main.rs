//! `emulate`: load a guest binary or ELF, translate it block by block, and
//! print the emitted IR as text. Doubles as the harness for the round-trip
//! disassembly property (spec §8) since every decoded `Op`'s `Display`
//! output is printed alongside the IR it lowers to.

use clap::Parser;
use clap_num::maybe_hex;
use riscvemu::tb::{TbBuilder, TranslationBlock, TranslatorConfig};
use riscvemu::xlen::Xlen;
use rustyline::DefaultEditor;
use tracing::{info, warn};

use emulator::code_fetch::SegmentFetch;
use emulator::text_builder::TextIrBuilder;

/// Translate a RISC-V guest binary to host IR text, one block at a time.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the input file (ELF, or a flat binary with --flat-base)
    input: String,

    /// Treat the input as a flat binary loaded at this address instead of
    /// parsing it as ELF (use 0x prefix for hexadecimal)
    #[arg(long, value_parser = maybe_hex::<u64>)]
    flat_base: Option<u64>,

    /// Starting guest PC for translation (defaults to the ELF entry point,
    /// or --flat-base for a flat binary)
    #[arg(long, value_parser = maybe_hex::<u64>)]
    start_pc: Option<u64>,

    /// Target is RV32 instead of the default RV64
    #[arg(long)]
    rv32: bool,

    /// Disable the C (compressed) extension
    #[arg(long)]
    no_rvc: bool,

    /// Maximum number of translation blocks to emit before stopping
    #[arg(long, default_value_t = 16)]
    max_blocks: u32,

    /// Maximum instructions per translation block
    #[arg(long, default_value_t = 512)]
    max_insns: u32,

    /// Step one translation block at a time, waiting for Enter between each
    #[arg(short, long)]
    interactive: bool,
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let (mut fetch, start_pc) = match args.flat_base {
        Some(base) => {
            let fetch = SegmentFetch::flat(&args.input, base).unwrap_or_else(|e| {
                eprintln!("error loading {}: {e}", args.input);
                std::process::exit(1);
            });
            (fetch, args.start_pc.unwrap_or(base))
        }
        None => {
            let fetch = SegmentFetch::elf(&args.input).unwrap_or_else(|e| {
                eprintln!("error loading {}: {e}", args.input);
                std::process::exit(1);
            });
            let entry = SegmentFetch::entry_point(&args.input).unwrap_or_else(|e| {
                eprintln!("error reading entry point of {}: {e}", args.input);
                std::process::exit(1);
            });
            (fetch, args.start_pc.unwrap_or(entry))
        }
    };

    let config = TranslatorConfig {
        xlen: if args.rv32 { Xlen::Rv32 } else { Xlen::Rv64 },
        rvc_enabled: !args.no_rvc,
        max_insns: args.max_insns,
        ..TranslatorConfig::default()
    };

    let mut rl = args.interactive.then(|| DefaultEditor::new().expect("terminal supports line editing"));

    let mut builder = TextIrBuilder::new();
    let mut pc = start_pc;
    for block_no in 0..args.max_blocks {
        if let Some(rl) = rl.as_mut() {
            if rl.readline(&format!("[block {block_no} @ 0x{pc:x}] press enter to translate, q to quit > ")).map(|l| l == "q").unwrap_or(true) {
                break;
            }
        }
        let mut tb = TranslationBlock::new(pc, &config);
        {
            let mut tbb = TbBuilder::new(&mut builder, &mut fetch, config);
            if let Err(e) = tbb.translate(&mut tb) {
                warn!(%e, pc = format!("0x{pc:x}"), "translation aborted");
                break;
            }
        }
        info!(block = block_no, pc = format!("0x{pc:x}"), icount = tb.icount, "translated block");
        println!("-- block {block_no} @ 0x{pc:x} ({} instructions) --", tb.icount);
        for line in builder.take_lines() {
            println!("  {line}");
        }
        if tb.icount == 0 {
            break;
        }
        pc += tb.size as u64;
    }
}
