//! `elf2trace`: convert an ELF executable's `.text` section into a
//! human-readable translation trace file, one `.block.<n>` section per
//! translation block, each line giving the guest PC, decoded mnemonic, and
//! line count of emitted IR.

use std::fmt::Write as _;

use clap::Parser;
use emulator::code_fetch::SegmentFetch;
use emulator::text_builder::TextIrBuilder;
use riscvemu::tb::{TbBuilder, TranslationBlock, TranslatorConfig};

/// Convert an ELF executable into a translation trace file.
///
/// Unlike a testbench-format instruction-region image, this trace records
/// the translation frontend's own output: per block, the sequence of guest
/// instructions and the host IR lines each one lowered to.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Path to input ELF file
    #[arg(short, long)]
    input: String,

    /// Path to output trace file
    #[arg(short, long)]
    output: String,

    /// Maximum number of translation blocks to record
    #[arg(long, default_value_t = 64)]
    max_blocks: u32,
}

fn main() {
    let args = Args::parse();

    let mut fetch = SegmentFetch::elf(&args.input).unwrap_or_else(|e| {
        eprintln!("error loading {}: {e}", args.input);
        std::process::exit(1);
    });
    let entry = SegmentFetch::entry_point(&args.input).unwrap_or_else(|e| {
        eprintln!("error reading entry point of {}: {e}", args.input);
        std::process::exit(1);
    });

    let config = TranslatorConfig::default();
    let mut builder = TextIrBuilder::new();
    let mut out = String::new();
    let mut pc = entry;

    for block_no in 0..args.max_blocks {
        let mut tb = TranslationBlock::new(pc, &config);
        {
            let mut tbb = TbBuilder::new(&mut builder, &mut fetch, config);
            if let Err(e) = tbb.translate(&mut tb) {
                let _ = writeln!(out, "# translation stopped: {e}");
                break;
            }
        }
        if tb.icount == 0 {
            break;
        }
        let _ = writeln!(out, ".block.{block_no} # pc=0x{pc:x} icount={}", tb.icount);
        for (n, line) in builder.take_lines().iter().enumerate() {
            let _ = writeln!(out, "  {n:04} {line}");
        }
        pc += tb.size as u64;
    }

    if let Err(e) = std::fs::write(&args.output, out) {
        eprintln!("error writing {}: {e}", args.output);
        std::process::exit(1);
    }
}
