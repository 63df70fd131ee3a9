//! `gen_helpers()`: the initialization step that enumerates every helper
//! symbol the emitter may reference (spec §6 "symbols are resolved at link
//! time and collected by a `gen_helpers()` initialization step").
//!
//! Nothing here allocates or touches a real linker; this is the frontend's
//! side of the contract, listing what a real back-end must provide before
//! translation begins (in the style of `instr/decode.rs`'s
//! `SignatureDecoder::Executer` table-building pattern, generalized from
//! opcode dispatch entries to helper-symbol entries).

use crate::ir::HelperSymbol;

/// All helper symbols the emitter can call, in declaration order. A real
/// engine's `gen_helpers()` equivalent would resolve each to a function
/// pointer; this frontend only needs the enumeration to validate coverage
/// in tests.
pub fn gen_helpers() -> &'static [HelperSymbol] {
    use HelperSymbol::*;
    &[
        RaiseException,
        RaiseExceptionBadAddr,
        RaiseDebugException,
        CsrRw,
        CsrRs,
        CsrRc,
        CsrRwi,
        CsrRsi,
        CsrRci,
        Sret,
        Mret,
        Wfi,
        TlbFlush,
        FenceI,
        FaddS,
        FsubS,
        FmulS,
        FdivS,
        FsqrtS,
        FaddD,
        FsubD,
        FmulD,
        FdivD,
        FsqrtD,
        FminS,
        FmaxS,
        FminD,
        FmaxD,
        FeqS,
        FltS,
        FleS,
        FeqD,
        FltD,
        FleD,
        FclassS,
        FclassD,
        FmaddS,
        FmsubS,
        FnmsubS,
        FnmaddS,
        FmaddD,
        FmsubD,
        FnmsubD,
        FnmaddD,
        FcvtWS,
        FcvtWuS,
        FcvtLS,
        FcvtLuS,
        FcvtSW,
        FcvtSWu,
        FcvtSL,
        FcvtSLu,
        FcvtWD,
        FcvtWuD,
        FcvtLD,
        FcvtLuD,
        FcvtDW,
        FcvtDWu,
        FcvtDL,
        FcvtDLu,
        FcvtSD,
        FcvtDS,
        HelperVsetVl,
        HelperVmv,
        HelperVmerge,
        HelperVcompress,
        HelperVadc,
        HelperVsbc,
        HelperVmadc,
        HelperVmsbc,
    ]
}
