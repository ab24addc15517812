//! Target-resident programming routines, as opaque Thumb machine code.
//!
//! Both stubs implement the same calling convention: r0 = destination,
//! r1 = source buffer, r2 = byte count, r3 = reserved (zero). They enable
//! programming mode on the controller, copy the buffer one transfer at a
//! time while waiting out the busy flag, and exit through a breakpoint with
//! the FLASH_SR error flags as status in r0.
//!
//! Thumb-1 encodings only, so the same blobs run on every supported core.

/// Byte-wide programming loop (PSIZE x8).
pub(crate) const WRITE_X8: &[u16] = &[
    0x4F08, // ldr   r7, [pc, #32]  ; flash controller base
    0x2601, // movs  r6, #1         ; PG, PSIZE x8
    0x613E, // str   r6, [r7, #16]  ; FLASH_CR
    0x2A00, // cmp   r2, #0
    0xD008, // beq   done
    0x780C, // ldrb  r4, [r1]
    0x7004, // strb  r4, [r0]
    0x68FD, // busy: ldr r5, [r7, #12] ; FLASH_SR
    0x0C6D, // lsrs  r5, r5, #17    ; carry = BSY
    0xD2FC, // bcs   busy
    0x3001, // adds  r0, #1
    0x3101, // adds  r1, #1
    0x3A01, // subs  r2, #1
    0xE7F4, // b     next
    0x68F8, // done: ldr r0, [r7, #12]
    0x21F2, // movs  r1, #0xF2      ; error flags
    0x4008, // ands  r0, r1
    0xBE00, // bkpt  #0
    0x3C00, 0x4002, // .word 0x40023C00
];

/// Word-wide programming loop (PSIZE x32).
pub(crate) const WRITE_X32: &[u16] = &[
    0x4F08, // ldr   r7, [pc, #32]  ; flash controller base
    0x4E09, // ldr   r6, [pc, #36]  ; PG, PSIZE x32
    0x613E, // str   r6, [r7, #16]  ; FLASH_CR
    0x2A00, // cmp   r2, #0
    0xD008, // beq   done
    0x680C, // ldr   r4, [r1]
    0x6004, // str   r4, [r0]
    0x68FD, // busy: ldr r5, [r7, #12] ; FLASH_SR
    0x0C6D, // lsrs  r5, r5, #17    ; carry = BSY
    0xD2FC, // bcs   busy
    0x3004, // adds  r0, #4
    0x3104, // adds  r1, #4
    0x3A04, // subs  r2, #4
    0xE7F4, // b     next
    0x68F8, // done: ldr r0, [r7, #12]
    0x21F2, // movs  r1, #0xF2      ; error flags
    0x4008, // ands  r0, r1
    0xBE00, // bkpt  #0
    0x3C00, 0x4002, // .word 0x40023C00
    0x0201, 0x0000, // .word 0x00000201
];
