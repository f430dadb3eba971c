// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Alignment helpers shared by the segments.
//!
//! Both segments over-allocate by `align` bytes and then move the returned pointer forward to the
//! next aligned address. The distance moved is always at least one byte and is stored in the byte
//! just before the returned pointer, so the original address can be recovered later.

/// The largest alignment a segment will honor.
///
/// The adjustment has to fit in a single byte.
pub const MAX_ALIGN: usize = 128;

#[inline]
pub fn align_up(addr: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (addr + align - 1) & !(align - 1)
}

/// Panics if `align` is not a power of two no greater than `MAX_ALIGN`.
#[inline]
pub fn check_align(align: usize) {
    assert!(
        align.is_power_of_two() && align <= MAX_ALIGN,
        "invalid alignment {} (must be a power of two no greater than {})",
        align,
        MAX_ALIGN
    );
}

/// Aligns `base` strictly forward and records the distance in the preceding byte.
///
/// # Safety
///
/// `[base, base + align]` must be writable.
#[inline]
pub unsafe fn align_and_record(base: *mut u8, align: usize) -> *mut u8 {
    let addr = align_up(base as usize + 1, align);
    let adjust = addr - base as usize;
    debug_assert!(adjust >= 1 && adjust <= align);
    let ptr = base.add(adjust);
    *ptr.sub(1) = adjust as u8;
    ptr
}

/// Recovers the address passed to `align_and_record`.
///
/// # Safety
///
/// `ptr` must have been returned by `align_and_record`, and the byte before it left untouched.
#[inline]
pub unsafe fn unalign(ptr: *mut u8) -> *mut u8 {
    ptr.sub(*ptr.sub(1) as usize)
}
