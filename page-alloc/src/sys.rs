// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Thin wrappers around the OS memory APIs.

use std::ptr::{self, NonNull};

use errno::{errno, Errno};

/// Get the system's page size.
#[inline(always)]
pub fn pagesize() -> usize {
    *PAGESIZE
}

lazy_static! {
    static ref PAGESIZE: usize = priv_pagesize();
}

fn priv_pagesize() -> usize {
    // sysconf(_SC_PAGESIZE) is required by POSIX 1003.1
    use libc::{sysconf, _SC_PAGESIZE, EINVAL};
    let pagesize = unsafe { sysconf(_SC_PAGESIZE) };
    if pagesize < 1 {
        assert_eq!(errno().0, EINVAL);
        panic!("sysconf(_SC_PAGESIZE) returned EINVAL, but _SC_PAGESIZE is required by POSIX 1003.1");
    }
    pagesize as usize
}

/// Whether the kernel exposes a huge page pool of `size` bytes.
#[cfg(target_os = "linux")]
pub fn hugepage_supported(size: usize) -> bool {
    // The pool directories are named hugepages-${size}kB, so nothing below 1kB can exist.
    if size < 1024 || !size.is_power_of_two() {
        return false;
    }
    let path = format!("/sys/kernel/mm/hugepages/hugepages-{}kB", size / 1024);
    std::path::Path::new(&path).is_dir()
}

#[cfg(target_os = "macos")]
pub fn hugepage_supported(_size: usize) -> bool {
    false
}

/// Maps `size` bytes of anonymous, private, read/write memory.
///
/// If `huge` is set, `size` must be a multiple of `huge_size` and the mapping is backed by huge
/// pages of that size.
#[cfg(target_os = "linux")]
pub unsafe fn map(size: usize, commit: bool, huge: Option<usize>) -> Result<NonNull<u8>, Errno> {
    use libc::{
        MAP_ANONYMOUS, MAP_FAILED, MAP_HUGETLB, MAP_HUGE_SHIFT, MAP_POPULATE, MAP_PRIVATE,
        PROT_READ, PROT_WRITE,
    };

    let mut flags = MAP_ANONYMOUS | MAP_PRIVATE;
    if commit {
        flags |= MAP_POPULATE;
    }
    if let Some(huge_size) = huge {
        flags |= MAP_HUGETLB | ((huge_size.trailing_zeros() as i32) << MAP_HUGE_SHIFT);
    }

    let ptr = libc::mmap(ptr::null_mut(), size, PROT_READ | PROT_WRITE, flags, -1, 0);
    if ptr == MAP_FAILED {
        Err(errno())
    } else {
        // Without MAP_FIXED, Linux never places a mapping at address 0.
        assert!(!ptr.is_null(), "mmap returned NULL");
        Ok(NonNull::new_unchecked(ptr as *mut u8))
    }
}

#[cfg(target_os = "macos")]
pub unsafe fn map(size: usize, commit: bool, huge: Option<usize>) -> Result<NonNull<u8>, Errno> {
    use libc::{MAP_ANON, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE};

    debug_assert!(huge.is_none());
    let _ = commit;

    let ptr = libc::mmap(ptr::null_mut(), size, PROT_READ | PROT_WRITE, MAP_ANON | MAP_PRIVATE, -1, 0);
    if ptr == MAP_FAILED {
        Err(errno())
    } else {
        assert!(!ptr.is_null(), "mmap returned NULL");
        Ok(NonNull::new_unchecked(ptr as *mut u8))
    }
}

pub unsafe fn unmap(ptr: NonNull<u8>, size: usize) {
    // NOTE: Don't inline the call to munmap; then errno might be called before munmap.
    let ret = libc::munmap(ptr.as_ptr() as *mut _, size);
    assert_eq!(ret, 0, "munmap failed: {}", errno());
}
