// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A page provider backed by a single memory mapping.
//!
//! A `PageProvider` reserves one large region from the operating system when it is built and
//! divides it into fixed-size pages. Segment allocators then request contiguous runs of pages
//! from it and release them when they are dropped. The whole region is returned to the OS when
//! the provider itself is dropped.
//!
//! The provider is single-threaded. It is meant to be shared between segments through an `Rc`.

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
compile_error!("page-alloc only supports Linux and Mac");

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

pub mod sys;
#[cfg(test)]
mod tests;

use std::cell::RefCell;
use std::ptr::NonNull;

use object_alloc::Exhausted;
use thiserror::Error;

/// The smallest page size a provider will use by default.
pub const MIN_PAGE_SIZE: usize = 2 << 20;

/// Whether a provider should back its region with huge pages.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum HugePagePolicy {
    /// Never use huge pages.
    #[default]
    Off,
    /// Use huge pages if the OS offers them at the configured page size, and fall back to normal
    /// pages otherwise.
    Prefer,
    /// Use huge pages or fail to build.
    Require,
}

/// An error building a `PageProvider`.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("cannot reserve an empty region")]
    ZeroSize,
    #[error("a region of {size} bytes does not fit in the page table")]
    Overflow { size: usize },
    #[error("huge pages of {size} bytes are not available")]
    HugePagesUnsupported { size: usize },
    #[error("mapping {size} bytes failed: {errno}")]
    Map { size: usize, errno: errno::Errno },
}

/// A builder for `PageProvider`.
///
/// New builders are constructed using `default`. The default configuration uses pages of
/// `max(system page size, 2 MiB)`, no huge pages, and leaves the region uncommitted.
///
/// To get a provider that prefers huge pages and falls back to normal pages of the same size,
/// call `huge_pages(HugePagePolicy::Prefer)`. `Off` is the default because most systems reserve
/// no huge pages, and each fallback is logged at `warn!`.
#[derive(Clone, Debug)]
pub struct PageProviderBuilder {
    page_size: usize,
    huge_pages: HugePagePolicy,
    commit: bool,
}

impl Default for PageProviderBuilder {
    fn default() -> PageProviderBuilder {
        PageProviderBuilder {
            page_size: default_page_size(),
            huge_pages: HugePagePolicy::Off,
            commit: false,
        }
    }
}

impl PageProviderBuilder {
    /// Overrides the page size.
    ///
    /// `page_size` must be a power of two and a multiple of the system page size.
    pub fn page_size(mut self, page_size: usize) -> PageProviderBuilder {
        self.page_size = page_size;
        self
    }

    /// Selects the huge-page policy. See `HugePagePolicy`.
    pub fn huge_pages(mut self, policy: HugePagePolicy) -> PageProviderBuilder {
        self.huge_pages = policy;
        self
    }

    /// Configures whether the region is faulted in up front.
    ///
    /// Committing is only honored on Linux, where it maps with `MAP_POPULATE`.
    pub fn commit(mut self, commit: bool) -> PageProviderBuilder {
        self.commit = commit;
        self
    }

    /// Reserves `size` bytes, rounded up to whole pages, and builds the provider.
    pub fn build(&self, size: usize) -> Result<PageProvider, InitError> {
        let page_size = self.page_size;
        assert!(
            page_size.is_power_of_two(),
            "page size ({}) is not a power of two",
            page_size
        );
        assert_eq!(
            page_size % sys::pagesize(),
            0,
            "page size ({}) is not a multiple of the system page size ({})",
            page_size,
            sys::pagesize()
        );

        if size == 0 {
            return Err(InitError::ZeroSize);
        }
        let page_count = size
            .checked_add(page_size - 1)
            .map(|s| s / page_size)
            .filter(|&n| n <= u32::MAX as usize)
            .ok_or(InitError::Overflow { size })?;
        let len = page_count * page_size;

        let huge = match self.huge_pages {
            HugePagePolicy::Off => None,
            HugePagePolicy::Prefer | HugePagePolicy::Require => {
                if sys::hugepage_supported(page_size) {
                    Some(page_size)
                } else if self.huge_pages == HugePagePolicy::Require {
                    return Err(InitError::HugePagesUnsupported { size: page_size });
                } else {
                    warn!(
                        "huge pages of {} bytes unavailable; using normal pages",
                        page_size
                    );
                    None
                }
            }
        };

        let base = match unsafe { sys::map(len, self.commit, huge) } {
            Ok(base) => base,
            Err(errno) if huge.is_some() && self.huge_pages == HugePagePolicy::Prefer => {
                warn!(
                    "mapping {} bytes of huge pages failed ({}); using normal pages",
                    len, errno
                );
                unsafe { sys::map(len, self.commit, None) }
                    .map_err(|errno| InitError::Map { size: len, errno })?
            }
            Err(errno) => return Err(InitError::Map { size: len, errno }),
        };

        debug!(
            "reserved {} pages of {} bytes at {:?}",
            page_count, page_size, base
        );
        Ok(PageProvider {
            base,
            page_size,
            pages: RefCell::new(vec![PageDesc::default(); page_count]),
        })
    }
}

fn default_page_size() -> usize {
    sys::pagesize().max(MIN_PAGE_SIZE)
}

#[derive(Copy, Clone, Default, Debug)]
struct PageDesc {
    // length of the run; only set on the first page of a run
    count: u32,
    allocated: bool,
}

/// A region of OS memory divided into pages.
///
/// Runs of contiguous pages are handed out first-fit by `request_segment` and handed back by
/// `release_segment`. Dropping the provider unmaps the whole region, so every segment carved from
/// it must be gone by then; segments keep the provider alive by holding an `Rc` to it.
#[derive(Debug)]
pub struct PageProvider {
    base: NonNull<u8>,
    page_size: usize,
    pages: RefCell<Vec<PageDesc>>,
}

impl PageProvider {
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.pages.borrow().len()
    }

    /// The number of pages not currently part of any reserved run.
    pub fn free_pages(&self) -> usize {
        self.pages.borrow().iter().filter(|p| !p.allocated).count()
    }

    /// The number of pages needed to hold `size` bytes, and at least one.
    pub fn pages_for(&self, size: usize) -> usize {
        let pages = size / self.page_size + (size % self.page_size != 0) as usize;
        pages.max(1)
    }

    /// Whether `ptr` falls inside the reserved region.
    pub fn contains(&self, ptr: *const u8) -> bool {
        let base = self.base.as_ptr() as usize;
        let addr = ptr as usize;
        addr >= base && addr - base < self.len()
    }

    /// Reserves a run of pages large enough to hold `size` bytes.
    ///
    /// The run is found with a first-fit scan of the page table. Returns `Exhausted` if no run of
    /// free pages is long enough.
    pub fn request_segment(&self, size: usize) -> Result<NonNull<u8>, Exhausted> {
        let needed = self.pages_for(size);
        let mut pages = self.pages.borrow_mut();

        let mut i = 0;
        let mut start = 0;
        let mut found = 0;
        while i < pages.len() {
            if pages[i].allocated {
                // Only run heads are ever visited, so this skips the whole run.
                i += (pages[i].count as usize).max(1);
                found = 0;
                continue;
            }
            if found == 0 {
                start = i;
            }
            found += 1;
            i += 1;
            if found == needed {
                pages[start].count = needed as u32;
                for page in &mut pages[start..start + needed] {
                    page.allocated = true;
                }
                let ptr = unsafe { self.base.as_ptr().add(start * self.page_size) };
                trace!("request_segment({}) -> {} pages at {:?}", size, needed, ptr);
                return Ok(unsafe { NonNull::new_unchecked(ptr) });
            }
        }

        trace!("request_segment({}) -> exhausted", size);
        Err(Exhausted)
    }

    /// Releases a run previously returned by `request_segment`.
    ///
    /// Releasing a run twice is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` does not point to the start of a run in this provider.
    pub fn release_segment(&self, ptr: NonNull<u8>) {
        assert!(
            self.contains(ptr.as_ptr()),
            "{:?} is not part of this page provider",
            ptr
        );
        let offset = ptr.as_ptr() as usize - self.base.as_ptr() as usize;
        assert_eq!(
            offset % self.page_size,
            0,
            "{:?} is not page-aligned",
            ptr
        );
        let index = offset / self.page_size;

        let mut pages = self.pages.borrow_mut();
        if !pages[index].allocated {
            trace!("release_segment({:?}): already free", ptr);
            return;
        }
        let count = pages[index].count as usize;
        assert!(count > 0, "{:?} is not the start of a segment", ptr);
        for page in &mut pages[index..index + count] {
            *page = PageDesc::default();
        }
        trace!("release_segment({:?}) -> {} pages", ptr, count);
    }

    /// Returns the whole region to the OS.
    ///
    /// This is what dropping the provider does; `terminate` only makes the teardown explicit.
    pub fn terminate(self) {
        drop(self);
    }

    fn len(&self) -> usize {
        self.pages.borrow().len() * self.page_size
    }
}

impl Drop for PageProvider {
    fn drop(&mut self) {
        let len = self.len();
        let in_use = self.page_count() - self.free_pages();
        if in_use > 0 {
            debug!("terminating page provider with {} pages still reserved", in_use);
        }
        unsafe { sys::unmap(self.base, len) };
        debug!("released {} bytes at {:?}", len, self.base);
    }
}
