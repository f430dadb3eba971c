// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use super::*;
use sys::pagesize;

// A provider with small pages so tests don't reserve more than they need.
fn small_provider(pages: usize) -> PageProvider {
    let _ = env_logger::try_init();
    PageProviderBuilder::default()
        .page_size(pagesize())
        .build(pages * pagesize())
        .unwrap()
}

// Test that the given range is writable.
unsafe fn test_write(ptr: *mut u8, size: usize) {
    for i in 0..size {
        *ptr.add(i) = (i & 0xff) as u8;
    }
}

// Test that the given range is readable, and matches data written by test_write
unsafe fn test_read(ptr: *mut u8, size: usize) {
    for i in 0..size {
        let got = *ptr.add(i);
        let want = (i & 0xff) as u8;
        assert_eq!(
            got, want,
            "mismatch at byte {} in block {:?}: got {}, want {}",
            i, ptr, got, want
        );
    }
}

#[test]
fn test_default_page_size() {
    let size = PageProviderBuilder::default().page_size;
    assert!(size >= MIN_PAGE_SIZE);
    assert_eq!(size % pagesize(), 0);
    assert!(size.is_power_of_two());
}

#[test]
fn test_default_huge_page_policy() {
    let builder = PageProviderBuilder::default();
    assert_eq!(builder.huge_pages, HugePagePolicy::Off);
    assert!(!builder.commit);
    let builder = builder.huge_pages(HugePagePolicy::Prefer);
    assert_eq!(builder.huge_pages, HugePagePolicy::Prefer);
}

#[test]
fn test_build_rounds_up_to_pages() {
    let provider = PageProviderBuilder::default()
        .page_size(pagesize())
        .build(3 * pagesize() + 1)
        .unwrap();
    assert_eq!(provider.page_count(), 4);
    assert_eq!(provider.free_pages(), 4);
}

#[test]
fn test_build_zero_size() {
    match PageProviderBuilder::default().build(0) {
        Err(InitError::ZeroSize) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
#[should_panic]
fn test_build_bad_page_size() {
    let _ = PageProviderBuilder::default()
        .page_size(pagesize() + 1)
        .build(1 << 20);
}

#[test]
fn test_require_huge_pages() {
    let size = MIN_PAGE_SIZE;
    let result = PageProviderBuilder::default()
        .huge_pages(HugePagePolicy::Require)
        .page_size(size)
        .build(size);
    if !sys::hugepage_supported(size) {
        match result {
            Err(InitError::HugePagesUnsupported { size: s }) => assert_eq!(s, size),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}

#[test]
fn test_prefer_huge_pages_always_builds() {
    let size = MIN_PAGE_SIZE;
    let provider = PageProviderBuilder::default()
        .huge_pages(HugePagePolicy::Prefer)
        .page_size(size)
        .build(size)
        .unwrap();
    let seg = provider.request_segment(size).unwrap();
    unsafe {
        test_write(seg.as_ptr(), size);
        test_read(seg.as_ptr(), size);
    }
}

#[test]
fn test_request_release() {
    let provider = small_provider(8);
    let ps = provider.page_size();

    let a = provider.request_segment(ps).unwrap();
    let b = provider.request_segment(3 * ps).unwrap();
    assert_eq!(b.as_ptr() as usize, a.as_ptr() as usize + ps);
    assert_eq!(provider.free_pages(), 4);

    unsafe {
        test_write(b.as_ptr(), 3 * ps);
        test_read(b.as_ptr(), 3 * ps);
    }

    provider.release_segment(a);
    assert_eq!(provider.free_pages(), 5);
    let c = provider.request_segment(1).unwrap();
    assert_eq!(c, a);

    assert_eq!(provider.request_segment(8 * ps), Err(Exhausted));
    assert_eq!(provider.free_pages(), 4);
}

#[test]
fn test_partial_page_takes_whole_page() {
    let provider = small_provider(4);
    let ps = provider.page_size();
    let _a = provider.request_segment(ps + 1).unwrap();
    assert_eq!(provider.free_pages(), 2);
    let _b = provider.request_segment(0).unwrap();
    assert_eq!(provider.free_pages(), 1);
}

#[test]
fn test_first_fit_skips_short_holes() {
    let provider = small_provider(8);
    let ps = provider.page_size();

    let a = provider.request_segment(2 * ps).unwrap();
    let b = provider.request_segment(ps).unwrap();
    let c = provider.request_segment(2 * ps).unwrap();
    provider.release_segment(b);

    // The one-page hole left by b is too small.
    let d = provider.request_segment(2 * ps).unwrap();
    assert_eq!(d.as_ptr() as usize, c.as_ptr() as usize + 2 * ps);

    // But a single page fits in it.
    let e = provider.request_segment(ps).unwrap();
    assert_eq!(e, b);

    provider.release_segment(a);
    provider.release_segment(c);
    let f = provider.request_segment(2 * ps).unwrap();
    assert_eq!(f, a);
}

#[test]
fn test_release_twice_is_noop() {
    let provider = small_provider(2);
    let a = provider.request_segment(1).unwrap();
    provider.release_segment(a);
    provider.release_segment(a);
    assert_eq!(provider.free_pages(), 2);
}

#[test]
#[should_panic]
fn test_release_foreign_pointer() {
    let provider = small_provider(2);
    let mut x = 0u8;
    provider.release_segment(NonNull::from(&mut x));
}

#[test]
#[should_panic]
fn test_release_middle_of_run() {
    let provider = small_provider(4);
    let a = provider.request_segment(3 * provider.page_size()).unwrap();
    let mid = unsafe { NonNull::new_unchecked(a.as_ptr().add(provider.page_size())) };
    provider.release_segment(mid);
}

#[test]
fn test_contains() {
    let provider = small_provider(2);
    let a = provider.request_segment(1).unwrap();
    assert!(provider.contains(a.as_ptr()));
    let end = unsafe { a.as_ptr().add(2 * provider.page_size()) };
    assert!(!provider.contains(end));
    provider.terminate();
}
