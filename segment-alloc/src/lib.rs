// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Segment allocators and the node allocators built on them.
//!
//! # Design
//!
//! A *segment* is a run of pages reserved from a `page_alloc::PageProvider` and managed privately
//! by one allocator:
//!
//! * `StaticSegment` is a bump allocator. Individual allocations are never freed.
//! * `DynamicSegment` is a first-fit free-list allocator with splitting, coalescing and in-place
//!   `realloc`. Its bookkeeping lives in a side table of chunk descriptors rather than in headers
//!   next to the data, and the handle for an allocation is the address of its descriptor.
//!
//! On top of the segments sit three `NodeAlloc` policies, which containers use to allocate their
//! nodes:
//!
//! * `SimpleNodeAlloc` makes one dynamic segment allocation per node.
//! * `PoolNodeAlloc` carves nodes out of one fixed-size dynamic segment allocation and recycles
//!   them through a free list threaded through the freed nodes.
//! * `FastNodeAlloc` bumps a static segment and never frees.
//!
//! Segments are shared between allocators as `Rc<RefCell<_>>`; none of the types in this crate
//! are thread-safe.

#[macro_use]
extern crate log;

pub mod align;
mod dynamic;
mod fast;
mod linear;
mod pool;
mod ptr;
mod simple;
mod static_segment;

pub use crate::dynamic::{
    ChunkInfo, ChunkStatus, Chunks, DynHandle, DynamicSegment, DynamicSegmentBuilder, SegmentDump,
    SharedDynamicSegment, MIN_PACKETS, PACKET_SIZE,
};
pub use crate::fast::FastNodeAlloc;
pub use crate::linear::LinearAlloc;
pub use crate::pool::PoolNodeAlloc;
pub use crate::ptr::{DynamicParser, OffsetPointer, Pointer, PoolHandle, PoolParser, RawParser};
pub use crate::simple::SimpleNodeAlloc;
pub use crate::static_segment::{SharedStaticSegment, StaticSegment};
