// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A variable-size allocator with out-of-band chunk descriptors.
//!
//! # Design
//!
//! A `DynamicSegment` owns one run of pages. The start of the run holds two tables, and the rest
//! is the data region:
//!
//! ```text
//! +-----------------------+---------------------+--------------------------------+
//! | ChunkDesc[max_chunks] | u32[max_chunks]     | data region (16-byte packets)  |
//! | descriptor table      | recycled-slot stack |                                |
//! +-----------------------+---------------------+--------------------------------+
//! ```
//!
//! The data region is always partitioned into *chunks*, each a whole number of packets, each
//! described by one descriptor. Descriptors form two intrusive doubly-linked lists threaded
//! through the table by index: the address-ordered list of all chunks, and the free list. A
//! descriptor slot freed by coalescing goes on the recycled stack and is reused by the next
//! split.
//!
//! No chunk is ever smaller than `min_packets`, which bounds the number of chunks (and thus the
//! size of the descriptor table) at `size / (PACKET_SIZE * min_packets)`.
//!
//! The first four bytes of every chunk hold the chunk's own descriptor index. The data pointer
//! comes after that, aligned forward with the adjustment recorded in the byte before it, so a
//! raw data pointer can always be mapped back to its descriptor.
//!
//! # Handles
//!
//! The handle for an allocation is the address of its descriptor. Descriptors never move, so a
//! handle stays valid across splits and merges of neighboring chunks, and `pointer_of` can
//! resolve it without access to the segment.

use std::cell::RefCell;
use std::fmt::{self, Display, Formatter};
use std::mem;
use std::ptr::{self, NonNull};
use std::rc::Rc;

use object_alloc::Exhausted;
use page_alloc::PageProvider;

use crate::align::{align_and_record, align_up, check_align, unalign};

/// The allocation quantum, in bytes.
pub const PACKET_SIZE: usize = 16;
/// The default minimum chunk size, in packets.
pub const MIN_PACKETS: u32 = 64;

const NONE: u32 = u32::MAX;
const INDEX_SIZE: usize = mem::size_of::<u32>();

/// A handle to an allocation in a `DynamicSegment`. Zero is the null handle.
pub type DynHandle = usize;

pub type SharedDynamicSegment = Rc<RefCell<DynamicSegment>>;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ChunkStatus {
    Allocated,
    Free,
    /// The descriptor slot is on the recycled stack and describes no chunk.
    Recycled,
}

#[repr(C)]
#[derive(Debug)]
struct ChunkDesc {
    base: *mut u8,
    // the aligned pointer handed out; meaningless unless allocated
    data: *mut u8,
    packets: u32,
    prev_free: u32,
    next_free: u32,
    prev: u32,
    next: u32,
    status: ChunkStatus,
}

/// How a deallocated chunk merges with its neighbors.
enum Coalesce {
    Both,
    Prev,
    Next,
    Neither,
}

impl Coalesce {
    fn classify(prev_free: bool, next_free: bool) -> Coalesce {
        match (prev_free, next_free) {
            (true, true) => Coalesce::Both,
            (true, false) => Coalesce::Prev,
            (false, true) => Coalesce::Next,
            (false, false) => Coalesce::Neither,
        }
    }
}

/// A builder for `DynamicSegment`.
///
/// The defaults are one page and `MIN_PACKETS` packets per chunk.
#[derive(Clone, Debug)]
pub struct DynamicSegmentBuilder {
    pages: usize,
    min_packets: u32,
}

impl Default for DynamicSegmentBuilder {
    fn default() -> DynamicSegmentBuilder {
        DynamicSegmentBuilder {
            pages: 1,
            min_packets: MIN_PACKETS,
        }
    }
}

impl DynamicSegmentBuilder {
    pub fn pages(mut self, pages: usize) -> DynamicSegmentBuilder {
        self.pages = pages.max(1);
        self
    }

    /// Sets the smallest chunk, in packets.
    ///
    /// Smaller values waste less memory per allocation but need a larger descriptor table.
    pub fn min_packets(mut self, min_packets: u32) -> DynamicSegmentBuilder {
        assert!(min_packets > 0, "min_packets must be at least 1");
        self.min_packets = min_packets;
        self
    }

    pub fn build(&self, provider: &Rc<PageProvider>) -> Result<DynamicSegment, Exhausted> {
        let raw_size = self
            .pages
            .checked_mul(provider.page_size())
            .ok_or(Exhausted)?;
        let raw = provider.request_segment(raw_size)?;
        match unsafe { DynamicSegment::init(provider.clone(), raw, raw_size, self.min_packets) } {
            Some(seg) => Ok(seg),
            None => {
                provider.release_segment(raw);
                Err(Exhausted)
            }
        }
    }

    pub fn build_shared(&self, provider: &Rc<PageProvider>) -> Result<SharedDynamicSegment, Exhausted> {
        self.build(provider).map(|seg| Rc::new(RefCell::new(seg)))
    }
}

/// A first-fit free-list allocator with splitting and coalescing.
///
/// See the module documentation for the layout.
pub struct DynamicSegment {
    provider: Rc<PageProvider>,
    raw: NonNull<u8>,
    table: *mut ChunkDesc,
    recycled: *mut u32,
    recycled_len: usize,
    max_chunks: usize,
    // descriptor slots ever handed out; slots at or above this are untouched
    high_water: usize,
    data: *mut u8,
    total_packets: u32,
    min_packets: u32,
    head: u32,
    free_head: u32,
}

impl DynamicSegment {
    /// Lays out the tables at the head of `raw` and makes the rest a single free chunk.
    ///
    /// Returns `None` if the region is too small to hold a single chunk.
    unsafe fn init(
        provider: Rc<PageProvider>,
        raw: NonNull<u8>,
        raw_size: usize,
        min_packets: u32,
    ) -> Option<DynamicSegment> {
        // Every chunk spans at least `min_packets` packets and costs one descriptor plus one
        // recycled-stack entry, so this many slots cover any tiling of the space left over.
        let per_chunk = PACKET_SIZE * min_packets as usize + mem::size_of::<ChunkDesc>() + INDEX_SIZE;
        let max_chunks = raw_size / per_chunk + 1;
        let table_addr = raw.as_ptr() as usize;
        let recycled_addr = table_addr + max_chunks * mem::size_of::<ChunkDesc>();
        let data_addr = align_up(recycled_addr + max_chunks * INDEX_SIZE, PACKET_SIZE);
        let end = table_addr + raw_size;
        if data_addr >= end {
            return None;
        }
        let packets = (end - data_addr) / PACKET_SIZE;
        if packets < min_packets as usize || packets > NONE as usize {
            return None;
        }

        let mut seg = DynamicSegment {
            provider,
            raw,
            table: table_addr as *mut ChunkDesc,
            recycled: recycled_addr as *mut u32,
            recycled_len: 0,
            max_chunks,
            high_water: 0,
            data: data_addr as *mut u8,
            total_packets: packets as u32,
            min_packets,
            head: NONE,
            free_head: NONE,
        };
        seg.reset();
        debug!(
            "dynamic segment: {} packets, {} descriptor slots, data at {:?}",
            packets, max_chunks, seg.data
        );
        Some(seg)
    }

    pub fn into_shared(self) -> SharedDynamicSegment {
        Rc::new(RefCell::new(self))
    }

    /// Discards every allocation and makes the whole data region one free chunk again.
    ///
    /// Every outstanding handle becomes invalid.
    pub fn reset(&mut self) {
        self.recycled_len = 0;
        self.high_water = 1;
        self.head = 0;
        self.free_head = 0;
        unsafe {
            ptr::write(
                self.table,
                ChunkDesc {
                    base: self.data,
                    data: ptr::null_mut(),
                    packets: self.total_packets,
                    prev_free: NONE,
                    next_free: NONE,
                    prev: NONE,
                    next: NONE,
                    status: ChunkStatus::Free,
                },
            );
            self.stamp(0);
        }
        trace!("dynamic reset: {} packets free", self.total_packets);
    }

    /// Resolves a handle to the data pointer of its allocation.
    ///
    /// # Safety
    ///
    /// `handle` must be a live, non-null handle from some `DynamicSegment`.
    #[inline]
    pub unsafe fn pointer_of(handle: DynHandle) -> *mut u8 {
        (*(handle as *const ChunkDesc)).data
    }

    /// The number of bytes usable at `pointer_of(handle)`.
    ///
    /// # Safety
    ///
    /// As for `pointer_of`.
    pub unsafe fn usable_size(handle: DynHandle) -> usize {
        let desc = &*(handle as *const ChunkDesc);
        desc.base as usize + desc.packets as usize * PACKET_SIZE - desc.data as usize
    }

    /// Allocates `size` bytes aligned to `align`.
    ///
    /// The free list is scanned first-fit. A chunk whose leftover would be smaller than
    /// `min_packets` is handed out whole; otherwise its front is split off. Fails without
    /// changing anything if no free chunk is large enough.
    ///
    /// # Panics
    ///
    /// Panics if `align` is not a power of two or exceeds `MAX_ALIGN`.
    pub fn alloc(&mut self, size: usize, align: usize) -> Result<DynHandle, Exhausted> {
        check_align(align);
        let packets = self.packets_for(size, align).ok_or(Exhausted)?;

        let mut cur = self.free_head;
        unsafe {
            while cur != NONE {
                let desc = self.desc(cur);
                if (*desc).packets >= packets {
                    let index = if (*desc).packets - packets < self.min_packets {
                        self.take_whole(cur)
                    } else {
                        match self.acquire_slot() {
                            Some(slot) => self.split_front(cur, slot, packets),
                            None => self.take_whole(cur),
                        }
                    };
                    let chunk = self.desc(index);
                    (*chunk).data = align_and_record((*chunk).base.add(INDEX_SIZE), align);
                    trace!(
                        "alloc({}, {}) -> chunk {} ({} packets) at {:?}",
                        size,
                        align,
                        index,
                        (*chunk).packets,
                        (*chunk).data
                    );
                    return Ok(chunk as DynHandle);
                }
                cur = (*desc).next_free;
            }
        }

        trace!("alloc({}, {}) -> exhausted", size, align);
        Err(Exhausted)
    }

    /// Frees an allocation, merging it with free neighbors.
    ///
    /// Freeing the null handle or an already-free chunk does nothing.
    pub fn dealloc(&mut self, handle: DynHandle) {
        if handle == 0 {
            return;
        }
        let index = self.index_of(handle);
        unsafe {
            let cur = self.desc(index);
            if (*cur).status != ChunkStatus::Allocated {
                trace!("dealloc(chunk {}): already free", index);
                return;
            }
            let prev = (*cur).prev;
            let next = (*cur).next;
            let prev_free = prev != NONE && (*self.desc(prev)).status == ChunkStatus::Free;
            let next_free = next != NONE && (*self.desc(next)).status == ChunkStatus::Free;

            match Coalesce::classify(prev_free, next_free) {
                Coalesce::Both => {
                    (*self.desc(prev)).packets += (*cur).packets + (*self.desc(next)).packets;
                    self.unlink(index);
                    self.unlink_free(next);
                    self.unlink(next);
                    self.recycle(index);
                    self.recycle(next);
                }
                Coalesce::Prev => {
                    (*self.desc(prev)).packets += (*cur).packets;
                    self.unlink(index);
                    self.recycle(index);
                }
                Coalesce::Next => {
                    (*cur).packets += (*self.desc(next)).packets;
                    self.unlink_free(next);
                    self.unlink(next);
                    self.recycle(next);
                    self.push_free(index);
                }
                Coalesce::Neither => self.push_free(index),
            }
            trace!(
                "dealloc(chunk {}): prev free: {}, next free: {}",
                index,
                prev_free,
                next_free
            );
        }
    }

    /// Frees an allocation given its data pointer.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` is not the data pointer of a live allocation in this segment.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned (through `pointer_of`) for an allocation in this segment.
    pub unsafe fn dealloc_ptr(&mut self, ptr: *mut u8) {
        let base = unalign(ptr).sub(INDEX_SIZE);
        let index = ptr::read(base as *const u32);
        assert!(
            (index as usize) < self.high_water && (*self.desc(index)).data == ptr,
            "{:?} is not a live allocation in this segment",
            ptr
        );
        let handle = self.desc(index) as DynHandle;
        self.dealloc(handle);
    }

    /// Resizes an allocation, in place when possible.
    ///
    /// - The null handle is allocated as if by `alloc`.
    /// - An unchanged packet count returns the same handle.
    /// - Growing absorbs all or part of a free successor in place.
    /// - Shrinking gives the tail back to a free successor, or splits it off as a new free chunk.
    ///
    /// Otherwise a new chunk is allocated, the old contents copied and the old chunk freed. On
    /// failure the old allocation is untouched.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is not allocated or `align` is invalid.
    pub fn realloc(
        &mut self,
        handle: DynHandle,
        new_size: usize,
        align: usize,
    ) -> Result<DynHandle, Exhausted> {
        if handle == 0 {
            return self.alloc(new_size, align);
        }
        check_align(align);
        let index = self.index_of(handle);
        let packets = self.packets_for(new_size, align).ok_or(Exhausted)?;

        unsafe {
            let cur = self.desc(index);
            assert_eq!(
                (*cur).status,
                ChunkStatus::Allocated,
                "realloc of a chunk that is not allocated"
            );
            // The data offset must not change when resizing in place.
            let offset = (*cur).data as usize - (*cur).base as usize;
            let in_place = (*cur).data as usize % align == 0
                && offset + new_size <= packets as usize * PACKET_SIZE;
            let next = (*cur).next;
            let next_free = next != NONE && (*self.desc(next)).status == ChunkStatus::Free;

            if in_place && packets == (*cur).packets {
                trace!("realloc(chunk {}, {}) -> unchanged", index, new_size);
                return Ok(handle);
            }

            if in_place && packets > (*cur).packets && next_free {
                let need = packets - (*cur).packets;
                let succ = self.desc(next);
                if (*succ).packets >= need {
                    if (*succ).packets - need < self.min_packets {
                        (*cur).packets += (*succ).packets;
                        self.unlink_free(next);
                        self.unlink(next);
                        self.recycle(next);
                    } else {
                        (*succ).base = (*succ).base.add(need as usize * PACKET_SIZE);
                        (*succ).packets -= need;
                        self.stamp(next);
                        (*cur).packets += need;
                    }
                    trace!(
                        "realloc(chunk {}, {}) -> grown in place to {} packets",
                        index,
                        new_size,
                        (*cur).packets
                    );
                    return Ok(handle);
                }
            }

            if in_place && packets < (*cur).packets {
                let spare = (*cur).packets - packets;
                if next_free {
                    let succ = self.desc(next);
                    (*succ).base = (*succ).base.sub(spare as usize * PACKET_SIZE);
                    (*succ).packets += spare;
                    self.stamp(next);
                    (*cur).packets = packets;
                } else if spare >= self.min_packets {
                    if let Some(slot) = self.acquire_slot() {
                        self.split_back(index, slot, packets);
                    }
                }
                trace!(
                    "realloc(chunk {}, {}) -> shrunk in place to {} packets",
                    index,
                    new_size,
                    (*cur).packets
                );
                return Ok(handle);
            }

            let old_data = (*cur).data;
            let old_usable = Self::usable_size(handle);
            let new_handle = self.alloc(new_size, align)?;
            ptr::copy_nonoverlapping(
                old_data,
                Self::pointer_of(new_handle),
                old_usable.min(new_size),
            );
            self.dealloc(handle);
            trace!(
                "realloc(chunk {}, {}) -> moved to {:?}",
                index,
                new_size,
                Self::pointer_of(new_handle)
            );
            Ok(new_handle)
        }
    }

    /// Allocates space for a `T` and moves `value` into it.
    pub fn new_object<T>(&mut self, value: T) -> Result<DynHandle, Exhausted> {
        let handle = self.alloc(mem::size_of::<T>(), mem::align_of::<T>())?;
        unsafe { ptr::write(Self::pointer_of(handle) as *mut T, value) };
        Ok(handle)
    }

    /// Drops the `T` in `handle` and frees it.
    ///
    /// # Safety
    ///
    /// `handle` must be a live allocation from this segment holding an initialized `T`.
    pub unsafe fn delete_object<T>(&mut self, handle: DynHandle) {
        ptr::drop_in_place(Self::pointer_of(handle) as *mut T);
        self.dealloc(handle);
    }

    /// Compacts the segment.
    ///
    /// Compaction is not implemented; the layout is left as it is.
    pub fn defragment(&mut self) {
        debug!("defragment: not supported, layout unchanged");
    }

    pub fn total_packets(&self) -> u32 {
        self.total_packets
    }

    pub fn min_packets(&self) -> u32 {
        self.min_packets
    }

    /// The sum of the sizes of all free chunks, in packets.
    pub fn free_packets(&self) -> u32 {
        let mut total = 0;
        let mut cur = self.free_head;
        while cur != NONE {
            unsafe {
                total += (*self.desc(cur)).packets;
                cur = (*self.desc(cur)).next_free;
            }
        }
        total
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks().count()
    }

    /// Iterates over all chunks in address order.
    pub fn chunks(&self) -> Chunks<'_> {
        Chunks {
            seg: self,
            next: self.head,
        }
    }

    /// Returns a printable listing of every descriptor and the recycled-slot stack.
    pub fn dump(&self) -> SegmentDump<'_> {
        SegmentDump { seg: self }
    }

    /// The number of bytes a `size`-byte allocation aligned to `align` occupies, in packets.
    fn packets_for(&self, size: usize, align: usize) -> Option<u32> {
        let bytes = size.checked_add(align + INDEX_SIZE)?;
        let packets = bytes / PACKET_SIZE + (bytes % PACKET_SIZE != 0) as usize;
        let packets = packets.max(self.min_packets as usize);
        if packets > self.total_packets as usize {
            None
        } else {
            Some(packets as u32)
        }
    }

    #[inline]
    fn desc(&self, index: u32) -> *mut ChunkDesc {
        debug_assert!((index as usize) < self.high_water);
        unsafe { self.table.add(index as usize) }
    }

    fn index_of(&self, handle: DynHandle) -> u32 {
        let offset = handle.wrapping_sub(self.table as usize);
        let index = offset / mem::size_of::<ChunkDesc>();
        assert!(
            offset % mem::size_of::<ChunkDesc>() == 0 && index < self.high_water,
            "handle {:#x} does not belong to this segment",
            handle
        );
        index as u32
    }

    // Writes a chunk's index into its first bytes.
    unsafe fn stamp(&self, index: u32) {
        ptr::write((*self.desc(index)).base as *mut u32, index);
    }

    fn acquire_slot(&mut self) -> Option<u32> {
        if self.recycled_len > 0 {
            self.recycled_len -= 1;
            Some(unsafe { *self.recycled.add(self.recycled_len) })
        } else if self.high_water < self.max_chunks {
            self.high_water += 1;
            Some((self.high_water - 1) as u32)
        } else {
            None
        }
    }

    unsafe fn recycle(&mut self, index: u32) {
        (*self.desc(index)).status = ChunkStatus::Recycled;
        *self.recycled.add(self.recycled_len) = index;
        self.recycled_len += 1;
    }

    // Hands out a free chunk whole. Returns its index.
    unsafe fn take_whole(&mut self, index: u32) -> u32 {
        self.unlink_free(index);
        (*self.desc(index)).status = ChunkStatus::Allocated;
        index
    }

    // Carves `packets` off the front of free chunk `index` into descriptor `slot`, which becomes
    // allocated. The remainder stays where it is in the free list.
    unsafe fn split_front(&mut self, index: u32, slot: u32, packets: u32) -> u32 {
        let free = self.desc(index);
        let prev = (*free).prev;
        ptr::write(
            self.desc(slot),
            ChunkDesc {
                base: (*free).base,
                data: ptr::null_mut(),
                packets,
                prev_free: NONE,
                next_free: NONE,
                prev,
                next: index,
                status: ChunkStatus::Allocated,
            },
        );
        if prev != NONE {
            (*self.desc(prev)).next = slot;
        } else {
            self.head = slot;
        }
        (*free).prev = slot;
        (*free).base = (*free).base.add(packets as usize * PACKET_SIZE);
        (*free).packets -= packets;
        self.stamp(slot);
        self.stamp(index);
        slot
    }

    // Cuts allocated chunk `index` down to `packets` and makes the tail a new free chunk in
    // descriptor `slot`.
    unsafe fn split_back(&mut self, index: u32, slot: u32, packets: u32) {
        let cur = self.desc(index);
        let next = (*cur).next;
        ptr::write(
            self.desc(slot),
            ChunkDesc {
                base: (*cur).base.add(packets as usize * PACKET_SIZE),
                data: ptr::null_mut(),
                packets: (*cur).packets - packets,
                prev_free: NONE,
                next_free: NONE,
                prev: index,
                next,
                status: ChunkStatus::Free,
            },
        );
        if next != NONE {
            (*self.desc(next)).prev = slot;
        }
        (*cur).next = slot;
        (*cur).packets = packets;
        self.stamp(slot);
        self.push_free(slot);
    }

    // Removes a chunk from the address-ordered list.
    unsafe fn unlink(&mut self, index: u32) {
        let desc = self.desc(index);
        let (prev, next) = ((*desc).prev, (*desc).next);
        if next != NONE {
            (*self.desc(next)).prev = prev;
        }
        if prev != NONE {
            (*self.desc(prev)).next = next;
        } else {
            self.head = next;
        }
        (*desc).prev = NONE;
        (*desc).next = NONE;
    }

    unsafe fn unlink_free(&mut self, index: u32) {
        let desc = self.desc(index);
        let (prev, next) = ((*desc).prev_free, (*desc).next_free);
        if next != NONE {
            (*self.desc(next)).prev_free = prev;
        }
        if prev != NONE {
            (*self.desc(prev)).next_free = next;
        } else {
            self.free_head = next;
        }
        (*desc).prev_free = NONE;
        (*desc).next_free = NONE;
    }

    unsafe fn push_free(&mut self, index: u32) {
        let desc = self.desc(index);
        (*desc).status = ChunkStatus::Free;
        (*desc).prev_free = NONE;
        (*desc).next_free = self.free_head;
        if self.free_head != NONE {
            (*self.desc(self.free_head)).prev_free = index;
        }
        self.free_head = index;
    }
}

impl Drop for DynamicSegment {
    fn drop(&mut self) {
        debug!("dynamic segment: releasing {:?}", self.raw);
        self.provider.release_segment(self.raw);
    }
}

/// A snapshot of one chunk, as yielded by `DynamicSegment::chunks`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ChunkInfo {
    pub index: u32,
    /// Start of the chunk's packets.
    pub base: *mut u8,
    /// The data pointer, for allocated chunks.
    pub data: Option<*mut u8>,
    pub packets: u32,
    pub status: ChunkStatus,
}

pub struct Chunks<'a> {
    seg: &'a DynamicSegment,
    next: u32,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = ChunkInfo;

    fn next(&mut self) -> Option<ChunkInfo> {
        if self.next == NONE {
            return None;
        }
        let index = self.next;
        let desc = unsafe { &*self.seg.desc(index) };
        self.next = desc.next;
        Some(ChunkInfo {
            index,
            base: desc.base,
            data: if desc.status == ChunkStatus::Allocated {
                Some(desc.data)
            } else {
                None
            },
            packets: desc.packets,
            status: desc.status,
        })
    }
}

/// A human-readable listing of a segment's descriptors. See `DynamicSegment::dump`.
pub struct SegmentDump<'a> {
    seg: &'a DynamicSegment,
}

fn link(index: u32) -> i64 {
    if index == NONE {
        -1
    } else {
        index as i64
    }
}

impl<'a> Display for SegmentDump<'a> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        writeln!(f, "All Allocations")?;
        writeln!(f, "---------------")?;
        let mut index = self.seg.head;
        while index != NONE {
            let desc = unsafe { &*self.seg.desc(index) };
            let ptr = if desc.status == ChunkStatus::Allocated {
                desc.data
            } else {
                desc.base
            };
            writeln!(f, "Index:      {}", index)?;
            writeln!(f, "Pointer:    {:?}", ptr)?;
            writeln!(f, "Packets:    {}", desc.packets)?;
            writeln!(f, "Links:      Prev({}), Next({})", link(desc.prev), link(desc.next))?;
            writeln!(
                f,
                "Free Links: Prev({}), Next({})",
                link(desc.prev_free),
                link(desc.next_free)
            )?;
            let status = match desc.status {
                ChunkStatus::Allocated => "ALLOCATED",
                _ => "FREE",
            };
            writeln!(f, "Status:     {}", status)?;
            writeln!(f, "---------------------------------------")?;
            index = desc.next;
        }

        writeln!(f)?;
        writeln!(f, "Recycled Pointers")?;
        writeln!(f, "-----------------")?;
        for i in 0..self.seg.recycled_len {
            write!(f, "{}, ", unsafe { *self.seg.recycled.add(i) })?;
        }
        writeln!(f)
    }
}
