mod admission;
mod core;
mod issue;
mod schedule;
mod staging;


use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::dram::{
    AddressMapper, ChannelConfig, ChannelState, CommandQueue, Cycle, RefreshTimer, RowBufPolicy,
    Transaction,
};
use crate::stats::Statistics;

/// Capacity of the shared write buffer behind a distributed front-end.
pub(crate) const SHARED_WRITE_BUFFER_DEPTH: usize = 32;

/// FIFO with a fixed admission capacity.
#[derive(Debug, Clone)]
pub struct BoundedQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn has_room(&self) -> bool {
        self.items.len() < self.capacity
    }

    pub fn try_push(&mut self, item: T) -> bool {
        if !self.has_room() {
            return false;
        }
        self.items.push_back(item);
        true
    }

    pub fn pop_front(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx)
    }

    pub fn remove(&mut self, idx: usize) -> Option<T> {
        self.items.remove(idx)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One cycle-accurate memory channel controller.
///
/// Admits transactions, schedules them into DRAM commands against the
/// channel state, pushes accepted commands through the per-bank command
/// queue, and surfaces completed transactions through the return queue.
/// `clock_tick` is the sole mutator; the host calls it exactly once per DRAM
/// cycle.
pub struct ChannelController<S: ChannelState, Q: CommandQueue> {
    pub(crate) channel_id: usize,
    pub(crate) clk: Cycle,
    pub(crate) config: Arc<ChannelConfig>,
    pub(crate) mapper: AddressMapper,
    pub(crate) stats: Statistics,
    pub(crate) channel: S,
    pub(crate) cmd_queue: Q,
    pub(crate) refresh: RefreshTimer,

    pub(crate) unified_mode: bool,
    pub(crate) dist_mode: bool,
    pub(crate) row_buf_policy: RowBufPolicy,

    // centralized admission queues; in distributed mode `unified_queue` and
    // `write_buffer` double as the one-slot / 32-deep shared stage
    pub(crate) unified_queue: BoundedQueue<Transaction>,
    pub(crate) read_queue: BoundedQueue<Transaction>,
    pub(crate) write_buffer: BoundedQueue<Transaction>,

    // distributed front-end: per-requester input queues plus the per-bank
    // one-slot read stage
    pub(crate) dist_unified: Vec<BoundedQueue<Transaction>>,
    pub(crate) dist_read: Vec<BoundedQueue<Transaction>>,
    pub(crate) dist_write: Vec<BoundedQueue<Transaction>>,
    pub(crate) bank_read_slots: Vec<Option<Transaction>>,

    pub(crate) pending_reads: HashMap<u64, Vec<Transaction>>,
    pub(crate) pending_writes: HashMap<u64, Transaction>,
    pub(crate) return_queue: VecDeque<Transaction>,

    pub(crate) last_unified_req: usize,
    pub(crate) last_read_req: usize,
    pub(crate) last_write_req: usize,
    pub(crate) last_trans_clk: Cycle,
    pub(crate) write_draining: usize,
    pub(crate) rank_idle_cycles: Vec<Cycle>,
}
