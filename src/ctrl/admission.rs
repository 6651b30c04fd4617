use crate::dram::{ChannelState, CommandQueue, Transaction};

use super::ChannelController;

impl<S: ChannelState, Q: CommandQueue> ChannelController<S, Q> {
    /// Centralized admission surface: room in the queue the transaction
    /// would land in.
    pub fn will_accept(&self, _addr: u64, is_write: bool) -> bool {
        if self.unified_mode {
            self.unified_queue.has_room()
        } else if is_write {
            self.write_buffer.has_room()
        } else {
            self.read_queue.has_room()
        }
    }

    /// Distributed admission surface: room in that requester's per-class
    /// input queue.
    pub fn will_accept_from(&self, _addr: u64, requester: usize, is_write: bool) -> bool {
        debug_assert!(self.dist_mode);
        if self.unified_mode {
            self.dist_unified[requester].has_room()
        } else if is_write {
            self.dist_write[requester].has_room()
        } else {
            self.dist_read[requester].has_room()
        }
    }

    /// Admit one transaction. The return value is reserved: admission always
    /// succeeds once `will_accept` said yes, including writes coalesced into
    /// an in-flight write to the same address.
    pub fn add_transaction(&mut self, mut trans: Transaction) -> bool {
        trans.added_cycle = self.clk;
        self.stats.observe(
            self.stats.interarrival_latency,
            self.clk - self.last_trans_clk,
        );
        let stall = self.clk.saturating_sub(trans.start_cycle);
        self.stats.observe(self.stats.stall_latency, stall);
        if trans.is_write {
            self.stats.observe(self.stats.write_stall_latency, stall);
        } else {
            self.stats.observe(self.stats.read_stall_latency, stall);
        }
        self.last_trans_clk = self.clk;

        if self.dist_mode {
            // queues only; pending-map and return-queue effects happen at
            // the staging step
            let queue = if self.unified_mode {
                &mut self.dist_unified[trans.requester]
            } else if trans.is_write {
                &mut self.dist_write[trans.requester]
            } else {
                &mut self.dist_read[trans.requester]
            };
            let admitted = queue.try_push(trans);
            debug_assert!(admitted, "admission past will_accept_from");
            return true;
        }

        if trans.is_write {
            self.admit_write(trans);
        } else {
            self.admit_read(trans);
        }
        true
    }

    /// Write admission: at most one in-flight write per address; the host
    /// sees completion next cycle either way.
    pub(super) fn admit_write(&mut self, mut trans: Transaction) {
        if self.pending_writes.contains_key(&trans.addr) {
            self.stats.inc(self.stats.num_dropped_coalesced_writes);
        } else {
            self.pending_writes.insert(trans.addr, trans);
            let admitted = if self.unified_mode {
                self.unified_queue.try_push(trans)
            } else {
                self.write_buffer.try_push(trans)
            };
            debug_assert!(admitted, "write admission past will_accept");
        }
        trans.complete_cycle = self.clk + 1;
        self.return_queue.push_back(trans);
    }

    /// Read admission: serve from a pending write when possible, otherwise
    /// coalesce with outstanding reads to the same address. The first read
    /// for an address backs the command, landing in the unified queue, the
    /// read queue, or its per-bank stage slot depending on the front-end.
    pub(super) fn admit_read(&mut self, mut trans: Transaction) {
        if self.pending_writes.contains_key(&trans.addr) {
            self.stats.inc(self.stats.num_write_buf_hits);
            trans.complete_cycle = self.clk + 1;
            self.return_queue.push_back(trans);
            return;
        }
        // a read landing between schedule and issue rides the command
        // already sitting in the command queue
        if let Some(first) = self
            .pending_reads
            .get(&trans.addr)
            .and_then(|reqs| reqs.first())
        {
            trans.schedule_cycle = first.schedule_cycle;
        }
        let entry = self.pending_reads.entry(trans.addr).or_default();
        entry.push(trans);
        if entry.len() > 1 {
            return;
        }
        if self.unified_mode {
            let admitted = self.unified_queue.try_push(trans);
            debug_assert!(admitted, "read admission past will_accept");
        } else if self.dist_mode {
            let addr = self.mapper.decode(trans.addr);
            let slot = addr.flat_bank(self.config.banks_per_group);
            debug_assert!(self.bank_read_slots[slot].is_none(), "stage checked the slot");
            self.bank_read_slots[slot] = Some(trans);
        } else {
            let admitted = self.read_queue.try_push(trans);
            debug_assert!(admitted, "read admission past will_accept");
        }
    }
}
