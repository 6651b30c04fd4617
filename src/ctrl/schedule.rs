use crate::dram::{ChannelState, Command, CommandQueue, Transaction};

use super::{BoundedQueue, ChannelController};

/// Write buffer level above which an empty command queue triggers a drain.
const WRITE_DRAIN_WATERMARK: usize = 8;

impl<S: ChannelState, Q: CommandQueue> ChannelController<S, Q> {
    /// Pick at most one admitted transaction and hand its command to the
    /// command queue.
    pub(super) fn schedule_transaction(&mut self) {
        // arm the drain when the write buffer fills, or when it is well fed
        // and the command queue has gone dry
        if self.write_draining == 0 && !self.unified_mode {
            if !self.write_buffer.has_room()
                || (self.write_buffer.len() > WRITE_DRAIN_WATERMARK && self.cmd_queue.is_empty())
            {
                self.write_draining = self.write_buffer.len();
            }
        }

        if self.dist_mode {
            if self.unified_mode {
                self.schedule_shared_unified();
            } else if self.write_draining > 0 {
                self.schedule_shared_writes();
            } else {
                self.schedule_bank_read_slots();
            }
        } else {
            self.schedule_centralized();
        }
    }

    fn schedule_centralized(&mut self) {
        let use_writes = self.write_draining > 0;
        let mut idx = 0;
        loop {
            let trans = match self.sched_queue(use_writes).get(idx) {
                Some(trans) => *trans,
                None => break,
            };
            let cmd = self.trans_to_command(&trans);
            if !self
                .cmd_queue
                .will_accept(cmd.rank(), cmd.bankgroup(), cmd.bank())
            {
                idx += 1;
                continue;
            }
            self.stamp_scheduled(&cmd);
            if !self.unified_mode && cmd.kind.is_write() {
                if self.pending_reads.contains_key(&trans.addr) {
                    // read-after-write hazard: stop draining, leave the
                    // write where it is
                    self.stats.inc(self.stats.num_wr_dependency);
                    self.write_draining = 0;
                    break;
                }
                self.write_draining -= 1;
            }
            self.cmd_queue.add_command(cmd);
            self.sched_queue_mut(use_writes).remove(idx);
            break;
        }
    }

    fn sched_queue(&self, use_writes: bool) -> &BoundedQueue<Transaction> {
        if self.unified_mode {
            &self.unified_queue
        } else if use_writes {
            &self.write_buffer
        } else {
            &self.read_queue
        }
    }

    fn sched_queue_mut(&mut self, use_writes: bool) -> &mut BoundedQueue<Transaction> {
        if self.unified_mode {
            &mut self.unified_queue
        } else if use_writes {
            &mut self.write_buffer
        } else {
            &mut self.read_queue
        }
    }

    /// Distributed unified stage: the one-slot shared queue, gated by the
    /// link latency.
    fn schedule_shared_unified(&mut self) {
        let link = self.config.link_latency;
        let mut idx = 0;
        loop {
            let trans = match self.unified_queue.get(idx) {
                Some(trans) => *trans,
                None => break,
            };
            if trans.dist_link_start + link > self.clk {
                idx += 1;
                continue;
            }
            let cmd = self.trans_to_command(&trans);
            if !self
                .cmd_queue
                .will_accept(cmd.rank(), cmd.bankgroup(), cmd.bank())
            {
                idx += 1;
                continue;
            }
            self.stamp_scheduled(&cmd);
            self.cmd_queue.add_command(cmd);
            self.unified_queue.remove(idx);
            break;
        }
    }

    fn schedule_shared_writes(&mut self) {
        let link = self.config.link_latency;
        let mut idx = 0;
        loop {
            let trans = match self.write_buffer.get(idx) {
                Some(trans) => *trans,
                None => break,
            };
            if trans.dist_link_start + link > self.clk {
                idx += 1;
                continue;
            }
            let cmd = self.trans_to_command(&trans);
            debug_assert!(cmd.kind.is_write());
            if !self
                .cmd_queue
                .will_accept(cmd.rank(), cmd.bankgroup(), cmd.bank())
            {
                idx += 1;
                continue;
            }
            self.stamp_scheduled(&cmd);
            if self.pending_reads.contains_key(&trans.addr) {
                self.stats.inc(self.stats.num_wr_dependency);
                self.write_draining = 0;
                break;
            }
            self.write_draining -= 1;
            self.cmd_queue.add_command(cmd);
            self.write_buffer.remove(idx);
            break;
        }
    }

    /// Distributed read stage: scan the per-bank one-slot queues in bank
    /// order instead of walking one shared read queue.
    fn schedule_bank_read_slots(&mut self) {
        let link = self.config.link_latency;
        for slot in 0..self.bank_read_slots.len() {
            let trans = match self.bank_read_slots[slot] {
                Some(trans) => trans,
                None => continue,
            };
            if trans.dist_link_start + link > self.clk {
                continue;
            }
            let cmd = self.trans_to_command(&trans);
            debug_assert!(cmd.kind.is_read());
            if !self
                .cmd_queue
                .will_accept(cmd.rank(), cmd.bankgroup(), cmd.bank())
            {
                continue;
            }
            self.stamp_scheduled(&cmd);
            self.cmd_queue.add_command(cmd);
            self.bank_read_slots[slot] = None;
            break;
        }
    }

    /// Stamp `schedule_cycle` on every pending transaction the command
    /// covers and record the admission-to-schedule wait.
    fn stamp_scheduled(&mut self, cmd: &Command) {
        let clk = self.clk;
        if cmd.kind.is_write() {
            if let Some(req) = self.pending_writes.get_mut(&cmd.hex_addr) {
                req.schedule_cycle = Some(clk);
                let wait = clk - req.added_cycle;
                self.stats.observe(self.stats.command_queuing_latency, wait);
                self.stats
                    .observe(self.stats.write_command_queuing_latency, wait);
            }
        } else if let Some(reqs) = self.pending_reads.get_mut(&cmd.hex_addr) {
            for req in reqs.iter_mut() {
                req.schedule_cycle = Some(clk);
                let wait = clk - req.added_cycle;
                self.stats.observe(self.stats.command_queuing_latency, wait);
                self.stats
                    .observe(self.stats.read_command_queuing_latency, wait);
            }
        }
    }
}
