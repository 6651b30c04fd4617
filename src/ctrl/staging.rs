use crate::dram::{ChannelState, CommandQueue};

use super::ChannelController;

impl<S: ChannelState, Q: CommandQueue> ChannelController<S, Q> {
    /// Distributed staging: move at most one transaction per traffic class
    /// from the per-requester input queues into the shared stage, selecting
    /// requesters round-robin from one past the last served.
    pub(super) fn queue_in(&mut self) {
        debug_assert!(self.dist_mode);
        if self.unified_mode {
            self.stage_unified();
        } else {
            self.stage_split();
        }
    }

    fn stage_unified(&mut self) {
        if !self.unified_queue.is_empty() {
            return;
        }
        let requesters = self.config.requesters_per_channel;
        for i in 0..requesters {
            let req = (self.last_unified_req + 1 + i) % requesters;
            let mut trans = match self.dist_unified[req].pop_front() {
                Some(trans) => trans,
                None => continue,
            };
            trans.dist_link_start = self.clk;
            if trans.is_write {
                self.admit_write(trans);
            } else {
                self.admit_read(trans);
            }
            self.last_unified_req = req;
            break;
        }
    }

    /// Split stage: one write into the shared buffer and one read into its
    /// per-bank slot per tick. Each class's cursor advances only when that
    /// class stages; a full bank slot sends the scan to the next requester.
    fn stage_split(&mut self) {
        let requesters = self.config.requesters_per_channel;
        let mut write_done = !self.write_buffer.has_room();
        let mut read_done = self.bank_read_slots.iter().all(|slot| slot.is_some());
        if write_done && read_done {
            return;
        }

        for i in 0..requesters {
            if !write_done {
                let req = (self.last_write_req + 1 + i) % requesters;
                if let Some(mut trans) = self.dist_write[req].pop_front() {
                    trans.dist_link_start = self.clk;
                    self.admit_write(trans);
                    self.last_write_req = req;
                    write_done = true;
                }
            }

            if !read_done {
                let req = (self.last_read_req + 1 + i) % requesters;
                if let Some(&front) = self.dist_read[req].front() {
                    // reads served from a pending write skip the bank slot
                    if !self.pending_writes.contains_key(&front.addr) {
                        let addr = self.mapper.decode(front.addr);
                        let slot = addr.flat_bank(self.config.banks_per_group);
                        if self.bank_read_slots[slot].is_some() {
                            // this bank's slot is taken; try the next requester
                            continue;
                        }
                    }
                    let mut trans = front;
                    self.dist_read[req].pop_front();
                    trans.dist_link_start = self.clk;
                    self.admit_read(trans);
                    self.last_read_req = req;
                    read_done = true;
                }
            }

            if write_done && read_done {
                break;
            }
        }
    }
}
