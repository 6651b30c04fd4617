use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use log::trace;

use crate::dram::{
    AddressMapper, ChannelConfig, ChannelState, Command, CommandQueue, CommandType, Cycle,
    RefreshTimer, Transaction,
};
use crate::stats::Statistics;

use super::{BoundedQueue, ChannelController, SHARED_WRITE_BUFFER_DEPTH};

impl<S: ChannelState, Q: CommandQueue> ChannelController<S, Q> {
    pub fn new(channel_id: usize, config: Arc<ChannelConfig>, channel: S, cmd_queue: Q) -> Self {
        let unified_mode = config.unified_queue;
        let dist_mode = config.dist_controller;
        let requesters = config.requesters_per_channel;
        let banks = config.banks_per_channel();

        let per_requester = |cap: usize, n: usize| -> Vec<BoundedQueue<Transaction>> {
            (0..n).map(|_| BoundedQueue::new(cap)).collect()
        };

        let (unified_queue, read_queue, write_buffer, dist_unified, dist_read, dist_write, slots) =
            if dist_mode {
                if unified_mode {
                    (
                        BoundedQueue::new(1),
                        BoundedQueue::new(0),
                        BoundedQueue::new(0),
                        per_requester(config.dist_trans_queue_size, requesters),
                        Vec::new(),
                        Vec::new(),
                        Vec::new(),
                    )
                } else {
                    (
                        BoundedQueue::new(0),
                        BoundedQueue::new(0),
                        BoundedQueue::new(SHARED_WRITE_BUFFER_DEPTH),
                        Vec::new(),
                        per_requester(config.dist_trans_queue_size, requesters),
                        per_requester(config.dist_trans_queue_size, requesters),
                        vec![None; banks],
                    )
                }
            } else if unified_mode {
                (
                    BoundedQueue::new(config.trans_queue_size),
                    BoundedQueue::new(0),
                    BoundedQueue::new(0),
                    Vec::new(),
                    Vec::new(),
                    Vec::new(),
                    Vec::new(),
                )
            } else {
                (
                    BoundedQueue::new(0),
                    BoundedQueue::new(config.trans_queue_size),
                    BoundedQueue::new(config.trans_queue_size),
                    Vec::new(),
                    Vec::new(),
                    Vec::new(),
                    Vec::new(),
                )
            };

        Self {
            channel_id,
            clk: 0,
            mapper: AddressMapper::new(&config),
            stats: Statistics::new(config.clone(), channel_id),
            refresh: RefreshTimer::new(&config),
            rank_idle_cycles: vec![0; config.ranks],
            row_buf_policy: config.row_buf_policy,
            config,
            channel,
            cmd_queue,
            unified_mode,
            dist_mode,
            unified_queue,
            read_queue,
            write_buffer,
            dist_unified,
            dist_read,
            dist_write,
            bank_read_slots: slots,
            pending_reads: HashMap::new(),
            pending_writes: HashMap::new(),
            return_queue: VecDeque::new(),
            last_unified_req: 0,
            last_read_req: 0,
            last_write_req: 0,
            last_trans_clk: 0,
            write_draining: 0,
        }
    }

    /// Advance the channel by one DRAM cycle.
    pub fn clock_tick(&mut self) {
        self.refresh.tick(self.clk, &mut self.channel);

        let mut cmd = None;
        if self.channel.is_refresh_waiting() {
            cmd = self.cmd_queue.finish_refresh(&self.channel, self.clk);
        }
        if cmd.is_none() {
            cmd = self.cmd_queue.next_command(&self.channel, self.clk);
        }

        let mut cmd_issued = false;
        if let Some(first) = cmd {
            self.issue_command(&first);
            self.cmd_queue.issued(&first);
            cmd_issued = true;

            if self.config.enable_hbm_dual_cmd {
                if let Some(second) = self.cmd_queue.next_command(&self.channel, self.clk) {
                    if first.kind.is_read_write()
                        && second.kind.is_read_write()
                        && second.kind.is_write() != first.kind.is_write()
                    {
                        self.issue_command(&second);
                        self.cmd_queue.issued(&second);
                        self.stats.inc(self.stats.hbm_dual_cmds);
                    }
                }
            }
        }

        for r in 0..self.config.ranks {
            if self.channel.is_rank_self_refreshing(r) {
                self.stats.inc(self.stats.sref_cycles[r]);
            } else if self.channel.is_all_bank_idle(r) {
                self.stats.inc(self.stats.all_bank_idle_cycles[r]);
                self.rank_idle_cycles[r] += 1;
            } else {
                self.stats.inc(self.stats.rank_active_cycles[r]);
                self.rank_idle_cycles[r] = 0;
            }
        }

        if self.config.enable_self_refresh && !cmd_issued {
            self.try_self_refresh();
        }

        if self.dist_mode {
            self.queue_in();
        }
        self.schedule_transaction();

        self.clk += 1;
        self.cmd_queue.tick(self.clk);
        self.stats.inc(self.stats.num_cycles);
    }

    /// Move idle ranks into self-refresh and wake ranks that have work
    /// again. First success wins the cycle.
    fn try_self_refresh(&mut self) {
        for r in 0..self.config.ranks {
            if self.channel.is_rank_self_refreshing(r) {
                if !self.cmd_queue.rank_queue_empty(r) {
                    let wake = Command::rank_level(CommandType::SrefExit, r);
                    if let Some(ready) = self.channel.ready_command(&wake, self.clk) {
                        self.issue_command(&ready);
                        break;
                    }
                }
            } else if self.cmd_queue.rank_queue_empty(r)
                && self.rank_idle_cycles[r] >= self.config.sref_threshold
            {
                let sleep = Command::rank_level(CommandType::SrefEnter, r);
                if let Some(ready) = self.channel.ready_command(&sleep, self.clk) {
                    self.issue_command(&ready);
                    break;
                }
            }
        }
    }

    /// Surface the oldest transaction whose visible completion cycle has
    /// elapsed. Distributed controllers add the link latency on the way out.
    pub fn pop_completed(&mut self, clk: Cycle) -> Option<(u64, bool)> {
        let link = if self.dist_mode {
            self.config.link_latency
        } else {
            0
        };
        let mut ready = None;
        for (idx, trans) in self.return_queue.iter().enumerate() {
            if clk >= trans.complete_cycle + link {
                ready = Some(idx);
                break;
            }
        }
        let trans = self.return_queue.remove(ready?)?;
        if trans.is_write {
            self.stats.inc(self.stats.num_writes_done);
        } else {
            self.stats.inc(self.stats.num_reads_done);
            self.stats
                .observe(self.stats.access_latency, clk.saturating_sub(trans.added_cycle));
            self.stats.observe(
                self.stats.total_access_latency,
                clk.saturating_sub(trans.start_cycle),
            );
        }
        trace!(
            "ch{} return {:#x} {} at {}",
            self.channel_id,
            trans.addr,
            if trans.is_write { "write" } else { "read" },
            clk
        );
        Some((trans.addr, trans.is_write))
    }

    pub fn queue_usage(&self) -> usize {
        self.cmd_queue.usage()
    }

    /// Transactions still parked in a requester's input queues.
    pub fn requester_backlog(&self, requester: usize) -> usize {
        if !self.dist_mode {
            return 0;
        }
        if self.unified_mode {
            self.dist_unified[requester].len()
        } else {
            self.dist_read[requester].len() + self.dist_write[requester].len()
        }
    }

    pub fn clk(&self) -> Cycle {
        self.clk
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut Statistics {
        &mut self.stats
    }

    pub fn print_epoch_stats(&mut self) {
        let usage = self.cmd_queue.usage();
        self.stats.print_epoch_stats(self.clk, usage);
    }

    pub fn print_final_stats(&mut self) {
        let usage = self.cmd_queue.usage();
        self.stats.print_final_stats(self.clk, usage);
    }
}
