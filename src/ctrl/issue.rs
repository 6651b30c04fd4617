use log::trace;

use crate::dram::{ChannelState, Command, CommandQueue, CommandType, RowBufPolicy, Transaction};

use super::ChannelController;

impl<S: ChannelState, Q: CommandQueue> ChannelController<S, Q> {
    /// Issue one command into the channel: complete the pending transactions
    /// it covers, bump the command counters, and update channel timing.
    pub(super) fn issue_command(&mut self, cmd: &Command) {
        trace!("ch{} {:>10} {}", self.channel_id, self.clk, cmd);
        if cmd.kind.is_read() {
            let pending = match self.pending_reads.remove(&cmd.hex_addr) {
                Some(pending) if !pending.is_empty() => pending,
                _ => panic!("read command {:#x} has no pending transactions", cmd.hex_addr),
            };
            // every coalesced read completes off this one command
            for mut req in pending {
                let scheduled = match req.schedule_cycle {
                    Some(cycle) => cycle,
                    None => panic!("issued read {:#x} was never scheduled", req.addr),
                };
                req.issue_cycle = self.clk;
                let wait = self.clk - scheduled;
                self.stats.observe(self.stats.queuing_latency, wait);
                self.stats.observe(self.stats.read_queuing_latency, wait);
                req.complete_cycle = self.clk + self.config.read_delay;
                self.return_queue.push_back(req);
            }
        } else if cmd.kind.is_write() {
            let mut req = match self.pending_writes.remove(&cmd.hex_addr) {
                Some(req) => req,
                None => panic!("write command {:#x} has no pending transaction", cmd.hex_addr),
            };
            let scheduled = match req.schedule_cycle {
                Some(cycle) => cycle,
                None => panic!("issued write {:#x} was never scheduled", req.addr),
            };
            req.issue_cycle = self.clk;
            let wait = self.clk - scheduled;
            self.stats.observe(self.stats.queuing_latency, wait);
            self.stats.observe(self.stats.write_queuing_latency, wait);
            self.stats.observe(
                self.stats.write_latency,
                self.clk - req.added_cycle + self.config.write_delay,
            );
            self.stats.observe(
                self.stats.total_write_latency,
                self.clk.saturating_sub(req.start_cycle) + self.config.write_delay,
            );
            // the host already saw this write complete at admission
        }
        // stats read the row state the command found, so they run before the
        // timing update
        self.update_command_stats(cmd);
        self.channel.update_timing_and_states(cmd, self.clk);
    }

    fn update_command_stats(&mut self, cmd: &Command) {
        match cmd.kind {
            CommandType::Read | CommandType::ReadPrecharge => {
                self.stats.inc(self.stats.num_read_cmds);
                if self
                    .channel
                    .row_hit_count(cmd.rank(), cmd.bankgroup(), cmd.bank())
                    != 0
                {
                    self.stats.inc(self.stats.num_row_hits);
                    self.stats.inc(self.stats.num_read_row_hits);
                }
            }
            CommandType::Write | CommandType::WritePrecharge => {
                self.stats.inc(self.stats.num_write_cmds);
                if self
                    .channel
                    .row_hit_count(cmd.rank(), cmd.bankgroup(), cmd.bank())
                    != 0
                {
                    self.stats.inc(self.stats.num_row_hits);
                    self.stats.inc(self.stats.num_write_row_hits);
                }
            }
            CommandType::Activate => self.stats.inc(self.stats.num_act_cmds),
            CommandType::Precharge => {
                self.stats.inc(self.stats.num_pre_cmds);
                // the command queue only asks for a precharge on a row
                // conflict or to drain a rank, both on-demand
                self.stats.inc(self.stats.num_ondemand_pres);
            }
            CommandType::Refresh => self.stats.inc(self.stats.num_refresh_cmds),
            CommandType::RefreshBank => self.stats.inc(self.stats.num_refb_cmds),
            CommandType::SrefEnter => self.stats.inc(self.stats.num_sref_enter_cmds),
            CommandType::SrefExit => self.stats.inc(self.stats.num_sref_exit_cmds),
        }
    }

    /// Translate an admitted transaction into the command the row-buffer
    /// policy calls for.
    pub(super) fn trans_to_command(&self, trans: &Transaction) -> Command {
        let addr = self.mapper.decode(trans.addr);
        let kind = match self.row_buf_policy {
            RowBufPolicy::OpenPage => {
                if trans.is_write {
                    CommandType::Write
                } else {
                    CommandType::Read
                }
            }
            RowBufPolicy::ClosePage => {
                if trans.is_write {
                    CommandType::WritePrecharge
                } else {
                    CommandType::ReadPrecharge
                }
            }
        };
        Command::new(kind, addr, trans.addr)
    }
}
