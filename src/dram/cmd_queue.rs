use std::collections::VecDeque;

use super::command::Command;
use super::config::ChannelConfig;
use super::state::ChannelState;
use super::Cycle;

/// Per-bank command scheduling substrate consumed by the controller.
///
/// `next_command` and `finish_refresh` are non-destructive offers; the
/// controller confirms an issue with `issued`, which removes the backing
/// entry for read/write commands. Precursor commands (activate, precharge,
/// sref-exit) never live in the queue and confirming them is a no-op.
pub trait CommandQueue {
    fn will_accept(&self, rank: usize, bankgroup: usize, bank: usize) -> bool;
    fn add_command(&mut self, cmd: Command);
    fn next_command<S: ChannelState>(&self, channel: &S, clk: Cycle) -> Option<Command>;
    fn finish_refresh<S: ChannelState>(&self, channel: &S, clk: Cycle) -> Option<Command>;
    fn issued(&mut self, cmd: &Command);
    fn is_empty(&self) -> bool;
    fn rank_queue_empty(&self, rank: usize) -> bool;
    fn tick(&mut self, clk: Cycle);
    fn usage(&self) -> usize;
}

/// Bundled implementation: one bounded FIFO per bank, serviced round-robin
/// starting one past the last bank that issued.
pub struct BankCommandQueue {
    queues: Vec<VecDeque<Command>>,
    queue_capacity: usize,
    banks_per_channel: usize,
    banks_per_group: usize,
    rank_counts: Vec<usize>,
    last_bank: usize,
}

impl BankCommandQueue {
    pub fn new(config: &ChannelConfig) -> Self {
        let banks_per_channel = config.banks_per_channel();
        Self {
            queues: vec![VecDeque::new(); config.ranks * banks_per_channel],
            queue_capacity: config.cmd_queue_size,
            banks_per_channel,
            banks_per_group: config.banks_per_group,
            rank_counts: vec![0; config.ranks],
            last_bank: 0,
        }
    }

    fn flat_index(&self, rank: usize, bankgroup: usize, bank: usize) -> usize {
        rank * self.banks_per_channel + bankgroup * self.banks_per_group + bank
    }

    fn queue_of(&self, cmd: &Command) -> usize {
        self.flat_index(cmd.rank(), cmd.bankgroup(), cmd.bank())
    }
}

impl CommandQueue for BankCommandQueue {
    fn will_accept(&self, rank: usize, bankgroup: usize, bank: usize) -> bool {
        self.queues[self.flat_index(rank, bankgroup, bank)].len() < self.queue_capacity
    }

    fn add_command(&mut self, cmd: Command) {
        debug_assert!(cmd.kind.is_read_write());
        debug_assert!(self.will_accept(cmd.rank(), cmd.bankgroup(), cmd.bank()));
        let idx = self.queue_of(&cmd);
        self.rank_counts[cmd.rank()] += 1;
        self.queues[idx].push_back(cmd);
    }

    fn next_command<S: ChannelState>(&self, channel: &S, clk: Cycle) -> Option<Command> {
        let total = self.queues.len();
        for i in 0..total {
            let idx = (self.last_bank + 1 + i) % total;
            let head = match self.queues[idx].front() {
                Some(head) => head,
                None => continue,
            };
            if let Some(ready) = channel.ready_command(head, clk) {
                return Some(ready);
            }
        }
        None
    }

    fn finish_refresh<S: ChannelState>(&self, channel: &S, clk: Cycle) -> Option<Command> {
        let refresh = channel.pending_refresh()?;
        channel.ready_command(&refresh, clk)
    }

    fn issued(&mut self, cmd: &Command) {
        if !cmd.kind.is_read_write() {
            return;
        }
        let idx = self.queue_of(cmd);
        let head_matches = self.queues[idx]
            .front()
            .map(|head| head.hex_addr == cmd.hex_addr && head.kind == cmd.kind)
            .unwrap_or(false);
        if head_matches {
            self.queues[idx].pop_front();
            self.rank_counts[cmd.rank()] -= 1;
            self.last_bank = idx;
        }
    }

    fn is_empty(&self) -> bool {
        self.rank_counts.iter().all(|&n| n == 0)
    }

    fn rank_queue_empty(&self, rank: usize) -> bool {
        self.rank_counts[rank] == 0
    }

    fn tick(&mut self, _clk: Cycle) {}

    fn usage(&self) -> usize {
        self.rank_counts.iter().sum()
    }
}
