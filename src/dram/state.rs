use std::collections::VecDeque;

use super::command::{Command, CommandType};
use super::config::ChannelConfig;
use super::{Cycle, TimingConfig};

/// Channel-side DRAM state consumed by the controller.
///
/// `ready_command` follows the tentative-command contract: given the command
/// the caller wants to issue, it returns that command when the channel can
/// take it now, the precursor command (activate/precharge/sref-exit) the
/// channel needs first, or `None` when timing blocks any progress this cycle.
pub trait ChannelState {
    fn is_refresh_waiting(&self) -> bool;
    /// The oldest owed refresh command, rank- or bank-level.
    fn pending_refresh(&self) -> Option<Command>;
    /// Queue a refresh obligation; raised by the refresh timer.
    fn request_refresh(&mut self, refresh: Command);
    fn is_rank_self_refreshing(&self, rank: usize) -> bool;
    fn is_all_bank_idle(&self, rank: usize) -> bool;
    fn ready_command(&self, cmd: &Command, clk: Cycle) -> Option<Command>;
    fn update_timing_and_states(&mut self, cmd: &Command, clk: Cycle);
    /// Consecutive accesses served by the currently open row of a bank.
    fn row_hit_count(&self, rank: usize, bankgroup: usize, bank: usize) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
struct BankState {
    open_row: Option<usize>,
    hit_streak: u64,
    ready_at: Cycle,
}

/// Bundled open-row timing model.
///
/// Coarse by design: one earliest-ready cycle per bank, row open/close
/// tracking, per-rank self-refresh flags, and a FIFO of ranks owing refresh.
pub struct ProtocolState {
    timing: TimingConfig,
    banks_per_group: usize,
    /// Indexed [rank][flat bank].
    banks: Vec<Vec<BankState>>,
    sref: Vec<bool>,
    refresh_queue: VecDeque<Command>,
}

impl ProtocolState {
    pub fn new(config: &ChannelConfig) -> Self {
        Self {
            timing: config.timing,
            banks_per_group: config.banks_per_group,
            banks: vec![vec![BankState::default(); config.banks_per_channel()]; config.ranks],
            sref: vec![false; config.ranks],
            refresh_queue: VecDeque::new(),
        }
    }

    fn bank(&self, cmd: &Command) -> &BankState {
        &self.banks[cmd.rank()][cmd.addr.flat_bank(self.banks_per_group)]
    }

    fn bank_mut(&mut self, cmd: &Command) -> &mut BankState {
        &mut self.banks[cmd.rank()][cmd.addr.flat_bank(self.banks_per_group)]
    }

    /// Precharge precursor for the first open bank of a rank, if one is ready.
    fn rank_precharge(&self, rank: usize, clk: Cycle) -> Option<Command> {
        for (flat, bank) in self.banks[rank].iter().enumerate() {
            if bank.open_row.is_some() {
                if clk < bank.ready_at {
                    return None;
                }
                let mut addr = super::Address::rank_only(rank);
                addr.bankgroup = flat / self.banks_per_group;
                addr.bank = flat % self.banks_per_group;
                return Some(Command::new(CommandType::Precharge, addr, 0));
            }
        }
        None
    }

    fn rank_ready(&self, rank: usize, clk: Cycle) -> bool {
        self.banks[rank].iter().all(|b| clk >= b.ready_at)
    }

    fn rank_closed(&self, rank: usize) -> bool {
        self.banks[rank].iter().all(|b| b.open_row.is_none())
    }
}

impl ChannelState for ProtocolState {
    fn is_refresh_waiting(&self) -> bool {
        !self.refresh_queue.is_empty()
    }

    fn pending_refresh(&self) -> Option<Command> {
        self.refresh_queue.front().copied()
    }

    fn request_refresh(&mut self, refresh: Command) {
        debug_assert!(matches!(
            refresh.kind,
            CommandType::Refresh | CommandType::RefreshBank
        ));
        self.refresh_queue.push_back(refresh);
    }

    fn is_rank_self_refreshing(&self, rank: usize) -> bool {
        self.sref[rank]
    }

    fn is_all_bank_idle(&self, rank: usize) -> bool {
        self.rank_closed(rank)
    }

    fn ready_command(&self, cmd: &Command, clk: Cycle) -> Option<Command> {
        match cmd.kind {
            CommandType::Read
            | CommandType::ReadPrecharge
            | CommandType::Write
            | CommandType::WritePrecharge => {
                if self.sref[cmd.rank()] {
                    return Some(Command::rank_level(CommandType::SrefExit, cmd.rank()));
                }
                let bank = self.bank(cmd);
                if clk < bank.ready_at {
                    return None;
                }
                match bank.open_row {
                    Some(row) if row == cmd.addr.row => Some(*cmd),
                    Some(_) => {
                        let mut pre = *cmd;
                        pre.kind = CommandType::Precharge;
                        Some(pre)
                    }
                    None => {
                        let mut act = *cmd;
                        act.kind = CommandType::Activate;
                        Some(act)
                    }
                }
            }
            CommandType::Refresh => {
                let rank = cmd.rank();
                if self.sref[rank] {
                    return Some(Command::rank_level(CommandType::SrefExit, rank));
                }
                if !self.rank_closed(rank) {
                    return self.rank_precharge(rank, clk);
                }
                if self.rank_ready(rank, clk) {
                    Some(*cmd)
                } else {
                    None
                }
            }
            CommandType::RefreshBank => {
                if self.sref[cmd.rank()] {
                    return Some(Command::rank_level(CommandType::SrefExit, cmd.rank()));
                }
                let bank = self.bank(cmd);
                if bank.open_row.is_some() {
                    let mut pre = *cmd;
                    pre.kind = CommandType::Precharge;
                    return (clk >= bank.ready_at).then_some(pre);
                }
                (clk >= bank.ready_at).then_some(*cmd)
            }
            CommandType::SrefEnter => {
                let rank = cmd.rank();
                (self.rank_closed(rank) && self.rank_ready(rank, clk)).then_some(*cmd)
            }
            CommandType::SrefExit => self.rank_ready(cmd.rank(), clk).then_some(*cmd),
            CommandType::Activate | CommandType::Precharge => {
                (clk >= self.bank(cmd).ready_at).then_some(*cmd)
            }
        }
    }

    fn update_timing_and_states(&mut self, cmd: &Command, clk: Cycle) {
        let timing = self.timing;
        match cmd.kind {
            CommandType::Activate => {
                let row = cmd.addr.row;
                let bank = self.bank_mut(cmd);
                bank.open_row = Some(row);
                bank.hit_streak = 0;
                bank.ready_at = clk + timing.act_to_rw;
            }
            CommandType::Read | CommandType::Write => {
                let bank = self.bank_mut(cmd);
                bank.hit_streak += 1;
                bank.ready_at = clk + timing.rw_gap;
            }
            CommandType::ReadPrecharge | CommandType::WritePrecharge => {
                let bank = self.bank_mut(cmd);
                bank.open_row = None;
                bank.hit_streak = 0;
                bank.ready_at = clk + timing.pre_to_act;
            }
            CommandType::Precharge => {
                let bank = self.bank_mut(cmd);
                bank.open_row = None;
                bank.hit_streak = 0;
                bank.ready_at = clk + timing.pre_to_act;
            }
            CommandType::Refresh => {
                let rank = cmd.rank();
                for bank in &mut self.banks[rank] {
                    bank.ready_at = clk + timing.refresh_cycle;
                }
                if let Some(pos) = self
                    .refresh_queue
                    .iter()
                    .position(|r| r.kind == CommandType::Refresh && r.rank() == rank)
                {
                    self.refresh_queue.remove(pos);
                }
            }
            CommandType::RefreshBank => {
                self.bank_mut(cmd).ready_at = clk + timing.refresh_cycle;
                if let Some(pos) = self.refresh_queue.iter().position(|r| {
                    r.kind == CommandType::RefreshBank
                        && r.rank() == cmd.rank()
                        && r.bankgroup() == cmd.bankgroup()
                        && r.bank() == cmd.bank()
                }) {
                    self.refresh_queue.remove(pos);
                }
            }
            CommandType::SrefEnter => {
                self.sref[cmd.rank()] = true;
            }
            CommandType::SrefExit => {
                let rank = cmd.rank();
                self.sref[rank] = false;
                for bank in &mut self.banks[rank] {
                    bank.ready_at = clk + timing.sref_exit_latency;
                }
            }
        }
    }

    fn row_hit_count(&self, rank: usize, bankgroup: usize, bank: usize) -> u64 {
        self.banks[rank][bankgroup * self.banks_per_group + bank].hit_streak
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dram::{Address, AddressMapper};

    fn state() -> ProtocolState {
        ProtocolState::new(&ChannelConfig::default())
    }

    fn read_cmd(hex: u64) -> Command {
        let mapper = AddressMapper::new(&ChannelConfig::default());
        Command::new(CommandType::Read, mapper.decode(hex), hex)
    }

    #[test]
    fn closed_bank_demands_activate_first() {
        let mut state = state();
        let cmd = read_cmd(0x1000);

        let ready = state.ready_command(&cmd, 0).expect("bank is quiet");
        assert_eq!(ready.kind, CommandType::Activate);

        state.update_timing_and_states(&ready, 0);
        assert!(
            state.ready_command(&cmd, 0).is_none(),
            "row still opening, nothing can issue"
        );
        let ready = state
            .ready_command(&cmd, state.timing.act_to_rw)
            .expect("activate window elapsed");
        assert_eq!(ready.kind, CommandType::Read);
    }

    #[test]
    fn row_conflict_demands_precharge() {
        let mut state = state();
        let first = read_cmd(0x1000);
        let act = state.ready_command(&first, 0).expect("activate");
        state.update_timing_and_states(&act, 0);
        let clk = state.timing.act_to_rw;

        // same bank, different row
        let conflicting = read_cmd(0x1000 + (1u64 << 30));
        assert_eq!(conflicting.addr.flat_bank(4), first.addr.flat_bank(4));
        assert_ne!(conflicting.addr.row, first.addr.row);

        let ready = state.ready_command(&conflicting, clk).expect("ready for pre");
        assert_eq!(ready.kind, CommandType::Precharge);
    }

    #[test]
    fn row_hits_accumulate_until_precharge() {
        let mut state = state();
        let cmd = read_cmd(0x2000);
        let act = state.ready_command(&cmd, 0).expect("activate");
        state.update_timing_and_states(&act, 0);
        let mut clk = state.timing.act_to_rw;

        for expected in 0..3 {
            assert_eq!(
                state.row_hit_count(cmd.rank(), cmd.bankgroup(), cmd.bank()),
                expected
            );
            state.update_timing_and_states(&cmd, clk);
            clk += state.timing.rw_gap;
        }

        let mut pre = cmd;
        pre.kind = CommandType::Precharge;
        state.update_timing_and_states(&pre, clk);
        assert_eq!(state.row_hit_count(cmd.rank(), cmd.bankgroup(), cmd.bank()), 0);
    }

    #[test]
    fn refresh_drains_open_banks_first() {
        let mut state = state();
        let cmd = read_cmd(0x3000);
        let act = state.ready_command(&cmd, 0).expect("activate");
        state.update_timing_and_states(&act, 0);

        let refresh = Command::rank_level(CommandType::Refresh, cmd.rank());
        state.request_refresh(refresh);
        assert!(state.is_refresh_waiting());

        let clk = state.timing.act_to_rw;
        let ready = state.ready_command(&refresh, clk).expect("precharge precursor");
        assert_eq!(ready.kind, CommandType::Precharge);
        state.update_timing_and_states(&ready, clk);

        let clk = clk + state.timing.pre_to_act;
        let ready = state.ready_command(&refresh, clk).expect("rank drained");
        assert_eq!(ready.kind, CommandType::Refresh);
        state.update_timing_and_states(&ready, clk);
        assert!(!state.is_refresh_waiting());
    }

    #[test]
    fn bank_refresh_blocks_one_bank_only() {
        let mut state = state();
        let cmd = read_cmd(0x1000);
        let act = state.ready_command(&cmd, 0).expect("activate");
        state.update_timing_and_states(&act, 0);

        let mut refresh = cmd;
        refresh.kind = CommandType::RefreshBank;
        state.request_refresh(refresh);

        let clk = state.timing.act_to_rw;
        let ready = state.ready_command(&refresh, clk).expect("precharge first");
        assert_eq!(ready.kind, CommandType::Precharge);
        state.update_timing_and_states(&ready, clk);

        let clk = clk + state.timing.pre_to_act;
        let ready = state.ready_command(&refresh, clk).expect("bank drained");
        assert_eq!(ready.kind, CommandType::RefreshBank);
        state.update_timing_and_states(&ready, clk);
        assert!(!state.is_refresh_waiting());

        // the neighbouring bank is untouched by the bank refresh
        let other = read_cmd(0x1000 + (1 << 16));
        assert!(state.ready_command(&other, clk).is_some());
    }

    #[test]
    fn self_refresh_gates_and_releases_a_rank() {
        let mut state = state();
        let enter = Command::rank_level(CommandType::SrefEnter, 1);
        let ready = state.ready_command(&enter, 0).expect("idle rank may enter");
        state.update_timing_and_states(&ready, 0);
        assert!(state.is_rank_self_refreshing(1));

        // a read against a sleeping rank asks for the wakeup instead
        let addr = Address {
            rank: 1,
            ..Address::default()
        };
        let read = Command::new(CommandType::Read, addr, 0x9000);
        let ready = state.ready_command(&read, 5).expect("wakeup precursor");
        assert_eq!(ready.kind, CommandType::SrefExit);

        state.update_timing_and_states(&ready, 5);
        assert!(!state.is_rank_self_refreshing(1));
        assert!(
            state.ready_command(&read, 5 + state.timing.sref_exit_latency).is_some(),
            "rank usable after the exit latency"
        );
    }
}
