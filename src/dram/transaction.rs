use super::Cycle;

/// One in-flight memory request.
///
/// Cycle stamps start at zero and are filled in as the transaction moves
/// through the pipeline; `schedule_cycle` stays `None` until the command
/// queue accepts the backing command, and issue checks it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transaction {
    pub addr: u64,
    pub is_write: bool,
    /// Originating requester, distributed controllers only.
    pub requester: usize,
    /// External arrival, stamped by the host.
    pub start_cycle: Cycle,
    /// Admission into this controller.
    pub added_cycle: Cycle,
    /// Handoff from a requester input queue to the shared stage.
    pub dist_link_start: Cycle,
    /// Accepted by the command queue.
    pub schedule_cycle: Option<Cycle>,
    /// Backing command issued to the channel.
    pub issue_cycle: Cycle,
    /// Cycle at which the host may observe completion.
    pub complete_cycle: Cycle,
}

impl Transaction {
    pub fn new(addr: u64, is_write: bool, start_cycle: Cycle) -> Self {
        Self {
            addr,
            is_write,
            start_cycle,
            ..Self::default()
        }
    }

    pub fn read(addr: u64, start_cycle: Cycle) -> Self {
        Self::new(addr, false, start_cycle)
    }

    pub fn write(addr: u64, start_cycle: Cycle) -> Self {
        Self::new(addr, true, start_cycle)
    }

    pub fn from_requester(mut self, requester: usize) -> Self {
        self.requester = requester;
        self
    }
}
