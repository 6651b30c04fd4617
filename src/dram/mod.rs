pub mod address;
pub mod cmd_queue;
pub mod command;
pub mod config;
pub mod refresh;
pub mod state;
pub mod transaction;

pub type Cycle = u64;

pub use address::{Address, AddressMapper};
pub use cmd_queue::{BankCommandQueue, CommandQueue};
pub use command::{Command, CommandType};
pub use config::{ChannelConfig, EnergyConfig, Protocol, RefreshPolicy, RowBufPolicy, TimingConfig};
pub use refresh::RefreshTimer;
pub use state::{ChannelState, ProtocolState};
pub use transaction::Transaction;
