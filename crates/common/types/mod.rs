mod account;
mod block;
mod fork;
mod genesis;
mod receipt;
mod transaction;
mod tx_fields;

pub use account::*;
pub use block::*;
pub use fork::*;
pub use genesis::*;
pub use receipt::*;
pub use transaction::*;
pub use tx_fields::*;
