pub mod ledger;

pub use ledger::FaultLedger;
