pub mod engine;
pub mod ledger;
pub mod listing;
pub mod paths;
pub mod stats;
pub mod transfer;
