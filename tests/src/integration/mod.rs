//! Cross-subsystem scenarios.

#[cfg(test)]
mod fixtures;

mod idempotency;
mod ledger_outages;
mod supply_chain;
mod verification;
