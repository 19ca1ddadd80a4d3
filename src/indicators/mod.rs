//! Technical indicators consumed by the signal hook.

pub mod momentum;
