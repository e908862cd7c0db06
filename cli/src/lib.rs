//! opsdeck CLI - image push, image scan and remote state pull.

pub mod commands;
pub mod output;
