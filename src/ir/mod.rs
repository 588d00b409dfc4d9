// src/ir/mod.rs
pub mod state_machine;
