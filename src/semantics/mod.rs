// src/semantics/mod.rs
pub mod break_continue;
pub mod validator;
