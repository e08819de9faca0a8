//! `nd-cli`: the `newsdesk` terminal client.

pub mod cli;
pub mod render;
