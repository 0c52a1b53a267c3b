//! Operator tools for checking presence sources, directives and storage
//! without touching any player.

pub mod commands;
