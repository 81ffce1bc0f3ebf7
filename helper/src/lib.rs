//! Small, dependency-light helper functions shared across the crates in this workspace.
#![cfg_attr(not(feature = "std"), no_std)]

//---------------------------------------------------------------------------------------------------- Public API
#[cfg(feature = "cast")]
pub mod cast;

#[cfg(feature = "num")]
pub mod num;

#[cfg(feature = "time")]
pub mod time;
