//! Background Tasks Module
//!
//! Contains the tasks that run alongside a storage engine.
//!
//! # Tasks
//! - Reclaimer: sweeps expired entries and trims idle nodes at a
//!   reconfigurable interval

mod reclaimer;

pub use reclaimer::{Reclaimer, Sweep};
