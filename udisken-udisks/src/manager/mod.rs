// SPDX-License-Identifier: GPL-3.0-only

//! UDisks2 manager access
//!
//! This module provides:
//! - UdisksClient for the managed-object enumeration and version query
//! - Object event streams built from ObjectManager signals

pub mod client;

pub use client::*;
