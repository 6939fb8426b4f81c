//! Seed Derivation - fixed linear stride over the panel order
//!
//! `seed(i) = (base + i * 137) mod 2^32`. Reordering panels changes every
//! seed after the moved panel, which shows up in the run hash.

use serde::{Deserialize, Serialize};

use crate::panels::PanelType;

pub const SEED_SPACE: u64 = 1 << 32;
pub const SEED_STRIDE: u64 = 137;

pub fn derive_seed(base: u64, index: usize) -> u32 {
    ((base % SEED_SPACE + (index as u64 % SEED_SPACE) * SEED_STRIDE) % SEED_SPACE) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSeed {
    pub panel: PanelType,
    pub index: usize,
    pub seed: u32,
}

/// Seeds for `panels` in the order given.
pub fn derive_seeds(base: u64, panels: &[PanelType]) -> Vec<PanelSeed> {
    panels
        .iter()
        .enumerate()
        .map(|(index, &panel)| PanelSeed { panel, index, seed: derive_seed(base, index) })
        .collect()
}

/// Base seed taken from the first eight hex digits of a content hash.
pub fn base_seed_from_hash(hash: &str) -> u64 {
    let prefix: String = hash.chars().take(8).collect();
    u64::from_str_radix(&prefix, 16).unwrap_or(0)
}
