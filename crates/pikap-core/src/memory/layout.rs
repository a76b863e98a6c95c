//! Memory layout constants for the emulated GameCube
//!
//! This module centralizes the fixed addresses and sizes used by the bridge.
//! Constants are organized by concern.

/// Emulated main RAM (MEM1)
pub mod mem1 {
    /// Cached virtual base of MEM1 as seen by the game
    pub const BASE: u32 = 0x8000_0000;

    /// Uncached mirror of MEM1
    pub const UNCACHED_BASE: u32 = 0xC000_0000;

    /// Usable size of MEM1 on a retail GameCube (24 MiB)
    pub const SIZE: u32 = 0x0180_0000;

    /// Size of the shared-memory view Dolphin maps for MEM1 (32 MiB)
    pub const HOST_VIEW_SIZE: usize = 0x0200_0000;

    /// Mask turning either virtual mirror into a physical offset
    pub const PHYSICAL_MASK: u32 = 0x01FF_FFFF;
}

/// Disc header fields mirrored at the start of MEM1
pub mod header {
    /// Game id (4-byte game code + 2-byte maker code), e.g. `GPIP01`
    pub const GAME_ID: u32 = 0x8000_0000;

    /// Game id length in bytes
    pub const GAME_ID_LEN: usize = 6;
}

/// Item and check conditions
pub mod condition {
    /// Integer widths a threshold or increment may use
    pub const VALID_WIDTHS: [u8; 3] = [1, 2, 4];

    /// Largest bit offset inside a byte
    pub const MAX_BIT: u8 = 7;

    /// Longest accepted slot name region
    pub const MAX_AUTH_LEN: usize = 64;
}

/// Timing constants for polling and reconnection
pub mod timing {
    /// Interval between memory polls while synced (ms)
    pub const POLL_INTERVAL_MS: u64 = 500;

    /// Fixed delay between attach / probe / auth retries (s)
    pub const RETRY_DELAY_SECS: u64 = 5;

    /// Fixed delay between WebSocket reconnect attempts (s)
    pub const NETWORK_RETRY_DELAY_SECS: u64 = 5;

    /// Socket read timeout used by the channel thread to interleave sends (ms)
    pub const SOCKET_READ_TIMEOUT_MS: u64 = 50;
}

/// Whether `[address, address + length)` lies inside MEM1 (either mirror).
pub fn in_mem1(address: u32, length: usize) -> bool {
    let offset = match address {
        a if (mem1::BASE..mem1::BASE + mem1::SIZE).contains(&a) => a - mem1::BASE,
        a if (mem1::UNCACHED_BASE..mem1::UNCACHED_BASE + mem1::SIZE).contains(&a) => {
            a - mem1::UNCACHED_BASE
        }
        _ => return false,
    };
    (offset as u64) + (length as u64) <= mem1::SIZE as u64
}

/// Physical offset of an emulated address inside the MEM1 host view.
pub fn physical_offset(address: u32) -> u32 {
    address & mem1::PHYSICAL_MASK
}
