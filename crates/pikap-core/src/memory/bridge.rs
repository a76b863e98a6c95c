use crate::error::Result;

/// Attach / read / write access to the emulated game's memory.
///
/// Addresses are emulated (GameCube virtual) addresses. Every read or write
/// made without a live attachment fails with [`Error::AttachLost`], so callers
/// can route any loss of the process to reconnection in one place.
/// Implementations never retry; retry policy belongs to the state machine.
///
/// [`Error::AttachLost`]: crate::Error::AttachLost
pub trait MemoryBridge {
    /// Attach to the target process. Calling this while attached is a no-op
    /// that returns `true`.
    fn attach(&mut self) -> bool;

    /// Drop the attachment, if any.
    fn detach(&mut self);

    fn is_attached(&self) -> bool;

    /// Read `length` bytes starting at `address`.
    fn read(&self, address: u32, length: usize) -> Result<Vec<u8>>;

    /// Write `bytes` starting at `address`.
    fn write(&mut self, address: u32, bytes: &[u8]) -> Result<()>;

    fn read_u8(&self, address: u32) -> Result<u8> {
        let bytes = self.read(address, 1)?;
        Ok(bytes[0])
    }

    /// Read a big-endian u16
    fn read_u16(&self, address: u32) -> Result<u16> {
        let bytes = self.read(address, 2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read a big-endian u32
    fn read_u32(&self, address: u32) -> Result<u32> {
        let bytes = self.read(address, 4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn write_u8(&mut self, address: u32, value: u8) -> Result<()> {
        self.write(address, &[value])
    }

    fn write_u16(&mut self, address: u32, value: u16) -> Result<()> {
        self.write(address, &value.to_be_bytes())
    }

    fn write_u32(&mut self, address: u32, value: u32) -> Result<()> {
        self.write(address, &value.to_be_bytes())
    }

    /// Read an unsigned big-endian integer of 1, 2 or 4 bytes.
    fn read_uint(&self, address: u32, width: u8) -> Result<u32> {
        match width {
            1 => self.read_u8(address).map(u32::from),
            2 => self.read_u16(address).map(u32::from),
            _ => self.read_u32(address),
        }
    }

    /// Write an unsigned big-endian integer of 1, 2 or 4 bytes, truncating `value`.
    fn write_uint(&mut self, address: u32, width: u8, value: u32) -> Result<()> {
        match width {
            1 => self.write_u8(address, value as u8),
            2 => self.write_u16(address, value as u16),
            _ => self.write_u32(address, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockBridgeBuilder;

    #[test]
    fn test_big_endian_reads() {
        let bridge = MockBridgeBuilder::new()
            .bytes(0x8000_1000, &[0x12, 0x34, 0x56, 0x78])
            .attached()
            .build();

        assert_eq!(bridge.read_u8(0x8000_1000).unwrap(), 0x12);
        assert_eq!(bridge.read_u16(0x8000_1000).unwrap(), 0x1234);
        assert_eq!(bridge.read_u32(0x8000_1000).unwrap(), 0x1234_5678);
        assert_eq!(bridge.read_uint(0x8000_1002, 2).unwrap(), 0x5678);
    }

    #[test]
    fn test_write_uint_truncates() {
        let mut bridge = MockBridgeBuilder::new().attached().build();
        bridge.write_uint(0x8000_2000, 1, 0x1FF).unwrap();
        assert_eq!(bridge.byte(0x8000_2000), 0xFF);

        bridge.write_uint(0x8000_2000, 2, 0xABCD).unwrap();
        assert_eq!(bridge.byte(0x8000_2000), 0xAB);
        assert_eq!(bridge.byte(0x8000_2001), 0xCD);
    }
}
