use crate::consts::BIOS_SIZE;
use crate::sysbus::MemoryValue;
use crate::{Addr, GbaError};
use num_traits::FromPrimitive;
use std::cell::Cell;
use std::mem::size_of;

/// Fallback image used when the host supplies no BIOS: an irrelevant branch
/// at the reset vector, the SWI dispatcher at 0x08 and a return-from-IRQ
/// stub at 0x18.
const STUB_BIOS: [u8; 0x40] = [
    0x06, 0x00, 0x00, 0xEA, 0x00, 0x00, 0xA0, 0xE1, //
    0x00, 0x00, 0xA0, 0xE1, 0x00, 0x00, 0xA0, 0xE1, //
    0x00, 0x00, 0xA0, 0xE1, 0x00, 0x00, 0xA0, 0xE1, //
    0x01, 0x00, 0x00, 0xEA, 0x00, 0x00, 0xA0, 0xE1, //
    0x02, 0xF3, 0xA0, 0xE3, 0x0F, 0x50, 0x2D, 0xE9, //
    0x01, 0x03, 0xA0, 0xE3, 0x00, 0xE0, 0x8F, 0xE2, //
    0x04, 0xF0, 0x10, 0xE5, 0x0F, 0x50, 0xBD, 0xE8, //
    0x04, 0xF0, 0x5E, 0xE2, 0x00, 0x00, 0xA0, 0xE1, //
];

pub struct Bios {
    data: Box<[u8]>,
    latch: Cell<u32>,
}

impl Bios {
    pub fn new(image: Option<&[u8]>) -> Result<Self, GbaError> {
        let mut data = vec![0u8; BIOS_SIZE];
        match image {
            Some(bytes) => {
                if bytes.len() > BIOS_SIZE {
                    return Err(GbaError::BiosTooLarge(bytes.len()));
                }
                data[..bytes.len()].copy_from_slice(bytes);
            }
            None => data[..STUB_BIOS.len()].copy_from_slice(&STUB_BIOS),
        }

        Ok(Self {
            data: data.into_boxed_slice(),
            latch: Cell::new(0xE129_F000),
        })
    }

    /// BIOS memory is only readable while the program counter is inside it;
    /// otherwise the last successfully fetched word is returned.
    pub fn read<T: MemoryValue>(&self, pc: Addr, addr: Addr) -> T {
        if pc < BIOS_SIZE as u32 {
            self.latch.set(self.word_at(addr & !0x3));
        }

        let mask = match size_of::<T>() {
            1 => 0xFF,
            2 => 0xFFFF,
            4 => 0xFFFF_FFFF,
            _ => unreachable!(),
        };
        FromPrimitive::from_u32(self.latch.get() >> (8 * (addr & 0x3)) & mask).unwrap()
    }

    fn word_at(&self, offset: Addr) -> u32 {
        let o = offset as usize;
        u32::from_le_bytes([
            self.data[o],
            self.data[o + 1],
            self.data[o + 2],
            self.data[o + 3],
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_bios_vectors() {
        let bios = Bios::new(None).unwrap();
        // Reset vector branches, SWI vector branches, IRQ vector branches.
        assert_eq!(bios.read::<u32>(0, 0x00), 0xEA00_0006);
        assert_eq!(bios.read::<u32>(0, 0x18), 0xEA00_0001);
    }

    #[test]
    fn oversized_image_rejected() {
        let image = vec![0u8; BIOS_SIZE + 1];
        assert!(Bios::new(Some(&image)).is_err());
    }

    #[test]
    fn reads_latch_outside_bios() {
        let bios = Bios::new(None).unwrap();
        let inside = bios.read::<u32>(0, 0x18);
        // Fetch from outside the BIOS returns the latched word, not the
        // requested one.
        assert_eq!(bios.read::<u32>(0x0800_0000, 0x00), inside);
    }
}
