pub mod arm;
pub mod bios;
pub mod cartridge;
pub mod consts;
pub mod dma;
pub mod gba;
pub mod gpu;
pub mod interrupt;
pub mod iodev;
pub mod keypad;
pub mod sysbus;
pub mod timer;

pub use gba::GameBoyAdvance;

pub type Addr = u32;

/// A 16-bit memory-mapped register with decoded storage.
pub trait Mmio16 {
    fn read(&self) -> u16;
    fn write(&mut self, value: u16);
}

#[derive(Debug, thiserror::Error)]
pub enum GbaError {
    #[error("BIOS image too large: {0} bytes (limit 16 KiB)")]
    BiosTooLarge(usize),
    #[error("ROM image too small: {0} bytes (needs a full cartridge header)")]
    RomTooSmall(usize),
}

#[macro_export]
macro_rules! index2d {
    ($x:expr, $y:expr, $w:expr) => {
        $w * $y + $x
    };
    ($t:ty, $x:expr, $y:expr, $w:expr) => {
        (($w as $t) * ($y as $t) + ($x as $t)) as $t
    };
}
