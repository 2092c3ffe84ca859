use modular_bitfield::prelude::*;
use static_assertions::assert_eq_size;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Interrupt {
    LcdVBlank = 0,
    LcdHBlank = 1,
    LcdVCounterMatch = 2,
    Timer0Overflow = 3,
    Timer1Overflow = 4,
    Timer2Overflow = 5,
    Timer3Overflow = 6,
    SerialCommunication = 7,
    Dma0 = 8,
    Dma1 = 9,
    Dma2 = 10,
    Dma3 = 11,
    Keypad = 12,
    GamePak = 13,
}

impl Interrupt {
    pub const fn mask(self) -> u16 {
        1 << self as u16
    }
}

assert_eq_size!(IrqBitMask, u16);

#[bitfield]
#[repr(u16)]
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct IrqBitMask {
    pub lcd_vblank: bool,
    pub lcd_hblank: bool,
    pub lcd_vcounter_match: bool,
    pub timer0_overflow: bool,
    pub timer1_overflow: bool,
    pub timer2_overflow: bool,
    pub timer3_overflow: bool,
    pub serial_communication: bool,
    pub dma0: bool,
    pub dma1: bool,
    pub dma2: bool,
    pub dma3: bool,
    pub keypad: bool,
    pub gamepak: bool,
    #[skip]
    _reserved: B2,
}

/// IE/IF/IME. The request register is raised by the devices and cleared by
/// the guest writing ones to IF.
pub struct InterruptController {
    pub master_enable: bool,
    pub enable: IrqBitMask,
    pub request: IrqBitMask,
}

impl InterruptController {
    pub fn new() -> Self {
        Self {
            master_enable: false,
            enable: IrqBitMask::default(),
            request: IrqBitMask::default(),
        }
    }

    /// IE & IF, the halt wake-up condition. IME does not gate this.
    pub fn any_pending(&self) -> bool {
        u16::from(self.enable) & u16::from(self.request) != 0
    }

    /// True when the CPU should take the IRQ vector.
    pub fn irq_pending(&self) -> bool {
        self.master_enable && self.any_pending()
    }

    pub fn raise(&mut self, interrupt: Interrupt) {
        self.raise_mask(interrupt.mask());
    }

    pub fn raise_mask(&mut self, mask: u16) {
        self.request = IrqBitMask::from(u16::from(self.request) | mask);
    }

    /// IF is write-1-to-clear.
    pub fn acknowledge(&mut self, mask: u16) {
        self.request = IrqBitMask::from(u16::from(self.request) & !mask);
    }
}

impl Default for InterruptController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_one_to_clear() {
        let mut intc = InterruptController::new();
        intc.raise(Interrupt::LcdVBlank);
        intc.raise(Interrupt::Dma0);
        assert_eq!(u16::from(intc.request), 0x0101);

        intc.acknowledge(Interrupt::Dma0.mask());
        assert_eq!(u16::from(intc.request), 0x0001);
        intc.acknowledge(0);
        assert_eq!(u16::from(intc.request), 0x0001);
    }

    #[test]
    fn pending_requires_enable() {
        let mut intc = InterruptController::new();
        intc.raise(Interrupt::LcdHBlank);
        assert!(!intc.any_pending());

        intc.enable = IrqBitMask::from(Interrupt::LcdHBlank.mask());
        assert!(intc.any_pending());
        assert!(!intc.irq_pending());

        intc.master_enable = true;
        assert!(intc.irq_pending());
    }
}
