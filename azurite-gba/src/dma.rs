use crate::interrupt::Interrupt;
use crate::Addr;
use log::{debug, warn};

pub const TIMING_IMMEDIATE: u16 = 0;
pub const TIMING_VBLANK: u16 = 1;
pub const TIMING_HBLANK: u16 = 2;
pub const TIMING_SPECIAL: u16 = 3;

/// Channel 3 addresses the whole bus; the lower channels are narrower.
const SRC_MASK: [u32; 4] = [0x07FF_FFFF, 0x0FFF_FFFF, 0x0FFF_FFFF, 0x0FFF_FFFF];
const DST_MASK: [u32; 4] = [0x07FF_FFFF, 0x07FF_FFFF, 0x07FF_FFFF, 0x0FFF_FFFF];
const COUNT_MASK: [u32; 4] = [0x3FFF, 0x3FFF, 0x3FFF, 0xFFFF];

bitfield::bitfield! {
    #[derive(Clone, Copy, Default)]
    pub struct DmaControl(u16);
    impl Debug;
    u16;
    pub dst_adj, _: 6, 5;
    pub src_adj, _: 8, 7;
    pub repeat, _: 9;
    pub transfer_32, _: 10;
    pub gamepak_drq, _: 11;
    pub timing, _: 13, 12;
    pub irq, _: 14;
    pub enabled, set_enabled: 15;
}

#[derive(Clone, Debug)]
pub struct DmaChannel {
    pub id: usize,
    pub src: Addr,
    pub dst: Addr,
    pub count: u16,
    pub ctrl: DmaControl,

    // Latched on the 0-to-1 enable edge and consumed by the transfer.
    pub src_int: Addr,
    pub dst_int: Addr,
    pub count_int: u32,

    /// Set when an immediate transfer is armed and not yet performed.
    pub pending: bool,

    pub irq: Interrupt,
}

impl DmaChannel {
    fn new(id: usize) -> Self {
        debug_assert!(id < 4);
        Self {
            id,
            src: 0,
            dst: 0,
            count: 0,
            ctrl: DmaControl(0),
            src_int: 0,
            dst_int: 0,
            count_int: 0,
            pending: false,
            irq: match id {
                0 => Interrupt::Dma0,
                1 => Interrupt::Dma1,
                2 => Interrupt::Dma2,
                _ => Interrupt::Dma3,
            },
        }
    }

    pub fn write_src_low(&mut self, value: u16) {
        self.src = self.src & 0xFFFF_0000 | value as u32;
    }

    pub fn write_src_high(&mut self, value: u16) {
        self.src = self.src & 0xFFFF | ((value & 0x0FFF) as u32) << 16;
    }

    pub fn write_dst_low(&mut self, value: u16) {
        self.dst = self.dst & 0xFFFF_0000 | value as u32;
    }

    pub fn write_dst_high(&mut self, value: u16) {
        self.dst = self.dst & 0xFFFF | ((value & 0x0FFF) as u32) << 16;
    }

    pub fn write_count(&mut self, value: u16) {
        self.count = value;
    }

    /// A 0-to-1 transition of the enable bit latches the internal copies.
    /// A count of zero stands for the channel's full range.
    pub fn write_ctrl(&mut self, value: u16) {
        let ctrl = DmaControl(value);
        if ctrl.enabled() && !self.ctrl.enabled() {
            debug!(
                "DMA{} enabled: timing={} src={:08X} dst={:08X} count={}",
                self.id,
                ctrl.timing(),
                self.src,
                self.dst,
                self.count
            );
            self.src_int = self.src & SRC_MASK[self.id];
            self.dst_int = self.dst & DST_MASK[self.id];
            self.count_int = self.latch_count();
            self.pending = ctrl.timing() == TIMING_IMMEDIATE;
            if ctrl.timing() == TIMING_SPECIAL {
                warn!("DMA{}: special start timing is not supported", self.id);
            }
        }
        if !ctrl.enabled() {
            self.pending = false;
        }
        self.ctrl = ctrl;
    }

    pub fn ctrl_raw(&self) -> u16 {
        self.ctrl.0
    }

    pub fn latch_count(&self) -> u32 {
        match self.count as u32 & COUNT_MASK[self.id] {
            0 => COUNT_MASK[self.id] + 1,
            n => n,
        }
    }

    pub fn reload_dst(&mut self) {
        self.dst_int = self.dst & DST_MASK[self.id];
    }
}

pub struct Dma {
    pub channels: [DmaChannel; 4],
}

impl Dma {
    pub fn new() -> Self {
        Self {
            channels: [
                DmaChannel::new(0),
                DmaChannel::new(1),
                DmaChannel::new(2),
                DmaChannel::new(3),
            ],
        }
    }

    pub fn write_16(&mut self, channel_id: usize, offset: u32, value: u16) {
        let channel = &mut self.channels[channel_id];
        match offset {
            0x0 => channel.write_src_low(value),
            0x2 => channel.write_src_high(value),
            0x4 => channel.write_dst_low(value),
            0x6 => channel.write_dst_high(value),
            0x8 => channel.write_count(value),
            0xA => channel.write_ctrl(value),
            _ => unreachable!("invalid DMA register offset {offset:X}"),
        }
    }
}

impl Default for Dma {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::sysbus::Sysbus {
    /// True when any channel is armed and its start condition holds.
    pub fn dma_active(&self) -> bool {
        (0..4).any(|id| self.dma_triggered(id))
    }

    fn dma_triggered(&self, id: usize) -> bool {
        let channel = &self.dma.channels[id];
        if !channel.ctrl.enabled() {
            return false;
        }
        match channel.ctrl.timing() {
            TIMING_IMMEDIATE => channel.pending,
            TIMING_VBLANK => self.gpu.vblank_dma,
            TIMING_HBLANK => self.gpu.hblank_dma,
            // Channel 3 video capture; never serviced.
            _ => false,
        }
    }

    /// Serves every triggered channel in index order, then consumes the
    /// video triggers so they only arm one arbitration step.
    pub fn run_dma(&mut self) {
        for id in 0..4 {
            if self.dma_triggered(id) {
                self.dma_transfer(id);
            }
        }
        self.clear_dma_triggers();
    }

    pub fn clear_dma_triggers(&mut self) {
        self.gpu.hblank_dma = false;
        self.gpu.vblank_dma = false;
    }

    fn dma_transfer(&mut self, id: usize) {
        use crate::sysbus::MemoryAccess;

        let channel = &self.dma.channels[id];
        let ctrl = channel.ctrl;
        let word = ctrl.transfer_32();
        let unit: u32 = if word { 4 } else { 2 };
        let width = if word { 2 } else { 1 };
        let mut src = channel.src_int & !(unit - 1);
        let mut dst = channel.dst_int & !(unit - 1);
        let mut count = channel.count_int;

        self.idle_cycles(2);
        while count != 0 {
            self.inc_clock(MemoryAccess::S, src, width);
            self.inc_clock(MemoryAccess::S, dst, width);
            if word {
                let value = self.read::<u32>(src);
                self.write(dst, value);
            } else {
                let value = self.read::<u16>(src);
                self.write(dst, value);
            }

            src = match ctrl.src_adj() {
                0 | 3 => src.wrapping_add(unit),
                1 => src.wrapping_sub(unit),
                _ => src,
            };
            dst = match ctrl.dst_adj() {
                0 | 3 => dst.wrapping_add(unit),
                1 => dst.wrapping_sub(unit),
                _ => dst,
            };
            count -= 1;
        }

        let channel = &mut self.dma.channels[id];
        channel.src_int = src;
        channel.dst_int = dst;
        channel.count_int = 0;
        channel.pending = false;
        if ctrl.repeat() {
            channel.count_int = channel.latch_count();
            if ctrl.dst_adj() == 3 {
                channel.reload_dst();
            }
        } else {
            channel.ctrl.set_enabled(false);
        }
        let irq = channel.irq;
        if ctrl.irq() {
            self.intc.raise(irq);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_edge_latches_internal_registers() {
        let mut channel = DmaChannel::new(0);
        channel.write_src_low(0x1234);
        channel.write_src_high(0xFFFF); // upper nibble masked off
        channel.write_dst_low(0x0100);
        channel.write_dst_high(0x0200);
        channel.write_count(4);

        channel.write_ctrl(0x8000);
        assert_eq!(channel.src_int, 0x0FFF_1234 & SRC_MASK[0]);
        assert_eq!(channel.dst_int, 0x0200_0100);
        assert_eq!(channel.count_int, 4);
        assert!(channel.pending);

        // Re-writing an already-set enable bit must not re-latch.
        channel.src_int = 0xAAAA;
        channel.write_ctrl(0x8000);
        assert_eq!(channel.src_int, 0xAAAA);
    }

    #[test]
    fn zero_count_means_full_range() {
        for (id, expected) in [(0usize, 0x4000u32), (3, 0x1_0000)] {
            let mut channel = DmaChannel::new(id);
            channel.write_count(0);
            channel.write_ctrl(0x8000);
            assert_eq!(channel.count_int, expected);
        }
    }

    #[test]
    fn disable_clears_pending() {
        let mut channel = DmaChannel::new(1);
        channel.write_count(1);
        channel.write_ctrl(0x8000);
        assert!(channel.pending);
        channel.write_ctrl(0);
        assert!(!channel.pending);
        assert!(!channel.ctrl.enabled());
    }
}
