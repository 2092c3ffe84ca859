use crate::consts::*;
use crate::sysbus::{HaltState, Sysbus, WaitControl};
use crate::{Addr, Mmio16};
use log::debug;

const REG_IF_LO: Addr = REG_IF;
const REG_IF_HI: Addr = REG_IF + 1;

impl Sysbus {
    /// Folds the `0x040n0800` mirror and strips the region bits.
    fn io_offset(addr: Addr) -> Addr {
        let offset = addr & 0x00FF_FFFF;
        if offset & 0xFFFF == 0x800 {
            0x800
        } else {
            offset
        }
    }

    pub(crate) fn read_io8(&self, addr: Addr) -> u8 {
        let offset = Self::io_offset(addr);
        if offset >= 0x400 && offset != 0x800 {
            debug!("read from unmapped I/O address {addr:08X}");
            return 0;
        }
        let value = self.read_io16(IOMEM_ADDR + (offset & !0x1));
        if addr & 0x1 != 0 {
            (value >> 8) as u8
        } else {
            value as u8
        }
    }

    pub(crate) fn write_io8(&mut self, addr: Addr, value: u8) {
        let offset = Self::io_offset(addr);
        if offset >= 0x400 && offset != 0x800 {
            debug!("write to unmapped I/O address {addr:08X}");
            return;
        }
        match IOMEM_ADDR + offset {
            // IF is write-1-to-clear per byte; splicing through a 16-bit
            // read-modify-write would acknowledge the other half too.
            REG_IF_LO => self.intc.acknowledge(value as u16),
            REG_IF_HI => self.intc.acknowledge((value as u16) << 8),
            REG_POSTFLG => self.post_boot_flag = value & 1 != 0,
            REG_HALTCNT => self.write_haltcnt(value),
            _ => {
                let current = self.peek_io16(IOMEM_ADDR + (offset & !0x1));
                let merged = if addr & 0x1 != 0 {
                    current & 0x00FF | (value as u16) << 8
                } else {
                    current & 0xFF00 | value as u16
                };
                self.write_io16(IOMEM_ADDR + (offset & !0x1), merged);
            }
        }
    }

    /// Guest-visible halfword read; write-only registers read zero.
    pub(crate) fn read_io16(&self, addr: Addr) -> u16 {
        match addr {
            REG_DISPCNT => self.gpu.dispcnt.read(),
            REG_DISPSTAT => self.gpu.dispstat.read(),
            REG_VCOUNT => self.gpu.vcount as u16,
            REG_BG0CNT => self.gpu.bgcnt[0].read(),
            REG_BG1CNT => self.gpu.bgcnt[1].read(),
            REG_BG2CNT => self.gpu.bgcnt[2].read(),
            REG_BG3CNT => self.gpu.bgcnt[3].read(),
            REG_WININ => self.gpu.win0.flags.bits() | self.gpu.win1.flags.bits() << 8,
            REG_WINOUT => self.gpu.winout_flags.bits() | self.gpu.winobj_flags.bits() << 8,
            REG_BLDCNT => self.gpu.bldcnt.read(),
            REG_BLDALPHA => self.gpu.bldalpha.read(),
            DMA_BASE..=REG_DMA3CNT_H => {
                let offset = addr - DMA_BASE;
                let channel = (offset / 12) as usize;
                match offset % 12 {
                    0xA => self.dma.channels[channel].ctrl_raw(),
                    _ => 0,
                }
            }
            TIMER_BASE..=REG_TM3CNT_H => {
                let id = ((addr - TIMER_BASE) / 4) as usize;
                match addr & 0x3 {
                    0x0 => self.timers.read_count(id),
                    _ => self.timers.read_ctl(id),
                }
            }
            REG_KEYINPUT => self.keypad.keyinput.bits(),
            REG_KEYCNT => self.keypad.keycnt,
            REG_IE => self.intc.enable.into(),
            REG_IF => self.intc.request.into(),
            REG_WAITCNT => self.waitcnt.into(),
            REG_IME => self.intc.master_enable as u16,
            REG_POSTFLG => self.post_boot_flag as u16,
            _ => {
                debug!("read from unimplemented I/O register {addr:08X}");
                0
            }
        }
    }

    /// Like `read_io16`, but write-only registers return their stored
    /// values so byte writes can splice into them. No side effects.
    fn peek_io16(&self, addr: Addr) -> u16 {
        match addr {
            REG_BG0HOFS => self.gpu.bg_hofs[0],
            REG_BG0VOFS => self.gpu.bg_vofs[0],
            REG_BG1HOFS => self.gpu.bg_hofs[1],
            REG_BG1VOFS => self.gpu.bg_vofs[1],
            REG_BG2HOFS => self.gpu.bg_hofs[2],
            REG_BG2VOFS => self.gpu.bg_vofs[2],
            REG_BG3HOFS => self.gpu.bg_hofs[3],
            REG_BG3VOFS => self.gpu.bg_vofs[3],
            REG_BG2PA => self.gpu.bg_aff[0].pa as u16,
            REG_BG2PB => self.gpu.bg_aff[0].pb as u16,
            REG_BG2PC => self.gpu.bg_aff[0].pc as u16,
            REG_BG2PD => self.gpu.bg_aff[0].pd as u16,
            REG_BG3PA => self.gpu.bg_aff[1].pa as u16,
            REG_BG3PB => self.gpu.bg_aff[1].pb as u16,
            REG_BG3PC => self.gpu.bg_aff[1].pc as u16,
            REG_BG3PD => self.gpu.bg_aff[1].pd as u16,
            REG_BG2X_L => self.gpu.bg_aff[0].x as u16,
            REG_BG2X_H => (self.gpu.bg_aff[0].x >> 16) as u16 & 0x0FFF,
            REG_BG2Y_L => self.gpu.bg_aff[0].y as u16,
            REG_BG2Y_H => (self.gpu.bg_aff[0].y >> 16) as u16 & 0x0FFF,
            REG_BG3X_L => self.gpu.bg_aff[1].x as u16,
            REG_BG3X_H => (self.gpu.bg_aff[1].x >> 16) as u16 & 0x0FFF,
            REG_BG3Y_L => self.gpu.bg_aff[1].y as u16,
            REG_BG3Y_H => (self.gpu.bg_aff[1].y >> 16) as u16 & 0x0FFF,
            REG_WIN0H => self.gpu.win0.right as u16 | (self.gpu.win0.left as u16) << 8,
            REG_WIN1H => self.gpu.win1.right as u16 | (self.gpu.win1.left as u16) << 8,
            REG_WIN0V => self.gpu.win0.bottom as u16 | (self.gpu.win0.top as u16) << 8,
            REG_WIN1V => self.gpu.win1.bottom as u16 | (self.gpu.win1.top as u16) << 8,
            REG_MOSAIC => self.gpu.mosaic.into(),
            REG_BLDY => self.gpu.bldy,
            DMA_BASE..=REG_DMA3CNT_H => {
                let offset = addr - DMA_BASE;
                let channel = &self.dma.channels[(offset / 12) as usize];
                match offset % 12 {
                    0x0 => channel.src as u16,
                    0x2 => (channel.src >> 16) as u16,
                    0x4 => channel.dst as u16,
                    0x6 => (channel.dst >> 16) as u16,
                    0x8 => channel.count,
                    _ => channel.ctrl_raw(),
                }
            }
            TIMER_BASE..=REG_TM3CNT_H if addr & 0x3 == 0 => {
                self.timers.reload_value(((addr - TIMER_BASE) / 4) as usize)
            }
            _ => self.read_io16(addr),
        }
    }

    pub(crate) fn write_io16(&mut self, addr: Addr, value: u16) {
        match addr {
            REG_DISPCNT => self.gpu.write_dispcnt(value),
            REG_DISPSTAT => self.gpu.dispstat.write(value),
            REG_VCOUNT => (),
            REG_BG0CNT => self.gpu.bgcnt[0].write(value),
            REG_BG1CNT => self.gpu.bgcnt[1].write(value),
            REG_BG2CNT => self.gpu.bgcnt[2].write(value),
            REG_BG3CNT => self.gpu.bgcnt[3].write(value),
            REG_BG0HOFS => self.gpu.bg_hofs[0] = value & 0x1FF,
            REG_BG0VOFS => self.gpu.bg_vofs[0] = value & 0x1FF,
            REG_BG1HOFS => self.gpu.bg_hofs[1] = value & 0x1FF,
            REG_BG1VOFS => self.gpu.bg_vofs[1] = value & 0x1FF,
            REG_BG2HOFS => self.gpu.bg_hofs[2] = value & 0x1FF,
            REG_BG2VOFS => self.gpu.bg_vofs[2] = value & 0x1FF,
            REG_BG3HOFS => self.gpu.bg_hofs[3] = value & 0x1FF,
            REG_BG3VOFS => self.gpu.bg_vofs[3] = value & 0x1FF,
            REG_BG2PA => self.gpu.bg_aff[0].pa = value as i16,
            REG_BG2PB => self.gpu.bg_aff[0].pb = value as i16,
            REG_BG2PC => self.gpu.bg_aff[0].pc = value as i16,
            REG_BG2PD => self.gpu.bg_aff[0].pd = value as i16,
            REG_BG3PA => self.gpu.bg_aff[1].pa = value as i16,
            REG_BG3PB => self.gpu.bg_aff[1].pb = value as i16,
            REG_BG3PC => self.gpu.bg_aff[1].pc = value as i16,
            REG_BG3PD => self.gpu.bg_aff[1].pd = value as i16,
            REG_BG2X_L => self.gpu.bg_aff[0].write_x_low(value),
            REG_BG2X_H => self.gpu.bg_aff[0].write_x_high(value),
            REG_BG2Y_L => self.gpu.bg_aff[0].write_y_low(value),
            REG_BG2Y_H => self.gpu.bg_aff[0].write_y_high(value),
            REG_BG3X_L => self.gpu.bg_aff[1].write_x_low(value),
            REG_BG3X_H => self.gpu.bg_aff[1].write_x_high(value),
            REG_BG3Y_L => self.gpu.bg_aff[1].write_y_low(value),
            REG_BG3Y_H => self.gpu.bg_aff[1].write_y_high(value),
            REG_WIN0H => {
                self.gpu.win0.right = value as u8;
                self.gpu.win0.left = (value >> 8) as u8;
            }
            REG_WIN1H => {
                self.gpu.win1.right = value as u8;
                self.gpu.win1.left = (value >> 8) as u8;
            }
            REG_WIN0V => {
                self.gpu.win0.bottom = value as u8;
                self.gpu.win0.top = (value >> 8) as u8;
            }
            REG_WIN1V => {
                self.gpu.win1.bottom = value as u8;
                self.gpu.win1.top = (value >> 8) as u8;
            }
            REG_WININ => {
                let value = value & !0xC0C0;
                self.gpu.win0.flags = (value & 0xFF).into();
                self.gpu.win1.flags = (value >> 8).into();
            }
            REG_WINOUT => {
                let value = value & !0xC0C0;
                self.gpu.winout_flags = (value & 0xFF).into();
                self.gpu.winobj_flags = (value >> 8).into();
            }
            REG_MOSAIC => self.gpu.mosaic = value.into(),
            REG_BLDCNT => self.gpu.bldcnt.write(value),
            REG_BLDALPHA => self.gpu.bldalpha.write(value),
            REG_BLDY => self.gpu.bldy = (value & 0x1F).min(16),
            DMA_BASE..=REG_DMA3CNT_H => {
                let offset = addr - DMA_BASE;
                self.dma.write_16((offset / 12) as usize, offset % 12, value);
            }
            TIMER_BASE..=REG_TM3CNT_H => {
                let id = ((addr - TIMER_BASE) / 4) as usize;
                match addr & 0x3 {
                    0x0 => self.timers.write_reload(id, value),
                    _ => self.timers.write_ctl(id, value),
                }
            }
            REG_KEYINPUT => (),
            REG_KEYCNT => self.keypad.keycnt = value & 0xC3FF,
            REG_IE => self.intc.enable = (value & 0x3FFF).into(),
            REG_IF => self.intc.acknowledge(value),
            REG_WAITCNT => {
                self.waitcnt = WaitControl::from(value);
                self.update_cycle_lut();
            }
            REG_IME => self.intc.master_enable = value & 1 != 0,
            REG_POSTFLG => {
                self.post_boot_flag = value & 1 != 0;
                self.write_haltcnt((value >> 8) as u8);
            }
            _ => debug!("write to unimplemented I/O register {addr:08X} = {value:04X}"),
        }
    }

    fn write_haltcnt(&mut self, value: u8) {
        self.haltcnt = if value & 0x80 != 0 {
            HaltState::Stop
        } else {
            HaltState::Halt
        };
    }
}

#[cfg(test)]
mod tests {
    use crate::sysbus::Sysbus;

    fn make_bus() -> Sysbus {
        let mut rom = vec![0u8; 0x200];
        rom[0xA0..0xAC].copy_from_slice(b"TESTCART\0\0\0\0");
        let checksum = rom[0xA0..=0xBC]
            .iter()
            .cloned()
            .fold(0u8, u8::wrapping_sub)
            .wrapping_sub(0x19);
        rom[0xBD] = checksum;
        Sysbus::new(rom, None, true).unwrap()
    }

    #[test]
    fn interrupt_flag_write_one_to_clear() {
        let mut bus = make_bus();
        bus.intc.raise_mask(0x0105);
        assert_eq!(bus.read::<u16>(0x0400_0202), 0x0105);

        bus.write::<u16>(0x0400_0202, 0x0004);
        assert_eq!(bus.read::<u16>(0x0400_0202), 0x0101);

        // Byte writes only acknowledge their own half.
        bus.write::<u8>(0x0400_0203, 0x01);
        assert_eq!(bus.read::<u16>(0x0400_0202), 0x0001);
        bus.write::<u8>(0x0400_0202, 0x01);
        assert_eq!(bus.read::<u16>(0x0400_0202), 0x0000);
    }

    #[test]
    fn io_mirror_at_0800() {
        let mut bus = make_bus();
        assert_eq!(
            bus.read::<u16>(0x04AB_0800),
            bus.read::<u16>(0x0400_0800)
        );
        // Writes through the mirror are folded (and dropped: no register).
        bus.write::<u16>(0x04CD_0800, 0x1234);
        assert_eq!(bus.read::<u16>(0x0400_0800), 0);
    }

    #[test]
    fn keyinput_reads_released() {
        let bus = make_bus();
        assert_eq!(bus.read::<u16>(0x0400_0130), 0x03FF);
    }

    #[test]
    fn byte_writes_splice_into_halfword_registers() {
        let mut bus = make_bus();
        // BG0HOFS is write-only; bytes must still merge with the shadow.
        bus.write::<u8>(0x0400_0010, 0x34);
        bus.write::<u8>(0x0400_0011, 0x01);
        assert_eq!(bus.gpu.bg_hofs[0], 0x134);
        assert_eq!(bus.read::<u16>(0x0400_0010), 0);

        bus.write::<u32>(0x0400_0028, 0x0812_3456);
        assert_eq!(bus.gpu.bg_aff[0].x, 0x0812_3456u32 as i32 | !0x0FFF_FFFF);
    }

    #[test]
    fn dispstat_flag_bits_read_only() {
        let mut bus = make_bus();
        bus.write::<u16>(0x0400_0004, 0xFF3F);
        let dispstat = bus.read::<u16>(0x0400_0004);
        assert_eq!(dispstat & 0x7, 0); // flags unaffected
        assert_eq!(dispstat & 0x38, 0x38); // irq enables stick
        assert_eq!(dispstat >> 8, 0xFF);
    }

    #[test]
    fn vcount_is_read_only() {
        let mut bus = make_bus();
        bus.write::<u16>(0x0400_0006, 0x1234);
        assert_eq!(bus.read::<u16>(0x0400_0006), 0);
    }

    #[test]
    fn ime_and_ie() {
        let mut bus = make_bus();
        bus.write::<u16>(0x0400_0208, 1);
        bus.write::<u16>(0x0400_0200, 0xFFFF);
        assert!(bus.intc.master_enable);
        assert_eq!(bus.read::<u16>(0x0400_0200), 0x3FFF);
    }

    #[test]
    fn timer_reload_and_count_are_distinct() {
        let mut bus = make_bus();
        bus.write::<u16>(0x0400_0100, 0xBEEF);
        // Count reads zero until the timer is enabled.
        assert_eq!(bus.read::<u16>(0x0400_0100), 0);
        bus.write::<u16>(0x0400_0102, 0x80);
        assert_eq!(bus.read::<u16>(0x0400_0100), 0xBEEF);
    }

    #[test]
    fn haltcnt_byte_write_halts() {
        let mut bus = make_bus();
        bus.write::<u8>(0x0400_0301, 0x00);
        assert_eq!(bus.haltcnt, crate::sysbus::HaltState::Halt);
        bus.haltcnt = crate::sysbus::HaltState::Running;
        bus.write::<u8>(0x0400_0301, 0x80);
        assert_eq!(bus.haltcnt, crate::sysbus::HaltState::Stop);
        // POSTFLG byte write must not halt.
        bus.haltcnt = crate::sysbus::HaltState::Running;
        bus.write::<u8>(0x0400_0300, 1);
        assert_eq!(bus.haltcnt, crate::sysbus::HaltState::Running);
        assert!(bus.post_boot_flag);
    }
}
