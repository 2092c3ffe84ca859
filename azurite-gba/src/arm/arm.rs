use super::{Arm7tdmi, Mode, Reg};
use crate::sysbus::{MemoryAccess, Sysbus};
use log::{debug, warn};

impl Arm7tdmi {
    // ARM.3: Branch and Exchange (BX)
    pub(super) fn branch_exchange(&mut self, _bus: &mut Sysbus, instr: u32) {
        let target = self.regs.get_reg_i(instr & 0xF);
        if target & 0x1 != 0 {
            self.regs.pc = target & !0x1;
            self.regs.set_t(true);
        } else {
            self.regs.pc = target & !0x3;
        }
        self.pipe_flush();
    }

    // ARM.4: Branch and Branch with Link (B, BL)
    pub(super) fn branch_link<const LINK: bool>(&mut self, _bus: &mut Sysbus, instr: u32) {
        let offset = instr & 0xFF_FFFF;
        let offset = if offset >> 23 != 0 {
            0xFF00_0000 | offset
        } else {
            offset
        };

        if LINK {
            self.regs.set_reg(Reg::R14, self.regs.pc.wrapping_sub(4));
        }
        self.regs.pc = self.regs.pc.wrapping_add(offset << 2);
        self.pipe_flush();
    }

    // ARM.5: Data Processing
    pub(super) fn data_processing<const IMM: bool, const SET: bool>(
        &mut self,
        bus: &mut Sysbus,
        instr: u32,
    ) {
        let opcode = instr >> 21 & 0xF;
        let reg_op1 = instr >> 16 & 0xF;
        let reg_dst = instr >> 12 & 0xF;

        // S with Rd=15 restores SPSR instead of setting flags.
        let (set_flags, copy_spsr) = if reg_dst == 15 && SET {
            (false, true)
        } else {
            (SET, false)
        };
        // ADC/SBC/RSC take carry from the arithmetic, not the shifter.
        let shifter_flags = set_flags && !matches!(opcode, 0x5..=0x7);

        let mut temp_inc_pc = false;
        let op1 = self.regs.get_reg_i(reg_op1);
        let op2 = if IMM {
            let rotate = instr >> 8 & 0xF;
            let operand = instr & 0xFF;
            if shifter_flags && rotate != 0 {
                self.shift(bus, 3, operand, rotate * 2, true, true)
            } else {
                operand.rotate_right(rotate * 2)
            }
        } else {
            let shift_type = instr >> 5 & 0x3;
            let shift_imm = instr >> 4 & 0x1 == 0;
            let shift = if shift_imm {
                instr >> 7 & 0x1F
            } else {
                // Register-specified shift; PC reads two words ahead of
                // the usual prefetch here.
                let shift = self.regs.get_reg_i(instr >> 8 & 0xF) & 0xFF;
                self.regs.pc = self.regs.pc.wrapping_add(4);
                temp_inc_pc = true;
                shift
            };
            let operand = self.regs.get_reg_i(instr & 0xF);
            self.shift(bus, shift_type, operand, shift, shift_imm, shifter_flags)
        };

        let result = match opcode {
            0x0 | 0x8 => op1 & op2,                     // AND, TST
            0x1 | 0x9 => op1 ^ op2,                     // EOR, TEQ
            0x2 | 0xA => self.sub(op1, op2, set_flags), // SUB, CMP
            0x3 => self.sub(op2, op1, set_flags),       // RSB
            0x4 | 0xB => self.add(op1, op2, set_flags), // ADD, CMN
            0x5 => self.adc(op1, op2, set_flags),       // ADC
            0x6 => self.sbc(op1, op2, set_flags),       // SBC
            0x7 => self.sbc(op2, op1, set_flags),       // RSC
            0xC => op1 | op2,                           // ORR
            0xD => op2,                                 // MOV
            0xE => op1 & !op2,                          // BIC
            0xF => !op2,                                // MVN
            _ => unreachable!(),
        };

        if set_flags {
            self.regs.set_z(result == 0);
            self.regs.set_n(result & 0x8000_0000 != 0);
        } else if copy_spsr {
            self.regs.set_reg(Reg::Cpsr, self.regs.get_reg(Reg::Spsr));
        }

        if opcode & 0xC != 0x8 {
            if reg_dst == 15 {
                self.regs.pc = result;
                self.pipe_flush();
                return;
            }
            self.regs.set_reg_i(reg_dst, result);
        }
        if temp_inc_pc {
            self.regs.pc = self.regs.pc.wrapping_sub(4);
        }
    }

    // ARM.6: PSR Transfer (MRS, MSR)
    pub(super) fn psr_transfer<const IMM: bool, const SPSR: bool, const MSR: bool>(
        &mut self,
        _bus: &mut Sysbus,
        instr: u32,
    ) {
        let status_reg = if SPSR { Reg::Spsr } else { Reg::Cpsr };

        if MSR {
            let mut mask = 0u32;
            if instr >> 19 & 0x1 != 0 {
                mask |= 0xFF00_0000; // flags
            }
            if instr >> 18 & 0x1 != 0 {
                mask |= 0x00FF_0000; // status
            }
            if instr >> 17 & 0x1 != 0 {
                mask |= 0x0000_FF00; // extension
            }
            if self.regs.get_mode() != Mode::User && instr >> 16 & 0x1 != 0 {
                mask |= 0x0000_00FF; // control
            }
            let operand = if IMM {
                let rotate = instr >> 8 & 0xF;
                (instr & 0xFF).rotate_right(rotate * 2)
            } else {
                self.regs.get_reg_i(instr & 0xF)
            };
            let value = self.regs.get_reg(status_reg) & !mask | operand & mask;
            self.regs.set_reg(status_reg, value);
        } else {
            self.regs
                .set_reg_i(instr >> 12 & 0xF, self.regs.get_reg(status_reg));
        }
    }

    // ARM.7: Multiply and Multiply-Accumulate (MUL, MLA)
    pub(super) fn multiply<const ACC: bool, const SET: bool>(
        &mut self,
        bus: &mut Sysbus,
        instr: u32,
    ) {
        let reg_dst = instr >> 16 & 0xF;
        let addend = self.regs.get_reg_i(instr >> 12 & 0xF);
        let op1 = self.regs.get_reg_i(instr >> 8 & 0xF);
        let op2 = self.regs.get_reg_i(instr & 0xF);

        self.mul_cycles(bus, op1, true);
        let result = if ACC {
            self.internal(bus);
            op1.wrapping_mul(op2).wrapping_add(addend)
        } else {
            op1.wrapping_mul(op2)
        };
        if SET {
            self.regs.set_n(result & 0x8000_0000 != 0);
            self.regs.set_z(result == 0);
        }
        self.regs.set_reg_i(reg_dst, result);
    }

    // ARM.8: Multiply Long (UMULL, UMLAL, SMULL, SMLAL)
    pub(super) fn multiply_long<const SIGNED: bool, const ACC: bool, const SET: bool>(
        &mut self,
        bus: &mut Sysbus,
        instr: u32,
    ) {
        let reg_hi = instr >> 16 & 0xF;
        let reg_lo = instr >> 12 & 0xF;
        let op1 = self.regs.get_reg_i(instr >> 8 & 0xF);
        let op2 = self.regs.get_reg_i(instr & 0xF);

        self.internal(bus);
        self.mul_cycles(bus, op1, SIGNED);
        let mut result = if SIGNED {
            (op2 as i32 as i64).wrapping_mul(op1 as i32 as i64) as u64
        } else {
            (op2 as u64).wrapping_mul(op1 as u64)
        };
        if ACC {
            self.internal(bus);
            let addend =
                (self.regs.get_reg_i(reg_hi) as u64) << 32 | self.regs.get_reg_i(reg_lo) as u64;
            result = result.wrapping_add(addend);
        }
        if SET {
            self.regs.set_n(result & 0x8000_0000_0000_0000 != 0);
            self.regs.set_z(result == 0);
        }
        self.regs.set_reg_i(reg_lo, result as u32);
        self.regs.set_reg_i(reg_hi, (result >> 32) as u32);
    }

    // ARM.9: Single Data Transfer (LDR, STR)
    pub(super) fn single_transfer<
        const SHIFTED: bool,
        const PRE: bool,
        const ADD: bool,
        const BYTE: bool,
        const WRITEBACK: bool,
        const LOAD: bool,
    >(
        &mut self,
        bus: &mut Sysbus,
        instr: u32,
    ) {
        let mut write_back = WRITEBACK || !PRE;
        let reg_base = instr >> 16 & 0xF;
        let base = self.regs.get_reg_i(reg_base);
        let reg_sd = instr >> 12 & 0xF;

        let offset = if SHIFTED {
            let shift = instr >> 7 & 0x1F;
            let shift_type = instr >> 5 & 0x3;
            let operand = self.regs.get_reg_i(instr & 0xF);
            self.shift(bus, shift_type, operand, shift, true, false)
        } else {
            instr & 0xFFF
        };
        let offset_applied = if ADD {
            base.wrapping_add(offset)
        } else {
            base.wrapping_sub(offset)
        };
        let addr = if PRE { offset_applied } else { base };

        if LOAD {
            let access = if reg_sd == 15 {
                MemoryAccess::N
            } else {
                MemoryAccess::S
            };
            let value = if BYTE {
                self.read::<u8>(bus, access, addr) as u32
            } else {
                self.read::<u32>(bus, access, addr & !0x3)
                    .rotate_right((addr & 0x3) * 8)
            };
            self.internal(bus);
            if reg_sd == reg_base {
                write_back = false;
            }
            if write_back {
                self.regs.set_reg_i(reg_base, offset_applied);
            }
            if reg_sd == 15 {
                self.regs.pc = value;
                self.pipe_flush();
            } else {
                self.regs.set_reg_i(reg_sd, value);
            }
        } else {
            let value = self.regs.get_reg_i(reg_sd);
            // A stored PC reads one word further ahead.
            let value = if reg_sd == 15 {
                value.wrapping_add(4)
            } else {
                value
            };
            if BYTE {
                self.write::<u8>(bus, MemoryAccess::N, addr, value as u8);
            } else {
                self.write::<u32>(bus, MemoryAccess::N, addr & !0x3, value);
            }
            if write_back {
                self.regs.set_reg_i(reg_base, offset_applied);
            }
        }
    }

    // ARM.10: Halfword and Signed Data Transfer (STRH, LDRH, LDRSB, LDRSH)
    pub(super) fn halfword_transfer<
        const PRE: bool,
        const ADD: bool,
        const IMM: bool,
        const WRITEBACK: bool,
        const LOAD: bool,
        const SIGNED: bool,
        const HALF: bool,
    >(
        &mut self,
        bus: &mut Sysbus,
        instr: u32,
    ) {
        let mut write_back = WRITEBACK || !PRE;
        let reg_base = instr >> 16 & 0xF;
        let base = self.regs.get_reg_i(reg_base);
        let reg_sd = instr >> 12 & 0xF;

        let offset = if IMM {
            (instr >> 8 & 0xF) << 4 | instr & 0xF
        } else {
            self.regs.get_reg_i(instr & 0xF)
        };
        let offset_applied = if ADD {
            base.wrapping_add(offset)
        } else {
            base.wrapping_sub(offset)
        };
        let addr = if PRE { offset_applied } else { base };

        if LOAD {
            if reg_sd == reg_base {
                write_back = false;
            }
            let access = if reg_sd == 15 {
                MemoryAccess::N
            } else {
                MemoryAccess::S
            };
            let value = match (SIGNED, HALF) {
                (false, true) => (self.read::<u16>(bus, access, addr & !0x1) as u32)
                    .rotate_right((addr & 0x1) * 8),
                (true, false) => self.read::<u8>(bus, access, addr) as i8 as u32,
                (true, true) if addr & 0x1 == 1 => {
                    self.read::<u8>(bus, access, addr) as i8 as u32
                }
                (true, true) => self.read::<u16>(bus, access, addr) as i16 as u32,
                (false, false) => unreachable!(),
            };
            self.internal(bus);
            if write_back {
                self.regs.set_reg_i(reg_base, offset_applied);
            }
            if reg_sd == 15 {
                self.regs.pc = value;
                self.pipe_flush();
            } else {
                self.regs.set_reg_i(reg_sd, value);
            }
        } else {
            let value = self.regs.get_reg_i(reg_sd);
            self.write::<u16>(bus, MemoryAccess::N, addr & !0x1, value as u16);
            if write_back {
                self.regs.set_reg_i(reg_base, offset_applied);
            }
        }
    }

    // ARM.11: Block Data Transfer (LDM, STM)
    pub(super) fn block_transfer<
        const PRE: bool,
        const ADD: bool,
        const PSR: bool,
        const WRITEBACK: bool,
        const LOAD: bool,
    >(
        &mut self,
        bus: &mut Sysbus,
        instr: u32,
    ) {
        let pre_offset = PRE ^ !ADD;
        let reg_base = instr >> 16 & 0xF;
        let base = self.regs.get_reg_i(reg_base);
        let base_offset = base & 0x3;
        let base = base - base_offset;
        let mut r_list = (instr & 0xFFFF) as u16;
        let write_back = WRITEBACK && !(LOAD && r_list & (1 << reg_base) != 0);
        let actual_mode = self.regs.get_mode();
        if PSR && !(LOAD && r_list & 0x8000 != 0) {
            self.regs.set_mode(Mode::User);
        }

        let num_regs = r_list.count_ones();
        let start_addr = if ADD {
            base
        } else {
            base.wrapping_sub(num_regs * 4)
        };
        let mut addr = start_addr;
        let final_addr = if ADD {
            addr.wrapping_add(4 * num_regs)
        } else {
            start_addr
        }
        .wrapping_add(base_offset);

        // An empty register list transfers PC and moves the base by 0x40.
        let (final_addr, inc_amount) = if num_regs == 0 {
            match ADD {
                true => (final_addr.wrapping_add(0x40), 0x40),
                false => (final_addr.wrapping_sub(0x40), 0x40),
            }
        } else {
            (final_addr, 4)
        };

        let mut loaded_pc = false;
        let mut exec = |cpu: &mut Self, bus: &mut Sysbus, addr, reg, last_access: bool| {
            if LOAD {
                let value = cpu.read::<u32>(bus, MemoryAccess::S, addr);
                if write_back {
                    cpu.regs.set_reg_i(reg_base, final_addr);
                }
                if last_access {
                    cpu.internal(bus);
                }
                if reg == 15 {
                    if PSR {
                        cpu.regs.restore_cpsr();
                    }
                    cpu.regs.pc = value;
                    loaded_pc = true;
                } else {
                    cpu.regs.set_reg_i(reg, value);
                }
            } else {
                let value = cpu.regs.get_reg_i(reg);
                let access = if last_access {
                    MemoryAccess::N
                } else {
                    MemoryAccess::S
                };
                let value = if reg == 15 {
                    value.wrapping_add(4)
                } else {
                    value
                };
                cpu.write::<u32>(bus, access, addr, value);
                if write_back {
                    cpu.regs.set_reg_i(reg_base, final_addr);
                }
            }
        };

        if num_regs == 0 {
            let addr = match (ADD, PRE) {
                (true, true) => start_addr.wrapping_add(4),
                (true, false) => start_addr,
                (false, true) => start_addr.wrapping_sub(0x40),
                (false, false) => start_addr.wrapping_sub(0x3C),
            };
            exec(self, bus, addr, 15, true);
        } else {
            let mut calc_addr = |addr: &mut u32| {
                if pre_offset {
                    *addr = addr.wrapping_add(inc_amount);
                    *addr
                } else {
                    let old = *addr;
                    *addr = addr.wrapping_add(inc_amount);
                    old
                }
            };

            let mut reg = 0;
            while r_list != 0x1 {
                if r_list & 0x1 != 0 {
                    let a = calc_addr(&mut addr);
                    exec(self, bus, a, reg, false);
                }
                reg += 1;
                r_list >>= 1;
            }
            let a = calc_addr(&mut addr);
            exec(self, bus, a, reg, true);
        }

        self.regs.set_mode(actual_mode);
        if loaded_pc {
            self.pipe_flush();
        }
    }

    // ARM.12: Single Data Swap (SWP)
    pub(super) fn single_swap<const BYTE: bool>(&mut self, bus: &mut Sysbus, instr: u32) {
        let base = self.regs.get_reg_i(instr >> 16 & 0xF);
        let reg_dst = instr >> 12 & 0xF;
        let src = self.regs.get_reg_i(instr & 0xF);

        let value = if BYTE {
            let value = self.read::<u8>(bus, MemoryAccess::N, base) as u32;
            self.write::<u8>(bus, MemoryAccess::S, base, src as u8);
            value
        } else {
            let value = self
                .read::<u32>(bus, MemoryAccess::N, base & !0x3)
                .rotate_right((base & 0x3) * 8);
            self.write::<u32>(bus, MemoryAccess::S, base & !0x3, src);
            value
        };
        self.regs.set_reg_i(reg_dst, value);
        self.internal(bus);
    }

    // ARM.13: Software Interrupt (SWI)
    pub(super) fn arm_software_interrupt(&mut self, bus: &mut Sysbus, instr: u32) {
        if bus.hle {
            self.hle_swi(bus, instr >> 16 & 0xFF);
        } else {
            self.regs.change_mode(Mode::Supervisor);
            self.regs.set_reg(Reg::R14, self.regs.pc.wrapping_sub(4));
            self.regs.set_i(true);
            self.regs.pc = 0x8;
            self.pipe_flush();
        }
    }

    // ARM.14-16: coprocessor transfers are absent on the GBA and trap to
    // the undefined-instruction vector.
    pub(super) fn coprocessor(&mut self, _bus: &mut Sysbus, instr: u32) {
        warn!(
            "coprocessor instruction {instr:08X} at {:08X}",
            self.regs.pc.wrapping_sub(8)
        );
        self.exception_undefined(self.regs.pc.wrapping_sub(4));
    }

    // ARM.17: Undefined
    pub(super) fn arm_undefined(&mut self, _bus: &mut Sysbus, instr: u32) {
        debug!(
            "undefined ARM instruction {instr:08X} at {:08X}",
            self.regs.pc.wrapping_sub(8)
        );
        self.exception_undefined(self.regs.pc.wrapping_sub(4));
    }
}
