use bitflags::bitflags;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reg {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13, // SP
    R14 = 14, // LR
    R15 = 15, // PC
    Cpsr,
    Spsr,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Mode {
    User = 0b10000,
    Fiq = 0b10001,
    Irq = 0b10010,
    Supervisor = 0b10011,
    Abort = 0b10111,
    Undefined = 0b11011,
    System = 0b11111,
}

bitflags! {
    struct StatusRegister: u32 {
        const N = 0x8000_0000;
        const Z = 0x4000_0000;
        const C = 0x2000_0000;
        const V = 0x1000_0000;
        const Q = 0x0800_0000;
        const I = 0x0000_0080;
        const F = 0x0000_0040;
        const T = 0x0000_0020;
        const M4 = 0x0000_0010;
        const M3 = 0x0000_0008;
        const M2 = 0x0000_0004;
        const M1 = 0x0000_0002;
        const M0 = 0x0000_0001;
    }
}

impl StatusRegister {
    fn get_mode(&self) -> Mode {
        match self.bits() & 0x1F {
            m if m == Mode::User as u32 => Mode::User,
            m if m == Mode::Fiq as u32 => Mode::Fiq,
            m if m == Mode::Irq as u32 => Mode::Irq,
            m if m == Mode::Supervisor as u32 => Mode::Supervisor,
            m if m == Mode::Abort as u32 => Mode::Abort,
            m if m == Mode::Undefined as u32 => Mode::Undefined,
            m if m == Mode::System as u32 => Mode::System,
            bits => panic!("invalid CPU mode {bits:05b}"),
        }
    }

    fn set_mode(&mut self, mode: Mode) {
        self.bits = self.bits() & !0x1F | mode as u32;
    }
}

/// Flat banked storage; every access resolves through the current mode, so a
/// mode switch is nothing but a CPSR update.
#[derive(Clone)]
pub struct Registers {
    usr: [u32; 15],
    fiq: [u32; 7],
    svc: [u32; 2],
    abt: [u32; 2],
    irq: [u32; 2],
    und: [u32; 2],
    pub pc: u32,
    cpsr: StatusRegister,
    spsr: [StatusRegister; 5],
}

impl Registers {
    pub fn new() -> Self {
        let mut regs = Self {
            usr: [0; 15],
            fiq: [0; 7],
            svc: [0; 2],
            abt: [0; 2],
            irq: [0; 2],
            und: [0; 2],
            pc: 0,
            // Hardware reset state: Supervisor with IRQ and FIQ masked.
            cpsr: StatusRegister::from_bits_truncate(0xD3),
            spsr: [StatusRegister::from_bits_truncate(Mode::User as u32); 5],
        };
        regs.usr[13] = 0x0300_7F00;
        regs.svc[0] = 0x0300_7FE0;
        regs.irq[0] = 0x0300_7FA0;
        regs
    }

    /// State the BIOS boot code would leave behind before jumping to the
    /// cartridge entry point.
    pub fn skip_bios(&mut self) {
        self.pc = 0x0800_0000;
        self.usr[13] = 0x0300_7F00;
        self.svc[0] = 0x0300_7FE0;
        self.irq[0] = 0x0300_7FA0;
        self.cpsr = StatusRegister::from_bits_truncate(Mode::User as u32);
    }

    pub fn get_reg(&self, reg: Reg) -> u32 {
        use Reg::*;
        let mode = self.cpsr.get_mode();
        match reg {
            R0 | R1 | R2 | R3 | R4 | R5 | R6 | R7 => self.usr[reg as usize],
            R8 | R9 | R10 | R11 | R12 => match mode {
                Mode::Fiq => self.fiq[reg as usize - 8],
                _ => self.usr[reg as usize],
            },
            R13 | R14 => match mode {
                Mode::Fiq => self.fiq[reg as usize - 8],
                Mode::Supervisor => self.svc[reg as usize - 13],
                Mode::Abort => self.abt[reg as usize - 13],
                Mode::Irq => self.irq[reg as usize - 13],
                Mode::Undefined => self.und[reg as usize - 13],
                _ => self.usr[reg as usize],
            },
            R15 => self.pc,
            Cpsr => self.cpsr.bits(),
            Spsr => match mode {
                Mode::Fiq => self.spsr[0].bits(),
                Mode::Supervisor => self.spsr[1].bits(),
                Mode::Abort => self.spsr[2].bits(),
                Mode::Irq => self.spsr[3].bits(),
                Mode::Undefined => self.spsr[4].bits(),
                _ => self.cpsr.bits(),
            },
        }
    }

    pub fn set_reg(&mut self, reg: Reg, value: u32) {
        use Reg::*;
        let mode = self.cpsr.get_mode();
        match reg {
            R0 | R1 | R2 | R3 | R4 | R5 | R6 | R7 => self.usr[reg as usize] = value,
            R8 | R9 | R10 | R11 | R12 => match mode {
                Mode::Fiq => self.fiq[reg as usize - 8] = value,
                _ => self.usr[reg as usize] = value,
            },
            R13 | R14 => match mode {
                Mode::Fiq => self.fiq[reg as usize - 8] = value,
                Mode::Supervisor => self.svc[reg as usize - 13] = value,
                Mode::Abort => self.abt[reg as usize - 13] = value,
                Mode::Irq => self.irq[reg as usize - 13] = value,
                Mode::Undefined => self.und[reg as usize - 13] = value,
                _ => self.usr[reg as usize] = value,
            },
            R15 => self.pc = value,
            Cpsr => self.cpsr.bits = value,
            Spsr => {
                let spsr = StatusRegister::from_bits_truncate(value);
                match mode {
                    Mode::Fiq => self.spsr[0] = spsr,
                    Mode::Supervisor => self.spsr[1] = spsr,
                    Mode::Abort => self.spsr[2] = spsr,
                    Mode::Irq => self.spsr[3] = spsr,
                    Mode::Undefined => self.spsr[4] = spsr,
                    _ => (),
                }
            }
        }
    }

    pub fn get_reg_i(&self, reg: u32) -> u32 {
        self.get_reg(Self::reg_from_u32(reg))
    }

    pub fn set_reg_i(&mut self, reg: u32, value: u32) {
        self.set_reg(Self::reg_from_u32(reg), value);
    }

    fn reg_from_u32(reg: u32) -> Reg {
        use Reg::*;
        match reg {
            0 => R0,
            1 => R1,
            2 => R2,
            3 => R3,
            4 => R4,
            5 => R5,
            6 => R6,
            7 => R7,
            8 => R8,
            9 => R9,
            10 => R10,
            11 => R11,
            12 => R12,
            13 => R13,
            14 => R14,
            15 => R15,
            _ => unreachable!(),
        }
    }

    /// Enter `mode`, saving the current CPSR into the new bank's SPSR.
    pub fn change_mode(&mut self, mode: Mode) {
        let cpsr = self.get_reg(Reg::Cpsr);
        self.set_mode(mode);
        self.set_reg(Reg::Spsr, cpsr);
    }

    pub fn restore_cpsr(&mut self) {
        self.cpsr.bits = self.get_reg(Reg::Spsr);
    }

    pub fn get_mode(&self) -> Mode {
        self.cpsr.get_mode()
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.cpsr.set_mode(mode);
    }

    /// NZCV in bits 7..4, ready to be ORed with a condition field.
    pub fn condition_index(&self) -> usize {
        (self.cpsr.bits() >> 24 & 0xF0) as usize
    }

    pub fn get_n(&self) -> bool {
        self.cpsr.contains(StatusRegister::N)
    }
    pub fn get_z(&self) -> bool {
        self.cpsr.contains(StatusRegister::Z)
    }
    pub fn get_c(&self) -> bool {
        self.cpsr.contains(StatusRegister::C)
    }
    pub fn get_v(&self) -> bool {
        self.cpsr.contains(StatusRegister::V)
    }
    pub fn get_i(&self) -> bool {
        self.cpsr.contains(StatusRegister::I)
    }
    pub fn get_t(&self) -> bool {
        self.cpsr.contains(StatusRegister::T)
    }

    pub fn set_n(&mut self, value: bool) {
        self.cpsr.set(StatusRegister::N, value);
    }
    pub fn set_z(&mut self, value: bool) {
        self.cpsr.set(StatusRegister::Z, value);
    }
    pub fn set_c(&mut self, value: bool) {
        self.cpsr.set(StatusRegister::C, value);
    }
    pub fn set_v(&mut self, value: bool) {
        self.cpsr.set(StatusRegister::V, value);
    }
    pub fn set_i(&mut self, value: bool) {
        self.cpsr.set(StatusRegister::I, value);
    }
    pub fn set_t(&mut self, value: bool) {
        self.cpsr.set(StatusRegister::T, value);
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
