use azurite_gba::arm::{Mode, Reg};
use azurite_gba::consts::{CYCLES_SCANLINE, DISPLAY_WIDTH};
use azurite_gba::keypad::Keys;
use azurite_gba::GameBoyAdvance;

/// A cartridge image with a valid header whose body is ARM no-ops.
fn make_rom(code: &[u32]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x4000];
    rom[0xA0..0xAC].copy_from_slice(b"SCENARIO\0\0\0\0");
    let checksum = rom[0xA0..=0xBC]
        .iter()
        .cloned()
        .fold(0u8, u8::wrapping_sub)
        .wrapping_sub(0x19);
    rom[0xBD] = checksum;
    for (i, word) in code.iter().enumerate() {
        rom[4 * i..4 * i + 4].copy_from_slice(&word.to_le_bytes());
    }
    rom
}

fn make_gba() -> GameBoyAdvance {
    GameBoyAdvance::new(make_rom(&[]), None).unwrap()
}

#[test]
fn boot_without_bios() {
    let mut gba = make_gba();
    gba.reset();

    assert_eq!(gba.cpu.regs.pc, 0x0800_0000);
    assert_eq!(gba.cpu.regs.get_mode(), Mode::User);
    assert_eq!(gba.cpu.regs.get_reg(Reg::R13), 0x0300_7F00);

    gba.cpu.regs.set_mode(Mode::Supervisor);
    assert_eq!(gba.cpu.regs.get_reg(Reg::R13), 0x0300_7FE0);
    gba.cpu.regs.set_mode(Mode::Irq);
    assert_eq!(gba.cpu.regs.get_reg(Reg::R13), 0x0300_7FA0);
}

#[test]
fn dma0_immediate_transfer() {
    let mut gba = make_gba();

    for i in 0..4u32 {
        gba.bus
            .write::<u32>(0x0200_0000 + 4 * i, 0xDEAD_BEEF ^ i);
    }

    gba.bus.write::<u32>(0x0400_00B0, 0x0200_0000); // DMA0SAD
    gba.bus.write::<u32>(0x0400_00B4, 0x0200_0100); // DMA0DAD
    gba.bus.write::<u16>(0x0400_00B8, 4); // count
    // 32-bit, immediate, IRQ on completion, enable.
    gba.bus.write::<u16>(0x0400_00BA, 0x8000 | 0x4000 | 0x0400);

    gba.run_for(1);

    for i in 0..4u32 {
        assert_eq!(gba.bus.read::<u32>(0x0200_0100 + 4 * i), 0xDEAD_BEEF ^ i);
    }
    assert_eq!(gba.bus.read::<u16>(0x0400_00BA) & 0x8000, 0);
    assert_ne!(gba.bus.read::<u16>(0x0400_0202) & 0x0100, 0);
}

#[test]
fn hblank_dma_waits_for_blanking() {
    let mut gba = make_gba();
    gba.bus.write::<u32>(0x0200_0000, 0x1234_5678);
    gba.bus.write::<u32>(0x0400_00B0, 0x0200_0000);
    gba.bus.write::<u32>(0x0400_00B4, 0x0200_0200);
    gba.bus.write::<u16>(0x0400_00B8, 2);
    // 16-bit, HBlank start timing.
    gba.bus.write::<u16>(0x0400_00BA, 0x8000 | 0x2000);

    gba.run_for(64);
    assert_eq!(gba.bus.read::<u32>(0x0200_0200), 0);

    gba.run_for(CYCLES_SCANLINE);
    assert_eq!(gba.bus.read::<u32>(0x0200_0200), 0x1234_5678);
}

#[test]
fn vblank_irq_is_taken() {
    let mut gba = make_gba();
    gba.bus.write::<u16>(0x0400_0004, 0x0008); // DISPSTAT: VBlank IRQ enable
    gba.bus.write::<u16>(0x0400_0200, 0x0001); // IE: VBlank
    gba.bus.write::<u16>(0x0400_0208, 0x0001); // IME

    gba.run_for(CYCLES_SCANLINE * 161);

    assert_ne!(gba.bus.read::<u16>(0x0400_0202) & 0x0001, 0);
    assert_eq!(gba.cpu.regs.get_mode(), Mode::Irq);
    assert!(gba.cpu.regs.get_i());
}

#[test]
fn masked_irq_is_not_taken() {
    let mut gba = make_gba();
    gba.bus.write::<u16>(0x0400_0004, 0x0008);
    gba.bus.write::<u16>(0x0400_0200, 0x0001);
    // IME left clear.

    gba.run_for(CYCLES_SCANLINE * 161);

    assert_ne!(gba.bus.read::<u16>(0x0400_0202) & 0x0001, 0);
    assert_eq!(gba.cpu.regs.get_mode(), Mode::User);
}

#[test]
fn halt_wakes_on_timer_irq() {
    let mut gba = make_gba();
    gba.bus.write::<u16>(0x0400_0100, 0xFF00); // TM0 reload: 256 cycles
    gba.bus.write::<u16>(0x0400_0102, 0x00C0); // IRQ + enable
    gba.bus.write::<u16>(0x0400_0200, 0x0008); // IE: timer 0
    gba.bus.write::<u8>(0x0400_0301, 0x00); // halt

    gba.run_for(4);
    assert_ne!(gba.bus.haltcnt, azurite_gba::sysbus::HaltState::Running);

    gba.run_for(512);
    assert_eq!(gba.bus.haltcnt, azurite_gba::sysbus::HaltState::Running);
    assert_ne!(gba.bus.read::<u16>(0x0400_0202) & 0x0008, 0);
}

#[test]
fn mode3_frame_renders_through_the_core() {
    let mut gba = make_gba();
    gba.bus.write::<u16>(0x0400_0000, 0x0403); // mode 3, BG2

    // A red pixel at (120, 80).
    let offset = 0x0600_0000 + 2 * (80 * DISPLAY_WIDTH as u32 + 120);
    gba.bus.write::<u16>(offset, 0x001F);

    gba.run_frame();
    assert!(gba.frame_ready());
    let frame = gba.frame_buffer();
    assert_eq!(frame[80 * DISPLAY_WIDTH + 120], 0xFFF8_0000);
    assert_eq!(frame[0], 0xFF00_0000);
}

#[test]
fn keypad_reads_through_the_bus() {
    let mut gba = make_gba();
    assert_eq!(gba.bus.read::<u16>(0x0400_0130), 0x03FF);

    gba.set_key(Keys::ButtonA, true);
    gba.set_key(Keys::Down, true);
    assert_eq!(gba.bus.read::<u16>(0x0400_0130), 0x03FF & !0x81);

    gba.set_key(Keys::ButtonA, false);
    assert_eq!(gba.bus.read::<u16>(0x0400_0130), 0x03FF & !0x80);
}

#[test]
fn waitstate_accounting_reaches_the_bus_clock() {
    let mut gba = make_gba();
    let before = gba.bus.cycles();
    gba.run_for(64);
    assert!(gba.bus.cycles() >= before + 64);
}
