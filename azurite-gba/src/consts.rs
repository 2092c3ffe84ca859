use crate::Addr;

pub const CLOCK_FREQ: usize = 1 << 24;

pub const DISPLAY_WIDTH: usize = 240;
pub const DISPLAY_HEIGHT: usize = 160;
pub const VBLANK_LINES: usize = 68;
pub const TOTAL_LINES: usize = DISPLAY_HEIGHT + VBLANK_LINES;

pub const CYCLES_HDRAW: usize = 960;
pub const CYCLES_HBLANK: usize = 272;
pub const CYCLES_SCANLINE: usize = CYCLES_HDRAW + CYCLES_HBLANK;
pub const CYCLES_FULL_FRAME: usize = CYCLES_SCANLINE * TOTAL_LINES;

pub const BIOS_SIZE: usize = 16 * 1024;
pub const EWRAM_SIZE: usize = 256 * 1024;
pub const IWRAM_SIZE: usize = 32 * 1024;
pub const PALRAM_SIZE: usize = 1024;
pub const VRAM_SIZE: usize = 96 * 1024;
pub const OAM_SIZE: usize = 1024;
pub const ROM_MAX_SIZE: usize = 32 * 1024 * 1024;

pub const TILE_SIZE: u32 = 0x20;
pub const SCREEN_BLOCK_SIZE: u32 = 0x800;
pub const VRAM_OBJ_TILES_START_TEXT: u32 = 0x10000;
pub const VRAM_OBJ_TILES_START_BITMAP: u32 = 0x14000;

pub const BIOS_ADDR: Addr = 0x0000_0000;
pub const EWRAM_ADDR: Addr = 0x0200_0000;
pub const IWRAM_ADDR: Addr = 0x0300_0000;
pub const IOMEM_ADDR: Addr = 0x0400_0000;
pub const PALRAM_ADDR: Addr = 0x0500_0000;
pub const VRAM_ADDR: Addr = 0x0600_0000;
pub const OAM_ADDR: Addr = 0x0700_0000;
pub const GAMEPAK_WS0_LO: Addr = 0x0800_0000;
pub const SRAM_LO: Addr = 0x0E00_0000;

pub const REG_DISPCNT: Addr = 0x0400_0000;
pub const REG_DISPSTAT: Addr = 0x0400_0004;
pub const REG_VCOUNT: Addr = 0x0400_0006;
pub const REG_BG0CNT: Addr = 0x0400_0008;
pub const REG_BG1CNT: Addr = 0x0400_000A;
pub const REG_BG2CNT: Addr = 0x0400_000C;
pub const REG_BG3CNT: Addr = 0x0400_000E;
pub const REG_BG0HOFS: Addr = 0x0400_0010;
pub const REG_BG0VOFS: Addr = 0x0400_0012;
pub const REG_BG1HOFS: Addr = 0x0400_0014;
pub const REG_BG1VOFS: Addr = 0x0400_0016;
pub const REG_BG2HOFS: Addr = 0x0400_0018;
pub const REG_BG2VOFS: Addr = 0x0400_001A;
pub const REG_BG3HOFS: Addr = 0x0400_001C;
pub const REG_BG3VOFS: Addr = 0x0400_001E;
pub const REG_BG2PA: Addr = 0x0400_0020;
pub const REG_BG2PB: Addr = 0x0400_0022;
pub const REG_BG2PC: Addr = 0x0400_0024;
pub const REG_BG2PD: Addr = 0x0400_0026;
pub const REG_BG2X_L: Addr = 0x0400_0028;
pub const REG_BG2X_H: Addr = 0x0400_002A;
pub const REG_BG2Y_L: Addr = 0x0400_002C;
pub const REG_BG2Y_H: Addr = 0x0400_002E;
pub const REG_BG3PA: Addr = 0x0400_0030;
pub const REG_BG3PB: Addr = 0x0400_0032;
pub const REG_BG3PC: Addr = 0x0400_0034;
pub const REG_BG3PD: Addr = 0x0400_0036;
pub const REG_BG3X_L: Addr = 0x0400_0038;
pub const REG_BG3X_H: Addr = 0x0400_003A;
pub const REG_BG3Y_L: Addr = 0x0400_003C;
pub const REG_BG3Y_H: Addr = 0x0400_003E;
pub const REG_WIN0H: Addr = 0x0400_0040;
pub const REG_WIN1H: Addr = 0x0400_0042;
pub const REG_WIN0V: Addr = 0x0400_0044;
pub const REG_WIN1V: Addr = 0x0400_0046;
pub const REG_WININ: Addr = 0x0400_0048;
pub const REG_WINOUT: Addr = 0x0400_004A;
pub const REG_MOSAIC: Addr = 0x0400_004C;
pub const REG_BLDCNT: Addr = 0x0400_0050;
pub const REG_BLDALPHA: Addr = 0x0400_0052;
pub const REG_BLDY: Addr = 0x0400_0054;
pub const REG_DMA0SAD: Addr = 0x0400_00B0;
pub const REG_DMA0DAD: Addr = 0x0400_00B4;
pub const REG_DMA0CNT_L: Addr = 0x0400_00B8;
pub const REG_DMA0CNT_H: Addr = 0x0400_00BA;
pub const REG_DMA3CNT_H: Addr = 0x0400_00DE;
pub const DMA_BASE: Addr = REG_DMA0SAD;
pub const REG_TM0CNT_L: Addr = 0x0400_0100;
pub const REG_TM0CNT_H: Addr = 0x0400_0102;
pub const REG_TM3CNT_H: Addr = 0x0400_010E;
pub const TIMER_BASE: Addr = REG_TM0CNT_L;
pub const REG_KEYINPUT: Addr = 0x0400_0130;
pub const REG_KEYCNT: Addr = 0x0400_0132;
pub const REG_IE: Addr = 0x0400_0200;
pub const REG_IF: Addr = 0x0400_0202;
pub const REG_WAITCNT: Addr = 0x0400_0204;
pub const REG_IME: Addr = 0x0400_0208;
pub const REG_POSTFLG: Addr = 0x0400_0300;
pub const REG_HALTCNT: Addr = 0x0400_0301;
