use crate::consts::*;
use crate::interrupt::Interrupt;
use crate::{index2d, Addr, Mmio16};
use arrayvec::ArrayVec;
use log::debug;
use modular_bitfield::prelude::*;
use static_assertions::assert_eq_size;
use std::cmp;

mod obj;
mod render;
mod window;

pub use window::{Window, WindowFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuState {
    HDraw,
    HBlank,
    VBlank,
}

pub struct Gpu {
    pub state: GpuState,
    ticks: usize,

    pub vcount: usize,
    pub dispcnt: DisplayControl,
    pub dispstat: DisplayStatus,

    pub bgcnt: [BgControl; 4],
    pub bg_hofs: [u16; 4],
    pub bg_vofs: [u16; 4],
    pub bg_aff: [BgAffine; 2],
    pub win0: Window,
    pub win1: Window,
    pub winout_flags: WindowFlags,
    pub winobj_flags: WindowFlags,
    pub mosaic: RegMosaic,
    pub bldcnt: BlendControl,
    pub bldalpha: BlendAlpha,
    pub bldy: u16,

    pub palette_ram: Box<[u8]>,
    pub vram: Box<[u8]>,
    pub oam: Box<[u8]>,

    pub(crate) vram_obj_tiles_start: u32,

    bg_line: [Box<[Rgb15]>; 4],
    obj_line: [Box<[ObjPixel]>; 4],
    obj_window_line: Box<[bool]>,

    pub frame_buffer: Box<[u32]>,

    /// DMA start triggers, raised on entry to the blanking periods and
    /// consumed by the next arbitration step.
    pub hblank_dma: bool,
    pub vblank_dma: bool,

    frame_ready: bool,
}

impl Gpu {
    pub fn new() -> Self {
        Self {
            state: GpuState::HDraw,
            ticks: 0,

            vcount: 0,
            dispcnt: DisplayControl::from(0x80),
            dispstat: DisplayStatus::default(),

            bgcnt: Default::default(),
            bg_hofs: [0; 4],
            bg_vofs: [0; 4],
            bg_aff: [BgAffine::default(); 2],
            win0: Window::default(),
            win1: Window::default(),
            winout_flags: WindowFlags::from(0),
            winobj_flags: WindowFlags::from(0),
            mosaic: RegMosaic::default(),
            bldcnt: BlendControl::default(),
            bldalpha: BlendAlpha::default(),
            bldy: 0,

            palette_ram: vec![0; PALRAM_SIZE].into_boxed_slice(),
            vram: vec![0; VRAM_SIZE].into_boxed_slice(),
            oam: vec![0; OAM_SIZE].into_boxed_slice(),

            vram_obj_tiles_start: VRAM_OBJ_TILES_START_TEXT,

            bg_line: [
                vec![Rgb15::TRANSPARENT; DISPLAY_WIDTH].into_boxed_slice(),
                vec![Rgb15::TRANSPARENT; DISPLAY_WIDTH].into_boxed_slice(),
                vec![Rgb15::TRANSPARENT; DISPLAY_WIDTH].into_boxed_slice(),
                vec![Rgb15::TRANSPARENT; DISPLAY_WIDTH].into_boxed_slice(),
            ],
            obj_line: [
                vec![ObjPixel::default(); DISPLAY_WIDTH].into_boxed_slice(),
                vec![ObjPixel::default(); DISPLAY_WIDTH].into_boxed_slice(),
                vec![ObjPixel::default(); DISPLAY_WIDTH].into_boxed_slice(),
                vec![ObjPixel::default(); DISPLAY_WIDTH].into_boxed_slice(),
            ],
            obj_window_line: vec![false; DISPLAY_WIDTH].into_boxed_slice(),

            frame_buffer: vec![0; DISPLAY_WIDTH * DISPLAY_HEIGHT].into_boxed_slice(),

            hblank_dma: false,
            vblank_dma: false,

            frame_ready: false,
        }
    }

    /// VRAM mirrors every 128 KiB, with the upper 32 KiB folding back onto
    /// the object tile half.
    pub fn vram_offset(addr: Addr) -> Addr {
        let offset = addr & 0x1_FFFF;
        if offset >= 0x1_8000 {
            offset - 0x8000
        } else {
            offset
        }
    }

    pub fn write_dispcnt(&mut self, value: u16) {
        let old_mode = self.dispcnt.mode;
        self.dispcnt.write(value);
        if old_mode != self.dispcnt.mode {
            debug!("display mode changed {} -> {}", old_mode, self.dispcnt.mode);
            self.vram_obj_tiles_start = if self.dispcnt.mode >= 3 {
                VRAM_OBJ_TILES_START_BITMAP
            } else {
                VRAM_OBJ_TILES_START_TEXT
            };
        }
    }

    /// Set after each VBlank entry; the host clears it by taking the frame.
    pub fn frame_ready(&mut self) -> bool {
        std::mem::take(&mut self.frame_ready)
    }

    /// Advances the scanline state machine by `cycles` ticks and returns the
    /// IF bits to raise.
    pub fn step(&mut self, cycles: usize) -> u16 {
        let mut irq = 0;
        self.ticks += cycles;

        loop {
            match self.state {
                GpuState::HDraw if self.ticks >= CYCLES_HDRAW => {
                    self.ticks -= CYCLES_HDRAW;
                    self.dispstat.set_hblank_flag(true);
                    if self.dispstat.hblank_irq_enable() {
                        irq |= Interrupt::LcdHBlank.mask();
                    }
                    self.hblank_dma = true;
                    self.render_scanline();
                    self.state = GpuState::HBlank;
                }
                GpuState::HBlank if self.ticks >= CYCLES_HBLANK => {
                    self.ticks -= CYCLES_HBLANK;
                    self.dispstat.set_hblank_flag(false);
                    irq |= self.update_vcount(self.vcount + 1);

                    if self.vcount == DISPLAY_HEIGHT {
                        for aff in self.bg_aff.iter_mut() {
                            aff.latch();
                        }
                        self.dispstat.set_vblank_flag(true);
                        if self.dispstat.vblank_irq_enable() {
                            irq |= Interrupt::LcdVBlank.mask();
                        }
                        self.vblank_dma = true;
                        self.frame_ready = true;
                        self.state = GpuState::VBlank;
                    } else {
                        for aff in self.bg_aff.iter_mut() {
                            aff.internal_x += aff.pb as i32;
                            aff.internal_y += aff.pd as i32;
                        }
                        self.state = GpuState::HDraw;
                    }
                }
                GpuState::VBlank if self.ticks >= CYCLES_SCANLINE => {
                    self.ticks -= CYCLES_SCANLINE;
                    if self.vcount + 1 == TOTAL_LINES {
                        irq |= self.update_vcount(0);
                        self.state = GpuState::HDraw;
                    } else {
                        irq |= self.update_vcount(self.vcount + 1);
                        // The flag drops one line before the counter wraps.
                        if self.vcount == TOTAL_LINES - 1 {
                            self.dispstat.set_vblank_flag(false);
                        }
                    }
                }
                _ => break,
            }
        }
        irq
    }

    fn update_vcount(&mut self, value: usize) -> u16 {
        self.vcount = value;
        let matched = self.dispstat.vcount_setting() as usize == value;
        self.dispstat.set_vcount_flag(matched);
        if matched && self.dispstat.vcount_irq_enable() {
            Interrupt::LcdVCounterMatch.mask()
        } else {
            0
        }
    }

    pub fn render_scanline(&mut self) {
        for line in self.obj_line.iter_mut() {
            line.fill(ObjPixel::default());
        }
        self.obj_window_line.fill(false);

        if self.dispcnt.force_blank {
            let row = self.vcount * DISPLAY_WIDTH;
            self.frame_buffer[row..row + DISPLAY_WIDTH].fill(0xFFF8_F8F8);
            return;
        }

        if self.dispcnt.enable_obj {
            self.render_objs();
        }

        match self.dispcnt.mode {
            0 => {
                for bg in 0..4 {
                    if self.dispcnt.enable_bg[bg] {
                        self.render_text_bg(bg);
                    }
                }
                self.finalize_scanline(0, 3);
            }
            1 => {
                for bg in 0..2 {
                    if self.dispcnt.enable_bg[bg] {
                        self.render_text_bg(bg);
                    }
                }
                if self.dispcnt.enable_bg[2] {
                    self.render_affine_bg(2);
                }
                self.finalize_scanline(0, 2);
            }
            2 => {
                for bg in 2..4 {
                    if self.dispcnt.enable_bg[bg] {
                        self.render_affine_bg(bg);
                    }
                }
                self.finalize_scanline(2, 3);
            }
            3 => {
                if self.dispcnt.enable_bg[2] {
                    self.render_mode3();
                }
                self.finalize_scanline(2, 2);
            }
            4 => {
                if self.dispcnt.enable_bg[2] {
                    self.render_mode4();
                }
                self.finalize_scanline(2, 2);
            }
            5 => {
                if self.dispcnt.enable_bg[2] {
                    self.render_mode5();
                }
                self.finalize_scanline(2, 2);
            }
            other => debug!("prohibited display mode {other}"),
        }
    }

    fn finalize_scanline(&mut self, bg_start: usize, bg_end: usize) {
        let backdrop = Rgb15(self.pal16(0) & 0x7FFF);
        let y = self.vcount;

        // Disabled backgrounds drop out; the rest sort by priority once for
        // the whole scanline.
        let mut backgrounds: ArrayVec<usize, 4> = (bg_start..=bg_end)
            .filter(|bg| self.dispcnt.enable_bg[*bg])
            .collect();
        backgrounds.sort_by_key(|bg| (self.bgcnt[*bg].priority, *bg));

        for x in 0..DISPLAY_WIDTH {
            let win = self.active_window_flags(x, y);
            self.finalize_pixel(x, y, win, &backgrounds, backdrop);
        }
    }

    /// Window 0 beats window 1 beats the object window; everything else is
    /// the outer region. With no window enabled all layers pass.
    fn active_window_flags(&self, x: usize, y: usize) -> WindowFlags {
        if !self.dispcnt.is_using_windows() {
            WindowFlags::all()
        } else if self.dispcnt.enable_window0 && self.win0.contains(x, y) {
            self.win0.flags
        } else if self.dispcnt.enable_window1 && self.win1.contains(x, y) {
            self.win1.flags
        } else if self.dispcnt.enable_obj_window && self.obj_window_line[x] {
            self.winobj_flags
        } else {
            self.winout_flags
        }
    }

    fn finalize_pixel(
        &mut self,
        x: usize,
        y: usize,
        win: WindowFlags,
        backgrounds: &[usize],
        backdrop: Rgb15,
    ) {
        let backdrop_layer = RenderLayer::backdrop(backdrop);

        // Top two opaque backgrounds at this pixel.
        let mut it = backgrounds
            .iter()
            .filter(|bg| win.bg_enabled(**bg) && !self.bg_line[**bg][x].is_transparent())
            .take(2);
        let mut top_layer = it.next().map_or(backdrop_layer, |bg| {
            RenderLayer::background(*bg, self.bg_line[*bg][x], self.bgcnt[*bg].priority)
        });
        let mut bot_layer = it.next().map_or(backdrop_layer, |bg| {
            RenderLayer::background(*bg, self.bg_line[*bg][x], self.bgcnt[*bg].priority)
        });
        drop(it);

        // An object pixel takes a slot when its priority ties or beats one.
        let mut obj_alpha = false;
        if self.dispcnt.enable_obj && win.obj_enabled() {
            if let Some((priority, pixel)) = self.top_obj_pixel(x) {
                let obj_layer = RenderLayer::objects(pixel.color, priority);
                if obj_layer.priority <= top_layer.priority {
                    bot_layer = top_layer;
                    top_layer = obj_layer;
                    obj_alpha = pixel.alpha;
                } else if obj_layer.priority <= bot_layer.priority {
                    bot_layer = obj_layer;
                }
            }
        }

        let top_flags = self.bldcnt.target1;
        let bot_flags = self.bldcnt.target2;
        let obj_alpha_blend = top_layer.is_object() && obj_alpha;
        let sfx_enabled = (self.bldcnt.mode != BlendMode::None || obj_alpha_blend)
            && top_flags.contains_render_layer(&top_layer);

        let color = if win.sfx_enabled() && sfx_enabled {
            if obj_alpha_blend && bot_flags.contains_render_layer(&bot_layer) {
                self.do_alpha(top_layer.pixel, bot_layer.pixel)
            } else {
                match self.bldcnt.mode {
                    BlendMode::Alpha => {
                        if bot_flags.contains_render_layer(&bot_layer) {
                            self.do_alpha(top_layer.pixel, bot_layer.pixel)
                        } else {
                            top_layer.pixel
                        }
                    }
                    BlendMode::White => self.do_brighten(top_layer.pixel),
                    BlendMode::Black => self.do_darken(top_layer.pixel),
                    BlendMode::None => top_layer.pixel,
                }
            }
        } else {
            top_layer.pixel
        };

        self.frame_buffer[index2d!(x, y, DISPLAY_WIDTH)] = 0xFF00_0000 | color.to_rgb24();
    }

    fn top_obj_pixel(&self, x: usize) -> Option<(u16, ObjPixel)> {
        (0..4).find_map(|priority| {
            let pixel = self.obj_line[priority][x];
            (!pixel.color.is_transparent()).then_some((priority as u16, pixel))
        })
    }

    fn do_alpha(&self, upper: Rgb15, lower: Rgb15) -> Rgb15 {
        upper.blend_with(lower, self.bldalpha.eva, self.bldalpha.evb)
    }

    fn do_brighten(&self, color: Rgb15) -> Rgb15 {
        color.blend_with(Rgb15::WHITE, 16 - self.bldy, self.bldy)
    }

    fn do_darken(&self, color: Rgb15) -> Rgb15 {
        color.blend_with(Rgb15::BLACK, 16 - self.bldy, self.bldy)
    }

    /// Palette entry 0 of every 16-colour bank is transparent, as is entry 0
    /// of the 256-colour palette.
    pub(super) fn get_palette_color(&self, index: u32, palette_bank: u32, offset: u32) -> Rgb15 {
        if index == 0 || (palette_bank != 0 && index % 16 == 0) {
            return Rgb15::TRANSPARENT;
        }
        Rgb15(self.pal16(offset + 2 * index + 0x20 * palette_bank) & 0x7FFF)
    }

    pub(super) fn pal16(&self, offset: u32) -> u16 {
        let o = offset as usize;
        u16::from_le_bytes([self.palette_ram[o], self.palette_ram[o + 1]])
    }

    pub(super) fn vram8(&self, offset: u32) -> u8 {
        self.vram[offset as usize]
    }

    pub(super) fn vram16(&self, offset: u32) -> u16 {
        let o = offset as usize;
        u16::from_le_bytes([self.vram[o], self.vram[o + 1]])
    }

    pub(super) fn oam16(&self, offset: u32) -> u16 {
        let o = offset as usize;
        u16::from_le_bytes([self.oam[o], self.oam[o + 1]])
    }
}

impl Default for Gpu {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DisplayControl {
    pub mode: u16,
    pub display_frame_select: u16,
    pub hblank_interval_free: bool,
    pub obj_character_vram_mapping: bool,
    pub force_blank: bool,
    pub enable_bg: [bool; 4],
    pub enable_obj: bool,
    pub enable_window0: bool,
    pub enable_window1: bool,
    pub enable_obj_window: bool,
}

impl DisplayControl {
    pub fn is_using_windows(&self) -> bool {
        self.enable_window0 || self.enable_window1 || self.enable_obj_window
    }

    /// 1D object mapping advances tiles within the sprite row; 2D treats
    /// VRAM as a 32-tile-wide sheet.
    pub fn obj_mapping_1d(&self) -> bool {
        self.obj_character_vram_mapping
    }
}

impl From<u16> for DisplayControl {
    fn from(value: u16) -> DisplayControl {
        let mut dispcnt = DisplayControl::default();
        dispcnt.write(value);
        dispcnt
    }
}

impl Mmio16 for DisplayControl {
    fn write(&mut self, value: u16) {
        self.mode = value & 0b111;
        self.display_frame_select = value >> 4 & 1;
        self.hblank_interval_free = value >> 5 & 1 != 0;
        self.obj_character_vram_mapping = value >> 6 & 1 != 0;
        self.force_blank = value >> 7 & 1 != 0;
        self.enable_bg[0] = value >> 8 & 1 != 0;
        self.enable_bg[1] = value >> 9 & 1 != 0;
        self.enable_bg[2] = value >> 10 & 1 != 0;
        self.enable_bg[3] = value >> 11 & 1 != 0;
        self.enable_obj = value >> 12 & 1 != 0;
        self.enable_window0 = value >> 13 & 1 != 0;
        self.enable_window1 = value >> 14 & 1 != 0;
        self.enable_obj_window = value >> 15 & 1 != 0;
    }

    fn read(&self) -> u16 {
        self.mode
            | self.display_frame_select << 4
            | u16::from(self.hblank_interval_free) << 5
            | u16::from(self.obj_character_vram_mapping) << 6
            | u16::from(self.force_blank) << 7
            | u16::from(self.enable_bg[0]) << 8
            | u16::from(self.enable_bg[1]) << 9
            | u16::from(self.enable_bg[2]) << 10
            | u16::from(self.enable_bg[3]) << 11
            | u16::from(self.enable_obj) << 12
            | u16::from(self.enable_window0) << 13
            | u16::from(self.enable_window1) << 14
            | u16::from(self.enable_obj_window) << 15
    }
}

assert_eq_size!(DisplayStatus, u16);

#[bitfield]
#[repr(u16)]
#[derive(Debug, Copy, Clone, Default)]
pub struct DisplayStatus {
    pub vblank_flag: bool,
    pub hblank_flag: bool,
    pub vcount_flag: bool,
    pub vblank_irq_enable: bool,
    pub hblank_irq_enable: bool,
    pub vcount_irq_enable: bool,
    #[skip]
    _reserved: B2,
    pub vcount_setting: u8,
}

impl Mmio16 for DisplayStatus {
    fn write(&mut self, value: u16) {
        // The three status flags are read-only.
        self.set_vblank_irq_enable(value >> 3 & 1 != 0);
        self.set_hblank_irq_enable(value >> 4 & 1 != 0);
        self.set_vcount_irq_enable(value >> 5 & 1 != 0);
        self.set_vcount_setting((value >> 8) as u8);
    }

    fn read(&self) -> u16 {
        u16::from(*self)
    }
}

#[derive(Debug, Default, Clone)]
pub struct BgControl {
    pub priority: u16,
    pub character_base_block: u16,
    pub screen_base_block: u16,
    pub mosaic: bool,
    pub palette256: bool,
    pub affine_wraparound: bool,
    pub size: u8,
}

impl BgControl {
    pub fn char_block(&self) -> u32 {
        self.character_base_block as u32 * 0x4000
    }

    pub fn screen_block(&self) -> u32 {
        self.screen_base_block as u32 * SCREEN_BLOCK_SIZE
    }

    pub fn size_regular(&self) -> (u32, u32) {
        match self.size {
            0b00 => (256, 256),
            0b01 => (512, 256),
            0b10 => (256, 512),
            0b11 => (512, 512),
            _ => unreachable!(),
        }
    }

    /// Side length in pixels of the affine playfield.
    pub fn size_affine(&self) -> i32 {
        128 << self.size
    }

    pub fn tile_format(&self) -> (u32, PixelFormat) {
        if self.palette256 {
            (2 * TILE_SIZE, PixelFormat::Bpp8)
        } else {
            (TILE_SIZE, PixelFormat::Bpp4)
        }
    }
}

impl Mmio16 for BgControl {
    fn write(&mut self, value: u16) {
        self.priority = value & 0b11;
        self.character_base_block = value >> 2 & 0b11;
        self.mosaic = value >> 6 & 1 != 0;
        self.palette256 = value >> 7 & 1 != 0;
        self.screen_base_block = value >> 8 & 0b11111;
        self.affine_wraparound = value >> 13 & 1 != 0;
        self.size = (value >> 14 & 0b11) as u8;
    }

    fn read(&self) -> u16 {
        self.priority
            | self.character_base_block << 2
            | u16::from(self.mosaic) << 6
            | u16::from(self.palette256) << 7
            | self.screen_base_block << 8
            | u16::from(self.affine_wraparound) << 13
            | (self.size as u16) << 14
    }
}

/// Rotation/scaling state for BG2/BG3. The matrix entries are signed 8.8;
/// the reference point is signed 20.8, and the internal copy is the one the
/// renderer walks.
#[derive(Debug, Default, Copy, Clone)]
pub struct BgAffine {
    pub pa: i16,
    pub pb: i16,
    pub pc: i16,
    pub pd: i16,
    pub x: i32,
    pub y: i32,
    pub internal_x: i32,
    pub internal_y: i32,
}

impl BgAffine {
    pub fn latch(&mut self) {
        self.internal_x = self.x;
        self.internal_y = self.y;
    }

    pub fn write_x_low(&mut self, value: u16) {
        self.x = (self.x as u32 & 0xFFFF_0000 | value as u32) as i32;
        self.internal_x = self.x;
    }

    pub fn write_x_high(&mut self, value: u16) {
        self.x = self.x & 0xFFFF | sign_extend_i32((value & 0x0FFF) as i32, 12) << 16;
        self.internal_x = self.x;
    }

    pub fn write_y_low(&mut self, value: u16) {
        self.y = (self.y as u32 & 0xFFFF_0000 | value as u32) as i32;
        self.internal_y = self.y;
    }

    pub fn write_y_high(&mut self, value: u16) {
        self.y = self.y & 0xFFFF | sign_extend_i32((value & 0x0FFF) as i32, 12) << 16;
        self.internal_y = self.y;
    }
}

pub(crate) fn sign_extend_i32(value: i32, size: u32) -> i32 {
    let shift = 32 - size;
    value << shift >> shift
}

bitfield::bitfield! {
    #[repr(transparent)]
    #[derive(Copy, Clone, Default, PartialEq)]
    pub struct Rgb15(u16);
    impl Debug;
    u16;
    pub r, set_r: 4, 0;
    pub g, set_g: 9, 5;
    pub b, set_b: 14, 10;
}

impl Rgb15 {
    pub const BLACK: Rgb15 = Rgb15(0);
    pub const WHITE: Rgb15 = Rgb15(0x7FFF);
    pub const TRANSPARENT: Rgb15 = Rgb15(0x8000);

    pub fn to_rgb24(self) -> u32 {
        (self.r() as u32) << 19 | (self.g() as u32) << 11 | (self.b() as u32) << 3
    }

    pub fn from_rgb(r: u16, g: u16, b: u16) -> Rgb15 {
        let mut c = Rgb15(0);
        c.set_r(r);
        c.set_g(g);
        c.set_b(b);
        c
    }

    pub fn is_transparent(&self) -> bool {
        self.0 == 0x8000
    }

    pub fn blend_with(self, other: Rgb15, my_weight: u16, other_weight: u16) -> Rgb15 {
        let r = cmp::min(31, (self.r() * my_weight + other.r() * other_weight) >> 4);
        let g = cmp::min(31, (self.g() * my_weight + other.g() * other_weight) >> 4);
        let b = cmp::min(31, (self.b() * my_weight + other.b() * other_weight) >> 4);
        Rgb15::from_rgb(r, g, b)
    }
}

/// One rendered sprite pixel; `alpha` marks semi-transparent objects.
#[derive(Debug, Copy, Clone)]
pub(super) struct ObjPixel {
    pub color: Rgb15,
    pub alpha: bool,
}

impl Default for ObjPixel {
    fn default() -> Self {
        Self {
            color: Rgb15::TRANSPARENT,
            alpha: false,
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub enum PixelFormat {
    Bpp4 = 0,
    Bpp8 = 1,
}

#[bitfield]
#[repr(u16)]
#[derive(Debug, Default, Clone, Copy)]
pub struct RegMosaic {
    #[skip]
    bg_hsize: B4,
    #[skip]
    bg_vsize: B4,
    #[skip]
    obj_hsize: B4,
    #[skip]
    obj_vsize: B4,
}

bitflags::bitflags! {
    #[derive(Default)]
    pub struct BlendFlags: u16 {
        const BG0 = 0b00000001;
        const BG1 = 0b00000010;
        const BG2 = 0b00000100;
        const BG3 = 0b00001000;
        const OBJ = 0b00010000;
        const BACKDROP = 0b00100000;
    }
}

impl BlendFlags {
    pub fn contains_render_layer(&self, layer: &RenderLayer) -> bool {
        self.contains(BlendFlags::from_bits_truncate(layer.kind as u16))
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum BlendMode {
    #[default]
    None = 0b00,
    Alpha = 0b01,
    White = 0b10,
    Black = 0b11,
}

impl BlendMode {
    pub fn from_u16(value: u16) -> BlendMode {
        match value & 0b11 {
            0 => BlendMode::None,
            1 => BlendMode::Alpha,
            2 => BlendMode::White,
            3 => BlendMode::Black,
            _ => unreachable!(),
        }
    }
}

#[derive(Debug, Default, Copy, Clone)]
pub struct BlendControl {
    pub target1: BlendFlags,
    pub target2: BlendFlags,
    pub mode: BlendMode,
}

impl Mmio16 for BlendControl {
    fn write(&mut self, value: u16) {
        self.target1 = BlendFlags::from_bits_truncate(value & 0x3F);
        self.target2 = BlendFlags::from_bits_truncate(value >> 8 & 0x3F);
        self.mode = BlendMode::from_u16(value >> 6);
    }

    fn read(&self) -> u16 {
        self.target1.bits() | (self.mode as u16) << 6 | self.target2.bits() << 8
    }
}

#[derive(Debug, Default, Copy, Clone)]
pub struct BlendAlpha {
    pub eva: u16,
    pub evb: u16,
}

impl Mmio16 for BlendAlpha {
    fn write(&mut self, value: u16) {
        self.eva = cmp::min(value & 0x1F, 16);
        self.evb = cmp::min(value >> 8 & 0x1F, 16);
    }

    fn read(&self) -> u16 {
        self.eva | self.evb << 8
    }
}

#[derive(Debug, Ord, Eq, PartialOrd, PartialEq, Clone, Copy)]
pub enum RenderLayerKind {
    Backdrop = 0b00100000,
    Objects = 0b00010000,
    Background3 = 0b00001000,
    Background2 = 0b00000100,
    Background1 = 0b00000010,
    Background0 = 0b00000001,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub struct RenderLayer {
    pub kind: RenderLayerKind,
    pub priority: u16,
    pub pixel: Rgb15,
}

impl RenderLayer {
    pub fn background(bg: usize, pixel: Rgb15, priority: u16) -> RenderLayer {
        let kind = match bg {
            0 => RenderLayerKind::Background0,
            1 => RenderLayerKind::Background1,
            2 => RenderLayerKind::Background2,
            3 => RenderLayerKind::Background3,
            _ => unreachable!(),
        };
        RenderLayer {
            kind,
            pixel,
            priority,
        }
    }

    pub fn objects(pixel: Rgb15, priority: u16) -> RenderLayer {
        RenderLayer {
            kind: RenderLayerKind::Objects,
            pixel,
            priority,
        }
    }

    pub fn backdrop(pixel: Rgb15) -> RenderLayer {
        RenderLayer {
            kind: RenderLayerKind::Backdrop,
            pixel,
            priority: 4,
        }
    }

    fn is_object(&self) -> bool {
        self.kind == RenderLayerKind::Objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(gpu: &mut Gpu, lines: usize) -> u16 {
        gpu.step(CYCLES_SCANLINE * lines)
    }

    #[test]
    fn vcount_progression_and_wrap() {
        let mut gpu = Gpu::new();
        assert_eq!(gpu.vcount, 0);

        gpu.step(CYCLES_HDRAW);
        assert_eq!(gpu.state, GpuState::HBlank);
        assert!(gpu.dispstat.hblank_flag());
        gpu.step(CYCLES_HBLANK);
        assert_eq!(gpu.vcount, 1);
        assert!(!gpu.dispstat.hblank_flag());

        drain(&mut gpu, TOTAL_LINES - 1);
        assert_eq!(gpu.vcount, 0);
        assert_eq!(gpu.state, GpuState::HDraw);
    }

    #[test]
    fn vblank_window() {
        let mut gpu = Gpu::new();
        drain(&mut gpu, DISPLAY_HEIGHT);
        assert_eq!(gpu.vcount, 160);
        assert_eq!(gpu.state, GpuState::VBlank);
        assert!(gpu.dispstat.vblank_flag());
        assert!(gpu.vblank_dma);
        assert!(gpu.frame_ready());
        assert!(!gpu.frame_ready());

        // Flag stays up through line 226 and drops on 227.
        drain(&mut gpu, 66);
        assert_eq!(gpu.vcount, 226);
        assert!(gpu.dispstat.vblank_flag());
        drain(&mut gpu, 1);
        assert_eq!(gpu.vcount, 227);
        assert!(!gpu.dispstat.vblank_flag());
    }

    #[test]
    fn vblank_and_hblank_irqs() {
        let mut gpu = Gpu::new();
        gpu.dispstat.set_vblank_irq_enable(true);
        gpu.dispstat.set_hblank_irq_enable(true);

        let irq = gpu.step(CYCLES_HDRAW);
        assert_eq!(irq, Interrupt::LcdHBlank.mask());

        let mut seen = 0;
        for _ in 0..DISPLAY_HEIGHT {
            seen |= drain(&mut gpu, 1);
        }
        assert_ne!(seen & Interrupt::LcdVBlank.mask(), 0);
    }

    #[test]
    fn vcount_match_irq() {
        let mut gpu = Gpu::new();
        gpu.dispstat.set_vcount_irq_enable(true);
        gpu.dispstat.set_vcount_setting(3);

        let mut irq = 0;
        for _ in 0..3 {
            irq |= drain(&mut gpu, 1);
        }
        assert_ne!(irq & Interrupt::LcdVCounterMatch.mask(), 0);
        assert!(gpu.dispstat.vcount_flag());
        drain(&mut gpu, 1);
        assert!(!gpu.dispstat.vcount_flag());
    }

    #[test]
    fn affine_reference_latching() {
        let mut gpu = Gpu::new();
        gpu.bg_aff[0].write_x_low(0x0100);
        assert_eq!(gpu.bg_aff[0].internal_x, 0x100);
        gpu.bg_aff[0].pb = 0x0100; // +1.0 per line

        drain(&mut gpu, 1);
        assert_eq!(gpu.bg_aff[0].internal_x, 0x200);

        // VBlank re-latches from the reference registers.
        drain(&mut gpu, DISPLAY_HEIGHT);
        assert_eq!(gpu.bg_aff[0].internal_x, 0x100);
    }

    #[test]
    fn reference_point_sign_extension() {
        let mut aff = BgAffine::default();
        aff.write_x_low(0x0000);
        aff.write_x_high(0x0800); // sign bit of the 28-bit value
        assert_eq!(aff.x, -(1 << 27));
        aff.write_x_high(0x0400);
        assert_eq!(aff.x, 1 << 26);
    }

    #[test]
    fn mode3_pixel_render() {
        let mut gpu = Gpu::new();
        gpu.dispcnt.write(0x0403); // mode 3, BG2 on
        // Pixel (5, 0) bright red.
        let offset = 2 * 5;
        gpu.vram[offset] = 0x1F;
        gpu.vram[offset + 1] = 0x00;

        gpu.render_scanline();
        assert_eq!(gpu.frame_buffer[5], 0xFFF8_0000);
        assert_eq!(gpu.frame_buffer[6], 0xFF00_0000);
    }

    #[test]
    fn forced_blank_renders_white() {
        let mut gpu = Gpu::new();
        gpu.dispcnt.write(0x0083);
        gpu.render_scanline();
        assert_eq!(gpu.frame_buffer[0], 0xFFF8_F8F8);
    }

    #[test]
    fn window_gates_sprites() {
        let mut gpu = Gpu::new();
        // Mode 0, OBJ on, window 0 on.
        gpu.dispcnt.write(0x3000);
        gpu.win0.left = 0;
        gpu.win0.right = 4;
        gpu.win0.bottom = 160;
        gpu.win0.flags = WindowFlags::OBJ;
        gpu.winout_flags = WindowFlags::empty();

        // A 8x8 sprite at the origin, solid palette index 1.
        let tile = (VRAM_OBJ_TILES_START_TEXT + 32) as usize;
        for byte in gpu.vram[tile..tile + 32].iter_mut() {
            *byte = 0x11;
        }
        gpu.palette_ram[0x202] = 0x1F; // obj palette 0, colour 1: red
        gpu.oam[4] = 0x01; // attr2: tile 1
        // backdrop: green
        gpu.palette_ram[0] = 0xE0;
        gpu.palette_ram[1] = 0x03;

        gpu.vcount = 0;
        gpu.render_scanline();
        let red = 0xFF00_0000 | Rgb15(0x001F).to_rgb24();
        let green = 0xFF00_0000 | Rgb15(0x03E0).to_rgb24();
        assert_eq!(gpu.frame_buffer[2], red); // inside window 0
        assert_eq!(gpu.frame_buffer[6], green); // outside: OBJ masked off
    }

    #[test]
    fn brightness_blend_applies_to_backdrop() {
        let mut gpu = Gpu::new();
        gpu.dispcnt.write(0x0000);
        gpu.bldcnt.write(0x20 | 2 << 6); // brighten, first target backdrop
        gpu.bldy = 16;

        gpu.vcount = 0;
        gpu.render_scanline();
        assert_eq!(gpu.frame_buffer[0], 0xFF00_0000 | Rgb15::WHITE.to_rgb24());
    }
}
