use crate::arm::Arm7tdmi;
use crate::consts::CYCLES_FULL_FRAME;
use crate::keypad::Keys;
use crate::sysbus::{HaltState, Sysbus};
use crate::GbaError;

pub struct GameBoyAdvance {
    pub cpu: Arm7tdmi,
    pub bus: Sysbus,
}

impl GameBoyAdvance {
    /// Builds a core from a cartridge image and an optional BIOS. Without a
    /// BIOS image the stub is installed and software interrupts run
    /// natively.
    pub fn new(rom: Vec<u8>, bios: Option<Vec<u8>>) -> Result<Self, GbaError> {
        let hle = bios.is_none();
        let bus = Sysbus::new(rom, bios.as_deref(), hle)?;
        Ok(Self {
            cpu: Arm7tdmi::new(true),
            bus,
        })
    }

    pub fn reset(&mut self) {
        self.bus.reset();
        self.cpu.reset(true);
    }

    /// Runs the core for at least `cycles` CPU clocks. One outer iteration
    /// serves pending DMA, or steps the CPU (dispatching an IRQ first when
    /// one is both requested and unmasked), or burns idle time while
    /// halted; the timers and the PPU then catch up on the elapsed time.
    pub fn run_for(&mut self, cycles: usize) {
        let target = self.bus.cycles() + cycles;

        while self.bus.cycles() < target {
            let start = self.bus.cycles();

            if self.bus.haltcnt != HaltState::Running && self.bus.intc.any_pending() {
                self.bus.haltcnt = HaltState::Running;
            }

            if self.bus.dma_active() {
                self.bus.run_dma();
            } else if self.bus.haltcnt == HaltState::Running {
                self.bus.clear_dma_triggers();
                if self.bus.intc.irq_pending() {
                    self.cpu.fire_irq();
                }
                self.cpu.step(&mut self.bus);
            } else {
                self.bus.clear_dma_triggers();
                self.bus.idle_cycles(4);
            }

            let elapsed = self.bus.cycles() - start;
            self.bus.tick_devices(elapsed);
        }
    }

    pub fn run_frame(&mut self) {
        self.run_for(CYCLES_FULL_FRAME);
    }

    /// 240x160 ARGB8888 pixels of the last completed frame.
    pub fn frame_buffer(&self) -> &[u32] {
        &self.bus.gpu.frame_buffer
    }

    pub fn frame_ready(&mut self) -> bool {
        self.bus.gpu.frame_ready()
    }

    pub fn set_key(&mut self, key: Keys, pressed: bool) {
        self.bus.keypad.set_key(key, pressed);
    }
}
