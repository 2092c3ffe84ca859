use crate::interrupt::Interrupt;

const PRESCALER_SHIFT: [usize; 4] = [0, 6, 8, 10];

bitfield::bitfield! {
    #[derive(Clone, Copy, Default)]
    pub struct TimerCtl(u16);
    impl Debug;
    u16;
    pub prescaler, _: 1, 0;
    pub count_up, _: 2;
    pub irq_enabled, _: 6;
    pub enabled, _: 7;
}

#[derive(Clone, Debug)]
pub struct Timer {
    pub ctl: TimerCtl,
    pub count: u16,
    pub reload: u16,
    ticks: usize,
    irq: Interrupt,
}

impl Timer {
    fn new(id: usize) -> Self {
        Self {
            ctl: TimerCtl::default(),
            count: 0,
            reload: 0,
            ticks: 0,
            irq: match id {
                0 => Interrupt::Timer0Overflow,
                1 => Interrupt::Timer1Overflow,
                2 => Interrupt::Timer2Overflow,
                _ => Interrupt::Timer3Overflow,
            },
        }
    }

    /// Advances the counter, reloading on wraparound. Returns how many times
    /// it overflowed.
    fn advance(&mut self, increments: usize) -> usize {
        if increments == 0 {
            return 0;
        }
        let mut left = increments;
        let mut overflows = 0;

        let to_overflow = 0x1_0000 - self.count as usize;
        if left >= to_overflow {
            overflows = 1;
            left -= to_overflow;
            self.count = self.reload;

            let period = 0x1_0000 - self.reload as usize;
            overflows += left / period;
            left %= period;
        }
        self.count = self.count.wrapping_add(left as u16);
        overflows
    }
}

pub struct Timers {
    pub timers: [Timer; 4],
}

impl Timers {
    pub fn new() -> Self {
        Self {
            timers: [Timer::new(0), Timer::new(1), Timer::new(2), Timer::new(3)],
        }
    }

    /// Batched tick. The overflow count of each timer is latched before the
    /// next one runs, so chaining sees this step's overflows exactly once.
    /// Returns the IF bits to raise.
    pub fn run(&mut self, cycles: usize) -> u16 {
        let mut irq = 0;
        let mut previous_overflows = 0;

        for i in 0..4 {
            let timer = &mut self.timers[i];
            if !timer.ctl.enabled() {
                previous_overflows = 0;
                continue;
            }

            let increments = if timer.ctl.count_up() && i != 0 {
                previous_overflows
            } else {
                timer.ticks += cycles;
                let shift = PRESCALER_SHIFT[timer.ctl.prescaler() as usize];
                let increments = timer.ticks >> shift;
                timer.ticks &= (1 << shift) - 1;
                increments
            };

            let overflows = timer.advance(increments);
            if overflows > 0 && timer.ctl.irq_enabled() {
                irq |= timer.irq.mask();
            }
            previous_overflows = overflows;
        }
        irq
    }

    /// TMxCNT_L writes the reload value, not the counter.
    pub fn write_reload(&mut self, id: usize, value: u16) {
        self.timers[id].reload = value;
    }

    pub fn read_count(&self, id: usize) -> u16 {
        self.timers[id].count
    }

    pub fn reload_value(&self, id: usize) -> u16 {
        self.timers[id].reload
    }

    pub fn read_ctl(&self, id: usize) -> u16 {
        self.timers[id].ctl.0 & 0x00C7
    }

    /// The 0-to-1 enable edge loads the counter from the reload register.
    pub fn write_ctl(&mut self, id: usize, value: u16) {
        let timer = &mut self.timers[id];
        let new_ctl = TimerCtl(value & 0x00C7);
        if new_ctl.enabled() && !timer.ctl.enabled() {
            timer.count = timer.reload;
            timer.ticks = 0;
        }
        timer.ctl = new_ctl;
    }
}

impl Default for Timers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cascade_single_tick() {
        let mut timers = Timers::new();
        timers.write_reload(0, 0xFFFF);
        timers.write_ctl(0, 0x80);
        timers.write_ctl(1, 0x84); // count-up + enabled

        let irq = timers.run(1);
        assert_eq!(irq, 0);
        assert_eq!(timers.read_count(0), 0xFFFF);
        assert_eq!(timers.read_count(1), 1);
    }

    #[test]
    fn overflow_irq_and_reload() {
        let mut timers = Timers::new();
        timers.write_reload(0, 0xFFF0);
        timers.write_ctl(0, 0xC0); // irq + enabled

        assert_eq!(timers.run(0xF), 0);
        assert_eq!(timers.read_count(0), 0xFFFF);
        assert_eq!(timers.run(1), Interrupt::Timer0Overflow.mask());
        assert_eq!(timers.read_count(0), 0xFFF0);
    }

    #[test]
    fn prescaler_divides_clock() {
        let mut timers = Timers::new();
        timers.write_ctl(2, 0x81); // prescaler /64
        timers.run(63);
        assert_eq!(timers.read_count(2), 0);
        timers.run(1);
        assert_eq!(timers.read_count(2), 1);
        timers.run(128);
        assert_eq!(timers.read_count(2), 3);
    }

    #[test]
    fn batched_cascade_counts_every_overflow() {
        let mut timers = Timers::new();
        timers.write_reload(0, 0xFF00); // period 256
        timers.write_ctl(0, 0x80);
        timers.write_ctl(1, 0x84);

        timers.run(0x1_0000 - 0xFF00); // first overflow
        timers.run(256 * 3); // three more
        assert_eq!(timers.read_count(1), 4);
    }

    #[test]
    fn disabled_timer_breaks_the_chain() {
        let mut timers = Timers::new();
        timers.write_reload(0, 0xFFFF);
        timers.write_ctl(0, 0x80);
        // Timer 1 disabled, timer 2 counts up.
        timers.write_ctl(2, 0x84);

        timers.run(1);
        assert_eq!(timers.read_count(2), 0);
    }

    #[test]
    fn enable_edge_reloads_counter() {
        let mut timers = Timers::new();
        timers.write_reload(3, 0x1234);
        timers.write_ctl(3, 0x80);
        assert_eq!(timers.read_count(3), 0x1234);
    }
}
