/// # driver
///
/// Runs the interpreter against the wall clock. It's a two-state machine:
/// `Running` until either the user quits or the program runs off its end,
/// then `Stopped` for good. Each pass of the loop:
///
///  1. if a cycle budget's worth of time has gone by, run one instruction
///     and redraw if it asked for it
///  2. count down the timers once per elapsed 1/60s
///  3. drain the input; quit stops us, keys go to the keypad
///  4. let go of keys held too long, for inputs that can't report releases
///  5. sleep briefly so we don't spin the host CPU
///
/// `tick()` is one pass without the sleep and takes the time as an
/// argument, so it can be driven by a fake clock.
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::display::Display;
use crate::error::Chip8Error;
use crate::input::{Input, InputEvent};
use crate::interpreter::{Chip8Interpreter, Cycle, Effect};

/// the CHIP-8 timers always run at 60Hz
pub const TIMER_PERIOD: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// pacing knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// minimum time between two instructions
    pub cycle_budget: Duration,
    /// how long a key counts as held when the input can't report releases
    pub key_hold: Duration,
    /// how long to sleep between passes
    pub idle: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            // ~500 instructions a second
            cycle_budget: Duration::from_micros(2000),
            key_hold: Duration::from_millis(150),
            idle: Duration::from_micros(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Quit,
    /// fetched 0x0000 at `addr`
    EndOfProgram { addr: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Running,
    Stopped(StopReason),
}

pub struct Driver<'a> {
    interpreter: Chip8Interpreter,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    config: DriverConfig,
    state: DriverState,
    last_cycle: Option<Instant>,
    next_timer_tick: Option<Instant>,
    held_until: [Option<Instant>; 16],
}

impl<'a> Driver<'a> {
    pub fn new(
        interpreter: Chip8Interpreter,
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        config: DriverConfig,
    ) -> Self {
        Driver {
            interpreter,
            display,
            input,
            config,
            state: DriverState::Running,
            last_cycle: None,
            next_timer_tick: None,
            held_until: [None; 16],
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn interpreter(&self) -> &Chip8Interpreter {
        &self.interpreter
    }

    pub fn interpreter_mut(&mut self) -> &mut Chip8Interpreter {
        &mut self.interpreter
    }

    /// loop until stopped, then tear the display down
    pub fn run(&mut self) -> Result<StopReason, Chip8Error> {
        info!("running with {:?}", self.config);
        let result = loop {
            if let Err(e) = self.tick(Instant::now()) {
                break Err(e);
            }
            if let DriverState::Stopped(reason) = self.state {
                break Ok(reason);
            }
            spin_sleep::sleep(self.config.idle);
        };
        self.display.teardown().map_err(Chip8Error::Display)?;
        result
    }

    /// one pass of the loop at time `now`
    pub fn tick(&mut self, now: Instant) -> Result<DriverState, Chip8Error> {
        if self.state != DriverState::Running {
            return Ok(self.state);
        }

        let due = match self.last_cycle {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.config.cycle_budget,
        };
        if due {
            self.last_cycle = Some(now);
            match self.interpreter.cycle() {
                Cycle::Ran(Effect::Redraw) => self
                    .display
                    .draw(&self.interpreter.machine().framebuffer)
                    .map_err(Chip8Error::Display)?,
                Cycle::Ran(Effect::None) | Cycle::Idle => {}
                Cycle::EndOfProgram { addr } => {
                    self.stop(StopReason::EndOfProgram { addr });
                    return Ok(self.state);
                }
            }
        }

        self.tick_timers(now);

        let reports_key_up = self.input.reports_key_up();
        for event in self.input.poll().map_err(Chip8Error::Input)? {
            match event {
                InputEvent::Quit => {
                    self.stop(StopReason::Quit);
                    return Ok(self.state);
                }
                InputEvent::KeyDown(key) => {
                    self.interpreter.key_down(key);
                    if !reports_key_up {
                        self.held_until[(key & 0x0f) as usize] = Some(now + self.config.key_hold);
                    }
                }
                InputEvent::KeyUp(key) => self.interpreter.key_up(key),
            }
        }

        if !reports_key_up {
            self.release_stale_keys(now);
        }
        Ok(self.state)
    }

    fn tick_timers(&mut self, now: Instant) {
        let next = self.next_timer_tick.get_or_insert(now + TIMER_PERIOD);
        while now >= *next {
            self.interpreter.tick_timers();
            *next += TIMER_PERIOD;
        }
    }

    fn release_stale_keys(&mut self, now: Instant) {
        for (key, held) in self.held_until.iter_mut().enumerate() {
            if matches!(held, Some(until) if *until <= now) {
                *held = None;
                self.interpreter.key_up(key as u8);
            }
        }
    }

    fn stop(&mut self, reason: StopReason) {
        info!("stopping after {} fetches: {:?}", self.interpreter.fetches(), reason);
        debug!("final registers: {:02x?}", self.interpreter.machine().v);
        self.state = DriverState::Stopped(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DummyDisplay;
    use crate::input::DummyInput;
    use crate::interpreter::Quirks;

    const STEP: Duration = Duration::from_micros(2000);

    fn interpreter_with(rom: &[u8]) -> Chip8Interpreter {
        let mut i = Chip8Interpreter::with_seed(Quirks::default(), 1);
        i.load_rom(rom).unwrap();
        i
    }

    /// tick once per cycle budget until stopped or out of passes
    fn tick_until_stopped(driver: &mut Driver, start: Instant, passes: u32) -> Instant {
        let mut now = start;
        for _ in 0..passes {
            if driver.tick(now).unwrap() != DriverState::Running {
                break;
            }
            now += STEP;
        }
        now
    }

    #[test]
    fn test_end_to_end_minimal_rom() {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new();
        let i = interpreter_with(&[0x00, 0xe0, 0x60, 0x05, 0x00, 0x00]);
        let mut d = Driver::new(i, &mut display, &mut input, DriverConfig::default());
        tick_until_stopped(&mut d, Instant::now(), 10);

        assert_eq!(
            d.state(),
            DriverState::Stopped(StopReason::EndOfProgram { addr: 0x204 })
        );
        assert_eq!(d.interpreter().fetches(), 3);
        assert_eq!(d.interpreter().machine().v[0], 5);
        assert!(d.interpreter().machine().framebuffer.is_blank());
        drop(d);
        assert_eq!(display.draws, 1);
    }

    #[test]
    fn test_end_of_program_leaves_framebuffer() {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new();
        // draw glyph 0 then stop
        let i = interpreter_with(&[0xf0, 0x29, 0xd0, 0x05]);
        let mut d = Driver::new(i, &mut display, &mut input, DriverConfig::default());
        tick_until_stopped(&mut d, Instant::now(), 10);
        assert!(matches!(d.state(), DriverState::Stopped(StopReason::EndOfProgram { .. })));
        let frame = d.interpreter().machine().framebuffer.clone();
        // further ticks do nothing
        d.tick(Instant::now() + Duration::from_secs(1)).unwrap();
        assert_eq!(d.interpreter().machine().framebuffer, frame);
        assert_eq!(d.interpreter().fetches(), 3);
        drop(d);
        assert_eq!(display.draws, 1);
        assert_eq!(display.last_frame, Some(frame));
    }

    #[test]
    fn test_cycle_budget_paces_instructions() {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new();
        // 1200: spin forever
        let i = interpreter_with(&[0x12, 0x00]);
        let mut d = Driver::new(i, &mut display, &mut input, DriverConfig::default());
        let t0 = Instant::now();
        d.tick(t0).unwrap();
        d.tick(t0 + Duration::from_micros(500)).unwrap();
        d.tick(t0 + Duration::from_micros(1999)).unwrap();
        assert_eq!(d.interpreter().fetches(), 1);
        d.tick(t0 + Duration::from_micros(2000)).unwrap();
        assert_eq!(d.interpreter().fetches(), 2);
    }

    #[test]
    fn test_unknown_instruction_keeps_running() {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new();
        let i = interpreter_with(&[0xff, 0xff, 0x61, 0x02, 0x12, 0x04]);
        let mut d = Driver::new(i, &mut display, &mut input, DriverConfig::default());
        tick_until_stopped(&mut d, Instant::now(), 5);
        assert_eq!(d.state(), DriverState::Running);
        assert_eq!(d.interpreter().machine().v[1], 2);
    }

    #[test]
    fn test_quit_stops_driver() {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new();
        input.push(&[]);
        input.push(&[InputEvent::KeyDown(1), InputEvent::Quit]);
        let i = interpreter_with(&[0x12, 0x00]);
        let mut d = Driver::new(i, &mut display, &mut input, DriverConfig::default());
        tick_until_stopped(&mut d, Instant::now(), 10);
        assert_eq!(d.state(), DriverState::Stopped(StopReason::Quit));
        assert_eq!(d.interpreter().fetches(), 2);
    }

    #[test]
    fn test_timers_count_down_at_60hz() {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new();
        let mut i = interpreter_with(&[0x12, 0x00]);
        i.machine_mut().delay_timer = 10;
        i.machine_mut().sound_timer = 2;
        let mut d = Driver::new(i, &mut display, &mut input, DriverConfig::default());
        let t0 = Instant::now();
        d.tick(t0).unwrap();
        assert_eq!(d.interpreter().machine().delay_timer, 10);
        d.tick(t0 + TIMER_PERIOD).unwrap();
        assert_eq!(d.interpreter().machine().delay_timer, 9);
        // a long stall catches up on every missed tick
        d.tick(t0 + TIMER_PERIOD * 4).unwrap();
        assert_eq!(d.interpreter().machine().delay_timer, 6);
        assert_eq!(d.interpreter().machine().sound_timer, 0);
    }

    #[test]
    fn test_key_down_satisfies_wait() {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new();
        input.push(&[]);
        input.push(&[InputEvent::KeyDown(0x7)]);
        // LD V2, K; JP 202
        let i = interpreter_with(&[0xf2, 0x0a, 0x12, 0x02]);
        let mut d = Driver::new(i, &mut display, &mut input, DriverConfig::default());
        tick_until_stopped(&mut d, Instant::now(), 4);
        assert_eq!(d.interpreter().machine().v[2], 0x7);
        assert_eq!(d.interpreter().machine().awaiting_key, None);
    }

    #[test]
    fn test_terminal_keys_released_after_hold() {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new();
        input.push(&[InputEvent::KeyDown(0x3)]);
        let i = interpreter_with(&[0x12, 0x00]);
        let config = DriverConfig::default();
        let mut d = Driver::new(i, &mut display, &mut input, config);
        let t0 = Instant::now();
        d.tick(t0).unwrap();
        assert!(d.interpreter().machine().keypad.is_pressed(0x3));
        d.tick(t0 + config.key_hold / 2).unwrap();
        assert!(d.interpreter().machine().keypad.is_pressed(0x3));
        d.tick(t0 + config.key_hold).unwrap();
        assert!(!d.interpreter().machine().keypad.is_pressed(0x3));
    }

    #[test]
    fn test_key_up_events_release_keys() {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new().with_key_up();
        input.push(&[InputEvent::KeyDown(0x3)]);
        input.push(&[]);
        input.push(&[InputEvent::KeyUp(0x3)]);
        let i = interpreter_with(&[0x12, 0x00]);
        let mut d = Driver::new(i, &mut display, &mut input, DriverConfig::default());
        let t0 = Instant::now();
        d.tick(t0).unwrap();
        // held well past the terminal hold window
        d.tick(t0 + Duration::from_secs(5)).unwrap();
        assert!(d.interpreter().machine().keypad.is_pressed(0x3));
        d.tick(t0 + Duration::from_secs(6)).unwrap();
        assert!(!d.interpreter().machine().keypad.is_pressed(0x3));
    }

    #[test]
    fn test_run_tears_down_display() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new();
        let config = DriverConfig {
            cycle_budget: Duration::ZERO,
            idle: Duration::ZERO,
            ..DriverConfig::default()
        };
        let i = interpreter_with(&[0x60, 0x01, 0x00, 0xe0]);
        let mut d = Driver::new(i, &mut display, &mut input, config);
        assert_eq!(d.run()?, StopReason::EndOfProgram { addr: 0x204 });
        drop(d);
        assert!(display.torn_down);
        assert_eq!(display.draws, 1);
        Ok(())
    }
}
