//! A CHIP-8 interpreter.
//!
//! ## Design
//!
//! * machine state is one struct, owned by the interpreter and passed by
//!   `&mut` into every handler; no globals
//! * instructions decode into a closed enum; anything unrecognised is an
//!   `Unknown` that gets logged and skipped rather than crashing
//! * a fetched 0x0000 means we ran off the end of the program, which stops
//!   the machine
//! * abstract display so can plug alternatives; starting with TUI in-console
//! * input device, with trait for reading key-presses
//! * instructions are paced against the wall clock by a fixed cycle budget
//!   (~500/s); timers tick at 60Hz independently of that
//!
//! Model
//!
//! main
//!  |-- display, input, config(quirks, pacing)
//!  |-- interpreter(config)
//!  |    `-- machine: memory(glyphs, program), registers, stack, timers,
//!  |        keypad, framebuffer
//!  `-- driver(interpreter, display, input)
//!       |-- every cycle budget: interpreter.cycle(); redraw if asked
//!       |-- every 1/60s: interpreter.tick_timers()
//!       |-- input.poll(): quit => Stopped, keys => keypad
//!       `-- sleep(idle)
pub mod display;
pub mod driver;
pub mod error;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod machine;
pub mod memory;
