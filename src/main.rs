use std::error::Error;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use tracing::{error, info, Level};

use chip8::display::MonoTermDisplay;
use chip8::driver::{Driver, DriverConfig, StopReason};
use chip8::error::Chip8Error;
use chip8::input::TermInput;
use chip8::interpreter::{Chip8Interpreter, Quirks};
use chip8::memory::CHIP8_PROGRAM_ADDR;

#[derive(Parser)]
#[command(name = "chip8")]
#[command(about = "Run a CHIP-8 ROM in the terminal. Esc or ctrl-c quits.")]
struct Cli {
    /// Path to the ROM image
    rom: PathBuf,

    /// Minimum microseconds between two instructions
    #[arg(long, default_value_t = 2000)]
    cycle_us: u64,

    /// How long a terminal key press counts as held, in milliseconds
    #[arg(long, default_value_t = 150)]
    key_hold_ms: u64,

    /// 8XY6/8XYE shift VY into VX, like the COSMAC VIP
    #[arg(long)]
    shift_uses_vy: bool,

    /// FX55/FX65 advance I past the last register, like the COSMAC VIP
    #[arg(long)]
    load_store_advances_index: bool,

    /// Print a hex dump of memory to stdout after loading the ROM
    #[arg(long, value_enum)]
    dump_memory: Option<DumpRange>,

    /// Write logs here instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// More logging; repeat for more still
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum DumpRange {
    /// all 4K
    All,
    /// just the interpreter area below 0x200
    Reserved,
}

fn init_logging(cli: &Cli) -> Result<(), io::Error> {
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);
    match &cli.log_file {
        Some(path) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(File::create(path)?))
            .init(),
        None => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version aren't failures
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            e.print()?;
            return Ok(code);
        }
    };
    init_logging(&cli)?;

    // load a program
    let quirks = Quirks {
        shift_uses_vy: cli.shift_uses_vy,
        load_store_advances_index: cli.load_store_advances_index,
    };
    let mut interpreter = Chip8Interpreter::new(quirks);
    info!("opening {}", cli.rom.display());
    let loaded = File::open(&cli.rom)
        .map_err(Chip8Error::RomUnreadable)
        .and_then(|mut f| interpreter.load_program(&mut f));
    let len = match loaded {
        Ok(len) => len,
        Err(e) => {
            error!("unable to load {}: {}", cli.rom.display(), e);
            return Err(e.into());
        }
    };
    info!("loaded {} bytes", len);

    if let Some(range) = cli.dump_memory {
        let len = match range {
            DumpRange::All => 0x1000,
            DumpRange::Reserved => CHIP8_PROGRAM_ADDR as usize,
        };
        interpreter
            .machine()
            .memory
            .dump(&mut io::stdout().lock(), 0, len)?;
    }

    // initialise
    let mut display = MonoTermDisplay::new().map_err(Chip8Error::Display)?;
    let mut input = TermInput::new().map_err(Chip8Error::Input)?;
    let config = DriverConfig {
        cycle_budget: Duration::from_micros(cli.cycle_us),
        key_hold: Duration::from_millis(cli.key_hold_ms),
        ..DriverConfig::default()
    };
    let reason = Driver::new(interpreter, &mut display, &mut input, config).run()?;

    // restore the terminal before saying anything else
    drop(input);
    drop(display);
    match reason {
        StopReason::Quit => {
            info!("closing");
            Ok(ExitCode::SUCCESS)
        }
        StopReason::EndOfProgram { addr } => {
            error!("ran off the end of the program at 0x{:04x}", addr);
            Ok(ExitCode::FAILURE)
        }
    }
}
