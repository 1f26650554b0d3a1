//! LEAP16 Emulator - CLI Entry Point
//!
//! Commands:
//! - `leap16-emu run <image>` - Run a program image
//! - `leap16-emu debug <image>` - Interactive debugger
//! - `leap16-emu convert <in> <out>` - Convert between hex and binary images
//! - `leap16-emu test` - Built-in self-test

use clap::{Parser, Subcommand, ValueEnum};
use leap16::{ByteOrder, CounterWidth, ImageFormat, MachineConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "leap16-emu")]
#[command(version)]
#[command(about = "A functional emulator of the LEAP16 16-bit computer")]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the program image
        program: String,
        #[command(flatten)]
        image: ImageArgs,
        /// Stop after this many cycles even without HALT (0 = no limit)
        #[arg(short, long, default_value = "1000000")]
        max_cycles: u64,
        /// Cycle counter width
        #[arg(short, long, value_enum, default_value = "wide")]
        counter: CounterArg,
        /// Print one line per executed instruction
        #[arg(short, long)]
        trace: bool,
        /// Number of memory words from address 0 to include in the dump
        #[arg(long, default_value = "16")]
        io_words: usize,
        /// Print the final state as JSON instead of a text dump
        #[arg(long)]
        json: bool,
    },
    /// Interactive debugger
    Debug {
        /// Path to the program image
        program: String,
        #[command(flatten)]
        image: ImageArgs,
        /// Cycle counter width
        #[arg(short, long, value_enum, default_value = "wide")]
        counter: CounterArg,
    },
    /// Convert an image between hex text and binary
    Convert {
        input: String,
        output: String,
        #[command(flatten)]
        image: ImageArgs,
        /// Format of the output file (default: from its extension)
        #[arg(long, value_enum)]
        to: Option<FormatArg>,
    },
    /// Run the built-in self-test
    Test,
}

#[derive(clap::Args)]
struct ImageArgs {
    /// Image format (default: from the file extension)
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,
    /// Byte order of binary images
    #[arg(short, long, value_enum, default_value = "big")]
    byte_order: ByteOrderArg,
}

impl ImageArgs {
    fn format_for(&self, path: &str) -> ImageFormat {
        self.format.map(Into::into).unwrap_or_else(|| ImageFormat::from_path(path))
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Binary,
    Hex,
}

impl From<FormatArg> for ImageFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Binary => ImageFormat::Binary,
            FormatArg::Hex => ImageFormat::Hex,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ByteOrderArg {
    Big,
    Little,
}

impl From<ByteOrderArg> for ByteOrder {
    fn from(arg: ByteOrderArg) -> Self {
        match arg {
            ByteOrderArg::Big => ByteOrder::Big,
            ByteOrderArg::Little => ByteOrder::Little,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CounterArg {
    /// 64-bit counter
    Wide,
    /// 16-bit counter, wraps at 0xFFFF
    Narrow,
}

impl From<CounterArg> for MachineConfig {
    fn from(arg: CounterArg) -> Self {
        let counter = match arg {
            CounterArg::Wide => CounterWidth::Wide,
            CounterArg::Narrow => CounterWidth::Narrow,
        };
        MachineConfig { counter }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Run { program, image, max_cycles, counter, trace, io_words, json }) => {
            run_program(&program, &image, max_cycles, counter.into(), trace, io_words, json);
        }
        Some(Commands::Debug { program, image, counter }) => {
            debug_program(&program, &image, counter.into());
        }
        Some(Commands::Convert { input, output, image, to }) => {
            convert_image(&input, &output, &image, to);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("LEAP16 Emulator v{}", env!("CARGO_PKG_VERSION"));
            println!("A 16-bit computer emulator");
            println!();
            println!("Use --help for available commands");
            println!();
            demo_program();
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_words(path: &str, image: &ImageArgs) -> Vec<u16> {
    let format = image.format_for(path);
    match leap16::load_image(path, format, image.byte_order.into()) {
        Ok(words) => words,
        Err(e) => {
            eprintln!("❌ Failed to load image: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_program(
    path: &str,
    image: &ImageArgs,
    max_cycles: u64,
    config: MachineConfig,
    trace: bool,
    io_words: usize,
    json: bool,
) {
    use leap16::Machine;

    let words = load_words(path, image);
    if words.is_empty() {
        tracing::warn!(path, "image is empty; running all-zero memory");
    }

    let mut machine = Machine::with_config(config);
    if let Err(e) = machine.load_program(&words) {
        eprintln!("❌ Failed to load program: {}", e);
        std::process::exit(1);
    }

    if !json {
        println!("🔧 Running: {} ({} words)", path, words.len());
        println!();
    }

    let halted = run_bounded(&mut machine, max_cycles, trace);

    if json {
        match serde_json::to_string_pretty(&serde_json::json!({
            "halted": halted,
            "cycles": machine.cycles,
            "registers": machine.regs.as_array(),
            "stack": machine.stack(),
            "config": machine.config(),
        })) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("❌ Failed to serialize state: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    println!("━━━ Result ━━━");
    print!("{}", leap16::dump::full(&machine, io_words));

    if !halted {
        println!();
        println!("⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.", max_cycles);
    }
}

/// Cycle until HALT or `max_cycles` (0 = no limit). Returns whether HALT
/// executed. The machine itself has no cycle limit, so the limit lives here.
fn run_bounded(machine: &mut leap16::Machine, max_cycles: u64, trace: bool) -> bool {
    let mut executed = 0u64;
    while max_cycles == 0 || executed < max_cycles {
        let ip = machine.regs.ip();
        let word = machine.mem.read(ip);

        let halted = machine.cycle();
        executed += 1;

        if trace {
            println!("{:04X}: {:04X}  {:?}", ip, word, leap16::decode(word));
        }
        if halted {
            return true;
        }
    }
    false
}

#[cfg(feature = "tui")]
fn debug_program(path: &str, image: &ImageArgs, config: MachineConfig) {
    let words = load_words(path, image);
    if let Err(e) = leap16::run_debugger(words, config) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &str, _image: &ImageArgs, _config: MachineConfig) {
    eprintln!("❌ Debugger not available: built without the `tui` feature");
    std::process::exit(1);
}

fn convert_image(input: &str, output: &str, image: &ImageArgs, to: Option<FormatArg>) {
    let words = load_words(input, image);
    let out_format = to.map(Into::into).unwrap_or_else(|| ImageFormat::from_path(output));

    println!("📝 Converting: {} → {} ({:?})", input, output, out_format);

    if let Err(e) = leap16::save_image(output, &words, out_format, image.byte_order.into()) {
        eprintln!("❌ Failed to save image: {}", e);
        std::process::exit(1);
    }

    println!("✓ Wrote {} words", words.len());
}

/// Multiply 6 by 7 by repeated addition through a subroutine. The result
/// lands at address 0x000F.
fn demo_image() -> Vec<u16> {
    use leap16::{encode, Instruction as I};

    let mut words: Vec<u16> = [
        // r1 = 6, r2 = 7, r3 = 1 from the data block at 0x000C
        I::Load { base: 0, offset: 0xC, dest: 1 },
        I::Load { base: 0, offset: 0xD, dest: 2 },
        I::Load { base: 0, offset: 0xE, dest: 3 },
        I::LeapLink { base: 0, offset: 6 }, // call multiply
        I::Store { base: 0, offset: 0xF, src: 4 },
        I::Halt,
        // multiply: r4 += r1, r2 times
        I::LeapEqual { x: 2, y: 0, offset: 3 },
        I::Add { x: 4, y: 1, dest: 4 },
        I::Sub { x: 2, y: 3, dest: 2 },
        I::Leap { base: 0, offset: 6 },
        I::ReturnLink,
    ]
    .iter()
    .map(encode)
    .collect();

    words.resize(0xC, 0);
    words.extend_from_slice(&[6, 7, 1]);
    words
}

fn demo_program() {
    use leap16::Machine;

    println!("━━━ Demo: 6 × 7 by repeated addition ━━━");
    println!();

    let mut machine = Machine::new();
    if let Err(e) = machine.load_program(&demo_image()) {
        eprintln!("❌ Failed to load demo: {}", e);
        std::process::exit(1);
    }
    machine.run();

    println!("  result m000F = {}", machine.mem.read(0x000F));
    println!("  cycles    = {}", machine.cycles);
    println!();
    println!("✓ Demo finished");
}

fn run_self_test() {
    use leap16::{encode, Instruction as I, Machine, MachineConfig};

    println!("━━━ LEAP16 Emulator Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    let mut check = |name: &str, ok: bool| {
        print!("{}... ", name);
        if ok {
            println!("✓");
            passed += 1;
        } else {
            println!("✗");
            failed += 1;
        }
    };

    // Lone HALT
    let mut machine = Machine::new();
    let loaded = machine.load_program(&[encode(&I::Halt)]).is_ok();
    check(
        "HALT on first cycle",
        loaded && machine.cycle() && machine.regs.ip() == 1 && machine.cycles == 1,
    );

    // Wrapping add/sub
    let mut machine = Machine::new();
    let program: Vec<u16> = [
        I::Add { x: 1, y: 2, dest: 3 },
        I::Sub { x: 3, y: 2, dest: 4 },
        I::Halt,
    ]
    .iter()
    .map(encode)
    .collect();
    let loaded = machine.load_program(&program).is_ok();
    machine.regs.set(1, 0xFFF0);
    machine.regs.set(2, 0x0020);
    machine.run();
    check(
        "Wrapping add then sub",
        loaded && machine.regs.get(3) == 0x0010 && machine.regs.get(4) == 0xFFF0,
    );

    // Shift discards bits
    let mut machine = Machine::new();
    let loaded = machine
        .load_program(&[encode(&I::ShiftLeft { src: 1, amount: 1, dest: 2 }), encode(&I::Halt)])
        .is_ok();
    machine.regs.set(1, 0x8000);
    machine.run();
    check("0x8000 SL 1 == 0", loaded && machine.regs.get(2) == 0);

    // Link and return
    let mut machine = Machine::new();
    let loaded = machine
        .load_program(&[
            encode(&I::LeapLink { base: 0, offset: 2 }),
            encode(&I::Halt),
            encode(&I::ReturnLink),
        ])
        .is_ok();
    machine.run();
    check(
        "LL then RL returns",
        loaded && machine.regs.ip() == 2 && machine.regs.sp() == 0 && machine.cycles == 3,
    );

    // Demo program
    let mut machine = Machine::new();
    let loaded = machine.load_program(&demo_image()).is_ok();
    machine.run();
    check("Subroutine multiply", loaded && machine.mem.read(0x000F) == 42);

    // Narrow counter
    let mut machine = Machine::with_config(MachineConfig { counter: CounterWidth::Narrow });
    machine.cycles = 0xFFFF;
    machine.cycle();
    check("16-bit counter wraps", machine.cycles == 0);

    // Oversize image
    let mut machine = Machine::new();
    check(
        "Oversize image rejected",
        machine.load_program(&vec![0; leap16::machine::MEMORY_SIZE + 1]).is_err(),
    );

    // Reset
    machine.regs.set(5, 5);
    machine.cycle();
    machine.reset();
    check("Reset restores zero state", machine == Machine::new());

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
