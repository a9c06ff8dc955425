//! xip8 observer - CLI Entry Point
//!
//! Commands:
//! - `xip8-observer state <frame>` - Decode a CPU-state frame file
//! - `xip8-observer display <frame>` - Decode a display frame file
//! - `xip8-observer opcode <hex>` - Split an opcode into its fields
//! - `xip8-observer send <command>` - Send start/stop/step/reset

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use observer::protocol::{decode_display, decode_state};
use observer::{Command, ObserverConfig, Observer, OpcodeFields, ScreenSize, StateLayout};

#[derive(Parser)]
#[command(name = "xip8-observer")]
#[command(version = "0.1.0")]
#[command(about = "Decode telemetry from and send commands to a running CHIP-8 instance")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a CPU-state frame read from a file
    State {
        /// Path to the raw frame
        frame: PathBuf,
        /// The frame carries the screen size after the timers
        #[arg(long)]
        with_screen_size: bool,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Decode a display frame read from a file
    Display {
        /// Path to the raw frame
        frame: PathBuf,
        /// Screen width in pixels (default: from config)
        #[arg(long)]
        width: Option<u8>,
        /// Screen height in pixels (default: from config)
        #[arg(long)]
        height: Option<u8>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Split a hex opcode into its fields
    Opcode {
        /// Opcode, e.g. D125 or 0xD125
        value: String,
    },
    /// Send a control command to the instance
    Send {
        /// start, stop, step or reset
        command: Command,
        /// host:port of the instance (default: from config)
        #[arg(short, long)]
        target: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    match cli.command {
        Commands::State { frame, with_screen_size, json } => {
            let layout = if with_screen_size { StateLayout::WithScreenSize } else { config.layout };
            show_state(&frame, layout, json);
        }
        Commands::Display { frame, width, height, json } => {
            let width = width.unwrap_or(config.screen.width());
            let height = height.unwrap_or(config.screen.height());
            show_display(&frame, width, height, json);
        }
        Commands::Opcode { value } => {
            show_opcode(&value);
        }
        Commands::Send { command, target } => {
            let mut config = config;
            if let Some(target) = target {
                config.target = target;
            }
            send_command(config, command);
        }
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {}", message);
    process::exit(1);
}

fn load_config(path: Option<&PathBuf>) -> ObserverConfig {
    match path {
        Some(path) => ObserverConfig::load(path)
            .unwrap_or_else(|e| fail(format!("{}: {}", path.display(), e))),
        None => ObserverConfig::default(),
    }
}

fn read_frame(path: &PathBuf) -> Vec<u8> {
    std::fs::read(path).unwrap_or_else(|e| fail(format!("failed to read {}: {}", path.display(), e)))
}

fn show_state(path: &PathBuf, layout: StateLayout, json: bool) {
    let bytes = read_frame(path);
    let frame = decode_state(&bytes, layout).unwrap_or_else(|e| fail(e));
    let state = frame.state;
    let fields = state.fields();

    if json {
        let value = serde_json::json!({
            "state": state,
            "fields": fields,
            "mnemonic": fields.mnemonic(),
            "screen": frame.screen,
        });
        println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|e| fail(e)));
        return;
    }

    println!("Opcode: {}", fields);
    println!("  op={:04X} x={:X} y={:X} n={:X} nnn={:03X} kk={:02X}",
        fields.op_bits(), fields.x, fields.y, fields.n, fields.nnn, fields.kk);
    println!("PC:     {:04X}", state.pc);
    println!("I:      {:04X}", state.i);
    for (row, chunk) in state.registers.chunks(8).enumerate() {
        let line: Vec<String> = chunk
            .iter()
            .enumerate()
            .map(|(k, v)| format!("V{:X}={:02X}", row * 8 + k, v))
            .collect();
        println!("{}", line.join(" "));
    }
    println!("SP:     {}", state.stack_pointer);
    for (depth, entry) in state.live_stack().iter().enumerate() {
        println!("  [{:02}] {:04X}", depth, *entry as u16);
    }
    println!("Delay:  {}", state.delay);
    println!("Timer:  {}", state.timer);
    if let Some(screen) = frame.screen {
        println!("Screen: {}", screen);
    }
}

fn show_display(path: &PathBuf, width: u8, height: u8, json: bool) {
    let size = ScreenSize::new(width, height).unwrap_or_else(|e| fail(e));
    let bytes = read_frame(path);
    let fb = decode_display(&bytes, size).unwrap_or_else(|e| fail(e));

    if json {
        println!("{}", serde_json::to_string(&fb).unwrap_or_else(|e| fail(e)));
        return;
    }

    println!("{} ({} lit)", size, fb.lit_count());
    print!("{}", fb);
}

fn show_opcode(value: &str) {
    let digits = value.trim_start_matches("0x").trim_start_matches("0X");
    let raw = u16::from_str_radix(digits, 16)
        .unwrap_or_else(|_| fail(format!("'{}' is not a 16-bit hex value", value)));
    let fields = OpcodeFields::decompose(raw);
    println!("{}", fields);
    println!("op={:X} x={:X} y={:X} n={:X} nnn={:03X} kk={:02X}",
        fields.op, fields.x, fields.y, fields.n, fields.nnn, fields.kk);
}

fn send_command(config: ObserverConfig, command: Command) {
    let target = config.target.clone();
    let observer = Observer::new(config);
    match observer.send(command) {
        Ok(ack) => println!("{} -> {}: {}", command, target, ack.status),
        Err(e) => fail(e),
    }
}
