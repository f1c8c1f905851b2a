use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};

use platreg::attr::AttributeGroup;
use platreg::backend::{Addr16Smbus, RegisterBackend, SmbusClient};
use platreg::boards::{self, Board, GroupSpec};
use platreg::enums::AttrMode;
use platreg::topology::{AdapterEnumerator, DeviceKind, RetryPolicy, SysfsAdapters, SysfsClientFactory, SystemClock};
use platreg::{Error, Result};

#[derive(Parser)]
#[command(name = "platreg", version, about = "Switch platform CPLD registers and I2C topology")]
struct Args {
    /// Where sysfs is mounted.
    #[arg(long, default_value = "/sys")]
    sysfs_root: PathBuf,

    /// Polls before giving up on an adapter or mux channel.
    #[arg(long, default_value_t = 20)]
    retries: u32,

    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct Target {
    #[arg(long)]
    board: String,

    #[arg(long)]
    group: String,

    #[arg(long)]
    bus: u32,

    #[arg(long, value_parser = parse_addr)]
    addr: u16,

    /// The CPLD takes a register pointer write before each access.
    #[arg(long, default_value_t = false)]
    addr16: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List I2C adapters.
    Adapters,
    /// List the attributes of a board's group.
    Attrs {
        #[arg(long)]
        board: String,
        #[arg(long)]
        group: String,
    },
    /// Read one attribute, or every attribute when none is named.
    Show {
        #[command(flatten)]
        target: Target,
        attr: Option<String>,
    },
    /// Write an attribute.
    Store {
        #[command(flatten)]
        target: Target,
        attr: String,
        value: String,
    },
    /// Create every I2C client a board needs.
    Bootstrap {
        #[arg(long)]
        board: String,
    },
    /// Print the line map of each GPIO expander on a board.
    GpioMap {
        #[arg(long)]
        board: String,
    },
}

fn parse_addr(s: &str) -> std::result::Result<u16, String> {
    let r = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse::<u16>(),
    };
    match r {
        Ok(a) if a <= 0x7f => Ok(a),
        Ok(a) => Err(format!("0x{:x} is not a 7-bit address", a)),
        Err(e) => Err(e.to_string()),
    }
}

fn board(name: &str) -> Result<&'static Board> {
    boards::find(name).ok_or_else(|| Error::not_found(format!("unknown board '{}'", name)))
}

fn group(board: &Board, name: &str) -> Result<&'static GroupSpec> {
    board
        .group(name)
        .ok_or_else(|| Error::not_found(format!("board {} has no group '{}'", board.name, name)))
}

fn open_group(target: &Target) -> Result<AttributeGroup<Box<dyn RegisterBackend>>> {
    let grp = group(board(&target.board)?, &target.group)?;

    // the kernel driver normally owns the CPLD address
    let client = SmbusClient::open_force(target.bus, target.addr)?;
    let backend: Box<dyn RegisterBackend> = if target.addr16 {
        Box::new(Addr16Smbus::new(client))
    } else {
        Box::new(client)
    };

    AttributeGroup::new(grp.name, backend, (grp.attributes)()?)
}

fn run(args: Args) -> Result<()> {
    let adapters = SysfsAdapters::with_root(args.sysfs_root.join("class/i2c-adapter"));
    let policy = RetryPolicy::new(args.retries, Duration::from_millis(args.interval_ms));

    match args.command {
        Command::Adapters => {
            for a in adapters.adapters()? {
                println!("i2c-{}\t{}", a.bus, a.name);
            }
        }
        Command::Attrs { board: b, group: g } => {
            let grp = group(board(&b)?, &g)?;
            for attr in (grp.attributes)()? {
                let mode = match attr.mode {
                    AttrMode::ReadOnly => "ro",
                    AttrMode::ReadWrite => "rw",
                };
                println!("{:<24} {} {:#o}", attr.name(), mode, attr.mode as u32);
            }
        }
        Command::Show { target, attr } => {
            let group = open_group(&target)?;
            match attr {
                Some(name) => print!("{}", group.show(&name)?),
                None => print!("{}", group.dump()),
            }
        }
        Command::Store { target, attr, value } => {
            let group = open_group(&target)?;
            group.store(&attr, &value)?;
        }
        Command::Bootstrap { board: b } => {
            let board = board(&b)?;
            let factory = SysfsClientFactory::with_root(args.sysfs_root.join("bus/i2c/devices"));
            let ctx = board.bootstrap(&factory, &adapters, &SystemClock, &policy)?;

            for (bus, addr, kind) in ctx.detach() {
                println!("i2c-{} 0x{:02x} {} {}", bus, addr, kind.driver(), kind.label().unwrap_or("-"));
            }
        }
        Command::GpioMap { board: b } => {
            for dev in board(&b)?.devices {
                if let DeviceKind::GpioExpander(gpio) = dev.kind {
                    println!("{} 0x{:02x}", gpio.chip, dev.addr);
                    print!("{}", gpio.map());
                }
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let _ = env_logger::try_init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::debug!("{:?}", e);
            eprintln!("platreg: {} ({})", e, e.errno());
            ExitCode::FAILURE
        }
    }
}
