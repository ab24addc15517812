//! Monitor commands exposed on the device record.

use std::io::Write;

use crate::error::FlashError;
use crate::flash::FlashController;
use crate::memory::FlashProbe;
use crate::options;
use crate::target::{Parallelism, RegionDriver, Target};

/// Everything a command handler operates on.
pub struct Session<'a> {
    /// The debug link to the attached device.
    pub probe: &'a mut dyn FlashProbe,
    /// The device record produced at probe time.
    pub target: &'a mut Target,
    /// Console for reports and progress output.
    pub out: &'a mut dyn Write,
}

/// A monitor command handler.
pub type CommandHandler = fn(&mut Session<'_>, &[&str]) -> Result<(), FlashError>;

/// A named monitor command.
#[derive(Debug, Clone, Copy)]
pub struct Command {
    /// Name the command is invoked under.
    pub name: &'static str,
    /// One-line description for command listings.
    pub help: &'static str,
    /// The handler, called with the arguments following the command name.
    pub handler: CommandHandler,
}

/// A command table registered under a family label.
#[derive(Debug, Clone, Copy)]
pub struct CommandSet {
    /// Family label the table is listed under.
    pub label: &'static str,
    /// The commands themselves.
    pub commands: &'static [Command],
}

pub(crate) const COMMANDS: &[Command] = &[
    Command {
        name: "erase_mass",
        help: "Erase entire flash memory",
        handler: cmd_erase_mass,
    },
    Command {
        name: "option",
        help: "Manipulate option bytes",
        handler: cmd_option,
    },
    Command {
        name: "psize",
        help: "Configure flash write parallelism: (x8|x32)",
        handler: cmd_psize,
    },
];

/// The command table under one family label.
pub(crate) fn command_set(label: &'static str) -> CommandSet {
    CommandSet {
        label,
        commands: COMMANDS,
    }
}

fn cmd_erase_mass(session: &mut Session<'_>, _args: &[&str]) -> Result<(), FlashError> {
    FlashController::new(&mut *session.probe).mass_erase(&mut *session.out)
}

fn option_usage(out: &mut dyn Write, count: usize) -> std::io::Result<()> {
    writeln!(out, "usage: monitor option erase")?;
    write!(out, "usage: monitor option write <OPTCR>")?;
    if count > 1 {
        write!(out, " <OPTCR1>")?;
    }
    if count > 2 {
        write!(out, " <OPTCR2>")?;
    }
    writeln!(out)
}

fn cmd_option(session: &mut Session<'_>, args: &[&str]) -> Result<(), FlashError> {
    let idcode = session.target.idcode;
    let count = options::word_count(idcode);

    match args {
        [] => {}
        ["erase"] => {
            let mut ctl = FlashController::new(&mut *session.probe);
            options::write_defaults(&mut ctl, idcode)?;
        }
        ["write", words @ ..] if !words.is_empty() && words.len() <= options::MAX_OPTION_WORDS => {
            let mut values = [0u32; options::MAX_OPTION_WORDS];
            let mut parsed = true;
            for (slot, word) in values.iter_mut().zip(words) {
                match parse_int::parse(word) {
                    Ok(value) => *slot = value,
                    Err(_) => parsed = false,
                }
            }

            if !parsed {
                option_usage(&mut *session.out, count)?;
            } else if options::mask(idcode, &mut values) {
                let mut ctl = FlashController::new(&mut *session.probe);
                options::write(&mut ctl, idcode, &values, words.len())?;
            } else {
                writeln!(session.out, "error")?;
            }
        }
        _ => option_usage(&mut *session.out, count)?,
    }

    // Report the live state last, whatever the sub-action did to it.
    let (values, count) = options::read(&mut *session.probe, idcode)?;
    write!(session.out, "OPTCR: {:#010X}", values[0])?;
    if count > 1 {
        write!(session.out, " OPTCR1: {:#010X}", values[1])?;
    }
    if count > 2 {
        write!(session.out, " OPTCR2: {:#010X}", values[2])?;
    }
    writeln!(session.out)?;
    Ok(())
}

fn cmd_psize(session: &mut Session<'_>, args: &[&str]) -> Result<(), FlashError> {
    match args {
        [] => {
            let psize = session
                .target
                .flash_regions()
                .iter()
                .find(|region| region.driver == RegionDriver::Stm32F4)
                .map(|region| region.parallelism)
                .unwrap_or_default();
            writeln!(session.out, "Flash write parallelism: {psize}")?;
        }
        [width] => {
            let psize = match *width {
                "x8" => Parallelism::X8,
                "x32" => Parallelism::X32,
                _ => {
                    writeln!(session.out, "usage: monitor psize (x8|x32)")?;
                    return Ok(());
                }
            };
            for region in session.target.flash_regions_mut() {
                if region.driver == RegionDriver::Stm32F4 {
                    region.parallelism = psize;
                }
            }
        }
        _ => writeln!(session.out, "usage: monitor psize (x8|x32)")?,
    }
    Ok(())
}
