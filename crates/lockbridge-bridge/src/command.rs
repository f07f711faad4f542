//! Administrative text commands.
//!
//! Commands are one line each, a keyword followed by arguments. Lock numbers
//! are 1-based, as printed by `status`. A number outside the slot range parses
//! as `Error::UnknownSlot`, the same error a vacant slot gives.
//!
//! ```
//! use lockbridge_bridge::BridgeCommand;
//!
//! let command: BridgeCommand = "lock 2".parse().unwrap();
//! assert_eq!(command.to_string(), "lock 2");
//! ```

use std::fmt;
use std::str::FromStr;

use lockbridge_core::{Error, SlotId, TargetState};

/// Help text listing every command.
pub const HELP_TEXT: &str = "\
========== AVAILABLE COMMANDS ==========
add <name>             - Add new lock with name
remove <num>           - Remove lock by number
lock <num>             - Lock specific lock
unlock <num>           - Unlock specific lock (clears jam)
jam <num>              - Set jam status for lock
battery <num>          - Toggle low battery for lock
clear <num>            - Clear jam, fault and low battery
target <num> <lock|unlock> - Request a timed lock operation
identify <num>         - Blink the lock's LED to identify it
status                 - Display current status
help                   - Show this help
=========================================";

/// A parsed administrative command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCommand {
    Add { name: String },
    Remove(SlotId),
    Lock(SlotId),
    Unlock(SlotId),
    Jam(SlotId),
    Battery(SlotId),
    Clear(SlotId),
    Target { slot: SlotId, target: TargetState },
    Identify(SlotId),
    Status,
    Help,
}

impl BridgeCommand {
    /// Keyword that introduces the command.
    pub fn keyword(&self) -> &'static str {
        match self {
            BridgeCommand::Add { .. } => "add",
            BridgeCommand::Remove(_) => "remove",
            BridgeCommand::Lock(_) => "lock",
            BridgeCommand::Unlock(_) => "unlock",
            BridgeCommand::Jam(_) => "jam",
            BridgeCommand::Battery(_) => "battery",
            BridgeCommand::Clear(_) => "clear",
            BridgeCommand::Target { .. } => "target",
            BridgeCommand::Identify(_) => "identify",
            BridgeCommand::Status => "status",
            BridgeCommand::Help => "help",
        }
    }
}

impl FromStr for BridgeCommand {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (keyword, rest) = match line.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (line, ""),
        };

        let command = match keyword.to_ascii_lowercase().as_str() {
            "add" => BridgeCommand::Add {
                name: rest.to_string(),
            },
            "remove" => BridgeCommand::Remove(parse_slot(rest)?),
            "lock" => BridgeCommand::Lock(parse_slot(rest)?),
            "unlock" => BridgeCommand::Unlock(parse_slot(rest)?),
            "jam" => BridgeCommand::Jam(parse_slot(rest)?),
            "battery" => BridgeCommand::Battery(parse_slot(rest)?),
            "clear" => BridgeCommand::Clear(parse_slot(rest)?),
            "identify" => BridgeCommand::Identify(parse_slot(rest)?),
            "target" => {
                let mut args = rest.split_whitespace();
                let slot = parse_slot(args.next().unwrap_or(""))?;
                let target = match args.next().map(str::to_ascii_lowercase).as_deref() {
                    Some("lock") => TargetState::Secured,
                    Some("unlock") => TargetState::Unsecured,
                    _ => {
                        return Err(Error::InvalidCommand(
                            "Usage: target <num> <lock|unlock>".to_string(),
                        ));
                    }
                };
                BridgeCommand::Target { slot, target }
            }
            "status" if rest.is_empty() => BridgeCommand::Status,
            "help" if rest.is_empty() => BridgeCommand::Help,
            _ => {
                return Err(Error::InvalidCommand(
                    "Unknown command. Type 'help' for available commands.".to_string(),
                ));
            }
        };

        Ok(command)
    }
}

impl fmt::Display for BridgeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeCommand::Add { name } if name.is_empty() => write!(f, "add"),
            BridgeCommand::Add { name } => write!(f, "add {name}"),
            BridgeCommand::Remove(slot)
            | BridgeCommand::Lock(slot)
            | BridgeCommand::Unlock(slot)
            | BridgeCommand::Jam(slot)
            | BridgeCommand::Battery(slot)
            | BridgeCommand::Clear(slot)
            | BridgeCommand::Identify(slot) => write!(f, "{} {}", self.keyword(), slot),
            BridgeCommand::Target { slot, target } => {
                let action = if target.is_locked() { "lock" } else { "unlock" };
                write!(f, "target {slot} {action}")
            }
            BridgeCommand::Status | BridgeCommand::Help => write!(f, "{}", self.keyword()),
        }
    }
}

fn parse_slot(arg: &str) -> Result<SlotId, Error> {
    let number = arg
        .trim()
        .parse::<usize>()
        .map_err(|_| Error::InvalidCommand("Invalid lock number".to_string()))?;
    SlotId::from_number(number).ok_or(Error::UnknownSlot(number))
}
