//! Styled status messages on stderr.
//!
//! Colors are used only when stderr is a terminal and `NO_COLOR` is unset.

use std::io::{IsTerminal, Write};

const SUCCESS: &str = "\x1b[38;2;0;245;212m";
const ERROR: &str = "\x1b[38;2;255;107;107m";
const WARNING: &str = "\x1b[38;2;255;200;87m";
const INFO: &str = "\x1b[38;2;72;202;228m";
const RESET: &str = "\x1b[0m";

/// Message type for styled output.
#[derive(Debug, Clone, Copy)]
pub enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

impl MessageType {
    fn icon(&self) -> &'static str {
        match self {
            MessageType::Success => "[OK]",
            MessageType::Error => "[ERROR]",
            MessageType::Warning => "[WARN]",
            MessageType::Info => "[INFO]",
        }
    }

    fn color(&self) -> &'static str {
        match self {
            MessageType::Success => SUCCESS,
            MessageType::Error => ERROR,
            MessageType::Warning => WARNING,
            MessageType::Info => INFO,
        }
    }
}

fn colors_disabled() -> bool {
    std::env::var("NO_COLOR")
        .map(|v| !v.is_empty() && v != "0" && v.to_lowercase() != "false")
        .unwrap_or(false)
}

/// Print a message with its icon to stderr.
pub fn print_styled(msg_type: MessageType, message: &str) {
    let mut stderr = std::io::stderr();
    let use_colors = !colors_disabled() && stderr.is_terminal();
    let _ = if use_colors {
        writeln!(
            stderr,
            "{}{} {}{}",
            msg_type.color(),
            msg_type.icon(),
            message,
            RESET
        )
    } else {
        writeln!(stderr, "{} {}", msg_type.icon(), message)
    };
}

pub fn print_success(message: &str) {
    print_styled(MessageType::Success, message);
}

pub fn print_error(message: &str) {
    print_styled(MessageType::Error, message);
}

pub fn print_warning(message: &str) {
    print_styled(MessageType::Warning, message);
}

pub fn print_info(message: &str) {
    print_styled(MessageType::Info, message);
}
