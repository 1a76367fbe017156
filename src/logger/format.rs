//! Log formatting and console output with ANSI colors and text wrapping
//!
//! Handles:
//! - Colorized tag and level columns
//! - Text wrapping at word boundaries
//! - Broken pipe handling for piped commands

use super::levels::LogLevel;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

/// Log format widths for alignment
const TAG_WIDTH: usize = 10;
const LEVEL_WIDTH: usize = 8;
const BRACKET_SPACE_WIDTH: usize = 3;
const TOTAL_PREFIX_WIDTH: usize = TAG_WIDTH + LEVEL_WIDTH + BRACKET_SPACE_WIDTH * 2;

/// Maximum line length before wrapping
const MAX_LINE_LENGTH: usize = 145;

/// Format and output a log message
pub fn format_and_log(tag: &LogTag, level: LogLevel, message: &str) {
    let time = Local::now().format("%H:%M:%S").to_string();
    let prefix = format!("{} ", time).dimmed().to_string();
    let time_width = time.len() + 1;

    let base_line = format!("{}[{}] [{}] ", prefix, format_tag(tag), format_level(level));

    let available_space = MAX_LINE_LENGTH
        .checked_sub(TOTAL_PREFIX_WIDTH + time_width)
        .filter(|space| *space > 0)
        .unwrap_or(50);

    let chunks = wrap_text(message, available_space);
    print_stdout_safe(&format!("{}{}", base_line, chunks[0]));

    if chunks.len() > 1 {
        let continuation = " ".repeat(time_width + TOTAL_PREFIX_WIDTH);
        for chunk in &chunks[1..] {
            print_stdout_safe(&format!("{}{}", continuation, chunk));
        }
    }
}

/// Format a tag with its color
fn format_tag(tag: &LogTag) -> ColoredString {
    let label = format!("{:<width$}", tag.to_plain_string(), width = TAG_WIDTH);
    match tag {
        LogTag::Registry => label.bright_magenta().bold(),
        LogTag::Hub => label.bright_cyan().bold(),
        LogTag::Connection => label.bright_blue().bold(),
        LogTag::Keepalive => label.bright_yellow().bold(),
        LogTag::Webserver => label.bright_green().bold(),
        LogTag::Config => label.bright_white().bold(),
        LogTag::System => label.yellow().bold(),
        LogTag::Test => label.blue().bold(),
        LogTag::Other(_) => label.white().bold(),
    }
}

/// Format log level with its color
fn format_level(level: LogLevel) -> ColoredString {
    let label = format!("{:<width$}", level.as_str(), width = LEVEL_WIDTH);
    match level {
        LogLevel::Error => label.bright_red().bold(),
        LogLevel::Warning => label.yellow().bold(),
        LogLevel::Info => label.white().bold(),
        LogLevel::Debug | LogLevel::Verbose => label.dimmed(),
    }
}

/// Print to stdout but ignore broken pipe errors
fn print_stdout_safe(message: &str) {
    let mut out = stdout().lock();
    if let Err(e) = writeln!(out, "{}", message).and_then(|_| out.flush()) {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        let _ = writeln!(std::io::stderr(), "Logger stdout error: {}", e);
    }
}

/// Wrap text at word boundaries, respecting existing newlines
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut result = Vec::new();

    for line in text.split('\n') {
        if line.chars().count() <= max_width {
            result.push(line.to_string());
            continue;
        }

        let mut current = String::new();
        for word in line.split_whitespace() {
            let word_len = word.chars().count();
            let current_len = current.chars().count();

            if word_len > max_width {
                if !current.is_empty() {
                    result.push(std::mem::take(&mut current));
                }
                result.extend(break_long_word(word, max_width));
            } else if current.is_empty() {
                current = word.to_string();
            } else if current_len + word_len + 1 <= max_width {
                current.push(' ');
                current.push_str(word);
            } else {
                result.push(std::mem::replace(&mut current, word.to_string()));
            }
        }

        if !current.is_empty() {
            result.push(current);
        }
    }

    if result.is_empty() {
        result.push(String::new());
    }

    result
}

/// Break a very long word into chunks of at most `max_width` characters
fn break_long_word(word: &str, max_width: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars
        .chunks(max_width.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}
