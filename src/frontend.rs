//! Interactive front-end: prompt, read a line, hand it to the engine, print
//! what comes back.

use crate::core::error::MhwimmError;
use crate::core::output;
use crate::core::shutdown::Shutdown;
use crate::session::{Exchange, ExchangeStatus, FrontLink};
use colored::Colorize;
use crossbeam::channel::{self, Receiver};
use std::borrow::Cow;
use std::io::{self, BufRead, Write};
use std::thread;

pub const BANNER: &str = "Monster Hunter World:Iceborne Mod Manager cmd tool";
pub const PROMPT: &str = "mhwimm: ";
pub const FAREWELL: &str = "Program exiting.";
const INDENT: &str = "        ";
const MAX_LINE_CHARS: usize = 240;

enum Input {
    Line(io::Result<String>),
    Eof,
    Interrupted,
}

pub struct FrontEnd {
    link: FrontLink,
    shutdown: Shutdown,
}

impl FrontEnd {
    pub fn new(link: FrontLink, shutdown: Shutdown) -> Self {
        Self { link, shutdown }
    }

    /// Serve until EOF, `exit`, a termination signal, or the engine going
    /// away. Consumes the front-end so its endpoint closes on return.
    pub fn run<R, W>(self, input: R, out: &mut W) -> Result<(), MhwimmError>
    where
        R: BufRead + Send + 'static,
        W: Write,
    {
        let lines = spawn_reader(input)?;
        writeln!(out, "{}", BANNER.bold())?;

        while !self.shutdown.is_triggered() {
            write!(out, "{}", PROMPT.green())?;
            out.flush()?;

            let next = crossbeam::select! {
                recv(lines) -> msg => msg.map_or(Input::Eof, Input::Line),
                recv(self.shutdown.notified()) -> _ => Input::Interrupted,
            };
            let line = match next {
                Input::Line(line) => line?,
                Input::Eof => {
                    self.shutdown.trigger();
                    writeln!(out)?;
                    break;
                }
                Input::Interrupted => {
                    writeln!(out)?;
                    break;
                }
            };

            let command = line.trim();
            if command.is_empty() {
                continue;
            }
            if self.link.hand_off(Exchange::command(command)).is_err() || !self.print_output(out)? {
                tracing::warn!("engine is gone; front-end stopping");
                break;
            }
        }

        writeln!(out, "{}", FAREWELL)?;
        out.flush()?;
        Ok(())
    }

    /// Print every line of the current cycle. `false` if the engine vanished
    /// mid-cycle.
    fn print_output<W: Write>(&self, out: &mut W) -> Result<bool, MhwimmError> {
        loop {
            let Ok(msg) = self.link.receive() else {
                return Ok(false);
            };
            match msg.status {
                ExchangeStatus::MoreOutput => self.print_line(out, &msg.payload)?,
                ExchangeStatus::LastOutput => {
                    self.print_line(out, &msg.payload)?;
                    break;
                }
                ExchangeStatus::NoOutput => break,
                ExchangeStatus::Command => {
                    tracing::warn!(payload = %msg.payload, "unexpected command from engine ignored");
                }
            }
        }
        debug_assert!(self.link.is_my_turn());
        Ok(true)
    }

    fn print_line<W: Write>(&self, out: &mut W, line: &str) -> io::Result<()> {
        if line.starts_with("error:") || line.starts_with("db: error:") {
            // Store diagnostics may carry multi-line SQLite text.
            let line = output::compact_line(line, MAX_LINE_CHARS);
            writeln!(out, "{}{}", INDENT, line.red())
        } else {
            writeln!(out, "{}{}", INDENT, line)
        }
    }
}

/// Read `input` line by line on a background thread.
///
/// Bytes that are not UTF-8 are replaced rather than rejected, so such a
/// line reaches the engine as an ordinary bad command. The thread is
/// detached: a read blocked on a terminal cannot be interrupted, so it is
/// left to die with the process.
fn spawn_reader<R>(mut input: R) -> io::Result<Receiver<io::Result<String>>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = channel::unbounded();
    thread::Builder::new()
        .name("mhwimm-stdin".to_string())
        .spawn(move || {
            let mut buf = Vec::new();
            loop {
                buf.clear();
                let line = match input.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => Ok(decode_line(&buf)),
                    Err(e) => Err(e),
                };
                let failed = line.is_err();
                if tx.send(line).is_err() || failed {
                    break;
                }
            }
        })?;
    Ok(rx)
}

fn decode_line(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    if matches!(text, Cow::Owned(_)) {
        tracing::debug!(bytes = raw.len(), "input line is not valid UTF-8");
    }
    text.trim_end_matches(['\n', '\r']).to_string()
}
