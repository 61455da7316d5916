//! Interactive confirmation and page-range selection

use std::io::{self, BufRead, BufReader, Stderr, Stdin, Write};

use log::{debug, info, warn};

use super::{Confirmation, DeviceError, PageSelection};

/// The modal "print?" step of a device.
///
/// Called from the job's worker thread, never from the caller's.
pub trait PageRangeDialog: Send {
    /// Ask whether to print to `target`, and which pages
    fn exec(&mut self, target: &str) -> Result<Confirmation, DeviceError>;
}

/// Prompt on a text stream.
///
/// Answers: empty or `all` prints everything, `3` prints page 3, `2-5` prints
/// pages 2 through 5, `n` declines. Anything else asks again; end of input
/// declines.
pub struct TerminalDialog<R, W> {
    input: R,
    output: W,
}

impl TerminalDialog<BufReader<Stdin>, Stderr> {
    /// Dialog on the process's standard input, prompting on standard error
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalDialog<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Hand back the streams
    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    fn prompt(&mut self, target: &str) -> io::Result<Option<String>> {
        write!(
            self.output,
            "Print to {target}? Pages [all], e.g. 3 or 2-5, n to cancel: "
        )?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

impl<R: BufRead + Send, W: Write + Send> PageRangeDialog for TerminalDialog<R, W> {
    fn exec(&mut self, target: &str) -> Result<Confirmation, DeviceError> {
        loop {
            let Some(line) = self
                .prompt(target)
                .map_err(|e| DeviceError::Dialog(e.to_string()))?
            else {
                info!("Print dialog closed without an answer");
                return Ok(Confirmation::Declined);
            };

            match parse_answer(&line) {
                Some(answer) => {
                    debug!("Print dialog answer {:?} -> {answer:?}", line.trim());
                    return Ok(answer);
                }
                None => {
                    warn!("Rejected page range answer {:?}", line.trim());
                    writeln!(self.output, "Invalid page range `{}`", line.trim())
                        .map_err(|e| DeviceError::Dialog(e.to_string()))?;
                }
            }
        }
    }
}

/// Interpret one dialog answer; `None` if it is not understood
#[must_use]
pub fn parse_answer(answer: &str) -> Option<Confirmation> {
    let answer = answer.trim().to_ascii_lowercase();

    match answer.as_str() {
        "" | "a" | "all" | "y" | "yes" => return Some(Confirmation::Accepted(PageSelection::All)),
        "n" | "no" | "q" | "cancel" => return Some(Confirmation::Declined),
        _ => {}
    }

    let (from, to) = match answer.split_once('-') {
        Some((from, to)) => (from.trim().parse::<u32>().ok()?, to.trim().parse::<u32>().ok()?),
        None => {
            let page = answer.parse::<u32>().ok()?;
            (page, page)
        }
    };

    if from == 0 || from > to {
        return None;
    }
    Some(Confirmation::Accepted(PageSelection::Range { from, to }))
}
