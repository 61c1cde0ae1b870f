//! File-list traversal for one physical input
//!
//! A [`FileCursor`] walks an ordered list of inputs, keeps the open handle,
//! and counts what has been read. It carries no lock of its own: the owning
//! [`PatternSource`](crate::PatternSource) wraps it in a mutex and every
//! method here is called with that mutex held.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};

use crate::error::{ConfigError, Result};

/// Buffer capacity used for every opened input
pub const INPUT_BUFFER_SIZE: usize = 64 * 1024;

type BoxedRead = Box<dyn BufRead + Send>;

/// One entry of an input list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Standard input, written as `-`
    Stdin,
    /// A file on disk
    Path(PathBuf),
    /// Bytes held in memory
    Memory(Arc<[u8]>),
}
impl Input {
    fn open(&self) -> io::Result<BoxedRead> {
        match self {
            Self::Stdin => Ok(Box::new(BufReader::with_capacity(
                INPUT_BUFFER_SIZE,
                io::stdin(),
            ))),
            Self::Path(path) => {
                let file = File::open(path)?;
                Ok(Box::new(BufReader::with_capacity(INPUT_BUFFER_SIZE, file)))
            }
            Self::Memory(bytes) => Ok(Box::new(io::Cursor::new(Arc::clone(bytes)))),
        }
    }
}
impl From<&str> for Input {
    fn from(value: &str) -> Self {
        if value == "-" {
            Self::Stdin
        } else {
            Self::Path(PathBuf::from(value))
        }
    }
}
impl From<String> for Input {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}
impl From<PathBuf> for Input {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}
impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => write!(f, "-"),
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Memory(bytes) => write!(f, "<memory: {} bytes>", bytes.len()),
        }
    }
}

/// Position and handle within an ordered list of inputs
pub struct FileCursor {
    inputs: Vec<Input>,
    /// Index of the next input to open
    next_file: usize,
    /// Index of the currently open input
    current: Option<usize>,
    handle: Option<BoxedRead>,
    /// Whether a failure to open each input has already been reported
    errs: Vec<bool>,
    opened_any: bool,
    /// Set until the first byte of the current input has been checked
    pub(crate) first: bool,
    records_read: u64,
    bytes_read: u64,
}
impl FileCursor {
    #[must_use]
    pub fn new(inputs: Vec<Input>) -> Self {
        let errs = vec![false; inputs.len()];
        Self {
            inputs,
            next_file: 0,
            current: None,
            handle: None,
            errs,
            opened_any: false,
            first: true,
            records_read: 0,
            bytes_read: 0,
        }
    }

    /// Close the current input and open the next usable one
    ///
    /// Inputs that fail to open are reported once and skipped.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - An input was opened
    /// * `Ok(false)` - The list is exhausted
    /// * `Err(ConfigError::NoValidInputs)` - No input in the list could ever be opened
    pub fn open(&mut self) -> Result<bool> {
        self.handle = None;
        self.current = None;
        while self.next_file < self.inputs.len() {
            let idx = self.next_file;
            self.next_file += 1;
            match self.inputs[idx].open() {
                Ok(handle) => {
                    debug!("Opened read input {}", self.inputs[idx]);
                    self.handle = Some(handle);
                    self.current = Some(idx);
                    self.opened_any = true;
                    self.first = true;
                    return Ok(true);
                }
                Err(err) => {
                    if !self.errs[idx] {
                        warn!(
                            "Could not open read file \"{}\" for reading; skipping... ({err})",
                            self.inputs[idx]
                        );
                        self.errs[idx] = true;
                    }
                }
            }
        }
        if self.opened_any {
            Ok(false)
        } else {
            Err(ConfigError::NoValidInputs(self.inputs.len()).into())
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Display label of the current input
    #[must_use]
    pub fn label(&self) -> String {
        self.current
            .map_or_else(|| "<none>".to_string(), |idx| self.inputs[idx].to_string())
    }

    #[must_use]
    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    /// Append one line (newline included) to `buf`; returns 0 at end of input
    pub fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let n = match self.handle.as_mut() {
            Some(handle) => handle.read_until(b'\n', buf)?,
            None => 0,
        };
        self.bytes_read += n as u64;
        Ok(n)
    }

    /// Next byte without consuming it
    pub fn peek(&mut self) -> io::Result<Option<u8>> {
        match self.handle.as_mut() {
            Some(handle) => Ok(handle.fill_buf()?.first().copied()),
            None => Ok(None),
        }
    }

    /// Consume line terminators and return the first byte after them
    pub fn skip_newlines(&mut self) -> io::Result<Option<u8>> {
        loop {
            match self.peek()? {
                Some(b'\n' | b'\r') => {
                    if let Some(handle) = self.handle.as_mut() {
                        handle.consume(1);
                    }
                    self.bytes_read += 1;
                }
                other => return Ok(other),
            }
        }
    }

    /// True once the current input has nothing left but line terminators
    pub fn at_eof(&mut self) -> io::Result<bool> {
        Ok(self.skip_newlines()?.is_none())
    }

    pub(crate) fn add_records(&mut self, n: usize) {
        self.records_read += n as u64;
    }

    /// Records delivered from this cursor so far
    #[must_use]
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Bytes consumed from this cursor so far
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}
impl fmt::Debug for FileCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCursor")
            .field("inputs", &self.inputs)
            .field("next_file", &self.next_file)
            .field("current", &self.current)
            .field("records_read", &self.records_read)
            .field("bytes_read", &self.bytes_read)
            .finish_non_exhaustive()
    }
}
