use std::fmt;
use serde::{Serialize, Deserialize};

/// A position in a test source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self { file: file.into(), line }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A flattened view of one test: its hierarchical path, where it was
/// defined, and an event-specific payload.
///
/// At discovery and start time the payload is `()`; once the test has
/// completed it is a [`ResultPayload`].
#[derive(Debug, Clone, PartialEq)]
pub struct FlatTest<P = ()> {
    pub path: Vec<String>,
    pub location: Option<Location>,
    pub payload: P,
}

/// A test as known before it has run.
pub type DiscoveredTest = FlatTest<()>;

/// A test together with its outcome.
pub type CompletedTest = FlatTest<ResultPayload>;

impl FlatTest<()> {
    pub fn new<S: Into<String>>(path: impl IntoIterator<Item = S>, location: Option<Location>) -> Self {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            location,
            payload: (),
        }
    }

    /// Attaches a result, turning a discovered test into a completed one.
    pub fn complete(self, payload: ResultPayload) -> CompletedTest {
        FlatTest {
            path: self.path,
            location: self.location,
            payload,
        }
    }
}

impl<P> FlatTest<P> {
    /// The path segments joined with dots, without location.
    pub fn flat_name(&self) -> String {
        self.path.join(".")
    }

    /// Drops the payload, keeping only the identity of the test.
    pub fn identity(&self) -> DiscoveredTest {
        FlatTest {
            path: self.path.clone(),
            location: self.location.clone(),
            payload: (),
        }
    }
}

/// Final outcome of a test. Set exactly once by the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Pending,
    Fail,
    Error,
}

impl Outcome {
    /// Returns `true` for outcomes that fail the run.
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Fail | Outcome::Error)
    }
}

/// One "called from" entry of a result's call stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFrame {
    #[serde(default)]
    pub note: Option<String>,
    pub location: Location,
}

impl CallFrame {
    pub fn new(location: Location, note: Option<String>) -> Self {
        Self { note, location }
    }
}

/// The result part of a completed test.
///
/// `call_stack` is ordered most recently pushed first, as accumulated by
/// the execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPayload {
    pub outcome: Outcome,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub call_stack: Vec<CallFrame>,
    pub elapsed_ms: u64,
}

impl ResultPayload {
    pub fn new(outcome: Outcome, message: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            outcome,
            message: message.into(),
            call_stack: Vec::new(),
            elapsed_ms,
        }
    }

    pub fn with_call_stack(mut self, call_stack: Vec<CallFrame>) -> Self {
        self.call_stack = call_stack;
        self
    }
}

/// Aggregate tallies of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunTotals {
    pub passed: usize,
    pub pending: usize,
    pub failed: usize,
    pub errored: usize,
    pub total_time_ms: u64,
}

impl RunTotals {
    /// Counts the four outcome buckets handed over at the end of a run.
    pub fn from_buckets<P>(
        total_time_ms: u64,
        passed: &[FlatTest<P>],
        pending: &[FlatTest<P>],
        failed: &[FlatTest<P>],
        errored: &[FlatTest<P>],
    ) -> Self {
        Self {
            passed: passed.len(),
            pending: pending.len(),
            failed: failed.len(),
            errored: errored.len(),
            total_time_ms,
        }
    }

    pub fn total(&self) -> usize {
        self.passed + self.pending + self.failed + self.errored
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.errored > 0
    }
}
