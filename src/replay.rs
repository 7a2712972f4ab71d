//! Replaying a recorded run through a [`Dispatcher`].
//!
//! A transcript is a JSON Lines file, one lifecycle event per line, as an
//! execution engine would have produced them:
//!
//! ```text
//! {"event":"all-tests","tests":[{"path":["Suite","a"],"location":{"file":"s.hs","line":3}}]}
//! {"event":"test-start","test":{"path":["Suite","a"]}}
//! {"event":"test-result","test":{"path":["Suite","a"],"result":{"outcome":"pass","elapsed_ms":2}}}
//! {"event":"global-results","total_time_ms":2,"passed":[{"path":["Suite","a"],"result":{"outcome":"pass","elapsed_ms":2}}]}
//! ```

use std::io::BufRead;
use rayon::prelude::*;
use serde::{Serialize, Deserialize};

use crate::core::dispatcher::Dispatcher;
use crate::core::error::{ReportError, Result};
use crate::core::event::{CompletedTest, DiscoveredTest, FlatTest, Location, ResultPayload, RunTotals};

/// A test as written in a transcript; `result` is present once it has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedTest {
    pub path: Vec<String>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultPayload>,
}

impl RecordedTest {
    fn discovered(self) -> DiscoveredTest {
        FlatTest::new(self.path, self.location)
    }

    fn completed(self, line: usize) -> Result<CompletedTest> {
        let payload = self.result.ok_or_else(|| ReportError::Transcript {
            line,
            message: format!("test {} has no result", self.path.join(".")),
        })?;
        Ok(FlatTest::new(self.path, self.location).complete(payload))
    }
}

/// One line of a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum TranscriptEvent {
    AllTests {
        tests: Vec<RecordedTest>,
    },
    GlobalStart {
        tests: Vec<RecordedTest>,
    },
    TestStart {
        test: RecordedTest,
    },
    TestResult {
        test: RecordedTest,
    },
    GlobalResults {
        total_time_ms: u64,
        #[serde(default)]
        passed: Vec<RecordedTest>,
        #[serde(default)]
        pending: Vec<RecordedTest>,
        #[serde(default)]
        failed: Vec<RecordedTest>,
        #[serde(default)]
        errored: Vec<RecordedTest>,
    },
}

/// A validated lifecycle event, ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    AllTests(Vec<DiscoveredTest>),
    GlobalStart(Vec<DiscoveredTest>),
    TestStart(DiscoveredTest),
    TestResult(CompletedTest),
    GlobalResults {
        total_time_ms: u64,
        passed: Vec<CompletedTest>,
        pending: Vec<CompletedTest>,
        failed: Vec<CompletedTest>,
        errored: Vec<CompletedTest>,
    },
}

impl RunEvent {
    fn from_transcript(event: TranscriptEvent, line: usize) -> Result<Self> {
        let completed = |tests: Vec<RecordedTest>| -> Result<Vec<CompletedTest>> {
            tests.into_iter().map(|t| t.completed(line)).collect()
        };

        Ok(match event {
            TranscriptEvent::AllTests { tests } => {
                RunEvent::AllTests(tests.into_iter().map(RecordedTest::discovered).collect())
            }
            TranscriptEvent::GlobalStart { tests } => {
                RunEvent::GlobalStart(tests.into_iter().map(RecordedTest::discovered).collect())
            }
            TranscriptEvent::TestStart { test } => RunEvent::TestStart(test.discovered()),
            TranscriptEvent::TestResult { test } => RunEvent::TestResult(test.completed(line)?),
            TranscriptEvent::GlobalResults { total_time_ms, passed, pending, failed, errored } => {
                RunEvent::GlobalResults {
                    total_time_ms,
                    passed: completed(passed)?,
                    pending: completed(pending)?,
                    failed: completed(failed)?,
                    errored: completed(errored)?,
                }
            }
        })
    }

    fn is_per_test(&self) -> bool {
        matches!(self, RunEvent::TestStart(_) | RunEvent::TestResult(_))
    }
}

/// Parses a transcript, skipping blank lines. Line numbers start at 1.
pub fn read_transcript<R: BufRead>(reader: R) -> Result<Vec<RunEvent>> {
    let mut events = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let number = index + 1;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let event: TranscriptEvent = serde_json::from_str(&line).map_err(|e| ReportError::Transcript {
            line: number,
            message: e.to_string(),
        })?;
        events.push(RunEvent::from_transcript(event, number)?);
    }

    Ok(events)
}

/// Feeds `events` to the dispatcher and returns the totals of the last
/// `global-results` event, if any.
///
/// With `parallel`, each run of consecutive per-test events is fanned out
/// over a rayon pool, one job per test calling start then result.
pub fn replay(dispatcher: &Dispatcher, events: &[RunEvent], parallel: bool) -> Result<Option<RunTotals>> {
    let mut totals = None;
    let mut i = 0;

    while i < events.len() {
        if parallel && events[i].is_per_test() {
            let end = events[i..]
                .iter()
                .position(|event| !event.is_per_test())
                .map_or(events.len(), |offset| i + offset);
            replay_concurrently(dispatcher, &events[i..end])?;
            i = end;
            continue;
        }

        if let Some(run_totals) = dispatch(dispatcher, &events[i])? {
            totals = Some(run_totals);
        }
        i += 1;
    }

    Ok(totals)
}

fn dispatch(dispatcher: &Dispatcher, event: &RunEvent) -> Result<Option<RunTotals>> {
    match event {
        RunEvent::AllTests(tests) => dispatcher.report_all_tests(tests)?,
        RunEvent::GlobalStart(tests) => dispatcher.report_global_start(tests)?,
        RunEvent::TestStart(test) => dispatcher.report_test_start(test)?,
        RunEvent::TestResult(test) => dispatcher.report_test_result(test)?,
        RunEvent::GlobalResults { total_time_ms, passed, pending, failed, errored } => {
            dispatcher.report_global_results(*total_time_ms, passed, pending, failed, errored)?;
            return Ok(Some(RunTotals::from_buckets(*total_time_ms, passed, pending, failed, errored)));
        }
    }
    Ok(None)
}

/// One worker's share of a concurrent batch: a test's start, its result,
/// or both.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TestJob<'a> {
    start: Option<&'a DiscoveredTest>,
    result: Option<&'a CompletedTest>,
}

/// Pairs every result with the earliest unmatched start of the same path.
/// Jobs keep the transcript position of their first event.
fn pair_batch(batch: &[RunEvent]) -> Vec<TestJob<'_>> {
    let mut jobs: Vec<TestJob<'_>> = Vec::new();

    for event in batch {
        match event {
            RunEvent::TestStart(test) => jobs.push(TestJob { start: Some(test), result: None }),
            RunEvent::TestResult(test) => {
                let open = jobs.iter_mut().find(|job| {
                    job.result.is_none() && job.start.map_or(false, |start| start.path == test.path)
                });
                match open {
                    Some(job) => job.result = Some(test),
                    None => jobs.push(TestJob { start: None, result: Some(test) }),
                }
            }
            _ => {}
        }
    }

    jobs
}

fn replay_concurrently(dispatcher: &Dispatcher, batch: &[RunEvent]) -> Result<()> {
    pair_batch(batch).par_iter().try_for_each(|job| {
        if let Some(start) = job.start {
            dispatcher.report_test_start(start)?;
        }
        if let Some(result) = job.result {
            dispatcher.report_test_result(result)?;
        }
        Ok(())
    })
}
