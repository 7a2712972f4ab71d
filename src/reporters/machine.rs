use serde::Serialize;

use crate::core::dispatcher::ReportContext;
use crate::core::error::Result;
use crate::core::event::{CallFrame, CompletedTest, FlatTest, Location, Outcome};
use crate::core::output::Level;
use crate::reporters::Reporter;

/// Identity of a test inside a machine event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestRef<'a> {
    pub path: &'a [String],
    pub location: Option<&'a Location>,
}

impl<'a> TestRef<'a> {
    pub fn of<P>(test: &'a FlatTest<P>) -> Self {
        Self {
            path: &test.path,
            location: test.location.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListedTest<'a> {
    pub test: TestRef<'a>,
    pub flat_name: String,
}

/// The four structured events, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MachineEvent<'a> {
    TestStart {
        test: TestRef<'a>,
        flat_name: String,
    },
    TestEnd {
        test: TestRef<'a>,
        flat_name: String,
        result: Outcome,
        message: &'a str,
        callers: &'a [CallFrame],
        wall_time_ms: u64,
    },
    TestList {
        tests: Vec<ListedTest<'a>>,
    },
    TestResults {
        wall_time_ms: u64,
        passed: usize,
        pending: usize,
        failures: usize,
        errors: usize,
    },
}

impl<'a> MachineEvent<'a> {
    pub fn test_start<P>(test: &'a FlatTest<P>) -> Self {
        MachineEvent::TestStart {
            test: TestRef::of(test),
            flat_name: test.flat_name(),
        }
    }

    pub fn test_end(test: &'a CompletedTest) -> Self {
        MachineEvent::TestEnd {
            test: TestRef::of(test),
            flat_name: test.flat_name(),
            result: test.payload.outcome,
            message: &test.payload.message,
            callers: &test.payload.call_stack,
            wall_time_ms: test.payload.elapsed_ms,
        }
    }

    pub fn test_list<P>(tests: &'a [FlatTest<P>]) -> Self {
        MachineEvent::TestList {
            tests: tests.iter()
                .map(|test| ListedTest {
                    test: TestRef::of(test),
                    flat_name: test.flat_name(),
                })
                .collect(),
        }
    }

    pub fn test_results(
        wall_time_ms: u64,
        passed: &[CompletedTest],
        pending: &[CompletedTest],
        failed: &[CompletedTest],
        errored: &[CompletedTest],
    ) -> Self {
        MachineEvent::TestResults {
            wall_time_ms,
            passed: passed.len(),
            pending: pending.len(),
            failures: failed.len(),
            errors: errored.len(),
        }
    }
}

/// Info level: quiet mode never hides these.
fn emit(ctx: &ReportContext, event: &MachineEvent<'_>) -> Result<()> {
    ctx.channel.write_encoded(Level::Info, event)
}

/// JSON lines for a single executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct MachineSequential;

impl Reporter for MachineSequential {
    fn id(&self) -> &'static str {
        "machine-sequential"
    }

    fn report_all_tests(&self, ctx: &ReportContext, tests: &[FlatTest]) -> Result<()> {
        emit(ctx, &MachineEvent::test_list(tests))
    }

    fn report_global_start(&self, _ctx: &ReportContext, _tests: &[FlatTest]) -> Result<()> {
        Ok(())
    }

    fn report_test_start(&self, ctx: &ReportContext, test: &FlatTest) -> Result<()> {
        emit(ctx, &MachineEvent::test_start(test))
    }

    fn report_test_result(&self, ctx: &ReportContext, test: &CompletedTest) -> Result<()> {
        emit(ctx, &MachineEvent::test_end(test))
    }

    fn report_global_results(
        &self,
        ctx: &ReportContext,
        total_time_ms: u64,
        passed: &[CompletedTest],
        pending: &[CompletedTest],
        failed: &[CompletedTest],
        errored: &[CompletedTest],
    ) -> Result<()> {
        emit(ctx, &MachineEvent::test_results(total_time_ms, passed, pending, failed, errored))
    }
}

/// JSON lines when tests run concurrently.
///
/// `test-start` is a Debug-level announcement here, repeated right before
/// the matching `test-end` so the pair stays adjacent.
#[derive(Debug, Clone, Copy, Default)]
pub struct MachineParallel;

impl Reporter for MachineParallel {
    fn id(&self) -> &'static str {
        "machine-parallel"
    }

    fn report_all_tests(&self, ctx: &ReportContext, tests: &[FlatTest]) -> Result<()> {
        MachineSequential.report_all_tests(ctx, tests)
    }

    fn report_global_start(&self, _ctx: &ReportContext, _tests: &[FlatTest]) -> Result<()> {
        Ok(())
    }

    fn report_test_start(&self, ctx: &ReportContext, test: &FlatTest) -> Result<()> {
        ctx.channel.write_encoded(Level::Debug, &MachineEvent::test_start(test))
    }

    fn report_test_result(&self, ctx: &ReportContext, test: &CompletedTest) -> Result<()> {
        ctx.channel.write_encoded(Level::Debug, &MachineEvent::test_start(test))?;
        emit(ctx, &MachineEvent::test_end(test))
    }

    fn report_global_results(
        &self,
        ctx: &ReportContext,
        total_time_ms: u64,
        passed: &[CompletedTest],
        pending: &[CompletedTest],
        failed: &[CompletedTest],
        errored: &[CompletedTest],
    ) -> Result<()> {
        MachineSequential.report_global_results(ctx, total_time_ms, passed, pending, failed, errored)
    }
}
