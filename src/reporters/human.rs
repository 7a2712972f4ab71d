use crate::core::color::{Palette, Role};
use crate::core::dispatcher::ReportContext;
use crate::core::error::Result;
use crate::core::event::{CallFrame, CompletedTest, FlatTest, Outcome, ResultPayload};
use crate::core::output::Level;
use crate::reporters::Reporter;

/// Renders test events as colorized text.
///
/// All methods are pure: the same input always yields the same string.
#[derive(Debug, Clone, Copy)]
pub struct HumanFormatter {
    palette: Palette,
}

impl HumanFormatter {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    /// `Suite.test (file:line)`, or just the dotted path if the location is unknown.
    pub fn test_name<P>(&self, test: &FlatTest<P>) -> String {
        match &test.location {
            Some(location) => format!("{} ({})", test.flat_name(), location),
            None => test.flat_name(),
        }
    }

    pub fn start_message<P>(&self, test: &FlatTest<P>) -> String {
        format!("{} {}\n", self.palette.paint(Role::Start, "[TEST]"), self.test_name(test))
    }

    /// The message followed by one `called from` line per frame, outermost
    /// call last.
    pub fn message_with_call_stack(&self, message: &str, call_stack: &[CallFrame]) -> String {
        let mut text = message.to_string();
        if call_stack.is_empty() {
            return text;
        }

        ensure_newline(&mut text);
        for frame in call_stack.iter().rev() {
            text.push_str(&format!("  called from {}", frame.location));
            if let Some(note) = &frame.note {
                text.push_str(&format!(" ({})", note));
            }
            text.push('\n');
        }
        text
    }

    /// Message, call stack, outcome suffix and elapsed time.
    pub fn result_block(&self, payload: &ResultPayload) -> String {
        let mut text = self.message_with_call_stack(&payload.message, &payload.call_stack);
        ensure_newline(&mut text);

        let (role, suffix) = outcome_suffix(payload.outcome);
        text.push_str(&self.palette.paint(role, suffix));
        text.push_str(&format!(" ({}ms)\n", payload.elapsed_ms));
        text
    }

    /// One `* name` line per test.
    pub fn test_list<P>(&self, tests: &[FlatTest<P>]) -> String {
        tests.iter()
            .map(|test| format!("* {}\n", self.test_name(test)))
            .collect()
    }

    /// Tallies, the non-passing tests by bucket, and the total time.
    ///
    /// Buckets arrive most recently completed first and are printed in
    /// discovery order.
    pub fn summary(
        &self,
        total_time_ms: u64,
        passed: &[CompletedTest],
        pending: &[CompletedTest],
        failed: &[CompletedTest],
        errored: &[CompletedTest],
    ) -> String {
        let total = passed.len() + pending.len() + failed.len() + errored.len();

        let mut text = String::new();
        text.push_str(&self.tally("Tests:", total, None));
        text.push_str(&self.tally("Passed:", passed.len(), None));
        text.push_str(&self.tally("Pending:", pending.len(), Some(Role::Pending)));
        text.push_str(&self.tally("Failures:", failed.len(), Some(Role::Warning)));
        text.push_str(&self.tally("Errors:", errored.len(), Some(Role::Warning)));

        for (heading, role, bucket) in [
            ("Pending:", Role::Pending, pending),
            ("Failures:", Role::Warning, failed),
            ("Errors:", Role::Warning, errored),
        ] {
            if bucket.is_empty() {
                continue;
            }
            text.push('\n');
            text.push_str(&self.palette.paint(role, heading));
            text.push('\n');
            for test in bucket.iter().rev() {
                text.push_str(&format!("  * {}\n", self.test_name(test)));
            }
        }

        text.push_str(&format!("\nTotal execution time: {}ms\n", total_time_ms));
        text
    }

    fn tally(&self, label: &str, count: usize, role: Option<Role>) -> String {
        let head = format!("* {}", label);
        let head = match role {
            Some(role) => self.palette.paint(role, &head),
            None => head,
        };
        format!("{}{}{}\n", head, " ".repeat(10usize.saturating_sub(label.len())), count)
    }
}

fn outcome_suffix(outcome: Outcome) -> (Role, &'static str) {
    match outcome {
        Outcome::Pass => (Role::Ok, "+++ OK"),
        Outcome::Pending => (Role::Pending, "^^^ Pending!"),
        Outcome::Fail => (Role::Warning, "*** Failed!"),
        Outcome::Error => (Role::Warning, "@@@ Error!"),
    }
}

/// Appends a newline unless the text is empty or already ends with one.
fn ensure_newline(text: &mut String) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
}

fn report_all_tests(ctx: &ReportContext, tests: &[FlatTest]) -> Result<()> {
    if tests.is_empty() {
        return Ok(());
    }
    let formatter = HumanFormatter::new(ctx.palette);
    ctx.channel.write_text(Level::Info, &formatter.test_list(tests))
}

fn report_test_result(ctx: &ReportContext, test: &CompletedTest) -> Result<()> {
    let formatter = HumanFormatter::new(ctx.palette);
    let block = formatter.result_block(&test.payload);

    if test.payload.outcome == Outcome::Pass {
        return ctx.channel.write_text(Level::Debug, &block);
    }

    // Quiet mode dropped the Debug start line, so repeat it where it matters.
    if ctx.is_quiet() {
        ctx.channel.write_text(Level::Info, &formatter.start_message(test))?;
    }
    ctx.channel.write_text(Level::Info, &block)
}

fn report_global_results(
    ctx: &ReportContext,
    total_time_ms: u64,
    passed: &[CompletedTest],
    pending: &[CompletedTest],
    failed: &[CompletedTest],
    errored: &[CompletedTest],
) -> Result<()> {
    let formatter = HumanFormatter::new(ctx.palette);
    let summary = formatter.summary(total_time_ms, passed, pending, failed, errored);
    ctx.channel.write_text(Level::Info, &summary)
}

/// Human output for a single executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct HumanSequential;

impl Reporter for HumanSequential {
    fn id(&self) -> &'static str {
        "human-sequential"
    }

    fn report_all_tests(&self, ctx: &ReportContext, tests: &[FlatTest]) -> Result<()> {
        report_all_tests(ctx, tests)
    }

    fn report_global_start(&self, _ctx: &ReportContext, _tests: &[FlatTest]) -> Result<()> {
        Ok(())
    }

    fn report_test_start(&self, ctx: &ReportContext, test: &FlatTest) -> Result<()> {
        let formatter = HumanFormatter::new(ctx.palette);
        ctx.channel.write_text(Level::Debug, &formatter.start_message(test))
    }

    fn report_test_result(&self, ctx: &ReportContext, test: &CompletedTest) -> Result<()> {
        report_test_result(ctx, test)
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
        report_global_results(ctx, total_time_ms, passed, pending, failed, errored)
    }
}

/// Human output when tests run concurrently.
///
/// Other workers' output may land between a start line and its result, so
/// the test is announced again right before its result.
#[derive(Debug, Clone, Copy, Default)]
pub struct HumanParallel;

impl Reporter for HumanParallel {
    fn id(&self) -> &'static str {
        "human-parallel"
    }

    fn report_all_tests(&self, ctx: &ReportContext, tests: &[FlatTest]) -> Result<()> {
        report_all_tests(ctx, tests)
    }

    fn report_global_start(&self, _ctx: &ReportContext, _tests: &[FlatTest]) -> Result<()> {
        Ok(())
    }

    fn report_test_start(&self, ctx: &ReportContext, test: &FlatTest) -> Result<()> {
        let formatter = HumanFormatter::new(ctx.palette);
        ctx.channel.write_text(Level::Debug, &formatter.start_message(test))
    }

    fn report_test_result(&self, ctx: &ReportContext, test: &CompletedTest) -> Result<()> {
        let formatter = HumanFormatter::new(ctx.palette);
        ctx.channel.write_text(Level::Debug, &formatter.start_message(test))?;
        report_test_result(ctx, test)
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
        report_global_results(ctx, total_time_ms, passed, pending, failed, errored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use crate::core::event::Location;
    use crate::core::output::{OutputChannel, Sink};

    fn context(quiet: bool) -> (ReportContext, Arc<Mutex<Vec<u8>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let channel = OutputChannel::new(Sink::Shared(buffer.clone()), quiet);
        (ReportContext::new(channel, Palette::plain()), buffer)
    }

    fn contents(buffer: &Arc<Mutex<Vec<u8>>>) -> String {
        String::from_utf8(buffer.lock().unwrap().clone()).unwrap()
    }

    fn foo() -> FlatTest {
        FlatTest::new(["Suite", "testFoo"], Some(Location::new("file.ext", 10)))
    }

    fn failing_foo() -> CompletedTest {
        foo().complete(ResultPayload::new(Outcome::Fail, "expected 1, got 2", 5))
    }

    fn named(name: &str, outcome: Outcome) -> CompletedTest {
        FlatTest::new(["Suite", name], Some(Location::new("file.ext", 1)))
            .complete(ResultPayload::new(outcome, "", 0))
    }

    #[test]
    fn test_name_with_and_without_location() {
        let formatter = HumanFormatter::new(Palette::plain());
        assert_eq!(formatter.test_name(&foo()), "Suite.testFoo (file.ext:10)");
        assert_eq!(formatter.test_name(&FlatTest::new(["A", "b"], None)), "A.b");
    }

    #[test]
    fn test_sequential_start_then_failure() {
        let (ctx, buffer) = context(false);
        HumanSequential.report_test_start(&ctx, &foo()).unwrap();
        HumanSequential.report_test_result(&ctx, &failing_foo()).unwrap();
        assert_eq!(
            contents(&buffer),
            "[TEST] Suite.testFoo (file.ext:10)\nexpected 1, got 2\n*** Failed! (5ms)\n"
        );
    }

    #[test]
    fn test_quiet_non_pass_repeats_start_line() {
        for (outcome, suffix) in [
            (Outcome::Pending, "^^^ Pending!"),
            (Outcome::Fail, "*** Failed!"),
            (Outcome::Error, "@@@ Error!"),
        ] {
            let (ctx, buffer) = context(true);
            let done = foo().complete(ResultPayload::new(outcome, "expected 1, got 2", 5));
            HumanSequential.report_test_start(&ctx, &foo()).unwrap();
            HumanSequential.report_test_result(&ctx, &done).unwrap();
            assert_eq!(
                contents(&buffer),
                format!("[TEST] Suite.testFoo (file.ext:10)\nexpected 1, got 2\n{} (5ms)\n", suffix)
            );
        }
    }

    #[test]
    fn test_non_pass_start_line_not_repeated_when_verbose() {
        for outcome in [Outcome::Pending, Outcome::Fail, Outcome::Error] {
            let (ctx, buffer) = context(false);
            let done = foo().complete(ResultPayload::new(outcome, "m", 1));
            HumanSequential.report_test_start(&ctx, &foo()).unwrap();
            HumanSequential.report_test_result(&ctx, &done).unwrap();
            assert_eq!(contents(&buffer).matches("[TEST]").count(), 1);
        }
    }

    #[test]
    fn test_quiet_pass_is_silent() {
        let (ctx, buffer) = context(true);
        let passing = foo().complete(ResultPayload::new(Outcome::Pass, "", 2));
        HumanSequential.report_test_start(&ctx, &foo()).unwrap();
        HumanSequential.report_test_result(&ctx, &passing).unwrap();
        assert_eq!(contents(&buffer), "");
    }

    #[test]
    fn test_pass_block() {
        let (ctx, buffer) = context(false);
        let passing = foo().complete(ResultPayload::new(Outcome::Pass, "all good", 2));
        HumanSequential.report_test_result(&ctx, &passing).unwrap();
        assert_eq!(contents(&buffer), "all good\n+++ OK (2ms)\n");
    }

    #[test]
    fn test_suffixes() {
        let formatter = HumanFormatter::new(Palette::plain());
        let block = |outcome| formatter.result_block(&ResultPayload::new(outcome, "m", 1));
        assert_eq!(block(Outcome::Pending), "m\n^^^ Pending! (1ms)\n");
        assert_eq!(block(Outcome::Fail), "m\n*** Failed! (1ms)\n");
        assert_eq!(block(Outcome::Error), "m\n@@@ Error! (1ms)\n");
        assert_eq!(block(Outcome::Pass), "m\n+++ OK (1ms)\n");
    }

    #[test]
    fn test_empty_message_has_no_blank_line() {
        let formatter = HumanFormatter::new(Palette::plain());
        let block = formatter.result_block(&ResultPayload::new(Outcome::Pass, "", 4));
        assert_eq!(block, "+++ OK (4ms)\n");
    }

    #[test]
    fn test_call_stack_outermost_last() {
        let formatter = HumanFormatter::new(Palette::plain());
        let payload = ResultPayload::new(Outcome::Fail, "boom\n", 3).with_call_stack(vec![
            CallFrame::new(Location::new("Helpers.hs", 20), Some("assertEqual".to_string())),
            CallFrame::new(Location::new("Main.hs", 7), None),
        ]);
        assert_eq!(
            formatter.result_block(&payload),
            indoc! {"
                boom
                  called from Main.hs:7
                  called from Helpers.hs:20 (assertEqual)
                *** Failed! (3ms)
            "}
        );
    }

    #[test]
    fn test_parallel_announces_at_start_and_before_result() {
        let (ctx, buffer) = context(false);
        HumanParallel.report_test_start(&ctx, &foo()).unwrap();
        assert_eq!(contents(&buffer), "[TEST] Suite.testFoo (file.ext:10)\n");

        HumanParallel.report_test_result(&ctx, &failing_foo()).unwrap();
        assert_eq!(
            contents(&buffer),
            "[TEST] Suite.testFoo (file.ext:10)\n[TEST] Suite.testFoo (file.ext:10)\nexpected 1, got 2\n*** Failed! (5ms)\n"
        );
    }

    #[test]
    fn test_parallel_start_is_debug_only() {
        let (ctx, buffer) = context(true);
        HumanParallel.report_test_start(&ctx, &foo()).unwrap();
        assert_eq!(contents(&buffer), "");
    }

    #[test]
    fn test_parallel_quiet_announces_once() {
        let (ctx, buffer) = context(true);
        HumanParallel.report_test_start(&ctx, &foo()).unwrap();
        HumanParallel.report_test_result(&ctx, &failing_foo()).unwrap();
        assert_eq!(contents(&buffer).matches("[TEST]").count(), 1);
    }

    #[test]
    fn test_all_tests_list() {
        let (ctx, buffer) = context(true);
        let tests = vec![foo(), FlatTest::new(["Suite", "testBar"], None)];
        HumanSequential.report_all_tests(&ctx, &tests).unwrap();
        assert_eq!(contents(&buffer), "* Suite.testFoo (file.ext:10)\n* Suite.testBar\n");
    }

    #[test]
    fn test_summary() {
        let (ctx, buffer) = context(false);
        let passed = vec![named("p3", Outcome::Pass), named("p2", Outcome::Pass), named("p1", Outcome::Pass)];
        let pending = vec![named("todo", Outcome::Pending)];
        // Most recently completed first.
        let failed = vec![named("second", Outcome::Fail), named("first", Outcome::Fail)];

        HumanSequential
            .report_global_results(&ctx, 120, &passed, &pending, &failed, &[])
            .unwrap();

        assert_eq!(
            contents(&buffer),
            indoc! {"
                * Tests:    6
                * Passed:   3
                * Pending:  1
                * Failures: 2
                * Errors:   0

                Pending:
                  * Suite.todo (file.ext:1)

                Failures:
                  * Suite.first (file.ext:1)
                  * Suite.second (file.ext:1)

                Total execution time: 120ms
            "}
        );
    }

    #[test]
    fn test_formatting_is_idempotent() {
        let formatter = HumanFormatter::new(Palette::new(true));
        let test = failing_foo();
        assert_eq!(formatter.result_block(&test.payload), formatter.result_block(&test.payload));
        assert_eq!(formatter.start_message(&test), formatter.start_message(&test));
    }
}
