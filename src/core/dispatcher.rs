use crate::core::color::Palette;
use crate::core::config::RunConfig;
use crate::core::error::Result;
use crate::core::event::{CompletedTest, DiscoveredTest};
use crate::core::output::OutputChannel;
use crate::reporters::Reporter;

/// Everything a reporter callback may read or write.
#[derive(Debug)]
pub struct ReportContext {
    pub channel: OutputChannel,
    pub palette: Palette,
}

impl ReportContext {
    pub fn new(channel: OutputChannel, palette: Palette) -> Self {
        Self { channel, palette }
    }

    pub fn is_quiet(&self) -> bool {
        self.channel.is_quiet()
    }
}

/// Broadcasts lifecycle events to every registered reporter, in
/// registration order.
///
/// The first reporter failure aborts the broadcast and is returned to the
/// caller; it is never swallowed or retried.
pub struct Dispatcher {
    reporters: Vec<Box<dyn Reporter>>,
    ctx: ReportContext,
}

impl Dispatcher {
    pub fn new(reporters: Vec<Box<dyn Reporter>>, ctx: ReportContext) -> Self {
        Self { reporters, ctx }
    }

    /// A dispatcher with the single reporter selected by `config`.
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let ctx = ReportContext::new(config.channel()?, config.palette());
        Ok(Self::new(vec![config.reporter_kind().build()], ctx))
    }

    pub fn register(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.push(reporter);
    }

    pub fn reporter_ids(&self) -> Vec<&'static str> {
        self.reporters.iter().map(|r| r.id()).collect()
    }

    pub fn context(&self) -> &ReportContext {
        &self.ctx
    }

    pub fn report_all_tests(&self, tests: &[DiscoveredTest]) -> Result<()> {
        log::debug!("all-tests: {} tests to {} reporters", tests.len(), self.reporters.len());
        for reporter in &self.reporters {
            reporter.report_all_tests(&self.ctx, tests)?;
        }
        Ok(())
    }

    pub fn report_global_start(&self, tests: &[DiscoveredTest]) -> Result<()> {
        log::debug!("global-start: {} tests", tests.len());
        for reporter in &self.reporters {
            reporter.report_global_start(&self.ctx, tests)?;
        }
        Ok(())
    }

    pub fn report_test_start(&self, test: &DiscoveredTest) -> Result<()> {
        log::debug!("test-start: {}", test.flat_name());
        for reporter in &self.reporters {
            reporter.report_test_start(&self.ctx, test)?;
        }
        Ok(())
    }

    pub fn report_test_result(&self, test: &CompletedTest) -> Result<()> {
        log::debug!("test-result: {} {:?}", test.flat_name(), test.payload.outcome);
        for reporter in &self.reporters {
            reporter.report_test_result(&self.ctx, test)?;
        }
        Ok(())
    }

    pub fn report_global_results(
        &self,
        total_time_ms: u64,
        passed: &[CompletedTest],
        pending: &[CompletedTest],
        failed: &[CompletedTest],
        errored: &[CompletedTest],
    ) -> Result<()> {
        log::debug!(
            "global-results: {} passed, {} pending, {} failed, {} errored in {}ms",
            passed.len(),
            pending.len(),
            failed.len(),
            errored.len(),
            total_time_ms
        );
        for reporter in &self.reporters {
            reporter.report_global_results(&self.ctx, total_time_ms, passed, pending, failed, errored)?;
        }
        Ok(())
    }
}
