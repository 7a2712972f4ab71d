pub mod human;
pub mod machine;

use std::fmt;

use crate::core::dispatcher::ReportContext;
use crate::core::error::Result;
use crate::core::event::{CompletedTest, DiscoveredTest};
use crate::reporters::human::{HumanParallel, HumanSequential};
use crate::reporters::machine::{MachineParallel, MachineSequential};

/// Reporter trait for rendering the lifecycle of a test run.
///
/// Implementations hold no state of their own; everything they need is in
/// the [`ReportContext`]. They may be called concurrently from several
/// executor workers.
pub trait Reporter: Send + Sync {
    /// Identifier of this binding, e.g. `human-sequential`.
    fn id(&self) -> &'static str;

    /// Report the full set of discovered tests
    fn report_all_tests(&self, ctx: &ReportContext, tests: &[DiscoveredTest]) -> Result<()>;

    /// Report the start of the run
    fn report_global_start(&self, ctx: &ReportContext, tests: &[DiscoveredTest]) -> Result<()>;

    /// Report the start of a specific test
    fn report_test_start(&self, ctx: &ReportContext, test: &DiscoveredTest) -> Result<()>;

    /// Report the result of a specific test
    fn report_test_result(&self, ctx: &ReportContext, test: &CompletedTest) -> Result<()>;

    /// Report the summary of the run.
    ///
    /// Each bucket lists its tests most recently completed first.
    fn report_global_results(
        &self,
        ctx: &ReportContext,
        total_time_ms: u64,
        passed: &[CompletedTest],
        pending: &[CompletedTest],
        failed: &[CompletedTest],
        errored: &[CompletedTest],
    ) -> Result<()>;
}

/// The four reporter bindings, one per (parallel, machine output) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReporterKind {
    HumanSequential,
    HumanParallel,
    MachineSequential,
    MachineParallel,
}

impl ReporterKind {
    pub const ALL: [ReporterKind; 4] = [
        ReporterKind::HumanSequential,
        ReporterKind::HumanParallel,
        ReporterKind::MachineSequential,
        ReporterKind::MachineParallel,
    ];

    pub fn select(parallel: bool, machine_output: bool) -> Self {
        match (parallel, machine_output) {
            (false, false) => ReporterKind::HumanSequential,
            (true, false) => ReporterKind::HumanParallel,
            (false, true) => ReporterKind::MachineSequential,
            (true, true) => ReporterKind::MachineParallel,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            ReporterKind::HumanSequential => "human-sequential",
            ReporterKind::HumanParallel => "human-parallel",
            ReporterKind::MachineSequential => "machine-sequential",
            ReporterKind::MachineParallel => "machine-parallel",
        }
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self, ReporterKind::HumanParallel | ReporterKind::MachineParallel)
    }

    pub fn is_machine(&self) -> bool {
        matches!(self, ReporterKind::MachineSequential | ReporterKind::MachineParallel)
    }

    pub fn build(&self) -> Box<dyn Reporter> {
        match self {
            ReporterKind::HumanSequential => Box::new(HumanSequential),
            ReporterKind::HumanParallel => Box::new(HumanParallel),
            ReporterKind::MachineSequential => Box::new(MachineSequential),
            ReporterKind::MachineParallel => Box::new(MachineParallel),
        }
    }
}

impl fmt::Display for ReporterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Builds the single reporter for a run configuration.
pub fn select_reporter(parallel: bool, machine_output: bool) -> Box<dyn Reporter> {
    ReporterKind::select(parallel, machine_output).build()
}
