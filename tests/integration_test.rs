use std::collections::BTreeSet;
use std::fs;
use std::process::Command;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use testreport::core::color::Palette;
use testreport::core::config::{OutputTarget, RunConfig};
use testreport::core::dispatcher::{Dispatcher, ReportContext};
use testreport::core::event::{CompletedTest, FlatTest, Location, Outcome, ResultPayload};
use testreport::core::output::{OutputChannel, Sink};
use testreport::reporters::ReporterKind;

const TRANSCRIPT: &str = r#"{"event":"all-tests","tests":[{"path":["Math","add"],"location":{"file":"math.hs","line":4}},{"path":["Math","div"],"location":{"file":"math.hs","line":9}}]}
{"event":"global-start","tests":[{"path":["Math","add"]},{"path":["Math","div"]}]}
{"event":"test-start","test":{"path":["Math","add"],"location":{"file":"math.hs","line":4}}}
{"event":"test-result","test":{"path":["Math","add"],"location":{"file":"math.hs","line":4},"result":{"outcome":"pass","elapsed_ms":1}}}
{"event":"test-start","test":{"path":["Math","div"],"location":{"file":"math.hs","line":9}}}
{"event":"test-result","test":{"path":["Math","div"],"location":{"file":"math.hs","line":9},"result":{"outcome":"fail","message":"expected 1, got 2","elapsed_ms":5}}}
{"event":"global-results","total_time_ms":6,"passed":[{"path":["Math","add"],"result":{"outcome":"pass","elapsed_ms":1}}],"failed":[{"path":["Math","div"],"location":{"file":"math.hs","line":9},"result":{"outcome":"fail","message":"expected 1, got 2","elapsed_ms":5}}]}
"#;

fn memory_dispatcher(kind: ReporterKind, quiet: bool) -> (Dispatcher, Arc<Mutex<Vec<u8>>>) {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let channel = OutputChannel::new(Sink::Shared(buffer.clone()), quiet);
    let ctx = ReportContext::new(channel, Palette::plain());
    (Dispatcher::new(vec![kind.build()], ctx), buffer)
}

fn completed(name: &str, outcome: Outcome) -> CompletedTest {
    FlatTest::new(["Suite", name], Some(Location::new("suite.hs", 1)))
        .complete(ResultPayload::new(outcome, format!("{} ran", name), 3))
}

#[test]
fn test_failing_test_example() {
    let (dispatcher, buffer) = memory_dispatcher(ReporterKind::HumanSequential, true);
    let test = FlatTest::new(["Suite", "testFoo"], Some(Location::new("file.ext", 10)));

    dispatcher.report_test_start(&test).unwrap();
    dispatcher
        .report_test_result(&test.complete(ResultPayload::new(Outcome::Fail, "expected 1, got 2", 5)))
        .unwrap();

    assert_eq!(
        String::from_utf8(buffer.lock().unwrap().clone()).unwrap(),
        "[TEST] Suite.testFoo (file.ext:10)\nexpected 1, got 2\n*** Failed! (5ms)\n"
    );
}

#[test]
fn test_concurrent_dispatch_to_split_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig {
        parallel: true,
        quiet: true,
        output: OutputTarget::Split(dir.path().join("msg-")),
        ..RunConfig::default()
    };
    let dispatcher = Dispatcher::from_config(&config).unwrap();
    assert_eq!(dispatcher.reporter_ids(), vec!["human-parallel"]);

    let tests: Vec<CompletedTest> = (0..32).map(|i| completed(&format!("t{}", i), Outcome::Fail)).collect();

    std::thread::scope(|scope| {
        for chunk in tests.chunks(8) {
            let dispatcher = &dispatcher;
            scope.spawn(move || {
                for test in chunk {
                    dispatcher.report_test_start(&test.identity()).unwrap();
                    dispatcher.report_test_result(test).unwrap();
                }
            });
        }
    });

    // Quiet mode: each failure writes a start line and a result block.
    let names: BTreeSet<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    let expected: BTreeSet<String> = (0..64).map(|i| format!("msg-{}", i)).collect();
    assert_eq!(names, expected);
    assert_eq!(dispatcher.context().channel.files_written(), 64);

    let result_blocks = (0..64)
        .map(|i| fs::read_to_string(dir.path().join(format!("msg-{}", i))).unwrap())
        .filter(|body| body.contains("*** Failed!"))
        .count();
    assert_eq!(result_blocks, 32);
}

#[test]
fn test_machine_summary_matches_buckets() {
    let (dispatcher, buffer) = memory_dispatcher(ReporterKind::MachineSequential, false);
    let passed = vec![completed("a", Outcome::Pass)];
    let errored = vec![completed("b", Outcome::Error), completed("c", Outcome::Error)];

    dispatcher.report_global_results(40, &passed, &[], &[], &errored).unwrap();

    let output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
    let event: serde_json::Value = serde_json::from_str(output.trim_end()).unwrap();
    assert_eq!(event["type"], "test-results");
    assert_eq!(event["passed"], 1);
    assert_eq!(event["errors"], 2);
    assert_eq!(event["wall_time_ms"], 40);
}

#[test]
fn test_cli_reporters_table() {
    let output = Command::new(env!("CARGO_BIN_EXE_testreport"))
        .arg("reporters")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for id in ["human-sequential", "human-parallel", "machine-sequential", "machine-parallel"] {
        assert!(stdout.contains(id));
    }
}

#[test]
fn test_cli_replay_human() {
    let dir = tempfile::tempdir().unwrap();
    let transcript = dir.path().join("run.jsonl");
    fs::write(&transcript, TRANSCRIPT).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_testreport"))
        .args(["--color", "never", "replay"])
        .arg(&transcript)
        .output()
        .expect("Failed to execute command");

    // A failing test makes the exit code 1.
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[TEST] Math.div (math.hs:9)\nexpected 1, got 2\n*** Failed! (5ms)\n"));
    assert!(stdout.contains("* Tests:    2"));
    assert!(stdout.contains("Failures:\n  * Math.div (math.hs:9)\n"));
    assert!(stdout.contains("Total execution time: 6ms"));
}

#[test]
fn test_cli_replay_machine_parallel_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let transcript = dir.path().join("run.jsonl");
    let report = dir.path().join("report.jsonl");
    fs::write(&transcript, TRANSCRIPT).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_testreport"))
        .args(["--parallel", "--machine", "--output"])
        .arg(&report)
        .arg("replay")
        .arg(&transcript)
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    let events: Vec<serde_json::Value> = fs::read_to_string(&report)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(events.len(), 8);
    assert_eq!(events.iter().filter(|e| e["type"] == "test-start").count(), 4);
    assert_eq!(events.first().unwrap()["type"], "test-list");
    assert_eq!(events.last().unwrap()["failures"], 1);
}

#[test]
fn test_cli_missing_transcript() {
    let output = Command::new(env!("CARGO_BIN_EXE_testreport"))
        .args(["replay", "/no/such/transcript.jsonl"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to open transcript"));
}
