
use std::sync::Arc;

use procpeek_core::{
    OsStatus, Pid, PointerWidth, ProcError, ProcessAccess, STATUS_BUFFER_TOO_SMALL,
    SnapshotSizeHint,
};

use self::mock::{COMMAND_LINE, CURRENT_DIRECTORY, ENVIRONMENT, MockDriver, MockProcess};
use crate::{
    Bitness, ControlBlock, LiveCommandLine, ProcessDataKind, ProcessState, RecordedCommandLine,
    STILL_ACTIVE, WindowsProcesses,
};

const PID: Pid = Pid(1234);
const MISSING: Pid = Pid(0x7fff_fff0);

fn processes(driver: MockDriver) -> WindowsProcesses<MockDriver> {
    WindowsProcesses::new(driver)
        .with_assertions(false)
        .with_size_hint(Arc::new(SnapshotSizeHint::new()))
}

fn single(width: PointerWidth, process: MockProcess) -> WindowsProcesses<MockDriver> {
    processes(MockDriver::new(width).with_process(PID.0, process))
}

fn native() -> WindowsProcesses<MockDriver> {
    single(
        PointerWidth::native(),
        MockProcess::new(PointerWidth::native()),
    )
}

fn expected_arguments() -> Vec<String> {
    vec![
        String::from(r"C:\Program Files\App\app.exe"),
        String::from("--name"),
        String::from("hello world"),
        String::from("-v"),
    ]
}

///////////////////////////////////////////////////////////////////////////////
// Liveness
///////////////////////////////////////////////////////////////////////////////

#[test]
fn idle_pid_is_running() {
    let processes = processes(MockDriver::new(PointerWidth::Bits64));
    assert_eq!(processes.is_running(Pid::IDLE).unwrap(), ProcessState::Running);
    assert_eq!(processes.driver().enum_calls(), 0);
}

#[test]
fn live_process_is_running() {
    let processes = native();
    assert_eq!(processes.is_running(PID).unwrap(), ProcessState::Running);
    assert_eq!(processes.driver().open_handles(), 0);
}

#[test]
fn missing_process_is_not_running() {
    let processes = native();
    assert_eq!(processes.is_running(MISSING).unwrap(), ProcessState::NotRunning);
}

#[test]
fn denied_open_means_running() {
    let processes = single(
        PointerWidth::Bits64,
        MockProcess {
            open_error: Some(5),
            ..MockProcess::new(PointerWidth::Bits64)
        },
    );

    assert_eq!(processes.is_running(PID).unwrap(), ProcessState::Running);
}

#[test]
fn denied_exit_code_means_running() {
    let processes = single(
        PointerWidth::Bits64,
        MockProcess {
            exit_code_error: Some(5),
            ..MockProcess::new(PointerWidth::Bits64)
        },
    );

    assert_eq!(processes.is_running(PID).unwrap(), ProcessState::Running);
    assert_eq!(processes.driver().open_handles(), 0);
}

#[test]
fn exit_code_defers_to_the_process_table() {
    let exited = single(
        PointerWidth::Bits64,
        MockProcess {
            exit_code: 0,
            listed: false,
            ..MockProcess::new(PointerWidth::Bits64)
        },
    );
    assert_eq!(exited.is_running(PID).unwrap(), ProcessState::NotRunning);
    assert_eq!(exited.driver().enum_calls(), 1);

    let listed = single(
        PointerWidth::Bits64,
        MockProcess {
            exit_code: 1,
            ..MockProcess::new(PointerWidth::Bits64)
        },
    );
    assert_eq!(listed.is_running(PID).unwrap(), ProcessState::Running);
}

#[test]
fn unexpected_open_failure_is_a_syscall_error() {
    let processes = single(
        PointerWidth::Bits64,
        MockProcess {
            open_error: Some(6),
            ..MockProcess::new(PointerWidth::Bits64)
        },
    );

    let err = processes.is_running(PID).unwrap_err();
    assert_eq!(err.os_status(), Some(OsStatus::Win32(6)));
}

#[test]
fn sentinel_is_trusted_without_assertions() {
    let process = MockProcess {
        exit_code: STILL_ACTIVE,
        listed: false,
        ..MockProcess::new(PointerWidth::Bits64)
    };

    let processes = single(PointerWidth::Bits64, process.clone());
    assert_eq!(processes.is_running(PID).unwrap(), ProcessState::Running);
    assert_eq!(processes.driver().enum_calls(), 0);

    let processes = single(PointerWidth::Bits64, process).with_assertions(true);
    assert!(matches!(
        processes.is_running(PID),
        Err(ProcError::InconsistentState(_))
    ));
    assert_eq!(processes.driver().open_handles(), 0);
}

#[test]
fn assertions_agree_on_consistent_state() {
    let processes = native().with_assertions(true);
    assert_eq!(processes.is_running(PID).unwrap(), ProcessState::Running);
    assert_eq!(processes.is_running(MISSING).unwrap(), ProcessState::NotRunning);
    assert_eq!(processes.current_directory(PID).unwrap(), CURRENT_DIRECTORY);
}

///////////////////////////////////////////////////////////////////////////////
// Handle Acquisition
///////////////////////////////////////////////////////////////////////////////

#[test]
fn idle_pid_cannot_be_opened() {
    let processes = native();
    assert!(matches!(
        processes.open_handle(Pid::IDLE, ProcessAccess::QUERY_AND_READ),
        Err(ProcError::AccessDenied(_))
    ));
}

#[test]
fn open_missing_process_is_not_found() {
    let processes = native();
    assert!(matches!(
        processes.open_handle(MISSING, ProcessAccess::QUERY_AND_READ),
        Err(ProcError::NotFound(MISSING))
    ));
}

#[test]
fn open_handle_is_closed_on_drop() {
    let processes = native();

    let handle = processes
        .open_handle(PID, ProcessAccess::QUERY_LIMITED_INFORMATION)
        .unwrap();
    assert_eq!(handle.pid(), PID);
    assert_eq!(handle.access(), ProcessAccess::QUERY_LIMITED_INFORMATION);
    assert_eq!(processes.driver().open_handles(), 1);

    drop(handle);
    assert_eq!(processes.driver().open_handles(), 0);
}

#[test]
fn exited_process_handle_is_rejected() {
    let processes = single(
        PointerWidth::Bits64,
        MockProcess {
            exit_code: 0,
            listed: false,
            ..MockProcess::new(PointerWidth::Bits64)
        },
    );

    assert!(matches!(
        processes.open_handle(PID, ProcessAccess::QUERY_AND_READ),
        Err(ProcError::NotFound(PID))
    ));
    assert_eq!(processes.driver().open_handles(), 0);
}

#[test]
fn exit_code_failure_closes_the_handle() {
    let processes = single(
        PointerWidth::Bits64,
        MockProcess {
            exit_code_error: Some(6),
            ..MockProcess::new(PointerWidth::Bits64)
        },
    );

    let err = processes
        .open_handle(PID, ProcessAccess::QUERY_AND_READ)
        .unwrap_err();
    assert_eq!(err.os_status(), Some(OsStatus::Win32(6)));
    assert_eq!(processes.driver().open_handles(), 0);
}

#[test]
fn invalid_parameter_for_listed_process() {
    let process = MockProcess {
        open_error: Some(87),
        ..MockProcess::new(PointerWidth::Bits64)
    };

    let processes = single(PointerWidth::Bits64, process.clone());
    let err = processes
        .open_handle(PID, ProcessAccess::QUERY_AND_READ)
        .unwrap_err();
    assert_eq!(err.os_status(), Some(OsStatus::Win32(87)));

    let processes = single(PointerWidth::Bits64, process).with_assertions(true);
    assert!(matches!(
        processes.open_handle(PID, ProcessAccess::QUERY_AND_READ),
        Err(ProcError::InconsistentState(_))
    ));
}

///////////////////////////////////////////////////////////////////////////////
// Enumeration
///////////////////////////////////////////////////////////////////////////////

#[test]
fn pids_in_enumeration_order() {
    let processes = processes(
        MockDriver::new(PointerWidth::Bits64)
            .with_process(8, MockProcess::new(PointerWidth::Bits64))
            .with_process(4, MockProcess::new(PointerWidth::Bits64))
            .with_extra_pids([100, 12]),
    );

    assert_eq!(processes.pids().unwrap(), [Pid(4), Pid(8), Pid(100), Pid(12)]);
    assert_eq!(processes.driver().enum_calls(), 1);
}

#[test]
fn pids_grow_past_the_first_buffer() {
    let processes = processes(MockDriver::new(PointerWidth::Bits64).with_extra_pids(1..=2500));

    let pids = processes.pids().unwrap();
    assert_eq!(pids.len(), 2500);
    assert_eq!(pids.first(), Some(&Pid(1)));
    assert_eq!(pids.last(), Some(&Pid(2500)));
    assert_eq!(processes.driver().enum_calls(), 3);
}

#[test]
fn exactly_full_buffer_is_retried() {
    let processes = processes(MockDriver::new(PointerWidth::Bits64).with_extra_pids(1..=1024));

    assert_eq!(processes.pids().unwrap().len(), 1024);
    assert_eq!(processes.driver().enum_calls(), 2);
}

///////////////////////////////////////////////////////////////////////////////
// Snapshot
///////////////////////////////////////////////////////////////////////////////

fn snapshot_driver(count: u32) -> MockDriver {
    let width = PointerWidth::native();

    (1..=count).fold(MockDriver::new(width), |driver, index| {
        driver.with_process(
            index * 4,
            MockProcess {
                image_name: format!("process-{index}.exe"),
                parent: index * 4 - 4,
                ..MockProcess::new(width)
            },
        )
    })
}

#[test]
fn snapshot_finds_the_record() {
    let processes = processes(snapshot_driver(5));

    let entry = processes.process_info(Pid(12)).unwrap();
    assert_eq!(entry.pid, Pid(12));
    assert_eq!(entry.parent_pid, Pid(8));
    assert_eq!(entry.image_name, "process-3.exe");
    assert_eq!(entry.threads, 3);
    assert_eq!(entry.handles, 42);
    assert_eq!(entry.session_id, 1);
    assert_eq!(entry.base_priority, 8);
    assert_eq!(entry.create_time, 0x01d9_0000_0000_0000 + 12);

    let snapshot = processes.snapshot().unwrap();
    let pids: Vec<_> = snapshot.entries().map(|entry| entry.unwrap().pid).collect();
    assert_eq!(pids, [Pid(4), Pid(8), Pid(12), Pid(16), Pid(20)]);
}

#[test]
fn snapshot_missing_pid_is_not_found() {
    let processes = processes(snapshot_driver(3));
    assert!(matches!(
        processes.process_info(MISSING),
        Err(ProcError::NotFound(MISSING))
    ));
}

#[test]
fn snapshot_grows_and_remembers_the_size() {
    let hint = Arc::new(SnapshotSizeHint::with_limits(0x40, 0x20000));
    let processes = processes(snapshot_driver(8)).with_size_hint(Arc::clone(&hint));

    processes.snapshot().unwrap();
    let sizes = processes.driver().snapshot_sizes();
    assert_eq!(sizes.len(), 2);
    assert_eq!(sizes[0], 0x40);
    assert_eq!(hint.get() as usize, sizes[1]);

    processes.snapshot().unwrap();
    assert_eq!(processes.driver().snapshot_sizes().len(), 3);
}

#[test]
fn snapshot_size_above_the_ceiling_is_not_remembered() {
    let hint = Arc::new(SnapshotSizeHint::with_limits(0x40, 0x80));
    let processes = processes(snapshot_driver(4)).with_size_hint(Arc::clone(&hint));

    processes.snapshot().unwrap();
    assert_eq!(hint.get(), 0x40);
}

#[test]
fn snapshot_accepts_both_too_small_statuses() {
    let hint = Arc::new(SnapshotSizeHint::with_limits(0x40, 0x20000));
    let processes = processes(snapshot_driver(2).with_too_small_status(STATUS_BUFFER_TOO_SMALL))
        .with_size_hint(hint);

    assert_eq!(processes.process_info(Pid(8)).unwrap().image_name, "process-2.exe");
}

///////////////////////////////////////////////////////////////////////////////
// Extractors
///////////////////////////////////////////////////////////////////////////////

#[test]
fn command_line_round_trips_with_both_sources() {
    let processes = native();

    assert_eq!(processes.command_line(PID, true).unwrap(), expected_arguments());
    assert_eq!(processes.command_line(PID, false).unwrap(), expected_arguments());
    assert_eq!(
        processes.raw_command_line(PID, &LiveCommandLine).unwrap(),
        COMMAND_LINE
    );
    assert_eq!(processes.driver().open_handles(), 0);
}

#[test]
fn live_and_recorded_command_lines_differ_after_tampering() {
    let processes = single(
        PointerWidth::native(),
        MockProcess {
            command_line: String::from("app.exe --patched"),
            recorded_command_line: Some(String::from("app.exe --original")),
            ..MockProcess::new(PointerWidth::native())
        },
    );

    assert_eq!(processes.arguments(PID).unwrap(), ["app.exe", "--patched"]);

    let processes = processes.with_live_command_line(false);
    assert_eq!(processes.arguments(PID).unwrap(), ["app.exe", "--original"]);
    assert_eq!(
        processes.raw_command_line(PID, &RecordedCommandLine).unwrap(),
        "app.exe --original"
    );
}

#[test]
fn recorded_command_line_grows_its_buffer() {
    let long = format!("app.exe {}", "x".repeat(5000));
    let processes = single(
        PointerWidth::native(),
        MockProcess {
            command_line: long.clone(),
            ..MockProcess::new(PointerWidth::native())
        },
    );

    assert_eq!(
        processes.raw_command_line(PID, &RecordedCommandLine).unwrap(),
        long
    );

    let sizes = processes.driver().command_line_sizes();
    assert_eq!(sizes.len(), 2);
    assert_eq!(sizes[0], 4096);
    assert!(sizes[1] > 10000);
}

#[test]
fn empty_command_line() {
    let processes = single(
        PointerWidth::native(),
        MockProcess {
            command_line: String::new(),
            ..MockProcess::new(PointerWidth::native())
        },
    );

    assert!(processes.command_line(PID, true).unwrap().is_empty());
    assert!(processes.command_line(PID, false).unwrap().is_empty());
}

#[test]
fn current_directory() {
    let processes = native();
    assert_eq!(processes.current_directory(PID).unwrap(), CURRENT_DIRECTORY);
}

#[test]
fn environment_entries_are_nul_separated() {
    let processes = native();

    let environment = processes.environment(PID).unwrap();
    assert_eq!(environment, "FOO=bar\0PATH=C:\\Windows\0");
    assert!(environment.starts_with("FOO=bar\0"));
    assert!(!environment.contains('X'));
}

#[test]
fn raw_environment_spans_to_the_region_end() {
    let processes = native();

    let data = processes
        .read_process_data(PID, ProcessDataKind::Environment)
        .unwrap();
    assert_eq!(data.len(), 0x1000 - 0x10);
    assert_eq!(data.as_terminated_bytes().len(), data.len() + 2);
    assert_eq!(&data.as_terminated_bytes()[data.len()..], [0, 0]);
}

#[test]
fn extractors_are_idempotent() {
    let processes = native();

    assert_eq!(
        processes.command_line(PID, true).unwrap(),
        processes.command_line(PID, true).unwrap()
    );
    assert_eq!(
        processes.current_directory(PID).unwrap(),
        processes.current_directory(PID).unwrap()
    );
    assert_eq!(
        processes.environment(PID).unwrap(),
        processes.environment(PID).unwrap()
    );
}

#[test]
fn missing_process_is_not_found_everywhere() {
    let processes = native();

    for live in [true, false] {
        assert!(matches!(
            processes.command_line(MISSING, live),
            Err(ProcError::NotFound(MISSING))
        ));
    }

    assert!(matches!(
        processes.current_directory(MISSING),
        Err(ProcError::NotFound(MISSING))
    ));
    assert!(matches!(
        processes.environment(MISSING),
        Err(ProcError::NotFound(MISSING))
    ));
}

#[test]
fn unrepresentable_environment_is_out_of_memory() {
    let processes = single(
        PointerWidth::Bits64,
        MockProcess {
            environment_region_size: Some(u64::MAX),
            ..MockProcess::new(PointerWidth::Bits64)
        },
    );

    assert!(matches!(
        processes.environment(PID),
        Err(ProcError::OutOfMemory { .. })
    ));
    assert_eq!(processes.driver().open_handles(), 0);
}

///////////////////////////////////////////////////////////////////////////////
// Bitness
///////////////////////////////////////////////////////////////////////////////

fn bitness_of(processes: &WindowsProcesses<MockDriver>) -> Bitness {
    let handle = processes
        .open_handle(PID, ProcessAccess::QUERY_AND_READ)
        .unwrap();

    ControlBlock::locate(&handle).unwrap().bitness()
}

#[test]
fn bitness_resolution() {
    let cases = [
        (
            MockDriver::new(PointerWidth::Bits64),
            PointerWidth::Bits64,
            Bitness::Native,
        ),
        (
            MockDriver::new(PointerWidth::Bits64),
            PointerWidth::Bits32,
            Bitness::InspectorWiderThanTarget,
        ),
        (
            MockDriver::wow64(),
            PointerWidth::Bits32,
            Bitness::Native,
        ),
        (
            MockDriver::wow64(),
            PointerWidth::Bits64,
            Bitness::InspectorNarrowerThanTarget,
        ),
        (
            MockDriver::new(PointerWidth::Bits32),
            PointerWidth::Bits32,
            Bitness::Native,
        ),
    ];

    for (driver, target, expected) in cases {
        let processes = processes(driver.with_process(PID.0, MockProcess::new(target)));
        assert_eq!(bitness_of(&processes), expected, "target {target}");
    }
}

#[test]
fn wider_inspector_sees_what_the_target_sees() {
    let target = MockProcess::new(PointerWidth::Bits32);

    let wider = processes(MockDriver::new(PointerWidth::Bits64).with_process(PID.0, target.clone()));
    let same = processes(MockDriver::wow64().with_process(PID.0, target));

    assert_eq!(
        wider.command_line(PID, true).unwrap(),
        same.command_line(PID, true).unwrap()
    );
    assert_eq!(
        wider.current_directory(PID).unwrap(),
        same.current_directory(PID).unwrap()
    );
    assert_eq!(
        wider.environment(PID).unwrap(),
        same.environment(PID).unwrap()
    );
    assert_eq!(wider.command_line(PID, true).unwrap(), expected_arguments());
}

#[test]
fn narrower_inspector_reads_command_line_and_directory() {
    let processes = processes(
        MockDriver::wow64().with_process(PID.0, MockProcess::new(PointerWidth::Bits64)),
    );

    assert_eq!(processes.command_line(PID, true).unwrap(), expected_arguments());
    assert_eq!(processes.current_directory(PID).unwrap(), CURRENT_DIRECTORY);
    assert_eq!(processes.driver().open_handles(), 0);
}

#[test]
fn narrower_inspector_environment_is_access_denied() {
    let processes = processes(
        MockDriver::wow64().with_process(PID.0, MockProcess::new(PointerWidth::Bits64)),
    );

    assert!(matches!(
        processes.environment(PID),
        Err(ProcError::AccessDenied(_))
    ));
    assert_eq!(processes.driver().open_handles(), 0);
}

#[test]
fn missing_wow64_primitives_are_access_denied() {
    let processes = processes(
        MockDriver::wow64()
            .without_wow64_primitives()
            .with_process(PID.0, MockProcess::new(PointerWidth::Bits64)),
    );

    assert!(matches!(
        processes.current_directory(PID),
        Err(ProcError::AccessDenied(_))
    ));
    assert!(matches!(
        processes.command_line(PID, true),
        Err(ProcError::AccessDenied(_))
    ));
    assert_eq!(processes.driver().open_handles(), 0);
}

fn utf16_bytes(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

#[test]
fn wider_layout_reads_every_field_at_its_own_offset() {
    let processes = processes(
        MockDriver::new(PointerWidth::Bits64)
            .with_process(PID.0, MockProcess::new(PointerWidth::Bits32)),
    );

    let command_line = processes
        .read_process_data(PID, ProcessDataKind::CommandLine)
        .unwrap();
    assert_eq!(command_line.into_vec(), utf16_bytes(COMMAND_LINE));

    let current_directory = processes
        .read_process_data(PID, ProcessDataKind::CurrentDirectory)
        .unwrap();
    assert_eq!(current_directory.into_vec(), utf16_bytes(CURRENT_DIRECTORY));

    let environment = processes
        .read_process_data(PID, ProcessDataKind::Environment)
        .unwrap();
    let mut expected = ENVIRONMENT.join("\0");
    expected.push_str("\0\0");
    assert!(environment.as_bytes().starts_with(&utf16_bytes(&expected)));
    assert_eq!(environment.len(), 0x1000 - 0x10);

    assert_eq!(processes.command_line(PID, true).unwrap(), expected_arguments());
    assert_eq!(processes.current_directory(PID).unwrap(), CURRENT_DIRECTORY);
    assert_eq!(
        processes.environment(PID).unwrap(),
        "FOO=bar\0PATH=C:\\Windows\0"
    );
    assert_eq!(processes.driver().open_handles(), 0);
}
