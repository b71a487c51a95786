/*!
 * Safe Execution Scope Integration Tests
 * End-to-end confinement, capability gating, and restoration on every
 * exit path
 */

use serial_test::serial;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;
use toucan_sandbox::sandbox::{evaluate, execute, spawn_process, CapabilityGate};
use toucan_sandbox::{Capability, SafeExecutionScope, SandboxError, SecurityEvent};

struct Fixture {
    _guard: tempfile::TempDir,
    root: PathBuf,
    sensitive: PathBuf,
}

fn fixture() -> Fixture {
    let _ = env_logger::builder().is_test(true).try_init();
    let guard = tempdir().expect("tempdir");
    let root = guard.path().join("safe_work_dir");
    let outside = guard.path().join("unsafe_dir");
    fs::create_dir(&root).expect("mkdir root");
    fs::create_dir(&outside).expect("mkdir outside");
    let sensitive = outside.join("sensitive.txt");
    fs::write(&sensitive, b"SENSITIVE DATA").expect("write");
    Fixture {
        root,
        sensitive,
        _guard: guard,
    }
}

#[test]
#[serial]
fn test_allowed_operations_inside_root() {
    let fx = fixture();
    let active = SafeExecutionScope::new(&fx.root)
        .expect("valid root")
        .enter()
        .expect("enter");
    let sandbox = active.fs();

    sandbox.write("ok.txt", b"x").expect("write");
    assert_eq!(sandbox.read_to_string("ok.txt").expect("read"), "x");

    sandbox.create_dir_all("subdir").expect("mkdir");
    sandbox.write("subdir/test2.txt", b"nested").expect("write");
    assert_eq!(
        sandbox.read_to_string("subdir/test2.txt").expect("read"),
        "nested"
    );

    active.exit().expect("exit");

    // Effects are observable after the scope exits.
    assert_eq!(
        fs::read_to_string(fx.root.join("ok.txt")).expect("read"),
        "x"
    );
    assert!(fx.root.join("subdir/test2.txt").exists());
}

#[test]
#[serial]
fn test_absolute_path_outside_root_denied() {
    let fx = fixture();
    let active = SafeExecutionScope::new(&fx.root)
        .expect("valid root")
        .enter()
        .expect("enter");

    let err = active.fs().open(&fx.sensitive).expect_err("must deny");
    assert!(matches!(err, SandboxError::PathEscape { .. }));

    let err = active.fs().open("/etc/passwd").expect_err("must deny");
    assert!(matches!(err, SandboxError::PathEscape { .. }));

    active.exit().expect("exit");
}

#[test]
#[serial]
fn test_relative_traversal_denied() {
    let fx = fixture();
    let active = SafeExecutionScope::new(&fx.root)
        .expect("valid root")
        .enter()
        .expect("enter");
    let sandbox = active.fs();

    let err = sandbox
        .open("../unsafe_dir/sensitive.txt")
        .expect_err("must deny");
    assert!(matches!(err, SandboxError::PathEscape { .. }));

    sandbox.create_dir("subdir").expect("mkdir");
    let err = sandbox
        .open("./subdir/../../unsafe_dir/sensitive.txt")
        .expect_err("must deny");
    assert!(matches!(err, SandboxError::PathEscape { .. }));

    active.exit().expect("exit");
}

#[cfg(unix)]
#[test]
#[serial]
fn test_symlink_escape_denied() {
    let fx = fixture();
    std::os::unix::fs::symlink(&fx.sensitive, fx.root.join("evil_link")).expect("symlink");

    let active = SafeExecutionScope::new(&fx.root)
        .expect("valid root")
        .enter()
        .expect("enter");

    let err = active.fs().read("evil_link").expect_err("must deny");
    assert!(matches!(err, SandboxError::PathEscape { .. }));

    active.exit().expect("exit");
}

#[test]
#[serial]
fn test_enumeration_and_chdir_confined() {
    let fx = fixture();
    let active = SafeExecutionScope::new(&fx.root)
        .expect("valid root")
        .enter()
        .expect("enter");
    let sandbox = active.fs();

    // listdir/walk cannot observe outside the root.
    let err = sandbox.list_dir("../unsafe_dir").expect_err("must deny");
    assert!(matches!(err, SandboxError::PathEscape { .. }));
    let err = sandbox.walk("..").expect_err("must deny");
    assert!(matches!(err, SandboxError::PathEscape { .. }));

    // chdir cannot navigate outside the root.
    let err = sandbox
        .set_current_dir("../unsafe_dir")
        .expect_err("must deny");
    assert!(matches!(err, SandboxError::PathEscape { .. }));

    active.exit().expect("exit");
}

#[cfg(unix)]
#[test]
#[serial]
fn test_walk_terminates_with_symlink_cycle() {
    let fx = fixture();
    fs::create_dir(fx.root.join("sub")).expect("mkdir");
    fs::write(fx.root.join("sub/leaf.txt"), b"l").expect("write");
    let canonical_root = fx.root.canonicalize().expect("canonical");
    std::os::unix::fs::symlink(&canonical_root, fx.root.join("sub/loop")).expect("symlink");

    let active = SafeExecutionScope::new(&fx.root)
        .expect("valid root")
        .enter()
        .expect("enter");

    // Guarded code can create a link back to an ancestor; enumeration must
    // still terminate and report each entry once.
    let found = active.fs().walk(".").expect("walk must terminate");
    let leaves = found
        .iter()
        .filter(|p| p.file_name().is_some_and(|n| n == "leaf.txt"))
        .count();
    assert_eq!(leaves, 1);

    active.exit().expect("exit");
}

#[test]
#[serial]
fn test_capabilities_denied_inside_and_restored_after() {
    let fx = fixture();
    let active = SafeExecutionScope::new(&fx.root)
        .expect("valid root")
        .enter()
        .expect("enter");

    let err = evaluate(|| 1 + 1).expect_err("eval must deny");
    assert!(matches!(
        err,
        SandboxError::CapabilityDenied(Capability::DynamicEval)
    ));

    let err = execute(|| ()).expect_err("exec must deny");
    assert!(matches!(
        err,
        SandboxError::CapabilityDenied(Capability::DynamicExec)
    ));

    let err = spawn_process(&mut Command::new("true")).expect_err("spawn must deny");
    assert!(matches!(
        err,
        SandboxError::CapabilityDenied(Capability::ProcessSpawn)
    ));

    active.exit().expect("exit");

    // The same calls succeed after the scope has exited.
    assert_eq!(evaluate(|| 1 + 1).expect("eval after exit"), 2);
    execute(|| ()).expect("exec after exit");
    #[cfg(unix)]
    {
        let mut child = spawn_process(&mut Command::new("true")).expect("spawn after exit");
        child.wait().expect("wait");
    }
}

#[test]
#[serial]
fn test_restoration_runs_when_body_fails() {
    let fx = fixture();

    let body_result: Result<String, SandboxError> = {
        let active = SafeExecutionScope::new(&fx.root)
            .expect("valid root")
            .enter()
            .expect("enter");
        active.run(|fs| {
            fs.write("partial.txt", b"written before failure")?;
            fs.read_to_string("/etc/hostname")
        })
    };

    // The body's error propagated unchanged and the guards are gone.
    assert!(matches!(body_result, Err(SandboxError::PathEscape { .. })));
    assert!(CapabilityGate::ensure(Capability::DynamicEval).is_ok());
    assert!(CapabilityGate::ensure(Capability::ProcessSpawn).is_ok());

    // Work done before the failure persisted.
    assert!(fx.root.join("partial.txt").exists());
}

#[test]
#[serial]
fn test_denials_appear_in_event_log() {
    let fx = fixture();
    let active = SafeExecutionScope::new(&fx.root)
        .expect("valid root")
        .enter()
        .expect("enter");

    let _ = active.fs().open(&fx.sensitive);
    let events = active.events().recent(16);
    assert!(matches!(events[0], SecurityEvent::ScopeEntered { .. }));
    assert!(events
        .iter()
        .any(|e| matches!(e, SecurityEvent::PathDenied { .. })));

    active.exit().expect("exit");
}

#[test]
#[serial]
fn test_gate_mutated_behind_scope_is_fatal_on_exit() {
    let fx = fixture();
    let active = SafeExecutionScope::new(&fx.root)
        .expect("valid root")
        .enter()
        .expect("enter");

    // A body must not touch the gate itself; doing so compromises the
    // scope's restore invariant and has to surface loudly.
    let _stale =
        CapabilityGate::disable(toucan_sandbox::CapabilitySet::empty().with(Capability::FileIo));

    let err = active.exit().expect_err("exit must report the violation");
    assert!(err.is_fatal());
    assert!(matches!(err, SandboxError::Restoration(_)));

    // The pre-scope snapshot was still applied, so the process recovers.
    assert!(CapabilityGate::ensure(Capability::DynamicEval).is_ok());
    assert!(CapabilityGate::ensure(Capability::FileIo).is_ok());
}
