use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use android_build::log::{LogLevel, MemoryLog};
use android_build::runner::RecordingRunner;
use android_build::{Build, Error, ExecutionContext};

// Every test here moves the process working directory.
static CWD_LOCK: Mutex<()> = Mutex::new(());

fn cwd_lock() -> MutexGuard<'static, ()> {
    CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

fn canonical(p: &Path) -> PathBuf {
    p.canonicalize().unwrap()
}

struct Fixture {
    build: Build,
    runner: Arc<RecordingRunner>,
    log: Arc<MemoryLog>,
    top: tempfile::TempDir,
}

fn fixture_with(runner: RecordingRunner) -> Fixture {
    let top = tempfile::tempdir().unwrap();
    let runner = Arc::new(runner);
    let log = Arc::new(MemoryLog::default());
    let ctx = ExecutionContext::new(top.path(), "aosp_arm64", "userdebug")
        .with_log(log.clone())
        .with_runner(runner.clone());
    let build = Build::new(Arc::new(ctx)).expect("valid context");
    Fixture {
        build,
        runner,
        log,
        top,
    }
}

fn fixture() -> Fixture {
    fixture_with(RecordingRunner::default())
}

#[test]
fn construction_fails_with_one_warning_per_missing_config() {
    let cases = [
        ExecutionContext::new("", "aosp_arm64", "userdebug"),
        ExecutionContext::new("/src/aosp", "", "userdebug"),
        ExecutionContext::new("/src/aosp", "aosp_arm64", ""),
        ExecutionContext {
            target_build_variant: None,
            ..ExecutionContext::new("/src/aosp", "aosp_arm64", "eng")
        },
    ];
    for ctx in cases {
        let log = Arc::new(MemoryLog::default());
        let runner = Arc::new(RecordingRunner::default());
        let ctx = ctx.with_log(log.clone()).with_runner(runner.clone());

        let err = match Build::new(Arc::new(ctx)) {
            Ok(_) => panic!("construction should fail"),
            Err(e) => e,
        };
        assert!(err.is_configuration(), "unexpected err: {err}");
        assert_eq!(log.count(LogLevel::Warning), 1);
        assert_eq!(log.entries().len(), 1);
        assert!(runner.scripts().is_empty());
    }
}

#[test]
fn configuration_error_names_the_missing_field() {
    let ctx = ExecutionContext::new("/src/aosp", "", "userdebug")
        .with_log(Arc::new(MemoryLog::default()));
    match Build::new(Arc::new(ctx)) {
        Err(Error::Configuration { missing }) => assert_eq!(missing, vec!["target_product"]),
        Err(e) => panic!("unexpected err: {e}"),
        Ok(_) => panic!("construction should fail"),
    }
}

#[test]
fn construction_keeps_the_context() {
    let fx = fixture();
    assert_eq!(fx.build.context().target_product(), Some("aosp_arm64"));
    assert_eq!(fx.build.context().android_build_top(), Some(fx.top.path()));
    assert!(fx.log.entries().is_empty());
}

#[test]
fn build_module_runs_lunch_and_mmma_from_build_top() {
    let _g = cwd_lock();
    let fx = fixture();
    let before = std::env::current_dir().unwrap();

    fx.build.build_module("foo/bar").unwrap();

    let calls = fx.runner.invocations();
    assert_eq!(calls.len(), 1);
    let script = &calls[0].script;
    assert!(script.contains("aosp_arm64-userdebug"), "script: {script}");
    assert!(script.contains("foo/bar"), "script: {script}");
    assert!(script.contains("-j16"), "script: {script}");
    assert_eq!(
        script,
        "source build/envsetup.sh && lunch aosp_arm64-userdebug && mmma -j16 foo/bar"
    );
    assert_eq!(canonical(&calls[0].cwd), canonical(fx.top.path()));
    assert_eq!(std::env::current_dir().unwrap(), before);

    let entries = fx.log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].level, LogLevel::Info);
    assert_eq!(entries[0].message, "BUILDING module foo/bar");
}

#[test]
fn build_kernel_runs_steps_in_order_inside_kernel_tree() {
    let _g = cwd_lock();
    let fx = fixture();
    let kernel = tempfile::tempdir().unwrap();
    let before = std::env::current_dir().unwrap();

    fx.build
        .build_kernel(kernel.path(), "arm64", "defconfigX", "prefix-", true)
        .unwrap();

    assert_eq!(
        fx.runner.scripts(),
        vec![
            ". ./build.config",
            "make clean",
            "make ARCH=arm64 defconfigX",
            "make -j24 ARCH=arm64 CROSS_COMPILE=prefix-",
        ]
    );
    for call in fx.runner.invocations() {
        assert_eq!(canonical(&call.cwd), canonical(kernel.path()));
    }
    assert_eq!(std::env::current_dir().unwrap(), before);
    assert!(fx.log.entries()[0].message.starts_with("BUILDING kernel @ "));
}

#[test]
fn build_kernel_without_clean_skips_make_clean() {
    let _g = cwd_lock();
    let fx = fixture();
    let kernel = tempfile::tempdir().unwrap();

    fx.build
        .build_kernel(kernel.path(), "arm", "multi_v7_defconfig", "arm-linux-gnueabi-", false)
        .unwrap();

    let scripts = fx.runner.scripts();
    assert_eq!(scripts.len(), 3);
    assert!(!scripts.iter().any(|s| s == "make clean"));
}

#[test]
fn unknown_device_is_not_built() {
    let _g = cwd_lock();
    let fx = fixture();
    let before = std::env::current_dir().unwrap();

    let built = fx
        .build
        .build_kernel_for_device(Path::new("/does/not/exist"), "nonexistent-device", false)
        .unwrap();

    assert!(!built);
    assert!(fx.runner.invocations().is_empty());
    assert!(fx.log.entries().is_empty());
    assert_eq!(std::env::current_dir().unwrap(), before);
}

#[test]
fn known_device_delegates_to_build_kernel() {
    let _g = cwd_lock();
    let kernel = tempfile::tempdir().unwrap();

    let by_device = fixture();
    assert!(
        by_device
            .build
            .build_kernel_for_device(kernel.path(), "hikey", true)
            .unwrap()
    );

    let explicit = fixture();
    explicit
        .build
        .build_kernel(
            kernel.path(),
            "arm64",
            "hikey_defconfig",
            "aarch64-linux-android-",
            true,
        )
        .unwrap();

    assert_eq!(by_device.runner.invocations(), explicit.runner.invocations());
    assert_eq!(by_device.log.entries(), explicit.log.entries());
}

#[test]
fn nonzero_exit_status_is_not_reported() {
    let _g = cwd_lock();
    let fx = fixture_with(RecordingRunner::with_exit_code(2));
    let kernel = tempfile::tempdir().unwrap();

    fx.build.build_module("frameworks/base").unwrap();
    assert!(
        fx.build
            .build_kernel_for_device(kernel.path(), "hikey960", false)
            .unwrap()
    );
    // Every kernel step still runs after a failing one.
    assert_eq!(fx.runner.scripts().len(), 1 + 3);
}

#[test]
fn working_directory_restored_when_runner_fails() {
    let _g = cwd_lock();
    let fx = fixture_with(RecordingRunner::failing_spawn());
    let kernel = tempfile::tempdir().unwrap();
    let before = std::env::current_dir().unwrap();

    assert!(fx.build.build_module("foo/bar").is_err());
    assert_eq!(std::env::current_dir().unwrap(), before);

    assert!(
        fx.build
            .build_kernel(kernel.path(), "arm64", "d", "p-", true)
            .is_err()
    );
    assert_eq!(std::env::current_dir().unwrap(), before);
    // The first failing step stops the sequence.
    assert_eq!(fx.runner.scripts().len(), 2);
}

#[test]
fn missing_kernel_tree_is_an_error_without_invocation() {
    let _g = cwd_lock();
    let fx = fixture();
    let before = std::env::current_dir().unwrap();

    let err = fx
        .build
        .build_kernel(Path::new("/does/not/exist"), "arm64", "d", "p-", false)
        .unwrap_err();

    assert!(err.to_string().contains("/does/not/exist"), "unexpected err: {err}");
    assert!(fx.runner.invocations().is_empty());
    assert_eq!(std::env::current_dir().unwrap(), before);
}
