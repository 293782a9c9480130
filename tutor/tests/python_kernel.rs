//! Tests against a real `python3` interpreter.
//!
//! Each test returns early when `python3` cannot be spawned, so the suite
//! stays green on machines without Python.

use tutor::environment::ExecutionEnvironment;
use tutor::io::config::KernelConfig;
use tutor::io::kernel::{Kernel, PythonKernel};
use tutor::test_support::python_available;

fn environment(config: KernelConfig) -> Option<ExecutionEnvironment> {
    if !python_available() {
        eprintln!("python3 not available, skipping");
        return None;
    }
    Some(ExecutionEnvironment::new(Box::new(PythonKernel::new(
        config,
        std::env::temp_dir(),
    ))))
}

#[test]
fn variables_persist_across_runs() {
    let Some(mut env) = environment(KernelConfig::default()) else {
        return;
    };
    assert!(env.is_empty());
    assert_eq!(env.run("total = 20 + 1"), "");
    assert_eq!(env.run("print(total * 2)"), "42\n");
    assert_eq!(env.get("total"), Some("21"));
}

#[test]
fn exceptions_become_output_text() {
    let Some(mut env) = environment(KernelConfig::default()) else {
        return;
    };
    assert_eq!(env.run("print('before')\n1 / 0"), "division by zero");
    assert_eq!(env.run("raise ValueError()"), "ValueError");
    // The kernel survives faults.
    assert_eq!(env.run("print('after')"), "after\n");
}

#[test]
fn stdout_is_restored_between_runs() {
    let Some(mut env) = environment(KernelConfig::default()) else {
        return;
    };
    env.run("import sys\nsaved = sys.stdout\nraise RuntimeError('x')");
    assert_eq!(env.run("print('visible')"), "visible\n");
}

#[test]
fn exit_does_not_kill_the_kernel() {
    let Some(mut env) = environment(KernelConfig::default()) else {
        return;
    };
    env.run("keep = 'yes'");
    assert_eq!(env.run("exit()"), "SystemExit");
    assert_eq!(env.run("print(keep)"), "yes\n");
}

#[test]
fn lone_surrogates_are_escaped_and_state_survives() {
    let Some(mut env) = environment(KernelConfig::default()) else {
        return;
    };
    env.run("kept = 7");
    assert_eq!(env.run("print('\\ud800')"), "\\ud800\n");
    assert_eq!(env.run("raise ValueError('a\\udc80b')"), "a\\udc80b");
    assert_eq!(env.run("print(kept)"), "7\n");
    assert_eq!(env.get("kept"), Some("7"));
}

#[test]
fn raw_stdout_writes_do_not_break_the_protocol() {
    let Some(mut env) = environment(KernelConfig::default()) else {
        return;
    };
    env.run("import os\nos.write(1, b'stray\\n')");
    assert_eq!(env.run("print('ok')"), "ok\n");
}

#[test]
fn timeout_resets_the_environment() {
    let config = KernelConfig {
        run_timeout_secs: 1,
        ..KernelConfig::default()
    };
    let Some(mut env) = environment(config) else {
        return;
    };
    env.run("kept = 1");
    let output = env.run("while True:\n    pass");
    assert!(output.contains("timed out after 1s"), "{output}");
    assert!(env.is_empty());
    assert_eq!(env.run("print(kept)"), "name 'kept' is not defined");
}

#[test]
fn output_is_truncated_at_the_limit() {
    let config = KernelConfig {
        output_limit_bytes: 10,
        ..KernelConfig::default()
    };
    let Some(mut env) = environment(config) else {
        return;
    };
    let output = env.run("print('x' * 100)");
    assert!(output.starts_with("xxxxxxxxxx\n[output truncated 91 bytes]"));
}

#[test]
fn kernel_reports_user_variables_only() {
    if !python_available() {
        return;
    }
    let mut kernel = PythonKernel::new(KernelConfig::default(), std::env::temp_dir());
    let reply = kernel
        .execute("import math\n_hidden = 1\nradius = 2.0")
        .expect("execute");
    assert!(reply.ok);
    assert_eq!(
        reply.variables.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["radius"]
    );
    assert!(kernel.is_running());
}
