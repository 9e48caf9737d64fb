use std::{env, fs, path::PathBuf, process::Command};

fn run_bin(args: &[&str]) {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_sirdnet"));

    let output = Command::new(bin)
        .args(args)
        .output()
        .expect("failed to execute command");

    let stdout_str =
        std::str::from_utf8(&output.stdout).expect("failed to convert stdout to string");
    let stderr_str =
        std::str::from_utf8(&output.stderr).expect("failed to convert stderr to string");

    assert!(
        output.status.success(),
        "failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
    );
}

fn config_contents(seed: &str) -> String {
    String::new()
        + "[model]\n"
        + "population_size = 400\n"
        + "cluster_count = 4\n"
        + "infection_rate = 0.2\n"
        + "recovery_rate = 0.05\n"
        + "fatality_rate = 0.01\n"
        + "\n"
        + "[init]\n"
        + seed
        + "\n"
        + "[output]\n"
        + "ticks_per_file = 50\n"
        + "stop_when_extinct = false\n"
}

#[test]
fn basic_workflow() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("basic_workflow");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let config_path = test_dir.join("config.toml");
    fs::write(&config_path, config_contents("")).expect("failed to write config file");

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    run_bin(&["--sim-dir", test_dir_str, "create"]);
    run_bin(&["--sim-dir", test_dir_str, "create"]);

    run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "0"]);
    run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "1"]);

    assert!(test_dir.join("run-0001/trajectory-0001.msgpack").exists());

    run_bin(&["--sim-dir", test_dir_str, "analyze"]);

    assert!(test_dir.join("run-0000/results.msgpack").exists());
    assert!(test_dir.join("results.msgpack").exists());

    run_bin(&["--sim-dir", test_dir_str, "clean"]);

    assert!(!test_dir.join("run-0000").exists());
    assert!(!test_dir.join("results.msgpack").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn seeded_runs_are_reproducible() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("seeded_runs");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let config_path = test_dir.join("config.toml");
    fs::write(&config_path, config_contents("seed = 1234\n"))
        .expect("failed to write config file");

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    run_bin(&["--sim-dir", test_dir_str, "create"]);
    run_bin(&["--sim-dir", test_dir_str, "create"]);

    let read = |run: &str| {
        fs::read(test_dir.join(run).join("trajectory-0000.msgpack"))
            .expect("failed to read trajectory file")
    };
    assert_eq!(read("run-0000"), read("run-0001"));

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn invalid_config_is_rejected() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("invalid_config");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let config_path = test_dir.join("config.toml");
    let contents = config_contents("").replace("fatality_rate = 0.01", "fatality_rate = 1.5");
    fs::write(&config_path, contents).expect("failed to write config file");

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    let output = Command::new(env!("CARGO_BIN_EXE_sirdnet"))
        .args(["--sim-dir", test_dir_str, "create"])
        .output()
        .expect("failed to execute command");
    assert!(!output.status.success());
    assert!(!test_dir.join("run-0000").exists());

    fs::remove_dir_all(&test_dir).ok();
}
