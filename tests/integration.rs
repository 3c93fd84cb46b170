use std::{fs, path::PathBuf, process::Command};

fn run_bin(args: &[&str]) {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_sirwalk"));

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

#[test]
fn basic_workflow() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("basic_workflow");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir_all(&test_dir).expect("failed to create test directory");

    let config_contents = String::new()
        + "[model]\n"
        + "half_width = 50\n"
        + "max_step = 2\n"
        + "prob_trans = 0.4\n"
        + "tau_inf = 10.0\n"
        + "tau_rec = 20.0\n"
        + "\n"
        + "[init]\n"
        + "n_wlk = 100\n"
        + "n_inf = 2\n"
        + "\n"
        + "[output]\n"
        + "steps_per_save = 2\n"
        + "saves_per_file = 4\n"
        + "label = \"n_wlk = 100, h = 2, tau1 = 10, tau2 = 20, p = 0.4, starting = 2\"\n";

    fs::write(test_dir.join("config.toml"), config_contents).expect("failed to write config file");

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    run_bin(&["--sim-dir", test_dir_str, "create"]);
    run_bin(&["--sim-dir", test_dir_str, "create"]);

    run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "0"]);
    run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "0"]);

    run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "1"]);
    run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "1"]);

    run_bin(&["--sim-dir", test_dir_str, "analyze"]);

    assert!(test_dir.join("run-0000/results.msgpack").exists());
    assert!(test_dir.join("run-0001/results.msgpack").exists());

    run_bin(&["--sim-dir", test_dir_str, "clean"]);

    assert!(!test_dir.join("run-0000").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn seeded_runs_are_reproducible() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("seeded_runs");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir_all(&test_dir).expect("failed to create test directory");

    let config_contents = String::new()
        + "[model]\n"
        + "half_width = 50\n"
        + "max_step = 2\n"
        + "prob_trans = 0.4\n"
        + "tau_inf = 10.0\n"
        + "tau_rec = 20.0\n"
        + "\n"
        + "[init]\n"
        + "n_wlk = 200\n"
        + "n_inf = 2\n"
        + "seed = 92\n"
        + "\n"
        + "[output]\n"
        + "steps_per_save = 2\n"
        + "saves_per_file = 5\n";

    fs::write(test_dir.join("config.toml"), config_contents).expect("failed to write config file");

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    run_bin(&["--sim-dir", test_dir_str, "create"]);
    run_bin(&["--sim-dir", test_dir_str, "create"]);

    let traj_a = fs::read(test_dir.join("run-0000/trajectory-0000.msgpack"))
        .expect("failed to read first trajectory");
    let traj_b = fs::read(test_dir.join("run-0001/trajectory-0000.msgpack"))
        .expect("failed to read second trajectory");
    assert_eq!(traj_a, traj_b);

    fs::remove_dir_all(&test_dir).ok();
}
