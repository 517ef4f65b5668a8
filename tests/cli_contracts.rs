use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

fn run_mhwimm(home: Option<&Path>, args: &[&str], stdin: &str) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mhwimm"));
    cmd.args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    match home {
        Some(home) => cmd.env("HOME", home).current_dir(home),
        None => cmd.env_remove("HOME"),
    };
    let mut child = cmd.spawn().expect("failed to execute mhwimm");
    // The process may exit before reading its input.
    let _ = child.stdin.take().unwrap().write_all(stdin.as_bytes());
    child.wait_with_output().unwrap()
}

#[test]
fn version_and_help_need_no_home() {
    let out = run_mhwimm(None, &["--version"], "");
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains(env!("CARGO_PKG_VERSION")));

    let out = run_mhwimm(None, &["--help"], "");
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("mod manager"));
}

#[test]
fn interactive_session_exits_zero_and_saves_config() {
    let tmp = tempfile::tempdir().unwrap();
    let game = tmp.path().join("game");
    fs::create_dir_all(&game).unwrap();
    fs::create_dir_all(tmp.path().join("sword/tex")).unwrap();
    fs::write(tmp.path().join("sword/tex/skin.png"), "png").unwrap();

    let script = format!(
        "config MHWIROOT={}\ninstall sword sword\ninstalled\nexit\n",
        game.display()
    );
    let out = run_mhwimm(Some(tmp.path()), &[], &script);
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("Monster Hunter World:Iceborne Mod Manager cmd tool"));
    assert!(stdout.contains("        installed sword (1 files, 1 directories)"));
    assert!(stdout.contains("        sword\n"));
    assert!(stdout.trim_end().ends_with("Program exiting."));
    assert!(game.join("tex/skin.png").exists());

    let saved = fs::read_to_string(tmp.path().join(".mhwimm/mhwimm_config")).unwrap();
    assert!(saved.contains(&format!("MHWIROOT={}\n", game.display())));
    assert!(saved.contains(&format!("USERHOME={}\n", tmp.path().display())));
    assert!(tmp.path().join(".mhwimm/mhwimm.db").exists());
    assert!(tmp.path().join(".mhwimm/store.events.jsonl").exists());
}

#[test]
fn state_survives_a_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let game = tmp.path().join("game");
    fs::create_dir_all(&game).unwrap();
    fs::create_dir_all(tmp.path().join("armor")).unwrap();
    fs::write(tmp.path().join("armor/plate.cfg"), "x").unwrap();

    let first = format!("config MHWIROOT={}\ninstall armor armor\n", game.display());
    assert!(run_mhwimm(Some(tmp.path()), &[], &first).status.success());

    let out = run_mhwimm(Some(tmp.path()), &[], "installed\nuninstall armor\nexit\n");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("        armor\n"));
    assert!(stdout.contains("        uninstalled armor"));
    assert!(!game.join("plate.cfg").exists());
}

#[test]
fn missing_home_is_a_startup_failure() {
    let out = run_mhwimm(None, &[], "exit\n");
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("HOME is not set"));
}

#[test]
fn unusable_store_location_is_a_startup_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("blocker");
    fs::write(&blocker, "file, not a directory").unwrap();
    fs::create_dir_all(tmp.path().join(".mhwimm")).unwrap();
    fs::write(
        tmp.path().join(".mhwimm/mhwimm_config"),
        format!("MHWIMMROOT={}/data\n", blocker.display()),
    )
    .unwrap();

    let out = run_mhwimm(Some(tmp.path()), &[], "exit\n");
    assert!(!out.status.success());
}
