//! Run the `mudlexus` binary end to end with the embedded loader and check
//! what reaches the console host.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};

fn mudlexus(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mudlexus"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run mudlexus")
}

fn mudlexus_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mudlexus"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run mudlexus")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn chunk_runs_against_shim() {
    let out = mudlexus(&["-f", "-c", "send('look'); expandAlias('gg'); echo('main', 'hi')"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "> look\n>> gg\nhi\n");
}

#[test]
fn send_all_from_command_line() {
    let out = mudlexus(&["-f", "-csendAll({'stand', 'wake', true})"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "> stand\n> wake\n");
}

#[test]
fn smoke_test_visible_with_debug() {
    let out = mudlexus(&["-f", "-d"]);
    assert!(out.status.success());
    assert!(stderr(&out).contains("Lua is working!"), "{}", stderr(&out));
    assert!(stderr(&out).contains("Loaded Mudlet Lua shim 1.0"), "{}", stderr(&out));
}

#[test]
fn script_files_run_in_order() {
    let mut a = tempfile::NamedTempFile::new().unwrap();
    writeln!(a, "send('first')").unwrap();
    let mut b = tempfile::NamedTempFile::new().unwrap();
    writeln!(b, "send('second')").unwrap();

    let out = mudlexus(&["-f", "--", a.path().to_str().unwrap(), b.path().to_str().unwrap()]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "> first\n> second\n");
}

#[test]
fn rc_file_sets_up_reflexes() {
    let mut rc = tempfile::NamedTempFile::new().unwrap();
    writeln!(rc, "/alias rest\n/trigger -d autoloot").unwrap();
    let chunk = "disableAlias('REST'); enableTrigger('autoloot'); echo('done')";

    let rc_flag = format!("-f{}", rc.path().display());
    let out = mudlexus(&[rc_flag.as_str(), "-c", chunk]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "done\n");
}

#[test]
fn unknown_version_fails_bootstrap() {
    let mut rc = tempfile::NamedTempFile::new().unwrap();
    writeln!(rc, "/set mudlexus_version=0.0").unwrap();

    let rc_flag = format!("-f{}", rc.path().display());
    let out = mudlexus(&[rc_flag.as_str(), "-c", "send('look')"]);
    assert!(!out.status.success());
    assert!(stdout(&out).is_empty());
    let err = stderr(&out);
    assert!(err.contains("Could not load Mudlet Lua shim"), "{err}");
    assert!(err.contains("@0.0/mudlet_shim.lua"), "{err}");
}

#[test]
fn asset_dir_serves_selected_version() {
    let dir = tempfile::tempdir().unwrap();
    let version_dir = dir.path().join("1.0");
    std::fs::create_dir(&version_dir).unwrap();
    std::fs::write(
        version_dir.join("mudlet_shim.lua"),
        mudlexus::shim::SHIM_SOURCE,
    )
    .unwrap();

    let out = mudlexus(&["-f", "-L", dir.path().to_str().unwrap(), "-c", "send('from disk')"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "> from disk\n");
}

#[test]
fn lua_error_sets_exit_status() {
    let out = mudlexus(&["-f", "-c", "error('boom')"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("boom"));
}

#[test]
fn bad_flag_prints_usage() {
    let out = mudlexus(&["-z"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("Usage: mudlexus"));
}

const TRIGGER_PACKAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE MudletPackage>
<MudletPackage version="1.001">
    <TriggerPackage>
        <Trigger isActive="yes" isFolder="no" isMultiline="no">
            <name>targets</name>
            <script>send("kill " .. matches[2])</script>
            <regexCodeList>
                <string>^(\w+) attacks you</string>
                <string>^(\w+) arrives</string>
            </regexCodeList>
            <regexCodePropertyList>
                <integer>1</integer>
                <integer>1</integer>
            </regexCodePropertyList>
        </Trigger>
    </TriggerPackage>
</MudletPackage>"#;

#[test]
fn extract_mudlet_package() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("combat.xml"), TRIGGER_PACKAGE).unwrap();
    std::fs::write(dir.path().join("onLoad.js"), "console.log('loaded')").unwrap();
    std::fs::create_dir(dir.path().join("combat")).unwrap();

    // Existing target without -o is refused.
    let out = mudlexus_in(dir.path(), &["-xcombat.xml", "combat"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("already exists"), "{}", stderr(&out));

    let out = mudlexus_in(dir.path(), &["-xcombat.xml", "-o", "combat"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let target = dir.path().join("combat");
    assert!(target.join("targets.json").is_file());
    assert!(target.join("targets.1.json").is_file());
    assert!(target.join("onLoad.json").is_file());
    assert_eq!(
        std::fs::read_to_string(target.join("onLoad.js")).unwrap(),
        "console.log('loaded')"
    );
    let js = std::fs::read_to_string(target.join("targets.1.js")).unwrap();
    assert!(js.contains("lua.execute(`send(\"kill \" .. js.global.args[2])`)"), "{js}");
}

#[test]
fn compile_tree_into_nxs() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("combat");
    std::fs::create_dir(&tree).unwrap();
    std::fs::write(tree.join("rest_alias.json"), r#"{"type": "alias", "name": "rest", "code": ""}"#)
        .unwrap();
    std::fs::write(tree.join("rest_alias.js"), "(function() {\nsend('rest')\n})()\n").unwrap();

    let out = mudlexus_in(dir.path(), &["-kcombat", "warrior"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out).trim(), Path::new(".").join("warrior.nxs").display().to_string());

    let text = std::fs::read_to_string(dir.path().join("warrior.nxs")).unwrap();
    let package: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(package["name"], "warrior");
    assert_eq!(package["items"][0]["code"], "send('rest')");
    assert_eq!(package["items"][0]["id"], 2);
}
