use assert_cmd::Command;
use assert_cmd::cargo;
use clap_extra::color::COLOR_ENV_VARS;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

/// Demo binary isolated from the user's configuration and color settings.
fn demo(config_home: &std::path::Path) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("clap-extra-demo"));
    cmd.env("XDG_CONFIG_HOME", config_home).env_remove("RUST_LOG");
    for (var, _) in COLOR_ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_preset_options() {
    let dir = tempdir().unwrap();
    demo(dir.path())
        .args(["--no-color", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: clap-extra-demo"))
        .stdout(predicate::str::contains("--time"))
        .stdout(predicate::str::contains("--no-color"))
        .stdout(predicate::str::contains("--config <CONFIG_PATH>"))
        .stdout(predicate::str::contains("--show-params"))
        .stdout(predicate::str::contains("--verbosity <LEVEL>"))
        .stdout(predicate::str::contains("\u{1b}[").not());
}

#[test]
fn test_help_colors() {
    let dir = tempdir().unwrap();
    demo(dir.path())
        .args(["--color", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\u{1b}["));

    demo(dir.path())
        .env("NO_COLOR", "1")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("\u{1b}[").not());
}

#[test]
fn test_version() {
    let dir = tempdir().unwrap();
    demo(dir.path())
        .args(["--no-color", "--version"])
        .assert()
        .success()
        .stdout(format!("clap-extra-demo {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_greet() {
    let dir = tempdir().unwrap();
    demo(dir.path())
        .args(["--no-color", "greet", "--name", "Alice"])
        .assert()
        .success()
        .stdout("Hello, Alice!\n");

    demo(dir.path())
        .args(["--no-color", "greet", "--shout"])
        .assert()
        .success()
        .stdout("HELLO, WORLD!\n");
}

#[test]
fn test_missing_subcommand_shows_usage() {
    let dir = tempdir().unwrap();
    demo(dir.path())
        .arg("--no-color")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage: clap-extra-demo"));
}

#[test]
fn test_unknown_option() {
    let dir = tempdir().unwrap();
    demo(dir.path())
        .args(["--no-color", "--bogus"])
        .assert()
        .code(2)
        .stderr(predicate::str::starts_with("error: unexpected argument '--bogus'"));
}

#[test]
fn test_toml_config_sets_defaults() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("demo.toml");
    fs::write(
        &config,
        "[clap-extra-demo]\nverbosity = \"DEBUG\"\n\n[clap-extra-demo.greet]\nname = \"Config\"\n",
    )
    .unwrap();

    demo(dir.path())
        .args(["--no-color", "--config"])
        .arg(&config)
        .arg("greet")
        .assert()
        .success()
        .stdout("Hello, Config!\n")
        .stderr(predicate::str::contains("debug: Greeting Config"));

    // The command line wins over the configuration.
    demo(dir.path())
        .args(["--no-color", "-C"])
        .arg(&config)
        .args(["greet", "--name", "Cli"])
        .assert()
        .success()
        .stdout("Hello, Cli!\n");
}

#[test]
fn test_yaml_and_json_configs() {
    let dir = tempdir().unwrap();
    let yaml = dir.path().join("demo.yaml");
    fs::write(&yaml, "clap-extra-demo:\n  greet:\n    name: Yaml\n    shout: true\n").unwrap();
    demo(dir.path())
        .args(["--no-color", "--config"])
        .arg(&yaml)
        .arg("greet")
        .assert()
        .success()
        .stdout("HELLO, YAML!\n");

    let json = dir.path().join("demo.json");
    fs::write(&json, r#"{"clap-extra-demo": {"greet": {"name": "Json"}}}"#).unwrap();
    demo(dir.path())
        .args(["--no-color", "--config"])
        .arg(&json)
        .arg("greet")
        .assert()
        .success()
        .stdout("Hello, Json!\n");
}

#[test]
fn test_config_in_default_location() {
    let dir = tempdir().unwrap();
    let app_dir = dir.path().join("clap-extra-demo");
    fs::create_dir_all(&app_dir).unwrap();
    fs::write(
        app_dir.join("config.ini"),
        "[clap-extra-demo.greet]\nname = Ini\n",
    )
    .unwrap();

    // XDG_CONFIG_HOME only drives the config directory on Linux.
    if cfg!(target_os = "linux") {
        demo(dir.path())
            .args(["--no-color", "greet"])
            .assert()
            .success()
            .stdout("Hello, Ini!\n");
    }

    demo(dir.path())
        .args(["--no-color", "--no-config", "greet"])
        .assert()
        .success()
        .stdout("Hello, World!\n");
}

#[test]
fn test_missing_config_file() {
    let dir = tempdir().unwrap();
    demo(dir.path())
        .args(["--no-color", "--config", "does-not-exist.toml", "greet"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("does-not-exist.toml"));
}

#[test]
fn test_show_params() {
    let dir = tempdir().unwrap();
    demo(dir.path())
        .args(["--no-color", "--show-params"])
        .assert()
        .success()
        .stdout(predicate::str::contains("clap-extra-demo.greet.name"))
        .stdout(predicate::str::contains("clap-extra-demo.verbosity"));
}

#[test]
fn test_time() {
    let dir = tempdir().unwrap();
    demo(dir.path())
        .args(["--no-color", "--time", "greet"])
        .assert()
        .success()
        .stdout(
            predicate::str::is_match(r"^Hello, World!\nExecution time: \d+\.\d{3} seconds\.\n$")
                .unwrap(),
        );
}

#[test]
fn test_render_stdin() {
    let dir = tempdir().unwrap();
    demo(dir.path())
        .arg("render")
        .write_stdin("$ ls\n\u{1b}[1;31mred\u{1b}[0m\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("<span class=\"gp\">$ </span>ls\n"))
        .stdout(predicate::str::contains(
            "<span class=\"-C-Red -C-Bold\">red</span>",
        ));
}

#[test]
fn test_render_missing_file() {
    let dir = tempdir().unwrap();
    demo(dir.path())
        .args(["--no-color", "render", "no-such-session.log"])
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("Error: Failed to read no-such-session.log"));
}

#[test]
fn test_render_unknown_lexer() {
    let dir = tempdir().unwrap();
    let session = dir.path().join("session.log");
    fs::write(&session, "$ ls\n").unwrap();
    demo(dir.path())
        .args(["--no-color", "render", "--lexer", "python"])
        .arg(&session)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No plugin named python"));
}

#[test]
fn test_css() {
    let dir = tempdir().unwrap();
    demo(dir.path())
        .args(["css", "--prefix", "term"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".term .-C-Red { color: #cd0000 }"));
}
