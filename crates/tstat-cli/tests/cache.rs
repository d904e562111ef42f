use std::fs;

use predicates::prelude::*;


use sandbox::{Sandbox, toml_path};

#[test]
fn test_cache_dir_uses_override() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["cache", "dir"])
        .assert()
        .success()
        .stdout(format!("{}\n", sandbox.cache.path().display()));
}

#[test]
fn test_cache_list_shows_states() {
    let sandbox = Sandbox::new();
    let uptime = sandbox.write_fixture("uptime", "90000.00 1.00\n");
    let meminfo = sandbox.write_fixture("meminfo", "MemTotal: 1024 kB\nMemAvailable: 512 kB\n");
    sandbox.write_config(&format!(
        "[[metrics]]\nkind = \"uptime\"\npath = {}\n\n[[metrics]]\nkind = \"mem\"\npath = {}\n",
        toml_path(&uptime),
        toml_path(&meminfo)
    ));

    sandbox.cmd().args(["refresh", "uptime"]).assert().success();
    fs::write(sandbox.lock_file("mem"), "").unwrap();

    sandbox
        .cmd()
        .args(["cache", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NAME"))
        .stdout(predicate::str::is_match(r"uptime\s+fresh\s+.*1d1h").unwrap())
        .stdout(predicate::str::is_match(r"mem\s+missing\s+.*held").unwrap());
}
