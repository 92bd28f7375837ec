// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Argument handling that doesn't need SWarp.

use indoc::formatdoc;
use ndarray::prelude::*;
use tempfile::TempDir;

use crate::{get_cmd_output, path_string, swarp_wrapper, write_config, write_image};

#[test]
fn test_help() {
    let cmd = swarp_wrapper().arg("--help").ok();
    assert!(cmd.is_ok());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("cubes"), "{stdout}");
    assert!(stdout.contains("images"), "{stdout}");
}

#[test]
fn test_missing_config() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let a = write_image(tmp_dir.path(), "a.fits", Array2::ones((2, 3)).view());
    let missing = tmp_dir.path().join("missing.swarp");

    #[rustfmt::skip]
    let cmd = swarp_wrapper()
        .args([
            "images",
            "-i", &a,
            "-c", &path_string(&missing),
            "-d", &path_string(&tmp_dir.path().join("work")),
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("missing.swarp"), "{stderr}");
    assert!(stderr.contains("doesn't exist"), "{stderr}");
}

#[test]
fn test_dry_run_and_save_toml() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let a = write_image(tmp_dir.path(), "a.fits", Array2::ones((2, 3)).view());
    let config = write_config(tmp_dir.path());
    let work_dir = tmp_dir.path().join("work");
    let toml = tmp_dir.path().join("args.toml");

    #[rustfmt::skip]
    let cmd = swarp_wrapper()
        .args([
            "images",
            "-i", &a,
            "-c", &config,
            "-d", &path_string(&work_dir),
            "--swarp-binary", "swarp_wrapper_missing_swarp",
            "--dry-run",
            "--save-toml", &path_string(&toml),
        ])
        .ok();
    assert!(cmd.is_ok(), "dry run failed: {}", cmd.err().unwrap());
    assert!(!work_dir.join("swarp_final.fits").exists());

    let saved = std::fs::read_to_string(&toml).unwrap();
    assert!(saved.contains("swarp_wrapper_missing_swarp"), "{saved}");

    // The saved arguments can be used for another run.
    let cmd = swarp_wrapper()
        .args(["images", &path_string(&toml), "--dry-run"])
        .ok();
    assert!(cmd.is_ok(), "dry run failed: {}", cmd.err().unwrap());
}

#[test]
fn test_arg_file() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let a = write_image(tmp_dir.path(), "a.fits", Array2::ones((2, 3)).view());
    let config = write_config(tmp_dir.path());
    let work_dir = path_string(&tmp_dir.path().join("work"));
    let arg_file = tmp_dir.path().join("args.json");
    std::fs::write(
        &arg_file,
        formatdoc! {r#"
            {{
                "inputs": ["{a}"],
                "config": "{config}",
                "work_dir": "{work_dir}",
                "swarp_verbosity": "chatty"
            }}
        "#},
    )
    .unwrap();

    let cmd = swarp_wrapper()
        .args(["images", &path_string(&arg_file), "--dry-run"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("chatty"), "{stderr}");

    // CLI arguments override the file.
    let cmd = swarp_wrapper()
        .args([
            "images",
            &path_string(&arg_file),
            "--swarp-verbosity",
            "log",
            "--dry-run",
        ])
        .ok();
    assert!(cmd.is_ok(), "dry run failed: {}", cmd.err().unwrap());
}
