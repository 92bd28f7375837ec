// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! SWarp itself isn't available in CI; a small shell script stands in for it.
//! The script copies its first input to its output, so a "mosaic" is the
//! first (alphabetically sorted) input.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod arguments;
#[cfg(unix)]
mod cubes;
#[cfg(unix)]
mod images;

use std::{
    path::Path,
    process::Output,
    str::from_utf8,
};

use assert_cmd::{output::OutputError, Command};
use ndarray::prelude::*;

use swarp_wrapper::{io::fits::write_fits_image, FitsHeader};

fn swarp_wrapper() -> Command {
    Command::cargo_bin("swarp_wrapper").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

/// A stand-in for SWarp that copies its first input to its output and writes
/// the side outputs.
const FAKE_SWARP: &str = r#"
first=""
while [ $# -gt 0 ]; do
    case "$1" in
        -IMAGEOUT_NAME) out="$2"; shift 2 ;;
        -WEIGHTOUT_NAME) weight="$2"; shift 2 ;;
        -XML_NAME) xml="$2"; shift 2 ;;
        -c|-VERBOSE_TYPE) shift 2 ;;
        *) if [ -z "$first" ]; then first="$1"; fi; shift ;;
    esac
done
cp "$first" "$out"
cp "$first" "$weight"
echo "<xml/>" > "$xml"
"#;

/// A stand-in for SWarp that always fails.
const BROKEN_SWARP: &str = r#"
echo "couldn't read the configuration" >&2
exit 2
"#;

#[cfg(unix)]
fn write_script(dir: &Path, body: &str) -> String {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("swarp");
    std::fs::write(&script, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script.display().to_string()
}

fn write_config(dir: &Path) -> String {
    let config = dir.join("default.swarp");
    std::fs::write(&config, "# SWarp configuration\n").unwrap();
    config.display().to_string()
}

fn sky_header(naxis: usize) -> FitsHeader {
    let mut header = FitsHeader::new();
    header.set("NAXIS", naxis);
    header.set("NAXIS1", 3);
    header.set("NAXIS2", 2);
    header.set("CTYPE1", "RA---SIN");
    header.set("CRPIX1", 2.0);
    header.set("CRVAL1", 150.0);
    header.set("CDELT1", -0.01);
    header.set("CTYPE2", "DEC--SIN");
    header.set("CRPIX2", 1.0);
    header.set("CRVAL2", -30.0);
    header.set("CDELT2", 0.01);
    header.set("BUNIT", "JY/BEAM");
    header.set("OBJECT", "field");
    header
}

/// Write a cube whose channels are filled with their (1-based) channel number.
fn write_cube(dir: &Path, name: &str, num_channels: usize) -> String {
    let file = dir.join(name);
    let mut header = sky_header(3);
    header.set("NAXIS3", num_channels);
    header.set("CTYPE3", "FREQ");
    header.set("CRPIX3", 1.0);
    header.set("CRVAL3", 1.4e9);
    header.set("CDELT3", 1e6);
    header.set("CUNIT3", "Hz");
    let data = Array3::from_shape_fn((num_channels, 2, 3), |(c, _, _)| c as f32 + 1.0);
    write_fits_image(&file, &header, data.view(), false).unwrap();
    file.display().to_string()
}

fn write_image(dir: &Path, name: &str, data: ArrayView2<f32>) -> String {
    let file = dir.join(name);
    write_fits_image(&file, &sky_header(2), data, false).unwrap();
    file.display().to_string()
}

fn path_string(p: &Path) -> String {
    p.display().to_string()
}
