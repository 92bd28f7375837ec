// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mosaicking cubes.

use tempfile::TempDir;

use swarp_wrapper::FitsImage;

use crate::{
    get_cmd_output, path_string, swarp_wrapper, write_config, write_cube, write_script,
    BROKEN_SWARP, FAKE_SWARP,
};

#[test]
fn test_cubes_of_different_lengths() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let swarp = write_script(tmp_dir.path(), FAKE_SWARP);
    let config = write_config(tmp_dir.path());
    let a = write_cube(tmp_dir.path(), "a.fits", 2);
    let b = write_cube(tmp_dir.path(), "b.fits", 3);
    let c = write_cube(tmp_dir.path(), "c.fits", 1);
    let work_dir = tmp_dir.path().join("work");

    #[rustfmt::skip]
    let cmd = swarp_wrapper()
        .args([
            "cubes",
            "--inputs", &a, &b, &c,
            "--config", &config,
            "--work-dir", &path_string(&work_dir),
            "--swarp-binary", &swarp,
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "cubes failed: {}", cmd.err().unwrap());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");

    let mosaic = FitsImage::read(work_dir.join("swarp_final.fits")).unwrap();
    assert_eq!(mosaic.data.shape(), &[3, 2, 3]);
    // The fake SWarp hands back cube "a", which only has 2 channels; its
    // third channel is padding.
    assert!(mosaic.data.iter().take(6).all(|&v| v == 1.0));
    assert!(mosaic.data.iter().skip(6).take(6).all(|&v| v == 2.0));
    assert!(mosaic.data.iter().skip(12).all(|v| v.is_nan()));

    let h = &mosaic.header;
    assert_eq!(h.get_i64("NAXIS").unwrap(), Some(3));
    assert_eq!(h.get_i64("NAXIS3").unwrap(), Some(3));
    assert_eq!(h.get("CTYPE3").and_then(|v| v.as_str()), Some("FREQ"));
    assert_eq!(h.get_f64("CRVAL3").unwrap(), Some(1.4e9));
    assert_eq!(h.get("BUNIT").and_then(|v| v.as_str()), Some("JY/BEAM"));

    assert!(work_dir.join("swarp_final.coadd.weight.fits").exists());
    assert!(work_dir.join("swarp_final.xml").exists());
    assert!(!work_dir.join("channels").exists());
    assert!(!work_dir.join("slices").exists());
}

#[test]
fn test_failing_swarp_keeps_work() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let swarp = write_script(tmp_dir.path(), BROKEN_SWARP);
    let config = write_config(tmp_dir.path());
    let a = write_cube(tmp_dir.path(), "a.fits", 2);
    let work_dir = tmp_dir.path().join("work");

    #[rustfmt::skip]
    let cmd = swarp_wrapper()
        .args([
            "cubes",
            "-i", &a,
            "-c", &config,
            "-d", &path_string(&work_dir),
            "--swarp-binary", &swarp,
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.starts_with("Error:"), "{stderr}");
    assert!(stderr.contains("couldn't read the configuration"), "{stderr}");

    assert!(!work_dir.join("swarp_final.fits").exists());
    // The channel images are left for inspection.
    assert!(work_dir.join("channels").join("a_channel_0000.fits").exists());
}

#[test]
fn test_keep_temporary_files() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let swarp = write_script(tmp_dir.path(), FAKE_SWARP);
    let config = write_config(tmp_dir.path());
    let a = write_cube(tmp_dir.path(), "a.fits", 2);
    let work_dir = tmp_dir.path().join("work");

    #[rustfmt::skip]
    let cmd = swarp_wrapper()
        .args([
            "cubes",
            "-i", &a,
            "-c", &config,
            "-d", &path_string(&work_dir),
            "-o", "cube.fits",
            "--swarp-binary", &swarp,
            "--keep-temporary-files",
            "--discard-coadd-weight",
            "--discard-swarp-log",
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "cubes failed: {}", cmd.err().unwrap());

    assert!(work_dir.join("cube.fits").exists());
    assert!(!work_dir.join("cube.coadd.weight.fits").exists());
    assert!(!work_dir.join("cube.xml").exists());
    for c in 0..2 {
        assert!(work_dir
            .join("channels")
            .join(format!("a_channel_000{c}.fits"))
            .exists());
        assert!(work_dir
            .join("slices")
            .join(format!("channel_000{c}.fits"))
            .exists());
    }
}
