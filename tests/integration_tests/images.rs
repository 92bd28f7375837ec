// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mosaicking images.

use ndarray::prelude::*;
use tempfile::TempDir;

use swarp_wrapper::FitsImage;

use crate::{
    get_cmd_output, path_string, swarp_wrapper, write_config, write_image, write_script,
    FAKE_SWARP,
};

#[test]
fn test_images_blanks_become_nan() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let swarp = write_script(tmp_dir.path(), FAKE_SWARP);
    let config = write_config(tmp_dir.path());
    let a = write_image(
        tmp_dir.path(),
        "a.fits",
        array![[1.0, -1e30, 0.0], [4.0, 5.0, 6.0]].view(),
    );
    let b = write_image(tmp_dir.path(), "b.fits", Array2::zeros((2, 3)).view());
    let work_dir = tmp_dir.path().join("work");

    #[rustfmt::skip]
    let cmd = swarp_wrapper()
        .args([
            "images",
            "-i", &a, &b,
            "-c", &config,
            "-d", &path_string(&work_dir),
            "--swarp-binary", &swarp,
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "images failed: {}", cmd.err().unwrap());
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
    assert!(stdout.contains("swarp_wrapper images complete."), "{stdout}");

    let mosaic = FitsImage::read(work_dir.join("swarp_final.fits")).unwrap();
    assert_eq!(mosaic.data.shape(), &[2, 3]);
    assert_eq!(mosaic.data[[0, 0]], 1.0);
    assert!(mosaic.data[[0, 1]].is_nan());
    // Zeros are only converted when asked.
    assert_eq!(mosaic.data[[0, 2]], 0.0);
    assert_eq!(
        mosaic.header.get("OBJECT").and_then(|v| v.as_str()),
        Some("field")
    );
}

#[test]
fn test_images_zeros_and_removed_keys() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let swarp = write_script(tmp_dir.path(), FAKE_SWARP);
    let config = write_config(tmp_dir.path());
    let a = write_image(
        tmp_dir.path(),
        "a.fits",
        array![[1.0, 0.0, 3.0], [4.0, 5.0, 6.0]].view(),
    );
    let work_dir = tmp_dir.path().join("work");

    #[rustfmt::skip]
    let cmd = swarp_wrapper()
        .args([
            "images",
            "-i", &a,
            "-c", &config,
            "-d", &path_string(&work_dir),
            "-o", "final",
            "--swarp-binary", &swarp,
            "--convert-zeros-to-nans",
            "--remove-keys", "OBJECT",
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "images failed: {}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    // The user is warned about losing zeros.
    assert!(stdout.contains("genuine zeros"), "{stdout}");

    let mosaic = FitsImage::read(work_dir.join("final.fits")).unwrap();
    assert!(mosaic.data[[0, 1]].is_nan());
    assert!(!mosaic.header.contains("OBJECT"));
    assert_eq!(
        mosaic.header.get("BUNIT").and_then(|v| v.as_str()),
        Some("JY/BEAM")
    );
}
