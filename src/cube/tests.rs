// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use approx::assert_abs_diff_eq;
use indicatif::ProgressBar;
use ndarray::prelude::*;
use tempfile::TempDir;

use super::*;
use crate::{
    header::FitsHeader,
    io::fits::{write_fits_image, FitsImage},
};

fn cube_header(shape: &[usize]) -> FitsHeader {
    let mut header = FitsHeader::new();
    header.set("SIMPLE", true);
    header.set("BITPIX", -32);
    header.set("NAXIS", shape.len());
    for (i, len) in shape.iter().rev().enumerate() {
        header.set(&format!("NAXIS{}", i + 1), *len);
    }
    header.set("CTYPE1", "RA---SIN");
    header.set("CRPIX1", 1.0);
    header.set("CRVAL1", 10.0);
    header.set("CDELT1", -0.01);
    header.set("CTYPE2", "DEC--SIN");
    header.set("CRPIX2", 1.0);
    header.set("CRVAL2", -30.0);
    header.set("CDELT2", 0.01);
    header.set("CTYPE3", "FREQ");
    header.set("CRPIX3", 1.0);
    header.set("CRVAL3", 1.4e9);
    header.set("CDELT3", 1e6);
    header.set("CUNIT3", "Hz");
    header.set("BUNIT", "JY/BEAM");
    header
}

/// Write a cube whose values are `offset + channel`.
fn write_cube(dir: &Path, name: &str, num_channels: usize, offset: f32) -> PathBuf {
    let file = dir.join(name);
    let data = Array3::from_shape_fn((num_channels, 2, 2), |(c, _, _)| offset + c as f32);
    write_fits_image(&file, &cube_header(&[num_channels, 2, 2]), data.view(), false).unwrap();
    file
}

#[test]
fn test_channel_name() {
    assert_eq!(channel_name(0), "channel_0000");
    assert_eq!(channel_name(42), "channel_0042");
    assert_eq!(channel_name(12345), "channel_12345");
}

#[test]
fn test_max_channels() {
    let tmp_dir = TempDir::new().unwrap();
    let cubes = [
        write_cube(tmp_dir.path(), "a.fits", 2, 0.0),
        write_cube(tmp_dir.path(), "b.fits", 3, 0.0),
        write_cube(tmp_dir.path(), "c.fits", 1, 0.0),
    ];
    assert_eq!(max_channels(&cubes).unwrap(), 3);
}

#[test]
fn test_max_channels_rejects_images() {
    let tmp_dir = TempDir::new().unwrap();
    let file = tmp_dir.path().join("image.fits");
    write_fits_image(
        &file,
        &cube_header(&[2, 2]),
        Array2::<f32>::zeros((2, 2)).view(),
        false,
    )
    .unwrap();
    let result = max_channels(&[file]);
    assert!(matches!(result, Err(CubeError::NotACube { naxis: 2, .. })));
}

#[test]
fn test_slice_cube_pads_with_nans() {
    let tmp_dir = TempDir::new().unwrap();
    let cube = write_cube(tmp_dir.path(), "short.fits", 2, 5.0);
    let channels_dir = tmp_dir.path().join("channels");
    std::fs::create_dir(&channels_dir).unwrap();

    let reference = slice_cube(&cube, &channels_dir, 3, false).unwrap();
    assert_eq!(reference.axis_len(3).unwrap(), 2);

    let mut written: Vec<_> = std::fs::read_dir(&channels_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    written.sort();
    assert_eq!(
        written,
        vec![
            "short_channel_0000.fits",
            "short_channel_0001.fits",
            "short_channel_0002.fits"
        ]
    );

    let chan1 = FitsImage::read(channels_dir.join("short_channel_0001.fits")).unwrap();
    assert_eq!(chan1.data.shape(), &[2, 2]);
    assert!(chan1.data.iter().all(|&v| v == 6.0));
    assert_eq!(chan1.header.naxis().unwrap(), 2);
    assert!(!chan1.header.contains("CTYPE3"));
    assert_eq!(
        chan1.header.get("CTYPE1").and_then(|v| v.as_str()),
        Some("RA---SIN")
    );

    let chan2 = FitsImage::read(channels_dir.join("short_channel_0002.fits")).unwrap();
    assert!(chan2.data.iter().all(|v| v.is_nan()));
}

#[test]
fn test_slice_cube_drops_stokes_axis() {
    let tmp_dir = TempDir::new().unwrap();
    let file = tmp_dir.path().join("stokes.fits");
    let mut header = cube_header(&[1, 2, 2, 2]);
    header.set("CTYPE4", "STOKES");
    header.set("CRVAL4", 1.0);
    let data = Array4::<f32>::ones((1, 2, 2, 2));
    write_fits_image(&file, &header, data.view(), false).unwrap();
    let channels_dir = tmp_dir.path().join("channels");
    std::fs::create_dir(&channels_dir).unwrap();

    let reference = slice_cube(&file, &channels_dir, 2, false).unwrap();
    assert_eq!(reference.naxis().unwrap(), 3);
    assert!(!reference.contains("CTYPE4"));
    assert!(!reference.contains("NAXIS4"));
    assert!(channels_dir.join("stokes_channel_0001.fits").exists());
}

#[test]
fn test_assemble_cube() {
    let tmp_dir = TempDir::new().unwrap();
    let mut reference = cube_header(&[3, 2, 2]);
    reference.set("OBJECT", "M31");

    // Pretend these are SWarp outputs; SWarp likes CD matrices.
    let mut files = vec![];
    for channel in 0..3 {
        let mut header = cube_header(&[2, 2]);
        header.remove("CDELT1");
        header.remove("CDELT2");
        header.remove("CTYPE3");
        header.set("CD1_1", -0.02);
        header.set("CD2_2", 0.02);
        header.set("WCSAXES", 2);
        let file = tmp_dir.path().join(format!("{}.fits", channel_name(channel)));
        let data = Array2::from_elem((2, 2), channel as f32);
        write_fits_image(&file, &header, data.view(), false).unwrap();
        files.push(file);
    }

    let output = tmp_dir.path().join("cube.fits");
    assemble_cube(
        &files,
        &reference,
        true,
        &[],
        &output,
        false,
        &ProgressBar::hidden(),
    )
    .unwrap();

    let cube = FitsImage::read(&output).unwrap();
    assert_eq!(cube.data.shape(), &[3, 2, 2]);
    assert_abs_diff_eq!(cube.data[[2, 1, 1]], 2.0);
    let h = &cube.header;
    assert_eq!(h.axis_len(3).unwrap(), 3);
    assert_eq!(h.get_i64("WCSAXES").unwrap(), Some(3));
    assert_abs_diff_eq!(h.required_f64("CDELT1").unwrap(), -0.02);
    assert!(!h.contains("CD1_1"));
    assert_eq!(h.get("CTYPE3").and_then(|v| v.as_str()), Some("FREQ"));
    assert_abs_diff_eq!(h.required_f64("CDELT3").unwrap(), 1e6);
    // Restored from the reference.
    assert_eq!(h.get("OBJECT").and_then(|v| v.as_str()), Some("M31"));
}

#[test]
fn test_assemble_cube_rejects_mismatched_planes() {
    let tmp_dir = TempDir::new().unwrap();
    let a = tmp_dir.path().join("a.fits");
    let b = tmp_dir.path().join("b.fits");
    write_fits_image(&a, &cube_header(&[2, 2]), Array2::<f32>::zeros((2, 2)).view(), false)
        .unwrap();
    write_fits_image(&b, &cube_header(&[3, 2]), Array2::<f32>::zeros((3, 2)).view(), false)
        .unwrap();

    let result = assemble_cube(
        &[a, b],
        &cube_header(&[2, 2, 2]),
        false,
        &[],
        &tmp_dir.path().join("out.fits"),
        false,
        &ProgressBar::hidden(),
    );
    assert!(matches!(result, Err(CubeError::PlaneShape { .. })));
}

#[test]
fn test_assemble_nothing() {
    let tmp_dir = TempDir::new().unwrap();
    let result = assemble_cube::<PathBuf>(
        &[],
        &FitsHeader::new(),
        false,
        &[],
        &tmp_dir.path().join("out.fits"),
        false,
        &ProgressBar::hidden(),
    );
    assert!(matches!(result, Err(CubeError::NoChannels)));
}
