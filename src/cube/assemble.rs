// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::Path;

use indicatif::ProgressBar;
use log::debug;
use ndarray::prelude::*;

use super::CubeError;
use crate::{
    header::{add_spectral_axis_keys, cd_to_cdelt, restore_header_keys, FitsHeader},
    io::fits::{write_fits_image, FitsImage},
};

fn read_plane(file: &Path) -> Result<(Array2<f32>, FitsHeader), CubeError> {
    let FitsImage { header, data } = FitsImage::read(file)?;
    let shape = data.shape().to_vec();
    let data = data
        .into_dimensionality::<Ix2>()
        .map_err(|_| CubeError::NotAPlane {
            file: file.to_path_buf(),
            shape,
        })?;
    Ok((data, header))
}

/// Stack the mosaicked channel images `channel_files` (in channel order) into
/// a cube, and write it to `output`.
///
/// The cube's header is that of the first channel image, with its `CD` matrix
/// converted to `CDELT` keys, a third axis added and the spectral-axis keys of
/// `reference` (the header of the first input cube) copied in. If
/// `restore_keys` is set, the other keys of `reference` are restored too (see
/// [`restore_header_keys`]).
pub fn assemble_cube<P: AsRef<Path>>(
    channel_files: &[P],
    reference: &FitsHeader,
    restore_keys: bool,
    remove_keys: &[String],
    output: &Path,
    overwrite: bool,
    progress: &ProgressBar,
) -> Result<(), CubeError> {
    let (first, rest) = channel_files.split_first().ok_or(CubeError::NoChannels)?;
    let (first_plane, mut header) = read_plane(first.as_ref())?;
    let (num_rows, num_cols) = first_plane.dim();
    debug!(
        "Assembling a cube of {} channels, {num_rows} rows and {num_cols} columns",
        channel_files.len()
    );

    let mut cube = Array3::<f32>::zeros((channel_files.len(), num_rows, num_cols));
    cube.index_axis_mut(Axis(0), 0).assign(&first_plane);
    progress.inc(1);
    for (i_chan, file) in rest.iter().enumerate() {
        let file = file.as_ref();
        let (plane, _) = read_plane(file)?;
        if plane.dim() != (num_rows, num_cols) {
            return Err(CubeError::PlaneShape {
                file: file.to_path_buf(),
                found: plane.shape().to_vec(),
                expected: vec![num_rows, num_cols],
            });
        }
        cube.index_axis_mut(Axis(0), i_chan + 1).assign(&plane);
        progress.inc(1);
    }

    cd_to_cdelt(&mut header)?;
    header.set("NAXIS", 3);
    header.set("NAXIS3", channel_files.len());
    if header.contains("WCSAXES") {
        header.set("WCSAXES", 3);
    }
    add_spectral_axis_keys(&mut header, reference);
    if restore_keys {
        header = restore_header_keys(&header, reference, remove_keys);
    }

    write_fits_image(output, &header, cube.view(), overwrite)?;
    Ok(())
}
