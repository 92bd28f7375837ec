// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::Path;

use log::{debug, trace};
use ndarray::prelude::*;

use super::CubeError;
use crate::{
    constants::CHANNEL_INDEX_WIDTH,
    header::{change_header, remove_additional_axes, FitsHeader, HeaderFormat},
    io::fits::{write_fits_image, FitsImage},
};

/// The suffix shared by every file belonging to a channel, e.g.
/// `channel_0007`.
pub fn channel_name(channel: usize) -> String {
    format!("channel_{channel:0width$}", width = CHANNEL_INDEX_WIDTH)
}

fn cube_channels(header: &FitsHeader, file: &Path) -> Result<usize, CubeError> {
    let naxis = header.naxis()?;
    if naxis < 3 {
        return Err(CubeError::NotACube {
            file: file.to_path_buf(),
            naxis,
        });
    }
    Ok(header.axis_len(3)?)
}

/// The number of channels that every cube will be padded to; this is the
/// largest `NAXIS3` of all the cubes. Only headers are read.
pub fn max_channels<P: AsRef<Path>>(cubes: &[P]) -> Result<usize, CubeError> {
    let mut max = 0;
    for cube in cubes {
        let cube = cube.as_ref();
        let header = FitsImage::read_header(cube)?;
        let n = cube_channels(&header, cube)?;
        debug!("{} has {n} channels", cube.display());
        max = max.max(n);
    }
    Ok(max)
}

/// Write each channel of `cube` as a 2D image into `channels_dir`. Files are
/// named `<cube stem>_channel_<NNNN>.fits`. Exactly `max_channels` images are
/// written; channels beyond the end of the cube are filled with NaN.
///
/// Extra leading axes of length 1 (e.g. Stokes) are dropped first. The
/// cube's header, after dropping those axes, is returned.
pub fn slice_cube(
    cube: &Path,
    channels_dir: &Path,
    max_channels: usize,
    overwrite: bool,
) -> Result<FitsHeader, CubeError> {
    let FitsImage { header, data } = FitsImage::read(cube)?;
    let naxis = header.naxis()?;
    if naxis < 3 || data.ndim() < 3 {
        return Err(CubeError::NotACube {
            file: cube.to_path_buf(),
            naxis,
        });
    }
    let (data, header) = remove_additional_axes(data, header, 3)?;
    let data = data
        .into_dimensionality::<Ix3>()
        .map_err(|_| CubeError::NotACube {
            file: cube.to_path_buf(),
            naxis,
        })?;

    let (num_channels, num_rows, num_cols) = data.dim();
    let slice_header = change_header(&header, HeaderFormat::PositionPosition, &[], &[])?;
    let blank = Array2::from_elem((num_rows, num_cols), f32::NAN);
    let stem = cube
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    for channel in 0..max_channels {
        let plane = if channel < num_channels {
            data.index_axis(Axis(0), channel)
        } else {
            blank.view()
        };
        let file = channels_dir.join(format!("{stem}_{}.fits", channel_name(channel)));
        trace!("Writing {}", file.display());
        write_fits_image(&file, &slice_header, plane, overwrite)?;
    }

    Ok(header)
}
