// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fixing up SWarp's final output: blank pixels back to NaN, original header
//! keys back in place and old-style rotations converted.

use std::path::Path;

use log::{debug, info};
use ndarray::{ArrayViewMutD, Zip};
use thiserror::Error;

use crate::{
    constants::SWARP_BLANK_THRESHOLD,
    header::{crota_to_pc, restore_header_keys, FitsHeader, HeaderError},
    io::fits::{FitsError, FitsImage},
};

#[derive(Error, Debug)]
pub enum PostProcessError {
    #[error(transparent)]
    Fits(#[from] FitsError),

    #[error(transparent)]
    Header(#[from] HeaderError),
}

/// What to do to the final mosaic.
#[derive(Debug, Clone, Default)]
pub struct PostProcessOptions {
    /// Convert SWarp's blank pixels to NaN.
    pub restore_nans: bool,
    /// Convert zeros to NaN.
    pub convert_zeros_to_nans: bool,
    /// Restore the keys of the reference header.
    pub restore_keys: bool,
    /// Keys that are removed rather than restored.
    pub keys_to_remove: Vec<String>,
}

/// Set all pixels below [`SWARP_BLANK_THRESHOLD`] to NaN. Returns the number
/// of pixels changed.
pub fn blank_sentinels(data: ArrayViewMutD<f32>) -> usize {
    let mut count = 0;
    Zip::from(data).for_each(|v| {
        if *v < SWARP_BLANK_THRESHOLD {
            *v = f32::NAN;
            count += 1;
        }
    });
    count
}

/// Set all pixels that are exactly zero to NaN. Returns the number of pixels
/// changed.
pub fn zeros_to_nans(data: ArrayViewMutD<f32>) -> usize {
    let mut count = 0;
    Zip::from(data).for_each(|v| {
        if *v == 0.0 {
            *v = f32::NAN;
            count += 1;
        }
    });
    count
}

/// Apply `options` to the image in `file`, then rewrite it in place. The
/// header's `CROTA` keys are always converted to a `PC` matrix.
pub fn restore_values(
    file: &Path,
    reference: &FitsHeader,
    options: &PostProcessOptions,
) -> Result<(), PostProcessError> {
    let FitsImage {
        mut header,
        mut data,
    } = FitsImage::read(file)?;

    if options.restore_nans {
        let n = blank_sentinels(data.view_mut());
        debug!("Restored {n} blank pixels to NaN");
    }
    if options.convert_zeros_to_nans {
        let n = zeros_to_nans(data.view_mut());
        debug!("Converted {n} zero-valued pixels to NaN");
    }
    if options.restore_keys {
        header = restore_header_keys(&header, reference, &options.keys_to_remove);
    }
    crota_to_pc(&mut header)?;

    FitsImage { header, data }.write(file, true)?;
    info!("Wrote {}", file.display());
    Ok(())
}
