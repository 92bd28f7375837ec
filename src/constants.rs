// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

SWarp writes "no data" pixels as a huge negative number; anything below
[`SWARP_BLANK_THRESHOLD`] is treated as such a pixel.
 */

/// Pixels with values less than this are considered blank in SWarp outputs
/// and are converted to NaN.
pub const SWARP_BLANK_THRESHOLD: f32 = -1e5;

/// The name of the SWarp executable if the user doesn't specify one.
pub const DEFAULT_SWARP_BINARY: &str = "swarp";

/// The stem of the final mosaic if the user doesn't specify one.
pub const DEFAULT_OUTPUT_STEM: &str = "swarp_final";

/// The name SWarp gives its XML log.
pub const SWARP_XML_NAME: &str = "swarp.xml";

/// The name SWarp gives its co-added weight map.
pub const SWARP_WEIGHT_NAME: &str = "coadd.weight.fits";

/// Per-cube, per-channel 2D slices go into this subdirectory of the working
/// directory.
pub const CHANNELS_DIR_NAME: &str = "channels";

/// Per-channel mosaicked slices go into this subdirectory of the working
/// directory.
pub const SLICES_DIR_NAME: &str = "slices";

/// The number of digits used when zero-padding channel indices in filenames.
pub const CHANNEL_INDEX_WIDTH: usize = 4;
