// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Mosaic FITS images and spectral cubes with SWarp.

Cubes are cut into single-channel images, each channel is mosaicked by SWarp,
and the channel mosaics are stacked back into a cube. SWarp's blank pixels are
converted back to NaN and the header keys of the first input are restored.
 */

mod cli;
pub mod constants;
pub mod cube;
pub mod header;
pub mod io;
pub mod params;
pub mod postprocess;
pub mod swarp;

use crossbeam_utils::atomic::AtomicCell;

// Re-exports.
pub use cli::{SwarpWrapper, SwarpWrapperError};
pub use header::{Card, FitsHeader, HeaderValue};
pub use io::fits::FitsImage;
pub use params::{MosaicError, MosaicInputs, MosaicParams, SettingsError};

/// Are progress bars being drawn? This should only ever be enabled by CLI
/// code.
static PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);
