// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to cut spectral cubes into 2D channel images that SWarp can handle,
//! and to stack SWarp's per-channel mosaics back into a cube.

mod assemble;
mod error;
mod slice;
#[cfg(test)]
mod tests;

pub use assemble::assemble_cube;
pub use error::CubeError;
pub use slice::{channel_name, max_channels, slice_cube};
