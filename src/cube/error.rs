// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with slicing and assembling cubes.

use std::path::PathBuf;

use thiserror::Error;

use crate::{header::HeaderError, io::fits::FitsError};

#[derive(Error, Debug)]
pub enum CubeError {
    #[error("{file} has {naxis} axes, but a cube needs at least 3")]
    NotACube { file: PathBuf, naxis: usize },

    #[error("{file} has shape {shape:?}; expected a 2D image")]
    NotAPlane { file: PathBuf, shape: Vec<usize> },

    #[error("Channel image {file} has shape {found:?}, but the first channel image has shape {expected:?}")]
    PlaneShape {
        file: PathBuf,
        found: Vec<usize>,
        expected: Vec<usize>,
    },

    #[error("There are no channel images to assemble into a cube")]
    NoChannels,

    #[error(transparent)]
    Fits(#[from] FitsError),

    #[error(transparent)]
    Header(#[from] HeaderError),
}
