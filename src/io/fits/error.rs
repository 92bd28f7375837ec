// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading and writing fits files.

use std::path::Path;

use thiserror::Error;

use crate::header::HeaderError;

#[derive(Error, Debug)]
pub enum FitsError {
    /// Error when opening a fits file.
    #[error(
        "{source_file}:{source_line}:{source_column}: Couldn't open {fits_filename}: {fits_error}"
    )]
    Open {
        fits_error: Box<fitsio::errors::Error>,
        fits_filename: Box<Path>,
        source_file: &'static str,
        source_line: u32,
        source_column: u32,
    },

    /// Error when creating a fits file.
    #[error(
        "{source_file}:{source_line}:{source_column}: Couldn't create {fits_filename}: {fits_error}"
    )]
    Create {
        fits_error: Box<fitsio::errors::Error>,
        fits_filename: Box<Path>,
        source_file: &'static str,
        source_line: u32,
        source_column: u32,
    },

    /// Error describing a HDU that couldn't be used as an image (e.g. `HduInfo::ImageInfo`).
    #[error("{source_file}:{source_line}:{source_column}: {fits_filename} HDU {hdu_num}: Tried to use as an image, but not an image")]
    NotImage {
        fits_filename: Box<Path>,
        hdu_num: usize,
        source_file: &'static str,
        source_line: u32,
        source_column: u32,
    },

    /// A generic error associated with the fitsio crate.
    #[error(
        "{source_file}:{source_line}:{source_column}: {fits_filename} HDU '{hdu_description}': {fits_error}"
    )]
    Fitsio {
        fits_error: Box<fitsio::errors::Error>,
        fits_filename: Box<Path>,
        hdu_description: Box<str>,
        source_file: &'static str,
        source_line: u32,
        source_column: u32,
    },

    /// A header card that can't be handed to cfitsio.
    #[error("{fits_filename}: Header card {key} contains a NUL byte and can't be written")]
    BadCard {
        key: Box<str>,
        fits_filename: Box<Path>,
    },

    /// The image data doesn't have the shape described by the header.
    #[error("{fits_filename}: The header describes an array of shape {header_shape:?}, but the data has shape {data_shape:?}")]
    Shape {
        header_shape: Vec<usize>,
        data_shape: Vec<usize>,
        fits_filename: Box<Path>,
    },

    #[error("{0} already exists and overwriting is disabled")]
    AlreadyExists(Box<Path>),

    #[error("{fits_filename}: {err}")]
    Header {
        err: HeaderError,
        fits_filename: Box<Path>,
    },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
