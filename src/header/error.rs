// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with FITS headers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("Couldn't find required key {key} in the header")]
    MissingKey { key: String },

    #[error("Header key {key} is a {found}, but a {expected} was expected")]
    WrongType {
        key: String,
        found: &'static str,
        expected: &'static str,
    },

    #[error("Header key {key} has an invalid axis length ({value})")]
    BadAxisLength { key: String, value: i64 },

    #[error("Can't remove FITS axis {fits_axis}; it has length {length}, but only axes of length 1 can be removed")]
    NonSingletonAxis { fits_axis: usize, length: usize },
}
