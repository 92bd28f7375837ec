// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all swarp_wrapper-related errors. This should be the *only*
//! error enum that is publicly visible from the CLI.

use thiserror::Error;

use crate::{
    cube::CubeError,
    header::HeaderError,
    io::{fits::FitsError, FileWriteError},
    params::{MosaicError, SettingsError},
    postprocess::PostProcessError,
    swarp::SwarpError,
};

const SWARP_URL: &str = "https://www.astromatic.net/software/swarp";

#[derive(Error, Debug)]
pub enum SwarpWrapperError {
    /// Bad or missing arguments.
    #[error("{0}\n\nSee --help for the available options.")]
    Settings(String),

    /// An error from running SWarp.
    #[error("{0}\n\nTry running SWarp by hand with the same configuration file, or increase --swarp-verbosity. See for more info: {SWARP_URL}")]
    Swarp(String),

    /// A cfitsio error. Because these are usually quite spartan, some
    /// suggestions are provided here.
    #[error("cfitsio error: {0}\n\nIf you don't know what this means, try turning up verbosity (-v or -vv) and maybe disabling progress bars.")]
    Fits(String),

    /// A problem with the contents of a FITS header.
    #[error("{0}\n\nThe input files need a valid WCS header.")]
    Header(String),

    /// An error related to argument files.
    #[error("{0}")]
    ArgFile(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<SettingsError> for SwarpWrapperError {
    fn from(e: SettingsError) -> Self {
        match e {
            SettingsError::WorkDir { .. } => Self::Generic(e.to_string()),
            _ => Self::Settings(e.to_string()),
        }
    }
}

impl From<MosaicError> for SwarpWrapperError {
    fn from(e: MosaicError) -> Self {
        let s = e.to_string();
        match e {
            MosaicError::Settings(e) => Self::from(e),
            MosaicError::Slice { err, .. } | MosaicError::Assemble(err) => match err {
                CubeError::Fits(_) => Self::Fits(s),
                CubeError::Header(_) => Self::Header(s),
                CubeError::NotACube { .. }
                | CubeError::NotAPlane { .. }
                | CubeError::PlaneShape { .. }
                | CubeError::NoChannels => Self::Generic(s),
            },
            MosaicError::Reference { .. } => Self::Fits(s),
            MosaicError::ChannelImages { .. } => Self::Generic(s),
            MosaicError::Swarp { .. } => Self::Swarp(s),
            MosaicError::PostProcess { err, .. } => match err {
                PostProcessError::Fits(_) => Self::Fits(s),
                PostProcessError::Header(_) => Self::Header(s),
            },
            MosaicError::Cleanup { .. } => Self::Generic(s),
        }
    }
}

impl From<SwarpError> for SwarpWrapperError {
    fn from(e: SwarpError) -> Self {
        Self::Swarp(e.to_string())
    }
}

impl From<FitsError> for SwarpWrapperError {
    fn from(e: FitsError) -> Self {
        Self::Fits(e.to_string())
    }
}

impl From<HeaderError> for SwarpWrapperError {
    fn from(e: HeaderError) -> Self {
        Self::Header(e.to_string())
    }
}

impl From<FileWriteError> for SwarpWrapperError {
    fn from(e: FileWriteError) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<std::io::Error> for SwarpWrapperError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
