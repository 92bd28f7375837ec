// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from running a mosaic.

use std::path::PathBuf;

use thiserror::Error;

use crate::{
    cube::CubeError,
    io::{fits::FitsError, FileWriteError, GlobError},
    postprocess::PostProcessError,
    swarp::SwarpError,
};

/// Problems with the settings of a mosaic. These are all detected before any
/// files are written.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("No working directory was specified")]
    NoWorkDir,

    #[error("No SWarp configuration file was specified")]
    NoConfig,

    #[error("No input files were specified")]
    NoInputs,

    #[error("SWarp configuration file {0} doesn't exist")]
    ConfigMissing(PathBuf),

    #[error("SWarp executable {0} doesn't exist")]
    SwarpMissing(PathBuf),

    #[error("Input file {0} doesn't exist")]
    InputMissing(PathBuf),

    #[error("Input cubes {first} and {second} have the same file name; their channel images would clash")]
    DuplicateCubeName { first: PathBuf, second: PathBuf },

    #[error("The output file name is empty")]
    EmptyStem,

    #[error("Unrecognised SWarp verbosity '{got}'; valid values are: {valid}")]
    BadSwarpVerbosity { got: String, valid: String },

    #[error("Couldn't create the working directory {path}: {err}")]
    WorkDir { path: PathBuf, err: std::io::Error },

    #[error(transparent)]
    Output(#[from] FileWriteError),

    #[error(transparent)]
    Glob(#[from] GlobError),
}

/// An error from some stage of a mosaic.
#[derive(Error, Debug)]
pub enum MosaicError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Couldn't slice cube {cube}: {err}")]
    Slice { cube: PathBuf, err: CubeError },

    #[error("Couldn't read the reference header from {file}: {err}")]
    Reference { file: PathBuf, err: FitsError },

    #[error("Couldn't find the channel images for {channel}: {err}")]
    ChannelImages { channel: String, err: GlobError },

    #[error("SWarp failed while making {target}: {err}")]
    Swarp { target: PathBuf, err: SwarpError },

    #[error("Couldn't assemble the output cube: {0}")]
    Assemble(CubeError),

    #[error("Couldn't post-process {file}: {err}")]
    PostProcess { file: PathBuf, err: PostProcessError },

    #[error("Couldn't clean up {path}: {err}")]
    Cleanup { path: PathBuf, err: std::io::Error },
}
