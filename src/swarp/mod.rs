// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Running the external SWarp program.
//!
//! SWarp is always given an explicit argument list; no shell is involved. It
//! writes a weight map and an XML log next to its output, so each invocation
//! is run in its own directory (the child's working directory is set; ours
//! never changes).

mod error;

pub use error::SwarpError;

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Command,
};

use itertools::Itertools;
use log::{debug, trace};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::constants::{SWARP_WEIGHT_NAME, SWARP_XML_NAME};

lazy_static::lazy_static! {
    pub(crate) static ref SWARP_VERBOSITIES_COMMA_SEPARATED: String =
        SwarpVerbosity::iter().join(", ");
}

/// SWarp's `VERBOSE_TYPE`.
#[derive(Debug, Display, EnumIter, EnumString, Clone, Copy, PartialEq, Eq, Default)]
#[strum(ascii_case_insensitive)]
pub enum SwarpVerbosity {
    #[default]
    #[strum(serialize = "QUIET")]
    Quiet,
    #[strum(serialize = "NORMAL")]
    Normal,
    #[strum(serialize = "LOG")]
    Log,
    #[strum(serialize = "FULL")]
    Full,
}

/// Everything needed for a single run of SWarp.
#[derive(Debug, Clone)]
pub struct SwarpInvocation<'a> {
    /// The SWarp executable.
    pub binary: &'a str,
    /// The images to co-add.
    pub inputs: &'a [PathBuf],
    /// SWarp configuration file (`-c`).
    pub config_file: &'a Path,
    /// The co-added image (`-IMAGEOUT_NAME`).
    pub output: &'a Path,
    /// The directory SWarp runs in. Side outputs are written here.
    pub run_dir: &'a Path,
    pub verbosity: SwarpVerbosity,
}

impl SwarpInvocation<'_> {
    /// Where SWarp writes its weight map.
    pub fn weight_file(&self) -> PathBuf {
        self.run_dir.join(SWARP_WEIGHT_NAME)
    }

    /// Where SWarp writes its XML log.
    pub fn xml_file(&self) -> PathBuf {
        self.run_dir.join(SWARP_XML_NAME)
    }

    /// The arguments handed to SWarp.
    pub(crate) fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.inputs.iter().map(|i| i.into()).collect();
        args.push("-c".into());
        args.push(self.config_file.into());
        args.push("-IMAGEOUT_NAME".into());
        args.push(self.output.into());
        args.push("-WEIGHTOUT_NAME".into());
        args.push(self.weight_file().into());
        args.push("-XML_NAME".into());
        args.push(self.xml_file().into());
        args.push("-VERBOSE_TYPE".into());
        args.push(self.verbosity.to_string().into());
        args
    }

    /// Run SWarp and wait for it to finish. It's an error if SWarp can't be
    /// started, exits unsuccessfully, or doesn't write its output image.
    pub fn run(&self) -> Result<(), SwarpError> {
        let args = self.args();
        debug!(
            "Running {} on {} images in {}",
            self.binary,
            self.inputs.len(),
            self.run_dir.display()
        );
        trace!("SWarp arguments: {args:?}");

        let output = Command::new(self.binary)
            .args(&args)
            .current_dir(self.run_dir)
            .output()
            .map_err(|err| SwarpError::Spawn {
                binary: self.binary.to_string(),
                err,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            trace!("SWarp stdout:\n{}", stdout.trim_end());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();

        if !output.status.success() {
            return Err(SwarpError::Failed {
                binary: self.binary.to_string(),
                output: self.output.to_path_buf(),
                status: output.status,
                stderr,
            });
        }
        if !stderr.is_empty() {
            trace!("SWarp stderr:\n{stderr}");
        }

        if !self.output.exists() {
            return Err(SwarpError::MissingOutput {
                binary: self.binary.to_string(),
                output: self.output.to_path_buf(),
                stderr,
            });
        }

        Ok(())
    }
}
