// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with running SWarp.

use std::{path::PathBuf, process::ExitStatus};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SwarpError {
    #[error("Couldn't run '{binary}': {err}\nIs SWarp installed and in your PATH?")]
    Spawn {
        binary: String,
        err: std::io::Error,
    },

    #[error("'{binary}' failed ({status}) while making {output}:\n{stderr}")]
    Failed {
        binary: String,
        output: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("'{binary}' exited successfully, but didn't write {output}:\n{stderr}")]
    MissingOutput {
        binary: String,
        output: PathBuf,
        stderr: String,
    },
}
