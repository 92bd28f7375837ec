// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! File stuff (input/output, reading/writing, globs).

pub mod fits;
mod glob;
mod write;

pub use self::glob::GlobError;
pub(crate) use self::glob::{expand_input_globs, get_nonempty_matches_from_glob};
pub use write::FileWriteError;
pub(crate) use write::can_write_to_file;
