// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Arguments shared by the `cubes` and `images` subcommands.


use std::{borrow::Cow, path::PathBuf, str::FromStr};

use clap::Parser;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use vec1::Vec1;

use super::common::{display_warnings, InfoPrinter, Warn, ARG_FILE_HELP};
use crate::{
    constants::{DEFAULT_OUTPUT_STEM, DEFAULT_SWARP_BINARY},
    io::expand_input_globs,
    params::{MosaicInputs, MosaicParams, SettingsError},
    swarp::{SwarpVerbosity, SWARP_VERBOSITIES_COMMA_SEPARATED},
    SwarpWrapperError,
};

lazy_static::lazy_static! {
    static ref OUTPUT_HELP: String =
        format!("The name of the final mosaic, written into the working directory. A .fits extension is added if it's missing. Default: {DEFAULT_OUTPUT_STEM}");

    static ref SWARP_BINARY_HELP: String =
        format!("The SWarp executable. Default: {DEFAULT_SWARP_BINARY}");

    static ref SWARP_VERBOSITY_HELP: String =
        format!("SWarp's VERBOSE_TYPE. Valid values are: {}. Default: {}", *SWARP_VERBOSITIES_COMMA_SEPARATED, SwarpVerbosity::default());
}

/// Which kind of mosaic the arguments are for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum MosaicKind {
    Cubes,
    Images,
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct MosaicArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// Paths to the input FITS files. Glob patterns (e.g. "cubes/*.fits") are
    /// expanded.
    #[clap(short, long, multiple_values(true), help_heading = "INPUT FILES")]
    pub(super) inputs: Option<Vec<String>>,

    /// The SWarp configuration file.
    #[clap(short, long, parse(from_os_str), help_heading = "INPUT FILES")]
    pub(super) config: Option<PathBuf>,

    /// The directory for temporary files and outputs. It is created if it
    /// doesn't exist.
    #[clap(short = 'd', long, parse(from_os_str), help_heading = "OUTPUT FILES")]
    pub(super) work_dir: Option<PathBuf>,

    #[clap(short, long, help = OUTPUT_HELP.as_str(), help_heading = "OUTPUT FILES")]
    pub(super) output: Option<String>,

    /// Don't overwrite existing output files.
    #[clap(long, help_heading = "OUTPUT FILES")]
    #[serde(default)]
    pub(super) no_overwrite: bool,

    /// Keep the per-channel images in the working directory.
    #[clap(long, help_heading = "OUTPUT FILES")]
    #[serde(default)]
    pub(super) keep_temporary_files: bool,

    /// Delete SWarp's weight map instead of keeping it next to the mosaic.
    #[clap(long, help_heading = "OUTPUT FILES")]
    #[serde(default)]
    pub(super) discard_coadd_weight: bool,

    /// Delete SWarp's XML log instead of keeping it next to the mosaic.
    #[clap(long, help_heading = "OUTPUT FILES")]
    #[serde(default)]
    pub(super) discard_swarp_log: bool,

    #[clap(long, help = SWARP_BINARY_HELP.as_str(), help_heading = "SWARP")]
    pub(super) swarp_binary: Option<String>,

    #[clap(long, help = SWARP_VERBOSITY_HELP.as_str(), help_heading = "SWARP")]
    pub(super) swarp_verbosity: Option<String>,

    /// Don't convert SWarp's blank pixels (values below -1e5) to NaN.
    #[clap(long, help_heading = "POST-PROCESSING")]
    #[serde(default)]
    pub(super) no_restore_nans: bool,

    /// Convert pixels that are exactly zero to NaN.
    #[clap(long, help_heading = "POST-PROCESSING")]
    #[serde(default)]
    pub(super) convert_zeros_to_nans: bool,

    /// Don't copy the header keys of the first input into the mosaic.
    #[clap(long, help_heading = "POST-PROCESSING")]
    #[serde(default)]
    pub(super) no_restore_keys: bool,

    /// Header keys to remove from the mosaic rather than restore.
    #[clap(long, multiple_values(true), help_heading = "POST-PROCESSING")]
    pub(super) remove_keys: Option<Vec<String>>,
}

impl MosaicArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub(super) fn merge(self) -> Result<MosaicArgs, SwarpWrapperError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Read in the file arguments. Ensure all of the file args are
            // accounted for by pattern matching.
            let MosaicArgs {
                args_file: _,
                inputs,
                config,
                work_dir,
                output,
                no_overwrite,
                keep_temporary_files,
                discard_coadd_weight,
                discard_swarp_log,
                swarp_binary,
                swarp_verbosity,
                no_restore_nans,
                convert_zeros_to_nans,
                no_restore_keys,
                remove_keys,
            } = unpack_arg_file!(arg_file);

            // Merge all the arguments, preferring the CLI args when available.
            Ok(MosaicArgs {
                args_file: None,
                inputs: cli_args.inputs.or(inputs),
                config: cli_args.config.or(config),
                work_dir: cli_args.work_dir.or(work_dir),
                output: cli_args.output.or(output),
                no_overwrite: cli_args.no_overwrite || no_overwrite,
                keep_temporary_files: cli_args.keep_temporary_files || keep_temporary_files,
                discard_coadd_weight: cli_args.discard_coadd_weight || discard_coadd_weight,
                discard_swarp_log: cli_args.discard_swarp_log || discard_swarp_log,
                swarp_binary: cli_args.swarp_binary.or(swarp_binary),
                swarp_verbosity: cli_args.swarp_verbosity.or(swarp_verbosity),
                no_restore_nans: cli_args.no_restore_nans || no_restore_nans,
                convert_zeros_to_nans: cli_args.convert_zeros_to_nans || convert_zeros_to_nans,
                no_restore_keys: cli_args.no_restore_keys || no_restore_keys,
                remove_keys: cli_args.remove_keys.or(remove_keys),
            })
        } else {
            Ok(cli_args)
        }
    }

    /// Turn the arguments into validated parameters, and report what will be
    /// done.
    pub(super) fn parse(self, kind: MosaicKind) -> Result<MosaicParams, SwarpWrapperError> {
        let Self {
            args_file: _,
            inputs,
            config,
            work_dir,
            output,
            no_overwrite,
            keep_temporary_files,
            discard_coadd_weight,
            discard_swarp_log,
            swarp_binary,
            swarp_verbosity,
            no_restore_nans,
            convert_zeros_to_nans,
            no_restore_keys,
            remove_keys,
        } = self;

        let work_dir = work_dir.ok_or(SettingsError::NoWorkDir)?;
        let config = config.ok_or(SettingsError::NoConfig)?;
        let inputs =
            expand_input_globs(&inputs.unwrap_or_default()).map_err(SettingsError::from)?;
        let inputs = Vec1::try_from_vec(inputs).map_err(|_| SettingsError::NoInputs)?;
        let inputs = match kind {
            MosaicKind::Cubes => MosaicInputs::Cubes(inputs),
            MosaicKind::Images => MosaicInputs::Images(inputs),
        };
        let swarp_verbosity = match swarp_verbosity {
            Some(v) => {
                SwarpVerbosity::from_str(&v).map_err(|_| SettingsError::BadSwarpVerbosity {
                    got: v,
                    valid: SWARP_VERBOSITIES_COMMA_SEPARATED.clone(),
                })?
            }
            None => SwarpVerbosity::default(),
        };

        let mut params = MosaicParams::new(work_dir, config, inputs);
        if let Some(output) = output {
            params.output_stem = output;
        }
        if let Some(swarp_binary) = swarp_binary {
            params.swarp_binary = swarp_binary;
        }
        params.swarp_verbosity = swarp_verbosity;
        params.overwrite = !no_overwrite;
        params.keep_temporary_files = keep_temporary_files;
        params.keep_coadd_weight = !discard_coadd_weight;
        params.keep_swarp_log = !discard_swarp_log;
        params.restore_nans = !no_restore_nans;
        params.convert_zeros_to_nans = convert_zeros_to_nans;
        params.restore_keys = !no_restore_keys;
        params.keys_to_remove = remove_keys.unwrap_or_default();

        if params.convert_zeros_to_nans {
            let warning: Vec<Cow<'static, str>> = vec![
                "Pixels that are exactly zero will be converted to NaN.".into(),
                "Any genuine zeros in the data will be lost.".into(),
            ];
            warning.warn();
        }
        if kind == MosaicKind::Images && params.keep_temporary_files {
            "--keep-temporary-files does nothing when mosaicking images".warn();
        }

        params.validate()?;
        display_params(&params);
        display_warnings();

        Ok(params)
    }

    pub(super) fn run(self, kind: MosaicKind, dry_run: bool) -> Result<(), SwarpWrapperError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let params = self.parse(kind)?;

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        // `parse` has already validated the parameters.
        let output = params.run_validated()?;
        info!("Mosaic written to {}", output.display());
        Ok(())
    }
}

fn display_params(params: &MosaicParams) {
    let files = params.inputs.files();
    let mut printer = InfoPrinter::new(
        format!("Mosaicking {} {}", files.len(), params.inputs.kind()).into(),
    );

    printer.push_block(
        files
            .iter()
            .map(|f| f.display().to_string().into())
            .collect(),
    );

    printer.push_block(vec![
        format!("SWarp: {} ({})", params.swarp_binary, params.swarp_verbosity).into(),
        format!("Configuration: {}", params.config_file.display()).into(),
    ]);

    let mut block = vec![
        format!("Working directory: {}", params.work_dir.display()).into(),
        format!("Output: {}", params.output_file().display()).into(),
    ];
    if params.keep_coadd_weight {
        block.push(format!("Weight map: {}", params.weight_output_file().display()).into());
    }
    if params.keep_swarp_log {
        block.push(format!("XML log: {}", params.xml_output_file().display()).into());
    }
    printer.push_block(block);

    let mut post: Vec<Cow<'static, str>> = vec![];
    if params.restore_nans {
        post.push("Blank pixels become NaN".into());
    }
    if params.convert_zeros_to_nans {
        post.push("Zeros become NaN".into());
    }
    if params.restore_keys {
        post.push("Header keys of the first input are restored".into());
    }
    if !params.keys_to_remove.is_empty() {
        post.push(format!("Removing header keys: {}", params.keys_to_remove.join(", ")).into());
    }
    if post.is_empty() {
        printer.push_line("No post-processing".into());
    } else {
        printer.push_block(post);
    }

    printer.display();
}
