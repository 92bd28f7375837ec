// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parameters for a mosaic, and the code that runs it.
//!
//! The code here "mirrors" the code within the `cli` module; `cli` is
//! unparsed, user-facing code, whereas [`MosaicParams`] is ready to be used
//! directly (e.g. by other crates).

mod error;

pub use error::{MosaicError, SettingsError};

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info, warn};
use vec1::Vec1;

use crate::{
    constants::{
        CHANNELS_DIR_NAME, DEFAULT_OUTPUT_STEM, DEFAULT_SWARP_BINARY, SLICES_DIR_NAME,
        SWARP_WEIGHT_NAME, SWARP_XML_NAME,
    },
    cube::{assemble_cube, channel_name, max_channels, slice_cube},
    header::FitsHeader,
    io::{can_write_to_file, fits::FitsImage, get_nonempty_matches_from_glob},
    postprocess::{restore_values, PostProcessOptions},
    swarp::{SwarpInvocation, SwarpVerbosity},
    PROGRESS_BARS,
};

/// The files to be mosaicked.
#[derive(Debug, Clone)]
pub enum MosaicInputs {
    /// Spectral cubes; each channel is mosaicked separately.
    Cubes(Vec1<PathBuf>),
    /// 2D images; these are all handed to SWarp at once.
    Images(Vec1<PathBuf>),
}

impl MosaicInputs {
    pub fn files(&self) -> &Vec1<PathBuf> {
        match self {
            MosaicInputs::Cubes(f) | MosaicInputs::Images(f) => f,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            MosaicInputs::Cubes(_) => "cubes",
            MosaicInputs::Images(_) => "images",
        }
    }

    fn with_files(&self, files: Vec1<PathBuf>) -> MosaicInputs {
        match self {
            MosaicInputs::Cubes(_) => MosaicInputs::Cubes(files),
            MosaicInputs::Images(_) => MosaicInputs::Images(files),
        }
    }
}

/// Everything needed to make a mosaic.
#[derive(Debug, Clone)]
pub struct MosaicParams {
    /// Temporary files and the outputs go here.
    pub work_dir: PathBuf,

    /// The SWarp configuration file.
    pub config_file: PathBuf,

    pub inputs: MosaicInputs,

    /// The final mosaic is `<work_dir>/<output_stem>.fits`.
    pub output_stem: String,

    pub swarp_binary: String,

    pub swarp_verbosity: SwarpVerbosity,

    /// Overwrite existing outputs.
    pub overwrite: bool,

    /// Keep the per-channel images made while mosaicking cubes.
    pub keep_temporary_files: bool,

    /// Keep SWarp's weight map as `<output_stem>.coadd.weight.fits`.
    pub keep_coadd_weight: bool,

    /// Keep SWarp's XML log as `<output_stem>.xml`.
    pub keep_swarp_log: bool,

    /// Convert SWarp's blank pixels to NaN.
    pub restore_nans: bool,

    /// Convert zero-valued pixels to NaN.
    pub convert_zeros_to_nans: bool,

    /// Put the header keys of the (first) input back into the output.
    pub restore_keys: bool,

    /// Header keys that are removed from the output rather than restored.
    pub keys_to_remove: Vec<String>,
}

impl MosaicParams {
    /// New parameters with default settings.
    pub fn new(work_dir: PathBuf, config_file: PathBuf, inputs: MosaicInputs) -> MosaicParams {
        MosaicParams {
            work_dir,
            config_file,
            inputs,
            output_stem: DEFAULT_OUTPUT_STEM.to_string(),
            swarp_binary: DEFAULT_SWARP_BINARY.to_string(),
            swarp_verbosity: SwarpVerbosity::default(),
            overwrite: true,
            keep_temporary_files: false,
            keep_coadd_weight: true,
            keep_swarp_log: true,
            restore_nans: true,
            convert_zeros_to_nans: false,
            restore_keys: true,
            keys_to_remove: vec![],
        }
    }

    /// The final mosaic.
    pub fn output_file(&self) -> PathBuf {
        self.work_dir.join(format!("{}.fits", self.output_stem))
    }

    /// Where SWarp's weight map ends up (if it's kept).
    pub fn weight_output_file(&self) -> PathBuf {
        self.work_dir
            .join(format!("{}.{SWARP_WEIGHT_NAME}", self.output_stem))
    }

    /// Where SWarp's XML log ends up (if it's kept).
    pub fn xml_output_file(&self) -> PathBuf {
        self.work_dir.join(format!("{}.xml", self.output_stem))
    }

    /// Per-cube channel images.
    pub fn channels_dir(&self) -> PathBuf {
        self.work_dir.join(CHANNELS_DIR_NAME)
    }

    /// Per-channel mosaics.
    pub fn slices_dir(&self) -> PathBuf {
        self.work_dir.join(SLICES_DIR_NAME)
    }

    /// Check that the parameters are sane before anything is written. The
    /// working directory is created if necessary, and all paths are made
    /// absolute (SWarp runs in a different directory to us).
    pub fn validate(&mut self) -> Result<(), SettingsError> {
        let stem = strip_fits_extension(self.output_stem.trim());
        if stem.is_empty() {
            return Err(SettingsError::EmptyStem);
        }
        self.output_stem = stem.to_string();

        if !self.config_file.is_file() {
            return Err(SettingsError::ConfigMissing(self.config_file.clone()));
        }
        self.config_file = self
            .config_file
            .canonicalize()
            .map_err(|_| SettingsError::ConfigMissing(self.config_file.clone()))?;

        // SWarp runs inside the working directory, so a path to it must not
        // be relative. Bare names are left for the PATH lookup.
        if self.swarp_binary.contains(std::path::is_separator) {
            let binary = PathBuf::from(&self.swarp_binary);
            if !binary.is_file() {
                return Err(SettingsError::SwarpMissing(binary));
            }
            self.swarp_binary = binary
                .canonicalize()
                .map_err(|_| SettingsError::SwarpMissing(binary.clone()))?
                .display()
                .to_string();
        }

        let mut files = Vec::with_capacity(self.inputs.files().len());
        for input in self.inputs.files() {
            if !input.is_file() {
                return Err(SettingsError::InputMissing(input.clone()));
            }
            let input = input
                .canonicalize()
                .map_err(|_| SettingsError::InputMissing(input.clone()))?;
            files.push(input);
        }
        if let MosaicInputs::Cubes(_) = self.inputs {
            for (i, first) in files.iter().enumerate() {
                if let Some(second) = files[i + 1..]
                    .iter()
                    .find(|f| f.file_stem() == first.file_stem())
                {
                    return Err(SettingsError::DuplicateCubeName {
                        first: first.clone(),
                        second: second.clone(),
                    });
                }
            }
        }
        let files = Vec1::try_from_vec(files).map_err(|_| SettingsError::NoInputs)?;
        self.inputs = self.inputs.with_files(files);

        if !self.work_dir.exists() {
            debug!("Creating working directory {}", self.work_dir.display());
            std::fs::create_dir_all(&self.work_dir).map_err(|err| SettingsError::WorkDir {
                path: self.work_dir.clone(),
                err,
            })?;
        }
        self.work_dir = self
            .work_dir
            .canonicalize()
            .map_err(|err| SettingsError::WorkDir {
                path: self.work_dir.clone(),
                err,
            })?;

        can_write_to_file(&self.output_file(), self.overwrite)?;
        if self.keep_coadd_weight {
            can_write_to_file(&self.weight_output_file(), self.overwrite)?;
        }
        if self.keep_swarp_log {
            can_write_to_file(&self.xml_output_file(), self.overwrite)?;
        }

        Ok(())
    }

    /// Mosaic the inputs according to their kind. Returns the path to the
    /// final mosaic.
    pub fn run(&mut self) -> Result<PathBuf, MosaicError> {
        self.validate()?;
        self.run_validated()
    }

    /// [`MosaicParams::run`] for parameters that have already been through
    /// [`MosaicParams::validate`].
    pub(crate) fn run_validated(&self) -> Result<PathBuf, MosaicError> {
        match self.inputs {
            MosaicInputs::Cubes(_) => self.mosaic_validated_cubes(),
            MosaicInputs::Images(_) => self.mosaic_validated_images(),
        }
    }

    /// Mosaic the input files as spectral cubes. Each cube is cut into
    /// channel images, every channel is mosaicked by SWarp, and the channel
    /// mosaics are stacked into the final cube. Cubes with fewer channels than
    /// the others are padded with NaN.
    pub fn mosaic_cubes(&mut self) -> Result<PathBuf, MosaicError> {
        self.validate()?;
        self.mosaic_validated_cubes()
    }

    fn mosaic_validated_cubes(&self) -> Result<PathBuf, MosaicError> {
        let cubes = self.inputs.files().clone();
        info!("Mosaicking {} cubes", cubes.len());

        let mut num_channels = 0;
        for cube in &cubes {
            let n = max_channels(std::slice::from_ref(cube)).map_err(|err| {
                MosaicError::Slice {
                    cube: cube.clone(),
                    err,
                }
            })?;
            num_channels = num_channels.max(n);
        }
        info!("Each cube will have {num_channels} channels");

        self.make_temporary_dirs()?;
        let reference = self.slice_cubes(&cubes, num_channels)?;
        let channel_mosaics = self.swarp_slices(num_channels)?;

        let output = self.output_file();
        let progress = make_progress_bar(channel_mosaics.len(), "Assembling cube");
        assemble_cube(
            &channel_mosaics,
            &reference,
            self.restore_keys,
            &self.keys_to_remove,
            &output,
            self.overwrite,
            &progress,
        )
        .map_err(MosaicError::Assemble)?;
        progress.abandon_with_message("Assembled cube");

        self.clean_up_side_outputs(&self.slices_dir())?;
        self.clean_up()?;
        self.post_process(&output, &reference)?;
        Ok(output)
    }

    /// Mosaic the input files as 2D images with a single run of SWarp.
    pub fn mosaic_images(&mut self) -> Result<PathBuf, MosaicError> {
        self.validate()?;
        self.mosaic_validated_images()
    }

    fn mosaic_validated_images(&self) -> Result<PathBuf, MosaicError> {
        let images = self.inputs.files().clone();
        info!("Mosaicking {} images", images.len());

        let first = images.first();
        let reference = FitsImage::read_header(first).map_err(|err| MosaicError::Reference {
            file: first.clone(),
            err,
        })?;

        let output = self.output_file();
        SwarpInvocation {
            binary: &self.swarp_binary,
            inputs: images.as_slice(),
            config_file: &self.config_file,
            output: &output,
            run_dir: &self.work_dir,
            verbosity: self.swarp_verbosity,
        }
        .run()
        .map_err(|err| MosaicError::Swarp {
            target: output.clone(),
            err,
        })?;

        self.clean_up_side_outputs(&self.work_dir)?;
        self.post_process(&output, &reference)?;
        Ok(output)
    }

    /// Create the directories for temporary files. Leftovers of an earlier
    /// run are removed, otherwise they would be mosaicked too.
    fn make_temporary_dirs(&self) -> Result<(), MosaicError> {
        for dir in [self.channels_dir(), self.slices_dir()] {
            if dir.exists() {
                warn!("Removing the existing directory {}", dir.display());
                std::fs::remove_dir_all(&dir).map_err(|err| MosaicError::Cleanup {
                    path: dir.clone(),
                    err,
                })?;
            }
            std::fs::create_dir_all(&dir).map_err(|err| SettingsError::WorkDir {
                path: dir.clone(),
                err,
            })?;
        }
        Ok(())
    }

    /// Cut every cube into channel images. The header of the first cube is
    /// returned; it's used as the reference for the output's header.
    fn slice_cubes(
        &self,
        cubes: &Vec1<PathBuf>,
        num_channels: usize,
    ) -> Result<FitsHeader, MosaicError> {
        let channels_dir = self.channels_dir();
        let progress = make_progress_bar(cubes.len(), "Slicing cubes");
        let mut reference = None;
        for cube in cubes {
            debug!("Slicing {}", cube.display());
            let header = slice_cube(cube, &channels_dir, num_channels, self.overwrite).map_err(
                |err| MosaicError::Slice {
                    cube: cube.clone(),
                    err,
                },
            )?;
            if reference.is_none() {
                reference = Some(header);
            }
            progress.inc(1);
        }
        progress.abandon_with_message("Sliced cubes");

        // There is always at least one cube.
        Ok(reference.unwrap_or_default())
    }

    /// Run SWarp on each channel. The paths to the channel mosaics are
    /// returned in channel order.
    fn swarp_slices(&self, num_channels: usize) -> Result<Vec<PathBuf>, MosaicError> {
        let channels_dir = self.channels_dir();
        let slices_dir = self.slices_dir();
        let escaped_dir = glob::Pattern::escape(&channels_dir.display().to_string());
        let progress = make_progress_bar(num_channels, "Running SWarp");

        let mut channel_mosaics = Vec::with_capacity(num_channels);
        for channel in 0..num_channels {
            let name = channel_name(channel);
            let inputs = get_nonempty_matches_from_glob(&format!("{escaped_dir}/*_{name}.fits"))
                .map_err(|err| MosaicError::ChannelImages {
                    channel: name.clone(),
                    err,
                })?;
            let output = slices_dir.join(format!("{name}.fits"));
            debug!("Mosaicking {} images for {name}", inputs.len());

            SwarpInvocation {
                binary: &self.swarp_binary,
                inputs: &inputs,
                config_file: &self.config_file,
                output: &output,
                run_dir: &slices_dir,
                verbosity: self.swarp_verbosity,
            }
            .run()
            .map_err(|err| MosaicError::Swarp {
                target: output.clone(),
                err,
            })?;

            channel_mosaics.push(output);
            progress.inc(1);
        }
        progress.abandon_with_message("Ran SWarp");

        Ok(channel_mosaics)
    }

    /// Keep (rename) or delete the weight map and XML log SWarp wrote into
    /// `run_dir`.
    fn clean_up_side_outputs(&self, run_dir: &Path) -> Result<(), MosaicError> {
        let side_outputs = [
            (
                run_dir.join(SWARP_WEIGHT_NAME),
                self.keep_coadd_weight,
                self.weight_output_file(),
            ),
            (
                run_dir.join(SWARP_XML_NAME),
                self.keep_swarp_log,
                self.xml_output_file(),
            ),
        ];
        for (produced, keep, destination) in side_outputs {
            if !produced.exists() {
                warn!("SWarp didn't write {}", produced.display());
                continue;
            }

            let result = if keep {
                debug!(
                    "Moving {} to {}",
                    produced.display(),
                    destination.display()
                );
                std::fs::rename(&produced, &destination)
            } else {
                debug!("Removing {}", produced.display());
                std::fs::remove_file(&produced)
            };
            result.map_err(|err| MosaicError::Cleanup {
                path: produced.clone(),
                err,
            })?;
        }

        Ok(())
    }

    /// Remove the temporary directories, unless they're to be kept.
    fn clean_up(&self) -> Result<(), MosaicError> {
        if self.keep_temporary_files {
            info!(
                "Keeping temporary files in {} and {}",
                self.channels_dir().display(),
                self.slices_dir().display()
            );
            return Ok(());
        }

        for dir in [self.channels_dir(), self.slices_dir()] {
            if dir.exists() {
                debug!("Removing {}", dir.display());
                std::fs::remove_dir_all(&dir)
                    .map_err(|err| MosaicError::Cleanup { path: dir, err })?;
            }
        }
        Ok(())
    }

    fn post_process(&self, file: &Path, reference: &FitsHeader) -> Result<(), MosaicError> {
        let options = PostProcessOptions {
            restore_nans: self.restore_nans,
            convert_zeros_to_nans: self.convert_zeros_to_nans,
            restore_keys: self.restore_keys,
            keys_to_remove: self.keys_to_remove.clone(),
        };
        restore_values(file, reference, &options).map_err(|err| MosaicError::PostProcess {
            file: file.to_path_buf(),
            err,
        })
    }
}

/// `"mosaic.fits"` -> `"mosaic"`. The extension's case doesn't matter.
fn strip_fits_extension(stem: &str) -> &str {
    const EXTENSION: &str = ".fits";
    match stem.len().checked_sub(EXTENSION.len()) {
        Some(i) if stem.is_char_boundary(i) && stem[i..].eq_ignore_ascii_case(EXTENSION) => {
            &stem[..i]
        }
        _ => stem,
    }
}

/// Convenience function to make a progress bar for a stage of a mosaic.
fn make_progress_bar(len: usize, message: &'static str) -> ProgressBar {
    ProgressBar::with_draw_target(
        Some(len as _),
        if PROGRESS_BARS.load() {
            ProgressDrawTarget::stdout()
        } else {
            ProgressDrawTarget::hidden()
        },
    )
    .with_style(
        ProgressStyle::default_bar()
            .template("{msg:16}: [{wide_bar:.blue}] {pos:3}/{len:3} ({elapsed_precise}<{eta_precise})")
            .unwrap()
            .progress_chars("=> "),
    )
    .with_position(0)
    .with_message(message)
}
