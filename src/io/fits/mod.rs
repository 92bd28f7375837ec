// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions for reading and writing FITS images.
//!
//! Only the primary HDU is used. Data are always handled as `f32`; cfitsio
//! converts from whatever type is on disk. The header is read card by card, so
//! everything in it (including commentary cards) survives a round trip
//! through [`FitsImage`].

mod error;

pub use error::FitsError;

use std::{
    ffi::{CStr, CString},
    os::raw::{c_char, c_int},
    path::Path,
    ptr,
};

use fitsio::{
    hdu::{FitsHdu, HduInfo},
    images::{ImageDescription, ImageType},
    FitsFile,
};
use log::trace;
use ndarray::{ArrayD, ArrayView, Dimension, IxDyn};

use crate::header::{is_commentary_keyword, Card, FitsHeader, HeaderValue};

/// Keys that cfitsio writes itself when an image is created, or that don't
/// make sense for the `f32` images we write.
const SKIPPED_KEYS: [&str; 12] = [
    "SIMPLE", "BITPIX", "NAXIS", "EXTEND", "BSCALE", "BZERO", "BLANK", "XTENSION", "PCOUNT",
    "GCOUNT", "CHECKSUM", "DATASUM",
];

/// cfitsio writes these comments into every new primary header, so they're
/// not written again when copying a header.
const CFITSIO_COMMENT_PREFIXES: [&str; 2] = [
    "FITS (Flexible Image Transport System) format is",
    "and Astrophysics', volume 376, page 359",
];

/// String values longer than this need the long-string convention.
const MAX_SHORT_STRING_LEN: usize = 68;

/// Buffer size for cfitsio keyword, value and comment strings.
const CARD_BUFFER_LEN: usize = 81;

/// A FITS image (or cube) and its header.
#[derive(Debug, Clone)]
pub struct FitsImage {
    pub header: FitsHeader,
    /// Row-major image data, i.e. the last axis is FITS axis 1.
    pub data: ArrayD<f32>,
}

impl FitsImage {
    /// Read the primary HDU of a FITS file.
    #[track_caller]
    pub fn read<P: AsRef<Path>>(file: P) -> Result<FitsImage, FitsError> {
        let file = file.as_ref();
        trace!("Reading {}", file.display());
        let mut fptr = fits_open(file)?;
        let hdu = fits_open_hdu(&mut fptr, 0, file)?;
        let header = fits_read_header(&mut fptr, &hdu, file)?;
        let shape = fits_get_image_shape(&hdu, file)?.clone();
        let flat = fits_get_image(&mut fptr, &hdu, file)?;
        let data = ArrayD::from_shape_vec(IxDyn(&shape), flat).map_err(|_| FitsError::Shape {
            header_shape: shape.clone(),
            data_shape: vec![],
            fits_filename: file.to_path_buf().into_boxed_path(),
        })?;
        Ok(FitsImage { header, data })
    }

    /// Read only the header of the primary HDU of a FITS file.
    #[track_caller]
    pub fn read_header<P: AsRef<Path>>(file: P) -> Result<FitsHeader, FitsError> {
        let file = file.as_ref();
        let mut fptr = fits_open(file)?;
        let hdu = fits_open_hdu(&mut fptr, 0, file)?;
        fits_read_header(&mut fptr, &hdu, file)
    }

    /// Write this image to a new FITS file. See [`write_fits_image`].
    #[track_caller]
    pub fn write<P: AsRef<Path>>(&self, file: P, overwrite: bool) -> Result<(), FitsError> {
        write_fits_image(file, &self.header, self.data.view(), overwrite)
    }
}

/// Write `data` and `header` to a new FITS file as a single-precision float
/// image. If `header` has an `NAXIS` key, its axes must agree with the shape
/// of `data`.
#[track_caller]
pub fn write_fits_image<P: AsRef<Path>, D: Dimension>(
    file: P,
    header: &FitsHeader,
    data: ArrayView<f32, D>,
    overwrite: bool,
) -> Result<(), FitsError> {
    let file = file.as_ref();
    trace!("Writing {}", file.display());

    if header.contains("NAXIS") {
        let header_shape = header.shape().map_err(|err| FitsError::Header {
            err,
            fits_filename: file.to_path_buf().into_boxed_path(),
        })?;
        if header_shape != data.shape() {
            return Err(FitsError::Shape {
                header_shape,
                data_shape: data.shape().to_vec(),
                fits_filename: file.to_path_buf().into_boxed_path(),
            });
        }
    }

    if file.exists() {
        if overwrite {
            std::fs::remove_file(file)?;
        } else {
            return Err(FitsError::AlreadyExists(
                file.to_path_buf().into_boxed_path(),
            ));
        }
    }

    let mut fptr = fits_create(file, data.shape())?;
    let hdu = fits_open_hdu(&mut fptr, 0, file)?;
    fits_write_header(&mut fptr, &hdu, file, header)?;
    let flat: Vec<f32> = data.iter().copied().collect();
    fits_write_image(&mut fptr, &hdu, file, &flat)?;
    Ok(())
}

/// Open a fits file.
#[track_caller]
pub(crate) fn fits_open(file: &Path) -> Result<FitsFile, FitsError> {
    FitsFile::open(file).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Open {
            fits_error: Box::new(e),
            fits_filename: file.to_path_buf().into_boxed_path(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// Create a fits file with a float primary image of the given (row-major)
/// shape.
#[track_caller]
fn fits_create(file: &Path, shape: &[usize]) -> Result<FitsFile, FitsError> {
    let image_description = ImageDescription {
        data_type: ImageType::Float,
        dimensions: shape,
    };
    FitsFile::create(file)
        .with_custom_primary(&image_description)
        .open()
        .map_err(|e| {
            let caller = std::panic::Location::caller();
            FitsError::Create {
                fits_error: Box::new(e),
                fits_filename: file.to_path_buf().into_boxed_path(),
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            }
        })
}

/// Open a fits file's HDU.
#[track_caller]
pub(crate) fn fits_open_hdu(
    fits_fptr: &mut FitsFile,
    hdu_num: usize,
    file: &Path,
) -> Result<FitsHdu, FitsError> {
    fits_fptr.hdu(hdu_num).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Fitsio {
            fits_error: Box::new(e),
            fits_filename: file.to_path_buf().into_boxed_path(),
            hdu_description: format!("{}", hdu_num + 1).into_boxed_str(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// Get the (row-major) shape of the image on the supplied HDU.
#[track_caller]
pub(crate) fn fits_get_image_shape<'a>(
    hdu: &'a FitsHdu,
    file: &Path,
) -> Result<&'a Vec<usize>, FitsError> {
    match &hdu.info {
        HduInfo::ImageInfo { shape, .. } => Ok(shape),
        _ => {
            let caller = std::panic::Location::caller();
            Err(FitsError::NotImage {
                fits_filename: file.to_path_buf().into_boxed_path(),
                hdu_num: hdu.number + 1,
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            })
        }
    }
}

/// Given a FITS file pointer and a HDU, read the associated image as `f32`.
/// Undefined pixels (those equal to `BLANK` in integer images) become NaN.
#[track_caller]
pub(crate) fn fits_get_image(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    file: &Path,
) -> Result<Vec<f32>, FitsError> {
    let num_elements: usize = fits_get_image_shape(hdu, file)?.iter().product();
    let mut data = vec![0.0_f32; num_elements];
    let mut any_null = 0;
    let mut status = 0;
    unsafe {
        // ffgpve = fits_read_img_flt
        fitsio_sys::ffgpve(
            fits_fptr.as_raw(),  /* I - FITS file pointer                       */
            1,                   /* I - group to read (1 = 1st group)           */
            1,                   /* I - first vector element to read (1 = 1st)  */
            num_elements as _,   /* I - number of values to read                */
            f32::NAN,            /* I - value for undefined pixels              */
            data.as_mut_ptr(),   /* O - array of values that are returned       */
            &mut any_null,       /* O - set to 1 if any values are null; else 0 */
            &mut status,         /* IO - error status                           */
        );
    }
    fits_check_status(status, hdu, file)?;
    if any_null != 0 {
        trace!("{} has undefined pixels; they're now NaN", file.display());
    }
    Ok(data)
}

/// Given a FITS file pointer and a HDU, write the image.
#[track_caller]
pub(crate) fn fits_write_image<T: fitsio::images::WriteImage>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    file: &Path,
    data: &[T],
) -> Result<(), FitsError> {
    fits_get_image_shape(hdu, file)?;
    hdu.write_image(fits_fptr, data).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Fitsio {
            fits_error: Box::new(e),
            fits_filename: file.to_path_buf().into_boxed_path(),
            hdu_description: format!("{}", hdu.number + 1).into_boxed_str(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// Turn a non-zero cfitsio status into an error.
#[track_caller]
fn fits_check_status(status: c_int, hdu: &FitsHdu, file: &Path) -> Result<(), FitsError> {
    fitsio::errors::check_status(status).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Fitsio {
            fits_error: Box::new(e),
            fits_filename: file.to_path_buf().into_boxed_path(),
            hdu_description: format!("{}", hdu.number + 1).into_boxed_str(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// Pull the string out of the comment field of a `CONTINUE` card, e.g.
/// `  'more text&' / a comment` -> `more text&`.
fn continued_string(text: &str) -> Option<String> {
    let mut chars = text.trim_start().strip_prefix('\'')?.chars().peekable();
    let mut s = String::new();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
            } else {
                return Some(s.trim_end().to_string());
            }
        }
        s.push(c);
    }
    None
}

fn buffer_to_string(buffer: &[c_char]) -> String {
    // Safety: cfitsio always NUL-terminates, and the buffer was zeroed.
    unsafe { CStr::from_ptr(buffer.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

/// Read every card of a HDU's header. Long strings split over `CONTINUE`
/// cards are joined back together.
#[track_caller]
pub(crate) fn fits_read_header(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    file: &Path,
) -> Result<FitsHeader, FitsError> {
    let mut status = 0;
    let mut num_keys = 0;
    let mut more_keys = 0;
    unsafe {
        // ffghsp = fits_get_hdrspace
        fitsio_sys::ffghsp(
            fits_fptr.as_raw(),
            &mut num_keys,
            &mut more_keys,
            &mut status,
        );
    }
    fits_check_status(status, hdu, file)?;

    let mut cards: Vec<Card> = Vec::with_capacity(num_keys as usize);
    let mut keyname = [0 as c_char; CARD_BUFFER_LEN];
    let mut value = [0 as c_char; CARD_BUFFER_LEN];
    let mut comment = [0 as c_char; CARD_BUFFER_LEN];
    for i_key in 1..=num_keys {
        keyname.fill(0);
        value.fill(0);
        comment.fill(0);
        unsafe {
            // ffgkyn = fits_read_keyn
            fitsio_sys::ffgkyn(
                fits_fptr.as_raw(),
                i_key,
                keyname.as_mut_ptr(),
                value.as_mut_ptr(),
                comment.as_mut_ptr(),
                &mut status,
            );
        }
        fits_check_status(status, hdu, file)?;

        let keyword = buffer_to_string(&keyname).trim().to_ascii_uppercase();
        let value = buffer_to_string(&value);
        let comment = buffer_to_string(&comment);

        if keyword == "CONTINUE" {
            let previous = cards.last_mut().and_then(|c| match &mut c.value {
                Some(HeaderValue::String(s)) if s.ends_with('&') => Some(s),
                _ => None,
            });
            let more = continued_string(&value).or_else(|| continued_string(&comment));
            if let (Some(previous), Some(more)) = (previous, more) {
                previous.pop();
                previous.push_str(&more);
                continue;
            }
        }

        if is_commentary_keyword(&keyword) {
            cards.push(Card::new(
                keyword,
                None,
                Some(comment.trim_end().to_string()),
            ));
        } else {
            let comment = comment.trim();
            cards.push(Card::new(
                keyword,
                HeaderValue::parse_fits(&value),
                if comment.is_empty() {
                    None
                } else {
                    Some(comment.to_string())
                },
            ));
        }
    }

    Ok(cards.into_iter().collect())
}

fn is_skipped_key(keyword: &str) -> bool {
    if SKIPPED_KEYS.contains(&keyword) {
        return true;
    }
    keyword
        .strip_prefix("NAXIS")
        .map(|axis| axis.parse::<usize>().is_ok())
        .unwrap_or(false)
}

/// Write the cards of `header` to a HDU. Keys describing the data layout
/// (`SIMPLE`, `BITPIX`, `NAXISn`, etc.) are left to cfitsio.
#[track_caller]
pub(crate) fn fits_write_header(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    file: &Path,
    header: &FitsHeader,
) -> Result<(), FitsError> {
    let to_cstring = |key: &str, s: &str| {
        CString::new(s).map_err(|_| FitsError::BadCard {
            key: key.to_string().into_boxed_str(),
            fits_filename: file.to_path_buf().into_boxed_path(),
        })
    };

    let mut status = 0;
    for card in header {
        let keyword = card.keyword.as_str();
        if is_skipped_key(keyword) {
            continue;
        }
        if keyword == "COMMENT"
            && card.comment.as_deref().map_or(false, |c| {
                CFITSIO_COMMENT_PREFIXES
                    .iter()
                    .any(|p| c.trim_start().starts_with(p))
            })
        {
            continue;
        }

        let comment = card
            .comment
            .as_deref()
            .map(|c| to_cstring(keyword, c))
            .transpose()?;
        let comment_ptr = comment.as_ref().map(|c| c.as_ptr()).unwrap_or(ptr::null());

        match keyword {
            "COMMENT" => unsafe {
                let text = to_cstring(keyword, card.comment.as_deref().unwrap_or(""))?;
                // ffpcom = fits_write_comment
                fitsio_sys::ffpcom(fits_fptr.as_raw(), text.as_ptr(), &mut status);
            },

            "HISTORY" => unsafe {
                let text = to_cstring(keyword, card.comment.as_deref().unwrap_or(""))?;
                // ffphis = fits_write_history
                fitsio_sys::ffphis(fits_fptr.as_raw(), text.as_ptr(), &mut status);
            },

            "" => unsafe {
                let record: String = format!(
                    "        {}",
                    card.comment.as_deref().unwrap_or("")
                )
                .chars()
                .take(80)
                .collect();
                let record = to_cstring(keyword, &record)?;
                // ffprec = fits_write_record
                fitsio_sys::ffprec(fits_fptr.as_raw(), record.as_ptr(), &mut status);
            },

            _ => {
                let key_name = to_cstring(keyword, keyword)?;
                match &card.value {
                    None => unsafe {
                        // ffukyu = fits_update_key_null
                        fitsio_sys::ffukyu(
                            fits_fptr.as_raw(),
                            key_name.as_ptr(),
                            comment_ptr,
                            &mut status,
                        );
                    },

                    Some(HeaderValue::Logical(b)) => unsafe {
                        // ffukyl = fits_update_key_log
                        fitsio_sys::ffukyl(
                            fits_fptr.as_raw(),
                            key_name.as_ptr(),
                            c_int::from(*b),
                            comment_ptr,
                            &mut status,
                        );
                    },

                    Some(HeaderValue::Integer(i)) => unsafe {
                        // ffukyj = fits_update_key_lng
                        fitsio_sys::ffukyj(
                            fits_fptr.as_raw(),
                            key_name.as_ptr(),
                            *i as _,
                            comment_ptr,
                            &mut status,
                        );
                    },

                    // cfitsio can't represent non-finite floats.
                    Some(HeaderValue::Float(f)) if !f.is_finite() => {
                        log::warn!(
                            "Not writing header key {keyword} to {}; its value ({f}) isn't finite",
                            file.display()
                        );
                    }

                    Some(HeaderValue::Float(f)) => unsafe {
                        // ffukyd = fits_update_key_dbl
                        fitsio_sys::ffukyd(
                            fits_fptr.as_raw(),
                            key_name.as_ptr(),
                            *f,
                            -15,
                            comment_ptr,
                            &mut status,
                        );
                    },

                    Some(HeaderValue::String(s)) if s.len() > MAX_SHORT_STRING_LEN => unsafe {
                        let value = to_cstring(keyword, s)?;
                        // ffpkls = fits_write_key_longstr
                        fitsio_sys::ffpkls(
                            fits_fptr.as_raw(),
                            key_name.as_ptr(),
                            value.as_ptr(),
                            comment_ptr,
                            &mut status,
                        );
                    },

                    Some(HeaderValue::String(s)) => unsafe {
                        let value = to_cstring(keyword, s)?;
                        // ffukys = fits_update_key_str
                        fitsio_sys::ffukys(
                            fits_fptr.as_raw(),
                            key_name.as_ptr(),
                            value.as_ptr(),
                            comment_ptr,
                            &mut status,
                        );
                    },
                }
            }
        }
        fits_check_status(status, hdu, file)?;
    }

    Ok(())
}
