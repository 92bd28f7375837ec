// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Header translation between the conventions of the input data and those
//! SWarp reads and writes.

use chrono::Utc;
use log::{debug, trace, warn};
use ndarray::{ArrayD, Axis};

use super::{Card, FitsHeader, HeaderError, HeaderValue};

/// Prefixes of WCS keywords that refer to a single axis, e.g. `CRPIX3`.
const AXIS_KEY_PREFIXES: [&str; 7] = [
    "NAXIS", "CRPIX", "CRVAL", "CDELT", "CTYPE", "CUNIT", "CROTA",
];

/// Keys describing the spectral axis of a cube.
const SPECTRAL_AXIS_KEYS: [&str; 6] = ["CTYPE3", "CRVAL3", "CRPIX3", "CDELT3", "CUNIT3", "CROTA3"];

/// Keys that describe the array itself rather than what is in it.
const STRUCTURAL_KEYS: [&str; 6] = ["SIMPLE", "BITPIX", "NAXIS", "EXTEND", "BSCALE", "BZERO"];

/// Celestial keys that SWarp computes for the mosaic.
const MOSAIC_CELESTIAL_KEYS: [&str; 5] = ["WCSAXES", "LONPOLE", "LATPOLE", "EQUINOX", "RADESYS"];

/// Which spatial axis is kept when making a position-velocity header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialAxis {
    One,
    Two,
}

impl SpatialAxis {
    fn number(self) -> usize {
        match self {
            SpatialAxis::One => 1,
            SpatialAxis::Two => 2,
        }
    }
}

/// The kind of 2D header to make from a (possibly higher-dimensional) header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderFormat {
    /// Position-position: axes 1 and 2 are kept.
    PositionPosition,

    /// Position-velocity: the chosen spatial axis becomes axis 1, and the
    /// spectral axis (3) becomes axis 2.
    PositionVelocity { keep_axis: SpatialAxis },
}

impl HeaderFormat {
    fn kept_axes(self) -> [usize; 2] {
        match self {
            HeaderFormat::PositionPosition => [1, 2],
            HeaderFormat::PositionVelocity { keep_axis } => [keep_axis.number(), 3],
        }
    }
}

/// If this keyword is a WCS keyword tied to particular axes, return those
/// axes. e.g. `CRPIX3` -> `[3]`, `PC1_2` -> `[1, 2]`, `PV2_1` -> `[2]`.
fn wcs_key_axes(keyword: &str) -> Option<Vec<usize>> {
    for prefix in AXIS_KEY_PREFIXES {
        if let Some(rest) = keyword.strip_prefix(prefix) {
            return rest.parse().ok().map(|axis| vec![axis]);
        }
    }

    for prefix in ["PC", "CD", "PV", "PS"] {
        if let Some(rest) = keyword.strip_prefix(prefix) {
            let (i, j) = rest.split_once('_')?;
            let i: usize = i.parse().ok()?;
            let j: usize = j.parse().ok()?;
            return match prefix {
                // The second index of PV and PS keys is a parameter number.
                "PV" | "PS" => Some(vec![i]),
                _ => Some(vec![i, j]),
            };
        }
    }

    None
}

/// Is `keyword` an element of a `PC` or `CD` matrix coupling only the two
/// spatial axes?
fn is_spatial_matrix_key(keyword: &str) -> bool {
    ["PC", "CD"].into_iter().any(|prefix| {
        keyword
            .strip_prefix(prefix)
            .and_then(|rest| rest.split_once('_'))
            .and_then(|(i, j)| Some((i.parse::<usize>().ok()?, j.parse::<usize>().ok()?)))
            .map(|(i, j)| (1..=2).contains(&i) && (1..=2).contains(&j))
            .unwrap_or(false)
    })
}

/// The name of the user running this program.
fn user_name() -> String {
    ["USER", "LOGNAME", "USERNAME"]
        .into_iter()
        .find_map(|var| std::env::var(var).ok().filter(|s| !s.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// The name of the machine running this program.
fn host_name() -> String {
    if let Ok(hostname) = std::fs::read_to_string("/proc/sys/kernel/hostname") {
        let hostname = hostname.trim();
        if !hostname.is_empty() {
            return hostname.to_string();
        }
    }
    ["HOSTNAME", "COMPUTERNAME"]
        .into_iter()
        .find_map(|var| std::env::var(var).ok().filter(|s| !s.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn write_provenance(header: &mut FitsHeader) {
    header.set("AUTHOR", user_name());
    header.set("ORIGIN", host_name());
    header.set_with_comment(
        "DATE",
        Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
        "(GMT)",
    );
}

/// Make a new 2D header from `header`.
///
/// `SIMPLE` and `BITPIX` must be present. The WCS keys (`NAXIS`, `CRPIX`,
/// `CRVAL`, `CDELT`, `CUNIT`, `CROTA`, and `CTYPE` for position-position data)
/// of the kept axes are renumbered as axes 1 and 2; keys that aren't in
/// `header` are simply left out. A diagonal `CD` matrix entry of a kept axis
/// is used as that axis's `CDELT`.
///
/// `AUTHOR`, `ORIGIN` and `DATE` keys are added, followed by `comments` (as
/// `COMMENT` cards) and finally `extra_keys`.
pub fn change_header(
    header: &FitsHeader,
    format: HeaderFormat,
    comments: &[String],
    extra_keys: &[(String, HeaderValue)],
) -> Result<FitsHeader, HeaderError> {
    let mut new = FitsHeader::new();
    for key in ["SIMPLE", "BITPIX"] {
        new.set_card(header.required_card(key)?.clone());
    }

    new.set("NAXIS", 2);
    new.set("WCSAXES", 2);

    let kept_axes = format.kept_axes();
    let mut prefixes = vec!["NAXIS", "CRPIX", "CRVAL", "CDELT", "CUNIT", "CROTA"];
    match format {
        HeaderFormat::PositionPosition => prefixes.push("CTYPE"),
        HeaderFormat::PositionVelocity { .. } => {
            new.set("CTYPE1", "        ");
            new.set("CTYPE2", "        ");
        }
    }

    for prefix in prefixes {
        for (i_new, axis) in kept_axes.iter().enumerate() {
            if let Some(card) = header.card(&format!("{prefix}{axis}")) {
                new.set_card(Card {
                    keyword: format!("{prefix}{}", i_new + 1),
                    ..card.clone()
                });
            }
        }
    }

    for (i_new, axis) in kept_axes.iter().enumerate() {
        if let Some(value) = header.get(&format!("CD{axis}_{axis}")) {
            new.set(&format!("CDELT{}", i_new + 1), value.clone());
        }
    }

    write_provenance(&mut new);
    update_header(&mut new, comments, &[], extra_keys, false, false);

    Ok(new)
}

/// Update a header in place.
///
/// Old `COMMENT` cards are removed first if `remove_old_comments` is set,
/// then `remove_keys` are removed and `update_keys` set. `AUTHOR`, `ORIGIN`
/// and `DATE` are updated if `write_meta` is set, and `comments` are appended
/// last.
pub fn update_header(
    header: &mut FitsHeader,
    comments: &[String],
    remove_keys: &[String],
    update_keys: &[(String, HeaderValue)],
    remove_old_comments: bool,
    write_meta: bool,
) {
    if remove_old_comments {
        header.remove("COMMENT");
    }

    for key in remove_keys {
        if header.remove(key).is_some() {
            trace!("Removed header key {key}");
        }
    }

    for (key, value) in update_keys {
        header.set(key, value.clone());
    }

    if write_meta {
        write_provenance(header);
    }

    for comment in comments {
        header.add_comment(comment);
    }
}

/// Remove extra axes (Stokes, etc.) from a data array and its header, so that
/// the array has no more than `max_dim` dimensions. Only leading axes of
/// length 1 can be removed (these are the highest-numbered FITS axes). The WCS
/// keys of removed axes are dropped from the header.
pub fn remove_additional_axes(
    mut data: ArrayD<f32>,
    mut header: FitsHeader,
    max_dim: usize,
) -> Result<(ArrayD<f32>, FitsHeader), HeaderError> {
    let naxis = header.naxis()?;
    if naxis <= max_dim && data.ndim() <= max_dim {
        return Ok((data, header));
    }

    warn!("Removing additional axes (Stokes, etc.) from cube and header");
    while data.ndim() > max_dim {
        let length = data.len_of(Axis(0));
        if length != 1 {
            return Err(HeaderError::NonSingletonAxis {
                fits_axis: data.ndim(),
                length,
            });
        }
        data = data.index_axis_move(Axis(0), 0);
    }

    let remove_keys: Vec<String> = header
        .keywords()
        .filter(|key| {
            wcs_key_axes(key)
                .map(|axes| axes.into_iter().any(|a| a > max_dim))
                .unwrap_or(false)
        })
        .map(|key| key.to_string())
        .collect();
    debug!("Removing header keys {remove_keys:?}");

    let mut update_keys = vec![("NAXIS".to_string(), HeaderValue::from(max_dim))];
    if header.get_i64("WCSAXES")?.unwrap_or(0) > max_dim as i64 {
        update_keys.push(("WCSAXES".to_string(), HeaderValue::from(max_dim)));
    }
    update_header(&mut header, &[], &remove_keys, &update_keys, false, false);

    Ok((data, header))
}

/// Replace the `CDi_j` matrix of the spatial axes with `CDELTi` keys and, if
/// the matrix has off-diagonal terms, a `PCi_j` matrix.
///
/// Each `CDELTi` is the length of row `i` of the CD matrix, carrying the sign
/// of the diagonal term, so that `CD = diag(CDELT) * PC`.
pub fn cd_to_cdelt(header: &mut FitsHeader) -> Result<(), HeaderError> {
    let mut cd = [[0.0; 2]; 2];
    let mut any = false;
    for (i, row) in cd.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            if let Some(value) = header.get_f64(&format!("CD{}_{}", i + 1, j + 1))? {
                *v = value;
                any = true;
            }
        }
    }
    if !any {
        return Ok(());
    }

    let has_rotation = cd[0][1] != 0.0 || cd[1][0] != 0.0;
    for (i, row) in cd.iter().enumerate() {
        let norm = row[0].hypot(row[1]);
        let cdelt = if row[i] < 0.0 { -norm } else { norm };
        header.set(&format!("CDELT{}", i + 1), cdelt);
        if has_rotation {
            for (j, v) in row.iter().enumerate() {
                let pc = if cdelt == 0.0 { 0.0 } else { v / cdelt };
                header.set(&format!("PC{}_{}", i + 1, j + 1), pc);
            }
        }
    }

    for i in 1..=2 {
        for j in 1..=2 {
            header.remove(&format!("CD{i}_{j}"));
        }
    }

    Ok(())
}

/// Copy the spectral-axis keys (`CTYPE3`, `CRVAL3`, `CRPIX3`, `CDELT3`,
/// `CUNIT3`, `CROTA3`) of `reference` into `header`.
pub fn add_spectral_axis_keys(header: &mut FitsHeader, reference: &FitsHeader) {
    for key in SPECTRAL_AXIS_KEYS {
        if let Some(card) = reference.card(key) {
            header.set_card(card.clone());
        }
    }
}

/// Keys that [`restore_header_keys`] never touches. These describe the data
/// array, or the spatial geometry of the mosaic that SWarp has calculated.
fn is_protected_key(keyword: &str) -> bool {
    if STRUCTURAL_KEYS.contains(&keyword) || MOSAIC_CELESTIAL_KEYS.contains(&keyword) {
        return true;
    }

    if keyword.starts_with("NAXIS") {
        return true;
    }

    match wcs_key_axes(keyword) {
        Some(axes) => axes.iter().all(|&a| a == 1 || a == 2),
        None => false,
    }
}

/// Restore keys of `reference` (the header of the input data, before SWarp
/// saw it) into `header` (the header SWarp wrote).
///
/// Every non-commentary card of `reference` is set in `header` with its
/// original value and comment, unless it is listed in `remove_keys` or
/// describes the array or the mosaic's spatial geometry (e.g. `NAXIS1`,
/// `CRPIX2`, `CD1_1`). Commentary cards of `reference` that `header` doesn't
/// have are appended. Anything in `remove_keys` is also taken out of `header`.
pub fn restore_header_keys(
    header: &FitsHeader,
    reference: &FitsHeader,
    remove_keys: &[String],
) -> FitsHeader {
    let remove_keys: Vec<String> = remove_keys
        .iter()
        .map(|k| k.trim().to_ascii_uppercase())
        .collect();
    let mut restored = header.clone();

    for card in reference {
        if remove_keys.contains(&card.keyword) {
            continue;
        }

        if card.is_commentary() {
            let already_there = restored
                .cards()
                .iter()
                .any(|c| c.keyword == card.keyword && c.comment == card.comment);
            if !already_there {
                restored.set_card(card.clone());
            }
            continue;
        }

        if is_protected_key(&card.keyword) {
            continue;
        }

        if restored.card(&card.keyword) != Some(card) {
            trace!("Restoring header key {}", card.keyword);
            restored.set_card(card.clone());
        }
    }

    for key in &remove_keys {
        restored.remove(key);
    }

    restored
}

/// Convert an old-style `CROTAi` rotation into a `PCi_j` matrix. Nothing
/// happens if there's no `CROTA` key, or if the header already has a spatial
/// `PC` or `CD` matrix (in which case `CROTA` keys are just dropped). Any remaining
/// `CD` matrix is converted to `CDELT` + `PC` form.
pub fn crota_to_pc(header: &mut FitsHeader) -> Result<(), HeaderError> {
    cd_to_cdelt(header)?;

    let rotation = match header.get_f64("CROTA2")? {
        Some(r) => Some(r),
        None => header.get_f64("CROTA1")?,
    };
    let rotation = match rotation {
        Some(r) => r,
        None => return Ok(()),
    };

    let has_matrix = header.keywords().any(is_spatial_matrix_key);
    if !has_matrix {
        let (cdelt1, cdelt2) = match (header.get_f64("CDELT1")?, header.get_f64("CDELT2")?) {
            (Some(c1), Some(c2)) => (c1, c2),
            _ => {
                warn!("Header has a CROTA key but no CDELT1/CDELT2; leaving the rotation alone");
                return Ok(());
            }
        };
        let (sin, cos) = rotation.to_radians().sin_cos();
        let (ratio12, ratio21) = if cdelt1 == 0.0 || cdelt2 == 0.0 {
            (0.0, 0.0)
        } else {
            (cdelt2 / cdelt1, cdelt1 / cdelt2)
        };
        header.set("PC1_1", cos);
        header.set("PC1_2", -sin * ratio12);
        header.set("PC2_1", sin * ratio21);
        header.set("PC2_2", cos);
    }

    header.remove("CROTA1");
    header.remove("CROTA2");

    Ok(())
}
