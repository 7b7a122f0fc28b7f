//! Correction of the EXIF orientation flag.

use image::DynamicImage;
use tracing::debug;

/// Rotation and mirroring needed to display an image stored with the given
/// orientation flag upright. Rotation (clockwise degrees) is applied first.
fn transforms(orientation: u32) -> (Option<u16>, bool, bool) {
    match orientation {
        2 => (None, true, false),
        3 => (Some(180), false, false),
        4 => (None, false, true),
        5 => (Some(90), true, false),
        6 => (Some(90), false, false),
        7 => (Some(270), true, false),
        8 => (Some(270), false, false),
        _ => (None, false, false),
    }
}

/// Return `img` transformed so it displays upright. Flag 1, a missing flag
/// and out-of-range values leave the image untouched.
pub fn apply(img: DynamicImage, orientation: Option<u32>) -> DynamicImage {
    let Some(orientation) = orientation else {
        return img;
    };
    let (rotate, flip_h, flip_v) = transforms(orientation);
    if rotate.is_none() && !flip_h && !flip_v {
        return img;
    }

    debug!(orientation, rotate = ?rotate, flip_h, flip_v, "applying EXIF orientation");

    let img = match rotate {
        Some(90) => img.rotate90(),
        Some(180) => img.rotate180(),
        Some(270) => img.rotate270(),
        _ => img,
    };
    let img = if flip_h { img.fliph() } else { img };
    if flip_v { img.flipv() } else { img }
}
