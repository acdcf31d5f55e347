use std::path::Path;

use camcalib_image::{Image, ImageSize};

use crate::error::IoError;

/// Reads an image from the given file path and converts it to 8-bit grayscale.
///
/// The method tries to read from any image format supported by the image crate.
///
/// # Arguments
///
/// * `file_path` - The path to a valid image file.
///
/// # Returns
///
/// A grayscale image with a single channel (mono8).
///
/// # Errors
///
/// Returns an error if the file does not exist or cannot be decoded.
pub fn read_image_any_gray8(file_path: impl AsRef<Path>) -> Result<Image<u8, 1>, IoError> {
    let img = decode_any_impl(file_path)?;
    let size = ImageSize {
        width: img.width() as usize,
        height: img.height() as usize,
    };
    Ok(Image::new(size, img.into_luma8().into_raw())?)
}

/// Reads an image from the given file path and converts it to 8-bit RGB.
///
/// # Arguments
///
/// * `file_path` - The path to a valid image file.
///
/// # Returns
///
/// A RGB image with three channels (rgb8).
///
/// # Errors
///
/// Returns an error if the file does not exist or cannot be decoded.
pub fn read_image_any_rgb8(file_path: impl AsRef<Path>) -> Result<Image<u8, 3>, IoError> {
    let img = decode_any_impl(file_path)?;
    let size = ImageSize {
        width: img.width() as usize,
        height: img.height() as usize,
    };
    Ok(Image::new(size, img.into_rgb8().into_raw())?)
}

// maps the file to memory and decodes it with the format guessed from its content
fn decode_any_impl(file_path: impl AsRef<Path>) -> Result<image::DynamicImage, IoError> {
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    let file = std::fs::File::open(file_path)?;
    let mmap = unsafe { memmap2::Mmap::map(&file)? };

    let img = image::ImageReader::new(std::io::Cursor::new(&mmap[..]))
        .with_guessed_format()?
        .decode()?;

    Ok(img)
}
