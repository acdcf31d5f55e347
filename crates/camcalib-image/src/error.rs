/// An error type for the image module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// Error when channel and shape are not valid.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when two images are expected to share the same size.
    #[error("Image size mismatch ({0}x{1}) vs ({2}x{3})")]
    InvalidImageSize(usize, usize, usize, usize),

    /// Error when the pixel coordinates are out of bounds.
    #[error("Pixel coordinates ({0}, {1}) are out of bounds ({2}, {3})")]
    PixelIndexOutOfBounds(usize, usize, usize, usize),

    /// Error when the channel index is out of bounds.
    #[error("Channel index ({0}) is out of bounds ({1})")]
    ChannelIndexOutOfBounds(usize, usize),

    /// Error when a crop region falls outside of the image.
    #[error("Crop region ({0}, {1}, {2}x{3}) exceeds the image bounds")]
    InvalidCropRegion(usize, usize, usize, usize),

    /// Error when the pixel data cannot be cast.
    #[error("Failed to cast image data")]
    CastError,
}
