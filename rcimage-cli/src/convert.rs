use image::{ColorType, DynamicImage, ImageFormat, RgbImage, RgbaImage};
use log::debug;
use rcimage::{
    compose::{compose, split_alpha, ComposeError},
    container::{self, ReadError, WriteError},
    Cipher, RcImage,
};
use snafu::{OptionExt, ResultExt, Snafu};
use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Snafu)]
pub enum ConvertError {
    #[snafu(display("failed to read `{}`: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to write `{}`: {source}", path.display()))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("`{}`: {source}", path.display()))]
    Container { path: PathBuf, source: ReadError },

    #[snafu(display("`{}`: {source}", path.display()))]
    Pack { path: PathBuf, source: WriteError },

    #[snafu(display("`{}`: {source}", path.display()))]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },

    #[snafu(display("`{}`: {source}", path.display()))]
    Compose { path: PathBuf, source: ComposeError },

    #[snafu(display("`{}`: alpha mask is not a palette image", path.display()))]
    CompanionNotPalette { path: PathBuf },

    #[snafu(display(
        "`{}`: unsupported pixel format {color:?}, expected 24-bit RGB or 32-bit RGBA",
        path.display()
    ))]
    UnsupportedPixelFormat { path: PathBuf, color: ColorType },

    #[snafu(display("`{}`: pixel data doesn't match {width}x{height}", path.display()))]
    BufferSize {
        path: PathBuf,
        width: u32,
        height: u32,
    },
}

/// `name.rct` -> `name_.rc8`
pub fn companion_path(path: &Path) -> Option<PathBuf> {
    let ext = path.extension()?;
    if !ext.eq_ignore_ascii_case("rct") {
        return None;
    }

    let mut name = OsString::from(path.file_stem()?);
    name.push("_.rc8");
    Some(path.with_file_name(name))
}

fn open_container(path: &Path, cipher: Option<&Cipher>) -> Result<RcImage, ConvertError> {
    let data = fs::read(path).context(ReadFileSnafu { path })?;
    container::read_from_slice(&data, cipher).context(ContainerSnafu { path })
}

fn save_container(
    path: PathBuf,
    image: &RcImage,
    cipher: Option<&Cipher>,
) -> Result<PathBuf, ConvertError> {
    let data = container::write_to_vec(image, cipher).context(PackSnafu { path: &path })?;
    fs::write(&path, data).context(WriteFileSnafu { path: &path })?;
    Ok(path)
}

/// Converts a container to PNG, merging in its alpha mask if there is one. Returns the path
/// written.
pub fn extract(path: &Path, cipher: Option<&Cipher>) -> Result<PathBuf, ConvertError> {
    let image = open_container(path, cipher)?;
    let output = path.with_extension("png");

    let companion = companion_path(path).filter(|companion| companion.exists());

    match (image, companion) {
        (RcImage::TrueColor(color), Some(companion)) => {
            debug!("merging alpha mask `{}`", companion.display());
            let RcImage::Palette(alpha) = open_container(&companion, cipher)? else {
                return CompanionNotPaletteSnafu { path: companion }.fail();
            };

            let rgba = compose(&color, &alpha).context(ComposeSnafu { path })?;
            let (width, height) = (color.width, color.height);
            RgbaImage::from_vec(width, height, rgba)
                .context(BufferSizeSnafu {
                    path,
                    width,
                    height,
                })?
                .save_with_format(&output, ImageFormat::Png)
                .context(ImageSnafu { path: &output })?;
        }
        (image, _) => {
            let header = image.header();
            RgbImage::from_vec(header.width, header.height, image.to_rgb())
                .context(BufferSizeSnafu {
                    path,
                    width: header.width,
                    height: header.height,
                })?
                .save_with_format(&output, ImageFormat::Png)
                .context(ImageSnafu { path: &output })?;
        }
    }

    Ok(output)
}

/// Converts a PNG to `name.rct`, plus `name_.rc8` if it has an alpha channel. Returns the paths
/// written.
pub fn pack(path: &Path, cipher: Option<&Cipher>) -> Result<Vec<PathBuf>, ConvertError> {
    let image = image::io::Reader::open(path)
        .context(ReadFileSnafu { path })?
        .with_guessed_format()
        .context(ReadFileSnafu { path })?
        .decode()
        .context(ImageSnafu { path })?;

    let (width, height) = (image.width(), image.height());
    debug!("{width}x{height} {:?} image", image.color());

    let color_path = path.with_extension("rct");

    match image {
        DynamicImage::ImageRgb8(rgb) => {
            let color = RcImage::TrueColor(rcimage::TrueColorImage::from_rgb(
                width,
                height,
                rgb.into_raw(),
            ));
            Ok(vec![save_container(color_path, &color, cipher)?])
        }
        DynamicImage::ImageRgba8(rgba) => {
            let (color, alpha) =
                split_alpha(width, height, rgba.as_raw()).context(ComposeSnafu { path })?;

            let mut alpha_name = OsString::from(path.file_stem().unwrap_or_default());
            alpha_name.push("_.rc8");
            let alpha_path = path.with_file_name(alpha_name);

            Ok(vec![
                save_container(color_path, &RcImage::TrueColor(color), cipher)?,
                save_container(alpha_path, &RcImage::Palette(alpha), None)?,
            ])
        }
        other => UnsupportedPixelFormatSnafu {
            path,
            color: other.color(),
        }
        .fail(),
    }
}
