//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate for single-band TIFF I/O with the minimal GeoTIFF
//! tag set (ModelPixelScale + ModelTiepoint). Label products are written
//! LZW-compressed by default, matching the upstream mode/classification
//! toolchain.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{ColorType, Gray32, Gray32Float, Gray8};
use tiff::encoder::compression::{Compression, Deflate, Lzw, Uncompressed};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;


/// Options for writing GeoTIFF files
#[derive(Debug, Clone)]
pub struct GeoTiffOptions {
    /// Compression: "LZW", "DEFLATE" or "NONE"
    pub compression: String,
}

impl Default for GeoTiffOptions {
    fn default() -> Self {
        Self {
            compression: "LZW".to_string(),
        }
    }
}

/// Read band 1 of a GeoTIFF file into a Raster.
///
/// Native reader with limited GeoTIFF metadata support: the geotransform is
/// recovered from the pixel-scale and tiepoint tags when present, otherwise
/// the raster keeps the default transform.
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;

    let mut decoder =
        Decoder::new(file).map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let data: Vec<T> = match result {
        DecodingResult::U8(buf) => cast_buffer(&buf),
        DecodingResult::U16(buf) => cast_buffer(&buf),
        DecodingResult::U32(buf) => cast_buffer(&buf),
        DecodingResult::I8(buf) => cast_buffer(&buf),
        DecodingResult::I16(buf) => cast_buffer(&buf),
        DecodingResult::I32(buf) => cast_buffer(&buf),
        DecodingResult::F32(buf) => cast_buffer(&buf),
        DecodingResult::F64(buf) => cast_buffer(&buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Ok(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }

    Ok(raster)
}

fn cast_buffer<S, T>(buf: &[S]) -> Vec<T>
where
    S: Copy + num_traits::NumCast,
    T: RasterElement,
{
    buf.iter()
        .map(|&v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
        .collect()
}

/// Attempt to read a GeoTransform from TIFF tags
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| Error::Other("No pixel scale tag".into()))?;

    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| Error::Other("No tiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z]; scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        let pixel_width = scale[0];
        let pixel_height = -scale[1]; // Negative for north-up

        return Ok(GeoTransform::new(
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        ));
    }

    Err(Error::Other("Cannot determine geotransform".into()))
}

/// Write a Raster as a single-band GeoTIFF.
///
/// Integer rasters are written as 8-bit or 32-bit grayscale depending on the
/// element width; float rasters as 32-bit float. The source raster's
/// geotransform is carried over via the standard GeoTIFF tags.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: &GeoTiffOptions) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut encoder =
        TiffEncoder::new(file).map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = raster.shape();
    let gt = *raster.transform();

    if T::is_float() {
        let data: Vec<f32> = raster
            .data()
            .iter()
            .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
            .collect();
        write_band::<Gray32Float, _>(&mut encoder, cols, rows, &gt, &options.compression, &data)
    } else if std::mem::size_of::<T>() == 1 {
        let data: Vec<u8> = raster
            .data()
            .iter()
            .map(|&v| num_traits::cast(v).unwrap_or(0))
            .collect();
        write_band::<Gray8, _>(&mut encoder, cols, rows, &gt, &options.compression, &data)
    } else {
        let data: Vec<u32> = raster
            .data()
            .iter()
            .map(|&v| num_traits::cast(v).unwrap_or(0))
            .collect();
        write_band::<Gray32, _>(&mut encoder, cols, rows, &gt, &options.compression, &data)
    }
}

fn write_band<C, W>(
    encoder: &mut TiffEncoder<W>,
    cols: usize,
    rows: usize,
    transform: &GeoTransform,
    compression: &str,
    data: &[C::Inner],
) -> Result<()>
where
    C: ColorType,
    [C::Inner]: TiffValue,
    W: std::io::Write + std::io::Seek,
{
    match compression.to_ascii_uppercase().as_str() {
        "LZW" => encode_band::<C, _, W>(encoder, cols, rows, transform, Lzw, data),
        "DEFLATE" => encode_band::<C, _, W>(encoder, cols, rows, transform, Deflate::default(), data),
        "NONE" => encode_band::<C, _, W>(encoder, cols, rows, transform, Uncompressed, data),
        other => Err(Error::InvalidParameter {
            name: "compression",
            value: other.to_string(),
            reason: "expected LZW, DEFLATE or NONE".to_string(),
        }),
    }
}

fn encode_band<C, D, W>(
    encoder: &mut TiffEncoder<W>,
    cols: usize,
    rows: usize,
    transform: &GeoTransform,
    compression: D,
    data: &[C::Inner],
) -> Result<()>
where
    C: ColorType,
    D: Compression,
    [C::Inner]: TiffValue,
    W: std::io::Write + std::io::Seek,
{
    let mut image = encoder
        .new_image_with_compression::<C, D>(cols as u32, rows as u32, compression)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    // ModelPixelScaleTag
    let scale = vec![transform.pixel_width, transform.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, scale.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;

    // ModelTiepointTag
    let tiepoint = vec![0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, tiepoint.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

    // Minimal GeoKeyDirectory so downstream tools recognize the output as a
    // GeoTIFF. GTModelTypeGeoKey=1 (Projected), GTRasterTypeGeoKey=1
    // (RasterPixelIsArea).
    let geokeys: Vec<u16> = vec![
        1, 1, 0, 2, // Version 1.1.0, 2 keys
        1024, 0, 1, 1,
        1025, 0, 1, 1,
    ];
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, geokeys.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write geokey tag: {}", e)))?;

    image
        .write_data(data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}
