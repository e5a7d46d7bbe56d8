//! Streamed GeoTIFF output.
//!
//! A raster moves through three handle types before it is closed:
//!
//! ```text
//! RasterFile --set_georeference--> GeoreferencedRaster --allocate_bands--> BandWriter --finish
//! ```
//!
//! Scanlines go out one strip per row, north row first, so the file never
//! needs the whole image in memory. Neither compression choice produces tiles.
//! Each row is compressed into a scratch buffer and written as raw strip data
//! on the image directory, which then records the strip offsets and byte
//! counts itself.

use std::fs::File;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};

use surface_common::{Compression, GeoBounds, OutputMode};
use tiff::encoder::compression::{CompressionAlgorithm, Lzw, Packbits};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKindStandard};
use tiff::tags::{
    CompressionMethod, PhotometricInterpretation, PlanarConfiguration, SampleFormat, Tag,
};
use tiff::TiffError;
use tracing::{debug, info};

use crate::palette::Rgba;
use crate::{RasterError, RasterResult};

const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
const MODEL_TIEPOINT_TAG: u16 = 33922;
const GEO_KEY_DIRECTORY_TAG: u16 = 34735;
const GEO_ASCII_PARAMS_TAG: u16 = 34737;
const GDAL_NODATA_TAG: u16 = 42113;

/// Horizontal WGS84 geographic with an ellipsoidal vertical axis in meters.
pub const COMPOUND_WKT: &str = "COMPD_CS[\"WGS84 with WGS84E Z\",GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563,AUTHORITY[\"EPSG\",\"7030\"]],TOWGS84[0,0,0,0,0,0,0],AUTHORITY[\"EPSG\",\"6326\"]],PRIMEM[\"Greenwich\",0,AUTHORITY[\"EPSG\",\"8901\"]],UNIT[\"degree\",0.01745329251994328,AUTHORITY[\"EPSG\",\"9108\"]],AXIS[\"Lat\",NORTH],AXIS[\"Long\",EAST],AUTHORITY[\"EPSG\",\"4326\"]],VERT_CS[\"ellipsoid Z in meters\",VERT_DATUM[\"Ellipsoid\",2002],UNIT[\"metre\",1],AXIS[\"Z\",UP]]]";

const GEOG_CITATION: &str = "WGS 84";
const VERTICAL_CITATION: &str = "ellipsoid Z in meters";

/// Layout of the raster to create.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterSpec {
    pub width: usize,
    pub height: usize,
    pub mode: OutputMode,
    pub compression: Compression,
    /// Declared as band no-data for grey output
    pub null_value: f32,
}

/// Placement of the raster on the WGS84 grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoReference {
    /// Snapped window extent; the tie point is its north-west corner
    pub bounds: GeoBounds,
    pub x_cell_degrees: f64,
    pub y_cell_degrees: f64,
}

impl GeoReference {
    /// GDAL-style affine transform `[west, dx, 0, north, 0, -dy]`.
    pub fn geo_transform(&self) -> [f64; 6] {
        [
            self.bounds.west,
            self.x_cell_degrees,
            0.0,
            self.bounds.north,
            0.0,
            -self.y_cell_degrees,
        ]
    }
}

/// What a closed raster produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSummary {
    pub path: PathBuf,
    pub width: usize,
    pub height: usize,
    pub rows_written: usize,
    /// Rows written blank in place of a rejected scanline
    pub rows_blanked: usize,
}

/// Normalize an output name to carry a `.tif` extension.
pub fn normalize_output_path(path: &Path) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tif") => path.to_path_buf(),
        _ => path.with_extension("tif"),
    }
}

/// An open output with its TIFF header written.
pub struct RasterFile<W: Write + Seek = File> {
    path: PathBuf,
    spec: RasterSpec,
    encoder: TiffEncoder<W>,
}

impl RasterFile<File> {
    /// Create the output file. The extension is forced to `.tif`.
    pub fn create(path: impl AsRef<Path>, spec: RasterSpec) -> RasterResult<Self> {
        let path = normalize_output_path(path.as_ref());
        let file = File::create(&path).map_err(|source| RasterError::Create {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_writer(file, path, spec)
    }
}

impl<W: Write + Seek> RasterFile<W> {
    /// Start a raster on an already open writer. `path` labels the output in
    /// summaries and logs.
    pub fn from_writer(writer: W, path: impl Into<PathBuf>, spec: RasterSpec) -> RasterResult<Self> {
        let path = path.into();
        let encoder = TiffEncoder::new(writer)?;

        debug!(path = %path.display(), width = spec.width, height = spec.height, "Created raster file");

        Ok(Self {
            path,
            spec,
            encoder,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Attach the geographic placement.
    pub fn set_georeference(self, geo: GeoReference) -> GeoreferencedRaster<W> {
        GeoreferencedRaster {
            path: self.path,
            spec: self.spec,
            encoder: self.encoder,
            geo,
        }
    }
}

/// A raster with its placement fixed, ready for band allocation.
pub struct GeoreferencedRaster<W: Write + Seek = File> {
    path: PathBuf,
    spec: RasterSpec,
    encoder: TiffEncoder<W>,
    geo: GeoReference,
}

impl<W: Write + Seek> GeoreferencedRaster<W> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn spec(&self) -> &RasterSpec {
        &self.spec
    }

    pub fn georeference(&self) -> &GeoReference {
        &self.geo
    }

    /// Allocate the image bands and write every image and georeferencing tag.
    pub fn allocate_bands(&mut self) -> RasterResult<BandWriter<'_, W>> {
        let layout = BandLayout::from_mode(self.spec.mode);
        let mut dir = self.encoder.image_directory()?;

        write_image_tags(&mut dir, &self.spec, layout)?;
        let nodata = match layout {
            BandLayout::Grey => Some(self.spec.null_value),
            BandLayout::Rgb | BandLayout::Rgba => None,
        };
        write_geo_tags(&mut dir, &self.geo, nodata)?;

        info!(
            path = %self.path.display(),
            bands = self.spec.mode.band_count(),
            compression = ?self.spec.compression,
            "Allocated raster bands"
        );

        let row_bytes = self.spec.width * layout.bytes_per_pixel();
        Ok(BandWriter {
            dir,
            layout,
            compression: self.spec.compression,
            path: self.path.clone(),
            width: self.spec.width,
            height: self.spec.height,
            null_value: self.spec.null_value,
            rows_written: 0,
            rows_blanked: 0,
            strip_offsets: Vec::with_capacity(self.spec.height),
            strip_byte_counts: Vec::with_capacity(self.spec.height),
            raw_buf: Vec::with_capacity(row_bytes),
            strip_buf: Vec::with_capacity(row_bytes),
        })
    }
}

/// Sample layout of the allocated bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BandLayout {
    Grey,
    Rgb,
    Rgba,
}

impl BandLayout {
    fn from_mode(mode: OutputMode) -> Self {
        match mode {
            OutputMode::Grey => BandLayout::Grey,
            OutputMode::Color { transparent: false } => BandLayout::Rgb,
            OutputMode::Color { transparent: true } => BandLayout::Rgba,
        }
    }

    fn mode_name(self) -> &'static str {
        match self {
            BandLayout::Grey => "grey",
            BandLayout::Rgb => "RGB",
            BandLayout::Rgba => "RGBA",
        }
    }

    fn samples(self) -> usize {
        match self {
            BandLayout::Grey => 1,
            BandLayout::Rgb => 3,
            BandLayout::Rgba => 4,
        }
    }

    fn bytes_per_pixel(self) -> usize {
        match self {
            BandLayout::Grey => 4,
            BandLayout::Rgb => 3,
            BandLayout::Rgba => 4,
        }
    }

    fn bits_per_sample(self) -> u16 {
        match self {
            BandLayout::Grey => 32,
            BandLayout::Rgb | BandLayout::Rgba => 8,
        }
    }

    fn sample_format(self) -> SampleFormat {
        match self {
            BandLayout::Grey => SampleFormat::IEEEFP,
            BandLayout::Rgb | BandLayout::Rgba => SampleFormat::Uint,
        }
    }

    fn photometric(self) -> PhotometricInterpretation {
        match self {
            BandLayout::Grey => PhotometricInterpretation::BlackIsZero,
            BandLayout::Rgb | BandLayout::Rgba => PhotometricInterpretation::RGB,
        }
    }
}

fn compression_method(compression: Compression) -> CompressionMethod {
    match compression {
        Compression::Lzw => CompressionMethod::LZW,
        Compression::PackBits => CompressionMethod::PackBits,
    }
}

fn write_image_tags<W: Write + Seek>(
    dir: &mut DirectoryEncoder<'_, W, TiffKindStandard>,
    spec: &RasterSpec,
    layout: BandLayout,
) -> RasterResult<()> {
    let width = u32::try_from(spec.width).map_err(TiffError::from)?;
    let height = u32::try_from(spec.height).map_err(TiffError::from)?;
    let samples = layout.samples();

    dir.write_tag(Tag::ImageWidth, width)?;
    dir.write_tag(Tag::ImageLength, height)?;
    dir.write_tag(Tag::BitsPerSample, &vec![layout.bits_per_sample(); samples][..])?;
    dir.write_tag(Tag::Compression, compression_method(spec.compression).to_u16())?;
    dir.write_tag(Tag::PhotometricInterpretation, layout.photometric().to_u16())?;
    dir.write_tag(Tag::SamplesPerPixel, samples as u16)?;
    dir.write_tag(Tag::RowsPerStrip, 1u32)?;
    dir.write_tag(Tag::PlanarConfiguration, PlanarConfiguration::Chunky.to_u16())?;
    dir.write_tag(
        Tag::SampleFormat,
        &vec![layout.sample_format().to_u16(); samples][..],
    )?;
    if layout == BandLayout::Rgba {
        // Unassociated alpha
        dir.write_tag(Tag::ExtraSamples, &[2u16][..])?;
    }
    Ok(())
}

fn write_geo_tags<W: Write + Seek>(
    dir: &mut DirectoryEncoder<'_, W, TiffKindStandard>,
    geo: &GeoReference,
    nodata: Option<f32>,
) -> RasterResult<()> {
    dir.write_tag(
        Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE_TAG),
        &[geo.x_cell_degrees, geo.y_cell_degrees, 0.0][..],
    )?;
    dir.write_tag(
        Tag::from_u16_exhaustive(MODEL_TIEPOINT_TAG),
        &[0.0, 0.0, 0.0, geo.bounds.west, geo.bounds.north, 0.0][..],
    )?;

    let (keys, ascii) = geo_keys();
    dir.write_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY_TAG), &keys[..])?;
    dir.write_tag(Tag::from_u16_exhaustive(GEO_ASCII_PARAMS_TAG), ascii.as_str())?;

    if let Some(nodata) = nodata {
        let text = format!("{}", nodata);
        dir.write_tag(Tag::from_u16_exhaustive(GDAL_NODATA_TAG), text.as_str())?;
    }

    Ok(())
}

/// GeoKeyDirectory entries and the matching GeoAsciiParams text.
///
/// Keys must be sorted by id. ASCII keys point into the params string, where
/// each value ends with `|`.
pub fn geo_keys() -> (Vec<u16>, String) {
    let mut ascii = String::new();
    let mut ascii_key = |text: &str| -> (u16, u16) {
        let offset = ascii.len() as u16;
        ascii.push_str(text);
        ascii.push('|');
        (text.len() as u16 + 1, offset)
    };

    let (wkt_count, wkt_offset) = ascii_key(COMPOUND_WKT);
    let (geog_count, geog_offset) = ascii_key(GEOG_CITATION);
    let (vert_count, vert_offset) = ascii_key(VERTICAL_CITATION);

    let entries: [[u16; 4]; 9] = [
        // GTModelType: geographic
        [1024, 0, 1, 2],
        // GTRasterType: pixel is area
        [1025, 0, 1, 1],
        [1026, GEO_ASCII_PARAMS_TAG, wkt_count, wkt_offset],
        // GeographicType: WGS 84
        [2048, 0, 1, 4326],
        [2049, GEO_ASCII_PARAMS_TAG, geog_count, geog_offset],
        // GeogAngularUnits: degree
        [2054, 0, 1, 9102],
        // VerticalCSType: user defined
        [4096, 0, 1, 32767],
        [4097, GEO_ASCII_PARAMS_TAG, vert_count, vert_offset],
        // VerticalUnits: metre
        [4099, 0, 1, 9001],
    ];

    let mut keys = vec![1, 1, 0, entries.len() as u16];
    for entry in entries {
        keys.extend_from_slice(&entry);
    }

    (keys, ascii)
}

/// One row of output pixels.
#[derive(Debug, Clone, Copy)]
pub enum Scanline<'a> {
    /// Converted values, nulls carrying the null sentinel
    Grey(&'a [f32]),
    /// Palette output; alpha is dropped for opaque rasters
    Color(&'a [Rgba]),
}

impl Scanline<'_> {
    pub fn len(&self) -> usize {
        match self {
            Scanline::Grey(row) => row.len(),
            Scanline::Color(row) => row.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Destination for rendered scanlines, north row first.
pub trait ScanlineSink {
    /// Write the next scanline.
    fn write_scanline(&mut self, line: Scanline<'_>) -> RasterResult<()>;

    /// Number of scanline slots consumed so far.
    fn rows_written(&self) -> usize;
}

/// Writes scanlines into allocated bands.
pub struct BandWriter<'a, W: Write + Seek = File> {
    dir: DirectoryEncoder<'a, W, TiffKindStandard>,
    layout: BandLayout,
    compression: Compression,
    path: PathBuf,
    width: usize,
    height: usize,
    null_value: f32,
    rows_written: usize,
    rows_blanked: usize,
    strip_offsets: Vec<u32>,
    strip_byte_counts: Vec<u32>,
    /// Uncompressed samples of the current row
    raw_buf: Vec<u8>,
    /// Compressed strip of the current row
    strip_buf: Vec<u8>,
}

impl<'a, W: Write + Seek> BandWriter<'a, W> {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn check(&self, line: &Scanline<'_>) -> RasterResult<()> {
        let row = self.rows_written;
        if line.len() != self.width {
            return Err(RasterError::ScanlineLength {
                row,
                expected: self.width,
                got: line.len(),
            });
        }
        let matches = matches!(
            (self.layout, line),
            (BandLayout::Grey, Scanline::Grey(_))
                | (BandLayout::Rgb, Scanline::Color(_))
                | (BandLayout::Rgba, Scanline::Color(_))
        );
        if !matches {
            return Err(RasterError::BandMismatch {
                row,
                mode: self.layout.mode_name(),
            });
        }
        Ok(())
    }

    /// Pack a checked scanline into `raw_buf` as native-endian samples.
    fn pack(&mut self, line: Scanline<'_>) {
        self.raw_buf.clear();
        match (self.layout, line) {
            (BandLayout::Grey, Scanline::Grey(row)) => {
                for v in row {
                    self.raw_buf.extend_from_slice(&v.to_ne_bytes());
                }
            }
            (BandLayout::Rgb, Scanline::Color(row)) => {
                for px in row {
                    self.raw_buf.extend_from_slice(&px[..3]);
                }
            }
            (BandLayout::Rgba, Scanline::Color(row)) => {
                for px in row {
                    self.raw_buf.extend_from_slice(px);
                }
            }
            _ => {}
        }
    }

    fn pack_blank(&mut self) {
        self.raw_buf.clear();
        match self.layout {
            BandLayout::Grey => {
                for _ in 0..self.width {
                    self.raw_buf.extend_from_slice(&self.null_value.to_ne_bytes());
                }
            }
            BandLayout::Rgb | BandLayout::Rgba => {
                self.raw_buf.resize(self.width * self.layout.bytes_per_pixel(), 0);
            }
        }
    }

    /// Compress `raw_buf` and append it to the file as the next strip.
    fn write_strip(&mut self) -> RasterResult<()> {
        self.strip_buf.clear();
        match self.compression {
            Compression::Lzw => Lzw.write_to(&mut self.strip_buf, &self.raw_buf)?,
            Compression::PackBits => Packbits.write_to(&mut self.strip_buf, &self.raw_buf)?,
        };

        let offset = self.dir.write_data(&self.strip_buf[..])?;
        let offset = u32::try_from(offset).map_err(TiffError::from)?;
        let byte_count = u32::try_from(self.strip_buf.len()).map_err(TiffError::from)?;
        self.strip_offsets.push(offset);
        self.strip_byte_counts.push(byte_count);
        Ok(())
    }

    /// Fill the current row slot with no-data.
    fn write_blank(&mut self) -> RasterResult<()> {
        self.pack_blank();
        self.write_strip()?;
        self.rows_written += 1;
        self.rows_blanked += 1;
        Ok(())
    }

    /// Blank the remaining rows and write the image directory.
    pub fn finish(mut self) -> RasterResult<RasterSummary> {
        while self.rows_written < self.height {
            self.write_blank()?;
        }

        self.dir.write_tag(Tag::StripOffsets, &self.strip_offsets[..])?;
        self.dir
            .write_tag(Tag::StripByteCounts, &self.strip_byte_counts[..])?;

        let summary = RasterSummary {
            path: self.path,
            width: self.width,
            height: self.height,
            rows_written: self.rows_written,
            rows_blanked: self.rows_blanked,
        };

        self.dir.finish()?;

        info!(
            path = %summary.path.display(),
            rows = summary.rows_written,
            blanked = summary.rows_blanked,
            "Closed raster"
        );

        Ok(summary)
    }
}

impl<W: Write + Seek> ScanlineSink for BandWriter<'_, W> {
    /// A rejected or failed scanline still consumes its row slot as a blank
    /// strip, so the rows after it keep their place. If the blank strip also
    /// fails the raster is unusable and [`RasterError::RowLost`] is returned.
    fn write_scanline(&mut self, line: Scanline<'_>) -> RasterResult<()> {
        if self.rows_written >= self.height {
            return Err(RasterError::TooManyScanlines {
                height: self.height,
            });
        }

        let result = match self.check(&line) {
            Ok(()) => {
                self.pack(line);
                self.write_strip()
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.rows_written += 1;
                Ok(())
            }
            Err(e) => {
                let row = self.rows_written;
                debug!(row, error = %e, "Scanline rejected, writing blank row");
                match self.write_blank() {
                    Ok(()) => Err(e),
                    Err(blank) => Err(RasterError::RowLost {
                        row,
                        source: Box::new(blank),
                    }),
                }
            }
        }
    }

    fn rows_written(&self) -> usize {
        self.rows_written
    }
}
