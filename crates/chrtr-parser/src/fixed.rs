//! CHRTR fixed-cell grid format.
//!
//! Layout (little-endian):
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0      | 8    | magic `CHRTR\0\0\0` |
//! | 8      | 4    | width (u32) |
//! | 12     | 4    | height (u32) |
//! | 16     | 8    | west longitude (f64) |
//! | 24     | 8    | east longitude (f64) |
//! | 32     | 8    | south latitude (f64) |
//! | 40     | 8    | north latitude (f64) |
//! | 48     | 8    | grid spacing in minutes (f64) |
//! | 56     | 8    | reserved |
//!
//! followed by `height` rows of `width` f32 values, south row first.
//! A cell is valid when its value is below [`CHRTR_NULL`].

use bytes::{Buf, BufMut, BytesMut};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use surface_common::{GeoBounds, GridHeader};
use tracing::{debug, warn};

use crate::{check_row_request, GridCell, GridFormat, GridSource, ParseError, ParseResult};

/// Null sentinel for CHRTR grids.
pub const CHRTR_NULL: f32 = 1.0e10;

const MAGIC: &[u8; 8] = b"CHRTR\0\0\0";
const HEADER_LEN: u64 = 64;

/// An open CHRTR grid.
pub struct ChrtrFile<R = BufReader<File>> {
    reader: R,
    header: GridHeader,
}

impl ChrtrFile<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> ParseResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> ChrtrFile<R> {
    /// Parse the header from any seekable reader.
    pub fn from_reader(mut reader: R) -> ParseResult<Self> {
        let mut raw = [0u8; HEADER_LEN as usize];
        reader.seek(SeekFrom::Start(0))?;
        let got = read_fully(&mut reader, &mut raw)?;
        if got < raw.len() {
            return Err(ParseError::ShortRead {
                expected: raw.len(),
                got,
            });
        }

        let header = parse_header(&raw)?;
        header.validate()?;

        let span = header.bounds.width() / header.x_cell_degrees;
        if (span - header.width as f64).abs() > 1.0 {
            warn!(
                width = header.width,
                span_cells = span,
                "CHRTR width does not match its bounds and grid spacing"
            );
        }

        debug!(width = header.width, height = header.height, bounds = %header.bounds, "Parsed CHRTR header");

        Ok(Self { reader, header })
    }
}

fn parse_header(raw: &[u8]) -> ParseResult<GridHeader> {
    if &raw[..8] != MAGIC {
        return Err(ParseError::InvalidHeader("missing CHRTR magic".to_string()));
    }

    let mut buf = &raw[8..];
    let width = buf.get_u32_le() as usize;
    let height = buf.get_u32_le() as usize;
    let west = buf.get_f64_le();
    let east = buf.get_f64_le();
    let south = buf.get_f64_le();
    let north = buf.get_f64_le();
    let grid_minutes = buf.get_f64_le();

    let cell_degrees = grid_minutes / 60.0;

    Ok(GridHeader {
        width,
        height,
        bounds: GeoBounds::new(west, east, south, north),
        x_cell_degrees: cell_degrees,
        y_cell_degrees: cell_degrees,
        null_value: CHRTR_NULL,
    })
}

impl<R: Read + Seek> GridSource for ChrtrFile<R> {
    fn format(&self) -> GridFormat {
        GridFormat::Chrtr
    }

    fn header(&self) -> &GridHeader {
        &self.header
    }

    fn read_row(
        &mut self,
        row: usize,
        col_start: usize,
        col_count: usize,
    ) -> ParseResult<Vec<GridCell>> {
        check_row_request(&self.header, row, col_start, col_count)?;

        let offset = HEADER_LEN + ((row * self.header.width + col_start) * 4) as u64;
        self.reader.seek(SeekFrom::Start(offset))?;

        let mut raw = vec![0u8; col_count * 4];
        let got = read_fully(&mut self.reader, &mut raw)?;
        if got < raw.len() {
            return Err(ParseError::ShortRead {
                expected: raw.len(),
                got,
            });
        }

        let mut buf = &raw[..];
        let mut cells = Vec::with_capacity(col_count);
        while buf.has_remaining() {
            let value = buf.get_f32_le();
            cells.push(if value < CHRTR_NULL {
                GridCell::valid(value)
            } else {
                GridCell::null(value)
            });
        }

        Ok(cells)
    }
}

/// Read until `buf` is full or the reader is exhausted.
pub(crate) fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Sequential writer for CHRTR grids. Rows must be written south to north.
pub struct ChrtrWriter<W: Write> {
    writer: W,
    header: GridHeader,
    rows_written: usize,
}

impl ChrtrWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>, header: &GridHeader) -> ParseResult<Self> {
        let file = File::create(path.as_ref())?;
        Self::new(BufWriter::new(file), header)
    }

    /// Write a whole grid (row-major, south row first) in one call.
    pub fn write_grid(path: impl AsRef<Path>, header: &GridHeader, data: &[f32]) -> ParseResult<()> {
        if data.len() != header.len() {
            return Err(ParseError::ShortRead {
                expected: header.len(),
                got: data.len(),
            });
        }
        let mut writer = Self::create(path, header)?;
        for row in data.chunks(header.width) {
            writer.write_row(row)?;
        }
        writer.finish()?;
        Ok(())
    }
}

impl<W: Write> ChrtrWriter<W> {
    pub fn new(mut writer: W, header: &GridHeader) -> ParseResult<Self> {
        header.validate()?;
        if (header.x_cell_degrees - header.y_cell_degrees).abs() > f64::EPSILON {
            return Err(ParseError::InvalidHeader(
                "CHRTR grids require square cells".to_string(),
            ));
        }

        let mut buf = BytesMut::with_capacity(HEADER_LEN as usize);
        buf.put_slice(MAGIC);
        buf.put_u32_le(header.width as u32);
        buf.put_u32_le(header.height as u32);
        buf.put_f64_le(header.bounds.west);
        buf.put_f64_le(header.bounds.east);
        buf.put_f64_le(header.bounds.south);
        buf.put_f64_le(header.bounds.north);
        buf.put_f64_le(header.x_cell_degrees * 60.0);
        buf.put_bytes(0, 8);
        writer.write_all(&buf)?;

        let mut header = header.clone();
        header.null_value = CHRTR_NULL;

        Ok(Self {
            writer,
            header,
            rows_written: 0,
        })
    }

    pub fn write_row(&mut self, row: &[f32]) -> ParseResult<()> {
        if row.len() != self.header.width || self.rows_written >= self.header.height {
            return Err(ParseError::RowOutOfRange {
                row: self.rows_written,
                col_start: 0,
                col_end: row.len(),
                width: self.header.width,
                height: self.header.height,
            });
        }

        let mut buf = BytesMut::with_capacity(row.len() * 4);
        for &value in row {
            buf.put_f32_le(value);
        }
        self.writer.write_all(&buf)?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn finish(mut self) -> ParseResult<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
