//! CHRTR2 flagged-record grid format.
//!
//! The file starts with an ASCII header of `[TAG] = value` lines ended by
//! `[END OF HEADER]` and NUL-padded to [`HEADER_SIZE`] bytes. Records follow,
//! south row first, each an f32 `z` and a u16 `status` (little-endian). Status
//! bit 0 marks a real (valid) value.

use bytes::{Buf, BufMut, BytesMut};
use nom::{
    bytes::complete::take_until,
    character::complete::{char, space0},
    sequence::{delimited, tuple},
    IResult,
};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use surface_common::{GeoBounds, GridHeader};
use tracing::debug;

use crate::fixed::read_fully;
use crate::{check_row_request, GridCell, GridFormat, GridSource, ParseError, ParseResult};

/// Default null z value for CHRTR2 grids.
pub const CHRTR2_NULL_Z_VALUE: f32 = 999_999.0;

/// Fixed size of the ASCII header block.
pub const HEADER_SIZE: usize = 16_384;

const END_OF_HEADER: &str = "[END OF HEADER]";
const RECORD_LEN: usize = 6;
const STATUS_REAL: u16 = 0x0001;
const VERSION: &str = "CHRTR2 library V1.00";

/// An open CHRTR2 grid.
pub struct Chrtr2File<R = BufReader<File>> {
    reader: R,
    header: GridHeader,
    version: String,
}

impl Chrtr2File<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> ParseResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> Chrtr2File<R> {
    pub fn from_reader(mut reader: R) -> ParseResult<Self> {
        let mut raw = vec![0u8; HEADER_SIZE];
        reader.seek(SeekFrom::Start(0))?;
        let got = read_fully(&mut reader, &mut raw)?;
        if got < HEADER_SIZE {
            return Err(ParseError::ShortRead {
                expected: HEADER_SIZE,
                got,
            });
        }

        let text = String::from_utf8_lossy(&raw);
        let end = text.find(END_OF_HEADER).ok_or_else(|| {
            ParseError::InvalidHeader(format!("no {} marker", END_OF_HEADER))
        })?;

        let tags = parse_tags(&text[..end]);
        let header = header_from_tags(&tags)?;
        header.validate()?;

        let version = tags.get("VERSION").cloned().unwrap_or_default();
        debug!(version = %version, width = header.width, height = header.height, "Parsed CHRTR2 header");

        Ok(Self {
            reader,
            header,
            version,
        })
    }

    /// The `[VERSION]` string of the file, empty if absent.
    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Parse a single `[TAG] = value` line.
fn tag_line(input: &str) -> IResult<&str, (&str, &str)> {
    let (rest, tag) = delimited(char('['), take_until("]"), char(']'))(input)?;
    let (value, _) = tuple((space0, char('='), space0))(rest)?;
    Ok(("", (tag.trim(), value.trim())))
}

fn parse_tags(text: &str) -> HashMap<String, String> {
    let mut tags = HashMap::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match tag_line(line) {
            Ok((_, (tag, value))) => {
                tags.insert(tag.to_uppercase(), value.to_string());
            }
            Err(_) => debug!(line = %line, "Ignoring unrecognized CHRTR2 header line"),
        }
    }
    tags
}

fn required<T: std::str::FromStr>(tags: &HashMap<String, String>, tag: &str) -> ParseResult<T> {
    let raw = tags
        .get(tag)
        .ok_or_else(|| ParseError::InvalidHeader(format!("missing [{}]", tag)))?;
    raw.parse()
        .map_err(|_| ParseError::InvalidHeader(format!("bad value for [{}]: {}", tag, raw)))
}

fn header_from_tags(tags: &HashMap<String, String>) -> ParseResult<GridHeader> {
    let null_value = match tags.get("NULL Z VALUE") {
        Some(_) => required(tags, "NULL Z VALUE")?,
        None => CHRTR2_NULL_Z_VALUE,
    };

    Ok(GridHeader {
        width: required(tags, "WIDTH")?,
        height: required(tags, "HEIGHT")?,
        bounds: GeoBounds::new(
            required(tags, "WEST LONGITUDE")?,
            required(tags, "EAST LONGITUDE")?,
            required(tags, "SOUTH LATITUDE")?,
            required(tags, "NORTH LATITUDE")?,
        ),
        x_cell_degrees: required(tags, "LON GRID SIZE DEGREES")?,
        y_cell_degrees: required(tags, "LAT GRID SIZE DEGREES")?,
        null_value,
    })
}

impl<R: Read + Seek> GridSource for Chrtr2File<R> {
    fn format(&self) -> GridFormat {
        GridFormat::Chrtr2
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

        let offset = HEADER_SIZE + (row * self.header.width + col_start) * RECORD_LEN;
        self.reader.seek(SeekFrom::Start(offset as u64))?;

        let mut raw = vec![0u8; col_count * RECORD_LEN];
        let got = read_fully(&mut self.reader, &mut raw)?;
        if got < raw.len() {
            return Err(ParseError::ShortRead {
                expected: raw.len(),
                got,
            });
        }

        let mut buf = &raw[..];
        let mut cells = Vec::with_capacity(col_count);
        while buf.remaining() >= RECORD_LEN {
            let z = buf.get_f32_le();
            let status = buf.get_u16_le();
            cells.push(if status & STATUS_REAL != 0 {
                GridCell::valid(z)
            } else {
                GridCell::null(self.header.null_value)
            });
        }

        Ok(cells)
    }
}

/// Sequential writer for CHRTR2 grids. Rows must be written south to north.
pub struct Chrtr2Writer<W: Write> {
    writer: W,
    header: GridHeader,
    rows_written: usize,
}

impl Chrtr2Writer<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>, header: &GridHeader) -> ParseResult<Self> {
        let file = File::create(path.as_ref())?;
        Self::new(BufWriter::new(file), header)
    }

    /// Write a whole grid (row-major, south row first) in one call.
    pub fn write_grid(
        path: impl AsRef<Path>,
        header: &GridHeader,
        cells: &[GridCell],
    ) -> ParseResult<()> {
        if cells.len() != header.len() {
            return Err(ParseError::ShortRead {
                expected: header.len(),
                got: cells.len(),
            });
        }
        let mut writer = Self::create(path, header)?;
        for row in cells.chunks(header.width) {
            writer.write_row(row)?;
        }
        writer.finish()?;
        Ok(())
    }
}

impl<W: Write> Chrtr2Writer<W> {
    pub fn new(mut writer: W, header: &GridHeader) -> ParseResult<Self> {
        header.validate()?;

        let b = &header.bounds;
        let text = format!(
            "[VERSION] = {}\n[WIDTH] = {}\n[HEIGHT] = {}\n[WEST LONGITUDE] = {:.11}\n\
             [EAST LONGITUDE] = {:.11}\n[SOUTH LATITUDE] = {:.11}\n[NORTH LATITUDE] = {:.11}\n\
             [LAT GRID SIZE DEGREES] = {:.11}\n[LON GRID SIZE DEGREES] = {:.11}\n\
             [NULL Z VALUE] = {:.6}\n{}\n",
            VERSION,
            header.width,
            header.height,
            b.west,
            b.east,
            b.south,
            b.north,
            header.y_cell_degrees,
            header.x_cell_degrees,
            header.null_value,
            END_OF_HEADER,
        );

        if text.len() > HEADER_SIZE {
            return Err(ParseError::InvalidHeader(
                "header text exceeds header block".to_string(),
            ));
        }

        let mut block = BytesMut::with_capacity(HEADER_SIZE);
        block.put_slice(text.as_bytes());
        block.put_bytes(0, HEADER_SIZE - text.len());
        writer.write_all(&block)?;

        Ok(Self {
            writer,
            header: header.clone(),
            rows_written: 0,
        })
    }

    pub fn write_row(&mut self, row: &[GridCell]) -> ParseResult<()> {
        if row.len() != self.header.width || self.rows_written >= self.header.height {
            return Err(ParseError::RowOutOfRange {
                row: self.rows_written,
                col_start: 0,
                col_end: row.len(),
                width: self.header.width,
                height: self.header.height,
            });
        }

        let mut buf = BytesMut::with_capacity(row.len() * RECORD_LEN);
        for cell in row {
            if cell.valid {
                buf.put_f32_le(cell.value);
                buf.put_u16_le(STATUS_REAL);
            } else {
                buf.put_f32_le(self.header.null_value);
                buf.put_u16_le(0);
            }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_line() {
        let (_, (tag, value)) = tag_line("[WIDTH] = 42").unwrap();
        assert_eq!(tag, "WIDTH");
        assert_eq!(value, "42");

        let (_, (tag, value)) = tag_line("[LAT GRID SIZE DEGREES]=0.001").unwrap();
        assert_eq!(tag, "LAT GRID SIZE DEGREES");
        assert_eq!(value, "0.001");

        assert!(tag_line("WIDTH = 42").is_err());
    }

    #[test]
    fn test_missing_tag() {
        let tags = parse_tags("[WIDTH] = 4\n[HEIGHT] = 4\n");
        match header_from_tags(&tags) {
            Err(ParseError::InvalidHeader(msg)) => assert!(msg.contains("WEST LONGITUDE")),
            other => panic!("unexpected result: {:?}", other.map(|h| h.width)),
        }
    }

    #[test]
    fn test_default_null_value() {
        let tags = parse_tags(
            "[WIDTH] = 2\n[HEIGHT] = 2\n[WEST LONGITUDE] = 0\n[EAST LONGITUDE] = 1\n\
             [SOUTH LATITUDE] = 0\n[NORTH LATITUDE] = 1\n[LAT GRID SIZE DEGREES] = 0.5\n\
             [LON GRID SIZE DEGREES] = 0.5\n[SOME FUTURE TAG] = x\n",
        );
        let header = header_from_tags(&tags).unwrap();
        assert_eq!(header.null_value, CHRTR2_NULL_Z_VALUE);
        assert_eq!(header.x_cell_degrees, 0.5);
    }
}
