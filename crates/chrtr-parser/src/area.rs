//! Area file reader.
//!
//! Only the polygon's bounding box and vertex count are consumed downstream.
//! The text format holds one `lat, lon` vertex per line in decimal degrees
//! (comma or whitespace separated). Blank lines and `#` comments are skipped.

use nom::{
    branch::alt,
    character::complete::{char, space0, space1},
    combinator::{all_consuming, value},
    number::complete::double,
    sequence::{delimited, separated_pair},
    IResult,
};
use std::path::Path;

use surface_common::AreaOfInterest;
use tracing::debug;

use crate::{ParseError, ParseResult};

fn vertex(input: &str) -> IResult<&str, (f64, f64)> {
    all_consuming(delimited(
        space0,
        separated_pair(
            double,
            alt((value((), delimited(space0, char(','), space0)), value((), space1))),
            double,
        ),
        space0,
    ))(input)
}

/// Parse area file text into an area of interest.
pub fn parse_area(text: &str) -> ParseResult<AreaOfInterest> {
    let mut vertices = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let (_, pair) = vertex(line).map_err(|e| ParseError::InvalidAreaLine {
            line: idx + 1,
            message: e.to_string(),
        })?;
        vertices.push(pair);
    }

    let area = AreaOfInterest::from_vertices(&vertices)?;
    debug!(vertices = area.vertex_count, bounds = %area.bounds, "Parsed area");
    Ok(area)
}

/// Read and parse an area file.
pub fn read_area_file(path: impl AsRef<Path>) -> ParseResult<AreaOfInterest> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_area(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use surface_common::ValidationError;

    #[test]
    fn test_vertex_separators() {
        assert_eq!(vertex("30.5, -79.25").unwrap().1, (30.5, -79.25));
        assert_eq!(vertex("30.5 -79.25").unwrap().1, (30.5, -79.25));
        assert_eq!(vertex("  30.5,-79.25  ").unwrap().1, (30.5, -79.25));
        assert!(vertex("30.5").is_err());
        assert!(vertex("30.5, -79.25, 4").is_err());
    }

    #[test]
    fn test_parse_area_with_comments() {
        let text = "# survey box\n30.0, -80.0\n31.0, -80.0\n\n31.0, -79.0 # NE\n30.0, -79.0\n";
        let area = parse_area(text).unwrap();
        assert_eq!(area.vertex_count, 4);
        assert_eq!(area.bounds.west, -80.0);
        assert_eq!(area.bounds.north, 31.0);
    }

    #[test]
    fn test_parse_area_too_few() {
        let err = parse_area("30.0, -80.0\n31.0, -80.0\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::Validation(ValidationError::TooFewVertices(2))
        ));
    }

    #[test]
    fn test_parse_area_bad_line() {
        let err = parse_area("30.0, -80.0\nnorth-ish\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidAreaLine { line: 2, .. }));
    }
}
