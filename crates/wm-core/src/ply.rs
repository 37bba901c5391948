use std::io::Cursor;

use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Encoding, Header};
use serde::Serialize;

use crate::error::{Error, Result};

const END_HEADER: &[u8] = b"end_header";
const MAX_HEADER_BYTES: usize = 64 * 1024;

/// Vertex properties a 3D Gaussian splat PLY carries on top of positions
const SPLAT_PROPERTIES: [&str; 4] = ["f_dc_0", "opacity", "scale_0", "rot_0"];

/// What the header of a PLY artifact declares
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlySummary {
    pub encoding: String,
    pub vertices: usize,
    pub faces: usize,
    pub gaussian_splat: bool,
}

/// Read only the header of a PLY payload.
pub fn inspect(data: &[u8]) -> Result<PlySummary> {
    let header_len = header_len(data)?;
    let mut cursor = Cursor::new(&data[..header_len]);

    let parser = Parser::<DefaultElement>::new();
    let header = parser
        .read_header(&mut cursor)
        .map_err(|e| Error::InvalidArtifact(format!("Malformed PLY header: {}", e)))?;

    Ok(summarize(&header))
}

fn header_len(data: &[u8]) -> Result<usize> {
    if !data.starts_with(b"ply") {
        return Err(Error::InvalidArtifact("Missing 'ply' magic number".into()));
    }

    let window = &data[..data.len().min(MAX_HEADER_BYTES)];
    let end = window
        .windows(END_HEADER.len())
        .position(|w| w == END_HEADER)
        .ok_or_else(|| Error::InvalidArtifact("PLY header is not terminated".into()))?;

    // include the rest of the end_header line
    let line_end = window[end..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|p| end + p + 1)
        .unwrap_or(window.len());

    Ok(line_end)
}

fn summarize(header: &Header) -> PlySummary {
    let vertex = header.elements.get("vertex");
    let vertices = vertex.map(|e| e.count).unwrap_or(0);
    let faces = header.elements.get("face").map(|e| e.count).unwrap_or(0);
    let gaussian_splat = vertex
        .map(|e| SPLAT_PROPERTIES.iter().all(|p| e.properties.contains_key(*p)))
        .unwrap_or(false);

    let encoding = match header.encoding {
        Encoding::Ascii => "ascii",
        Encoding::BinaryLittleEndian => "binary_little_endian",
        Encoding::BinaryBigEndian => "binary_big_endian",
    };

    PlySummary {
        encoding: encoding.to_string(),
        vertices,
        faces,
        gaussian_splat,
    }
}
