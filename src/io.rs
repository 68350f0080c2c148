//! Flat numeric array files
//!
//! Reader and writer for the `.npy` array format (versions 1.0, 2.0 and
//! 3.0). Arrays are read as a flat `Vec<f64>` in C order; 64/32-bit floats
//! and integers in either byte order are accepted.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::{Result, ShotNoiseError};

const MAGIC: &[u8] = b"\x93NUMPY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    F8,
    F4,
    I8,
    I4,
}

impl Scalar {
    fn size(self) -> usize {
        match self {
            Scalar::F8 | Scalar::I8 => 8,
            Scalar::F4 | Scalar::I4 => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Header {
    scalar: Scalar,
    big_endian: bool,
    fortran_order: bool,
    shape: Vec<usize>,
}

/// Read a whole array file as `f64` values.
pub fn read_npy(path: impl AsRef<Path>) -> Result<Vec<f64>> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let values = parse_npy(&bytes)?;
    tracing::debug!(path = %path.display(), len = values.len(), "loaded array");
    Ok(values)
}

/// Write `values` as a 1-D little-endian `f8` array (format 1.0).
pub fn write_npy(path: impl AsRef<Path>, values: &[f64]) -> Result<()> {
    let mut header = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': ({},), }}",
        values.len()
    );
    // Magic, version and length prefix take 10 bytes; pad to 64 with a newline.
    let unpadded = 10 + header.len() + 1;
    header.push_str(&" ".repeat((64 - unpadded % 64) % 64));
    header.push('\n');

    let header_len = u16::try_from(header.len())
        .map_err(|_| ShotNoiseError::Format("header too long".to_string()))?;

    let mut out = Vec::with_capacity(10 + header.len() + values.len() * 8);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }

    let mut file = fs::File::create(path)?;
    file.write_all(&out)?;
    Ok(())
}

/// Remove the first `count` samples (all of them if `count >= len`).
pub fn drop_warmup(values: &mut Vec<f64>, count: usize) {
    let count = count.min(values.len());
    values.drain(..count);
}

/// The first `count` samples, or the whole slice if it is shorter.
pub fn head(values: &[f64], count: usize) -> &[f64] {
    &values[..count.min(values.len())]
}

fn parse_npy(bytes: &[u8]) -> Result<Vec<f64>> {
    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err(ShotNoiseError::Format("missing array magic".to_string()));
    }
    let major = bytes[6];
    let (header_len, offset) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(ShotNoiseError::Format("truncated header length".to_string()));
            }
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
            (len as usize, 12)
        }
        other => {
            return Err(ShotNoiseError::Format(format!(
                "unsupported format version {other}"
            )))
        }
    };

    let data_start = offset + header_len;
    if bytes.len() < data_start {
        return Err(ShotNoiseError::Format("truncated header".to_string()));
    }
    let text = std::str::from_utf8(&bytes[offset..data_start])
        .map_err(|_| ShotNoiseError::Format("header is not text".to_string()))?;
    let header = parse_header(text)?;

    if header.fortran_order && header.shape.iter().filter(|&&d| d > 1).count() > 1 {
        return Err(ShotNoiseError::Format(
            "fortran-ordered arrays are not supported".to_string(),
        ));
    }

    let size = header.scalar.size();
    let total = header
        .shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .and_then(|count| count.checked_mul(size))
        .ok_or_else(|| ShotNoiseError::Format("shape overflows".to_string()))?;
    let data = &bytes[data_start..];
    if data.len() < total {
        return Err(ShotNoiseError::Format(format!(
            "expected {total} data bytes, found {}",
            data.len()
        )));
    }

    Ok(data[..total]
        .chunks_exact(size)
        .map(|chunk| decode(chunk, header.scalar, header.big_endian))
        .collect())
}

fn decode(chunk: &[u8], scalar: Scalar, big_endian: bool) -> f64 {
    let mut buf = [0u8; 8];
    buf[..chunk.len()].copy_from_slice(chunk);
    if big_endian {
        buf[..chunk.len()].reverse();
    }
    match scalar {
        Scalar::F8 => f64::from_le_bytes(buf),
        Scalar::F4 => f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
        Scalar::I8 => i64::from_le_bytes(buf) as f64,
        Scalar::I4 => i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
    }
}

fn parse_header(text: &str) -> Result<Header> {
    let descr = dict_value(text, "descr")
        .ok_or_else(|| ShotNoiseError::Format("header has no descr".to_string()))?;
    let descr = descr.trim().trim_matches(|c| c == '\'' || c == '"');
    if descr.len() < 2 {
        return Err(ShotNoiseError::Format(format!("bad descr {descr}")));
    }
    let (order, kind) = descr.split_at(1);
    let big_endian = match order {
        "<" | "=" | "|" => false,
        ">" => true,
        _ => return Err(ShotNoiseError::Format(format!("bad byte order in {descr}"))),
    };
    let scalar = match kind {
        "f8" => Scalar::F8,
        "f4" => Scalar::F4,
        "i8" => Scalar::I8,
        "i4" => Scalar::I4,
        _ => {
            return Err(ShotNoiseError::Format(format!(
                "unsupported dtype {descr}"
            )))
        }
    };

    let fortran_order = dict_value(text, "fortran_order")
        .map(|v| v.trim().starts_with("True"))
        .unwrap_or(false);

    let shape_text = dict_value(text, "shape")
        .ok_or_else(|| ShotNoiseError::Format("header has no shape".to_string()))?;
    let open = shape_text
        .find('(')
        .ok_or_else(|| ShotNoiseError::Format("shape is not a tuple".to_string()))?;
    let close = shape_text
        .find(')')
        .ok_or_else(|| ShotNoiseError::Format("shape is not a tuple".to_string()))?;
    let shape = shape_text[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| ShotNoiseError::Format(format!("bad shape entry {s}")))
        })
        .collect::<Result<Vec<usize>>>()?;

    Ok(Header {
        scalar,
        big_endian,
        fortran_order,
        shape,
    })
}

/// Text following `'key':` up to the next top-level comma.
fn dict_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let quoted = format!("'{key}'");
    let start = text.find(&quoted)? + quoted.len();
    let rest = text[start..].trim_start().strip_prefix(':')?;

    let mut depth = 0i32;
    for (i, c) in rest.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' | '}' if depth == 0 => return Some(&rest[..i]),
            _ => {}
        }
    }
    Some(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn raw_file(descr: &str, shape: &str, data: &[u8]) -> Vec<u8> {
        let header =
            format!("{{'descr': '{descr}', 'fortran_order': False, 'shape': {shape}, }}\n");
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("signal.npy");
        let values = vec![0.0, -1.5, 3.25, 1e-300, f64::MAX];
        write_npy(&path, &values).unwrap();

        let bytes = fs::read(&path).unwrap();
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);
        assert_eq!(bytes[10 + header_len - 1], b'\n');

        assert_eq!(read_npy(&path).unwrap(), values);
    }

    #[test]
    fn test_other_dtypes() {
        let mut be = Vec::new();
        for v in [1.5f64, -2.0] {
            be.extend_from_slice(&v.to_be_bytes());
        }
        assert_eq!(parse_npy(&raw_file(">f8", "(2,)", &be)).unwrap(), vec![1.5, -2.0]);

        let mut f4 = Vec::new();
        for v in [0.5f32, 4.0] {
            f4.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(parse_npy(&raw_file("<f4", "(2,)", &f4)).unwrap(), vec![0.5, 4.0]);

        let mut i8s = Vec::new();
        for v in [-3i64, 7, 9, 11] {
            i8s.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(
            parse_npy(&raw_file("<i8", "(2, 2)", &i8s)).unwrap(),
            vec![-3.0, 7.0, 9.0, 11.0]
        );

        let i4 = 42i32.to_be_bytes();
        assert_eq!(parse_npy(&raw_file(">i4", "(1,)", &i4)).unwrap(), vec![42.0]);
    }

    #[test]
    fn test_version_two_header() {
        let header = "{'descr': '<f8', 'fortran_order': False, 'shape': (1,), }\n";
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&[2, 0]);
        bytes.extend_from_slice(&(header.len() as u32).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(&8.0f64.to_le_bytes());
        assert_eq!(parse_npy(&bytes).unwrap(), vec![8.0]);
    }

    #[test]
    fn test_malformed_rejected() {
        assert!(matches!(parse_npy(b"not an array"), Err(ShotNoiseError::Format(_))));
        assert!(parse_npy(&raw_file("<c16", "(1,)", &[0; 16])).is_err());
        assert!(parse_npy(&raw_file("<f8", "(4,)", &[0; 8])).is_err());
        assert!(matches!(
            parse_npy(&raw_file("<f8", "(4294967296, 4294967296, 16)", &[0; 8])),
            Err(ShotNoiseError::Format(_))
        ));

        let dir = tempdir().unwrap();
        let missing = read_npy(dir.path().join("missing.npy"));
        assert!(matches!(missing, Err(ShotNoiseError::Io(_))));
    }

    #[test]
    fn test_warmup_and_head() {
        let mut values: Vec<f64> = (0..10).map(|i| i as f64).collect();
        drop_warmup(&mut values, 6);
        assert_eq!(values, vec![6.0, 7.0, 8.0, 9.0]);
        assert_eq!(head(&values, 2), &[6.0, 7.0]);
        assert_eq!(head(&values, 100).len(), 4);
        drop_warmup(&mut values, 100);
        assert!(values.is_empty());
    }
}
