// LogScope - platform/fs.rs
//
// Size-capped file reads for uploads and preview samples.

use std::io;
use std::path::Path;

/// Read the first `max_lines` lines of a file for preview.
///
/// Invalid UTF-8 is replaced rather than rejected; line terminators are
/// stripped.
pub fn read_first_lines(path: &Path, max_lines: usize) -> io::Result<Vec<String>> {
    use std::io::BufRead;
    let file = std::fs::File::open(path)?;
    let mut reader = io::BufReader::new(file);

    let mut lines = Vec::with_capacity(max_lines.min(1_024));
    let mut buf = Vec::new();
    while lines.len() < max_lines {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        lines.push(line.trim_end_matches(['\r', '\n']).to_string());
    }
    Ok(lines)
}

/// Read a whole file as bytes, refusing files larger than `max_bytes`
/// before reading them.
pub fn read_file_capped(path: &Path, max_bytes: u64) -> io::Result<Vec<u8>> {
    let size = std::fs::metadata(path)?.len();
    if size > max_bytes {
        tracing::warn!(path = %path.display(), size, max_bytes, "File too large to load");
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("file is {size} bytes, exceeds maximum of {max_bytes} bytes"),
        ));
    }
    std::fs::read(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_lines_lossy_and_limited() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        std::fs::write(&path, b"one\r\ntw\xFFo\nthree\nfour\n").unwrap();

        let lines = read_first_lines(&path, 3).unwrap();
        assert_eq!(lines, vec!["one", "tw\u{FFFD}o", "three"]);
    }

    #[test]
    fn test_first_lines_without_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        std::fs::write(&path, "only").unwrap();
        assert_eq!(read_first_lines(&path, 10).unwrap(), vec!["only"]);
    }

    #[test]
    fn test_capped_read_rejects_large_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.log");
        std::fs::write(&path, vec![b'x'; 64]).unwrap();

        assert_eq!(read_file_capped(&path, 64).unwrap().len(), 64);
        let err = read_file_capped(&path, 63).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
