use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;

const BUFFER_SIZE: usize = 4 * 1024 * 1024; // 4MB buffer

pub fn calculate_file_hash(path: &Path) -> io::Result<blake3::Hash> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize())
}

/// 大小相同且 BLAKE3 雜湊相同才視為同一個檔案
pub fn same_content(a: &Path, b: &Path) -> io::Result<bool> {
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }
    Ok(calculate_file_hash(a)? == calculate_file_hash(b)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file
    }

    #[test]
    fn test_same_content_same_hash() {
        let a = temp_file(b"identical content");
        let b = temp_file(b"identical content");

        assert_eq!(
            calculate_file_hash(a.path()).unwrap(),
            calculate_file_hash(b.path()).unwrap()
        );
        assert!(same_content(a.path(), b.path()).unwrap());
    }

    #[test]
    fn test_same_size_different_content() {
        let a = temp_file(b"content A");
        let b = temp_file(b"content B");

        assert!(!same_content(a.path(), b.path()).unwrap());
    }

    #[test]
    fn test_different_size() {
        let a = temp_file(b"short");
        let b = temp_file(b"much longer");

        assert!(!same_content(a.path(), b.path()).unwrap());
    }

    #[test]
    fn test_missing_file_is_error() {
        let a = temp_file(b"x");
        assert!(same_content(a.path(), Path::new("/nonexistent/file.mp4")).is_err());
    }
}
