use std::io::Read;
use std::path::Path;

use md5::Md5;
use digest::Digest;

/// MD5 of the whole file, read in 4096-byte chunks, as a lowercase hex
/// string. This is the authoritative half of the change-detection pair
/// (`mtime`, `hash`); `mtime` is the cheap pre-check.
pub fn md5_file(path: &Path) -> std::io::Result<String> {
    let mut file = fs_err::File::open(path)?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_a_small_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.txt");
        fs_err::write(&path, b"hello world").unwrap();
        let hash = md5_file(&path).unwrap();
        assert_eq!(hash, "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn hash_is_stable_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.txt");
        fs_err::write(&path, b"some content for hashing").unwrap();
        assert_eq!(md5_file(&path).unwrap(), md5_file(&path).unwrap());
    }
}
