use album_core::models::UploadCandidate;

pub const MIB: usize = 1024 * 1024;

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0];
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const HEIC_MAGIC: &[u8] = &[0, 0, 0, 0x18, b'f', b't', b'y', b'p', b'h', b'e', b'i', b'c'];

fn with_magic(magic: &[u8], size: usize) -> Vec<u8> {
    let mut data = vec![0u8; size.max(magic.len())];
    data[..magic.len()].copy_from_slice(magic);
    data
}

pub fn jpeg(name: &str, size: usize) -> UploadCandidate {
    UploadCandidate::new(name, "image/jpeg", with_magic(JPEG_MAGIC, size))
}

pub fn png(name: &str, size: usize) -> UploadCandidate {
    UploadCandidate::new(name, "image/png", with_magic(PNG_MAGIC, size))
}

pub fn heic(name: &str, size: usize) -> UploadCandidate {
    UploadCandidate::new(name, "image/heic", with_magic(HEIC_MAGIC, size))
}

/// HEIC candidate that passes validation but that the fake decoder refuses.
pub fn corrupt_heic(name: &str, size: usize) -> UploadCandidate {
    UploadCandidate::new(name, "image/heic", with_magic(b"corrupt", size))
}
