//! Image payloads with valid leading signatures.

use axum_test::multipart::Part;
use bytes::Bytes;

pub fn jpeg(len: usize) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.resize(len.max(4), 0);
    data
}

pub fn png(len: usize) -> Vec<u8> {
    let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    data.resize(len.max(8), 0);
    data
}

pub fn webp(len: usize) -> Vec<u8> {
    let mut data = b"RIFF\x00\x00\x00\x00WEBP".to_vec();
    data.resize(len.max(12), 0);
    data
}

pub fn part(data: Vec<u8>, file_name: &str, mime_type: &str) -> Part {
    Part::bytes(Bytes::from(data))
        .file_name(file_name)
        .mime_type(mime_type)
}
