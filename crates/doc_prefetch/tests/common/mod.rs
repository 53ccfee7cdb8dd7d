use doc_prefetch::{DocumentRecord, ImagePayload, InMemoryStore, RecordStore};
use image::{DynamicImage, ImageFormat, RgbImage};

/// Builds a record with a gradient RGB image and `dbid`/`num` set so tests
/// can tell which source and position a batch entry came from.
pub fn doc_record(width: u32, height: u32, source: f32, index: f32) -> DocumentRecord {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 251) as u8, (y % 251) as u8, source as u8])
    }));
    DocumentRecord {
        image: ImagePayload::encode(&img, ImageFormat::Png).unwrap(),
        dbid: Some(source),
        num: Some(index),
        ..Default::default()
    }
}

/// Wraps records into an in-memory store keyed by zero-padded position.
pub fn store_of(records: Vec<DocumentRecord>) -> Box<dyn RecordStore> {
    let entries = records
        .iter()
        .enumerate()
        .map(|(i, r)| (format!("{:04}", i).into_bytes(), r.to_bytes().unwrap()))
        .collect();
    Box::new(InMemoryStore::new(entries))
}

/// A store of `count` same-shaped records tagged with `source_id`.
pub fn sequential_source(
    source_id: usize,
    count: usize,
    width: u32,
    height: u32,
) -> Box<dyn RecordStore> {
    let records = (0..count)
        .map(|i| doc_record(width, height, source_id as f32, i as f32))
        .collect();
    store_of(records)
}
