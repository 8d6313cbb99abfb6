#![allow(dead_code)]

use reclaim::{CatalogSource, Collection, CoreError, Handle, SourceTier, Storage};
use reclaim_core::{ByteStream, RawRecord, Selector, WriteStream};
use reclaim_io::LocalStorage;
use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// In-memory catalog that counts how often it was queried.
pub struct VecCatalog {
    id: String,
    tier: SourceTier,
    records: Vec<(Collection, RawRecord)>,
    pub queries: AtomicUsize,
}

impl VecCatalog {
    pub fn new(id: &str, tier: SourceTier) -> Self {
        Self {
            id: id.to_string(),
            tier,
            records: Vec::new(),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn with(self, collection: Collection, handle: &str, name: &str, size: u64) -> Self {
        self.record(collection, handle, name, size, false)
    }

    /// Adds a record the catalog itself marks as trashed.
    pub fn with_trashed(self, collection: Collection, handle: &str, name: &str, size: u64) -> Self {
        self.record(collection, handle, name, size, true)
    }

    fn record(mut self, collection: Collection, handle: &str, name: &str, size: u64, trashed: bool) -> Self {
        self.records.push((
            collection,
            RawRecord {
                handle: Handle::from(handle),
                name: name.to_string(),
                mime: None,
                size,
                trashed,
            },
        ));
        self
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl CatalogSource for VecCatalog {
    fn id(&self) -> &str {
        &self.id
    }

    fn tier(&self) -> SourceTier {
        self.tier
    }

    fn list_records<'a>(
        &'a self,
        selector: &Selector,
    ) -> reclaim_core::Result<Box<dyn Iterator<Item = reclaim_core::Result<RawRecord>> + 'a>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let collection = selector.collection;
        Ok(Box::new(
            self.records
                .iter()
                .filter(move |(c, _)| *c == collection)
                .map(|(_, r)| Ok(r.clone())),
        ))
    }
}

/// Local storage whose writers flip one byte of everything they write.
pub struct CorruptingStorage {
    inner: LocalStorage,
    flip_at: u64,
}

impl CorruptingStorage {
    pub fn new(flip_at: u64) -> Self {
        Self {
            inner: LocalStorage::new(),
            flip_at,
        }
    }
}

struct FlippingWriter {
    inner: Box<dyn WriteStream>,
    position: u64,
    flip_at: u64,
}

impl Write for FlippingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut chunk = buf.to_vec();
        let end = self.position + chunk.len() as u64;
        if (self.position..end).contains(&self.flip_at) {
            chunk[(self.flip_at - self.position) as usize] ^= 0xFF;
        }
        self.inner.write_all(&chunk)?;
        self.position = end;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for FlippingWriter {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.position = self.inner.seek(pos)?;
        Ok(self.position)
    }
}

impl WriteStream for FlippingWriter {
    fn sync_all(&mut self) -> io::Result<()> {
        self.inner.sync_all()
    }
}

impl Storage for CorruptingStorage {
    fn open_read(&self, handle: &Handle) -> reclaim_core::Result<Box<dyn ByteStream>> {
        self.inner.open_read(handle)
    }

    fn create_writable(&self, dir: &Handle, name: &str, mime_hint: &str) -> reclaim_core::Result<Handle> {
        self.inner.create_writable(dir, name, mime_hint)
    }

    fn open_write(&self, handle: &Handle) -> reclaim_core::Result<Box<dyn WriteStream>> {
        Ok(Box::new(FlippingWriter {
            inner: self.inner.open_write(handle)?,
            position: 0,
            flip_at: self.flip_at,
        }))
    }

    fn find_child(&self, dir: &Handle, name: &str) -> reclaim_core::Result<Option<Handle>> {
        self.inner.find_child(dir, name)
    }

    fn rename(&self, handle: &Handle, new_name: &str) -> reclaim_core::Result<Handle> {
        self.inner.rename(handle, new_name)
    }

    fn delete(&self, handle: &Handle) -> reclaim_core::Result<()> {
        self.inner.delete(handle)
    }

    fn display_name(&self, handle: &Handle) -> Option<String> {
        self.inner.display_name(handle)
    }

    fn is_directory(&self, dir: &Handle) -> bool {
        self.inner.is_directory(dir)
    }
}

pub fn not_found(what: &str) -> CoreError {
    CoreError::NotFound(what.to_string())
}

pub fn handle(path: &Path) -> Handle {
    LocalStorage::handle_for(path)
}

/// Names of the files directly inside `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 7) as u8, (y * 13) as u8, ((x + y) * 3) as u8])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Jpeg).unwrap();
    out.into_inner()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([30, 140, 200]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// A JPEG cut off right after its frame header, followed by zero padding:
/// the header probe sees valid bounds but a full decode fails.
pub fn truncated_jpeg() -> Vec<u8> {
    let full = jpeg_bytes(64, 64);
    let sof = full
        .windows(2)
        .position(|w| w == [0xFF, 0xC0])
        .expect("baseline jpeg has SOF0");
    let len = u16::from_be_bytes([full[sof + 2], full[sof + 3]]) as usize;
    let mut cut = full[..sof + 2 + len].to_vec();
    cut.extend_from_slice(&[0u8; 256]);
    cut
}

pub fn wav_bytes(samples: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut out = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut out, spec).unwrap();
        for i in 0..samples {
            writer.write_sample(((i % 100) as i16) * 100).unwrap();
        }
        writer.finalize().unwrap();
    }
    out.into_inner()
}

pub fn mp4_bytes(frames: u32) -> Vec<u8> {
    use mp4::{AvcConfig, MediaConfig, Mp4Config, Mp4Sample, Mp4Writer, TrackConfig, TrackType};

    let config = Mp4Config {
        major_brand: str::parse("isom").unwrap(),
        minor_version: 512,
        compatible_brands: vec![str::parse("isom").unwrap()],
        timescale: 1000,
    };
    let mut muxer = Mp4Writer::write_start(Cursor::new(Vec::new()), &config).unwrap();
    muxer
        .add_track(&TrackConfig {
            track_type: TrackType::Video,
            timescale: 1000,
            language: "und".to_string(),
            media_conf: MediaConfig::AvcConfig(AvcConfig {
                width: 64,
                height: 48,
                seq_param_set: vec![0x67, 0x42, 0x00, 0x0a, 0xf8, 0x41, 0xa2],
                pic_param_set: vec![0x68, 0xce, 0x38, 0x80],
            }),
        })
        .unwrap();
    for i in 0..frames {
        let sample = Mp4Sample {
            start_time: u64::from(i) * 40,
            duration: 40,
            rendering_offset: 0,
            is_sync: i == 0,
            bytes: bytes::Bytes::from(vec![i as u8; 32]),
        };
        muxer.write_sample(1, &sample).unwrap();
    }
    muxer.write_end().unwrap();
    muxer.into_writer().into_inner()
}

pub fn pdf_bytes(pages: usize) -> Vec<u8> {
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for _ in 0..pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(Object::from(page_id));
    }
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages as i64,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// A ZIP with stored (uncompressed) entries, so payload bytes can be
/// located and damaged in place.
pub fn stored_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, body) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(body).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Stored entries written the way streaming zip writers lay them out: zero
/// sizes in each local header, the real sizes in a data descriptor after the
/// body, and a central directory that carries them again.
pub fn descriptor_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut directory = Vec::new();
    for (name, body) in entries {
        let offset = out.len() as u32;
        let crc = crc32fast::hash(body);
        let size = body.len() as u32;

        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&0x0008u16.to_le_bytes());
        out.extend_from_slice(&[0u8; 18]);
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(&0x0807_4b50u32.to_le_bytes());
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());

        directory.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        directory.extend_from_slice(&20u16.to_le_bytes());
        directory.extend_from_slice(&20u16.to_le_bytes());
        directory.extend_from_slice(&0x0008u16.to_le_bytes());
        directory.extend_from_slice(&[0u8; 6]);
        directory.extend_from_slice(&crc.to_le_bytes());
        directory.extend_from_slice(&size.to_le_bytes());
        directory.extend_from_slice(&size.to_le_bytes());
        directory.extend_from_slice(&(name.len() as u16).to_le_bytes());
        directory.extend_from_slice(&[0u8; 12]);
        directory.extend_from_slice(&offset.to_le_bytes());
        directory.extend_from_slice(name.as_bytes());
    }

    let directory_at = out.len() as u32;
    out.extend_from_slice(&directory);
    out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
    out.extend_from_slice(&[0u8; 4]);
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(directory.len() as u32).to_le_bytes());
    out.extend_from_slice(&directory_at.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

pub fn tar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, body) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, name, *body).unwrap();
    }
    builder.into_inner().unwrap()
}

pub fn gzipped(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn tar_entry_names(data: &[u8]) -> Vec<String> {
    let mut archive = tar::Archive::new(data);
    let mut names: Vec<String> = archive
        .entries()
        .unwrap()
        .map(|e| String::from_utf8_lossy(&e.unwrap().path_bytes()).into_owned())
        .collect();
    names.sort();
    names
}

/// Flips the first byte of `needle` inside `data`, breaking the CRC of the
/// entry that carries it.
pub fn damage(data: &mut [u8], needle: &[u8]) {
    let at = data
        .windows(needle.len())
        .position(|w| w == needle)
        .expect("needle present");
    data[at] ^= 0xFF;
}

pub fn zip_entry_names(data: Vec<u8>) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}
