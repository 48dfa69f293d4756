//! In-memory zip archive builder for package fixtures.

use std::{
    io::{Cursor, Write},
    path::Path,
};

use zip::{CompressionMethod, ZipWriter, write::FileOptions};

enum Entry {
    File(String, Vec<u8>),
    Dir(String),
}

/// Builds zip archives entry by entry, in insertion order.
///
/// Entry names are written verbatim, so hostile names such as
/// `../escape.txt` can be produced for negative tests.
#[derive(Default)]
pub struct ZipBuilder {
    entries: Vec<Entry>,
}

impl ZipBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn file(mut self, name: &str, contents: impl AsRef<[u8]>) -> Self {
        self.entries
            .push(Entry::File(name.to_string(), contents.as_ref().to_vec()));
        self
    }

    #[must_use]
    pub fn dir(mut self, name: &str) -> Self {
        self.entries.push(Entry::Dir(name.to_string()));
        self
    }

    /// Serialize the archive.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for entry in self.entries {
            match entry {
                Entry::File(name, contents) => {
                    writer.start_file(name, options).expect("start zip entry");
                    writer.write_all(&contents).expect("write zip entry");
                }
                Entry::Dir(name) => {
                    writer.add_directory(name, options).expect("add zip dir");
                }
            }
        }
        writer.finish().expect("finish zip").into_inner()
    }

    /// Serialize the archive to `path`, creating parent directories.
    pub fn write_to(self, path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create zip parent dir");
        }
        std::fs::write(path, self.build()).expect("write zip file");
    }
}
