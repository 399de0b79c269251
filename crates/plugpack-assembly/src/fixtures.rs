//! Test support: synthetic managed images and an in-memory reader

use crate::errors::{FormatError, MetadataError};
use crate::identity::{AssemblyIdentity, AssemblyVersion};
use crate::reader::MetadataReader;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

const SECTION_RVA: u32 = 0x2000;
const FILE_ALIGNMENT: usize = 0x200;
const CLI_HEADER_SIZE: usize = 72;
const PE_OFFSET: usize = 0x80;

fn align(n: usize, to: usize) -> usize {
    n.div_ceil(to) * to
}

fn put_u16(buf: &mut [u8], at: usize, v: u16) {
    buf[at..at + 2].copy_from_slice(&v.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, v: u32) {
    buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

/// Builder for a minimal single-section PE image carrying CLI metadata
#[derive(Debug, Clone)]
pub struct AssemblyImage {
    name: String,
    version: AssemblyVersion,
    extra_rows: BTreeMap<usize, (u32, usize)>,
    pe32_plus: bool,
}

impl AssemblyImage {
    /// `version` must parse as an assembly version; invalid input builds 0.0.0.0
    pub fn new(name: &str, version: &str) -> Self {
        AssemblyImage {
            name: name.to_string(),
            version: version.parse().unwrap_or_default(),
            extra_rows: BTreeMap::new(),
            pe32_plus: false,
        }
    }

    /// Add `count` zeroed rows of `row_size` bytes to a table below Assembly
    pub fn with_rows(mut self, table: usize, count: u32, row_size: usize) -> Self {
        if (1..0x20).contains(&table) {
            self.extra_rows.insert(table, (count, row_size));
        }
        self
    }

    pub fn pe32_plus(mut self) -> Self {
        self.pe32_plus = true;
        self
    }

    fn strings_heap(&self) -> Vec<u8> {
        let mut heap = vec![0u8];
        heap.extend_from_slice(self.name.as_bytes());
        heap.push(0);
        heap.resize(align(heap.len(), 4), 0);
        heap
    }

    fn tables_stream(&self) -> Vec<u8> {
        let mut tables = self.extra_rows.clone();
        tables.insert(0x00, (1, 10));

        let mut valid = 1u64 << 0x20;
        for t in tables.keys() {
            valid |= 1u64 << t;
        }

        let mut stream = vec![0, 0, 0, 0, 2, 0, 0, 1];
        stream.extend_from_slice(&valid.to_le_bytes());
        stream.extend_from_slice(&0u64.to_le_bytes());
        for &(count, _) in tables.values() {
            stream.extend_from_slice(&count.to_le_bytes());
        }
        stream.extend_from_slice(&1u32.to_le_bytes());

        for &(count, row_size) in tables.values() {
            stream.resize(stream.len() + count as usize * row_size, 0);
        }

        // Assembly row: hash algorithm, version quad, flags, public key, name, culture
        stream.extend_from_slice(&0x8004u32.to_le_bytes());
        for part in [
            self.version.major,
            self.version.minor,
            self.version.build,
            self.version.revision,
        ] {
            stream.extend_from_slice(&part.to_le_bytes());
        }
        stream.extend_from_slice(&0u32.to_le_bytes());
        stream.extend_from_slice(&0u16.to_le_bytes());
        stream.extend_from_slice(&1u16.to_le_bytes());
        stream.extend_from_slice(&0u16.to_le_bytes());
        stream.resize(align(stream.len(), 4), 0);
        stream
    }

    fn metadata(&self) -> Vec<u8> {
        let tables = self.tables_stream();
        let strings = self.strings_heap();
        let runtime = b"v4.0.30319\0\0";
        let header_len = 16 + runtime.len() + 4 + 12 + 20;

        let mut root = Vec::with_capacity(header_len + tables.len() + strings.len());
        root.extend_from_slice(b"BSJB");
        root.extend_from_slice(&1u16.to_le_bytes());
        root.extend_from_slice(&1u16.to_le_bytes());
        root.extend_from_slice(&0u32.to_le_bytes());
        root.extend_from_slice(&(runtime.len() as u32).to_le_bytes());
        root.extend_from_slice(runtime);
        root.extend_from_slice(&0u16.to_le_bytes());
        root.extend_from_slice(&2u16.to_le_bytes());

        root.extend_from_slice(&(header_len as u32).to_le_bytes());
        root.extend_from_slice(&(tables.len() as u32).to_le_bytes());
        root.extend_from_slice(b"#~\0\0");
        root.extend_from_slice(&((header_len + tables.len()) as u32).to_le_bytes());
        root.extend_from_slice(&(strings.len() as u32).to_le_bytes());
        root.extend_from_slice(b"#Strings\0\0\0\0");

        root.extend_from_slice(&tables);
        root.extend_from_slice(&strings);
        root
    }

    /// Assemble the complete PE image
    pub fn build(&self) -> Vec<u8> {
        let metadata = self.metadata();
        let mut section = vec![0u8; CLI_HEADER_SIZE];
        put_u32(&mut section, 0, CLI_HEADER_SIZE as u32);
        put_u16(&mut section, 4, 2);
        put_u16(&mut section, 6, 5);
        put_u32(&mut section, 8, SECTION_RVA + CLI_HEADER_SIZE as u32);
        put_u32(&mut section, 12, metadata.len() as u32);
        section.extend_from_slice(&metadata);
        let content_len = section.len();
        section.resize(align(content_len, FILE_ALIGNMENT), 0);

        let mut image = pe_headers(
            self.pe32_plus,
            Some(CLI_HEADER_SIZE as u32),
            content_len,
            section.len(),
        );
        image.extend_from_slice(&section);
        image
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.build())
    }

    pub fn identity(&self) -> AssemblyIdentity {
        AssemblyIdentity {
            name: self.name.clone(),
            version: self.version,
        }
    }
}

/// DOS, PE, COFF, optional header and one section header, padded to the
/// section's raw data pointer.
fn pe_headers(
    pe32_plus: bool,
    clr_size: Option<u32>,
    virtual_size: usize,
    raw_size: usize,
) -> Vec<u8> {
    let optional_size: usize = if pe32_plus { 240 } else { 224 };
    let optional = PE_OFFSET + 4 + 20;
    let section_header = optional + optional_size;
    let raw_pointer = align(section_header + 40, FILE_ALIGNMENT);

    let mut image = vec![0u8; raw_pointer];
    image[0..2].copy_from_slice(b"MZ");
    put_u32(&mut image, 0x3c, PE_OFFSET as u32);
    image[PE_OFFSET..PE_OFFSET + 4].copy_from_slice(b"PE\0\0");

    let coff = PE_OFFSET + 4;
    put_u16(&mut image, coff, if pe32_plus { 0x8664 } else { 0x14c });
    put_u16(&mut image, coff + 2, 1);
    put_u16(&mut image, coff + 16, optional_size as u16);
    put_u16(&mut image, coff + 18, 0x2102);

    let (magic, count_offset, directories_offset) = if pe32_plus {
        (0x20b, 108, 112)
    } else {
        (0x10b, 92, 96)
    };
    put_u16(&mut image, optional, magic);
    put_u32(&mut image, optional + count_offset, 16);
    if let Some(size) = clr_size {
        let clr = optional + directories_offset + 14 * 8;
        put_u32(&mut image, clr, SECTION_RVA);
        put_u32(&mut image, clr + 4, size);
    }

    image[section_header..section_header + 5].copy_from_slice(b".text");
    put_u32(&mut image, section_header + 8, virtual_size as u32);
    put_u32(&mut image, section_header + 12, SECTION_RVA);
    put_u32(&mut image, section_header + 16, raw_size as u32);
    put_u32(&mut image, section_header + 20, raw_pointer as u32);
    image
}

/// A valid PE image without a CLI header, like a native C++ DLL
pub fn native_image() -> Vec<u8> {
    let mut image = pe_headers(false, None, 16, FILE_ALIGNMENT);
    image.resize(image.len() + FILE_ALIGNMENT, 0xcc);
    image
}

/// Metadata reader answering from a fixed path -> identity table.
///
/// Every call is recorded so tests can assert which files were read.
#[derive(Debug, Default)]
pub struct StaticMetadataReader {
    identities: HashMap<PathBuf, AssemblyIdentity>,
    reads: RefCell<Vec<PathBuf>>,
}

impl StaticMetadataReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, name: &str, version: &str) -> Self {
        self.identities.insert(
            path.into(),
            AssemblyIdentity {
                name: name.to_string(),
                version: version.parse().unwrap_or_default(),
            },
        );
        self
    }

    pub fn reads(&self) -> Vec<PathBuf> {
        self.reads.borrow().clone()
    }
}

impl MetadataReader for StaticMetadataReader {
    fn read(&self, path: &Path) -> Result<AssemblyIdentity, MetadataError> {
        self.reads.borrow_mut().push(path.to_path_buf());
        self.identities
            .get(path)
            .cloned()
            .ok_or_else(|| MetadataError::NotAssembly {
                path: path.to_path_buf(),
                source: FormatError::NotManaged,
            })
    }
}
