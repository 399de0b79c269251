//! PE container walk: from file bytes to the CLI metadata blob

use crate::bytes::{slice, u16_at, u32_at};
use crate::errors::FormatError;

const DOS_MAGIC: &[u8] = b"MZ";
const PE_SIGNATURE: &[u8] = b"PE\0\0";
const E_LFANEW_OFFSET: usize = 0x3c;
const COFF_HEADER_SIZE: usize = 20;
const SECTION_HEADER_SIZE: usize = 40;
const PE32_MAGIC: u16 = 0x10b;
const PE32_PLUS_MAGIC: u16 = 0x20b;
const CLR_DIRECTORY_INDEX: usize = 14;

#[derive(Debug, Clone, Copy)]
struct Section {
    virtual_address: u32,
    raw_size: u32,
    raw_pointer: u32,
}

impl Section {
    fn file_offset(&self, rva: u32) -> Option<usize> {
        // Only the raw part of a section is backed by file bytes
        let delta = rva.checked_sub(self.virtual_address)?;
        if delta >= self.raw_size {
            return None;
        }
        Some(self.raw_pointer as usize + delta as usize)
    }
}

fn rva_to_offset(sections: &[Section], rva: u32) -> Result<usize, FormatError> {
    sections
        .iter()
        .find_map(|s| s.file_offset(rva))
        .ok_or(FormatError::UnmappedRva(rva))
}

/// Return the CLI metadata blob (starting at the `BSJB` root) of a PE image
pub(crate) fn cli_metadata(image: &[u8]) -> Result<&[u8], FormatError> {
    if slice(image, 0, 2)? != DOS_MAGIC {
        return Err(FormatError::BadSignature("DOS"));
    }

    let pe_offset = u32_at(image, E_LFANEW_OFFSET)? as usize;
    if slice(image, pe_offset, 4)? != PE_SIGNATURE {
        return Err(FormatError::BadSignature("PE"));
    }

    let coff = pe_offset + 4;
    let section_count = u16_at(image, coff + 2)? as usize;
    let optional_size = u16_at(image, coff + 16)? as usize;
    let optional = coff + COFF_HEADER_SIZE;

    let (count_offset, directories_offset) = match u16_at(image, optional)? {
        PE32_MAGIC => (92, 96),
        PE32_PLUS_MAGIC => (108, 112),
        other => return Err(FormatError::UnsupportedOptionalHeader(other)),
    };

    let directory_count = u32_at(image, optional + count_offset)? as usize;
    if directory_count <= CLR_DIRECTORY_INDEX {
        return Err(FormatError::NotManaged);
    }
    let clr_entry = optional + directories_offset + CLR_DIRECTORY_INDEX * 8;
    let clr_rva = u32_at(image, clr_entry)?;
    if clr_rva == 0 {
        return Err(FormatError::NotManaged);
    }

    let section_table = optional + optional_size;
    let sections = (0..section_count)
        .map(|i| {
            let base = section_table + i * SECTION_HEADER_SIZE;
            Ok(Section {
                virtual_address: u32_at(image, base + 12)?,
                raw_size: u32_at(image, base + 16)?,
                raw_pointer: u32_at(image, base + 20)?,
            })
        })
        .collect::<Result<Vec<_>, FormatError>>()?;

    // CLI header: cb, runtime version, then the metadata directory
    let cli_header = rva_to_offset(&sections, clr_rva)?;
    let metadata_rva = u32_at(image, cli_header + 8)?;
    let metadata_size = u32_at(image, cli_header + 12)? as usize;
    let metadata_offset = rva_to_offset(&sections, metadata_rva)?;

    slice(image, metadata_offset, metadata_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_pe() {
        assert_eq!(
            cli_metadata(b"not an executable"),
            Err(FormatError::BadSignature("DOS"))
        );
        assert_eq!(cli_metadata(b"M"), Err(FormatError::Truncated { offset: 0 }));
    }

    #[test]
    fn test_truncated_after_dos_header() {
        let mut image = vec![0u8; 0x40];
        image[0] = b'M';
        image[1] = b'Z';
        image[E_LFANEW_OFFSET] = 0x80;
        assert!(matches!(
            cli_metadata(&image),
            Err(FormatError::Truncated { .. })
        ));
    }

    #[test]
    fn test_section_mapping() {
        let section = Section {
            virtual_address: 0x2000,
            raw_size: 0x200,
            raw_pointer: 0x400,
        };
        assert_eq!(section.file_offset(0x2010), Some(0x410));
        assert_eq!(section.file_offset(0x1fff), None);
        assert_eq!(section.file_offset(0x2200), None);
        assert_eq!(
            rva_to_offset(&[section], 0x9000),
            Err(FormatError::UnmappedRva(0x9000))
        );
    }
}
