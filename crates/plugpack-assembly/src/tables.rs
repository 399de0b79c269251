//! ECMA-335 metadata decoding, just far enough to reach the Assembly row.
//!
//! Rows of every table that precedes Assembly (0x00..=0x1F) have to be sized
//! to skip them, which depends on heap index widths and coded index widths.

use crate::bytes::{align4, index_at, slice, u16_at, u32_at, Reader};
use crate::errors::FormatError;
use crate::identity::{AssemblyIdentity, AssemblyVersion};

const METADATA_SIGNATURE: u32 = 0x424a_5342; // "BSJB"

const HEAP_STRINGS_WIDE: u8 = 0x01;
const HEAP_GUID_WIDE: u8 = 0x02;
const HEAP_BLOB_WIDE: u8 = 0x04;
const HEAP_EXTRA_DATA: u8 = 0x40;

mod table {
    pub const MODULE: usize = 0x00;
    pub const TYPE_REF: usize = 0x01;
    pub const TYPE_DEF: usize = 0x02;
    pub const FIELD_PTR: usize = 0x03;
    pub const FIELD: usize = 0x04;
    pub const METHOD_PTR: usize = 0x05;
    pub const METHOD_DEF: usize = 0x06;
    pub const PARAM_PTR: usize = 0x07;
    pub const PARAM: usize = 0x08;
    pub const INTERFACE_IMPL: usize = 0x09;
    pub const MEMBER_REF: usize = 0x0a;
    pub const CONSTANT: usize = 0x0b;
    pub const CUSTOM_ATTRIBUTE: usize = 0x0c;
    pub const FIELD_MARSHAL: usize = 0x0d;
    pub const DECL_SECURITY: usize = 0x0e;
    pub const CLASS_LAYOUT: usize = 0x0f;
    pub const FIELD_LAYOUT: usize = 0x10;
    pub const STAND_ALONE_SIG: usize = 0x11;
    pub const EVENT_MAP: usize = 0x12;
    pub const EVENT_PTR: usize = 0x13;
    pub const EVENT: usize = 0x14;
    pub const PROPERTY_MAP: usize = 0x15;
    pub const PROPERTY_PTR: usize = 0x16;
    pub const PROPERTY: usize = 0x17;
    pub const METHOD_SEMANTICS: usize = 0x18;
    pub const METHOD_IMPL: usize = 0x19;
    pub const MODULE_REF: usize = 0x1a;
    pub const TYPE_SPEC: usize = 0x1b;
    pub const IMPL_MAP: usize = 0x1c;
    pub const FIELD_RVA: usize = 0x1d;
    pub const ENC_LOG: usize = 0x1e;
    pub const ENC_MAP: usize = 0x1f;
    pub const ASSEMBLY: usize = 0x20;
    pub const ASSEMBLY_REF: usize = 0x23;
    pub const FILE: usize = 0x26;
    pub const EXPORTED_TYPE: usize = 0x27;
    pub const MANIFEST_RESOURCE: usize = 0x28;
    pub const GENERIC_PARAM: usize = 0x2a;
    pub const METHOD_SPEC: usize = 0x2b;
    pub const GENERIC_PARAM_CONSTRAINT: usize = 0x2c;
}

use table::{
    ASSEMBLY, ASSEMBLY_REF, CLASS_LAYOUT, CONSTANT, CUSTOM_ATTRIBUTE, DECL_SECURITY, ENC_LOG,
    ENC_MAP, EVENT, EVENT_MAP, EVENT_PTR, EXPORTED_TYPE, FIELD, FIELD_LAYOUT, FIELD_MARSHAL,
    FIELD_PTR, FIELD_RVA, FILE, GENERIC_PARAM, GENERIC_PARAM_CONSTRAINT, IMPL_MAP, INTERFACE_IMPL,
    MANIFEST_RESOURCE, MEMBER_REF, METHOD_DEF, METHOD_IMPL, METHOD_PTR, METHOD_SEMANTICS,
    METHOD_SPEC, MODULE, MODULE_REF, PARAM, PARAM_PTR, PROPERTY, PROPERTY_MAP, PROPERTY_PTR,
    STAND_ALONE_SIG, TYPE_DEF, TYPE_REF, TYPE_SPEC,
};

/// Index widths derived from the tables stream header
struct Layout {
    rows: [u32; 64],
    string: usize,
    guid: usize,
    blob: usize,
}

impl Layout {
    fn simple(&self, t: usize) -> usize {
        if self.rows[t] < 0x1_0000 {
            2
        } else {
            4
        }
    }

    fn coded(&self, tag_bits: u32, tables: &[usize]) -> usize {
        let max_rows = tables.iter().map(|&t| self.rows[t]).max().unwrap_or(0);
        if max_rows < (1u32 << (16 - tag_bits)) {
            2
        } else {
            4
        }
    }

    fn type_def_or_ref(&self) -> usize {
        self.coded(2, &[TYPE_DEF, TYPE_REF, TYPE_SPEC])
    }

    fn method_def_or_ref(&self) -> usize {
        self.coded(1, &[METHOD_DEF, MEMBER_REF])
    }

    fn row_size(&self, t: usize) -> usize {
        let (s, g, b) = (self.string, self.guid, self.blob);
        match t {
            MODULE => 2 + s + 3 * g,
            TYPE_REF => self.coded(2, &[MODULE, MODULE_REF, ASSEMBLY_REF, TYPE_REF]) + 2 * s,
            TYPE_DEF => {
                4 + 2 * s + self.type_def_or_ref() + self.simple(FIELD) + self.simple(METHOD_DEF)
            }
            FIELD_PTR => self.simple(FIELD),
            FIELD => 2 + s + b,
            METHOD_PTR => self.simple(METHOD_DEF),
            METHOD_DEF => 8 + s + b + self.simple(PARAM),
            PARAM_PTR => self.simple(PARAM),
            PARAM => 4 + s,
            INTERFACE_IMPL => self.simple(TYPE_DEF) + self.type_def_or_ref(),
            MEMBER_REF => {
                self.coded(3, &[TYPE_DEF, TYPE_REF, MODULE_REF, METHOD_DEF, TYPE_SPEC]) + s + b
            }
            CONSTANT => 2 + self.coded(2, &[FIELD, PARAM, PROPERTY]) + b,
            CUSTOM_ATTRIBUTE => {
                self.coded(
                    5,
                    &[
                        METHOD_DEF,
                        FIELD,
                        TYPE_REF,
                        TYPE_DEF,
                        PARAM,
                        INTERFACE_IMPL,
                        MEMBER_REF,
                        MODULE,
                        DECL_SECURITY,
                        PROPERTY,
                        EVENT,
                        STAND_ALONE_SIG,
                        MODULE_REF,
                        TYPE_SPEC,
                        ASSEMBLY,
                        ASSEMBLY_REF,
                        FILE,
                        EXPORTED_TYPE,
                        MANIFEST_RESOURCE,
                        GENERIC_PARAM,
                        GENERIC_PARAM_CONSTRAINT,
                        METHOD_SPEC,
                    ],
                ) + self.coded(3, &[METHOD_DEF, MEMBER_REF])
                    + b
            }
            FIELD_MARSHAL => self.coded(1, &[FIELD, PARAM]) + b,
            DECL_SECURITY => 2 + self.coded(2, &[TYPE_DEF, METHOD_DEF, ASSEMBLY]) + b,
            CLASS_LAYOUT => 6 + self.simple(TYPE_DEF),
            FIELD_LAYOUT => 4 + self.simple(FIELD),
            STAND_ALONE_SIG => b,
            EVENT_MAP => self.simple(TYPE_DEF) + self.simple(EVENT),
            EVENT_PTR => self.simple(EVENT),
            EVENT => 2 + s + self.type_def_or_ref(),
            PROPERTY_MAP => self.simple(TYPE_DEF) + self.simple(PROPERTY),
            PROPERTY_PTR => self.simple(PROPERTY),
            PROPERTY => 2 + s + b,
            METHOD_SEMANTICS => 2 + self.simple(METHOD_DEF) + self.coded(1, &[EVENT, PROPERTY]),
            METHOD_IMPL => self.simple(TYPE_DEF) + 2 * self.method_def_or_ref(),
            MODULE_REF => s,
            TYPE_SPEC => b,
            IMPL_MAP => 2 + self.coded(1, &[FIELD, METHOD_DEF]) + s + self.simple(MODULE_REF),
            FIELD_RVA => 4 + self.simple(FIELD),
            ENC_LOG => 8,
            ENC_MAP => 4,
            _ => 0,
        }
    }
}

struct Streams<'a> {
    tables: &'a [u8],
    strings: &'a [u8],
}

fn locate_streams(metadata: &[u8]) -> Result<Streams<'_>, FormatError> {
    if u32_at(metadata, 0)? != METADATA_SIGNATURE {
        return Err(FormatError::BadSignature("metadata root"));
    }

    // Signature, major, minor, reserved, then the length-prefixed runtime version
    let version_len = u32_at(metadata, 12)? as usize;
    let mut reader = Reader::new(metadata, 16);
    reader.skip(align4(version_len))?;
    let _flags = reader.u16()?;
    let stream_count = reader.u16()?;

    let mut tables = None;
    let mut strings = None;
    for _ in 0..stream_count {
        let offset = reader.u32()? as usize;
        let size = reader.u32()? as usize;
        match reader.padded_name(0)? {
            b"#~" | b"#-" => tables = Some(slice(metadata, offset, size)?),
            b"#Strings" => strings = Some(slice(metadata, offset, size)?),
            _ => {}
        }
    }

    Ok(Streams {
        tables: tables.ok_or(FormatError::MissingStream("#~"))?,
        strings: strings.ok_or(FormatError::MissingStream("#Strings"))?,
    })
}

fn read_string(heap: &[u8], index: u32) -> Result<String, FormatError> {
    let start = index as usize;
    let rest = heap
        .get(start..)
        .ok_or(FormatError::Truncated { offset: start })?;
    let len = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or(FormatError::Truncated { offset: start })?;
    std::str::from_utf8(&rest[..len])
        .map(str::to_string)
        .map_err(|_| FormatError::InvalidString(index))
}

/// Decode the assembly name and version from a CLI metadata blob
pub(crate) fn assembly_identity(metadata: &[u8]) -> Result<AssemblyIdentity, FormatError> {
    let streams = locate_streams(metadata)?;
    let data = streams.tables;

    // Reserved(4), major, minor, heap sizes, reserved, valid, sorted, row counts
    let mut reader = Reader::new(data, 6);
    let heap_sizes = reader.u8()?;
    reader.skip(1)?;
    let valid = reader.u64()?;
    let _sorted = reader.u64()?;

    let mut rows = [0u32; 64];
    for (t, count) in rows.iter_mut().enumerate() {
        if valid & (1u64 << t) != 0 {
            *count = reader.u32()?;
        }
    }
    if heap_sizes & HEAP_EXTRA_DATA != 0 {
        reader.skip(4)?;
    }

    if rows[ASSEMBLY] == 0 {
        return Err(FormatError::NoAssemblyRow);
    }

    let layout = Layout {
        rows,
        string: if heap_sizes & HEAP_STRINGS_WIDE != 0 { 4 } else { 2 },
        guid: if heap_sizes & HEAP_GUID_WIDE != 0 { 4 } else { 2 },
        blob: if heap_sizes & HEAP_BLOB_WIDE != 0 { 4 } else { 2 },
    };

    let mut row = reader.pos();
    for t in MODULE..ASSEMBLY {
        row += layout.rows[t] as usize * layout.row_size(t);
    }

    // HashAlgId(4), version quad, Flags(4), PublicKey(blob), Name(string), Culture(string)
    let version = AssemblyVersion::new(
        u16_at(data, row + 4)?,
        u16_at(data, row + 6)?,
        u16_at(data, row + 8)?,
        u16_at(data, row + 10)?,
    );
    let name_index = index_at(data, row + 16 + layout.blob, layout.string)?;
    let name = read_string(streams.strings, name_index)?;

    Ok(AssemblyIdentity { name, version })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(rows: &[(usize, u32)], heap_sizes: u8) -> Layout {
        let mut counts = [0u32; 64];
        for &(t, n) in rows {
            counts[t] = n;
        }
        Layout {
            rows: counts,
            string: if heap_sizes & HEAP_STRINGS_WIDE != 0 { 4 } else { 2 },
            guid: if heap_sizes & HEAP_GUID_WIDE != 0 { 4 } else { 2 },
            blob: if heap_sizes & HEAP_BLOB_WIDE != 0 { 4 } else { 2 },
        }
    }

    #[test]
    fn test_small_image_row_sizes() {
        let l = layout(&[(MODULE, 1), (TYPE_DEF, 3)], 0);
        assert_eq!(l.row_size(MODULE), 10);
        assert_eq!(l.row_size(TYPE_REF), 6);
        assert_eq!(l.row_size(TYPE_DEF), 14);
        assert_eq!(l.row_size(METHOD_DEF), 14);
        assert_eq!(l.row_size(CUSTOM_ATTRIBUTE), 6);
        assert_eq!(l.row_size(ENC_LOG), 8);
    }

    #[test]
    fn test_wide_heaps_and_coded_indexes() {
        // 2^11 custom-attribute parents overflow a 5-bit tag in 16 bits
        let l = layout(&[(METHOD_DEF, 1 << 11)], HEAP_STRINGS_WIDE | HEAP_BLOB_WIDE);
        assert_eq!(l.row_size(CUSTOM_ATTRIBUTE), 4 + 2 + 4);
        assert_eq!(l.row_size(MODULE), 2 + 4 + 6);
        // MemberRefParent uses 3 tag bits: 2048 rows still fit
        assert_eq!(l.row_size(MEMBER_REF), 2 + 4 + 4);
        assert_eq!(l.simple(METHOD_DEF), 2);
    }

    #[test]
    fn test_simple_index_widens_past_u16() {
        let l = layout(&[(FIELD, 0x1_0000)], 0);
        assert_eq!(l.simple(FIELD), 4);
        assert_eq!(l.row_size(FIELD_RVA), 8);
    }

    #[test]
    fn test_bad_metadata_signature() {
        let blob = [0u8; 32];
        assert!(matches!(
            assembly_identity(&blob),
            Err(FormatError::BadSignature("metadata root"))
        ));
    }

    #[test]
    fn test_read_string() {
        let heap = b"\0Core\0Extra\0";
        assert_eq!(read_string(heap, 1), Ok("Core".to_string()));
        assert_eq!(read_string(heap, 6), Ok("Extra".to_string()));
        assert!(read_string(heap, 40).is_err());
    }
}
