//! Bounds-checked little-endian reads over a byte slice

use crate::errors::FormatError;

pub(crate) fn slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8], FormatError> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or(FormatError::Truncated { offset })
}

pub(crate) fn u16_at(data: &[u8], offset: usize) -> Result<u16, FormatError> {
    let b = slice(data, offset, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

pub(crate) fn u32_at(data: &[u8], offset: usize) -> Result<u32, FormatError> {
    let b = slice(data, offset, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

pub(crate) fn u64_at(data: &[u8], offset: usize) -> Result<u64, FormatError> {
    let lo = u32_at(data, offset)? as u64;
    let hi = u32_at(data, offset + 4)? as u64;
    Ok(lo | (hi << 32))
}

/// Heap or table index of 2 or 4 bytes
pub(crate) fn index_at(data: &[u8], offset: usize, width: usize) -> Result<u32, FormatError> {
    if width == 4 {
        u32_at(data, offset)
    } else {
        u16_at(data, offset).map(u32::from)
    }
}

/// Sequential reader used for the header walks
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8], pos: usize) -> Self {
        Reader { data, pos }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<(), FormatError> {
        slice(self.data, self.pos, len)?;
        self.pos += len;
        Ok(())
    }

    pub(crate) fn u8(&mut self) -> Result<u8, FormatError> {
        let b = slice(self.data, self.pos, 1)?[0];
        self.pos += 1;
        Ok(b)
    }

    pub(crate) fn u16(&mut self) -> Result<u16, FormatError> {
        let v = u16_at(self.data, self.pos)?;
        self.pos += 2;
        Ok(v)
    }

    pub(crate) fn u32(&mut self) -> Result<u32, FormatError> {
        let v = u32_at(self.data, self.pos)?;
        self.pos += 4;
        Ok(v)
    }

    pub(crate) fn u64(&mut self) -> Result<u64, FormatError> {
        let v = u64_at(self.data, self.pos)?;
        self.pos += 8;
        Ok(v)
    }

    /// NUL-terminated name, then skip padding to the next 4-byte boundary
    /// measured from `base`.
    pub(crate) fn padded_name(&mut self, base: usize) -> Result<&'a [u8], FormatError> {
        let start = self.pos;
        let rest = self
            .data
            .get(start..)
            .ok_or(FormatError::Truncated { offset: start })?;
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(FormatError::Truncated { offset: start })?;
        let consumed = align4(start - base + len + 1) - (start - base);
        self.skip(consumed)?;
        Ok(&rest[..len])
    }
}

pub(crate) fn align4(n: usize) -> usize {
    (n + 3) & !3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_are_bounds_checked() {
        let data = [0x01, 0x02, 0x03];
        assert_eq!(u16_at(&data, 0), Ok(0x0201));
        assert_eq!(u16_at(&data, 2), Err(FormatError::Truncated { offset: 2 }));
        assert!(u32_at(&data, usize::MAX).is_err());
    }

    #[test]
    fn test_padded_name() {
        let data = b"#~\0\0#Strings\0\0\0\0rest";
        let mut reader = Reader::new(data, 0);
        assert_eq!(reader.padded_name(0), Ok(&b"#~"[..]));
        assert_eq!(reader.pos(), 4);
        assert_eq!(reader.padded_name(0), Ok(&b"#Strings"[..]));
        assert_eq!(reader.pos(), 16);
    }

    #[test]
    fn test_align4() {
        assert_eq!(align4(0), 0);
        assert_eq!(align4(1), 4);
        assert_eq!(align4(4), 4);
        assert_eq!(align4(13), 16);
    }
}
