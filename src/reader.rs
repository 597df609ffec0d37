use crate::types::Tag;
use crate::MapFileError;
use std::io::{Read, Seek, SeekFrom};

/// Largest block the decoder is willing to load into memory at once.
pub const MAXIMUM_BUFFER_SIZE: usize = 2_500_000;

/// A reusable byte buffer over a seekable input, with bounded cursor-based
/// decoders for the primitive encodings of the map format.
///
/// Every decoder checks the remaining buffer before consuming bytes; a
/// short buffer yields an error instead of reading stale or foreign data.
pub struct ReadBuffer<R: Read + Seek> {
    buffer_data: Vec<u8>,
    buffer_position: usize,
    input_channel: R,
    last_tag_position: Option<usize>,
}

impl<R: Read + Seek> ReadBuffer<R> {
    pub fn new(input_channel: R) -> Self {
        Self {
            buffer_data: Vec::new(),
            buffer_position: 0,
            input_channel,
            last_tag_position: None,
        }
    }

    /// Overwrites the buffer with the next `length` bytes of the input.
    /// Returns false when `length` exceeds `MAXIMUM_BUFFER_SIZE` or the
    /// input ends early.
    pub fn read_from_file(&mut self, length: usize) -> Result<bool, MapFileError> {
        if length > MAXIMUM_BUFFER_SIZE {
            return Ok(false);
        }

        self.buffer_data.resize(length, 0);
        self.buffer_position = 0;

        Ok(self.input_channel.read_exact(&mut self.buffer_data).is_ok())
    }

    /// Seeks to `offset` and overwrites the buffer with `length` bytes.
    pub fn read_from_file_at_offset(
        &mut self,
        offset: u64,
        length: usize,
    ) -> Result<bool, MapFileError> {
        if length > MAXIMUM_BUFFER_SIZE {
            return Ok(false);
        }

        self.buffer_data.resize(length, 0);
        self.buffer_position = 0;

        self.input_channel.seek(SeekFrom::Start(offset))?;
        Ok(self.input_channel.read_exact(&mut self.buffer_data).is_ok())
    }

    pub fn read_byte(&mut self) -> Result<u8, MapFileError> {
        let byte = self
            .buffer_data
            .get(self.buffer_position)
            .copied()
            .ok_or_else(|| MapFileError::new("buffer overflow when reading byte"))?;
        self.buffer_position += 1;
        Ok(byte)
    }

    pub fn read_short(&mut self) -> Result<u16, MapFileError> {
        let bytes = self.take(2, "short")?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_int(&mut self) -> Result<i32, MapFileError> {
        let bytes = self.take(4, "int")?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_long(&mut self) -> Result<i64, MapFileError> {
        let bytes = self.take(8, "long")?;
        Ok(i64::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Decodes a variable byte encoded unsigned integer: seven payload bits
    /// per byte, the high bit marks continuation, at most five bytes.
    pub fn read_unsigned_int(&mut self) -> Result<u32, MapFileError> {
        let mut value = 0u32;
        let mut shift = 0u32;

        loop {
            let byte = self.read_byte()?;
            if byte & 0x80 == 0 {
                return Ok(value | ((byte as u32) << shift));
            }
            value |= ((byte & 0x7f) as u32) << shift;
            shift += 7;
            if shift > 28 {
                return Err(MapFileError::new("unterminated unsigned variable byte int"));
            }
        }
    }

    /// Decodes a variable byte encoded signed integer. The encoding is
    /// sign-and-magnitude: continuation bytes carry seven magnitude bits,
    /// the terminating byte carries six more plus the sign in bit 6.
    pub fn read_signed_int(&mut self) -> Result<i32, MapFileError> {
        let mut value = 0i32;
        let mut shift = 0u32;

        loop {
            let byte = self.read_byte()?;
            if byte & 0x80 == 0 {
                value |= ((byte & 0x3f) as i32) << shift;
                return Ok(if byte & 0x40 != 0 {
                    value.wrapping_neg()
                } else {
                    value
                });
            }
            value |= ((byte & 0x7f) as i32) << shift;
            shift += 7;
            if shift > 28 {
                return Err(MapFileError::new("unterminated signed variable byte int"));
            }
        }
    }

    /// Fills `values` with consecutive signed variable byte integers.
    pub fn read_signed_ints(&mut self, values: &mut [i32]) -> Result<(), MapFileError> {
        for value in values {
            *value = self.read_signed_int()?;
        }
        Ok(())
    }

    pub fn read_utf8_encoded_string(&mut self) -> Result<String, MapFileError> {
        let length = self.read_unsigned_int()? as usize;
        self.read_utf8_encoded_string_with_length(length)
    }

    pub fn read_utf8_encoded_string_with_length(
        &mut self,
        string_length: usize,
    ) -> Result<String, MapFileError> {
        if string_length > 0 && self.buffer_position + string_length <= self.buffer_data.len() {
            self.buffer_position += string_length;
            String::from_utf8(
                self.buffer_data[self.buffer_position - string_length..self.buffer_position]
                    .to_vec(),
            )
            .map_err(|e| e.into())
        } else {
            Err(MapFileError::new(format!(
                "invalid string length: {}",
                string_length
            )))
        }
    }

    /// Reads a length-prefixed string at an absolute buffer position
    /// without moving the cursor.
    pub fn read_utf8_encoded_string_at(
        &mut self,
        position: usize,
    ) -> Result<String, MapFileError> {
        let saved_position = self.buffer_position;
        self.buffer_position = position;
        let result = self.read_utf8_encoded_string();
        self.buffer_position = saved_position;
        result
    }

    /// Reads `number_of_tags` tag indices and resolves them against the
    /// given tag table, replacing the contents of `tags`.
    pub fn read_tags(
        &mut self,
        tags: &mut Vec<Tag>,
        tag_table: &[Tag],
        number_of_tags: u8,
    ) -> Result<(), MapFileError> {
        tags.clear();

        for _ in 0..number_of_tags {
            let tag_id = self.read_unsigned_int()? as usize;
            let tag = tag_table
                .get(tag_id)
                .ok_or_else(|| MapFileError::new(format!("invalid tag ID: {}", tag_id)))?;
            tags.push(tag.clone());
        }

        Ok(())
    }

    /// Skips over ways whose tile bitmask does not intersect
    /// `query_tile_bitmask`, decrementing `remaining` for each one.
    ///
    /// Stops with the cursor on the flag byte of the first matching way and
    /// returns the number of ways still to process (0 when none matched).
    /// The flag byte position of the last skipped way that carried tag
    /// indices is remembered in `last_tag_position` for tag replay.
    pub fn skip_ways(
        &mut self,
        query_tile_bitmask: u16,
        remaining: i32,
    ) -> Result<i32, MapFileError> {
        let mut remaining = remaining;
        self.last_tag_position = None;

        while remaining > 0 {
            let way_data_size = self.read_unsigned_int()? as usize;
            if way_data_size < 2 || self.buffer_position + way_data_size > self.buffer_data.len() {
                return Err(MapFileError::new(format!(
                    "invalid way data size: {}",
                    way_data_size
                )));
            }

            let tile_bitmask = self.read_short()?;
            if query_tile_bitmask & tile_bitmask != 0 {
                return Ok(remaining);
            }

            let skip = way_data_size - 2;
            if skip > 0 && self.buffer_data[self.buffer_position] & 0x0f != 0 {
                self.last_tag_position = Some(self.buffer_position);
            }
            self.buffer_position += skip;
            remaining -= 1;
        }

        Ok(0)
    }

    pub fn last_tag_position(&self) -> Option<usize> {
        self.last_tag_position
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer_data
    }

    pub fn buffer_position(&self) -> usize {
        self.buffer_position
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_data.len()
    }

    pub fn set_buffer_position(&mut self, position: usize) {
        self.buffer_position = position;
    }

    pub fn skip_bytes(&mut self, bytes: usize) {
        self.buffer_position = self.buffer_position.saturating_add(bytes);
    }

    fn take(&mut self, count: usize, what: &str) -> Result<&[u8], MapFileError> {
        if self.buffer_position + count > self.buffer_data.len() {
            return Err(MapFileError::new(format!(
                "buffer overflow when reading {}",
                what
            )));
        }
        self.buffer_position += count;
        Ok(&self.buffer_data[self.buffer_position - count..self.buffer_position])
    }
}
