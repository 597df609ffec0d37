use crate::header::SubFileParameter;
use crate::MapFileError;
use lru::LruCache;
use std::io::{Read, Seek, SeekFrom};
use std::num::NonZeroUsize;
use tracing::debug;

/// Number of packed index entries grouped into one cached chunk.
const INDEX_ENTRIES_PER_BLOCK: usize = 128;

/// On-disk size of one cached chunk.
const SIZE_OF_INDEX_BLOCK: usize = INDEX_ENTRIES_PER_BLOCK * SubFileParameter::BYTES_PER_INDEX_ENTRY;

/// A chunk is identified by the sub-file it belongs to and its position
/// within that sub-file's index. The start address is unique per sub-file
/// within one map file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct IndexCacheKey {
    start_address: i64,
    index_block_number: i64,
}

/// Bounded LRU cache over chunks of packed 5-byte block index entries,
/// demand-loaded from the sub-file index region.
pub struct IndexCache<R: Read + Seek> {
    map: LruCache<IndexCacheKey, Vec<u8>>,
    file_channel: R,
}

impl<R: Read + Seek> IndexCache<R> {
    pub fn new(file_channel: R, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            map: LruCache::new(capacity),
            file_channel,
        }
    }

    pub fn destroy(&mut self) {
        self.map.clear();
    }

    /// Returns the raw 40-bit index entry for the given block: the low 39
    /// bits hold the block offset, bit 39 the water flag.
    pub fn get_index_entry(
        &mut self,
        sub_file_parameter: &SubFileParameter,
        block_number: i64,
    ) -> Result<u64, MapFileError> {
        if block_number < 0 || block_number >= sub_file_parameter.number_of_blocks {
            return Err(MapFileError::new(format!(
                "invalid block number: {}",
                block_number
            )));
        }

        let index_block_number = block_number / INDEX_ENTRIES_PER_BLOCK as i64;
        let key = IndexCacheKey {
            start_address: sub_file_parameter.start_address,
            index_block_number,
        };

        if self.map.get(&key).is_none() {
            debug!(index_block_number, "index chunk miss");
            match self.read_index_block(sub_file_parameter, index_block_number)? {
                Some(index_block) => {
                    self.map.put(key, index_block);
                }
                // the index ended early, treat the entry as unset
                None => return Ok(0),
            }
        }

        let index_block = self
            .map
            .get(&key)
            .ok_or_else(|| MapFileError::new("index chunk evicted during lookup"))?;

        let index_entry_in_block = (block_number % INDEX_ENTRIES_PER_BLOCK as i64) as usize;
        let address_in_index_block = index_entry_in_block * SubFileParameter::BYTES_PER_INDEX_ENTRY;

        if address_in_index_block + SubFileParameter::BYTES_PER_INDEX_ENTRY > index_block.len() {
            return Ok(0);
        }

        Ok(get_five_bytes_long(index_block, address_in_index_block))
    }

    fn read_index_block(
        &mut self,
        sub_file_parameter: &SubFileParameter,
        index_block_number: i64,
    ) -> Result<Option<Vec<u8>>, MapFileError> {
        let index_block_position = sub_file_parameter.index_start_address
            + index_block_number * SIZE_OF_INDEX_BLOCK as i64;

        let remaining_index_size = sub_file_parameter.index_end_address - index_block_position;
        if remaining_index_size <= 0 {
            return Err(MapFileError::new("invalid index block position"));
        }

        // the final chunk of a sub-file index may be short
        let index_block_size = SIZE_OF_INDEX_BLOCK.min(remaining_index_size as usize);
        let mut index_block = vec![0u8; index_block_size];

        self.file_channel
            .seek(SeekFrom::Start(index_block_position as u64))?;
        match self.file_channel.read_exact(&mut index_block) {
            Ok(()) => Ok(Some(index_block)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Converts five big-endian bytes into an unsigned 40-bit value.
fn get_five_bytes_long(buffer: &[u8], offset: usize) -> u64 {
    ((buffer[offset] as u64) << 32)
        | ((buffer[offset + 1] as u64) << 24)
        | ((buffer[offset + 2] as u64) << 16)
        | ((buffer[offset + 3] as u64) << 8)
        | (buffer[offset + 4] as u64)
}
