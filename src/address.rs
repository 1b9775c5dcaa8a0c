/// Splits a 64-bit address into its tag, set index, and block offset fields
///
/// Both `block_size` and `num_sets` must be powers of two; this is enforced when validating a
/// [`CacheConfig`](crate::config::CacheConfig), so no error paths exist here and every address in
/// the full 64-bit space decodes into range
#[derive(Debug, Clone, Copy)]
pub struct AddressDecoder {
    offset_bits: u32,
    index_bits: u32,
    offset_mask: u64,
    index_mask: u64,
}

impl AddressDecoder {
    pub fn new(block_size: u64, num_sets: u64) -> Self {
        let offset_bits = block_size.trailing_zeros();
        let index_bits = num_sets.trailing_zeros();
        Self {
            offset_bits,
            index_bits,
            offset_mask: block_size - 1,
            index_mask: num_sets - 1,
        }
    }

    /// The set an address maps to, aligned so it can index a collection of sets directly
    pub fn set_index(&self, address: u64) -> usize {
        ((address >> self.offset_bits) & self.index_mask) as usize
    }

    /// The stored identity of the block holding this address
    pub fn tag(&self, address: u64) -> u64 {
        address >> (self.offset_bits + self.index_bits)
    }

    /// The byte position within the block. Not used by hit/miss logic, kept for debugging and
    /// visualisation consumers
    pub fn block_offset(&self, address: u64) -> u64 {
        address & self.offset_mask
    }

    /// Reconstructs the base address of a block from its tag and set index
    ///
    /// Used when a dirty victim is written back, and for the simulated memory traffic of
    /// write-through hits and fills
    pub fn block_address(&self, tag: u64, set_index: usize) -> u64 {
        (tag << (self.offset_bits + self.index_bits)) | ((set_index as u64) << self.offset_bits)
    }

    pub fn offset_bits(&self) -> u32 {
        self.offset_bits
    }

    pub fn index_bits(&self) -> u32 {
        self.index_bits
    }
}

#[cfg(test)]
mod tests {
    use super::AddressDecoder;

    #[test]
    fn decodes_fields() {
        // 32 byte blocks, 16 sets: 5 offset bits, 4 index bits
        let decoder = AddressDecoder::new(32, 16);
        assert_eq!(decoder.offset_bits(), 5);
        assert_eq!(decoder.index_bits(), 4);
        let address = 0xDEAD_BEEF;
        assert_eq!(decoder.block_offset(address), address & 0x1F);
        assert_eq!(decoder.set_index(address), ((address >> 5) & 0xF) as usize);
        assert_eq!(decoder.tag(address), address >> 9);
    }

    #[test]
    fn single_set_has_no_index_bits() {
        let decoder = AddressDecoder::new(32, 1);
        assert_eq!(decoder.index_bits(), 0);
        assert_eq!(decoder.set_index(0xFFFF_FFFF_FFFF_FFFF), 0);
        assert_eq!(decoder.tag(0x200), 0x200 >> 5);
    }

    #[test]
    fn block_address_round_trips() {
        let decoder = AddressDecoder::new(64, 8);
        let address = 0x0123_4567_89AB_CDC0;
        let reconstructed = decoder.block_address(decoder.tag(address), decoder.set_index(address));
        // Round trip loses only the offset bits
        assert_eq!(reconstructed, address & !0x3F);
    }
}
