use crate::session::FailReason;

/// Canonical negotiable block sizes; the 1-based index is the selector.
pub const BLOCK_SIZES: [u16; 9] = [128, 512, 1024, 1428, 2048, 4096, 8192, 16384, 32768];

/// Validated block-size selector (1..=9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSize(u8);

impl BlockSize {
    pub fn new(selector: u8) -> Option<Self> {
        if (1..=9).contains(&selector) {
            Some(BlockSize(selector))
        } else {
            None
        }
    }

    pub fn selector(self) -> u8 {
        self.0
    }

    pub fn bytes(self) -> u16 {
        BLOCK_SIZES[usize::from(self.0) - 1]
    }

    // 9 entries, linear scan is fine
    pub fn from_bytes(len: u16) -> Option<Self> {
        BLOCK_SIZES
            .iter()
            .position(|&b| b == len)
            .map(|i| BlockSize(i as u8 + 1))
    }
}

/// Resolve the block size a server confirmed in its OACK. The advertised
/// length must match one of the canonical sizes exactly.
pub fn negotiated_block_size(options: &[(String, String)]) -> Result<BlockSize, FailReason> {
    let value = options
        .iter()
        .find(|(key, _)| key == "blksize")
        .map(|(_, value)| value.as_str())
        .ok_or_else(|| FailReason::UnsupportedBlockSize("(absent)".to_string()))?;
    let len: u16 = value
        .parse()
        .map_err(|_| FailReason::UnsupportedBlockSize(value.to_string()))?;
    BlockSize::from_bytes(len).ok_or_else(|| FailReason::UnsupportedBlockSize(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_bytes_bijection() {
        for selector in 1..=9u8 {
            let size = BlockSize::new(selector).unwrap();
            assert_eq!(BlockSize::from_bytes(size.bytes()), Some(size));
        }
    }

    #[test]
    fn rejects_out_of_range_selectors() {
        assert!(BlockSize::new(0).is_none());
        assert!(BlockSize::new(10).is_none());
    }

    #[test]
    fn rejects_non_canonical_lengths() {
        for len in [0u16, 127, 513, 1429, 65464] {
            assert!(BlockSize::from_bytes(len).is_none());
        }
    }

    #[test]
    fn resolves_oack_round_trip() {
        for selector in 1..=9u8 {
            let size = BlockSize::new(selector).unwrap();
            let options = vec![("blksize".to_string(), size.bytes().to_string())];
            assert_eq!(negotiated_block_size(&options).unwrap().selector(), selector);
        }
    }

    #[test]
    fn resolves_blksize_among_other_options() {
        let options = vec![
            ("tsize".to_string(), "4096".to_string()),
            ("blksize".to_string(), "2048".to_string()),
        ];
        assert_eq!(negotiated_block_size(&options).unwrap().selector(), 5);
    }

    #[test]
    fn unsupported_length_is_an_error() {
        let options = vec![("blksize".to_string(), "777".to_string())];
        assert_eq!(
            negotiated_block_size(&options),
            Err(FailReason::UnsupportedBlockSize("777".to_string()))
        );
    }

    #[test]
    fn missing_or_garbled_blksize_is_an_error() {
        assert!(negotiated_block_size(&[]).is_err());
        let options = vec![("blksize".to_string(), "lots".to_string())];
        assert!(negotiated_block_size(&options).is_err());
    }
}
