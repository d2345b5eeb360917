//! PackStream type markers.
//!
//! Every value on the wire starts with a marker byte. Fixed markers identify
//! scalar kinds; the tiny families carry their size in the low nibble.

/// Null marker
pub const NULL: u8 = 0xC0;

/// Float marker (64-bit IEEE 754)
pub const FLOAT_64: u8 = 0xC1;

/// Boolean markers
pub const FALSE: u8 = 0xC2;
pub const TRUE: u8 = 0xC3;

/// Integer markers
/// Tiny integers (-16 to 127) are encoded inline
pub const TINY_INT_MIN: u8 = 0xF0; // -16
pub const TINY_INT_MAX: u8 = 0x7F; // 127
pub const INT_8: u8 = 0xC8;
pub const INT_16: u8 = 0xC9;
pub const INT_32: u8 = 0xCA;
pub const INT_64: u8 = 0xCB;

/// Text markers
/// Tiny text (0-15 bytes) uses 0x80-0x8F
pub const TINY_TEXT_BASE: u8 = 0x80;
pub const TEXT_8: u8 = 0xD0;
pub const TEXT_16: u8 = 0xD1;
pub const TEXT_32: u8 = 0xD2;

/// List markers
/// Tiny lists (0-15 elements) use 0x90-0x9F
pub const TINY_LIST_BASE: u8 = 0x90;
pub const LIST_8: u8 = 0xD4;
pub const LIST_16: u8 = 0xD5;
pub const LIST_32: u8 = 0xD6;

/// Map markers
/// Tiny maps (0-15 entries) use 0xA0-0xAF
pub const TINY_MAP_BASE: u8 = 0xA0;
pub const MAP_8: u8 = 0xD8;
pub const MAP_16: u8 = 0xD9;
pub const MAP_32: u8 = 0xDA;

/// Structure markers
/// Tiny structures (0-15 fields) use 0xB0-0xBF
pub const TINY_STRUCT_BASE: u8 = 0xB0;
pub const STRUCT_8: u8 = 0xDC;
pub const STRUCT_16: u8 = 0xDD;

/// Largest size that fits in a tiny marker's low nibble.
pub const TINY_SIZE_MAX: usize = 15;

/// Structure signatures for graph entities
pub const NODE_SIGNATURE: u8 = 0x4E; // 'N'
pub const RELATIONSHIP_SIGNATURE: u8 = 0x52; // 'R'

/// Check if a byte is a tiny integer marker (-16 to 127)
#[inline]
pub fn is_tiny_int(marker: u8) -> bool {
    marker <= TINY_INT_MAX || marker >= TINY_INT_MIN
}

/// Decode a tiny integer from its marker byte
#[inline]
pub fn decode_tiny_int(marker: u8) -> i8 {
    marker as i8
}

/// Check if an integer can be encoded as a tiny int
#[inline]
pub fn can_encode_tiny_int(value: i64) -> bool {
    (-16..=127).contains(&value)
}

/// Tiny families share a layout: high nibble selects the kind, low nibble the size.
#[inline]
fn tiny_family(marker: u8, base: u8) -> Option<usize> {
    if marker & 0xF0 == base {
        Some((marker & 0x0F) as usize)
    } else {
        None
    }
}

/// Size carried by a tiny text marker (0x80-0x8F).
#[inline]
pub fn tiny_text_len(marker: u8) -> Option<usize> {
    tiny_family(marker, TINY_TEXT_BASE)
}

/// Size carried by a tiny list marker (0x90-0x9F).
#[inline]
pub fn tiny_list_len(marker: u8) -> Option<usize> {
    tiny_family(marker, TINY_LIST_BASE)
}

/// Entry count carried by a tiny map marker (0xA0-0xAF).
#[inline]
pub fn tiny_map_len(marker: u8) -> Option<usize> {
    tiny_family(marker, TINY_MAP_BASE)
}

/// Field count carried by a tiny struct marker (0xB0-0xBF).
#[inline]
pub fn tiny_struct_fields(marker: u8) -> Option<usize> {
    tiny_family(marker, TINY_STRUCT_BASE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiny_int_detection() {
        assert!(is_tiny_int(0x00)); // 0
        assert!(is_tiny_int(0x7F)); // 127
        assert!(is_tiny_int(0xF0)); // -16
        assert!(is_tiny_int(0xFF)); // -1
        assert!(!is_tiny_int(0x80));
        assert!(!is_tiny_int(0xC0));
    }

    #[test]
    fn test_tiny_int_decode() {
        assert_eq!(decode_tiny_int(0x00), 0);
        assert_eq!(decode_tiny_int(0x7F), 127);
        assert_eq!(decode_tiny_int(0xF0), -16);
        assert_eq!(decode_tiny_int(0xFF), -1);
    }

    #[test]
    fn test_can_encode_tiny_int() {
        assert!(can_encode_tiny_int(0));
        assert!(can_encode_tiny_int(127));
        assert!(can_encode_tiny_int(-16));
        assert!(!can_encode_tiny_int(128));
        assert!(!can_encode_tiny_int(-17));
    }

    #[test]
    fn test_tiny_families() {
        assert_eq!(tiny_text_len(0x80), Some(0));
        assert_eq!(tiny_text_len(0x8F), Some(15));
        assert_eq!(tiny_text_len(0x90), None);

        assert_eq!(tiny_list_len(0x95), Some(5));
        assert_eq!(tiny_list_len(0xA0), None);

        assert_eq!(tiny_map_len(0xAF), Some(15));
        assert_eq!(tiny_map_len(0xB0), None);

        assert_eq!(tiny_struct_fields(0xB3), Some(3));
        assert_eq!(tiny_struct_fields(0xC0), None);
    }

    #[test]
    fn test_sized_markers_are_not_tiny() {
        for marker in [TEXT_8, TEXT_16, TEXT_32, LIST_8, MAP_8, STRUCT_8, STRUCT_16] {
            assert!(tiny_text_len(marker).is_none());
            assert!(tiny_list_len(marker).is_none());
            assert!(tiny_map_len(marker).is_none());
            assert!(tiny_struct_fields(marker).is_none());
            assert!(!is_tiny_int(marker));
        }
    }
}
