use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Marker codes that can appear in a JPEG-LS stream, plus the foreign JPEG
/// start of frame codes that must be recognized to be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum JpegMarkerCode {
    /// SOF_0: Marks the start of a baseline DCT encoded frame.
    StartOfFrameBaselineJpeg = 0xC0,
    /// SOF_1: Marks the start of an extended sequential Huffman encoded frame.
    StartOfFrameExtendedSequential = 0xC1,
    /// SOF_2: Marks the start of a progressive Huffman encoded frame.
    StartOfFrameProgressive = 0xC2,
    /// SOF_3: Marks the start of a lossless (sequential) Huffman encoded frame.
    StartOfFrameLossless = 0xC3,
    /// SOF_5: Differential sequential Huffman.
    StartOfFrameDifferentialSequential = 0xC5,
    /// SOF_6: Differential progressive Huffman.
    StartOfFrameDifferentialProgressive = 0xC6,
    /// SOF_7: Differential lossless Huffman.
    StartOfFrameDifferentialLossless = 0xC7,
    /// SOF_9: Extended sequential arithmetic.
    StartOfFrameExtendedArithmetic = 0xC9,
    /// SOF_10: Progressive arithmetic.
    StartOfFrameProgressiveArithmetic = 0xCA,
    /// SOF_11: Lossless arithmetic.
    StartOfFrameLosslessArithmetic = 0xCB,
    /// SOF_13: Differential sequential arithmetic.
    StartOfFrameDifferentialSequentialArithmetic = 0xCD,
    /// SOF_14: Differential progressive arithmetic.
    StartOfFrameDifferentialProgressiveArithmetic = 0xCE,
    /// SOF_15: Differential lossless arithmetic.
    StartOfFrameDifferentialLosslessArithmetic = 0xCF,

    /// SOI: Marks the start of an image.
    StartOfImage = 0xD8,

    /// EOI: Marks the end of an image.
    EndOfImage = 0xD9,

    /// SOS: Marks the start of scan.
    StartOfScan = 0xDA,

    /// APP0: Application data 0: used for JFIF header.
    ApplicationData0 = 0xE0,
    /// APP7: Application data 7: used for HP color-space info.
    ApplicationData7 = 0xE7,
    /// APP8: Application data 8: used for HP color-transformation info.
    ApplicationData8 = 0xE8,

    /// COM: Comment block.
    Comment = 0xFE,

    // The following markers are defined in ISO/IEC 14495-1 | ITU T.87. (JPEG-LS standard)
    /// SOF_55: Marks the start of a JPEG-LS encoded frame.
    StartOfFrameJpegls = 0xF7,

    /// LSE: Marks the start of a JPEG-LS preset parameters segment.
    JpeglsPresetParameters = 0xF8,
}

impl JpegMarkerCode {
    /// True for start of frame markers of the other JPEG coding processes.
    pub fn is_foreign_start_of_frame(self) -> bool {
        let code = u8::from(self);
        (0xC0..=0xCF).contains(&code)
    }
}

pub const JPEG_MARKER_START_BYTE: u8 = 0xFF;
