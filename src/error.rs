use thiserror::Error;

/// Failure kinds reported by the codec.
///
/// The discriminants are the CharLS API result codes, so a value can be passed
/// through a DICOM or C boundary without a translation table.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JlsError {
    #[error("Invalid JPEG-LS parameters")]
    InvalidJlsParameters = 1,
    #[error("Parameter value not supported")]
    ParameterValueNotSupported = 2,
    #[error("Uncompressed buffer too small")]
    UncompressedBufferTooSmall = 3,
    #[error("Compressed buffer too small")]
    CompressedBufferTooSmall = 4,
    #[error("Invalid compressed data")]
    InvalidCompressedData = 5,
    #[error("Image type not supported")]
    ImageTypeNotSupported = 7,
    #[error("Bit depth not supported by color transform")]
    UnsupportedBitDepthForTransform = 8,
    #[error("Color transform not supported")]
    UnsupportedColorTransform = 9,
    #[error("Encoding not supported")]
    UnsupportedEncoding = 10,
    #[error("Unknown JPEG marker found")]
    UnknownJpegMarker = 11,
    #[error("JPEG marker start byte not found")]
    MissingJpegMarkerStart = 12,
    #[error("Not enough memory for the decoded image")]
    NotEnoughMemory = 13,
    #[error("Unexpected failure")]
    UnexpectedFailure = 14,
}

impl JlsError {
    /// Numeric result code of this error.
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<std::io::Error> for JlsError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::WriteZero => {
                JlsError::CompressedBufferTooSmall
            }
            _ => {
                log::warn!("I/O failure during JPEG-LS processing: {error}");
                JlsError::UnexpectedFailure
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_result_values() {
        assert_eq!(JlsError::InvalidJlsParameters.code(), 1);
        assert_eq!(JlsError::InvalidCompressedData.code(), 5);
        assert_eq!(JlsError::MissingJpegMarkerStart.code(), 12);
        assert_eq!(JlsError::NotEnoughMemory.code(), 13);
        assert_eq!(JlsError::UnexpectedFailure.code(), 14);
    }

    #[test]
    fn io_errors_are_mapped() {
        let eof = std::io::Error::from(std::io::ErrorKind::UnexpectedEof);
        assert_eq!(JlsError::from(eof), JlsError::CompressedBufferTooSmall);

        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert_eq!(JlsError::from(denied), JlsError::UnexpectedFailure);
    }
}
