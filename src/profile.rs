//! Color profile selection and the iCCP chunk payload.

use png::chunk::ChunkType;

use crate::error::PngWriteError;
use crate::writer::Compression;

/// Size of an ICC header plus the tag count that follows it.
const ICC_MIN_LEN: usize = 132;

const ICCP: ChunkType = ChunkType(*b"iCCP");

/// Color profile embedded in the output.
///
/// At most one profile is active. The writer rejects a second profile
/// instead of letting one silently replace the other.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ColorProfile {
    /// No profile chunk.
    #[default]
    None,
    /// An ICC profile written as an iCCP chunk.
    Named { name: String, data: Vec<u8> },
    /// The sRGB marker chunk instead of profile bytes.
    StandardSrgb,
}

impl ColorProfile {
    /// Copy and validate an ICC profile.
    pub fn named(name: &str, data: &[u8]) -> Result<Self, PngWriteError> {
        keyword_bytes(name)?;
        check_icc(data)?;
        Ok(Self::Named {
            name: name.to_owned(),
            data: data.to_vec(),
        })
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The iCCP chunk for a named profile.
    ///
    /// Written by hand because the engine's own iCCP support does not take
    /// a profile name.
    pub(crate) fn iccp_chunk(
        &self,
        compression: Compression,
    ) -> Result<Option<(ChunkType, Vec<u8>)>, PngWriteError> {
        match self {
            Self::Named { name, data } => Ok(Some((ICCP, iccp_payload(name, data, compression)?))),
            Self::None | Self::StandardSrgb => Ok(None),
        }
    }

    /// Rendering intent for the engine's sRGB chunk.
    pub(crate) fn srgb_intent(&self) -> Option<png::SrgbRenderingIntent> {
        match self {
            Self::StandardSrgb => Some(png::SrgbRenderingIntent::RelativeColorimetric),
            Self::None | Self::Named { .. } => None,
        }
    }
}

/// iCCP payload: keyword, NUL, compression method 0, zlib stream.
fn iccp_payload(name: &str, data: &[u8], compression: Compression) -> Result<Vec<u8>, PngWriteError> {
    let keyword = keyword_bytes(name)?;
    let compressed = miniz_oxide::deflate::compress_to_vec_zlib(data, compression.zlib_level());
    let mut out = Vec::with_capacity(keyword.len() + 2 + compressed.len());
    out.extend_from_slice(&keyword);
    out.push(0);
    out.push(0);
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Encode a profile name as a PNG keyword (Latin-1, 1-79 bytes).
fn keyword_bytes(name: &str) -> Result<Vec<u8>, PngWriteError> {
    let invalid = |why: &str| PngWriteError::InvalidProfile(format!("profile name {name:?} {why}"));

    let mut out = Vec::with_capacity(name.len());
    for c in name.chars() {
        let code = u32::from(c);
        if !(32..=126).contains(&code) && !(161..=255).contains(&code) {
            return Err(invalid("contains a character outside printable Latin-1"));
        }
        out.push(code as u8);
    }
    if out.is_empty() || out.len() > 79 {
        return Err(invalid("must be 1 to 79 bytes long"));
    }
    if out.first() == Some(&b' ') || out.last() == Some(&b' ') {
        return Err(invalid("has leading or trailing spaces"));
    }
    if out.windows(2).any(|w| w == b"  ") {
        return Err(invalid("has consecutive spaces"));
    }
    Ok(out)
}

fn check_icc(data: &[u8]) -> Result<(), PngWriteError> {
    if data.len() < ICC_MIN_LEN {
        return Err(PngWriteError::InvalidProfile(format!(
            "profile is {} bytes, shorter than the {ICC_MIN_LEN}-byte header",
            data.len()
        )));
    }
    let declared = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    if declared as usize != data.len() {
        return Err(PngWriteError::InvalidProfile(format!(
            "header declares {declared} bytes but {} were given",
            data.len()
        )));
    }
    Ok(())
}
