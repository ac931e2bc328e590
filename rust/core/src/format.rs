// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh format tags and content sniffing

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use memchr::memmem;

use crate::error::Error;

/// The four supported mesh encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MeshFormat {
    Obj,
    Dae,
    Stl,
    Ply,
}

impl MeshFormat {
    pub const ALL: [MeshFormat; 4] = [
        MeshFormat::Obj,
        MeshFormat::Dae,
        MeshFormat::Stl,
        MeshFormat::Ply,
    ];

    /// Lowercase tag, as used in file extensions
    pub fn as_str(&self) -> &'static str {
        match self {
            MeshFormat::Obj => "obj",
            MeshFormat::Dae => "dae",
            MeshFormat::Stl => "stl",
            MeshFormat::Ply => "ply",
        }
    }

    /// Map a file name to a format by its extension
    pub fn from_extension(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?;
        ext.parse().ok()
    }

    /// Guess the format from file content.
    ///
    /// Text markers are checked first; a buffer whose size matches the binary
    /// STL record layout exactly is reported as STL even without a marker.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        let head = &bytes[..bytes.len().min(1024)];

        if head.starts_with(b"ply") {
            return Some(MeshFormat::Ply);
        }
        if memmem::find(head, b"<COLLADA").is_some()
            || memmem::find(bytes, b"<geometry").is_some()
        {
            return Some(MeshFormat::Dae);
        }
        if is_binary_stl(bytes) {
            return Some(MeshFormat::Stl);
        }
        let trimmed = trim_ascii_start(head);
        if trimmed.starts_with(b"solid") && memmem::find(bytes, b"facet").is_some() {
            return Some(MeshFormat::Stl);
        }
        if bytes
            .split(|&b| b == b'\n')
            .any(|line| trim_ascii_start(line).starts_with(b"v "))
        {
            return Some(MeshFormat::Obj);
        }
        None
    }
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

impl FromStr for MeshFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "obj" => Ok(MeshFormat::Obj),
            "dae" | "collada" => Ok(MeshFormat::Dae),
            "stl" => Ok(MeshFormat::Stl),
            "ply" => Ok(MeshFormat::Ply),
            _ => Err(Error::unsupported(s)),
        }
    }
}

/// Binary STL: 80-byte header, u32 triangle count, 50 bytes per triangle
pub(crate) fn is_binary_stl(bytes: &[u8]) -> bool {
    if bytes.len() < 84 {
        return false;
    }
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
    count
        .checked_mul(50)
        .and_then(|n| n.checked_add(84))
        .is_some_and(|expected| expected == bytes.len())
}

fn trim_ascii_start(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!("OBJ".parse::<MeshFormat>().unwrap(), MeshFormat::Obj);
        assert_eq!("collada".parse::<MeshFormat>().unwrap(), MeshFormat::Dae);
        assert_eq!(".stl".parse::<MeshFormat>().unwrap(), MeshFormat::Stl);
        assert!(matches!(
            "fbx".parse::<MeshFormat>(),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(MeshFormat::from_extension("kitchen.PLY"), Some(MeshFormat::Ply));
        assert_eq!(MeshFormat::from_extension("scene.skp"), None);
        assert_eq!(MeshFormat::from_extension("noext"), None);
    }

    #[test]
    fn test_detect() {
        assert_eq!(MeshFormat::detect(b"ply\nformat ascii 1.0\n"), Some(MeshFormat::Ply));
        assert_eq!(
            MeshFormat::detect(b"<?xml version=\"1.0\"?><COLLADA></COLLADA>"),
            Some(MeshFormat::Dae)
        );
        assert_eq!(
            MeshFormat::detect(b"solid box\n facet normal 0 0 1\n"),
            Some(MeshFormat::Stl)
        );
        assert_eq!(MeshFormat::detect(b"# comment\nv 0 0 0\n"), Some(MeshFormat::Obj));
        assert_eq!(MeshFormat::detect(b"hello"), None);

        let mut binary = vec![0u8; 84 + 50];
        binary[80..84].copy_from_slice(&1u32.to_le_bytes());
        assert_eq!(MeshFormat::detect(&binary), Some(MeshFormat::Stl));
    }
}
