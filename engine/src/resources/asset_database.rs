// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use core::fmt::Display;

use arrayvec::ArrayString;
use enum_map::Enum;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{allocators::LinearAllocator, collections::FixedVec, Sid};

/// The maximum length of an asset path in the asset database, in bytes.
pub const ASSET_MAX_PATH_LENGTH: usize = 50;

/// Path to an asset file, as written in the asset database.
pub type AssetPath = ArrayString<ASSET_MAX_PATH_LENGTH>;

/// The kinds of assets the asset database can refer to. Each kind has its own
/// loader and its own table in [`Resources`](super::Resources).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum AssetKind {
    /// Unrecognized kind, not loaded.
    None,
    /// Wavefront OBJ mesh.
    Mesh,
    VertexShader,
    PixelShader,
    GeometryShader,
    /// Ogg Vorbis audio.
    AudioOgg,
    /// Raw font file bytes.
    Font,
}

impl AssetKind {
    /// Every kind, in the order of their discriminants.
    pub const ALL: [AssetKind; 7] = [
        AssetKind::None,
        AssetKind::Mesh,
        AssetKind::VertexShader,
        AssetKind::PixelShader,
        AssetKind::GeometryShader,
        AssetKind::AudioOgg,
        AssetKind::Font,
    ];

    /// The name of this kind in the asset database.
    pub const fn name(self) -> &'static str {
        match self {
            AssetKind::None => "NONE",
            AssetKind::Mesh => "MESH",
            AssetKind::VertexShader => "VERTEX_SHADER",
            AssetKind::PixelShader => "PIXEL_SHADER",
            AssetKind::GeometryShader => "GEOMETRY_SHADER",
            AssetKind::AudioOgg => "AUDIO_OGG",
            AssetKind::Font => "FONT",
        }
    }

    /// Parses a kind name from the asset database. Case-sensitive, and
    /// anything unrecognized is [`AssetKind::None`].
    pub fn from_name(name: &str) -> AssetKind {
        AssetKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .unwrap_or(AssetKind::None)
    }
}

impl Display for AssetKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where an asset is stored and how it should be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetInfo {
    pub path: AssetPath,
    pub kind: AssetKind,
}

/// One line of the asset database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetEntry {
    pub id: Sid,
    pub info: AssetInfo,
}

/// Errors from [`AssetDatabase::parse`]. Individual malformed lines are not
/// errors, they're skipped with a warning.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdfError {
    #[error("the asset database is not valid UTF-8")]
    NotUtf8,
    #[error("not enough memory for {entries} asset database entries")]
    OutOfMemory { entries: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
enum LineError {
    #[error("expected 3 space-separated fields, found {0}")]
    FieldCount(usize),
    #[error("the identifier is not a non-zero hexadecimal number")]
    Identifier,
    #[error("the path is longer than {} bytes", ASSET_MAX_PATH_LENGTH)]
    PathTooLong,
}

/// The parsed asset database file: a list of distinct identifiers with their
/// [`AssetInfo`]s, in file order. The first line wins if an identifier is
/// listed more than once.
///
/// The file format is plain text with one asset per line, blank lines
/// allowed:
///
/// ```text
/// 0x7c9557c5 data/cube.obj MESH
/// 0x0a1b2c3d shaders/basic_vs.hlsl VERTEX_SHADER
/// ```
#[derive(Debug)]
pub struct AssetDatabase<'a> {
    entries: FixedVec<'a, AssetEntry>,
    skipped_lines: usize,
}

impl<'a> AssetDatabase<'a> {
    /// Parses the contents of an asset database file, allocating the entries
    /// from `arena`.
    pub fn parse(bytes: &[u8], arena: &'a LinearAllocator) -> Result<AssetDatabase<'a>, AdfError> {
        let text = core::str::from_utf8(bytes).map_err(|_| AdfError::NotUtf8)?;

        let capacity = text.lines().filter(|line| !line.trim().is_empty()).count();
        debug!("Asset database has {capacity} non-blank lines.");
        let mut entries: FixedVec<AssetEntry> = FixedVec::new(arena, capacity)
            .ok_or(AdfError::OutOfMemory { entries: capacity })?;

        let mut skipped_lines = 0;
        for (line_index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Ok(entry) if entries.iter().any(|earlier| earlier.id == entry.id) => {
                    warn!(
                        "Skipping asset database line {}: {} is already listed.",
                        line_index + 1,
                        entry.id,
                    );
                    skipped_lines += 1;
                }
                Ok(entry) => {
                    if entry.info.kind == AssetKind::None {
                        warn!(
                            "Asset database line {}: unrecognized kind for {}.",
                            line_index + 1,
                            entry.id,
                        );
                    }
                    let Ok(_) = entries.push(entry) else {
                        unreachable!("the entries are allocated for every non-blank line")
                    };
                }
                Err(err) => {
                    warn!(
                        "Skipping asset database line {}: {err}.",
                        line_index + 1
                    );
                    skipped_lines += 1;
                }
            }
        }

        Ok(AssetDatabase {
            entries,
            skipped_lines,
        })
    }

    pub fn entries(&self) -> &[AssetEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The amount of non-blank lines which could not be parsed, or repeated
    /// an identifier from an earlier line.
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }
}

fn parse_line(line: &str) -> Result<AssetEntry, LineError> {
    let mut fields = line.split(' ').filter(|field| !field.is_empty());
    let (Some(id), Some(path), Some(kind), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        let count = line.split(' ').filter(|field| !field.is_empty()).count();
        return Err(LineError::FieldCount(count));
    };

    let hex_digits = id
        .strip_prefix("0x")
        .or_else(|| id.strip_prefix("0X"))
        .unwrap_or(id);
    let id = u32::from_str_radix(hex_digits, 16)
        .ok()
        .and_then(Sid::new)
        .ok_or(LineError::Identifier)?;

    let path = AssetPath::from(path).map_err(|_| LineError::PathTooLong)?;

    Ok(AssetEntry {
        id,
        info: AssetInfo {
            path,
            kind: AssetKind::from_name(kind),
        },
    })
}

#[cfg(test)]
mod tests {
    use std::format;

    use crate::{allocators::LinearAllocator, test_platform::TestPlatform, Sid};

    use super::{AdfError, AssetDatabase, AssetKind, ASSET_MAX_PATH_LENGTH};

    #[test]
    fn parses_entries_and_skips_blank_lines() {
        let platform = TestPlatform::new();
        let arena = LinearAllocator::new(&platform, 4096).unwrap();
        let text = "0x7c9557c5 data/cube.obj MESH\r\n\
                    \r\n\
                    0x00000010 shaders/vs.hlsl VERTEX_SHADER\n\
                    \n   \n\
                    0x00000020 shaders/ps.hlsl PIXEL_SHADER\n\
                    0x00000030 shaders/gs.hlsl GEOMETRY_SHADER\n\
                    0x00000040 audio/hit.ogg AUDIO_OGG\n\
                    0x00000050 fonts/mono.otf FONT";
        let db = AssetDatabase::parse(text.as_bytes(), &arena).unwrap();

        assert_eq!(6, db.len());
        assert_eq!(0, db.skipped_lines());
        let cube = db.entries()[0];
        assert_eq!(Sid::from_name("cube"), cube.id);
        assert_eq!("data/cube.obj", cube.info.path.as_str());
        assert_eq!(AssetKind::Mesh, cube.info.kind);
        let kinds = db.entries().iter().map(|entry| entry.info.kind);
        assert!(kinds.eq(AssetKind::ALL[1..].iter().copied()));
        assert_eq!("fonts/mono.otf", db.entries()[5].info.path.as_str());
    }

    #[test]
    fn unknown_kinds_are_none() {
        let platform = TestPlatform::new();
        let arena = LinearAllocator::new(&platform, 1024).unwrap();
        let text = "0x00000001 a.png TEXTURE\n0x00000002 b.obj mesh\n0x00000003 c.obj NONE";
        let db = AssetDatabase::parse(text.as_bytes(), &arena).unwrap();
        assert_eq!(3, db.len());
        assert!(db
            .entries()
            .iter()
            .all(|entry| entry.info.kind == AssetKind::None));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let platform = TestPlatform::new();
        let arena = LinearAllocator::new(&platform, 1024).unwrap();
        let text = "0x00000000 zero.obj MESH\n\
                    0xnothex00 bad.obj MESH\n\
                    0x00000001 missing_kind.obj\n\
                    0x00000002 a_path_that_is_much_much_longer_than_fifty_bytes.obj MESH\n\
                    0x00000003 fine.obj MESH extra\n\
                    0x00000004 fine.obj MESH";
        let db = AssetDatabase::parse(text.as_bytes(), &arena).unwrap();
        assert_eq!(5, db.skipped_lines());
        assert_eq!(1, db.len());
        assert_eq!(4, db.entries()[0].id.get());
    }

    #[test]
    fn repeated_identifiers_keep_the_first_line() {
        let platform = TestPlatform::new();
        let arena = LinearAllocator::new(&platform, 1024).unwrap();
        let text = "0x00000010 a.obj MESH\n\
                    0x00000020 c.ogg AUDIO_OGG\n\
                    0x10 b.vs VERTEX_SHADER";
        let db = AssetDatabase::parse(text.as_bytes(), &arena).unwrap();
        assert_eq!(2, db.len());
        assert_eq!(1, db.skipped_lines());
        assert_eq!("a.obj", db.entries()[0].info.path.as_str());
        assert_eq!(AssetKind::Mesh, db.entries()[0].info.kind);
    }

    #[test]
    fn paths_can_use_the_whole_length_limit() {
        let platform = TestPlatform::new();
        let arena = LinearAllocator::new(&platform, 1024).unwrap();
        let longest = "p".repeat(ASSET_MAX_PATH_LENGTH);
        let too_long = "p".repeat(ASSET_MAX_PATH_LENGTH + 1);
        let text = format!("0x00000001 {longest} FONT\n0x00000002 {too_long} FONT");
        let db = AssetDatabase::parse(text.as_bytes(), &arena).unwrap();
        assert_eq!(1, db.len());
        assert_eq!(1, db.skipped_lines());
        assert_eq!(longest, db.entries()[0].info.path.as_str());
    }

    #[test]
    fn reports_invalid_utf8_and_exhaustion() {
        let platform = TestPlatform::new();
        let arena = LinearAllocator::new(&platform, 16).unwrap();
        assert_eq!(
            AdfError::NotUtf8,
            AssetDatabase::parse(&[0x30, 0xFF, 0xFE], &arena).unwrap_err(),
        );
        assert_eq!(
            AdfError::OutOfMemory { entries: 1 },
            AssetDatabase::parse(b"0x00000001 a.obj MESH", &arena).unwrap_err(),
        );
    }
}
