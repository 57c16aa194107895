//! Binary persistence format for summaries
//!
//! Big-endian, following the `DataOutput` conventions:
//!
//! ```text
//! +------+---------+-----------+--------------------+
//! | 0xA1 | version | root node | dataset label UTF8 |
//! +------+---------+-----------+--------------------+
//! ```
//!
//! A node is an `i16` kind tag followed by its fields, children inline in
//! traversal order. Two string encodings appear:
//!
//! - UTF8: `u16` byte length, then the bytes
//! - Text: variable-length integer byte length, then the bytes
//!
//! Version 2 is written. Version 1 payloads are still read; they lack
//! numeric reservoirs (except for int), record names, and a fixed node's
//! observation count, which is recovered from its byte total.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Error, Result};
use crate::profile::{NodeId, NodeStats, NumericStats, ProfileNode, StringStats, UnionBranch};
use crate::schema::SchemaKind;
use crate::summary::SchemaSummary;

pub const MAGIC: u8 = 0xa1;
pub const VERSION: u8 = 2;
const LEGACY_VERSION: u8 = 1;

/// Deepest nesting accepted when decoding
const MAX_DEPTH: usize = 512;

pub fn encode(summary: &SchemaSummary) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(64 * summary.len() + 16);
    buf.put_u8(MAGIC);
    buf.put_u8(VERSION);
    if !summary.is_empty() {
        write_node(&mut buf, summary, 0);
    }
    put_utf8(&mut buf, summary.dataset_label());
    buf.to_vec()
}

pub fn decode(data: &[u8]) -> Result<SchemaSummary> {
    let mut reader = Reader {
        buf: data,
        version: VERSION,
    };

    let magic = reader.get_u8()?;
    if magic != MAGIC {
        return Err(corrupt(format!("bad magic byte {:#04x}", magic)));
    }
    let version = reader.get_u8()?;
    if version != VERSION && version != LEGACY_VERSION {
        return Err(corrupt(format!("unsupported format version {}", version)));
    }
    reader.version = version;

    let mut arena = Vec::new();
    let root = read_node(&mut reader, &mut arena, 0)?;
    if arena[root.index()].kind() != SchemaKind::Record {
        return Err(corrupt(format!(
            "root node is {}, expected RECORD",
            arena[root.index()].kind()
        )));
    }
    let label = reader.get_utf8()?;

    Ok(SchemaSummary::from_arena(arena, root, label))
}

fn corrupt(msg: impl Into<String>) -> Error {
    Error::FormatCorruption(msg.into())
}

fn write_node(buf: &mut BytesMut, summary: &SchemaSummary, idx: usize) {
    let node = summary.node(idx);
    buf.put_i16(node.kind().tag());
    put_count(buf, node.num_data());
    put_utf8(buf, node.doc());

    match node.stats() {
        NodeStats::Array {
            total_size,
            element,
        } => {
            put_count(buf, *total_size);
            write_node(buf, summary, element.index());
        }
        NodeStats::Boolean {
            num_true,
            num_false,
        } => {
            put_count(buf, *num_true);
            put_count(buf, *num_false);
        }
        NodeStats::Bytes { total_size } => put_count(buf, *total_size),
        NodeStats::Double(stats) => {
            write_numeric(buf, stats, |buf, v| buf.put_f64(v));
        }
        NodeStats::Float(stats) => {
            write_numeric(buf, stats, |buf, v| buf.put_f32(v as f32));
        }
        NodeStats::Int(stats) => {
            write_numeric(buf, stats, |buf, v| buf.put_i32(v as i32));
        }
        NodeStats::Long(stats) => {
            write_numeric(buf, stats, |buf, v| buf.put_i64(v as i64));
        }
        NodeStats::Enum { symbol_counts, .. } => {
            put_len(buf, symbol_counts.len());
            for (symbol, count) in symbol_counts {
                put_text(buf, symbol);
                put_count(buf, *count);
            }
        }
        NodeStats::Fixed {
            name,
            size,
            total_size,
        } => {
            put_text(buf, name);
            put_count(buf, *size);
            put_count(buf, *total_size);
        }
        NodeStats::Map { entries, .. } => {
            put_len(buf, entries.len());
            for (key, child) in entries {
                put_text(buf, key);
                write_node(buf, summary, child.index());
            }
        }
        NodeStats::Null => {}
        NodeStats::Record { name, fields } => {
            put_text(buf, name);
            put_len(buf, fields.len());
            for (field, child) in fields {
                put_text(buf, field);
                write_node(buf, summary, child.index());
            }
        }
        NodeStats::String(stats) => {
            put_count(buf, stats.total_length());
            put_len(buf, stats.distinct().len());
            for value in stats.distinct() {
                put_utf8(buf, value);
            }
        }
        NodeStats::Union { branches } => {
            put_len(buf, branches.len());
            for (kind, branch) in branches {
                put_text(buf, kind.name());
                put_count(buf, branch.count());
                write_node(buf, summary, branch.node().index());
            }
        }
    }
}

fn write_numeric(buf: &mut BytesMut, stats: &NumericStats, put_sample: impl Fn(&mut BytesMut, f64)) {
    buf.put_f64(stats.total());
    put_len(buf, stats.samples().len());
    for &v in stats.samples() {
        put_sample(buf, v);
    }
}

fn read_node(r: &mut Reader<'_>, arena: &mut Vec<ProfileNode>, depth: usize) -> Result<NodeId> {
    if depth > MAX_DEPTH {
        return Err(corrupt("nesting too deep"));
    }
    let tag = r.get_i16()?;
    let kind = SchemaKind::from_tag(tag).ok_or_else(|| corrupt(format!("unknown node tag {}", tag)))?;

    let id = NodeId(arena.len());
    arena.push(ProfileNode::new(None, String::new(), NodeStats::Null));

    let legacy_fixed = kind == SchemaKind::Fixed && r.is_legacy();
    let (mut num_data, mut doc) = if legacy_fixed {
        (0, String::new())
    } else {
        (r.get_count()?, r.get_utf8()?)
    };

    let stats = match kind {
        SchemaKind::Array => {
            let total_size = r.get_count()?;
            let element = read_node(r, arena, depth + 1)?;
            NodeStats::Array {
                total_size,
                element,
            }
        }
        SchemaKind::Boolean => NodeStats::Boolean {
            num_true: r.get_count()?,
            num_false: r.get_count()?,
        },
        SchemaKind::Bytes => NodeStats::Bytes {
            total_size: r.get_count()?,
        },
        SchemaKind::Double => NodeStats::Double(read_numeric(r, kind)?),
        SchemaKind::Float => NodeStats::Float(read_numeric(r, kind)?),
        SchemaKind::Int => NodeStats::Int(read_numeric(r, kind)?),
        SchemaKind::Long => NodeStats::Long(read_numeric(r, kind)?),
        SchemaKind::Enum => {
            let n = r.get_len()?;
            let mut symbol_counts = std::collections::BTreeMap::new();
            for _ in 0..n {
                let symbol = r.get_text()?;
                symbol_counts.insert(symbol, r.get_count()?);
            }
            NodeStats::Enum {
                name: String::new(),
                symbol_counts,
            }
        }
        SchemaKind::Fixed => {
            let name = r.get_text()?;
            if legacy_fixed {
                doc = r.get_utf8()?;
            }
            let size = r.get_count()?;
            let total_size = r.get_count()?;
            if legacy_fixed {
                num_data = total_size.checked_div(size).unwrap_or(0);
            }
            NodeStats::Fixed {
                name,
                size,
                total_size,
            }
        }
        SchemaKind::Map => {
            let n = r.get_len()?;
            let mut entries = std::collections::BTreeMap::new();
            for _ in 0..n {
                let key = r.get_text()?;
                entries.insert(key, read_node(r, arena, depth + 1)?);
            }
            NodeStats::Map {
                value_schema: None,
                entries,
            }
        }
        SchemaKind::Null => NodeStats::Null,
        SchemaKind::Record => {
            let name = if r.is_legacy() {
                String::new()
            } else {
                r.get_text()?
            };
            let n = r.get_len()?;
            let mut fields = std::collections::BTreeMap::new();
            for _ in 0..n {
                let field = r.get_text()?;
                fields.insert(field, read_node(r, arena, depth + 1)?);
            }
            NodeStats::Record { name, fields }
        }
        SchemaKind::String => {
            let total_length = r.get_count()?;
            let n = r.get_len()?;
            let mut distinct = std::collections::BTreeSet::new();
            for _ in 0..n {
                distinct.insert(r.get_utf8()?);
            }
            NodeStats::String(StringStats {
                total_length,
                distinct,
            })
        }
        SchemaKind::Union => {
            let n = r.get_len()?;
            let mut branches = std::collections::BTreeMap::new();
            for _ in 0..n {
                let name = r.get_text()?;
                let branch_kind = SchemaKind::from_name(&name)
                    .ok_or_else(|| corrupt(format!("unknown union branch kind '{}'", name)))?;
                let count = r.get_count()?;
                let node = read_node(r, arena, depth + 1)?;
                branches.insert(branch_kind, UnionBranch { node, count });
            }
            NodeStats::Union { branches }
        }
    };

    let node = &mut arena[id.index()];
    node.num_data = num_data;
    node.doc = doc;
    node.stats = stats;
    Ok(id)
}

fn read_numeric(r: &mut Reader<'_>, kind: SchemaKind) -> Result<NumericStats> {
    if r.is_legacy() {
        return match kind {
            SchemaKind::Int => {
                let total = f64::from(r.get_i32()?);
                let n = r.get_len()?;
                let samples = (0..n)
                    .map(|_| r.get_i32().map(f64::from))
                    .collect::<Result<Vec<_>>>()?;
                Ok(NumericStats::from_parts(total, samples))
            }
            SchemaKind::Long => Ok(NumericStats::from_parts(r.get_i64()? as f64, Vec::new())),
            SchemaKind::Float => Ok(NumericStats::from_parts(f64::from(r.get_f32()?), Vec::new())),
            _ => Ok(NumericStats::from_parts(r.get_f64()?, Vec::new())),
        };
    }

    let total = r.get_f64()?;
    let n = r.get_len()?;
    let mut samples = Vec::with_capacity(n.min(r.remaining()));
    for _ in 0..n {
        let v = match kind {
            SchemaKind::Int => f64::from(r.get_i32()?),
            SchemaKind::Long => r.get_i64()? as f64,
            SchemaKind::Float => f64::from(r.get_f32()?),
            _ => r.get_f64()?,
        };
        samples.push(v);
    }
    Ok(NumericStats::from_parts(total, samples))
}

fn put_count(buf: &mut BytesMut, value: u32) {
    buf.put_i32(i32::try_from(value).unwrap_or(i32::MAX));
}

fn put_len(buf: &mut BytesMut, len: usize) {
    buf.put_i32(i32::try_from(len).unwrap_or(i32::MAX));
}

/// Strings longer than a `u16` length can express are cut at a character
/// boundary.
fn put_utf8(buf: &mut BytesMut, s: &str) {
    let mut end = s.len().min(u16::MAX as usize);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    buf.put_u16(end as u16);
    buf.put_slice(&s.as_bytes()[..end]);
}

fn put_text(buf: &mut BytesMut, s: &str) {
    put_vint(buf, s.len() as i64);
    buf.put_slice(s.as_bytes());
}

/// Zero-compressed variable-length integer: values in `-112..=127` take one
/// byte, others a marker byte encoding sign and width followed by the
/// big-endian magnitude.
fn put_vint(buf: &mut BytesMut, value: i64) {
    if (-112..=127).contains(&value) {
        buf.put_i8(value as i8);
        return;
    }

    let (mut marker, magnitude) = if value < 0 { (-120i8, !value) } else { (-112i8, value) };
    let mut width = 0u32;
    let mut tmp = magnitude;
    while tmp != 0 {
        tmp >>= 8;
        width += 1;
        marker -= 1;
    }
    buf.put_i8(marker);
    for idx in (0..width).rev() {
        buf.put_u8(((magnitude >> (idx * 8)) & 0xff) as u8);
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    version: u8,
}

impl Reader<'_> {
    #[inline]
    fn is_legacy(&self) -> bool {
        self.version == LEGACY_VERSION
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    #[inline]
    fn ensure(&self, need: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < need {
            return Err(corrupt(format!(
                "truncated while reading {} (need {} bytes, have {})",
                what,
                need,
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    fn get_u8(&mut self) -> Result<u8> {
        self.ensure(1, "u8")?;
        Ok(self.buf.get_u8())
    }

    fn get_i8(&mut self) -> Result<i8> {
        self.ensure(1, "i8")?;
        Ok(self.buf.get_i8())
    }

    fn get_i16(&mut self) -> Result<i16> {
        self.ensure(2, "i16")?;
        Ok(self.buf.get_i16())
    }

    fn get_i32(&mut self) -> Result<i32> {
        self.ensure(4, "i32")?;
        Ok(self.buf.get_i32())
    }

    fn get_i64(&mut self) -> Result<i64> {
        self.ensure(8, "i64")?;
        Ok(self.buf.get_i64())
    }

    fn get_f32(&mut self) -> Result<f32> {
        self.ensure(4, "f32")?;
        Ok(self.buf.get_f32())
    }

    fn get_f64(&mut self) -> Result<f64> {
        self.ensure(8, "f64")?;
        Ok(self.buf.get_f64())
    }

    /// Non-negative `i32` counter.
    fn get_count(&mut self) -> Result<u32> {
        let v = self.get_i32()?;
        u32::try_from(v).map_err(|_| corrupt(format!("negative count {}", v)))
    }

    /// Element count; every element takes at least one byte, so anything
    /// beyond the remaining input is corrupt.
    fn get_len(&mut self) -> Result<usize> {
        let n = self.get_count()? as usize;
        if n > self.remaining() {
            return Err(corrupt(format!(
                "element count {} exceeds remaining {} bytes",
                n,
                self.remaining()
            )));
        }
        Ok(n)
    }

    fn get_vint(&mut self) -> Result<i64> {
        let first = self.get_i8()?;
        if first >= -112 {
            return Ok(i64::from(first));
        }
        let negative = first < -120;
        let width = if negative {
            -120 - i32::from(first)
        } else {
            -112 - i32::from(first)
        };
        let mut value: i64 = 0;
        for _ in 0..width {
            value = (value << 8) | i64::from(self.get_u8()?);
        }
        Ok(if negative { !value } else { value })
    }

    fn get_bytes(&mut self, len: usize, what: &str) -> Result<String> {
        self.ensure(len, what)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        String::from_utf8(head.to_vec()).map_err(|e| corrupt(format!("invalid UTF-8 in {}: {}", what, e)))
    }

    fn get_utf8(&mut self) -> Result<String> {
        self.ensure(2, "string length")?;
        let len = self.buf.get_u16() as usize;
        self.get_bytes(len, "string")
    }

    fn get_text(&mut self) -> Result<String> {
        let len = self.get_vint()?;
        let len = usize::try_from(len).map_err(|_| corrupt(format!("negative text length {}", len)))?;
        self.get_bytes(len, "text")
    }
}
