//! `QueryIndex`: per-query precomputed features (§4.5) plus a versioned
//! on-disk cache.
//!
//! The cache format is grounded on the teacher's `binary/header.rs`: a
//! fixed magic + version prefix, a CRC32 footer, and "mismatch means
//! rebuild, never partially repair" (§9 design note).

use crate::bigrams::BigramTable;
use crate::hpack;
use crate::site_profile::{Lang, SiteProfile};
use crc32fast::Hasher as Crc32Hasher;
use std::io::{self, Read, Write};
use std::path::Path;

pub const MAGIC: [u8; 4] = *b"QIDX";
pub const VERSION: u8 = 1;

/// Eight parallel compressed-size-delta sequences, one per initial
/// bit-alignment (§4.5). `None` for languages/sites where the pattern
/// feature does not apply (HTTP/1.1, or `change_byte != 0`).
pub type Patterns = Option<[Vec<i32>; 8]>;

#[derive(Debug, Clone)]
pub struct QueryRow {
    pub query: String,
    pub length: u32,
    pub delimiters: Vec<u8>,
    pub patterns: Patterns,
    pub rhythm_mean: Vec<f64>,
    pub rhythm_std: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct QueryIndex {
    pub rows: Vec<QueryRow>,
}

impl QueryIndex {
    /// Build the index fresh from a dictionary, a site profile and a
    /// bigram table. §5 permits parallelizing this across the dictionary;
    /// with the `parallel` feature enabled, `rayon` does the fan-out.
    pub fn build(site: &SiteProfile, dictionary: &[String], bigrams: &BigramTable) -> Self {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            let bar = crate::cli::display::progress_bar(dictionary.len() as u64, "indexing dictionary");
            let rows = dictionary
                .par_iter()
                .map(|q| {
                    let row = build_row(site, q, bigrams);
                    bar.inc(1);
                    row
                })
                .collect();
            bar.finish_and_clear();
            QueryIndex { rows }
        }
        #[cfg(not(feature = "parallel"))]
        {
            let rows = dictionary.iter().map(|q| build_row(site, q, bigrams)).collect();
            QueryIndex { rows }
        }
    }

    pub fn write_cache(&self, path: &Path) -> io::Result<()> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&MAGIC);
        payload.push(VERSION);
        write_varint(&mut payload, self.rows.len() as u64);
        for row in &self.rows {
            write_string(&mut payload, &row.query);
            write_varint(&mut payload, row.length as u64);
            write_varint(&mut payload, row.delimiters.len() as u64);
            payload.extend_from_slice(&row.delimiters);
            match &row.patterns {
                None => payload.push(0),
                Some(patterns) => {
                    payload.push(1);
                    for alignment in patterns {
                        write_varint(&mut payload, alignment.len() as u64);
                        for &v in alignment {
                            write_svarint(&mut payload, v as i64);
                        }
                    }
                }
            }
            write_varint(&mut payload, row.rhythm_mean.len() as u64);
            for &v in &row.rhythm_mean {
                payload.extend_from_slice(&v.to_le_bytes());
            }
            for &v in &row.rhythm_std {
                payload.extend_from_slice(&v.to_le_bytes());
            }
        }

        let mut hasher = Crc32Hasher::new();
        hasher.update(&payload);
        let checksum = hasher.finalize();

        let mut file = std::fs::File::create(path)?;
        file.write_all(&payload)?;
        file.write_all(&checksum.to_le_bytes())?;
        Ok(())
    }

    /// Load a cache, rejecting it (returning `Ok(None)`) on checksum
    /// failure, magic/version mismatch, or a row count that disagrees
    /// with `expected_rows` — the caller rebuilds in all of these cases,
    /// per §9's "mismatch rebuilds, never partially repairs."
    pub fn read_cache(path: &Path, expected_rows: usize) -> io::Result<Option<Self>> {
        let mut buf = Vec::new();
        std::fs::File::open(path)?.read_to_end(&mut buf)?;
        if buf.len() < MAGIC.len() + 1 + 4 {
            return Ok(None);
        }
        let (body, footer) = buf.split_at(buf.len() - 4);
        let expected_crc = u32::from_le_bytes(footer.try_into().unwrap());
        let mut hasher = Crc32Hasher::new();
        hasher.update(body);
        if hasher.finalize() != expected_crc {
            tracing::debug!("query index cache checksum mismatch, will rebuild");
            return Ok(None);
        }

        let mut cursor = &body[..];
        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Ok(None);
        }
        let mut version = [0u8; 1];
        cursor.read_exact(&mut version)?;
        if version[0] != VERSION {
            return Ok(None);
        }

        let row_count = read_varint(&mut cursor)? as usize;
        if row_count != expected_rows {
            tracing::debug!(row_count, expected_rows, "query index row count mismatch");
            return Ok(None);
        }

        let mut rows = Vec::with_capacity(row_count);
        for _ in 0..row_count {
            let query = read_string(&mut cursor)?;
            let length = read_varint(&mut cursor)? as u32;
            let delim_len = read_varint(&mut cursor)? as usize;
            let mut delimiters = vec![0u8; delim_len];
            cursor.read_exact(&mut delimiters)?;
            let has_patterns = {
                let mut b = [0u8; 1];
                cursor.read_exact(&mut b)?;
                b[0] == 1
            };
            let patterns = if has_patterns {
                let mut alignments: Vec<Vec<i32>> = Vec::with_capacity(8);
                for _ in 0..8 {
                    let n = read_varint(&mut cursor)? as usize;
                    let mut v = Vec::with_capacity(n);
                    for _ in 0..n {
                        v.push(read_svarint(&mut cursor)? as i32);
                    }
                    alignments.push(v);
                }
                Some(alignments.try_into().unwrap_or_else(|_| {
                    [
                        Vec::new(),
                        Vec::new(),
                        Vec::new(),
                        Vec::new(),
                        Vec::new(),
                        Vec::new(),
                        Vec::new(),
                        Vec::new(),
                    ]
                }))
            } else {
                None
            };
            let rhythm_len = read_varint(&mut cursor)? as usize;
            let mut rhythm_mean = Vec::with_capacity(rhythm_len);
            for _ in 0..rhythm_len {
                let mut b = [0u8; 8];
                cursor.read_exact(&mut b)?;
                rhythm_mean.push(f64::from_le_bytes(b));
            }
            let mut rhythm_std = Vec::with_capacity(rhythm_len);
            for _ in 0..rhythm_len {
                let mut b = [0u8; 8];
                cursor.read_exact(&mut b)?;
                rhythm_std.push(f64::from_le_bytes(b));
            }
            rows.push(QueryRow {
                query,
                length,
                delimiters,
                patterns,
                rhythm_mean,
                rhythm_std,
            });
        }

        Ok(Some(QueryIndex { rows }))
    }
}

fn build_row(site: &SiteProfile, query: &str, bigrams: &BigramTable) -> QueryRow {
    let trim = site.lang == Lang::English && site.trim_space;
    let chars: Vec<char> = if trim {
        query.chars().filter(|c| !c.is_whitespace()).collect()
    } else {
        query.chars().collect()
    };
    let length = chars.len() as u32;

    let delimiters: Vec<u8> = chars
        .iter()
        .map(|&c| u8::from(c == ' ' || c == '\''))
        .collect();

    let patterns = if site.http_version == crate::site_profile::HttpVersion::Http2 && site.change_byte == 0 {
        Some(build_patterns(site, query))
    } else {
        None
    };

    let mut rhythm_mean = Vec::new();
    let mut rhythm_std = Vec::new();
    for w in chars.windows(2) {
        if trim && (w[0] == ' ' || w[1] == ' ') {
            continue;
        }
        let (mean, std) = bigrams.lookup(w[0], w[1]);
        rhythm_mean.push(mean);
        rhythm_std.push(std);
    }

    QueryRow {
        query: query.to_string(),
        length,
        delimiters,
        patterns,
        rhythm_mean,
        rhythm_std,
    }
}

fn build_patterns(site: &SiteProfile, query: &str) -> [Vec<i32>; 8] {
    let encoded = percent_encode(site, query);
    let mut out: [Vec<i32>; 8] = std::array::from_fn(|_| Vec::new());
    for (alignment, slot) in out.iter_mut().enumerate() {
        let mut prev_len = hpack::encoded_byte_len_with_prefix(&[], alignment as u32);
        let mut deltas = Vec::with_capacity(encoded.len().saturating_sub(1));
        for i in 1..=encoded.len() {
            let len = hpack::encoded_byte_len_with_prefix(&encoded[..i], alignment as u32);
            deltas.push((len as i64 - prev_len as i64) as i32);
            prev_len = len;
        }
        *slot = deltas;
    }
    out
}

fn percent_encode(site: &SiteProfile, query: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(query.len());
    for b in query.bytes() {
        match b {
            b' ' if site.encode_space => out.extend_from_slice(b"%20"),
            b' ' if site.trim_space => {}
            b'\'' if site.encode_apostrophe => out.extend_from_slice(b"%27"),
            other => out.push(other),
        }
    }
    out
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

fn read_varint(cursor: &mut &[u8]) -> io::Result<u64> {
    let mut result: u64 = 0;
    let mut shift = 0;
    loop {
        let mut byte = [0u8; 1];
        cursor.read_exact(&mut byte)?;
        result |= u64::from(byte[0] & 0x7f) << shift;
        if byte[0] & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift > 63 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "varint too long"));
        }
    }
    Ok(result)
}

fn write_svarint(out: &mut Vec<u8>, value: i64) {
    let zigzag = ((value << 1) ^ (value >> 63)) as u64;
    write_varint(out, zigzag);
}

fn read_svarint(cursor: &mut &[u8]) -> io::Result<i64> {
    let zigzag = read_varint(cursor)?;
    Ok(((zigzag >> 1) as i64) ^ -((zigzag & 1) as i64))
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    write_varint(out, s.len() as u64);
    out.extend_from_slice(s.as_bytes());
}

fn read_string(cursor: &mut &[u8]) -> io::Result<String> {
    let len = read_varint(cursor)? as usize;
    let mut buf = vec![0u8; len];
    cursor.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site_profile::lookup;

    #[test]
    fn build_row_counts_delimiters() {
        let site = lookup("google").unwrap();
        let bigrams = BigramTable::default();
        let row = build_row(&site, "new york", &bigrams);
        assert_eq!(row.length, 8);
        assert_eq!(row.delimiters.iter().filter(|&&d| d == 1).count(), 1);
    }

    #[test]
    fn trim_space_site_drops_spaces_from_length() {
        let site = lookup("tmall").unwrap();
        let bigrams = BigramTable::default();
        let row = build_row(&site, "new york", &bigrams);
        assert_eq!(row.length, 7);
    }

    #[test]
    fn cache_round_trips_through_tempfile() {
        let site = lookup("google").unwrap();
        let bigrams = BigramTable::default();
        let index = QueryIndex::build(&site, &["cats".into(), "dogs".into()], &bigrams);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("google_en.cache");
        index.write_cache(&path).unwrap();
        let loaded = QueryIndex::read_cache(&path, 2).unwrap().expect("cache should load");
        assert_eq!(loaded.rows.len(), 2);
        assert_eq!(loaded.rows[0].query, "cats");
    }

    #[test]
    fn cache_row_count_mismatch_triggers_rebuild_signal() {
        let site = lookup("google").unwrap();
        let bigrams = BigramTable::default();
        let index = QueryIndex::build(&site, &["cats".into()], &bigrams);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("google_en.cache");
        index.write_cache(&path).unwrap();
        let loaded = QueryIndex::read_cache(&path, 2).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn patterns_cover_every_byte_of_the_percent_encoded_query() {
        let site = lookup("google").unwrap();
        let bigrams = BigramTable::default();
        let row = build_row(&site, "maps", &bigrams);
        let patterns = row.patterns.expect("google is HTTP/2 with change_byte=0");
        for alignment in &patterns {
            assert_eq!(alignment.len(), "maps".len());
        }
    }
}
