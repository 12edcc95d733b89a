// Fixture writers shared by the integration tests.
#![allow(dead_code)]

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use postings_engine::index::ExtentsReader;
use postings_engine::index::disjoint::{EXTENTS_DIR, NAMES_FILE};
use postings_engine::table::manifest::{MAX_COUNT, RANGE_END, RANGE_START};
use postings_engine::table::{Manifest, TableBuilder, TableOptions};
use postings_engine::types::{DocId, ExtentArray, encode_doc_key};

/// Small blocks, so even tiny fixtures span several of them.
pub fn small_blocks() -> TableOptions {
    TableOptions {
        block_size: 128,
        ..Default::default()
    }
}

pub fn extents(pairs: &[(u32, u32)]) -> ExtentArray {
    pairs.iter().copied().collect()
}

/// `count` single-position extents starting at 0.
pub fn occurrences(count: u32) -> ExtentArray {
    (0..count).map(|i| (i, i + 1)).collect()
}

fn declare_range(builder: &mut TableBuilder, range: &Option<Range<DocId>>) {
    if let Some(range) = range {
        builder.set_property(RANGE_START, range.start);
        builder.set_property(RANGE_END, range.end);
    }
}

pub fn write_names(
    path: &Path,
    names: &[(DocId, &str)],
    range: Option<Range<DocId>>,
) -> Manifest {
    let mut builder = TableBuilder::new(path, small_blocks()).unwrap();
    for (document, name) in names {
        builder.add(&encode_doc_key(*document), name.as_bytes()).unwrap();
    }
    declare_range(&mut builder, &range);
    builder.finish().unwrap()
}

/// Write one term's postings, recording the largest count as `maxCount`.
pub fn write_extents(
    path: &Path,
    postings: &[(DocId, ExtentArray)],
    range: Option<Range<DocId>>,
) -> Manifest {
    let mut builder = TableBuilder::new(path, small_blocks()).unwrap();
    let mut max_count = 0u64;
    for (document, extents) in postings {
        builder.add(&encode_doc_key(*document), &extents.encode()).unwrap();
        max_count = max_count.max(extents.len() as u64);
    }
    builder.set_property(MAX_COUNT, max_count);
    declare_range(&mut builder, &range);
    builder.finish().unwrap()
}

/// A term and its postings within one segment.
pub type TermPostings<'a> = (&'a str, Vec<(DocId, ExtentArray)>);

/// Lay out a segment directory: a names table plus one extents table per
/// term, every table declaring `range`.
pub fn write_segment(
    dir: &Path,
    range: Range<DocId>,
    names: &[(DocId, &str)],
    terms: &[TermPostings<'_>],
) -> PathBuf {
    fs::create_dir_all(dir.join(EXTENTS_DIR)).unwrap();
    write_names(&dir.join(NAMES_FILE), names, Some(range.clone()));
    for (term, postings) in terms {
        let path = ExtentsReader::table_path(&dir.join(EXTENTS_DIR), term);
        write_extents(&path, postings, Some(range.clone()));
    }
    dir.to_path_buf()
}

/// Names `doc-<id>` for each id.
pub fn names_for(ids: &[DocId]) -> Vec<(DocId, String)> {
    ids.iter().map(|id| (*id, format!("doc-{id}"))).collect()
}

pub fn as_refs(names: &[(DocId, String)]) -> Vec<(DocId, &str)> {
    names.iter().map(|(id, name)| (*id, name.as_str())).collect()
}
