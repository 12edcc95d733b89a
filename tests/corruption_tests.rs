// Read failure tests
// A damaged block deep inside a posting list surfaces as an error at every
// layer that reaches it: typed reader, disjoint merge, and ranking.

mod common;

use std::fs;
use std::path::{Path, PathBuf};

use postings_engine::error::Error;
use postings_engine::index::disjoint::EXTENTS_DIR;
use postings_engine::index::{DisjointIndex, ExtentsIterator, ExtentsReader};
use postings_engine::iterator::{CandidateIterator, CountIterator, DisjointIterator};
use postings_engine::params::Node;
use postings_engine::scoring::{Bm25Iterator, MaxScoreRanker, rank_exhaustive};
use postings_engine::table::footer::{Footer, IndexEntry};
use postings_engine::types::{DocId, MAX_DOC_ID, decode_doc_key};
use tempfile::{TempDir, tempdir};

use common::{TermPostings, as_refs, extents, names_for, occurrences, write_segment};

const DOCS_PER_SEGMENT: u64 = 40;

fn segment(dir: &Path, name: &str, start: DocId) -> PathBuf {
    let ids: Vec<DocId> = (start..start + DOCS_PER_SEGMENT).collect();
    let names = names_for(&ids);
    let terms: Vec<TermPostings<'_>> = vec![
        ("cat", ids.iter().map(|id| (*id, occurrences((*id % 3) as u32 + 1))).collect()),
        ("title", ids.iter().map(|id| (*id, extents(&[(0, 10)]))).collect()),
    ];
    write_segment(&dir.join(name), start..start + 1000, &as_refs(&names), &terms)
}

/// Flip a byte in the last data block of `path`; returns the block's last
/// document id.
fn damage_last_block(path: &Path) -> DocId {
    let mut bytes = fs::read(path).unwrap();
    let footer = Footer::decode(&bytes[bytes.len() - Footer::SIZE..]).unwrap();

    let start = footer.index.offset as usize;
    let index = &bytes[start..start + footer.index.size as usize];
    let mut entries = Vec::new();
    let mut offset = 0;
    while offset < index.len() {
        let (entry, consumed) = IndexEntry::decode(&index[offset..]).unwrap();
        entries.push(entry);
        offset += consumed;
    }
    assert!(entries.len() > 2, "fixture should span several blocks");

    let last = entries.last().unwrap().clone();
    bytes[last.handle.offset as usize + 2] ^= 0xFF;
    fs::write(path, &bytes).unwrap();
    decode_doc_key(&last.last_key).unwrap()
}

/// Two segments, [0, 1000) and [1000, 2000); the second segment's "cat"
/// postings are damaged at the tail.
fn damaged_index() -> (TempDir, DisjointIndex, DocId) {
    let dir = tempdir().unwrap();
    let first = segment(dir.path(), "seg0", 0);
    let second = segment(dir.path(), "seg1", 1000);
    let damaged = damage_last_block(&ExtentsReader::table_path(&second.join(EXTENTS_DIR), "cat"));
    let index = DisjointIndex::open(&[first, second]).unwrap();
    (dir, index, damaged)
}

fn bm25_over(index: &DisjointIndex, term: &str) -> DisjointIterator<Bm25Iterator<ExtentsIterator>> {
    let node = Node::with_default("bm25", term)
        .with("documentCount", (2 * DOCS_PER_SEGMENT) as i64)
        .with("collectionLength", (20 * DOCS_PER_SEGMENT) as i64)
        .with("nodeDocumentCount", (2 * DOCS_PER_SEGMENT) as i64)
        .with("k1", 1.2)
        .with("b", 0.75);
    let parts = index
        .segments()
        .iter()
        .filter_map(|segment| segment.extents().extents_iterator(term).unwrap())
        .map(|counts| Bm25Iterator::from_node(&node, counts).unwrap())
        .collect();
    DisjointIterator::new(parts).unwrap()
}

// =============================================================================
// Test 1: sync_to into a damaged block fails without looking exhausted
// =============================================================================
#[test]
fn sync_into_damaged_block_is_an_error() {
    let (_dir, index, damaged) = damaged_index();
    let mut cat = index.extents_iterator("cat").unwrap();

    cat.sync_to(20).unwrap();
    assert_eq!(cat.current_candidate(), 20);

    assert!(matches!(cat.sync_to(damaged), Err(Error::Corruption(_))));
    assert!(!cat.is_done());
    // The damaged segment never moved; it still holds its first document
    assert_eq!(cat.current_candidate(), 1000);
    assert_eq!(cat.count(), (1000 % 3) as u32 + 1);
}

// =============================================================================
// Test 2: Stepping with next() reports the failure at the damaged block
// =============================================================================
#[test]
fn next_into_damaged_block_is_an_error() {
    let (_dir, index, damaged) = damaged_index();
    let mut cat = index.extents_iterator("cat").unwrap();

    let mut visited = 0u64;
    let err = loop {
        assert!(!cat.is_done(), "exhausted instead of failing");
        visited += 1;
        if let Err(err) = cat.next() {
            break err;
        }
    };
    assert!(matches!(err, Error::Corruption(_)));
    assert!(!cat.is_done());
    assert_ne!(cat.current_candidate(), MAX_DOC_ID);
    assert!(cat.current_candidate() < damaged);
    assert!(visited > DOCS_PER_SEGMENT, "first segment should be fully read");
}

// =============================================================================
// Test 3: Ranking over the damaged index fails instead of truncating
// =============================================================================
#[test]
fn ranking_surfaces_the_failure() {
    let (_dir, index, _) = damaged_index();

    let mut scorers = vec![bm25_over(&index, "cat")];
    let mut lengths = index.lengths_iterator("title").unwrap();
    let mut ranker = MaxScoreRanker::new(1000);
    assert!(matches!(
        ranker.rank(&mut scorers, &mut lengths),
        Err(Error::Corruption(_))
    ));

    let mut scorers = vec![bm25_over(&index, "cat")];
    let mut lengths = index.lengths_iterator("title").unwrap();
    assert!(matches!(
        rank_exhaustive(1000, &mut scorers, &mut lengths),
        Err(Error::Corruption(_))
    ));
}

// =============================================================================
// Test 4: The undamaged segment still serves reads on its own
// =============================================================================
#[test]
fn other_segment_is_unaffected() {
    let (_dir, index, _) = damaged_index();
    let mut cat = index.segments()[0]
        .extents()
        .extents_iterator("cat")
        .unwrap()
        .unwrap();

    let mut seen = 0;
    while !cat.is_done() {
        seen += 1;
        cat.next().unwrap();
    }
    assert_eq!(seen, DOCS_PER_SEGMENT);
}
