// Extents and field-lengths reader tests
// Per-term postings tables, their counts, malformed payloads, and the
// zero-length policy for documents without a field.

mod common;

use std::fs;

use postings_engine::error::{Error, Unsupported};
use postings_engine::index::{ExtentsReader, FieldLengthsReader, IndexPartReader};
use postings_engine::iterator::{
    Annotate, CandidateIterator, CountIterator, ExtentIterator, LengthIterator,
};
use postings_engine::params::Node;
use postings_engine::table::{TableBuilder, TableOptions};
use postings_engine::types::{ExtentArray, MAX_DOC_ID, encode_doc_key};
use tempfile::tempdir;

use common::{extents, occurrences, write_extents};

// =============================================================================
// Test 1: One table per term, discovered by file name
// =============================================================================
#[test]
fn opens_every_term_table() {
    let dir = tempdir().unwrap();
    write_extents(&ExtentsReader::table_path(dir.path(), "cat"), &[(1, occurrences(1))], None);
    write_extents(&ExtentsReader::table_path(dir.path(), "dog"), &[(2, occurrences(2))], None);
    fs::write(dir.path().join("README"), b"not a table").unwrap();

    let reader = ExtentsReader::open(dir.path()).unwrap();
    assert_eq!(reader.terms().collect::<Vec<_>>(), vec!["cat", "dog"]);
    assert!(reader.contains("cat"));
    assert!(!reader.contains("README"));
    assert!(reader.extents_iterator("bird").unwrap().is_none());
}

// =============================================================================
// Test 2: Extents and counts follow the cursor
// =============================================================================
#[test]
fn extents_and_counts_per_candidate() {
    let dir = tempdir().unwrap();
    let postings = vec![
        (4, extents(&[(0, 1)])),
        (7, extents(&[(2, 3), (10, 11), (20, 21)])),
        (12, extents(&[(5, 7), (9, 12)])),
    ];
    write_extents(&ExtentsReader::table_path(dir.path(), "cat"), &postings, None);

    let reader = ExtentsReader::open(dir.path()).unwrap();
    let mut iter = reader.extents_iterator("cat").unwrap().unwrap();
    assert_eq!(iter.maximum_count(), 3);
    assert_eq!(iter.total_entries(), 3);

    for (doc, expected) in &postings {
        assert_eq!(iter.current_candidate(), *doc);
        assert_eq!(iter.extents(), expected);
        assert_eq!(iter.count() as usize, expected.len());
        iter.next().unwrap();
    }
    assert!(iter.is_done());
    assert!(iter.extents().is_empty());
    assert_eq!(iter.count(), 0);
}

// =============================================================================
// Test 3: Served through a query node's default parameter
// =============================================================================
#[test]
fn iterator_from_node() {
    let dir = tempdir().unwrap();
    write_extents(&ExtentsReader::table_path(dir.path(), "cat"), &[(9, occurrences(2))], None);
    let reader = ExtentsReader::open(dir.path()).unwrap();

    let iter = reader.iterator(&Node::with_default("counts", "cat")).unwrap();
    assert_eq!(iter.current_candidate(), 9);
    assert_eq!(iter.count(), 2);

    assert!(matches!(
        reader.iterator(&Node::with_default("extents", "bird")),
        Err(Error::UnknownTerm(term)) if term == "bird"
    ));
    assert!(matches!(
        reader.iterator(&Node::new("extents")),
        Err(Error::MissingParameter { .. })
    ));
    assert!(matches!(
        reader.iterator(&Node::new("names")),
        Err(Error::Unsupported(Unsupported::Operator { .. }))
    ));
}

// =============================================================================
// Test 4: Missing maxCount leaves the count bound unlimited
// =============================================================================
#[test]
fn unknown_maximum_count_is_unbounded() {
    let dir = tempdir().unwrap();
    let path = ExtentsReader::table_path(dir.path(), "cat");
    let mut builder = TableBuilder::new(&path, TableOptions::default()).unwrap();
    builder.add(&encode_doc_key(1), &occurrences(4).encode()).unwrap();
    builder.finish().unwrap();

    let reader = ExtentsReader::open(dir.path()).unwrap();
    let iter = reader.extents_iterator("cat").unwrap().unwrap();
    assert_eq!(iter.maximum_count(), u32::MAX);
}

// =============================================================================
// Test 5: A malformed payload reads as an empty extent list
// =============================================================================
#[test]
fn malformed_payload_is_empty() {
    let dir = tempdir().unwrap();
    let path = ExtentsReader::table_path(dir.path(), "cat");
    let mut builder = TableBuilder::new(&path, TableOptions::default()).unwrap();
    builder.add(&encode_doc_key(1), &occurrences(2).encode()).unwrap();
    // Claims three extents, carries one
    let mut bad = 3u32.to_be_bytes().to_vec();
    bad.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 2]);
    builder.add(&encode_doc_key(2), &bad).unwrap();
    builder.add(&encode_doc_key(3), &occurrences(1).encode()).unwrap();
    builder.finish().unwrap();

    let reader = ExtentsReader::open(dir.path()).unwrap();
    let mut iter = reader.extents_iterator("cat").unwrap().unwrap();
    iter.sync_to(2).unwrap();
    assert_eq!(iter.current_candidate(), 2);
    assert_eq!(iter.count(), 0);

    // The iterator keeps going past it
    iter.next().unwrap();
    assert_eq!(iter.current_candidate(), 3);
    assert_eq!(iter.count(), 1);
}

// =============================================================================
// Test 6: Field lengths are extent coverage; absent documents have length 0
// =============================================================================
#[test]
fn lengths_default_to_zero() {
    let dir = tempdir().unwrap();
    write_extents(
        &ExtentsReader::table_path(dir.path(), "title"),
        &[(1, extents(&[(0, 4)])), (5, extents(&[(0, 2), (10, 13)]))],
        None,
    );

    let lengths = FieldLengthsReader::open(dir.path(), "title").unwrap();
    assert_eq!(lengths.field(), "title");
    assert_eq!(lengths.length(1).unwrap(), 4);
    assert_eq!(lengths.length(5).unwrap(), 5);
    assert_eq!(lengths.length(3).unwrap(), 0);
    assert_eq!(lengths.length(100).unwrap(), 0);

    let mut iter = lengths.lengths_iterator().unwrap();
    assert_eq!(iter.length_at(1), 4);
    iter.sync_to(3).unwrap();
    assert_eq!(iter.current_candidate(), 5);
    assert_eq!(iter.length_at(3), 0);
    assert_eq!(iter.length_at(5), 5);
    iter.next().unwrap();
    assert_eq!(iter.current_candidate(), MAX_DOC_ID);
    assert_eq!(iter.length_at(5), 0);
}

// =============================================================================
// Test 7: Unknown field fails; node types are not exposed
// =============================================================================
#[test]
fn lengths_reader_rejections() {
    let dir = tempdir().unwrap();
    write_extents(&ExtentsReader::table_path(dir.path(), "title"), &[(1, occurrences(1))], None);

    let mut lengths = FieldLengthsReader::open(dir.path(), "title").unwrap();
    assert!(matches!(
        lengths.node_types(),
        Err(Error::Unsupported(Unsupported::NodeTypes { reader: "lengths" }))
    ));

    lengths.set_field("body");
    assert!(matches!(
        lengths.lengths_iterator(),
        Err(Error::UnknownTerm(field)) if field == "body"
    ));
    assert!(lengths.lengths_iterator_for("title").is_ok());
}

// =============================================================================
// Test 8: Annotation nests the extents under the lengths node
// =============================================================================
#[test]
fn annotate_lengths() {
    let dir = tempdir().unwrap();
    write_extents(
        &ExtentsReader::table_path(dir.path(), "title"),
        &[(2, extents(&[(0, 3), (5, 6)]))],
        None,
    );

    let lengths = FieldLengthsReader::open(dir.path(), "title").unwrap();
    let snapshot = lengths.lengths_iterator().unwrap().annotate(2).unwrap();
    assert_eq!(snapshot.operator, "lengths");
    assert_eq!(snapshot.value, "4");
    assert_eq!(snapshot.children.len(), 1);
    assert_eq!(snapshot.children[0].value, "[[0,3),[5,6)]");
    assert_eq!(snapshot.children[0].parameters, "title");
}

#[test]
fn empty_extent_array_encodes_count_only() {
    assert_eq!(ExtentArray::new().encode(), vec![0, 0, 0, 0]);
    assert_eq!(ExtentArray::decode(&[0, 0, 0, 0]), Some(ExtentArray::new()));
}
