//! Line reader + record model over real files, the way the synchronizer
//! consumes them: stream, match by key, retain one record.

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use std::fs::File;
use std::io::Write;
use tempfile::NamedTempFile;

use pwmirror_core::{record, LineReader, Record, Username};

// ---------------------------------------------------------------------------
// 1. Streaming a credential file
// ---------------------------------------------------------------------------

#[test]
fn scans_a_file_and_retains_the_first_match() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let fixture = dir.child("passwd");
    fixture
        .write_str("root:x:0:0:root:/root:/bin/sh\nalice:x:1000:1000::/home/alice:/bin/sh\nalice:DUPLICATE:9999:9999::/:/bin/false\n")
        .expect("fixture");
    fixture.assert(predicate::path::exists());

    let user = Username::from("alice");
    let file = File::open(fixture.path()).expect("open");
    let mut reader = LineReader::new(file);

    let mut matched: Option<Record> = None;
    while let Some(line) = reader.next_line().expect("read") {
        if record::line_matches(line, &user) {
            matched = Some(Record::new(line));
            break;
        }
    }

    let record = matched.expect("alice present");
    assert_eq!(record.as_bytes(), b"alice:x:1000:1000::/home/alice:/bin/sh");
    assert_eq!(record.key(), Some(b"alice".as_slice()));
}

#[test]
fn absent_key_reaches_end_of_stream() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let fixture = dir.child("passwd");
    fixture
        .write_str("root:x:0:0:root:/root:/bin/sh\n")
        .expect("fixture");

    let user = Username::from("mallory");
    let mut reader = LineReader::new(File::open(fixture.path()).expect("open"));
    let mut found = false;
    while let Some(line) = reader.next_line().expect("read") {
        if record::line_matches(line, &user) {
            found = true;
        }
    }
    assert!(!found, "mallory is not in the fixture");
}

// ---------------------------------------------------------------------------
// 2. Growth against a real file
// ---------------------------------------------------------------------------

#[test]
fn oversized_gecos_field_survives_a_file_round_trip() {
    let mut fixture = NamedTempFile::new().expect("tempfile");

    let gecos = "g".repeat(64 * 1024);
    let long_line = format!("bigshot:x:1001:1001:{gecos}:/home/bigshot:/bin/sh");
    write!(fixture, "{long_line}\nafter:x:1002:1002::/:/bin/sh\n").expect("fixture");

    let mut reader = LineReader::new(fixture.reopen().expect("reopen"));
    let first = reader.next_line().expect("long").expect("some").to_vec();
    assert_eq!(first, long_line.as_bytes());

    let second = reader.next_line().expect("next").expect("some").to_vec();
    assert_eq!(second, b"after:x:1002:1002::/:/bin/sh".to_vec());
    assert_eq!(reader.next_line().expect("eof"), None);
}
