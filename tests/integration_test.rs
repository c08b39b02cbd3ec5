//! Integration tests for streamcsv

#[cfg(feature = "async")]
use futures_util::stream;
use std::io::Write;
#[cfg(feature = "async")]
use streamcsv::collect_text_stream;
use streamcsv::{
    generate_from_objects, parse, parse_bytes, parse_bytes_safe, parse_safe, CsvBuilder,
    CsvError, CsvReader, CsvWriter, Delimiter, FieldValue, GenerateOptions, ObjectRow,
    ParseOptions, StreamEvent, StreamOptions, StreamParser,
};
use tempfile::NamedTempFile;

#[test]
fn test_write_and_read_roundtrip() {
    // Create temporary file
    let temp = NamedTempFile::new().unwrap();

    // Write data
    {
        let mut writer = CsvWriter::create(temp.path(), GenerateOptions::default()).unwrap();
        writer.write_headers(["Name", "Age", "City"]).unwrap();
        writer.write_row(["Alice", "30", "New York, NY"]).unwrap();
        writer.write_row(["Bob", "25", "Quote \"Q\" Town"]).unwrap();
        assert_eq!(writer.row_count(), 3);
        writer.finish().unwrap();
    }

    // Read data back
    {
        let options = StreamOptions::new()
            .chunk_size(7)
            .parse_options(ParseOptions::new().has_headers(true));
        let mut reader = CsvReader::open(temp.path(), options).unwrap();
        let rows: Vec<_> = reader.rows().collect::<Result<Vec<_>, _>>().unwrap();

        assert_eq!(
            reader.headers().unwrap(),
            &["Name".to_string(), "Age".to_string(), "City".to_string()]
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fields, vec!["Alice", "30", "New York, NY"]);
        assert_eq!(rows[1].get_by_name("City"), Some("Quote \"Q\" Town"));
    }
}

#[test]
fn test_typed_values() {
    let temp = NamedTempFile::new().unwrap();

    // Write typed data
    {
        let mut writer = CsvWriter::create(temp.path(), GenerateOptions::default()).unwrap();
        writer.write_headers(["name", "age", "score", "active", "extra"]).unwrap();
        writer
            .write_row_values(&[
                FieldValue::from("Alice"),
                FieldValue::Int(30),
                FieldValue::Float(1234.5),
                FieldValue::Bool(true),
                FieldValue::from(None::<i64>),
            ])
            .unwrap();
        writer.finish().unwrap();
    }

    // Read and verify
    let doc = CsvReader::open(temp.path(), ParseOptions::new().has_headers(true).into())
        .unwrap()
        .into_document()
        .unwrap();
    let record = doc.rows[0].record.as_ref().unwrap();
    assert_eq!(record["age"], "30");
    assert_eq!(record["score"], "1234.5");
    assert_eq!(record["active"], "true");
    assert_eq!(record["extra"], "");
}

#[test]
fn test_missing_file_is_io_error() {
    let result = CsvReader::open("/nonexistent/dir/data.csv", StreamOptions::default());
    assert!(matches!(result, Err(CsvError::Io(_))));
}

#[test]
fn test_reader_matches_full_parse() {
    let mut temp = NamedTempFile::new().unwrap();
    let mut content = String::from("id;label;note\n");
    for i in 0..50 {
        content.push_str(&format!("{};item {};\"multi\nline; {}\"\n", i, i, i));
    }
    temp.write_all(content.as_bytes()).unwrap();
    temp.flush().unwrap();

    let parse_options = ParseOptions::new().has_headers(true);
    let full = parse(&content, &parse_options).unwrap();
    let streamed = CsvReader::open(
        temp.path(),
        StreamOptions::new().chunk_size(13).parse_options(parse_options),
    )
    .unwrap()
    .into_document()
    .unwrap();

    assert_eq!(full.delimiter, Delimiter::SEMICOLON);
    assert_eq!(full.total_rows, 50);
    assert_eq!(streamed, full);
}

#[test]
fn test_safe_forms_never_fail_loudly() {
    let outcome = parse_safe("a,\"never closed", &ParseOptions::default());
    assert!(!outcome.is_success());
    let error = outcome.error().unwrap();
    assert!(error.is_malformed_input());
    assert!(error.to_string().contains("never closed"));

    let outcome = parse_bytes_safe(&[0xFF, 0xFE, b'a', 0x00, b',', 0x00, b'b', 0x00], &ParseOptions::default());
    assert!(outcome.is_success());
    assert_eq!(outcome.data().unwrap().rows[0].fields, vec!["a", "b"]);
}

#[test]
fn test_bom_prefixed_bytes() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice("key|value\nk|v\n".as_bytes());

    let doc = parse_bytes(&bytes, &ParseOptions::new().has_headers(true)).unwrap();
    assert_eq!(doc.delimiter, Delimiter::PIPE);
    assert_eq!(doc.headers, Some(vec!["key".to_string(), "value".to_string()]));
    assert_eq!(doc.column("value"), Some(vec!["v"]));
}

#[test]
fn test_generated_objects_parse_back() {
    let mut object = ObjectRow::new();
    object.insert("name".to_string(), "Smith, Jane".into());
    object.insert("bio".to_string(), "Says \"hi\"\nand leaves".into());
    object.insert("age".to_string(), FieldValue::Int(41));

    let csv = generate_from_objects(&[object], &GenerateOptions::default());
    let doc = parse(&csv, &ParseOptions::new().has_headers(true)).unwrap();

    let record = doc.records().next().unwrap();
    assert_eq!(record["name"], "Smith, Jane");
    assert_eq!(record["bio"], "Says \"hi\"\nand leaves");
    assert_eq!(record["age"], "41");
}

#[test]
fn test_builder_chunks_feed_stream_parser() {
    let mut builder = CsvBuilder::new(GenerateOptions::new().delimiter(Delimiter::TAB));
    builder.with_headers(&["k", "v"]);
    for i in 0..25 {
        builder.add_row(&[format!("key{}", i), format!("value\t{}", i)]);
    }

    let mut parser = StreamParser::new(
        StreamOptions::new().parse_options(ParseOptions::new().has_headers(true)),
    )
    .unwrap();
    let mut rows = Vec::new();
    for chunk in builder.chunks(4) {
        for event in parser.feed(&chunk).unwrap() {
            if let StreamEvent::Row(row) = event {
                rows.push(row);
            }
        }
    }
    let tail = parser.finish().unwrap();

    assert_eq!(parser.delimiter(), Some(Delimiter::TAB));
    assert!(matches!(
        tail.last(),
        Some(StreamEvent::Complete { total_rows: 25, .. })
    ));
    assert_eq!(rows.len(), 24);
    assert_eq!(rows[3].get_by_name("v"), Some("value\t3"));
}

#[test]
fn test_buffer_limit_is_distinguishable() {
    let options = StreamOptions::new()
        .max_buffer_size(64)
        .parse_options(ParseOptions::new().delimiter(Delimiter::COMMA));
    let mut parser = StreamParser::new(options).unwrap();
    parser.feed("a,\"").unwrap();

    let error = parser.feed(&"x".repeat(100)).unwrap_err();
    assert!(error.is_resource_limit());
    assert!(!error.is_malformed_input());
}

#[cfg(feature = "async")]
#[tokio::test]
async fn test_async_text_stream_collects() {
    let chunks = stream::iter(vec![
        Ok::<_, std::io::Error>("  id , name \n".to_string()),
        Ok(" 1 ,".to_string()),
        Ok(" Alice \n".to_string()),
    ]);
    let options = StreamOptions::new().parse_options(
        ParseOptions::new()
            .delimiter(Delimiter::COMMA)
            .has_headers(true)
            .trim_fields(true),
    );

    let doc = collect_text_stream(chunks, options).await.unwrap();
    assert_eq!(doc.headers, Some(vec!["id".to_string(), "name".to_string()]));
    assert_eq!(doc.rows[0].get_by_name("name"), Some("Alice"));
}
