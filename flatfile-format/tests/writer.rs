mod common;

use std::sync::{Arc, Mutex};

use common::{errors, format, layout, line, note, order, Orders, Value};
use flatfile_format::{
    FileError, FileValidationRule, FileWriter, FormatDefinition, HierarchyDescriptor,
    OperationStatus,
};

fn tree() -> FormatDefinition {
    FormatDefinition::delimited("Order").with_content_identifier("O")
}

fn text(writer: &FileWriter<Vec<u8>, Orders>) -> &str {
    std::str::from_utf8(writer.get_ref()).unwrap()
}

fn shipped() -> Value {
    order("1", "Acme")
        .with_line(Value::Line {
            sku: "A1".into(),
            qty: 2,
            serials: vec![Value::Serial {
                serial: "111".into(),
            }],
        })
        .with_line(line("B2", 1))
        .with_note(note("fragile"))
        .into_value()
}

#[test]
fn writes_descendants_in_pre_order() {
    let mut writer = FileWriter::new(Vec::new(), layout(tree(), Orders::new())).unwrap();

    let result = writer.write(&shipped()).unwrap();
    assert_eq!(result.status, OperationStatus::Content);
    assert!(result.value.is_some());
    assert_eq!(result.total_lines, 5);

    let levels: Vec<_> = result.records.iter().map(|r| r.level).collect();
    assert_eq!(levels, vec![0, 1, 2, 1, 1]);
    assert_eq!(result.value, Some(shipped()));
    assert_eq!(result.records[3].value, Some(line("B2", 1)));
    assert_eq!(result.records[4].value, Some(note("fragile")));

    writer.end_of_file().unwrap();
    assert_eq!(text(&writer), "O,1,Acme\nL,A1,2\nS,111\nL,B2,1\nN,FRAGILE\n");
}

#[test]
fn header_and_trailer_frame_the_content() {
    let mut writer = FileWriter::new(Vec::new(), layout(format(), Orders::new())).unwrap();

    writer
        .write_header(&Value::Header {
            batch: "b1".into(),
        })
        .unwrap();
    writer.write(&order("7", "Zed").into_value()).unwrap();
    let trailer = writer.write_trailer(&Value::Trailer { count: 1 }).unwrap();
    assert_eq!(trailer.records[0].raw_line, "T,00001");

    let eof = writer.end_of_file().unwrap();
    assert!(eof.is_end_of_file());
    assert_eq!(eof.total_lines, 3);
    assert_eq!(text(&writer), "H,b1\nO,7,Zed\nT,00001\n");
}

#[test]
fn content_after_trailer_is_rejected() {
    let mut writer = FileWriter::new(Vec::new(), layout(format(), Orders::new())).unwrap();

    writer.write_trailer(&Value::Trailer { count: 0 }).unwrap();
    let err = writer.write(&order("1", "a").into_value()).unwrap_err();
    assert!(matches!(
        err,
        FileError::InvalidState(ref msg) if msg.contains("attempt made to write past a Trailer row")
    ));

    writer.end_of_file().unwrap();
}

#[test]
fn header_must_come_first_and_once() {
    let header = Value::Header { batch: "b".into() };

    let mut writer = FileWriter::new(Vec::new(), layout(format(), Orders::new())).unwrap();
    writer.write_header(&header).unwrap();
    assert!(matches!(
        writer.write_header(&header),
        Err(FileError::InvalidState(_))
    ));
    writer.end_of_file().unwrap();

    let mut writer = FileWriter::new(Vec::new(), layout(format(), Orders::new())).unwrap();
    writer.write(&order("1", "a").into_value()).unwrap();
    assert!(matches!(
        writer.write_header(&header),
        Err(FileError::InvalidState(_))
    ));
    writer.end_of_file().unwrap();

    let mut writer = FileWriter::new(Vec::new(), layout(tree(), Orders::new())).unwrap();
    assert!(matches!(
        writer.write_header(&header),
        Err(FileError::InvalidState(ref msg)) if msg == "the format has no header record"
    ));
    writer.end_of_file().unwrap();
}

#[test]
fn missing_header_rule() {
    let format = format().with_rule(FileValidationRule::MustHaveHeaderRow);
    let mut writer = FileWriter::new(Vec::new(), layout(format, Orders::new())).unwrap();

    let err = writer.write(&order("1", "a").into_value()).unwrap_err();
    assert_eq!(err.rule(), Some(FileValidationRule::MustHaveHeaderRow));
    assert_eq!(writer.total_lines(), 0);

    let err = writer.end_of_file().unwrap_err();
    assert_eq!(err.rule(), Some(FileValidationRule::MustHaveHeaderRow));
}

#[test]
fn rejected_groups_are_not_written() {
    let mut writer = FileWriter::new(Vec::new(), layout(tree(), Orders::new())).unwrap();

    let rejected = writer
        .write(&order("", "nobody").with_line(line("A", 1)).into_value())
        .unwrap();
    assert!(rejected.has_errors());
    assert!(rejected.value.is_none());
    assert_eq!(errors(&rejected), vec!["Order id is required"]);
    assert_eq!(writer.total_lines(), 0);

    let accepted = writer.write(&order("2", "b").into_value()).unwrap();
    assert_eq!(accepted.records[0].line_number, 1);

    writer.end_of_file().unwrap();
    assert_eq!(text(&writer), "O,2,b\n");
}

#[test]
fn cardinality_is_checked_before_writing() {
    let lines = HierarchyDescriptor::collection("L", "Line")
        .mandatory()
        .with_min_count(2);
    let mut writer = FileWriter::new(Vec::new(), layout(tree(), Orders::with_lines(lines))).unwrap();

    let result = writer
        .write(&order("1", "a").with_line(line("A", 1)).into_value())
        .unwrap();
    assert!(result.value.is_none());
    assert_eq!(
        errors(&result),
        vec!["Record `L` must have at least 2 occurrences but 1 were found"]
    );

    let result = writer
        .write(
            &order("1", "a")
                .with_line(line("A", 1))
                .with_line(line("B", 1))
                .into_value(),
        )
        .unwrap();
    assert!(result.value.is_some());

    writer.end_of_file().unwrap();
    assert_eq!(text(&writer), "O,1,a\nL,A,1\nL,B,1\n");
}

#[test]
fn capped_collections() {
    let lines = HierarchyDescriptor::collection("L", "Line").with_max_count(2);
    let mut writer = FileWriter::new(Vec::new(), layout(tree(), Orders::with_lines(lines))).unwrap();

    let result = writer
        .write(
            &order("1", "a")
                .with_line(line("A", 1))
                .with_line(line("B", 1))
                .with_line(line("C", 1))
                .into_value(),
        )
        .unwrap();
    assert_eq!(
        errors(&result),
        vec!["Record `L` allows at most 2 occurrences but 3 were found"]
    );

    writer.end_of_file().unwrap();
    assert!(writer.get_ref().is_empty());
}

#[test]
fn end_of_file_closes_the_writer() {
    let format = format().with_rule(FileValidationRule::MustHaveAtLeastOneContentRow);
    let mut writer = FileWriter::new(Vec::new(), layout(format, Orders::new())).unwrap();

    writer
        .write_header(&Value::Header { batch: "b".into() })
        .unwrap();
    let err = writer.end_of_file().unwrap_err();
    assert_eq!(
        err.rule(),
        Some(FileValidationRule::MustHaveAtLeastOneContentRow)
    );

    assert!(matches!(
        writer.write(&order("1", "a").into_value()),
        Err(FileError::InvalidState(ref msg)) if msg == "attempt made to write past the end of file"
    ));
    assert!(matches!(
        writer.end_of_file(),
        Err(FileError::InvalidState(_))
    ));
}

#[test]
fn observer_sees_every_result() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let mut writer = FileWriter::new(Vec::new(), layout(tree(), Orders::new()))
        .unwrap()
        .with_observer(move |result| {
            sink.lock()
                .unwrap()
                .push((result.status, result.has_errors()))
        });

    writer.write(&order("1", "a").into_value()).unwrap();
    writer.write(&order("", "b").into_value()).unwrap();
    writer.end_of_file().unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (OperationStatus::Content, false),
            (OperationStatus::Content, true),
            (OperationStatus::EndOfFile, false),
        ]
    );
}
