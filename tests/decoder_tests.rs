mod common;

use chrono::{NaiveDate, NaiveDateTime};
use common::PowerLogBuilder;
use voltcraft_parser::block::{ParserState, RecordParser};
use voltcraft_parser::cursor::ReaderSource;
use voltcraft_parser::{
    BlockStatus, DecoderConfig, Error, ErrorPolicy, PowerLogReader, PowerSample, WarningKind,
};

fn datetime(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, 0)
        .unwrap()
}

fn decode_one_block(data: &[u8]) -> (Vec<PowerSample>, Option<BlockStatus>) {
    let mut parser = RecordParser::from_slice(data);
    let samples = parser
        .samples()
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    (samples, parser.status())
}

// ============================================================================
// BYTE ORDER AND FIELD SCALING
// ============================================================================

#[test]
fn test_reference_sample() {
    let data = PowerLogBuilder::new()
        .block(6, 15, 23, 14, 30)
        .raw(&[0x09, 0xC4, 0x03, 0xE8, 0x64])
        .end()
        .build();

    let (samples, status) = decode_one_block(&data);

    assert_eq!(status, Some(BlockStatus::Completed));
    assert_eq!(samples.len(), 1);
    let s = &samples[0];
    assert_eq!(s.index, 0);
    assert_eq!(s.timestamp, datetime(2023, 6, 15, 14, 30));
    assert_eq!(s.voltage, 250.0);
    assert_eq!(s.current, 1.0);
    assert_eq!(s.power_factor, 1.0);
    assert_eq!(s.power, 0.25);
    assert_eq!(s.apparent_power, 0.25);
}

#[test]
fn test_device_capture_is_big_endian() {
    let data = hex::decode("e0c5ea090b0e122b08c601be57ffffffff").unwrap();
    let (samples, status) = decode_one_block(&data);

    assert_eq!(status, Some(BlockStatus::Completed));
    assert_eq!(samples[0].timestamp, datetime(2014, 9, 11, 18, 43));
    assert_eq!(samples[0].voltage, 224.6);
    assert_eq!(samples[0].current, 0.446);
    assert_eq!(samples[0].power_factor, 0.87);
}

#[test]
fn test_derived_power_matches_fields() {
    let raws: [(u16, u16, u8); 6] = [
        (2246, 446, 87),
        (2300, 12_345, 99),
        (1999, 1, 1),
        (2501, 65_535, 100),
        (0, 0, 0),
        (2187, 7_777, 43),
    ];
    let mut builder = PowerLogBuilder::new().block(1, 1, 20, 0, 0);
    for (v, c, pf) in raws {
        builder = builder.sample(v, c, pf);
    }
    let data = builder.end().build();

    let (samples, _) = decode_one_block(&data);
    assert_eq!(samples.len(), raws.len());

    for (s, (v, c, pf)) in samples.iter().zip(raws) {
        assert_eq!(s.voltage, v as f64 / 10.0);
        assert_eq!(s.current, c as f64 / 1000.0);
        assert_eq!(s.power_factor, pf as f64 / 100.0);
        assert_eq!(s.power, s.voltage * s.current * s.power_factor / 1000.0);
        assert_eq!(s.apparent_power, s.voltage * s.current / 1000.0);
    }
}

// ============================================================================
// TIMESTAMPS
// ============================================================================

#[test]
fn test_timestamps_advance_one_minute() {
    let data = PowerLogBuilder::new()
        .block(3, 10, 22, 8, 0)
        .samples(90, 2300, 500, 95)
        .end()
        .build();

    let (samples, _) = decode_one_block(&data);
    let base = datetime(2022, 3, 10, 8, 0);

    assert_eq!(samples[0].timestamp, base);
    for (i, s) in samples.iter().enumerate() {
        assert_eq!(s.index as usize, i);
        assert_eq!(s.timestamp, base + chrono::Duration::minutes(i as i64));
    }
    assert_eq!(samples[89].timestamp, datetime(2022, 3, 10, 9, 29));
}

#[test]
fn test_timestamps_roll_over_midnight_and_year() {
    let data = PowerLogBuilder::new()
        .block(12, 31, 23, 23, 59)
        .samples(2, 2300, 500, 95)
        .end()
        .build();

    let (samples, _) = decode_one_block(&data);
    assert_eq!(samples[0].timestamp, datetime(2023, 12, 31, 23, 59));
    assert_eq!(samples[1].timestamp, datetime(2024, 1, 1, 0, 0));
}

// ============================================================================
// BLOCK TERMINATION
// ============================================================================

#[test]
fn test_empty_block_is_completed() {
    let data = PowerLogBuilder::new().block(6, 15, 23, 14, 30).end().build();

    let mut parser = RecordParser::from_slice(&data);
    let mut stream = parser.samples().unwrap();
    assert_eq!(stream.start_time().year, 2023);
    assert!(stream.next().is_none());
    assert_eq!(stream.status(), Some(BlockStatus::Completed));
    assert_eq!(stream.sample_count(), Some(0));
}

#[test]
fn test_missing_end_marker_keeps_samples() {
    let data = PowerLogBuilder::new()
        .block(6, 15, 23, 14, 30)
        .samples(4, 2300, 500, 95)
        .build();

    let (samples, status) = decode_one_block(&data);
    assert_eq!(samples.len(), 4);
    assert_eq!(status, Some(BlockStatus::Truncated { trailing_bytes: 0 }));
}

#[test]
fn test_partial_trailing_record() {
    let data = PowerLogBuilder::new()
        .block(6, 15, 23, 14, 30)
        .samples(2, 2300, 500, 95)
        .raw(&[0x08, 0xFC, 0x01])
        .build();

    let (samples, status) = decode_one_block(&data);
    assert_eq!(samples.len(), 2);
    assert_eq!(status, Some(BlockStatus::Truncated { trailing_bytes: 3 }));
}

#[test]
fn test_four_trailing_bytes_are_not_a_record() {
    let data = PowerLogBuilder::new()
        .block(6, 15, 23, 14, 30)
        .sample(2300, 500, 95)
        .raw(&[0x08, 0xFC, 0x01, 0xF4])
        .build();

    let (samples, status) = decode_one_block(&data);
    assert_eq!(samples.len(), 1);
    assert_eq!(status, Some(BlockStatus::Truncated { trailing_bytes: 4 }));
}

#[test]
fn test_count_unknown_until_terminated() {
    let data = PowerLogBuilder::new()
        .block(6, 15, 23, 14, 30)
        .samples(3, 2300, 500, 95)
        .end()
        .build();

    let mut parser = RecordParser::from_slice(&data);
    let mut stream = parser.samples().unwrap();
    stream.next().unwrap().unwrap();
    assert_eq!(stream.sample_count(), None);
    assert_eq!(stream.status(), None);

    assert_eq!(stream.by_ref().count(), 2);
    assert_eq!(stream.sample_count(), Some(3));
}

// ============================================================================
// FRAMING ERRORS
// ============================================================================

#[test]
fn test_wrong_start_marker() {
    let data = PowerLogBuilder::new()
        .raw(&[0xE0, 0xC5, 0xEB, 6, 15, 23, 14, 30])
        .sample(2300, 500, 95)
        .end()
        .build();

    let mut parser = RecordParser::from_slice(&data);
    assert!(matches!(
        parser.samples().err(),
        Some(Error::Framing { offset: 0, .. })
    ));
    assert_eq!(parser.state(), ParserState::Failed);
    assert!(parser.next_sample().is_none());

    let result = PowerLogReader::from_bytes(data).read_all();
    assert!(matches!(result, Err(Error::Framing { .. })));
}

#[test]
fn test_invalid_header_date_rejected() {
    let data = PowerLogBuilder::new()
        .block(2, 30, 23, 14, 30)
        .sample(2300, 500, 95)
        .end()
        .build();

    let result = PowerLogReader::from_bytes(data).read_all();
    match result {
        Err(Error::InvalidTimestamp { header, offset }) => {
            assert_eq!(offset, 0);
            assert_eq!((header.month, header.day), (2, 30));
        }
        other => panic!("expected invalid timestamp, got {:?}", other.map(|l| l.blocks.len())),
    }
}

// ============================================================================
// MULTI-BLOCK LOGS
// ============================================================================

#[test]
fn test_concatenated_blocks() {
    let data = PowerLogBuilder::new()
        .block(6, 15, 23, 14, 30)
        .samples(2, 2300, 500, 95)
        .end()
        .block(6, 16, 23, 8, 0)
        .samples(3, 2310, 600, 90)
        .end()
        .build();

    let log = PowerLogReader::from_bytes(data).read_all().unwrap();
    assert_eq!(log.blocks.len(), 2);
    assert_eq!(log.blocks[0].samples.len(), 2);
    assert_eq!(log.blocks[1].samples.len(), 3);
    assert_eq!(log.blocks[1].offset, 8 + 10 + 4);
    assert_eq!(log.blocks[1].samples[0].index, 0);
    assert_eq!(log.blocks[1].samples[0].timestamp, datetime(2023, 6, 16, 8, 0));
    assert!(log.is_complete());
    assert_eq!(log.sample_count(), 5);
}

#[test]
fn test_start_marker_interrupts_block() {
    let data = PowerLogBuilder::new()
        .block(6, 15, 23, 14, 30)
        .samples(2, 2300, 500, 95)
        .block(6, 15, 23, 18, 0)
        .samples(1, 2300, 500, 95)
        .end()
        .build();

    let log = PowerLogReader::from_bytes(data).read_all().unwrap();
    assert_eq!(log.blocks.len(), 2);
    assert_eq!(log.blocks[0].status, BlockStatus::Interrupted);
    assert_eq!(log.blocks[0].samples.len(), 2);
    assert_eq!(log.blocks[1].status, BlockStatus::Completed);
    assert_eq!(log.blocks[1].samples[0].timestamp, datetime(2023, 6, 15, 18, 0));
}

#[test]
fn test_split_disabled_reads_marker_as_sample() {
    let data = PowerLogBuilder::new()
        .block(6, 15, 23, 14, 30)
        .raw(&[0xE0, 0xC5, 0xEA, 0x09, 0xC4])
        .end()
        .build();

    let config = DecoderConfig::builder().split_on_start_marker(false).build();
    let log = PowerLogReader::from_bytes(data)
        .with_config(config)
        .read_all()
        .unwrap();

    assert_eq!(log.blocks.len(), 1);
    assert_eq!(log.blocks[0].samples[0].voltage, 5754.1);
    assert_eq!(log.blocks[0].warnings.len(), 1);
    assert!(matches!(
        log.blocks[0].warnings[0].kind,
        WarningKind::VoltageOutOfRange { .. }
    ));
}

#[test]
fn test_abandoned_block_is_skipped() {
    let data = PowerLogBuilder::new()
        .block(6, 15, 23, 14, 30)
        .samples(5, 2300, 500, 95)
        .end()
        .block(6, 16, 23, 0, 0)
        .sample(2310, 600, 90)
        .end()
        .build();

    let mut parser = RecordParser::from_slice(&data);
    {
        let mut first = parser.next_block().unwrap().unwrap();
        first.next().unwrap().unwrap();
    }
    let mut second = parser.next_block().unwrap().unwrap();
    assert_eq!(second.start_time().day, 16);
    assert_eq!(second.next().unwrap().unwrap().voltage, 231.0);
    assert!(second.next().is_none());
    drop(second);
    assert!(parser.next_block().is_none());
}

#[test]
fn test_resynchronize_past_garbage() {
    let data = PowerLogBuilder::new()
        .raw(&[0x00, 0x11, 0xE0, 0x22])
        .block(6, 15, 23, 14, 30)
        .sample(2300, 500, 95)
        .end()
        .raw(&[0xAB; 7])
        .block(6, 16, 23, 0, 0)
        .sample(2310, 600, 90)
        .end()
        .build();

    assert!(PowerLogReader::from_bytes(data.clone()).read_all().is_err());

    let config = DecoderConfig::builder()
        .error_policy(ErrorPolicy::Resynchronize)
        .build();
    let log = PowerLogReader::from_bytes(data)
        .with_config(config)
        .read_all()
        .unwrap();

    assert_eq!(log.blocks.len(), 2);
    assert_eq!(log.blocks[0].offset, 4);
    assert_eq!(log.skipped_bytes, 11);
    assert_eq!(log.sample_count(), 2);
}

#[test]
fn test_resynchronize_skips_bad_header() {
    let data = PowerLogBuilder::new()
        .block(13, 1, 23, 0, 0)
        .sample(2300, 500, 95)
        .end()
        .block(6, 16, 23, 0, 0)
        .sample(2310, 600, 90)
        .end()
        .build();

    let config = DecoderConfig::builder()
        .error_policy(ErrorPolicy::Resynchronize)
        .build();
    let log = PowerLogReader::from_bytes(data)
        .with_config(config)
        .read_all()
        .unwrap();

    assert_eq!(log.blocks.len(), 1);
    assert_eq!(log.blocks[0].start_time.month, 6);
    assert_eq!(log.skipped_bytes, 9);
}

// ============================================================================
// SEMANTIC WARNINGS
// ============================================================================

#[test]
fn test_power_factor_warning() {
    let data = PowerLogBuilder::new()
        .block(6, 15, 23, 14, 30)
        .sample(2300, 500, 95)
        .sample(2300, 500, 120)
        .end()
        .build();

    let log = PowerLogReader::from_bytes(data).read_all().unwrap();
    let block = &log.blocks[0];
    assert_eq!(block.samples.len(), 2);
    assert_eq!(block.warnings.len(), 1);
    assert_eq!(block.warnings[0].index, 1);
    assert_eq!(block.warnings[0].offset, 13);
    assert!(matches!(
        block.warnings[0].kind,
        WarningKind::PowerFactorOutOfRange { power_factor } if power_factor == 1.2
    ));
}

#[test]
fn test_voltage_range_is_configurable() {
    let data = PowerLogBuilder::new()
        .block(6, 15, 23, 14, 30)
        .sample(1100, 500, 95)
        .end()
        .build();

    let default = PowerLogReader::from_bytes(data.clone()).read_all().unwrap();
    assert_eq!(default.blocks[0].warnings.len(), 1);

    let config = DecoderConfig::builder().voltage_range(100.0..=130.0).build();
    let us_mains = PowerLogReader::from_bytes(data)
        .with_config(config)
        .read_all()
        .unwrap();
    assert!(us_mains.blocks[0].warnings.is_empty());
}

// ============================================================================
// STREAMING SOURCE
// ============================================================================

#[test]
fn test_reader_source_decodes_lazily() {
    let data = PowerLogBuilder::new()
        .block(6, 15, 23, 14, 30)
        .samples(1000, 2300, 500, 95)
        .end()
        .block(6, 16, 23, 0, 0)
        .samples(10, 2310, 600, 90)
        .build();

    let mut parser = RecordParser::new(ReaderSource::new(std::io::Cursor::new(data.clone())));
    let mut counts = Vec::new();
    let mut statuses = Vec::new();
    while let Some(block) = parser.next_block() {
        let mut block = block.unwrap();
        counts.push(block.by_ref().map(|s| s.unwrap()).count());
        statuses.push(block.status().unwrap());
    }

    assert_eq!(counts, vec![1000, 10]);
    assert_eq!(
        statuses,
        vec![
            BlockStatus::Completed,
            BlockStatus::Truncated { trailing_bytes: 0 }
        ]
    );

    let in_memory = PowerLogReader::from_bytes(data).read_all().unwrap();
    assert_eq!(in_memory.sample_count(), 1010);
}

#[test]
fn test_read_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("A0000001");
    let data = PowerLogBuilder::new()
        .block(6, 15, 23, 14, 30)
        .samples(3, 2300, 500, 95)
        .end()
        .build();
    std::fs::write(&path, &data).unwrap();

    let reader = PowerLogReader::from_file(&path).unwrap();
    assert!(reader.is_valid());
    assert_eq!(reader.len(), data.len());
    assert_eq!(reader.read_all().unwrap().sample_count(), 3);

    let empty = dir.path().join("A0000002");
    std::fs::write(&empty, b"").unwrap();
    let reader = PowerLogReader::from_file(&empty).unwrap();
    assert!(reader.is_empty());
    assert!(reader.read_all().unwrap().blocks.is_empty());
}

// ============================================================================
// DATA AFTER A BLOCK
// ============================================================================

#[test]
fn test_end_marker_padding_keeps_blocks() {
    let data = PowerLogBuilder::new()
        .block(6, 15, 23, 14, 30)
        .samples(3, 2300, 500, 95)
        .end()
        .raw(&[0xFF; 4])
        .build();

    let log = PowerLogReader::from_bytes(data).read_all().unwrap();

    assert_eq!(log.blocks.len(), 1);
    assert_eq!(log.blocks[0].status, BlockStatus::Completed);
    assert_eq!(log.sample_count(), 3);
    match &log.stopped_by {
        Some(Error::Framing { offset, found }) => {
            assert_eq!(*offset, 27);
            assert_eq!(found, &vec![0xFF, 0xFF, 0xFF]);
        }
        other => panic!("expected framing error, got {:?}", other),
    }
    assert!(!log.is_complete());
}

#[test]
fn test_bad_second_header_keeps_first_block() {
    let data = PowerLogBuilder::new()
        .block(6, 15, 23, 14, 30)
        .samples(3, 2300, 500, 95)
        .end()
        .block(13, 1, 23, 0, 0)
        .sample(2310, 600, 90)
        .end()
        .build();

    let log = PowerLogReader::from_bytes(data).read_all().unwrap();

    assert_eq!(log.blocks.len(), 1);
    assert_eq!(log.sample_count(), 3);
    assert!(matches!(
        log.stopped_by,
        Some(Error::InvalidTimestamp { offset: 27, .. })
    ));
}

#[test]
fn test_short_tail_after_end_marker() {
    let data = PowerLogBuilder::new()
        .block(6, 15, 23, 14, 30)
        .sample(2300, 500, 95)
        .end()
        .raw(&[0xE0, 0xC5])
        .build();

    let log = PowerLogReader::from_bytes(data).read_all().unwrap();
    assert_eq!(log.sample_count(), 1);
    assert!(matches!(
        log.stopped_by,
        Some(Error::Framing { offset: 17, .. })
    ));
}

#[test]
fn test_clean_log_has_no_stop_reason() {
    let data = PowerLogBuilder::new()
        .block(6, 15, 23, 14, 30)
        .sample(2300, 500, 95)
        .end()
        .build();

    let log = PowerLogReader::from_bytes(data).read_all().unwrap();
    assert!(log.stopped_by.is_none());
    assert!(log.is_complete());
}

// ============================================================================
// SOURCE FAILURES AND LONG BLOCKS
// ============================================================================

/// Serves its bytes, then fails every read.
struct UnpluggedReader {
    data: Vec<u8>,
    pos: usize,
}

impl std::io::Read for UnpluggedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.pos == self.data.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device unplugged",
            ));
        }
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[test]
fn test_io_failure_mid_record() {
    let data = PowerLogBuilder::new()
        .block(6, 15, 23, 14, 30)
        .sample(2300, 500, 95)
        .raw(&[0x08, 0xFC])
        .build();

    let mut parser = RecordParser::new(ReaderSource::new(UnpluggedReader { data, pos: 0 }));
    let mut stream = parser.samples().unwrap();

    assert_eq!(stream.next().unwrap().unwrap().voltage, 230.0);
    assert!(matches!(stream.next(), Some(Err(Error::Io(_)))));
    assert!(stream.next().is_none());
    drop(stream);
    assert_eq!(parser.state(), ParserState::Failed);
}

#[test]
fn test_io_failure_is_returned_by_reader() {
    let data = PowerLogBuilder::new()
        .block(6, 15, 23, 14, 30)
        .samples(2, 2300, 500, 95)
        .build();

    let config = DecoderConfig::builder()
        .error_policy(ErrorPolicy::Resynchronize)
        .build();
    let result = voltcraft_parser::reader::read_from(UnpluggedReader { data, pos: 0 }, config);
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_implausible_block_keeps_bounded_warnings() {
    let data = PowerLogBuilder::new()
        .block(6, 15, 23, 14, 30)
        .samples(10_000, 1200, 500, 95)
        .end()
        .build();

    let log = PowerLogReader::from_bytes(data).read_all().unwrap();
    let block = &log.blocks[0];

    assert_eq!(block.samples.len(), 10_000);
    assert_eq!(block.warning_count, 10_000);
    assert_eq!(block.warnings.len(), DecoderConfig::default().max_warnings);
    assert_eq!(block.warnings[0].index, 0);
}
