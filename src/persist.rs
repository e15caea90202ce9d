//! `keycode,delay` text files.
//!
//! One record per line, both fields base-10 integers, every line
//! newline-terminated, no header.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::event::{Action, ActionLog};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    pub written: usize,
    pub failed: usize,
}

pub fn format_record(action: &Action) -> String {
    format!("{},{}\n", action.keycode, action.delay_ms)
}

/// Writes every action to `writer` in log order, flushing after each line so
/// a failure is attributed to the line that caused it. A failed line is
/// logged and skipped; the rest are still attempted.
pub fn save<W: Write>(log: &ActionLog, writer: &mut W) -> SaveReport {
    let mut report = SaveReport::default();
    for action in log {
        let line = format_record(action);
        let result = writer.write_all(line.as_bytes()).and_then(|()| writer.flush());
        match result {
            Ok(()) => report.written += 1,
            Err(e) => {
                report.failed += 1;
                log::error!("Error writing to file: {}", e);
            }
        }
    }
    report
}

/// Creates (or truncates) `path` and saves `log` into it. Only failing to
/// create the file is an error; see [`save`] for per-line failures.
/// Unbuffered, so [`save`] sees each line's I/O error.
pub fn save_to_path(log: &ActionLog, path: &Path) -> Result<SaveReport> {
    let mut file = File::create(path)?;
    let report = save(log, &mut file);
    if report.failed > 0 {
        log::warn!(
            "Saved {} actions to {:?}, {} failed",
            report.written,
            path,
            report.failed
        );
    } else {
        log::info!("Saved {} actions to {:?}", report.written, path);
    }
    Ok(report)
}

pub fn parse_record(line: &str, line_no: usize) -> Result<Action> {
    let malformed = |reason: String| Error::MalformedRecord {
        line: line_no,
        reason,
    };
    let (keycode, delay) = line
        .trim()
        .split_once(',')
        .ok_or_else(|| malformed(format!("expected `keycode,delay`, got {:?}", line)))?;
    let keycode = keycode
        .trim()
        .parse()
        .map_err(|e| malformed(format!("bad keycode {:?}: {}", keycode, e)))?;
    let delay_ms = delay
        .trim()
        .parse()
        .map_err(|e| malformed(format!("bad delay {:?}: {}", delay, e)))?;
    Ok(Action::new(keycode, delay_ms))
}

/// Reads a log back. Blank lines are skipped silently; malformed ones,
/// including lines that are not UTF-8, with a warning. Only an I/O error
/// ends the load early, keeping what was parsed so far.
pub fn load<R: BufRead>(reader: R) -> ActionLog {
    let mut log = ActionLog::new();
    for (index, bytes) in reader.split(b'\n').enumerate() {
        let line_no = index + 1;
        let bytes = match bytes {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("Error reading line {}: {}", line_no, e);
                break;
            }
        };
        let parsed = String::from_utf8(bytes)
            .map_err(|e| Error::MalformedRecord {
                line: line_no,
                reason: format!("not UTF-8: {}", e),
            })
            .and_then(|line| {
                if line.trim().is_empty() {
                    Ok(None)
                } else {
                    parse_record(&line, line_no).map(Some)
                }
            });
        match parsed {
            Ok(Some(action)) => log.push(action),
            Ok(None) => {}
            Err(e) => log::warn!("Skipping record: {}", e),
        }
    }
    log
}

pub fn load_from_path(path: &Path) -> Result<ActionLog> {
    let file = File::open(path)?;
    let log = load(BufReader::new(file));
    log::info!("Loaded {} actions from {:?}", log.len(), path);
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    fn sample() -> ActionLog {
        vec![Action::new(30, 0), Action::new(48, 150)].into()
    }

    /// Fails every write whose buffer starts with `fail_prefix`.
    struct FlakyWriter {
        out: Vec<u8>,
        fail_prefix: &'static [u8],
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if buf.starts_with(self.fail_prefix) {
                return Err(io::Error::other("disk full"));
            }
            self.out.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn save_writes_one_line_per_action() {
        let mut out = Vec::new();
        let report = save(&sample(), &mut out);
        assert_eq!(String::from_utf8(out).unwrap(), "30,0\n48,150\n");
        assert_eq!(report, SaveReport { written: 2, failed: 0 });
    }

    #[test]
    fn empty_log_writes_empty_file() {
        let mut out = Vec::new();
        save(&ActionLog::new(), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn failed_line_does_not_abort_save() {
        let log: ActionLog =
            vec![Action::new(30, 0), Action::new(48, 150), Action::new(46, 5)].into();
        let mut writer = FlakyWriter {
            out: Vec::new(),
            fail_prefix: b"48,",
        };
        let report = save(&log, &mut writer);
        assert_eq!(report, SaveReport { written: 2, failed: 1 });
        assert_eq!(String::from_utf8(writer.out).unwrap(), "30,0\n46,5\n");
    }

    /// Accepts every write but never manages to flush it.
    struct StuckWriter;

    impl Write for StuckWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("device full"))
        }
    }

    #[test]
    fn flush_failure_counts_as_failed_line() {
        let report = save(&sample(), &mut StuckWriter);
        assert_eq!(report, SaveReport { written: 0, failed: 2 });
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn save_to_full_device_reports_failures() {
        let report = save_to_path(&sample(), Path::new("/dev/full")).unwrap();
        assert_eq!(report.written, 0);
        assert_eq!(report.failed, 2);
    }

    #[test]
    fn load_skips_non_utf8_line_and_keeps_going() {
        let log = load(Cursor::new(&b"30,0\n\xff\xfe\n48,150\n46,20\n"[..]));
        assert_eq!(
            log.as_slice(),
            &[Action::new(30, 0), Action::new(48, 150), Action::new(46, 20)]
        );
    }

    #[test]
    fn load_reads_back_saved_values() {
        let log: ActionLog = vec![
            Action::new(0x1E, 0),
            Action::new(0xE048, u64::MAX),
            Action::new(0x1_0000 + 175, 42),
        ]
        .into();
        let mut out = Vec::new();
        save(&log, &mut out);
        assert_eq!(load(Cursor::new(out)), log);
    }

    #[test]
    fn load_skips_malformed_and_blank_lines() {
        let text = "30,0\n\nnot a record\n48,-5\n48,150\n46\n 46 , 20 \n";
        let log = load(Cursor::new(text));
        assert_eq!(
            log.as_slice(),
            &[Action::new(30, 0), Action::new(48, 150), Action::new(46, 20)]
        );
    }

    #[test]
    fn load_accepts_crlf_and_missing_final_newline() {
        let log = load(Cursor::new("30,0\r\n48,150"));
        assert_eq!(log.as_slice(), &[Action::new(30, 0), Action::new(48, 150)]);
    }

    #[test]
    fn parse_record_reports_line_number() {
        match parse_record("x,1", 7) {
            Err(Error::MalformedRecord { line, .. }) => assert_eq!(line, 7),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn save_and_load_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actions.txt");

        let report = save_to_path(&sample(), &path).unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "30,0\n48,150\n");
        assert_eq!(load_from_path(&path).unwrap(), sample());
    }

    #[test]
    fn save_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("actions.txt");
        assert!(matches!(save_to_path(&sample(), &path), Err(Error::Io(_))));
    }
}
