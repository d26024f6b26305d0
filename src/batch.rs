//! Batch formatting of many images.
//!
//! Every input is an independent unit of work: decode, compose, encode. The
//! units share nothing but the (stateless) backend and a copy of the
//! options, so they run on rayon's pool with no locking.
//!
//! ## Result association
//!
//! Outcomes come back in input order and carry the input's `index`, never
//! matched up by file name or content. Two identical files submitted
//! together yield two distinct outcomes, and a slow image cannot be
//! dropped or attributed to the wrong input.
//!
//! ## Partial failure
//!
//! A failed item (unreadable file, corrupt bytes, encoder error) is reported
//! in its own [`BatchOutcome`]. Other items are unaffected.
//!
//! ## Progress
//!
//! Callers may pass an `mpsc::Sender<ProcessEvent>`; one event is sent per
//! finished item, in completion order. The sender is dropped when the batch
//! returns so a printer thread draining the channel terminates.

use crate::imaging::{
    EncodingLimits, FormatError, ImageBackend, ProcessingOptions, RustBackend,
    normalize_with_backend, supported_input_extensions,
};
use crate::naming;
use crate::types::ProcessedResult;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use tracing::warn;
use walkdir::WalkDir;

/// One in-memory input.
#[derive(Debug, Clone)]
pub struct BatchInput {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Result for the input at `index`.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Position of the input in the submitted list.
    pub index: usize,
    pub file_name: String,
    /// Source path, for file-based batches.
    pub source: Option<PathBuf>,
    pub result: Result<ProcessedResult, FormatError>,
}

/// Progress notification, sent as each item finishes.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    Formatted {
        index: usize,
        file_name: String,
        side: u32,
        processed_size: u64,
        quality: f32,
        was_compressed: bool,
    },
    Failed {
        index: usize,
        file_name: String,
        error: String,
    },
}

/// Counts over a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[BatchOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count();
        Self {
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

fn event_for(index: usize, file_name: &str, result: &Result<ProcessedResult, FormatError>) -> ProcessEvent {
    match result {
        Ok(r) => ProcessEvent::Formatted {
            index,
            file_name: file_name.to_string(),
            side: r.width,
            processed_size: r.processed_size,
            quality: r.quality,
            was_compressed: r.was_compressed,
        },
        Err(e) => ProcessEvent::Failed {
            index,
            file_name: file_name.to_string(),
            error: e.to_string(),
        },
    }
}

fn notify(events: Option<&Sender<ProcessEvent>>, outcome: &BatchOutcome) {
    if let Some(tx) = events {
        // A closed receiver only means nobody is listening.
        tx.send(event_for(outcome.index, &outcome.file_name, &outcome.result))
            .ok();
    }
}

/// Format in-memory inputs in parallel with the [`RustBackend`].
pub fn process_batch(
    inputs: &[BatchInput],
    options: &ProcessingOptions,
    limits: &EncodingLimits,
    events: Option<Sender<ProcessEvent>>,
) -> Vec<BatchOutcome> {
    process_batch_with_backend(&RustBackend::new(), inputs, options, limits, events)
}

/// Format in-memory inputs using a specific backend (allows testing with mock).
pub fn process_batch_with_backend(
    backend: &impl ImageBackend,
    inputs: &[BatchInput],
    options: &ProcessingOptions,
    limits: &EncodingLimits,
    events: Option<Sender<ProcessEvent>>,
) -> Vec<BatchOutcome> {
    let events = events.as_ref();
    inputs
        .par_iter()
        .enumerate()
        .map(|(index, input)| {
            let options = options.clone();
            let outcome = BatchOutcome {
                index,
                file_name: input.file_name.clone(),
                source: None,
                result: normalize_with_backend(
                    backend,
                    &input.bytes,
                    &input.file_name,
                    &options,
                    limits,
                ),
            };
            notify(events, &outcome);
            outcome
        })
        .collect()
}

/// Format files in parallel with the [`RustBackend`].
pub fn process_files(
    paths: &[PathBuf],
    options: &ProcessingOptions,
    limits: &EncodingLimits,
    events: Option<Sender<ProcessEvent>>,
) -> Vec<BatchOutcome> {
    process_files_with_backend(&RustBackend::new(), paths, options, limits, events)
}

/// Format files using a specific backend.
///
/// Each file is read inside its own unit of work; the handle is closed
/// before decoding starts. A read failure becomes that item's
/// [`FormatError::Io`].
pub fn process_files_with_backend(
    backend: &impl ImageBackend,
    paths: &[PathBuf],
    options: &ProcessingOptions,
    limits: &EncodingLimits,
    events: Option<Sender<ProcessEvent>>,
) -> Vec<BatchOutcome> {
    let events = events.as_ref();
    paths
        .par_iter()
        .enumerate()
        .map(|(index, path)| {
            let options = options.clone();
            let file_name = display_name(path);
            let result = std::fs::read(path)
                .map_err(FormatError::from)
                .and_then(|bytes| {
                    normalize_with_backend(backend, &bytes, &file_name, &options, limits)
                });
            let outcome = BatchOutcome {
                index,
                file_name,
                source: Some(path.clone()),
                result,
            };
            notify(events, &outcome);
            outcome
        })
        .collect()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

/// Expand CLI arguments into the list of files to format.
///
/// Files are taken as given, whatever their extension (the decoder decides).
/// Directories are walked recursively in name order and contribute only
/// files with a supported image extension. Order of arguments is kept.
pub fn collect_inputs(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        let walker = WalkDir::new(path).sort_by_file_name();
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() && has_supported_extension(entry.path()) => {
                    files.push(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => warn!("skipping unreadable entry under {}: {e}", path.display()),
            }
        }
    }
    files
}

/// Write every successful result into `out_dir`.
///
/// Names come from [`naming::output_file_name`]; when two inputs map to
/// the same name the later ones get `-2`, `-3`, ... appended. Returns
/// `(index, path)` for each file written.
///
/// A failed write turns that outcome into a [`FormatError::Io`] and the
/// remaining items are still written. Only failing to create `out_dir`
/// aborts.
pub fn write_outputs(
    outcomes: &mut [BatchOutcome],
    out_dir: &Path,
    prefix: &str,
) -> std::io::Result<Vec<(usize, PathBuf)>> {
    std::fs::create_dir_all(out_dir)?;
    let mut used = HashSet::new();
    let mut written = Vec::new();

    for outcome in outcomes.iter_mut() {
        let Ok(result) = &outcome.result else {
            continue;
        };
        let base = naming::output_file_name(prefix, &result.file_name, result.format);
        let mut name = base.clone();
        let mut n = 2;
        while !used.insert(name.clone()) {
            name = naming::with_counter(&base, n);
            n += 1;
        }
        let path = out_dir.join(&name);
        match std::fs::write(&path, &result.bytes) {
            Ok(()) => written.push((outcome.index, path)),
            Err(e) => {
                warn!("could not write {}: {e}", path.display());
                outcome.result = Err(FormatError::Io(e));
            }
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::types::OutputFormat;
    use std::fs;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn input(name: &str, bytes: &[u8]) -> BatchInput {
        BatchInput {
            file_name: name.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn corrupt_item_does_not_affect_others() {
        let backend = MockBackend::new();
        let inputs = vec![
            input("a.jpg", b"aaa"),
            input("broken.jpg", b""),
            input("c.jpg", b"ccc"),
        ];

        let outcomes = process_batch_with_backend(
            &backend,
            &inputs,
            &ProcessingOptions::default(),
            &EncodingLimits::default(),
            None,
        );

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(outcomes[1].result, Err(FormatError::Decode(_))));
        assert!(outcomes[2].result.is_ok());
        assert_eq!(
            BatchSummary::from_outcomes(&outcomes),
            BatchSummary {
                succeeded: 2,
                failed: 1
            }
        );
    }

    #[test]
    fn oversized_item_fails_alone() {
        let backend = MockBackend::with_dimensions(crate::imaging::Dimensions {
            width: 600,
            height: 1,
        });
        let options = ProcessingOptions {
            min_size: 320,
            ..Default::default()
        };
        let limits = EncodingLimits {
            max_canvas_side: 2048,
            ..Default::default()
        };
        let outcomes = process_batch_with_backend(
            &backend,
            &[input("strip.png", b"s"), input("empty.png", b"")],
            &options,
            &limits,
            None,
        );

        assert!(matches!(outcomes[0].result, Err(FormatError::TooLarge(_))));
        assert!(matches!(outcomes[1].result, Err(FormatError::Decode(_))));
    }

    #[test]
    fn outcomes_keep_input_order_and_identity() {
        let backend = MockBackend::new();
        // Identical content and names must still produce distinct outcomes
        let inputs: Vec<BatchInput> = (0..16).map(|_| input("same.jpg", b"xyz")).collect();

        let outcomes = process_batch_with_backend(
            &backend,
            &inputs,
            &ProcessingOptions::default(),
            &EncodingLimits::default(),
            None,
        );

        let indices: Vec<usize> = outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, (0..16).collect::<Vec<_>>());
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
    }

    #[test]
    fn invalid_options_fail_every_item_individually() {
        let backend = MockBackend::new();
        let options = ProcessingOptions {
            min_size: 5000,
            ..Default::default()
        };
        let outcomes = process_batch_with_backend(
            &backend,
            &[input("a.jpg", b"a"), input("b.jpg", b"b")],
            &options,
            &EncodingLimits::default(),
            None,
        );
        assert!(
            outcomes
                .iter()
                .all(|o| matches!(o.result, Err(FormatError::InvalidOptions(_))))
        );
    }

    #[test]
    fn events_are_sent_per_item() {
        let backend = MockBackend::new();
        let (tx, rx) = mpsc::channel();

        process_batch_with_backend(
            &backend,
            &[input("a.jpg", b"a"), input("bad.jpg", b"")],
            &ProcessingOptions::default(),
            &EncodingLimits::default(),
            Some(tx),
        );

        let mut events: Vec<ProcessEvent> = rx.iter().collect();
        events.sort_by_key(|e| match e {
            ProcessEvent::Formatted { index, .. } | ProcessEvent::Failed { index, .. } => *index,
        });
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            ProcessEvent::Formatted { file_name, side: 1080, .. } if file_name == "a.jpg"
        ));
        assert!(matches!(
            &events[1],
            ProcessEvent::Failed { file_name, .. } if file_name == "bad.jpg"
        ));
    }

    #[test]
    fn missing_file_is_an_io_error_for_that_item() {
        let tmp = TempDir::new().unwrap();
        let present = tmp.path().join("present.jpg");
        fs::write(&present, b"data").unwrap();
        let missing = tmp.path().join("missing.jpg");

        let outcomes = process_files_with_backend(
            &MockBackend::new(),
            &[missing, present.clone()],
            &ProcessingOptions::default(),
            &EncodingLimits::default(),
            None,
        );

        assert!(matches!(outcomes[0].result, Err(FormatError::Io(_))));
        assert_eq!(outcomes[0].file_name, "missing.jpg");
        assert!(outcomes[1].result.is_ok());
        assert_eq!(outcomes[1].source.as_deref(), Some(present.as_path()));
    }

    #[test]
    fn collect_walks_directories_for_images() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("photos");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("b.jpg"), b"").unwrap();
        fs::write(dir.join("a.PNG"), b"").unwrap();
        fs::write(dir.join("notes.txt"), b"").unwrap();
        fs::write(dir.join("nested/c.webp"), b"").unwrap();
        let explicit = tmp.path().join("explicit.dat");
        fs::write(&explicit, b"").unwrap();

        let files = collect_inputs(&[explicit.clone(), dir.clone()]);
        let names: Vec<String> = files.iter().map(|p| display_name(p)).collect();
        assert_eq!(names, vec!["explicit.dat", "a.PNG", "b.jpg", "c.webp"]);
    }

    #[test]
    fn write_outputs_dedupes_names() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let mut outcomes = process_batch_with_backend(
            &backend,
            &[
                input("dup.jpg", b"1"),
                input("dup.jpg", b"2"),
                input("bad.jpg", b""),
            ],
            &ProcessingOptions::default(),
            &EncodingLimits::default(),
            None,
        );

        let written = write_outputs(&mut outcomes, tmp.path(), naming::DEFAULT_PREFIX).unwrap();
        let names: Vec<String> = written.iter().map(|(_, p)| display_name(p)).collect();
        assert_eq!(names, vec!["instagram-dup.png", "instagram-dup-2.png"]);
        assert_eq!(written[1].0, 1);
        assert!(tmp.path().join("instagram-dup-2.png").exists());
        assert_eq!(
            outcomes[0].result.as_ref().unwrap().format,
            OutputFormat::Png
        );
    }

    #[test]
    fn failed_write_does_not_stop_later_items() {
        let tmp = TempDir::new().unwrap();
        // A directory squatting on the output name makes that write fail
        fs::create_dir(tmp.path().join("instagram-b.png")).unwrap();
        let mut outcomes = process_batch_with_backend(
            &MockBackend::new(),
            &[input("a.jpg", b"1"), input("b.jpg", b"2"), input("c.jpg", b"3")],
            &ProcessingOptions::default(),
            &EncodingLimits::default(),
            None,
        );

        let written = write_outputs(&mut outcomes, tmp.path(), naming::DEFAULT_PREFIX).unwrap();

        let indices: Vec<usize> = written.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 2]);
        assert!(tmp.path().join("instagram-c.png").is_file());
        assert!(matches!(outcomes[1].result, Err(FormatError::Io(_))));
        assert_eq!(
            BatchSummary::from_outcomes(&outcomes),
            BatchSummary {
                succeeded: 2,
                failed: 1
            }
        );
    }
}
