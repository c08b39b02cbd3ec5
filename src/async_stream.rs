//! Async streaming drivers
//!
//! Adapts `futures` streams of byte or text chunks onto [`StreamParser`].
//! The only suspension points are awaits on the source; dropping the returned
//! stream cancels the parse.
//!
//! # Examples
//!
//! ```
//! use futures_util::{stream, StreamExt};
//! use streamcsv::{parse_byte_stream, StreamEvent, StreamOptions};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let chunks = stream::iter(vec![Ok::<_, std::io::Error>(b"a,b\n1,".to_vec()), Ok(b"2\n".to_vec())]);
//! let events: Vec<_> = parse_byte_stream(chunks, StreamOptions::default()).collect().await;
//!
//! assert_eq!(events.len(), 3);
//! assert!(matches!(events[2], Ok(StreamEvent::Complete { total_rows: 2, .. })));
//! # });
//! ```

use crate::error::{CsvError, Result};
use crate::options::StreamOptions;
use crate::stream::{DocumentCollector, StreamParser, Utf8ChunkDecoder};
use crate::types::{BatchEvent, BatchSummary, Document, StreamEvent};
use futures_util::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt::Display;
use std::marker::PhantomData;
use std::pin::Pin;

/// How a source's chunks become text
trait ChunkKind<C> {
    fn decode(decoder: &mut Utf8ChunkDecoder, chunk: C) -> Result<String>;
}

struct ByteChunks;

struct TextChunks;

impl<B: AsRef<[u8]>> ChunkKind<B> for ByteChunks {
    fn decode(decoder: &mut Utf8ChunkDecoder, chunk: B) -> Result<String> {
        decoder.decode(chunk.as_ref())
    }
}

impl<T: AsRef<str>> ChunkKind<T> for TextChunks {
    fn decode(_decoder: &mut Utf8ChunkDecoder, chunk: T) -> Result<String> {
        Ok(chunk.as_ref().to_string())
    }
}

// One parse session pulling from one source
struct Driver<S, K> {
    source: Pin<Box<S>>,
    parser: StreamParser,
    decoder: Utf8ChunkDecoder,
    pending: VecDeque<StreamEvent>,
    done: bool,
    kind: PhantomData<K>,
}

impl<S, C, E, K> Driver<S, K>
where
    S: Stream<Item = std::result::Result<C, E>>,
    E: Display,
    K: ChunkKind<C>,
{
    fn new(source: S, options: StreamOptions) -> Result<Self> {
        Ok(Self {
            source: Box::pin(source),
            parser: StreamParser::new(options)?,
            decoder: Utf8ChunkDecoder::new(),
            pending: VecDeque::new(),
            done: false,
            kind: PhantomData,
        })
    }

    async fn next_event(&mut self) -> Option<Result<StreamEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.fill().await {
                self.done = true;
                return Some(Err(e));
            }
        }
    }

    async fn fill(&mut self) -> Result<()> {
        match self.source.next().await {
            Some(chunk) => {
                let chunk = chunk.map_err(|e| CsvError::Source(e.to_string()))?;
                let text = K::decode(&mut self.decoder, chunk)?;
                self.pending.extend(self.parser.feed(&text)?);
            }
            None => {
                self.decoder.finish()?;
                self.pending.extend(self.parser.finish()?);
                self.done = true;
            }
        }
        Ok(())
    }
}

fn drive<S, C, E, K>(source: S, options: StreamOptions) -> impl Stream<Item = Result<StreamEvent>>
where
    S: Stream<Item = std::result::Result<C, E>>,
    E: Display,
    K: ChunkKind<C>,
{
    let start = Driver::<S, K>::new(source, options);
    stream::unfold(Some(start), |state| async move {
        match state? {
            Ok(mut driver) => {
                let item = driver.next_event().await?;
                Some((item, Some(Ok(driver))))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
}

/// Parse a stream of UTF-8 byte chunks
///
/// Chunk boundaries may split multi-byte characters. A leading UTF-8 BOM is
/// stripped. Source errors end the stream with [`CsvError::Source`].
pub fn parse_byte_stream<S, B, E>(
    source: S,
    options: StreamOptions,
) -> impl Stream<Item = Result<StreamEvent>>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    drive::<S, B, E, ByteChunks>(source, options)
}

/// Parse a stream of text chunks
pub fn parse_text_stream<S, T, E>(
    source: S,
    options: StreamOptions,
) -> impl Stream<Item = Result<StreamEvent>>
where
    S: Stream<Item = std::result::Result<T, E>>,
    T: AsRef<str>,
    E: Display,
{
    drive::<S, T, E, TextChunks>(source, options)
}

async fn collect<St>(events: St) -> Result<Document>
where
    St: Stream<Item = Result<StreamEvent>>,
{
    let mut events = Box::pin(events);
    let mut collector = DocumentCollector::new();
    while let Some(event) = events.next().await {
        collector.push(event?);
    }
    Ok(collector.into_document())
}

/// Parse a byte stream into a document
pub async fn collect_byte_stream<S, B, E>(source: S, options: StreamOptions) -> Result<Document>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    collect(parse_byte_stream(source, options)).await
}

/// Parse a text stream into a document
pub async fn collect_text_stream<S, T, E>(source: S, options: StreamOptions) -> Result<Document>
where
    S: Stream<Item = std::result::Result<T, E>>,
    T: AsRef<str>,
    E: Display,
{
    collect(parse_text_stream(source, options)).await
}

struct Batch<S> {
    files: std::vec::IntoIter<(String, S)>,
    options: StreamOptions,
    next_index: usize,
    current: Option<(String, Driver<S, ByteChunks>)>,
    queued: Option<BatchEvent>,
    summary: BatchSummary,
    done: bool,
}

impl<S, B, E> Batch<S>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    fn file_failed(&mut self, file: String, error: CsvError) -> BatchEvent {
        tracing::warn!(file = %file, error = %error, "batch file failed");
        self.summary.errors += 1;
        BatchEvent::FileError { file, error }
    }

    async fn next_event(&mut self) -> Option<BatchEvent> {
        loop {
            if let Some(event) = self.queued.take() {
                return Some(event);
            }

            if let Some((file, driver)) = self.current.as_mut() {
                match driver.next_event().await {
                    Some(Ok(StreamEvent::Headers(headers))) => {
                        return Some(BatchEvent::Headers {
                            file: file.clone(),
                            headers,
                        })
                    }
                    Some(Ok(StreamEvent::Row(row))) => {
                        return Some(BatchEvent::Row {
                            file: file.clone(),
                            row,
                        })
                    }
                    Some(Ok(StreamEvent::Complete {
                        total_rows,
                        delimiter,
                    })) => {
                        let file = file.clone();
                        self.current = None;
                        self.summary.total_rows += total_rows;
                        return Some(BatchEvent::FileComplete {
                            file,
                            total_rows,
                            delimiter,
                        });
                    }
                    Some(Err(error)) => {
                        let file = file.clone();
                        self.current = None;
                        return Some(self.file_failed(file, error));
                    }
                    None => {
                        self.current = None;
                        continue;
                    }
                }
            }

            if self.done {
                return None;
            }

            let Some((file, source)) = self.files.next() else {
                self.done = true;
                tracing::debug!(
                    files = self.summary.files,
                    rows = self.summary.total_rows,
                    errors = self.summary.errors,
                    "batch complete"
                );
                return Some(BatchEvent::BatchComplete(self.summary));
            };

            let index = self.next_index;
            if index > 0 {
                // Let the host scheduler run between files
                tokio::task::yield_now().await;
            }
            self.next_index += 1;
            self.summary.files += 1;

            match Driver::new(source, self.options.clone()) {
                Ok(driver) => self.current = Some((file.clone(), driver)),
                Err(error) => {
                    let failed = self.file_failed(file.clone(), error);
                    self.queued = Some(failed);
                }
            }
            return Some(BatchEvent::FileStart { file, index });
        }
    }
}

/// Parse several named byte streams one after another
///
/// Each file yields `FileStart`, its headers and rows, then `FileComplete`
/// or `FileError`. A failing file does not stop the batch. The last event is
/// always `BatchComplete`, whose row total counts completed files only.
pub fn parse_batch<S, B, E>(
    files: Vec<(String, S)>,
    options: StreamOptions,
) -> impl Stream<Item = BatchEvent>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let batch = Batch {
        files: files.into_iter(),
        options,
        next_index: 0,
        current: None,
        queued: None,
        summary: BatchSummary::default(),
        done: false,
    };
    stream::unfold(batch, |mut batch| async move {
        let event = batch.next_event().await?;
        Some((event, batch))
    })
}
