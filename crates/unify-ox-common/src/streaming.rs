use crate::error::CommonRequestError;
use futures_util::StreamExt;
use serde::Deserialize;
use std::{io::BufRead, marker::PhantomData};

/// Line-level server-sent events state machine shared by the async and
/// blocking readers.
///
/// Only `data:` fields are collected; comments and the `event`, `id` and
/// `retry` fields are ignored. The OpenAI-style `[DONE]` sentinel is dropped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line. Returns the event payload when the line terminates an event.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        let trimmed = line.trim_end_matches(['\n', '\r']).trim_end();

        if trimmed.is_empty() {
            return self.finish();
        }

        if trimmed.starts_with(':') {
            return None;
        }

        if let Some(rest) = trimmed.strip_prefix("data:") {
            let data = rest.trim_start();

            if data == "[DONE]" {
                self.data_lines.clear();
            } else if !data.is_empty() {
                self.data_lines.push(data.to_string());
            }
        }

        None
    }

    /// Flush whatever event is pending, e.g. when the body ends without a blank line.
    pub fn finish(&mut self) -> Option<String> {
        if self.data_lines.is_empty() {
            return None;
        }

        let payload = self.data_lines.join("\n");
        self.data_lines.clear();
        Some(payload)
    }
}

/// Decode one event payload. Error objects sent in-band become `InvalidEventData`.
pub fn decode_event<T: for<'de> Deserialize<'de>>(payload: &str) -> Result<T, CommonRequestError> {
    serde_json::from_str::<T>(payload).map_err(|e| {
        let in_band = serde_json::from_str::<serde_json::Value>(payload)
            .ok()
            .and_then(|json| {
                json.get("error").map(|err| {
                    err.get("message")
                        .and_then(serde_json::Value::as_str)
                        .map_or_else(|| err.to_string(), str::to_string)
                })
            });

        match in_band {
            Some(message) => CommonRequestError::InvalidEventData(message),
            None => CommonRequestError::InvalidEventData(format!("JSON parse error: {e}")),
        }
    })
}

/// Server-Sent Events parser for async streaming responses
pub struct SseParser {
    byte_stream: std::pin::Pin<
        Box<dyn futures_util::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>,
    >,
    buffer: Vec<u8>,
    decoder: SseDecoder,
    finished: bool,
}

impl SseParser {
    pub fn new(response: reqwest::Response) -> Self {
        Self {
            byte_stream: Box::pin(response.bytes_stream()),
            buffer: Vec::new(),
            decoder: SseDecoder::new(),
            finished: false,
        }
    }

    /// Get the next parsed event from the stream
    pub async fn next_event<T: for<'de> Deserialize<'de>>(
        &mut self,
    ) -> Result<Option<T>, CommonRequestError> {
        loop {
            if let Some(payload) = self.next_payload_from_buffer()? {
                return decode_event(&payload).map(Some);
            }

            if self.finished {
                return Ok(None);
            }

            if let Some(chunk_result) = self.byte_stream.next().await {
                let chunk = chunk_result?;
                self.buffer.extend_from_slice(&chunk);
            } else {
                // Stream ended, process any remaining data
                self.finished = true;
                let rest = String::from_utf8(std::mem::take(&mut self.buffer))?;
                let payload = self
                    .decoder
                    .push_line(&rest)
                    .or_else(|| self.decoder.finish());
                return payload.map(|p| decode_event(&p)).transpose();
            }
        }
    }

    fn next_payload_from_buffer(&mut self) -> Result<Option<String>, CommonRequestError> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes = self.buffer.drain(..=pos).collect::<Vec<u8>>();
            let line = String::from_utf8(line_bytes)?;

            if let Some(payload) = self.decoder.push_line(&line) {
                return Ok(Some(payload));
            }
        }

        Ok(None)
    }
}

/// Blocking iterator over the SSE events of a buffered reader.
///
/// Finite and not restartable: once the reader is exhausted or an I/O error
/// surfaces, the iterator keeps returning `None`.
pub struct SseLines<R, T> {
    reader: R,
    decoder: SseDecoder,
    line: String,
    done: bool,
    _event: PhantomData<fn() -> T>,
}

impl<R: BufRead, T> SseLines<R, T> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            decoder: SseDecoder::new(),
            line: String::new(),
            done: false,
            _event: PhantomData,
        }
    }
}

impl<R: BufRead, T: for<'de> Deserialize<'de>> Iterator for SseLines<R, T> {
    type Item = Result<T, CommonRequestError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => {
                    self.done = true;
                    return self.decoder.finish().map(|p| decode_event(&p));
                }
                Ok(_) => {
                    if let Some(payload) = self.decoder.push_line(&self.line) {
                        return Some(decode_event(&payload));
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::io::Cursor;

    fn collect(body: &str) -> Vec<Result<Value, CommonRequestError>> {
        SseLines::new(Cursor::new(body.as_bytes().to_vec())).collect()
    }

    #[test]
    fn test_empty_body_yields_nothing() {
        assert!(collect("").is_empty());
    }

    #[test]
    fn test_done_message_is_dropped() {
        assert!(collect("data: [DONE]\n\n").is_empty());
    }

    #[test]
    fn test_events_split_on_blank_lines() {
        let events = collect("data: {\"n\": 1}\n\n: keep-alive\n\ndata: {\"n\": 2}\n\ndata: [DONE]\n\n");
        let values: Vec<Value> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0]["n"], 1);
        assert_eq!(values[1]["n"], 2);
    }

    #[test]
    fn test_trailing_event_without_blank_line() {
        let events = collect("data: {\"test\": \"value\"}");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap()["test"], "value");
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let events = collect("data: {invalid json}\n\n");
        assert!(matches!(events[0], Err(CommonRequestError::InvalidEventData(_))));
    }

    #[test]
    fn test_in_band_error_message_is_surfaced() {
        #[derive(Debug, Deserialize)]
        struct Chunk {
            #[allow(dead_code)]
            id: String,
        }

        let mut lines: SseLines<_, Chunk> = SseLines::new(Cursor::new(
            b"data: {\"error\": {\"message\": \"provider overloaded\"}}\n\n".to_vec(),
        ));
        match lines.next() {
            Some(Err(CommonRequestError::InvalidEventData(msg))) => {
                assert_eq!(msg, "provider overloaded");
            }
            other => panic!("unexpected item: {other:?}"),
        }
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_multiline_data_is_joined() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.push_line("data: {\"a\":\n"), None);
        assert_eq!(decoder.push_line("data: 1}\r\n"), None);
        assert_eq!(decoder.push_line("\n"), Some("{\"a\":\n1}".to_string()));
        assert_eq!(decoder.finish(), None);
    }
}
