//! Per-viewer state: the live document, request sequencing and the camera.

use crate::camera::OrbitCamera;
use crate::config::ViewerConfig;
use crate::decoder::ResultDecoder;
use crate::document::GeometryDocument;
use crate::protocol::{SolveRequest, SolveResponse};

/// Margin applied around the geometry when the camera is refitted.
pub const FIT_OFFSET: f32 = 1.2;

pub struct Session {
    document: Option<GeometryDocument>,
    decoder: ResultDecoder,
    pub camera: OrbitCamera,
    next_seq: u64,
    last_applied: Option<u64>,
    /// Bumped whenever the document changes so GPU buffers can be rebuilt lazily.
    revision: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            document: None,
            decoder: ResultDecoder::new(),
            camera: OrbitCamera::default(),
            next_seq: 0,
            last_applied: None,
            revision: 0,
        }
    }

    pub fn document(&self) -> Option<&GeometryDocument> {
        self.document.as_ref()
    }

    /// Download is offered as soon as any document exists, even an empty one.
    pub fn can_download(&self) -> bool {
        self.document.is_some()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Snapshot the current slider values and tag the request with a fresh sequence number.
    pub fn begin_request(&mut self, config: &ViewerConfig) -> (u64, SolveRequest) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let request = SolveRequest::new(config.definition.clone(), config.input_values());
        log::debug!("request #{seq}: {:?}", request.inputs());
        (seq, request)
    }

    /// True while a request newer than the last applied response is outstanding.
    pub fn in_flight(&self) -> bool {
        match self.last_applied {
            Some(seq) => seq + 1 < self.next_seq,
            None => self.next_seq > 0,
        }
    }

    /// Mark a failed request as settled so the spinner does not hang on it.
    pub fn fail_request(&mut self, seq: u64) {
        if self.last_applied.is_none_or(|last| seq > last) && seq + 1 == self.next_seq {
            self.last_applied = Some(seq);
        }
    }

    /// Install the response of request `seq` unless a newer one was applied already.
    pub fn apply_response(&mut self, seq: u64, response: &SolveResponse, aspect: f32) -> bool {
        if self.last_applied.is_some_and(|last| seq <= last) {
            log::info!("discarding stale response #{seq}");
            return false;
        }
        self.last_applied = Some(seq);
        self.decoder.rebuild(&mut self.document, response);
        self.revision += 1;
        if let Some(doc) = &self.document {
            self.camera.zoom_to_fit(&doc.bounds(), aspect, FIT_OFFSET);
        }
        true
    }
}
