use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread;
use std::time::Duration;

use crate::api::ApiError;
use crate::models::AnalysisResult;

/// Media types the analysis backend accepts. Anything else is rejected
/// before a single byte goes over the wire.
pub const ACCEPTED_MEDIA_TYPES: [&str; 3] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

pub const REJECTION_NOTICE: &str = "Please upload a PDF, DOC, or DOCX file.";

/// Lets the progress display visibly settle at 100% before the report
/// replaces it.
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Transport-level progress, reported as a fraction of bytes sent.
pub type ProgressHook = Arc<dyn Fn(f64) + Send + Sync>;

/// UI-level progress, reported as a whole percentage.
pub type ProgressObserver = Arc<dyn Fn(u8) + Send + Sync>;

/// The one seam between the controller and the network, so the upload state
/// machine is testable without a server.
pub trait Analyzer {
    fn analyze(&self, file: &SelectedFile, on_progress: ProgressHook)
    -> Result<AnalysisResult, ApiError>;
}

/// A resume the user picked, not yet sent anywhere.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
    pub media_type: String,
    pub size: u64,
}

impl SelectedFile {
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            path: path.to_path_buf(),
            name,
            media_type: media_type_for(path).to_string(),
            size: metadata.len(),
        })
    }
}

pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Uploading,
    Succeeded,
    Failed,
}

/// What a successful submit hands to the results renderer: either the
/// analysis itself or an identifier to fetch it with.
#[derive(Debug, Clone)]
pub enum Handoff {
    Data(AnalysisResult),
    Id(String),
}

/// Mediates between user input and the API client. One session per upload;
/// nothing here survives the process.
pub struct UploadSession {
    pub file: Option<SelectedFile>,
    pub phase: Phase,
    pub error_message: Option<String>,
    progress: Arc<AtomicU8>,
}

impl UploadSession {
    pub fn new() -> Self {
        Self {
            file: None,
            phase: Phase::Idle,
            error_message: None,
            progress: Arc::new(AtomicU8::new(0)),
        }
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress.load(Ordering::SeqCst)
    }

    /// Accepts a candidate file. On an allow-listed media type the selection
    /// replaces any previous one and clears the error; otherwise the
    /// selection is left untouched and a rejection notice is surfaced.
    pub fn select_file(&mut self, candidate: SelectedFile) {
        if ACCEPTED_MEDIA_TYPES.contains(&candidate.media_type.as_str()) {
            self.file = Some(candidate);
            self.error_message = None;
        } else {
            self.error_message = Some(REJECTION_NOTICE.to_string());
        }
    }

    /// Drops the selection. Ignored while an upload is in flight.
    pub fn clear_file(&mut self) {
        if self.phase == Phase::Uploading {
            return;
        }
        self.file = None;
        self.error_message = None;
        self.phase = Phase::Idle;
    }

    /// Runs the upload+analyze call. A no-op without a selected file or while
    /// already uploading, which is what makes double-submit harmless.
    ///
    /// Progress fed to `observer` is monotonically non-decreasing and stays
    /// below 100 until the server has actually answered; 100 is only ever
    /// reported on success.
    pub fn submit(
        &mut self,
        analyzer: &dyn Analyzer,
        observer: ProgressObserver,
    ) -> Option<Handoff> {
        if self.phase == Phase::Uploading {
            return None;
        }
        let file = self.file.clone()?;

        self.phase = Phase::Uploading;
        self.error_message = None;
        self.progress.store(0, Ordering::SeqCst);

        let progress = Arc::clone(&self.progress);
        let hook_observer = Arc::clone(&observer);
        let hook: ProgressHook = Arc::new(move |fraction| {
            let pct = transport_percent(fraction);
            let prev = progress.fetch_max(pct, Ordering::SeqCst);
            if pct > prev {
                hook_observer(pct);
            }
        });

        match analyzer.analyze(&file, hook) {
            Ok(result) => {
                self.progress.store(100, Ordering::SeqCst);
                observer(100);
                thread::sleep(SETTLE_DELAY);
                self.phase = Phase::Succeeded;
                Some(Handoff::Data(result))
            }
            Err(err) => {
                self.phase = Phase::Failed;
                self.progress.store(0, Ordering::SeqCst);
                self.error_message = Some(err.to_string());
                None
            }
        }
    }
}

impl Default for UploadSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps a transport fraction onto 0..=99. The last point is reserved for a
/// confirmed response, since bytes-on-the-wire is not the same as analyzed.
fn transport_percent(fraction: f64) -> u8 {
    if !fraction.is_finite() || fraction <= 0.0 {
        return 0;
    }
    ((fraction * 100.0).round() as u8).min(99)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn pdf_file() -> SelectedFile {
        SelectedFile {
            path: PathBuf::from("resume.pdf"),
            name: "resume.pdf".to_string(),
            media_type: "application/pdf".to_string(),
            size: 1_572_864,
        }
    }

    struct StubAnalyzer {
        calls: AtomicUsize,
        fractions: Vec<f64>,
        outcome: Result<AnalysisResult, ApiError>,
    }

    impl StubAnalyzer {
        fn succeeding(fractions: Vec<f64>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fractions,
                outcome: Ok(AnalysisResult::default()),
            }
        }

        fn failing(err: ApiError) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fractions: vec![0.5],
                outcome: Err(err),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Analyzer for StubAnalyzer {
        fn analyze(
            &self,
            _file: &SelectedFile,
            on_progress: ProgressHook,
        ) -> Result<AnalysisResult, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            for f in &self.fractions {
                on_progress(*f);
            }
            self.outcome.clone()
        }
    }

    fn no_observer() -> ProgressObserver {
        Arc::new(|_| {})
    }

    #[test]
    fn test_select_file_accepts_allow_listed_types() {
        for media_type in ACCEPTED_MEDIA_TYPES {
            let mut session = UploadSession::new();
            session.error_message = Some("stale".to_string());
            let mut file = pdf_file();
            file.media_type = media_type.to_string();
            session.select_file(file);
            assert!(session.file.is_some(), "{media_type} should be accepted");
            assert!(session.error_message.is_none());
        }
    }

    #[test]
    fn test_select_file_rejects_other_types() {
        let mut session = UploadSession::new();
        let mut file = pdf_file();
        file.media_type = "image/png".to_string();
        session.select_file(file);
        assert!(session.file.is_none());
        assert_eq!(session.error_message.as_deref(), Some(REJECTION_NOTICE));
        assert_eq!(session.phase, Phase::Idle);
    }

    #[test]
    fn test_rejected_candidate_keeps_previous_selection() {
        let mut session = UploadSession::new();
        session.select_file(pdf_file());
        let mut bad = pdf_file();
        bad.media_type = "text/plain".to_string();
        session.select_file(bad);
        assert_eq!(session.file.as_ref().unwrap().name, "resume.pdf");
        assert!(session.error_message.is_some());
    }

    #[test]
    fn test_submit_without_file_is_noop() {
        let mut session = UploadSession::new();
        let analyzer = StubAnalyzer::succeeding(vec![1.0]);
        assert!(session.submit(&analyzer, no_observer()).is_none());
        assert_eq!(analyzer.call_count(), 0);
        assert_eq!(session.phase, Phase::Idle);
    }

    #[test]
    fn test_submit_guarded_while_uploading() {
        let mut session = UploadSession::new();
        session.select_file(pdf_file());
        session.phase = Phase::Uploading;
        let analyzer = StubAnalyzer::succeeding(vec![1.0]);
        assert!(session.submit(&analyzer, no_observer()).is_none());
        assert_eq!(analyzer.call_count(), 0);
    }

    #[test]
    fn test_submit_success_transitions_and_settles_at_100() {
        let mut session = UploadSession::new();
        session.select_file(pdf_file());
        let analyzer = StubAnalyzer::succeeding(vec![0.3, 0.7, 1.0]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer: ProgressObserver = Arc::new(move |pct| sink.lock().unwrap().push(pct));

        let handoff = session.submit(&analyzer, observer);
        assert!(matches!(handoff, Some(Handoff::Data(_))));
        assert_eq!(session.phase, Phase::Succeeded);
        assert_eq!(session.progress_percent(), 100);
        assert_eq!(analyzer.call_count(), 1);

        let seen = seen.lock().unwrap();
        assert_eq!(*seen.last().unwrap(), 100);
        assert!(seen.windows(2).all(|w| w[0] < w[1]), "progress must rise");
        assert!(seen[..seen.len() - 1].iter().all(|&p| p < 100));
    }

    #[test]
    fn test_progress_never_runs_backwards() {
        let mut session = UploadSession::new();
        session.select_file(pdf_file());
        // Out-of-order and overshooting fractions from the transport.
        let analyzer = StubAnalyzer::succeeding(vec![0.5, 0.3, 0.9, 2.0]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer: ProgressObserver = Arc::new(move |pct| sink.lock().unwrap().push(pct));

        session.submit(&analyzer, observer);
        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![50, 90, 99, 100]);
    }

    #[test]
    fn test_submit_failure_resets_progress_and_surfaces_message() {
        let mut session = UploadSession::new();
        session.select_file(pdf_file());
        let analyzer = StubAnalyzer::failing(ApiError::Server {
            status: 500,
            message: "file too large".to_string(),
        });

        let handoff = session.submit(&analyzer, no_observer());
        assert!(handoff.is_none());
        assert_eq!(session.phase, Phase::Failed);
        assert_eq!(session.progress_percent(), 0);
        assert_eq!(session.error_message.as_deref(), Some("file too large"));
    }

    #[test]
    fn test_failed_session_allows_retry() {
        let mut session = UploadSession::new();
        session.select_file(pdf_file());
        let failing = StubAnalyzer::failing(ApiError::Network("Network Error: refused".into()));
        session.submit(&failing, no_observer());
        assert_eq!(session.phase, Phase::Failed);

        let succeeding = StubAnalyzer::succeeding(vec![1.0]);
        let handoff = session.submit(&succeeding, no_observer());
        assert!(matches!(handoff, Some(Handoff::Data(_))));
        assert_eq!(session.phase, Phase::Succeeded);
        assert!(session.error_message.is_none());
    }

    #[test]
    fn test_clear_file_rules() {
        let mut session = UploadSession::new();
        session.select_file(pdf_file());
        session.phase = Phase::Uploading;
        session.clear_file();
        assert!(session.file.is_some(), "clear is a no-op mid-upload");

        session.phase = Phase::Failed;
        session.error_message = Some("boom".to_string());
        session.clear_file();
        assert!(session.file.is_none());
        assert!(session.error_message.is_none());
        assert_eq!(session.phase, Phase::Idle);
    }

    #[test]
    fn test_media_type_inference() {
        assert_eq!(media_type_for(Path::new("cv.PDF")), "application/pdf");
        assert_eq!(media_type_for(Path::new("cv.doc")), "application/msword");
        assert_eq!(
            media_type_for(Path::new("cv.docx")),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(
            media_type_for(Path::new("cv.txt")),
            "application/octet-stream"
        );
    }
}
