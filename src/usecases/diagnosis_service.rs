//! Diagnosis service. Orchestrates one triage request.
//!
//! Coordinates between the image classifier, the severity resolver, and the
//! narrative generator.

use super::prompt::compose_prompt;
use crate::domain::{DiagnosisRequest, DiagnosisResponse, DomainError};
use crate::ports::{
    DiagnosisUseCase, ImageClassifierPort, InputPolicy, NarrativePort, SeverityContext,
    SeverityResolver,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Service for image triage.
///
/// Orchestrates the flow:
/// 1. Validate the request against the resolver's input policy
/// 2. Classify the image and keep the top label
/// 3. Resolve severity
/// 4. Compose the prompt and generate the narrative
/// 5. Assemble the response
pub struct DiagnosisService {
    classifier: Arc<dyn ImageClassifierPort>,
    resolver: Arc<dyn SeverityResolver>,
    narrator: Arc<dyn NarrativePort>,
}

impl DiagnosisService {
    /// Create a new diagnosis service.
    ///
    /// # Arguments
    /// * `classifier` - Image classifier (ViT, or an unavailable stand-in)
    /// * `resolver` - Severity strategy (table lookup or text model)
    /// * `narrator` - Narrative generator (Gemini, OpenAI-compatible, mock)
    pub fn new(
        classifier: Arc<dyn ImageClassifierPort>,
        resolver: Arc<dyn SeverityResolver>,
        narrator: Arc<dyn NarrativePort>,
    ) -> Self {
        Self {
            classifier,
            resolver,
            narrator,
        }
    }

    fn validate(&self, request: &DiagnosisRequest) -> Result<(), DomainError> {
        match self.resolver.input_policy() {
            InputPolicy::ImageRequired if !request.has_image() => Err(DomainError::MissingImage),
            InputPolicy::AnyModality if !request.has_image() && !request.has_message() => {
                Err(DomainError::MissingInput)
            }
            _ => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl DiagnosisUseCase for DiagnosisService {
    async fn diagnose(&self, request: DiagnosisRequest) -> Result<DiagnosisResponse, DomainError> {
        self.validate(&request)?;

        let top = match request.image() {
            Some(image) => {
                let ranked = self.classifier.classify(image).await.inspect_err(|e| {
                    warn!(error = %e, "image classification failed");
                })?;
                let top = ranked.into_iter().next().ok_or_else(|| {
                    DomainError::Classification("classifier returned no labels".to_string())
                })?;
                Some(top)
            }
            None => None,
        };

        let message = request.message();
        let severity = self
            .resolver
            .resolve(SeverityContext {
                disease: top.as_ref().map(|t| t.label.as_str()),
                message,
            })
            .await?;

        info!(
            disease = ?top.as_ref().map(|t| &t.label),
            confidence = ?top.as_ref().map(|t| t.confidence_percent()),
            severity = %severity,
            strategy = self.resolver.name(),
            "diagnosed"
        );

        let prompt = compose_prompt(top.as_ref(), severity, message);
        let narrative = self.narrator.generate(&prompt).await.inspect_err(|e| {
            warn!(error = %e, "narrative generation failed, discarding classification");
        })?;

        Ok(DiagnosisResponse {
            confidence: top.as_ref().map(|t| t.confidence_percent()),
            disease: top.map(|t| t.label),
            severity,
            narrative,
        })
    }

    fn severity_strategy(&self) -> &'static str {
        self.resolver.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClassificationResult, SeverityTable, SeverityTier};
    use crate::ports::TextSeverityPort;
    use crate::usecases::{TableLookupResolver, TextModelResolver};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeClassifier {
        result: Result<Vec<ClassificationResult>, String>,
        calls: AtomicUsize,
    }

    impl FakeClassifier {
        fn ranked(pairs: &[(&str, f32)]) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(pairs
                    .iter()
                    .map(|(l, c)| ClassificationResult::new(*l, *c))
                    .collect()),
                calls: AtomicUsize::new(0),
            })
        }

        fn undecodable() -> Arc<Self> {
            Arc::new(Self {
                result: Err("unsupported format".to_string()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl ImageClassifierPort for FakeClassifier {
        async fn classify(&self, _image: &[u8]) -> Result<Vec<ClassificationResult>, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(DomainError::InvalidImage)
        }
    }

    struct FakeNarrator {
        fail: bool,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeNarrator {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl NarrativePort for FakeNarrator {
        async fn generate(&self, prompt: &str) -> Result<String, DomainError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                return Err(DomainError::NarrativeGenerationFailed(
                    "quota exceeded".to_string(),
                ));
            }
            Ok("Chickenpox is a contagious viral infection.".to_string())
        }
    }

    /// Argmax-style fake: returns the tier at a fixed class index of the label map.
    struct IndexedText {
        label_map: Vec<SeverityTier>,
        argmax: usize,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl TextSeverityPort for IndexedText {
        async fn classify_severity(
            &self,
            text: &str,
        ) -> Result<Option<SeverityTier>, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.trim().is_empty() {
                return Ok(None);
            }
            Ok(self.label_map.get(self.argmax).copied())
        }
    }

    fn table_service(
        classifier: Arc<FakeClassifier>,
        narrator: Arc<FakeNarrator>,
    ) -> DiagnosisService {
        let resolver = Arc::new(TableLookupResolver::new(Arc::new(SeverityTable::fallback())));
        DiagnosisService::new(classifier, resolver, narrator)
    }

    #[tokio::test]
    async fn test_end_to_end_table_variant() {
        let classifier = FakeClassifier::ranked(&[("chickenpox", 0.9421), ("shingles", 0.05)]);
        let narrator = FakeNarrator::new(false);
        let service = table_service(classifier.clone(), narrator.clone());

        let response = service
            .diagnose(DiagnosisRequest::new(
                Some(vec![0xFF, 0xD8]),
                Some("is it contagious?".to_string()),
            ))
            .await
            .unwrap();

        assert_eq!(response.disease.as_deref(), Some("chickenpox"));
        assert_eq!(response.confidence, Some(94.21));
        assert_eq!(response.severity, SeverityTier::High);
        assert!(!response.narrative.is_empty());

        let prompts = narrator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("**chickenpox** (Confidence: 94.21%)"));
        assert!(prompts[0].contains("is it contagious?"));
    }

    #[tokio::test]
    async fn test_table_variant_requires_image() {
        let classifier = FakeClassifier::ranked(&[("acne", 0.8)]);
        let narrator = FakeNarrator::new(false);
        let service = table_service(classifier.clone(), narrator.clone());

        let err = service
            .diagnose(DiagnosisRequest::new(None, Some("itchy".to_string())))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::MissingImage));
        assert!(err.is_client_error());
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
        assert_eq!(narrator.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_request_rejected_without_adapter_calls() {
        let classifier = FakeClassifier::ranked(&[("acne", 0.8)]);
        let narrator = FakeNarrator::new(false);
        let text = Arc::new(IndexedText {
            label_map: vec![SeverityTier::High, SeverityTier::Low, SeverityTier::Medium],
            argmax: 1,
            calls: AtomicUsize::new(0),
        });
        let service = DiagnosisService::new(
            classifier.clone(),
            Arc::new(TextModelResolver::new(text.clone())),
            narrator.clone(),
        );

        let err = service
            .diagnose(DiagnosisRequest::new(Some(Vec::new()), Some("  ".to_string())))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::MissingInput));
        assert!(err.is_client_error());
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
        assert_eq!(text.calls.load(Ordering::SeqCst), 0);
        assert_eq!(narrator.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_image_stops_before_severity_and_narrative() {
        let classifier = FakeClassifier::undecodable();
        let narrator = FakeNarrator::new(false);
        let text = Arc::new(IndexedText {
            label_map: vec![SeverityTier::High, SeverityTier::Low, SeverityTier::Medium],
            argmax: 0,
            calls: AtomicUsize::new(0),
        });
        let service = DiagnosisService::new(
            classifier.clone(),
            Arc::new(TextModelResolver::new(text.clone())),
            narrator.clone(),
        );

        let err = service
            .diagnose(DiagnosisRequest::new(
                Some(b"not an image".to_vec()),
                Some("burning".to_string()),
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::InvalidImage(_)));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(text.calls.load(Ordering::SeqCst), 0);
        assert_eq!(narrator.calls(), 0);
    }

    #[tokio::test]
    async fn test_text_variant_maps_argmax_through_label_map() {
        let classifier = FakeClassifier::ranked(&[("dry scalp", 0.7)]);
        let narrator = FakeNarrator::new(false);
        let text = Arc::new(IndexedText {
            label_map: vec![SeverityTier::High, SeverityTier::Low, SeverityTier::Medium],
            argmax: 1,
            calls: AtomicUsize::new(0),
        });
        let service = DiagnosisService::new(
            classifier.clone(),
            Arc::new(TextModelResolver::new(text)),
            narrator,
        );

        let response = service
            .diagnose(DiagnosisRequest::new(None, Some("mild itching".to_string())))
            .await
            .unwrap();

        assert_eq!(response.severity, SeverityTier::Low);
        assert_eq!(response.disease, None);
        assert_eq!(response.confidence, None);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
        assert_eq!(service.severity_strategy(), "text_model");
    }

    #[tokio::test]
    async fn test_narrative_failure_discards_classification() {
        let classifier = FakeClassifier::ranked(&[("chickenpox", 0.9421)]);
        let narrator = FakeNarrator::new(true);
        let service = table_service(classifier, narrator.clone());

        let result = service
            .diagnose(DiagnosisRequest::new(Some(vec![1, 2, 3]), None))
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, DomainError::NarrativeGenerationFailed(_)));
        assert!(!err.is_client_error());
        assert_eq!(narrator.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_ranking_is_classification_error() {
        let classifier = FakeClassifier::ranked(&[]);
        let narrator = FakeNarrator::new(false);
        let service = table_service(classifier, narrator.clone());

        let err = service
            .diagnose(DiagnosisRequest::new(Some(vec![1]), None))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Classification(_)));
        assert_eq!(narrator.calls(), 0);
    }
}
