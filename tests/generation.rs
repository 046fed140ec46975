use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use trendai::gemini::{
    self, Candidate, Content, GenerateContentRequest, GenerateContentResponse, GenerateError,
    ImageModel, ImagePayload, InlineData, Part,
};

/// Plays back a fixed sequence of provider responses and counts how many
/// requests were actually issued.
struct ScriptedModel {
    responses: Mutex<Vec<Result<GenerateContentResponse, GenerateError>>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn new(responses: Vec<Result<GenerateContentResponse, GenerateError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageModel for ScriptedModel {
    async fn generate_content(
        &self,
        _request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        assert!(!responses.is_empty(), "model called more times than scripted");
        responses.remove(0)
    }
}

fn source() -> ImagePayload {
    ImagePayload {
        data: "c29tZS1ieXRlcw==".to_string(),
        mime_type: "image/png".to_string(),
    }
}

fn image_response(data: &str) -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Some(Content {
                parts: vec![
                    Part {
                        text: Some("Here is your styled image.".to_string()),
                        ..Default::default()
                    },
                    Part {
                        inline_data: Some(InlineData {
                            mime_type: "image/png".to_string(),
                            data: data.to_string(),
                        }),
                        ..Default::default()
                    },
                ],
            }),
            finish_reason: Some("STOP".to_string()),
        }],
    }
}

fn text_only_response() -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Some(Content {
                parts: vec![Part {
                    text: Some("I cannot edit this image.".to_string()),
                    ..Default::default()
                }],
            }),
            finish_reason: Some("STOP".to_string()),
        }],
    }
}

fn safety_response() -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![Candidate {
            content: None,
            finish_reason: Some("SAFETY".to_string()),
        }],
    }
}

fn empty_response() -> GenerateContentResponse {
    GenerateContentResponse { candidates: vec![] }
}

#[tokio::test]
async fn successful_batch_issues_count_calls_and_keeps_order() {
    let model = ScriptedModel::new(vec![
        Ok(image_response("variation-1")),
        Ok(image_response("variation-2")),
        Ok(image_response("variation-3")),
    ]);

    let variations = gemini::generate_variations(&model, &source(), "make it cyberpunk", 3)
        .await
        .unwrap();

    assert_eq!(model.calls(), 3);
    let data: Vec<&str> = variations.iter().map(|payload| payload.data.as_str()).collect();
    assert_eq!(data, ["variation-1", "variation-2", "variation-3"]);
    assert!(variations.iter().all(|payload| payload.mime_type == "image/png"));
}

#[tokio::test]
async fn safety_block_on_second_call_aborts_after_two_calls() {
    let model = ScriptedModel::new(vec![
        Ok(image_response("variation-1")),
        Ok(safety_response()),
        Ok(image_response("variation-3")),
    ]);

    let err = gemini::generate_variations(&model, &source(), "make it cyberpunk", 3)
        .await
        .unwrap_err();

    assert!(matches!(err, GenerateError::SafetyBlocked));
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn provider_failure_propagates_and_stops_the_batch() {
    let model = ScriptedModel::new(vec![Err(GenerateError::Provider(
        "503 Service Unavailable".to_string(),
    ))]);

    let err = gemini::generate_variations(&model, &source(), "prompt", 3)
        .await
        .unwrap_err();

    assert!(matches!(err, GenerateError::Provider(_)));
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn empty_result_set_maps_to_no_candidates() {
    let model = ScriptedModel::new(vec![Ok(empty_response())]);

    let err = gemini::generate_variations(&model, &source(), "prompt", 1)
        .await
        .unwrap_err();

    assert!(matches!(err, GenerateError::NoCandidates));
}

#[tokio::test]
async fn text_only_reply_maps_to_no_image() {
    let model = ScriptedModel::new(vec![Ok(text_only_response())]);

    let err = gemini::generate_variations(&model, &source(), "prompt", 1)
        .await
        .unwrap_err();

    assert!(matches!(err, GenerateError::NoImage));
}

#[tokio::test]
async fn invalid_input_never_reaches_the_provider() {
    let model = ScriptedModel::new(vec![]);

    let err = gemini::generate_variations(&model, &source(), "prompt", 0)
        .await
        .unwrap_err();
    assert!(matches!(err, GenerateError::InvalidInput(_)));

    let empty = ImagePayload {
        data: "   ".to_string(),
        mime_type: "image/png".to_string(),
    };
    let err = gemini::generate_variations(&model, &empty, "prompt", 1)
        .await
        .unwrap_err();
    assert!(matches!(err, GenerateError::InvalidInput(_)));

    let unsupported = ImagePayload {
        data: "c29tZS1ieXRlcw==".to_string(),
        mime_type: "image/tiff".to_string(),
    };
    let err = gemini::generate_variations(&model, &unsupported, "prompt", 1)
        .await
        .unwrap_err();
    assert!(matches!(err, GenerateError::InvalidInput(_)));

    assert_eq!(model.calls(), 0);
}

#[test]
fn classification_is_total_over_the_four_response_shapes() {
    assert!(matches!(
        gemini::extract_image(empty_response()),
        Err(GenerateError::NoCandidates)
    ));
    assert!(matches!(
        gemini::extract_image(safety_response()),
        Err(GenerateError::SafetyBlocked)
    ));
    assert!(matches!(
        gemini::extract_image(text_only_response()),
        Err(GenerateError::NoImage)
    ));
    let payload = gemini::extract_image(image_response("ok")).unwrap();
    assert_eq!(payload.data, "ok");
    assert_eq!(payload.mime_type, "image/png");
}

#[test]
fn non_image_inline_data_is_not_mistaken_for_a_result() {
    let response = GenerateContentResponse {
        candidates: vec![Candidate {
            content: Some(Content {
                parts: vec![Part {
                    inline_data: Some(InlineData {
                        mime_type: "application/json".to_string(),
                        data: "e30=".to_string(),
                    }),
                    ..Default::default()
                }],
            }),
            finish_reason: Some("STOP".to_string()),
        }],
    };
    assert!(matches!(
        gemini::extract_image(response),
        Err(GenerateError::NoImage)
    ));
}
