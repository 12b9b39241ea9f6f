/*!
 * Integration tests for the translate, reflect, improve workflow.
 *
 * The provider is a recording mock; token counts and chunk boundaries come
 * either from test doubles or from the real cl100k encoding.
 */

use std::error::Error as _;
use std::sync::Arc;

use reflective_translate::errors::{TranslationError, TranslationFailure};
use reflective_translate::providers::CompletionRequest;
use reflective_translate::providers::mock::MockProvider;
use reflective_translate::tokenizer::{TiktokenTokenizer, Tokenizer};
use reflective_translate::translation::{
    SemanticTextSplitter, TextSplitter, TranslationPlan, TranslationRequest, calculate_chunk_size,
};

use crate::common::{
    self, BrokenTokenizer, FixedTokenizer, RecordingSplitter, Stage, identity_response, source_of, stage_of,
    stage_response,
};

fn fixed(count: usize) -> Arc<dyn Tokenizer> {
    Arc::new(FixedTokenizer { count })
}

fn stages(calls: &[CompletionRequest]) -> Vec<Stage> {
    calls.iter().map(stage_of).collect()
}

/// Later chunks answer sooner, so completion order differs from chunk order
fn reverse_latency(request: &CompletionRequest) -> u64 {
    match source_of(request) {
        "one " => 30,
        "two " => 15,
        _ => 1,
    }
}

/// Test that a text within the budget gets exactly three calls
#[tokio::test]
async fn test_translate_withinBudget_shouldReturnImprovedTranslation() {
    let mock = MockProvider::working().with_custom_response(stage_response);
    let splitter = Arc::new(RecordingSplitter::returning(&["unused"]));
    let service = common::service_with(&mock, fixed(500), splitter.clone(), 1);
    let request = TranslationRequest::new("English", "Spanish", "Hello, world.").with_max_tokens_per_chunk(1000);

    let translation = service.translate(&request).await.unwrap();

    assert_eq!(translation, "t2[Hello, world.]");
    assert_eq!(mock.call_count(), 3);
    assert_eq!(
        stages(&mock.calls()),
        vec![Stage::Initial, Stage::Reflection, Stage::Improvement]
    );
    assert!(splitter.calls().is_empty());

    let calls = mock.calls();
    assert!(calls[1].prompt.contains("<TRANSLATION>\nt1["));
    assert!(calls[2].prompt.contains("<EXPERT_SUGGESTIONS>\nnotes[Hello, world.]\n</EXPERT_SUGGESTIONS>"));
}

/// Test the routing boundary: a count equal to the budget is a single pass
#[tokio::test]
async fn test_translate_atBudget_shouldUseSinglePass() {
    let mock = MockProvider::working().with_custom_response(stage_response);
    let splitter = Arc::new(RecordingSplitter::returning(&["a", "b"]));
    let service = common::service_with(&mock, fixed(1000), splitter.clone(), 1);
    let request = TranslationRequest::new("English", "Spanish", "text").with_max_tokens_per_chunk(1000);

    service.translate(&request).await.unwrap();

    assert_eq!(mock.call_count(), 3);
    assert!(splitter.calls().is_empty());
}

/// Test the routing boundary: one token over the budget is a multi pass
#[tokio::test]
async fn test_translate_overBudget_shouldSplitAndUseMultiPass() {
    let mock = MockProvider::working().with_custom_response(stage_response);
    let splitter = Arc::new(RecordingSplitter::returning(&["a", "b"]));
    let service = common::service_with(&mock, fixed(1001), splitter.clone(), 1);
    let request = TranslationRequest::new("English", "Spanish", "ab").with_max_tokens_per_chunk(1000);

    let translation = service.translate(&request).await.unwrap();

    assert_eq!(splitter.calls(), vec![(calculate_chunk_size(1001, 1000), 0)]);
    assert_eq!(mock.call_count(), 6);
    assert_eq!(translation, "t2[a]t2[b]");
}

/// Test the worked example of 2500 tokens with a budget of 1000
#[tokio::test]
async fn test_translate_threeChunks_shouldRunNineCallsAndConcatenate() {
    let mock = MockProvider::working().with_custom_response(stage_response);
    let splitter = Arc::new(RecordingSplitter::returning(&["one ", "two ", "three"]));
    let service = common::service_with(&mock, fixed(2500), splitter.clone(), 1);
    let request = TranslationRequest::new("English", "German", "one two three").with_max_tokens_per_chunk(1000);

    let translation = service.translate(&request).await.unwrap();

    assert_eq!(splitter.calls(), vec![(999, 0)]);
    assert_eq!(mock.call_count(), 9);
    assert_eq!(translation, "t2[one ]t2[two ]t2[three]");
}

/// Test that every pass completes before the next one starts
#[tokio::test]
async fn test_translate_multiPass_shouldKeepPassBarrier() {
    let mock = MockProvider::working()
        .with_custom_response(stage_response)
        .with_latency(reverse_latency);
    let splitter = Arc::new(RecordingSplitter::returning(&["one ", "two ", "three"]));
    let service = common::service_with(&mock, fixed(2500), splitter, 3);
    let request = TranslationRequest::new("English", "German", "one two three").with_max_tokens_per_chunk(1000);

    service.translate(&request).await.unwrap();

    let calls = mock.calls();
    assert_eq!(
        stages(&calls),
        vec![
            Stage::Initial,
            Stage::Initial,
            Stage::Initial,
            Stage::Reflection,
            Stage::Reflection,
            Stage::Reflection,
            Stage::Improvement,
            Stage::Improvement,
            Stage::Improvement,
        ]
    );
}

/// Test that concurrent passes keep results in chunk order
#[tokio::test]
async fn test_translate_concurrentPasses_shouldPreserveChunkOrder() {
    let mock = MockProvider::working()
        .with_custom_response(stage_response)
        .with_latency(reverse_latency);
    let splitter = Arc::new(RecordingSplitter::returning(&["one ", "two ", "three"]));
    let service = common::service_with(&mock, fixed(2500), splitter, 3);
    let request = TranslationRequest::new("English", "German", "one two three").with_max_tokens_per_chunk(1000);

    let translation = service.translate(&request).await.unwrap();

    assert_eq!(translation, "t2[one ]t2[two ]t2[three]");

    // Each chunk's reflection and improvement see that chunk's own earlier results
    for call in mock.calls() {
        match stage_of(&call) {
            Stage::Reflection => {
                let chunk = source_of(&call);
                assert!(call.prompt.contains(&format!("<TRANSLATION>\nt1[{}]\n</TRANSLATION>", chunk)));
            }
            Stage::Improvement => {
                let chunk = source_of(&call);
                assert!(call.prompt.contains(&format!("<EXPERT_SUGGESTIONS>\nnotes[{}]\n", chunk)));
            }
            Stage::Initial => {}
        }
    }
}

/// Test that each chunk prompt carries the whole text with only that chunk tagged
#[tokio::test]
async fn test_translate_multiPass_shouldSendTaggedWholeText() {
    let mock = MockProvider::working().with_custom_response(stage_response);
    let splitter = Arc::new(RecordingSplitter::returning(&["one ", "two ", "three"]));
    let service = common::service_with(&mock, fixed(2500), splitter, 1);
    let request = TranslationRequest::new("English", "German", "one two three").with_max_tokens_per_chunk(1000);

    service.translate(&request).await.unwrap();

    let calls = mock.calls();
    assert!(calls[0].prompt.contains("<SOURCE_TEXT>\n<TRANSLATE_THIS>one </TRANSLATE_THIS>two three\n</SOURCE_TEXT>"));
    assert!(calls[1].prompt.contains("<SOURCE_TEXT>\none <TRANSLATE_THIS>two </TRANSLATE_THIS>three\n</SOURCE_TEXT>"));
    assert!(calls[2].prompt.contains("<SOURCE_TEXT>\none two <TRANSLATE_THIS>three</TRANSLATE_THIS>\n</SOURCE_TEXT>"));
}

/// Test that the country only conditions reflection prompts
#[tokio::test]
async fn test_translate_withCountry_shouldConditionReflectionsOnly() {
    let mock = MockProvider::working().with_custom_response(stage_response);
    let splitter = Arc::new(RecordingSplitter::returning(&["one ", "two"]));
    let service = common::service_with(&mock, fixed(1500), splitter, 1);
    let request = TranslationRequest::new("English", "Spanish", "one two")
        .with_country("Mexico")
        .with_max_tokens_per_chunk(1000);

    service.translate(&request).await.unwrap();

    for call in mock.calls() {
        let conditioned = call.prompt.contains("style of Spanish colloquially spoken in Mexico");
        assert_eq!(conditioned, stage_of(&call) == Stage::Reflection, "{}", call.prompt);
    }
}

/// Test that an empty country adds no style sentence anywhere
#[tokio::test]
async fn test_translate_withoutCountry_shouldNotMentionStyle() {
    let mock = MockProvider::working().with_custom_response(stage_response);
    let splitter = Arc::new(RecordingSplitter::returning(&["unused"]));
    let service = common::service_with(&mock, fixed(10), splitter, 1);

    service
        .translate_text("English", "Spanish", "Good morning", "")
        .await
        .unwrap();

    assert!(mock.calls().iter().all(|call| !call.prompt.contains("colloquially")));
}

/// Test that a provider failure in the reflection pass aborts the translation
#[tokio::test]
async fn test_translate_reflectionFailure_shouldReturnWrappedError() {
    let mock = MockProvider::working()
        .with_custom_response(stage_response)
        .fail_when_prompt_contains("give constructive criticism");
    let splitter = Arc::new(RecordingSplitter::returning(&["one ", "two ", "three"]));
    let service = common::service_with(&mock, fixed(2500), splitter, 1);
    let request = TranslationRequest::new("English", "German", "one two three").with_max_tokens_per_chunk(1000);

    let err = service.translate(&request).await.unwrap_err();

    assert!(err.to_string().starts_with("Translation failed:"));
    assert!(err.source().is_some());
    assert!(matches!(err.failure(), Some(TranslationFailure::Provider(_))));
    assert!(mock.calls().iter().all(|call| stage_of(call) != Stage::Improvement));
    assert_eq!(mock.call_count(), 4);
}

/// Test that a single-pass reflection failure stops before improvement and is wrapped
#[tokio::test]
async fn test_translate_singlePassReflectionFailure_shouldReturnWrappedError() {
    let mock = MockProvider::working()
        .with_custom_response(stage_response)
        .fail_when_prompt_contains("give constructive criticism");
    let splitter = Arc::new(RecordingSplitter::returning(&["unused"]));
    let service = common::service_with(&mock, fixed(500), splitter.clone(), 1);
    let request = TranslationRequest::new("English", "Italian", "Good morning.").with_max_tokens_per_chunk(1000);

    let err = service.translate(&request).await.unwrap_err();

    assert!(matches!(err, TranslationError::Failed(TranslationFailure::Provider(_))));
    let message = err.to_string();
    assert!(message.starts_with("Translation failed:"));
    assert!(message.contains("Simulated failure for prompt containing"), "{message}");
    assert_eq!(mock.call_count(), 2);
    assert_eq!(stages(&mock.calls()), vec![Stage::Initial, Stage::Reflection]);
    assert!(splitter.calls().is_empty());
}

/// Test that a single-pass provider failure is wrapped the same way
#[tokio::test]
async fn test_translate_singlePassFailure_shouldReturnWrappedError() {
    let mock = MockProvider::failing();
    let splitter = Arc::new(RecordingSplitter::returning(&["unused"]));
    let service = common::service_with(&mock, fixed(5), splitter, 1);

    let err = service
        .translate_text("English", "French", "Bonjour", "")
        .await
        .unwrap_err();

    assert!(matches!(err, TranslationError::Failed(TranslationFailure::Provider(_))));
    assert_eq!(mock.call_count(), 1);
}

/// Test that tokenizer failures are wrapped and no call is made
#[tokio::test]
async fn test_translate_tokenizerFailure_shouldNotCallProvider() {
    let mock = MockProvider::working();
    let splitter = Arc::new(RecordingSplitter::returning(&["unused"]));
    let service = common::service_with(&mock, Arc::new(BrokenTokenizer), splitter, 1);

    let err = service
        .translate_text("English", "French", "Hello", "")
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("Translation failed:"));
    assert!(matches!(err.failure(), Some(TranslationFailure::Tokenizer(_))));
    assert_eq!(mock.call_count(), 0);
}

/// Test that splitter failures are wrapped and no call is made
#[tokio::test]
async fn test_translate_splitterFailure_shouldNotCallProvider() {
    let mock = MockProvider::working();
    let splitter = Arc::new(RecordingSplitter::failing());
    let service = common::service_with(&mock, fixed(5000), splitter, 1);
    let request = TranslationRequest::new("English", "French", "long").with_max_tokens_per_chunk(1000);

    let err = service.translate(&request).await.unwrap_err();

    assert!(matches!(err.failure(), Some(TranslationFailure::Splitter(_))));
    assert_eq!(mock.call_count(), 0);
}

/// Test that invalid requests are rejected before any work
#[tokio::test]
async fn test_translate_zeroBudget_shouldBeInvalidRequest() {
    let mock = MockProvider::working();
    let splitter = Arc::new(RecordingSplitter::returning(&["unused"]));
    let service = common::service_with(&mock, fixed(5), splitter, 1);
    let request = TranslationRequest::new("English", "French", "Hello").with_max_tokens_per_chunk(0);

    let err = service.translate(&request).await.unwrap_err();

    assert!(matches!(err, TranslationError::InvalidRequest(_)));
    assert_eq!(mock.call_count(), 0);
}

/// Test that an empty improved translation is passed through unchanged
#[tokio::test]
async fn test_translate_emptyResponses_shouldReturnEmptyText() {
    let mock = MockProvider::empty();
    let splitter = Arc::new(RecordingSplitter::returning(&["unused"]));
    let service = common::service_with(&mock, fixed(5), splitter, 1);

    let translation = service
        .translate_text("English", "French", "Hello", "")
        .await
        .unwrap();

    assert_eq!(translation, "");
    assert_eq!(mock.call_count(), 3);
}

/// Test a four-line prompt end to end
#[tokio::test]
async fn test_translate_fromPrompt_shouldUseParsedFields() {
    let mock = MockProvider::working().with_custom_response(stage_response);
    let splitter = Arc::new(RecordingSplitter::returning(&["unused"]));
    let service = common::service_with(&mock, fixed(5), splitter, 1);
    let request =
        TranslationRequest::from_prompt("English\nSpanish\nColombia\nSee you later,\nalligator.", 1000).unwrap();

    let translation = service.translate(&request).await.unwrap();

    assert_eq!(translation, "t2[See you later,\nalligator.]");
    let calls = mock.calls();
    assert!(calls[0].prompt.starts_with("This is a English to Spanish translation"));
    assert!(calls[1].prompt.contains("colloquially spoken in Colombia"));
}

/// Test the plan for a long text with the real encoding
#[test]
fn test_plan_withRealTokenizer_shouldSplitIntoCoveringChunks() {
    let tokenizer: Arc<dyn Tokenizer> = Arc::new(TiktokenTokenizer::cl100k().unwrap());
    let splitter: Arc<dyn TextSplitter> = Arc::new(SemanticTextSplitter::by_tokens(Arc::clone(&tokenizer)));
    let mock = MockProvider::working();
    let service = common::service_with(&mock, Arc::clone(&tokenizer), splitter, 1);
    let text = "The tide came in slowly over the flats.\n\n".repeat(40);
    let request = TranslationRequest::new("English", "French", text.clone()).with_max_tokens_per_chunk(100);

    match service.plan(&request).unwrap() {
        TranslationPlan::MultiPass {
            token_count,
            chunk_size,
            chunks,
        } => {
            assert_eq!(token_count, tokenizer.count_tokens(&text).unwrap());
            assert_eq!(chunk_size, calculate_chunk_size(token_count, 100));
            assert_eq!(chunks.concat(), text);
        }
        TranslationPlan::SinglePass { .. } => panic!("expected a multi pass plan"),
    }
}

/// Test that an identity model reproduces the source exactly through chunking
#[tokio::test]
async fn test_translate_identityModel_shouldReproduceSourceText() {
    let tokenizer: Arc<dyn Tokenizer> = Arc::new(TiktokenTokenizer::cl100k().unwrap());
    let splitter: Arc<dyn TextSplitter> = Arc::new(SemanticTextSplitter::by_tokens(Arc::clone(&tokenizer)));
    let mock = MockProvider::working().with_custom_response(identity_response);
    let service = common::service_with(&mock, tokenizer, splitter, 4);

    let mut text = String::new();
    for paragraph in 1..=12 {
        text.push_str(&format!(
            "Paragraph {paragraph}: the ferry left at dawn, and the gulls followed it out past the breakwater.\n\n"
        ));
    }
    let request = TranslationRequest::new("English", "Spanish", text.clone()).with_max_tokens_per_chunk(60);

    let translation = service.translate(&request).await.unwrap();

    assert_eq!(translation, text);
    assert!(mock.call_count() > 3);
    assert_eq!(mock.call_count() % 3, 0);
}
