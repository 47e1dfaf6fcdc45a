//! Integration tests for the code generator contract.

use std::sync::Arc;

use forge_core::{EventKind, GenerationRequest, ProgressStream, RecordingSink};
use forge_llm::{
    extract_code, CodeGenerator, MockCodeGenerator, MockDelays, StructuralValidator,
};

fn mock() -> Arc<dyn CodeGenerator> {
    Arc::new(MockCodeGenerator::new().with_delays(MockDelays::none()))
}

/// The mock's output satisfies the same structural check the model-backed
/// generator enforces.
#[tokio::test]
async fn test_mock_output_is_structurally_valid() {
    let generator = mock();
    let stream = Arc::new(ProgressStream::new());
    let request = GenerationRequest::new("g1", "An NFT collection with royalties", "nft");

    let code = generator.generate(&request, &stream.emitter("g1")).await.unwrap();
    assert!(StructuralValidator::new().check(&code).is_ok());
    assert_eq!(extract_code(&code), code.trim());
}

/// Generation never emits terminal events; those belong to the session.
#[tokio::test]
async fn test_generate_emits_no_terminal_event() {
    let generator = mock();
    let stream = Arc::new(ProgressStream::new());
    let sink = RecordingSink::new();
    stream.attach("g2", Arc::new(sink.clone()));

    let request = GenerationRequest::new("g2", "A DAO", "dao");
    generator.generate(&request, &stream.emitter("g2")).await.unwrap();

    assert_eq!(sink.count(EventKind::Complete), 0);
    assert_eq!(sink.count(EventKind::Error), 0);
    assert_eq!(sink.count(EventKind::Status), 4);
}

/// Concurrent sessions on one generator stay isolated.
#[tokio::test]
async fn test_concurrent_sessions_isolated() {
    let generator = Arc::new(MockCodeGenerator::new().with_delays(MockDelays::scaled(0.01)));
    let stream = Arc::new(ProgressStream::new());
    let sinks: Vec<RecordingSink> = (0..4).map(|_| RecordingSink::new()).collect();
    for (i, sink) in sinks.iter().enumerate() {
        stream.attach(&format!("c{}", i), Arc::new(sink.clone()));
    }

    let mut tasks = Vec::new();
    for i in 0..4 {
        let generator = Arc::clone(&generator);
        let emitter = stream.emitter(format!("c{}", i));
        tasks.push(tokio::spawn(async move {
            let request = GenerationRequest::new(format!("c{}", i), "A token", "token");
            generator.generate(&request, &emitter).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    for sink in &sinks {
        assert_eq!(sink.count(EventKind::Connected), 1);
        assert_eq!(sink.count(EventKind::Status), 4);
    }
}
