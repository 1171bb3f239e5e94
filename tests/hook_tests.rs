use llm_usage_hook::host::{FileStore, KvStore, MemoryNotifier, MemoryStore};
use llm_usage_hook::models::{aggregate_key, HostRequest, HostResponse};
use llm_usage_hook::services::{Degradation, StatsStore, UsageHook};
use tempfile::TempDir;

fn openai_request(id: Option<&str>) -> HostRequest {
    HostRequest {
        url: "https://api.openai.com/v1/chat/completions".to_string(),
        body: r#"{"model":"gpt-x"}"#.to_string(),
        id: id.map(str::to_string),
    }
}

fn response(body: &str) -> HostResponse {
    HostResponse {
        body: body.to_string(),
    }
}

#[test]
fn fenced_results_payload_scenario() {
    // Request {"model":"gpt-x"} with no id, then a response whose content
    // wraps {"results":[1,2,3]} in a json code fence: 3 records, 15 tokens,
    // model gpt-x.
    let store = MemoryStore::new();
    let notifier = MemoryNotifier::new();
    let hook = UsageHook::new(&store, &notifier);

    let req = openai_request(None);
    let outcome = hook.handle_request(&req);
    assert_eq!(outcome.degradations, vec![Degradation::MissingRequestId]);

    let body = concat!(
        r#"{"model":"gpt-x","usage":{"prompt_tokens":10,"completion_tokens":5},"#,
        r#""choices":[{"message":{"content":"```json\n{\"results\":[1,2,3]}\n```"}}]}"#
    );
    let outcome = hook.handle_response(&req, &response(body));
    assert!(outcome.notified);
    assert!(outcome.degradations.is_empty());

    let history = StatsStore::new(&store).read_history();
    let record = &history.by_key[&aggregate_key("OpenAI", "gpt-x")];
    assert_eq!(record.request_count, 1);
    assert_eq!(record.total_records, 3);
    assert_eq!(record.total_tokens, 15);

    let posted = notifier.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].title, "LLM Usage | OpenAI");
    assert!(posted[0].body.contains("Model: gpt-x"));
    assert!(posted[0].body.contains("Records: 3"));
    assert!(posted[0].body.contains("Tokens: 15 (P10/C5)"));
}

#[test]
fn gemini_candidates_scenario() {
    let store = MemoryStore::new();
    let notifier = MemoryNotifier::new();
    let hook = UsageHook::new(&store, &notifier);

    let req = HostRequest {
        url: "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
            .to_string(),
        body: r#"{"contents":[{"parts":[{"text":"list two"}]}]}"#.to_string(),
        id: Some("g-1".to_string()),
    };
    hook.handle_request(&req);
    hook.handle_response(
        &req,
        &response(r#"{"candidates":[{"content":{"parts":[{"text":"[1,2]"}]}}]}"#),
    );

    let history = StatsStore::new(&store).read_history();
    let record = &history.by_key[&aggregate_key("Google", "Unknown")];
    assert_eq!(record.total_records, 2);
    assert_eq!(record.request_count, 1);
}

#[test]
fn empty_object_response_counts_request_but_no_records() {
    let store = MemoryStore::new();
    let notifier = MemoryNotifier::new();
    let hook = UsageHook::new(&store, &notifier);

    let req = openai_request(Some("e-1"));
    hook.handle_request(&req);
    hook.handle_response(&req, &response("{}"));

    let history = StatsStore::new(&store).read_history();
    let record = &history.by_key[&aggregate_key("OpenAI", "gpt-x")];
    assert_eq!(record.request_count, 1);
    assert_eq!(record.total_records, 0);
    assert!(notifier.posted()[0].body.contains("Records: 0"));
}

#[test]
fn request_count_reaches_n_with_and_without_usage() {
    let store = MemoryStore::new();
    let notifier = MemoryNotifier::new();
    let hook = UsageHook::new(&store, &notifier);

    let bodies = [
        r#"{"usage":{"prompt_tokens":1,"completion_tokens":1}}"#,
        "{}",
        r#"{"usage":{"prompt_tokens":2,"completion_tokens":2}}"#,
        "{}",
        "{}",
    ];
    for (i, body) in bodies.iter().enumerate() {
        let req = openai_request(Some(&format!("n-{i}")));
        hook.handle_request(&req);
        hook.handle_response(&req, &response(body));
    }

    let history = StatsStore::new(&store).read_history();
    let record = &history.by_key[&aggregate_key("OpenAI", "gpt-x")];
    assert_eq!(record.request_count, bodies.len() as u64);
    assert_eq!(record.total_tokens, 6);
    assert_eq!(notifier.posted().len(), bodies.len());
}

#[test]
fn response_without_request_leg_degrades_to_unknown_duration() {
    let store = MemoryStore::new();
    let notifier = MemoryNotifier::new();
    let hook = UsageHook::new(&store, &notifier);

    let outcome = hook.handle_response(&openai_request(Some("lost")), &response("{}"));
    assert!(outcome.notified);
    assert!(outcome
        .degradations
        .contains(&Degradation::MissingPendingRecord));
    assert!(notifier.posted()[0].body.contains("Duration: unknown"));

    // Model comes from the response body when the start record is gone.
    let outcome = hook.handle_response(
        &openai_request(Some("lost-2")),
        &response(r#"{"model":"gpt-y"}"#),
    );
    assert!(outcome.notified);
    assert!(notifier.posted()[1].body.contains("Model: gpt-y"));
}

#[test]
fn non_json_response_notifies_once_without_fabricated_figures() {
    let store = MemoryStore::new();
    let notifier = MemoryNotifier::new();
    let hook = UsageHook::new(&store, &notifier);

    let req = openai_request(Some("bad-1"));
    hook.handle_request(&req);
    let outcome = hook.handle_response(&req, &response("upstream error: socket closed"));

    assert!(outcome.notified);
    assert!(outcome
        .degradations
        .contains(&Degradation::UnparseableResponseBody));

    let posted = notifier.posted();
    assert_eq!(posted.len(), 1);
    assert!(!posted[0].body.contains("Tokens:"));
    assert!(posted[0].body.contains("Records: 0"));

    // The aggregate still counts the completed exchange.
    let history = StatsStore::new(&store).read_history();
    let record = &history.by_key[&aggregate_key("OpenAI", "gpt-x")];
    assert_eq!(record.request_count, 1);
}

#[test]
fn pending_records_are_cleared_after_the_response_leg() {
    let store = MemoryStore::new();
    let notifier = MemoryNotifier::new();
    let hook = UsageHook::new(&store, &notifier);

    for i in 0..3 {
        let req = openai_request(Some(&format!("c-{i}")));
        hook.handle_request(&req);
        hook.handle_response(&req, &response("{}"));
    }

    // Only the durable history key remains; no per-request leftovers.
    assert!(store.read("llmhook_req_c-0").is_none());
    assert!(store.read("llmhook_req_c-1").is_none());
    assert!(store.read("llmhook_req_c-2").is_none());
    assert_eq!(store.len(), 1);
}

#[test]
fn overlapping_exchanges_with_distinct_ids_keep_their_own_models() {
    let store = MemoryStore::new();
    let notifier = MemoryNotifier::new();
    let hook = UsageHook::new(&store, &notifier);

    let req_a = HostRequest {
        body: r#"{"model":"model-a"}"#.to_string(),
        ..openai_request(Some("a"))
    };
    let req_b = HostRequest {
        body: r#"{"model":"model-b"}"#.to_string(),
        ..openai_request(Some("b"))
    };

    hook.handle_request(&req_a);
    hook.handle_request(&req_b);
    // Responses arrive out of order.
    hook.handle_response(&req_b, &response("{}"));
    hook.handle_response(&req_a, &response("{}"));

    let posted = notifier.posted();
    assert!(posted[0].body.contains("Model: model-b"));
    assert!(posted[1].body.contains("Model: model-a"));
}

#[test]
fn aggregate_average_after_100_and_300_ms_is_200() {
    let store = MemoryStore::new();
    let stats = StatsStore::new(&store);

    stats.update("OpenAI", "gpt-x", Some(100.0), 0, 0);
    let record = stats.update("OpenAI", "gpt-x", Some(300.0), 0, 0);
    assert_eq!(record.avg_ms, 200.0);
}

#[test]
fn file_store_end_to_end_flow() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::new(temp_dir.path()).unwrap();
    let notifier = MemoryNotifier::new();
    let hook = UsageHook::new(&store, &notifier);

    let req = openai_request(Some("fs-1"));
    hook.handle_request(&req);
    hook.handle_response(
        &req,
        &response(r#"{"usage":{"prompt_tokens":7,"completion_tokens":3}}"#),
    );

    // Statistics survive reopening the store.
    drop(store);
    let store = FileStore::new(temp_dir.path()).unwrap();
    let history = StatsStore::new(&store).read_history();
    let record = &history.by_key[&aggregate_key("OpenAI", "gpt-x")];
    assert_eq!(record.request_count, 1);
    assert_eq!(record.total_tokens, 10);

    // The pending record file was cleared on the response leg.
    assert!(store.read("llmhook_req_fs-1").is_none());
}

#[test]
fn no_id_exchanges_share_one_correlation_slot() {
    let store = MemoryStore::new();
    let notifier = MemoryNotifier::new();
    let hook = UsageHook::new(&store, &notifier);

    let req_a = HostRequest {
        body: r#"{"model":"model-a"}"#.to_string(),
        ..openai_request(None)
    };
    let req_b = HostRequest {
        body: r#"{"model":"model-b"}"#.to_string(),
        ..openai_request(None)
    };

    // Documented cross-talk: the second request overwrites the first in
    // the shared NO_ID slot.
    hook.handle_request(&req_a);
    hook.handle_request(&req_b);
    hook.handle_response(&req_a, &response("{}"));

    let posted = notifier.posted();
    assert!(posted[0].body.contains("Model: model-b"));

    // The slot was consumed; the orphaned first request now reports an
    // unknown duration.
    let outcome = hook.handle_response(&req_b, &response("{}"));
    assert!(outcome
        .degradations
        .contains(&Degradation::MissingPendingRecord));
}
