#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::rc::Rc;
    use std::task::{Context, Poll, Wake, Waker};

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use wikichat_types::config::GenerationConfig;
    use wikichat_types::event::AssistantEvent;
    use wikichat_types::message::{Message, Role};
    use wikichat_types::provider::{CustomModel, ProviderKey};
    use wikichat_types::session::{Session, DEFAULT_TITLE};
    use wikichat_types::{AssistantError, Result};

    use crate::event_bus::EventBus;
    use crate::generation::{
        history_window, GenerationController, GenerationOutcome, GenerationRequest,
    };
    use crate::ports::*;
    use crate::providers::adapter_for;
    use crate::settings::SettingsStore;
    use crate::store::{ConversationStore, SESSIONS_KEY};

    // ─── Test executor ───────────────────────────────────────

    struct NoopWaker;
    impl Wake for NoopWaker {
        fn wake(self: std::sync::Arc<Self>) {}
    }

    fn noop_waker() -> Waker {
        Waker::from(std::sync::Arc::new(NoopWaker))
    }

    // Simple futures executor for single-threaded tests
    fn block_on<F: Future<Output = T>, T>(f: F) -> T {
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut f = std::pin::pin!(f);

        loop {
            match f.as_mut().poll(&mut cx) {
                Poll::Ready(val) => return val,
                Poll::Pending => std::thread::yield_now(),
            }
        }
    }

    /// Drive a pinned future by exactly one poll — used to park a
    /// generation at the network boundary before cancelling it.
    fn poll_once<F: Future>(fut: &mut Pin<Box<F>>) -> Poll<F::Output> {
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        fut.as_mut().poll(&mut cx)
    }

    // ─── Mock ports ──────────────────────────────────────────

    struct MockStorage {
        data: RefCell<HashMap<String, Vec<u8>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                data: RefCell::new(HashMap::new()),
            }
        }

        fn preload(self, key: &str, value: &[u8]) -> Self {
            self.data
                .borrow_mut()
                .insert(key.to_string(), value.to_vec());
            self
        }
    }

    #[async_trait(?Send)]
    impl StoragePort for MockStorage {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.data.borrow().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
            self.data
                .borrow_mut()
                .insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.data.borrow_mut().remove(key);
            Ok(())
        }

        async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
            Ok(self
                .data
                .borrow()
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect())
        }

        fn backend_name(&self) -> &str {
            "mock"
        }
    }

    /// HTTP mock that records every request and answers with a canned body.
    struct RecordingHttp {
        response: Value,
        requests: RefCell<Vec<ProviderRequest>>,
    }

    impl RecordingHttp {
        fn new(response: Value) -> Rc<Self> {
            Rc::new(Self {
                response,
                requests: RefCell::new(Vec::new()),
            })
        }

        fn last_request(&self) -> ProviderRequest {
            self.requests.borrow().last().cloned().expect("no request")
        }
    }

    #[async_trait(?Send)]
    impl HttpPort for RecordingHttp {
        async fn post_json(&self, req: &ProviderRequest, _cancel: &CancelToken) -> Result<Value> {
            self.requests.borrow_mut().push(req.clone());
            Ok(self.response.clone())
        }
    }

    /// HTTP mock that always fails with a transport error.
    struct ErrorHttp {
        message: String,
    }

    #[async_trait(?Send)]
    impl HttpPort for ErrorHttp {
        async fn post_json(&self, _req: &ProviderRequest, _cancel: &CancelToken) -> Result<Value> {
            Err(AssistantError::Transport(self.message.clone()))
        }
    }

    /// HTTP mock that stays pending until the cancel token fires.
    struct PendingHttp;

    #[async_trait(?Send)]
    impl HttpPort for PendingHttp {
        async fn post_json(&self, _req: &ProviderRequest, cancel: &CancelToken) -> Result<Value> {
            let cancel = cancel.clone();
            futures::future::poll_fn(move |_cx| {
                if cancel.is_cancelled() {
                    Poll::Ready(Err(AssistantError::Cancelled))
                } else {
                    Poll::Pending
                }
            })
            .await
        }
    }

    struct StaticContext;

    impl ContextPort for StaticContext {
        fn wiki_context(&self) -> String {
            "wiki command reference".to_string()
        }
    }

    // ─── Fixtures ────────────────────────────────────────────

    fn new_store() -> (Rc<ConversationStore>, EventBus) {
        new_store_with(MockStorage::new())
    }

    fn new_store_with(storage: MockStorage) -> (Rc<ConversationStore>, EventBus) {
        let bus = EventBus::new();
        let store = Rc::new(ConversationStore::new(Rc::new(storage), bus.clone()));
        block_on(store.init());
        bus.drain();
        (store, bus)
    }

    fn controller_with(
        store: Rc<ConversationStore>,
        http: Rc<dyn HttpPort>,
        bus: EventBus,
    ) -> GenerationController {
        GenerationController::new(store, http, Some(Rc::new(StaticContext)), bus)
    }

    fn openai_cfg() -> GenerationConfig {
        GenerationConfig {
            provider: ProviderKey::OpenAi,
            model: "gpt-4o-mini".to_string(),
            api_key: "test-key".to_string(),
            endpoint: None,
            max_tokens: 1000,
        }
    }

    fn openai_answer(text: &str) -> Value {
        json!({"choices": [{"message": {"content": text}}]})
    }

    // ─── EventBus Tests ──────────────────────────────────────

    #[test]
    fn test_event_bus_emit_and_drain() {
        let bus = EventBus::new();
        assert!(!bus.has_pending());
        bus.emit(AssistantEvent::GenerationStarted);
        bus.emit(AssistantEvent::SessionsChanged);
        assert!(bus.has_pending());
        assert_eq!(bus.drain().len(), 2);
        assert!(!bus.has_pending());
    }

    #[test]
    fn test_event_bus_clone_shares_state() {
        let bus1 = EventBus::new();
        let bus2 = bus1.clone();
        bus1.emit(AssistantEvent::SessionsChanged);
        assert_eq!(bus2.drain().len(), 1);
        assert!(!bus1.has_pending());
    }

    // ─── Store: init ─────────────────────────────────────────

    #[test]
    fn test_init_creates_default_session() {
        let (store, _) = new_store();
        let summaries = store.summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].title, DEFAULT_TITLE);
        assert_eq!(store.active_id(), Some(summaries[0].id.clone()));
    }

    #[test]
    fn test_init_tolerates_corrupt_data() {
        let storage = MockStorage::new().preload(SESSIONS_KEY, b"{{{ not json");
        let (store, _) = new_store_with(storage);
        assert_eq!(store.summaries().len(), 1);
        assert_eq!(store.active().title, DEFAULT_TITLE);
    }

    #[test]
    fn test_init_selects_first_when_active_unset() {
        let a = Session::new("first");
        let b = Session::new("second");
        let first_id = a.id.clone();
        let collection = json!({"sessions": [a, b], "activeSessionId": null});
        let storage =
            MockStorage::new().preload(SESSIONS_KEY, collection.to_string().as_bytes());
        let (store, _) = new_store_with(storage);
        assert_eq!(store.active_id(), Some(first_id));
        assert_eq!(store.summaries().len(), 2);
    }

    // ─── Store: session CRUD ─────────────────────────────────

    #[test]
    fn test_create_session_prepends_and_activates() {
        let (store, _) = new_store();
        let created = block_on(store.create_session(None));
        let summaries = store.summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, created.id);
        assert_eq!(store.active_id(), Some(created.id));
    }

    #[test]
    fn test_delete_last_session_recreates_default() {
        let (store, _) = new_store();
        let id = store.active().id;
        block_on(store.delete_session(&id));
        let summaries = store.summaries();
        assert_eq!(summaries.len(), 1);
        assert_ne!(summaries[0].id, id);
        assert_eq!(store.active_id(), Some(summaries[0].id.clone()));
    }

    #[test]
    fn test_delete_active_session_activates_first() {
        let (store, _) = new_store();
        let old = store.active().id;
        let newer = block_on(store.create_session(None));
        block_on(store.delete_session(&newer.id));
        assert_eq!(store.active_id(), Some(old));
        assert_eq!(store.summaries().len(), 1);
    }

    #[test]
    fn test_delete_inactive_session_keeps_active() {
        let (store, _) = new_store();
        let old = store.active().id;
        let newer = block_on(store.create_session(None));
        block_on(store.delete_session(&old));
        assert_eq!(store.active_id(), Some(newer.id));
    }

    #[test]
    fn test_switch_session_idempotent() {
        let (store, _) = new_store();
        let id = store.active().id;
        assert!(block_on(store.switch_session(&id)));
        assert_eq!(store.active_id(), Some(id));
    }

    #[test]
    fn test_switch_session_unknown_id() {
        let (store, _) = new_store();
        let id = store.active().id;
        assert!(!block_on(store.switch_session("nope")));
        assert_eq!(store.active_id(), Some(id));
    }

    #[test]
    fn test_clear_all_restores_single_default() {
        let (store, _) = new_store();
        block_on(store.append_message(Role::User, "hello"));
        let old = store.active().id;
        block_on(store.clear_all());
        let summaries = store.summaries();
        assert_eq!(summaries.len(), 1);
        assert_ne!(summaries[0].id, old);
        assert!(store.active().messages.is_empty());
    }

    #[test]
    fn test_active_on_uninitialized_store_creates_default() {
        let bus = EventBus::new();
        let store = ConversationStore::new(Rc::new(MockStorage::new()), bus);
        let session = store.active();
        assert_eq!(session.title, DEFAULT_TITLE);
        assert_eq!(store.active_id(), Some(session.id));
    }

    // ─── Store: messages ─────────────────────────────────────

    #[test]
    fn test_append_message_derives_title_from_first_user_message() {
        let (store, _) = new_store();
        block_on(store.append_message(Role::User, "How do I change the background?"));
        let session = store.active();
        assert_eq!(session.title, "How do I change the ...");
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].swipes.len(), 1);
    }

    #[test]
    fn test_title_not_rederived_on_later_messages() {
        let (store, _) = new_store();
        block_on(store.append_message(Role::User, "first"));
        block_on(store.append_message(Role::User, "second question here"));
        assert_eq!(store.active().title, "first");
    }

    #[test]
    fn test_append_message_resorts_sessions() {
        // Two stored sessions with past timestamps, the active one listed
        // second; appending must bump it to the front.
        let collection = json!({
            "sessions": [
                {"id": "b", "title": "b", "messages": [], "lastUpdated": 2000},
                {"id": "a", "title": "a", "messages": [], "lastUpdated": 1000},
            ],
            "activeSessionId": "a",
        });
        let storage =
            MockStorage::new().preload(SESSIONS_KEY, collection.to_string().as_bytes());
        let (store, _) = new_store_with(storage);

        block_on(store.append_message(Role::User, "bump"));
        let summaries = store.summaries();
        assert_eq!(summaries[0].id, "a");
        assert_eq!(summaries[1].id, "b");
    }

    #[test]
    fn test_commit_assistant_variant_overwrites_last() {
        let (store, _) = new_store();
        block_on(store.append_message(Role::User, "q"));
        block_on(store.append_message(Role::Assistant, "A"));
        block_on(store.commit_assistant_variant(
            "B",
            vec!["A".to_string(), "B".to_string()],
            1,
        ));
        let last = store.active().messages.pop().unwrap();
        assert_eq!(last.content, "B");
        assert_eq!(last.swipes, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(last.swipe_index, 1);
        assert_eq!(last.content, last.swipes[last.swipe_index]);
    }

    #[test]
    fn test_commit_assistant_variant_noop_when_last_is_user() {
        let (store, _) = new_store();
        block_on(store.append_message(Role::User, "q"));
        block_on(store.commit_assistant_variant("B", vec!["B".to_string()], 0));
        let last = store.active().messages.pop().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content, "q");
    }

    #[test]
    fn test_select_swipe_persists_selection() {
        let (store, _) = new_store();
        block_on(store.append_message(Role::User, "q"));
        block_on(store.append_message(Role::Assistant, "A"));
        block_on(store.commit_assistant_variant(
            "B",
            vec!["A".to_string(), "B".to_string()],
            1,
        ));
        block_on(store.select_swipe(1, 0));
        let last = store.active().messages.pop().unwrap();
        assert_eq!(last.swipe_index, 0);
        assert_eq!(last.content, "A");
    }

    #[test]
    fn test_edit_message_rewrites_current_swipe() {
        let (store, _) = new_store();
        block_on(store.append_message(Role::User, "qq"));
        block_on(store.edit_message(0, "edited"));
        let msg = store.active().messages.remove(0);
        assert_eq!(msg.content, "edited");
        assert_eq!(msg.swipes, vec!["edited".to_string()]);
        assert_eq!(msg.content, msg.swipes[msg.swipe_index]);
    }

    #[test]
    fn test_delete_message_removes_one() {
        let (store, _) = new_store();
        block_on(store.append_message(Role::User, "q"));
        block_on(store.append_message(Role::Assistant, "a"));
        block_on(store.delete_message(0));
        let messages = store.active().messages;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "a");
    }

    // ─── Store: import / export ──────────────────────────────

    #[test]
    fn test_export_import_roundtrip_preserves_messages() {
        let (store, _) = new_store();
        block_on(store.append_message(Role::User, "What is /if?"));
        block_on(store.append_message(Role::Assistant, "A conditional command."));
        let original = store.active();

        let exported = store.export_session(&original.id).unwrap();
        let imported = block_on(store.import_session(&exported)).unwrap();

        assert_ne!(imported.id, original.id);
        assert!(imported.title.starts_with("[imported] "));
        assert_eq!(imported.messages.len(), original.messages.len());
        for (a, b) in imported.messages.iter().zip(original.messages.iter()) {
            assert_eq!(a.content, b.content);
            assert_eq!(a.role, b.role);
        }
        // The import becomes the active session.
        assert_eq!(store.active_id(), Some(imported.id));
    }

    #[test]
    fn test_export_session_unknown_id_fails() {
        let (store, _) = new_store();
        assert!(store.export_session("missing").is_err());
    }

    #[test]
    fn test_import_session_requires_messages_array() {
        let (store, _) = new_store();
        let before = store.summaries().len();
        let result = block_on(store.import_session(r#"{"title": "x", "messages": 3}"#));
        assert!(matches!(result, Err(AssistantError::Validation(_))));
        assert_eq!(store.summaries().len(), before);
    }

    #[test]
    fn test_import_session_rejects_non_json() {
        let (store, _) = new_store();
        let result = block_on(store.import_session("not json at all"));
        assert!(matches!(result, Err(AssistantError::Validation(_))));
    }

    #[test]
    fn test_import_session_accepts_legacy_bot_role() {
        let (store, _) = new_store();
        let legacy = r#"{
            "title": "old chat",
            "messages": [
                {"role": "user", "content": "hi", "swipes": ["hi"], "swipeIndex": 0, "timestamp": 1},
                {"role": "bot", "content": "hello", "swipes": ["hello"], "swipeIndex": 0, "timestamp": 2}
            ]
        }"#;
        let imported = block_on(store.import_session(legacy)).unwrap();
        assert_eq!(imported.messages[1].role, Role::Assistant);
        assert_eq!(imported.title, "[imported] old chat");
    }

    #[test]
    fn test_import_all_rejects_bad_shape() {
        let (store, _) = new_store();
        block_on(store.append_message(Role::User, "keep me"));
        let result = block_on(store.import_all(r#"{"foo": 1}"#));
        assert!(matches!(result, Err(AssistantError::Validation(_))));
        assert_eq!(store.active().messages.len(), 1);
    }

    #[test]
    fn test_import_all_replaces_collection() {
        let (store, _) = new_store();
        block_on(store.append_message(Role::User, "original"));
        let backup = store.export_all().unwrap();

        let (other, _) = new_store();
        block_on(other.import_all(&backup)).unwrap();
        assert_eq!(other.summaries().len(), 1);
        assert_eq!(other.active().messages[0].content, "original");
    }

    // ─── History windowing ───────────────────────────────────

    fn session_with_turns(n: usize) -> Session {
        let mut session = Session::new(DEFAULT_TITLE);
        for i in 0..n {
            let msg = if i % 2 == 0 {
                Message::user(format!("question {}", i))
            } else {
                Message::assistant(format!("answer {}", i))
            };
            session.messages.push(msg);
        }
        session
    }

    #[test]
    fn test_window_caps_at_ten_oldest_first() {
        let session = session_with_turns(12);
        let window = history_window(&session, "a new question", false);
        assert_eq!(window.len(), 10);
        assert_eq!(window[0].content, "question 2");
        assert_eq!(window[9].content, "answer 11");
    }

    #[test]
    fn test_window_excludes_live_question() {
        let session = session_with_turns(4);
        let window = history_window(&session, "question 2", false);
        assert_eq!(window.len(), 3);
        assert!(window.iter().all(|m| m.content != "question 2"));
    }

    #[test]
    fn test_window_reroll_drops_trailing_assistant() {
        let session = session_with_turns(4);
        let window = history_window(&session, "unrelated", true);
        assert_eq!(window.len(), 3);
        assert_eq!(window.last().unwrap().content, "question 2");
    }

    #[test]
    fn test_window_reroll_keeps_trailing_user() {
        let mut session = session_with_turns(3);
        assert_eq!(session.messages.last().unwrap().role, Role::User);
        let window = history_window(&session, "unrelated", true);
        assert_eq!(window.len(), 3);
        session.messages.clear();
        assert!(history_window(&session, "q", true).is_empty());
    }

    // ─── Generation controller ───────────────────────────────

    #[test]
    fn test_empty_question_rejected_before_transition() {
        let (store, bus) = new_store();
        let http = RecordingHttp::new(openai_answer("unused"));
        let controller = controller_with(store.clone(), http.clone(), bus.clone());

        let result = block_on(controller.generate(
            &openai_cfg(),
            GenerationRequest::Send {
                question: "   ".to_string(),
            },
        ));
        assert!(matches!(result, Err(AssistantError::Validation(_))));
        assert!(!controller.is_generating());
        assert!(store.active().messages.is_empty());
        assert!(http.requests.borrow().is_empty());
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn test_missing_api_key_rejected_before_dispatch() {
        let (store, bus) = new_store();
        let http = RecordingHttp::new(openai_answer("unused"));
        let controller = controller_with(store, http.clone(), bus);

        let mut cfg = openai_cfg();
        cfg.api_key.clear();
        let result = block_on(controller.generate(
            &cfg,
            GenerationRequest::Send {
                question: "hi".to_string(),
            },
        ));
        assert!(matches!(result, Err(AssistantError::Config(_))));
        assert!(http.requests.borrow().is_empty());
    }

    #[test]
    fn test_custom_provider_runs_without_api_key() {
        let (store, bus) = new_store();
        let http = RecordingHttp::new(openai_answer("local answer"));
        let controller = controller_with(store.clone(), http.clone(), bus);

        let cfg = GenerationConfig {
            provider: ProviderKey::Custom,
            model: "local-llama".to_string(),
            api_key: String::new(),
            endpoint: Some("http://localhost:8080/v1".to_string()),
            max_tokens: 500,
        };
        let outcome = block_on(controller.generate(
            &cfg,
            GenerationRequest::Send {
                question: "hi".to_string(),
            },
        ))
        .unwrap();
        assert_eq!(outcome, GenerationOutcome::Completed);

        let req = http.last_request();
        assert_eq!(req.url, "http://localhost:8080/v1/chat/completions");
        assert!(req.headers.iter().all(|(k, _)| k != "Authorization"));
    }

    #[test]
    fn test_fresh_send_appends_user_and_assistant() {
        let (store, bus) = new_store();
        let http = RecordingHttp::new(openai_answer("The /if command branches."));
        let controller = controller_with(store.clone(), http, bus.clone());

        let outcome = block_on(controller.generate(
            &openai_cfg(),
            GenerationRequest::Send {
                question: "What is /if?".to_string(),
            },
        ))
        .unwrap();
        assert_eq!(outcome, GenerationOutcome::Completed);

        let messages = store.active().messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "What is /if?");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "The /if command branches.");
        assert_eq!(messages[1].swipes.len(), 1);

        let events = bus.drain();
        assert!(events
            .iter()
            .any(|e| matches!(e, AssistantEvent::GenerationFinished { .. })));
    }

    #[test]
    fn test_transport_failure_emits_synthetic_error_only() {
        let (store, bus) = new_store();
        let http = Rc::new(ErrorHttp {
            message: "connection refused".to_string(),
        });
        let controller = controller_with(store.clone(), http, bus.clone());

        let outcome = block_on(controller.generate(
            &openai_cfg(),
            GenerationRequest::Send {
                question: "hi".to_string(),
            },
        ))
        .unwrap();
        assert_eq!(outcome, GenerationOutcome::Failed);
        assert!(!controller.is_generating());

        // The user turn persists; no assistant turn is written.
        let messages = store.active().messages;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);

        let events = bus.drain();
        let failed = events.iter().find_map(|e| match e {
            AssistantEvent::GenerationFailed { message } => Some(message.clone()),
            _ => None,
        });
        assert_eq!(failed.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_provider_error_envelope_preserved_verbatim() {
        let (store, bus) = new_store();
        let http = RecordingHttp::new(json!({"error": {"message": "rate limited"}}));
        let controller = controller_with(store, http, bus.clone());

        let outcome = block_on(controller.generate(
            &openai_cfg(),
            GenerationRequest::Send {
                question: "hi".to_string(),
            },
        ))
        .unwrap();
        assert_eq!(outcome, GenerationOutcome::Failed);

        let events = bus.drain();
        let failed = events.iter().find_map(|e| match e {
            AssistantEvent::GenerationFailed { message } => Some(message.clone()),
            _ => None,
        });
        assert_eq!(failed.as_deref(), Some("rate limited"));
    }

    #[test]
    fn test_reroll_appends_swipe_to_target() {
        let (store, bus) = new_store();
        block_on(store.append_message(Role::User, "q"));
        block_on(store.append_message(Role::Assistant, "A"));
        let http = RecordingHttp::new(openai_answer("B"));
        let controller = controller_with(store.clone(), http.clone(), bus);

        let outcome = block_on(
            controller.generate(&openai_cfg(), GenerationRequest::Reroll { target: 1 }),
        )
        .unwrap();
        assert_eq!(outcome, GenerationOutcome::Completed);

        let messages = store.active().messages;
        assert_eq!(messages.len(), 2, "reroll must not add a turn");
        let last = &messages[1];
        assert_eq!(last.swipes, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(last.swipe_index, 1);
        assert_eq!(last.content, "B");

        // The replaced variant and the echoed prompt stay out of the
        // upstream history: only the system turn and the live question.
        let body = http.last_request().body;
        let sent = body["messages"].as_array().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0]["role"], "system");
        assert_eq!(sent[1]["content"], "q");
    }

    #[test]
    fn test_reroll_without_any_user_turn_rejected() {
        let (store, bus) = new_store();
        let http = RecordingHttp::new(openai_answer("unused"));
        let controller = controller_with(store, http, bus);

        let result = block_on(
            controller.generate(&openai_cfg(), GenerationRequest::Reroll { target: 0 }),
        );
        assert!(matches!(result, Err(AssistantError::Validation(_))));
    }

    #[test]
    fn test_window_sent_upstream_caps_at_ten() {
        let (store, bus) = new_store();
        for i in 0..12 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            block_on(store.append_message(role, &format!("turn {}", i)));
        }
        let http = RecordingHttp::new(openai_answer("ok"));
        let controller = controller_with(store, http.clone(), bus);

        block_on(controller.generate(
            &openai_cfg(),
            GenerationRequest::Send {
                question: "the live question".to_string(),
            },
        ))
        .unwrap();

        let body = http.last_request().body;
        let sent = body["messages"].as_array().unwrap();
        // system + 10 history + live question
        assert_eq!(sent.len(), 12);
        assert_eq!(sent[1]["content"], "turn 2");
        assert_eq!(sent[10]["content"], "turn 11");
        assert_eq!(sent[11]["content"], "the live question");
    }

    #[test]
    fn test_stop_mid_generation_is_silent() {
        let (store, bus) = new_store();
        let controller = controller_with(store.clone(), Rc::new(PendingHttp), bus.clone());
        let cfg = openai_cfg();

        let mut fut = Box::pin(controller.generate(
            &cfg,
            GenerationRequest::Send {
                question: "hi".to_string(),
            },
        ));
        assert!(poll_once(&mut fut).is_pending());
        assert!(controller.is_generating());

        controller.request_stop();
        match poll_once(&mut fut) {
            Poll::Ready(Ok(GenerationOutcome::Cancelled)) => {}
            other => panic!("expected cancelled outcome, got {:?}", other.is_ready()),
        }
        drop(fut);

        assert!(!controller.is_generating());
        // Only the user turn exists; nothing else was persisted.
        assert_eq!(store.active().messages.len(), 1);
        let events = bus.drain();
        assert!(events
            .iter()
            .any(|e| matches!(e, AssistantEvent::GenerationCancelled)));
        assert!(!events
            .iter()
            .any(|e| matches!(e, AssistantEvent::GenerationFailed { .. })));
    }

    #[test]
    fn test_second_invocation_acts_as_stop_request() {
        let (store, bus) = new_store();
        let controller = controller_with(store, Rc::new(PendingHttp), bus);
        let cfg = openai_cfg();

        let mut first = Box::pin(controller.generate(
            &cfg,
            GenerationRequest::Send {
                question: "first".to_string(),
            },
        ));
        assert!(poll_once(&mut first).is_pending());

        let second = block_on(controller.generate(
            &cfg,
            GenerationRequest::Send {
                question: "second".to_string(),
            },
        ))
        .unwrap();
        assert_eq!(second, GenerationOutcome::StopRequested);

        match poll_once(&mut first) {
            Poll::Ready(Ok(GenerationOutcome::Cancelled)) => {}
            _ => panic!("first call should resolve cancelled"),
        }
        assert!(!controller.is_generating());
    }

    // ─── Provider dispatch ───────────────────────────────────

    #[test]
    fn test_google_request_shape() {
        let (store, bus) = new_store();
        block_on(store.append_message(Role::User, "earlier question"));
        block_on(store.append_message(Role::Assistant, "earlier answer"));
        let http = RecordingHttp::new(
            json!({"candidates": [{"content": {"parts": [{"text": "ok"}]}}]}),
        );
        let controller = controller_with(store, http.clone(), bus);

        let cfg = GenerationConfig {
            provider: ProviderKey::Google,
            model: "gemini-2.5-flash".to_string(),
            api_key: "g-key-123".to_string(),
            endpoint: None,
            max_tokens: 800,
        };
        block_on(controller.generate(
            &cfg,
            GenerationRequest::Send {
                question: "next question".to_string(),
            },
        ))
        .unwrap();

        let req = http.last_request();
        assert!(req.url.contains("gemini-2.5-flash:generateContent"));
        assert!(req.url.contains("key=g-key-123"));
        assert!(req.headers.iter().all(|(k, _)| k != "Authorization"));

        let contents = req.body["contents"].as_array().unwrap();
        // system instruction + 2 history + live question
        assert_eq!(contents.len(), 4);
        assert!(contents[0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("[System Instruction]\n"));
        assert_eq!(contents[2]["role"], "model");
        assert!(contents.iter().all(|c| c["role"] != "assistant"));
        assert_eq!(req.body["generationConfig"]["maxOutputTokens"], 800);
    }

    #[test]
    fn test_anthropic_request_shape() {
        let (store, bus) = new_store();
        let http = RecordingHttp::new(json!({"content": [{"text": "ok"}]}));
        let controller = controller_with(store, http.clone(), bus);

        let cfg = GenerationConfig {
            provider: ProviderKey::Anthropic,
            model: "claude-3-5-haiku-20241022".to_string(),
            api_key: "a-key".to_string(),
            endpoint: None,
            max_tokens: 1000,
        };
        block_on(controller.generate(
            &cfg,
            GenerationRequest::Send {
                question: "hello".to_string(),
            },
        ))
        .unwrap();

        let req = http.last_request();
        assert_eq!(req.url, "https://api.anthropic.com/v1/messages");
        assert!(req
            .headers
            .iter()
            .any(|(k, v)| k == "x-api-key" && v == "a-key"));
        assert!(req
            .headers
            .iter()
            .any(|(k, v)| k == "anthropic-version" && v == "2023-06-01"));
        // System prompt is a top-level field, never a message.
        assert!(req.body["system"].is_string());
        let messages = req.body["messages"].as_array().unwrap();
        assert!(messages.iter().all(|m| m["role"] != "system"));
    }

    #[test]
    fn test_openai_request_shape() {
        let (store, bus) = new_store();
        let http = RecordingHttp::new(openai_answer("ok"));
        let controller = controller_with(store, http.clone(), bus);

        block_on(controller.generate(
            &openai_cfg(),
            GenerationRequest::Send {
                question: "hello".to_string(),
            },
        ))
        .unwrap();

        let req = http.last_request();
        assert_eq!(req.url, "https://api.openai.com/v1/chat/completions");
        assert!(req
            .headers
            .iter()
            .any(|(k, v)| k == "Authorization" && v == "Bearer test-key"));
        let messages = req.body["messages"].as_array().unwrap();
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(
            messages[0]["content"],
            "wiki command reference"
        );
        assert_eq!(req.body["max_tokens"], 1000);
    }

    // ─── Adapter parsing ─────────────────────────────────────

    #[test]
    fn test_adapters_extract_text() {
        let openai = adapter_for(ProviderKey::OpenAi);
        assert_eq!(
            openai.parse_response(&openai_answer("hi")).unwrap(),
            "hi"
        );

        let anthropic = adapter_for(ProviderKey::Anthropic);
        assert_eq!(
            anthropic
                .parse_response(&json!({"content": [{"text": "hi"}]}))
                .unwrap(),
            "hi"
        );

        let google = adapter_for(ProviderKey::Google);
        assert_eq!(
            google
                .parse_response(
                    &json!({"candidates": [{"content": {"parts": [{"text": "hi"}]}}]})
                )
                .unwrap(),
            "hi"
        );
    }

    #[test]
    fn test_adapters_reject_malformed_response() {
        for key in [
            ProviderKey::OpenAi,
            ProviderKey::Anthropic,
            ProviderKey::Google,
        ] {
            let result = adapter_for(key).parse_response(&json!({"unexpected": true}));
            assert!(matches!(result, Err(AssistantError::Transport(_))));
        }
    }

    #[test]
    fn test_adapter_error_without_message_field() {
        let result = adapter_for(ProviderKey::OpenAi)
            .parse_response(&json!({"error": "something broke"}));
        match result {
            Err(AssistantError::Transport(m)) => assert!(m.contains("something broke")),
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[test]
    fn test_completions_suffix_not_doubled() {
        let cfg = GenerationConfig {
            provider: ProviderKey::Custom,
            model: "m".to_string(),
            api_key: String::new(),
            endpoint: Some("http://host/v1/chat/completions".to_string()),
            max_tokens: 100,
        };
        let req = adapter_for(ProviderKey::Custom).build_request(&[], "q", "", &cfg);
        assert_eq!(req.url, "http://host/v1/chat/completions");
    }

    // ─── Settings ────────────────────────────────────────────

    #[test]
    fn test_settings_defaults_on_empty_storage() {
        let settings = SettingsStore::new(Rc::new(MockStorage::new()));
        let loaded = block_on(settings.load());
        assert_eq!(loaded.provider, ProviderKey::OpenAi);
        assert!(!loaded.model.is_empty());
        assert_eq!(loaded.max_tokens, 1000);
        assert!(loaded.custom_models.is_empty());
    }

    #[test]
    fn test_settings_roundtrip() {
        let settings = SettingsStore::new(Rc::new(MockStorage::new()));
        block_on(settings.save_provider(ProviderKey::Google));
        block_on(settings.save_model("gemini-2.5-pro"));
        block_on(settings.save_max_tokens(2048));

        let loaded = block_on(settings.load());
        assert_eq!(loaded.provider, ProviderKey::Google);
        assert_eq!(loaded.model, "gemini-2.5-pro");
        assert_eq!(loaded.max_tokens, 2048);
    }

    #[test]
    fn test_api_keys_namespaced_per_provider() {
        let settings = SettingsStore::new(Rc::new(MockStorage::new()));
        block_on(settings.save_api_key(ProviderKey::OpenAi, "sk-openai "));
        block_on(settings.save_api_key(ProviderKey::Anthropic, "sk-ant"));

        assert_eq!(
            block_on(settings.api_key(ProviderKey::OpenAi)),
            "sk-openai"
        );
        assert_eq!(block_on(settings.api_key(ProviderKey::Anthropic)), "sk-ant");
        assert!(block_on(settings.api_key(ProviderKey::Google)).is_empty());
    }

    #[test]
    fn test_custom_model_duplicate_name_rejected() {
        let settings = SettingsStore::new(Rc::new(MockStorage::new()));
        let model = CustomModel {
            name: "local".to_string(),
            endpoint: "http://localhost:8080/v1".to_string(),
        };
        block_on(settings.add_custom_model(model.clone())).unwrap();
        let result = block_on(settings.add_custom_model(model));
        assert!(matches!(result, Err(AssistantError::Validation(_))));
        assert_eq!(block_on(settings.custom_models()).len(), 1);
    }

    #[test]
    fn test_custom_model_remove() {
        let settings = SettingsStore::new(Rc::new(MockStorage::new()));
        block_on(settings.add_custom_model(CustomModel {
            name: "local".to_string(),
            endpoint: String::new(),
        }))
        .unwrap();
        block_on(settings.remove_custom_model("local"));
        assert!(block_on(settings.custom_models()).is_empty());
    }
}
