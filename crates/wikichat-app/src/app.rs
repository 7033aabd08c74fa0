//! Main egui application — composes the panels and wires the core to the
//! browser adapters.

use std::cell::RefCell;
use std::rc::Rc;

use egui::{self, CentralPanel, RichText, SidePanel, TopBottomPanel};

use wikichat_core::event_bus::EventBus;
use wikichat_core::generation::{GenerationController, GenerationRequest};
use wikichat_core::ports::ContextPort;
use wikichat_core::settings::{Settings, SettingsStore};
use wikichat_core::store::ConversationStore;
use wikichat_platform::context::JsContext;
use wikichat_platform::download::download_json;
use wikichat_platform::http::FetchHttp;
use wikichat_platform::storage::detect_storage;
use wikichat_types::event::AssistantEvent;
use wikichat_types::session::export_file_name;
use wikichat_ui::panels::chat::{chat_panel, ChatAction};
use wikichat_ui::panels::settings::{settings_panel, SettingsAction};
use wikichat_ui::panels::sidebar::{sidebar_panel, SidebarAction};
use wikichat_ui::state::{SettingsState, UiState};
use wikichat_ui::theme;

/// Global function the host page installs to supply wiki context.
const CONTEXT_HOOK: &str = "wikiContext";

pub struct AssistantApp {
    ui_state: UiState,
    settings_state: SettingsState,
    store: Rc<ConversationStore>,
    settings: Rc<SettingsStore>,
    controller: Rc<GenerationController>,
    events: EventBus,
    /// Async restore slots, filled by spawned futures and applied on the
    /// next frame.
    settings_slot: Rc<RefCell<Option<(Settings, String)>>>,
    api_key_slot: Rc<RefCell<Option<String>>>,
    first_frame: bool,
}

impl AssistantApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let events = EventBus::new();
        let storage = detect_storage();
        let store = Rc::new(ConversationStore::new(storage.clone(), events.clone()));
        let settings = Rc::new(SettingsStore::new(storage));

        let context = JsContext::from_window(CONTEXT_HOOK)
            .map(|c| Rc::new(c) as Rc<dyn ContextPort>);
        if context.is_none() {
            log::warn!("no {} hook on window; answering without wiki context", CONTEXT_HOOK);
        }

        let controller = Rc::new(GenerationController::new(
            store.clone(),
            Rc::new(FetchHttp::new()),
            context,
            events.clone(),
        ));

        // Restore persisted state in the background.
        {
            let store = store.clone();
            wasm_bindgen_futures::spawn_local(async move {
                store.init().await;
            });
        }
        let settings_slot = Rc::new(RefCell::new(None));
        {
            let settings = settings.clone();
            let slot = settings_slot.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let loaded = settings.load().await;
                let api_key = settings.api_key(loaded.provider).await;
                *slot.borrow_mut() = Some((loaded, api_key));
            });
        }

        Self {
            ui_state: UiState::new(),
            settings_state: SettingsState::new(),
            store,
            settings,
            controller,
            events,
            settings_slot,
            api_key_slot: Rc::new(RefCell::new(None)),
            first_frame: true,
        }
    }

    fn apply_restored_state(&mut self) {
        if let Some((settings, api_key)) = self.settings_slot.borrow_mut().take() {
            self.settings_state.provider = settings.provider;
            self.settings_state.model = settings.model;
            self.settings_state.max_tokens = settings.max_tokens;
            self.settings_state.custom_models = settings.custom_models;
            self.settings_state.api_key = api_key;
        }
        if let Some(api_key) = self.api_key_slot.borrow_mut().take() {
            self.settings_state.api_key = api_key;
        }
    }

    // ─── Dispatch ────────────────────────────────────────────

    fn start_generation(&self, request: GenerationRequest) {
        let cfg = self.settings_state.generation_config();
        let controller = self.controller.clone();
        let events = self.events.clone();
        wasm_bindgen_futures::spawn_local(async move {
            // Pre-flight rejections never enter the lifecycle, so they are
            // surfaced here instead of through the controller's events.
            if let Err(e) = controller.generate(&cfg, request).await {
                events.emit(AssistantEvent::GenerationFailed {
                    message: e.to_string(),
                });
            }
        });
    }

    fn dispatch_chat(&mut self, action: ChatAction) {
        match action {
            ChatAction::Send(text) => {
                self.start_generation(GenerationRequest::Send { question: text });
            }
            ChatAction::Stop => self.controller.request_stop(),
            ChatAction::Reroll { message_index } => {
                self.start_generation(GenerationRequest::Reroll {
                    target: message_index,
                });
            }
            ChatAction::SwipeTo {
                message_index,
                swipe_index,
            } => {
                let store = self.store.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    store.select_swipe(message_index, swipe_index).await;
                });
            }
        }
    }

    fn dispatch_sidebar(&mut self, action: SidebarAction) {
        match action {
            SidebarAction::NewChat => {
                let store = self.store.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    store.create_session(None).await;
                });
            }
            SidebarAction::Switch(id) => {
                let store = self.store.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    store.switch_session(&id).await;
                });
            }
            SidebarAction::Delete(id) => {
                let store = self.store.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    store.delete_session(&id).await;
                });
            }
            SidebarAction::ExportSession(id) => self.export_session(&id),
            SidebarAction::ExportAll => self.export_all(),
            SidebarAction::ImportSession(text) => {
                let store = self.store.clone();
                let events = self.events.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    if let Err(e) = store.import_session(&text).await {
                        events.emit(AssistantEvent::OperationFailed {
                            message: e.to_string(),
                        });
                    }
                });
            }
            SidebarAction::ImportAll(text) => {
                let store = self.store.clone();
                let events = self.events.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    if let Err(e) = store.import_all(&text).await {
                        events.emit(AssistantEvent::OperationFailed {
                            message: e.to_string(),
                        });
                    }
                });
            }
            SidebarAction::ClearAll => {
                let store = self.store.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    store.clear_all().await;
                });
            }
        }
    }

    fn export_session(&self, id: &str) {
        let title = self
            .store
            .summaries()
            .into_iter()
            .find(|s| s.id == id)
            .map(|s| s.title)
            .unwrap_or_default();
        let result = self.store.export_session(id).and_then(|json| {
            let date = chrono::Utc::now().format("%Y-%m-%d").to_string();
            download_json(&export_file_name(&title, &date), &json)
        });
        if let Err(e) = result {
            self.events.emit(AssistantEvent::OperationFailed {
                message: e.to_string(),
            });
        }
    }

    fn export_all(&self) {
        let result = self.store.export_all().and_then(|json| {
            let date = chrono::Utc::now().format("%Y-%m-%d").to_string();
            download_json(&format!("wikichat_backup_{}.json", date), &json)
        });
        if let Err(e) = result {
            self.events.emit(AssistantEvent::OperationFailed {
                message: e.to_string(),
            });
        }
    }

    fn dispatch_settings(&mut self, action: SettingsAction) {
        let settings = self.settings.clone();
        match action {
            SettingsAction::None => {}
            SettingsAction::ProviderChanged => {
                let provider = self.settings_state.provider;
                let model = self.settings_state.model.clone();
                let slot = self.api_key_slot.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    settings.save_provider(provider).await;
                    settings.save_model(&model).await;
                    *slot.borrow_mut() = Some(settings.api_key(provider).await);
                });
            }
            SettingsAction::ModelChanged => {
                let model = self.settings_state.model.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    settings.save_model(&model).await;
                });
            }
            SettingsAction::MaxTokensChanged => {
                let max_tokens = self.settings_state.max_tokens;
                wasm_bindgen_futures::spawn_local(async move {
                    settings.save_max_tokens(max_tokens).await;
                });
            }
            SettingsAction::SaveApiKey => {
                let provider = self.settings_state.provider;
                let key = self.settings_state.api_key.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    settings.save_api_key(provider, &key).await;
                });
            }
            SettingsAction::AddCustomModel(model) => {
                if self
                    .settings_state
                    .custom_models
                    .iter()
                    .any(|m| m.name == model.name)
                {
                    self.events.emit(AssistantEvent::OperationFailed {
                        message: format!("a model named \"{}\" already exists", model.name),
                    });
                    return;
                }
                self.settings_state.custom_models.push(model.clone());
                let events = self.events.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    if let Err(e) = settings.add_custom_model(model).await {
                        events.emit(AssistantEvent::OperationFailed {
                            message: e.to_string(),
                        });
                    }
                });
            }
            SettingsAction::RemoveCustomModel(name) => {
                self.settings_state.custom_models.retain(|m| m.name != name);
                wasm_bindgen_futures::spawn_local(async move {
                    settings.remove_custom_model(&name).await;
                });
            }
        }
    }
}

impl eframe::App for AssistantApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.first_frame {
            theme::apply_theme(ctx);
            self.first_frame = false;
        }

        self.apply_restored_state();

        let events = self.events.drain();
        if !events.is_empty() {
            self.ui_state.process_events(events);
            ctx.request_repaint();
        }
        if self.ui_state.is_busy() {
            ctx.request_repaint();
        }

        // ── Top bar ──────────────────────────────────────────
        TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.small_button("=").on_hover_text("Sessions").clicked() {
                    self.ui_state.show_sidebar = !self.ui_state.show_sidebar;
                }
                ui.label(
                    RichText::new("Wiki Assistant")
                        .strong()
                        .color(theme::ACCENT)
                        .size(16.0),
                );
                ui.separator();
                ui.label(
                    RichText::new(format!(
                        "{} | {}",
                        self.settings_state.provider.label(),
                        self.settings_state.model
                    ))
                    .color(theme::TEXT_SECONDARY)
                    .small(),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .selectable_label(self.ui_state.show_settings, "Settings")
                        .clicked()
                    {
                        self.ui_state.show_settings = !self.ui_state.show_settings;
                    }
                });
            });
        });

        // ── Session sidebar ──────────────────────────────────
        if self.ui_state.show_sidebar {
            let summaries = self.store.summaries();
            let active_id = self.store.active_id();
            let mut sidebar_action = None;
            SidePanel::left("session_sidebar")
                .min_width(180.0)
                .max_width(260.0)
                .show(ctx, |ui| {
                    sidebar_action = sidebar_panel(
                        ui,
                        &mut self.ui_state,
                        &summaries,
                        active_id.as_deref(),
                    );
                });
            if let Some(action) = sidebar_action {
                self.dispatch_sidebar(action);
            }
        }

        // ── Settings side panel ──────────────────────────────
        if self.ui_state.show_settings {
            let mut settings_action = SettingsAction::None;
            SidePanel::right("settings_panel")
                .min_width(280.0)
                .max_width(350.0)
                .show(ctx, |ui| {
                    settings_action = settings_panel(ui, &mut self.settings_state);
                });
            if settings_action != SettingsAction::None {
                self.dispatch_settings(settings_action);
            }
        }

        // ── Chat ─────────────────────────────────────────────
        let session = self.store.active();
        let mut chat_action = None;
        CentralPanel::default().show(ctx, |ui| {
            chat_action = chat_panel(ui, &mut self.ui_state, &session);
        });
        if let Some(action) = chat_action {
            self.dispatch_chat(action);
        }
    }
}
