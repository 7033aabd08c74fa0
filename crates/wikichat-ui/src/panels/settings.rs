//! Settings panel — provider/model selection, API key, token limit, and
//! user-defined custom models.

use egui::{self, RichText, Vec2};

use wikichat_types::provider::{CustomModel, ProviderKey};

use crate::state::SettingsState;
use crate::theme::*;

/// What the caller should persist after rendering the settings panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsAction {
    None,
    /// Provider changed; the caller reloads that provider's stored API key.
    ProviderChanged,
    ModelChanged,
    MaxTokensChanged,
    /// The user clicked the explicit key save button.
    SaveApiKey,
    AddCustomModel(CustomModel),
    RemoveCustomModel(String),
}

/// Render the settings panel. Returns the action for the caller to handle.
pub fn settings_panel(ui: &mut egui::Ui, state: &mut SettingsState) -> SettingsAction {
    let mut action = SettingsAction::None;

    egui::Frame::default()
        .fill(BG_SECONDARY)
        .inner_margin(PANEL_PADDING)
        .corner_radius(PANEL_ROUNDING)
        .show(ui, |ui| {
            ui.heading(RichText::new("Settings").color(TEXT_PRIMARY));
            ui.separator();

            // ── Provider ─────────────────────────────────────
            ui.label(RichText::new("Provider").color(TEXT_SECONDARY).small());
            egui::ComboBox::from_id_salt("provider_select")
                .selected_text(state.provider.label())
                .show_ui(ui, |ui| {
                    for p in ProviderKey::all() {
                        if ui
                            .selectable_value(&mut state.provider, *p, p.label())
                            .changed()
                        {
                            // Reset the model to the new provider's catalogue.
                            state.model = state
                                .model_choices()
                                .first()
                                .cloned()
                                .unwrap_or_default();
                            action = SettingsAction::ProviderChanged;
                        }
                    }
                });

            ui.add_space(4.0);

            // ── Model ────────────────────────────────────────
            ui.label(RichText::new("Model").color(TEXT_SECONDARY).small());
            let choices = state.model_choices();
            egui::ComboBox::from_id_salt("model_select")
                .selected_text(&state.model)
                .show_ui(ui, |ui| {
                    for choice in &choices {
                        if ui
                            .selectable_value(&mut state.model, choice.clone(), choice)
                            .changed()
                        {
                            action = SettingsAction::ModelChanged;
                        }
                    }
                });

            ui.add_space(4.0);

            // ── API key ──────────────────────────────────────
            ui.label(RichText::new("API Key").color(TEXT_SECONDARY).small());
            ui.add(
                egui::TextEdit::singleline(&mut state.api_key)
                    .password(true)
                    .hint_text("sk-..."),
            );
            if ui
                .add(
                    egui::Button::new(RichText::new("Save key").color(TEXT_PRIMARY))
                        .fill(ACCENT)
                        .corner_radius(PANEL_ROUNDING)
                        .min_size(Vec2::new(80.0, 0.0)),
                )
                .clicked()
            {
                action = SettingsAction::SaveApiKey;
            }

            ui.add_space(4.0);

            // ── Token limit ──────────────────────────────────
            ui.label(RichText::new("Max Tokens").color(TEXT_SECONDARY).small());
            if ui
                .add(egui::Slider::new(&mut state.max_tokens, 256..=8192))
                .changed()
            {
                action = SettingsAction::MaxTokensChanged;
            }

            // ── Custom models ────────────────────────────────
            if state.provider == ProviderKey::Custom {
                ui.add_space(12.0);
                ui.separator();
                ui.label(RichText::new("Custom Models").color(ACCENT).strong());

                let mut remove = None;
                for model in &state.custom_models {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(&model.name).color(TEXT_PRIMARY).small());
                        if ui.small_button("x").clicked() {
                            remove = Some(model.name.clone());
                        }
                    });
                }
                if let Some(name) = remove {
                    action = SettingsAction::RemoveCustomModel(name);
                }

                if ui.small_button("+ Add model").clicked() {
                    state.show_add_model = !state.show_add_model;
                }
                if state.show_add_model {
                    ui.add(
                        egui::TextEdit::singleline(&mut state.new_model_name)
                            .hint_text("Model name"),
                    );
                    ui.add(
                        egui::TextEdit::singleline(&mut state.new_model_endpoint)
                            .hint_text("http://localhost:8080/v1"),
                    );
                    let ready = !state.new_model_name.trim().is_empty();
                    if ui
                        .add_enabled(ready, egui::Button::new("Add").small())
                        .clicked()
                    {
                        action = SettingsAction::AddCustomModel(CustomModel {
                            name: state.new_model_name.trim().to_string(),
                            endpoint: state.new_model_endpoint.trim().to_string(),
                        });
                        state.new_model_name.clear();
                        state.new_model_endpoint.clear();
                        state.show_add_model = false;
                    }
                }
            }
        });

    action
}
