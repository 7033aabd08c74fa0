//! Session sidebar — ordered session list plus collection-level actions.

use egui::{self, RichText, ScrollArea};

use wikichat_types::session::SessionSummary;

use crate::state::UiState;
use crate::theme::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarAction {
    NewChat,
    Switch(String),
    Delete(String),
    ExportSession(String),
    ExportAll,
    ImportSession(String),
    ImportAll(String),
    ClearAll,
}

/// Render the session sidebar. Returns the action to dispatch, if any.
pub fn sidebar_panel(
    ui: &mut egui::Ui,
    state: &mut UiState,
    sessions: &[SessionSummary],
    active_id: Option<&str>,
) -> Option<SidebarAction> {
    let mut action = None;

    egui::Frame::default()
        .fill(BG_SECONDARY)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new("Chats").color(ACCENT).strong());
                if ui.small_button("+ New").clicked() {
                    action = Some(SidebarAction::NewChat);
                }
            });
            ui.separator();

            ScrollArea::vertical()
                .max_height(ui.available_height() - 110.0)
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for summary in sessions {
                        let is_active = active_id == Some(summary.id.as_str());
                        ui.horizontal(|ui| {
                            let title_color = if is_active { TEXT_PRIMARY } else { TEXT_SECONDARY };
                            let title = ui.selectable_label(
                                is_active,
                                RichText::new(&summary.title).color(title_color),
                            );
                            if title.clicked() && !is_active {
                                action = Some(SidebarAction::Switch(summary.id.clone()));
                            }

                            if ui.small_button("save").on_hover_text("Export this chat").clicked()
                            {
                                action = Some(SidebarAction::ExportSession(summary.id.clone()));
                            }
                            if ui.small_button("x").on_hover_text("Delete").clicked() {
                                action = Some(SidebarAction::Delete(summary.id.clone()));
                            }
                        });
                    }
                });

            ui.separator();

            ui.horizontal(|ui| {
                if ui.small_button("Export all").clicked() {
                    action = Some(SidebarAction::ExportAll);
                }
                if ui.small_button("Import").clicked() {
                    state.show_import = !state.show_import;
                }
                if ui.small_button("Clear all").clicked() {
                    action = Some(SidebarAction::ClearAll);
                }
            });

            if state.show_import {
                ui.add(
                    egui::TextEdit::multiline(&mut state.import_text)
                        .hint_text("Paste exported JSON here")
                        .desired_rows(3),
                );
                ui.horizontal(|ui| {
                    let has_text = !state.import_text.trim().is_empty();
                    if ui
                        .add_enabled(has_text, egui::Button::new("Load chat").small())
                        .clicked()
                    {
                        action = Some(SidebarAction::ImportSession(state.import_text.clone()));
                        state.import_text.clear();
                        state.show_import = false;
                    }
                    if ui
                        .add_enabled(has_text, egui::Button::new("Load backup").small())
                        .clicked()
                    {
                        action = Some(SidebarAction::ImportAll(state.import_text.clone()));
                        state.import_text.clear();
                        state.show_import = false;
                    }
                });
            }
        });

    action
}
