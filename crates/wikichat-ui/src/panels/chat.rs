//! Chat panel — conversation bubbles with swipe controls and the
//! send-or-stop input row.

use egui::{self, Align, Color32, Layout, RichText, ScrollArea, Vec2};

use wikichat_types::message::{Message, Role};
use wikichat_types::session::Session;

use crate::state::UiState;
use crate::theme::*;

/// What the user asked the chat panel to do this frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAction {
    Send(String),
    Stop,
    Reroll { message_index: usize },
    SwipeTo { message_index: usize, swipe_index: usize },
}

/// Format the swipe position indicator, 1-based.
pub fn swipe_counter(swipe_index: usize, total: usize) -> String {
    format!("{}/{}", swipe_index + 1, total)
}

/// Render the chat panel. Returns the action to dispatch, if any.
pub fn chat_panel(
    ui: &mut egui::Ui,
    state: &mut UiState,
    session: &Session,
) -> Option<ChatAction> {
    let mut action = None;

    egui::Frame::default()
        .fill(BG_PRIMARY)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            ui.vertical(|ui| {
                // Header
                ui.horizontal(|ui| {
                    ui.heading(RichText::new(&session.title).color(TEXT_PRIMARY).strong());
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let status_color = if state.is_busy() { WARNING } else { SUCCESS };
                        ui.label(
                            RichText::new(&state.status_text)
                                .color(status_color)
                                .small(),
                        );
                    });
                });

                ui.separator();

                // Messages area
                let available_height = ui.available_height() - 60.0;
                ScrollArea::vertical()
                    .max_height(available_height)
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for (index, msg) in session.messages.iter().enumerate() {
                            if let Some(a) = render_message(ui, state, index, msg) {
                                action = Some(a);
                            }
                            ui.add_space(4.0);
                        }

                        if state.is_busy() {
                            ui.horizontal(|ui| {
                                ui.add(egui::Spinner::new().color(ACCENT));
                                ui.label(
                                    RichText::new("Generating...").color(TEXT_SECONDARY).small(),
                                );
                            });
                        }

                        if let Some(error) = &state.transient_error {
                            render_error_bubble(ui, error);
                        }
                    });

                ui.add_space(8.0);

                // Input row
                ui.horizontal(|ui| {
                    let input = egui::TextEdit::singleline(&mut state.input_text)
                        .hint_text("Ask about commands, macros, scripts...")
                        .desired_width(ui.available_width() - 70.0)
                        .font(egui::FontId::proportional(14.0));
                    let response = ui.add(input);

                    if state.is_busy() {
                        let stop_btn = ui.add(
                            egui::Button::new(RichText::new("Stop").color(TEXT_PRIMARY))
                                .fill(ERROR)
                                .corner_radius(PANEL_ROUNDING)
                                .min_size(Vec2::new(60.0, 0.0)),
                        );
                        if stop_btn.clicked() {
                            action = Some(ChatAction::Stop);
                        }
                    } else {
                        let can_send = !state.input_text.trim().is_empty();
                        let send_btn = ui.add_enabled(
                            can_send,
                            egui::Button::new(RichText::new("Send").color(TEXT_PRIMARY))
                                .fill(if can_send { ACCENT } else { BG_SURFACE })
                                .corner_radius(PANEL_ROUNDING)
                                .min_size(Vec2::new(60.0, 0.0)),
                        );

                        let submitted = response.lost_focus()
                            && ui.input(|i| i.key_pressed(egui::Key::Enter))
                            && can_send;
                        if submitted || send_btn.clicked() {
                            let text = state.input_text.trim().to_string();
                            action = Some(ChatAction::Send(text));
                            state.input_text.clear();
                            response.request_focus();
                        }
                    }
                });
            });
        });

    action
}

fn render_message(
    ui: &mut egui::Ui,
    state: &UiState,
    index: usize,
    msg: &Message,
) -> Option<ChatAction> {
    let mut action = None;
    let (label, label_color) = match msg.role {
        Role::User => ("You", ACCENT),
        Role::Assistant => ("Assistant", SUCCESS),
    };

    egui::Frame::default()
        .fill(BG_SECONDARY)
        .corner_radius(PANEL_ROUNDING)
        .inner_margin(8.0)
        .show(ui, |ui| {
            ui.label(RichText::new(label).color(label_color).strong().small());
            ui.label(RichText::new(&msg.content).color(TEXT_PRIMARY));

            // Variant navigation for assistant turns
            if msg.role == Role::Assistant {
                ui.horizontal(|ui| {
                    let total = msg.swipes.len();

                    let prev = ui.add_enabled(
                        msg.swipe_index > 0,
                        egui::Button::new("<").small(),
                    );
                    if prev.clicked() {
                        action = Some(ChatAction::SwipeTo {
                            message_index: index,
                            swipe_index: msg.swipe_index - 1,
                        });
                    }

                    ui.label(
                        RichText::new(swipe_counter(msg.swipe_index, total))
                            .color(TEXT_SECONDARY)
                            .small(),
                    );

                    let next = ui.add_enabled(
                        msg.swipe_index + 1 < total,
                        egui::Button::new(">").small(),
                    );
                    if next.clicked() {
                        action = Some(ChatAction::SwipeTo {
                            message_index: index,
                            swipe_index: msg.swipe_index + 1,
                        });
                    }

                    let reroll = ui.add_enabled(
                        !state.is_busy(),
                        egui::Button::new("Regenerate").small(),
                    );
                    if reroll.clicked() {
                        action = Some(ChatAction::Reroll {
                            message_index: index,
                        });
                    }
                });
            }
        });

    action
}

fn render_error_bubble(ui: &mut egui::Ui, error: &str) {
    let error_bg = Color32::from_rgb(50, 20, 20);
    egui::Frame::default()
        .fill(error_bg)
        .corner_radius(PANEL_ROUNDING)
        .inner_margin(8.0)
        .show(ui, |ui| {
            ui.label(RichText::new("Error").color(ERROR).strong().small());
            ui.label(RichText::new(error).color(TEXT_PRIMARY));
        });
}
