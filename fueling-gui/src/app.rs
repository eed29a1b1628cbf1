use eframe::egui;
use std::time::Instant;
use uuid::Uuid;

use fueling_core::{
    ActionError, ActionOutcome, ActiveView, App, FormField, FuelingRequest, ModelError,
    OperatorAction, OperatorView, RequestStatus, RequestStore, RequesterView, Sender,
    SubmitOutcome,
};

/// User input gathered while drawing a frame, applied once drawing is done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UiAction {
    Submit,
    ToggleChat(Uuid),
    SendMessage(Uuid),
    Apply(OperatorAction, Uuid),
    ClearCompleted,
    ResolveConfirmation(bool),
    DismissToast,
    DismissMessage,
}

pub struct FuelingApp {
    app: App,
    chat_input: String,
    message: Option<(String, bool)>, // (message, is_error)
}

fn status_color(status: RequestStatus) -> egui::Color32 {
    match status {
        RequestStatus::Pending => egui::Color32::from_rgb(230, 180, 40),
        RequestStatus::Confirmed => egui::Color32::from_rgb(80, 140, 230),
        RequestStatus::Completed => egui::Color32::from_rgb(70, 170, 90),
        RequestStatus::Cancelled => egui::Color32::from_rgb(210, 70, 70),
    }
}

fn action_label(action: OperatorAction) -> &'static str {
    match action {
        OperatorAction::Confirm => "✅ Confirm",
        OperatorAction::Complete => "⛽ Complete",
        OperatorAction::Cancel => "❌ Cancel",
    }
}

impl FuelingApp {
    pub fn new(app: App) -> Self {
        Self {
            app,
            chat_input: String::new(),
            message: None,
        }
    }

    fn open_chat(&self) -> Option<Uuid> {
        match &self.app.view {
            ActiveView::Requester(view) => view.open_chat(),
            ActiveView::Operator(view) => view.open_chat(),
        }
    }

    /// While a confirmation dialog is open nothing else takes input
    fn confirmation_open(&self) -> bool {
        match &self.app.view {
            ActiveView::Operator(view) => view.pending_confirmation().is_some(),
            ActiveView::Requester(_) => false,
        }
    }

    fn collect_save_error(&mut self) {
        if let Some(error) = self.app.store.take_save_error() {
            self.message = Some((format!("Changes were not saved: {}", error), true));
        }
    }

    fn show_top_panel(&self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                match &self.app.view {
                    ActiveView::Requester(view) => {
                        ui.heading("Fueling Requests: Client");
                        let unread = self.app.store.unread_count_for(view.requester_id());
                        if unread > 0 {
                            ui.separator();
                            ui.colored_label(
                                egui::Color32::LIGHT_BLUE,
                                format!("● {} with new updates", unread),
                            );
                        }
                    }
                    ActiveView::Operator(_) => {
                        ui.heading("Fueling Requests: Company");
                        let counts = self.app.store.status_counts();
                        ui.separator();
                        ui.label(format!(
                            "{} pending · {} confirmed · {} completed · {} cancelled",
                            counts.pending, counts.confirmed, counts.completed, counts.cancelled
                        ));
                    }
                }

                // Show message
                if let Some((msg, is_error)) = &self.message {
                    ui.separator();
                    let color = if *is_error {
                        egui::Color32::RED
                    } else {
                        egui::Color32::GREEN
                    };
                    ui.colored_label(color, msg.as_str());
                    if ui.small_button("✖").clicked() {
                        actions.push(UiAction::DismissMessage);
                    }
                }
            });
        });
    }

    fn show_toast(&self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        let ActiveView::Requester(view) = &self.app.view else {
            return;
        };
        let Some(toast) = view.toast() else {
            return;
        };

        egui::Area::new(egui::Id::new("toast"))
            .anchor(egui::Align2::RIGHT_BOTTOM, [-16.0, -16.0])
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.colored_label(egui::Color32::GREEN, toast.text.as_str());
                        if ui.small_button("✖").clicked() {
                            actions.push(UiAction::DismissToast);
                        }
                    });
                });
            });
    }

    fn show_chat_panel(&mut self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        let Some(id) = self.open_chat() else {
            return;
        };
        let Some(request) = self.app.store.get(&id) else {
            return;
        };
        let own_sender = match self.app.view {
            ActiveView::Requester(_) => Sender::Client,
            ActiveView::Operator(_) => Sender::Company,
        };
        let enabled = !self.confirmation_open();
        let chat_input = &mut self.chat_input;

        egui::SidePanel::right("chat_panel")
            .min_width(280.0)
            .show(ctx, |ui| {
                ui.add_enabled_ui(enabled, |ui| {
                    ui.horizontal(|ui| {
                        ui.heading("💬 Chat");
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("✖").on_hover_text("Close chat").clicked() {
                                actions.push(UiAction::ToggleChat(id));
                            }
                        });
                    });
                    ui.label(request.summary());
                    ui.separator();

                    egui::ScrollArea::vertical()
                        .auto_shrink([false, false])
                        .max_height(ui.available_height() - 40.0)
                        .stick_to_bottom(true)
                        .show(ui, |ui| {
                            if request.messages.is_empty() {
                                ui.weak("No messages yet");
                            }
                            for message in &request.messages {
                                let layout = if message.sender == own_sender {
                                    egui::Layout::top_down(egui::Align::Max)
                                } else {
                                    egui::Layout::top_down(egui::Align::Min)
                                };
                                ui.with_layout(layout, |ui| {
                                    egui::Frame::group(ui.style()).show(ui, |ui| {
                                        ui.small(format!("{} · {}", message.sender, message.display_time()));
                                        ui.label(message.text.as_str());
                                    });
                                });
                            }
                        });

                    ui.separator();
                    ui.horizontal(|ui| {
                        let response = ui.add(
                            egui::TextEdit::singleline(chat_input)
                                .hint_text("Type a message...")
                                .desired_width(ui.available_width() - 60.0),
                        );
                        let enter = response.lost_focus()
                            && ui.input(|i| i.key_pressed(egui::Key::Enter));
                        if ui.button("Send").clicked() || enter {
                            actions.push(UiAction::SendMessage(id));
                            response.request_focus();
                        }
                    });
                });
            });
    }

    fn show_confirmation_dialog(&self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        let ActiveView::Operator(view) = &self.app.view else {
            return;
        };
        let Some(pending) = view.pending_confirmation() else {
            return;
        };

        egui::Window::new(format!("⚠ {}", pending.title()))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(pending.prompt());
                ui.add_space(10.0);
                ui.horizontal(|ui| {
                    if ui.button("Yes").clicked() {
                        actions.push(UiAction::ResolveConfirmation(true));
                    }
                    if ui.button("No").clicked() {
                        actions.push(UiAction::ResolveConfirmation(false));
                    }
                });
            });
    }

    fn apply(&mut self, action: UiAction, now: Instant) {
        let App { store, view } = &mut self.app;

        let result = match (action, view) {
            (UiAction::DismissMessage, _) => {
                self.message = None;
                Ok(())
            }
            (UiAction::Submit, ActiveView::Requester(view)) => {
                if let SubmitOutcome::Scheduled { .. } = view.submit(now) {
                    self.message = None;
                }
                Ok(())
            }
            (UiAction::DismissToast, ActiveView::Requester(view)) => {
                view.dismiss_toast();
                Ok(())
            }
            (UiAction::ToggleChat(id), ActiveView::Requester(view)) => {
                view.toggle_chat(id, store).map(|_| self.chat_input.clear())
            }
            (UiAction::ToggleChat(id), ActiveView::Operator(view)) => {
                view.toggle_chat(id);
                self.chat_input.clear();
                Ok(())
            }
            (UiAction::SendMessage(id), ActiveView::Requester(view)) => view
                .send_message(id, &self.chat_input, store)
                .map(|_| self.chat_input.clear()),
            (UiAction::SendMessage(id), ActiveView::Operator(view)) => view
                .send_message(id, &self.chat_input, store)
                .map(|_| self.chat_input.clear()),
            (UiAction::Apply(action, id), ActiveView::Operator(view)) => match action {
                OperatorAction::Confirm => view.confirm(id, store),
                OperatorAction::Complete => view.complete(id, store),
                OperatorAction::Cancel => view.request_cancel(id, store).map(|_| ()),
            },
            (UiAction::ClearCompleted, ActiveView::Operator(view)) => {
                view.request_clear_completed(store).map(|_| ())
            }
            (UiAction::ResolveConfirmation(accepted), ActiveView::Operator(view)) => {
                match view.resolve_confirmation(accepted, store) {
                    Ok(ActionOutcome::Cleared(count)) => {
                        self.message =
                            Some((format!("Removed {} completed requests", count), false));
                        Ok(())
                    }
                    Ok(_) => Ok(()),
                    Err(e) => Err(e),
                }
            }
            (action, _) => {
                log::debug!("Ignoring {:?} in this view", action);
                Ok(())
            }
        };

        match result {
            // Blank chat input is not an error worth showing
            Ok(()) | Err(ActionError::Model(ModelError::EmptyMessage)) => {}
            Err(e) => {
                log::warn!("Action failed: {}", e);
                self.message = Some((e.to_string(), true));
            }
        }
    }
}

fn show_request_card(
    ui: &mut egui::Ui,
    request: &FuelingRequest,
    chat_open: bool,
    show_unread: bool,
    actions: &mut Vec<UiAction>,
    add_controls: impl FnOnce(&mut egui::Ui, &mut Vec<UiAction>),
) {
    let mut frame = egui::Frame::group(ui.style());
    if request.status.is_terminal() {
        frame = frame.fill(ui.visuals().faint_bg_color);
    }
    frame.show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.horizontal(|ui| {
            ui.strong(format!("Stand {}", request.stand_number));
            ui.label(format!("{} {}", request.airline, request.flight_number));
            ui.colored_label(status_color(request.status), request.status.to_string());
            if show_unread && request.has_unread_updates {
                ui.colored_label(egui::Color32::LIGHT_BLUE, "● New update");
            }
        });
        ui.horizontal(|ui| {
            ui.weak(format!("Representative: {}", request.representative_name));
            ui.weak(format!(
                "Created {}",
                request
                    .created_at
                    .with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M")
            ));
        });
        ui.horizontal(|ui| {
            let chat_label = format!("💬 Chat ({})", request.messages.len());
            if ui.selectable_label(chat_open, chat_label).clicked() {
                actions.push(UiAction::ToggleChat(request.id));
            }
            add_controls(ui, actions);
        });
    });
}

fn show_requester(
    ui: &mut egui::Ui,
    view: &mut RequesterView,
    store: &RequestStore,
    actions: &mut Vec<UiAction>,
) {
    ui.heading("New Fueling Request");
    ui.add_space(4.0);

    egui::Grid::new("request_form")
        .num_columns(2)
        .spacing([12.0, 6.0])
        .show(ui, |ui| {
            for field in FormField::ALL {
                ui.label(field.label());
                ui.vertical(|ui| {
                    let response = ui.add(
                        egui::TextEdit::singleline(view.form.value_mut(field))
                            .desired_width(260.0),
                    );
                    if response.changed() {
                        view.clear_field_error(field);
                    }
                    if let Some(error) = view.errors().get(field) {
                        ui.colored_label(egui::Color32::RED, error);
                    }
                });
                ui.end_row();
            }
        });

    ui.add_space(6.0);
    let submit = ui.add_enabled(
        !view.is_submitting(),
        egui::Button::new(view.submit_label()),
    );
    if submit.clicked() {
        actions.push(UiAction::Submit);
    }

    ui.add_space(12.0);
    ui.separator();
    ui.heading("My Requests");

    let requests = view.visible_requests(store);
    if requests.is_empty() {
        ui.weak("You have not submitted any requests yet.");
        return;
    }

    let open_chat = view.open_chat();
    egui::ScrollArea::vertical().show(ui, |ui| {
        for request in requests {
            show_request_card(
                ui,
                request,
                open_chat == Some(request.id),
                true,
                actions,
                |_, _| {},
            );
            ui.add_space(4.0);
        }
    });
}

fn show_operator(
    ui: &mut egui::Ui,
    view: &OperatorView,
    store: &RequestStore,
    actions: &mut Vec<UiAction>,
) {
    ui.horizontal(|ui| {
        ui.heading("All Requests");
        if view.can_clear_completed(store) {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("🗑 Clear Completed").clicked() {
                    actions.push(UiAction::ClearCompleted);
                }
            });
        }
    });
    ui.separator();

    let requests = view.visible_requests(store);
    if requests.is_empty() {
        ui.weak("No fueling requests.");
        return;
    }

    let open_chat = view.open_chat();
    egui::ScrollArea::vertical().show(ui, |ui| {
        for request in requests {
            let controls = view.controls(request);
            show_request_card(
                ui,
                request,
                open_chat == Some(request.id),
                false,
                actions,
                |ui, actions| {
                    ui.separator();
                    for action in [
                        OperatorAction::Confirm,
                        OperatorAction::Complete,
                        OperatorAction::Cancel,
                    ] {
                        let enabled = controls.for_action(action).is_allowed();
                        let button =
                            ui.add_enabled(enabled, egui::Button::new(action_label(action)));
                        if button.clicked() {
                            actions.push(UiAction::Apply(action, request.id));
                        }
                    }
                },
            );
            ui.add_space(4.0);
        }
    });
}

impl eframe::App for FuelingApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        if let ActiveView::Requester(view) = &mut self.app.view {
            if let Some(request) = view.poll(now, &mut self.app.store) {
                log::info!("Submitted request {}", request.short_id());
            }
        }
        self.collect_save_error();

        let mut actions = Vec::new();
        self.show_top_panel(ctx, &mut actions);
        self.show_chat_panel(ctx, &mut actions);

        let enabled = !self.confirmation_open();
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(enabled, |ui| match &mut self.app.view {
                ActiveView::Requester(view) => {
                    show_requester(ui, view, &self.app.store, &mut actions)
                }
                ActiveView::Operator(view) => {
                    show_operator(ui, view, &self.app.store, &mut actions)
                }
            });
        });

        self.show_confirmation_dialog(ctx, &mut actions);
        self.show_toast(ctx, &mut actions);

        for action in actions {
            self.apply(action, now);
        }
        self.collect_save_error();

        // Wake up for the pending submission or the toast expiry
        if let ActiveView::Requester(view) = &self.app.view {
            if let Some(deadline) = view.next_deadline() {
                ctx.request_repaint_after(deadline.saturating_duration_since(Instant::now()));
            }
        }
    }
}
