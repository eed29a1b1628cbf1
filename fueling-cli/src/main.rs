mod cli;
mod prompts;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use std::time::Instant;
use uuid::Uuid;

use fueling_core::export::{self, ExportFormat};
use fueling_core::{
    resolve_data_dir, ActionOutcome, ActiveView, App, FuelingRequest, Message, OperatorView,
    RequestStatus, RequestStore, RequesterView, Sender, Settings, SubmitOutcome, ViewMode,
};

use crate::cli::{Cli, Command};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let settings = Settings::load();

    let mode = match &cli.view {
        Some(view) => ViewMode::from_param(view),
        None => settings.default_view.unwrap_or_default(),
    };

    // The data directory is the mount point; an explicit one must exist
    let explicit_dir = cli.data_dir.as_deref().or(settings.data_dir.as_deref());
    let data_dir = resolve_data_dir(explicit_dir)?;
    let mut app = App::mount(&data_dir, mode, settings.timing())
        .with_context(|| format!("Failed to start in {:?}", data_dir))?;
    log::debug!("Running {:?} in the {} view on {:?}", cli.command, mode, data_dir);

    match &cli.command {
        Command::List { status } => list_requests(&app, status.as_deref())?,
        Command::Show { id } => show_request(&app, id)?,
        Command::Submit {
            stand,
            airline,
            flight,
            representative,
            interactive,
        } => {
            // Default to interactive mode if no field was given
            let should_be_interactive = *interactive
                || (stand.is_none()
                    && airline.is_none()
                    && flight.is_none()
                    && representative.is_none());

            let (requester, store) = requester_parts(&mut app, "submit")?;
            if should_be_interactive {
                submit_interactive(requester, store)?;
            } else {
                requester.form.stand_number = stand.clone().unwrap_or_default();
                requester.form.airline = airline.clone().unwrap_or_default();
                requester.form.flight_number = flight.clone().unwrap_or_default();
                requester.form.representative_name = representative.clone().unwrap_or_default();
                submit_request(requester, store)?;
            }
        }
        Command::Chat { id } => open_chat(&mut app, id)?,
        Command::Say { id, text } => send_message(&mut app, id, text)?,
        Command::Confirm { id } => {
            let (operator, store) = operator_parts(&mut app, "confirm")?;
            let id = parse_request_id(id, store)?;
            operator.confirm(id, store)?;
            println!("{}", "Request confirmed.".green());
            report_save_error(store);
        }
        Command::Complete { id } => {
            let (operator, store) = operator_parts(&mut app, "complete")?;
            let id = parse_request_id(id, store)?;
            operator.complete(id, store)?;
            println!("{}", "Request completed.".green());
            report_save_error(store);
        }
        Command::Cancel { id, yes } => {
            let (operator, store) = operator_parts(&mut app, "cancel")?;
            let id = parse_request_id(id, store)?;
            if let Some(request) = store.get(&id) {
                println!("{}", "Request to cancel:".yellow());
                print_request_line(request, false);
            }
            let pending = operator.request_cancel(id, store)?;
            let accepted = *yes || prompts::prompt_confirm(pending.title(), pending.prompt())?;
            match operator.resolve_confirmation(accepted, store)? {
                ActionOutcome::Declined => println!("{}", "Cancellation aborted.".yellow()),
                _ => println!("{}", "Request cancelled.".green()),
            }
            report_save_error(store);
        }
        Command::ClearCompleted { yes } => {
            let (operator, store) = operator_parts(&mut app, "clear completed requests")?;
            if !operator.can_clear_completed(store) {
                println!("{}", "No completed requests to clear.".yellow());
                return Ok(());
            }
            let pending = operator.request_clear_completed(store)?;
            let accepted = *yes || prompts::prompt_confirm(pending.title(), pending.prompt())?;
            match operator.resolve_confirmation(accepted, store)? {
                ActionOutcome::Cleared(count) => {
                    println!("{}", format!("Removed {} completed requests.", count).green())
                }
                _ => println!("{}", "Nothing was removed.".yellow()),
            }
            report_save_error(store);
        }
        Command::Export { format, output } => {
            let (_, store) = operator_parts(&mut app, "export")?;
            handle_export_command(store, format, output.as_deref())?;
        }
        Command::Whoami => {
            println!("Data directory: {}", data_dir.display());
            println!("View: {}", app.mode());
            if let ActiveView::Requester(requester) = &app.view {
                println!("Requester ID: {}", requester.requester_id().cyan());
            }
        }
    }

    Ok(())
}

fn requester_parts<'a>(
    app: &'a mut App,
    action: &str,
) -> Result<(&'a mut RequesterView, &'a mut RequestStore)> {
    match &mut app.view {
        ActiveView::Requester(view) => Ok((view, &mut app.store)),
        ActiveView::Operator(_) => {
            anyhow::bail!("Cannot {} in the company view. Use --view client.", action)
        }
    }
}

fn operator_parts<'a>(
    app: &'a mut App,
    action: &str,
) -> Result<(&'a mut OperatorView, &'a mut RequestStore)> {
    match &mut app.view {
        ActiveView::Operator(view) => Ok((view, &mut app.store)),
        ActiveView::Requester(_) => {
            anyhow::bail!("Cannot {} in the client view. Use --view company.", action)
        }
    }
}

/// Parse request ID - accepts either a full UUID or a unique prefix
fn parse_request_id(id_str: &str, store: &RequestStore) -> Result<Uuid> {
    if let Ok(uuid) = Uuid::parse_str(id_str) {
        return Ok(uuid);
    }

    match store.find_by_prefix(id_str).as_slice() {
        [request] => Ok(request.id),
        [] => anyhow::bail!("No request matches '{}'", id_str),
        matches => anyhow::bail!(
            "'{}' is ambiguous, it matches {} requests. Use more characters.",
            id_str,
            matches.len()
        ),
    }
}

fn parse_status(status_str: &str) -> Result<RequestStatus> {
    match status_str.to_lowercase().as_str() {
        "pending" => Ok(RequestStatus::Pending),
        "confirmed" => Ok(RequestStatus::Confirmed),
        "completed" => Ok(RequestStatus::Completed),
        "cancelled" | "canceled" => Ok(RequestStatus::Cancelled),
        _ => anyhow::bail!("Invalid status: {}", status_str),
    }
}

fn colored_status(status: RequestStatus) -> colored::ColoredString {
    match status {
        RequestStatus::Pending => "Pending".yellow(),
        RequestStatus::Confirmed => "Confirmed".blue(),
        RequestStatus::Completed => "Completed".green(),
        RequestStatus::Cancelled => "Cancelled".red(),
    }
}

fn print_request_line(request: &FuelingRequest, show_unread: bool) {
    let unread = if show_unread && request.has_unread_updates {
        "●".cyan()
    } else {
        " ".normal()
    };
    println!(
        "{} {:<8} | {:<6} | {:<20} | {:<8} | {:<20} | {:<10} | {}",
        unread,
        request.short_id(),
        request.stand_number,
        request.airline,
        request.flight_number,
        request.representative_name,
        colored_status(request.status),
        request.messages.len()
    );
}

fn list_requests(app: &App, status: Option<&str>) -> Result<()> {
    let status_filter = status.map(parse_status).transpose()?;

    let (mut requests, show_unread): (Vec<&FuelingRequest>, bool) = match &app.view {
        ActiveView::Requester(view) => {
            let unread = app.store.unread_count_for(view.requester_id());
            if unread > 0 {
                println!("{}", format!("{} request(s) with new updates", unread).cyan());
            }
            (view.visible_requests(&app.store), true)
        }
        ActiveView::Operator(view) => {
            let counts = app.store.status_counts();
            println!(
                "{} requests: {} pending, {} confirmed, {} completed, {} cancelled",
                counts.total(),
                counts.pending,
                counts.confirmed,
                counts.completed,
                counts.cancelled
            );
            (view.visible_requests(&app.store).iter().collect(), false)
        }
    };

    if let Some(filter) = status_filter {
        requests.retain(|r| r.status == filter);
    }

    if requests.is_empty() {
        println!("{}", "No requests found.".yellow());
        return Ok(());
    }

    println!(
        "  {:<8} | {:<6} | {:<20} | {:<8} | {:<20} | {:<10} | {}",
        "ID", "Stand", "Airline", "Flight", "Representative", "Status", "Msgs"
    );
    println!("{}", "-".repeat(100));
    for request in requests {
        print_request_line(request, show_unread);
    }

    Ok(())
}

fn find_visible<'a>(app: &'a App, id_str: &str) -> Result<&'a FuelingRequest> {
    let id = parse_request_id(id_str, &app.store)?;
    let request = app.store.get(&id).context("Request not found")?;

    if let ActiveView::Requester(view) = &app.view {
        if request.client_id != view.requester_id() {
            anyhow::bail!("Request not found");
        }
    }
    Ok(request)
}

fn show_request(app: &App, id_str: &str) -> Result<()> {
    let request = find_visible(app, id_str)?;

    println!("{}: {}", "ID".cyan(), request.id);
    println!("{}: {}", "Stand".cyan(), request.stand_number);
    println!("{}: {}", "Airline".cyan(), request.airline);
    println!("{}: {}", "Flight".cyan(), request.flight_number);
    println!("{}: {}", "Representative".cyan(), request.representative_name);
    println!("{}: {}", "Status".cyan(), colored_status(request.status));
    println!(
        "{}: {}",
        "Created".cyan(),
        request
            .created_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M")
    );
    println!("{}: {}", "Messages".cyan(), request.messages.len());

    if let ActiveView::Operator(view) = &app.view {
        let controls = view.controls(request);
        let available: Vec<&str> = [
            ("confirm", controls.confirm),
            ("complete", controls.complete),
            ("cancel", controls.cancel),
        ]
        .into_iter()
        .filter(|(_, capability)| capability.is_allowed())
        .map(|(name, _)| name)
        .collect();
        if available.is_empty() {
            println!("{}", "No further actions available.".dimmed());
        } else {
            println!("{}: {}", "Actions".cyan(), available.join(", "));
        }
    }

    Ok(())
}

fn print_message(message: &Message) {
    let sender = match message.sender {
        Sender::Client => "Client".yellow(),
        Sender::Company => "Company".blue(),
    };
    println!(
        "{} {} {}",
        message.display_time().dimmed(),
        sender,
        message.text
    );
}

fn open_chat(app: &mut App, id_str: &str) -> Result<()> {
    let id = find_visible(app, id_str)?.id;

    match &mut app.view {
        ActiveView::Requester(view) => {
            view.toggle_chat(id, &mut app.store)?;
        }
        ActiveView::Operator(view) => {
            view.toggle_chat(id);
        }
    }

    let request = app.store.get(&id).context("Request not found")?;
    println!("{}: {}", "Chat".cyan(), request.summary());
    if request.messages.is_empty() {
        println!("{}", "No messages yet".dimmed());
    }
    for message in &request.messages {
        print_message(message);
    }
    report_save_error(&mut app.store);
    Ok(())
}

fn send_message(app: &mut App, id_str: &str, text: &str) -> Result<()> {
    let id = find_visible(app, id_str)?.id;

    let message = match &mut app.view {
        ActiveView::Requester(view) => view.send_message(id, text, &mut app.store)?,
        ActiveView::Operator(view) => view.send_message(id, text, &mut app.store)?,
    };
    print_message(&message);
    report_save_error(&mut app.store);
    Ok(())
}

fn submit_interactive(requester: &mut RequesterView, store: &mut RequestStore) -> Result<()> {
    loop {
        requester.form = prompts::prompt_request_form(&requester.form, requester.errors())?;
        match submit_request(requester, store) {
            Ok(()) => return Ok(()),
            Err(e) => {
                if requester.errors().is_empty() || !prompts::prompt_retry()? {
                    return Err(e);
                }
            }
        }
    }
}

/// Submits the form and waits out the simulated latency
fn submit_request(requester: &mut RequesterView, store: &mut RequestStore) -> Result<()> {
    match requester.submit(Instant::now()) {
        SubmitOutcome::Rejected(errors) => {
            for (_, message) in errors.iter() {
                println!("{}", message.red());
            }
            anyhow::bail!("Request was not submitted");
        }
        SubmitOutcome::Busy => anyhow::bail!("A submission is already in progress"),
        SubmitOutcome::Scheduled { due } => {
            println!("{}", requester.submit_label().dimmed());
            let wait = due.saturating_duration_since(Instant::now());
            std::thread::sleep(wait);
        }
    }

    let request = requester
        .poll(Instant::now(), store)
        .context("Submission did not complete")?;

    if let Some(toast) = requester.toast() {
        println!("{}", toast.text.green());
    }
    println!("ID: {}", request.short_id().green());
    report_save_error(store);
    Ok(())
}

fn handle_export_command(
    store: &RequestStore,
    format: &str,
    output: Option<&Path>,
) -> Result<()> {
    let format: ExportFormat = format.parse()?;

    match output {
        Some(path) => {
            export::export_to_file(store.requests(), format, path)?;
            println!("Exported to {}: {}", format, path.display());
            println!("  Total requests: {}", store.requests().len());
        }
        None => print!("{}", export::render(store.requests(), format)?),
    }
    Ok(())
}

/// Storage failures never abort a command; they are shown as a warning
fn report_save_error(store: &mut RequestStore) {
    if let Some(error) = store.take_save_error() {
        eprintln!("{} {}", "Warning: changes were not saved:".yellow(), error);
    }
}
