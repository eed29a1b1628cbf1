use anyhow::Result;
use inquire::{Confirm, Text};

use fueling_core::{FieldErrors, FormField, RequestForm};

/// Prompts for the four request fields, showing the previous error under
/// each field that had one
pub fn prompt_request_form(previous: &RequestForm, errors: &FieldErrors) -> Result<RequestForm> {
    let mut form = RequestForm::default();

    for field in FormField::ALL {
        let label = format!("{}:", field.label());
        let mut prompt = Text::new(&label).with_initial_value(previous.value(field));
        if let Some(error) = errors.get(field) {
            prompt = prompt.with_help_message(error);
        }
        *form.value_mut(field) = prompt.prompt()?;
    }

    Ok(form)
}

/// Asks whether to try again after a rejected submission
pub fn prompt_retry() -> Result<bool> {
    Ok(Confirm::new("Fix the form and try again?")
        .with_default(true)
        .prompt()?)
}

/// Blocking yes/no confirmation for destructive actions
pub fn prompt_confirm(title: &str, prompt: &str) -> Result<bool> {
    println!("{}", title);
    Ok(Confirm::new(prompt).with_default(false).prompt()?)
}
