//! Text-entry forms used by the overlays (login, register, catalog and user
//! editors). A form is a list of single-line fields followed by a submit
//! button; focus cycles through both.

/// Maximum length for ordinary text fields.
pub const MAX_FIELD_LENGTH: usize = 120;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Check if a character is valid for text input (printable, non-control)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a character can be added to a field of the given length.
pub fn can_add_char(current_len: usize, max_len: usize, c: char) -> bool {
    current_len < max_len && is_valid_input_char(c)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub label: &'static str,
    pub value: String,
    pub masked: bool,
    pub max_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub title: String,
    pub submit_label: &'static str,
    pub fields: Vec<FormField>,
    /// Index into `fields`; `fields.len()` is the submit button.
    pub focus: usize,
    pub error: Option<String>,
    pub submitting: bool,
}

impl Form {
    pub fn new(title: impl Into<String>, submit_label: &'static str) -> Self {
        Self {
            title: title.into(),
            submit_label,
            fields: Vec::new(),
            focus: 0,
            error: None,
            submitting: false,
        }
    }

    pub fn field(mut self, label: &'static str, value: impl Into<String>) -> Self {
        self.fields.push(FormField {
            label,
            value: value.into(),
            masked: false,
            max_len: MAX_FIELD_LENGTH,
        });
        self
    }

    pub fn secret(mut self, label: &'static str) -> Self {
        self.fields.push(FormField {
            label,
            value: String::new(),
            masked: true,
            max_len: MAX_PASSWORD_LENGTH,
        });
        self
    }

    pub fn value(&self, index: usize) -> &str {
        self.fields.get(index).map(|f| f.value.as_str()).unwrap_or("")
    }

    pub fn set_value(&mut self, index: usize, value: impl Into<String>) {
        if let Some(field) = self.fields.get_mut(index) {
            field.value = value.into();
        }
    }

    pub fn on_submit(&self) -> bool {
        self.focus >= self.fields.len()
    }

    /// Put focus on the first empty field, or the button when all are filled.
    pub fn focus_first_empty(&mut self) {
        self.focus = self
            .fields
            .iter()
            .position(|f| f.value.is_empty())
            .unwrap_or(self.fields.len());
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % (self.fields.len() + 1);
    }

    pub fn focus_prev(&mut self) {
        let slots = self.fields.len() + 1;
        self.focus = (self.focus + slots - 1) % slots;
    }

    pub fn push_char(&mut self, c: char) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            if can_add_char(field.value.chars().count(), field.max_len, c) {
                field.value.push(c);
                self.error = None;
            }
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.pop();
        }
    }

    /// Clear masked fields, e.g. after a sign-in attempt.
    pub fn clear_secrets(&mut self) {
        for field in self.fields.iter_mut().filter(|f| f.masked) {
            field.value.clear();
        }
    }

    /// Text shown for a field: masked fields show one `*` per character.
    pub fn display_value(&self, index: usize) -> String {
        match self.fields.get(index) {
            Some(field) if field.masked => "*".repeat(field.value.chars().count()),
            Some(field) => field.value.clone(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login() -> Form {
        Form::new("Sign in", "Login").field("Email", "").secret("Password")
    }

    #[test]
    fn test_can_add_char() {
        assert!(can_add_char(0, 10, 'a'));
        assert!(can_add_char(9, 10, '!'));
        assert!(!can_add_char(10, 10, 'a'));
        assert!(!can_add_char(0, 10, '\n'));
        assert!(!can_add_char(0, 10, '\t'));
        assert!(!can_add_char(0, 10, '\x00'));
    }

    #[test]
    fn test_focus_cycles_through_button() {
        let mut form = login();
        assert_eq!(form.focus, 0);
        form.focus_next();
        form.focus_next();
        assert!(form.on_submit());
        form.focus_next();
        assert_eq!(form.focus, 0);
        form.focus_prev();
        assert!(form.on_submit());
    }

    #[test]
    fn test_typing_edits_focused_field() {
        let mut form = login();
        form.error = Some("Email is required".to_string());
        for c in "a@b.co".chars() {
            form.push_char(c);
        }
        assert_eq!(form.value(0), "a@b.co");
        assert_eq!(form.error, None);
        form.pop_char();
        assert_eq!(form.value(0), "a@b.c");

        form.focus_next();
        form.push_char('x');
        form.push_char('y');
        assert_eq!(form.display_value(1), "**");
        form.clear_secrets();
        assert_eq!(form.value(1), "");
        assert_eq!(form.value(0), "a@b.c");
    }

    #[test]
    fn test_button_ignores_typing() {
        let mut form = login();
        form.focus = 2;
        form.push_char('z');
        form.pop_char();
        assert_eq!(form.value(0), "");
        assert_eq!(form.value(9), "");
    }

    #[test]
    fn test_focus_first_empty() {
        let mut form = login();
        form.set_value(0, "a@b.co");
        form.focus_first_empty();
        assert_eq!(form.focus, 1);
        form.set_value(1, "pw");
        form.focus_first_empty();
        assert!(form.on_submit());
    }
}
