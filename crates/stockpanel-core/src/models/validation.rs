use thiserror::Error;

/// Rejections raised before a form is sent to the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("Invalid email")]
    InvalidEmail,

    #[error("Minimum {0} characters")]
    TooShort(usize),

    #[error("Please select a product.")]
    NoProductSelected,

    #[error("Please enter a quantity to out for at least one warehouse.")]
    NoQuantities,

    #[error("One of the warehouse quantities exceeds the available stock. Please adjust and try again.")]
    ExceedsAvailable,

    #[error("Only .xlsx and .csv files can be uploaded")]
    UnsupportedFile,

    #[error("Quantity for {0} is too large")]
    InvalidQuantity(String),

        #[error("Invalid date: {0}")]
    InvalidDate(String),
}

/// Minimal shape check: something before and after a single `@`, and a dot
/// in the domain.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .map(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
            .unwrap_or(false)
}

pub(crate) fn required(field: &'static str, value: &str) -> Result<String, FormError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(FormError::Required(field))
    } else {
        Ok(trimmed.to_string())
    }
}

pub(crate) fn email(value: &str) -> Result<String, FormError> {
    let value = required("Email", value)?;
    if is_valid_email(&value) {
        Ok(value)
    } else {
        Err(FormError::InvalidEmail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("clerk@example.com"));
        assert!(is_valid_email(" clerk@shop.example.lk "));
        assert!(!is_valid_email("clerk"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("clerk@example"));
        assert!(!is_valid_email("clerk@@example.com"));
        assert!(!is_valid_email("cl erk@example.com"));
    }

    #[test]
    fn test_required_trims() {
        assert_eq!(required("Name", "  Shelf  "), Ok("Shelf".to_string()));
        assert_eq!(required("Name", "   "), Err(FormError::Required("Name")));
    }

    #[test]
    fn test_messages_match_notifications() {
        assert_eq!(FormError::Required("Email").to_string(), "Email is required");
        assert_eq!(FormError::TooShort(6).to_string(), "Minimum 6 characters");
    }
}
