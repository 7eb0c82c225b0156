use std::sync::OnceLock;

use regex::Regex;
use twin_core::domain::contact::ContactRequest;
use twin_core::errors::DomainError;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex"))
}

/// Syntactic `local@domain.tld` check. No DNS or deliverability lookups.
pub fn validate_address(candidate: &str) -> Result<&str, DomainError> {
    if email_pattern().is_match(candidate) {
        Ok(candidate)
    } else {
        Err(DomainError::InvalidAddress(candidate.to_string()))
    }
}

/// A contact request whose recruiter address passed [`validate_address`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedContactRequest(ContactRequest);

impl ValidatedContactRequest {
    pub fn recruiter_address(&self) -> &str {
        &self.0.recruiter_address
    }

    pub fn message(&self) -> &str {
        &self.0.message
    }

    pub fn transcript(&self) -> &str {
        &self.0.transcript
    }
}

pub fn validate_request(request: ContactRequest) -> Result<ValidatedContactRequest, DomainError> {
    validate_address(&request.recruiter_address)?;
    Ok(ValidatedContactRequest(request))
}

#[cfg(test)]
mod tests {
    use twin_core::domain::contact::ContactRequest;
    use twin_core::errors::DomainError;

    use super::{validate_address, validate_request};

    #[test]
    fn accepts_canonical_address_unchanged() {
        assert_eq!(validate_address("jane.doe@example.com"), Ok("jane.doe@example.com"));
        assert!(validate_address("a_b%c+tag-x@sub.example.co.uk").is_ok());
    }

    #[test]
    fn rejects_malformed_addresses() {
        for candidate in ["jane.doe@@example", "not-an-email", "", "jane@example.c", "jane@.com1"]
        {
            assert_eq!(
                validate_address(candidate),
                Err(DomainError::InvalidAddress(candidate.to_string())),
                "{candidate:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_surrounding_whitespace_and_trailing_newline() {
        assert!(validate_address(" jane@example.com").is_err());
        assert!(validate_address("jane@example.com\n").is_err());
    }

    #[test]
    fn validated_request_exposes_fields() {
        let validated = validate_request(ContactRequest {
            recruiter_address: "jane.doe@example.com".to_string(),
            message: "Let's chat".to_string(),
            transcript: "user: hi".to_string(),
        })
        .expect("valid request");

        assert_eq!(validated.recruiter_address(), "jane.doe@example.com");
        assert_eq!(validated.message(), "Let's chat");
        assert_eq!(validated.transcript(), "user: hi");
    }
}
