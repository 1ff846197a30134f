/// Every failure that may cross the service boundary.
///
/// Token failures of any sort collapse into [`AuthError::InvalidToken`] and a
/// missing account is reported as [`AuthError::InvalidCredentials`] during
/// sign-in, so neither leaks which check failed.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email already in use")]
    EmailInUse,
    #[error("token invalid")]
    InvalidToken,
    #[error("could not authorize user: {0}")]
    Authorization(String),
    #[error("user not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid input: {0}")]
    InvalidInput(InputError),
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("email is malformed")]
    EmailInvalid,
    #[error("password is too short")]
    PasswordLength,
    #[error("name is required")]
    NameRequired,
    #[error("currency is not supported")]
    CurrencyInvalid,
    #[error("request body is malformed")]
    Malformed,
}

/// Transport-independent status class; the HTTP layer maps it to a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    BadRequest,
    Unauthorized,
    NotFound,
    Conflict,
    Internal,
}

impl InputError {
    pub fn slug(&self) -> &'static str {
        match self {
            InputError::EmailInvalid => "field-email-invalid",
            InputError::PasswordLength => "field-password-invalid-length",
            InputError::NameRequired => "field-name-required",
            InputError::CurrencyInvalid => "field-currency-invalid",
            InputError::Malformed => "invalid-input",
        }
    }
}

impl AuthError {
    /// Stable machine-readable identifier handed to clients.
    pub fn slug(&self) -> &'static str {
        match self {
            AuthError::Config(_) => "configuration-error",
            AuthError::InvalidCredentials => "invalid-credentials",
            AuthError::EmailInUse => "email-in-use",
            AuthError::InvalidToken => "invalid-token",
            AuthError::Authorization(_) => "could-not-authorize-user",
            AuthError::NotFound => "user-not-found",
            AuthError::Conflict(_) => "conflict",
            AuthError::InvalidInput(e) => e.slug(),
            AuthError::Store(_) | AuthError::Internal(_) => "internal-server-error",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            AuthError::InvalidCredentials | AuthError::EmailInUse | AuthError::InvalidInput(_) => {
                ErrorClass::BadRequest
            }
            AuthError::InvalidToken | AuthError::Authorization(_) => ErrorClass::Unauthorized,
            AuthError::NotFound => ErrorClass::NotFound,
            AuthError::Conflict(_) => ErrorClass::Conflict,
            AuthError::Config(_) | AuthError::Store(_) | AuthError::Internal(_) => {
                ErrorClass::Internal
            }
        }
    }
}

impl From<InputError> for AuthError {
    fn from(error: InputError) -> Self {
        AuthError::InvalidInput(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_failures_share_one_slug() {
        assert_eq!(AuthError::InvalidCredentials.slug(), "invalid-credentials");
        assert_eq!(
            AuthError::InvalidCredentials.class(),
            ErrorClass::BadRequest
        );
    }

    #[test]
    fn storage_details_stay_out_of_slugs() {
        let store = AuthError::Store("connection refused to 10.0.0.3".to_string());
        let internal = AuthError::Internal("argon2 failure".to_string());
        assert_eq!(store.slug(), internal.slug());
        assert_eq!(store.class(), ErrorClass::Internal);
    }

    #[test]
    fn token_and_issuance_failures_are_unauthorized() {
        assert_eq!(AuthError::InvalidToken.class(), ErrorClass::Unauthorized);
        let issuance = AuthError::Authorization("insert failed".to_string());
        assert_eq!(issuance.class(), ErrorClass::Unauthorized);
        assert_eq!(issuance.slug(), "could-not-authorize-user");
    }

    #[test]
    fn input_errors_carry_field_slugs() {
        let err: AuthError = InputError::CurrencyInvalid.into();
        assert_eq!(err.slug(), "field-currency-invalid");
        assert_eq!(err.class(), ErrorClass::BadRequest);
    }
}
