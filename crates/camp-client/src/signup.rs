use tracing::{info, warn};

use camp_types::api::RegisterRequest;

use crate::api::ApiClient;
use crate::error::{SignUpError, ValidationError, VerifyErrorKind};
use crate::validation::{validate_email, validate_password};

/// Where the app goes after a sign-up attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Interest picker for a freshly verified account
    Interests { user_id: String },
    /// Back to sign-in; the verification token was no good
    SignIn,
}

/// Progress of a submission, for the submit button label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpPhase {
    Idle,
    Submitting,
    Verifying,
}

impl SignUpPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Register",
            Self::Submitting => "Registering...",
            Self::Verifying => "Verifying...",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignUpForm {
    /// Check the form in the order the user sees the messages.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty()
            || self.email.is_empty()
            || self.password.is_empty()
            || self.confirm_password.is_empty()
        {
            return Err(ValidationError::MissingFields);
        }
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(())
    }

    fn to_request(&self) -> RegisterRequest {
        RegisterRequest {
            name: self.name.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            confirm_password: self.confirm_password.clone(),
        }
    }
}

/// Registration followed by email verification.
pub struct SignUpFlow {
    api: ApiClient,
    phase: SignUpPhase,
}

impl SignUpFlow {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            phase: SignUpPhase::Idle,
        }
    }

    pub fn phase(&self) -> SignUpPhase {
        self.phase
    }

    /// Run the whole flow. On success the returned route carries the new
    /// user's id. On failure, [`redirect_for`] says whether to leave the form.
    pub async fn submit(&mut self, form: &SignUpForm) -> Result<Route, SignUpError> {
        form.validate()?;

        self.phase = SignUpPhase::Submitting;
        let result = self.run(form).await;
        self.phase = SignUpPhase::Idle;

        if let Err(e) = &result {
            warn!("Registration or verification failed: {}", e);
        }
        result
    }

    async fn run(&mut self, form: &SignUpForm) -> Result<Route, SignUpError> {
        let user_id = self.api.register(&form.to_request()).await?;
        let token = self.api.request_verification(&form.email).await?;
        info!("Registration successful, verifying {}", form.email);

        self.phase = SignUpPhase::Verifying;
        self.api.verify_email(&token).await?;
        info!("Email verified for user {}", user_id);

        Ok(Route::Interests { user_id })
    }
}

/// Route to take after a failed submission, if any.
pub fn redirect_for(err: &SignUpError) -> Option<Route> {
    match err.verify_kind() {
        Some(VerifyErrorKind::InvalidOrExpiredToken) => Some(Route::SignIn),
        _ => None,
    }
}
