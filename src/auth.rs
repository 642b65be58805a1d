//! Login screen
//!
//! Two flows exist on the backend:
//!
//! - [`LoginVariant::TwoStep`]: email and password are submitted; the backend
//!   emails a one-time code and a second submission with the code completes.
//! - [`LoginVariant::SendCodeFirst`]: the code is requested explicitly for an
//!   email, then email, password and code are submitted together.
//!
//! Every login request is bounded by the configured login timeout. The resend
//! cooldown is a countdown for the operator, not a security control.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use validator::Validate;

use crate::api::{ApiClient, LoginReply, LoginRequest};
use crate::config::LoginVariant;
use crate::domain::{validation, AdminEvent, FormErrors};
use crate::guard::{landing_route, Route};
use crate::session::{InvalidationReason, Session};
use crate::{AdminError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStep {
    Credentials,
    AwaitingOtp { email: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A code was emailed; the flow now waits for it.
    CodeSent { message: String },
    SignedIn { route: Route, event: AdminEvent },
}

#[derive(Validate)]
struct EmailForm {
    #[validate(email(message = "Enter a valid email address"))]
    email: String,
}

#[derive(Validate)]
struct CredentialsForm {
    #[validate(email(message = "Enter a valid email address"))]
    email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
}

fn check_code(code: &str) -> Result<()> {
    if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
        let mut errors = FormErrors::new();
        errors.add("otp", "The code has 6 digits");
        return errors.into_result();
    }
    Ok(())
}

pub struct LoginFlow {
    api: ApiClient,
    variant: LoginVariant,
    step: LoginStep,
    password: Option<String>,
    last_code_sent: Option<Instant>,
    return_to: Option<String>,
    timeout: Duration,
    cooldown: Duration,
}

impl std::fmt::Debug for LoginFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginFlow").field("variant", &self.variant).field("step", &self.step).finish_non_exhaustive()
    }
}

impl LoginFlow {
    pub fn new(api: ApiClient, return_to: Option<String>) -> Self {
        let config = api.config();
        let (variant, timeout, cooldown) = (config.login_variant, config.login_timeout, config.otp_cooldown);
        Self { api, variant, step: LoginStep::Credentials, password: None, last_code_sent: None, return_to, timeout, cooldown }
    }

    pub fn with_variant(mut self, variant: LoginVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn variant(&self) -> LoginVariant { self.variant }
    pub fn step(&self) -> &LoginStep { &self.step }

    pub fn email(&self) -> Option<&str> {
        match &self.step {
            LoginStep::AwaitingOtp { email } => Some(email),
            LoginStep::Credentials => None,
        }
    }

    /// Time left before another code may be requested.
    pub fn cooldown_remaining(&self) -> Duration {
        self.last_code_sent.map_or(Duration::ZERO, |sent| self.cooldown.saturating_sub(sent.elapsed()))
    }

    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "Login request timed out");
                Err(AdminError::Timeout)
            }
        }
    }

    /// First step of the two-step flow.
    pub async fn submit_credentials(&mut self, email: &str, password: &str) -> Result<LoginOutcome> {
        let email = email.trim();
        validation::check(&CredentialsForm { email: email.to_string(), password: password.to_string() }).into_result()?;

        let request = LoginRequest { email: email.to_string(), password: password.to_string(), otp: None };
        let (message, reply) = self.bounded(self.api.login(&request)).await?;
        if reply.token.is_some() {
            return self.complete(email, reply);
        }

        self.password = Some(password.to_string());
        self.last_code_sent = Some(Instant::now());
        self.step = LoginStep::AwaitingOtp { email: email.to_string() };
        tracing::info!(email, "Verification code requested");
        Ok(LoginOutcome::CodeSent { message: message.unwrap_or_else(|| format!("A verification code was sent to {email}")) })
    }

    /// Explicit "send code" action; also used for resending.
    pub async fn send_code(&mut self, email: &str) -> Result<LoginOutcome> {
        let email = email.trim();
        validation::check(&EmailForm { email: email.to_string() }).into_result()?;
        let remaining = self.cooldown_remaining();
        if !remaining.is_zero() {
            return Err(AdminError::Cooldown { remaining_secs: remaining.as_secs().max(1) });
        }

        let message = self.bounded(self.api.send_otp(email)).await?;
        self.last_code_sent = Some(Instant::now());
        if self.email() != Some(email) {
            self.step = LoginStep::AwaitingOtp { email: email.to_string() };
        }
        Ok(LoginOutcome::CodeSent { message: message.unwrap_or_else(|| format!("A verification code was sent to {email}")) })
    }

    pub async fn resend_code(&mut self) -> Result<LoginOutcome> {
        let email = self.email().map(str::to_string).ok_or_else(|| {
            let mut errors = FormErrors::new();
            errors.add("email", "Enter your email first");
            AdminError::Validation(errors)
        })?;
        self.send_code(&email).await
    }

    /// Completes the login with the emailed code. `password` is required in
    /// the send-code-first flow and ignored when the first step kept it.
    pub async fn submit_otp(&mut self, code: &str, password: Option<&str>) -> Result<LoginOutcome> {
        let code = code.trim();
        let Some(email) = self.email().map(str::to_string) else {
            let mut errors = FormErrors::new();
            errors.add("otp", "Request a verification code first");
            return Err(AdminError::Validation(errors));
        };
        let password = match (self.password.clone(), password) {
            (Some(kept), _) => kept,
            (None, Some(given)) => given.to_string(),
            (None, None) => String::new(),
        };
        validation::check(&CredentialsForm { email: email.clone(), password: password.clone() }).into_result()?;
        check_code(code)?;

        let request = LoginRequest { email: email.clone(), password, otp: Some(code.to_string()) };
        let (_, reply) = self.bounded(self.api.login(&request)).await?;
        self.complete(&email, reply)
    }

    fn complete(&mut self, email: &str, reply: LoginReply) -> Result<LoginOutcome> {
        let token = reply.token.ok_or_else(|| AdminError::InvalidResponse("login answer carried no token".to_string()))?;
        let mut session = Session::new(token, email);
        if let Some(user) = reply.user {
            session.display_name = user.full_name;
            session.role = user.role;
        }
        self.api.session().establish(session)?;
        self.password = None;
        self.step = LoginStep::Credentials;
        Ok(LoginOutcome::SignedIn {
            route: landing_route(self.return_to.as_deref()),
            event: AdminEvent::SignedIn { email: email.to_string() },
        })
    }
}

/// Signs out: tells the backend when possible, then drops the local session.
pub async fn logout(api: &ApiClient) -> AdminEvent {
    if api.session().is_signed_in() {
        if let Err(e) = api.logout().await {
            tracing::warn!("Backend logout failed, dropping local session anyway: {}", e);
        }
    }
    api.session().invalidate(InvalidationReason::LoggedOut);
    AdminEvent::SignedOut
}
