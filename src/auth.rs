//! Sign-in state
//!
//! Logged in means the persisted `Login` key exists. The profile is fetched
//! lazily and cached for the rest of the process.

use crate::api::AdvisorApi;
use crate::error::{AdvisorError, Result};
use crate::storage::{LocalStore, LOGIN_KEY, SESSION_KEY};
use agro_advisor_common::validate::{validate_login, validate_registration, RegistrationForm};
use agro_advisor_common::{Translator, User};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub is_logged_in: bool,
    pub user: Option<User>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Auth {
    state: AuthState,
}

impl Auth {
    /// State as persisted; does not touch the network
    pub fn check_status(store: &LocalStore) -> Self {
        Self {
            state: AuthState {
                is_logged_in: store.contains(LOGIN_KEY),
                ..Default::default()
            },
        }
    }

    /// Hand the persisted session cookies back to the client
    pub fn restore_session<A: AdvisorApi>(api: &A, store: &LocalStore) {
        if let Some(cookies) = store.get(SESSION_KEY) {
            api.restore_session(cookies);
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.is_logged_in
    }

    pub fn set_user(&mut self, user: Option<User>) {
        self.state.user = user;
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.state.error = error;
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.state.loading = loading;
    }

    /// Sign in; returns the message to show
    ///
    /// Blank fields fail validation before any request is made.
    pub async fn login<A: AdvisorApi>(
        &mut self,
        api: &A,
        store: &mut LocalStore,
        email: &str,
        password: &str,
        t: &Translator,
    ) -> Result<String> {
        let req = validate_login(email, password, t).map_err(AdvisorError::Validation)?;

        self.set_loading(true);
        self.set_error(None);
        let outcome = api.sign_in(&req).await;
        self.set_loading(false);

        match outcome {
            Ok(reply) => {
                store.set(LOGIN_KEY, "true")?;
                if let Some(cookies) = api.session_cookies() {
                    store.set(SESSION_KEY, &cookies)?;
                }
                self.state.is_logged_in = true;
                self.state.user = None;
                debug!(email = %req.email, "signed in");
                Ok(reply.message.unwrap_or_else(|| t.t("login:signedIn")))
            }
            Err(e) => {
                self.set_error(Some(login_failure_message(&e, t)));
                Err(e)
            }
        }
    }

    /// Sign out; the local session is cleared even if the request fails
    pub async fn logout<A: AdvisorApi>(&mut self, api: &A, store: &mut LocalStore) -> Result<()> {
        store.remove(LOGIN_KEY)?;
        let outcome = api.sign_out().await;
        api.clear_session();
        store.remove(SESSION_KEY)?;
        self.state = AuthState::default();

        if let Err(e) = &outcome {
            warn!(error = %e, "sign-out request failed");
        }
        outcome
    }

    /// Cached profile, fetched on first use
    pub async fn profile<A: AdvisorApi>(&mut self, api: &A) -> Result<&User> {
        if !self.state.is_logged_in {
            return Err(AdvisorError::NotLoggedIn);
        }
        if self.state.user.is_none() {
            self.set_loading(true);
            let fetched = api.get_user().await;
            self.set_loading(false);
            match fetched {
                Ok(user) => self.state.user = Some(user),
                Err(e) => {
                    self.set_error(Some(e.to_string()));
                    return Err(e);
                }
            }
        }
        self.state
            .user
            .as_ref()
            .ok_or(AdvisorError::NotLoggedIn)
    }
}

/// Register a new account; returns the message to show
///
/// Field errors come back as `Validation`; a 409 as `Conflict`
/// carrying the clashing field.
pub async fn register<A: AdvisorApi>(api: &A, form: &RegistrationForm, t: &Translator) -> Result<String> {
    let req = validate_registration(form, t).map_err(AdvisorError::Validation)?;
    let reply = api.sign_up(&req).await?;
    Ok(reply
        .message
        .unwrap_or_else(|| t.t_with("registration:success.default", &[("name", &req.name)])))
}

/// 401 without a server message reads as bad credentials
pub fn login_failure_message(err: &AdvisorError, t: &Translator) -> String {
    match err {
        AdvisorError::Server {
            status: 401,
            message: None,
        } => t.t("login:errors.invalid"),
        _ => err.user_message(t, "common:unknown"),
    }
}
