//! crates/juriscan_core/src/preferences.rs
//!
//! Theme and cookie-consent flags. Both are persisted independently of any
//! analysis state.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{ConsentChoice, CookieConsent, Theme};
use crate::ports::{KeyValueStore, PortResult};

pub const THEME_KEY: &str = "juriscan_theme";
pub const CONSENT_KEY: &str = "juriscan_cookie_consent";

pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
    theme: Theme,
    consent: CookieConsent,
}

impl Preferences {
    /// Resolves the theme (stored value, else the OS preference, else light)
    /// and reads the consent flag. Unreadable values fall back to defaults.
    ///
    /// The resolved theme is written back so the stored flag always matches
    /// the applied one.
    pub async fn load(store: Arc<dyn KeyValueStore>, os_prefers_dark: bool) -> Self {
        let stored_theme = read(&*store, THEME_KEY).await.and_then(|raw| {
            let parsed = Theme::parse(&raw);
            if parsed.is_none() {
                warn!("Ignoring unknown theme value '{}'", raw);
            }
            parsed
        });
        let theme = stored_theme.unwrap_or(if os_prefers_dark { Theme::Dark } else { Theme::Light });
        if stored_theme.is_none() {
            if let Err(e) = store.set(THEME_KEY, theme.as_str()).await {
                warn!("Failed to persist the initial theme: {}", e);
            }
        }

        let consent = read(&*store, CONSENT_KEY)
            .await
            .and_then(|raw| ConsentChoice::parse(&raw))
            .map(CookieConsent::from)
            .unwrap_or(CookieConsent::Unset);

        Self { store, theme, consent }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn is_dark(&self) -> bool {
        self.theme == Theme::Dark
    }

    /// Flips the theme and persists it immediately.
    pub async fn toggle_theme(&mut self) -> PortResult<Theme> {
        let next = self.theme.toggled();
        self.store.set(THEME_KEY, next.as_str()).await?;
        self.theme = next;
        info!(theme = next.as_str(), "Theme changed.");
        Ok(next)
    }

    pub fn consent(&self) -> CookieConsent {
        self.consent
    }

    pub fn show_consent_banner(&self) -> bool {
        self.consent == CookieConsent::Unset
    }

    /// Records the banner choice. Returns `false` when a choice was already made.
    pub async fn record_consent(&mut self, choice: ConsentChoice) -> PortResult<bool> {
        if self.consent != CookieConsent::Unset {
            return Ok(false);
        }
        self.store.set(CONSENT_KEY, choice.as_str()).await?;
        self.consent = choice.into();
        info!(choice = choice.as_str(), "Cookie consent recorded.");
        Ok(true)
    }
}

async fn read(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    match store.get(key).await {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to read '{}': {}", key, e);
            None
        }
    }
}
