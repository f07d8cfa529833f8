use std::cell::RefCell;

use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;

use crate::config::{THEME_KEY, read_raw_local, write_raw_local};

const DARK_QUERY: &str = "(prefers-color-scheme: dark)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ThemeMode {
    Light,
    Dark,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EffectiveTheme {
    Light,
    Dark,
}

impl ThemeMode {
    pub(crate) const ALL: [ThemeMode; 3] = [ThemeMode::Light, ThemeMode::Dark, ThemeMode::System];

    /// Unknown or missing values mean `System`.
    pub(crate) fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("light") => Self::Light,
            Some("dark") => Self::Dark,
            _ => Self::System,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Light => "Light",
            Self::Dark => "Dark",
            Self::System => "System",
        }
    }

    pub(crate) fn resolve(self, prefers_dark: bool) -> EffectiveTheme {
        match self {
            Self::Light => EffectiveTheme::Light,
            Self::Dark => EffectiveTheme::Dark,
            Self::System if prefers_dark => EffectiveTheme::Dark,
            Self::System => EffectiveTheme::Light,
        }
    }
}

impl EffectiveTheme {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

pub(crate) fn stored_mode() -> ThemeMode {
    ThemeMode::parse(read_raw_local(THEME_KEY).as_deref())
}

pub(crate) fn save_mode(mode: ThemeMode) {
    write_raw_local(THEME_KEY, mode.as_str());
}

fn dark_media_query() -> Option<web_sys::MediaQueryList> {
    web_sys::window()?.match_media(DARK_QUERY).ok().flatten()
}

fn prefers_dark() -> bool {
    dark_media_query().is_some_and(|query| query.matches())
}

/// Put the effective theme on `<html>` as a class and as `data-theme`.
pub(crate) fn apply(mode: ThemeMode) -> EffectiveTheme {
    let effective = mode.resolve(prefers_dark());
    let Some(root) = web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.document_element())
    else {
        return effective;
    };
    let classes = root.class_list();
    let _ = classes.remove_2("light", "dark");
    let _ = classes.add_1(effective.as_str());
    let _ = root.set_attribute("data-theme", effective.as_str());
    effective
}

struct SystemThemeBinding {
    query: web_sys::MediaQueryList,
    handler: Closure<dyn Fn()>,
}

thread_local! {
    static SYSTEM_THEME_BINDING: RefCell<Option<SystemThemeBinding>> = const { RefCell::new(None) };
}

/// Re-apply whenever the OS preference flips while the stored mode is `System`.
pub(crate) fn watch_system_preference() {
    let Some(query) = dark_media_query() else {
        return;
    };

    SYSTEM_THEME_BINDING.with(|slot| {
        if let Some(old) = slot.borrow_mut().take() {
            let _ = old
                .query
                .remove_event_listener_with_callback("change", old.handler.as_ref().unchecked_ref());
        }
    });

    let handler = Closure::<dyn Fn()>::new(|| {
        if stored_mode() == ThemeMode::System {
            apply(ThemeMode::System);
        }
    });
    if query
        .add_event_listener_with_callback("change", handler.as_ref().unchecked_ref())
        .is_err()
    {
        return;
    }
    SYSTEM_THEME_BINDING.with(|slot| {
        *slot.borrow_mut() = Some(SystemThemeBinding { query, handler });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_stored_values_fall_back_to_system() {
        assert_eq!(ThemeMode::parse(None), ThemeMode::System);
        assert_eq!(ThemeMode::parse(Some("sepia")), ThemeMode::System);
        assert_eq!(ThemeMode::parse(Some("")), ThemeMode::System);
        assert_eq!(ThemeMode::parse(Some("dark")), ThemeMode::Dark);
        assert_eq!(ThemeMode::parse(Some(" light ")), ThemeMode::Light);
    }

    #[test]
    fn system_mode_follows_os_preference() {
        assert_eq!(ThemeMode::System.resolve(true), EffectiveTheme::Dark);
        assert_eq!(ThemeMode::System.resolve(false), EffectiveTheme::Light);
        assert_eq!(ThemeMode::Light.resolve(true), EffectiveTheme::Light);
        assert_eq!(ThemeMode::Dark.resolve(false), EffectiveTheme::Dark);
    }

    #[test]
    fn every_mode_round_trips_through_storage_text() {
        for mode in ThemeMode::ALL {
            assert_eq!(ThemeMode::parse(Some(mode.as_str())), mode);
        }
    }
}
