//! Global keyboard shortcut for the clipboard lookup.
//!
//! The shortcut comes from config as a modifier string (`"control+shift"`) and a key (`"d"`),
//! is parsed into a plugin [`Shortcut`], and registered with the Tauri global shortcut plugin.
//! Presses are routed back through [`is_lookup_press`] by the handler installed in lib.

use tauri_plugin_global_shortcut::{Code, GlobalShortcutExt, Modifiers, Shortcut, ShortcutState};
use tracing::info;

use crate::config::HotkeyConfig;

/// The registered lookup shortcut and its display label.
#[derive(Debug, Clone)]
pub struct LookupHotkey {
    pub shortcut: Shortcut,
    pub label: String,
}

fn parse_modifier_token(token: &str) -> Option<Modifiers> {
    match token {
        "control" | "ctrl" => Some(Modifiers::CONTROL),
        "shift" => Some(Modifiers::SHIFT),
        "alt" | "option" => Some(Modifiers::ALT),
        "command" | "cmd" | "super" | "meta" | "win" => Some(Modifiers::SUPER),
        _ => None,
    }
}

fn modifier_tokens(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(|c: char| c == '+' || c == ',' || c.is_whitespace())
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
}

fn parse_modifiers(raw: &str) -> Result<Option<Modifiers>, String> {
    let mut modifiers = Modifiers::empty();
    for token in modifier_tokens(raw) {
        modifiers |= parse_modifier_token(&token)
            .ok_or_else(|| format!("Unsupported modifier token: {token}"))?;
    }
    Ok((!modifiers.is_empty()).then_some(modifiers))
}

const LETTER_CODES: [Code; 26] = [
    Code::KeyA,
    Code::KeyB,
    Code::KeyC,
    Code::KeyD,
    Code::KeyE,
    Code::KeyF,
    Code::KeyG,
    Code::KeyH,
    Code::KeyI,
    Code::KeyJ,
    Code::KeyK,
    Code::KeyL,
    Code::KeyM,
    Code::KeyN,
    Code::KeyO,
    Code::KeyP,
    Code::KeyQ,
    Code::KeyR,
    Code::KeyS,
    Code::KeyT,
    Code::KeyU,
    Code::KeyV,
    Code::KeyW,
    Code::KeyX,
    Code::KeyY,
    Code::KeyZ,
];

const DIGIT_CODES: [Code; 10] = [
    Code::Digit0,
    Code::Digit1,
    Code::Digit2,
    Code::Digit3,
    Code::Digit4,
    Code::Digit5,
    Code::Digit6,
    Code::Digit7,
    Code::Digit8,
    Code::Digit9,
];

fn parse_key_code(raw: &str) -> Result<Code, String> {
    let key = raw.trim().to_uppercase();
    let mut chars = key.chars();
    let code = match (chars.next(), chars.next()) {
        (Some(c @ 'A'..='Z'), None) => LETTER_CODES.get((c as u8 - b'A') as usize).copied(),
        (Some(c @ '0'..='9'), None) => DIGIT_CODES.get((c as u8 - b'0') as usize).copied(),
        _ => None,
    };
    code.ok_or_else(|| format!("Unsupported hotkey key: {key}"))
}

fn format_modifier_label(raw: &str) -> String {
    modifier_tokens(raw)
        .map(|token| match token.as_str() {
            "control" | "ctrl" => "Ctrl".to_string(),
            "shift" => "Shift".to_string(),
            "alt" | "option" => "Alt".to_string(),
            "command" | "cmd" => "Cmd".to_string(),
            "super" | "meta" | "win" => "Super".to_string(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("+")
}

/// Human-readable label such as `Ctrl+Shift+D`.
pub fn shortcut_label(config: &HotkeyConfig) -> String {
    let mod_label = format_modifier_label(&config.modifiers);
    let upper_key = config.key.trim().to_uppercase();
    if mod_label.is_empty() {
        upper_key
    } else {
        format!("{mod_label}+{upper_key}")
    }
}

pub fn build_shortcut(config: &HotkeyConfig) -> Result<Shortcut, String> {
    let mods = parse_modifiers(&config.modifiers)?;
    let code = parse_key_code(&config.key)?;
    Ok(Shortcut::new(mods, code))
}

/// Registers the lookup shortcut, replacing any previously registered ones.
pub fn register_lookup_hotkey<R: tauri::Runtime>(
    app: &tauri::AppHandle<R>,
    config: &HotkeyConfig,
) -> Result<LookupHotkey, String> {
    let shortcut = build_shortcut(config)?;
    let label = shortcut_label(config);

    app.global_shortcut()
        .unregister_all()
        .map_err(|e| format!("Failed to clear old global shortcuts: {e}"))?;
    app.global_shortcut()
        .register(shortcut)
        .map_err(|e| format!("Failed to register {label}: {e}"))?;

    info!(shortcut = %label, "Registered lookup hotkey");
    Ok(LookupHotkey { shortcut, label })
}

/// True for a key-down of the registered lookup shortcut.
pub fn is_lookup_press(registered: &Shortcut, pressed: &Shortcut, state: ShortcutState) -> bool {
    state == ShortcutState::Pressed && registered == pressed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hotkey(modifiers: &str, key: &str) -> HotkeyConfig {
        HotkeyConfig {
            modifiers: modifiers.to_string(),
            key: key.to_string(),
        }
    }

    #[test]
    fn test_default_hotkey_is_ctrl_shift_d() {
        let config = HotkeyConfig::default();
        assert_eq!(shortcut_label(&config), "Ctrl+Shift+D");
        assert_eq!(
            build_shortcut(&config).unwrap(),
            Shortcut::new(Some(Modifiers::CONTROL | Modifiers::SHIFT), Code::KeyD)
        );
    }

    #[test]
    fn test_modifier_separators_and_case() {
        assert_eq!(
            build_shortcut(&hotkey("Alt, Shift", "7")).unwrap(),
            Shortcut::new(Some(Modifiers::ALT | Modifiers::SHIFT), Code::Digit7)
        );
        assert_eq!(
            build_shortcut(&hotkey("", "q")).unwrap(),
            Shortcut::new(None, Code::KeyQ)
        );
    }

    #[test]
    fn test_invalid_hotkeys_are_rejected() {
        assert!(build_shortcut(&hotkey("hyper", "d")).is_err());
        assert!(build_shortcut(&hotkey("control", "F13")).is_err());
        assert!(build_shortcut(&hotkey("control", "")).is_err());
    }

    #[test]
    fn test_only_key_down_of_registered_shortcut_triggers() {
        let registered = build_shortcut(&HotkeyConfig::default()).unwrap();
        let other = Shortcut::new(Some(Modifiers::CONTROL), Code::KeyD);

        assert!(is_lookup_press(&registered, &registered, ShortcutState::Pressed));
        assert!(!is_lookup_press(&registered, &registered, ShortcutState::Released));
        assert!(!is_lookup_press(&registered, &other, ShortcutState::Pressed));
    }
}
