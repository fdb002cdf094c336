//! Key-event translation for the attached agent view.
//!
//! Maps crossterm key events onto the byte sequences a terminal would send,
//! so keystrokes in AgentView reach the child exactly as if it were in the
//! foreground.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Translate a key event into PTY input bytes. Returns None for keys that
/// have no terminal encoding (bare modifiers, media keys).
pub fn key_to_bytes(key: &KeyEvent) -> Option<Vec<u8>> {
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    let mut bytes = match key.code {
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
            control_byte(c).map(|b| vec![b])?
        }
        KeyCode::Char(c) => {
            let mut buf = [0u8; 4];
            c.encode_utf8(&mut buf).as_bytes().to_vec()
        }
        KeyCode::Enter => vec![b'\r'],
        KeyCode::Backspace => vec![0x7f],
        KeyCode::Tab => vec![b'\t'],
        KeyCode::BackTab => b"\x1b[Z".to_vec(),
        KeyCode::Esc => vec![0x1b],
        KeyCode::Up => b"\x1b[A".to_vec(),
        KeyCode::Down => b"\x1b[B".to_vec(),
        KeyCode::Right => b"\x1b[C".to_vec(),
        KeyCode::Left => b"\x1b[D".to_vec(),
        KeyCode::Home => b"\x1b[H".to_vec(),
        KeyCode::End => b"\x1b[F".to_vec(),
        KeyCode::PageUp => b"\x1b[5~".to_vec(),
        KeyCode::PageDown => b"\x1b[6~".to_vec(),
        KeyCode::Delete => b"\x1b[3~".to_vec(),
        KeyCode::Insert => b"\x1b[2~".to_vec(),
        _ => return None,
    };

    // Alt is the ESC prefix
    if alt {
        bytes.insert(0, 0x1b);
    }

    Some(bytes)
}

/// C0 control byte for Ctrl+key combinations.
fn control_byte(c: char) -> Option<u8> {
    match c {
        'a'..='z' => Some(c as u8 & 0x1f),
        'A'..='Z' => Some(c.to_ascii_lowercase() as u8 & 0x1f),
        ' ' | '@' => Some(0x00),
        '[' => Some(0x1b),
        '\\' => Some(0x1c),
        ']' => Some(0x1d),
        '^' => Some(0x1e),
        '_' => Some(0x1f),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn key_mod(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_enter_is_carriage_return() {
        assert_eq!(key_to_bytes(&key(KeyCode::Enter)).unwrap(), vec![b'\r']);
    }

    #[test]
    fn test_arrow_keys() {
        assert_eq!(key_to_bytes(&key(KeyCode::Up)).unwrap(), b"\x1b[A");
        assert_eq!(key_to_bytes(&key(KeyCode::Down)).unwrap(), b"\x1b[B");
        assert_eq!(key_to_bytes(&key(KeyCode::Right)).unwrap(), b"\x1b[C");
        assert_eq!(key_to_bytes(&key(KeyCode::Left)).unwrap(), b"\x1b[D");
    }

    #[test]
    fn test_control_modifiers() {
        assert_eq!(
            key_to_bytes(&key_mod(KeyCode::Char('c'), KeyModifiers::CONTROL)).unwrap(),
            vec![0x03]
        );
        assert_eq!(
            key_to_bytes(&key_mod(KeyCode::Char('D'), KeyModifiers::CONTROL)).unwrap(),
            vec![0x04]
        );
    }

    #[test]
    fn test_utf8_rune_passthrough() {
        assert_eq!(
            key_to_bytes(&key(KeyCode::Char('é'))).unwrap(),
            "é".as_bytes().to_vec()
        );
        assert_eq!(
            key_to_bytes(&key(KeyCode::Char('本'))).unwrap(),
            "本".as_bytes().to_vec()
        );
    }

    #[test]
    fn test_alt_prefixes_escape() {
        assert_eq!(
            key_to_bytes(&key_mod(KeyCode::Char('x'), KeyModifiers::ALT)).unwrap(),
            vec![0x1b, b'x']
        );
    }

    #[test]
    fn test_unmapped_key_is_none() {
        assert!(key_to_bytes(&key(KeyCode::CapsLock)).is_none());
    }
}
