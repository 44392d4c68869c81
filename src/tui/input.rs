use std::io::Read;
use std::thread;

use crossbeam_channel::Sender;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::shared::KeyCommand;

// resolve one terminal key event into a command, press events only
pub fn map_key(key: KeyEvent) -> Option<KeyCommand> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    // raw mode eats SIGINT, so ctrl-c has to come through here
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(KeyCommand::Quit),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Esc => Some(KeyCommand::Quit),
        KeyCode::Up => Some(KeyCommand::SelectPrev),
        KeyCode::Down => Some(KeyCommand::SelectNext),
        KeyCode::Left => Some(KeyCommand::VolumeDown),
        KeyCode::Right => Some(KeyCommand::VolumeUp),
        KeyCode::Char(c) => map_char(c),
        _ => None,
    }
}

// same mapping for raw bytes off a pipe
pub fn map_byte(byte: u8) -> Option<KeyCommand> {
    match byte {
        0x03 | 0x1b => Some(KeyCommand::Quit), // ctrl-c, esc
        b if b.is_ascii() => map_char(b as char),
        _ => None,
    }
}

fn map_char(c: char) -> Option<KeyCommand> {
    match c {
        ' ' => Some(KeyCommand::PlayPause),
        's' | 'S' => Some(KeyCommand::Stop),
        'r' | 'R' => Some(KeyCommand::Rewind),
        'q' | 'Q' => Some(KeyCommand::Quit),
        '[' => Some(KeyCommand::SelectPrev),
        ']' => Some(KeyCommand::SelectNext),
        '-' => Some(KeyCommand::VolumeDown),
        '+' | '=' => Some(KeyCommand::VolumeUp),
        '1'..='9' => c.to_digit(10).map(|n| KeyCommand::ToggleStem(n as usize)),
        _ => None,
    }
}

// ── Readers ──────────────────────────────────────────────────────────
// Each one blocks on its source and forwards commands. Whatever happens to
// the source, the dispatcher eventually sees a Quit or a closed channel.

pub fn spawn_key_reader(tx: Sender<KeyCommand>) -> std::io::Result<()> {
    thread::Builder::new().name("keys".into()).spawn(move || loop {
        match event::read() {
            Ok(Event::Key(key)) => {
                if let Some(cmd) = map_key(key) {
                    log::debug!("key {:?} -> {:?}", key.code, cmd);
                    if tx.send(cmd).is_err() {
                        return;
                    }
                }
            }
            Ok(_) => {} // resize, focus, mouse
            Err(e) => {
                log::error!("terminal input failed: {e}");
                let _ = tx.send(KeyCommand::Quit);
                return;
            }
        }
    })?;
    Ok(())
}

// stdin isn't a terminal: take bytes as they come, end of input quits
pub fn spawn_stdin_reader<R: Read + Send + 'static>(source: R, tx: Sender<KeyCommand>) -> std::io::Result<()> {
    thread::Builder::new().name("stdin".into()).spawn(move || {
        for byte in source.bytes() {
            let byte = match byte {
                Ok(b) => b,
                Err(e) => {
                    log::error!("stdin read failed: {e}");
                    break;
                }
            };
            if let Some(cmd) = map_byte(byte) {
                if tx.send(cmd).is_err() {
                    return;
                }
            }
        }
        let _ = tx.send(KeyCommand::Quit);
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn keys_map_to_commands() {
        assert_eq!(map_key(press(KeyCode::Char(' '))), Some(KeyCommand::PlayPause));
        assert_eq!(map_key(press(KeyCode::Char('S'))), Some(KeyCommand::Stop));
        assert_eq!(map_key(press(KeyCode::Char('r'))), Some(KeyCommand::Rewind));
        assert_eq!(map_key(press(KeyCode::Char('3'))), Some(KeyCommand::ToggleStem(3)));
        assert_eq!(map_key(press(KeyCode::Char('9'))), Some(KeyCommand::ToggleStem(9)));
        assert_eq!(map_key(press(KeyCode::Char('q'))), Some(KeyCommand::Quit));
        assert_eq!(map_key(press(KeyCode::Esc)), Some(KeyCommand::Quit));
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(KeyCommand::Quit)
        );
    }

    #[test]
    fn arrows_and_brackets_drive_volume() {
        assert_eq!(map_key(press(KeyCode::Up)), Some(KeyCommand::SelectPrev));
        assert_eq!(map_key(press(KeyCode::Down)), Some(KeyCommand::SelectNext));
        assert_eq!(map_key(press(KeyCode::Left)), Some(KeyCommand::VolumeDown));
        assert_eq!(map_key(press(KeyCode::Right)), Some(KeyCommand::VolumeUp));
        assert_eq!(map_key(press(KeyCode::Char('='))), Some(KeyCommand::VolumeUp));
        assert_eq!(map_byte(b'['), Some(KeyCommand::SelectPrev));
        assert_eq!(map_byte(b']'), Some(KeyCommand::SelectNext));
        assert_eq!(map_byte(b'-'), Some(KeyCommand::VolumeDown));
        assert_eq!(map_byte(b'+'), Some(KeyCommand::VolumeUp));
    }

    #[test]
    fn unknown_keys_and_releases_are_ignored() {
        assert_eq!(map_key(press(KeyCode::Char('0'))), None);
        assert_eq!(map_key(press(KeyCode::Char('x'))), None);
        assert_eq!(map_key(press(KeyCode::Enter)), None);
        assert_eq!(map_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)), None);
        assert_eq!(
            map_key(KeyEvent::new_with_kind(
                KeyCode::Char(' '),
                KeyModifiers::NONE,
                KeyEventKind::Release
            )),
            None
        );
    }

    #[test]
    fn bytes_use_the_same_map() {
        assert_eq!(map_byte(b' '), Some(KeyCommand::PlayPause));
        assert_eq!(map_byte(b'2'), Some(KeyCommand::ToggleStem(2)));
        assert_eq!(map_byte(0x03), Some(KeyCommand::Quit));
        assert_eq!(map_byte(b'\n'), None);
        assert_eq!(map_byte(0xff), None);
    }

    #[test]
    fn stdin_reader_quits_at_end_of_input() {
        let (tx, rx) = crossbeam_channel::unbounded();
        spawn_stdin_reader(&b" 2x\ns"[..], tx).unwrap();
        let got: Vec<KeyCommand> = rx.iter().collect();
        assert_eq!(
            got,
            vec![
                KeyCommand::PlayPause,
                KeyCommand::ToggleStem(2),
                KeyCommand::Stop,
                KeyCommand::Quit,
            ]
        );
    }
}
