use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::terminal;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;
use tracing::debug;

/// map from the left-hand side of a qwerty keyboard to the COSMAC hex keypad
///
///   1 2 3 4        1 2 3 C
///   q w e r   =>   4 5 6 D
///   a s d f        7 8 9 E
///   z x c v        A 0 B F
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// something the user did, already mapped to the keypad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown(u8),
    KeyUp(u8),
    /// stop the machine
    Quit,
}

/// reads keypresses
pub trait Input {
    /// drain everything that happened since the last poll; never blocks
    fn poll(&mut self) -> Result<Vec<InputEvent>, io::Error>;

    /// true if this source reports key releases; terminals don't, so the
    /// driver has to let go of keys itself
    fn reports_key_up(&self) -> bool {
        false
    }
}

/// keyboard input from the terminal, via crossterm. Esc or ctrl-c quits.
pub struct TermInput {
    keymap: HashMap<char, u8>,
}

impl TermInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(TermInput {
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
        })
    }

    fn map_event(&self, event: Event) -> Option<InputEvent> {
        match event {
            Event::Key(evt) => match evt.code {
                KeyCode::Esc => Some(InputEvent::Quit),
                KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
                    Some(InputEvent::Quit)
                }
                KeyCode::Char(key) => match self.keymap.get(&key.to_ascii_lowercase()) {
                    Some(mapped_key) => Some(InputEvent::KeyDown(*mapped_key)),
                    None => {
                        debug!("can't map {:?} to a COSMAC key", key);
                        None
                    }
                },
                other => {
                    debug!("ignoring key {:?}", other);
                    None
                }
            },
            _ => None,
        }
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for TermInput {
    fn poll(&mut self) -> Result<Vec<InputEvent>, io::Error> {
        let mut events = Vec::new();
        while poll(Duration::from_millis(0))? {
            if let Some(evt) = self.map_event(read()?) {
                events.push(evt);
            }
        }
        Ok(events)
    }
}

/// dummy Input implementation for testing; each poll hands out the next
/// batch of scripted events
pub struct DummyInput {
    batches: VecDeque<Vec<InputEvent>>,
    key_up: bool,
}

impl DummyInput {
    pub fn new() -> Self {
        DummyInput {
            batches: VecDeque::new(),
            key_up: false,
        }
    }

    /// pretend to be a source with proper key releases
    pub fn with_key_up(mut self) -> Self {
        self.key_up = true;
        self
    }

    /// queue up what the next poll returns
    pub fn push(&mut self, events: &[InputEvent]) {
        self.batches.push_back(Vec::from(events));
    }
}

impl Default for DummyInput {
    fn default() -> Self {
        Self::new()
    }
}

impl Input for DummyInput {
    fn poll(&mut self) -> Result<Vec<InputEvent>, io::Error> {
        Ok(self.batches.pop_front().unwrap_or_default())
    }

    fn reports_key_up(&self) -> bool {
        self.key_up
    }
}
