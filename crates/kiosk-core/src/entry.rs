// Name entry automaton.
//
// The kiosk never shows a list of names. The visitor types their surname on a
// restricted keypad; every letter that cannot extend some known surname is
// disabled, and whenever only one continuation is possible it is typed
// automatically. Everything here is derived from the latest snapshot on each
// call, so a snapshot replace can never leave the automaton in a torn state.

use std::collections::BTreeSet;

use tracing::debug;

use crate::protocol::{Participant, Snapshot};

// ---------------------------------------------------------------------------
// Pure derivations
// ---------------------------------------------------------------------------

/// Normalise a surname the way it is matched on the keypad: upper case, with
/// runs of punctuation or whitespace collapsed to a single space.
pub fn normalize_name(raw: &str) -> String {
    raw.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Distinct normalised surnames of every participant in the snapshot, in
/// order of first appearance.
pub fn candidate_names(snapshot: &Snapshot) -> Vec<String> {
    let mut seen = BTreeSet::new();
    snapshot
        .participants
        .iter()
        .map(|p| normalize_name(&p.last_name))
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Candidates starting with `typed`. `typed` is expected in normalised form.
pub fn possible_names<'a>(typed: &str, candidates: &'a [String]) -> Vec<&'a str> {
    candidates
        .iter()
        .map(String::as_str)
        .filter(|name| name.starts_with(typed))
        .collect()
}

/// Every way `typed` can continue. `None` stands for "a candidate ends
/// exactly here", which counts as a distinct option: with `IVAN` and
/// `IVANOV` both present, `IVAN` must not be auto-completed.
pub fn next_chars(typed: &str, candidates: &[String]) -> BTreeSet<Option<char>> {
    possible_names(typed, candidates)
        .into_iter()
        .map(|name| name[typed.len()..].chars().next())
        .collect()
}

/// Letters that may be typed next.
pub fn possible_chars(typed: &str, candidates: &[String]) -> BTreeSet<char> {
    next_chars(typed, candidates).into_iter().flatten().collect()
}

/// Whether `typed` is exactly one of the candidates (not merely a prefix).
pub fn is_complete(typed: &str, candidates: &[String]) -> bool {
    candidates.iter().any(|name| name == typed)
}

/// Whether `letter` can follow `typed`.
pub fn might_be_next(typed: &str, letter: char, candidates: &[String]) -> bool {
    let mut extended = String::with_capacity(typed.len() + letter.len_utf8());
    extended.push_str(typed);
    extended.push(letter);
    candidates.iter().any(|name| name.starts_with(&extended))
}

/// Append characters to `typed` for as long as exactly one continuation
/// exists. Each step lengthens `typed` while keeping it a prefix of some
/// candidate, so the loop stops after at most as many steps as the longest
/// candidate has characters.
pub fn auto_advance(typed: &str, candidates: &[String]) -> String {
    let mut current = typed.to_string();
    loop {
        let next = next_chars(&current, candidates);
        match (next.len(), next.first()) {
            (1, Some(Some(c))) => current.push(*c),
            _ => return current,
        }
    }
}

/// Participants whose normalised surname equals `typed` exactly.
pub fn namesakes<'a>(typed: &str, snapshot: &'a Snapshot) -> Vec<&'a Participant> {
    snapshot
        .participants
        .iter()
        .filter(|p| normalize_name(&p.last_name) == typed)
        .collect()
}

/// Line shown to tell namesakes apart.
pub fn short_description(person: &Participant) -> String {
    format!(
        "{} {} из команды \"{}\"",
        person.first_name, person.last_name, person.team
    )
}

// ---------------------------------------------------------------------------
// Interactive state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Typing,
    /// Several participants share the typed surname; waiting for a pick.
    Choosing,
}

/// Result of [`NameEntry::confirm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// `typed` is not a full surname yet; nothing changed.
    Incomplete,
    /// Exactly one participant matches; the entry has been reset.
    Register(Participant),
    /// Several namesakes match; the entry switched to [`Mode::Choosing`].
    Choose(usize),
}

/// Keypad state for one visitor.
///
/// `typed` only grows (by key presses and auto-typing) until the entry is
/// reset. Every mutation, reset included, re-applies [`auto_advance`], so an
/// empty entry already shows the prefix shared by all candidates.
#[derive(Debug, Clone, Default)]
pub struct NameEntry {
    typed: String,
    mode: Mode,
    choices: Vec<Participant>,
}

impl NameEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn typed(&self) -> &str {
        &self.typed
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Namesakes offered while in [`Mode::Choosing`].
    pub fn choices(&self) -> &[Participant] {
        &self.choices
    }

    pub fn might_be_next(&self, letter: char, candidates: &[String]) -> bool {
        self.mode == Mode::Typing && letter_fits(&self.typed, letter, candidates).is_some()
    }

    /// Type one letter. Returns `false` (and changes nothing) when the letter
    /// cannot extend any candidate or a namesake choice is pending.
    pub fn press(&mut self, letter: char, candidates: &[String]) -> bool {
        if self.mode != Mode::Typing {
            return false;
        }
        let Some(extended) = letter_fits(&self.typed, letter, candidates) else {
            debug!(typed = %self.typed, %letter, "rejected key");
            return false;
        };
        self.typed = auto_advance(&extended, candidates);
        true
    }

    /// Drop a pending namesake choice and go back to the keypad with the
    /// surname still typed.
    pub fn cancel_choice(&mut self) {
        if self.mode == Mode::Choosing {
            self.mode = Mode::Typing;
            self.choices.clear();
        }
    }

    /// Clear everything, return to typing and auto-type whatever prefix all
    /// candidates share.
    pub fn reset(&mut self, candidates: &[String]) {
        self.choices.clear();
        self.mode = Mode::Typing;
        self.typed = auto_advance("", candidates);
    }

    /// Re-apply the transition rule after the candidate set changed. A typed
    /// prefix that no longer matches anybody starts over from scratch.
    pub fn refresh(&mut self, candidates: &[String]) {
        if self.mode != Mode::Typing {
            return;
        }
        if possible_names(&self.typed, candidates).is_empty() {
            self.reset(candidates);
        } else {
            self.typed = auto_advance(&self.typed, candidates);
        }
    }

    /// Resolve the typed surname against `snapshot`.
    pub fn confirm(&mut self, snapshot: &Snapshot) -> Confirmation {
        let candidates = candidate_names(snapshot);
        if self.mode != Mode::Typing || !is_complete(&self.typed, &candidates) {
            return Confirmation::Incomplete;
        }
        let mut matches: Vec<Participant> =
            namesakes(&self.typed, snapshot).into_iter().cloned().collect();
        match matches.len() {
            0 => Confirmation::Incomplete,
            1 => {
                self.reset(&candidates);
                Confirmation::Register(matches.remove(0))
            }
            n => {
                debug!(typed = %self.typed, namesakes = n, "waiting for namesake choice");
                self.choices = matches;
                self.mode = Mode::Choosing;
                Confirmation::Choose(n)
            }
        }
    }

    /// Pick the `index`th namesake. Resets the entry on success.
    pub fn choose(&mut self, index: usize, candidates: &[String]) -> Option<Participant> {
        if self.mode != Mode::Choosing || index >= self.choices.len() {
            return None;
        }
        let picked = self.choices.swap_remove(index);
        self.reset(candidates);
        Some(picked)
    }
}

/// `typed + letter` if that extends some candidate. The letter is upper-cased
/// first so that keyboard input matches normalised names.
fn letter_fits(typed: &str, letter: char, candidates: &[String]) -> Option<String> {
    let mut extended = typed.to_string();
    extended.extend(letter.to_uppercase());
    candidates
        .iter()
        .any(|name| name.starts_with(&extended))
        .then_some(extended)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
