//! Name patterns: a glob over base names plus an optional tag filter.
//!
//! ```text
//! cpu.*.usage:host=web1|web2,env=prod
//! └────┬────┘ └───────────┬────────┘
//!    glob          tag filter
//! ```
//!
//! Glob syntax, matched against the whole base name:
//!
//! - `*` any run of characters within one `.`-separated segment
//! - `**` any run of characters, crossing segments
//! - `?` exactly one character
//! - `{a,b}` any one of the alternatives (not nestable)
//!
//! Tag filter items are ANDed; the `|`-separated values of one item are
//! ORed.

use crate::error::PatternError;
use crate::metric::{NameSyntax, split_outside_braces};
use crate::tag::TagValue;

/// One state of a compiled glob.
///
/// A glob compiles to a small automaton: `Literal` and `AnyChar` consume one
/// character and move to the next state, `Segment` and `Anything` consume
/// zero or more characters in place, and `Split`/`Jump` are the edges of a
/// brace group.
#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Literal(char),
    AnyChar,
    Segment,
    Anything,
    Split(Vec<usize>),
    Jump(usize),
    Match,
}

/// A compiled glob.
///
/// Matching tracks the set of live states, so it runs in time proportional
/// to the name length times the glob length whatever the mix of stars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glob {
    source: String,
    states: Vec<State>,
}

impl Glob {
    /// Compiles a glob.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if the glob is empty, has unbalanced braces,
    /// or nests brace groups.
    pub fn new(source: &str) -> Result<Self, PatternError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(PatternError::Empty);
        }

        let mut states = Vec::new();
        let mut chars = source.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut group = String::new();
                    let mut closed = false;
                    for inner in chars.by_ref() {
                        match inner {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => {
                                return Err(PatternError::NestedBraces {
                                    pattern: source.to_string(),
                                });
                            }
                            other => group.push(other),
                        }
                    }
                    if !closed {
                        return Err(PatternError::UnbalancedBraces {
                            pattern: source.to_string(),
                        });
                    }
                    push_group(&mut states, &group);
                }
                '}' => {
                    return Err(PatternError::UnbalancedBraces {
                        pattern: source.to_string(),
                    });
                }
                '*' if chars.peek() == Some(&'*') => {
                    chars.next();
                    states.push(State::Anything);
                }
                other => states.push(state_for(other)),
            }
        }
        states.push(State::Match);

        Ok(Self {
            source: source.to_string(),
            states,
        })
    }

    /// Returns the glob as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns true if the glob is `**`.
    pub fn matches_everything(&self) -> bool {
        self.states == [State::Anything, State::Match]
    }

    /// Returns true if the glob matches all of `name`, or equals it.
    pub fn is_match(&self, name: &str) -> bool {
        if name == self.source {
            return true;
        }

        let mut live = vec![false; self.states.len()];
        self.enter(&mut live, 0);

        for c in name.chars() {
            let mut next = vec![false; self.states.len()];
            for (index, _) in live.iter().enumerate().filter(|(_, on)| **on) {
                match &self.states[index] {
                    State::Literal(l) if *l == c => self.enter(&mut next, index + 1),
                    State::AnyChar => self.enter(&mut next, index + 1),
                    State::Segment if c != '.' => self.enter(&mut next, index),
                    State::Anything => self.enter(&mut next, index),
                    _ => {}
                }
            }
            if !next.contains(&true) {
                return false;
            }
            live = next;
        }

        live.last().copied().unwrap_or(false)
    }

    /// Marks `index` live along with every state reachable from it without
    /// consuming a character.
    fn enter(&self, live: &mut [bool], index: usize) {
        let mut pending = vec![index];
        while let Some(index) = pending.pop() {
            if live[index] {
                continue;
            }
            live[index] = true;
            match &self.states[index] {
                State::Split(targets) => pending.extend(targets.iter().copied()),
                State::Jump(target) => pending.push(*target),
                State::Segment | State::Anything => pending.push(index + 1),
                _ => {}
            }
        }
    }
}

/// Appends a brace group: a split into each alternative, each of which jumps
/// past the group when done.
fn push_group(states: &mut Vec<State>, group: &str) {
    let split = states.len();
    states.push(State::Split(Vec::new()));

    let mut starts = Vec::new();
    let mut jumps = Vec::new();
    for option in group.split(',') {
        starts.push(states.len());
        let mut chars = option.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '*' && chars.peek() == Some(&'*') {
                chars.next();
                states.push(State::Anything);
            } else {
                states.push(state_for(c));
            }
        }
        jumps.push(states.len());
        states.push(State::Jump(0));
    }

    let end = states.len();
    for jump in jumps {
        states[jump] = State::Jump(end);
    }
    states[split] = State::Split(starts);
}

fn state_for(c: char) -> State {
    match c {
        '*' => State::Segment,
        '?' => State::AnyChar,
        other => State::Literal(other),
    }
}

/// One `key=value[|value...]` item of a tag filter.
#[derive(Debug, Clone, PartialEq)]
pub struct TagFilter {
    /// Tag key.
    pub key: String,
    /// Accepted values; a name matches if it carries any of them.
    pub values: Vec<TagValue>,
}

impl TagFilter {
    /// Parses one filter item.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::InvalidTagFilter`] if the item has no `=`, an
    /// empty key, or no values.
    pub fn parse(item: &str) -> Result<Self, PatternError> {
        let invalid = |reason: &str| PatternError::InvalidTagFilter {
            item: item.to_string(),
            reason: reason.to_string(),
        };

        let (key, value) = item.split_once('=').ok_or_else(|| invalid("missing '='"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(invalid("empty key"));
        }

        let values = TagValue::infer_multi(value)
            .ok_or_else(|| invalid("no values"))?
            .scalars()
            .to_vec();

        Ok(Self {
            key: key.to_string(),
            values,
        })
    }
}

/// A compiled name pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct NamePattern {
    glob: Glob,
    filters: Vec<TagFilter>,
}

impl NamePattern {
    /// Compiles `pattern` under the given name syntax.
    ///
    /// The first delimiter outside a brace group separates the glob from the
    /// tag filter.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if the glob or any filter item is invalid.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mobius::{NamePattern, NameSyntax};
    ///
    /// let pattern = NamePattern::parse("**.test0{1,3}.*:zone=east", &NameSyntax::default()).unwrap();
    /// assert!(pattern.glob().is_match("mobius.test03.keytest0003"));
    /// assert!(!pattern.glob().is_match("mobius.test02.keytest0002"));
    /// assert_eq!(pattern.filters().len(), 1);
    /// ```
    pub fn parse(pattern: &str, syntax: &NameSyntax) -> Result<Self, PatternError> {
        let mut parts = split_outside_braces(pattern, syntax.delimiter).into_iter();
        let glob = Glob::new(parts.next().unwrap_or_default())?;

        let clause: Vec<&str> = parts.collect();
        let clause = clause.join(&syntax.delimiter.to_string());

        let mut filters = Vec::new();
        for item in split_outside_braces(&clause, syntax.separator) {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            filters.push(TagFilter::parse(item)?);
        }

        Ok(Self { glob, filters })
    }

    /// Returns the glob portion.
    pub fn glob(&self) -> &Glob {
        &self.glob
    }

    /// Returns the tag filter items.
    pub fn filters(&self) -> &[TagFilter] {
        &self.filters
    }
}
