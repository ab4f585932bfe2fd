use crate::catalog::Catalog;

/// Pending text longer than this with no closing backtick is flushed as-is.
const MAX_PENDING: usize = 80;

const OPEN_SETTINGS: &str = "workbench.action.openSettings";
const OPEN_KEYBINDINGS: &str = "workbench.action.openGlobalKeybindings";

/// Answers whether an identifier names a known setting or command.
pub trait IdentifierLookup {
    fn is_setting(&self, key: &str) -> bool;
    fn is_command(&self, key: &str) -> bool;
}

impl IdentifierLookup for Catalog {
    fn is_setting(&self, key: &str) -> bool {
        self.setting(key).is_some()
    }

    fn is_command(&self, key: &str) -> bool {
        self.command(key).is_some()
    }
}

/// Output of one rewrite step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rendered {
    /// Text for the user, with known identifiers turned into links.
    pub markdown: String,
    /// The same text without link markup, kept for history.
    pub plain: String,
}

impl Rendered {
    fn text(&mut self, text: &str) {
        self.markdown.push_str(text);
        self.plain.push_str(text);
    }

    pub fn is_empty(&self) -> bool {
        self.markdown.is_empty() && self.plain.is_empty()
    }
}

/// Markdown link that opens the settings editor on `key`.
pub fn setting_link(key: &str) -> String {
    command_link(OPEN_SETTINGS, key)
}

/// Markdown link that opens the keybindings editor on `key`.
pub fn keybinding_link(key: &str) -> String {
    command_link(OPEN_KEYBINDINGS, key)
}

fn command_link(command: &str, key: &str) -> String {
    let args = serde_json::to_string(&[key]).unwrap_or_default();
    format!(
        "[`{}`](command:{}?{})",
        key,
        command,
        urlencoding::encode(&args)
    )
}

/// Rewrites backtick-quoted identifiers in streamed text into deep links.
///
/// Fragments may split a token anywhere, so text from an unmatched opening
/// backtick onward is held back until the token closes, turns out not to be
/// an identifier, or grows past [`MAX_PENDING`].
pub struct Linkifier<'a, L: IdentifierLookup + ?Sized> {
    lookup: &'a L,
    pending: String,
}

impl<'a, L: IdentifierLookup + ?Sized> Linkifier<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self {
            lookup,
            pending: String::new(),
        }
    }

    pub fn push(&mut self, fragment: &str) -> Rendered {
        self.pending.push_str(fragment);
        let mut out = Rendered::default();
        self.drain(&mut out, false);
        out
    }

    /// Flush whatever is still held back.
    pub fn finish(&mut self) -> Rendered {
        let mut out = Rendered::default();
        self.drain(&mut out, true);
        out
    }

    fn drain(&mut self, out: &mut Rendered, flush: bool) {
        loop {
            match self.pending.find('`') {
                None => {
                    out.text(&self.pending);
                    self.pending.clear();
                    return;
                }
                Some(0) => {}
                Some(i) => {
                    out.text(&self.pending[..i]);
                    self.pending.drain(..i);
                }
            }

            // `pending` now starts with an opening backtick.
            let rest = &self.pending[1..];
            match rest.find(|c: char| c == '`' || c.is_whitespace()) {
                Some(end) if end > 0 && rest[end..].starts_with('`') => {
                    let token = rest[..end].to_string();
                    self.emit_token(out, &token);
                    self.pending.drain(..end + 2);
                }
                Some(_) => {
                    // Whitespace or an empty pair: not an identifier.
                    out.text("`");
                    self.pending.drain(..1);
                }
                None => {
                    if flush || self.pending.len() > MAX_PENDING {
                        out.text(&self.pending);
                        self.pending.clear();
                    }
                    return;
                }
            }
        }
    }

    fn emit_token(&self, out: &mut Rendered, token: &str) {
        let literal = format!("`{}`", token);
        out.plain.push_str(&literal);
        if self.lookup.is_setting(token) {
            out.markdown.push_str(&setting_link(token));
        } else if self.lookup.is_command(token) {
            out.markdown.push_str(&keybinding_link(token));
        } else {
            out.markdown.push_str(&literal);
        }
    }
}
