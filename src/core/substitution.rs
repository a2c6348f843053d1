/// Placeholder substitution: the final pass over rendered text.

use tracing::debug;

use crate::core::config::PlaceholderTokens;
use crate::core::context::RenderContext;

/// Ordered token → replacement pairs. Order decides which token wins when
/// two could match at the same position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholders {
    entries: Vec<(String, String)>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the full chat vocabulary from `ctx` in one pass. Absent fields
    /// map to empty text; a missing action marker falls back to
    /// `default_action`.
    pub fn from_context(
        tokens: &PlaceholderTokens,
        ctx: &RenderContext,
        default_action: &str,
    ) -> Self {
        let field = |value: &Option<String>| value.clone().unwrap_or_default();
        let action = ctx
            .action_marker
            .clone()
            .unwrap_or_else(|| default_action.to_string());

        [
            (&tokens.bot_display_name, field(&ctx.bot_display_name)),
            (&tokens.bot_name, field(&ctx.bot_name)),
            (&tokens.channel_name, field(&ctx.channel_name)),
            (&tokens.display_name, field(&ctx.display_name)),
            (&tokens.mention, field(&ctx.mention)),
            (&tokens.server_name, field(&ctx.server_name)),
            (&tokens.user_name, field(&ctx.user_name)),
            (&tokens.action, action),
        ]
        .into_iter()
        .map(|(token, value)| (token.clone(), value))
        .collect()
    }

    /// Set `token`'s replacement, keeping its original position if present.
    /// Empty tokens are ignored.
    pub fn insert(&mut self, token: &str, value: &str) {
        if token.is_empty() {
            return;
        }
        match self.entries.iter_mut().find(|(t, _)| t == token) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((token.to_string(), value.to_string())),
        }
    }

    pub fn with(mut self, token: &str, value: &str) -> Self {
        self.insert(token, value);
        self
    }

    /// Apply `overrides` on top of `self`; colliding tokens take the override.
    pub fn merge(&mut self, overrides: &Placeholders) {
        for (token, value) in &overrides.entries {
            self.insert(token, value);
        }
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Placeholders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut placeholders = Placeholders::new();
        for (token, value) in iter {
            placeholders.insert(&token.into(), &value.into());
        }
        placeholders
    }
}

/// Replace every placeholder token in `text` with its value.
///
/// A single left-to-right scan: emitted replacement text is never looked at
/// again, so values containing tokens stay literal.
pub fn substitute(text: &str, placeholders: &Placeholders) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut replaced = 0usize;

    'scan: while let Some(c) = rest.chars().next() {
        for (token, value) in &placeholders.entries {
            if rest.starts_with(token.as_str()) {
                out.push_str(value);
                rest = &rest[token.len()..];
                replaced += 1;
                continue 'scan;
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    debug!(replaced, "substitute(): {}", out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat_placeholders(ctx: &RenderContext) -> Placeholders {
        Placeholders::from_context(&PlaceholderTokens::default(), ctx, "/me")
    }

    #[test]
    fn substitutes_channel_name() {
        let ctx = RenderContext::new().with_channel("general");
        assert_eq!(
            substitute("Welcome to %channel%", &chat_placeholders(&ctx)),
            "Welcome to general"
        );
    }

    #[test]
    fn absent_fields_become_empty() {
        let ctx = RenderContext::new();
        assert_eq!(
            substitute("[%nick%|%server%|%mention%]", &chat_placeholders(&ctx)),
            "[||]"
        );
    }

    #[test]
    fn action_marker_defaults() {
        let out = substitute("[ACT] waves", &chat_placeholders(&RenderContext::new()));
        assert_eq!(out, "/me waves");

        let ctx = RenderContext::new().with_action_marker("*");
        assert_eq!(substitute("[ACT] waves", &chat_placeholders(&ctx)), "* waves");
    }

    #[test]
    fn replacement_values_are_not_rescanned() {
        let ctx = RenderContext::new()
            .with_user("%channel%", "%nick%", "@x")
            .with_channel("general");
        assert_eq!(
            substitute("%name% / %nick% / %channel%", &chat_placeholders(&ctx)),
            "%channel% / %nick% / general"
        );
    }

    #[test]
    fn earlier_token_wins_on_overlap() {
        // "%b" also matches at the start of "%bot%".
        let placeholders: Placeholders = [("%bot%", "Meat"), ("%b", "X")].into_iter().collect();
        assert_eq!(substitute("%bot% %bx", &placeholders), "Meat Xx");
    }

    #[test]
    fn merge_overrides_in_place() {
        let mut base = chat_placeholders(&RenderContext::new().with_channel("general"));
        let overrides = Placeholders::new()
            .with("%channel%", "random")
            .with("%item%", "sword");
        base.merge(&overrides);
        assert_eq!(base.get("%channel%"), Some("random"));
        assert_eq!(base.get("%item%"), Some("sword"));
        assert_eq!(base.len(), 9);
    }

    #[test]
    fn empty_token_ignored() {
        let placeholders = Placeholders::new().with("", "boom");
        assert!(placeholders.is_empty());
        assert_eq!(substitute("abc", &placeholders), "abc");
    }

    #[test]
    fn no_placeholders_is_identity() {
        assert_eq!(substitute("héllo wörld", &Placeholders::new()), "héllo wörld");
    }
}
