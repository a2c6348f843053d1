/// Render context: the per-call values placeholder tokens resolve to.

/// Immutable bundle of optional context values. Built fresh for every
/// resolution; absent fields substitute as empty text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderContext {
    pub bot_display_name: Option<String>,
    pub bot_name: Option<String>,
    pub channel_name: Option<String>,
    pub display_name: Option<String>,
    pub mention: Option<String>,
    pub server_name: Option<String>,
    pub user_name: Option<String>,
    pub action_marker: Option<String>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bot(mut self, name: &str, display_name: &str) -> Self {
        self.bot_name = Some(name.to_string());
        self.bot_display_name = Some(display_name.to_string());
        self
    }

    pub fn with_channel(mut self, name: &str) -> Self {
        self.channel_name = Some(name.to_string());
        self
    }

    /// Set every user-derived field at once.
    pub fn with_user(mut self, name: &str, display_name: &str, mention: &str) -> Self {
        self.user_name = Some(name.to_string());
        self.display_name = Some(display_name.to_string());
        self.mention = Some(mention.to_string());
        self
    }

    pub fn with_server(mut self, name: &str) -> Self {
        self.server_name = Some(name.to_string());
        self
    }

    pub fn with_action_marker(mut self, marker: &str) -> Self {
        self.action_marker = Some(marker.to_string());
        self
    }
}
