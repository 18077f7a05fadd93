//! Screens and the screen stack.
//!
//! Rendering is someone else's job: screens only tell a [`Display`] what to
//! show. The stack hands out a [`ContextId`] per pushed screen so a fetch
//! can later ask whether the screen that started it is still on top.

use iw_weather::{ConditionCategory, ContextId, WeatherReading};

pub const LOADING_MESSAGE: &str = "Getting updated weather info.\n\nPlease wait...";

/// Output surface for screens.
pub trait Display {
    fn show_text(&mut self, text: &str);
    fn show_icon(&mut self, category: ConditionCategory);
    fn clear(&mut self);
}

/// Lifecycle hooks every screen kind implements.
pub trait ScreenHandlers {
    fn on_show(&mut self, display: &mut dyn Display);
    fn on_hide(&mut self, display: &mut dyn Display);
}

/// "Please wait" screen shown while the first fetch is outstanding.
#[derive(Debug, Clone)]
pub struct LoadingScreen {
    status: String,
    visible: bool,
}

impl Default for LoadingScreen {
    fn default() -> Self {
        Self {
            status: LOADING_MESSAGE.to_string(),
            visible: false,
        }
    }
}

impl LoadingScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Replace the status text, redrawing if the screen is showing.
    pub fn set_status(&mut self, status: &str, display: &mut dyn Display) {
        self.status = status.to_string();
        if self.visible {
            display.clear();
            display.show_text(&self.status);
        }
    }
}

impl ScreenHandlers for LoadingScreen {
    fn on_show(&mut self, display: &mut dyn Display) {
        self.visible = true;
        display.clear();
        display.show_text(&self.status);
    }

    fn on_hide(&mut self, _display: &mut dyn Display) {
        self.visible = false;
    }
}

/// Shows a reading: condition icon, temperature and condition text.
#[derive(Debug, Clone)]
pub struct WeatherScreen {
    reading: WeatherReading,
}

impl WeatherScreen {
    pub fn new(reading: WeatherReading) -> Self {
        Self { reading }
    }

    pub fn reading(&self) -> &WeatherReading {
        &self.reading
    }
}

impl ScreenHandlers for WeatherScreen {
    fn on_show(&mut self, display: &mut dyn Display) {
        display.clear();
        display.show_icon(self.reading.category());
        display.show_text(&format!(
            "{}°C\n{}",
            self.reading.temperature(),
            self.reading.condition_text()
        ));
    }

    fn on_hide(&mut self, _display: &mut dyn Display) {}
}

/// A transient message covering the app, e.g. a notification.
#[derive(Debug, Clone)]
pub struct MessageScreen {
    text: String,
}

impl MessageScreen {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl ScreenHandlers for MessageScreen {
    fn on_show(&mut self, display: &mut dyn Display) {
        display.clear();
        display.show_text(&self.text);
    }

    fn on_hide(&mut self, _display: &mut dyn Display) {}
}

#[derive(Debug, Clone)]
pub enum Screen {
    Loading(LoadingScreen),
    Weather(WeatherScreen),
    Message(MessageScreen),
}

impl ScreenHandlers for Screen {
    fn on_show(&mut self, display: &mut dyn Display) {
        match self {
            Screen::Loading(s) => s.on_show(display),
            Screen::Weather(s) => s.on_show(display),
            Screen::Message(s) => s.on_show(display),
        }
    }

    fn on_hide(&mut self, display: &mut dyn Display) {
        match self {
            Screen::Loading(s) => s.on_hide(display),
            Screen::Weather(s) => s.on_hide(display),
            Screen::Message(s) => s.on_hide(display),
        }
    }
}

/// Stack of screens; only the top one is showing.
#[derive(Debug, Default)]
pub struct ScreenStack {
    screens: Vec<(ContextId, Screen)>,
    next_id: u32,
}

impl ScreenStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a screen on top, hiding the previous top.
    pub fn push(&mut self, mut screen: Screen, display: &mut dyn Display) -> ContextId {
        if let Some((_, top)) = self.screens.last_mut() {
            top.on_hide(display);
        }

        self.next_id += 1;
        let id = ContextId(self.next_id);
        screen.on_show(display);
        self.screens.push((id, screen));
        tracing::debug!(?id, depth = self.screens.len(), "Pushed screen");
        id
    }

    /// Pop the top screen, revealing the one beneath.
    pub fn pop(&mut self, display: &mut dyn Display) -> Option<(ContextId, Screen)> {
        let (id, mut screen) = self.screens.pop()?;
        screen.on_hide(display);
        match self.screens.last_mut() {
            Some((_, top)) => top.on_show(display),
            None => display.clear(),
        }
        Some((id, screen))
    }

    /// Remove a screen wherever it is in the stack.
    pub fn remove(&mut self, id: ContextId, display: &mut dyn Display) -> Option<Screen> {
        if self.top() == Some(id) {
            return self.pop(display).map(|(_, screen)| screen);
        }
        let index = self.screens.iter().position(|(sid, _)| *sid == id)?;
        Some(self.screens.remove(index).1)
    }

    pub fn top(&self) -> Option<ContextId> {
        self.screens.last().map(|(id, _)| *id)
    }

    pub fn top_screen(&self) -> Option<&Screen> {
        self.screens.last().map(|(_, screen)| screen)
    }

    pub fn is_top(&self, id: ContextId) -> bool {
        self.top() == Some(id)
    }

    pub fn get_mut(&mut self, id: ContextId) -> Option<&mut Screen> {
        self.screens
            .iter_mut()
            .find(|(sid, _)| *sid == id)
            .map(|(_, screen)| screen)
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;

    #[derive(Default)]
    struct TextLog {
        lines: Vec<String>,
    }

    impl Display for TextLog {
        fn show_text(&mut self, text: &str) {
            self.lines.push(text.to_string());
        }

        fn show_icon(&mut self, category: ConditionCategory) {
            self.lines.push(format!("icon:{}", category.icon_name()));
        }

        fn clear(&mut self) {}
    }

    #[test]
    fn test_push_and_pop_reveal_previous() {
        let mut display = TextLog::default();
        let mut stack = ScreenStack::new();

        let loading = stack.push(Screen::Loading(LoadingScreen::new()), &mut display);
        let message = stack.push(Screen::Message(MessageScreen::new("Hi")), &mut display);

        assert!(stack.is_top(message));
        assert!(!stack.is_top(loading));

        let (popped, _) = stack.pop(&mut display).unwrap();
        assert_eq!(popped, message);
        assert!(stack.is_top(loading));
        assert_eq!(display.lines.last().unwrap(), LOADING_MESSAGE);
    }

    #[test]
    fn test_remove_buried_screen() {
        let mut display = TextLog::default();
        let mut stack = ScreenStack::new();

        let loading = stack.push(Screen::Loading(LoadingScreen::new()), &mut display);
        let top = stack.push(Screen::Message(MessageScreen::new("Hi")), &mut display);

        assert!(stack.remove(loading, &mut display).is_some());
        assert_eq!(stack.len(), 1);
        assert!(stack.is_top(top));
    }

    #[test]
    fn test_loading_status_redraws_only_when_visible() {
        let mut display = TextLog::default();
        let mut stack = ScreenStack::new();
        let loading = stack.push(Screen::Loading(LoadingScreen::new()), &mut display);
        stack.push(Screen::Message(MessageScreen::new("Hi")), &mut display);

        let Some(Screen::Loading(screen)) = stack.get_mut(loading) else {
            panic!("expected loading screen");
        };
        screen.set_status("Retrying", &mut display);
        assert_eq!(screen.status(), "Retrying");
        assert_eq!(display.lines.last().unwrap(), "Hi");
    }

    #[test]
    fn test_weather_screen_shows_icon_and_text() {
        let mut display = TextLog::default();
        let mut stack = ScreenStack::new();
        stack.push(
            Screen::Weather(WeatherScreen::new(WeatherReading::new(72, 800, "Clear"))),
            &mut display,
        );
        assert_eq!(display.lines, vec!["icon:sun".to_string(), "72°C\nClear".to_string()]);
    }
}
