use chatline_core::{EventBus, SubscriptionId};
use tracing::debug;

use super::{Theme, ThemeError, ThemeLoader};

/// Notifications from [`ThemeProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeEvent {
    ThemeChanged(String),
}

/// Owns the active theme. Widgets that need restyling subscribe and pull
/// the new styles from [`ThemeProvider::current`].
#[derive(Debug, Default)]
pub struct ThemeProvider {
    current: Theme,
    loader: ThemeLoader,
    events: EventBus<ThemeEvent>,
}

impl ThemeProvider {
    pub fn new(theme: Theme, loader: ThemeLoader) -> Self {
        Self {
            current: theme,
            loader,
            events: EventBus::new(),
        }
    }

    pub fn current(&self) -> &Theme {
        &self.current
    }

    pub fn loader(&self) -> &ThemeLoader {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut ThemeLoader {
        &mut self.loader
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&ThemeEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Replace the theme. Returns `false` and stays silent when nothing changed.
    pub fn set_theme(&mut self, theme: Theme) -> bool {
        if self.current == theme {
            return false;
        }
        debug!(target: "theme", "Switching theme {} -> {}", self.current.name, theme.name);
        self.current = theme;
        self.events
            .emit(&ThemeEvent::ThemeChanged(self.current.name.clone()));
        true
    }

    /// Resolve `name` through the loader and switch to it
    pub fn set_theme_by_name(&mut self, name: &str) -> Result<bool, ThemeError> {
        let theme = self.loader.load_theme(name)?;
        Ok(self.set_theme(theme))
    }

    pub fn available_themes(&self) -> Vec<String> {
        self.loader.list_themes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording_provider() -> (ThemeProvider, Rc<RefCell<Vec<ThemeEvent>>>) {
        let mut provider = ThemeProvider::new(Theme::light(), ThemeLoader::without_user_dirs());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        provider.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        (provider, seen)
    }

    #[test]
    fn test_change_notifies_once() {
        let (mut provider, seen) = recording_provider();

        assert!(provider.set_theme(Theme::dark()));
        assert!(!provider.set_theme(Theme::dark()));

        assert_eq!(
            *seen.borrow(),
            vec![ThemeEvent::ThemeChanged("dark".to_string())]
        );
        assert_eq!(provider.current().name, "dark");
    }

    #[test]
    fn test_set_by_name() {
        let (mut provider, seen) = recording_provider();

        assert!(provider.set_theme_by_name("midnight").unwrap());
        assert!(provider.set_theme_by_name("missing").is_err());

        assert_eq!(provider.current().name, "midnight");
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut provider = ThemeProvider::default();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let id = provider.subscribe(move |_| *sink.borrow_mut() += 1);

        assert!(provider.unsubscribe(id));
        provider.set_theme(Theme::dark());

        assert_eq!(*count.borrow(), 0);
    }
}
