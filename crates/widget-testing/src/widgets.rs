//! Small widgets shared by the tree's integration tests and benches.

use widget_core::{
    Builder, Clicked, ContextKey, EventStorage, HasEvent, StatefulWidget, Template, Widget,
    WidgetChild, WidgetId,
};

/// Leaf widget holding a line of text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Label {
    pub text: String,
}

impl Label {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Widget for Label {
    fn reset_state(&mut self) {
        self.text.clear();
    }
}

impl StatefulWidget for Label {
    type State = String;

    fn state(&self) -> &String {
        &self.text
    }

    fn state_mut(&mut self) -> &mut String {
        &mut self.text
    }
}

/// Declares one [`Label`] per item, keyed by the item's text.
#[derive(Clone, Debug, Default)]
pub struct ItemList {
    pub items: Vec<String>,
}

impl ItemList {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
        }
    }
}

impl Widget for ItemList {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        for item in &self.items {
            if let Some(label) = builder.widget::<Label>(ContextKey::value(item)) {
                builder.set_state(&label, item.clone());
            }
        }
    }

    fn reset_state(&mut self) {
        self.items.clear();
    }
}

impl StatefulWidget for ItemList {
    type State = Vec<String>;

    fn state(&self) -> &Vec<String> {
        &self.items
    }

    fn state_mut(&mut self) -> &mut Vec<String> {
        &mut self.items
    }
}

/// Stays alive for `fade_frames` ticks after being released.
#[derive(Clone, Debug, Default)]
pub struct FadeOut {
    pub fade_frames: u32,
    pub elapsed: u32,
}

impl FadeOut {
    pub fn new(fade_frames: u32) -> Self {
        Self {
            fade_frames,
            elapsed: 0,
        }
    }
}

impl Widget for FadeOut {
    fn try_to_release(&mut self) -> bool {
        if self.elapsed >= self.fade_frames {
            return true;
        }
        self.elapsed += 1;
        false
    }

    fn reset_state(&mut self) {
        self.elapsed = 0;
    }
}

/// Declares a [`FadeOut`] instance of `template` per key.
#[derive(Clone, Debug, Default)]
pub struct FadeList {
    pub template: Option<WidgetId>,
    pub keys: Vec<i64>,
}

impl Widget for FadeList {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        let template = match self.template {
            Some(id) => Template::root(id),
            None => Template::of(),
        };
        for key in &self.keys {
            builder.declare::<FadeOut>(template, ContextKey::id(*key));
        }
    }

    fn reset_state(&mut self) {
        self.keys.clear();
    }
}

impl StatefulWidget for FadeList {
    type State = Vec<i64>;

    fn state(&self) -> &Vec<i64> {
        &self.keys
    }

    fn state_mut(&mut self) -> &mut Vec<i64> {
        &mut self.keys
    }
}

/// Panics in its refresh while armed.
#[derive(Clone, Debug, Default)]
pub struct Panicky {
    pub armed: bool,
}

impl Widget for Panicky {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        builder.widget::<Label>(ContextKey::none());
        if self.armed {
            panic!("armed widget refreshed");
        }
    }
}

impl StatefulWidget for Panicky {
    type State = bool;

    fn state(&self) -> &bool {
        &self.armed
    }

    fn state_mut(&mut self) -> &mut bool {
        &mut self.armed
    }
}

/// Container that only holds what its owner declares into it, after its own
/// header.
#[derive(Clone, Debug, Default)]
pub struct Panel {
    pub header: Option<WidgetChild<Label>>,
}

impl Widget for Panel {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        self.header = builder.widget::<Label>(ContextKey::none());
        if let Some(header) = self.header {
            builder.set_state(&header, "header".to_owned());
        }
    }
}

/// Declares a [`Panel`] and fills it with one label per line.
#[derive(Clone, Debug, Default)]
pub struct Screen {
    pub lines: Vec<String>,
    pub panel: Option<WidgetChild<Panel>>,
}

impl Widget for Screen {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        self.panel = builder.widget::<Panel>(ContextKey::none());
        let Some(panel) = self.panel else {
            return;
        };
        let lines = &self.lines;
        builder.with_children(&panel, |inner| {
            for line in lines {
                if let Some(label) = inner.widget::<Label>(ContextKey::value(line)) {
                    inner.set_state(&label, line.clone());
                }
            }
        });
    }
}

impl StatefulWidget for Screen {
    type State = Vec<String>;

    fn state(&self) -> &Vec<String> {
        &self.lines
    }

    fn state_mut(&mut self) -> &mut Vec<String> {
        &mut self.lines
    }
}

/// Clickable leaf.
#[derive(Clone, Debug, Default)]
pub struct Button {
    pub clicked: EventStorage<Clicked>,
}

impl Widget for Button {
    fn reset_state(&mut self) {
        self.clicked.clear();
    }
}

impl HasEvent<Clicked> for Button {
    fn events(&self) -> &EventStorage<Clicked> {
        &self.clicked
    }

    fn events_mut(&mut self) -> &mut EventStorage<Clicked> {
        &mut self.clicked
    }
}

/// Counts clicks on its button and shows the count in a label.
#[derive(Clone, Debug, Default)]
pub struct ClickCounter {
    pub count: u32,
    pub button: Option<WidgetChild<Button>>,
    pub label: Option<WidgetChild<Label>>,
}

impl Widget for ClickCounter {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        self.button = builder.widget::<Button>(ContextKey::id(0));
        self.label = builder.widget::<Label>(ContextKey::id(1));
        if let Some(button) = self.button {
            if builder.tree().has_event::<Button, Clicked>(button.widget) {
                self.count += 1;
            }
        }
        if let Some(label) = self.label {
            builder.set_state(&label, format!("clicked {}", self.count));
        }
    }
}
